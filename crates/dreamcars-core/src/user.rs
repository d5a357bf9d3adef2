//! # Users
//!
//! The identity store. Every authorization decision reads from here; nothing
//! is cached, so a role or verification change applies to the next request.

use crate::error::{MarketError, MarketResult};
use crate::listing::OWNER_FIELD;
use crate::store::{
    fields, find_as, find_one_as, to_document, Collection, DeleteOutcome, Filter, InsertOutcome,
    SharedStore, UpdateOutcome,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

const EMAIL_FIELD: &str = "email";
const ROLE_FIELD: &str = "role";

/// Marketplace roles. Compared by equality; there is no hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Buyer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub role: Role,
    /// Set by an admin for trusted sellers
    #[serde(default)]
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Self-registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

impl Registration {
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            role,
        }
    }
}

/// Outcome of removing a user and the listings they own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserRemoval {
    pub user: DeleteOutcome,
    pub listings: DeleteOutcome,
}

/// Identity store operations
#[derive(Clone)]
pub struct UserDirectory {
    store: SharedStore,
}

impl UserDirectory {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn find_by_email(&self, email: &str) -> MarketResult<Option<User>> {
        find_one_as(
            self.store.as_ref(),
            Collection::Users,
            &Filter::all().eq(EMAIL_FIELD, email),
        )
        .await
    }

    async fn get_by_email(&self, email: &str) -> MarketResult<User> {
        self.find_by_email(email)
            .await?
            .ok_or_else(|| MarketError::not_found("User", email))
    }

    pub async fn role_of(&self, email: &str) -> MarketResult<Role> {
        Ok(self.get_by_email(email).await?.role)
    }

    pub async fn is_verified(&self, email: &str) -> MarketResult<bool> {
        Ok(self.get_by_email(email).await?.verified)
    }

    /// Role check behind the role guard: the user must exist and hold `required`.
    pub async fn require_role(&self, email: &str, required: Role) -> MarketResult<User> {
        match self.find_by_email(email).await? {
            Some(user) if user.role == required => Ok(user),
            Some(user) => {
                warn!(email, role = %user.role, required = %required, "role check failed");
                Err(MarketError::Forbidden(format!("{} access required", required)))
            }
            None => {
                warn!(email, required = %required, "role check for unknown user");
                Err(MarketError::Forbidden(format!("{} access required", required)))
            }
        }
    }

    /// Register a user. An existing email is a no-op reported as not acknowledged.
    pub async fn register(&self, registration: Registration) -> MarketResult<InsertOutcome> {
        let email = registration.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(MarketError::InvalidRequest(format!(
                "invalid email: {:?}",
                registration.email
            )));
        }
        if registration.role == Role::Admin {
            return Err(MarketError::InvalidRequest(
                "admin accounts cannot be self-registered".to_string(),
            ));
        }

        if self.find_by_email(email).await?.is_some() {
            info!(email, "registration skipped, user exists");
            return Ok(InsertOutcome::skipped("user already exists"));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: registration.name,
            role: registration.role,
            verified: false,
            created_at: Utc::now(),
        };

        info!(email, role = %user.role, "registering user");
        self.store
            .insert_one(Collection::Users, to_document(&user)?)
            .await
    }

    /// Make sure `email` exists with the admin role (startup bootstrap).
    pub async fn ensure_admin(&self, email: &str) -> MarketResult<()> {
        match self.find_by_email(email).await? {
            Some(user) if user.role == Role::Admin => Ok(()),
            Some(_) => {
                info!(email, "promoting existing user to admin");
                self.store
                    .update_one(
                        Collection::Users,
                        &Filter::all().eq(EMAIL_FIELD, email),
                        fields(json!({ ROLE_FIELD: Role::Admin })),
                    )
                    .await?;
                Ok(())
            }
            None => {
                info!(email, "creating admin user");
                let admin = User {
                    id: Uuid::new_v4().to_string(),
                    email: email.to_string(),
                    name: "Administrator".to_string(),
                    role: Role::Admin,
                    verified: true,
                    created_at: Utc::now(),
                };
                self.store
                    .insert_one(Collection::Users, to_document(&admin)?)
                    .await?;
                Ok(())
            }
        }
    }

    pub async fn list_by_role(&self, role: Role) -> MarketResult<Vec<User>> {
        find_as(
            self.store.as_ref(),
            Collection::Users,
            &Filter::all().eq(ROLE_FIELD, role.as_str()),
        )
        .await
    }

    /// Mark a seller verified and flag their listings accordingly.
    pub async fn verify_seller(&self, email: &str) -> MarketResult<UpdateOutcome> {
        let outcome = self
            .store
            .update_one(
                Collection::Users,
                &Filter::all()
                    .eq(EMAIL_FIELD, email)
                    .eq(ROLE_FIELD, Role::Seller.as_str()),
                fields(json!({ "verified": true })),
            )
            .await?;

        if outcome.is_noop() {
            warn!(email, "verify requested for unknown seller");
            return Ok(outcome);
        }

        let listings = self
            .store
            .update_many(
                Collection::Products,
                &Filter::all().eq(OWNER_FIELD, email),
                fields(json!({ "seller_verified": true })),
            )
            .await?;
        info!(email, listings = listings.modified_count, "seller verified");

        Ok(outcome)
    }

    /// Delete a user and every listing they own.
    pub async fn remove(&self, email: &str) -> MarketResult<UserRemoval> {
        let user = self
            .store
            .delete_one(Collection::Users, &Filter::all().eq(EMAIL_FIELD, email))
            .await?;
        let listings = self
            .store
            .delete_many(Collection::Products, &Filter::all().eq(OWNER_FIELD, email))
            .await?;

        info!(
            email,
            user = user.deleted_count,
            listings = listings.deleted_count,
            "user removed"
        );
        Ok(UserRemoval { user, listings })
    }
}
