//! # Listings
//!
//! Vehicle listings and their lifecycle:
//!
//! ```text
//! create (seller) ──► unsold ──► sold (payment confirmation)
//!                       │
//!                       ├── advertise on/off (owner only)
//!                       └── delete (owner, or admin via report resolution)
//! ```
//!
//! Owner-scoped writes put the owner's email in the filter itself, so a
//! seller touching someone else's listing matches nothing and gets a no-op
//! outcome back rather than a permission error.

use crate::error::{MarketError, MarketResult};
use crate::store::{
    fields, find_as, find_one_as, to_document, Collection, DeleteOutcome, Filter, InsertOutcome,
    SharedStore, UpdateOutcome,
};
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

pub(crate) const OWNER_FIELD: &str = "owner_email";
const STATUS_FIELD: &str = "status";
const CATEGORY_FIELD: &str = "category_id";
const ADVERTISE_FIELD: &str = "advertise";

/// Listing lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Unsold,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Unsold => "unsold",
            ListingStatus::Sold => "sold",
        }
    }
}

/// A vehicle for sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub owner_email: String,
    pub category_id: String,
    #[serde(default)]
    pub status: ListingStatus,
    /// Promoted on the home page
    #[serde(default)]
    pub advertise: bool,
    pub created_at: DateTime<Utc>,

    pub name: String,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub seller_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub location: String,
    pub resale_price: f64,
    #[serde(default)]
    pub original_price: f64,
    #[serde(default)]
    pub years_of_use: u32,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub description: String,
}

impl Listing {
    pub fn is_sold(&self) -> bool {
        self.status == ListingStatus::Sold
    }
}

/// Listing creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub location: String,
    pub resale_price: f64,
    #[serde(default)]
    pub original_price: f64,
    #[serde(default)]
    pub years_of_use: u32,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub description: String,
}

impl NewListing {
    pub fn new(category_id: impl Into<String>, name: impl Into<String>, resale_price: f64) -> Self {
        Self {
            category_id: category_id.into(),
            name: name.into(),
            image: None,
            location: String::new(),
            resale_price,
            original_price: 0.0,
            years_of_use: 0,
            condition: String::new(),
            phone: String::new(),
            description: String::new(),
        }
    }

    fn validate(&self) -> MarketResult<()> {
        if self.name.trim().is_empty() {
            return Err(MarketError::InvalidRequest("listing name is required".to_string()));
        }
        if self.category_id.trim().is_empty() {
            return Err(MarketError::InvalidRequest("category_id is required".to_string()));
        }
        if !self.resale_price.is_finite() || self.resale_price <= 0.0 {
            return Err(MarketError::InvalidRequest(format!(
                "resale_price must be positive, got {}",
                self.resale_price
            )));
        }
        Ok(())
    }
}

/// Listing store operations
#[derive(Clone)]
pub struct ListingCatalog {
    store: SharedStore,
}

impl ListingCatalog {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create a listing owned by `seller`, unsold and not advertised.
    pub async fn create(&self, seller: &User, new: NewListing) -> MarketResult<InsertOutcome> {
        new.validate()?;

        let listing = Listing {
            id: Uuid::new_v4().to_string(),
            owner_email: seller.email.clone(),
            category_id: new.category_id,
            status: ListingStatus::Unsold,
            advertise: false,
            created_at: Utc::now(),
            name: new.name,
            seller_name: seller.name.clone(),
            seller_verified: seller.verified,
            image: new.image,
            location: new.location,
            resale_price: new.resale_price,
            original_price: new.original_price,
            years_of_use: new.years_of_use,
            condition: new.condition,
            phone: new.phone,
            description: new.description,
        };

        info!(id = %listing.id, owner = %listing.owner_email, "creating listing");
        self.store
            .insert_one(Collection::Products, to_document(&listing)?)
            .await
    }

    pub async fn get(&self, id: &str) -> MarketResult<Listing> {
        find_one_as(self.store.as_ref(), Collection::Products, &Filter::by_id(id))
            .await?
            .ok_or_else(|| MarketError::not_found("Listing", id))
    }

    /// Public browse view: unsold listings, optionally within one category.
    pub async fn browse(&self, category_id: Option<&str>) -> MarketResult<Vec<Listing>> {
        let mut filter = Filter::all().eq(STATUS_FIELD, ListingStatus::Unsold.as_str());
        if let Some(category_id) = category_id {
            filter = filter.eq(CATEGORY_FIELD, category_id);
        }
        find_as(self.store.as_ref(), Collection::Products, &filter).await
    }

    /// Management view: everything the owner listed, sold or not.
    pub async fn by_owner(&self, owner_email: &str) -> MarketResult<Vec<Listing>> {
        find_as(
            self.store.as_ref(),
            Collection::Products,
            &Filter::all().eq(OWNER_FIELD, owner_email),
        )
        .await
    }

    /// Promoted listings still for sale
    pub async fn advertised(&self) -> MarketResult<Vec<Listing>> {
        find_as(
            self.store.as_ref(),
            Collection::Products,
            &Filter::all()
                .eq(ADVERTISE_FIELD, true)
                .eq(STATUS_FIELD, ListingStatus::Unsold.as_str()),
        )
        .await
    }

    /// Toggle promotion. Only matches when `owner_email` owns the listing.
    pub async fn set_advertise(
        &self,
        owner_email: &str,
        id: &str,
        advertise: bool,
    ) -> MarketResult<UpdateOutcome> {
        let outcome = self
            .store
            .update_one(
                Collection::Products,
                &Filter::by_id(id).eq(OWNER_FIELD, owner_email),
                fields(json!({ ADVERTISE_FIELD: advertise })),
            )
            .await?;

        if outcome.is_noop() {
            warn!(id, owner = owner_email, "advertise update matched no owned listing");
        }
        Ok(outcome)
    }

    /// Delete a listing. Only matches when `owner_email` owns it.
    pub async fn delete_owned(&self, owner_email: &str, id: &str) -> MarketResult<DeleteOutcome> {
        let outcome = self
            .store
            .delete_one(
                Collection::Products,
                &Filter::by_id(id).eq(OWNER_FIELD, owner_email),
            )
            .await?;

        if !outcome.found() {
            warn!(id, owner = owner_email, "delete matched no owned listing");
        }
        Ok(outcome)
    }

    /// Unconditional delete (admin report resolution)
    pub async fn delete(&self, id: &str) -> MarketResult<DeleteOutcome> {
        self.store
            .delete_one(Collection::Products, &Filter::by_id(id))
            .await
    }

    pub async fn mark_sold(&self, id: &str) -> MarketResult<UpdateOutcome> {
        self.store
            .update_one(
                Collection::Products,
                &Filter::by_id(id),
                fields(json!({ STATUS_FIELD: ListingStatus::Sold.as_str() })),
            )
            .await
    }
}
