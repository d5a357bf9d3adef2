//! # Reports
//!
//! Abuse reports against listings. A user reports a given listing at most
//! once; repeating is answered with a normal "already reported" outcome.
//! Admins resolve a report by deleting it together with the listing.

use crate::error::{MarketError, MarketResult};
use crate::listing::ListingCatalog;
use crate::store::{
    find_as, to_document, Collection, DeleteOutcome, Filter, InsertOutcome, SharedStore,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

pub const ALREADY_REPORTED: &str = "already reported";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub listing_id: String,
    pub reporter_email: String,
    #[serde(default)]
    pub listing_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Report creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub listing_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NewReport {
    pub fn new(listing_id: impl Into<String>) -> Self {
        Self {
            listing_id: listing_id.into(),
            reason: None,
        }
    }
}

/// Outcome of an admin resolution: each delete stands on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub listing: DeleteOutcome,
    pub report: DeleteOutcome,
}

#[derive(Clone)]
pub struct ReportDesk {
    store: SharedStore,
    listings: ListingCatalog,
}

impl ReportDesk {
    pub fn new(store: SharedStore) -> Self {
        Self {
            listings: ListingCatalog::new(store.clone()),
            store,
        }
    }

    /// File a report; a repeat by the same reporter is skipped.
    pub async fn create(&self, reporter_email: &str, new: NewReport) -> MarketResult<InsertOutcome> {
        if new.listing_id.trim().is_empty() {
            return Err(MarketError::InvalidRequest("listing_id is required".to_string()));
        }

        let existing = self
            .store
            .find_one(
                Collection::Reports,
                &Filter::all()
                    .eq("listing_id", new.listing_id.as_str())
                    .eq("reporter_email", reporter_email),
            )
            .await?;
        if existing.is_some() {
            info!(listing = %new.listing_id, reporter = reporter_email, "duplicate report skipped");
            return Ok(InsertOutcome::skipped(ALREADY_REPORTED));
        }

        let listing = self.listings.get(&new.listing_id).await?;
        let report = Report {
            id: Uuid::new_v4().to_string(),
            listing_id: listing.id,
            reporter_email: reporter_email.to_string(),
            listing_name: listing.name,
            reason: new.reason,
            created_at: Utc::now(),
        };

        info!(id = %report.id, listing = %report.listing_id, "report filed");
        self.store
            .insert_one(Collection::Reports, to_document(&report)?)
            .await
    }

    pub async fn list(&self) -> MarketResult<Vec<Report>> {
        find_as(self.store.as_ref(), Collection::Reports, &Filter::all()).await
    }

    /// Delete the listing and the report as two independent operations.
    pub async fn resolve(&self, listing_id: &str, report_id: &str) -> MarketResult<Resolution> {
        let listing = self.listings.delete(listing_id).await?;
        let report = self
            .store
            .delete_one(Collection::Reports, &Filter::by_id(report_id))
            .await?;

        info!(
            listing_id,
            report_id,
            listing_deleted = listing.deleted_count,
            report_deleted = report.deleted_count,
            "report resolved"
        );
        Ok(Resolution { listing, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::NewListing;
    use crate::memory::MemoryStore;
    use crate::user::{Registration, Role, UserDirectory};
    use std::sync::Arc;

    async fn setup() -> (ReportDesk, SharedStore, String) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let users = UserDirectory::new(store.clone());
        users
            .register(Registration::new("sue@cars.io", "Sue", Role::Seller))
            .await
            .unwrap();
        let seller = users.find_by_email("sue@cars.io").await.unwrap().unwrap();
        let listing_id = ListingCatalog::new(store.clone())
            .create(&seller, NewListing::new("sedan", "Golf 2012", 4000.0))
            .await
            .unwrap()
            .inserted_id
            .unwrap();
        (ReportDesk::new(store.clone()), store, listing_id)
    }

    #[tokio::test]
    async fn test_report_once_per_reporter() {
        let (desk, store, listing_id) = setup().await;

        let first = desk.create("bob@cars.io", NewReport::new(&listing_id)).await.unwrap();
        assert!(first.acknowledged);

        let second = desk.create("bob@cars.io", NewReport::new(&listing_id)).await.unwrap();
        assert!(!second.acknowledged);
        assert_eq!(second.message.as_deref(), Some(ALREADY_REPORTED));
        assert_eq!(store.count(Collection::Reports, &Filter::all()).await.unwrap(), 1);

        // a different reporter may still report it
        desk.create("amy@cars.io", NewReport::new(&listing_id)).await.unwrap();
        assert_eq!(desk.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_report_unknown_listing() {
        let (desk, _, _) = setup().await;
        let err = desk.create("bob@cars.io", NewReport::new("ghost")).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_resolve_twice() {
        let (desk, store, listing_id) = setup().await;
        let report_id = desk
            .create("bob@cars.io", NewReport::new(&listing_id))
            .await
            .unwrap()
            .inserted_id
            .unwrap();

        let first = desk.resolve(&listing_id, &report_id).await.unwrap();
        assert_eq!(first.listing.deleted_count, 1);
        assert_eq!(first.report.deleted_count, 1);
        assert_eq!(store.count(Collection::Products, &Filter::all()).await.unwrap(), 0);

        let second = desk.resolve(&listing_id, &report_id).await.unwrap();
        assert!(!second.listing.found());
        assert!(!second.report.found());
    }
}
