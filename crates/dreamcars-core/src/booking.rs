//! # Bookings
//!
//! A buyer's reservation against a listing. State machine:
//!
//! ```text
//! unpaid ──(payment confirmation)──► paid   (terminal)
//! ```

use crate::error::{MarketError, MarketResult};
use crate::listing::ListingCatalog;
use crate::store::{
    fields, find_as, find_one_as, to_document, Collection, Filter, InsertOutcome, SharedStore,
    UpdateOutcome,
};
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

const BUYER_FIELD: &str = "buyer_email";
const STATUS_FIELD: &str = "status";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Unpaid,
    Paid,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Unpaid => "unpaid",
            BookingStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub buyer_email: String,
    #[serde(default)]
    pub buyer_name: String,
    pub listing_id: String,
    #[serde(default)]
    pub listing_name: String,
    /// Listing price at booking time
    pub price: f64,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub meeting_location: String,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Booking creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub listing_id: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub meeting_location: String,
}

impl NewBooking {
    pub fn new(listing_id: impl Into<String>) -> Self {
        Self {
            listing_id: listing_id.into(),
            phone: String::new(),
            meeting_location: String::new(),
        }
    }
}

#[derive(Clone)]
pub struct BookingLedger {
    store: SharedStore,
    listings: ListingCatalog,
}

impl BookingLedger {
    pub fn new(store: SharedStore) -> Self {
        Self {
            listings: ListingCatalog::new(store.clone()),
            store,
        }
    }

    /// Reserve a listing for `buyer`. The listing must exist and be unsold.
    pub async fn create(&self, buyer: &User, new: NewBooking) -> MarketResult<InsertOutcome> {
        let listing = self.listings.get(&new.listing_id).await?;
        if listing.is_sold() {
            return Err(MarketError::InvalidRequest(format!(
                "listing {} is already sold",
                listing.id
            )));
        }

        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            buyer_email: buyer.email.clone(),
            buyer_name: buyer.name.clone(),
            listing_id: listing.id,
            listing_name: listing.name,
            price: listing.resale_price,
            phone: new.phone,
            meeting_location: new.meeting_location,
            status: BookingStatus::Unpaid,
            transaction_id: None,
            created_at: Utc::now(),
        };

        info!(id = %booking.id, buyer = %booking.buyer_email, listing = %booking.listing_id, "booking created");
        self.store
            .insert_one(Collection::Bookings, to_document(&booking)?)
            .await
    }

    pub async fn for_buyer(&self, buyer_email: &str) -> MarketResult<Vec<Booking>> {
        find_as(
            self.store.as_ref(),
            Collection::Bookings,
            &Filter::all().eq(BUYER_FIELD, buyer_email),
        )
        .await
    }

    pub async fn get(&self, id: &str) -> MarketResult<Booking> {
        find_one_as(self.store.as_ref(), Collection::Bookings, &Filter::by_id(id))
            .await?
            .ok_or_else(|| MarketError::not_found("Booking", id))
    }

    /// `unpaid → paid`. A booking that is already paid does not match.
    pub async fn mark_paid(&self, id: &str, transaction_id: &str) -> MarketResult<UpdateOutcome> {
        self.store
            .update_one(
                Collection::Bookings,
                &Filter::by_id(id).eq(STATUS_FIELD, BookingStatus::Unpaid.as_str()),
                fields(json!({
                    STATUS_FIELD: BookingStatus::Paid.as_str(),
                    "transaction_id": transaction_id,
                })),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::NewListing;
    use crate::memory::MemoryStore;
    use crate::user::{Registration, Role, UserDirectory};
    use std::sync::Arc;

    async fn setup() -> (BookingLedger, ListingCatalog, User, String) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let users = UserDirectory::new(store.clone());
        users
            .register(Registration::new("sue@cars.io", "Sue", Role::Seller))
            .await
            .unwrap();
        users
            .register(Registration::new("bob@cars.io", "Bob", Role::Buyer))
            .await
            .unwrap();
        let seller = users.find_by_email("sue@cars.io").await.unwrap().unwrap();
        let buyer = users.find_by_email("bob@cars.io").await.unwrap().unwrap();

        let listings = ListingCatalog::new(store.clone());
        let listing_id = listings
            .create(&seller, NewListing::new("sedan", "Accord 2018", 14000.0))
            .await
            .unwrap()
            .inserted_id
            .unwrap();

        (BookingLedger::new(store), listings, buyer, listing_id)
    }

    #[tokio::test]
    async fn test_create_snapshots_listing() {
        let (bookings, _, buyer, listing_id) = setup().await;
        let id = bookings
            .create(&buyer, NewBooking::new(&listing_id))
            .await
            .unwrap()
            .inserted_id
            .unwrap();

        let booking = bookings.get(&id).await.unwrap();
        assert_eq!(booking.buyer_email, "bob@cars.io");
        assert_eq!(booking.listing_name, "Accord 2018");
        assert_eq!(booking.price, 14000.0);
        assert_eq!(booking.status, BookingStatus::Unpaid);
        assert!(booking.transaction_id.is_none());

        assert_eq!(bookings.for_buyer("bob@cars.io").await.unwrap().len(), 1);
        assert!(bookings.for_buyer("sue@cars.io").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_missing_or_sold_listing() {
        let (bookings, listings, buyer, listing_id) = setup().await;

        let missing = bookings.create(&buyer, NewBooking::new("nope")).await.unwrap_err();
        assert_eq!(missing.status_code(), 404);

        listings.mark_sold(&listing_id).await.unwrap();
        let sold = bookings.create(&buyer, NewBooking::new(&listing_id)).await.unwrap_err();
        assert_eq!(sold.status_code(), 400);
    }

    #[tokio::test]
    async fn test_mark_paid_is_terminal() {
        let (bookings, _, buyer, listing_id) = setup().await;
        let id = bookings
            .create(&buyer, NewBooking::new(&listing_id))
            .await
            .unwrap()
            .inserted_id
            .unwrap();

        assert_eq!(bookings.mark_paid(&id, "txn_1").await.unwrap().modified_count, 1);
        assert!(bookings.mark_paid(&id, "txn_2").await.unwrap().is_noop());

        let booking = bookings.get(&id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Paid);
        assert_eq!(booking.transaction_id.as_deref(), Some("txn_1"));
    }
}
