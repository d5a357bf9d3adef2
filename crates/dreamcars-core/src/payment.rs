//! # Payments
//!
//! Charge intents and payment confirmation.
//!
//! Confirmation issues three independent writes in order:
//!
//! 1. append the payment record
//! 2. booking `unpaid → paid` with the transaction id
//! 3. listing `unsold → sold`
//!
//! They are not atomic. If a later write fails or matches nothing, the
//! earlier ones stay in place and no reconciliation is attempted. Two
//! confirmations for the same booking are not deduplicated and both append a
//! payment record.

use crate::booking::BookingLedger;
use crate::error::{MarketError, MarketResult};
use crate::listing::ListingCatalog;
use crate::money::{ChargeAmount, Currency};
use crate::store::{find_as, to_document, Collection, Filter, InsertOutcome, SharedStore};
use crate::strategy::{PaymentIntent, PaymentStrategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Append-only record of a confirmed payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub booking_id: String,
    pub listing_id: String,
    pub transaction_id: String,
    pub amount: f64,
    pub payer_email: String,
    pub created_at: DateTime<Utc>,
}

/// Client-submitted confirmation after the provider accepted the charge
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    pub booking_id: String,
    pub listing_id: String,
    pub transaction_id: String,
    pub price: f64,
}

#[derive(Clone)]
pub struct PaymentLedger {
    store: SharedStore,
    bookings: BookingLedger,
    listings: ListingCatalog,
    currency: Currency,
}

impl PaymentLedger {
    pub fn new(store: SharedStore, currency: Currency) -> Self {
        Self {
            bookings: BookingLedger::new(store.clone()),
            listings: ListingCatalog::new(store.clone()),
            store,
            currency,
        }
    }

    /// Request a provider charge intent for `price × 100` minor units in the
    /// ledger's currency.
    #[instrument(skip(self, strategy), fields(provider = strategy.provider_name()))]
    pub async fn create_intent(
        &self,
        strategy: &dyn PaymentStrategy,
        price: f64,
    ) -> MarketResult<PaymentIntent> {
        if !price.is_finite() || price <= 0.0 {
            return Err(MarketError::InvalidRequest(format!(
                "price must be positive, got {}",
                price
            )));
        }

        let amount = ChargeAmount::from_price(price, self.currency);
        info!(%amount, "Requesting charge intent");
        strategy.create_intent(amount).await
    }

    /// Record a payment and move the booking to paid and the listing to sold.
    #[instrument(skip(self, confirmation), fields(booking = %confirmation.booking_id, listing = %confirmation.listing_id))]
    pub async fn confirm(
        &self,
        payer_email: &str,
        confirmation: PaymentConfirmation,
    ) -> MarketResult<InsertOutcome> {
        if confirmation.transaction_id.trim().is_empty() {
            return Err(MarketError::InvalidRequest(
                "transaction_id is required".to_string(),
            ));
        }

        let record = PaymentRecord {
            id: Uuid::new_v4().to_string(),
            booking_id: confirmation.booking_id.clone(),
            listing_id: confirmation.listing_id.clone(),
            transaction_id: confirmation.transaction_id.clone(),
            amount: confirmation.price,
            payer_email: payer_email.to_string(),
            created_at: Utc::now(),
        };

        let inserted = self
            .store
            .insert_one(Collection::Payments, to_document(&record)?)
            .await?;

        let booking = self
            .bookings
            .mark_paid(&confirmation.booking_id, &confirmation.transaction_id)
            .await?;
        if booking.is_noop() {
            warn!("payment recorded but no unpaid booking matched");
        }

        let listing = self.listings.mark_sold(&confirmation.listing_id).await?;
        if listing.is_noop() {
            warn!("payment recorded but listing not found");
        }

        info!(transaction = %confirmation.transaction_id, "payment confirmed");
        Ok(inserted)
    }

    pub async fn for_booking(&self, booking_id: &str) -> MarketResult<Vec<PaymentRecord>> {
        find_as(
            self.store.as_ref(),
            Collection::Payments,
            &Filter::all().eq("booking_id", booking_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{BookingStatus, NewBooking};
    use crate::listing::{ListingStatus, NewListing};
    use crate::memory::MemoryStore;
    use crate::user::{Registration, Role, UserDirectory};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records the last amount it was asked to charge
    #[derive(Default)]
    struct RecordingStrategy {
        last: Mutex<Option<ChargeAmount>>,
    }

    #[async_trait]
    impl PaymentStrategy for RecordingStrategy {
        async fn create_intent(&self, amount: ChargeAmount) -> MarketResult<PaymentIntent> {
            *self.last.lock().unwrap() = Some(amount);
            Ok(PaymentIntent {
                intent_id: "pi_test".to_string(),
                client_secret: "pi_test_secret_abc".to_string(),
                amount,
                provider: "recording".to_string(),
            })
        }

        fn provider_name(&self) -> &'static str {
            "recording"
        }
    }

    struct Fixture {
        store: SharedStore,
        payments: PaymentLedger,
        bookings: BookingLedger,
        listings: ListingCatalog,
        booking_id: String,
        listing_id: String,
    }

    async fn fixture() -> Fixture {
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
            .create(&seller, NewListing::new("suv", "RAV4 2019", 21000.0))
            .await
            .unwrap()
            .inserted_id
            .unwrap();

        let bookings = BookingLedger::new(store.clone());
        let booking_id = bookings
            .create(&buyer, NewBooking::new(&listing_id))
            .await
            .unwrap()
            .inserted_id
            .unwrap();

        Fixture {
            payments: PaymentLedger::new(store.clone(), Currency::Usd),
            store,
            bookings,
            listings,
            booking_id,
            listing_id,
        }
    }

    fn confirmation(f: &Fixture, txn: &str) -> PaymentConfirmation {
        PaymentConfirmation {
            booking_id: f.booking_id.clone(),
            listing_id: f.listing_id.clone(),
            transaction_id: txn.to_string(),
            price: 21000.0,
        }
    }

    #[tokio::test]
    async fn test_confirm_transitions_booking_and_listing() {
        let f = fixture().await;

        let outcome = f.payments.confirm("bob@cars.io", confirmation(&f, "txn_42")).await.unwrap();
        assert!(outcome.acknowledged);

        let booking = f.bookings.get(&f.booking_id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Paid);
        assert_eq!(booking.transaction_id.as_deref(), Some("txn_42"));

        let listing = f.listings.get(&f.listing_id).await.unwrap();
        assert_eq!(listing.status, ListingStatus::Sold);

        let records = f.payments.for_booking(&f.booking_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].listing_id, f.listing_id);
        assert_eq!(records[0].transaction_id, "txn_42");
    }

    #[tokio::test]
    async fn test_duplicate_confirmation_appends_again() {
        let f = fixture().await;
        f.payments.confirm("bob@cars.io", confirmation(&f, "txn_1")).await.unwrap();
        f.payments.confirm("bob@cars.io", confirmation(&f, "txn_2")).await.unwrap();

        assert_eq!(f.store.count(Collection::Payments, &Filter::all()).await.unwrap(), 2);
        // first transaction id sticks; paid is terminal
        let booking = f.bookings.get(&f.booking_id).await.unwrap();
        assert_eq!(booking.transaction_id.as_deref(), Some("txn_1"));
    }

    #[tokio::test]
    async fn test_partial_confirmation_is_accepted() {
        let f = fixture().await;
        let mut unknown = confirmation(&f, "txn_9");
        unknown.listing_id = "missing".to_string();

        f.payments.confirm("bob@cars.io", unknown).await.unwrap();
        assert_eq!(f.bookings.get(&f.booking_id).await.unwrap().status, BookingStatus::Paid);
        assert_eq!(f.store.count(Collection::Payments, &Filter::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_confirm_requires_transaction_id() {
        let f = fixture().await;
        let err = f.payments.confirm("bob@cars.io", confirmation(&f, "  ")).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(f.store.count(Collection::Payments, &Filter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_intent_amount_in_minor_units() {
        let f = fixture().await;
        let strategy = RecordingStrategy::default();

        let intent = f.payments.create_intent(&strategy, 250.75).await.unwrap();
        assert_eq!(intent.client_secret, "pi_test_secret_abc");

        let seen = strategy.last.lock().unwrap().unwrap();
        assert_eq!(seen, ChargeAmount::from_minor_units(25075, Currency::Usd));

        // no record is created for an intent
        assert_eq!(f.store.count(Collection::Payments, &Filter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_intent_amount_is_hundredths_in_any_currency() {
        let f = fixture().await;
        let strategy = RecordingStrategy::default();
        let payments = PaymentLedger::new(f.store.clone(), Currency::Gbp);

        payments.create_intent(&strategy, 1000.0).await.unwrap();

        let seen = strategy.last.lock().unwrap().unwrap();
        assert_eq!(seen.minor_units, 100_000);
        assert_eq!(seen.currency, Currency::Gbp);
    }

    #[tokio::test]
    async fn test_intent_rejects_bad_price() {
        let f = fixture().await;
        let strategy = RecordingStrategy::default();
        assert!(f.payments.create_intent(&strategy, 0.0).await.is_err());
        assert!(f.payments.create_intent(&strategy, f64::NAN).await.is_err());
        assert!(strategy.last.lock().unwrap().is_none());
    }
}
