//! # dreamcars-core
//!
//! Core types and flows for the dreamcars vehicle marketplace.
//!
//! This crate provides:
//! - `DocumentStore` trait, `Filter` and write outcomes, plus the in-process `MemoryStore`
//! - `UserDirectory` (identity store) and `TokenService` (bearer tokens)
//! - `CategoryCatalog` and `ListingCatalog` for the vehicle catalog
//! - `BookingLedger` and `PaymentLedger` for reservations and payment confirmation
//! - `ReportDesk` for abuse reports
//! - `PaymentStrategy` trait for payment providers
//! - `MarketError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use dreamcars_core::{MemoryStore, PaymentLedger, Currency, PaymentConfirmation};
//!
//! let store: SharedStore = Arc::new(MemoryStore::new());
//! let payments = PaymentLedger::new(store.clone(), Currency::Usd);
//!
//! // Booking becomes paid, listing becomes sold
//! payments.confirm("buyer@example.com", confirmation).await?;
//! ```

pub mod booking;
pub mod category;
pub mod error;
pub mod listing;
pub mod memory;
pub mod money;
pub mod payment;
pub mod report;
pub mod store;
pub mod strategy;
pub mod token;
pub mod user;

// Re-exports for convenience
pub use booking::{Booking, BookingLedger, BookingStatus, NewBooking};
pub use category::{Category, CategoryCatalog, CategorySeed};
pub use error::{MarketError, MarketResult};
pub use listing::{Listing, ListingCatalog, ListingStatus, NewListing};
pub use memory::MemoryStore;
pub use money::{ChargeAmount, Currency};
pub use payment::{PaymentConfirmation, PaymentLedger, PaymentRecord};
pub use report::{NewReport, Report, ReportDesk, Resolution, ALREADY_REPORTED};
pub use store::{
    Collection, DeleteOutcome, Document, DocumentStore, Filter, InsertOutcome, SharedStore,
    UpdateOutcome,
};
pub use strategy::{BoxedPaymentStrategy, PaymentIntent, PaymentStrategy, PaymentStrategySelector};
pub use token::{Claims, TokenRejection, TokenService};
pub use user::{Registration, Role, User, UserDirectory, UserRemoval};
