//! Billing integration for VTU (virtual top-up) purchases.
//!
//! `services::PurchaseService` records each attempt as a transaction,
//! calls the provider through `payments::providers::SmePlugGateway` and
//! settles the row as `success` or `failed`. The `proxy` module is the
//! credential-holding relay the gateway talks to.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod payments;
pub mod proxy;
pub mod services;

pub use database::repository::TransactionStore;
pub use database::transaction::{ServiceType, Transaction, TransactionStatus};
pub use error::{BillingError, BillingResult};
pub use payments::types::AirtimeRequest;
pub use services::{PurchaseError, PurchaseRequest, PurchaseService};
