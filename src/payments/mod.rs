//! VTU provider integration
//!
//! The gateway client turns domain purchase requests into `{action, data}`
//! envelopes for the credentialed proxy and maps every failure onto
//! `BillingError`.

pub mod providers;
pub mod traits;
pub mod transport;
pub mod types;
