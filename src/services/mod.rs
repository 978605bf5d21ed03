pub mod classify;
pub mod purchase;
pub mod reference;

pub use classify::{classify, FailureCategory, UserFacingError};
pub use purchase::{
    DataPurchase, ElectricityPurchase, PurchaseError, PurchaseRequest, PurchaseService,
};
