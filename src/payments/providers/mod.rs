//! Concrete `VtuGateway` implementations

pub mod smeplug;

pub use smeplug::{GatewayConfig, SmePlugGateway};
