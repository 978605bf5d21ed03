use chrono::Utc;
use uuid::Uuid;

/// Generate a display reference for a purchase attempt: `TXN`, the UTC
/// timestamp in milliseconds, then eight uppercase hex characters.
pub fn generate_transaction_reference() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();
    format!("TXN{}{}", Utc::now().timestamp_millis(), suffix)
}
