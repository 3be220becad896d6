//! Air Quality API Protocol
//!
//! Wire-level types shared between the aq-api service and its data crates:
//! the error taxonomy with HTTP status mapping, structured error response
//! bodies, and serde helpers for JSON quirks (non-finite floats serialize
//! as `null` so a stray NaN in the dataset never breaks a response).

pub mod errors;
pub mod json;
pub mod responses;

pub use errors::ApiError;
pub use responses::{DateRange, ErrorResponse, HealthRisk};

/// Timezone identifier every timestamp in the API is normalized to.
pub const TIMEZONE_NAME: &str = "Asia/Manila";

/// The pseudo-city selecting every monitored city at once.
pub const ALL_CITIES: &str = "all";
