//! Error types for form aggregation and referral assembly

use thiserror::Error;

/// Protocol and configuration failures
///
/// Invalid or dirty content is never an error; it is reported through
/// field status instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("status received for unregistered field `{0}`")]
    UnregisteredField(String),

    #[error("channel for field `{channel}` delivered a status for `{received}`")]
    MisroutedStatus { channel: String, received: String },

    #[error("form is not submittable, blocking fields: {}", .blocking.join(", "))]
    NotSubmittable { blocking: Vec<String> },

    #[error("unknown field `{0}`")]
    UnknownField(String),
}
