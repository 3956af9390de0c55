//! Referral forms
//!
//! Field-level state machines for rich-text form inputs and the aggregator
//! that turns their status snapshots into a submittable decision.

pub mod config;
pub mod error;
pub mod form;
pub mod referral;

pub use config::FormConfig;
pub use error::FormError;
