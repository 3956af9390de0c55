//! Form domain layer
//!
//! Field machines own the editing lifecycle of one value each and push
//! status snapshots over a channel; the aggregator merges those snapshots
//! into a single submittable decision and payload.

mod aggregator;
mod machine;
mod rules;
mod value;

pub use aggregator::FormAggregator;
pub use machine::{Cleanliness, FieldEvent, FieldMachine, FieldState, Validation};
pub use rules::{
    AllOf, Cleaner, Identity, MaxLength, MinLength, NonEmpty, TrimWhitespace, Validity,
};
pub use value::{FieldStatus, FieldValue};
