//! Referral submission form

mod form;
mod submission;

pub use form::{
    ReferralDraft, ReferralForm, UrgencyLevel, BASE_FIELDS, CONTEXT, PRIOR_WORK, QUESTION,
    URGENCY_EXPLANATION,
};
pub use submission::{JsonSink, SubmissionSink};

#[cfg(test)]
pub use submission::MockSubmissionSink;
