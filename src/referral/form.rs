//! Referral submission form built on field machines and the aggregator

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::submission::SubmissionSink;
use crate::config::FormConfig;
use crate::error::FormError;
use crate::form::{
    AllOf, FieldEvent, FieldMachine, FieldValue, FormAggregator, Identity, MaxLength, MinLength,
    NonEmpty,
};

pub const QUESTION: &str = "question";
pub const CONTEXT: &str = "context";
pub const PRIOR_WORK: &str = "prior_work";
pub const URGENCY_EXPLANATION: &str = "urgency_explanation";

/// Rich-text fields every referral carries
pub const BASE_FIELDS: [&str; 3] = [QUESTION, CONTEXT, PRIOR_WORK];

/// Urgency level picked by the requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyLevel {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    /// When set, the requester must explain the urgency
    pub requires_justification: bool,
}

/// Complete referral ready to hand to a [`SubmissionSink`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralDraft {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub urgency: Option<UrgencyLevel>,
    /// Field name to serialized rich-text document
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct ReferralForm {
    config: FormConfig,
    aggregator: FormAggregator,
    fields: BTreeMap<String, FieldMachine>,
    urgency: Option<UrgencyLevel>,
}

impl ReferralForm {
    pub fn new(config: FormConfig) -> Self {
        let mut form = Self {
            config,
            aggregator: FormAggregator::new(),
            fields: BTreeMap::new(),
            urgency: None,
        };
        for name in BASE_FIELDS {
            form.add_field(name);
        }
        form
    }

    /// Route a raw edit to `field`
    pub fn change(&mut self, field: &str, value: FieldValue) -> Result<bool, FormError> {
        self.send(field, FieldEvent::ContentChanged(value))
    }

    /// Run a cleaning pass on `field` (blur)
    pub fn clean(&mut self, field: &str) -> Result<bool, FormError> {
        let accepted = self.machine_mut(field)?.clean();
        self.aggregator.pump()?;
        Ok(accepted)
    }

    /// Deliver any field event, then merge whatever the machine emitted
    pub fn send(&mut self, field: &str, event: FieldEvent) -> Result<bool, FormError> {
        let accepted = self.machine_mut(field)?.send(event);
        self.aggregator.pump()?;
        Ok(accepted)
    }

    /// Pick an urgency level, adding or removing the explanation field
    pub fn set_urgency(&mut self, level: UrgencyLevel) {
        if level.requires_justification {
            self.add_field(URGENCY_EXPLANATION);
        } else {
            self.remove_field(URGENCY_EXPLANATION);
        }
        info!(
            urgency = %level.name,
            requires_justification = level.requires_justification,
            "urgency selected"
        );
        self.urgency = Some(level);
    }

    pub fn urgency(&self) -> Option<&UrgencyLevel> {
        self.urgency.as_ref()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldMachine> {
        self.fields.get(name)
    }

    pub fn is_submittable(&self) -> bool {
        self.aggregator.is_submittable()
    }

    pub fn blocking_fields(&self) -> Vec<String> {
        self.aggregator.blocking_fields()
    }

    /// Partial payload of the fields that are currently ready
    pub fn payload(&self) -> BTreeMap<String, String> {
        self.aggregator.collect_payload()
    }

    /// Assemble a draft; fails while any field blocks submission
    pub fn draft(&self) -> Result<ReferralDraft, FormError> {
        let fields = self.aggregator.collect_complete_payload()?;
        Ok(ReferralDraft {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            urgency: self.urgency.clone(),
            fields,
        })
    }

    /// Hand the draft to `sink` and start over with an empty form
    ///
    /// The form keeps its state when the sink fails.
    pub async fn submit(&mut self, sink: &mut dyn SubmissionSink) -> anyhow::Result<String> {
        let draft = self.draft()?;
        let id = sink.submit(&draft).await?;
        info!(referral = %id, fields = draft.fields.len(), "referral submitted");
        self.reset();
        Ok(id)
    }

    /// Abandon every edit
    pub fn reset(&mut self) {
        self.aggregator.clear();
        self.fields.clear();
        self.urgency = None;
        for name in BASE_FIELDS {
            self.add_field(name);
        }
    }

    fn add_field(&mut self, name: &str) {
        if self.fields.contains_key(name) {
            return;
        }
        let outbox = self.aggregator.subscribe(name);
        let mut machine = FieldMachine::new(name, outbox).with_validity(self.validity_for(name));
        if !self.config.trim_on_clean() {
            machine = machine.with_cleaner(Identity);
        }
        self.fields.insert(name.to_string(), machine);
    }

    fn remove_field(&mut self, name: &str) {
        if self.fields.remove(name).is_some() {
            self.aggregator.unregister_field(name);
        }
    }

    fn validity_for(&self, name: &str) -> AllOf {
        let mut rule = AllOf::new().with(NonEmpty);
        if name == QUESTION {
            if let Some(min) = self.config.min_question_length {
                rule = rule.with(MinLength(min));
            }
        }
        if let Some(max) = self.config.max_field_length {
            rule = rule.with(MaxLength(max));
        }
        rule
    }

    fn machine_mut(&mut self, field: &str) -> Result<&mut FieldMachine, FormError> {
        self.fields
            .get_mut(field)
            .ok_or_else(|| FormError::UnknownField(field.to_string()))
    }
}

impl Default for ReferralForm {
    fn default() -> Self {
        Self::new(FormConfig::default())
    }
}
