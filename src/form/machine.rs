//! Per-field state machine
//!
//! A field machine tracks two orthogonal lifecycles over the same value:
//! validation (is the current value acceptable) and cleanliness (has the
//! cleaning pass run since the last raw edit). Every accepted transition
//! pushes one complete [`FieldStatus`] onto the machine's outbound channel
//! before `send` returns.

use std::fmt;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::rules::{Cleaner, NonEmpty, TrimWhitespace, Validity};
use super::value::{FieldStatus, FieldValue};

/// Validation axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// No value yet
    #[default]
    Unvalidated,
    Invalid,
    Valid,
}

/// Cleanliness axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cleanliness {
    #[default]
    Dirty,
    Clean,
}

/// Current position on both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldState {
    pub validation: Validation,
    pub cleanliness: Cleanliness,
}

/// Events accepted by a field machine
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEvent {
    /// Raw edit from the editing surface
    ContentChanged(FieldValue),
    /// Arms a cleaning pass (blur, explicit request)
    CleanRequested,
    /// Result of the armed cleaning pass
    CleanCompleted(FieldValue),
}

pub struct FieldMachine {
    name: String,
    value: Option<FieldValue>,
    state: FieldState,
    clean_pending: bool,
    validity: Box<dyn Validity>,
    cleaner: Box<dyn Cleaner>,
    outbox: Option<UnboundedSender<FieldStatus>>,
}

impl FieldMachine {
    /// Create a machine reporting to `outbox`, with the non-empty predicate
    /// and whitespace trimming as defaults
    pub fn new(name: impl Into<String>, outbox: UnboundedSender<FieldStatus>) -> Self {
        Self {
            name: name.into(),
            value: None,
            state: FieldState::default(),
            clean_pending: false,
            validity: Box::new(NonEmpty),
            cleaner: Box::new(TrimWhitespace),
            outbox: Some(outbox),
        }
    }

    /// Replace the validity predicate
    pub fn with_validity(mut self, validity: impl Validity + 'static) -> Self {
        self.validity = Box::new(validity);
        self
    }

    /// Replace the cleaning transformation
    pub fn with_cleaner(mut self, cleaner: impl Cleaner + 'static) -> Self {
        self.cleaner = Box::new(cleaner);
        self
    }

    /// Field name carried by every snapshot
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current position on both axes
    pub fn state(&self) -> FieldState {
        self.state
    }

    /// Current value, if any edit has happened
    pub fn value(&self) -> Option<&FieldValue> {
        self.value.as_ref()
    }

    /// Whether a cleaning pass is armed
    pub fn is_clean_pending(&self) -> bool {
        self.clean_pending
    }

    /// True once the receiving side has gone away
    pub fn is_detached(&self) -> bool {
        self.outbox.is_none()
    }

    /// Snapshot of the complete current state
    pub fn status(&self) -> FieldStatus {
        FieldStatus {
            field_name: self.name.clone(),
            serialized_data: self
                .value
                .as_ref()
                .map(FieldValue::serialized)
                .unwrap_or_default(),
            is_clean: self.state.cleanliness == Cleanliness::Clean,
            is_valid: self.state.validation == Validation::Valid,
        }
    }

    /// Apply an event. Returns false when the event is not accepted in the
    /// current state, in which case nothing changes and nothing is emitted.
    pub fn send(&mut self, event: FieldEvent) -> bool {
        match event {
            FieldEvent::ContentChanged(value) => {
                // A pass armed for the previous content no longer applies
                self.clean_pending = false;
                self.state.cleanliness = Cleanliness::Dirty;
                self.set_value(value);
                self.emit();
                true
            }
            FieldEvent::CleanRequested => {
                self.clean_pending = true;
                true
            }
            FieldEvent::CleanCompleted(value) => {
                if !self.clean_pending {
                    debug!(field = %self.name, "ignoring clean completion without a pending pass");
                    return false;
                }
                self.clean_pending = false;
                self.state.cleanliness = Cleanliness::Clean;
                self.set_value(value);
                self.emit();
                true
            }
        }
    }

    /// Raw edit shorthand
    pub fn change(&mut self, value: FieldValue) -> bool {
        self.send(FieldEvent::ContentChanged(value))
    }

    /// Run a full cleaning pass with this field's cleaner
    pub fn clean(&mut self) -> bool {
        self.send(FieldEvent::CleanRequested);
        let current = self.value.clone().unwrap_or_default();
        let cleaned = self.cleaner.clean(&current);
        self.send(FieldEvent::CleanCompleted(cleaned))
    }

    fn set_value(&mut self, value: FieldValue) {
        self.state.validation = if self.validity.is_valid(&value) {
            Validation::Valid
        } else {
            Validation::Invalid
        };
        self.value = Some(value);
    }

    fn emit(&mut self) {
        let status = self.status();
        debug!(
            field = %self.name,
            clean = status.is_clean,
            valid = status.is_valid,
            "field transition"
        );
        if let Some(outbox) = &self.outbox {
            if outbox.send(status).is_err() {
                warn!(field = %self.name, "status receiver dropped, field detached");
                self.outbox = None;
            }
        }
    }
}

impl fmt::Debug for FieldMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMachine")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("state", &self.state)
            .field("clean_pending", &self.clean_pending)
            .field("detached", &self.is_detached())
            .finish_non_exhaustive()
    }
}
