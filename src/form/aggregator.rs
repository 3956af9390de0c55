//! Form-wide aggregation of field status snapshots

use std::collections::BTreeMap;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::value::FieldStatus;
use crate::error::FormError;

/// Owns the last known status of every registered field
///
/// The submittable decision is always derived from the status map on read.
/// Merging is last-write-wins per field name, so deliveries for different
/// fields commute.
#[derive(Debug, Default)]
pub struct FormAggregator {
    statuses: BTreeMap<String, FieldStatus>,
    channels: BTreeMap<String, UnboundedReceiver<FieldStatus>>,
}

impl FormAggregator {
    /// Create an aggregator with no fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field the form must wait for. Returns false if it was
    /// already registered, in which case its status is kept.
    pub fn register_field(&mut self, field_name: &str) -> bool {
        if self.statuses.contains_key(field_name) {
            return false;
        }
        debug!(field = field_name, "field registered");
        self.statuses
            .insert(field_name.to_string(), FieldStatus::pending(field_name));
        true
    }

    /// Register the field and open a fresh status channel for it
    ///
    /// Any previous channel for the same field is dropped along with the
    /// snapshots still queued on it, and the field falls back to pending
    /// until the new sender reports.
    pub fn subscribe(&mut self, field_name: &str) -> UnboundedSender<FieldStatus> {
        if !self.register_field(field_name) {
            debug!(field = field_name, "field resubscribed, status reset");
            self.statuses
                .insert(field_name.to_string(), FieldStatus::pending(field_name));
        }
        let (tx, rx) = unbounded_channel();
        self.channels.insert(field_name.to_string(), rx);
        tx
    }

    /// Drop a field from the form. Queued snapshots from it are discarded.
    pub fn unregister_field(&mut self, field_name: &str) -> bool {
        self.channels.remove(field_name);
        let removed = self.statuses.remove(field_name).is_some();
        if removed {
            debug!(field = field_name, "field unregistered");
        }
        removed
    }

    /// Merge one snapshot, replacing the previous one for the same field
    pub fn receive_status(&mut self, status: FieldStatus) -> Result<(), FormError> {
        merge(&mut self.statuses, status)
    }

    /// Drain every subscribed channel without waiting. Returns the number of
    /// snapshots merged.
    ///
    /// Misrouted snapshots are dropped. Every channel is still drained and
    /// the well-routed snapshots merged before the first violation is
    /// returned.
    pub fn pump(&mut self) -> Result<usize, FormError> {
        let mut merged = 0;
        let mut violation = None;
        for (channel, rx) in self.channels.iter_mut() {
            loop {
                match rx.try_recv() {
                    Ok(status) if status.field_name != *channel => {
                        warn!(
                            channel = %channel,
                            received = %status.field_name,
                            "misrouted field status"
                        );
                        violation.get_or_insert(FormError::MisroutedStatus {
                            channel: channel.clone(),
                            received: status.field_name,
                        });
                    }
                    Ok(status) => match merge(&mut self.statuses, status) {
                        Ok(()) => merged += 1,
                        Err(err) => {
                            violation.get_or_insert(err);
                        }
                    },
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }
        match violation {
            Some(err) => Err(err),
            None => Ok(merged),
        }
    }

    /// True iff every registered field is clean and valid
    pub fn is_submittable(&self) -> bool {
        self.statuses.values().all(FieldStatus::is_ready)
    }

    /// Registered fields that are missing, dirty, or invalid, in name order
    pub fn blocking_fields(&self) -> Vec<String> {
        self.statuses
            .values()
            .filter(|status| !status.is_ready())
            .map(|status| status.field_name.clone())
            .collect()
    }

    /// Serialized data of every clean and valid field
    ///
    /// Fields that are not ready are left out, so the result is partial
    /// whenever [`is_submittable`](Self::is_submittable) is false. Use
    /// [`collect_complete_payload`](Self::collect_complete_payload) to fail
    /// instead.
    pub fn collect_payload(&self) -> BTreeMap<String, String> {
        self.statuses
            .values()
            .filter(|status| status.is_ready())
            .map(|status| (status.field_name.clone(), status.serialized_data.clone()))
            .collect()
    }

    /// Full payload, or the blocking fields when any field is not ready
    pub fn collect_complete_payload(&self) -> Result<BTreeMap<String, String>, FormError> {
        let blocking = self.blocking_fields();
        if !blocking.is_empty() {
            return Err(FormError::NotSubmittable { blocking });
        }
        Ok(self.collect_payload())
    }

    /// Last merged snapshot for `field_name`
    pub fn status(&self, field_name: &str) -> Option<&FieldStatus> {
        self.statuses.get(field_name)
    }

    pub fn is_registered(&self, field_name: &str) -> bool {
        self.statuses.contains_key(field_name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.statuses.keys().map(String::as_str)
    }

    /// Number of registered fields
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Forget every field and channel
    pub fn clear(&mut self) {
        self.channels.clear();
        self.statuses.clear();
    }
}

fn merge(
    statuses: &mut BTreeMap<String, FieldStatus>,
    status: FieldStatus,
) -> Result<(), FormError> {
    match statuses.get_mut(&status.field_name) {
        Some(slot) => {
            *slot = status;
            Ok(())
        }
        None => {
            warn!(field = %status.field_name, "status for unregistered field");
            Err(FormError::UnregisteredField(status.field_name))
        }
    }
}
