//! Immutable access log for privileged identifier operations.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in the vault access trail. Every resolve attempt produces an
/// event, granted or not; metadata never carries plaintext identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub outcome: AccessOutcome,
    pub metadata: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcome {
    Granted,
    Denied,
}

/// Append-only destination for [`AccessEvent`]s. Implementations must not
/// offer mutation or deletion of recorded events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AccessEvent);
}

/// In-memory sink for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AccessEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AccessEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for MemorySink {
    fn record(&self, event: AccessEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
