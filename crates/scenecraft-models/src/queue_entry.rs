//! `JobQueue` entry: the dispatch record backing lease/ack/nack semantics.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::JobId;
use crate::job::Priority;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueueEntry {
    pub job_id: JobId,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
    pub visible_after: DateTime<Utc>,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub attempts: u32,
}

impl QueueEntry {
    pub fn new(job_id: JobId, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            priority,
            enqueued_at: now,
            visible_after: now,
            lease_owner: None,
            lease_expires_at: None,
            attempts: 0,
        }
    }

    /// `lease_owner is set iff lease_expires_at > now()` invariant.
    pub fn has_active_lease(&self, now: DateTime<Utc>) -> bool {
        match (&self.lease_owner, self.lease_expires_at) {
            (Some(_), Some(expires)) => expires > now,
            _ => false,
        }
    }

    pub fn is_dispatchable(&self, now: DateTime<Utc>) -> bool {
        self.visible_after <= now && !self.has_active_lease(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_entry_is_dispatchable() {
        let now = Utc::now();
        let entry = QueueEntry::new(JobId::new(), Priority::Normal, now);
        assert!(entry.is_dispatchable(now));
    }

    #[test]
    fn leased_entry_is_not_dispatchable_until_expiry() {
        let now = Utc::now();
        let mut entry = QueueEntry::new(JobId::new(), Priority::Normal, now);
        entry.lease_owner = Some("worker-1".into());
        entry.lease_expires_at = Some(now + Duration::seconds(60));
        assert!(!entry.is_dispatchable(now));
        assert!(entry.is_dispatchable(now + Duration::seconds(61)));
    }
}
