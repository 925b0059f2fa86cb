//! Cached query state as observed by subscribers

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::QueryKey;
use crate::domain::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of one cached query.
///
/// Invariants: `Success` implies `data` present and `error` absent; `Error`
/// implies `error` set while `data` remains the last-known-good value if one
/// exists, so views can keep showing stale data through a transient failure.
#[derive(Debug, Clone)]
pub struct QueryEntry {
    pub key: QueryKey,
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<ClientError>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Set by invalidation until the next successful fetch.
    pub is_stale: bool,
    pub subscriber_count: usize,
}

impl QueryEntry {
    pub(crate) fn idle(key: QueryKey) -> Self {
        Self {
            key,
            status: QueryStatus::Idle,
            data: None,
            error: None,
            last_fetched_at: None,
            is_stale: false,
            subscriber_count: 0,
        }
    }

    /// True until the first fetch for this key completes.
    pub fn never_fetched(&self) -> bool {
        self.last_fetched_at.is_none()
    }

    /// Deserializes the cached data into a typed model, if any is present.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, ClientError> {
        match &self.data {
            Some(value) => {
                let typed = serde_json::from_value(value.clone()).map_err(|e| {
                    ClientError::decode(format!("Failed to deserialize cached data: {}", e))
                })?;
                Ok(Some(typed))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::api::StudentListResponse;

    #[test]
    fn test_idle_entry_has_no_history() {
        let entry = QueryEntry::idle(QueryKey::new("students"));

        assert_eq!(entry.status, QueryStatus::Idle);
        assert!(entry.never_fetched());
        assert!(entry.data.is_none());
        assert!(entry.error.is_none());
        assert_eq!(entry.subscriber_count, 0);
    }

    #[test]
    fn test_data_as_typed_read() {
        let mut entry = QueryEntry::idle(QueryKey::new("students"));
        entry.data = Some(json!({"students": [{"name": "Alice"}], "total": 1}));

        let list: StudentListResponse = entry.data_as().unwrap().unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.students[0].name, "Alice");
    }

    #[test]
    fn test_data_as_empty() {
        let entry = QueryEntry::idle(QueryKey::new("students"));
        let list: Option<StudentListResponse> = entry.data_as().unwrap();
        assert!(list.is_none());
    }
}
