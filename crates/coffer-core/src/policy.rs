//! Eviction policies.
//!
//! A policy is a pure predicate over a record's tracking metadata. Policies
//! are persisted next to the record as a small JSON descriptor:
//!
//! ```json
//! {"type":"composite","operator":"and","policies":[
//!     {"type":"time_based","seconds":3600},
//!     {"type":"access_count","max":5}
//! ]}
//! ```
//!
//! Descriptors that fail to parse are treated as "no policy", so a corrupt
//! descriptor never blocks access to a secret.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use coffer_storage::SecretRecord;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a composite policy combines its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeOperator {
    /// Evict when every child evicts (true for no children).
    And,
    /// Evict when any child evicts (false for no children).
    #[default]
    Or,
}

impl fmt::Display for CompositeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
        }
    }
}

/// An eviction policy tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Evict once the record is at least `seconds` old.
    TimeBased { seconds: u64 },
    /// Evict once the record has been read at least `max` times.
    AccessCount { max: u64 },
    /// Evict once the record has gone unread for `seconds` after its last
    /// read. Never-read records are kept.
    AccessTime { seconds: u64 },
    /// Combine child policies.
    Composite {
        #[serde(default)]
        operator: CompositeOperator,
        #[serde(default)]
        policies: Vec<EvictionPolicy>,
    },
}

/// The metadata a policy is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryState {
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub access_count: u64,
}

impl From<&SecretRecord> for EntryState {
    fn from(record: &SecretRecord) -> Self {
        Self {
            created_at: record.created_at,
            last_accessed_at: record.last_accessed_at,
            access_count: record.access_count,
        }
    }
}

impl EvictionPolicy {
    #[must_use]
    pub fn time_based(seconds: u64) -> Self {
        Self::TimeBased { seconds }
    }

    #[must_use]
    pub fn access_count(max: u64) -> Self {
        Self::AccessCount { max }
    }

    #[must_use]
    pub fn access_time(seconds: u64) -> Self {
        Self::AccessTime { seconds }
    }

    /// Composite that evicts when every child evicts.
    #[must_use]
    pub fn all(policies: impl IntoIterator<Item = EvictionPolicy>) -> Self {
        Self::Composite {
            operator: CompositeOperator::And,
            policies: policies.into_iter().collect(),
        }
    }

    /// Composite that evicts when any child evicts.
    #[must_use]
    pub fn any(policies: impl IntoIterator<Item = EvictionPolicy>) -> Self {
        Self::Composite {
            operator: CompositeOperator::Or,
            policies: policies.into_iter().collect(),
        }
    }

    /// Whether an entry in `state` should be evicted at `now`.
    ///
    /// Time thresholds are inclusive: an entry exactly `seconds` old is
    /// evicted.
    pub fn should_evict(&self, state: &EntryState, now: DateTime<Utc>) -> bool {
        match self {
            Self::TimeBased { seconds } => elapsed_at_least(state.created_at, now, *seconds),
            Self::AccessCount { max } => state.access_count >= *max,
            Self::AccessTime { seconds } => state
                .last_accessed_at
                .is_some_and(|at| elapsed_at_least(at, now, *seconds)),
            Self::Composite { operator, policies } => match operator {
                CompositeOperator::And => policies.iter().all(|p| p.should_evict(state, now)),
                CompositeOperator::Or => policies.iter().any(|p| p.should_evict(state, now)),
            },
        }
    }

    /// Stable diagnostic name, e.g. `composite_and_time_based_access_count`.
    pub fn name(&self) -> String {
        match self {
            Self::TimeBased { .. } => "time_based".to_owned(),
            Self::AccessCount { .. } => "access_count".to_owned(),
            Self::AccessTime { .. } => "access_time".to_owned(),
            Self::Composite { operator, policies } => {
                let children: Vec<String> = policies.iter().map(Self::name).collect();
                format!("composite_{operator}_{}", children.join("_"))
            }
        }
    }

    /// Encode the policy as a JSON descriptor.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if encoding fails.
    pub fn to_descriptor(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a stored descriptor, or `None` if it is malformed.
    pub fn from_descriptor(descriptor: &str) -> Option<Self> {
        match serde_json::from_str(descriptor) {
            Ok(policy) => Some(policy),
            Err(e) => {
                warn!(error = %e, "ignoring malformed eviction policy descriptor");
                None
            }
        }
    }
}

fn elapsed_at_least(since: DateTime<Utc>, now: DateTime<Utc>, seconds: u64) -> bool {
    // A threshold too large for TimeDelta can never be reached.
    let Some(threshold) = i64::try_from(seconds).ok().and_then(TimeDelta::try_seconds) else {
        return false;
    };
    now.signed_duration_since(since) >= threshold
}
