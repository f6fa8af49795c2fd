//! Central-ledger mirroring policy.
//!
//! Which department scopes mirror into main, and which kinds collapse into
//! one voucher per day, is configuration, not divergent code paths.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::kind::TxnKind;
use crate::scope::Scope;

/// Mirroring behavior for one department scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorPolicy {
    /// Whether postings in this scope produce central-ledger vouchers at all.
    pub enabled: bool,
    /// Kinds whose same-day postings merge into a single voucher instead of
    /// one voucher per posting.
    pub aggregate_daily: Vec<TxnKind>,
}

impl MirrorPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            aggregate_daily: Vec::new(),
        }
    }

    /// Mirror every posting, one voucher each.
    pub fn mirror_all() -> Self {
        Self {
            enabled: true,
            aggregate_daily: Vec::new(),
        }
    }

    pub fn with_daily_aggregation(mut self, kinds: impl IntoIterator<Item = TxnKind>) -> Self {
        self.aggregate_daily = kinds.into_iter().collect();
        self
    }

    pub fn aggregates(&self, kind: TxnKind) -> bool {
        self.enabled && self.aggregate_daily.contains(&kind)
    }
}

/// Per-scope mirroring configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    policies: HashMap<Scope, MirrorPolicy>,
}

impl MirrorConfig {
    /// No scope mirrors.
    pub fn none() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    pub fn with_policy(mut self, scope: Scope, policy: MirrorPolicy) -> Self {
        self.policies.insert(scope, policy);
        self
    }

    /// Policy for a scope; scopes without an explicit entry do not mirror.
    pub fn policy(&self, scope: Scope) -> MirrorPolicy {
        self.policies
            .get(&scope)
            .cloned()
            .unwrap_or_else(MirrorPolicy::disabled)
    }

    pub fn mirrors(&self, scope: Scope) -> bool {
        self.policy(scope).enabled
    }
}

impl Default for MirrorConfig {
    /// The observed production policy: hospital mirrors everything and
    /// collapses same-day income into one voucher; the other departments do
    /// not mirror. Whether they should is a pending business decision, so it
    /// stays a config change rather than a code change.
    fn default() -> Self {
        Self::none().with_policy(
            Scope::Hospital,
            MirrorPolicy::mirror_all().with_daily_aggregation([TxnKind::Income]),
        )
    }
}
