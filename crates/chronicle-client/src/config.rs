//! Journal client configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a [`ProjectJournal`](crate::journal::ProjectJournal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Quiet window before a realtime-triggered reconciliation fetch runs.
    /// Bursts of pushes coalesce into one fetch.
    #[serde(default = "default_reconcile_debounce_ms")]
    pub reconcile_debounce_ms: u64,

    /// Whether realtime events schedule reconciliation fetches at all.
    /// Disabled in tests that script their own fetches.
    #[serde(default = "default_true")]
    pub auto_reconcile: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            reconcile_debounce_ms: default_reconcile_debounce_ms(),
            auto_reconcile: default_true(),
        }
    }
}

const fn default_reconcile_debounce_ms() -> u64 {
    400
}

const fn default_true() -> bool {
    true
}
