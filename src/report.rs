use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// End-of-run tally. First-try and after-retry successes are counted
/// separately; `per_client` tracks how many documents each client folder
/// received during this run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_considered: usize,
    pub skipped_checkpointed: usize,
    pub succeeded: u32,
    pub retry_succeeded: u32,
    pub failed: u32,
    pub per_client: BTreeMap<String, u32>,
    pub failed_list_path: Option<String>,
}

impl RunSummary {
    pub fn processed(&self) -> u32 {
        self.succeeded + self.retry_succeeded
    }
}
