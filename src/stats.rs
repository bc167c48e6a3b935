// ABOUTME: Per-query execution statistics recorder
// ABOUTME: Accumulates invocation counts and cumulative wall time per query or statement name
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Accumulated statistics for one query or statement name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsEntry {
    /// Number of executions observed
    pub counter: u64,
    /// Cumulative wall time in seconds
    pub total_time: f64,
}

/// Records invocation counts and cumulative execution time per name.
///
/// Entries grow with the number of distinct names for the process lifetime;
/// there is no eviction and no reset. Mutation is synchronized, so
/// concurrent recordings never lose updates.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    entries: RwLock<HashMap<String, StatsEntry>>,
}

impl StatsRecorder {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one execution of `name` taking `elapsed` wall time
    pub async fn record(&self, name: &str, elapsed: Duration) {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(name.to_string()).or_default();
        entry.counter += 1;
        entry.total_time += elapsed.as_secs_f64();
    }

    /// Read-only snapshot of all entries for diagnostics
    pub async fn snapshot(&self) -> HashMap<String, StatsEntry> {
        self.entries.read().await.clone()
    }
}
