// ABOUTME: Scripted in-memory driver implementing the capability traits for tests
// ABOUTME: Provides canned responses keyed by SQL text plus connect/prepare/commit counters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::{ConnectOptions, Connection, Driver, DriverError, ExecResult, Row, Statement};
use crate::value::Value;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Build a [`Row`] from column/value pairs
#[must_use]
pub fn row(columns: &[(&str, Value)]) -> Row {
    columns
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.clone()))
        .collect()
}

#[derive(Default)]
struct MockState {
    responses: Mutex<HashMap<String, VecDeque<ExecResult>>>,
    journal: Mutex<Vec<String>>,
    bound_params: Mutex<Vec<Vec<Value>>>,
    connects: AtomicUsize,
    prepares: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    autocommit: AtomicBool,
    connect_delay: Mutex<Option<Duration>>,
    prepare_delay: Mutex<Option<Duration>>,
    connect_error: Mutex<Option<String>>,
    prepare_error: Mutex<Option<String>>,
    fail_commit: AtomicBool,
}

impl MockState {
    fn respond(&self, sql: &str) -> ExecResult {
        let mut responses = self.responses.lock().unwrap();
        if let Some(queue) = responses.get_mut(sql) {
            if queue.len() > 1 {
                if let Some(result) = queue.pop_front() {
                    return result;
                }
            } else if let Some(result) = queue.front() {
                // Last canned response repeats on subsequent calls
                return result.clone();
            }
        }
        // Default shape: empty result set for selects, clean no-op otherwise
        let mut result = ExecResult::default();
        if sql.trim_start().get(..6).is_some_and(|p| p.eq_ignore_ascii_case("SELECT")) {
            result.rows = Some(Vec::new());
        }
        result
    }
}

/// Scripted driver for exercising the data access layer without a server.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the layer owns another.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    /// Create a driver with no canned responses
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a canned response for an exact SQL text; queued responses are
    /// consumed in order and the last one repeats
    pub fn respond(&self, sql: &str, result: ExecResult) {
        self.state
            .responses
            .lock()
            .unwrap()
            .entry(sql.to_string())
            .or_default()
            .push_back(result);
    }

    /// Queue a row-set response for an exact SQL text
    pub fn respond_rows(&self, sql: &str, rows: Vec<Row>) {
        self.respond(
            sql,
            ExecResult {
                rows: Some(rows),
                ..ExecResult::default()
            },
        );
    }

    /// Make every connect attempt fail with the given message
    pub fn fail_connect(&self, message: &str) {
        *self.state.connect_error.lock().unwrap() = Some(message.to_string());
    }

    /// Make every prepare attempt fail with the given message
    pub fn fail_prepare(&self, message: &str) {
        *self.state.prepare_error.lock().unwrap() = Some(message.to_string());
    }

    /// Make every commit attempt fail
    pub fn fail_commit(&self) {
        self.state.fail_commit.store(true, Ordering::SeqCst);
    }

    /// Delay each connect, widening the race window in concurrency tests
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.state.connect_delay.lock().unwrap() = Some(delay);
    }

    /// Delay each prepare, widening the race window in concurrency tests
    pub fn set_prepare_delay(&self, delay: Duration) {
        *self.state.prepare_delay.lock().unwrap() = Some(delay);
    }

    /// Number of connections opened
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Number of statements prepared
    #[must_use]
    pub fn prepare_count(&self) -> usize {
        self.state.prepares.load(Ordering::SeqCst)
    }

    /// Number of commit calls
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.state.commits.load(Ordering::SeqCst)
    }

    /// Number of rollback calls
    #[must_use]
    pub fn rollback_count(&self) -> usize {
        self.state.rollbacks.load(Ordering::SeqCst)
    }

    /// Current autocommit mode as last toggled through a connection
    #[must_use]
    pub fn autocommit(&self) -> bool {
        self.state.autocommit.load(Ordering::SeqCst)
    }

    /// Every SQL text executed, in order (prepared statements log their
    /// statement text)
    #[must_use]
    pub fn journal(&self) -> Vec<String> {
        self.state.journal.lock().unwrap().clone()
    }

    /// Positional parameter lists passed to prepared-statement executions
    #[must_use]
    pub fn bound_params(&self) -> Vec<Vec<Value>> {
        self.state.bound_params.lock().unwrap().clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn connect(&self, _options: &ConnectOptions) -> Result<Box<dyn Connection>, DriverError> {
        let delay = *self.state.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.state.connect_error.lock().unwrap().clone() {
            return Err(DriverError::new(2002, message));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
        }))
    }
}

struct MockConnection {
    state: Arc<MockState>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, DriverError> {
        let delay = *self.state.prepare_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.prepares.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.state.prepare_error.lock().unwrap().clone() {
            return Err(DriverError::new(1064, message));
        }
        Ok(Box::new(MockStatement {
            state: self.state.clone(),
            sql: sql.to_string(),
        }))
    }

    async fn query(&self, sql: &str) -> Result<ExecResult, DriverError> {
        self.state.journal.lock().unwrap().push(sql.to_string());
        Ok(self.state.respond(sql))
    }

    async fn set_autocommit(&self, enabled: bool) -> Result<(), DriverError> {
        self.state.autocommit.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_commit.load(Ordering::SeqCst) {
            return Err(DriverError::new(1213, "deadlock found when trying to commit"));
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn session_stats(&self) -> HashMap<String, u64> {
        let mut stats = HashMap::new();
        stats.insert(
            "connections".to_string(),
            self.state.connects.load(Ordering::SeqCst) as u64,
        );
        stats.insert(
            "prepared_statements".to_string(),
            self.state.prepares.load(Ordering::SeqCst) as u64,
        );
        stats.insert(
            "queries".to_string(),
            self.state.journal.lock().unwrap().len() as u64,
        );
        stats.insert(
            "commits".to_string(),
            self.state.commits.load(Ordering::SeqCst) as u64,
        );
        stats.insert(
            "rollbacks".to_string(),
            self.state.rollbacks.load(Ordering::SeqCst) as u64,
        );
        stats
    }
}

struct MockStatement {
    state: Arc<MockState>,
    sql: String,
}

#[async_trait]
impl Statement for MockStatement {
    async fn execute(&self, params: &[Value]) -> Result<ExecResult, DriverError> {
        self.state.journal.lock().unwrap().push(self.sql.clone());
        self.state
            .bound_params
            .lock()
            .unwrap()
            .push(params.to_vec());
        Ok(self.state.respond(&self.sql))
    }
}
