// ABOUTME: Driver capability traits consumed by the data access layer
// ABOUTME: Abstracts connect, prepare, execute, and transaction control over any backend
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Driver capability interface.
//!
//! The data access layer never implements a wire protocol; it consumes a
//! backend through these traits. Implementations must be safe to share
//! behind `Arc`, but a single [`Connection`] is only ever driven with one
//! in-flight statement at a time; the registry enforces that with a
//! per-connection gate.

pub mod mock;

use crate::value::Value;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// One fetched row: column-name keys in result-set order, independently
/// owned values (no aliasing of driver fetch buffers)
pub type Row = IndexMap<String, Value>;

/// Options applied once, at connection creation.
///
/// The connect-time `timeout` is the only timeout this layer applies; there
/// is no per-query timeout or cancellation.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Host to connect to
    pub host: String,
    /// Process-wide database user
    pub user: String,
    /// Process-wide database password
    pub password: String,
    /// Database name on the host
    pub db_name: String,
    /// Connect timeout
    pub timeout: Duration,
    /// Request native integer/float column representations instead of strings
    pub native_numerics: bool,
}

/// Error reported by the driver
#[derive(Debug, Clone, Error)]
#[error("driver error {code}: {message}")]
pub struct DriverError {
    /// Driver-specific error code
    pub code: u32,
    /// Driver-supplied error text
    pub message: String,
}

impl DriverError {
    /// Build a driver error from a code and message
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome of one statement or query execution.
///
/// `error_code` surfaces failures the driver reports only after a nominally
/// successful execution; the executor converts a non-zero code into an error
/// post-shaping.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Fetched rows for row-producing statements, `None` otherwise
    pub rows: Option<Vec<Row>>,
    /// Affected-row count reported by the driver
    pub affected_rows: u64,
    /// Generated row identifier for inserts
    pub insert_id: u64,
    /// Post-execution error code, 0 when clean
    pub error_code: u32,
    /// Post-execution error text, empty when clean
    pub error_message: String,
}

/// Factory capability: opens connections to a database host
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a connection.
    ///
    /// # Errors
    ///
    /// Returns the driver's connect failure; the registry wraps it with the
    /// target host and database name.
    async fn connect(&self, options: &ConnectOptions) -> Result<Box<dyn Connection>, DriverError>;
}

/// One live session to a specific cluster's database
#[async_trait]
pub trait Connection: Send + Sync {
    /// Compile a statement server-side.
    ///
    /// # Errors
    ///
    /// Returns the driver's compilation failure.
    async fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, DriverError>;

    /// Execute literal SQL text directly.
    ///
    /// # Errors
    ///
    /// Returns the driver's execution failure.
    async fn query(&self, sql: &str) -> Result<ExecResult, DriverError>;

    /// Toggle autocommit for caller-managed transaction sequences.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure to change the session mode.
    async fn set_autocommit(&self, enabled: bool) -> Result<(), DriverError>;

    /// Commit the open transaction.
    ///
    /// # Errors
    ///
    /// Returns the driver's commit failure.
    async fn commit(&self) -> Result<(), DriverError>;

    /// Roll back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns the driver's rollback failure.
    async fn rollback(&self) -> Result<(), DriverError>;

    /// Driver-level session counters for diagnostics
    fn session_stats(&self) -> HashMap<String, u64>;
}

/// A compiled statement handle, bound positionally at execute time
#[async_trait]
pub trait Statement: Send + Sync {
    /// Execute with positional parameters (empty slice when the statement
    /// takes none).
    ///
    /// # Errors
    ///
    /// Returns the driver's execution failure.
    async fn execute(&self, params: &[Value]) -> Result<ExecResult, DriverError>;
}
