// ABOUTME: Main library entry point for the sqlgate data access layer
// ABOUTME: Re-exports the service object, value types, binder surface, and error types
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # sqlgate
//!
//! A data access layer between application code and a relational database
//! server. It offers three calling conventions (true prepared statements,
//! emulated string-substituted parameterized queries, and raw SQL) while
//! caching connections and prepared statements, shaping results uniformly by
//! query type, and recording per-query execution statistics.
//!
//! The underlying database client is consumed through the [`driver`]
//! capability traits; this crate implements no wire protocol, no connection
//! pool with eviction, and no retry policy.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sqlgate::{ClusterConfig, Database, DatabaseConfig, Value};
//! use sqlgate::driver::mock::MockDriver;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DatabaseConfig::new("app", "secret")
//!         .with_cluster(ClusterConfig {
//!             name: "main".to_string(),
//!             host: "db1.internal".to_string(),
//!             db_name: "app".to_string(),
//!         })
//!         .with_query("user_by_id", "SELECT * FROM users WHERE id=%d");
//!
//!     let db = Database::new(config, Arc::new(MockDriver::new()));
//!     let user = db.execute_row("main", "user_by_id", &[Value::from(7)]).await?;
//!     println!("{user:?}");
//!     Ok(())
//! }
//! ```

/// Placeholder grammar, escaping, and the two parameter binders
pub mod binder;

/// Cluster topology, credentials, and the named-query catalog
pub mod config;

/// The query executor service object and result shapes
pub mod database;

/// Driver capability traits and the scripted mock driver
pub mod driver;

/// Unified error types
pub mod errors;

/// Connection registry: one cached connection per cluster
pub mod registry;

/// Statement cache keyed by cluster and statement name
pub mod statements;

/// Per-query execution statistics
pub mod stats;

/// Tagged SQL values and coercions
pub mod value;

pub use binder::{
    bind_query_params, convert_array_to_sql_list, convert_to_statement_format, escape_string,
    ParamsMask,
};
pub use config::{ClusterConfig, DatabaseConfig};
pub use database::{Database, QueryResult, ResultSet};
pub use driver::{ConnectOptions, DriverError, ExecResult, Row};
pub use errors::{DbError, DbResult};
pub use stats::StatsEntry;
pub use value::Value;
