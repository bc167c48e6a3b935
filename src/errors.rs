// ABOUTME: Unified error types for the data access layer
// ABOUTME: Flat DbError hierarchy so callers can match broadly or on specific failures
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::driver::DriverError;
use thiserror::Error;

/// Result alias used across the crate
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised by the data access layer
///
/// All variants carry enough context to diagnose the failure without access
/// to the call site. Driver-reported failures keep the underlying
/// [`DriverError`] as their `source`.
#[derive(Debug, Error)]
pub enum DbError {
    /// Connection establishment to a cluster failed
    #[error("error connecting to database '{db_name}' at '{host}': {source}")]
    Connect {
        /// Host the connection was addressed to
        host: String,
        /// Database name on that host
        db_name: String,
        /// Underlying driver error
        #[source]
        source: DriverError,
    },

    /// Statement compilation failed on the server
    #[error("error preparing statement '{statement}': {source} (query: {query})")]
    Prepare {
        /// Symbolic statement name from the query catalog
        statement: String,
        /// Underlying driver error
        #[source]
        source: DriverError,
        /// Rewritten statement text that failed to compile
        query: String,
    },

    /// A prepared statement's execute call returned failure
    #[error("error executing statement '{statement}': {source}")]
    Execute {
        /// Symbolic statement name from the query catalog
        statement: String,
        /// Underlying driver error
        #[source]
        source: DriverError,
    },

    /// Raw or emulated execution failed, or left a non-zero post-hoc error code
    #[error("error running query '{query}': {source}")]
    Query {
        /// Query name, or the raw SQL text for unnamed queries
        query: String,
        /// Underlying driver error
        #[source]
        source: DriverError,
    },

    /// The template's leading verb matched none of the recognized classes
    #[error("unknown query type in '{token}'")]
    InvalidQueryType {
        /// Leading token of the offending template
        token: String,
    },

    /// Commit failed; a rollback was issued before this error was raised
    #[error("error committing transaction on cluster '{cluster}': {source}")]
    Commit {
        /// Cluster the transaction ran on
        cluster: String,
        /// Underlying driver error from the commit attempt
        #[source]
        source: DriverError,
    },

    /// The cluster name is not present in the configuration
    #[error("unknown cluster '{cluster}'")]
    UnknownCluster {
        /// Cluster name that failed to resolve
        cluster: String,
    },

    /// The query name is not present in the query catalog
    #[error("unknown named query '{name}'")]
    UnknownQuery {
        /// Query name that failed to resolve
        name: String,
    },

    /// A placeholder had no matching parameter in the supplied sequence
    #[error("placeholder {placeholder} has no matching parameter ({supplied} supplied)")]
    MissingParameter {
        /// 1-based position of the unmatched placeholder
        placeholder: usize,
        /// Number of parameters that were supplied
        supplied: usize,
    },

    /// The placeholder tag is not supported in the requested binding mode
    #[error("unsupported placeholder '%{tag}'")]
    UnsupportedPlaceholder {
        /// Offending placeholder tag
        tag: char,
    },

    /// A row-reducing wrapper was called against a non-SELECT result
    #[error("query '{name}' did not produce a row set")]
    NotARowSet {
        /// Name of the query or statement that was executed
        name: String,
    },
}
