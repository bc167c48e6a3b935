// ABOUTME: Cluster topology, credentials, and named-query catalog configuration
// ABOUTME: Deserializable from structured config or loadable from SQLGATE_* environment variables
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// One named logical database target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster name execution calls are addressed to
    pub name: String,
    /// Database host
    pub host: String,
    /// Database name on that host
    pub db_name: String,
}

/// Process-wide database configuration: credentials, connect timeout,
/// cluster topology, and the read-only named-query catalog.
///
/// Supplied externally and never mutated after construction; unknown cluster
/// or query names at runtime are configuration errors, not data errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database user shared by all clusters
    pub user: String,
    /// Database password shared by all clusters
    pub password: String,
    /// Connect timeout in seconds, applied once at connection creation
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Cluster name to topology mapping
    #[serde(default)]
    pub clusters: HashMap<String, ClusterConfig>,
    /// Symbolic query name to SQL template mapping
    #[serde(default)]
    pub queries: HashMap<String, String>,
}

impl DatabaseConfig {
    /// Create a configuration with credentials and the default connect timeout
    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            clusters: HashMap::new(),
            queries: HashMap::new(),
        }
    }

    /// Load configuration from `SQLGATE_*` environment variables.
    ///
    /// `SQLGATE_DB_USER` and `SQLGATE_DB_PASSWORD` are required;
    /// `SQLGATE_CONNECT_TIMEOUT_SECS` is optional; `SQLGATE_CLUSTERS` and
    /// `SQLGATE_QUERIES` hold JSON maps matching [`Self::clusters`] and
    /// [`Self::queries`].
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a JSON map
    /// fails to parse.
    pub fn from_env() -> Result<Self> {
        let user = env::var("SQLGATE_DB_USER").context("SQLGATE_DB_USER must be set")?;
        let password =
            env::var("SQLGATE_DB_PASSWORD").context("SQLGATE_DB_PASSWORD must be set")?;

        let connect_timeout_secs = match env::var("SQLGATE_CONNECT_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("SQLGATE_CONNECT_TIMEOUT_SECS must be an integer number of seconds")?,
            Err(_) => DEFAULT_CONNECT_TIMEOUT_SECS,
        };

        let clusters = match env::var("SQLGATE_CLUSTERS") {
            Ok(raw) => serde_json::from_str(&raw)
                .context("SQLGATE_CLUSTERS must be a JSON map of cluster configs")?,
            Err(_) => HashMap::new(),
        };

        let queries = match env::var("SQLGATE_QUERIES") {
            Ok(raw) => serde_json::from_str(&raw)
                .context("SQLGATE_QUERIES must be a JSON map of query templates")?,
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            user,
            password,
            connect_timeout_secs,
            clusters,
            queries,
        })
    }

    /// Add a cluster, keyed by its name
    #[must_use]
    pub fn with_cluster(mut self, cluster: ClusterConfig) -> Self {
        self.clusters.insert(cluster.name.clone(), cluster);
        self
    }

    /// Add a named query template
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.queries.insert(name.into(), template.into());
        self
    }

    /// Connect timeout as a [`Duration`]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Resolve a cluster by name
    #[must_use]
    pub fn cluster(&self, name: &str) -> Option<&ClusterConfig> {
        self.clusters.get(name)
    }

    /// Resolve a named query template
    #[must_use]
    pub fn query_template(&self, name: &str) -> Option<&str> {
        self.queries.get(name).map(String::as_str)
    }
}
