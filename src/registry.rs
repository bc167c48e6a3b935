// ABOUTME: Connection registry caching one live connection per named cluster
// ABOUTME: Per-cluster once-cell creation outside the map lock plus a per-connection execution gate
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::config::DatabaseConfig;
use crate::driver::{ConnectOptions, Connection, Driver};
use crate::errors::{DbError, DbResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OnceCell, RwLock};
use tracing::{debug, info};

/// A cached cluster connection together with its execution gate.
///
/// The gate serializes statement execution: the default-safe policy is one
/// in-flight statement per connection, since the transport is not assumed to
/// support pipelining.
pub struct ClusterConnection {
    conn: Box<dyn Connection>,
    gate: Mutex<()>,
}

impl std::fmt::Debug for ClusterConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConnection").finish_non_exhaustive()
    }
}

impl ClusterConnection {
    /// The underlying driver connection
    #[must_use]
    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    /// Acquire the execution gate; hold the guard for the full round-trip,
    /// including any follow-up query on the same session
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Driver-level session counters for this connection
    #[must_use]
    pub fn session_stats(&self) -> HashMap<String, u64> {
        self.conn.session_stats()
    }
}

type ConnectionCell = Arc<OnceCell<Arc<ClusterConnection>>>;

/// Lazily creates and caches one live connection per cluster name.
///
/// Creation follows check-then-create-then-publish: the map lock is only
/// held long enough to publish a per-cluster cell, and the driver connect
/// runs inside that cell. Concurrent first access opens exactly one
/// connection per cluster, and a stalled connect to one cluster never
/// blocks lookups for already-connected clusters. A failed connect leaves
/// the cell empty, so the next caller retries. Connections live until
/// process teardown; nothing is evicted.
pub struct ConnectionRegistry {
    driver: Arc<dyn Driver>,
    config: Arc<DatabaseConfig>,
    connections: RwLock<HashMap<String, ConnectionCell>>,
}

impl ConnectionRegistry {
    /// Create a registry over the given driver and configuration
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, config: Arc<DatabaseConfig>) -> Self {
        Self {
            driver,
            config,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached connection for `cluster`, creating it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnknownCluster`] when the cluster is not configured
    /// and [`DbError::Connect`] when the driver cannot establish the session.
    pub async fn get(&self, cluster: &str) -> DbResult<Arc<ClusterConnection>> {
        let cell = self.creation_cell(cluster).await;
        cell.get_or_try_init(|| self.open(cluster)).await.cloned()
    }

    /// Publish the per-cluster creation cell under a short map lock
    async fn creation_cell(&self, cluster: &str) -> ConnectionCell {
        if let Some(cell) = self.connections.read().await.get(cluster) {
            return cell.clone();
        }
        let mut connections = self.connections.write().await;
        connections.entry(cluster.to_string()).or_default().clone()
    }

    async fn open(&self, cluster: &str) -> DbResult<Arc<ClusterConnection>> {
        let cluster_config = self
            .config
            .cluster(cluster)
            .ok_or_else(|| DbError::UnknownCluster {
                cluster: cluster.to_string(),
            })?;

        debug!(
            cluster = %cluster,
            host = %cluster_config.host,
            "opening database connection"
        );

        let options = ConnectOptions {
            host: cluster_config.host.clone(),
            user: self.config.user.clone(),
            password: self.config.password.clone(),
            db_name: cluster_config.db_name.clone(),
            timeout: self.config.connect_timeout(),
            native_numerics: true,
        };

        let conn = self
            .driver
            .connect(&options)
            .await
            .map_err(|source| DbError::Connect {
                host: cluster_config.host.clone(),
                db_name: cluster_config.db_name.clone(),
                source,
            })?;

        info!(
            cluster = %cluster,
            host = %cluster_config.host,
            db_name = %cluster_config.db_name,
            "database connection established"
        );

        Ok(Arc::new(ClusterConnection {
            conn,
            gate: Mutex::new(()),
        }))
    }

    /// Driver-level session counters per created cluster connection
    pub async fn session_stats(&self) -> HashMap<String, HashMap<String, u64>> {
        self.connections
            .read()
            .await
            .iter()
            .filter_map(|(name, cell)| {
                cell.get().map(|conn| (name.clone(), conn.session_stats()))
            })
            .collect()
    }
}
