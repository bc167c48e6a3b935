// ABOUTME: Statement cache keyed by (cluster, statement name)
// ABOUTME: Prepares once via the registry and binder, memoizing the params mask alongside the handle
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::binder::{convert_to_statement_format, ParamsMask};
use crate::config::DatabaseConfig;
use crate::driver::Statement;
use crate::errors::{DbError, DbResult};
use crate::registry::ConnectionRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, warn};

/// A compiled statement with its memoized params mask and rewritten text.
///
/// The mask and the text come from the same binder scan, so they stay in
/// lock-step by construction.
pub struct CachedStatement {
    statement: Box<dyn Statement>,
    mask: ParamsMask,
    text: String,
}

impl std::fmt::Debug for CachedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedStatement")
            .field("mask", &self.mask)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

impl CachedStatement {
    /// The driver statement handle
    #[must_use]
    pub fn statement(&self) -> &dyn Statement {
        self.statement.as_ref()
    }

    /// Positional parameter type tags
    #[must_use]
    pub const fn mask(&self) -> &ParamsMask {
        &self.mask
    }

    /// Driver-ready statement text with positional markers
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

type StatementCell = Arc<OnceCell<Arc<CachedStatement>>>;

/// Lazily prepares and caches one compiled statement per
/// `(cluster, statement name)` pair.
///
/// Same per-key-cell creation discipline as the connection registry: the
/// map lock only publishes the cell, and the driver prepare runs inside
/// it, so a stalled prepare never blocks lookups of already-cached
/// statements. Cached handles are returned as `Arc`, so repeated lookups
/// yield the identical statement object and the driver prepares exactly
/// once. A failed prepare leaves the cell empty, so the next caller
/// retries.
pub struct StatementCache {
    registry: Arc<ConnectionRegistry>,
    config: Arc<DatabaseConfig>,
    statements: RwLock<HashMap<(String, String), StatementCell>>,
}

impl StatementCache {
    /// Create a cache backed by the given registry and configuration
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, config: Arc<DatabaseConfig>) -> Self {
        Self {
            registry,
            config,
            statements: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached statement for `(cluster, name)`, preparing it on
    /// first access.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnknownQuery`] when the name is not in the catalog,
    /// binder errors for unsupported placeholders, connection errors from the
    /// registry, and [`DbError::Prepare`] when compilation fails; the
    /// failure is logged as a warning before it is raised.
    pub async fn get(&self, cluster: &str, name: &str) -> DbResult<Arc<CachedStatement>> {
        let cell = self.creation_cell(cluster, name).await;
        cell.get_or_try_init(|| self.prepare(cluster, name))
            .await
            .cloned()
    }

    /// Publish the per-statement creation cell under a short map lock
    async fn creation_cell(&self, cluster: &str, name: &str) -> StatementCell {
        {
            let statements = self.statements.read().await;
            if let Some(cell) = statements.get(&(cluster.to_string(), name.to_string())) {
                return cell.clone();
            }
        }
        let mut statements = self.statements.write().await;
        statements
            .entry((cluster.to_string(), name.to_string()))
            .or_default()
            .clone()
    }

    async fn prepare(&self, cluster: &str, name: &str) -> DbResult<Arc<CachedStatement>> {
        let template = self
            .config
            .query_template(name)
            .ok_or_else(|| DbError::UnknownQuery {
                name: name.to_string(),
            })?;
        let (text, mask) = convert_to_statement_format(template)?;

        let entry = self.registry.get(cluster).await?;
        let prepared = {
            let _guard = entry.lock().await;
            entry.connection().prepare(&text).await
        };

        match prepared {
            Ok(statement) => {
                debug!(
                    cluster = %cluster,
                    statement = %name,
                    mask = %mask.as_str(),
                    "prepared statement"
                );
                Ok(Arc::new(CachedStatement {
                    statement,
                    mask,
                    text,
                }))
            }
            Err(source) => {
                warn!(
                    cluster = %cluster,
                    statement = %name,
                    error = %source,
                    query = %text,
                    "failed to prepare statement"
                );
                Err(DbError::Prepare {
                    statement: name.to_string(),
                    source,
                    query: text,
                })
            }
        }
    }
}
