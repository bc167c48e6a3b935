// ABOUTME: Query executor service object owning the caches and stats recorder
// ABOUTME: Three execution paths (prepared, emulated, raw) with uniform verb-driven result shaping
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Query execution
//!
//! [`Database`] is the single entry point. It owns the connection registry,
//! the statement cache, and the stats recorder, and exposes three calling
//! conventions that differ only in binding mode:
//!
//! - [`Database::execute`] runs true prepared statements, bound positionally
//!   by the derived params mask;
//! - [`Database::query`] uses emulated binding, substituting escaped
//!   literals into the template;
//! - [`Database::sql`] runs raw caller-supplied SQL with no binding.
//!
//! All three shape their result by the leading verb of the original template
//! and record wall time into the stats recorder on success.

use crate::binder::bind_query_params;
use crate::config::DatabaseConfig;
use crate::driver::{Driver, DriverError, ExecResult, Row};
use crate::errors::{DbError, DbResult};
use crate::registry::{ClusterConnection, ConnectionRegistry};
use crate::statements::StatementCache;
use crate::stats::{StatsEntry, StatsRecorder};
use crate::value::Value;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Shaped result of a SELECT-class execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    /// Number of rows fetched; always equals `rows.len()`
    pub num: usize,
    /// Fetched rows, each independently owned
    pub rows: Vec<Row>,
    /// Total matching rows: `FOUND_ROWS()` when the template requests
    /// `SQL_CALC_FOUND_ROWS`, otherwise equal to `num`
    pub total_rows: u64,
}

/// Uniform result contract across the three execution paths
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryResult {
    /// SELECT-class queries
    Rows(ResultSet),
    /// Mutation-class queries: the generated insert id, or the
    /// affected-row count for UPDATE/DELETE/REPLACE/LOAD
    Count(u64),
    /// Administrative statements (SET/LOCK/UNLOCK/CREATE/DROP)
    Done(bool),
}

/// Result classes recognized from a template's leading verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryClass {
    Select,
    Insert,
    Affected,
    Admin,
}

/// The data access layer service object.
///
/// Holds the per-process caches that the original kept as global state:
/// construct one at process start and pass it by reference to all callers.
/// Every operation is safe under concurrent use; a single cluster connection
/// never runs overlapping statements.
pub struct Database {
    config: Arc<DatabaseConfig>,
    registry: Arc<ConnectionRegistry>,
    statements: StatementCache,
    stats: StatsRecorder,
}

impl Database {
    /// Create the service object over a driver and configuration
    #[must_use]
    pub fn new(config: DatabaseConfig, driver: Arc<dyn Driver>) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(ConnectionRegistry::new(driver, config.clone()));
        let statements = StatementCache::new(registry.clone(), config.clone());
        Self {
            config,
            registry,
            statements,
            stats: StatsRecorder::new(),
        }
    }

    /// Execute a named query as a true prepared statement.
    ///
    /// The statement is prepared once per `(cluster, name)` and cached;
    /// parameters are coerced by the derived params mask, and binding is
    /// skipped entirely when the mask is empty.
    ///
    /// # Errors
    ///
    /// Configuration errors for unknown cluster/name, binder errors,
    /// [`DbError::Execute`] on driver failure, [`DbError::Query`] for a
    /// non-zero post-hoc error code, and [`DbError::InvalidQueryType`] for an
    /// unrecognized leading verb.
    pub async fn execute(
        &self,
        cluster: &str,
        statement_name: &str,
        params: &[Value],
    ) -> DbResult<QueryResult> {
        let template = self
            .config
            .query_template(statement_name)
            .ok_or_else(|| DbError::UnknownQuery {
                name: statement_name.to_string(),
            })?
            .to_string();

        let statement = self.statements.get(cluster, statement_name).await?;
        let entry = self.registry.get(cluster).await?;

        let bound = if statement.mask().is_empty() {
            Vec::new()
        } else {
            bind_by_mask(statement.mask().tags(), params)?
        };

        let started = Instant::now();
        let shaped = {
            let _guard = entry.lock().await;
            let result = statement
                .statement()
                .execute(&bound)
                .await
                .map_err(|source| DbError::Execute {
                    statement: statement_name.to_string(),
                    source,
                })?;
            shape_result(statement_name, &template, result, &entry).await?
        };
        self.stats.record(statement_name, started.elapsed()).await;
        Ok(shaped)
    }

    /// Execute a named query with emulated binding: parameters are
    /// substituted as escaped literals and the resulting SQL runs directly,
    /// with no server-side statement object.
    ///
    /// # Errors
    ///
    /// Configuration errors for unknown cluster/name, binder errors,
    /// [`DbError::Query`] on driver failure or a non-zero post-hoc error
    /// code, and [`DbError::InvalidQueryType`] for an unrecognized leading
    /// verb.
    pub async fn query(
        &self,
        cluster: &str,
        query_name: &str,
        params: &[Value],
    ) -> DbResult<QueryResult> {
        let template = self
            .config
            .query_template(query_name)
            .ok_or_else(|| DbError::UnknownQuery {
                name: query_name.to_string(),
            })?
            .to_string();

        let sql = bind_query_params(&template, params)?;
        self.run_direct(cluster, query_name, &template, &sql).await
    }

    /// Execute caller-supplied literal SQL, no binding at all.
    ///
    /// # Errors
    ///
    /// Same as [`Database::query`], with the raw SQL text standing in for
    /// the query name.
    pub async fn sql(&self, cluster: &str, raw_sql: &str) -> DbResult<QueryResult> {
        self.run_direct(cluster, raw_sql, raw_sql, raw_sql).await
    }

    async fn run_direct(
        &self,
        cluster: &str,
        name: &str,
        template: &str,
        sql: &str,
    ) -> DbResult<QueryResult> {
        let entry = self.registry.get(cluster).await?;
        let started = Instant::now();
        let shaped = {
            let _guard = entry.lock().await;
            let result =
                entry
                    .connection()
                    .query(sql)
                    .await
                    .map_err(|source| DbError::Query {
                        query: name.to_string(),
                        source,
                    })?;
            shape_result(name, template, result, &entry).await?
        };
        self.stats.record(name, started.elapsed()).await;
        Ok(shaped)
    }

    /// First column of the first row of a prepared-statement execution,
    /// `None` when the result set is empty.
    ///
    /// # Errors
    ///
    /// As [`Database::execute`], plus [`DbError::NotARowSet`] when the
    /// statement is not SELECT-shaped.
    pub async fn execute_value(
        &self,
        cluster: &str,
        statement_name: &str,
        params: &[Value],
    ) -> DbResult<Option<Value>> {
        let result = self.execute(cluster, statement_name, params).await?;
        Ok(first_value(into_row_set(result, statement_name)?))
    }

    /// First row of a prepared-statement execution, `None` when empty.
    ///
    /// # Errors
    ///
    /// As [`Database::execute_value`].
    pub async fn execute_row(
        &self,
        cluster: &str,
        statement_name: &str,
        params: &[Value],
    ) -> DbResult<Option<Row>> {
        let result = self.execute(cluster, statement_name, params).await?;
        Ok(into_row_set(result, statement_name)?.rows.into_iter().next())
    }

    /// Full row sequence of a prepared-statement execution.
    ///
    /// # Errors
    ///
    /// As [`Database::execute_value`].
    pub async fn execute_rows(
        &self,
        cluster: &str,
        statement_name: &str,
        params: &[Value],
    ) -> DbResult<Vec<Row>> {
        let result = self.execute(cluster, statement_name, params).await?;
        Ok(into_row_set(result, statement_name)?.rows)
    }

    /// First column of the first row of an emulated-binding query, `None`
    /// when the result set is empty.
    ///
    /// # Errors
    ///
    /// As [`Database::query`], plus [`DbError::NotARowSet`] when the query
    /// is not SELECT-shaped.
    pub async fn query_value(
        &self,
        cluster: &str,
        query_name: &str,
        params: &[Value],
    ) -> DbResult<Option<Value>> {
        let result = self.query(cluster, query_name, params).await?;
        Ok(first_value(into_row_set(result, query_name)?))
    }

    /// First row of an emulated-binding query, `None` when empty.
    ///
    /// # Errors
    ///
    /// As [`Database::query_value`].
    pub async fn query_row(
        &self,
        cluster: &str,
        query_name: &str,
        params: &[Value],
    ) -> DbResult<Option<Row>> {
        let result = self.query(cluster, query_name, params).await?;
        Ok(into_row_set(result, query_name)?.rows.into_iter().next())
    }

    /// Full row sequence of an emulated-binding query.
    ///
    /// # Errors
    ///
    /// As [`Database::query_value`].
    pub async fn query_rows(
        &self,
        cluster: &str,
        query_name: &str,
        params: &[Value],
    ) -> DbResult<Vec<Row>> {
        let result = self.query(cluster, query_name, params).await?;
        Ok(into_row_set(result, query_name)?.rows)
    }

    /// First column of the first row of a raw SQL execution, `None` when the
    /// result set is empty.
    ///
    /// # Errors
    ///
    /// As [`Database::sql`], plus [`DbError::NotARowSet`] when the SQL is
    /// not SELECT-shaped.
    pub async fn sql_value(&self, cluster: &str, raw_sql: &str) -> DbResult<Option<Value>> {
        let result = self.sql(cluster, raw_sql).await?;
        Ok(first_value(into_row_set(result, raw_sql)?))
    }

    /// First row of a raw SQL execution, `None` when empty.
    ///
    /// # Errors
    ///
    /// As [`Database::sql_value`].
    pub async fn sql_row(&self, cluster: &str, raw_sql: &str) -> DbResult<Option<Row>> {
        let result = self.sql(cluster, raw_sql).await?;
        Ok(into_row_set(result, raw_sql)?.rows.into_iter().next())
    }

    /// Full row sequence of a raw SQL execution.
    ///
    /// # Errors
    ///
    /// As [`Database::sql_value`].
    pub async fn sql_rows(&self, cluster: &str, raw_sql: &str) -> DbResult<Vec<Row>> {
        let result = self.sql(cluster, raw_sql).await?;
        Ok(into_row_set(result, raw_sql)?.rows)
    }

    /// Begin a caller-managed transaction by switching autocommit off.
    ///
    /// # Errors
    ///
    /// Connection errors, or [`DbError::Query`] when the session mode cannot
    /// be changed.
    pub async fn start_transaction(&self, cluster: &str) -> DbResult<()> {
        let entry = self.registry.get(cluster).await?;
        let _guard = entry.lock().await;
        debug!(cluster = %cluster, "starting transaction");
        entry
            .connection()
            .set_autocommit(false)
            .await
            .map_err(|source| DbError::Query {
                query: "SET autocommit=0".to_string(),
                source,
            })
    }

    /// End a caller-managed transaction sequence by restoring autocommit.
    /// Commit and rollback remain explicit caller steps.
    ///
    /// # Errors
    ///
    /// Connection errors, or [`DbError::Query`] when the session mode cannot
    /// be changed.
    pub async fn finish_transaction(&self, cluster: &str) -> DbResult<()> {
        let entry = self.registry.get(cluster).await?;
        let _guard = entry.lock().await;
        debug!(cluster = %cluster, "finishing transaction");
        entry
            .connection()
            .set_autocommit(true)
            .await
            .map_err(|source| DbError::Query {
                query: "SET autocommit=1".to_string(),
                source,
            })
    }

    /// Commit the open transaction.
    ///
    /// On commit failure a rollback is issued unconditionally before the
    /// error is raised, leaving the connection's transactional state
    /// consistent either way.
    ///
    /// # Errors
    ///
    /// Connection errors, or [`DbError::Commit`] carrying the driver's
    /// commit failure.
    pub async fn commit(&self, cluster: &str) -> DbResult<()> {
        let entry = self.registry.get(cluster).await?;
        let _guard = entry.lock().await;
        if let Err(source) = entry.connection().commit().await {
            if let Err(rollback_error) = entry.connection().rollback().await {
                warn!(
                    cluster = %cluster,
                    error = %rollback_error,
                    "rollback after failed commit also failed"
                );
            }
            return Err(DbError::Commit {
                cluster: cluster.to_string(),
                source,
            });
        }
        Ok(())
    }

    /// Roll back the open transaction.
    ///
    /// # Errors
    ///
    /// Connection errors, or [`DbError::Query`] carrying the driver's
    /// rollback failure.
    pub async fn rollback(&self, cluster: &str) -> DbResult<()> {
        let entry = self.registry.get(cluster).await?;
        let _guard = entry.lock().await;
        entry
            .connection()
            .rollback()
            .await
            .map_err(|source| DbError::Query {
                query: "ROLLBACK".to_string(),
                source,
            })
    }

    /// Per-name execution statistics snapshot
    pub async fn statement_stats(&self) -> HashMap<String, StatsEntry> {
        self.stats.snapshot().await
    }

    /// Driver-level session counters per created cluster connection
    pub async fn connection_stats(&self) -> HashMap<String, HashMap<String, u64>> {
        self.registry.session_stats().await
    }
}

/// Coerce `params` by the mask's positional type tags.
///
/// `i` applies the truncating integer cast, `d` the float cast, `s`
/// stringifies; NULL passes through. Lists cannot be bound positionally.
fn bind_by_mask(tags: impl Iterator<Item = char>, params: &[Value]) -> DbResult<Vec<Value>> {
    let mut bound = Vec::new();
    for (position, tag) in tags.enumerate() {
        let value = params.get(position).ok_or(DbError::MissingParameter {
            placeholder: position + 1,
            supplied: params.len(),
        })?;
        if matches!(value, Value::List(_)) {
            return Err(DbError::UnsupportedPlaceholder { tag: 'a' });
        }
        let coerced = match tag {
            'i' => value.to_int().map_or(Value::Null, Value::Int),
            'd' => value.to_float().map_or(Value::Null, Value::Float),
            _ => match value {
                Value::Null => Value::Null,
                other => Value::Text(other.to_text()),
            },
        };
        bound.push(coerced);
    }
    Ok(bound)
}

/// Whether the template requests `SQL_CALC_FOUND_ROWS` at the fixed offset
/// immediately after the SELECT verb
fn wants_found_rows(template: &str) -> bool {
    template
        .get(7..26)
        .is_some_and(|token| token.eq_ignore_ascii_case("SQL_CALC_FOUND_ROWS"))
}

/// Classify a template by its first 6 bytes (ASCII case-insensitive)
fn classify(template: &str) -> DbResult<QueryClass> {
    let prefix: String = template.chars().take(6).collect();
    let upper = prefix.to_ascii_uppercase();
    let class = match upper.as_str() {
        "SELECT" => QueryClass::Select,
        "INSERT" => QueryClass::Insert,
        "UPDATE" | "DELETE" | "REPLAC" => QueryClass::Affected,
        "UNLOCK" | "CREATE" => QueryClass::Admin,
        _ if upper.starts_with("LOAD ") => QueryClass::Affected,
        _ if upper.starts_with("SET ") || upper.starts_with("LOCK") || upper.starts_with("DROP") => {
            QueryClass::Admin
        }
        _ => return Err(DbError::InvalidQueryType { token: prefix }),
    };
    Ok(class)
}

/// Shape a driver result by the original template's leading verb.
///
/// Must run with the connection gate held: the `FOUND_ROWS()` follow-up has
/// to go to the same session, immediately after the original query.
async fn shape_result(
    name: &str,
    template: &str,
    result: ExecResult,
    entry: &ClusterConnection,
) -> DbResult<QueryResult> {
    let class = classify(template)?;
    let ExecResult {
        rows,
        affected_rows,
        insert_id,
        error_code,
        error_message,
    } = result;

    let shaped = match class {
        QueryClass::Select => {
            let rows = rows.unwrap_or_default();
            let num = rows.len();
            let total_rows = if wants_found_rows(template) {
                let follow = entry
                    .connection()
                    .query("SELECT FOUND_ROWS()")
                    .await
                    .map_err(|source| DbError::Query {
                        query: name.to_string(),
                        source,
                    })?;
                scalar_u64(&follow).unwrap_or(num as u64)
            } else {
                num as u64
            };
            QueryResult::Rows(ResultSet {
                num,
                rows,
                total_rows,
            })
        }
        QueryClass::Insert => QueryResult::Count(insert_id),
        QueryClass::Affected => QueryResult::Count(affected_rows),
        QueryClass::Admin => QueryResult::Done(true),
    };

    // Error codes surface post-hoc: execution nominally succeeded, but a
    // non-zero code still fails the call
    if error_code != 0 {
        return Err(DbError::Query {
            query: name.to_string(),
            source: DriverError::new(error_code, error_message),
        });
    }
    Ok(shaped)
}

/// First column of the first row of a result set
fn scalar_u64(result: &ExecResult) -> Option<u64> {
    let rows = result.rows.as_ref()?;
    let first = rows.first()?;
    let (_, value) = first.iter().next()?;
    value.to_int().and_then(|v| u64::try_from(v).ok())
}

fn into_row_set(result: QueryResult, name: &str) -> DbResult<ResultSet> {
    match result {
        QueryResult::Rows(rows) => Ok(rows),
        QueryResult::Count(_) | QueryResult::Done(_) => Err(DbError::NotARowSet {
            name: name.to_string(),
        }),
    }
}

fn first_value(result: ResultSet) -> Option<Value> {
    result
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next().map(|(_, value)| value))
}
