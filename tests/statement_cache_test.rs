// ABOUTME: Tests for statement cache identity, single preparation, and prepare failure handling
// ABOUTME: Verifies per-key creation returns the identical Arc and prepares exactly once
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use anyhow::Result;
use sqlgate::driver::mock::MockDriver;
use sqlgate::registry::ConnectionRegistry;
use sqlgate::statements::StatementCache;
use sqlgate::{ClusterConfig, DatabaseConfig, DbError};
use std::sync::Arc;
use std::time::Duration;

mod common;

/// Helper: registry plus statement cache over a mock driver
fn test_cache(driver: &MockDriver) -> StatementCache {
    common::init_test_logging();
    let config = Arc::new(
        DatabaseConfig::new("app", "secret")
            .with_cluster(ClusterConfig {
                name: "main".to_string(),
                host: "db1.internal".to_string(),
                db_name: "app".to_string(),
            })
            .with_query("user_by_id", "SELECT id, name FROM users WHERE id=%d")
            .with_query("all_users", "SELECT id, name FROM users"),
    );
    let registry = Arc::new(ConnectionRegistry::new(
        Arc::new(driver.clone()),
        config.clone(),
    ));
    StatementCache::new(registry, config)
}

#[tokio::test]
async fn test_repeated_lookups_return_identical_statement_object() -> Result<()> {
    let driver = MockDriver::new();
    let cache = test_cache(&driver);

    let first = cache.get("main", "user_by_id").await?;
    let second = cache.get("main", "user_by_id").await?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(driver.prepare_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cached_statement_carries_rewritten_text_and_mask() -> Result<()> {
    let driver = MockDriver::new();
    let cache = test_cache(&driver);

    let statement = cache.get("main", "user_by_id").await?;
    assert_eq!(statement.text(), "SELECT id, name FROM users WHERE id=?");
    assert_eq!(statement.mask().as_str(), "i");
    Ok(())
}

#[tokio::test]
async fn test_stalled_prepare_does_not_block_cached_statements() -> Result<()> {
    let driver = MockDriver::new();
    let cache = Arc::new(test_cache(&driver));

    // Cache one statement, then let a slow prepare of another occupy its
    // creation path
    let cached = cache.get("main", "user_by_id").await?;
    driver.set_prepare_delay(Duration::from_millis(200));
    let stalled = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get("main", "all_users").await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Cache hits must not wait on the in-flight prepare
    let fast =
        tokio::time::timeout(Duration::from_millis(50), cache.get("main", "user_by_id")).await;
    assert!(fast.is_ok(), "cached lookup blocked behind a stalled prepare");
    assert!(Arc::ptr_eq(&cached, &fast??));

    stalled.await??;
    assert_eq!(driver.prepare_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_prepare_failure_carries_name_error_and_query_text() {
    let driver = MockDriver::new();
    driver.fail_prepare("syntax error near 'users'");
    let cache = test_cache(&driver);

    let err = cache.get("main", "user_by_id").await.unwrap_err();
    match err {
        DbError::Prepare {
            statement,
            source,
            query,
        } => {
            assert_eq!(statement, "user_by_id");
            assert!(source.message.contains("syntax error"));
            assert_eq!(query, "SELECT id, name FROM users WHERE id=?");
        }
        other => panic!("expected Prepare error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_statement_name_is_a_configuration_error() {
    let driver = MockDriver::new();
    let cache = test_cache(&driver);

    let err = cache.get("main", "missing").await.unwrap_err();
    assert!(matches!(err, DbError::UnknownQuery { name } if name == "missing"));
}
