// ABOUTME: Tests for caller-managed transaction sequences through the service object
// ABOUTME: Covers autocommit toggling, commit, rollback, and rollback-on-failed-commit
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use anyhow::Result;
use sqlgate::driver::mock::MockDriver;
use sqlgate::{ClusterConfig, Database, DatabaseConfig, DbError};
use std::sync::Arc;

mod common;

/// Helper: service object over a shared-state mock driver
fn test_db(driver: &MockDriver) -> Database {
    common::init_test_logging();
    let config = DatabaseConfig::new("app", "secret").with_cluster(ClusterConfig {
        name: "main".to_string(),
        host: "db1.internal".to_string(),
        db_name: "app".to_string(),
    });
    Database::new(config, Arc::new(driver.clone()))
}

#[tokio::test]
async fn test_transaction_sequence_toggles_autocommit() -> Result<()> {
    let driver = MockDriver::new();
    let db = test_db(&driver);

    db.start_transaction("main").await?;
    assert!(!driver.autocommit());

    db.commit("main").await?;
    assert_eq!(driver.commit_count(), 1);
    assert_eq!(driver.rollback_count(), 0);

    db.finish_transaction("main").await?;
    assert!(driver.autocommit());
    Ok(())
}

#[tokio::test]
async fn test_explicit_rollback_reaches_the_driver() -> Result<()> {
    let driver = MockDriver::new();
    let db = test_db(&driver);

    db.start_transaction("main").await?;
    db.rollback("main").await?;
    assert_eq!(driver.rollback_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_commit_rolls_back_before_raising() -> Result<()> {
    let driver = MockDriver::new();
    driver.fail_commit();
    let db = test_db(&driver);

    db.start_transaction("main").await?;
    let err = db.commit("main").await.unwrap_err();

    match err {
        DbError::Commit { cluster, source } => {
            assert_eq!(cluster, "main");
            assert_eq!(source.code, 1213);
        }
        other => panic!("expected Commit error, got {other:?}"),
    }
    // The rollback was issued unconditionally before the error surfaced
    assert_eq!(driver.commit_count(), 1);
    assert_eq!(driver.rollback_count(), 1);
    Ok(())
}
