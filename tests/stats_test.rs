// ABOUTME: Tests for the stats recorder and the service object's stats accessors
// ABOUTME: Verifies counter accumulation, failure exclusion, and connection-level counters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use anyhow::Result;
use sqlgate::driver::mock::MockDriver;
use sqlgate::stats::StatsRecorder;
use sqlgate::{ClusterConfig, Database, DatabaseConfig, ExecResult};
use std::sync::Arc;
use std::time::Duration;

mod common;

/// Helper: service object over a shared-state mock driver
fn test_db(driver: &MockDriver) -> Database {
    common::init_test_logging();
    let config = DatabaseConfig::new("app", "secret")
        .with_cluster(ClusterConfig {
            name: "main".to_string(),
            host: "db1.internal".to_string(),
            db_name: "app".to_string(),
        })
        .with_query("all_users", "SELECT id, name FROM users")
        .with_query("broken", "SELECT boom FROM nowhere");
    Database::new(config, Arc::new(driver.clone()))
}

#[tokio::test]
async fn test_recorder_accumulates_counter_and_total_time() {
    let recorder = StatsRecorder::new();
    recorder.record("user_by_id", Duration::from_millis(100)).await;
    recorder.record("user_by_id", Duration::from_millis(150)).await;
    recorder.record("all_users", Duration::from_millis(10)).await;

    let stats = recorder.snapshot().await;
    assert_eq!(stats["user_by_id"].counter, 2);
    assert!((stats["user_by_id"].total_time - 0.25).abs() < 1e-9);
    assert_eq!(stats["all_users"].counter, 1);
}

#[tokio::test]
async fn test_concurrent_recordings_lose_no_updates() {
    let recorder = Arc::new(StatsRecorder::new());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let recorder = recorder.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..100 {
                recorder.record("hot_query", Duration::from_micros(5)).await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = recorder.snapshot().await;
    assert_eq!(stats["hot_query"].counter, 800);
}

#[tokio::test]
async fn test_successful_executions_record_under_their_name() -> Result<()> {
    let driver = MockDriver::new();
    let db = test_db(&driver);

    db.query("main", "all_users", &[]).await?;
    db.query("main", "all_users", &[]).await?;
    db.sql("main", "SELECT 1").await?;

    let stats = db.statement_stats().await;
    assert_eq!(stats["all_users"].counter, 2);
    assert!(stats["all_users"].total_time >= 0.0);
    // Raw SQL records under its own text
    assert_eq!(stats["SELECT 1"].counter, 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_executions_are_not_recorded() -> Result<()> {
    let driver = MockDriver::new();
    driver.respond(
        "SELECT boom FROM nowhere",
        ExecResult {
            rows: Some(vec![]),
            error_code: 1054,
            error_message: "unknown column 'boom'".to_string(),
            ..ExecResult::default()
        },
    );
    let db = test_db(&driver);

    assert!(db.query("main", "broken", &[]).await.is_err());
    let stats = db.statement_stats().await;
    assert!(!stats.contains_key("broken"));
    Ok(())
}

#[tokio::test]
async fn test_connection_stats_expose_driver_counters_per_cluster() -> Result<()> {
    let driver = MockDriver::new();
    let db = test_db(&driver);

    db.query("main", "all_users", &[]).await?;

    let stats = db.connection_stats().await;
    assert_eq!(stats["main"]["connections"], 1);
    assert!(stats["main"]["queries"] >= 1);
    Ok(())
}
