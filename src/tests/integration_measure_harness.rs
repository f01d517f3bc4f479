use crate::db::connect_pool;
use crate::measure::{
    FailurePolicy, HarnessConfig, MeasureError, TimingHarness, run_measurements,
};
use sqlx::{Pool, Sqlite};
use tempfile::TempDir;

// concurrent chunks need several connections onto one database, so these tests use a file
async fn setup_file_pool() -> (TempDir, Pool<Sqlite>) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("measure.db").display());
    let pool = connect_pool(&url, 5).await.expect("Failed to open file database");
    (dir, pool)
}

fn small_config(policy: FailurePolicy) -> HarnessConfig {
    HarnessConfig {
        insert_batch_size: 4,
        chunk_size: 10,
        workers: 3,
        policy,
    }
}

async fn count_items(pool: &Pool<Sqlite>) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM items")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_insert_assigns_contiguous_ids() {
    let (_dir, pool) = setup_file_pool().await;
    let harness = TimingHarness::new(pool.clone(), small_config(FailurePolicy::AbortAll));

    let (_, first) = harness.time_insert(9).await.unwrap();
    let (_, second) = harness.time_insert(5).await.unwrap();

    assert_eq!((first.first, first.count), (1, 9));
    assert_eq!((second.first, second.count), (10, 5));
    assert_eq!(count_items(&pool).await, 14);

    let max_id: i64 = sqlx::query_scalar("SELECT MAX(id) FROM items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(Some(max_id), second.last());
}

// every id in the range is touched exactly once across the concurrent chunks
#[tokio::test]
async fn test_chunked_update_and_delete() {
    let (_dir, pool) = setup_file_pool().await;
    let harness = TimingHarness::new(pool.clone(), small_config(FailurePolicy::AbortAll));

    let (_, ids) = harness.time_insert(25).await.unwrap();

    let update = harness.time_update(&ids).await.unwrap();
    assert_eq!(update.chunks, 3);
    assert_eq!(update.succeeded, 3);
    assert_eq!(update.rows_affected, 25);
    assert!(update.failures.is_empty());

    let prices: Vec<f64> = sqlx::query_scalar("SELECT price FROM items")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert!(prices.iter().all(|price| *price == 110.0));

    let delete = harness.time_delete(&ids).await.unwrap();
    assert_eq!(delete.rows_affected, 25);
    assert_eq!(count_items(&pool).await, 0);
}

// rows outside the inserted range are left alone
#[tokio::test]
async fn test_chunked_delete_only_touches_range() {
    let (_dir, pool) = setup_file_pool().await;
    let harness = TimingHarness::new(pool.clone(), small_config(FailurePolicy::AbortAll));

    harness.time_insert(3).await.unwrap();
    let (_, ids) = harness.time_insert(12).await.unwrap();

    let delete = harness.time_delete(&ids).await.unwrap();
    assert_eq!(delete.rows_affected, 12);
    assert_eq!(count_items(&pool).await, 3);
}

#[tokio::test]
async fn test_abort_all_fails_measurement() {
    let (_dir, pool) = setup_file_pool().await;
    let harness = TimingHarness::new(pool.clone(), small_config(FailurePolicy::AbortAll));
    let (_, ids) = harness.time_insert(25).await.unwrap();

    // pull the table out from under the chunks
    sqlx::query("DROP TABLE items").execute(&pool).await.unwrap();

    let result = harness.time_update(&ids).await;
    match result {
        Err(MeasureError::ChunkFailed { operation, failure }) => {
            assert_eq!(operation, "update");
            assert!(failure.chunk.is_some());
            assert!(failure.message.contains("no such table"));
        }
        other => panic!("expected an aborted update, got {:?}", other),
    }
}

#[tokio::test]
async fn test_best_effort_collects_every_failure() {
    let (_dir, pool) = setup_file_pool().await;
    let harness = TimingHarness::new(pool.clone(), small_config(FailurePolicy::BestEffort));
    let (_, ids) = harness.time_insert(25).await.unwrap();

    sqlx::query("DROP TABLE items").execute(&pool).await.unwrap();

    let report = harness.time_delete(&ids).await.unwrap();
    assert_eq!(report.chunks, 3);
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failures.len(), 3);

    let mut chunks: Vec<usize> = report.failures.iter().filter_map(|f| f.chunk).collect();
    chunks.sort();
    assert_eq!(chunks, vec![0, 1, 2]);
}

// updates of id 1 fail; every other row updates normally
async fn fail_updates_of_first_row(pool: &Pool<Sqlite>) {
    sqlx::query(
        "CREATE TRIGGER fail_first_row BEFORE UPDATE ON items WHEN old.id = 1 \
         BEGIN SELECT RAISE(ABORT, 'first row is locked'); END",
    )
    .execute(pool)
    .await
    .unwrap();
}

fn one_worker(policy: FailurePolicy) -> HarnessConfig {
    HarnessConfig {
        workers: 1,
        ..small_config(policy)
    }
}

// with one worker the failing first chunk is the only one ever started
#[tokio::test]
async fn test_abort_all_stops_pending_chunks() {
    let (_dir, pool) = setup_file_pool().await;
    let harness = TimingHarness::new(pool.clone(), one_worker(FailurePolicy::AbortAll));
    let (_, ids) = harness.time_insert(30).await.unwrap();
    fail_updates_of_first_row(&pool).await;

    match harness.time_update(&ids).await {
        Err(MeasureError::ChunkFailed { operation, failure }) => {
            assert_eq!(operation, "update");
            assert_eq!(failure.chunk, Some(0));
            assert!(failure.message.contains("first row is locked"));
        }
        other => panic!("expected an aborted update, got {:?}", other),
    }

    // the failed chunk rolled back and the later chunks never ran
    let touched: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE price > 100")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(touched, 0);
}

#[tokio::test]
async fn test_best_effort_runs_remaining_chunks() {
    let (_dir, pool) = setup_file_pool().await;
    let harness = TimingHarness::new(pool.clone(), one_worker(FailurePolicy::BestEffort));
    let (_, ids) = harness.time_insert(30).await.unwrap();
    fail_updates_of_first_row(&pool).await;

    let report = harness.time_update(&ids).await.unwrap();

    assert_eq!(report.chunks, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.rows_affected, 20);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].chunk, Some(0));

    let touched: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE price > 100")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(touched, 20);
}

#[tokio::test]
async fn test_run_measurements_records_best_effort_failures() {
    let (_dir, pool) = setup_file_pool().await;
    let harness = TimingHarness::new(pool.clone(), one_worker(FailurePolicy::BestEffort));
    fail_updates_of_first_row(&pool).await;

    let rows = run_measurements(&harness, &[30]).await.unwrap();

    assert_eq!(rows[0].update_failures, 1);
    assert_eq!(rows[0].delete_failures, 0);
    assert!(rows[0].has_failures());
}

#[tokio::test]
async fn test_run_measurements_leaves_table_empty() {
    let (_dir, pool) = setup_file_pool().await;
    let harness = TimingHarness::new(pool.clone(), small_config(FailurePolicy::AbortAll));

    let rows = run_measurements(&harness, &[10, 30]).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].records, 10);
    assert_eq!(rows[1].records, 30);
    assert_eq!(count_items(&pool).await, 0);
}
