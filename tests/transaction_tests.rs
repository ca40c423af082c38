/// Transaction tests
///
/// Atomic batches through the context: all-or-nothing commits, per-write
/// invalidation on success, and no invalidation on failure.
/// Run with: cargo test --test transaction_tests

use livestore::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn projects() -> TableIdentity {
    TableIdentity::new("projects")
}

fn tasks() -> TableIdentity {
    TableIdentity::new("tasks")
}

fn schema(table: &TableIdentity) -> TableSchema {
    TableSchema::new(
        table.clone(),
        vec![Column::new("name", DataType::Text).not_null()],
    )
}

async fn open_context() -> Context {
    let config = ContextConfig::new(PersistenceTarget::Memory)
        .migration(Arc::new(CreateTable::new(schema(&projects()))))
        .migration(Arc::new(CreateTable::new(schema(&tasks()))));
    Context::open(config).await.unwrap()
}

async fn wait_for_rows(sub: &mut QuerySubscription, count: usize) -> QueryState {
    timeout(Duration::from_secs(2), async {
        loop {
            let state = sub.wait_ready().await.expect("channel closed while waiting");
            if state.rows().map(|rows| rows.len()) == Some(count) {
                return state;
            }
            if sub.changed().await.is_none() {
                panic!("channel closed while waiting");
            }
        }
    })
    .await
    .expect("timed out waiting for snapshot")
}

async fn assert_no_delivery(sub: &mut QuerySubscription) {
    match timeout(Duration::from_millis(300), sub.changed()).await {
        Err(_) => {}
        Ok(None) => {}
        Ok(Some(state)) => panic!("unexpected delivery: {:?}", state),
    }
}

#[tokio::test]
async fn test_successful_batch_commits_everything() {
    let context = open_context().await;
    let (_id, mut sub) = context
        .open_table_query(QueryDescription::table(projects()))
        .await;
    sub.wait_ready().await.unwrap();

    context
        .run_transaction(|batch| {
            batch.create(projects(), vec![Value::from("Groceries")]);
            batch.create(projects(), vec![Value::from("Chores")]);
            batch.create(tasks(), vec![Value::from("Buy milk")]);
            Ok(())
        })
        .await
        .unwrap();

    let state = wait_for_rows(&mut sub, 2).await;
    let names: Vec<_> = state
        .rows()
        .unwrap()
        .iter()
        .map(|row| row[0].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Groceries", "Chores"]);
    assert_eq!(context.store().row_count(&tasks()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_batch_applies_nothing_and_stays_silent() {
    let context = open_context().await;
    let (_id, mut sub) = context
        .open_table_query(QueryDescription::table(projects()))
        .await;
    sub.wait_ready().await.unwrap();

    let result = context
        .run_transaction(|batch| {
            batch.create(projects(), vec![Value::from("Groceries")]);
            batch.create(TableIdentity::new("missing"), vec![Value::from("x")]);
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(StoreError::TableNotFound(_))));
    assert_eq!(context.store().row_count(&projects()).await.unwrap(), 0);
    // Nothing committed, so nothing to invalidate.
    assert_no_delivery(&mut sub).await;
}

#[tokio::test]
async fn test_body_error_aborts_before_commit() {
    let context = open_context().await;
    let (_id, mut sub) = context
        .open_table_query(QueryDescription::table(projects()))
        .await;
    sub.wait_ready().await.unwrap();

    let result = context
        .run_transaction(|batch| {
            batch.create(projects(), vec![Value::from("Groceries")]);
            Err(StoreError::ConstraintViolation("caller bailed".into()))
        })
        .await;

    assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    assert_eq!(context.store().row_count(&projects()).await.unwrap(), 0);
    assert_no_delivery(&mut sub).await;
}

#[tokio::test]
async fn test_mixed_write_kinds_in_one_batch() {
    let context = open_context().await;
    let table = projects();
    let keep = context
        .store()
        .insert(&table, vec![Value::from("Groceries")])
        .await
        .unwrap();
    let gone = context
        .store()
        .insert(&table, vec![Value::from("Chores")])
        .await
        .unwrap();

    context
        .run_transaction(|batch| {
            batch.update(table.clone(), keep, vec![Value::from("Errands")]);
            batch.soft_delete(table.clone(), gone);
            batch.create(table.clone(), vec![Value::from("Garden")]);
            Ok(())
        })
        .await
        .unwrap();

    let rows = context.store().scan(&table).await.unwrap();
    let names: Vec<_> = rows
        .iter()
        .map(|row| row[0].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Errands", "Garden"]);
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    let context = open_context().await;
    let (_id, mut sub) = context
        .open_table_query(QueryDescription::table(projects()))
        .await;
    sub.wait_ready().await.unwrap();

    context.run_transaction(|_batch| Ok(())).await.unwrap();
    assert_no_delivery(&mut sub).await;
}
