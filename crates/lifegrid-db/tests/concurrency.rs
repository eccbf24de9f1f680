//! Integration tests for `MemoryGridStore` under concurrent access.

#![allow(clippy::unwrap_used)]

use lifegrid_db::{GridRow, GridStore, MemoryGridStore};
use lifegrid_types::GridState;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_are_all_counted() {
    let store = MemoryGridStore::new();
    let grid = GridState::dead(10, 10).unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..32 {
        let store = store.clone();
        let row = GridRow::new(&grid);
        tasks.spawn(async move { store.insert(row).await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn each_row_is_removed_exactly_once() {
    let store = MemoryGridStore::new();
    let row = GridRow::new(&GridState::dead(10, 10).unwrap());
    let id = row.id;
    store.insert(row).await.unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let store = store.clone();
        tasks.spawn(async move { store.remove(id).await });
    }
    let mut removed = 0_usize;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap().unwrap().is_some() {
            removed = removed.saturating_add(1);
        }
    }

    assert_eq!(removed, 1);
    assert_eq!(store.count().await.unwrap(), 0);
}
