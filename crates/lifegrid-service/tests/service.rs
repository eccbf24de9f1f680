//! Integration tests for `GameService` against the in-memory store.
//!
//! Every stored generation is visible through the store, so these tests
//! check persistence counts alongside the returned boards.

// Integration tests use unwrap extensively for clarity -- panicking on
// failure is the correct behavior in test code.
#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

use lifegrid_core::operator::StopSignal;
use lifegrid_core::rule::RulePolicy;
use lifegrid_core::runner::{RunnerError, SimulationRunner};
use lifegrid_db::{GridStore, MemoryGridStore};
use lifegrid_service::{FinalState, GameError, GameService};
use lifegrid_types::{GridCandidate, GridId, GridState, Violation};

/// 10x10 candidate with the given live cells.
fn candidate(alive: &[(usize, usize)]) -> GridCandidate {
    let cells = (0..10)
        .map(|row| {
            (0..10)
                .map(|column| i64::from(alive.contains(&(row, column))))
                .collect()
        })
        .collect();
    GridCandidate {
        width: 10,
        height: 10,
        cells,
    }
}

fn block() -> GridCandidate {
    candidate(&[(4, 4), (4, 5), (5, 4), (5, 5)])
}

fn blinker() -> GridCandidate {
    candidate(&[(5, 4), (5, 5), (5, 6)])
}

fn service() -> GameService<MemoryGridStore> {
    GameService::seeded(MemoryGridStore::new(), 7).unwrap()
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn upload_stores_the_board_and_makes_it_active() {
    let service = service();
    let id = service.upload(blinker()).await.unwrap();

    assert!(!id.is_nil());
    assert_eq!(service.count().await.unwrap(), 1);
    let stored = service.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.grid, blinker().into_grid().unwrap());
    assert_eq!(service.current().await, stored.grid);
}

#[tokio::test]
async fn upload_reports_every_violation() {
    let service = service();
    let bad = GridCandidate {
        width: 9,
        height: 10,
        cells: vec![vec![0; 10]; 5],
    };

    let Err(GameError::Validation { source }) = service.upload(bad).await else {
        panic!("expected a validation failure");
    };
    assert!(source.contains(&Violation::WidthOutOfRange { width: 9 }));
    assert!(source.violations.len() >= 2);
    assert_eq!(service.count().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_upload_keeps_the_active_board() {
    let service = service();
    service.upload(block()).await.unwrap();
    let before = service.current().await;

    assert!(service.upload(GridCandidate::default()).await.is_err());
    assert_eq!(service.current().await, before);
}

#[tokio::test]
async fn upload_encoded_accepts_codec_strings() {
    let service = service();
    let grid = block().into_grid().unwrap();
    let id = service.upload_encoded(&grid.encode()).await.unwrap();
    assert_eq!(service.get_by_id(id).await.unwrap().unwrap().grid, grid);
}

#[tokio::test]
async fn upload_encoded_rejects_garbage() {
    let service = service();
    let err = service.upload_encoded("1,0|0,2").await.unwrap_err();
    assert!(matches!(err, GameError::Decode { .. }));
}

// =============================================================================
// Stepping
// =============================================================================

#[tokio::test]
async fn next_state_advances_and_stores() {
    let service = service();
    service.upload(blinker()).await.unwrap();

    let first = service.next_state().await.unwrap();
    assert!(first.grid.is_alive(4, 5));
    assert!(first.grid.is_alive(6, 5));
    assert!(!first.grid.is_alive(5, 4));

    let second = service.next_state().await.unwrap();
    assert_eq!(second.grid, blinker().into_grid().unwrap());
    assert_ne!(first.id, second.id);
    assert_eq!(service.count().await.unwrap(), 3);
}

#[tokio::test]
async fn next_state_works_on_the_initial_random_board() {
    let service = service();
    let board = service.next_state().await.unwrap();
    assert_eq!((board.grid.width(), board.grid.height()), (10, 10));
    assert_eq!(service.count().await.unwrap(), 1);
}

#[tokio::test]
async fn simulate_stores_every_generation_and_returns_the_last() {
    let service = service();
    service.upload(blinker()).await.unwrap();

    let last = service.simulate(4, &StopSignal::new()).await.unwrap();
    assert_eq!(last.grid, blinker().into_grid().unwrap());
    assert_eq!(service.count().await.unwrap(), 5);
    assert_eq!(service.get_by_id(last.id).await.unwrap().unwrap(), last);
}

#[tokio::test]
async fn iteration_counts_outside_bounds_are_rejected_before_running() {
    let service = service();
    service.upload(blinker()).await.unwrap();
    let stop = StopSignal::new();

    for bad in [-1, 0, 101, 999] {
        let err = service.simulate(bad, &stop).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidIterationCount { requested } if requested == bad));
        let err = service.final_state(bad, &stop).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidIterationCount { .. }));
    }

    assert_eq!(service.count().await.unwrap(), 1);
    assert_eq!(service.current().await, blinker().into_grid().unwrap());
}

#[tokio::test]
async fn simulate_accepts_the_maximum() {
    let service = service();
    service.upload(blinker()).await.unwrap();
    service.simulate(100, &StopSignal::new()).await.unwrap();
    assert_eq!(service.count().await.unwrap(), 101);
}

#[tokio::test]
async fn stopped_simulation_stores_nothing() {
    let service = service();
    service.upload(blinker()).await.unwrap();
    let stop = StopSignal::new();
    stop.request_stop();

    let err = service.simulate(10, &stop).await.unwrap_err();
    assert!(matches!(
        err,
        GameError::Runner {
            source: RunnerError::Stopped { completed: 0 }
        }
    ));
    assert_eq!(service.count().await.unwrap(), 1);
}

// =============================================================================
// Final state
// =============================================================================

#[tokio::test]
async fn final_state_converges_on_a_still_life() {
    let service = service();
    service.upload(block()).await.unwrap();

    let FinalState::Converged(board) = service.final_state(50, &StopSignal::new()).await.unwrap()
    else {
        panic!("a block is stable after one generation");
    };
    assert_eq!(board.grid, block().into_grid().unwrap());
    // The upload plus the single stability-triggering generation.
    assert_eq!(service.count().await.unwrap(), 2);
}

#[tokio::test]
async fn final_state_reports_no_convergence_but_still_stores() {
    let service = service();
    service.upload(blinker()).await.unwrap();

    let outcome = service.final_state(9, &StopSignal::new()).await.unwrap();
    assert_eq!(outcome, FinalState::NoConvergence { generations: 9 });
    assert_eq!(service.count().await.unwrap(), 10);
}

#[tokio::test]
async fn final_state_of_a_dying_board_is_empty() {
    let grid = GridState::new(10, 10, {
        let mut cells = vec![vec![0; 10]; 10];
        cells[0][0] = 1;
        cells
    })
    .unwrap();
    let runner = SimulationRunner::new(grid, RulePolicy::Conway);
    let service = GameService::with_runner(MemoryGridStore::new(), runner);

    let FinalState::Converged(board) = service.final_state(10, &StopSignal::new()).await.unwrap()
    else {
        panic!("a lone cell dies and the empty board is stable");
    };
    assert_eq!(board.grid.alive_count(), 0);
    // Dies in generation 1, stable in generation 2.
    assert_eq!(service.count().await.unwrap(), 2);
}

// =============================================================================
// Lookup
// =============================================================================

#[tokio::test]
async fn nil_id_is_rejected() {
    let service = service();
    assert!(matches!(service.get_by_id(GridId::nil()).await, Err(GameError::NilId)));
    assert!(matches!(service.remove_by_id(GridId::nil()).await, Err(GameError::NilId)));
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let service = service();
    assert_eq!(service.get_by_id(GridId::new()).await.unwrap(), None);
    assert_eq!(service.remove_by_id(GridId::new()).await.unwrap(), None);
}

#[tokio::test]
async fn remove_returns_the_board_once() {
    let service = service();
    let id = service.upload(block()).await.unwrap();

    let removed = service.remove_by_id(id).await.unwrap().unwrap();
    assert_eq!(removed.id, id);
    assert_eq!(service.remove_by_id(id).await.unwrap(), None);
    assert_eq!(service.count().await.unwrap(), 0);
    assert_eq!(service.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn board_state_serializes_for_hand_off() {
    let service = service();
    let id = service.upload(block()).await.unwrap();
    let board = service.get_by_id(id).await.unwrap().unwrap();

    let json = serde_json::to_value(&board).unwrap();
    assert_eq!(json.get("id").and_then(|v| v.as_str()), Some(id.to_string().as_str()));
    assert_eq!(
        json.pointer("/grid/width").and_then(serde_json::Value::as_u64),
        Some(10)
    );
}
