//! Engine binary for the Lifegrid simulation.
//!
//! Seeds a random board, draws a fixed number of generations, then hands
//! the board to the service for a bounded run to its final state.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `lifegrid-config.yaml` (or `LIFEGRID_CONFIG`)
//! 2. Initialize structured logging (tracing; `RUST_LOG` wins)
//! 3. Seed the random board
//! 4. Install the Ctrl-C stop handler
//! 5. Draw `render.generations` generations
//! 6. Run to a final state and log the result

mod error;

use std::path::PathBuf;
use std::time::Duration;

use lifegrid_core::config::{ConfigError, EngineConfig, RenderMode};
use lifegrid_core::operator::StopSignal;
use lifegrid_core::render::{ConsoleRenderer, ImageRenderer, Renderer};
use lifegrid_core::runner::{RunnerError, SimulationRunner};
use lifegrid_core::snapshot::SnapshotPool;
use lifegrid_db::MemoryGridStore;
use lifegrid_service::{FinalState, GameError, GameService};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration path, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "lifegrid-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, rendering, or the run fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config);
    info!("lifegrid-engine starting");
    let source = source.map_or_else(|| "defaults".to_owned(), |p| p.display().to_string());
    info!(
        source = %source,
        width = config.grid.width,
        height = config.grid.height,
        rule = %config.simulation.rule,
        "Configuration loaded"
    );

    // 3. Seed the board.
    let seed = config.grid.seed.unwrap_or_else(rand::random::<u64>);
    let policy = config.simulation.policy()?;
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut runner =
        SimulationRunner::random(config.grid.width, config.grid.height, policy, &mut rng)?;
    info!(
        seed,
        alive = runner.current().alive_count(),
        cells = runner.current().cell_count(),
        "Random board seeded"
    );

    // 4. Stop on Ctrl-C, between generations.
    let stop = StopSignal::new();
    let handle = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping after the current generation");
            handle.request_stop();
        }
    });

    // 5. Draw generations.
    let mut renderer = build_renderer(&config)?;
    draw_generations(&mut runner, &mut renderer, &config, &stop).await?;
    if stop.is_stop_requested() {
        info!(generation = runner.generation(), "lifegrid-engine stopped");
        return Ok(());
    }

    // 6. Final state.
    let drawn = runner.generation();
    let service = GameService::with_runner(MemoryGridStore::new(), runner)
        .with_snapshot_pool(SnapshotPool::new(config.simulation.snapshot_workers));
    let outcome = match service
        .final_state(i64::from(config.simulation.max_iterations), &stop)
        .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            if let Some(completed) = stopped_after(&err) {
                info!(
                    generation = drawn.saturating_add(u64::from(completed)),
                    "lifegrid-engine stopped"
                );
                return Ok(());
            }
            return Err(EngineError::from(err).into());
        }
    };

    let stored = service.count().await.map_err(EngineError::from)?;
    match outcome {
        FinalState::Converged(board) => {
            let generation = drawn.saturating_add(u64::try_from(stored).unwrap_or(u64::MAX));
            info!(
                id = %board.id,
                generation,
                alive = board.grid.alive_count(),
                "Final state reached"
            );
            if let Some(renderer) = renderer.as_mut() {
                renderer
                    .render(generation, &board.grid)
                    .map_err(EngineError::from)?;
            }
        }
        FinalState::NoConvergence { generations } => {
            warn!(
                generations,
                max_iterations = config.simulation.max_iterations,
                "No final state within the iteration cap"
            );
        }
    }

    info!(stored, "lifegrid-engine finished");
    Ok(())
}

/// Load configuration from `LIFEGRID_CONFIG` or the default path. A
/// missing default file falls back to the built-in defaults.
fn load_config() -> Result<(EngineConfig, Option<PathBuf>), ConfigError> {
    let explicit = std::env::var("LIFEGRID_CONFIG").ok().map(PathBuf::from);
    let path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if explicit.is_some() || path.exists() {
        let config = EngineConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }

    let mut config = EngineConfig::default();
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok((config, None))
}

fn init_tracing(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn build_renderer(config: &EngineConfig) -> Result<Option<Box<dyn Renderer>>, EngineError> {
    let renderer: Option<Box<dyn Renderer>> = match config.render.mode {
        RenderMode::Console => Some(Box::new(
            ConsoleRenderer::stdout().with_clear_screen(config.render.clear_screen),
        )),
        RenderMode::Image => {
            let renderer = ImageRenderer::new(&config.render.image_dir, config.render.cell_size)?;
            info!(dir = %renderer.dir().display(), "Writing frames");
            Some(Box::new(renderer))
        }
        RenderMode::None => None,
    };
    Ok(renderer)
}

/// Generations completed before a requested stop, or `None` if `err` is
/// not a stop.
const fn stopped_after(err: &GameError) -> Option<u32> {
    match *err {
        GameError::Runner {
            source: RunnerError::Stopped { completed },
        } => Some(completed),
        _ => None,
    }
}

/// Draw the initial board and `render.generations` successors, pausing
/// `render.delay_ms` between frames.
async fn draw_generations(
    runner: &mut SimulationRunner,
    renderer: &mut Option<Box<dyn Renderer>>,
    config: &EngineConfig,
    stop: &StopSignal,
) -> Result<(), EngineError> {
    let delay = Duration::from_millis(config.render.delay_ms);

    if let Some(renderer) = renderer.as_mut() {
        renderer.render(runner.generation(), runner.current())?;
    }

    for _ in 0..config.render.generations {
        if stop.is_stop_requested() {
            break;
        }
        tokio::time::sleep(delay).await;
        runner.advance_one()?;
        if let Some(renderer) = renderer.as_mut() {
            renderer.render(runner.generation(), runner.current())?;
        }
    }

    info!(
        generation = runner.generation(),
        stable = runner.is_stable(),
        "Rendering complete"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lifegrid_core::rule::RulePolicy;
    use lifegrid_db::GridStore;

    use super::*;

    #[test]
    fn only_a_runner_stop_counts_as_stopped() {
        let stopped = GameError::Runner {
            source: RunnerError::Stopped { completed: 3 },
        };
        assert_eq!(stopped_after(&stopped), Some(3));

        let overflow = GameError::Runner {
            source: RunnerError::GenerationOverflow,
        };
        assert_eq!(stopped_after(&overflow), None);
        assert_eq!(stopped_after(&GameError::NilId), None);
    }

    #[tokio::test]
    async fn stop_during_the_final_run_is_recognized() {
        let mut rng = SmallRng::seed_from_u64(1);
        let runner = SimulationRunner::random(12, 12, RulePolicy::Conway, &mut rng).unwrap();
        let service = GameService::with_runner(MemoryGridStore::new(), runner);
        let stop = StopSignal::new();
        stop.request_stop();

        let err = service.final_state(100, &stop).await.unwrap_err();
        assert_eq!(stopped_after(&err), Some(0));
        assert_eq!(service.store().count().await.unwrap(), 0);
    }
}
