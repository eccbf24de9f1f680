//! Rule engine, generation loop, and run control for the Lifegrid simulation.
//!
//! This crate turns one [`GridState`] into the next and drives that step
//! over bounded batches, optionally stopping early once the grid stops
//! changing.
//!
//! # Modules
//!
//! - [`rule`] -- [`RulePolicy`] and the [`RuleEngine`] that computes one
//!   successor generation without wraparound.
//! - [`runner`] -- [`SimulationRunner`] with its rotating double buffer,
//!   synchronous batches, and pooled async batches.
//! - [`snapshot`] -- Bounded `JoinSet` pool that encodes per-generation
//!   copies.
//! - [`operator`] -- [`StopSignal`] checked between generations.
//! - [`config`] -- Configuration loading from `lifegrid-config.yaml` into
//!   strongly-typed structs.
//! - [`render`] -- [`Renderer`] trait with console and PNG renderers.
//!
//! [`GridState`]: lifegrid_types::GridState
//! [`RulePolicy`]: rule::RulePolicy
//! [`RuleEngine`]: rule::RuleEngine
//! [`SimulationRunner`]: runner::SimulationRunner
//! [`StopSignal`]: operator::StopSignal
//! [`Renderer`]: render::Renderer

pub mod config;
pub mod operator;
pub mod render;
pub mod rule;
pub mod runner;
pub mod snapshot;
