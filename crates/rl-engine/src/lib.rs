//! Bayesian multi-armed bandit engine for automatic A/B-test traffic
//! optimization: Thompson sampling selection, Monte Carlo traffic allocation,
//! winner determination, expected loss and per-variant statistics.
//!
//! The engine is a pure computation core. It keeps no state between calls and
//! takes an explicit random source on every entry point.

pub mod allocation;
pub mod engine;
pub mod loss;
pub mod posterior;
pub mod report;
pub mod rng;
pub mod sampler;
pub mod simulation;
pub mod statistics;
pub mod winner;

pub use allocation::{allocate_traffic, TrafficAllocator};
pub use engine::BanditEngine;
pub use loss::{expected_loss, ExpectedLossCalculator};
pub use posterior::BetaPosterior;
pub use report::{ExperimentReport, VariantReport};
pub use rng::engine_rng;
pub use sampler::{select_variant, VariantSampler};
pub use statistics::{variant_statistics, VariantStatisticsReporter};
pub use winner::{determine_winner, WinnerDeterminer};
