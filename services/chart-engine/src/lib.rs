//!
//! src/lib.rs  Andrew Belles  Oct 2nd, 2026
//!
//! Chart aggregation engine. Normalizes FLO, Genie and Melon charts into
//! one entry shape, with a refresh-on-read cache in front of FLO
//!

pub mod config;
pub mod errors;
pub mod logging;

pub mod types;
pub mod fallback;
pub mod rank;
pub mod filter;

pub mod fetch;
pub mod flo;
pub mod genie;
pub mod melon;
pub mod lookup;

pub mod cache;
pub mod engine;
pub mod scheduler;

pub use engine::ChartEngine;
pub use errors::ChartError;
pub use types::{ChartEntry, DetailEntry, RankStatus};
