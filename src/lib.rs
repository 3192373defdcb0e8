//! ecospatial: conversational GIS agent for Gyeonggi-do climate data
//!
//! This library provides:
//! - Place resolution for Gyeonggi-do cities, counties and districts
//! - Provider adapters for demographic, air-quality, weather, vegetation and
//!   flood-trace data
//! - Layer reconciliation and a two-round tool-calling agent protocol
//! - A session controller with supersede, timeout and response caching

pub mod agent;
pub mod config;
pub mod core;
pub mod layers;
pub mod llm;
pub mod places;
pub mod providers;
pub mod session;
pub mod transport;

pub use config::Config;
pub use session::{SessionController, SubmitOutcome};
