//! RateDesk Collector
//!
//! The collector keeps the rate store current: it pulls the upstream daily
//! bulletin once at startup and then on a fixed interval, merging each sheet
//! through the engine's refresh coordinator.

pub mod config;

pub use config::CollectorConfig;
