//! Application Layer - Port definitions and use cases.
//!
//! Ports describe what the feed handler needs from the outside world
//! (time, reference data). Services orchestrate domain logic over them.

/// Port interfaces for external systems.
pub mod ports;

/// Application services.
pub mod services;
