//! Configuration Module
//!
//! Configuration loading for the feed handler.

mod settings;

pub use settings::{
    ConfigError, EndpointSettings, EventSettings, FeedConfig, FeedEncoding, ServerSettings,
    WorkerSettings,
};
