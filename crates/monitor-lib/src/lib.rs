//! Engine library for live telemetry aggregation and alert classification
//!
//! This crate provides the core functionality for:
//! - Reconciling pushed live samples and polled history windows into one
//!   deduplicated per-server timeline
//! - Normalizing nested metric payloads into canonical numeric records
//! - Classifying alert severities with threshold and near-threshold rules
//! - Subscription-scoped unread-alert counting
//! - Health checks and observability

pub mod alerts;
pub mod directory;
pub mod error;
pub mod fetch;
pub mod health;
pub mod models;
pub mod normalize;
pub mod observability;
pub mod scheduler;
pub mod stream;
pub mod timeline;

pub use error::{ConnectionError, FetchError, ParseError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthReport, ReadinessReport,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
