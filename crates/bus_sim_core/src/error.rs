use thiserror::Error;

/// Errors surfaced when configuring or starting simulators.
///
/// Ticking itself is infallible; everything here is caught before the first tick.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("route for entity `{entity_id}` has no stops")]
    EmptyRoute { entity_id: String },
    #[error("invalid simulator config: {0}")]
    InvalidConfig(String),
    #[error("no tokio runtime available to schedule simulator ticks")]
    NoRuntime,
}
