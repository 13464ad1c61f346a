use std::time::Duration;

/// Core error type.
///
/// Adapter crates map their transport failures into this type so the engine
/// can tell platform backpressure apart from real failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Platform-mandated cool-down. The call must be re-issued after `wait`.
    #[error("rate limited: retry after {}s", .wait.as_secs_f64())]
    RateLimited { wait: Duration },

    /// The platform answered with an error the adapter does not recognize.
    #[error("unrecognized platform error: {0}")]
    Platform(String),

    #[error("external error: {0}")]
    External(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn rate_limited_secs(secs: u64) -> Self {
        Self::RateLimited {
            wait: Duration::from_secs(secs),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
