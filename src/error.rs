use thiserror::Error;

/// Harness failures. `Config` and `Fixture` stop a run before any suite is
/// attempted; the rest are recorded against the suite that hit them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration: {0}")]
    Config(String),

    #[error("fixture: {0}")]
    Fixture(String),

    #[error("report generation: {0}")]
    Generation(String),

    /// The request never produced an HTTP response.
    #[error("{provider} unreachable: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} answered HTTP {status}: {body}")]
    Upstream {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} rate limited the request{}", retry_hint(.retry_after_secs))]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    #[error("malformed {what}: {message}")]
    Malformed { what: &'static str, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("scorecard template: {0}")]
    Template(#[from] askama::Error),
}

fn retry_hint(secs: &Option<u64>) -> String {
    secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default()
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn fixture(msg: impl Into<String>) -> Self {
        Self::Fixture(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn malformed(what: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            what,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
