use std::error::Error;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("{what} not available after {attempts} attempts")]
    RetryExhausted { what: String, attempts: u32 },
}

/// Formats an error together with its `source` chain, one cause per line.
pub fn format_error_chain<E: Error + ?Sized>(error: &E) -> String {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();

    while let Some(err) = source {
        chain.push(format!("  caused by: {}", err));
        source = err.source();
    }

    chain.join("\n")
}

/// Logs an error with its full chain as a warning.
///
/// Nothing in this crate treats a logged failure as fatal, so the level is
/// `warn` rather than `error`.
pub fn log_error<E: Error + ?Sized>(context: &str, error: &E) {
    let error_chain = format_error_chain(error);
    tracing::warn!(
        context = context,
        error = %error_chain,
        "operation failed"
    );
}
