pub mod config;
pub mod error;
pub mod logging;
pub mod retry;
pub mod session;

pub use config::{ChannelConfig, CoreConfig, LoggingConfig, DEFAULT_LOG_FILTER};
pub use error::{format_error_chain, log_error, CoreError, CoreResult};
pub use logging::{init_logging, init_logging_from, LogSink, MemorySink, SinkLayer};
pub use retry::{poll_until, RetryPolicy};
pub use session::SessionContext;
