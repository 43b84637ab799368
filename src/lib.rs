pub mod api;
pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;

pub use errors::*;
pub use logging::{
    defaults, install_defaults, log_err, LogDefaults, LogOptions, LogRecord, LogSink, MemorySink,
    TracingSink,
};
