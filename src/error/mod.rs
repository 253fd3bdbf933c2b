//! The unified error handling system for the gateway.

// 1. Core Types
pub use types::{AttemptFailure, ProxyError};

/// A unified `Result` type for the entire gateway.
///
/// All functions that can fail should return this type.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Result alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, config::ConfigError>;

/// Result alias for a single outbound attempt.
pub type TransportResult<T> = std::result::Result<T, network::TransportError>;

// 3. Module declarations
pub mod config;
pub mod macros;
pub mod network;
pub mod prelude;
pub mod types;

// 4. Context Trait for adding context to errors.
pub trait Context<T, E> {
    /// Wrap the error with a static context message.
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display;

    /// Wrap the error with a lazily built context message.
    #[track_caller]
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E> Context<T, E> for std::result::Result<T, E>
where
    E: Into<ProxyError>,
{
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display,
    {
        self.with_context(|| context)
    }

    #[track_caller]
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => {
                let context_message = context().to_string();
                Err(ProxyError::Context {
                    context: context_message,
                    source: Box::new(error.into()),
                })
            }
        }
    }
}

// 5. Error Category for monitoring and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Errors caused by the client (e.g., missing target, bad method).
    /// Corresponds to 4xx HTTP status codes.
    Client,
    /// Errors caused by the gateway or the relays behind it.
    /// Corresponds to 5xx HTTP status codes.
    Server,
}

#[cfg(test)]
mod tests;
