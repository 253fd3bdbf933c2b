//! A "prelude" for easily importing the most common error handling items.

pub use super::config::ConfigError;
pub use super::network::TransportError;
pub use super::{
    AttemptFailure, ConfigResult, Context, ErrorCategory, ProxyError, Result, TransportResult,
};

pub use crate::{bail, ensure};
