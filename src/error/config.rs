use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration parse failed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration load failed: {0}")]
    Load(String),

    #[error("Invalid configuration field `{field}`: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    /// 创建字段校验错误
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
