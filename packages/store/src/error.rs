use thiserror::Error;

/// Failures reading or writing client-side state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not serialize stored value: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("could not write configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}
