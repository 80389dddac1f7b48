use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize object storage: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("Failed to initialize completion provider: {0}")]
    Completion(#[source] anyhow::Error),
}
