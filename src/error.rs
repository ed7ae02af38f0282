use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    #[error("lapjv error: {0}")]
    Lapjv(String),
    #[error("invalid tracker config: {0}")]
    InvalidConfig(String),
}
