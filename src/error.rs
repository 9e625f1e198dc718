use burn::record::RecorderError;
use thiserror::Error;

/// Errors raised while building or driving a board.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
}

/// Errors raised by the learning agent, its value function and the evaluation harness.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("no samples available")]
    EmptySampleSet,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("board error: {0}")]
    Board(#[from] BoardError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("model record error: {0}")]
    Record(#[from] RecorderError),
    #[error("checkpoint encoding failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("checkpoint decoding failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}
