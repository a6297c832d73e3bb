use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SiriusError>;

/// Errors arising while parsing or writing a 24-byte frame header.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("bad frame magic: expected {expected:#x}, got {got:#x}")]
    BadMagic { expected: u32, got: u32 },
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: u32, max: u32 },
    #[error("frame truncated")]
    Truncated,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors arising while decoding a message payload carried inside a frame.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("unknown payload type {0}")]
    UnknownPayloadType(u32),
    #[error("message truncated")]
    Truncated,
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("field {0} has an invalid length")]
    InvalidLength(&'static str),
}

/// Errors arising while loading or validating the rank topology file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("rank id {0} is declared more than once")]
    DuplicateRank(u32),
    #[error("rank {0} names primary_rank_id {1}, which is not a primary rank")]
    DanglingPrimary(u32, u32),
    #[error("rank {0} has max_size 0 but a nonzero redundant_node_num")]
    RedundantWithoutCapacity(u32),
    #[error("no client address configured; pass --clientaddr or set [server].client_addr")]
    MissingClientAddr,
}

/// The umbrella error type for anything that can fail at the top level of the service.
#[derive(Debug, Error)]
pub enum SiriusError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
