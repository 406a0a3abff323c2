//! floor codec errors

use thiserror::Error;

/// Errors raised while configuring, encoding or decoding a floor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FloorError {
    /// Malformed floor configuration, detected once at lookup construction
    #[error("Invalid floor configuration: {0}")]
    InvalidConfig(String),

    /// Malformed codebook
    #[error("Invalid codebook: {0}")]
    InvalidCodebook(String),

    /// Caller handed in buffers that do not match the configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The packet decoded but described an impossible floor
    #[error("Malformed floor packet: {0}")]
    MalformedPacket(String),

    /// The packet ended before the floor was complete
    #[error("End of packet")]
    EndOfPacket,

    /// A post payload that none of the class's sub-books can represent
    #[error("Post {post} payload {value} does not fit any sub-book of class {class}")]
    Unencodable { post: usize, class: usize, value: u32 },

    /// Setup file could not be parsed
    #[error("Setup error: {0}")]
    Setup(String),
}

impl FloorError {
    /// true for errors caused by a damaged or truncated packet
    pub fn is_stream_error(&self) -> bool {
        matches!(self, FloorError::MalformedPacket(_) | FloorError::EndOfPacket)
    }
}

/// result type for floor stuff
pub type FloorResult<T> = Result<T, FloorError>;
