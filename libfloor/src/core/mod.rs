pub mod bitpack;
pub mod codebook;
pub mod error;
pub mod tables;
pub mod types;

pub use bitpack::{BitReader, BitWriter};
pub use codebook::{Codebook, CodebookConfig};
pub use error::{FloorError, FloorResult};
pub use tables::{db_quant, FROM_DB};
pub use types::*;
