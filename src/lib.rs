//! Pure Rust implementation of LZO1X compression and decompression.
//!
//! LZO1X is a byte oriented LZ77 format built for decompression speed. There is no entropy coding
//! stage; a stream is simply a sequence of literal runs and lookback matches, terminated by an end
//! marker.
//!
//! ```
//! use lzo_fear::{compress, decompress_to_vec};
//!
//! let data = b"Hello World, Hello World, Hello World";
//! let compressed = compress(data)?;
//! let decompressed = decompress_to_vec(&compressed, data.len())?;
//! assert_eq!(&decompressed[..], &data[..]);
//! # Ok::<(), lzo_fear::Error>(())
//! ```
//!
//! The format does not record the decompressed size. Callers have to transport it themselves and
//! hand the decoder a buffer of that size.

#![forbid(unsafe_code)]

cfg_if::cfg_if! {
    if #[cfg(feature = "tracing")] {
        pub(crate) use tracing::{debug, trace};
    } else {
        macro_rules! debug {
            ($($arg:tt)*) => {};
        }
        macro_rules! trace {
            ($($arg:tt)*) => {};
        }
        pub(crate) use debug;
        pub(crate) use trace;
    }
}

pub mod compress;
pub mod decompress;
pub mod format;

pub use compress::{compress, compress_into, compress_worst_size, CompressionSettings, Compressor};
pub use decompress::{decompress, decompress_to_vec};
pub use format::MAX_DISTANCE;

use std::io::{self, ErrorKind};
use thiserror::Error;

/// Everything that can go wrong while compressing or decompressing.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Error {
    /// A match points before the start of the output.
    /// This only happens with corrupt or foreign input.
    #[error("lookbehind overrun: a match reaches before the start of the output (data corruption?)")]
    LookbehindOverrun,
    /// The output buffer was too small for the result.
    #[error("output overrun: the output buffer is too small")]
    OutputOverrun,
    /// Expected more bytes, but found none.
    /// Either your input was truncated or you're trying to decompress garbage.
    #[error("input overrun: the compressed input is truncated or invalid")]
    InputOverrun,
    /// Decompression reached the end marker, but there are bytes left over after it.
    /// The output buffer holds the complete and correct result.
    #[error("input not consumed: trailing bytes after the end of the compressed stream")]
    InputNotConsumed,
    #[error("unknown error")]
    Unknown,
}

impl Error {
    /// Whether the operation actually produced a usable result despite the error.
    pub fn is_soft(&self) -> bool {
        *self == Error::InputNotConsumed
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        let kind = match e {
            Error::InputOverrun => ErrorKind::UnexpectedEof,
            Error::OutputOverrun => ErrorKind::WriteZero,
            _ => ErrorKind::InvalidData,
        };
        io::Error::new(kind, e)
    }
}
