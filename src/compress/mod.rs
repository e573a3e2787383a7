//! The compression algorithm.
//!
//! A single greedy pass: at every position we ask the hash chains for the longest match and take
//! it if the grammar can encode it profitably. Bytes without a match pile up in a literal run that
//! is only written once the next match (or the end of input) is reached, because the encoding of
//! a short run depends on the match before it.

mod match_finder;

pub use match_finder::{Match, MatchFinder, MAX_MATCH_LEN};

use fehler::{throw, throws};

use crate::format::*;
use crate::{debug, trace, Error};

/// Worst-case compressed size for an input of `len` bytes.
///
/// Incompressible input ends up as one literal run, which costs a command byte plus one byte per
/// 255 bytes of length. Matches never cost more than the bytes they replace.
pub const fn compress_worst_size(len: usize) -> usize {
    len + len / 16 + 64 + 3
}

/// Tuning knobs for the encoder.
#[derive(Clone, Debug)]
pub struct CompressionSettings {
    max_chain: usize,
    max_match_len: usize,
}
impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            max_chain: 128,
            max_match_len: MAX_MATCH_LEN,
        }
    }
}
impl CompressionSettings {
    /// How many earlier positions with the same hash are compared per input byte.
    /// More is slower but finds longer matches. Zero is treated as one.
    pub fn max_chain(&mut self, v: usize) -> &mut Self {
        self.max_chain = v;
        self
    }
    /// Longest match to look for, between 3 and 2048.
    pub fn max_match_len(&mut self, v: usize) -> &mut Self {
        self.max_match_len = v;
        self
    }

    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>, Error> {
        Compressor::with_settings(self).compress(input)
    }

    pub fn compress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
        Compressor::with_settings(self).compress_into(input, output)
    }
}

/// An encoder that keeps its hash tables allocated between calls.
///
/// The tables are cleared at the start of every call; nothing from one input is ever matched
/// against another.
pub struct Compressor {
    finder: MatchFinder,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::with_settings(&CompressionSettings::default())
    }
}

impl Compressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: &CompressionSettings) -> Self {
        Compressor {
            finder: MatchFinder::new(settings.max_chain, settings.max_match_len),
        }
    }

    /// Compress `input` into a freshly allocated vector.
    pub fn compress(&mut self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0u8; compress_worst_size(input.len())];
        let len = self.compress_into(input, &mut buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Compress `input` into `output`, returning the number of bytes written.
    ///
    /// Fails with [`Error::OutputOverrun`] if `output` is too small; its contents are unspecified
    /// in that case. A buffer of [`compress_worst_size`] bytes is always large enough.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(input_len = input.len())))]
    pub fn compress_into(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
        let mut out = OutputBuffer::new(output);
        self.finder.reset();
        encode(&mut self.finder, input, &mut out)?;
        let written = out.position();
        debug!(written, "compressed");
        Ok(written)
    }
}

/// Compress `input` into a freshly allocated vector.
pub fn compress(input: &[u8]) -> Result<Vec<u8>, Error> {
    Compressor::new().compress(input)
}

/// Compress `input` into `output`, returning the number of bytes written.
pub fn compress_into(input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
    Compressor::new().compress_into(input, output)
}

#[throws]
fn encode(finder: &mut MatchFinder, input: &[u8], out: &mut OutputBuffer<'_>) {
    let mut cursor = 0;
    let mut literal_start = 0;
    while cursor < input.len() {
        let window_start = cursor.saturating_sub(MAX_DISTANCE);
        let candidate = finder.find_best_match(input, cursor, window_start);
        finder.insert(input, cursor);

        let literal_len = cursor - literal_start;
        let started = out.position() > 0;
        match candidate.filter(|m| worth_encoding(m, literal_len, started)) {
            Some(duplicate) => {
                if literal_len > 0 {
                    write_literal_run(out, &input[literal_start..cursor])?;
                }
                write_match(out, duplicate, LiteralState::from_run(literal_len))?;
                // keep the chains complete: positions inside the match can be matched later on
                for pos in cursor + 1..cursor + duplicate.len {
                    finder.insert(input, pos);
                }
                cursor += duplicate.len;
                literal_start = cursor;
            }
            None => cursor += 1,
        }
    }

    if literal_start < input.len() {
        write_literal_run(out, &input[literal_start..])?;
    }
    out.push(&END_MARKER)?;
}

/// Whether `duplicate` can be encoded after a literal run of `literal_len` bytes, and whether
/// doing so beats emitting its bytes as literals.
fn worth_encoding(duplicate: &Match, literal_len: usize, started: bool) -> bool {
    match duplicate.len {
        0 | 1 => false,
        // M1 short: only decodable right after a short literal run that follows a match
        2 => duplicate.distance <= M1_MAX_OFFSET && (1..=3).contains(&literal_len) && started,
        // three bytes cost three bytes as M3/M4 and would end a long literal run for nothing
        len if len == M2_MIN_LEN => {
            literal_len < 4 || duplicate.distance <= M1_MAX_OFFSET + M2_MAX_OFFSET
        }
        _ => true,
    }
}

#[throws]
fn write_literal_run(out: &mut OutputBuffer<'_>, literal: &[u8]) {
    let len = literal.len();
    if out.position() == 0 && len <= FIRST_LITERAL_MAX {
        out.push(&[17 + len as u8])?;
    } else if len <= 3 {
        out.patch_state(len)?;
    } else if len <= LITERAL_MAX_INLINE {
        out.push(&[(len - 3) as u8])?;
    } else {
        out.push(&[0])?;
        write_extended_count(out, len, LITERAL_MAX_INLINE)?;
    }
    out.push(literal)?;
}

/// Write the command byte of an M3/M4 match, extending the length if it does not fit.
#[throws]
fn write_match_len(out: &mut OutputBuffer<'_>, marker: u8, len: usize, max_inline: usize) {
    if len <= max_inline {
        out.push(&[marker | (len - 2) as u8])?;
    } else {
        out.push(&[marker])?;
        write_extended_count(out, len, max_inline)?;
    }
}

/// Write `duplicate` using the smallest command shape that can express it.
#[throws]
fn write_match(out: &mut OutputBuffer<'_>, duplicate: Match, before: LiteralState) {
    let Match { distance, len } = duplicate;
    if distance == 0 || distance > MAX_DISTANCE || len < 2 {
        throw!(Error::Unknown);
    }

    if len == 2 {
        if distance > M1_MAX_OFFSET || !matches!(before, LiteralState::Short(_)) {
            throw!(Error::Unknown);
        }
        let off = distance - 1;
        out.push(&[((off & 0x3) << 2) as u8, (off >> 2) as u8])?;
    } else if len <= M2_MAX_LEN && distance <= M2_MAX_OFFSET {
        let off = distance - 1;
        out.push(&[((len - 1) << 5 | (off & 0x7) << 2) as u8, (off >> 3) as u8])?;
    } else if len == M2_MIN_LEN && distance <= M1_MAX_OFFSET + M2_MAX_OFFSET && before == LiteralState::Long {
        // M1 long: a three byte match just beyond the M2 range, after a long literal run
        let off = distance - 1 - M2_MAX_OFFSET;
        out.push(&[((off & 0x3) << 2) as u8, (off >> 2) as u8])?;
    } else if distance <= M3_MAX_OFFSET {
        let off = distance - 1;
        write_match_len(out, M3_MARKER, len, M3_MAX_LEN)?;
        out.push_u16_le((off << 2) as u16)?;
    } else {
        let off = distance - M4_BASE_OFFSET;
        let marker = M4_MARKER | ((off & 0x4000) >> 11) as u8;
        write_match_len(out, marker, len, M4_MAX_LEN)?;
        out.push_u16_le((off << 2) as u16)?;
    }
    trace!(distance, len, "match");
}
