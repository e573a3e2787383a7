//! The LZO1X stream grammar shared by the encoder and the decoder.
//!
//! Every command is either a literal run or a lookback match. Matches come in four shapes
//! (historically called M1 to M4) that trade distance range against length range. The low two
//! bits of the last-but-one byte of a match carry the length of a short (up to three byte)
//! literal run that follows the match directly, without a command byte of its own.

use byteorder::{ByteOrder, ReadBytesExt, LE};
use fehler::{throw, throws};
use std::io::Read;

use crate::Error;

/// Largest distance a match may reach back into already produced output.
pub const MAX_DISTANCE: usize = 0xBFFF;

/// M1 ("short") matches: two bytes within 1KiB, only after a short literal run.
pub(crate) const M1_MAX_OFFSET: usize = 0x0400;
/// M2 matches: 3 to 8 bytes within 2KiB.
pub(crate) const M2_MAX_OFFSET: usize = 0x0800;
/// M3 matches: any length within 16KiB.
pub(crate) const M3_MAX_OFFSET: usize = 0x4000;
/// M4 distances are stored relative to this base. A stored distance of zero is the end marker.
pub(crate) const M4_BASE_OFFSET: usize = 0x4000;

pub(crate) const M2_MIN_LEN: usize = 3;
pub(crate) const M2_MAX_LEN: usize = 8;
pub(crate) const M3_MAX_LEN: usize = 33;
pub(crate) const M4_MAX_LEN: usize = 9;

pub(crate) const M3_MARKER: u8 = 0x20;
pub(crate) const M4_MARKER: u8 = 0x10;

/// Longest literal run that fits into the first command byte (`17 + len`).
pub(crate) const FIRST_LITERAL_MAX: usize = 238;
/// Longest literal run that fits into a plain long-literal command byte (`len - 3`).
pub(crate) const LITERAL_MAX_INLINE: usize = 18;

/// An M4 match of length 3 at distance 16384: the only valid stream terminator.
pub const END_MARKER: [u8; 3] = [M4_MARKER | 1, 0, 0];

/// Upper bound on the number of zero bytes an extended count may contain
/// before the accumulated value would overflow.
const MAX255_COUNT: usize = usize::MAX / 255 - 2;

/// How the previous command left the decoder.
///
/// Opcodes 0..=15 mean three different things depending on this.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LiteralState {
    /// The last command was a match with no trailing literals.
    AfterMatch,
    /// The last command copied 1..=3 literal bytes.
    Short(usize),
    /// The last command copied four or more literal bytes.
    Long,
}

impl LiteralState {
    pub fn from_run(len: usize) -> Self {
        match len {
            0 => LiteralState::AfterMatch,
            1..=3 => LiteralState::Short(len),
            _ => LiteralState::Long,
        }
    }
}

/// Decode an extended count.
///
/// Every zero byte adds 255, the first non-zero byte adds its own value and ends the count.
/// The result is `base` plus everything read.
pub fn read_extended_count<R: Read>(reader: &mut R, base: usize) -> Result<usize, Error> {
    let mut zeros = 0usize;
    loop {
        let byte = reader.read_u8().map_err(|_| Error::InputOverrun)?;
        if byte != 0 {
            let extended = zeros.checked_mul(255).ok_or(Error::Unknown)?;
            return base
                .checked_add(extended)
                .and_then(|v| v.checked_add(byte as usize))
                .ok_or(Error::Unknown);
        }
        zeros += 1;
        if zeros > MAX255_COUNT {
            return Err(Error::Unknown);
        }
    }
}

/// Encode `value - base` as an extended count.
///
/// Only called for values strictly above `base`; a zero remainder has no encoding.
#[throws]
pub fn write_extended_count(out: &mut OutputBuffer<'_>, value: usize, base: usize) {
    let mut rest = match value.checked_sub(base) {
        Some(rest) if rest > 0 => rest,
        _ => throw!(Error::Unknown),
    };
    while rest > 255 {
        out.push(&[0])?;
        rest -= 255;
    }
    out.push(&[rest as u8])?;
}

/// Cursor over a caller-supplied output slice. Writes that do not fit fail without touching the
/// buffer.
pub struct OutputBuffer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> OutputBuffer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        OutputBuffer { buf, pos: 0 }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize { self.pos }

    #[throws]
    #[inline]
    pub fn push(&mut self, data: &[u8]) {
        let end = self.pos.checked_add(data.len()).ok_or(Error::OutputOverrun)?;
        self.buf
            .get_mut(self.pos..end)
            .ok_or(Error::OutputOverrun)?
            .copy_from_slice(data);
        self.pos = end;
    }

    #[throws]
    #[inline]
    pub fn push_u16_le(&mut self, value: u16) {
        let mut bytes = [0u8; 2];
        LE::write_u16(&mut bytes, value);
        self.push(&bytes)?;
    }

    /// Store the length of a short trailing literal run in the state bits of the match command
    /// written just before.
    #[throws]
    pub fn patch_state(&mut self, run: usize) {
        if run > 3 {
            throw!(Error::Unknown);
        }
        let idx = self.pos.checked_sub(2).ok_or(Error::Unknown)?;
        self.buf[idx] |= run as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip_count(value: usize, base: usize) -> (Vec<u8>, usize) {
        let mut buf = vec![0u8; 64];
        let mut out = OutputBuffer::new(&mut buf);
        write_extended_count(&mut out, value, base).unwrap();
        let written = out.position();
        buf.truncate(written);
        let decoded = read_extended_count(&mut Cursor::new(&buf[..]), base).unwrap();
        (buf, decoded)
    }

    #[test]
    fn extended_count_boundaries() {
        assert_eq!(roundtrip_count(19, 18), (vec![1], 19));
        assert_eq!(roundtrip_count(18 + 255, 18), (vec![255], 18 + 255));
        assert_eq!(roundtrip_count(18 + 256, 18), (vec![0, 1], 18 + 256));
        assert_eq!(roundtrip_count(33 + 478, 33), (vec![0, 223], 511));
        assert_eq!(roundtrip_count(9 + 255 * 3 + 1, 9).0, vec![0, 0, 0, 1]);
    }

    #[test]
    fn extended_count_needs_a_remainder() {
        let mut buf = [0u8; 4];
        let mut out = OutputBuffer::new(&mut buf);
        assert_eq!(write_extended_count(&mut out, 18, 18), Err(Error::Unknown));
    }

    #[test]
    fn extended_count_truncated() {
        let mut cursor = Cursor::new(&[0u8, 0, 0][..]);
        assert_eq!(read_extended_count(&mut cursor, 18), Err(Error::InputOverrun));
    }

    #[test]
    fn output_buffer_rejects_partial_writes() {
        let mut buf = [0u8; 3];
        let mut out = OutputBuffer::new(&mut buf);
        out.push(&[1, 2]).unwrap();
        assert_eq!(out.push(&[3, 4]), Err(Error::OutputOverrun));
        assert_eq!(out.position(), 2);
        out.push(&[3]).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn patch_state_sets_low_bits() {
        let mut buf = [0u8; 4];
        let mut out = OutputBuffer::new(&mut buf);
        out.push(&[0x40, 0x01]).unwrap();
        out.patch_state(3).unwrap();
        assert_eq!(buf[0], 0x43);
    }

    #[test]
    fn literal_state_from_run() {
        assert_eq!(LiteralState::from_run(0), LiteralState::AfterMatch);
        assert_eq!(LiteralState::from_run(2), LiteralState::Short(2));
        assert_eq!(LiteralState::from_run(4), LiteralState::Long);
    }
}
