//! LZO1X decompression.
//!
//! The decoder is a small state machine over a byte cursor. Every read is bounds checked against
//! the input and every write against the output slice; nothing is ever allocated or resized.

use byteorder::{ReadBytesExt, LE};
use std::io::Cursor;

use crate::format::*;
use crate::{debug, trace, Error};

/// Decompress `input` into `output`, returning the number of bytes written.
///
/// `output` has to be at least as large as the decompressed data, which LZO does not record;
/// if it is too small this fails with [`Error::OutputOverrun`].
///
/// If the stream ends before `input` does, this returns [`Error::InputNotConsumed`]. The
/// decompressed data in `output` is complete and correct in that case.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(input_len = input.len(), output_len = output.len())))]
pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
    Decoder::new(input, output).run()
}

/// Decompress `input` into a new vector of at most `buffer_size` bytes.
///
/// `buffer_size` should be the expected decompressed size. The vector is truncated to the number
/// of bytes actually produced.
pub fn decompress_to_vec(input: &[u8], buffer_size: usize) -> Result<Vec<u8>, Error> {
    let mut vec = vec![0u8; buffer_size];
    let len = decompress(input, &mut vec)?;
    vec.truncate(len);
    Ok(vec)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    /// Nothing read yet. The first byte may be a literal run the rest of the grammar can't express.
    Start,
    /// Read and classify the next command byte, unless it has already been read.
    ReadCommand(Option<u8>),
    /// Copy `len` bytes verbatim from the input.
    CopyLiteral { len: usize, then: LiteralState },
    /// Copy `len` bytes from `distance` bytes back in the output, then `trailing` literal bytes.
    CopyMatch { distance: usize, len: usize, trailing: usize },
    End,
}

struct Decoder<'a> {
    reader: Cursor<&'a [u8]>,
    output: &'a mut [u8],
    written: usize,
    literal_state: LiteralState,
}

impl<'a> Decoder<'a> {
    fn new(input: &'a [u8], output: &'a mut [u8]) -> Self {
        Decoder {
            reader: Cursor::new(input),
            output,
            written: 0,
            literal_state: LiteralState::AfterMatch,
        }
    }

    fn run(mut self) -> Result<usize, Error> {
        // the shortest stream is a lone end marker
        if self.reader.get_ref().len() < END_MARKER.len() {
            return Err(Error::InputOverrun);
        }

        let mut state = State::Start;
        loop {
            state = match state {
                State::Start => self.start()?,
                State::ReadCommand(pending) => self.read_command(pending)?,
                State::CopyLiteral { len, then } => {
                    self.copy_literal(len)?;
                    self.literal_state = then;
                    State::ReadCommand(None)
                }
                State::CopyMatch { distance, len, trailing } => {
                    self.copy_match(distance, len)?;
                    State::CopyLiteral { len: trailing, then: LiteralState::from_run(trailing) }
                }
                State::End => break,
            };
        }

        self.finish()
    }

    fn start(&mut self) -> Result<State, Error> {
        let first = self.read_u8()?;
        if first >= 18 {
            let len = first as usize - 17;
            Ok(State::CopyLiteral { len, then: LiteralState::from_run(len) })
        } else {
            Ok(State::ReadCommand(Some(first)))
        }
    }

    fn read_command(&mut self, pending: Option<u8>) -> Result<State, Error> {
        let inst = match pending {
            Some(inst) => inst,
            None => self.read_u8()?,
        };
        let inst_bits = inst as usize;

        if inst >= 0x40 {
            // M2: 1LLDDDSS copies 5-8 bytes, 01LDDDSS copies 3-4 bytes, within 2KiB
            let next = self.read_u8()? as usize;
            Ok(State::CopyMatch {
                distance: (next << 3) + ((inst_bits >> 2) & 0x7) + 1,
                len: (inst_bits >> 5) + 1,
                trailing: inst_bits & 0x3,
            })
        } else if inst & M3_MARKER != 0 {
            // M3: 001LLLLL, then LE16 DDDDDDDD DDDDDDSS, within 16KiB
            let len = match inst_bits & 0x1f {
                0 => read_extended_count(&mut self.reader, M3_MAX_LEN)?,
                l => l + 2,
            };
            let raw = self.read_u16()? as usize;
            Ok(State::CopyMatch { distance: (raw >> 2) + 1, len, trailing: raw & 0x3 })
        } else if inst & M4_MARKER != 0 {
            // M4: 0001HLLL, then LE16 DDDDDDDD DDDDDDSS, from 16KiB to 48KiB
            let len = match inst_bits & 0x7 {
                0 => read_extended_count(&mut self.reader, M4_MAX_LEN)?,
                l => l + 2,
            };
            let raw = self.read_u16()? as usize;
            let stored = ((inst_bits & 0x8) << 11) + (raw >> 2);
            if stored == 0 {
                // the end marker is always encoded with length 3
                if len != 3 {
                    trace!(len, "end marker with bad length");
                    return Err(Error::Unknown);
                }
                return Ok(State::End);
            }
            Ok(State::CopyMatch { distance: stored + M4_BASE_OFFSET, len, trailing: raw & 0x3 })
        } else {
            match self.literal_state {
                LiteralState::AfterMatch => {
                    // 0000LLLL: a literal run of 4-18 bytes, or longer when extended
                    let len = match inst_bits {
                        0 => read_extended_count(&mut self.reader, LITERAL_MAX_INLINE)?,
                        l => l + 3,
                    };
                    Ok(State::CopyLiteral { len, then: LiteralState::Long })
                }
                LiteralState::Short(_) => {
                    // M1 short: 0000DDSS DDDDDDDD, two bytes within 1KiB
                    let next = self.read_u8()? as usize;
                    Ok(State::CopyMatch {
                        distance: (inst_bits >> 2) + (next << 2) + 1,
                        len: 2,
                        trailing: inst_bits & 0x3,
                    })
                }
                LiteralState::Long => {
                    // M1 long: 0000DDSS DDDDDDDD, three bytes between 2KiB and 3KiB
                    let next = self.read_u8()? as usize;
                    Ok(State::CopyMatch {
                        distance: (inst_bits >> 2) + (next << 2) + M2_MAX_OFFSET + 1,
                        len: 3,
                        trailing: inst_bits & 0x3,
                    })
                }
            }
        }
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        self.reader.read_u8().map_err(|_| Error::InputOverrun)
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        self.reader.read_u16::<LE>().map_err(|_| Error::InputOverrun)
    }

    fn copy_literal(&mut self, len: usize) -> Result<(), Error> {
        if len == 0 {
            return Ok(());
        }
        let input: &'a [u8] = *self.reader.get_ref();
        let start = self.reader.position() as usize;
        let end = start.checked_add(len).ok_or(Error::InputOverrun)?;
        let literal = input.get(start..end).ok_or(Error::InputOverrun)?;

        let out_end = self.written.checked_add(len).ok_or(Error::OutputOverrun)?;
        self.output
            .get_mut(self.written..out_end)
            .ok_or(Error::OutputOverrun)?
            .copy_from_slice(literal);

        self.reader.set_position(end as u64);
        self.written = out_end;
        Ok(())
    }

    /// Copy `len` bytes from `distance` bytes back. Source and destination overlap whenever
    /// `distance < len`; the copy has to go byte by byte so that it reads what it just wrote.
    fn copy_match(&mut self, distance: usize, len: usize) -> Result<(), Error> {
        let source = self.written.checked_sub(distance).ok_or(Error::LookbehindOverrun)?;
        let out_end = self
            .written
            .checked_add(len)
            .filter(|&end| end <= self.output.len())
            .ok_or(Error::OutputOverrun)?;
        for i in 0..len {
            self.output[self.written + i] = self.output[source + i];
        }
        self.written = out_end;
        Ok(())
    }

    fn finish(self) -> Result<usize, Error> {
        let consumed = self.reader.position() as usize;
        let available = self.reader.get_ref().len();
        if consumed < available {
            trace!(trailing = available - consumed, "input not consumed");
            return Err(Error::InputNotConsumed);
        }
        debug!(written = self.written, "decompressed");
        Ok(self.written)
    }
}
