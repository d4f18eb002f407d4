/*!
A decoder for MMR (ITU-T T.6, "Group 4") coded bi-level image data.

MMR codes each row against the previous one by the positions at which the
pixel colour changes. This crate decodes the two-dimensional modes (pass,
horizontal, vertical) and the T.4 run-length alphabets, reporting decoded
runs to a caller-supplied [`RowSink`] so the caller chooses its own pixel
representation.

The decoder is deliberately small: no Group 3 modes, no fill bits, no
byte-aligned rows. It covers exactly what MMR-coded JBIG2 region segments
need.

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]

mod bit_reader;
mod tables;

use core::fmt;

use log::warn;

use crate::bit_reader::BitReader;
use crate::tables::{BLACK_CODES, EOFB, EOL, MAX_RUN_CODE_LEN, Mode, RunCode, SHARED_MAKEUP_CODES, WHITE_CODES};

/// Decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmrError {
    /// A bit sequence matched no code word of the expected alphabet.
    InvalidCode,
    /// A decoded run extended past the end of the row, or moved backwards.
    RunOutOfRange,
    /// An extension (two-dimensional uncompressed) mode code was found.
    UnsupportedExtension,
}

impl fmt::Display for MmrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCode => write!(f, "invalid MMR code word"),
            Self::RunOutOfRange => write!(f, "MMR run out of range"),
            Self::UnsupportedExtension => write!(f, "MMR extension modes are not supported"),
        }
    }
}

impl core::error::Error for MmrError {}

/// Decoding parameters.
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    /// Row width in pixels.
    pub width: u32,
    /// Number of rows to decode.
    pub rows: u32,
}

/// Receives decoded pixel runs, one row at a time.
///
/// Rows are reported left to right as half-open pixel ranges; ranges of both
/// colours are reported so a sink may choose to ignore the white ones.
pub trait RowSink {
    /// A run of `black` (or white) pixels covering columns `x0..x1`.
    fn fill(&mut self, x0: u32, x1: u32, black: bool);
    /// The current row is complete.
    fn end_row(&mut self);
}

/// Decode `params.rows` rows of MMR data into `sink`.
///
/// Returns the number of whole input bytes consumed, including a trailing
/// EOFB if one is present. Decoding an integral number of bytes may involve
/// skipping bits in the last byte read.
pub fn decode(data: &[u8], sink: &mut impl RowSink, params: &DecodeParams) -> Result<usize, MmrError> {
    let mut decoder = Decoder::new(data, params);

    decoder.decode_rows(sink)?;

    decoder.reader.align();
    Ok(decoder.reader.consumed_bytes())
}

/// Changing-element decoding state for one image.
struct Decoder<'a> {
    reader: BitReader<'a>,
    width: u32,
    rows: u32,
    /// Changing-element positions of the reference (previous) row, strictly
    /// increasing. Even indices are white-to-black transitions.
    reference: Vec<u32>,
    /// Changing-element positions of the row being decoded.
    current: Vec<u32>,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8], params: &DecodeParams) -> Self {
        Self {
            reader: BitReader::new(data),
            width: params.width,
            rows: params.rows,
            // "The reference line for the first coding line is an imaginary
            // white line": no transitions at all.
            reference: Vec::new(),
            current: Vec::new(),
        }
    }

    fn decode_rows(&mut self, sink: &mut impl RowSink) -> Result<(), MmrError> {
        for _ in 0..self.rows {
            if self.reader.peek(24) == EOFB {
                self.reader.consume(24);
                // Fewer rows than declared: report the truncation to the
                // caller's log, the remaining rows stay at the sink default.
                warn!("EOFB before all rows were decoded");
                return Ok(());
            }

            self.decode_row(sink)?;
        }

        // "It is permissible for the data stream not to contain an EOFB",
        // but consume one if present so it counts as used input.
        if self.reader.peek(24) == EOFB {
            self.reader.consume(24);
        }

        Ok(())
    }

    fn decode_row(&mut self, sink: &mut impl RowSink) -> Result<(), MmrError> {
        // a0 starts on an imaginary white pixel just left of the row.
        let mut a0: i64 = -1;
        let mut black = false;

        while (a0 as u32) < self.width || a0 < 0 {
            let run_start = a0.max(0) as u32;

            match self.decode_mode()? {
                Mode::Pass => {
                    // Fill up to b2 without a colour change.
                    let (_, b2) = self.find_b(a0, black);
                    sink.fill(run_start, b2, black);
                    a0 = i64::from(b2);
                }
                Mode::Horizontal => {
                    // Two runs, current colour then the opposite one.
                    let first = self.decode_run(black)?;
                    let second = self.decode_run(!black)?;

                    let a1 = u64::from(run_start) + u64::from(first);
                    let a2 = a1 + u64::from(second);
                    if a2 > u64::from(self.width) {
                        return Err(MmrError::RunOutOfRange);
                    }
                    let (a1, a2) = (a1 as u32, a2 as u32);

                    sink.fill(run_start, a1, black);
                    sink.fill(a1, a2, !black);
                    self.current.push(a1);
                    self.current.push(a2);
                    a0 = i64::from(a2);
                }
                Mode::Vertical(delta) => {
                    let (b1, _) = self.find_b(a0, black);
                    let a1 = i64::from(b1) + i64::from(delta);
                    if a1 < i64::from(run_start) || a1 > i64::from(self.width) {
                        return Err(MmrError::RunOutOfRange);
                    }
                    let a1 = a1 as u32;

                    sink.fill(run_start, a1, black);
                    self.current.push(a1);
                    a0 = i64::from(a1);
                    black = !black;
                }
            }
        }

        sink.end_row();
        core::mem::swap(&mut self.reference, &mut self.current);
        self.current.clear();

        Ok(())
    }

    /// Locate (b1, b2) on the reference row.
    ///
    /// b1 is the first changing element to the right of a0 with a colour
    /// opposite to the current one; b2 is the next changing element after it.
    /// Elements that do not exist read as the row width.
    fn find_b(&self, a0: i64, black: bool) -> (u32, u32) {
        let mut i = self.reference.partition_point(|&p| i64::from(p) <= a0);

        // Even indices change towards black; odd ones back towards white.
        let wants_even = !black;
        if (i % 2 == 0) != wants_even {
            i += 1;
        }

        let b1 = self.reference.get(i).copied().unwrap_or(self.width);
        let b2 = self.reference.get(i + 1).copied().unwrap_or(self.width);
        (b1, b2)
    }

    fn decode_mode(&mut self) -> Result<Mode, MmrError> {
        let bits = self.reader.peek(7);

        let (mode, len) = if bits >> 6 == 0b1 {
            (Mode::Vertical(0), 1)
        } else if bits >> 4 == 0b011 {
            (Mode::Vertical(1), 3)
        } else if bits >> 4 == 0b010 {
            (Mode::Vertical(-1), 3)
        } else if bits >> 4 == 0b001 {
            (Mode::Horizontal, 3)
        } else if bits >> 3 == 0b0001 {
            (Mode::Pass, 4)
        } else if bits >> 1 == 0b000011 {
            (Mode::Vertical(2), 6)
        } else if bits >> 1 == 0b000010 {
            (Mode::Vertical(-2), 6)
        } else if bits == 0b0000011 {
            (Mode::Vertical(3), 7)
        } else if bits == 0b0000010 {
            (Mode::Vertical(-3), 7)
        } else if bits == 0b0000001 {
            return Err(MmrError::UnsupportedExtension);
        } else {
            // Seven zero bits: either a stray EOL or garbage.
            if self.reader.peek(12) == EOL {
                warn!("unexpected EOL inside MMR data");
            }
            return Err(MmrError::InvalidCode);
        };

        self.reader.consume(len);
        Ok(mode)
    }

    /// Decode one full run length, accumulating make-up codes until a
    /// terminating code (< 64) arrives.
    fn decode_run(&mut self, black: bool) -> Result<u32, MmrError> {
        let mut total: u32 = 0;

        loop {
            let run = self.decode_run_code(black)?;
            total = total
                .checked_add(u32::from(run))
                .ok_or(MmrError::RunOutOfRange)?;

            if run < 64 {
                return Ok(total);
            }
        }
    }

    fn decode_run_code(&mut self, black: bool) -> Result<u16, MmrError> {
        let bits = self.reader.peek(MAX_RUN_CODE_LEN);
        let table: &[RunCode] = if black { &BLACK_CODES } else { &WHITE_CODES };

        for rc in table.iter().chain(SHARED_MAKEUP_CODES.iter()) {
            if bits >> (MAX_RUN_CODE_LEN - u32::from(rc.len)) == u32::from(rc.code) {
                self.reader.consume(u32::from(rc.len));
                return Ok(rc.run);
            }
        }

        Err(MmrError::InvalidCode)
    }
}
