//! The arithmetic decoder (Annex E).
//!
//! "The arithmetic encoding procedure encodes a string of binary symbols.
//! The arithmetic decoding procedure receives an arithmetically coded bit
//! sequence and an associated sequence of context labels, and reconstructs
//! the original string of binary symbols." (E.1.1)
//!
//! The decoder pulls bytes lazily from a borrowed payload slice. A `0xFF`
//! byte followed by a byte greater than `0x8F` is the stream terminator;
//! once it is seen the decoder behaves as if an endless run of 1-bits
//! followed, without reading further. Running off the end of the payload
//! *before* a terminator appeared sets a sticky [`exhausted`] flag that
//! region decoders check and treat as fatal.
//!
//! [`exhausted`]: ArithmeticDecoder::exhausted

use crate::error::{ParseError, Result, err};

/// The arithmetic decoder state (E.3).
///
/// "State variables used by the arithmetic decoder procedures are described
/// in Table E.1." (E.3.1)
pub struct ArithmeticDecoder<'a> {
    /// The underlying encoded data.
    data: &'a [u8],
    /// "Chigh and Clow can be thought of as one 32-bit C-register" (E.3.1)
    c: u32,
    /// "A-register" (E.3.1)
    a: u32,
    /// "BP - A pointer to the compressed data"
    bp: usize,
    /// "CT - The bit counter"
    ct: u32,
    /// A terminator marker has been reached; all further input is synthetic.
    marker_seen: bool,
    /// The payload ran out before any terminator marker appeared.
    exhausted: bool,
}

impl<'a> ArithmeticDecoder<'a> {
    /// Start the decoder on the given payload.
    ///
    /// Fails if the payload is empty: the INITDEC procedure must be able to
    /// read at least one byte.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return err!(ParseError::UnexpectedEof);
        }

        let mut decoder = Self {
            data,
            c: 0,
            a: 0,
            bp: 0,
            ct: 0,
            marker_seen: false,
            exhausted: false,
        };

        decoder.initialize();

        Ok(decoder)
    }

    /// Whether the payload ran out before a terminator marker.
    ///
    /// Decoding stays deterministic past this point (missing bytes are
    /// synthesized as the terminator pattern), but the output is garbage and
    /// callers must fail the enclosing region.
    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    /// Read the next bit using the given context.
    ///
    /// The DECODE procedure (E.3.2, Figure G.2).
    #[inline(always)]
    pub fn decode(&mut self, cx: &mut Context) -> u32 {
        let entry = &QE_TABLE[cx.index()];

        // Figure G.2: "A = A - Qe(I(CX))"
        self.a -= u32::from(entry.qe);

        let d;

        // Figure G.2: "Chigh < A?"
        if (self.c >> 16) < self.a {
            // Figure G.2: "A AND 0x8000 = 0?"
            if self.a & 0x8000 == 0 {
                d = self.exchange_mps(cx, entry);
                self.renormalize();
            } else {
                d = cx.mps();
            }
        } else {
            // Figure G.2: "Chigh = Chigh - A; D = LPS_EXCHANGE; RENORMD"
            self.c -= self.a << 16;

            d = self.exchange_lps(cx, entry);
            self.renormalize();
        }

        d
    }

    /// The INITDEC procedure (E.3.5, Figure G.1).
    fn initialize(&mut self) {
        // Figure G.1: "C = (B XOR 0xFF) << 16"
        self.c = (u32::from(self.data[0]) ^ 0xff) << 16;

        // Figure G.1: "BYTEIN"
        self.byte_in();

        // Figure G.1: "C = C << 7; CT = CT - 7; A = 0x8000"
        self.c <<= 7;
        self.ct -= 7;
        self.a = 0x8000;
    }

    /// The BYTEIN procedure (E.3.4, Figure G.3).
    ///
    /// "This procedure reads in one byte of data, compensating for any stuff
    /// bits following the 0xFF byte in the process." (E.3.4)
    #[inline(always)]
    fn byte_in(&mut self) {
        let current = self.byte_at(self.bp);

        // Figure G.3: "B = 0xFF?" (a missing byte reads as a marker)
        if current.is_none_or(|b| b == 0xff) {
            let next = self.byte_at(self.bp + 1).unwrap_or(0xff);

            // Figure G.3: "B1 > 0x8F?"
            // "If B1 exceeds 0x8F, then B1 must be one of the marker codes."
            if next > 0x8f {
                if current.is_some() {
                    // A real 0xFF byte: a genuine terminator, even when the
                    // marker byte itself had to be synthesized.
                    self.marker_seen = true;
                } else if !self.marker_seen {
                    self.exhausted = true;
                }

                // Figure G.3: "CT = 8" (marker found, don't advance)
                self.ct = 8;
            } else {
                // Figure G.3: "BP = BP + 1; C = C + 0xFE00 - (B << 9); CT = 7"
                self.bp += 1;
                self.c = self
                    .c
                    .wrapping_add(0xfe00)
                    .wrapping_sub(u32::from(next) << 9);
                self.ct = 7;
            }
        } else {
            // Figure G.3: "BP = BP + 1; C = C + 0xFF00 - (B << 8); CT = 8"
            self.bp += 1;
            let byte = self.byte_at(self.bp);
            if byte.is_none() && !self.marker_seen {
                self.exhausted = true;
            }
            self.c = self
                .c
                .wrapping_add(0xff00)
                .wrapping_sub(u32::from(byte.unwrap_or(0xff)) << 8);
            self.ct = 8;
        }
    }

    /// The RENORMD procedure (E.3.3, Figure E.18).
    ///
    /// "A counter keeps track of the number of compressed bits in the Clow
    /// section of the C-register. When CT is zero, a new byte is inserted
    /// into Clow in the BYTEIN procedure." (E.3.3)
    #[inline(always)]
    fn renormalize(&mut self) {
        loop {
            if self.ct == 0 {
                self.byte_in();
            }

            // Figure E.18: "A = A << 1; C = C << 1; CT = CT - 1"
            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            // Figure E.18: exit when bit 15 of A is set again.
            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    /// The `MPS_EXCHANGE` procedure (E.3.2, Figure E.16).
    #[inline(always)]
    fn exchange_mps(&mut self, cx: &mut Context, entry: &QeData) -> u32 {
        let d;

        // Figure E.16: "A < Qe(I(CX))?"
        if self.a < u32::from(entry.qe) {
            // Conditional exchange: the interval sizes have crossed over.
            d = 1 - cx.mps();

            if entry.switch {
                cx.flip_mps();
            }

            cx.set_index(entry.nlps);
        } else {
            d = cx.mps();
            cx.set_index(entry.nmps);
        }

        d
    }

    /// The `LPS_EXCHANGE` procedure (E.3.2, Figure E.17).
    #[inline(always)]
    fn exchange_lps(&mut self, cx: &mut Context, entry: &QeData) -> u32 {
        let d;

        // Figure E.17: "A < Qe(I(CX))?"
        if self.a < u32::from(entry.qe) {
            self.a = u32::from(entry.qe);
            d = cx.mps();
            cx.set_index(entry.nmps);
        } else {
            self.a = u32::from(entry.qe);
            d = 1 - cx.mps();

            if entry.switch {
                cx.flip_mps();
            }

            cx.set_index(entry.nlps);
        }

        d
    }

    #[inline(always)]
    fn byte_at(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }
}

/// One probability-state cell (E.2.4).
///
/// "Each context has associated with it an index, I(CX), which identifies a
/// particular probability estimate and its associated MPS value." (E.2.4)
///
/// The cell is a single byte: the estimator index in the low seven bits and
/// the more-probable-symbol sense in the top bit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Context(u8);

impl Context {
    /// "I(CX) - Index for context CX"
    #[inline(always)]
    fn index(self) -> usize {
        usize::from(self.0 & 0x7f)
    }

    /// "MPS(CX) - The sense of MPS for context CX"
    #[inline(always)]
    fn mps(self) -> u32 {
        u32::from(self.0 >> 7)
    }

    #[inline(always)]
    fn set_index(&mut self, index: u8) {
        self.0 = (self.0 & 0x80) | index;
    }

    #[inline(always)]
    fn flip_mps(&mut self) {
        self.0 ^= 0x80;
    }
}

/// Qe value table entry (Table E.1).
#[derive(Debug, Clone, Copy)]
struct QeData {
    /// "`Qe_Value`" - The probability estimate
    qe: u16,
    /// "NMPS" - Next index if MPS is coded
    nmps: u8,
    /// "NLPS" - Next index if LPS is coded
    nlps: u8,
    /// "SWITCH" - MPS/LPS symbol switch
    switch: bool,
}

macro_rules! qe {
    ($($qe:expr, $nmps:expr, $nlps:expr, $switch:expr),+ $(,)?) => {
        [
            $(
                QeData {
                    qe: $qe,
                    nmps: $nmps,
                    nlps: $nlps,
                    switch: $switch,
                }
            ),+
        ]
    };
}

/// "Table E.1 - Qe values and probability estimation process"
#[rustfmt::skip]
static QE_TABLE: [QeData; 47] = qe!(
    // Index  Qe_Value  NMPS  NLPS  SWITCH
    /*  0 */ 0x5601,    1,    1,    true,
    /*  1 */ 0x3401,    2,    6,    false,
    /*  2 */ 0x1801,    3,    9,    false,
    /*  3 */ 0x0AC1,    4,    12,   false,
    /*  4 */ 0x0521,    5,    29,   false,
    /*  5 */ 0x0221,    38,   33,   false,
    /*  6 */ 0x5601,    7,    6,    true,
    /*  7 */ 0x5401,    8,    14,   false,
    /*  8 */ 0x4801,    9,    14,   false,
    /*  9 */ 0x3801,    10,   14,   false,
    /* 10 */ 0x3001,    11,   17,   false,
    /* 11 */ 0x2401,    12,   18,   false,
    /* 12 */ 0x1C01,    13,   20,   false,
    /* 13 */ 0x1601,    29,   21,   false,
    /* 14 */ 0x5601,    15,   14,   true,
    /* 15 */ 0x5401,    16,   14,   false,
    /* 16 */ 0x5101,    17,   15,   false,
    /* 17 */ 0x4801,    18,   16,   false,
    /* 18 */ 0x3801,    19,   17,   false,
    /* 19 */ 0x3401,    20,   18,   false,
    /* 20 */ 0x3001,    21,   19,   false,
    /* 21 */ 0x2801,    22,   19,   false,
    /* 22 */ 0x2401,    23,   20,   false,
    /* 23 */ 0x2201,    24,   21,   false,
    /* 24 */ 0x1C01,    25,   22,   false,
    /* 25 */ 0x1801,    26,   23,   false,
    /* 26 */ 0x1601,    27,   24,   false,
    /* 27 */ 0x1401,    28,   25,   false,
    /* 28 */ 0x1201,    29,   26,   false,
    /* 29 */ 0x1101,    30,   27,   false,
    /* 30 */ 0x0AC1,    31,   28,   false,
    /* 31 */ 0x09C1,    32,   29,   false,
    /* 32 */ 0x08A1,    33,   30,   false,
    /* 33 */ 0x0521,    34,   31,   false,
    /* 34 */ 0x0441,    35,   32,   false,
    /* 35 */ 0x02A1,    36,   33,   false,
    /* 36 */ 0x0221,    37,   34,   false,
    /* 37 */ 0x0141,    38,   35,   false,
    /* 38 */ 0x0111,    39,   36,   false,
    /* 39 */ 0x0085,    40,   37,   false,
    /* 40 */ 0x0049,    41,   38,   false,
    /* 41 */ 0x0025,    42,   39,   false,
    /* 42 */ 0x0015,    43,   40,   false,
    /* 43 */ 0x0009,    44,   41,   false,
    /* 44 */ 0x0005,    45,   42,   false,
    /* 45 */ 0x0001,    45,   43,   false,
    /* 46 */ 0x5601,    46,   46,   false,
);
