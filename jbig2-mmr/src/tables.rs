//! Code tables for two-dimensional (T.6) decoding.
//!
//! Run-length codes are the T.4 terminating and make-up codes; the make-up
//! codes for 1792..2560 are shared between the white and black alphabets.
//! Tables are ordered by code length so a linear scan over a single 13-bit
//! peek finds the unique prefix-free match.

/// A single run-length code word.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunCode {
    /// Code length in bits.
    pub len: u8,
    /// The code word, right-aligned.
    pub code: u16,
    /// The decoded run length.
    pub run: u16,
}

/// Maximum code length across both run alphabets.
pub(crate) const MAX_RUN_CODE_LEN: u32 = 13;

/// A two-dimensional coding mode (T.6 Table 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Pass,
    Horizontal,
    /// Vertical mode; the payload is the a1 offset relative to b1 (-3..=3).
    Vertical(i32),
}

/// An end-of-line code word (000000000001).
pub(crate) const EOL: u32 = 0x001;
/// An end-of-facsimile-block marker: two consecutive EOLs.
pub(crate) const EOFB: u32 = (EOL << 12) | EOL;

const fn rc(len: u8, code: u16, run: u16) -> RunCode {
    RunCode { len, code, run }
}

/// White run codes (T.4 Tables 2 and 3), ordered by code length.
#[rustfmt::skip]
pub(crate) static WHITE_CODES: [RunCode; 91] = [
    rc(4, 0x07, 2),    rc(4, 0x08, 3),    rc(4, 0x0B, 4),    rc(4, 0x0C, 5),
    rc(4, 0x0E, 6),    rc(4, 0x0F, 7),
    rc(5, 0x13, 8),    rc(5, 0x14, 9),    rc(5, 0x07, 10),   rc(5, 0x08, 11),
    rc(5, 0x1B, 64),   rc(5, 0x12, 128),
    rc(6, 0x07, 1),    rc(6, 0x08, 12),   rc(6, 0x03, 13),   rc(6, 0x34, 14),
    rc(6, 0x35, 15),   rc(6, 0x2A, 16),   rc(6, 0x2B, 17),   rc(6, 0x17, 192),
    rc(6, 0x18, 1664),
    rc(7, 0x27, 18),   rc(7, 0x0C, 19),   rc(7, 0x08, 20),   rc(7, 0x17, 21),
    rc(7, 0x03, 22),   rc(7, 0x04, 23),   rc(7, 0x28, 24),   rc(7, 0x2B, 25),
    rc(7, 0x13, 26),   rc(7, 0x24, 27),   rc(7, 0x18, 28),   rc(7, 0x37, 256),
    rc(8, 0x35, 0),    rc(8, 0x02, 29),   rc(8, 0x03, 30),   rc(8, 0x1A, 31),
    rc(8, 0x1B, 32),   rc(8, 0x12, 33),   rc(8, 0x13, 34),   rc(8, 0x14, 35),
    rc(8, 0x15, 36),   rc(8, 0x16, 37),   rc(8, 0x17, 38),   rc(8, 0x28, 39),
    rc(8, 0x29, 40),   rc(8, 0x2A, 41),   rc(8, 0x2B, 42),   rc(8, 0x2C, 43),
    rc(8, 0x2D, 44),   rc(8, 0x04, 45),   rc(8, 0x05, 46),   rc(8, 0x0A, 47),
    rc(8, 0x0B, 48),   rc(8, 0x52, 49),   rc(8, 0x53, 50),   rc(8, 0x54, 51),
    rc(8, 0x55, 52),   rc(8, 0x24, 53),   rc(8, 0x25, 54),   rc(8, 0x58, 55),
    rc(8, 0x59, 56),   rc(8, 0x5A, 57),   rc(8, 0x5B, 58),   rc(8, 0x4A, 59),
    rc(8, 0x4B, 60),   rc(8, 0x32, 61),   rc(8, 0x33, 62),   rc(8, 0x34, 63),
    rc(8, 0x36, 320),  rc(8, 0x37, 384),  rc(8, 0x64, 448),  rc(8, 0x65, 512),
    rc(8, 0x68, 576),  rc(8, 0x67, 640),
    rc(9, 0xCC, 704),  rc(9, 0xCD, 768),  rc(9, 0xD2, 832),  rc(9, 0xD3, 896),
    rc(9, 0xD4, 960),  rc(9, 0xD5, 1024), rc(9, 0xD6, 1088), rc(9, 0xD7, 1152),
    rc(9, 0xD8, 1216), rc(9, 0xD9, 1280), rc(9, 0xDA, 1344), rc(9, 0xDB, 1408),
    rc(9, 0x98, 1472), rc(9, 0x99, 1536), rc(9, 0x9A, 1600), rc(9, 0x9B, 1728),
];

/// Black run codes (T.4 Tables 2 and 3), ordered by code length.
#[rustfmt::skip]
pub(crate) static BLACK_CODES: [RunCode; 91] = [
    rc(2, 0x3, 2),     rc(2, 0x2, 3),
    rc(3, 0x2, 1),     rc(3, 0x3, 4),
    rc(4, 0x3, 5),     rc(4, 0x2, 6),
    rc(5, 0x3, 7),
    rc(6, 0x5, 8),     rc(6, 0x4, 9),
    rc(7, 0x4, 10),    rc(7, 0x5, 11),    rc(7, 0x7, 12),
    rc(8, 0x04, 13),   rc(8, 0x07, 14),
    rc(9, 0x18, 15),
    rc(10, 0x37, 0),   rc(10, 0x17, 16),  rc(10, 0x18, 17),  rc(10, 0x08, 18),
    rc(10, 0x0F, 64),
    rc(11, 0x67, 19),  rc(11, 0x68, 20),  rc(11, 0x6C, 21),  rc(11, 0x37, 22),
    rc(11, 0x28, 23),  rc(11, 0x17, 24),  rc(11, 0x18, 25),
    rc(12, 0xCA, 26),  rc(12, 0xCB, 27),  rc(12, 0xCC, 28),  rc(12, 0xCD, 29),
    rc(12, 0x68, 30),  rc(12, 0x69, 31),  rc(12, 0x6A, 32),  rc(12, 0x6B, 33),
    rc(12, 0xD2, 34),  rc(12, 0xD3, 35),  rc(12, 0xD4, 36),  rc(12, 0xD5, 37),
    rc(12, 0xD6, 38),  rc(12, 0xD7, 39),  rc(12, 0x6C, 40),  rc(12, 0x6D, 41),
    rc(12, 0xDA, 42),  rc(12, 0xDB, 43),  rc(12, 0x54, 44),  rc(12, 0x55, 45),
    rc(12, 0x56, 46),  rc(12, 0x57, 47),  rc(12, 0x64, 48),  rc(12, 0x65, 49),
    rc(12, 0x52, 50),  rc(12, 0x53, 51),  rc(12, 0x24, 52),  rc(12, 0x37, 53),
    rc(12, 0x38, 54),  rc(12, 0x27, 55),  rc(12, 0x28, 56),  rc(12, 0x58, 57),
    rc(12, 0x59, 58),  rc(12, 0x2B, 59),  rc(12, 0x2C, 60),  rc(12, 0x5A, 61),
    rc(12, 0x66, 62),  rc(12, 0x67, 63),
    rc(12, 0xC8, 128), rc(12, 0xC9, 192), rc(12, 0x5B, 256), rc(12, 0x33, 320),
    rc(12, 0x34, 384), rc(12, 0x35, 448),
    rc(13, 0x6C, 512), rc(13, 0x6D, 576), rc(13, 0x4A, 640), rc(13, 0x4B, 704),
    rc(13, 0x4C, 768), rc(13, 0x4D, 832), rc(13, 0x72, 896), rc(13, 0x73, 960),
    rc(13, 0x74, 1024), rc(13, 0x75, 1088), rc(13, 0x76, 1152), rc(13, 0x77, 1216),
    rc(13, 0x52, 1280), rc(13, 0x53, 1344), rc(13, 0x54, 1408), rc(13, 0x55, 1472),
    rc(13, 0x5A, 1536), rc(13, 0x5B, 1600), rc(13, 0x64, 1664), rc(13, 0x65, 1728),
];

/// Make-up codes shared by both colours (T.4 Table 3, 1792..2560).
#[rustfmt::skip]
pub(crate) static SHARED_MAKEUP_CODES: [RunCode; 13] = [
    rc(11, 0x08, 1792), rc(11, 0x0C, 1856), rc(11, 0x0D, 1920),
    rc(12, 0x12, 1984), rc(12, 0x13, 2048), rc(12, 0x14, 2112),
    rc(12, 0x15, 2176), rc(12, 0x16, 2240), rc(12, 0x17, 2304),
    rc(12, 0x1C, 2368), rc(12, 0x1D, 2432), rc(12, 0x1E, 2496),
    rc(12, 0x1F, 2560),
];
