//! Shared fixtures and wire builders for the integration tests.
//!
//! The coded payloads were produced by an MQ/T.6 encoder driven with the
//! reference bitmap below; the tables pin the decoder to those streams
//! bit-for-bit.

#![allow(dead_code)]

pub const WIDTH: u32 = 16;
pub const HEIGHT: u32 = 16;

/// The reference bitmap, packed MSB-first per row.
pub const EXPECTED: [u8; 32] = [
    0x48, 0xCC, 0xC4, 0x8C, 0xCC, 0x48, 0x12, 0x33, 0x31, 0x23, 0x33, 0x12,
    0xC4, 0x8C, 0xC4, 0x8C, 0xC4, 0x8C, 0x31, 0x23, 0x33, 0x12, 0x33, 0x31,
    0xCC, 0x48, 0xCC, 0xC4, 0x8C, 0xCC, 0x00, 0x00,
];

pub struct GenericFixture {
    pub template: u8,
    pub tpgdon: bool,
    pub at: &'static [(i8, i8)],
    pub payload: &'static [u8],
}

pub const GENERIC_FIXTURES: [GenericFixture; 16] = [
    GenericFixture {
        template: 0,
        tpgdon: false,
        at: &[(3, -1), (-3, -1), (2, -2), (-2, -2)],
        payload: &[
            0x2D, 0xC6, 0x98, 0x33, 0xDD, 0xA5, 0xFB, 0x35, 0x76, 0x96, 0x81, 0x34,
            0xE0, 0x7A, 0xF9, 0xDB, 0xFC, 0x4E, 0x7E, 0xED, 0x1E, 0x4B, 0xAF, 0x8D,
            0xE7, 0x3B, 0x46, 0xE1, 0x3F, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 0,
        tpgdon: false,
        at: &[(-2, 0), (1, -2), (-3, -1), (-4, -2)],
        payload: &[
            0x2D, 0xC6, 0x98, 0x33, 0xDC, 0xED, 0x8E, 0x6A, 0xED, 0xD5, 0x3B, 0x8D,
            0xE9, 0xEC, 0x62, 0x28, 0xD6, 0xE3, 0xEC, 0xC8, 0x3B, 0xE8, 0x6B, 0x7F,
            0x58, 0x1E, 0x11, 0xBF, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 0,
        tpgdon: true,
        at: &[(3, -1), (-3, -1), (2, -2), (-2, -2)],
        payload: &[
            0x6C, 0xE4, 0x5C, 0x1E, 0x0E, 0x91, 0xF7, 0xA6, 0xA7, 0x12, 0xD3, 0x37,
            0x58, 0x5F, 0xAB, 0xF1, 0x12, 0x33, 0x5A, 0xFE, 0x1C, 0xCD, 0x38, 0xCA,
            0x6C, 0x04, 0xFF, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 0,
        tpgdon: true,
        at: &[(-2, 0), (1, -2), (-3, -1), (-4, -2)],
        payload: &[
            0x6C, 0xE4, 0x5C, 0x1E, 0x0E, 0x7A, 0xE2, 0x4D, 0x4E, 0x3A, 0x57, 0x6D,
            0x5A, 0x36, 0x2F, 0xC5, 0x61, 0x29, 0xC8, 0xA8, 0x6A, 0x65, 0x9D, 0x8F,
            0x8C, 0x7F, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 1,
        tpgdon: false,
        at: &[(3, -1)],
        payload: &[
            0x30, 0xFA, 0x7C, 0x16, 0xEE, 0xD2, 0xFD, 0x9A, 0xBB, 0x4C, 0x0E, 0x77,
            0x1B, 0x01, 0x6C, 0x00, 0x43, 0x2F, 0x4F, 0x73, 0xC7, 0x9D, 0xD3, 0xE7,
            0x17, 0x6E, 0xC0, 0xFB, 0x59, 0xFF, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 1,
        tpgdon: false,
        at: &[(-2, 0)],
        payload: &[
            0x30, 0xFA, 0x7C, 0x16, 0xA3, 0x92, 0x1D, 0x9A, 0xBB, 0x0B, 0x5B, 0x11,
            0xFC, 0x96, 0x8B, 0xBD, 0xE0, 0x72, 0x1A, 0x77, 0x87, 0x85, 0x8B, 0x5D,
            0xDD, 0xBD, 0x3D, 0x6A, 0xBF, 0xFF, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 1,
        tpgdon: true,
        at: &[(3, -1)],
        payload: &[
            0x6E, 0x7E, 0x4B, 0x0B, 0xC0, 0x11, 0xB7, 0xA6, 0xA7, 0x12, 0xF0, 0x38,
            0x3D, 0x88, 0xDC, 0x9B, 0x9A, 0x8B, 0x59, 0xD6, 0x36, 0xF0, 0xD7, 0xB9,
            0x38, 0x32, 0x8F, 0xFF, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 1,
        tpgdon: true,
        at: &[(-2, 0)],
        payload: &[
            0x6E, 0x7E, 0x4B, 0x0B, 0x7F, 0x90, 0xF7, 0xA6, 0xA7, 0x02, 0xC7, 0x47,
            0x7B, 0x50, 0x40, 0xC8, 0x34, 0xA2, 0x38, 0xFF, 0x37, 0x4A, 0xE1, 0xED,
            0xD1, 0x44, 0xBF, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 2,
        tpgdon: false,
        at: &[(2, -1)],
        payload: &[
            0x30, 0xFF, 0x48, 0x14, 0x43, 0x3D, 0x6D, 0x98, 0x0C, 0x9E, 0x70, 0x92,
            0x79, 0x7C, 0x0E, 0x60, 0x81, 0xA1, 0x14, 0xE4, 0x25, 0x9E, 0x12, 0x0C,
            0xE6, 0xC2, 0x17, 0xFF, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 2,
        tpgdon: false,
        at: &[(-1, -2)],
        payload: &[
            0x30, 0xFF, 0x48, 0x14, 0x43, 0x3D, 0x6D, 0xA5, 0x0D, 0x0C, 0x26, 0x27,
            0x8D, 0xC5, 0xE1, 0x1D, 0x58, 0xCA, 0xBE, 0x0C, 0x35, 0x65, 0x58, 0x22,
            0x80, 0x26, 0xDF, 0xFF, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 2,
        tpgdon: true,
        at: &[(2, -1)],
        payload: &[
            0x6E, 0x80, 0xE2, 0x14, 0x9E, 0xFB, 0xB2, 0xCC, 0x67, 0x4F, 0x5D, 0xCF,
            0x65, 0x84, 0xE0, 0x59, 0x5B, 0xFB, 0x60, 0xEE, 0xD1, 0x66, 0xB4, 0x7A,
            0xAF, 0xFF, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 2,
        tpgdon: true,
        at: &[(-1, -2)],
        payload: &[
            0x6E, 0x80, 0xE2, 0x14, 0x9E, 0xFB, 0xB2, 0xD2, 0xE7, 0x86, 0x45, 0x36,
            0x4E, 0x7C, 0x33, 0xAA, 0x05, 0x3B, 0xBD, 0xAB, 0xB7, 0xEB, 0x05, 0x81,
            0x75, 0xFF, 0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 3,
        tpgdon: false,
        at: &[(2, -1)],
        payload: &[
            0x2D, 0xC6, 0x98, 0x33, 0xFC, 0xAD, 0x52, 0xD1, 0xE5, 0xFA, 0x43, 0x59,
            0xA9, 0x35, 0x72, 0x6C, 0xC3, 0xCE, 0x54, 0x04, 0x7D, 0x69, 0x99, 0xFF,
            0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 3,
        tpgdon: false,
        at: &[(-2, 0)],
        payload: &[
            0x2D, 0xC6, 0x98, 0x34, 0x09, 0x87, 0x1A, 0x00, 0xC9, 0x07, 0x98, 0x61,
            0xCC, 0xBB, 0x20, 0x58, 0xAD, 0x37, 0xA8, 0xDC, 0x8E, 0x36, 0x7F, 0xFF,
            0xFF, 0xAC,
        ],
    },
    GenericFixture {
        template: 3,
        tpgdon: true,
        at: &[(2, -1)],
        payload: &[
            0x6C, 0xE4, 0x5C, 0x1E, 0x12, 0x0B, 0xBD, 0x8F, 0xE0, 0x2B, 0x3D, 0xDC,
            0xF3, 0xE5, 0xE6, 0xFB, 0x31, 0xAD, 0x35, 0xDE, 0x6D, 0xFF, 0x7F, 0xFF,
            0xAC,
        ],
    },
    GenericFixture {
        template: 3,
        tpgdon: true,
        at: &[(-2, 0)],
        payload: &[
            0x6C, 0xE4, 0x5C, 0x1E, 0x15, 0x43, 0xA6, 0x88, 0x6D, 0x44, 0x25, 0x12,
            0x04, 0x0A, 0x35, 0x39, 0xA0, 0xB5, 0x54, 0x5A, 0x2B, 0xFF, 0xFF, 0xAC,
        ],
    },
];

/// An MMR-coded 22x11 payload (EOFB terminated) and its decoded rows.
pub const MMR_WIDTH: u32 = 22;
pub const MMR_HEIGHT: u32 = 11;

pub const MMR_PAYLOAD: [u8; 66] = [
    0x2E, 0x88, 0xF9, 0x74, 0x5C, 0x81, 0x05, 0x09, 0x85, 0x3C, 0x86, 0x0D,
    0x86, 0xC1, 0x04, 0xC1, 0x42, 0x04, 0xE1, 0x02, 0x17, 0x84, 0x47, 0x54,
    0x92, 0x52, 0x3E, 0x29, 0x24, 0xB7, 0xB6, 0x47, 0x51, 0xF4, 0x3B, 0x29,
    0xC2, 0x04, 0x16, 0x20, 0x8A, 0x86, 0x30, 0xC2, 0xB4, 0x92, 0x08, 0xC3,
    0x85, 0xAB, 0x28, 0x70, 0x81, 0x14, 0x38, 0x41, 0x7D, 0x84, 0xB4, 0x9D,
    0xA0, 0x82, 0x18, 0x00, 0x80, 0x08,
];

pub const MMR_EXPECTED: [u8; 33] = [
    0x2C, 0x9F, 0x90, 0xF3, 0x81, 0x00, 0x18, 0xCC, 0xE0, 0x4A, 0x04, 0xA0,
    0x96, 0xC1, 0x44, 0xD3, 0x41, 0xC4, 0x83, 0x27, 0x34, 0x11, 0x87, 0xD0,
    0x23, 0x1D, 0x14, 0x14, 0xB5, 0x10, 0x65, 0x12, 0x40,
];

// --- wire builders ---

pub fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// The standalone file header (D.4) with a known page count.
pub fn file_header(sequential: bool, pages: u32) -> Vec<u8> {
    let mut out = vec![0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];
    out.push(if sequential { 0x01 } else { 0x00 });
    push_u32(&mut out, pages);
    out
}

/// A segment header (7.2) with no referred-to segments and a one-byte page
/// association.
pub fn push_segment_header(
    out: &mut Vec<u8>,
    number: u32,
    segment_type: u8,
    page: u8,
    data_length: u32,
) {
    push_u32(out, number);
    out.push(segment_type & 0x3F);
    out.push(0x00);
    out.push(page);
    push_u32(out, data_length);
}

/// A page information body (7.4.8).
pub fn page_info_body(width: u32, height: u32, flags: u8, striping: u16) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, width);
    push_u32(&mut out, height);
    push_u32(&mut out, 0); // x resolution unknown
    push_u32(&mut out, 0); // y resolution unknown
    out.push(flags);
    push_u16(&mut out, striping);
    out
}

/// A generic region body (7.4.6): region info, flags, AT bytes, payload.
pub fn generic_region_body(
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    flags: u8,
    at: &[(i8, i8)],
    payload: &[u8],
) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, width);
    push_u32(&mut out, height);
    push_u32(&mut out, x);
    push_u32(&mut out, y);
    out.push(0x00); // external combination operator: OR
    out.push(flags);
    for &(ax, ay) in at {
        out.push(ax as u8);
        out.push(ay as u8);
    }
    out.extend_from_slice(payload);
    out
}
