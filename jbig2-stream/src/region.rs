//! Region segment information field parsing (7.4.1).
//!
//! Every region family (generic, refinement, text, halftone) starts its
//! segment body with this field, so the higher-level decoders that plug into
//! the dispatch seam parse it through here as well.

use crate::bitmap::ComposeOp;
use crate::error::{ParseError, RegionError, Result, bail, err};
use crate::reader::Reader;

/// Parsed region segment information field (7.4.1).
///
/// "A region segment information field contains the following subfields:
/// bitmap width, bitmap height, bitmap X location, bitmap Y location and
/// region segment flags." (7.4.1)
#[derive(Debug, Clone)]
pub struct RegionSegmentInfo {
    /// "This four-byte field gives the width in pixels of the bitmap encoded
    /// in this segment." (7.4.1.1)
    pub width: u32,
    /// "This four-byte field gives the height in pixels of the bitmap
    /// encoded in this segment." (7.4.1.2)
    pub height: u32,
    /// "This four-byte field gives the horizontal offset in pixels of the
    /// bitmap encoded in this segment relative to the page bitmap."
    /// (7.4.1.3)
    pub x_location: u32,
    /// "This four-byte field gives the vertical offset in pixels of the
    /// bitmap encoded in this segment relative to the page bitmap."
    /// (7.4.1.4)
    pub y_location: u32,
    /// "Bits 0-2: External combination operator." (7.4.1.5)
    pub combination_operator: ComposeOp,
}

/// The byte length of the region segment information field.
pub(crate) const REGION_INFO_LEN: usize = 17;

fn operator_from_value(value: u8) -> Result<ComposeOp> {
    match value {
        0 => Ok(ComposeOp::Or),
        1 => Ok(ComposeOp::And),
        2 => Ok(ComposeOp::Xor),
        3 => Ok(ComposeOp::Xnor),
        4 => Ok(ComposeOp::Replace),
        _ => err!(RegionError::InvalidCombinationOperator),
    }
}

/// Parse the region segment information field (7.4.1).
pub(crate) fn parse_region_segment_info(reader: &mut Reader<'_>) -> Result<RegionSegmentInfo> {
    let width = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let height = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let x_location = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let y_location = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    // 7.4.1.5: Region segment flags
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;

    // "Bits 0-2: External combination operator."
    let combination_operator = operator_from_value(flags & 0x07)?;

    // Bit 3 is the colour extension flag; colour is rejected at the file
    // header, so here it only ever means a malformed stream.
    // "Bits 4-7: Reserved; must be 0."
    if flags & 0xF8 != 0 {
        bail!(RegionError::InvalidCombinationOperator);
    }

    Ok(RegionSegmentInfo {
        width,
        height,
        x_location,
        y_location,
        combination_operator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_fields() {
        let data = [
            0x00, 0x00, 0x00, 0x40, // width = 64
            0x00, 0x00, 0x00, 0x20, // height = 32
            0x00, 0x00, 0x00, 0x08, // x = 8
            0x00, 0x00, 0x00, 0x10, // y = 16
            0x02, // XOR
        ];

        let mut reader = Reader::new(&data);
        let info = parse_region_segment_info(&mut reader).unwrap();

        assert_eq!(info.width, 64);
        assert_eq!(info.height, 32);
        assert_eq!(info.x_location, 8);
        assert_eq!(info.y_location, 16);
        assert_eq!(info.combination_operator, ComposeOp::Xor);
        assert_eq!(reader.offset(), REGION_INFO_LEN);
    }

    #[test]
    fn rejects_reserved_flag_bits() {
        let mut data = [0_u8; 17];
        data[16] = 0x10;

        let mut reader = Reader::new(&data);
        assert!(parse_region_segment_info(&mut reader).is_err());
    }
}
