//! Segment header parsing (Section 7.2).
//!
//! Headers are parsed incrementally: the parser returns `Ok(None)` when the
//! buffered bytes do not yet contain a complete header, and the stream
//! machine retries once more input arrives. Structural violations are errors
//! regardless of how much data is buffered.

use smallvec::SmallVec;

use crate::error::{Result, SegmentError, bail};
use crate::reader::Reader;

/// "The segment type is a number between 0 and 63, inclusive." (7.3)
///
/// Reserved values are carried as [`SegmentType::Unknown`] and skipped with
/// a warning rather than failing the stream, since a reserved segment a
/// decoder does not understand may still be safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentType {
    /// Symbol dictionary – see 7.4.2. (type 0)
    SymbolDictionary,
    /// Intermediate text region – see 7.4.3. (type 4)
    IntermediateTextRegion,
    /// Immediate text region – see 7.4.3. (type 6)
    ImmediateTextRegion,
    /// Immediate lossless text region – see 7.4.3. (type 7)
    ImmediateLosslessTextRegion,
    /// Pattern dictionary – see 7.4.4. (type 16)
    PatternDictionary,
    /// Intermediate halftone region – see 7.4.5. (type 20)
    IntermediateHalftoneRegion,
    /// Immediate halftone region – see 7.4.5. (type 22)
    ImmediateHalftoneRegion,
    /// Immediate lossless halftone region – see 7.4.5. (type 23)
    ImmediateLosslessHalftoneRegion,
    /// Intermediate generic region – see 7.4.6. (type 36)
    IntermediateGenericRegion,
    /// Immediate generic region – see 7.4.6. (type 38)
    ImmediateGenericRegion,
    /// Immediate lossless generic region – see 7.4.6. (type 39)
    ImmediateLosslessGenericRegion,
    /// Intermediate generic refinement region – see 7.4.7. (type 40)
    IntermediateGenericRefinementRegion,
    /// Immediate generic refinement region – see 7.4.7. (type 42)
    ImmediateGenericRefinementRegion,
    /// Immediate lossless generic refinement region – see 7.4.7. (type 43)
    ImmediateLosslessGenericRefinementRegion,
    /// Page information – see 7.4.8. (type 48)
    PageInformation,
    /// End of page – see 7.4.9. (type 49)
    EndOfPage,
    /// End of stripe – see 7.4.10. (type 50)
    EndOfStripe,
    /// End of file – see 7.4.11. (type 51)
    EndOfFile,
    /// Profiles – see 7.4.12. (type 52)
    Profiles,
    /// Tables – see 7.4.13. (type 53)
    Tables,
    /// Colour palette – see 7.4.16. (type 54)
    ColourPalette,
    /// Extension - see 7.4.14. (type 62)
    Extension,
    /// A reserved type value.
    Unknown(u8),
}

impl SegmentType {
    pub(crate) fn from_type_value(value: u8) -> Self {
        match value {
            0 => Self::SymbolDictionary,
            4 => Self::IntermediateTextRegion,
            6 => Self::ImmediateTextRegion,
            7 => Self::ImmediateLosslessTextRegion,
            16 => Self::PatternDictionary,
            20 => Self::IntermediateHalftoneRegion,
            22 => Self::ImmediateHalftoneRegion,
            23 => Self::ImmediateLosslessHalftoneRegion,
            36 => Self::IntermediateGenericRegion,
            38 => Self::ImmediateGenericRegion,
            39 => Self::ImmediateLosslessGenericRegion,
            40 => Self::IntermediateGenericRefinementRegion,
            42 => Self::ImmediateGenericRefinementRegion,
            43 => Self::ImmediateLosslessGenericRefinementRegion,
            48 => Self::PageInformation,
            49 => Self::EndOfPage,
            50 => Self::EndOfStripe,
            51 => Self::EndOfFile,
            52 => Self::Profiles,
            53 => Self::Tables,
            54 => Self::ColourPalette,
            62 => Self::Extension,
            other => Self::Unknown(other),
        }
    }

    /// Whether the unknown-length sentinel is lawful for this type.
    ///
    /// "If the segment's type is 'Immediate generic region', then the length
    /// field may contain the value 0xFFFFFFFF." (7.2.7)
    pub(crate) fn may_have_unknown_length(self) -> bool {
        matches!(
            self,
            Self::ImmediateGenericRegion | Self::ImmediateLosslessGenericRegion
        )
    }
}

/// A parsed segment header (7.2.1).
#[derive(Debug, Clone)]
pub struct SegmentHeader {
    /// "This four-byte field contains the segment's segment number." (7.2.2)
    pub number: u32,
    /// "Bits 0-5: Segment type. See 7.3." (7.2.3)
    pub segment_type: SegmentType,
    /// "This field contains the segment numbers of the segments that this
    /// segment refers to, if any." (7.2.5)
    pub referred_to: SmallVec<[u32; 4]>,
    /// "This field encodes the number of the page to which this segment
    /// belongs. This field may contain a value of zero; this value indicates
    /// that this segment is not associated with any page." (7.2.6)
    pub page_association: u32,
    /// "This 4-byte field contains the length of the segment's segment data
    /// part, in bytes." (7.2.7)
    ///
    /// `None` means the unknown-length sentinel (0xFFFFFFFF), lawful only
    /// for immediate generic region segments.
    pub data_length: Option<u32>,
}

/// Parse a segment header, or report that more bytes are needed.
///
/// On `Ok(Some(_))` the reader has consumed exactly the header; on
/// `Ok(None)` the reader position is unspecified and the caller must retry
/// from the original offset with more data.
pub(crate) fn parse_segment_header(reader: &mut Reader<'_>) -> Result<Option<SegmentHeader>> {
    // 7.2.2: Segment number
    let Some(number) = reader.read_u32() else {
        return Ok(None);
    };

    // 7.2.3: Segment header flags
    let Some(flags) = reader.read_byte() else {
        return Ok(None);
    };

    // "Bits 0-5: Segment type. See 7.3."
    let segment_type = SegmentType::from_type_value(flags & 0x3F);

    // "Bit 6: Page association field size. See 7.2.6."
    let page_association_long = flags & 0x40 != 0;

    // 7.2.4: Referred-to segment count and retention flags
    //
    // "The three most significant bits of the first byte in this field
    // determine the length of the field. If the value of this three-bit
    // subfield is between 0 and 4, then the field is one byte long. If the
    // value of this three-bit subfield is 7, then the field is at least five
    // bytes long. This three-bit subfield must not contain values of 5 and
    // 6."
    let Some(count_byte) = reader.read_byte() else {
        return Ok(None);
    };
    let short_count = (count_byte >> 5) & 0x07;

    if short_count == 5 || short_count == 6 {
        bail!(SegmentError::InvalidReferredCount);
    }

    let referred_count = if short_count < 7 {
        u32::from(short_count)
    } else {
        // Long form: a four-byte count (bits 29-31 are the 0b111 marker),
        // followed by one retention bit per referred segment plus one.
        let Some(rest) = reader.read_bytes(3) else {
            return Ok(None);
        };
        let count = u32::from_be_bytes([count_byte & 0x1F, rest[0], rest[1], rest[2]]);

        let retention_bytes = (count as usize + 1).div_ceil(8);
        if reader.skip_bytes(retention_bytes).is_none() {
            return Ok(None);
        }

        count
    };

    // 7.2.5: Referred-to segment numbers
    //
    // "When the current segment's number is 256 or less, then each
    // referred-to segment number is one byte long. Otherwise, when the
    // current segment's number is 65536 or less, each referred-to segment
    // number is two bytes long. Otherwise, each referred-to segment number
    // is four bytes long."
    //
    // The declared count is attacker-controlled; let the vector grow with
    // the ids actually present instead of pre-sizing to the claim.
    let mut referred_to = SmallVec::with_capacity(referred_count.min(64) as usize);
    for _ in 0..referred_count {
        let referred = if number <= 256 {
            match reader.read_byte() {
                Some(b) => u32::from(b),
                None => return Ok(None),
            }
        } else if number <= 65536 {
            match reader.read_u16() {
                Some(v) => u32::from(v),
                None => return Ok(None),
            }
        } else {
            match reader.read_u32() {
                Some(v) => v,
                None => return Ok(None),
            }
        };

        // A segment may only refer to segments with lower numbers.
        if referred >= number {
            bail!(SegmentError::InvalidReference.at(number));
        }

        referred_to.push(referred);
    }

    // 7.2.6: Segment page association
    let page_association = if page_association_long {
        match reader.read_u32() {
            Some(v) => v,
            None => return Ok(None),
        }
    } else {
        match reader.read_byte() {
            Some(b) => u32::from(b),
            None => return Ok(None),
        }
    };

    // 7.2.7: Segment data length
    let Some(data_length_raw) = reader.read_u32() else {
        return Ok(None);
    };

    let data_length = if data_length_raw == 0xFFFF_FFFF {
        // The sentinel is only meaningful for immediate generic regions;
        // anywhere else it would make the stream unparseable, so reject it
        // instead of relying on wraparound comparisons downstream.
        if !segment_type.may_have_unknown_length() {
            bail!(SegmentError::InvalidUnknownLength.at(number));
        }
        None
    } else {
        Some(data_length_raw)
    };

    Ok(Some(SegmentHeader {
        number,
        segment_type,
        referred_to,
        page_association,
        data_length,
    }))
}
