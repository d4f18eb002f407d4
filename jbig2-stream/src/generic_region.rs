//! Generic region decoding (6.2, 7.4.6).
//!
//! "This decoding procedure is used to decode a rectangular array of 0 or 1
//! values, which are coded one pixel at a time (i.e., it is used to decode a
//! bitmap using simple, generic, coding)." (6.2.1)
//!
//! Each template has a specialized decode loop for its nominal adaptive
//! pixel placement that carries the context forward with rolling bit windows
//! over the current and previous two rows. Custom adaptive placements and
//! skip masks take a per-pixel fallback that regathers the full
//! neighbourhood.

use smallvec::SmallVec;

use crate::arithmetic_decoder::{ArithmeticDecoder, Context};
use crate::bitmap::Bitmap;
use crate::error::{ParseError, RegionError, Result, TemplateError, UnsupportedFeature, bail};
use crate::reader::Reader;
use crate::region::{RegionSegmentInfo, parse_region_segment_info};

/// Template used for arithmetic coding (7.4.6.2, 6.2.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Template 0: 16 context pixels (6.2.5.3, Figure 3)
    Template0,
    /// Template 1: 13 context pixels (6.2.5.3, Figure 4)
    Template1,
    /// Template 2: 10 context pixels (6.2.5.3, Figure 5)
    Template2,
    /// Template 3: 10 context pixels (6.2.5.3, Figure 6)
    Template3,
}

impl Template {
    fn from_flag_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Template0,
            1 => Self::Template1,
            2 => Self::Template2,
            _ => Self::Template3,
        }
    }

    /// Number of context bits formed by this template (6.2.5.3).
    pub fn context_bits(self) -> u32 {
        match self {
            Self::Template0 => 16,
            Self::Template1 => 13,
            Self::Template2 | Self::Template3 => 10,
        }
    }

    /// Number of adaptive pixels carried by this template.
    pub fn adaptive_pixel_count(self) -> usize {
        match self {
            Self::Template0 => 4,
            _ => 1,
        }
    }

    /// The nominal adaptive pixel placement (6.2.5.3, Figures 3-6).
    pub fn nominal_adaptive_pixels(self) -> &'static [AdaptivePixel] {
        const NOMINAL_T0: [AdaptivePixel; 4] = [
            AdaptivePixel { x: 3, y: -1 },
            AdaptivePixel { x: -3, y: -1 },
            AdaptivePixel { x: 2, y: -2 },
            AdaptivePixel { x: -2, y: -2 },
        ];
        const NOMINAL_T1: [AdaptivePixel; 1] = [AdaptivePixel { x: 3, y: -1 }];
        const NOMINAL_T2_T3: [AdaptivePixel; 1] = [AdaptivePixel { x: 2, y: -1 }];

        match self {
            Self::Template0 => &NOMINAL_T0,
            Self::Template1 => &NOMINAL_T1,
            Self::Template2 | Self::Template3 => &NOMINAL_T2_T3,
        }
    }

    /// The reserved context used for the per-row typical prediction bit
    /// (6.2.5.7, Figures 8-11).
    fn typical_prediction_context(self) -> u32 {
        match self {
            Self::Template0 => 0b1001_1011_0010_0101,
            Self::Template1 => 0b0_0111_1001_0101,
            Self::Template2 => 0b00_1110_0101,
            Self::Template3 => 0b01_1001_0101,
        }
    }
}

/// An adaptive template pixel position, relative to the pixel being decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdaptivePixel {
    pub x: i8,
    pub y: i8,
}

impl AdaptivePixel {
    /// Whether the position lies in the causal field: at or above the
    /// current row, and strictly to the left within it (6.2.5.4, Figure 7).
    fn is_causal(self) -> bool {
        self.y < 0 || (self.y == 0 && self.x < 0)
    }
}

/// A bank of probability contexts for one generic-region template.
///
/// Zero-initialized at creation; a caller that wants several decodes to
/// share statistics (a symbol dictionary's worth of glyphs) reuses one bank
/// across them, otherwise it allocates a fresh one per region.
pub struct GenericContexts {
    template: Template,
    cells: Box<[Context]>,
}

impl GenericContexts {
    /// Allocate a zeroed context bank sized for the given template.
    pub fn new(template: Template) -> Self {
        Self {
            template,
            cells: vec![Context::default(); 1 << template.context_bits()].into_boxed_slice(),
        }
    }

    /// Reset every context to the zero state.
    pub fn reset(&mut self) {
        self.cells.fill(Context::default());
    }

    #[inline(always)]
    fn cell(&mut self, index: u32) -> &mut Context {
        &mut self.cells[index as usize]
    }
}

/// Parsed generic region segment body header (7.4.6.1).
#[derive(Debug, Clone)]
pub(crate) struct GenericRegionHeader {
    pub region_info: RegionSegmentInfo,
    /// "Bit 0: MMR" (7.4.6.2)
    pub mmr: bool,
    /// "Bits 1-2: GBTEMPLATE" (7.4.6.2)
    pub template: Template,
    /// "Bit 3: TPGDON" (7.4.6.2)
    pub tpgdon: bool,
    /// Adaptive template pixels (7.4.6.3); empty when MMR is used.
    pub adaptive_pixels: SmallVec<[AdaptivePixel; 4]>,
}

/// Parse a generic region segment body header (7.4.6.1).
pub(crate) fn parse_generic_region_header(reader: &mut Reader<'_>) -> Result<GenericRegionHeader> {
    let region_info = parse_region_segment_info(reader)?;

    // 7.4.6.2: Generic region segment flags
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;

    let mmr = flags & 0x01 != 0;
    let template = Template::from_flag_bits(flags >> 1);
    let tpgdon = flags & 0x08 != 0;

    // "Bit 4: EXTTEMPLATE. This field specifies whether extended reference
    // template is used." (7.4.6.2)
    if flags & 0x10 != 0 {
        bail!(UnsupportedFeature::ExtendedTemplates);
    }

    // "Bits 5-7: Reserved; must be zero."
    if flags & 0xE0 != 0 {
        bail!(TemplateError::ReservedFlags);
    }

    // "If MMR is 1 then this field must contain the value zero."
    if mmr && template != Template::Template0 {
        bail!(TemplateError::MmrTemplateMismatch);
    }

    // 7.4.6.3: Generic region segment AT flags
    // "This field is only present if MMR is 0."
    let mut adaptive_pixels = SmallVec::new();
    if !mmr {
        for _ in 0..template.adaptive_pixel_count() {
            let x = reader.read_byte().ok_or(ParseError::UnexpectedEof)? as i8;
            let y = reader.read_byte().ok_or(ParseError::UnexpectedEof)? as i8;

            let pixel = AdaptivePixel { x, y };
            if !pixel.is_causal() {
                bail!(TemplateError::InvalidAtPixel);
            }

            adaptive_pixels.push(pixel);
        }
    }

    Ok(GenericRegionHeader {
        region_info,
        mmr,
        template,
        tpgdon,
        adaptive_pixels,
    })
}

/// Decode a complete generic region segment body.
///
/// "The data parts of all three of the generic region segment types are
/// coded identically, but are acted upon differently, see 8.2." (7.4.6)
///
/// For a segment that was stored with the unknown-length sentinel, the body
/// carries a trailing four-byte row count that overrides the declared height
/// (7.4.6.4).
pub(crate) fn decode_generic_region(
    body: &[u8],
    had_unknown_length: bool,
) -> Result<(RegionSegmentInfo, Bitmap)> {
    let mut reader = Reader::new(body);
    let header = parse_generic_region_header(&mut reader)?;

    let mut info = header.region_info.clone();
    let mut encoded = reader.tail();

    if had_unknown_length {
        // "In this case, it also indicates the height of the generic region;
        // it must be no greater than the region segment bitmap height value
        // in the segment's region segment information field." (7.4.6.4)
        if encoded.len() < 4 {
            bail!(ParseError::UnexpectedEof);
        }
        let (head, count_bytes) = encoded.split_at(encoded.len() - 4);
        let row_count = u32::from_be_bytes(count_bytes.try_into().unwrap());

        if row_count > info.height {
            bail!(RegionError::InvalidRowCount);
        }

        info.height = row_count;
        encoded = head;
    }

    let mut bitmap = Bitmap::new(info.width, info.height)?;

    if header.mmr {
        // "6.2.6 Decoding using MMR coding"
        let _ = decode_bitmap_mmr(&mut bitmap, encoded)?;
    } else {
        // "6.2.5 Decoding using a template and arithmetic coding"
        let mut contexts = GenericContexts::new(header.template);
        decode_bitmap(
            &mut bitmap,
            encoded,
            header.template,
            header.tpgdon,
            &header.adaptive_pixels,
            &mut contexts,
            None,
        )?;
    }

    Ok((info, bitmap))
}

/// Decode an arithmetically coded bitmap into `out` (6.2.5).
///
/// `contexts` must have been allocated for the same template; `skip` marks
/// pixels that are forced white without consuming any coded bit. Rows are
/// decoded top to bottom, pixels left to right.
pub fn decode_bitmap(
    out: &mut Bitmap,
    data: &[u8],
    template: Template,
    tpgdon: bool,
    adaptive_pixels: &[AdaptivePixel],
    contexts: &mut GenericContexts,
    skip: Option<&Bitmap>,
) -> Result<()> {
    if adaptive_pixels.len() != template.adaptive_pixel_count() {
        bail!(TemplateError::WrongAtCount);
    }
    if adaptive_pixels.iter().any(|p| !p.is_causal()) {
        bail!(TemplateError::InvalidAtPixel);
    }
    if contexts.template != template {
        bail!(TemplateError::ContextMismatch);
    }

    let mut decoder = ArithmeticDecoder::new(data)?;

    let nominal = adaptive_pixels == template.nominal_adaptive_pixels();
    if nominal && skip.is_none() {
        match template {
            Template::Template0 => decode_rows_template0(out, &mut decoder, contexts, tpgdon),
            Template::Template1 => decode_rows_template1(out, &mut decoder, contexts, tpgdon),
            Template::Template2 => decode_rows_template2(out, &mut decoder, contexts, tpgdon),
            Template::Template3 => decode_rows_template3(out, &mut decoder, contexts, tpgdon),
        }
    } else {
        decode_rows_fallback(
            out,
            &mut decoder,
            contexts,
            template,
            tpgdon,
            adaptive_pixels,
            skip,
        );
    }

    // The partially built bitmap is dropped by the caller on error.
    if decoder.exhausted() {
        bail!(RegionError::TruncatedData);
    }

    Ok(())
}

/// Decode a bitmap using MMR coding (6.2.6).
///
/// "If MMR is 1, the generic region decoding procedure is identical to an
/// MMR decoder described in Recommendation ITU-T T.6." (6.2.6)
///
/// Returns the number of whole payload bytes consumed.
pub fn decode_bitmap_mmr(out: &mut Bitmap, data: &[u8]) -> Result<usize> {
    /// Writes black runs into the bitmap; white runs are already there.
    struct BitmapSink<'a> {
        bitmap: &'a mut Bitmap,
        y: u32,
    }

    impl jbig2_mmr::RowSink for BitmapSink<'_> {
        fn fill(&mut self, x0: u32, x1: u32, black: bool) {
            // "Pixels decoded by the MMR decoder having the value 'black'
            // shall be treated as having the value 1." (6.2.6)
            if black {
                self.bitmap.fill_row(self.y, x0, x1, true);
            }
        }

        fn end_row(&mut self) {
            self.y += 1;
        }
    }

    let params = jbig2_mmr::DecodeParams {
        width: out.width(),
        rows: out.height(),
    };
    let mut sink = BitmapSink { bitmap: out, y: 0 };

    Ok(jbig2_mmr::decode(data, &mut sink, &params)?)
}

/// A context neighbour read, with out-of-bounds positions reading as 0.
///
/// "The rule to satisfy out-of-bounds references shall be: All pixels lying
/// outside the bounds of the actual bitmap have the value 0." (6.2.5.2)
#[inline(always)]
fn pixel(out: &Bitmap, x: i64, y: i64) -> u32 {
    if x < 0 || y < 0 || x >= i64::from(out.width()) || y >= i64::from(out.height()) {
        0
    } else {
        u32::from(out.get_pixel(x as u32, y as u32))
    }
}

/// Decode the per-row typical prediction bit and apply a typical row.
///
/// "If TPGDON is 1, then decode a bit using the arithmetic entropy coder;
/// let SLTP be the value of this bit. Set: LTP = LTP XOR SLTP. If LTP = 1
/// then set every pixel of the current row equal to the corresponding pixel
/// of the row immediately above." (6.2.5.7)
#[inline(always)]
fn typical_row(
    out: &mut Bitmap,
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut GenericContexts,
    template: Template,
    ltp: &mut bool,
    y: u32,
) -> bool {
    let sltp = decoder.decode(contexts.cell(template.typical_prediction_context()));
    *ltp ^= sltp != 0;

    if *ltp {
        // Row 0 duplicates the imaginary all-white row above it.
        if y > 0 {
            out.copy_row(y, y - 1);
        }
        true
    } else {
        false
    }
}

/// Template 0 with nominal adaptive pixels: the 16-bit context is three
/// contiguous row windows (x-2..x+2 two rows up, x-3..x+3 one row up,
/// x-4..x-1 in the current row).
fn decode_rows_template0(
    out: &mut Bitmap,
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut GenericContexts,
    tpgdon: bool,
) {
    let width = out.width();
    let mut ltp = false;

    for y in 0..out.height() {
        if tpgdon && typical_row(out, decoder, contexts, Template::Template0, &mut ltp, y) {
            continue;
        }

        let up = i64::from(y) - 1;
        let up2 = i64::from(y) - 2;

        let mut row2 = (pixel(out, 0, up2) << 2) | (pixel(out, 1, up2) << 1) | pixel(out, 2, up2);
        let mut row1 = (pixel(out, 0, up) << 3)
            | (pixel(out, 1, up) << 2)
            | (pixel(out, 2, up) << 1)
            | pixel(out, 3, up);
        let mut row0 = 0_u32;

        for x in 0..width {
            let context = (row2 << 11) | (row1 << 4) | row0;
            let bit = decoder.decode(contexts.cell(context));
            out.set_pixel(x, y, bit != 0);

            let x = i64::from(x);
            row2 = ((row2 << 1) | pixel(out, x + 3, up2)) & 0x1F;
            row1 = ((row1 << 1) | pixel(out, x + 4, up)) & 0x7F;
            row0 = ((row0 << 1) | bit) & 0x0F;
        }
    }
}

/// Template 1 with nominal adaptive pixels: windows x-1..x+2 two rows up,
/// x-2..x+3 one row up, x-3..x-1 in the current row.
fn decode_rows_template1(
    out: &mut Bitmap,
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut GenericContexts,
    tpgdon: bool,
) {
    let width = out.width();
    let mut ltp = false;

    for y in 0..out.height() {
        if tpgdon && typical_row(out, decoder, contexts, Template::Template1, &mut ltp, y) {
            continue;
        }

        let up = i64::from(y) - 1;
        let up2 = i64::from(y) - 2;

        let mut row2 = (pixel(out, 0, up2) << 2) | (pixel(out, 1, up2) << 1) | pixel(out, 2, up2);
        let mut row1 = (pixel(out, 0, up) << 3)
            | (pixel(out, 1, up) << 2)
            | (pixel(out, 2, up) << 1)
            | pixel(out, 3, up);
        let mut row0 = 0_u32;

        for x in 0..width {
            let context = (row2 << 9) | (row1 << 3) | row0;
            let bit = decoder.decode(contexts.cell(context));
            out.set_pixel(x, y, bit != 0);

            let x = i64::from(x);
            row2 = ((row2 << 1) | pixel(out, x + 3, up2)) & 0x0F;
            row1 = ((row1 << 1) | pixel(out, x + 4, up)) & 0x3F;
            row0 = ((row0 << 1) | bit) & 0x07;
        }
    }
}

/// Template 2 with nominal adaptive pixels: windows x-1..x+1 two rows up,
/// x-2..x+2 one row up, x-2..x-1 in the current row.
fn decode_rows_template2(
    out: &mut Bitmap,
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut GenericContexts,
    tpgdon: bool,
) {
    let width = out.width();
    let mut ltp = false;

    for y in 0..out.height() {
        if tpgdon && typical_row(out, decoder, contexts, Template::Template2, &mut ltp, y) {
            continue;
        }

        let up = i64::from(y) - 1;
        let up2 = i64::from(y) - 2;

        let mut row2 = (pixel(out, 0, up2) << 1) | pixel(out, 1, up2);
        let mut row1 =
            (pixel(out, 0, up) << 2) | (pixel(out, 1, up) << 1) | pixel(out, 2, up);
        let mut row0 = 0_u32;

        for x in 0..width {
            let context = (row2 << 7) | (row1 << 2) | row0;
            let bit = decoder.decode(contexts.cell(context));
            out.set_pixel(x, y, bit != 0);

            let x = i64::from(x);
            row2 = ((row2 << 1) | pixel(out, x + 2, up2)) & 0x07;
            row1 = ((row1 << 1) | pixel(out, x + 3, up)) & 0x1F;
            row0 = ((row0 << 1) | bit) & 0x03;
        }
    }
}

/// Template 3 with the nominal adaptive pixel: a single-row history of
/// x-3..x+2 one row up and x-4..x-1 in the current row.
fn decode_rows_template3(
    out: &mut Bitmap,
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut GenericContexts,
    tpgdon: bool,
) {
    let width = out.width();
    let mut ltp = false;

    for y in 0..out.height() {
        if tpgdon && typical_row(out, decoder, contexts, Template::Template3, &mut ltp, y) {
            continue;
        }

        let up = i64::from(y) - 1;

        let mut row1 =
            (pixel(out, 0, up) << 2) | (pixel(out, 1, up) << 1) | pixel(out, 2, up);
        let mut row0 = 0_u32;

        for x in 0..width {
            let context = (row1 << 4) | row0;
            let bit = decoder.decode(contexts.cell(context));
            out.set_pixel(x, y, bit != 0);

            let x = i64::from(x);
            row1 = ((row1 << 1) | pixel(out, x + 3, up)) & 0x3F;
            row0 = ((row0 << 1) | bit) & 0x0F;
        }
    }
}

/// The per-pixel path: regathers the whole neighbourhood for every pixel.
///
/// Handles arbitrary adaptive pixel placement, and is the only path that
/// honours a skip mask (a flagged pixel is forced white and consumes no
/// coded bit).
fn decode_rows_fallback(
    out: &mut Bitmap,
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut GenericContexts,
    template: Template,
    tpgdon: bool,
    at: &[AdaptivePixel],
    skip: Option<&Bitmap>,
) {
    let mut ltp = false;

    for y in 0..out.height() {
        if tpgdon && typical_row(out, decoder, contexts, template, &mut ltp, y) {
            continue;
        }

        for x in 0..out.width() {
            if let Some(mask) = skip {
                if mask.get_pixel(x, y) {
                    out.set_pixel(x, y, false);
                    continue;
                }
            }

            let context = gather_context(out, x, y, template, at);
            let bit = decoder.decode(contexts.cell(context));
            out.set_pixel(x, y, bit != 0);
        }
    }
}

/// Form the context index for one pixel (6.2.5.3, 6.2.5.4).
///
/// "Form an integer CONTEXT by gathering the values of the image pixels
/// overlaid by the template (including AT pixels) at its current location."
/// (6.2.5.7)
fn gather_context(out: &Bitmap, x: u32, y: u32, template: Template, at: &[AdaptivePixel]) -> u32 {
    let x = i64::from(x);
    let y = i64::from(y);

    let at_pixel = |i: usize| pixel(out, x + i64::from(at[i].x), y + i64::from(at[i].y));

    match template {
        // Figure 3a: 16 pixels, four of them adaptive.
        Template::Template0 => {
            let mut context = at_pixel(3);
            context = (context << 1) | pixel(out, x - 1, y - 2);
            context = (context << 1) | pixel(out, x, y - 2);
            context = (context << 1) | pixel(out, x + 1, y - 2);
            context = (context << 1) | at_pixel(2);

            context = (context << 1) | at_pixel(1);
            context = (context << 1) | pixel(out, x - 2, y - 1);
            context = (context << 1) | pixel(out, x - 1, y - 1);
            context = (context << 1) | pixel(out, x, y - 1);
            context = (context << 1) | pixel(out, x + 1, y - 1);
            context = (context << 1) | pixel(out, x + 2, y - 1);
            context = (context << 1) | at_pixel(0);

            context = (context << 1) | pixel(out, x - 4, y);
            context = (context << 1) | pixel(out, x - 3, y);
            context = (context << 1) | pixel(out, x - 2, y);
            (context << 1) | pixel(out, x - 1, y)
        }
        // Figure 4: 13 pixels, one adaptive.
        Template::Template1 => {
            let mut context = pixel(out, x - 1, y - 2);
            context = (context << 1) | pixel(out, x, y - 2);
            context = (context << 1) | pixel(out, x + 1, y - 2);
            context = (context << 1) | pixel(out, x + 2, y - 2);

            context = (context << 1) | pixel(out, x - 2, y - 1);
            context = (context << 1) | pixel(out, x - 1, y - 1);
            context = (context << 1) | pixel(out, x, y - 1);
            context = (context << 1) | pixel(out, x + 1, y - 1);
            context = (context << 1) | pixel(out, x + 2, y - 1);
            context = (context << 1) | at_pixel(0);

            context = (context << 1) | pixel(out, x - 3, y);
            context = (context << 1) | pixel(out, x - 2, y);
            (context << 1) | pixel(out, x - 1, y)
        }
        // Figure 5: 10 pixels, one adaptive.
        Template::Template2 => {
            let mut context = pixel(out, x - 1, y - 2);
            context = (context << 1) | pixel(out, x, y - 2);
            context = (context << 1) | pixel(out, x + 1, y - 2);

            context = (context << 1) | pixel(out, x - 2, y - 1);
            context = (context << 1) | pixel(out, x - 1, y - 1);
            context = (context << 1) | pixel(out, x, y - 1);
            context = (context << 1) | pixel(out, x + 1, y - 1);
            context = (context << 1) | at_pixel(0);

            context = (context << 1) | pixel(out, x - 2, y);
            (context << 1) | pixel(out, x - 1, y)
        }
        // Figure 6: 10 pixels, one adaptive, single-row history.
        Template::Template3 => {
            let mut context = pixel(out, x - 3, y - 1);
            context = (context << 1) | pixel(out, x - 2, y - 1);
            context = (context << 1) | pixel(out, x - 1, y - 1);
            context = (context << 1) | pixel(out, x, y - 1);
            context = (context << 1) | pixel(out, x + 1, y - 1);
            context = (context << 1) | at_pixel(0);

            context = (context << 1) | pixel(out, x - 4, y);
            context = (context << 1) | pixel(out, x - 3, y);
            context = (context << 1) | pixel(out, x - 2, y);
            (context << 1) | pixel(out, x - 1, y)
        }
    }
}
