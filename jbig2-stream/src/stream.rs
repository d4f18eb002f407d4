//! The incremental segment stream state machine.
//!
//! Bytes arrive in arbitrarily sized chunks through [`Jbig2Decoder::feed`].
//! The machine buffers them, recognizes the file header, slices the buffer
//! into segment headers and bodies as they complete, and dispatches each
//! body to its handler. "Not enough bytes yet" is a control signal, not an
//! error: unconsumed input is retained for the next call.
//!
//! A fatal error moves the machine to its terminal state; everything fed
//! afterwards is counted as garbage, but pages decoded before the failure
//! remain retrievable.

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, warn};

use crate::bitmap::Bitmap;
use crate::error::{
    DecodeError, FormatError, ParseError, Result, SegmentError, UnsupportedFeature, bail,
};
use crate::generic_region::decode_generic_region;
use crate::page::{PageAssembler, parse_page_information};
use crate::reader::Reader;
use crate::segment::{SegmentHeader, SegmentType, parse_segment_header};

/// "This is an 8-byte sequence containing 0x97 0x4A 0x42 0x32 0x0D 0x0A
/// 0x1A 0x0A." (D.4.1)
const FILE_HEADER_ID: [u8; 8] = [0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];

/// Tuning knobs for a decoding context.
#[derive(Debug, Clone, Copy)]
pub struct DecoderOptions {
    /// Ceiling for any single bitmap allocation, in bytes.
    pub max_image_bytes: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_image_bytes: 1 << 30,
        }
    }
}

/// "There are two standalone file organizations possible." (Annex D)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Organization {
    /// "A file header is followed by a sequence of segments. The two parts
    /// of each segment are stored together: first the segment header then
    /// the segment data." (D.1)
    Sequential,
    /// "A file header is followed by a sequence of segment headers; the
    /// last segment header is followed by the data for the first segment,
    /// then the data for the second segment, and so on." (D.2)
    RandomAccess,
}

/// Parse positions the machine can be suspended at.
enum State {
    /// Expecting the standalone file header.
    FileHeader,
    /// Expecting the next segment header (sequential organization).
    SegmentHeader,
    /// Expecting the body of an already-parsed header.
    SegmentBody(SegmentHeader),
    /// Collecting headers of a random-access stream.
    RandomHeaders,
    /// Consuming the queued bodies of a random-access stream.
    RandomBodies,
    /// Terminal: nothing further is parsed.
    Eof,
}

/// A segment the machine has fully processed.
struct SegmentRecord {
    number: u32,
    /// Decoded bitmap of an intermediate region, for segments that refer
    /// back to it.
    result: Option<Arc<Bitmap>>,
}

/// An incremental JBIG2 decoder.
///
/// One decoder owns one stream's worth of state: the byte buffer, the
/// segment table, and the set of pages under assembly. Independent streams
/// decode in independent decoders with no shared state.
pub struct Jbig2Decoder {
    options: DecoderOptions,
    buffer: Vec<u8>,
    state: State,
    /// Headers awaiting their bodies, in order (random-access only).
    queued_headers: VecDeque<SegmentHeader>,
    segments: Vec<SegmentRecord>,
    pages: PageAssembler,
    /// Set once a fatal error has poisoned the stream.
    failed: Option<DecodeError>,
    /// Bytes discarded after the terminal state was reached.
    garbage_bytes: u64,
}

impl Jbig2Decoder {
    /// A decoder for a standalone stream that starts with the file header.
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default())
    }

    /// A standalone-stream decoder with explicit options.
    pub fn with_options(options: DecoderOptions) -> Self {
        Self::build(State::FileHeader, options)
    }

    /// A decoder for embedded segment data: no file header, sequential
    /// organization, as carried inside document containers.
    pub fn embedded() -> Self {
        Self::embedded_with_options(DecoderOptions::default())
    }

    /// An embedded-mode decoder with explicit options.
    pub fn embedded_with_options(options: DecoderOptions) -> Self {
        Self::build(State::SegmentHeader, options)
    }

    fn build(state: State, options: DecoderOptions) -> Self {
        Self {
            options,
            buffer: Vec::new(),
            state,
            queued_headers: VecDeque::new(),
            segments: Vec::new(),
            pages: PageAssembler::new(options.max_image_bytes),
            failed: None,
            garbage_bytes: 0,
        }
    }

    /// Feed a chunk of the byte stream.
    ///
    /// Consumes every complete segment the buffered bytes contain and
    /// retains the rest; call again with more data. After a fatal error the
    /// stream stays abandoned and further chunks are discarded.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        if matches!(self.state, State::Eof) {
            self.garbage_bytes += chunk.len() as u64;
            debug!(
                "ignoring {} bytes past end of stream ({} total)",
                chunk.len(),
                self.garbage_bytes
            );
            return Ok(());
        }

        self.buffer.extend_from_slice(chunk);

        // Move the buffer out so handlers can borrow `self` freely.
        let buffer = std::mem::take(&mut self.buffer);
        match self.advance(&buffer) {
            Ok(consumed) => {
                self.buffer = buffer;
                self.buffer.drain(..consumed);
                Ok(())
            }
            Err(error) => {
                warn!("abandoning stream: {error}");
                self.state = State::Eof;
                self.failed = Some(error);
                Err(error)
            }
        }
    }

    /// Declare the end of the input.
    ///
    /// In-progress pages are completed (streamed pages keep the height they
    /// have grown to); a partially buffered header or body is reported as
    /// truncation. Pages completed before a truncation error remain
    /// retrievable.
    pub fn finish(&mut self) -> Result<()> {
        if let Some(error) = self.failed {
            return Err(error);
        }

        self.pages.complete_all();

        let outcome = match &self.state {
            State::Eof => Ok(()),
            State::FileHeader | State::SegmentHeader | State::RandomHeaders
                if self.buffer.is_empty() =>
            {
                // A random-access stream must announce its end explicitly.
                if matches!(self.state, State::RandomHeaders) {
                    Err(FormatError::MissingEndOfFile.into())
                } else {
                    Ok(())
                }
            }
            State::SegmentBody(header) => Err(FormatError::Truncated.at(header.number)),
            State::RandomBodies => match self.queued_headers.front() {
                Some(header) => Err(FormatError::Truncated.at(header.number)),
                None => Ok(()),
            },
            _ => Err(FormatError::Truncated.into()),
        };

        self.state = State::Eof;
        if let Err(error) = outcome {
            self.failed = Some(error);
        }
        outcome
    }

    /// Return the next completed page, if any.
    ///
    /// The page bitmap is shared: the caller's copy stays valid however
    /// long the decoder itself lives, and vice versa.
    pub fn take_page(&mut self) -> Option<Arc<Bitmap>> {
        self.pages.take_page()
    }

    /// The options this decoder was built with.
    pub fn options(&self) -> DecoderOptions {
        self.options
    }

    /// The decoded bitmap of an intermediate region segment, if that
    /// segment has been processed.
    pub fn intermediate_result(&self, segment_number: u32) -> Option<Arc<Bitmap>> {
        self.segments
            .iter()
            .find(|record| record.number == segment_number)
            .and_then(|record| record.result.clone())
    }

    /// Run the parse loop over the buffered bytes, returning how many were
    /// consumed.
    fn advance(&mut self, data: &[u8]) -> Result<usize> {
        let mut pos = 0;

        loop {
            let rest = &data[pos..];

            match &self.state {
                State::FileHeader => {
                    let Some((organization, consumed)) = parse_file_header(rest)? else {
                        break;
                    };

                    pos += consumed;
                    self.state = match organization {
                        Organization::Sequential => State::SegmentHeader,
                        Organization::RandomAccess => State::RandomHeaders,
                    };
                }
                State::SegmentHeader => {
                    let mut reader = Reader::new(rest);
                    let Some(header) = parse_segment_header(&mut reader)? else {
                        break;
                    };

                    pos += reader.offset();
                    self.state = State::SegmentBody(header);
                }
                State::SegmentBody(header) => {
                    let header = header.clone();

                    let body_len = match header.data_length {
                        Some(len) => len as usize,
                        None => match scan_unknown_length(rest, header.number)? {
                            Some(len) => len,
                            None => break,
                        },
                    };

                    if rest.len() < body_len {
                        break;
                    }

                    pos += body_len;
                    let reached_eof = self.dispatch(&header, &rest[..body_len])?;
                    self.state = if reached_eof {
                        State::Eof
                    } else {
                        State::SegmentHeader
                    };
                }
                State::RandomHeaders => {
                    let mut reader = Reader::new(rest);
                    let Some(header) = parse_segment_header(&mut reader)? else {
                        break;
                    };

                    // The body lengths are needed to find the data section;
                    // the unknown-length escape only works when header and
                    // body are adjacent.
                    if header.data_length.is_none() {
                        bail!(SegmentError::InvalidUnknownLength.at(header.number));
                    }

                    pos += reader.offset();
                    let is_eof = header.segment_type == SegmentType::EndOfFile;
                    self.queued_headers.push_back(header);

                    if is_eof {
                        self.state = State::RandomBodies;
                    }
                }
                State::RandomBodies => {
                    let Some(header) = self.queued_headers.front() else {
                        self.state = State::Eof;
                        continue;
                    };

                    let body_len = header.data_length.unwrap_or(0) as usize;
                    if rest.len() < body_len {
                        break;
                    }

                    if let Some(header) = self.queued_headers.pop_front() {
                        pos += body_len;
                        let reached_eof = self.dispatch(&header, &rest[..body_len])?;
                        if reached_eof {
                            self.state = State::Eof;
                        }
                    }
                }
                State::Eof => {
                    if !rest.is_empty() {
                        self.garbage_bytes += rest.len() as u64;
                        debug!("ignoring {} trailing bytes", rest.len());
                        pos += rest.len();
                    }
                    break;
                }
            }
        }

        Ok(pos)
    }

    /// Process one complete segment body. Returns true when the segment
    /// terminates the stream.
    fn dispatch(&mut self, header: &SegmentHeader, body: &[u8]) -> Result<bool> {
        let number = header.number;
        let page = header.page_association;

        // Referred-to segments must already have been seen; a missing one
        // is survivable here because only unsupported region families
        // actually consume referred results.
        for &referred in &header.referred_to {
            if !self.segments.iter().any(|record| record.number == referred) {
                warn!("segment {number} refers to unseen segment {referred}");
            }
        }

        let mut result = None;

        match header.segment_type {
            SegmentType::PageInformation => {
                let info = parse_page_information(&mut Reader::new(body))
                    .map_err(|e| e.kind.at(number))?;
                self.pages
                    .begin_page(page, info)
                    .map_err(|e| e.kind.at(number))?;
            }
            SegmentType::EndOfPage => {
                self.pages.complete_page(page);
            }
            SegmentType::EndOfStripe => {
                // "One four-byte value, indicating the Y coordinate of the
                // end row." (7.4.10)
                let end_row = Reader::new(body)
                    .read_u32()
                    .ok_or_else(|| ParseError::UnexpectedEof.at(number))?;
                self.pages
                    .end_of_stripe(page, end_row)
                    .map_err(|e| e.kind.at(number))?;
            }
            SegmentType::EndOfFile => {
                debug!("end of file segment");
                return Ok(true);
            }
            SegmentType::ImmediateGenericRegion | SegmentType::ImmediateLosslessGenericRegion => {
                let had_unknown_length = header.data_length.is_none();
                let (info, bitmap) = self
                    .decode_region(body, had_unknown_length)
                    .map_err(|e| e.kind.at(number))?;

                let op = self.pages.effective_operator(page, info.combination_operator);
                self.pages
                    .add_result(page, &bitmap, info.x_location, info.y_location, op)
                    .map_err(|e| e.kind.at(number))?;
            }
            SegmentType::IntermediateGenericRegion => {
                let (_, bitmap) = self
                    .decode_region(body, false)
                    .map_err(|e| e.kind.at(number))?;

                // Kept for segments that refer back to this one; placement
                // happens when the referring segment lands.
                result = Some(bitmap.into_shared());
            }
            SegmentType::SymbolDictionary
            | SegmentType::IntermediateTextRegion
            | SegmentType::ImmediateTextRegion
            | SegmentType::ImmediateLosslessTextRegion
            | SegmentType::PatternDictionary
            | SegmentType::IntermediateHalftoneRegion
            | SegmentType::ImmediateHalftoneRegion
            | SegmentType::ImmediateLosslessHalftoneRegion
            | SegmentType::IntermediateGenericRefinementRegion
            | SegmentType::ImmediateGenericRefinementRegion
            | SegmentType::ImmediateLosslessGenericRefinementRegion => {
                warn!(
                    "segment {number}: {:?} decoding is not wired in, skipping",
                    header.segment_type
                );
            }
            SegmentType::Profiles
            | SegmentType::Tables
            | SegmentType::ColourPalette
            | SegmentType::Extension => {
                debug!("segment {number}: skipping {:?}", header.segment_type);
            }
            SegmentType::Unknown(tag) => {
                warn!("segment {number}: unknown type {tag}, skipping");
            }
        }

        self.segments.push(SegmentRecord { number, result });
        Ok(false)
    }

    fn decode_region(
        &self,
        body: &[u8],
        had_unknown_length: bool,
    ) -> Result<(crate::region::RegionSegmentInfo, Bitmap)> {
        // Enforce the configured allocation ceiling before decoding; the
        // region info sits at a fixed offset at the start of the body.
        let info = crate::region::parse_region_segment_info(&mut Reader::new(body))?;
        self.pages.check_size(info.width, info.height)?;

        decode_generic_region(body, had_unknown_length)
    }
}

impl Default for Jbig2Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the standalone file header (D.4).
///
/// Returns the organization and the number of bytes consumed, or `None`
/// when more input is needed.
fn parse_file_header(data: &[u8]) -> Result<Option<(Organization, usize)>> {
    if data.len() < 9 {
        return Ok(None);
    }

    if data[..8] != FILE_HEADER_ID {
        bail!(FormatError::InvalidHeader);
    }

    // D.4.2: File header flags
    let flags = data[8];

    // "Bit 2: If this bit is 0, no generic region segments uses the
    // templates with 12 AT pixels." (D.4.2)
    if flags & 0x04 != 0 {
        bail!(UnsupportedFeature::ExtendedTemplates);
    }

    // "Bit 3: If this bit is 0, no region segment is extended to be
    // coloured." (D.4.2)
    if flags & 0x08 != 0 {
        bail!(UnsupportedFeature::ColouredRegions);
    }

    // "Bits 4-7: Reserved; must be 0." (D.4.2)
    if flags & 0xF0 != 0 {
        bail!(FormatError::ReservedBits);
    }

    // "Bit 0: File organization type. If this bit is 1, the file uses the
    // sequential organization." (D.4.2)
    let organization = if flags & 0x01 != 0 {
        Organization::Sequential
    } else {
        Organization::RandomAccess
    };

    // "Bit 1: Unknown number of pages." The 4-byte page count is present
    // only when the count was known at encode time (D.4.3).
    let consumed = if flags & 0x02 == 0 {
        if data.len() < 13 {
            return Ok(None);
        }
        let pages = u32::from_be_bytes([data[9], data[10], data[11], data[12]]);
        debug!("file declares {pages} page(s)");
        13
    } else {
        9
    };

    Ok(Some((organization, consumed)))
}

/// Discover the body length of an unknown-length immediate generic region
/// (7.2.7).
///
/// "In order for the decoder to correctly decode the segment, it needs to
/// read the four-byte row count field, which is stored in the last four
/// bytes of the segment's data part. These four bytes can be detected
/// without knowing the length of the data part in advance: if MMR is 1,
/// they are preceded by the two-byte sequence 0x00 0x00; if MMR is 0, they
/// are preceded by the two-byte sequence 0xFF 0xAC."
///
/// Returns the body length including the row count field, or `None` when
/// the marker is not in the buffered bytes yet.
fn scan_unknown_length(body: &[u8], segment_number: u32) -> Result<Option<usize>> {
    // "The form of encoding used by the segment may be determined by
    // examining the eighteenth byte of its segment data part, and the end
    // sequences can occur anywhere after that eighteenth byte." (7.2.7)
    const SCAN_START: usize = crate::region::REGION_INFO_LEN + 1;

    let Some(&flags) = body.get(SCAN_START - 1) else {
        return Ok(None);
    };

    let marker: [u8; 2] = if flags & 0x01 != 0 {
        [0x00, 0x00]
    } else {
        [0xFF, 0xAC]
    };

    let mut offset = SCAN_START;
    while offset + 6 <= body.len() {
        if body[offset..offset + 2] == marker {
            return Ok(Some(offset + 6));
        }
        offset += 1;
    }

    // A degenerate stream could defer the marker forever; that only fails
    // once `finish` reports the segment as truncated.
    if body.len() > (1 << 28) {
        bail!(SegmentError::MissingEndMarker.at(segment_number));
    }

    Ok(None)
}
