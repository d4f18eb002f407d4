//! Page information parsing and page assembly (7.4.8 - 7.4.10).
//!
//! The assembler owns every page declared by the stream, composites decoded
//! region bitmaps onto them, grows striped pages whose final height is not
//! known up front, and hands completed pages out as shared bitmaps.

use std::sync::Arc;

use log::warn;

use crate::bitmap::{Bitmap, ComposeOp};
use crate::error::{LimitError, PageError, Result, bail, err};
use crate::reader::Reader;

/// Parsed page information segment body (7.4.8).
#[derive(Debug, Clone)]
pub(crate) struct PageInformation {
    /// "This is a four-byte value containing the width in pixels of the
    /// page's bitmap." (7.4.8.1)
    pub width: u32,
    /// "This is a four-byte value containing the height in pixels of the
    /// page's bitmap." (7.4.8.2)
    ///
    /// `None` when the height was coded as 0xFFFFFFFF: "In this case, the
    /// page must be striped."
    pub height: Option<u32>,
    /// "Bit 2: Page default pixel value. This bit contains the initial
    /// value for every pixel in the page, before any region segments are
    /// decoded or drawn." (7.4.8.5)
    pub default_pixel: bool,
    /// "Bits 3-4: Page default combination operator." (7.4.8.5)
    pub default_operator: ComposeOp,
    /// "Bit 6: Page combination operator overridden." (7.4.8.5)
    pub operator_overridden: bool,
    /// "Bit 15: Page is striped. If the 'page is striped' bit is 1, then
    /// the page may have end of stripe segments associated with it."
    /// (7.4.8.6)
    pub is_striped: bool,
}

/// Parse a page information segment body (7.4.8).
pub(crate) fn parse_page_information(reader: &mut Reader<'_>) -> Result<PageInformation> {
    let width = reader.read_u32().ok_or(PageError::TruncatedInfo)?;
    let height_raw = reader.read_u32().ok_or(PageError::TruncatedInfo)?;

    // 7.4.8.3 / 7.4.8.4: resolutions; zero means unknown. The values do not
    // affect decoding.
    let _x_resolution = reader.read_u32().ok_or(PageError::TruncatedInfo)?;
    let _y_resolution = reader.read_u32().ok_or(PageError::TruncatedInfo)?;

    // 7.4.8.5: Page segment flags
    let flags = reader.read_byte().ok_or(PageError::TruncatedInfo)?;

    let default_pixel = flags & 0x04 != 0;
    let default_operator = match (flags >> 3) & 0x03 {
        0 => ComposeOp::Or,
        1 => ComposeOp::And,
        2 => ComposeOp::Xor,
        _ => ComposeOp::Xnor,
    };
    let operator_overridden = flags & 0x40 != 0;

    // 7.4.8.6: Page striping information
    let striping = reader.read_u16().ok_or(PageError::TruncatedInfo)?;
    let is_striped = striping & 0x8000 != 0;

    let height = if height_raw == 0xFFFF_FFFF {
        // "If the page's bitmap height is unknown then the 'page is
        // striped' bit must be 1." (7.4.8.6)
        if !is_striped {
            bail!(PageError::UnknownHeight);
        }
        None
    } else {
        Some(height_raw)
    };

    Ok(PageInformation {
        width,
        height,
        default_pixel,
        default_operator,
        operator_overridden,
        is_striped,
    })
}

/// The lifecycle of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageState {
    /// Declared and accepting regions.
    New,
    /// Terminal; the bitmap is final.
    Complete,
    /// Handed out to the caller.
    Returned,
}

/// One page under assembly.
struct Page {
    number: u32,
    info: PageInformation,
    bitmap: Bitmap,
    /// Highest row touched by an end-of-stripe segment, plus one.
    end_row: u32,
    state: PageState,
}

/// The set of pages owned by one decoding context.
pub(crate) struct PageAssembler {
    pages: Vec<Page>,
    /// Configured ceiling for any single page allocation, in bytes.
    max_image_bytes: usize,
}

impl PageAssembler {
    pub fn new(max_image_bytes: usize) -> Self {
        Self {
            pages: Vec::new(),
            max_image_bytes,
        }
    }

    /// Reject bitmap dimensions whose allocation would exceed the limit.
    pub fn check_size(&self, width: u32, height: u32) -> Result<()> {
        let bytes = (width as usize)
            .div_ceil(8)
            .checked_mul(height as usize)
            .ok_or(LimitError::SizeOverflow)?;

        if bytes > self.max_image_bytes {
            bail!(LimitError::AllocationTooLarge);
        }

        Ok(())
    }

    /// Declare a page from its page information segment.
    pub fn begin_page(&mut self, number: u32, info: PageInformation) -> Result<()> {
        if self.page_mut(number).is_some() {
            warn!("page {number} declared twice, replacing");
            self.pages.retain(|p| p.number != number);
        }

        // A striped page with unknown height starts empty and grows as
        // stripes arrive.
        let height = info.height.unwrap_or(0);
        self.check_size(info.width, height)?;
        let mut bitmap = Bitmap::new(info.width, height)?;
        if info.default_pixel {
            bitmap.clear(true);
        }

        self.pages.push(Page {
            number,
            info,
            bitmap,
            end_row: 0,
            state: PageState::New,
        });

        Ok(())
    }

    /// Composite a decoded region onto its page.
    ///
    /// For a page whose height is not yet known, the page bitmap grows
    /// (never shrinks) to cover the region before compositing.
    pub fn add_result(
        &mut self,
        number: u32,
        image: &Bitmap,
        x: u32,
        y: u32,
        op: ComposeOp,
    ) -> Result<()> {
        let Some(index) = self.pages.iter().position(|p| p.number == number) else {
            return err!(PageError::UnknownPage);
        };

        let page = &self.pages[index];
        let height_unknown = page.info.height.is_none();
        let default_pixel = page.info.default_pixel;
        let (width, height) = (page.bitmap.width(), page.bitmap.height());

        if height_unknown {
            let needed = u64::from(y) + u64::from(image.height());
            if needed > u64::from(height) {
                let new_height = needed.min(u64::from(u32::MAX)) as u32;
                self.check_size(width, new_height)?;
                self.pages[index]
                    .bitmap
                    .resize(width, new_height, default_pixel)?;
            }
        }

        // Offsets beyond i32 cannot intersect any page we can allocate.
        let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
            return Ok(());
        };

        self.pages[index].bitmap.compose(image, x, y, op)
    }

    /// Record an end-of-stripe marker (7.4.10).
    ///
    /// "The segment data of an end of stripe segment consists of one
    /// four-byte value, indicating the Y coordinate of the end row."
    pub fn end_of_stripe(&mut self, number: u32, end_row: u32) -> Result<()> {
        let Some(index) = self.pages.iter().position(|p| p.number == number) else {
            return err!(PageError::UnknownPage);
        };

        let page = &mut self.pages[index];
        if !page.info.is_striped {
            warn!("end of stripe for non-striped page {number}");
        }
        page.end_row = page.end_row.max(end_row.saturating_add(1));

        let (width, end, default_pixel) =
            (page.bitmap.width(), page.end_row, page.info.default_pixel);

        if page.info.height.is_none() && end > page.bitmap.height() {
            self.check_size(width, end)?;
            self.pages[index].bitmap.resize(width, end, default_pixel)?;
        }

        Ok(())
    }

    /// Mark a page complete (end-of-page segment, or forced at end of
    /// input).
    pub fn complete_page(&mut self, number: u32) {
        let Some(page) = self.page_mut(number) else {
            warn!("end of page {number} without page information");
            return;
        };

        if page.state == PageState::New {
            page.state = PageState::Complete;
        }
    }

    /// Force-complete every in-progress page at end of input.
    pub fn complete_all(&mut self) {
        for page in &mut self.pages {
            if page.state == PageState::New {
                page.state = PageState::Complete;
            }
        }
    }

    /// Return the first completed page, sharing its bitmap with the caller.
    pub fn take_page(&mut self) -> Option<Arc<Bitmap>> {
        let page = self
            .pages
            .iter_mut()
            .find(|p| p.state == PageState::Complete)?;

        page.state = PageState::Returned;
        Some(Arc::new(std::mem::take(&mut page.bitmap)))
    }

    /// Whether a region segment must use the page default operator.
    ///
    /// "If the 'page combination operator overridden' bit is 0, then every
    /// direct region segment associated with this page must use the page's
    /// default combination operator." (7.4.8.5)
    pub fn effective_operator(&self, number: u32, region_op: ComposeOp) -> ComposeOp {
        match self.pages.iter().find(|p| p.number == number) {
            Some(page) if !page.info.operator_overridden => page.info.default_operator,
            _ => region_op,
        }
    }

    fn page_mut(&mut self, number: u32) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.number == number)
    }
}
