/*!
An incremental, memory-safe JBIG2 decoding core.

`jbig2-stream` decodes the bi-level image format of ITU-T T.88 (also known
as ISO/IEC 14492), as used for scanned document pages embedded in larger
document containers. Bytes are fed in arbitrarily sized chunks; the decoder
parses segment headers as they complete, decodes region payloads into packed
1-bit-per-pixel bitmaps, composites them onto page buffers, and yields
finished pages.

# Example
```rust,no_run
use jbig2_stream::Jbig2Decoder;

let data = std::fs::read("page.jb2").unwrap();

let mut decoder = Jbig2Decoder::new();
decoder.feed(&data).unwrap();
decoder.finish().unwrap();

let page = decoder.take_page().unwrap();
println!("{}x{} page", page.width(), page.height());
```

Streams without the standalone file header (the form carried inside PDF
streams) are decoded with [`Jbig2Decoder::embedded`]; feed any global
segment stream first, then the page's own segments.

The building blocks the region decoders are made of — the arithmetic coder,
the generic-region bitmap codec, the packed [`Bitmap`] — are exported for
decoders of the higher-level region families to build on.

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]

mod arithmetic_decoder;
mod bitmap;
mod error;
mod generic_region;
mod page;
mod reader;
mod region;
mod segment;
mod stream;

pub use arithmetic_decoder::{ArithmeticDecoder, Context};
pub use bitmap::{Bitmap, ComposeOp};
pub use error::{
    DecodeError, ErrorKind, FormatError, LimitError, PageError, ParseError, RegionError, Result,
    SegmentError, Severity, TemplateError, UnsupportedFeature,
};
pub use generic_region::{
    AdaptivePixel, GenericContexts, Template, decode_bitmap, decode_bitmap_mmr,
};
pub use region::RegionSegmentInfo;
pub use segment::{SegmentHeader, SegmentType};
pub use stream::{DecoderOptions, Jbig2Decoder};

use std::sync::Arc;

/// Decode a standalone JBIG2 file in one call.
///
/// Feeds the whole buffer, finishes the stream, and returns the first
/// completed page.
pub fn decode(data: &[u8]) -> Result<Arc<Bitmap>> {
    let mut decoder = Jbig2Decoder::new();
    decoder.feed(data)?;
    decoder.finish()?;

    decoder.take_page().ok_or_else(|| PageError::NoPage.into())
}
