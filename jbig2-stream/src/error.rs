//! Error types for JBIG2 decoding.

use core::fmt;

/// How serious a decoding event is.
///
/// Fatal events surface as [`DecodeError`] values; everything below fatal is
/// reported through the `log` crate and never aborts an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Fatal,
}

/// The error type for JBIG2 decoding operations.
///
/// Carries the structured failure kind and, when known, the number of the
/// segment that was being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// The segment being processed when the error occurred, if any.
    pub segment: Option<u32>,
}

impl DecodeError {
    /// The severity of this error.
    ///
    /// Every returned error aborted the operation that produced it, so this
    /// is always [`Severity::Fatal`]; the method exists so callers can treat
    /// returned errors and logged events uniformly.
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// Structured failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Errors related to reading raw data.
    Parse(ParseError),
    /// Errors related to the file header and stream organization.
    Format(FormatError),
    /// Errors related to segment headers and bodies.
    Segment(SegmentError),
    /// Errors related to region parameters and region decoding.
    Region(RegionError),
    /// Errors related to context template configuration.
    Template(TemplateError),
    /// Errors related to page assembly.
    Page(PageError),
    /// Errors from the MMR coding core.
    Mmr(jbig2_mmr::MmrError),
    /// An allocation or size computation exceeded a limit.
    Limit(LimitError),
    /// A well-formed but unsupported feature was encountered.
    Unsupported(UnsupportedFeature),
}

/// Errors related to reading raw data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Unexpected end of input.
    UnexpectedEof,
    /// Input remained after the stream reached its terminal state.
    TrailingData,
}

/// Errors related to the file header and stream organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// Invalid file header ID string.
    InvalidHeader,
    /// Reserved bits are not zero.
    ReservedBits,
    /// The stream ended mid-header or mid-body.
    Truncated,
    /// A random-access stream ended before its end-of-file segment header.
    MissingEndOfFile,
}

/// Errors related to segment headers and bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentError {
    /// Invalid referred-to segment count (values 5 and 6 are reserved).
    InvalidReferredCount,
    /// Segment refers to a segment with a larger or equal number.
    InvalidReference,
    /// The unknown-length sentinel appeared outside an immediate generic
    /// region segment.
    InvalidUnknownLength,
    /// No terminator marker was found for an unknown-length region.
    MissingEndMarker,
}

/// Errors related to region parameters and region decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
    /// Invalid combination operator value.
    InvalidCombinationOperator,
    /// Region with an invalid dimension or placement.
    InvalidDimension,
    /// The row count of an unknown-length region exceeds its height.
    InvalidRowCount,
    /// The coded data ended before the region was fully decoded.
    TruncatedData,
}

/// Errors related to context template configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateError {
    /// Reserved bits in the region flags must be zero.
    ReservedFlags,
    /// Invalid adaptive template pixel location.
    InvalidAtPixel,
    /// The wrong number of adaptive pixels for the template.
    WrongAtCount,
    /// The context array was allocated for a different template.
    ContextMismatch,
    /// MMR coding requires template 0.
    MmrTemplateMismatch,
}

/// Errors related to page assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    /// A region segment targeted a page that was never declared.
    UnknownPage,
    /// A page information body was shorter than the fixed layout.
    TruncatedInfo,
    /// A page with unknown height ended without any stripe information.
    UnknownHeight,
    /// The stream ended without producing any page.
    NoPage,
}

/// An allocation or size computation exceeded a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitError {
    /// A bitmap size computation overflowed.
    SizeOverflow,
    /// A bitmap would exceed the configured allocation limit.
    AllocationTooLarge,
}

/// A well-formed but unsupported feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedFeature {
    /// Generic region templates with 12 adaptive pixels.
    ExtendedTemplates,
    /// Coloured region segments.
    ColouredRegions,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segment {
            Some(number) => write!(f, "segment {number}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Format(e) => write!(f, "{e}"),
            Self::Segment(e) => write!(f, "{e}"),
            Self::Region(e) => write!(f, "{e}"),
            Self::Template(e) => write!(f, "{e}"),
            Self::Page(e) => write!(f, "{e}"),
            Self::Mmr(e) => write!(f, "{e}"),
            Self::Limit(e) => write!(f, "{e}"),
            Self::Unsupported(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of data"),
            Self::TrailingData => write!(f, "trailing data after end of stream"),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeader => write!(f, "invalid file header ID string"),
            Self::ReservedBits => write!(f, "reserved bits must be zero"),
            Self::Truncated => write!(f, "stream ended mid-segment"),
            Self::MissingEndOfFile => {
                write!(f, "random-access stream without an end-of-file segment")
            }
        }
    }
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidReferredCount => write!(f, "invalid referred-to segment count"),
            Self::InvalidReference => write!(f, "segment refers to a later segment"),
            Self::InvalidUnknownLength => {
                write!(f, "unknown data length outside an immediate generic region")
            }
            Self::MissingEndMarker => {
                write!(f, "missing end marker for unknown-length region")
            }
        }
    }
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCombinationOperator => write!(f, "invalid combination operator"),
            Self::InvalidDimension => write!(f, "invalid region dimension"),
            Self::InvalidRowCount => write!(f, "row count exceeds region height"),
            Self::TruncatedData => write!(f, "coded region data ended early"),
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedFlags => write!(f, "reserved region flag bits must be zero"),
            Self::InvalidAtPixel => write!(f, "adaptive pixel outside the causal field"),
            Self::WrongAtCount => write!(f, "wrong number of adaptive pixels"),
            Self::ContextMismatch => write!(f, "context array sized for a different template"),
            Self::MmrTemplateMismatch => write!(f, "template must be 0 when MMR is used"),
        }
    }
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPage => write!(f, "region targets an undeclared page"),
            Self::TruncatedInfo => write!(f, "truncated page information"),
            Self::UnknownHeight => write!(f, "page height never became known"),
            Self::NoPage => write!(f, "stream produced no page"),
        }
    }
}

impl fmt::Display for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeOverflow => write!(f, "bitmap size computation overflowed"),
            Self::AllocationTooLarge => write!(f, "bitmap exceeds the allocation limit"),
        }
    }
}

impl fmt::Display for UnsupportedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtendedTemplates => write!(f, "12-pixel adaptive templates are not supported"),
            Self::ColouredRegions => write!(f, "coloured regions are not supported"),
        }
    }
}

impl core::error::Error for DecodeError {}

impl From<ErrorKind> for DecodeError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, segment: None }
    }
}

impl ErrorKind {
    /// Attach the number of the offending segment.
    pub(crate) fn at(self, segment: u32) -> DecodeError {
        DecodeError {
            kind: self,
            segment: Some(segment),
        }
    }
}

macro_rules! impl_kind_from {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for ErrorKind {
                fn from(e: $ty) -> Self {
                    Self::$variant(e)
                }
            }

            impl From<$ty> for DecodeError {
                fn from(e: $ty) -> Self {
                    ErrorKind::from(e).into()
                }
            }
        )+
    };
}

impl_kind_from!(
    Parse(ParseError),
    Format(FormatError),
    Segment(SegmentError),
    Region(RegionError),
    Template(TemplateError),
    Page(PageError),
    Mmr(jbig2_mmr::MmrError),
    Limit(LimitError),
    Unsupported(UnsupportedFeature),
);

macro_rules! impl_at {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $ty {
                /// Attach the number of the offending segment.
                pub(crate) fn at(self, segment: u32) -> DecodeError {
                    ErrorKind::from(self).at(segment)
                }
            }
        )+
    };
}

impl_at!(ParseError, FormatError, SegmentError);

/// Result type for JBIG2 decoding operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

macro_rules! err {
    ($err:expr) => {
        Err($err.into())
    };
}

pub(crate) use bail;
pub(crate) use err;
