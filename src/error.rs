use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use std::io::ErrorKind;

use crate::marker::Marker;

pub type Result<T> = ::std::result::Result<T, Error>;

/// The kind of table a table id refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableClass {
    Quantization,
    HuffmanDc,
    HuffmanAc,
}

impl fmt::Display for TableClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TableClass::Quantization => f.write_str("quantization"),
            TableClass::HuffmanDc => f.write_str("DC huffman"),
            TableClass::HuffmanAc => f.write_str("AC huffman"),
        }
    }
}

/// An enumeration over JPEG features unsupported by this library.
///
/// Only single-scan, Huffman coded, 8-bit baseline DCT images with one (grayscale) or three
/// (YCbCr) components are decoded. Anything else is rejected with one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnsupportedFeature {
    /// A start of frame marker other than SOF0. Contains the marker byte.
    FrameType(u8),
    /// JPEG using arithmetic entropy coding instead of Huffman coding.
    ArithmeticEntropyCoding,
    /// Sample precision in bits. 8 bit sample precision is the only one supported.
    SamplePrecision(u8),
    /// Four component (CMYK) images.
    Cmyk,
    /// Component identifiers 4 and 5, used by YIQ images.
    Yiq,
    /// Spectral selection or successive approximation in a scan header.
    Progressive,
    /// Chroma subsampling, rejected when strict sampling is enabled.
    SubsamplingRatio,
    /// A subsampling ratio not representable as an integer.
    NonIntegerSubsamplingRatio,
    /// A scan that does not cover every component of the frame.
    MultipleScans,
}

/// Malformed structure in the marker segments of an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructuralError {
    /// The first two bytes are not a SOI marker.
    MissingSoi,
    /// A byte other than 0xFF was found where a marker was expected.
    ExpectedMarker(u8),
    /// The input ended before the end of image marker.
    UnexpectedEof,
    /// A SOI marker inside the image.
    EmbeddedSoi,
    /// A marker that is only allowed after the scan header appeared before it.
    MarkerBeforeScan(Marker),
    /// A marker byte with no meaning in a baseline image.
    UnknownMarker(u8),
    DuplicateFrame,
    ScanBeforeFrame,
    /// The image ended without a frame header or scan.
    NoFrame,
    /// Zero width or height.
    InvalidDimensions,
    InvalidComponentCount(u8),
    /// Component id after normalization to 1-based numbering.
    InvalidComponentId(u8),
    DuplicateComponent(u8),
    InvalidSamplingFactor { component: u8, horizontal: u8, vertical: u8 },
    InvalidTableId { class: TableClass, id: u8 },
    TooManyHuffmanSymbols(usize),
    /// The code length counts describe more codes than fit in their lengths.
    InvalidHuffmanCodeLengths,
    /// A segment length field that does not match the segment's content.
    SegmentLength { marker: Marker, declared: u16, expected: u16 },
    /// A scan component references a table that was never defined.
    UninitializedTable { class: TableClass, id: u8 },
    /// A marker other than RSTn or EOI inside the entropy-coded data.
    InvalidMarkerInScan(u8),
    EmptyScan,
}

/// Failures while decoding the entropy-coded data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntropyError {
    /// The bit stream ended in the middle of a symbol or coefficient.
    EndOfData,
    /// No code of up to 16 bits matched the table.
    InvalidCode { class: TableClass },
    DcLengthOutOfRange(u8),
    AcLengthOutOfRange(u8),
    /// A zero run that would move past the last coefficient of a block.
    ZeroRunOverflow { position: u8, run: u8 },
}

/// Errors that can occur while decoding a JPEG image.
#[derive(Debug)]
pub enum Error {
    /// The marker segments are malformed.
    Structural(StructuralError),
    /// The image makes use of a JPEG feature not supported by this library.
    Unsupported(UnsupportedFeature),
    /// The entropy-coded data could not be decoded.
    Entropy(EntropyError),
    /// The decoded image would exceed the configured buffer limit.
    BufferLimit { required: usize, limit: usize },
    /// An I/O error occurred while reading the image.
    Io(IoError),
    /// The decoding stages disagreed about the image layout.
    Internal(&'static str),
}

impl Error {
    /// Whether this is a structural fault, which includes unsupported features.
    pub fn is_structural(&self) -> bool {
        matches!(*self, Error::Structural(_) | Error::Unsupported(_))
    }

    pub fn is_entropy(&self) -> bool {
        matches!(*self, Error::Entropy(_))
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StructuralError::MissingSoi => f.write_str("first two bytes are not a SOI marker"),
            StructuralError::ExpectedMarker(byte) => write!(f, "found byte {:#04x} where a marker was expected", byte),
            StructuralError::UnexpectedEof => f.write_str("file ended prematurely"),
            StructuralError::EmbeddedSoi => f.write_str("embedded SOI marker"),
            StructuralError::MarkerBeforeScan(marker) => write!(f, "{:?} marker found before the scan header", marker),
            StructuralError::UnknownMarker(byte) => write!(f, "unknown marker {:#04x}", byte),
            StructuralError::DuplicateFrame => f.write_str("multiple frame headers"),
            StructuralError::ScanBeforeFrame => f.write_str("scan header encountered before frame header"),
            StructuralError::NoFrame => f.write_str("no frame header found"),
            StructuralError::InvalidDimensions => f.write_str("zero width or height"),
            StructuralError::InvalidComponentCount(count) => write!(f, "{} color components given (1 or 3 required)", count),
            StructuralError::InvalidComponentId(id) => write!(f, "invalid component id {}", id),
            StructuralError::DuplicateComponent(id) => write!(f, "duplicate component id {}", id),
            StructuralError::InvalidSamplingFactor { component, horizontal, vertical } =>
                write!(f, "invalid sampling factors {}x{} for component {}", horizontal, vertical, component),
            StructuralError::InvalidTableId { class, id } => write!(f, "invalid {} table id {}", class, id),
            StructuralError::TooManyHuffmanSymbols(count) => write!(f, "{} symbols in huffman table (at most 162)", count),
            StructuralError::InvalidHuffmanCodeLengths => f.write_str("bad huffman code length"),
            StructuralError::SegmentLength { marker, declared, expected } =>
                write!(f, "{:?} segment length is {} but its content requires {}", marker, declared, expected),
            StructuralError::UninitializedTable { class, id } => write!(f, "use of unset {} table {}", class, id),
            StructuralError::InvalidMarkerInScan(byte) => write!(f, "invalid marker {:#04x} in entropy-coded data", byte),
            StructuralError::EmptyScan => f.write_str("scan header lists no components"),
        }
    }
}

impl fmt::Display for EntropyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            EntropyError::EndOfData => f.write_str("entropy-coded data ended prematurely"),
            EntropyError::InvalidCode { class } => write!(f, "failed to decode {} code", class),
            EntropyError::DcLengthOutOfRange(length) => write!(f, "DC coefficient length {} greater than 11", length),
            EntropyError::AcLengthOutOfRange(length) => write!(f, "AC coefficient length {} greater than 10", length),
            EntropyError::ZeroRunOverflow { position, run } =>
                write!(f, "zero run of {} at position {} exceeds the block", run, position),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Structural(ref err)   => write!(f, "invalid JPEG format: {}", err),
            Error::Unsupported(ref feat) => write!(f, "unsupported JPEG feature: {:?}", feat),
            Error::Entropy(ref err)      => write!(f, "invalid entropy-coded data: {}", err),
            Error::BufferLimit { required, limit } =>
                write!(f, "decoded image needs {} bytes, limit is {}", required, limit),
            Error::Io(ref err)           => err.fmt(f),
            Error::Internal(desc)        => write!(f, "internal error: {}", desc),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        match err.kind() {
            ErrorKind::UnexpectedEof => Error::Structural(StructuralError::UnexpectedEof),
            _ => Error::Io(err),
        }
    }
}

impl From<StructuralError> for Error {
    fn from(err: StructuralError) -> Error {
        Error::Structural(err)
    }
}

impl From<EntropyError> for Error {
    fn from(err: EntropyError) -> Error {
        Error::Entropy(err)
    }
}

impl From<UnsupportedFeature> for Error {
    fn from(feature: UnsupportedFeature) -> Error {
        Error::Unsupported(feature)
    }
}
