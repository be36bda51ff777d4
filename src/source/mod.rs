//! Frame sources: where decoded 8-bit 4:2:0 pictures come from.
//!
//! A [`FrameSource`] yields planar Y/U/V data of known dimensions, one frame
//! per [`read`](FrameSource::read) call, and signals exhaustion with
//! [`SourceError::EndOfStream`] rather than a sentinel frame. The analyzer
//! treats end of stream as the normal terminator; every other error is
//! fatal and propagated unchanged.
//!
//! [`open_source`] picks a reader by file extension: `.yuv` for headerless
//! raw planar data (dimensions must be supplied) and `.y4m` for YUV4MPEG2.

mod y4m;
mod yuv;

pub use y4m::Y4mReader;
pub use yuv::RawYuvReader;

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::common::Dim;

/// Error raised by a frame source.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The file extension maps to no known reader.
    #[error("unsupported input format '{0}' (supported: .y4m, .yuv)")]
    UnsupportedSource(String),

    /// The input file could not be opened.
    #[error("cannot open {path}: {source}")]
    Open {
        /// Path as given by the caller.
        path: String,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },

    /// Raw planar input was requested without frame dimensions.
    #[error("raw planar input requires explicit width and height")]
    MissingDimensions,

    /// The source's frame size cannot be macroblock-tiled.
    #[error("frame size {width}x{height} must be a positive multiple of 16")]
    InvalidDimensions {
        /// Offending width.
        width: usize,
        /// Offending height.
        height: usize,
    },

    /// The Y4M stream header or a frame marker is malformed.
    #[error("invalid Y4M stream: {0}")]
    InvalidHeader(String),

    /// The stream ended cleanly at a frame boundary.
    #[error("end of stream")]
    EndOfStream,

    /// Any other IO failure while reading frame data.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Caller-provided destination for one plane of a frame read.
///
/// `data` starts at the plane's top-left interior sample; rows are
/// `stride` bytes apart and only the plane's width-worth of each row is
/// written.
pub struct PlaneDst<'a> {
    /// Destination samples, starting at the interior origin.
    pub data: &'a mut [u8],
    /// Destination row stride in bytes.
    pub stride: usize,
}

/// A sequential producer of decoded 4:2:0 frames.
pub trait FrameSource {
    /// Luma dimensions of every frame.
    fn dim(&self) -> Dim;

    /// Row stride of the source's own Y rows; may exceed the width.
    fn stride(&self) -> usize;

    /// Read the next frame into the three destinations and advance.
    ///
    /// Fails with [`SourceError::EndOfStream`] once the sequence is
    /// exhausted; the position does not advance in that case.
    fn read(&mut self, y: PlaneDst<'_>, u: PlaneDst<'_>, v: PlaneDst<'_>)
        -> Result<(), SourceError>;

    /// Whether the source has hit end of stream.
    fn at_eof(&self) -> bool;

    /// Frames produced so far: 1-based after the first successful read.
    fn count(&self) -> usize;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn dim(&self) -> Dim {
        (**self).dim()
    }

    fn stride(&self) -> usize {
        (**self).stride()
    }

    fn read(
        &mut self,
        y: PlaneDst<'_>,
        u: PlaneDst<'_>,
        v: PlaneDst<'_>,
    ) -> Result<(), SourceError> {
        (**self).read(y, u, v)
    }

    fn at_eof(&self) -> bool {
        (**self).at_eof()
    }

    fn count(&self) -> usize {
        (**self).count()
    }
}

/// Open a source for `path`, choosing the reader by extension.
///
/// `dim` is required for raw `.yuv` input and ignored for `.y4m`, whose
/// header carries the dimensions.
pub fn open_source(
    path: &Path,
    dim: Option<Dim>,
) -> Result<Box<dyn FrameSource>, SourceError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "yuv" => {
            let dim = dim.ok_or(SourceError::MissingDimensions)?;
            Ok(Box::new(RawYuvReader::open(path, dim)?))
        }
        "y4m" => Ok(Box::new(Y4mReader::open(path)?)),
        _ => Err(SourceError::UnsupportedSource(
            path.display().to_string(),
        )),
    }
}

/// Validate macroblock alignment at open time.
pub(crate) fn check_dim(dim: Dim) -> Result<(), SourceError> {
    if dim.is_mb_aligned() {
        Ok(())
    } else {
        Err(SourceError::InvalidDimensions {
            width: dim.width,
            height: dim.height,
        })
    }
}

/// Copy `height` rows of `width` bytes from a contiguous reader buffer into
/// a strided destination.
pub(crate) fn copy_plane(src: &[u8], width: usize, height: usize, dst: PlaneDst<'_>) {
    for row in 0..height {
        let s = &src[row * width..row * width + width];
        dst.data[row * dst.stride..row * dst.stride + width].copy_from_slice(s);
    }
}
