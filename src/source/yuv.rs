//! Headerless raw planar 4:2:0 reader.
//!
//! The file is a bare concatenation of frames, each `w*h` luma bytes
//! followed by two `w/2 * h/2` chroma planes. Dimensions must be supplied
//! by the caller; a truncated final frame is treated as end of stream.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::{check_dim, copy_plane, FrameSource, PlaneDst, SourceError};
use crate::common::Dim;

/// Reader over a raw `.yuv` file.
pub struct RawYuvReader {
    file: BufReader<File>,
    dim: Dim,
    frame_buf: Vec<u8>,
    frames_read: usize,
    eof: bool,
}

impl RawYuvReader {
    /// Open `path` with the given luma dimensions.
    pub fn open(path: &Path, dim: Dim) -> Result<RawYuvReader, SourceError> {
        check_dim(dim)?;
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let frame_size = dim.width * dim.height * 3 / 2;
        Ok(RawYuvReader {
            file: BufReader::new(file),
            dim,
            frame_buf: vec![0; frame_size],
            frames_read: 0,
            eof: false,
        })
    }
}

impl FrameSource for RawYuvReader {
    fn dim(&self) -> Dim {
        self.dim
    }

    fn stride(&self) -> usize {
        self.dim.width
    }

    fn read(
        &mut self,
        y: PlaneDst<'_>,
        u: PlaneDst<'_>,
        v: PlaneDst<'_>,
    ) -> Result<(), SourceError> {
        if self.eof {
            return Err(SourceError::EndOfStream);
        }
        if let Err(err) = self.file.read_exact(&mut self.frame_buf) {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                self.eof = true;
                return Err(SourceError::EndOfStream);
            }
            return Err(err.into());
        }

        let (w, h) = (self.dim.width, self.dim.height);
        let (cw, ch) = (w / 2, h / 2);
        let y_len = w * h;
        let c_len = cw * ch;
        copy_plane(&self.frame_buf[..y_len], w, h, y);
        copy_plane(&self.frame_buf[y_len..y_len + c_len], cw, ch, u);
        copy_plane(&self.frame_buf[y_len + c_len..], cw, ch, v);

        self.frames_read += 1;
        Ok(())
    }

    fn at_eof(&self) -> bool {
        self.eof
    }

    fn count(&self) -> usize {
        self.frames_read
    }
}
