//! YUV4MPEG2 stream reader.
//!
//! Parses the `YUV4MPEG2 W<w> H<h> ...` header line, accepts only 4:2:0
//! chroma subsampling, and streams `FRAME`-delimited pictures. Frame lines
//! may carry parameters after the marker; everything up to the newline is
//! skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use super::{check_dim, copy_plane, FrameSource, PlaneDst, SourceError};
use crate::common::Dim;

const MAGIC: &str = "YUV4MPEG2";

/// Reader over a `.y4m` file.
#[derive(Debug)]
pub struct Y4mReader {
    file: BufReader<File>,
    dim: Dim,
    frame_buf: Vec<u8>,
    frames_read: usize,
    eof: bool,
}

impl Y4mReader {
    /// Open `path` and parse the stream header.
    pub fn open(path: &Path) -> Result<Y4mReader, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let mut file = BufReader::new(file);

        let mut header = String::new();
        file.read_line(&mut header)?;
        let header = header.trim_end_matches('\n');
        if !header.starts_with(MAGIC) {
            return Err(SourceError::InvalidHeader(
                "missing YUV4MPEG2 signature".into(),
            ));
        }

        let mut width = 0usize;
        let mut height = 0usize;
        for token in header.split_ascii_whitespace().skip(1) {
            let (key, value) = token.split_at(1);
            match key {
                "W" => {
                    width = value
                        .parse()
                        .map_err(|_| SourceError::InvalidHeader(format!("bad width '{value}'")))?;
                }
                "H" => {
                    height = value
                        .parse()
                        .map_err(|_| SourceError::InvalidHeader(format!("bad height '{value}'")))?;
                }
                "C" => {
                    if !value.starts_with("420") {
                        return Err(SourceError::InvalidHeader(format!(
                            "unsupported colorspace C{value} (only 4:2:0)"
                        )));
                    }
                }
                // Frame rate, interlacing and aspect tokens don't affect
                // the analysis.
                _ => {}
            }
        }
        if width == 0 || height == 0 {
            return Err(SourceError::InvalidHeader("missing W or H".into()));
        }
        let dim = Dim { width, height };
        check_dim(dim)?;

        let frame_size = width * height * 3 / 2;
        Ok(Y4mReader {
            file,
            dim,
            frame_buf: vec![0; frame_size],
            frames_read: 0,
            eof: false,
        })
    }

    /// Consume the `FRAME...\n` line before each picture.
    fn read_frame_marker(&mut self) -> Result<(), SourceError> {
        let mut line = Vec::new();
        let n = self.file.read_until(b'\n', &mut line)?;
        if n == 0 {
            self.eof = true;
            return Err(SourceError::EndOfStream);
        }
        if !line.starts_with(b"FRAME") {
            return Err(SourceError::InvalidHeader(
                "expected FRAME marker".into(),
            ));
        }
        Ok(())
    }
}

impl FrameSource for Y4mReader {
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
        self.read_frame_marker()?;
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
