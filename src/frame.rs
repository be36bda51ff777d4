//! Padded frame buffers.
//!
//! Each plane owns a raster with replicate padding on all four sides so that
//! any integer-pixel motion vector inside the search window loads valid
//! bytes without bounds checks in the kernels. Sample `(x, y)` of the
//! interior lives at `index(x, y)`, and after [`Plane::extend_borders`] the
//! same addressing is valid for `-vpad <= y < height + vpad` and
//! `-hpad <= x < width + hpad`, returning the nearest interior sample.

use crate::common::{Dim, HORIZONTAL_PADDING, VERTICAL_PADDING};
use crate::source::{FrameSource, PlaneDst, SourceError};

/// One 8-bit plane with replicate padding.
#[derive(Clone)]
pub struct Plane {
    data: Vec<u8>,
    stride: usize,
    width: usize,
    height: usize,
    hpad: usize,
    vpad: usize,
}

impl Plane {
    /// Allocate a zeroed plane for the given interior size and padding.
    #[must_use]
    pub fn new(width: usize, height: usize, hpad: usize, vpad: usize) -> Plane {
        let stride = width + 2 * hpad;
        Plane {
            data: vec![0; stride * (height + 2 * vpad)],
            stride,
            width,
            height,
            hpad,
            vpad,
        }
    }

    /// Row stride of the padded raster.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Interior width in samples.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Interior height in samples.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Buffer offset of interior sample `(x, y)`; negative coordinates
    /// address the padding.
    #[must_use]
    pub fn index(&self, x: i32, y: i32) -> usize {
        let row = (y + self.vpad as i32) as usize;
        let col = (x + self.hpad as i32) as usize;
        row * self.stride + col
    }

    /// The whole padded raster.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view of the interior, for filling from a source.
    pub fn interior_mut(&mut self) -> PlaneDst<'_> {
        let origin = self.index(0, 0);
        PlaneDst {
            data: &mut self.data[origin..],
            stride: self.stride,
        }
    }

    /// Replicate the outermost interior samples into the padding.
    ///
    /// Columns are extended first for every interior row, then the full
    /// padded top and bottom rows are replicated outward, so the corner
    /// padding equals the nearest corner sample.
    pub fn extend_borders(&mut self) {
        let (w, h) = (self.width, self.height);
        for y in 0..h {
            let row = (y + self.vpad) * self.stride;
            let left = self.data[row + self.hpad];
            let right = self.data[row + self.hpad + w - 1];
            self.data[row..row + self.hpad].fill(left);
            self.data[row + self.hpad + w..row + self.stride].fill(right);
        }
        let top = self.vpad * self.stride;
        for y in 0..self.vpad {
            self.data.copy_within(top..top + self.stride, y * self.stride);
        }
        let bottom = (self.vpad + h - 1) * self.stride;
        for y in 0..self.vpad {
            let dst = (self.vpad + h + y) * self.stride;
            self.data.copy_within(bottom..bottom + self.stride, dst);
        }
    }
}

/// A decoded 4:2:0 frame: padded Y/U/V planes plus its display position.
#[derive(Clone)]
pub struct YuvFrame {
    y: Plane,
    u: Plane,
    v: Plane,
    pos: usize,
}

impl YuvFrame {
    /// Allocate an empty frame for the given luma dimensions.
    #[must_use]
    pub fn new(dim: Dim) -> YuvFrame {
        YuvFrame {
            y: Plane::new(dim.width, dim.height, HORIZONTAL_PADDING, VERTICAL_PADDING),
            u: Plane::new(
                dim.width / 2,
                dim.height / 2,
                HORIZONTAL_PADDING / 2,
                VERTICAL_PADDING / 2,
            ),
            v: Plane::new(
                dim.width / 2,
                dim.height / 2,
                HORIZONTAL_PADDING / 2,
                VERTICAL_PADDING / 2,
            ),
            pos: 0,
        }
    }

    /// Luma plane.
    #[must_use]
    pub fn y(&self) -> &Plane {
        &self.y
    }

    /// First chroma plane.
    #[must_use]
    pub fn u(&self) -> &Plane {
        &self.u
    }

    /// Second chroma plane.
    #[must_use]
    pub fn v(&self) -> &Plane {
        &self.v
    }

    /// 0-based display position, valid after the frame has been read.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Fill this frame with the source's next picture.
    pub fn read_from<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<(), SourceError> {
        source.read(
            self.y.interior_mut(),
            self.u.interior_mut(),
            self.v.interior_mut(),
        )?;
        self.pos = source.count() - 1;
        Ok(())
    }

    /// Extend all three planes' padding; required before the frame is used
    /// as a motion-search reference.
    pub fn extend_borders(&mut self) {
        self.y.extend_borders();
        self.u.extend_borders();
        self.v.extend_borders();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_replicates_edges() {
        let mut plane = Plane::new(32, 32, 8, 8);
        for y in 0..32i32 {
            for x in 0..32i32 {
                let idx = plane.index(x, y);
                plane.data[idx] = ((x + y) % 256) as u8;
            }
        }
        plane.extend_borders();

        for y in 0..32i32 {
            let first = plane.data[plane.index(0, y)];
            let last = plane.data[plane.index(31, y)];
            for p in 1..=8i32 {
                assert_eq!(plane.data[plane.index(-p, y)], first);
                assert_eq!(plane.data[plane.index(31 + p, y)], last);
            }
        }
        for x in -8..40i32 {
            let top = plane.data[plane.index(x, 0)];
            let bottom = plane.data[plane.index(x, 31)];
            for p in 1..=8i32 {
                assert_eq!(plane.data[plane.index(x, -p)], top);
                assert_eq!(plane.data[plane.index(x, 31 + p)], bottom);
            }
        }
    }

    #[test]
    fn extend_constant_plane_stays_constant() {
        let mut plane = Plane::new(16, 16, 4, 4);
        plane.data.fill(0);
        let origin = plane.index(0, 0);
        for y in 0..16 {
            plane.data[origin + y * plane.stride..origin + y * plane.stride + 16].fill(128);
        }
        plane.extend_borders();
        assert!(plane.data.iter().all(|&p| p == 128));
    }
}
