//! Per-frame motion-vector field.
//!
//! A dense macroblock grid of `(mb_cols + 2) x (mb_rows + 2)` cells, one
//! guard cell around the interior. The guard border stands in for the
//! out-of-range neighbors in the median-predictor lookup, so the search
//! code indexes it unconditionally; guard cells are zeroed on [`reset`] and
//! never written afterwards.
//!
//! [`reset`]: MvField::reset

use crate::common::{Dim, MbMode, MotionVector, MB_WIDTH};

/// Motion vectors, costs and modes for one frame's macroblocks.
pub struct MvField {
    mb_cols: usize,
    mb_rows: usize,
    stride_mb: usize,
    pub(crate) mvs: Vec<MotionVector>,
    pub(crate) sads: Vec<i32>,
    pub(crate) mb_bits: Vec<i32>,
    pub(crate) modes: Vec<MbMode>,
    pub(crate) count_intra: usize,
    pub(crate) count_inter_p: usize,
    pub(crate) count_inter_b: usize,
    pub(crate) total_bits: i64,
    // 128-filled scratch spanning one macroblock at plane stride, the DC
    // candidate for the intra predictor.
    pub(crate) flat_block: Vec<u8>,
}

impl MvField {
    /// Allocate a zeroed field for the given frame dimensions and the padded
    /// plane stride its searches will run against.
    #[must_use]
    pub fn new(dim: Dim, plane_stride: usize) -> MvField {
        let mb_cols = dim.mb_cols();
        let mb_rows = dim.mb_rows();
        let stride_mb = mb_cols + 2;
        let cells = stride_mb * (mb_rows + 2);
        MvField {
            mb_cols,
            mb_rows,
            stride_mb,
            mvs: vec![MotionVector::ZERO; cells],
            sads: vec![0; cells],
            mb_bits: vec![0; cells],
            modes: vec![MbMode::Intra; cells],
            count_intra: 0,
            count_inter_p: 0,
            count_inter_b: 0,
            total_bits: 0,
            flat_block: vec![128; (MB_WIDTH - 1) * plane_stride + MB_WIDTH],
        }
    }

    /// Macroblock columns of the interior grid.
    #[must_use]
    pub fn mb_cols(&self) -> usize {
        self.mb_cols
    }

    /// Macroblock rows of the interior grid.
    #[must_use]
    pub fn mb_rows(&self) -> usize {
        self.mb_rows
    }

    /// Cell stride of the guarded grid (`mb_cols + 2`).
    #[must_use]
    pub fn stride_mb(&self) -> usize {
        self.stride_mb
    }

    /// Offset of interior macroblock `(0, 0)` in the guarded grid, also the
    /// offset at which the searches write into the caller's `mses`/`modes`
    /// arrays.
    #[must_use]
    pub fn first_mb_offset(&self) -> usize {
        self.stride_mb + 1
    }

    /// Grid index of interior macroblock `(col, row)`.
    #[must_use]
    pub fn cell(&self, col: usize, row: usize) -> usize {
        (row + 1) * self.stride_mb + (col + 1)
    }

    /// Motion vector at interior macroblock `(col, row)`.
    #[must_use]
    pub fn mv_at(&self, col: usize, row: usize) -> MotionVector {
        self.mvs[self.cell(col, row)]
    }

    /// Mode at interior macroblock `(col, row)`.
    #[must_use]
    pub fn mode_at(&self, col: usize, row: usize) -> MbMode {
        self.modes[self.cell(col, row)]
    }

    /// SAD of the chosen candidate at interior macroblock `(col, row)`.
    #[must_use]
    pub fn sad_at(&self, col: usize, row: usize) -> i32 {
        self.sads[self.cell(col, row)]
    }

    /// Bit proxy of interior macroblock `(col, row)`.
    #[must_use]
    pub fn bits_at(&self, col: usize, row: usize) -> i32 {
        self.mb_bits[self.cell(col, row)]
    }

    /// Macroblocks coded intra in the last search.
    #[must_use]
    pub fn count_intra(&self) -> usize {
        self.count_intra
    }

    /// Macroblocks coded forward-predicted in the last search.
    #[must_use]
    pub fn count_inter_p(&self) -> usize {
        self.count_inter_p
    }

    /// Macroblocks coded bidirectional in the last search.
    #[must_use]
    pub fn count_inter_b(&self) -> usize {
        self.count_inter_b
    }

    /// Bit-proxy total of the last search, before picture-type weighting.
    #[must_use]
    pub fn bits(&self) -> i64 {
        self.total_bits
    }

    /// Zero every cell, including the guard border, and clear the counters.
    pub fn reset(&mut self) {
        self.mvs.fill(MotionVector::ZERO);
        self.sads.fill(0);
        self.mb_bits.fill(0);
        self.modes.fill(MbMode::Intra);
        self.begin_frame();
    }

    /// Clear the per-frame counters at the start of a search pass.
    pub(crate) fn begin_frame(&mut self) {
        self.count_intra = 0;
        self.count_inter_p = 0;
        self.count_inter_b = 0;
        self.total_bits = 0;
    }

    /// Store a search result into an interior cell.
    pub(crate) fn store(
        &mut self,
        col: usize,
        row: usize,
        mv: MotionVector,
        sad: i32,
        bits: i32,
        mode: MbMode,
    ) {
        let idx = self.cell(col, row);
        self.mvs[idx] = mv;
        self.sads[idx] = sad;
        self.mb_bits[idx] = bits;
        self.modes[idx] = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Dim;

    #[test]
    fn guard_border_is_zero_after_reset() {
        let dim = Dim {
            width: 64,
            height: 48,
        };
        let mut field = MvField::new(dim, 64 + 96);
        field.store(0, 0, MotionVector { x: 3, y: -2 }, 10, 5, MbMode::InterP);
        field.reset();

        let stride = field.stride_mb();
        for col in 0..stride {
            assert_eq!(field.mvs[col], MotionVector::ZERO);
        }
        for row in 0..field.mb_rows() + 2 {
            assert_eq!(field.mvs[row * stride], MotionVector::ZERO);
            assert_eq!(field.mvs[row * stride + stride - 1], MotionVector::ZERO);
        }
        assert_eq!(field.mv_at(0, 0), MotionVector::ZERO);
        assert_eq!(field.count_intra(), 0);
        assert_eq!(field.bits(), 0);
    }

    #[test]
    fn first_mb_offset_skips_guard() {
        let dim = Dim {
            width: 64,
            height: 64,
        };
        let field = MvField::new(dim, 64);
        assert_eq!(field.stride_mb(), 6);
        assert_eq!(field.first_mb_offset(), 7);
        assert_eq!(field.cell(0, 0), field.first_mb_offset());
    }
}
