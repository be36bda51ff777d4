//! Macroblock search drivers: spatial, temporal and bidirectional.
//!
//! All three walk the macroblock grid in raster order and leave one result
//! per interior cell of the owning [`MvField`], plus the chosen residual
//! energy and mode in the caller's scratch arrays (written at
//! [`MvField::first_mb_offset`]). The temporal search starts from the
//! component-wise median of the left, top and top-right neighbor vectors,
//! scans a `+/-SEARCH_RANGE` window at integer resolution with SAD early
//! exit, then refines one diamond step. No sub-pixel pass.
//!
//! The bit proxy is pure integer arithmetic (leading-zero log2), so frame
//! totals are reproducible bit-for-bit across runs and hosts. The constants
//! here are frozen; changing them changes every recorded bit figure.

use crate::common::dispatch::KernelSet;
use crate::common::{
    BidirWeights, MbMode, MotionVector, HORIZONTAL_PADDING, MB_WIDTH, SEARCH_RANGE,
    VERTICAL_PADDING,
};
use crate::frame::{Plane, YuvFrame};
use crate::mv_field::MvField;

/// Fixed Lagrangian weighting motion-vector rate against SAD in the
/// inter/intra decision.
const LAMBDA: i32 = 16;

/// Bits in the binary representation of `x + 1`; the integer log2 proxy.
#[inline]
fn bit_len(x: i32) -> i32 {
    debug_assert!(x >= 0);
    (32 - (x as u32 + 1).leading_zeros()) as i32
}

/// Rate proxy for a differential motion vector, exp-Golomb shaped.
#[inline]
fn mv_bits(dmv: MotionVector) -> i32 {
    bit_len(2 * i32::from(dmv.x).abs()) + bit_len(2 * i32::from(dmv.y).abs())
}

/// Rate proxy for an intra macroblock.
#[inline]
fn intra_bit_cost(variance: i32, mse: i32) -> i32 {
    8 + 2 * bit_len(variance) + 6 * bit_len(mse)
}

/// Rate proxy for an inter macroblock.
#[inline]
fn inter_bit_cost(mse: i32, dmv_bits: i32) -> i32 {
    2 + 6 * bit_len(mse) + dmv_bits
}

/// Component-wise median of three motion vectors.
#[inline]
fn median3(a: MotionVector, b: MotionVector, c: MotionVector) -> MotionVector {
    #[inline]
    fn med(a: i16, b: i16, c: i16) -> i16 {
        a.max(b).min(a.min(b).max(c))
    }
    MotionVector {
        x: med(a.x, b.x, c.x),
        y: med(a.y, b.y, c.y),
    }
}

/// Intra prediction of one macroblock: best of the upper neighbor, the left
/// neighbor and the flat DC-128 block, scored by SAD.
struct IntraPred {
    variance: i32,
    sad: i32,
    mse: i32,
}

fn intra_predict(
    k: &KernelSet,
    plane: &Plane,
    flat_block: &[u8],
    col: usize,
    row: usize,
) -> IntraPred {
    let stride = plane.stride();
    let px = (col * MB_WIDTH) as i32;
    let py = (row * MB_WIDTH) as i32;
    let data = plane.data();
    let cur = &data[plane.index(px, py)..];

    let variance = (k.variance16)(cur, stride, MB_WIDTH);

    // Candidates in fixed order; strictly lower SAD wins.
    let mut best_sad = i32::MAX;
    let mut best_pred: Option<&[u8]> = None;
    if row > 0 {
        let up = &data[plane.index(px, py - MB_WIDTH as i32)..];
        let sad = (k.sad16)(cur, up, stride, MB_WIDTH, best_sad);
        if sad < best_sad {
            best_sad = sad;
            best_pred = Some(up);
        }
    }
    if col > 0 {
        let left = &data[plane.index(px - MB_WIDTH as i32, py)..];
        let sad = (k.sad16)(cur, left, stride, MB_WIDTH, best_sad);
        if sad < best_sad {
            best_sad = sad;
            best_pred = Some(left);
        }
    }
    let dc_sad = (k.sad16)(cur, flat_block, stride, MB_WIDTH, best_sad);
    if dc_sad < best_sad {
        best_sad = dc_sad;
        best_pred = Some(flat_block);
    }

    let pred = best_pred.unwrap_or(flat_block);
    let mse = (k.mse16)(cur, pred, stride, MB_WIDTH);
    IntraPred {
        variance,
        sad: best_sad,
        mse,
    }
}

/// Result of one macroblock's windowed motion search.
struct MbSearch {
    mv: MotionVector,
    sad: i32,
    pred: MotionVector,
}

impl MvField {
    /// Median predictor for interior macroblock `(col, row)`, read from this
    /// field's own cells; the guard border supplies zeros at the edges.
    fn predictor(&self, col: usize, row: usize) -> MotionVector {
        let idx = self.cell(col, row);
        let stride = self.stride_mb();
        let left = self.mvs[idx - 1];
        let top = self.mvs[idx - stride];
        let top_right = self.mvs[idx - stride + 1];
        median3(left, top, top_right)
    }

    /// Windowed full search plus one diamond refinement step for the
    /// macroblock at `(col, row)` of `cur` against `reference`.
    fn motion_search_mb(
        &self,
        k: &KernelSet,
        cur: &Plane,
        reference: &Plane,
        col: usize,
        row: usize,
    ) -> MbSearch {
        let stride = cur.stride();
        let px = (col * MB_WIDTH) as i32;
        let py = (row * MB_WIDTH) as i32;
        let cur_blk = &cur.data()[cur.index(px, py)..];
        let ref_data = reference.data();

        // Any candidate inside these bounds reads valid padded bytes.
        let x_min = -(px + HORIZONTAL_PADDING as i32);
        let x_max = reference.width() as i32 + HORIZONTAL_PADDING as i32 - MB_WIDTH as i32 - px;
        let y_min = -(py + VERTICAL_PADDING as i32);
        let y_max = reference.height() as i32 + VERTICAL_PADDING as i32 - MB_WIDTH as i32 - py;

        let pred = self.predictor(col, row);
        let cx = i32::from(pred.x).clamp(x_min, x_max);
        let cy = i32::from(pred.y).clamp(y_min, y_max);

        // Seed with the predictor candidate so an all-tie scan (static
        // content) keeps it; window candidates must strictly improve.
        let mut best = MotionVector {
            x: cx as i16,
            y: cy as i16,
        };
        let mut best_sad = (k.sad16)(
            cur_blk,
            &ref_data[reference.index(px + cx, py + cy)..],
            stride,
            MB_WIDTH,
            i32::MAX,
        );
        for my in (cy - SEARCH_RANGE).max(y_min)..=(cy + SEARCH_RANGE).min(y_max) {
            for mx in (cx - SEARCH_RANGE).max(x_min)..=(cx + SEARCH_RANGE).min(x_max) {
                let refr = &ref_data[reference.index(px + mx, py + my)..];
                let sad = (k.sad16)(cur_blk, refr, stride, MB_WIDTH, best_sad);
                if sad < best_sad {
                    best_sad = sad;
                    best = MotionVector {
                        x: mx as i16,
                        y: my as i16,
                    };
                }
            }
        }

        // One diamond step around the winner.
        const DIAMOND: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        let (wx, wy) = (i32::from(best.x), i32::from(best.y));
        for (dx, dy) in DIAMOND {
            let mx = wx + dx;
            let my = wy + dy;
            if mx < x_min || mx > x_max || my < y_min || my > y_max {
                continue;
            }
            let refr = &ref_data[reference.index(px + mx, py + my)..];
            let sad = (k.sad16)(cur_blk, refr, stride, MB_WIDTH, best_sad);
            if sad < best_sad {
                best_sad = sad;
                best = MotionVector {
                    x: mx as i16,
                    y: my as i16,
                };
            }
        }

        MbSearch {
            mv: best,
            sad: best_sad,
            pred,
        }
    }

    /// Intra-predict every macroblock of an I picture.
    ///
    /// Returns the frame residual energy; per-block energies and modes are
    /// written into `mses` and `modes` at [`MvField::first_mb_offset`].
    pub fn predict_spatial(
        &mut self,
        cur: &YuvFrame,
        k: &KernelSet,
        mses: &mut [i32],
        modes: &mut [MbMode],
    ) -> i64 {
        self.begin_frame();
        let mut error_sum = 0i64;
        for row in 0..self.mb_rows() {
            for col in 0..self.mb_cols() {
                let ip = intra_predict(k, cur.y(), &self.flat_block, col, row);
                let bits = intra_bit_cost(ip.variance, ip.mse);
                self.store(col, row, MotionVector::ZERO, ip.sad, bits, MbMode::Intra);
                self.count_intra += 1;
                self.total_bits += i64::from(bits);
                let out = self.cell(col, row);
                mses[out] = ip.mse;
                modes[out] = MbMode::Intra;
                error_sum += i64::from(ip.mse);
            }
        }
        error_sum
    }

    /// Motion-search every macroblock of a P picture against one reference.
    pub fn predict_temporal(
        &mut self,
        cur: &YuvFrame,
        reference: &YuvFrame,
        k: &KernelSet,
        mses: &mut [i32],
        modes: &mut [MbMode],
    ) -> i64 {
        self.begin_frame();
        let stride = cur.y().stride();
        let mut error_sum = 0i64;
        for row in 0..self.mb_rows() {
            for col in 0..self.mb_cols() {
                let found = self.motion_search_mb(k, cur.y(), reference.y(), col, row);
                let dmv = MotionVector {
                    x: found.mv.x - found.pred.x,
                    y: found.mv.y - found.pred.y,
                };
                let dmv_bits = mv_bits(dmv);
                let inter_cost = found.sad + LAMBDA * dmv_bits;

                let ip = intra_predict(k, cur.y(), &self.flat_block, col, row);

                let px = (col * MB_WIDTH) as i32;
                let py = (row * MB_WIDTH) as i32;
                let (mse, bits, mode) = if ip.sad < inter_cost {
                    let bits = intra_bit_cost(ip.variance, ip.mse);
                    self.store(col, row, MotionVector::ZERO, ip.sad, bits, MbMode::Intra);
                    self.count_intra += 1;
                    (ip.mse, bits, MbMode::Intra)
                } else {
                    let cur_blk = &cur.y().data()[cur.y().index(px, py)..];
                    let ref_blk = &reference.y().data()[reference
                        .y()
                        .index(px + i32::from(found.mv.x), py + i32::from(found.mv.y))..];
                    let mse = (k.mse16)(cur_blk, ref_blk, stride, MB_WIDTH);
                    let bits = inter_bit_cost(mse, dmv_bits);
                    self.store(col, row, found.mv, found.sad, bits, MbMode::InterP);
                    self.count_inter_p += 1;
                    (mse, bits, MbMode::InterP)
                };
                self.total_bits += i64::from(bits);
                let out = self.cell(col, row);
                mses[out] = mse;
                modes[out] = mode;
                error_sum += i64::from(mse);
            }
        }
        error_sum
    }

    /// Search every macroblock of a B picture against both anchors.
    ///
    /// `fwd_field` and `bwd_field` own the two unidirectional searches and
    /// their predictor chains; the final per-block decision lands in `self`.
    /// Candidates are compared by block residual energy in the fixed order
    /// intra, forward, backward, bidirectional, later candidates winning
    /// ties.
    #[allow(clippy::too_many_arguments)]
    pub fn predict_bidirectional(
        &mut self,
        cur: &YuvFrame,
        fwd: &YuvFrame,
        bwd: &YuvFrame,
        fwd_field: &mut MvField,
        bwd_field: &mut MvField,
        k: &KernelSet,
        mses: &mut [i32],
        modes: &mut [MbMode],
    ) -> i64 {
        self.begin_frame();
        let stride = cur.y().stride();
        let td_fwd = (cur.pos() - fwd.pos()) as i32;
        let td_bwd = (bwd.pos() - cur.pos()) as i32;
        let weights = BidirWeights::from_distances(td_fwd, td_bwd);

        let mut error_sum = 0i64;
        for row in 0..self.mb_rows() {
            for col in 0..self.mb_cols() {
                let s1 = fwd_field.motion_search_mb(k, cur.y(), fwd.y(), col, row);
                fwd_field.store(col, row, s1.mv, s1.sad, 0, MbMode::InterP);
                let s2 = bwd_field.motion_search_mb(k, cur.y(), bwd.y(), col, row);
                bwd_field.store(col, row, s2.mv, s2.sad, 0, MbMode::InterP);

                let ip = intra_predict(k, cur.y(), &self.flat_block, col, row);

                let px = (col * MB_WIDTH) as i32;
                let py = (row * MB_WIDTH) as i32;
                let cur_blk = &cur.y().data()[cur.y().index(px, py)..];
                let fwd_blk = &fwd.y().data()
                    [fwd.y().index(px + i32::from(s1.mv.x), py + i32::from(s1.mv.y))..];
                let bwd_blk = &bwd.y().data()
                    [bwd.y().index(px + i32::from(s2.mv.x), py + i32::from(s2.mv.y))..];

                let mse_fwd = (k.mse16)(cur_blk, fwd_blk, stride, MB_WIDTH);
                let mse_bwd = (k.mse16)(cur_blk, bwd_blk, stride, MB_WIDTH);
                let mse_bi = (k.bidir_mse16)(cur_blk, fwd_blk, bwd_blk, stride, MB_WIDTH, weights);

                let dmv1_bits = mv_bits(MotionVector {
                    x: s1.mv.x - s1.pred.x,
                    y: s1.mv.y - s1.pred.y,
                });
                let dmv2_bits = mv_bits(MotionVector {
                    x: s2.mv.x - s2.pred.x,
                    y: s2.mv.y - s2.pred.y,
                });

                // Fixed candidate order; `<=` lets later candidates take ties.
                let mut best_mse = ip.mse;
                let mut choice = 0u8;
                if mse_fwd <= best_mse {
                    best_mse = mse_fwd;
                    choice = 1;
                }
                if mse_bwd <= best_mse {
                    best_mse = mse_bwd;
                    choice = 2;
                }
                if mse_bi <= best_mse {
                    best_mse = mse_bi;
                    choice = 3;
                }

                let (bits, mode) = match choice {
                    0 => {
                        let bits = intra_bit_cost(ip.variance, ip.mse);
                        self.store(col, row, MotionVector::ZERO, ip.sad, bits, MbMode::Intra);
                        self.count_intra += 1;
                        (bits, MbMode::Intra)
                    }
                    1 => {
                        let bits = inter_bit_cost(mse_fwd, dmv1_bits);
                        self.store(col, row, s1.mv, s1.sad, bits, MbMode::InterP);
                        self.count_inter_p += 1;
                        (bits, MbMode::InterP)
                    }
                    2 => {
                        let bits = inter_bit_cost(mse_bwd, dmv2_bits);
                        self.store(col, row, s2.mv, s2.sad, bits, MbMode::InterP);
                        self.count_inter_p += 1;
                        (bits, MbMode::InterP)
                    }
                    _ => {
                        let bits = inter_bit_cost(mse_bi, dmv1_bits + dmv2_bits);
                        self.store(col, row, s1.mv, s1.sad, bits, MbMode::InterB);
                        self.count_inter_b += 1;
                        (bits, MbMode::InterB)
                    }
                };
                self.total_bits += i64::from(bits);
                let out = self.cell(col, row);
                mses[out] = best_mse;
                modes[out] = mode;
                error_sum += i64::from(best_mse);
            }
        }
        error_sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_len_matches_log2() {
        assert_eq!(bit_len(0), 1);
        assert_eq!(bit_len(1), 2);
        assert_eq!(bit_len(3), 3);
        assert_eq!(bit_len(255), 9);
    }

    #[test]
    fn median3_is_component_wise() {
        let a = MotionVector { x: 1, y: 9 };
        let b = MotionVector { x: 5, y: -3 };
        let c = MotionVector { x: 3, y: 0 };
        assert_eq!(median3(a, b, c), MotionVector { x: 3, y: 0 });
        assert_eq!(median3(b, a, c), MotionVector { x: 3, y: 0 });
        assert_eq!(median3(c, b, a), MotionVector { x: 3, y: 0 });
    }

    #[test]
    fn zero_mv_bits_is_minimal() {
        assert_eq!(mv_bits(MotionVector::ZERO), 2);
        assert!(mv_bits(MotionVector { x: 4, y: 0 }) > mv_bits(MotionVector { x: 1, y: 0 }));
    }
}
