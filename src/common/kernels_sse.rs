//! SSE2 block-matching kernels.
//!
//! Token-verified intrinsics via archmage, with unaligned loads through
//! `safe_unaligned_simd`. Every function here must agree exactly with its
//! scalar counterpart in [`super::kernels`]; SAD early exit is checked at
//! the same row granularity as the scalar code so even early-exit returns
//! match.
//!
//! The 8- and 4-wide loads (`movq`/`movd`) zero-extend into the upper vector
//! bytes, which keeps `_mm_sad_epu8` against zero correct for the narrow
//! widths without masking.

#![allow(missing_docs)] // kernel names mirror the documented scalar set

use archmage::{arcane, X64V3Token};
use core::arch::x86_64::*;
use safe_unaligned_simd::x86_64 as simd_mem;

use super::BidirWeights;

#[arcane]
#[inline]
fn load16(_token: X64V3Token, buf: &[u8], at: usize) -> __m128i {
    simd_mem::_mm_loadu_si128(<&[u8; 16]>::try_from(&buf[at..at + 16]).unwrap())
}

#[arcane]
#[inline]
fn load8(_token: X64V3Token, buf: &[u8], at: usize) -> __m128i {
    simd_mem::_mm_loadu_si64(<&[u8; 8]>::try_from(&buf[at..at + 8]).unwrap())
}

#[arcane]
#[inline]
fn load4(_token: X64V3Token, buf: &[u8], at: usize) -> __m128i {
    simd_mem::_mm_loadu_si32(<&[u8; 4]>::try_from(&buf[at..at + 4]).unwrap())
}

/// Horizontal sum of the four i32 lanes.
#[arcane]
#[inline]
fn hsum_epi32(_token: X64V3Token, v: __m128i) -> i32 {
    let v = _mm_add_epi32(v, _mm_shuffle_epi32(v, 0b10_11_00_01));
    let v = _mm_add_epi32(v, _mm_shuffle_epi32(v, 0b01_00_11_10));
    _mm_cvtsi128_si32(v)
}

/// Sum of both 64-bit halves of a `_mm_sad_epu8` result.
#[arcane]
#[inline]
fn sad_reduce(_token: X64V3Token, v: __m128i) -> i32 {
    _mm_cvtsi128_si32(_mm_add_epi32(v, _mm_srli_si128(v, 8)))
}

macro_rules! sad_impl {
    ($name:ident, $load:ident) => {
        #[arcane]
        pub fn $name(
            token: X64V3Token,
            cur: &[u8],
            reference: &[u8],
            stride: usize,
            block_height: usize,
            early_exit: i32,
        ) -> i32 {
            let mut sum = 0i32;
            for y in 0..block_height {
                let row = y * stride;
                let c = $load(token, cur, row);
                let r = $load(token, reference, row);
                sum += sad_reduce(token, _mm_sad_epu8(c, r));
                if sum >= early_exit {
                    return sum;
                }
            }
            sum
        }
    };
}

sad_impl!(sad16_sse2, load16);
sad_impl!(sad8_sse2, load8);
sad_impl!(sad4_sse2, load4);

/// Per-row pixel sum and sum of squares, shared by the variance kernels.
#[arcane]
#[inline]
fn moment_row(token: X64V3Token, pixels: __m128i) -> (i32, __m128i) {
    let zero = _mm_setzero_si128();
    let row_sum = sad_reduce(token, _mm_sad_epu8(pixels, zero));
    let lo = _mm_unpacklo_epi8(pixels, zero);
    let hi = _mm_unpackhi_epi8(pixels, zero);
    let sq = _mm_add_epi32(_mm_madd_epi16(lo, lo), _mm_madd_epi16(hi, hi));
    (row_sum, sq)
}

macro_rules! variance_impl {
    ($name:ident, $load:ident, $width:expr) => {
        #[arcane]
        pub fn $name(token: X64V3Token, buf: &[u8], stride: usize, block_height: usize) -> i32 {
            let mut sum = 0i32;
            let mut sum2 = _mm_setzero_si128();
            for y in 0..block_height {
                let (row_sum, sq) = moment_row(token, $load(token, buf, y * stride));
                sum += row_sum;
                sum2 = _mm_add_epi32(sum2, sq);
            }
            let sum = i64::from(sum);
            let sum2 = i64::from(hsum_epi32(token, sum2));
            let n = ($width * block_height) as i64;
            (sum2 - (sum * sum + n / 2) / n) as i32
        }
    };
}

variance_impl!(variance16_sse2, load16, 16usize);
variance_impl!(variance8_sse2, load8, 8usize);
variance_impl!(variance4_sse2, load4, 4usize);

/// Per-row signed difference sum and squared-difference sum.
#[arcane]
#[inline]
fn mse_row(_token: X64V3Token, c: __m128i, r: __m128i) -> (__m128i, __m128i) {
    let zero = _mm_setzero_si128();
    let ones = _mm_set1_epi16(1);
    let d_lo = _mm_sub_epi16(_mm_unpacklo_epi8(c, zero), _mm_unpacklo_epi8(r, zero));
    let d_hi = _mm_sub_epi16(_mm_unpackhi_epi8(c, zero), _mm_unpackhi_epi8(r, zero));
    let sums = _mm_add_epi32(_mm_madd_epi16(d_lo, ones), _mm_madd_epi16(d_hi, ones));
    let squares = _mm_add_epi32(_mm_madd_epi16(d_lo, d_lo), _mm_madd_epi16(d_hi, d_hi));
    (sums, squares)
}

macro_rules! mse_impl {
    ($name:ident, $load:ident, $width:expr, $ac:expr) => {
        #[arcane]
        pub fn $name(
            token: X64V3Token,
            cur: &[u8],
            reference: &[u8],
            stride: usize,
            block_height: usize,
        ) -> i32 {
            let mut sums = _mm_setzero_si128();
            let mut squares = _mm_setzero_si128();
            for y in 0..block_height {
                let row = y * stride;
                let (s, sq) = mse_row(token, $load(token, cur, row), $load(token, reference, row));
                sums = _mm_add_epi32(sums, s);
                squares = _mm_add_epi32(squares, sq);
            }
            let mut sum2 = i64::from(hsum_epi32(token, squares));
            if $ac {
                let sum = i64::from(hsum_epi32(token, sums));
                let n = ($width * block_height) as i64;
                sum2 -= (sum * sum + n / 2) / n;
            }
            sum2 as i32
        }
    };
}

mse_impl!(mse16_sse2, load16, 16usize, false);
mse_impl!(mse8_sse2, load8, 8usize, false);
mse_impl!(mse4_sse2, load4, 4usize, false);
mse_impl!(ac_energy16_sse2, load16, 16usize, true);
mse_impl!(ac_energy8_sse2, load8, 8usize, true);
mse_impl!(ac_energy4_sse2, load4, 4usize, true);

/// Weighted interpolation of eight reference pixels, returning the squared
/// error against the current pixels as an i32x4 pair-sum vector.
///
/// The multiplies run in 32-bit lanes: a weight can legitimately reach
/// 32768 (one temporal distance dwarfing the other), which would alias to
/// the sign bit in a 16-bit madd and flip the prediction.
#[arcane]
#[inline]
fn bidir_row8(
    _token: X64V3Token,
    c16: __m128i,
    r1_16: __m128i,
    r2_16: __m128i,
    w_fwd: __m128i,
    w_bwd: __m128i,
) -> __m128i {
    let zero = _mm_setzero_si128();
    let round = _mm_set1_epi32(16384);
    let r1_a = _mm_unpacklo_epi16(r1_16, zero);
    let r1_b = _mm_unpackhi_epi16(r1_16, zero);
    let r2_a = _mm_unpacklo_epi16(r2_16, zero);
    let r2_b = _mm_unpackhi_epi16(r2_16, zero);
    let pred_a = _mm_srai_epi32(
        _mm_add_epi32(
            _mm_add_epi32(_mm_mullo_epi32(r1_a, w_fwd), _mm_mullo_epi32(r2_a, w_bwd)),
            round,
        ),
        15,
    );
    let pred_b = _mm_srai_epi32(
        _mm_add_epi32(
            _mm_add_epi32(_mm_mullo_epi32(r1_b, w_fwd), _mm_mullo_epi32(r2_b, w_bwd)),
            round,
        ),
        15,
    );
    let d_a = _mm_sub_epi32(pred_a, _mm_unpacklo_epi16(c16, zero));
    let d_b = _mm_sub_epi32(pred_b, _mm_unpackhi_epi16(c16, zero));
    // Differences fit i16, so pack and square with one madd.
    let d = _mm_packs_epi32(d_a, d_b);
    _mm_madd_epi16(d, d)
}

macro_rules! bidir_impl {
    ($name:ident, $load:ident, $wide:expr) => {
        #[arcane]
        pub fn $name(
            token: X64V3Token,
            cur: &[u8],
            reference1: &[u8],
            reference2: &[u8],
            stride: usize,
            block_height: usize,
            weights: BidirWeights,
        ) -> i32 {
            let zero = _mm_setzero_si128();
            let w_fwd = _mm_set1_epi32(weights.fwd);
            let w_bwd = _mm_set1_epi32(weights.bwd);
            let mut squares = _mm_setzero_si128();
            for y in 0..block_height {
                let row = y * stride;
                let c = $load(token, cur, row);
                let r1 = $load(token, reference1, row);
                let r2 = $load(token, reference2, row);
                let c_lo = _mm_unpacklo_epi8(c, zero);
                let r1_lo = _mm_unpacklo_epi8(r1, zero);
                let r2_lo = _mm_unpacklo_epi8(r2, zero);
                squares =
                    _mm_add_epi32(squares, bidir_row8(token, c_lo, r1_lo, r2_lo, w_fwd, w_bwd));
                if $wide {
                    let c_hi = _mm_unpackhi_epi8(c, zero);
                    let r1_hi = _mm_unpackhi_epi8(r1, zero);
                    let r2_hi = _mm_unpackhi_epi8(r2, zero);
                    squares =
                        _mm_add_epi32(squares, bidir_row8(token, c_hi, r1_hi, r2_hi, w_fwd, w_bwd));
                }
            }
            hsum_epi32(token, squares)
        }
    };
}

bidir_impl!(bidir_mse16_sse2, load16, true);
bidir_impl!(bidir_mse8_sse2, load8, false);
bidir_impl!(bidir_mse4_sse2, load4, false);
