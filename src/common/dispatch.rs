//! Kernel dispatch: one flat function table chosen at startup.
//!
//! The searches call through a [`KernelSet`] rather than picking an
//! implementation per call. [`KernelSet::detect`] selects the best backend
//! once (SSE2 when the `simd` feature is on and the CPU token summons,
//! scalar otherwise) and caches it for the life of the process. The scalar
//! reference functions in [`super::kernels`] remain callable by name so
//! every backend can be tested against them.

use std::sync::OnceLock;

use super::kernels;
use super::BidirWeights;

/// SAD kernel: `(cur, reference, stride, block_height, early_exit)`.
pub type SadFn = fn(&[u8], &[u8], usize, usize, i32) -> i32;
/// Single-buffer moment kernel: `(buf, stride, block_height)`.
pub type VarianceFn = fn(&[u8], usize, usize) -> i32;
/// Two-buffer squared-error kernel: `(cur, reference, stride, block_height)`.
pub type MseFn = fn(&[u8], &[u8], usize, usize) -> i32;
/// Weighted two-reference squared-error kernel.
pub type BidirMseFn = fn(&[u8], &[u8], &[u8], usize, usize, BidirWeights) -> i32;

/// The full kernel table at the three block widths.
#[derive(Clone, Copy)]
pub struct KernelSet {
    /// 16-wide SAD with early exit.
    pub sad16: SadFn,
    /// 8-wide SAD with early exit.
    pub sad8: SadFn,
    /// 4-wide SAD with early exit.
    pub sad4: SadFn,
    /// 16-wide variance.
    pub variance16: VarianceFn,
    /// 8-wide variance.
    pub variance8: VarianceFn,
    /// 4-wide variance.
    pub variance4: VarianceFn,
    /// 16-wide squared error.
    pub mse16: MseFn,
    /// 8-wide squared error.
    pub mse8: MseFn,
    /// 4-wide squared error.
    pub mse4: MseFn,
    /// 16-wide DC-removed squared error.
    pub ac_energy16: MseFn,
    /// 8-wide DC-removed squared error.
    pub ac_energy8: MseFn,
    /// 4-wide DC-removed squared error.
    pub ac_energy4: MseFn,
    /// 16-wide bidirectional squared error.
    pub bidir_mse16: BidirMseFn,
    /// 8-wide bidirectional squared error.
    pub bidir_mse8: BidirMseFn,
    /// 4-wide bidirectional squared error.
    pub bidir_mse4: BidirMseFn,
}

impl KernelSet {
    /// The scalar reference table.
    pub const fn scalar() -> KernelSet {
        KernelSet {
            sad16: kernels::sad16_scalar,
            sad8: kernels::sad8_scalar,
            sad4: kernels::sad4_scalar,
            variance16: kernels::variance16_scalar,
            variance8: kernels::variance8_scalar,
            variance4: kernels::variance4_scalar,
            mse16: kernels::mse16_scalar,
            mse8: kernels::mse8_scalar,
            mse4: kernels::mse4_scalar,
            ac_energy16: kernels::ac_energy16_scalar,
            ac_energy8: kernels::ac_energy8_scalar,
            ac_energy4: kernels::ac_energy4_scalar,
            bidir_mse16: kernels::bidir_mse16_scalar,
            bidir_mse8: kernels::bidir_mse8_scalar,
            bidir_mse4: kernels::bidir_mse4_scalar,
        }
    }

    /// The best table for this machine, selected once and cached.
    pub fn detect() -> &'static KernelSet {
        static TABLE: OnceLock<KernelSet> = OnceLock::new();
        TABLE.get_or_init(KernelSet::best)
    }

    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    fn best() -> KernelSet {
        use archmage::{SimdToken, X64V3Token};
        if X64V3Token::summon().is_some() {
            sse2::table()
        } else {
            KernelSet::scalar()
        }
    }

    #[cfg(not(all(feature = "simd", target_arch = "x86_64")))]
    fn best() -> KernelSet {
        KernelSet::scalar()
    }
}

/// Table-compatible wrappers over the SSE2 kernels.
///
/// Plain function pointers cannot carry a summoned token, so each wrapper
/// re-summons; archmage caches the feature probe, making this a load and a
/// branch. The scalar fallback arm is unreachable once `detect()` has
/// chosen this table but keeps the wrappers total.
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod sse2 {
    use super::super::{kernels, kernels_sse, BidirWeights};
    use super::KernelSet;
    use archmage::{SimdToken, X64V3Token};

    macro_rules! wrap_sad {
        ($name:ident, $simd:ident, $scalar:ident) => {
            fn $name(
                cur: &[u8],
                reference: &[u8],
                stride: usize,
                block_height: usize,
                early_exit: i32,
            ) -> i32 {
                match X64V3Token::summon() {
                    Some(token) => {
                        kernels_sse::$simd(token, cur, reference, stride, block_height, early_exit)
                    }
                    None => kernels::$scalar(cur, reference, stride, block_height, early_exit),
                }
            }
        };
    }

    macro_rules! wrap_variance {
        ($name:ident, $simd:ident, $scalar:ident) => {
            fn $name(buf: &[u8], stride: usize, block_height: usize) -> i32 {
                match X64V3Token::summon() {
                    Some(token) => kernels_sse::$simd(token, buf, stride, block_height),
                    None => kernels::$scalar(buf, stride, block_height),
                }
            }
        };
    }

    macro_rules! wrap_mse {
        ($name:ident, $simd:ident, $scalar:ident) => {
            fn $name(cur: &[u8], reference: &[u8], stride: usize, block_height: usize) -> i32 {
                match X64V3Token::summon() {
                    Some(token) => {
                        kernels_sse::$simd(token, cur, reference, stride, block_height)
                    }
                    None => kernels::$scalar(cur, reference, stride, block_height),
                }
            }
        };
    }

    macro_rules! wrap_bidir {
        ($name:ident, $simd:ident, $scalar:ident) => {
            fn $name(
                cur: &[u8],
                reference1: &[u8],
                reference2: &[u8],
                stride: usize,
                block_height: usize,
                weights: BidirWeights,
            ) -> i32 {
                match X64V3Token::summon() {
                    Some(token) => kernels_sse::$simd(
                        token,
                        cur,
                        reference1,
                        reference2,
                        stride,
                        block_height,
                        weights,
                    ),
                    None => kernels::$scalar(
                        cur,
                        reference1,
                        reference2,
                        stride,
                        block_height,
                        weights,
                    ),
                }
            }
        };
    }

    wrap_sad!(sad16, sad16_sse2, sad16_scalar);
    wrap_sad!(sad8, sad8_sse2, sad8_scalar);
    wrap_sad!(sad4, sad4_sse2, sad4_scalar);
    wrap_variance!(variance16, variance16_sse2, variance16_scalar);
    wrap_variance!(variance8, variance8_sse2, variance8_scalar);
    wrap_variance!(variance4, variance4_sse2, variance4_scalar);
    wrap_mse!(mse16, mse16_sse2, mse16_scalar);
    wrap_mse!(mse8, mse8_sse2, mse8_scalar);
    wrap_mse!(mse4, mse4_sse2, mse4_scalar);
    wrap_mse!(ac_energy16, ac_energy16_sse2, ac_energy16_scalar);
    wrap_mse!(ac_energy8, ac_energy8_sse2, ac_energy8_scalar);
    wrap_mse!(ac_energy4, ac_energy4_sse2, ac_energy4_scalar);
    wrap_bidir!(bidir_mse16, bidir_mse16_sse2, bidir_mse16_scalar);
    wrap_bidir!(bidir_mse8, bidir_mse8_sse2, bidir_mse8_scalar);
    wrap_bidir!(bidir_mse4, bidir_mse4_sse2, bidir_mse4_scalar);

    pub(super) fn table() -> KernelSet {
        KernelSet {
            sad16,
            sad8,
            sad4,
            variance16,
            variance8,
            variance4,
            mse16,
            mse8,
            mse4,
            ac_energy16,
            ac_energy8,
            ac_energy4,
            bidir_mse16,
            bidir_mse8,
            bidir_mse4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_is_stable() {
        let a = KernelSet::detect();
        let b = KernelSet::detect();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn scalar_table_is_callable_by_name() {
        let k = KernelSet::scalar();
        let buf = vec![9u8; 16 * 16];
        assert_eq!((k.sad16)(&buf, &buf, 16, 16, i32::MAX), 0);
        assert_eq!((k.variance16)(&buf, 16, 16), 0);
        assert_eq!((k.mse16)(&buf, &buf, 16, 16), 0);
    }
}
