//! Vectorized numeric kernels.
//!
//! This is the numeric library the executor dispatches into: per-dtype
//! reductions, elementwise arithmetic, comparisons producing `u8` masks,
//! filter-mask helpers and horizontal folds. All kernels operate on borrowed
//! contiguous slices; mask kernels write into caller-owned output buffers.
//!
//! NaN behavior per kernel: `sum`/`mean` propagate NaN, `min`/`max` skip it.
//!
//! With the `simd` feature (default) the f64 and i32 hot paths go through
//! `wide` 4-lane vectors with a scalar remainder loop; the other dtypes are
//! plain loops the compiler auto-vectorizes well enough.

use crate::performance::memory_pool::PooledBuffer;

#[cfg(feature = "simd")]
use wide::{f64x4, i32x4};

// ---------------------------------------------------------------------------
// Elementwise arithmetic, f64 (SIMD) and i32 (SIMD)
// ---------------------------------------------------------------------------

macro_rules! simd_binary_f64 {
    ($name:ident, $op:tt) => {
        #[cfg(feature = "simd")]
        pub fn $name(a: &[f64], b: &[f64]) -> Vec<f64> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            let mut out = Vec::with_capacity(a.len());
            let mut lhs = a.chunks_exact(4);
            let mut rhs = b.chunks_exact(4);
            for (ca, cb) in lhs.by_ref().zip(rhs.by_ref()) {
                let va = f64x4::from([ca[0], ca[1], ca[2], ca[3]]);
                let vb = f64x4::from([cb[0], cb[1], cb[2], cb[3]]);
                out.extend_from_slice(&(va $op vb).to_array());
            }
            for (x, y) in lhs.remainder().iter().zip(rhs.remainder()) {
                out.push(x $op y);
            }
            out
        }

        #[cfg(not(feature = "simd"))]
        pub fn $name(a: &[f64], b: &[f64]) -> Vec<f64> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            a.iter().zip(b).map(|(x, y)| x $op y).collect()
        }
    };
}

simd_binary_f64!(add_f64, +);
simd_binary_f64!(sub_f64, -);
simd_binary_f64!(mul_f64, *);
simd_binary_f64!(div_f64, /);

pub fn rem_f64(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
    a.iter().zip(b).map(|(x, y)| x % y).collect()
}

macro_rules! simd_binary_i32 {
    ($name:ident, $op:tt) => {
        #[cfg(feature = "simd")]
        pub fn $name(a: &[i32], b: &[i32]) -> Vec<i32> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            let mut out = Vec::with_capacity(a.len());
            let mut lhs = a.chunks_exact(4);
            let mut rhs = b.chunks_exact(4);
            for (ca, cb) in lhs.by_ref().zip(rhs.by_ref()) {
                let va = i32x4::from([ca[0], ca[1], ca[2], ca[3]]);
                let vb = i32x4::from([cb[0], cb[1], cb[2], cb[3]]);
                out.extend_from_slice(&(va $op vb).to_array());
            }
            for (x, y) in lhs.remainder().iter().zip(rhs.remainder()) {
                out.push(x $op y);
            }
            out
        }

        #[cfg(not(feature = "simd"))]
        pub fn $name(a: &[i32], b: &[i32]) -> Vec<i32> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            a.iter().zip(b).map(|(x, y)| x $op y).collect()
        }
    };
}

simd_binary_i32!(add_i32, +);
simd_binary_i32!(sub_i32, -);
simd_binary_i32!(mul_i32, *);

/// Integer division. The caller guarantees a zero-free divisor.
pub fn div_i32(a: &[i32], b: &[i32]) -> Vec<i32> {
    assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
    a.iter().zip(b).map(|(x, y)| x / y).collect()
}

pub fn rem_i32(a: &[i32], b: &[i32]) -> Vec<i32> {
    assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
    a.iter().zip(b).map(|(x, y)| x % y).collect()
}

// ---------------------------------------------------------------------------
// Elementwise arithmetic, remaining dtypes (scalar loops)
// ---------------------------------------------------------------------------

macro_rules! scalar_elementwise {
    ($t:ty, $add:ident, $sub:ident, $mul:ident, $div:ident, $rem:ident) => {
        pub fn $add(a: &[$t], b: &[$t]) -> Vec<$t> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            a.iter().zip(b).map(|(x, y)| x + y).collect()
        }

        pub fn $sub(a: &[$t], b: &[$t]) -> Vec<$t> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            a.iter().zip(b).map(|(x, y)| x - y).collect()
        }

        pub fn $mul(a: &[$t], b: &[$t]) -> Vec<$t> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            a.iter().zip(b).map(|(x, y)| x * y).collect()
        }

        pub fn $div(a: &[$t], b: &[$t]) -> Vec<$t> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            a.iter().zip(b).map(|(x, y)| x / y).collect()
        }

        pub fn $rem(a: &[$t], b: &[$t]) -> Vec<$t> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            a.iter().zip(b).map(|(x, y)| x % y).collect()
        }
    };
}

scalar_elementwise!(f32, add_f32, sub_f32, mul_f32, div_f32, rem_f32);
scalar_elementwise!(i64, add_i64, sub_i64, mul_i64, div_i64, rem_i64);
scalar_elementwise!(u64, add_u64, sub_u64, mul_u64, div_u64, rem_u64);
scalar_elementwise!(u32, add_u32, sub_u32, mul_u32, div_u32, rem_u32);

// ---------------------------------------------------------------------------
// Scalar broadcast arithmetic
// ---------------------------------------------------------------------------

#[cfg(feature = "simd")]
pub fn add_scalar_f64(a: &[f64], s: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(a.len());
    let vs = f64x4::from([s, s, s, s]);
    let mut chunks = a.chunks_exact(4);
    for c in chunks.by_ref() {
        let v = f64x4::from([c[0], c[1], c[2], c[3]]);
        out.extend_from_slice(&(v + vs).to_array());
    }
    for x in chunks.remainder() {
        out.push(x + s);
    }
    out
}

#[cfg(not(feature = "simd"))]
pub fn add_scalar_f64(a: &[f64], s: f64) -> Vec<f64> {
    a.iter().map(|x| x + s).collect()
}

#[cfg(feature = "simd")]
pub fn mul_scalar_f64(a: &[f64], s: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(a.len());
    let vs = f64x4::from([s, s, s, s]);
    let mut chunks = a.chunks_exact(4);
    for c in chunks.by_ref() {
        let v = f64x4::from([c[0], c[1], c[2], c[3]]);
        out.extend_from_slice(&(v * vs).to_array());
    }
    for x in chunks.remainder() {
        out.push(x * s);
    }
    out
}

#[cfg(not(feature = "simd"))]
pub fn mul_scalar_f64(a: &[f64], s: f64) -> Vec<f64> {
    a.iter().map(|x| x * s).collect()
}

macro_rules! scalar_broadcast {
    ($t:ty, $adds:ident, $muls:ident) => {
        pub fn $adds(a: &[$t], s: $t) -> Vec<$t> {
            a.iter().map(|x| x + s).collect()
        }

        pub fn $muls(a: &[$t], s: $t) -> Vec<$t> {
            a.iter().map(|x| x * s).collect()
        }
    };
}

scalar_broadcast!(f32, add_scalar_f32, mul_scalar_f32);
scalar_broadcast!(i64, add_scalar_i64, mul_scalar_i64);
scalar_broadcast!(i32, add_scalar_i32, mul_scalar_i32);
scalar_broadcast!(u64, add_scalar_u64, mul_scalar_u64);
scalar_broadcast!(u32, add_scalar_u32, mul_scalar_u32);

// ---------------------------------------------------------------------------
// Reductions
// ---------------------------------------------------------------------------

/// Sum of an f64 slice. NaN propagates.
#[cfg(feature = "simd")]
pub fn sum_f64(a: &[f64]) -> f64 {
    let mut acc = f64x4::ZERO;
    let mut chunks = a.chunks_exact(4);
    for c in chunks.by_ref() {
        acc += f64x4::from([c[0], c[1], c[2], c[3]]);
    }
    acc.reduce_add() + chunks.remainder().iter().sum::<f64>()
}

#[cfg(not(feature = "simd"))]
pub fn sum_f64(a: &[f64]) -> f64 {
    a.iter().sum()
}

#[cfg(feature = "simd")]
pub fn sum_i32(a: &[i32]) -> i32 {
    let mut acc = i32x4::ZERO;
    let mut chunks = a.chunks_exact(4);
    for c in chunks.by_ref() {
        acc += i32x4::from([c[0], c[1], c[2], c[3]]);
    }
    acc.reduce_add() + chunks.remainder().iter().sum::<i32>()
}

#[cfg(not(feature = "simd"))]
pub fn sum_i32(a: &[i32]) -> i32 {
    a.iter().sum()
}

pub fn sum_f32(a: &[f32]) -> f32 {
    a.iter().sum()
}

pub fn sum_i64(a: &[i64]) -> i64 {
    a.iter().sum()
}

pub fn sum_u64(a: &[u64]) -> u64 {
    a.iter().sum()
}

pub fn sum_u32(a: &[u32]) -> u32 {
    a.iter().sum()
}

/// Minimum of an f64 slice, skipping NaN. `None` when empty or all-NaN.
pub fn min_f64(a: &[f64]) -> Option<f64> {
    let mut best = None;
    for &v in a {
        if v.is_nan() {
            continue;
        }
        best = Some(match best {
            Some(b) if b <= v => b,
            _ => v,
        });
    }
    best
}

/// Maximum of an f64 slice, skipping NaN. `None` when empty or all-NaN.
pub fn max_f64(a: &[f64]) -> Option<f64> {
    let mut best = None;
    for &v in a {
        if v.is_nan() {
            continue;
        }
        best = Some(match best {
            Some(b) if b >= v => b,
            _ => v,
        });
    }
    best
}

pub fn min_f32(a: &[f32]) -> Option<f32> {
    a.iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            Some(b) if b <= v => Some(b),
            _ => Some(v),
        })
}

pub fn max_f32(a: &[f32]) -> Option<f32> {
    a.iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            Some(b) if b >= v => Some(b),
            _ => Some(v),
        })
}

macro_rules! int_min_max {
    ($t:ty, $min:ident, $max:ident) => {
        pub fn $min(a: &[$t]) -> Option<$t> {
            a.iter().copied().min()
        }

        pub fn $max(a: &[$t]) -> Option<$t> {
            a.iter().copied().max()
        }
    };
}

int_min_max!(i64, min_i64, max_i64);
int_min_max!(i32, min_i32, max_i32);
int_min_max!(u64, min_u64, max_u64);
int_min_max!(u32, min_u32, max_u32);

/// Mean of an f64 slice. NaN propagates; `None` when empty.
pub fn mean_f64(a: &[f64]) -> Option<f64> {
    if a.is_empty() {
        None
    } else {
        Some(sum_f64(a) / a.len() as f64)
    }
}

pub fn mean_f32(a: &[f32]) -> Option<f32> {
    if a.is_empty() {
        None
    } else {
        Some(sum_f32(a) / a.len() as f32)
    }
}

/// Two-pass sample variance (ddof = 1). `None` when fewer than two values.
pub fn variance_f64(a: &[f64]) -> Option<f64> {
    if a.len() < 2 {
        return None;
    }
    let mean = sum_f64(a) / a.len() as f64;
    let ss: f64 = a.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some(ss / (a.len() - 1) as f64)
}

pub fn stddev_f64(a: &[f64]) -> Option<f64> {
    variance_f64(a).map(f64::sqrt)
}

// ---------------------------------------------------------------------------
// Comparisons: u8 masks into caller-owned buffers
// ---------------------------------------------------------------------------

macro_rules! cmp_kernels {
    ($t:ty, $eq:ident, $neq:ident, $lt:ident, $lt_eq:ident, $gt:ident, $gt_eq:ident) => {
        cmp_kernels!(@one $t, $eq, ==);
        cmp_kernels!(@one $t, $neq, !=);
        cmp_kernels!(@one $t, $lt, <);
        cmp_kernels!(@one $t, $lt_eq, <=);
        cmp_kernels!(@one $t, $gt, >);
        cmp_kernels!(@one $t, $gt_eq, >=);
    };
    (@one $t:ty, $name:ident, $op:tt) => {
        pub fn $name(a: &[$t], b: &[$t], out: &mut [u8]) {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            assert_eq!(a.len(), out.len(), "mask buffer must match operand length");
            for i in 0..a.len() {
                out[i] = (a[i] $op b[i]) as u8;
            }
        }
    };
}

cmp_kernels!(f64, eq_f64, neq_f64, lt_f64, lt_eq_f64, gt_f64, gt_eq_f64);
cmp_kernels!(f32, eq_f32, neq_f32, lt_f32, lt_eq_f32, gt_f32, gt_eq_f32);
cmp_kernels!(i64, eq_i64, neq_i64, lt_i64, lt_eq_i64, gt_i64, gt_eq_i64);
cmp_kernels!(i32, eq_i32, neq_i32, lt_i32, lt_eq_i32, gt_i32, gt_eq_i32);
cmp_kernels!(u64, eq_u64, neq_u64, lt_u64, lt_eq_u64, gt_u64, gt_eq_u64);
cmp_kernels!(u32, eq_u32, neq_u32, lt_u32, lt_eq_u32, gt_u32, gt_eq_u32);

/// Conjunction of two masks: pairwise `min`.
pub fn mask_and(a: &[u8], b: &[u8], out: &mut [u8]) {
    assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
    assert_eq!(a.len(), out.len(), "mask buffer must match operand length");
    for i in 0..a.len() {
        out[i] = a[i].min(b[i]);
    }
}

/// Disjunction of two masks: pairwise `max`.
pub fn mask_or(a: &[u8], b: &[u8], out: &mut [u8]) {
    assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
    assert_eq!(a.len(), out.len(), "mask buffer must match operand length");
    for i in 0..a.len() {
        out[i] = a[i].max(b[i]);
    }
}

/// In-place conjunction, accumulating into `acc`.
pub fn mask_and_inplace(acc: &mut [u8], other: &[u8]) {
    assert_eq!(acc.len(), other.len(), "kernel operands must have equal length");
    for (a, &b) in acc.iter_mut().zip(other) {
        *a = (*a).min(b);
    }
}

/// In-place disjunction, accumulating into `acc`.
pub fn mask_or_inplace(acc: &mut [u8], other: &[u8]) {
    assert_eq!(acc.len(), other.len(), "kernel operands must have equal length");
    for (a, &b) in acc.iter_mut().zip(other) {
        *a = (*a).max(b);
    }
}

// ---------------------------------------------------------------------------
// Filter-mask helpers
// ---------------------------------------------------------------------------

pub fn filter_mask_gt_f64(values: &[f64], threshold: f64) -> Vec<u8> {
    values.iter().map(|&v| (v > threshold) as u8).collect()
}

/// Pre-allocated variant of [`filter_mask_gt_f64`].
pub fn filter_mask_gt_f64_into(values: &[f64], threshold: f64, out: &mut [u8]) {
    assert_eq!(values.len(), out.len(), "mask buffer must match input length");
    for (o, &v) in out.iter_mut().zip(values) {
        *o = (v > threshold) as u8;
    }
}

/// Pooled variant of [`filter_mask_gt_f64`]; the mask returns to the global
/// buffer pool when dropped.
pub fn filter_mask_gt_f64_pooled(values: &[f64], threshold: f64) -> PooledBuffer {
    let mut buf = PooledBuffer::new(values.len());
    filter_mask_gt_f64_into(values, threshold, buf.as_mut_slice());
    buf
}

// ---------------------------------------------------------------------------
// Horizontal folds across two or three columns (f64; NaN = null)
// ---------------------------------------------------------------------------

macro_rules! horizontal2 {
    ($name:ident, $f:expr) => {
        pub fn $name(a: &[f64], b: &[f64]) -> Vec<f64> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            let f = $f;
            a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
        }
    };
}

macro_rules! horizontal3 {
    ($name:ident, $f:expr) => {
        pub fn $name(a: &[f64], b: &[f64], c: &[f64]) -> Vec<f64> {
            assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
            assert_eq!(a.len(), c.len(), "kernel operands must have equal length");
            let f = $f;
            (0..a.len()).map(|i| f(f(a[i], b[i]), c[i])).collect()
        }
    };
}

horizontal2!(sum_horizontal2, |x: f64, y: f64| x + y);
horizontal3!(sum_horizontal3, |x: f64, y: f64| x + y);
horizontal2!(product_horizontal2, |x: f64, y: f64| x * y);
horizontal3!(product_horizontal3, |x: f64, y: f64| x * y);

fn nan_min(x: f64, y: f64) -> f64 {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => f64::NAN,
        (true, false) => y,
        (false, true) => x,
        (false, false) => x.min(y),
    }
}

fn nan_max(x: f64, y: f64) -> f64 {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => f64::NAN,
        (true, false) => y,
        (false, true) => x,
        (false, false) => x.max(y),
    }
}

horizontal2!(min_horizontal2, nan_min);
horizontal3!(min_horizontal3, nan_min);
horizontal2!(max_horizontal2, nan_max);
horizontal3!(max_horizontal3, nan_max);

/// Per-row disjunction of two `u8` masks.
pub fn any_horizontal2(a: &[u8], b: &[u8]) -> Vec<u8> {
    assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
    a.iter().zip(b).map(|(&x, &y)| x.max(y)).collect()
}

/// Per-row conjunction of two `u8` masks.
pub fn all_horizontal2(a: &[u8], b: &[u8]) -> Vec<u8> {
    assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
    a.iter().zip(b).map(|(&x, &y)| x.min(y)).collect()
}

/// Per-row count of non-null (non-NaN) values across two columns.
pub fn count_non_null_horizontal2(a: &[f64], b: &[f64]) -> Vec<u32> {
    assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
    a.iter()
        .zip(b)
        .map(|(&x, &y)| !x.is_nan() as u32 + !y.is_nan() as u32)
        .collect()
}

/// Per-row count of non-null (non-NaN) values across three columns.
pub fn count_non_null_horizontal3(a: &[f64], b: &[f64], c: &[f64]) -> Vec<u32> {
    assert_eq!(a.len(), b.len(), "kernel operands must have equal length");
    assert_eq!(a.len(), c.len(), "kernel operands must have equal length");
    (0..a.len())
        .map(|i| !a[i].is_nan() as u32 + !b[i].is_nan() as u32 + !c[i].is_nan() as u32)
        .collect()
}

// ---------------------------------------------------------------------------
// CPU feature probes
// ---------------------------------------------------------------------------

/// Check if the build targets AVX instructions.
#[cfg(target_arch = "x86_64")]
pub fn has_avx_support() -> bool {
    #[cfg(target_feature = "avx")]
    {
        true
    }
    #[cfg(not(target_feature = "avx"))]
    {
        false
    }
}

/// Check if the build targets AVX2 instructions.
#[cfg(target_arch = "x86_64")]
pub fn has_avx2_support() -> bool {
    #[cfg(target_feature = "avx2")]
    {
        true
    }
    #[cfg(not(target_feature = "avx2"))]
    {
        false
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub fn has_avx_support() -> bool {
    false
}

#[cfg(not(target_arch = "x86_64"))]
pub fn has_avx2_support() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_f64() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [1.0, 1.0, 1.0, 1.0, 1.0];
        assert_eq!(add_f64(&a, &b), vec![2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_sum_f64_propagates_nan() {
        assert_eq!(sum_f64(&[1.0, 2.0, 3.0, 4.0, 5.0]), 15.0);
        assert!(sum_f64(&[1.0, f64::NAN, 3.0]).is_nan());
    }

    #[test]
    fn test_min_max_f64_skip_nan() {
        let a = [3.0, f64::NAN, 1.0, 2.0];
        assert_eq!(min_f64(&a), Some(1.0));
        assert_eq!(max_f64(&a), Some(3.0));
        assert_eq!(min_f64(&[f64::NAN]), None);
    }

    #[test]
    fn test_gt_mask() {
        let a = [1.0, 5.0, 3.0];
        let b = [2.0, 2.0, 3.0];
        let mut out = [0u8; 3];
        gt_f64(&a, &b, &mut out);
        assert_eq!(out, [0, 1, 0]);
    }

    #[test]
    fn test_mask_and_or() {
        let a = [1u8, 0, 1, 0];
        let b = [1u8, 1, 0, 0];
        let mut out = [0u8; 4];
        mask_and(&a, &b, &mut out);
        assert_eq!(out, [1, 0, 0, 0]);
        mask_or(&a, &b, &mut out);
        assert_eq!(out, [1, 1, 1, 0]);
    }

    #[test]
    fn test_variance_needs_two_values() {
        assert_eq!(variance_f64(&[1.0]), None);
        assert_eq!(variance_f64(&[1.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_filter_mask_pooled_roundtrip() {
        let values = [1.0, 4.0, 2.0, 9.0];
        let mask = filter_mask_gt_f64_pooled(&values, 3.0);
        assert_eq!(mask.as_slice(), &[0, 1, 0, 1]);
        mask.release();
    }

    #[test]
    fn test_horizontal_folds() {
        let a = [1.0, f64::NAN];
        let b = [2.0, 5.0];
        assert_eq!(sum_horizontal2(&a, &b)[0], 3.0);
        assert_eq!(min_horizontal2(&a, &b)[1], 5.0);
        assert_eq!(count_non_null_horizontal2(&a, &b), vec![2, 1]);
    }

    #[test]
    fn test_add_i32_simd_path() {
        let a: Vec<i32> = (0..9).collect();
        let b = vec![1i32; 9];
        assert_eq!(add_i32(&a, &b), (1..10).collect::<Vec<i32>>());
    }
}
