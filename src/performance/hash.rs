//! Hashing, gather and radix-sort primitives used by the join and group-by
//! engines and the sort executor.

use fxhash::FxHasher;
use std::hash::{Hash, Hasher};

/// Fixed mixing function for combining composite-key field hashes.
#[inline(always)]
pub fn hash_combine(a: u64, b: u64) -> u64 {
    // splitmix-style finalizer folded into the accumulator.
    let mut h = a ^ b.wrapping_add(0x9e3779b97f4a7c15).wrapping_add(a << 6).wrapping_add(a >> 2);
    h ^= h >> 30;
    h = h.wrapping_mul(0xbf58476d1ce4e5b9);
    h ^= h >> 27;
    h
}

#[inline(always)]
pub fn hash_u64(v: u64) -> u64 {
    let mut hasher = FxHasher::default();
    v.hash(&mut hasher);
    hasher.finish()
}

#[inline(always)]
pub fn hash_str(s: &str) -> u64 {
    let mut hasher = FxHasher::default();
    s.hash(&mut hasher);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// Order-preserving bit keys for the radix-assisted sort
// ---------------------------------------------------------------------------

/// Maps an f64 to a u64 whose unsigned order matches the float's total
/// order. NaN maps above every finite value, so it sorts last ascending.
#[inline(always)]
pub fn f64_to_ordered_bits(v: f64) -> u64 {
    if v.is_nan() {
        return u64::MAX;
    }
    let bits = v.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1u64 << 63)
    }
}

#[inline(always)]
pub fn f32_to_ordered_bits(v: f32) -> u64 {
    if v.is_nan() {
        return u64::MAX;
    }
    let bits = v.to_bits();
    let mapped = if bits >> 31 == 1 {
        !bits
    } else {
        bits | (1u32 << 31)
    };
    mapped as u64
}

#[inline(always)]
pub fn i64_to_ordered_bits(v: i64) -> u64 {
    (v as u64) ^ (1u64 << 63)
}

#[inline(always)]
pub fn i32_to_ordered_bits(v: i32) -> u64 {
    i64_to_ordered_bits(v as i64)
}

#[inline(always)]
pub fn u64_to_ordered_bits(v: u64) -> u64 {
    v
}

#[inline(always)]
pub fn u32_to_ordered_bits(v: u32) -> u64 {
    v as u64
}

#[inline(always)]
pub fn bool_to_ordered_bits(v: bool) -> u64 {
    v as u64
}

// ---------------------------------------------------------------------------
// Gather
// ---------------------------------------------------------------------------

/// Gathers `values[i]` for every index in `indices`. Indices must be in
/// bounds; callers produce them from row permutations they validated.
pub fn gather<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

pub fn gather_f64(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| values[i]).collect()
}

pub fn gather_i64(values: &[i64], indices: &[usize]) -> Vec<i64> {
    indices.iter().map(|&i| values[i]).collect()
}

// ---------------------------------------------------------------------------
// Radix sort
// ---------------------------------------------------------------------------

/// Stably reorders `perm` by the u64 key of each element, using an LSB
/// radix sort (8 passes of 8 bits). `keys` is indexed by the values stored
/// in `perm`.
pub fn radix_sort_perm(perm: &mut Vec<u32>, keys: &[u64]) {
    if perm.len() <= 1 {
        return;
    }
    let mut src: Vec<u32> = std::mem::take(perm);
    let mut dst: Vec<u32> = vec![0; src.len()];
    let mut counts = [0usize; 256];

    for pass in 0..8 {
        let shift = pass * 8;
        // Skip passes where every key shares the same byte.
        let first_byte = (keys[src[0] as usize] >> shift) & 0xff;
        if src
            .iter()
            .all(|&i| (keys[i as usize] >> shift) & 0xff == first_byte)
        {
            continue;
        }

        counts.fill(0);
        for &i in &src {
            counts[((keys[i as usize] >> shift) & 0xff) as usize] += 1;
        }
        let mut offset = 0usize;
        let mut offsets = [0usize; 256];
        for b in 0..256 {
            offsets[b] = offset;
            offset += counts[b];
        }
        for &i in &src {
            let byte = ((keys[i as usize] >> shift) & 0xff) as usize;
            dst[offsets[byte]] = i;
            offsets[byte] += 1;
        }
        std::mem::swap(&mut src, &mut dst);
    }

    *perm = src;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_bits_preserve_f64_order() {
        let vals = [-3.5, -0.0, 0.0, 1.25, f64::INFINITY, f64::NEG_INFINITY];
        for &a in &vals {
            for &b in &vals {
                if a < b {
                    assert!(f64_to_ordered_bits(a) < f64_to_ordered_bits(b), "{} {}", a, b);
                }
            }
        }
        // NaN sorts after everything.
        assert!(f64_to_ordered_bits(f64::NAN) > f64_to_ordered_bits(f64::INFINITY));
    }

    #[test]
    fn test_ordered_bits_preserve_i64_order() {
        assert!(i64_to_ordered_bits(-5) < i64_to_ordered_bits(0));
        assert!(i64_to_ordered_bits(0) < i64_to_ordered_bits(7));
        assert!(i64_to_ordered_bits(i64::MIN) < i64_to_ordered_bits(i64::MAX));
    }

    #[test]
    fn test_radix_sort_perm_is_stable() {
        let keys = vec![3u64, 1, 3, 2, 1];
        let mut perm: Vec<u32> = (0..5).collect();
        radix_sort_perm(&mut perm, &keys);
        // Equal keys keep their original relative order.
        assert_eq!(perm, vec![1, 4, 3, 0, 2]);
    }

    #[test]
    fn test_radix_sort_wide_keys() {
        let keys: Vec<u64> = (0..100).rev().map(|i| (i as u64) << 40).collect();
        let mut perm: Vec<u32> = (0..100).collect();
        radix_sort_perm(&mut perm, &keys);
        assert_eq!(perm, (0..100).rev().collect::<Vec<u32>>());
    }

    #[test]
    fn test_hash_combine_mixes_fields() {
        let h1 = hash_combine(hash_u64(1), hash_u64(2));
        let h2 = hash_combine(hash_u64(2), hash_u64(1));
        assert_ne!(h1, h2);
    }
}
