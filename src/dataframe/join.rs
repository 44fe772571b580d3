//! Hash join engine.
//!
//! The smaller side becomes the build side (forced for Left/Right joins so
//! that output order follows the preserved side), its composite keys go
//! into an open-addressed probe table with 7-bit metadata tags and linear
//! probing, and the larger side probes it row by row. A key containing a
//! float NaN is treated as null and never matches.

use crate::dataframe::DataFrame;
use crate::performance::hash::{hash_combine, hash_str, hash_u64};
use crate::performance::parallel::CancelToken;
use crate::series::Series;
use crate::types::{DType, Scalar};
use crate::GalleonError;

/// Defines the kind of join to perform between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Rows with matching keys on both sides.
    Inner,
    /// Every left row, null-filling right columns without a match.
    Left,
    /// Every right row, null-filling left columns without a match.
    Right,
    /// Inner rows, then unmatched left rows, then unmatched right rows.
    Outer,
}

/// Join behavior knobs.
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    /// Emit a `{column}_valid` boolean companion per null-fillable non-key
    /// column (floats excluded; NaN already marks their nulls).
    pub emit_validity: bool,
}

// ---------------------------------------------------------------------------
// Open-addressed probe table
// ---------------------------------------------------------------------------

/// Open-addressed hash table: a metadata byte per slot (0 = empty, else
/// `0x80 | top-7-bits-of-hash`) and linear probing. Each occupied slot
/// points at a bucket holding the full hash and the duplicate row list.
struct ProbeTable {
    meta: Vec<u8>,
    slots: Vec<u32>,
    mask: usize,
    buckets: Vec<(u64, Vec<u32>)>,
}

impl ProbeTable {
    fn with_capacity(expected: usize) -> Self {
        let cap = (expected.max(1) * 2).next_power_of_two().max(16);
        ProbeTable {
            meta: vec![0; cap],
            slots: vec![0; cap],
            mask: cap - 1,
            buckets: Vec::with_capacity(expected),
        }
    }

    #[inline(always)]
    fn tag(hash: u64) -> u8 {
        0x80 | ((hash >> 57) as u8 & 0x7f)
    }

    fn insert(&mut self, hash: u64, row: u32, mut eq: impl FnMut(u32) -> bool) {
        let tag = Self::tag(hash);
        let mut slot = (hash as usize) & self.mask;
        loop {
            let m = self.meta[slot];
            if m == 0 {
                self.meta[slot] = tag;
                self.slots[slot] = self.buckets.len() as u32;
                self.buckets.push((hash, vec![row]));
                return;
            }
            if m == tag {
                let b = self.slots[slot] as usize;
                if self.buckets[b].0 == hash && eq(self.buckets[b].1[0]) {
                    self.buckets[b].1.push(row);
                    return;
                }
            }
            slot = (slot + 1) & self.mask;
        }
    }

    fn get(&self, hash: u64, mut eq: impl FnMut(u32) -> bool) -> Option<&[u32]> {
        let tag = Self::tag(hash);
        let mut slot = (hash as usize) & self.mask;
        loop {
            let m = self.meta[slot];
            if m == 0 {
                return None;
            }
            if m == tag {
                let b = self.slots[slot] as usize;
                if self.buckets[b].0 == hash && eq(self.buckets[b].1[0]) {
                    return Some(&self.buckets[b].1);
                }
            }
            slot = (slot + 1) & self.mask;
        }
    }
}

// ---------------------------------------------------------------------------
// Composite keys
// ---------------------------------------------------------------------------

/// Hash of the composite key at `row`, or `None` when any float component
/// is NaN (null keys never join).
fn row_hash(key_columns: &[Series], row: usize) -> Option<u64> {
    let mut h = 0xcbf29ce484222325u64;
    for col in key_columns {
        let field = match col {
            Series::F64(_, v) => {
                if v[row].is_nan() {
                    return None;
                }
                hash_u64(v[row].to_bits())
            }
            Series::F32(_, v) => {
                if v[row].is_nan() {
                    return None;
                }
                hash_u64(v[row].to_bits() as u64)
            }
            Series::I64(_, v) | Series::DateTime(_, v) | Series::Duration(_, v) => {
                hash_u64(v[row] as u64)
            }
            Series::I32(_, v) => hash_u64(v[row] as i64 as u64),
            Series::U64(_, v) => hash_u64(v[row]),
            Series::U32(_, v) => hash_u64(v[row] as u64),
            Series::Bool(_, v) => hash_u64(v[row] as u64),
            Series::Str(_, v) => hash_str(&v[row]),
            Series::Categorical(_, dict, codes) => hash_str(&dict[codes[row] as usize]),
        };
        h = hash_combine(h, field);
    }
    Some(h)
}

fn rows_equal(a: &[Series], a_row: usize, b: &[Series], b_row: usize) -> bool {
    a.iter()
        .zip(b)
        .all(|(ca, cb)| ca.get(a_row) == cb.get(b_row))
}

// ---------------------------------------------------------------------------
// Output materialization
// ---------------------------------------------------------------------------

/// Gathers `series[row]` for every `Some(row)`, null-filling the `None`
/// slots (NaN / zero / false / empty string). Also reports per-row validity
/// for the companion-mask option.
fn gather_optional(series: &Series, rows: &[Option<usize>]) -> (Series, Vec<bool>) {
    let validity: Vec<bool> = rows.iter().map(|r| r.is_some()).collect();
    macro_rules! gather {
        ($ctor:ident, $vals:expr, $fill:expr) => {
            Series::$ctor(
                series.name(),
                rows.iter()
                    .map(|r| r.map(|i| $vals[i].clone()).unwrap_or($fill))
                    .collect(),
            )
        };
    }
    let out = match series {
        Series::F64(_, v) => gather!(new_f64, v, f64::NAN),
        Series::F32(_, v) => gather!(new_f32, v, f32::NAN),
        Series::I64(_, v) => gather!(new_i64, v, 0),
        Series::I32(_, v) => gather!(new_i32, v, 0),
        Series::U64(_, v) => gather!(new_u64, v, 0),
        Series::U32(_, v) => gather!(new_u32, v, 0),
        Series::Bool(_, v) => gather!(new_bool, v, false),
        Series::Str(_, v) => gather!(new_string, v, String::new()),
        Series::DateTime(_, v) => gather!(new_datetime, v, 0),
        Series::Duration(_, v) => gather!(new_duration, v, 0),
        Series::Categorical(name, dict, codes) => {
            // The null fill is the empty string; make sure it has a code.
            let mut dict = dict.clone();
            let empty_code = match dict.iter().position(|s| s.is_empty()) {
                Some(i) => i as u32,
                None => {
                    dict.push(String::new());
                    (dict.len() - 1) as u32
                }
            };
            let gathered = rows
                .iter()
                .map(|r| r.map(|i| codes[i]).unwrap_or(empty_code))
                .collect();
            Series::Categorical(name.clone(), dict, gathered)
        }
    };
    (out, validity)
}

/// Whether the join can null-fill columns of the given side.
fn side_can_null(how: JoinType, left_side: bool) -> bool {
    match how {
        JoinType::Inner => false,
        JoinType::Left => !left_side,
        JoinType::Right => left_side,
        JoinType::Outer => true,
    }
}

// ---------------------------------------------------------------------------
// Join driver
// ---------------------------------------------------------------------------

impl DataFrame {
    /// Equi-joins this frame (left) with `other` (right) on the named key
    /// columns.
    pub fn join(
        &self,
        other: &DataFrame,
        on: &[&str],
        how: JoinType,
    ) -> Result<DataFrame, GalleonError> {
        self.join_with_options(other, on, how, &JoinOptions::default(), &CancelToken::new())
    }

    /// [`DataFrame::join`] with explicit options and a cancellation token.
    pub fn join_with_options(
        &self,
        other: &DataFrame,
        on: &[&str],
        how: JoinType,
        options: &JoinOptions,
        token: &CancelToken,
    ) -> Result<DataFrame, GalleonError> {
        if on.is_empty() {
            return Err(GalleonError::ColumnNotFound(
                "join requires at least one key column".to_string(),
            ));
        }

        // Normalize keys: categorical sides rematerialize to strings so both
        // sides share an encoding regardless of dictionary layout.
        let mut left_keys = Vec::with_capacity(on.len());
        let mut right_keys = Vec::with_capacity(on.len());
        for key in on {
            let l = self.column_by_name(key)?;
            let r = other.column_by_name(key)?;
            let l = if l.dtype() == DType::Categorical { l.as_string()? } else { l.clone() };
            let r = if r.dtype() == DType::Categorical { r.as_string()? } else { r.clone() };
            if l.dtype() != r.dtype() {
                return Err(GalleonError::DTypeMismatch(format!(
                    "join key '{}' is {} on the left but {} on the right",
                    key,
                    l.dtype(),
                    r.dtype()
                )));
            }
            left_keys.push(l);
            right_keys.push(r);
        }

        // Duplicate non-key columns across sides are rejected outright.
        for name in other.column_names() {
            if !on.contains(&name) && self.column_names().contains(&name) {
                return Err(GalleonError::DuplicateColumn(format!(
                    "column '{}' exists on both sides of the join",
                    name
                )));
            }
        }

        // Build side: forced for Left/Right so the preserved side probes;
        // otherwise the smaller side (ties go to the right).
        let build_is_left = match how {
            JoinType::Left => false,
            JoinType::Right => true,
            JoinType::Inner | JoinType::Outer => other.height() > self.height(),
        };
        let (build_keys, probe_keys, build_height, probe_height) = if build_is_left {
            (&left_keys, &right_keys, self.height(), other.height())
        } else {
            (&right_keys, &left_keys, other.height(), self.height())
        };

        let mut table = ProbeTable::with_capacity(build_height);
        for row in 0..build_height {
            if row % 65_536 == 0 {
                token.check()?;
            }
            if let Some(hash) = row_hash(build_keys, row) {
                table.insert(hash, row as u32, |existing| {
                    rows_equal(build_keys, existing as usize, build_keys, row)
                });
            }
        }

        // Probe. Pairs are (left_row, right_row) with `None` marking the
        // null-filled side.
        let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::with_capacity(probe_height);
        let mut build_matched = vec![false; build_height];
        let mut probe_unmatched: Vec<usize> = Vec::new();
        for prow in 0..probe_height {
            if prow % 65_536 == 0 {
                token.check()?;
            }
            let matches = row_hash(probe_keys, prow).and_then(|hash| {
                table.get(hash, |brow| {
                    rows_equal(build_keys, brow as usize, probe_keys, prow)
                })
            });
            match matches {
                Some(brows) => {
                    for &brow in brows {
                        build_matched[brow as usize] = true;
                        pairs.push(if build_is_left {
                            (Some(brow as usize), Some(prow))
                        } else {
                            (Some(prow), Some(brow as usize))
                        });
                    }
                }
                None => match how {
                    JoinType::Inner => {}
                    JoinType::Left => pairs.push((Some(prow), None)),
                    JoinType::Right => pairs.push((None, Some(prow))),
                    JoinType::Outer => probe_unmatched.push(prow),
                },
            }
        }

        if how == JoinType::Outer {
            // Inner rows first, then unmatched left, then unmatched right.
            let build_unmatched: Vec<usize> = build_matched
                .iter()
                .enumerate()
                .filter_map(|(i, &m)| (!m).then_some(i))
                .collect();
            let (left_unmatched, right_unmatched) = if build_is_left {
                (&build_unmatched, &probe_unmatched)
            } else {
                (&probe_unmatched, &build_unmatched)
            };
            pairs.extend(left_unmatched.iter().map(|&l| (Some(l), None)));
            pairs.extend(right_unmatched.iter().map(|&r| (None, Some(r))));
        }

        self.materialize_join(other, on, how, options, &left_keys, &pairs)
    }

    fn materialize_join(
        &self,
        other: &DataFrame,
        on: &[&str],
        how: JoinType,
        options: &JoinOptions,
        left_keys: &[Series],
        pairs: &[(Option<usize>, Option<usize>)],
    ) -> Result<DataFrame, GalleonError> {
        let left_rows: Vec<Option<usize>> = pairs.iter().map(|&(l, _)| l).collect();
        let right_rows: Vec<Option<usize>> = pairs.iter().map(|&(_, r)| r).collect();
        let mut columns: Vec<Series> = Vec::new();

        for column in self.columns() {
            let name = column.name();
            if let Some(key_idx) = on.iter().position(|k| *k == name) {
                // Key output: value from whichever side is present. The
                // normalized (string-encoded for categorical) buffers back
                // both sides, so dtypes agree.
                let left_key = &left_keys[key_idx];
                let right_key_col = other.column_by_name(name)?;
                let right_key = if right_key_col.dtype() == DType::Categorical {
                    right_key_col.as_string()?
                } else {
                    right_key_col.clone()
                };
                let scalars: Vec<Scalar> = pairs
                    .iter()
                    .map(|&(l, r)| match (l, r) {
                        (Some(i), _) => left_key.get(i).unwrap_or(Scalar::Null),
                        (None, Some(j)) => right_key.get(j).unwrap_or(Scalar::Null),
                        (None, None) => Scalar::Null,
                    })
                    .collect();
                columns.push(Series::from_scalars(name, left_key.dtype(), scalars)?);
            } else {
                let (series, validity) = gather_optional(column, &left_rows);
                let emit_mask = options.emit_validity
                    && side_can_null(how, true)
                    && !column.dtype().is_float();
                columns.push(series);
                if emit_mask {
                    columns.push(Series::new_bool(&format!("{}_valid", name), validity));
                }
            }
        }

        for column in other.columns() {
            if on.contains(&column.name()) {
                continue;
            }
            let (series, validity) = gather_optional(column, &right_rows);
            let emit_mask = options.emit_validity
                && side_can_null(how, false)
                && !column.dtype().is_float();
            let name = column.name().to_string();
            columns.push(series);
            if emit_mask {
                columns.push(Series::new_bool(&format!("{}_valid", name), validity));
            }
        }

        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn left() -> DataFrame {
        DataFrame::new(vec![
            Series::new_i64("k", vec![1, 2, 3]),
            Series::new_i64("a", vec![10, 20, 30]),
        ])
        .unwrap()
    }

    fn right() -> DataFrame {
        DataFrame::new(vec![
            Series::new_i64("k", vec![2, 3, 4]),
            Series::new_f64("b", vec![200.0, 300.0, 400.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_inner_join() {
        let out = left().join(&right(), &["k"], JoinType::Inner).unwrap();
        assert_eq!(out.column_by_name("k").unwrap().i64().unwrap(), &[2, 3]);
        assert_eq!(out.column_by_name("a").unwrap().i64().unwrap(), &[20, 30]);
        assert_eq!(out.column_by_name("b").unwrap().f64().unwrap(), &[200.0, 300.0]);
    }

    #[test]
    fn test_left_join_null_fill() {
        let out = left().join(&right(), &["k"], JoinType::Left).unwrap();
        assert_eq!(out.column_by_name("k").unwrap().i64().unwrap(), &[1, 2, 3]);
        let b = out.column_by_name("b").unwrap().f64().unwrap();
        assert!(b[0].is_nan());
        assert_eq!(&b[1..], &[200.0, 300.0]);
    }

    #[test]
    fn test_right_join_follows_right_order() {
        let out = left().join(&right(), &["k"], JoinType::Right).unwrap();
        assert_eq!(out.column_by_name("k").unwrap().i64().unwrap(), &[2, 3, 4]);
        // Unmatched left int column is sentinel-filled with zero.
        assert_eq!(out.column_by_name("a").unwrap().i64().unwrap(), &[20, 30, 0]);
    }

    #[test]
    fn test_outer_join_ordering_and_cardinality() {
        let out = left().join(&right(), &["k"], JoinType::Outer).unwrap();
        assert_eq!(out.height(), 4);
        // Inner rows first, then unmatched left (k=1), then unmatched right
        // (k=4).
        assert_eq!(out.column_by_name("k").unwrap().i64().unwrap(), &[2, 3, 1, 4]);
    }

    #[test]
    fn test_duplicate_build_rows_cross_product() {
        let l = DataFrame::new(vec![Series::new_i64("k", vec![1, 1])]).unwrap();
        let r = DataFrame::new(vec![
            Series::new_i64("k", vec![1, 1, 1]),
            Series::new_i64("v", vec![7, 8, 9]),
        ])
        .unwrap();
        let out = l.join(&r, &["k"], JoinType::Inner).unwrap();
        assert_eq!(out.height(), 6);
    }

    #[test]
    fn test_validity_masks() {
        let out = left()
            .join_with_options(
                &right(),
                &["k"],
                JoinType::Right,
                &JoinOptions {
                    emit_validity: true,
                },
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(
            out.column_by_name("a_valid").unwrap().bool().unwrap(),
            &[true, true, false]
        );
    }

    #[test]
    fn test_nan_keys_never_match() {
        let l = DataFrame::new(vec![Series::new_f64("k", vec![1.0, f64::NAN])]).unwrap();
        let r = DataFrame::new(vec![
            Series::new_f64("k", vec![1.0, f64::NAN]),
            Series::new_i64("v", vec![5, 6]),
        ])
        .unwrap();
        let out = l.join(&r, &["k"], JoinType::Inner).unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(out.column_by_name("v").unwrap().i64().unwrap(), &[5]);
    }

    #[test]
    fn test_categorical_keys_normalize() {
        let l = DataFrame::new(vec![
            Series::new_string(
                "k",
                vec!["x".to_string(), "y".to_string()],
            )
            .as_categorical()
            .unwrap(),
            Series::new_i64("a", vec![1, 2]),
        ])
        .unwrap();
        let r = DataFrame::new(vec![
            Series::new_string("k", vec!["y".to_string(), "z".to_string()]),
            Series::new_i64("b", vec![20, 30]),
        ])
        .unwrap();
        let out = l.join(&r, &["k"], JoinType::Inner).unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(out.column_by_name("k").unwrap().str().unwrap(), &["y".to_string()]);
        assert_eq!(out.column_by_name("b").unwrap().i64().unwrap(), &[20]);
    }

    #[test]
    fn test_duplicate_payload_column_rejected() {
        let l = DataFrame::new(vec![
            Series::new_i64("k", vec![1]),
            Series::new_i64("v", vec![1]),
        ])
        .unwrap();
        let r = DataFrame::new(vec![
            Series::new_i64("k", vec![1]),
            Series::new_i64("v", vec![2]),
        ])
        .unwrap();
        assert!(matches!(
            l.join(&r, &["k"], JoinType::Inner).unwrap_err(),
            GalleonError::DuplicateColumn(_)
        ));
    }
}
