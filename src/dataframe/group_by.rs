//! Hash group-by engine.
//!
//! Rows are mapped to groups through a composite key built from the key
//! columns; group ids are assigned in first-occurrence order, which fixes
//! the order of the result rows. Each group keeps its member row indices,
//! and dtype-specialized reducers run per group over those indices.
//!
//! Above one morsel of rows the engine partitions the input across the
//! worker pool; per-worker maps are merged back in row order so the
//! first-occurrence guarantee survives parallelism.

use crate::dataframe::DataFrame;
use crate::expressions::AggKind;
use crate::performance::parallel::{CancelToken, ParallelConfig, WorkerPool};
use crate::series::Series;
use crate::types::Scalar;
use crate::GalleonError;
use fxhash::FxHashMap;
use rayon::prelude::*;

/// Group assignment: one entry per group, in first-occurrence order.
#[derive(Debug)]
pub struct Groups {
    /// Row of the first occurrence of each group's key.
    pub first_rows: Vec<usize>,
    /// Member rows per group, ascending.
    pub rows: Vec<Vec<usize>>,
}

impl Groups {
    pub fn len(&self) -> usize {
        self.first_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_rows.is_empty()
    }
}

fn key_columns<'a>(df: &'a DataFrame, keys: &[String]) -> Result<Vec<&'a Series>, GalleonError> {
    keys.iter()
        .map(|k| df.column_by_name(k))
        .collect::<Result<Vec<_>, _>>()
}

/// Composite key of `row` across the key columns. Float NaN reads back as
/// `Scalar::Null`, so NaN keys form one group.
fn composite_key(columns: &[&Series], row: usize) -> Vec<Scalar> {
    columns
        .iter()
        .map(|s| s.get(row).unwrap_or(Scalar::Null))
        .collect()
}

fn group_range(
    columns: &[&Series],
    range: std::ops::Range<usize>,
) -> Vec<(Vec<Scalar>, Vec<usize>)> {
    let mut lookup: FxHashMap<Vec<Scalar>, usize> = FxHashMap::default();
    let mut groups: Vec<(Vec<Scalar>, Vec<usize>)> = Vec::new();
    for row in range {
        let key = composite_key(columns, row);
        match lookup.get(&key) {
            Some(&gid) => groups[gid].1.push(row),
            None => {
                lookup.insert(key.clone(), groups.len());
                groups.push((key, vec![row]));
            }
        }
    }
    groups
}

/// Assigns every row of `df` to a group keyed by `keys`.
pub fn group_rows(
    df: &DataFrame,
    keys: &[String],
    config: &ParallelConfig,
    token: &CancelToken,
) -> Result<Groups, GalleonError> {
    let columns = key_columns(df, keys)?;
    if columns.is_empty() {
        return Err(GalleonError::ColumnNotFound(
            "group-by requires at least one key column".to_string(),
        ));
    }
    let height = df.height();

    // Partitioned path: per-morsel maps merged back in row order.
    let shards = if height > config.morsel_size {
        WorkerPool::scatter(config, height, token, |range| {
            Ok(group_range(&columns, range))
        })?
    } else {
        token.check()?;
        vec![(0, group_range(&columns, 0..height))]
    };

    let mut lookup: FxHashMap<Vec<Scalar>, usize> = FxHashMap::default();
    let mut first_rows = Vec::new();
    let mut rows: Vec<Vec<usize>> = Vec::new();
    for (_, shard) in shards {
        for (key, shard_rows) in shard {
            match lookup.get(&key) {
                Some(&gid) => rows[gid].extend(shard_rows),
                None => {
                    lookup.insert(key, rows.len());
                    first_rows.push(shard_rows[0]);
                    rows.push(shard_rows);
                }
            }
        }
    }
    Ok(Groups { first_rows, rows })
}

/// One aggregation to drive over the groups: pre-evaluated input values,
/// the aggregation kind, and the output column name.
pub struct AggSpec {
    pub values: Series,
    /// Second input column, for `corr`.
    pub other: Option<Series>,
    pub kind: AggKind,
    pub name: String,
}

pub(crate) fn reduce(
    kind: &AggKind,
    values: &Series,
    other: Option<&Series>,
) -> Result<Scalar, GalleonError> {
    match kind {
        AggKind::Sum => values.sum(),
        AggKind::Mean => values.mean(),
        AggKind::Min => values.min(),
        AggKind::Max => values.max(),
        AggKind::Count => Ok(values.count()),
        AggKind::Median => values.median(),
        AggKind::Quantile(q) => values.quantile(*q),
        AggKind::Skew => values.skew(),
        AggKind::Kurt => values.kurt(),
        AggKind::Var => values.var(),
        AggKind::Std => values.std(),
        AggKind::Corr(_) => {
            let other = other.ok_or_else(|| {
                GalleonError::DomainError("corr aggregation is missing its second input".to_string())
            })?;
            values.corr(other)
        }
    }
}

/// Runs every aggregation over every group, producing one output column per
/// spec with one row per group.
pub fn aggregate_groups(groups: &Groups, specs: &[AggSpec]) -> Result<Vec<Series>, GalleonError> {
    specs
        .iter()
        .map(|spec| {
            let dtype = spec.kind.output_dtype(spec.values.dtype())?;
            let scalars: Vec<Scalar> = groups
                .rows
                .par_iter()
                .map(|rows| {
                    let values = spec.values.take(rows)?;
                    let other = match &spec.other {
                        Some(o) => Some(o.take(rows)?),
                        None => None,
                    };
                    reduce(&spec.kind, &values, other.as_ref())
                })
                .collect::<Result<Vec<_>, _>>()?;
            Series::from_scalars(&spec.name, dtype, scalars)
        })
        .collect()
}

/// Full group-by driver: group, gather the key columns from each group's
/// first occurrence, then append one column per aggregation.
pub fn group_by_agg(
    df: &DataFrame,
    keys: &[String],
    specs: &[AggSpec],
    config: &ParallelConfig,
    token: &CancelToken,
) -> Result<DataFrame, GalleonError> {
    let groups = group_rows(df, keys, config, token)?;
    let mut columns = Vec::with_capacity(keys.len() + specs.len());
    for key in keys {
        columns.push(df.column_by_name(key)?.take(&groups.first_rows)?);
    }
    columns.extend(aggregate_groups(&groups, specs)?);
    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::AggKind;

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Series::new_string(
                "g",
                ["a", "b", "a", "b", "a"].iter().map(|s| s.to_string()).collect(),
            ),
            Series::new_f64("v", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_groups_first_occurrence_order() {
        let df = sample();
        let groups = group_rows(
            &df,
            &["g".to_string()],
            &ParallelConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.first_rows, vec![0, 1]);
        assert_eq!(groups.rows[0], vec![0, 2, 4]);
        assert_eq!(groups.rows[1], vec![1, 3]);
    }

    #[test]
    fn test_group_by_sum() {
        let df = sample();
        let specs = vec![AggSpec {
            values: df.column_by_name("v").unwrap().clone(),
            other: None,
            kind: AggKind::Sum,
            name: "v_sum".to_string(),
        }];
        let out = group_by_agg(
            &df,
            &["g".to_string()],
            &specs,
            &ParallelConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(
            out.column_by_name("g").unwrap().str().unwrap(),
            &["a".to_string(), "b".to_string()]
        );
        assert_eq!(out.column_by_name("v_sum").unwrap().f64().unwrap(), &[9.0, 6.0]);
    }

    #[test]
    fn test_parallel_path_matches_serial() {
        let n = 10_000;
        let g: Vec<i64> = (0..n).map(|i| (i % 17) as i64).collect();
        let v: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let df = DataFrame::new(vec![
            Series::new_i64("g", g),
            Series::new_f64("v", v),
        ])
        .unwrap();

        let specs = |df: &DataFrame| {
            vec![AggSpec {
                values: df.column_by_name("v").unwrap().clone(),
                other: None,
                kind: AggKind::Sum,
                name: "v_sum".to_string(),
            }]
        };
        let serial = group_by_agg(
            &df,
            &["g".to_string()],
            &specs(&df),
            &ParallelConfig::default().with_morsel_size(1 << 20),
            &CancelToken::new(),
        )
        .unwrap();
        let parallel = group_by_agg(
            &df,
            &["g".to_string()],
            &specs(&df),
            &ParallelConfig::default().with_morsel_size(512),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(serial.frame_equal(&parallel));
    }

    #[test]
    fn test_multi_key_grouping() {
        let df = DataFrame::new(vec![
            Series::new_i64("a", vec![1, 1, 2, 1]),
            Series::new_bool("b", vec![true, false, true, true]),
            Series::new_f64("v", vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();
        let groups = group_rows(
            &df,
            &["a".to_string(), "b".to_string()],
            &ParallelConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups.rows[0], vec![0, 3]);
    }
}
