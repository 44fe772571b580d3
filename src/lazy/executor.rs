//! Bottom-up plan execution.
//!
//! Every node materializes a full frame. Expression evaluation is
//! vectorized: a whole column per expression node, per-dtype dispatch into
//! the numeric kernels, and `u8` masks for predicates (conjunction is
//! pairwise `min`, disjunction pairwise `max`). Tall filter inputs are
//! split into morsels and evaluated across the worker pool.

use crate::dataframe::group_by::{group_by_agg, reduce, AggSpec};
use crate::dataframe::DataFrame;
use crate::expressions::{AggKind, BinaryOperator, Expr};
use crate::lazy::{unwrap_aggregation, ExecOptions, LogicalPlan};
use crate::performance::hash::{
    bool_to_ordered_bits, f32_to_ordered_bits, f64_to_ordered_bits, i32_to_ordered_bits,
    i64_to_ordered_bits, radix_sort_perm, u32_to_ordered_bits, u64_to_ordered_bits,
};
use crate::performance::memory_pool::PooledBuffer;
use crate::performance::parallel::WorkerPool;
use crate::series::Series;
use crate::types::promote_dtypes;
use crate::GalleonError;
use log::trace;

/// Executes a plan node, yielding a materialized frame.
pub fn execute(plan: &LogicalPlan, opts: &ExecOptions) -> Result<DataFrame, GalleonError> {
    opts.token.check()?;
    match plan {
        LogicalPlan::Scan {
            source, projection, ..
        } => {
            trace!("scan ({} columns pruned to {:?})", source.width(), projection);
            match projection {
                None => Ok(source.as_ref().clone()),
                Some(cols) => {
                    let names: Vec<&str> = cols.iter().map(String::as_str).collect();
                    source.select_columns(&names)
                }
            }
        }
        LogicalPlan::Filter { input, predicate } => {
            let df = execute(input, opts)?;
            trace!("filter `{}` over {} rows", predicate, df.height());
            filter_dataframe(&df, predicate, opts)
        }
        LogicalPlan::Projection { input, exprs } => {
            let df = execute(input, opts)?;
            trace!("projection of {} expressions", exprs.len());
            project(&df, exprs, opts)
        }
        LogicalPlan::GroupBy { input, keys, aggs } => {
            let df = execute(input, opts)?;
            trace!("group-by {:?} over {} rows", keys, df.height());
            run_group_by(&df, keys, aggs, opts)
        }
        LogicalPlan::Join {
            left,
            right,
            on,
            how,
            options,
        } => {
            let lhs = execute(left, opts)?;
            let rhs = execute(right, opts)?;
            trace!(
                "{:?} join on {:?}: {} x {} rows",
                how,
                on,
                lhs.height(),
                rhs.height()
            );
            let keys: Vec<&str> = on.iter().map(String::as_str).collect();
            lhs.join_with_options(&rhs, &keys, *how, options, &opts.token)
        }
        LogicalPlan::Sort {
            input,
            by,
            descending,
            top_k,
        } => {
            let df = execute(input, opts)?;
            trace!("sort by {:?} (top_k {:?})", by, top_k);
            let sorted = sort_dataframe(&df, by, descending)?;
            Ok(match top_k {
                Some(n) => sorted.head(*n),
                None => sorted,
            })
        }
        LogicalPlan::Limit { input, n } => {
            let df = execute(input, opts)?;
            Ok(df.head(*n))
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Keeps the rows of `df` where `predicate` is true.
pub(crate) fn filter_dataframe(
    df: &DataFrame,
    predicate: &Expr,
    opts: &ExecOptions,
) -> Result<DataFrame, GalleonError> {
    let height = df.height();
    let needed = predicate.root_columns();

    // Tall inputs: evaluate the mask morsel by morsel on the worker pool,
    // over a sub-frame holding just the predicate's columns.
    if height > opts.parallel.morsel_size && !needed.is_empty() {
        let names: Vec<&str> = needed.iter().map(String::as_str).collect();
        let sub = df.select_columns(&names)?;
        let shards = WorkerPool::scatter(&opts.parallel, height, &opts.token, |range| {
            let chunk = sub.slice(range);
            evaluate_mask(&chunk, predicate).map(|m| m.as_slice().to_vec())
        })?;
        let mut mask = Vec::with_capacity(height);
        for (_, shard) in shards {
            mask.extend(shard);
        }
        return df.filter_mask(&mask);
    }

    let mask = evaluate_mask(df, predicate)?;
    df.filter_mask(mask.as_slice())
}

/// Evaluates a boolean expression into a pooled `u8` mask of the frame's
/// height.
pub(crate) fn evaluate_mask(df: &DataFrame, expr: &Expr) -> Result<PooledBuffer, GalleonError> {
    match expr {
        Expr::BinaryOp { op, left, right } if op.is_comparison() => {
            let (l, r) = evaluate_promoted_pair(df, left, right)?;
            let mut buf = PooledBuffer::new(l.len());
            l.compare_into(&r, *op, buf.as_mut_slice())?;
            Ok(buf)
        }
        Expr::BinaryOp { op, left, right } if op.is_logical() => {
            let mut acc = evaluate_mask(df, left)?;
            let other = evaluate_mask(df, right)?;
            match op {
                BinaryOperator::And => {
                    crate::performance::simd::mask_and_inplace(acc.as_mut_slice(), &other)
                }
                _ => crate::performance::simd::mask_or_inplace(acc.as_mut_slice(), &other),
            }
            other.release();
            Ok(acc)
        }
        Expr::Alias { expr, .. } => evaluate_mask(df, expr),
        other => {
            // Bool column, literal, cast to bool, and friends.
            let series = evaluate_expr(df, other)?;
            let bools = series.bool().map_err(|_| {
                GalleonError::DTypeMismatch(format!(
                    "filter predicate `{}` did not evaluate to a boolean column",
                    other
                ))
            })?;
            let mut buf = PooledBuffer::new(bools.len());
            for (slot, &b) in buf.as_mut_slice().iter_mut().zip(bools) {
                *slot = b as u8;
            }
            Ok(buf)
        }
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

fn project(df: &DataFrame, exprs: &[Expr], opts: &ExecOptions) -> Result<DataFrame, GalleonError> {
    let mut columns: Vec<Series> = Vec::new();
    let mut from_all_cols: Vec<bool> = Vec::new();
    for expr in exprs {
        opts.token.check()?;
        if matches!(expr, Expr::AllCols) {
            for column in df.columns() {
                if !columns.iter().any(|c| c.name() == column.name()) {
                    columns.push(column.clone());
                    from_all_cols.push(true);
                }
            }
            continue;
        }
        let series = evaluate_expr(df, expr)?;
        if let Some(pos) = columns.iter().position(|c| c.name() == series.name()) {
            if from_all_cols[pos] {
                columns[pos] = series;
                from_all_cols[pos] = false;
            } else {
                return Err(GalleonError::DuplicateColumn(series.name().to_string()));
            }
        } else {
            columns.push(series);
            from_all_cols.push(false);
        }
    }
    DataFrame::new(columns)
}

// ---------------------------------------------------------------------------
// Group-by
// ---------------------------------------------------------------------------

fn run_group_by(
    df: &DataFrame,
    keys: &[String],
    aggs: &[Expr],
    opts: &ExecOptions,
) -> Result<DataFrame, GalleonError> {
    let mut specs = Vec::with_capacity(aggs.len());
    for agg in aggs {
        let (name, kind, child) = unwrap_aggregation(agg)?;
        let values = evaluate_expr(df, child)?;
        let other = match &kind {
            AggKind::Corr(other_expr) => Some(evaluate_expr(df, other_expr)?),
            _ => None,
        };
        specs.push(AggSpec {
            values,
            other,
            kind,
            name,
        });
    }
    group_by_agg(df, keys, &specs, &opts.parallel, &opts.token)
}

// ---------------------------------------------------------------------------
// Expression evaluation
// ---------------------------------------------------------------------------

/// Evaluates both operands and casts them to their common dtype.
fn evaluate_promoted_pair(
    df: &DataFrame,
    left: &Expr,
    right: &Expr,
) -> Result<(Series, Series), GalleonError> {
    let l = evaluate_expr(df, left)?;
    let r = evaluate_expr(df, right)?;
    let target = promote_dtypes(l.dtype(), r.dtype())?;
    let l = if l.dtype() == target { l } else { l.cast(target)? };
    let r = if r.dtype() == target { r } else { r.cast(target)? };
    Ok((l, r))
}

/// Evaluates an expression against a frame, producing a column of the
/// frame's height (or a one-row column for aggregations).
pub(crate) fn evaluate_expr(df: &DataFrame, expr: &Expr) -> Result<Series, GalleonError> {
    match expr {
        Expr::Column(name) => Ok(df.column_by_name(name)?.clone()),
        Expr::Literal(value) => Series::full("literal", value, df.height()),
        Expr::BinaryOp { op, left, right } => {
            if op.is_arithmetic() {
                let (l, r) = evaluate_promoted_pair(df, left, right)?;
                if !l.dtype().is_numeric() {
                    return Err(GalleonError::TypePromotion(format!(
                        "arithmetic over {} operands",
                        l.dtype()
                    )));
                }
                l.arithmetic(&r, *op)
            } else {
                // Comparisons and conjunctions surface as boolean columns.
                let mask = evaluate_mask(df, expr)?;
                let name = expr.output_name().unwrap_or_else(|| "literal".to_string());
                let bools = mask.iter().map(|&m| m != 0).collect();
                Ok(Series::new_bool(&name, bools))
            }
        }
        Expr::Aggregation { kind, expr: child } => {
            let values = evaluate_expr(df, child)?;
            let other = match kind {
                AggKind::Corr(other_expr) => Some(evaluate_expr(df, other_expr)?),
                _ => None,
            };
            let scalar = reduce(kind, &values, other.as_ref())?;
            let name = expr.output_name().unwrap_or_else(|| kind.name().to_string());
            let dtype = kind.output_dtype(values.dtype())?;
            Series::from_scalars(&name, dtype, vec![scalar])
        }
        Expr::Cast { expr: child, dtype } => evaluate_expr(df, child)?.cast(*dtype),
        Expr::Alias { expr: child, name } => {
            Ok(evaluate_expr(df, child)?.with_name(name))
        }
        Expr::AllCols => Err(GalleonError::UnsupportedDType(
            "`*` is only valid directly inside a projection".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

/// Stable multi-key sort: keys are applied last-to-first with a stable pass
/// each, so earlier keys dominate. Numeric keys ride the radix sorter via
/// order-preserving bit keys (NaN last ascending); string keys use a stable
/// comparison sort.
fn sort_dataframe(
    df: &DataFrame,
    by: &[String],
    descending: &[bool],
) -> Result<DataFrame, GalleonError> {
    if by.len() != descending.len() {
        return Err(GalleonError::LengthMismatch(format!(
            "sort has {} keys but {} direction flags",
            by.len(),
            descending.len()
        )));
    }
    let mut perm: Vec<u32> = (0..df.height() as u32).collect();
    for (key, &desc) in by.iter().zip(descending).rev() {
        let column = df.column_by_name(key)?;
        match column {
            Series::Str(_, values) => {
                if desc {
                    perm.sort_by(|&a, &b| values[b as usize].cmp(&values[a as usize]));
                } else {
                    perm.sort_by(|&a, &b| values[a as usize].cmp(&values[b as usize]));
                }
            }
            Series::Categorical(_, dict, codes) => {
                let key_of = |i: u32| &dict[codes[i as usize] as usize];
                if desc {
                    perm.sort_by(|&a, &b| key_of(b).cmp(key_of(a)));
                } else {
                    perm.sort_by(|&a, &b| key_of(a).cmp(key_of(b)));
                }
            }
            _ => {
                let mut bits = numeric_sort_keys(column)?;
                if desc {
                    for b in bits.iter_mut() {
                        *b = !*b;
                    }
                }
                radix_sort_perm(&mut perm, &bits);
            }
        }
    }
    let indices: Vec<usize> = perm.into_iter().map(|i| i as usize).collect();
    df.take(&indices)
}

fn numeric_sort_keys(column: &Series) -> Result<Vec<u64>, GalleonError> {
    Ok(match column {
        Series::F64(_, v) => v.iter().map(|&x| f64_to_ordered_bits(x)).collect(),
        Series::F32(_, v) => v.iter().map(|&x| f32_to_ordered_bits(x)).collect(),
        Series::I64(_, v) | Series::DateTime(_, v) | Series::Duration(_, v) => {
            v.iter().map(|&x| i64_to_ordered_bits(x)).collect()
        }
        Series::I32(_, v) => v.iter().map(|&x| i32_to_ordered_bits(x)).collect(),
        Series::U64(_, v) => v.iter().map(|&x| u64_to_ordered_bits(x)).collect(),
        Series::U32(_, v) => v.iter().map(|&x| u32_to_ordered_bits(x)).collect(),
        Series::Bool(_, v) => v.iter().map(|&x| bool_to_ordered_bits(x)).collect(),
        other => {
            return Err(GalleonError::UnsupportedDType(format!(
                "cannot sort by {} column '{}'",
                other.dtype(),
                other.name()
            )))
        }
    })
}
