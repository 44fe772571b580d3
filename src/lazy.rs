//! Lazy query plans.
//!
//! A [`LazyFrame`] wraps a [`LogicalPlan`] bound to a source frame. Builder
//! methods chain new plan nodes; `collect` validates the plan against the
//! source schema, optimizes it, and executes it bottom-up.

use crate::dataframe::join::{JoinOptions, JoinType};
use crate::dataframe::DataFrame;
use crate::expressions::{AggKind, BinaryOperator, Expr};
use crate::performance::parallel::{CancelToken, ParallelConfig};
use crate::schema::Schema;
use crate::types::{promote_dtypes, DType};
use crate::GalleonError;
use std::sync::Arc;

pub mod executor;
pub mod optimizer;

/// A node of the deferred query plan.
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// Leaf: the source frame, optionally column-pruned by the optimizer.
    Scan {
        source: Arc<DataFrame>,
        schema: Schema,
        projection: Option<Vec<String>>,
    },
    Filter {
        input: Box<LogicalPlan>,
        predicate: Expr,
    },
    Projection {
        input: Box<LogicalPlan>,
        exprs: Vec<Expr>,
    },
    GroupBy {
        input: Box<LogicalPlan>,
        keys: Vec<String>,
        aggs: Vec<Expr>,
    },
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        on: Vec<String>,
        how: JoinType,
        options: JoinOptions,
    },
    Sort {
        input: Box<LogicalPlan>,
        by: Vec<String>,
        descending: Vec<bool>,
        /// Set when a `Limit` fused into this sort: only the first `n`
        /// rows of the sorted output survive.
        top_k: Option<usize>,
    },
    Limit {
        input: Box<LogicalPlan>,
        n: usize,
    },
}

/// Execution knobs threaded through `collect`.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub parallel: ParallelConfig,
    pub token: CancelToken,
}

/// A deferred computation over a source frame.
///
/// # Examples
///
/// ```rust
/// use galleon::dataframe::DataFrame;
/// use galleon::expressions::{col, lit};
/// use galleon::series::Series;
///
/// let df = DataFrame::new(vec![
///     Series::new_f64("x", vec![10.0, 20.0, 30.0]),
/// ])
/// .unwrap();
/// let out = df
///     .lazy()
///     .filter(col("x").gt(lit(15.0)))
///     .select(vec![col("x").sum()])
///     .collect()
///     .unwrap();
/// assert_eq!(out.column_by_name("x_sum").unwrap().f64().unwrap(), &[50.0]);
/// ```
#[derive(Debug, Clone)]
pub struct LazyFrame {
    pub(crate) plan: LogicalPlan,
}

impl LazyFrame {
    pub fn from_dataframe(df: DataFrame) -> Self {
        let schema = df.schema();
        LazyFrame {
            plan: LogicalPlan::Scan {
                source: Arc::new(df),
                schema,
                projection: None,
            },
        }
    }

    /// Projects the given expressions.
    pub fn select(self, exprs: Vec<Expr>) -> Self {
        LazyFrame {
            plan: LogicalPlan::Projection {
                input: Box::new(self.plan),
                exprs,
            },
        }
    }

    /// Keeps rows where `predicate` evaluates to true.
    pub fn filter(self, predicate: Expr) -> Self {
        LazyFrame {
            plan: LogicalPlan::Filter {
                input: Box::new(self.plan),
                predicate,
            },
        }
    }

    /// Appends (or replaces) one computed column, keeping all others.
    pub fn with_column(self, expr: Expr) -> Self {
        self.select(vec![Expr::AllCols, expr])
    }

    /// Starts a grouped aggregation over the key columns.
    pub fn group_by(self, keys: Vec<&str>) -> LazyGroupBy {
        LazyGroupBy {
            input: self,
            keys: keys.into_iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Equi-joins with another lazy frame on the named key columns.
    pub fn join(self, other: LazyFrame, on: Vec<&str>, how: JoinType) -> Self {
        self.join_with_options(other, on, how, JoinOptions::default())
    }

    pub fn join_with_options(
        self,
        other: LazyFrame,
        on: Vec<&str>,
        how: JoinType,
        options: JoinOptions,
    ) -> Self {
        LazyFrame {
            plan: LogicalPlan::Join {
                left: Box::new(self.plan),
                right: Box::new(other.plan),
                on: on.into_iter().map(|k| k.to_string()).collect(),
                how,
                options,
            },
        }
    }

    /// Stable multi-key sort; `descending[i]` flips key `i`.
    pub fn sort(self, by: Vec<&str>, descending: Vec<bool>) -> Self {
        LazyFrame {
            plan: LogicalPlan::Sort {
                input: Box::new(self.plan),
                by: by.into_iter().map(|k| k.to_string()).collect(),
                descending,
                top_k: None,
            },
        }
    }

    /// Keeps the first `n` rows.
    pub fn limit(self, n: usize) -> Self {
        LazyFrame {
            plan: LogicalPlan::Limit {
                input: Box::new(self.plan),
                n,
            },
        }
    }

    /// The output schema this plan would produce, or the validation error
    /// it would fail with.
    pub fn schema(&self) -> Result<Schema, GalleonError> {
        self.plan.schema()
    }

    /// Validates, optimizes and executes the plan.
    pub fn collect(self) -> Result<DataFrame, GalleonError> {
        self.collect_with_options(&ExecOptions::default())
    }

    /// [`LazyFrame::collect`] with an explicit runtime configuration and
    /// cancellation token.
    pub fn collect_with_options(self, opts: &ExecOptions) -> Result<DataFrame, GalleonError> {
        self.plan.schema()?;
        let optimized = optimizer::optimize(self.plan);
        executor::execute(&optimized, opts)
    }

    /// Executes the plan as written, skipping the optimizer. Used to check
    /// that optimization preserves semantics.
    pub fn collect_unoptimized(self) -> Result<DataFrame, GalleonError> {
        self.plan.schema()?;
        executor::execute(&self.plan, &ExecOptions::default())
    }
}

/// Intermediate builder produced by [`LazyFrame::group_by`].
pub struct LazyGroupBy {
    input: LazyFrame,
    keys: Vec<String>,
}

impl LazyGroupBy {
    /// Finishes the group-by with a list of aggregation expressions.
    pub fn agg(self, aggs: Vec<Expr>) -> LazyFrame {
        LazyFrame {
            plan: LogicalPlan::GroupBy {
                input: Box::new(self.input.plan),
                keys: self.keys,
                aggs,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Plan schema inference / validation
// ---------------------------------------------------------------------------

impl LogicalPlan {
    /// Infers the output schema, validating column references, dtype
    /// promotion and output-name uniqueness along the way.
    pub fn schema(&self) -> Result<Schema, GalleonError> {
        match self {
            LogicalPlan::Scan {
                schema, projection, ..
            } => match projection {
                None => Ok(schema.clone()),
                Some(cols) => {
                    let fields = cols
                        .iter()
                        .map(|name| {
                            schema
                                .get(name)
                                .map(|dtype| (name.clone(), dtype))
                                .ok_or_else(|| GalleonError::ColumnNotFound(name.clone()))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Schema::from_fields(fields)
                }
            },
            LogicalPlan::Filter { input, predicate } => {
                let schema = input.schema()?;
                let dtype = expr_dtype(predicate, &schema)?;
                if dtype != DType::Bool {
                    return Err(GalleonError::DTypeMismatch(format!(
                        "filter predicate `{}` has dtype {}, expected bool",
                        predicate, dtype
                    )));
                }
                Ok(schema)
            }
            LogicalPlan::Projection { input, exprs } => {
                let input_schema = input.schema()?;
                let mut fields: Vec<(String, DType)> = Vec::new();
                let mut from_all_cols: Vec<bool> = Vec::new();
                for expr in exprs {
                    if matches!(expr, Expr::AllCols) {
                        for (name, dtype) in input_schema.iter() {
                            if !fields.iter().any(|(n, _)| n == name) {
                                fields.push((name.to_string(), dtype));
                                from_all_cols.push(true);
                            }
                        }
                        continue;
                    }
                    let name = expr.output_name().ok_or_else(|| {
                        GalleonError::ColumnNotFound(format!(
                            "expression `{}` has no output name",
                            expr
                        ))
                    })?;
                    let dtype = expr_dtype(expr, &input_schema)?;
                    if let Some(pos) = fields.iter().position(|(n, _)| n == &name) {
                        if from_all_cols[pos] {
                            fields[pos] = (name, dtype);
                            from_all_cols[pos] = false;
                        } else {
                            return Err(GalleonError::DuplicateColumn(name));
                        }
                    } else {
                        fields.push((name, dtype));
                        from_all_cols.push(false);
                    }
                }
                Schema::from_fields(fields)
            }
            LogicalPlan::GroupBy { input, keys, aggs } => {
                let input_schema = input.schema()?;
                let mut fields = Vec::with_capacity(keys.len() + aggs.len());
                for key in keys {
                    let dtype = input_schema
                        .get(key)
                        .ok_or_else(|| GalleonError::ColumnNotFound(key.clone()))?;
                    fields.push((key.clone(), dtype));
                }
                for agg in aggs {
                    let (name, kind, child) = unwrap_aggregation(agg)?;
                    let child_dtype = expr_dtype(child, &input_schema)?;
                    if let AggKind::Corr(other) = &kind {
                        expr_dtype(other, &input_schema)?;
                    }
                    fields.push((name, kind.output_dtype(child_dtype)?));
                }
                Schema::from_fields(fields)
            }
            LogicalPlan::Join {
                left, right, on, ..
            } => {
                let left_schema = left.schema()?;
                let right_schema = right.schema()?;
                let mut fields = Vec::new();
                for (name, dtype) in left_schema.iter() {
                    if on.iter().any(|k| k == name) {
                        let ldt = if dtype == DType::Categorical { DType::Str } else { dtype };
                        let rdt = right_schema
                            .get(name)
                            .ok_or_else(|| GalleonError::ColumnNotFound(name.to_string()))?;
                        let rdt = if rdt == DType::Categorical { DType::Str } else { rdt };
                        if ldt != rdt {
                            return Err(GalleonError::DTypeMismatch(format!(
                                "join key '{}' is {} on the left but {} on the right",
                                name, ldt, rdt
                            )));
                        }
                        fields.push((name.to_string(), ldt));
                    } else {
                        fields.push((name.to_string(), dtype));
                    }
                }
                for key in on {
                    if !left_schema.contains(key) {
                        return Err(GalleonError::ColumnNotFound(key.clone()));
                    }
                    if !right_schema.contains(key) {
                        return Err(GalleonError::ColumnNotFound(key.clone()));
                    }
                }
                for (name, dtype) in right_schema.iter() {
                    if on.iter().any(|k| k == name) {
                        continue;
                    }
                    if left_schema.contains(name) {
                        return Err(GalleonError::DuplicateColumn(format!(
                            "column '{}' exists on both sides of the join",
                            name
                        )));
                    }
                    fields.push((name.to_string(), dtype));
                }
                Schema::from_fields(fields)
            }
            LogicalPlan::Sort {
                input,
                by,
                descending,
                ..
            } => {
                let schema = input.schema()?;
                if by.len() != descending.len() {
                    return Err(GalleonError::LengthMismatch(format!(
                        "sort has {} keys but {} direction flags",
                        by.len(),
                        descending.len()
                    )));
                }
                for key in by {
                    if !schema.contains(key) {
                        return Err(GalleonError::ColumnNotFound(key.clone()));
                    }
                }
                Ok(schema)
            }
            LogicalPlan::Limit { input, .. } => input.schema(),
        }
    }
}

/// Splits an aggregation expression (optionally aliased) into its output
/// name, kind and input expression.
pub(crate) fn unwrap_aggregation(
    expr: &Expr,
) -> Result<(String, AggKind, &Expr), GalleonError> {
    match expr {
        Expr::Alias { expr: inner, name } => {
            let (_, kind, child) = unwrap_aggregation(inner)?;
            Ok((name.clone(), kind, child))
        }
        Expr::Aggregation { kind, expr: child } => {
            let name = expr
                .output_name()
                .unwrap_or_else(|| kind.name().to_string());
            Ok((name, kind.clone(), child))
        }
        other => Err(GalleonError::UnsupportedDType(format!(
            "group-by aggregation must be an aggregation expression, got `{}`",
            other
        ))),
    }
}

/// Resolves the dtype an expression produces over `schema`.
pub(crate) fn expr_dtype(expr: &Expr, schema: &Schema) -> Result<DType, GalleonError> {
    match expr {
        Expr::Column(name) => schema
            .get(name)
            .ok_or_else(|| GalleonError::ColumnNotFound(name.clone())),
        Expr::Literal(value) => Ok(value.dtype()),
        Expr::BinaryOp { op, left, right } => {
            let l = expr_dtype(left, schema)?;
            let r = expr_dtype(right, schema)?;
            match op {
                BinaryOperator::And | BinaryOperator::Or => {
                    if l == DType::Bool && r == DType::Bool {
                        Ok(DType::Bool)
                    } else {
                        Err(GalleonError::TypePromotion(format!(
                            "logical {} over {} and {}",
                            if *op == BinaryOperator::And { "and" } else { "or" },
                            l,
                            r
                        )))
                    }
                }
                op if op.is_comparison() => {
                    promote_dtypes(l, r)?;
                    Ok(DType::Bool)
                }
                _ => {
                    let promoted = promote_dtypes(l, r)?;
                    if !promoted.is_numeric() {
                        return Err(GalleonError::TypePromotion(format!(
                            "arithmetic over {} and {}",
                            l, r
                        )));
                    }
                    Ok(promoted)
                }
            }
        }
        Expr::Aggregation { kind, expr: child } => {
            let child_dtype = expr_dtype(child, schema)?;
            if let AggKind::Corr(other) = kind {
                expr_dtype(other, schema)?;
            }
            kind.output_dtype(child_dtype)
        }
        Expr::Cast { expr: child, dtype } => {
            expr_dtype(child, schema)?;
            Ok(*dtype)
        }
        Expr::Alias { expr: child, .. } => expr_dtype(child, schema),
        Expr::AllCols => Err(GalleonError::UnsupportedDType(
            "`*` is only valid directly inside a projection".to_string(),
        )),
    }
}
