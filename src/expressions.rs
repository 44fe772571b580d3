use crate::types::{DType, Scalar};

/// A binary operator in an expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Neq
                | BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    pub fn is_arithmetic(&self) -> bool {
        !self.is_comparison() && !self.is_logical()
    }

    fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Eq => "==",
            BinaryOperator::Neq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
        }
    }
}

/// The aggregation functions understood by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum AggKind {
    Sum,
    Mean,
    Min,
    Max,
    Count,
    Median,
    Quantile(f64),
    Skew,
    Kurt,
    /// Pearson correlation against a second expression.
    Corr(Box<Expr>),
    Var,
    Std,
}

impl AggKind {
    /// The dtype this aggregation produces over an `input`-typed column.
    ///
    /// Statistics (mean, median, quantile, var, std, skew, kurt, corr) are
    /// defined for floats and signed integers and produce `F64`; `sum`,
    /// `min` and `max` keep the input dtype; `count` yields `U32`.
    pub fn output_dtype(&self, input: DType) -> Result<DType, crate::GalleonError> {
        let unsupported = || {
            Err(crate::GalleonError::UnsupportedDType(format!(
                "{} is not defined for dtype {}",
                self.name(),
                input
            )))
        };
        match self {
            AggKind::Count => Ok(DType::U32),
            AggKind::Sum => {
                if input.is_numeric() {
                    Ok(input)
                } else {
                    unsupported()
                }
            }
            AggKind::Min | AggKind::Max => {
                if input.is_numeric()
                    || matches!(input, DType::Str | DType::DateTime | DType::Duration)
                {
                    Ok(input)
                } else {
                    unsupported()
                }
            }
            _ => {
                if matches!(input, DType::F64 | DType::F32 | DType::I64 | DType::I32) {
                    Ok(DType::F64)
                } else {
                    unsupported()
                }
            }
        }
    }

    /// Short name used for default output columns (`{column}_{name}`).
    pub fn name(&self) -> &'static str {
        match self {
            AggKind::Sum => "sum",
            AggKind::Mean => "mean",
            AggKind::Min => "min",
            AggKind::Max => "max",
            AggKind::Count => "count",
            AggKind::Median => "median",
            AggKind::Quantile(_) => "quantile",
            AggKind::Skew => "skew",
            AggKind::Kurt => "kurt",
            AggKind::Corr(_) => "corr",
            AggKind::Var => "var",
            AggKind::Std => "std",
        }
    }
}

/// An expression over the columns of a frame.
///
/// Expressions are pure data; evaluation lives in the executor. Trees are
/// immutable, builders return fresh nodes, and equality is structural.
///
/// # Examples
///
/// ```rust
/// use galleon::expressions::{col, lit};
///
/// let pred = (col("x") + lit(1)).gt(lit(3));
/// assert_eq!(pred.to_string(), "((col(\"x\") + 1) > 3)");
///
/// let agg = col("x").sum().alias("total");
/// assert_eq!(agg.to_string(), "col(\"x\").sum().alias(\"total\")");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a column by name.
    Column(String),
    /// A literal value; its dtype is the scalar's dtype.
    Literal(Scalar),
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Aggregation {
        kind: AggKind,
        expr: Box<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        dtype: DType,
    },
    Alias {
        expr: Box<Expr>,
        name: String,
    },
    /// Expands to every input column, in order.
    AllCols,
}

/// Creates a column reference expression.
pub fn col(name: &str) -> Expr {
    Expr::Column(name.to_string())
}

/// Creates a literal expression from any scalar-convertible value.
pub fn lit<T: Into<Scalar>>(value: T) -> Expr {
    Expr::Literal(value.into())
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn agg(kind: AggKind, expr: Expr) -> Expr {
    Expr::Aggregation {
        kind,
        expr: Box::new(expr),
    }
}

impl Expr {
    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOperator::Eq, self, other.into())
    }

    pub fn neq(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOperator::Neq, self, other.into())
    }

    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOperator::Lt, self, other.into())
    }

    pub fn lt_eq(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOperator::LtEq, self, other.into())
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOperator::Gt, self, other.into())
    }

    pub fn gt_eq(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOperator::GtEq, self, other.into())
    }

    pub fn and(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOperator::And, self, other.into())
    }

    pub fn or(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOperator::Or, self, other.into())
    }

    pub fn sum(self) -> Expr {
        agg(AggKind::Sum, self)
    }

    pub fn mean(self) -> Expr {
        agg(AggKind::Mean, self)
    }

    pub fn min(self) -> Expr {
        agg(AggKind::Min, self)
    }

    pub fn max(self) -> Expr {
        agg(AggKind::Max, self)
    }

    pub fn count(self) -> Expr {
        agg(AggKind::Count, self)
    }

    pub fn median(self) -> Expr {
        agg(AggKind::Median, self)
    }

    pub fn quantile(self, q: f64) -> Expr {
        agg(AggKind::Quantile(q), self)
    }

    pub fn skew(self) -> Expr {
        agg(AggKind::Skew, self)
    }

    pub fn kurt(self) -> Expr {
        agg(AggKind::Kurt, self)
    }

    pub fn corr(self, other: Expr) -> Expr {
        agg(AggKind::Corr(Box::new(other)), self)
    }

    pub fn var(self) -> Expr {
        agg(AggKind::Var, self)
    }

    pub fn std(self) -> Expr {
        agg(AggKind::Std, self)
    }

    pub fn cast(self, dtype: DType) -> Expr {
        Expr::Cast {
            expr: Box::new(self),
            dtype,
        }
    }

    pub fn alias(self, name: &str) -> Expr {
        Expr::Alias {
            expr: Box::new(self),
            name: name.to_string(),
        }
    }

    /// True if any node in the tree is an aggregation.
    pub fn has_aggregation(&self) -> bool {
        match self {
            Expr::Aggregation { .. } => true,
            Expr::Column(_) | Expr::Literal(_) | Expr::AllCols => false,
            Expr::BinaryOp { left, right, .. } => left.has_aggregation() || right.has_aggregation(),
            Expr::Cast { expr, .. } | Expr::Alias { expr, .. } => expr.has_aggregation(),
        }
    }

    /// True if any node in the tree is `AllCols`.
    pub fn has_all_cols(&self) -> bool {
        match self {
            Expr::AllCols => true,
            Expr::Column(_) | Expr::Literal(_) => false,
            Expr::BinaryOp { left, right, .. } => left.has_all_cols() || right.has_all_cols(),
            Expr::Aggregation { kind, expr } => {
                expr.has_all_cols()
                    || matches!(kind, AggKind::Corr(other) if other.has_all_cols())
            }
            Expr::Cast { expr, .. } | Expr::Alias { expr, .. } => expr.has_all_cols(),
        }
    }

    /// Collects the names of every column the tree references.
    pub fn root_columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            Expr::Column(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Expr::Literal(_) | Expr::AllCols => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Aggregation { kind, expr } => {
                expr.collect_columns(out);
                if let AggKind::Corr(other) = kind {
                    other.collect_columns(out);
                }
            }
            Expr::Cast { expr, .. } | Expr::Alias { expr, .. } => expr.collect_columns(out),
        }
    }

    /// The name the expression's output column gets when no alias is set.
    ///
    /// Aggregations use `{column}_{agg}` (e.g. `v_sum`); other expressions
    /// inherit the name of their left-most column, or `"literal"`.
    pub fn output_name(&self) -> Option<String> {
        match self {
            Expr::Column(name) => Some(name.clone()),
            Expr::Alias { name, .. } => Some(name.clone()),
            Expr::Aggregation { kind, expr } => {
                let base = expr.output_name().unwrap_or_else(|| "expr".to_string());
                Some(format!("{}_{}", base, kind.name()))
            }
            Expr::Cast { expr, .. } => expr.output_name(),
            Expr::BinaryOp { left, .. } => {
                let roots = left.root_columns();
                match roots.into_iter().next() {
                    Some(name) => Some(name),
                    None => Some("literal".to_string()),
                }
            }
            Expr::Literal(_) => Some("literal".to_string()),
            Expr::AllCols => None,
        }
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        lit(v)
    }
}

impl From<f32> for Expr {
    fn from(v: f32) -> Self {
        lit(v)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        lit(v)
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        lit(v)
    }
}

impl From<u64> for Expr {
    fn from(v: u64) -> Self {
        lit(v)
    }
}

impl From<u32> for Expr {
    fn from(v: u32) -> Self {
        lit(v)
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        lit(v)
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        lit(v)
    }
}

impl<R: Into<Expr>> std::ops::Add<R> for Expr {
    type Output = Expr;
    fn add(self, rhs: R) -> Expr {
        binary(BinaryOperator::Add, self, rhs.into())
    }
}

impl<R: Into<Expr>> std::ops::Sub<R> for Expr {
    type Output = Expr;
    fn sub(self, rhs: R) -> Expr {
        binary(BinaryOperator::Sub, self, rhs.into())
    }
}

impl<R: Into<Expr>> std::ops::Mul<R> for Expr {
    type Output = Expr;
    fn mul(self, rhs: R) -> Expr {
        binary(BinaryOperator::Mul, self, rhs.into())
    }
}

impl<R: Into<Expr>> std::ops::Div<R> for Expr {
    type Output = Expr;
    fn div(self, rhs: R) -> Expr {
        binary(BinaryOperator::Div, self, rhs.into())
    }
}

impl<R: Into<Expr>> std::ops::Rem<R> for Expr {
    type Output = Expr;
    fn rem(self, rhs: R) -> Expr {
        binary(BinaryOperator::Mod, self, rhs.into())
    }
}

impl std::fmt::Display for Expr {
    /// Renders the canonical shape of the tree, e.g. `(col("x") + 1)` or
    /// `corr(col("a"), col("b"))`. The rendering is deterministic and is
    /// what tests assert against.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "col(\"{}\")", name),
            Expr::Literal(Scalar::Str(s)) => write!(f, "\"{}\"", s),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::BinaryOp { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Aggregation { kind, expr } => match kind {
                AggKind::Corr(other) => write!(f, "corr({}, {})", expr, other),
                AggKind::Quantile(q) => write!(f, "{}.quantile({})", expr, q),
                _ => write!(f, "{}.{}()", expr, kind.name()),
            },
            Expr::Cast { expr, dtype } => write!(f, "{}.cast({})", expr, dtype),
            Expr::Alias { expr, name } => write!(f, "{}.alias(\"{}\")", expr, name),
            Expr::AllCols => write!(f, "*"),
        }
    }
}
