//! Arithmetic and comparison over series, dispatching per dtype into the
//! vectorized kernels. Operands are expected to share a dtype; the executor
//! promotes both sides before calling in here.

use crate::expressions::BinaryOperator;
use crate::performance::simd;
use crate::series::Series;
use crate::types::Scalar;
use crate::GalleonError;

impl Series {
    /// Adds a scalar to every element, preserving dtype.
    pub fn add_scalar(&self, value: &Scalar) -> Result<Series, GalleonError> {
        match self {
            Series::F64(n, v) => {
                let s = self.scalar_as_f64(value)?;
                Ok(Series::F64(n.clone(), simd::add_scalar_f64(v, s)))
            }
            Series::F32(n, v) => {
                let s = self.scalar_as_f64(value)? as f32;
                Ok(Series::F32(n.clone(), simd::add_scalar_f32(v, s)))
            }
            Series::I64(n, v) => {
                let s = self.scalar_as_i64(value)?;
                Ok(Series::I64(n.clone(), simd::add_scalar_i64(v, s)))
            }
            Series::I32(n, v) => {
                let s = self.scalar_as_i64(value)? as i32;
                Ok(Series::I32(n.clone(), simd::add_scalar_i32(v, s)))
            }
            Series::U64(n, v) => {
                let s = self.scalar_as_u64(value)?;
                Ok(Series::U64(n.clone(), simd::add_scalar_u64(v, s)))
            }
            Series::U32(n, v) => {
                let s = self.scalar_as_u64(value)? as u32;
                Ok(Series::U32(n.clone(), simd::add_scalar_u32(v, s)))
            }
            _ => Err(GalleonError::UnsupportedDType(format!(
                "add_scalar is not defined for {} column '{}'",
                self.dtype(),
                self.name()
            ))),
        }
    }

    /// Multiplies every element by a scalar, preserving dtype.
    pub fn mul_scalar(&self, value: &Scalar) -> Result<Series, GalleonError> {
        match self {
            Series::F64(n, v) => {
                let s = self.scalar_as_f64(value)?;
                Ok(Series::F64(n.clone(), simd::mul_scalar_f64(v, s)))
            }
            Series::F32(n, v) => {
                let s = self.scalar_as_f64(value)? as f32;
                Ok(Series::F32(n.clone(), simd::mul_scalar_f32(v, s)))
            }
            Series::I64(n, v) => {
                let s = self.scalar_as_i64(value)?;
                Ok(Series::I64(n.clone(), simd::mul_scalar_i64(v, s)))
            }
            Series::I32(n, v) => {
                let s = self.scalar_as_i64(value)? as i32;
                Ok(Series::I32(n.clone(), simd::mul_scalar_i32(v, s)))
            }
            Series::U64(n, v) => {
                let s = self.scalar_as_u64(value)?;
                Ok(Series::U64(n.clone(), simd::mul_scalar_u64(v, s)))
            }
            Series::U32(n, v) => {
                let s = self.scalar_as_u64(value)? as u32;
                Ok(Series::U32(n.clone(), simd::mul_scalar_u32(v, s)))
            }
            _ => Err(GalleonError::UnsupportedDType(format!(
                "mul_scalar is not defined for {} column '{}'",
                self.dtype(),
                self.name()
            ))),
        }
    }

    fn scalar_as_f64(&self, value: &Scalar) -> Result<f64, GalleonError> {
        value.as_f64().ok_or_else(|| {
            GalleonError::DTypeMismatch(format!(
                "scalar {:?} is not numeric for column '{}'",
                value,
                self.name()
            ))
        })
    }

    fn scalar_as_i64(&self, value: &Scalar) -> Result<i64, GalleonError> {
        match value {
            Scalar::I64(v) => Ok(*v),
            Scalar::I32(v) => Ok(*v as i64),
            Scalar::Bool(v) => Ok(*v as i64),
            _ => Err(GalleonError::DTypeMismatch(format!(
                "scalar {:?} is not an integer for column '{}'",
                value,
                self.name()
            ))),
        }
    }

    fn scalar_as_u64(&self, value: &Scalar) -> Result<u64, GalleonError> {
        match value {
            Scalar::U64(v) => Ok(*v),
            Scalar::U32(v) => Ok(*v as u64),
            Scalar::Bool(v) => Ok(*v as u64),
            _ => Err(GalleonError::DTypeMismatch(format!(
                "scalar {:?} is not an unsigned integer for column '{}'",
                value,
                self.name()
            ))),
        }
    }

    fn check_same_shape(&self, other: &Series) -> Result<(), GalleonError> {
        if self.len() != other.len() {
            return Err(GalleonError::LengthMismatch(format!(
                "binary op over columns '{}' ({} rows) and '{}' ({} rows)",
                self.name(),
                self.len(),
                other.name(),
                other.len()
            )));
        }
        if self.dtype() != other.dtype() {
            return Err(GalleonError::DTypeMismatch(format!(
                "binary op over {} column '{}' and {} column '{}'",
                self.dtype(),
                self.name(),
                other.dtype(),
                other.name()
            )));
        }
        Ok(())
    }

    /// Elementwise arithmetic between two same-dtype, same-length columns.
    /// The result keeps the left column's name.
    pub fn arithmetic(
        &self,
        other: &Series,
        op: BinaryOperator,
    ) -> Result<Series, GalleonError> {
        debug_assert!(op.is_arithmetic());
        self.check_same_shape(other)?;

        macro_rules! int_divisor_check {
            ($vals:expr, $zero:expr) => {
                if matches!(op, BinaryOperator::Div | BinaryOperator::Mod)
                    && $vals.contains(&$zero)
                {
                    return Err(GalleonError::DomainError(format!(
                        "integer division by zero in column '{}'",
                        other.name()
                    )));
                }
            };
        }

        match (self, other) {
            (Series::F64(n, a), Series::F64(_, b)) => {
                let out = match op {
                    BinaryOperator::Add => simd::add_f64(a, b),
                    BinaryOperator::Sub => simd::sub_f64(a, b),
                    BinaryOperator::Mul => simd::mul_f64(a, b),
                    BinaryOperator::Div => simd::div_f64(a, b),
                    BinaryOperator::Mod => simd::rem_f64(a, b),
                    _ => unreachable!(),
                };
                Ok(Series::F64(n.clone(), out))
            }
            (Series::F32(n, a), Series::F32(_, b)) => {
                let out = match op {
                    BinaryOperator::Add => simd::add_f32(a, b),
                    BinaryOperator::Sub => simd::sub_f32(a, b),
                    BinaryOperator::Mul => simd::mul_f32(a, b),
                    BinaryOperator::Div => simd::div_f32(a, b),
                    BinaryOperator::Mod => simd::rem_f32(a, b),
                    _ => unreachable!(),
                };
                Ok(Series::F32(n.clone(), out))
            }
            (Series::I64(n, a), Series::I64(_, b)) => {
                int_divisor_check!(b, 0i64);
                let out = match op {
                    BinaryOperator::Add => simd::add_i64(a, b),
                    BinaryOperator::Sub => simd::sub_i64(a, b),
                    BinaryOperator::Mul => simd::mul_i64(a, b),
                    BinaryOperator::Div => simd::div_i64(a, b),
                    BinaryOperator::Mod => simd::rem_i64(a, b),
                    _ => unreachable!(),
                };
                Ok(Series::I64(n.clone(), out))
            }
            (Series::I32(n, a), Series::I32(_, b)) => {
                int_divisor_check!(b, 0i32);
                let out = match op {
                    BinaryOperator::Add => simd::add_i32(a, b),
                    BinaryOperator::Sub => simd::sub_i32(a, b),
                    BinaryOperator::Mul => simd::mul_i32(a, b),
                    BinaryOperator::Div => simd::div_i32(a, b),
                    BinaryOperator::Mod => simd::rem_i32(a, b),
                    _ => unreachable!(),
                };
                Ok(Series::I32(n.clone(), out))
            }
            (Series::U64(n, a), Series::U64(_, b)) => {
                int_divisor_check!(b, 0u64);
                let out = match op {
                    BinaryOperator::Add => simd::add_u64(a, b),
                    BinaryOperator::Sub => simd::sub_u64(a, b),
                    BinaryOperator::Mul => simd::mul_u64(a, b),
                    BinaryOperator::Div => simd::div_u64(a, b),
                    BinaryOperator::Mod => simd::rem_u64(a, b),
                    _ => unreachable!(),
                };
                Ok(Series::U64(n.clone(), out))
            }
            (Series::U32(n, a), Series::U32(_, b)) => {
                int_divisor_check!(b, 0u32);
                let out = match op {
                    BinaryOperator::Add => simd::add_u32(a, b),
                    BinaryOperator::Sub => simd::sub_u32(a, b),
                    BinaryOperator::Mul => simd::mul_u32(a, b),
                    BinaryOperator::Div => simd::div_u32(a, b),
                    BinaryOperator::Mod => simd::rem_u32(a, b),
                    _ => unreachable!(),
                };
                Ok(Series::U32(n.clone(), out))
            }
            _ => Err(GalleonError::UnsupportedDType(format!(
                "arithmetic is not defined for {} column '{}'",
                self.dtype(),
                self.name()
            ))),
        }
    }

    /// Elementwise comparison producing a `u8` mask. Operands must share a
    /// dtype and length.
    pub fn compare(&self, other: &Series, op: BinaryOperator) -> Result<Vec<u8>, GalleonError> {
        let mut out = vec![0u8; self.len()];
        self.compare_into(other, op, &mut out)?;
        Ok(out)
    }

    /// [`Series::compare`] writing into a caller-owned mask buffer (e.g. a
    /// pooled one).
    pub fn compare_into(
        &self,
        other: &Series,
        op: BinaryOperator,
        mut out: &mut [u8],
    ) -> Result<(), GalleonError> {
        debug_assert!(op.is_comparison());
        self.check_same_shape(other)?;
        if out.len() != self.len() {
            return Err(GalleonError::LengthMismatch(format!(
                "mask buffer of length {} for columns of length {}",
                out.len(),
                self.len()
            )));
        }

        macro_rules! dispatch_cmp {
            ($a:expr, $b:expr, $eq:ident, $neq:ident, $lt:ident, $lt_eq:ident, $gt:ident, $gt_eq:ident) => {
                match op {
                    BinaryOperator::Eq => simd::$eq($a, $b, &mut out),
                    BinaryOperator::Neq => simd::$neq($a, $b, &mut out),
                    BinaryOperator::Lt => simd::$lt($a, $b, &mut out),
                    BinaryOperator::LtEq => simd::$lt_eq($a, $b, &mut out),
                    BinaryOperator::Gt => simd::$gt($a, $b, &mut out),
                    BinaryOperator::GtEq => simd::$gt_eq($a, $b, &mut out),
                    _ => unreachable!(),
                }
            };
        }

        match (self, other) {
            (Series::F64(_, a), Series::F64(_, b)) => {
                dispatch_cmp!(a, b, eq_f64, neq_f64, lt_f64, lt_eq_f64, gt_f64, gt_eq_f64)
            }
            (Series::F32(_, a), Series::F32(_, b)) => {
                dispatch_cmp!(a, b, eq_f32, neq_f32, lt_f32, lt_eq_f32, gt_f32, gt_eq_f32)
            }
            (Series::I64(_, a), Series::I64(_, b))
            | (Series::DateTime(_, a), Series::DateTime(_, b))
            | (Series::Duration(_, a), Series::Duration(_, b)) => {
                dispatch_cmp!(a, b, eq_i64, neq_i64, lt_i64, lt_eq_i64, gt_i64, gt_eq_i64)
            }
            (Series::I32(_, a), Series::I32(_, b)) => {
                dispatch_cmp!(a, b, eq_i32, neq_i32, lt_i32, lt_eq_i32, gt_i32, gt_eq_i32)
            }
            (Series::U64(_, a), Series::U64(_, b)) => {
                dispatch_cmp!(a, b, eq_u64, neq_u64, lt_u64, lt_eq_u64, gt_u64, gt_eq_u64)
            }
            (Series::U32(_, a), Series::U32(_, b)) => {
                dispatch_cmp!(a, b, eq_u32, neq_u32, lt_u32, lt_eq_u32, gt_u32, gt_eq_u32)
            }
            (Series::Bool(_, a), Series::Bool(_, b)) => {
                for i in 0..a.len() {
                    out[i] = match op {
                        BinaryOperator::Eq => (a[i] == b[i]) as u8,
                        BinaryOperator::Neq => (a[i] != b[i]) as u8,
                        BinaryOperator::Lt => ((!a[i]) & b[i]) as u8,
                        BinaryOperator::LtEq => (a[i] <= b[i]) as u8,
                        BinaryOperator::Gt => (a[i] & !b[i]) as u8,
                        BinaryOperator::GtEq => (a[i] >= b[i]) as u8,
                        _ => unreachable!(),
                    };
                }
            }
            (Series::Str(_, a), Series::Str(_, b)) => {
                for i in 0..a.len() {
                    out[i] = match op {
                        BinaryOperator::Eq => (a[i] == b[i]) as u8,
                        BinaryOperator::Neq => (a[i] != b[i]) as u8,
                        BinaryOperator::Lt => (a[i] < b[i]) as u8,
                        BinaryOperator::LtEq => (a[i] <= b[i]) as u8,
                        BinaryOperator::Gt => (a[i] > b[i]) as u8,
                        BinaryOperator::GtEq => (a[i] >= b[i]) as u8,
                        _ => unreachable!(),
                    };
                }
            }
            (Series::Categorical(_, _, _), Series::Categorical(_, _, _)) => {
                return self.as_string()?.compare_into(&other.as_string()?, op, out);
            }
            _ => unreachable!("dtype equality checked above"),
        }
        Ok(())
    }
}
