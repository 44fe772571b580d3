//! Reductions and statistics over a single column.
//!
//! NaN handling follows the engine's null encoding: `sum`/`mean` propagate
//! NaN, `min`/`max` skip it, `count` counts non-NaN values, and the
//! statistics (`median`/`quantile`/`var`/`std`/`skew`/`kurt`/`corr`) drop
//! NaN rows before computing. Insufficient data surfaces as `DomainError`.
//!
//! Unsigned columns support `sum`/`min`/`max`/`count` only; the moment-based
//! statistics stay `UnsupportedDType` for them until operator coverage for
//! unsigned dtypes is settled.

use crate::performance::simd;
use crate::series::Series;
use crate::types::Scalar;
use crate::GalleonError;
use num_traits::AsPrimitive;
use rayon::prelude::*;

fn widen<T: AsPrimitive<f64> + Sync + Copy>(values: &[T]) -> Vec<f64> {
    if values.len() >= 1 << 16 {
        values.par_iter().map(|v| v.as_()).collect()
    } else {
        values.iter().map(|v| v.as_()).collect()
    }
}

impl Series {
    fn agg_unsupported(&self, what: &str) -> GalleonError {
        GalleonError::UnsupportedDType(format!(
            "{} is not defined for {} column '{}'",
            what,
            self.dtype(),
            self.name()
        ))
    }

    /// Values widened to f64 for the moment statistics. Floats keep their
    /// NaNs; unsigned and non-numeric dtypes are rejected.
    fn stat_values(&self, what: &str) -> Result<Vec<f64>, GalleonError> {
        match self {
            Series::F64(_, v) => Ok(v.clone()),
            Series::F32(_, v) => Ok(widen(v)),
            Series::I64(_, v) => Ok(widen(v)),
            Series::I32(_, v) => Ok(widen(v)),
            _ => Err(self.agg_unsupported(what)),
        }
    }

    /// Sum of the column, in the column's dtype. Float NaN propagates.
    pub fn sum(&self) -> Result<Scalar, GalleonError> {
        match self {
            Series::F64(_, v) => Ok(Scalar::F64(simd::sum_f64(v))),
            Series::F32(_, v) => Ok(Scalar::F32(simd::sum_f32(v))),
            Series::I64(_, v) => Ok(Scalar::I64(simd::sum_i64(v))),
            Series::I32(_, v) => Ok(Scalar::I32(simd::sum_i32(v))),
            Series::U64(_, v) => Ok(Scalar::U64(simd::sum_u64(v))),
            Series::U32(_, v) => Ok(Scalar::U32(simd::sum_u32(v))),
            _ => Err(self.agg_unsupported("sum")),
        }
    }

    /// Arithmetic mean as f64. Float NaN propagates; an empty column is a
    /// domain error.
    pub fn mean(&self) -> Result<Scalar, GalleonError> {
        if self.is_empty() {
            return Err(GalleonError::DomainError(format!(
                "mean of empty column '{}'",
                self.name()
            )));
        }
        let values = self.stat_values("mean")?;
        Ok(Scalar::F64(simd::sum_f64(&values) / values.len() as f64))
    }

    /// Minimum value, skipping float NaN. Errors when no valid value exists.
    pub fn min(&self) -> Result<Scalar, GalleonError> {
        let no_valid = || {
            GalleonError::DomainError(format!("no valid values in column '{}'", self.name()))
        };
        match self {
            Series::F64(_, v) => simd::min_f64(v).map(Scalar::F64).ok_or_else(no_valid),
            Series::F32(_, v) => simd::min_f32(v).map(Scalar::F32).ok_or_else(no_valid),
            Series::I64(_, v) => simd::min_i64(v).map(Scalar::I64).ok_or_else(no_valid),
            Series::I32(_, v) => simd::min_i32(v).map(Scalar::I32).ok_or_else(no_valid),
            Series::U64(_, v) => simd::min_u64(v).map(Scalar::U64).ok_or_else(no_valid),
            Series::U32(_, v) => simd::min_u32(v).map(Scalar::U32).ok_or_else(no_valid),
            Series::Str(_, v) => v
                .iter()
                .min()
                .map(|s| Scalar::Str(s.clone()))
                .ok_or_else(no_valid),
            Series::DateTime(_, v) => {
                simd::min_i64(v).map(Scalar::DateTime).ok_or_else(no_valid)
            }
            Series::Duration(_, v) => {
                simd::min_i64(v).map(Scalar::Duration).ok_or_else(no_valid)
            }
            _ => Err(self.agg_unsupported("min")),
        }
    }

    /// Maximum value, skipping float NaN. Errors when no valid value exists.
    pub fn max(&self) -> Result<Scalar, GalleonError> {
        let no_valid = || {
            GalleonError::DomainError(format!("no valid values in column '{}'", self.name()))
        };
        match self {
            Series::F64(_, v) => simd::max_f64(v).map(Scalar::F64).ok_or_else(no_valid),
            Series::F32(_, v) => simd::max_f32(v).map(Scalar::F32).ok_or_else(no_valid),
            Series::I64(_, v) => simd::max_i64(v).map(Scalar::I64).ok_or_else(no_valid),
            Series::I32(_, v) => simd::max_i32(v).map(Scalar::I32).ok_or_else(no_valid),
            Series::U64(_, v) => simd::max_u64(v).map(Scalar::U64).ok_or_else(no_valid),
            Series::U32(_, v) => simd::max_u32(v).map(Scalar::U32).ok_or_else(no_valid),
            Series::Str(_, v) => v
                .iter()
                .max()
                .map(|s| Scalar::Str(s.clone()))
                .ok_or_else(no_valid),
            Series::DateTime(_, v) => {
                simd::max_i64(v).map(Scalar::DateTime).ok_or_else(no_valid)
            }
            Series::Duration(_, v) => {
                simd::max_i64(v).map(Scalar::Duration).ok_or_else(no_valid)
            }
            _ => Err(self.agg_unsupported("max")),
        }
    }

    /// Number of valid rows: non-NaN for float columns, all rows otherwise.
    pub fn count(&self) -> Scalar {
        let n = match self {
            Series::F64(_, v) => v.iter().filter(|x| !x.is_nan()).count(),
            Series::F32(_, v) => v.iter().filter(|x| !x.is_nan()).count(),
            _ => self.len(),
        };
        Scalar::U32(n as u32)
    }

    pub fn median(&self) -> Result<Scalar, GalleonError> {
        self.quantile(0.5)
    }

    /// Sort-based quantile at probability `q` in `[0, 1]`, nearest-rank.
    pub fn quantile(&self, q: f64) -> Result<Scalar, GalleonError> {
        if !(0.0..=1.0).contains(&q) {
            return Err(GalleonError::DomainError(format!(
                "quantile probability {} outside [0, 1]",
                q
            )));
        }
        let mut values: Vec<f64> = self
            .stat_values("quantile")?
            .into_iter()
            .filter(|v| !v.is_nan())
            .collect();
        if values.is_empty() {
            return Err(GalleonError::DomainError(format!(
                "quantile of column '{}' with no valid values",
                self.name()
            )));
        }
        if values.len() >= 1 << 16 {
            values.par_sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        } else {
            values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        }
        let pos = ((values.len() - 1) as f64 * q).round() as usize;
        Ok(Scalar::F64(values[pos]))
    }

    /// Two-pass sample variance (ddof = 1) over non-NaN values; needs at
    /// least two of them.
    pub fn var(&self) -> Result<Scalar, GalleonError> {
        let values: Vec<f64> = self
            .stat_values("var")?
            .into_iter()
            .filter(|v| !v.is_nan())
            .collect();
        simd::variance_f64(&values)
            .map(Scalar::F64)
            .ok_or_else(|| {
                GalleonError::DomainError(format!(
                    "variance of column '{}' needs at least 2 values, got {}",
                    self.name(),
                    values.len()
                ))
            })
    }

    pub fn std(&self) -> Result<Scalar, GalleonError> {
        match self.var()? {
            Scalar::F64(v) => Ok(Scalar::F64(v.sqrt())),
            _ => unreachable!(),
        }
    }

    /// Sample skewness (`m3 / m2^1.5`); needs at least three valid values
    /// and nonzero variance.
    pub fn skew(&self) -> Result<Scalar, GalleonError> {
        let values: Vec<f64> = self
            .stat_values("skew")?
            .into_iter()
            .filter(|v| !v.is_nan())
            .collect();
        if values.len() < 3 {
            return Err(GalleonError::DomainError(format!(
                "skew of column '{}' needs at least 3 values, got {}",
                self.name(),
                values.len()
            )));
        }
        let (m2, m3, _) = central_moments(&values);
        if m2 == 0.0 {
            return Err(GalleonError::DomainError(format!(
                "skew of column '{}' with zero variance",
                self.name()
            )));
        }
        Ok(Scalar::F64(m3 / m2.powf(1.5)))
    }

    /// Excess kurtosis (`m4 / m2^2 - 3`); needs at least four valid values
    /// and nonzero variance.
    pub fn kurt(&self) -> Result<Scalar, GalleonError> {
        let values: Vec<f64> = self
            .stat_values("kurt")?
            .into_iter()
            .filter(|v| !v.is_nan())
            .collect();
        if values.len() < 4 {
            return Err(GalleonError::DomainError(format!(
                "kurt of column '{}' needs at least 4 values, got {}",
                self.name(),
                values.len()
            )));
        }
        let (m2, _, m4) = central_moments(&values);
        if m2 == 0.0 {
            return Err(GalleonError::DomainError(format!(
                "kurt of column '{}' with zero variance",
                self.name()
            )));
        }
        Ok(Scalar::F64(m4 / (m2 * m2) - 3.0))
    }

    /// Pearson correlation with another column. Rows where either side is
    /// NaN are dropped; needs at least two pairs and nonzero variance on
    /// both sides.
    pub fn corr(&self, other: &Series) -> Result<Scalar, GalleonError> {
        if self.len() != other.len() {
            return Err(GalleonError::LengthMismatch(format!(
                "corr over columns '{}' ({} rows) and '{}' ({} rows)",
                self.name(),
                self.len(),
                other.name(),
                other.len()
            )));
        }
        let xs = self.stat_values("corr")?;
        let ys = other.stat_values("corr")?;
        let pairs: Vec<(f64, f64)> = xs
            .into_iter()
            .zip(ys)
            .filter(|(x, y)| !x.is_nan() && !y.is_nan())
            .collect();
        if pairs.len() < 2 {
            return Err(GalleonError::DomainError(format!(
                "corr of columns '{}' and '{}' needs at least 2 pairs, got {}",
                self.name(),
                other.name(),
                pairs.len()
            )));
        }
        let n = pairs.len() as f64;
        let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for (x, y) in &pairs {
            let dx = x - mean_x;
            let dy = y - mean_y;
            cov += dx * dy;
            var_x += dx * dx;
            var_y += dy * dy;
        }
        if var_x == 0.0 || var_y == 0.0 {
            return Err(GalleonError::DomainError(format!(
                "corr of columns '{}' and '{}' with a zero-variance side",
                self.name(),
                other.name()
            )));
        }
        Ok(Scalar::F64(cov / (var_x * var_y).sqrt()))
    }
}

/// Second, third and fourth central moments (population normalization).
fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let mut m2 = 0.0;
    let mut m3 = 0.0;
    let mut m4 = 0.0;
    for v in values {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_keeps_dtype() {
        assert_eq!(
            Series::new_i32("x", vec![1, 2, 3]).sum().unwrap(),
            Scalar::I32(6)
        );
        assert_eq!(
            Series::new_u64("x", vec![1, 2, 3]).sum().unwrap(),
            Scalar::U64(6)
        );
    }

    #[test]
    fn test_sum_propagates_nan_min_skips() {
        let s = Series::new_f64("x", vec![1.0, f64::NAN, 3.0]);
        assert!(matches!(s.sum().unwrap(), Scalar::F64(v) if v.is_nan()));
        assert_eq!(s.min().unwrap(), Scalar::F64(1.0));
        assert_eq!(s.max().unwrap(), Scalar::F64(3.0));
        assert_eq!(s.count(), Scalar::U32(2));
    }

    #[test]
    fn test_quantile_domain() {
        let s = Series::new_f64("x", vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            s.quantile(1.5).unwrap_err(),
            GalleonError::DomainError(_)
        ));
        assert_eq!(s.quantile(0.5).unwrap(), Scalar::F64(2.0));
        assert_eq!(s.median().unwrap(), Scalar::F64(2.0));
    }

    #[test]
    fn test_var_std_minimum_count() {
        let s = Series::new_f64("x", vec![1.0]);
        assert!(matches!(s.var().unwrap_err(), GalleonError::DomainError(_)));
        let s = Series::new_f64("x", vec![1.0, 3.0]);
        assert_eq!(s.var().unwrap(), Scalar::F64(2.0));
    }

    #[test]
    fn test_skew_kurt_arity() {
        let s = Series::new_f64("x", vec![1.0, 2.0]);
        assert!(matches!(s.skew().unwrap_err(), GalleonError::DomainError(_)));
        let s = Series::new_f64("x", vec![1.0, 2.0, 3.0]);
        assert_eq!(s.skew().unwrap(), Scalar::F64(0.0));
        assert!(matches!(s.kurt().unwrap_err(), GalleonError::DomainError(_)));
    }

    #[test]
    fn test_corr_perfect_and_degenerate() {
        let x = Series::new_f64("x", vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = Series::new_f64("y", vec![2.0, 4.0, 6.0, 8.0, 10.0]);
        let Scalar::F64(r) = x.corr(&y).unwrap() else {
            panic!()
        };
        assert!((r - 1.0).abs() < 1e-6);

        let flat = Series::new_f64("y", vec![1.0; 5]);
        assert!(matches!(
            x.corr(&flat).unwrap_err(),
            GalleonError::DomainError(_)
        ));
    }

    #[test]
    fn test_unsigned_statistics_unsupported() {
        let s = Series::new_u32("x", vec![1, 2, 3]);
        assert!(matches!(
            s.mean().unwrap_err(),
            GalleonError::UnsupportedDType(_)
        ));
        assert!(matches!(
            s.var().unwrap_err(),
            GalleonError::UnsupportedDType(_)
        ));
        assert_eq!(s.min().unwrap(), Scalar::U32(1));
    }
}
