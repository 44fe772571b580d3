//! Row and column selection over a frame.

use crate::dataframe::DataFrame;
use crate::series::Series;
use crate::GalleonError;

impl DataFrame {
    /// Projects the named columns, in the given order.
    pub fn select_columns(&self, names: &[&str]) -> Result<DataFrame, GalleonError> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push(self.column_by_name(name)?.clone());
        }
        DataFrame::new(columns)
    }

    /// Gathers the rows at `indices` from every column.
    pub fn take(&self, indices: &[usize]) -> Result<DataFrame, GalleonError> {
        let columns = self
            .columns()
            .iter()
            .map(|s| s.take(indices))
            .collect::<Result<Vec<Series>, GalleonError>>()?;
        DataFrame::new(columns)
    }

    /// Keeps the rows where `mask` is nonzero. The mask length must equal
    /// the frame height.
    pub fn filter_mask(&self, mask: &[u8]) -> Result<DataFrame, GalleonError> {
        if mask.len() != self.height() {
            return Err(GalleonError::LengthMismatch(format!(
                "mask of length {} applied to frame of height {}",
                mask.len(),
                self.height()
            )));
        }
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| (m != 0).then_some(i))
            .collect();
        self.take(&indices)
    }

    /// Copies the rows in `range` (clamped) from every column.
    pub fn slice(&self, range: std::ops::Range<usize>) -> DataFrame {
        let len = range.end.saturating_sub(range.start);
        let columns = self
            .columns()
            .iter()
            .map(|s| s.slice(range.start, len))
            .collect();
        DataFrame::new(columns).expect("slice preserves frame invariants")
    }

    /// First `n` rows of every column; `n` is clamped to the height.
    pub fn head(&self, n: usize) -> DataFrame {
        let columns = self.columns().iter().map(|s| s.head(n)).collect();
        // Clamping cannot introduce ragged lengths or duplicate names.
        DataFrame::new(columns).expect("head preserves frame invariants")
    }

    /// Element-wise equality treating float values bitwise (NaN == NaN),
    /// so materialized results can be compared exactly.
    pub fn frame_equal(&self, other: &DataFrame) -> bool {
        self.width() == other.width()
            && self.height() == other.height()
            && self
                .columns()
                .iter()
                .zip(other.columns())
                .all(|(a, b)| a.series_equal(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Series::new_i64("id", vec![1, 2, 3, 4]),
            Series::new_f64("x", vec![1.5, 2.5, 3.5, 4.5]),
        ])
        .unwrap()
    }

    #[test]
    fn test_select_columns_reorders() {
        let df = sample().select_columns(&["x", "id"]).unwrap();
        assert_eq!(df.column_names(), vec!["x", "id"]);
    }

    #[test]
    fn test_select_unknown_column() {
        assert!(matches!(
            sample().select_columns(&["nope"]).unwrap_err(),
            GalleonError::ColumnNotFound(_)
        ));
    }

    #[test]
    fn test_filter_mask_keeps_schema() {
        let df = sample().filter_mask(&[1, 0, 0, 1]).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column_by_name("id").unwrap().i64().unwrap(), &[1, 4]);

        let empty = sample().filter_mask(&[0, 0, 0, 0]).unwrap();
        assert_eq!(empty.height(), 0);
        assert_eq!(empty.schema(), sample().schema());
    }

    #[test]
    fn test_frame_equal_with_nan() {
        let a = DataFrame::new(vec![Series::new_f64("x", vec![f64::NAN, 1.0])]).unwrap();
        let b = DataFrame::new(vec![Series::new_f64("x", vec![f64::NAN, 1.0])]).unwrap();
        assert!(a.frame_equal(&b));
        assert_ne!(a, b); // derived equality treats NaN as unequal
    }
}
