use crate::lazy::LazyFrame;
use crate::schema::Schema;
use crate::series::Series;
use crate::types::DType;
use crate::GalleonError;

pub mod group_by;
pub mod join;
pub mod manipulation;

/// A tabular data structure: an ordered list of equal-length [`Series`]
/// with unique column names.
///
/// DataFrames are logically immutable at the user boundary; every operation
/// produces a new frame. Internally the engine moves and reuses buffers.
///
/// # Examples
///
/// ```rust
/// use galleon::dataframe::DataFrame;
/// use galleon::series::Series;
///
/// let df = DataFrame::new(vec![
///     Series::new_i64("id", vec![1, 2, 3]),
///     Series::new_f64("x", vec![10.0, 20.0, 30.0]),
/// ])
/// .unwrap();
/// assert_eq!(df.width(), 2);
/// assert_eq!(df.height(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    columns: Vec<Series>,
    height: usize,
}

impl DataFrame {
    /// Creates a frame from columns, validating name uniqueness and equal
    /// lengths.
    pub fn new(columns: Vec<Series>) -> Result<Self, GalleonError> {
        let mut seen = fxhash::FxHashSet::default();
        for series in &columns {
            if !seen.insert(series.name().to_string()) {
                return Err(GalleonError::DuplicateColumn(series.name().to_string()));
            }
        }
        let height = columns.first().map(|s| s.len()).unwrap_or(0);
        for series in &columns {
            if series.len() != height {
                return Err(GalleonError::LengthMismatch(format!(
                    "column '{}' has {} rows, expected {}",
                    series.name(),
                    series.len(),
                    height
                )));
            }
        }
        Ok(DataFrame { columns, height })
    }

    /// An empty frame with no columns and no rows.
    pub fn empty() -> Self {
        DataFrame {
            columns: Vec::new(),
            height: 0,
        }
    }

    /// A zero-row frame whose columns match `schema`.
    pub fn empty_from_schema(schema: &Schema) -> Result<Self, GalleonError> {
        let mut columns = Vec::with_capacity(schema.len());
        for (name, dtype) in schema.iter() {
            let series = match dtype {
                DType::F64 => Series::new_f64(name, Vec::new()),
                DType::F32 => Series::new_f32(name, Vec::new()),
                DType::I64 => Series::new_i64(name, Vec::new()),
                DType::I32 => Series::new_i32(name, Vec::new()),
                DType::U64 => Series::new_u64(name, Vec::new()),
                DType::U32 => Series::new_u32(name, Vec::new()),
                DType::Bool => Series::new_bool(name, Vec::new()),
                DType::Str => Series::new_string(name, Vec::new()),
                DType::Categorical => Series::new_categorical(name, Vec::new(), Vec::new())?,
                DType::DateTime => Series::new_datetime(name, Vec::new()),
                DType::Duration => Series::new_duration(name, Vec::new()),
                DType::Null => {
                    return Err(GalleonError::UnsupportedDType(
                        "a frame column cannot have dtype null".to_string(),
                    ))
                }
            };
            columns.push(series);
        }
        DataFrame::new(columns)
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (0 when the frame has no columns).
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    pub fn column(&self, i: usize) -> Option<&Series> {
        self.columns.get(i)
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    /// Borrowed reference to the column named `name`.
    pub fn column_by_name(&self, name: &str) -> Result<&Series, GalleonError> {
        self.columns
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| GalleonError::ColumnNotFound(name.to_string()))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|s| s.name()).collect()
    }

    /// The frame's schema, in column order.
    pub fn schema(&self) -> Schema {
        let fields = self
            .columns
            .iter()
            .map(|s| (s.name().to_string(), s.dtype()))
            .collect();
        // Column names are unique by construction.
        Schema::from_fields(fields).expect("frame columns are unique")
    }

    /// Vertically concatenates `other` below this frame. Schemas must match
    /// exactly (names, dtypes, order).
    pub fn concat(&self, other: &DataFrame) -> Result<DataFrame, GalleonError> {
        if self.width() != other.width() {
            return Err(GalleonError::LengthMismatch(format!(
                "cannot concat frames of width {} and {}",
                self.width(),
                other.width()
            )));
        }
        let mut columns = Vec::with_capacity(self.width());
        for (left, right) in self.columns.iter().zip(&other.columns) {
            if left.name() != right.name() {
                return Err(GalleonError::DTypeMismatch(format!(
                    "cannot concat column '{}' with column '{}'",
                    left.name(),
                    right.name()
                )));
            }
            columns.push(left.append(right)?);
        }
        DataFrame::new(columns)
    }

    /// Converts this frame into a deferred query plan.
    pub fn lazy(self) -> LazyFrame {
        LazyFrame::from_dataframe(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_duplicates() {
        let err = DataFrame::new(vec![
            Series::new_i64("a", vec![1]),
            Series::new_f64("a", vec![1.0]),
        ])
        .unwrap_err();
        assert_eq!(err, GalleonError::DuplicateColumn("a".to_string()));
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let err = DataFrame::new(vec![
            Series::new_i64("a", vec![1, 2]),
            Series::new_f64("b", vec![1.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, GalleonError::LengthMismatch(_)));
    }

    #[test]
    fn test_columns_keep_order() {
        let df = DataFrame::new(vec![
            Series::new_i64("z", vec![1]),
            Series::new_i64("a", vec![2]),
            Series::new_i64("m", vec![3]),
        ])
        .unwrap();
        assert_eq!(df.column_names(), vec!["z", "a", "m"]);
        assert_eq!(df.schema().names(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_concat_heights_add() {
        let a = DataFrame::new(vec![Series::new_i64("x", vec![1, 2])]).unwrap();
        let b = DataFrame::new(vec![Series::new_i64("x", vec![3])]).unwrap();
        let out = a.concat(&b).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(out.column_by_name("x").unwrap().i64().unwrap(), &[1, 2, 3]);
    }
}
