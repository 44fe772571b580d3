use crate::types::{DType, Scalar};
use crate::GalleonError;

pub mod aggregations;
pub mod arithmetic;
pub mod categorical;

/// A typed, named, contiguous column of values.
///
/// `Series` is a tagged union with one variant per [`DType`]; each variant
/// owns its buffer. There is no null bitmap: float nulls are encoded as NaN,
/// and integer/string columns have no null representation.
///
/// # Examples
///
/// ```rust
/// use galleon::series::Series;
/// use galleon::types::DType;
///
/// let s = Series::new_f64("x", vec![1.0, 2.0, 3.0]);
/// assert_eq!(s.len(), 3);
/// assert_eq!(s.dtype(), DType::F64);
/// assert_eq!(s.f64().unwrap(), &[1.0, 2.0, 3.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    F64(String, Vec<f64>),
    F32(String, Vec<f32>),
    I64(String, Vec<i64>),
    I32(String, Vec<i32>),
    U64(String, Vec<u64>),
    U32(String, Vec<u32>),
    Bool(String, Vec<bool>),
    Str(String, Vec<String>),
    /// Dictionary-encoded strings: ordered unique dictionary plus one code
    /// per row, each a valid index into the dictionary.
    Categorical(String, Vec<String>, Vec<u32>),
    /// Unix timestamps in nanoseconds.
    DateTime(String, Vec<i64>),
    /// Elapsed nanoseconds.
    Duration(String, Vec<i64>),
}

impl Series {
    pub fn new_f64(name: &str, data: Vec<f64>) -> Self {
        Series::F64(name.to_string(), data)
    }

    pub fn new_f32(name: &str, data: Vec<f32>) -> Self {
        Series::F32(name.to_string(), data)
    }

    pub fn new_i64(name: &str, data: Vec<i64>) -> Self {
        Series::I64(name.to_string(), data)
    }

    pub fn new_i32(name: &str, data: Vec<i32>) -> Self {
        Series::I32(name.to_string(), data)
    }

    pub fn new_u64(name: &str, data: Vec<u64>) -> Self {
        Series::U64(name.to_string(), data)
    }

    pub fn new_u32(name: &str, data: Vec<u32>) -> Self {
        Series::U32(name.to_string(), data)
    }

    pub fn new_bool(name: &str, data: Vec<bool>) -> Self {
        Series::Bool(name.to_string(), data)
    }

    pub fn new_string(name: &str, data: Vec<String>) -> Self {
        Series::Str(name.to_string(), data)
    }

    pub fn new_datetime(name: &str, data: Vec<i64>) -> Self {
        Series::DateTime(name.to_string(), data)
    }

    pub fn new_duration(name: &str, data: Vec<i64>) -> Self {
        Series::Duration(name.to_string(), data)
    }

    /// Builds a categorical column from an explicit dictionary and codes.
    /// The dictionary must be unique and every code a valid index.
    pub fn new_categorical(
        name: &str,
        dictionary: Vec<String>,
        codes: Vec<u32>,
    ) -> Result<Self, GalleonError> {
        let mut seen = fxhash::FxHashSet::default();
        for entry in &dictionary {
            if !seen.insert(entry) {
                return Err(GalleonError::DomainError(format!(
                    "categorical dictionary entry '{}' is not unique",
                    entry
                )));
            }
        }
        if let Some(&bad) = codes.iter().find(|&&c| c as usize >= dictionary.len()) {
            return Err(GalleonError::DomainError(format!(
                "categorical code {} out of range for dictionary of {}",
                bad,
                dictionary.len()
            )));
        }
        Ok(Series::Categorical(name.to_string(), dictionary, codes))
    }

    /// Builds a column of dtype `dtype` from scalars. Every scalar must
    /// carry the matching variant; `Scalar::Null` is accepted for float
    /// columns (as NaN).
    pub(crate) fn from_scalars(
        name: &str,
        dtype: DType,
        scalars: Vec<Scalar>,
    ) -> Result<Series, GalleonError> {
        let n = scalars.len();
        let mismatch = |got: &Scalar| {
            GalleonError::DTypeMismatch(format!(
                "column '{}' expected {} values, got {:?}",
                name, dtype, got
            ))
        };
        macro_rules! collect {
            ($variant:ident, $ctor:ident, $ty:ty) => {{
                let mut out: Vec<$ty> = Vec::with_capacity(n);
                for s in scalars {
                    match s {
                        Scalar::$variant(v) => out.push(v),
                        other => return Err(mismatch(&other)),
                    }
                }
                Series::$ctor(name, out)
            }};
        }
        Ok(match dtype {
            DType::F64 => {
                let mut out = Vec::with_capacity(n);
                for s in scalars {
                    match s {
                        Scalar::F64(v) => out.push(v),
                        Scalar::Null => out.push(f64::NAN),
                        other => return Err(mismatch(&other)),
                    }
                }
                Series::new_f64(name, out)
            }
            DType::F32 => {
                let mut out = Vec::with_capacity(n);
                for s in scalars {
                    match s {
                        Scalar::F32(v) => out.push(v),
                        Scalar::Null => out.push(f32::NAN),
                        other => return Err(mismatch(&other)),
                    }
                }
                Series::new_f32(name, out)
            }
            DType::I64 => collect!(I64, new_i64, i64),
            DType::I32 => collect!(I32, new_i32, i32),
            DType::U64 => collect!(U64, new_u64, u64),
            DType::U32 => collect!(U32, new_u32, u32),
            DType::Bool => collect!(Bool, new_bool, bool),
            DType::Str => collect!(Str, new_string, String),
            DType::DateTime => collect!(DateTime, new_datetime, i64),
            DType::Duration => collect!(Duration, new_duration, i64),
            DType::Categorical | DType::Null => {
                return Err(GalleonError::UnsupportedDType(format!(
                    "cannot build a {} column from scalars",
                    dtype
                )))
            }
        })
    }

    /// A length-`len` column filled with `value`. `Scalar::Null` fills an
    /// all-NaN f64 column (NaN being the engine's null encoding).
    pub fn full(name: &str, value: &Scalar, len: usize) -> Result<Self, GalleonError> {
        Ok(match value {
            Scalar::Null => Series::F64(name.to_string(), vec![f64::NAN; len]),
            Scalar::F64(v) => Series::F64(name.to_string(), vec![*v; len]),
            Scalar::F32(v) => Series::F32(name.to_string(), vec![*v; len]),
            Scalar::I64(v) => Series::I64(name.to_string(), vec![*v; len]),
            Scalar::I32(v) => Series::I32(name.to_string(), vec![*v; len]),
            Scalar::U64(v) => Series::U64(name.to_string(), vec![*v; len]),
            Scalar::U32(v) => Series::U32(name.to_string(), vec![*v; len]),
            Scalar::Bool(v) => Series::Bool(name.to_string(), vec![*v; len]),
            Scalar::Str(v) => Series::Str(name.to_string(), vec![v.clone(); len]),
            Scalar::DateTime(v) => Series::DateTime(name.to_string(), vec![*v; len]),
            Scalar::Duration(v) => Series::Duration(name.to_string(), vec![*v; len]),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Series::F64(name, _)
            | Series::F32(name, _)
            | Series::I64(name, _)
            | Series::I32(name, _)
            | Series::U64(name, _)
            | Series::U32(name, _)
            | Series::Bool(name, _)
            | Series::Str(name, _)
            | Series::DateTime(name, _)
            | Series::Duration(name, _) => name,
            Series::Categorical(name, _, _) => name,
        }
    }

    pub fn rename(&mut self, name: &str) {
        let slot = match self {
            Series::F64(n, _)
            | Series::F32(n, _)
            | Series::I64(n, _)
            | Series::I32(n, _)
            | Series::U64(n, _)
            | Series::U32(n, _)
            | Series::Bool(n, _)
            | Series::Str(n, _)
            | Series::DateTime(n, _)
            | Series::Duration(n, _) => n,
            Series::Categorical(n, _, _) => n,
        };
        *slot = name.to_string();
    }

    /// Consuming variant of [`Series::rename`] for builder-style call sites.
    pub fn with_name(mut self, name: &str) -> Self {
        self.rename(name);
        self
    }

    pub fn len(&self) -> usize {
        match self {
            Series::F64(_, v) => v.len(),
            Series::F32(_, v) => v.len(),
            Series::I64(_, v) => v.len(),
            Series::I32(_, v) => v.len(),
            Series::U64(_, v) => v.len(),
            Series::U32(_, v) => v.len(),
            Series::Bool(_, v) => v.len(),
            Series::Str(_, v) => v.len(),
            Series::Categorical(_, _, codes) => codes.len(),
            Series::DateTime(_, v) => v.len(),
            Series::Duration(_, v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            Series::F64(_, _) => DType::F64,
            Series::F32(_, _) => DType::F32,
            Series::I64(_, _) => DType::I64,
            Series::I32(_, _) => DType::I32,
            Series::U64(_, _) => DType::U64,
            Series::U32(_, _) => DType::U32,
            Series::Bool(_, _) => DType::Bool,
            Series::Str(_, _) => DType::Str,
            Series::Categorical(_, _, _) => DType::Categorical,
            Series::DateTime(_, _) => DType::DateTime,
            Series::Duration(_, _) => DType::Duration,
        }
    }

    /// Bytes per element of the backing buffer, `-1` for variable width.
    pub fn bytes_per_element(&self) -> i64 {
        match self {
            Series::F64(_, _) => std::mem::size_of::<f64>() as i64,
            Series::F32(_, _) => std::mem::size_of::<f32>() as i64,
            Series::I64(_, _) => std::mem::size_of::<i64>() as i64,
            Series::I32(_, _) => std::mem::size_of::<i32>() as i64,
            Series::U64(_, _) => std::mem::size_of::<u64>() as i64,
            Series::U32(_, _) => std::mem::size_of::<u32>() as i64,
            Series::Bool(_, _) => std::mem::size_of::<bool>() as i64,
            Series::Str(_, _) | Series::Categorical(_, _, _) => -1,
            Series::DateTime(_, _) | Series::Duration(_, _) => std::mem::size_of::<i64>() as i64,
        }
    }

    /// Boxed scalar at `i` for external introspection. Out-of-range reads
    /// yield `None`; a float NaN reads back as `Scalar::Null`.
    pub fn get(&self, i: usize) -> Option<Scalar> {
        if i >= self.len() {
            return None;
        }
        Some(match self {
            Series::F64(_, v) => {
                if v[i].is_nan() {
                    Scalar::Null
                } else {
                    Scalar::F64(v[i])
                }
            }
            Series::F32(_, v) => {
                if v[i].is_nan() {
                    Scalar::Null
                } else {
                    Scalar::F32(v[i])
                }
            }
            Series::I64(_, v) => Scalar::I64(v[i]),
            Series::I32(_, v) => Scalar::I32(v[i]),
            Series::U64(_, v) => Scalar::U64(v[i]),
            Series::U32(_, v) => Scalar::U32(v[i]),
            Series::Bool(_, v) => Scalar::Bool(v[i]),
            Series::Str(_, v) => Scalar::Str(v[i].clone()),
            Series::Categorical(_, dict, codes) => Scalar::Str(dict[codes[i] as usize].clone()),
            Series::DateTime(_, v) => Scalar::DateTime(v[i]),
            Series::Duration(_, v) => Scalar::Duration(v[i]),
        })
    }

    // -- typed accessors ----------------------------------------------------

    fn accessor_mismatch(&self, wanted: DType) -> GalleonError {
        GalleonError::DTypeMismatch(format!(
            "column '{}' is {}, not {}",
            self.name(),
            self.dtype(),
            wanted
        ))
    }

    pub fn f64(&self) -> Result<&[f64], GalleonError> {
        match self {
            Series::F64(_, v) => Ok(v),
            _ => Err(self.accessor_mismatch(DType::F64)),
        }
    }

    pub fn f32(&self) -> Result<&[f32], GalleonError> {
        match self {
            Series::F32(_, v) => Ok(v),
            _ => Err(self.accessor_mismatch(DType::F32)),
        }
    }

    pub fn i64(&self) -> Result<&[i64], GalleonError> {
        match self {
            Series::I64(_, v) => Ok(v),
            _ => Err(self.accessor_mismatch(DType::I64)),
        }
    }

    pub fn i32(&self) -> Result<&[i32], GalleonError> {
        match self {
            Series::I32(_, v) => Ok(v),
            _ => Err(self.accessor_mismatch(DType::I32)),
        }
    }

    pub fn u64(&self) -> Result<&[u64], GalleonError> {
        match self {
            Series::U64(_, v) => Ok(v),
            _ => Err(self.accessor_mismatch(DType::U64)),
        }
    }

    pub fn u32(&self) -> Result<&[u32], GalleonError> {
        match self {
            Series::U32(_, v) => Ok(v),
            _ => Err(self.accessor_mismatch(DType::U32)),
        }
    }

    pub fn bool(&self) -> Result<&[bool], GalleonError> {
        match self {
            Series::Bool(_, v) => Ok(v),
            _ => Err(self.accessor_mismatch(DType::Bool)),
        }
    }

    pub fn str(&self) -> Result<&[String], GalleonError> {
        match self {
            Series::Str(_, v) => Ok(v),
            _ => Err(self.accessor_mismatch(DType::Str)),
        }
    }

    /// Borrowed `(dictionary, codes)` of a categorical column.
    pub fn categorical(&self) -> Result<(&[String], &[u32]), GalleonError> {
        match self {
            Series::Categorical(_, dict, codes) => Ok((dict, codes)),
            _ => Err(self.accessor_mismatch(DType::Categorical)),
        }
    }

    pub fn datetime(&self) -> Result<&[i64], GalleonError> {
        match self {
            Series::DateTime(_, v) => Ok(v),
            _ => Err(self.accessor_mismatch(DType::DateTime)),
        }
    }

    pub fn duration(&self) -> Result<&[i64], GalleonError> {
        match self {
            Series::Duration(_, v) => Ok(v),
            _ => Err(self.accessor_mismatch(DType::Duration)),
        }
    }

    // -- slicing and reshaping ----------------------------------------------

    /// First `n` rows; `n` is clamped to the column length.
    pub fn head(&self, n: usize) -> Series {
        let n = n.min(self.len());
        self.take_unchecked_range(0, n)
    }

    /// Last `n` rows; `n` is clamped to the column length.
    pub fn tail(&self, n: usize) -> Series {
        let n = n.min(self.len());
        self.take_unchecked_range(self.len() - n, self.len())
    }

    /// Copies the rows in `offset..offset + len`, clamped to the column.
    pub fn slice(&self, offset: usize, len: usize) -> Series {
        let start = offset.min(self.len());
        let end = (offset + len).min(self.len());
        self.take_unchecked_range(start, end)
    }

    fn take_unchecked_range(&self, start: usize, end: usize) -> Series {
        match self {
            Series::F64(n, v) => Series::F64(n.clone(), v[start..end].to_vec()),
            Series::F32(n, v) => Series::F32(n.clone(), v[start..end].to_vec()),
            Series::I64(n, v) => Series::I64(n.clone(), v[start..end].to_vec()),
            Series::I32(n, v) => Series::I32(n.clone(), v[start..end].to_vec()),
            Series::U64(n, v) => Series::U64(n.clone(), v[start..end].to_vec()),
            Series::U32(n, v) => Series::U32(n.clone(), v[start..end].to_vec()),
            Series::Bool(n, v) => Series::Bool(n.clone(), v[start..end].to_vec()),
            Series::Str(n, v) => Series::Str(n.clone(), v[start..end].to_vec()),
            Series::Categorical(n, dict, codes) => {
                Series::Categorical(n.clone(), dict.clone(), codes[start..end].to_vec())
            }
            Series::DateTime(n, v) => Series::DateTime(n.clone(), v[start..end].to_vec()),
            Series::Duration(n, v) => Series::Duration(n.clone(), v[start..end].to_vec()),
        }
    }

    /// Gathers the rows at `indices`, in order.
    pub fn take(&self, indices: &[usize]) -> Result<Series, GalleonError> {
        let len = self.len();
        if let Some(&bad) = indices.iter().find(|&&i| i >= len) {
            return Err(GalleonError::DomainError(format!(
                "take index {} out of bounds for column '{}' of length {}",
                bad,
                self.name(),
                len
            )));
        }
        Ok(match self {
            Series::F64(n, v) => Series::F64(n.clone(), indices.iter().map(|&i| v[i]).collect()),
            Series::F32(n, v) => Series::F32(n.clone(), indices.iter().map(|&i| v[i]).collect()),
            Series::I64(n, v) => Series::I64(n.clone(), indices.iter().map(|&i| v[i]).collect()),
            Series::I32(n, v) => Series::I32(n.clone(), indices.iter().map(|&i| v[i]).collect()),
            Series::U64(n, v) => Series::U64(n.clone(), indices.iter().map(|&i| v[i]).collect()),
            Series::U32(n, v) => Series::U32(n.clone(), indices.iter().map(|&i| v[i]).collect()),
            Series::Bool(n, v) => Series::Bool(n.clone(), indices.iter().map(|&i| v[i]).collect()),
            Series::Str(n, v) => {
                Series::Str(n.clone(), indices.iter().map(|&i| v[i].clone()).collect())
            }
            Series::Categorical(n, dict, codes) => Series::Categorical(
                n.clone(),
                dict.clone(),
                indices.iter().map(|&i| codes[i]).collect(),
            ),
            Series::DateTime(n, v) => {
                Series::DateTime(n.clone(), indices.iter().map(|&i| v[i]).collect())
            }
            Series::Duration(n, v) => {
                Series::Duration(n.clone(), indices.iter().map(|&i| v[i]).collect())
            }
        })
    }

    /// Keeps the rows where `mask` is nonzero. The mask length must equal
    /// the column length.
    pub fn filter_mask(&self, mask: &[u8]) -> Result<Series, GalleonError> {
        if mask.len() != self.len() {
            return Err(GalleonError::LengthMismatch(format!(
                "mask of length {} applied to column '{}' of length {}",
                mask.len(),
                self.name(),
                self.len()
            )));
        }
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| (m != 0).then_some(i))
            .collect();
        self.take(&indices)
    }

    /// Appends `other` to this column. Dtypes must match.
    pub fn append(&self, other: &Series) -> Result<Series, GalleonError> {
        if self.dtype() != other.dtype() {
            return Err(GalleonError::DTypeMismatch(format!(
                "cannot append {} column '{}' to {} column '{}'",
                other.dtype(),
                other.name(),
                self.dtype(),
                self.name()
            )));
        }
        match (self, other) {
            (Series::F64(n, a), Series::F64(_, b)) => {
                Ok(Series::F64(n.clone(), [a.as_slice(), b].concat()))
            }
            (Series::F32(n, a), Series::F32(_, b)) => {
                Ok(Series::F32(n.clone(), [a.as_slice(), b].concat()))
            }
            (Series::I64(n, a), Series::I64(_, b)) => {
                Ok(Series::I64(n.clone(), [a.as_slice(), b].concat()))
            }
            (Series::I32(n, a), Series::I32(_, b)) => {
                Ok(Series::I32(n.clone(), [a.as_slice(), b].concat()))
            }
            (Series::U64(n, a), Series::U64(_, b)) => {
                Ok(Series::U64(n.clone(), [a.as_slice(), b].concat()))
            }
            (Series::U32(n, a), Series::U32(_, b)) => {
                Ok(Series::U32(n.clone(), [a.as_slice(), b].concat()))
            }
            (Series::Bool(n, a), Series::Bool(_, b)) => {
                Ok(Series::Bool(n.clone(), [a.as_slice(), b].concat()))
            }
            (Series::Str(n, a), Series::Str(_, b)) => {
                Ok(Series::Str(n.clone(), [a.as_slice(), b].concat()))
            }
            (Series::DateTime(n, a), Series::DateTime(_, b)) => {
                Ok(Series::DateTime(n.clone(), [a.as_slice(), b].concat()))
            }
            (Series::Duration(n, a), Series::Duration(_, b)) => {
                Ok(Series::Duration(n.clone(), [a.as_slice(), b].concat()))
            }
            (Series::Categorical(_, _, _), Series::Categorical(_, _, _)) => {
                // Dictionaries may differ; round-trip through strings and
                // re-encode so codes stay consistent.
                let left = self.as_string()?;
                let right = other.as_string()?;
                left.append(&right)?.as_categorical()
            }
            _ => unreachable!("dtype equality checked above"),
        }
    }

    /// Concatenates a non-empty list of same-dtype columns.
    pub fn concat(series_list: &[Series]) -> Result<Series, GalleonError> {
        let mut iter = series_list.iter();
        let first = iter.next().ok_or_else(|| {
            GalleonError::LengthMismatch("cannot concatenate an empty list of series".to_string())
        })?;
        let mut out = first.clone();
        for s in iter {
            out = out.append(s)?;
        }
        Ok(out)
    }

    /// Element-wise equality that treats float values bitwise, so NaN equals
    /// NaN. Names must match too.
    pub fn series_equal(&self, other: &Series) -> bool {
        if self.name() != other.name() || self.dtype() != other.dtype() || self.len() != other.len()
        {
            return false;
        }
        match (self, other) {
            (Series::F64(_, a), Series::F64(_, b)) => a
                .iter()
                .zip(b)
                .all(|(x, y)| x.to_bits() == y.to_bits()),
            (Series::F32(_, a), Series::F32(_, b)) => a
                .iter()
                .zip(b)
                .all(|(x, y)| x.to_bits() == y.to_bits()),
            (Series::Categorical(_, _, _), Series::Categorical(_, _, _)) => {
                // Compare logical values, not dictionary layout.
                (0..self.len()).all(|i| self.get(i) == other.get(i))
            }
            _ => self == other,
        }
    }

    /// Casts to `to`. Narrowing integer casts saturate; float-to-int rounds
    /// to nearest (NaN becomes 0); `Str` parses to `F64` with unparseable
    /// entries mapped to NaN.
    pub fn cast(&self, to: DType) -> Result<Series, GalleonError> {
        if self.dtype() == to {
            return Ok(self.clone());
        }
        let name = self.name();

        macro_rules! from_float {
            ($vals:expr, $src:ty) => {
                match to {
                    DType::F64 => Series::F64(name.to_string(), $vals.iter().map(|&v| v as f64).collect()),
                    DType::F32 => Series::F32(name.to_string(), $vals.iter().map(|&v| v as f32).collect()),
                    // `as` from float saturates and maps NaN to 0.
                    DType::I64 => Series::I64(name.to_string(), $vals.iter().map(|&v| v.round() as i64).collect()),
                    DType::I32 => Series::I32(name.to_string(), $vals.iter().map(|&v| v.round() as i32).collect()),
                    DType::U64 => Series::U64(name.to_string(), $vals.iter().map(|&v| v.round() as u64).collect()),
                    DType::U32 => Series::U32(name.to_string(), $vals.iter().map(|&v| v.round() as u32).collect()),
                    DType::Str => Series::Str(name.to_string(), $vals.iter().map(|v| v.to_string()).collect()),
                    _ => return Err(self.cast_unsupported(to)),
                }
            };
        }

        macro_rules! from_int {
            ($vals:expr, $src:ty) => {
                match to {
                    DType::F64 => Series::F64(name.to_string(), $vals.iter().map(|&v| v as f64).collect()),
                    DType::F32 => Series::F32(name.to_string(), $vals.iter().map(|&v| v as f32).collect()),
                    DType::I64 => Series::I64(
                        name.to_string(),
                        $vals
                            .iter()
                            .map(|&v| (v as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64)
                            .collect(),
                    ),
                    DType::I32 => Series::I32(
                        name.to_string(),
                        $vals
                            .iter()
                            .map(|&v| (v as i128).clamp(i32::MIN as i128, i32::MAX as i128) as i32)
                            .collect(),
                    ),
                    DType::U64 => Series::U64(
                        name.to_string(),
                        $vals
                            .iter()
                            .map(|&v| (v as i128).clamp(0, u64::MAX as i128) as u64)
                            .collect(),
                    ),
                    DType::U32 => Series::U32(
                        name.to_string(),
                        $vals
                            .iter()
                            .map(|&v| (v as i128).clamp(0, u32::MAX as i128) as u32)
                            .collect(),
                    ),
                    DType::Str => Series::Str(name.to_string(), $vals.iter().map(|v| v.to_string()).collect()),
                    _ => return Err(self.cast_unsupported(to)),
                }
            };
        }

        Ok(match self {
            Series::F64(_, v) => from_float!(v, f64),
            Series::F32(_, v) => from_float!(v, f32),
            Series::I64(_, v) => from_int!(v, i64),
            Series::I32(_, v) => from_int!(v, i32),
            Series::U64(_, v) => from_int!(v, u64),
            Series::U32(_, v) => from_int!(v, u32),
            Series::Bool(_, v) => match to {
                DType::F64 => Series::F64(name.to_string(), v.iter().map(|&b| b as u8 as f64).collect()),
                DType::F32 => Series::F32(name.to_string(), v.iter().map(|&b| b as u8 as f32).collect()),
                DType::I64 => Series::I64(name.to_string(), v.iter().map(|&b| b as i64).collect()),
                DType::I32 => Series::I32(name.to_string(), v.iter().map(|&b| b as i32).collect()),
                DType::U64 => Series::U64(name.to_string(), v.iter().map(|&b| b as u64).collect()),
                DType::U32 => Series::U32(name.to_string(), v.iter().map(|&b| b as u32).collect()),
                DType::Str => Series::Str(name.to_string(), v.iter().map(|b| b.to_string()).collect()),
                _ => return Err(self.cast_unsupported(to)),
            },
            Series::Str(_, v) => match to {
                DType::F64 => Series::F64(
                    name.to_string(),
                    v.iter()
                        .map(|s| s.parse::<f64>().unwrap_or(f64::NAN))
                        .collect(),
                ),
                DType::Categorical => self.as_categorical()?,
                _ => return Err(self.cast_unsupported(to)),
            },
            Series::Categorical(_, _, _) => match to {
                DType::Str => self.as_string()?,
                _ => return Err(self.cast_unsupported(to)),
            },
            Series::DateTime(_, v) | Series::Duration(_, v) => match to {
                DType::I64 => Series::I64(name.to_string(), v.clone()),
                DType::Str => Series::Str(name.to_string(), v.iter().map(|x| x.to_string()).collect()),
                _ => return Err(self.cast_unsupported(to)),
            },
        })
    }

    fn cast_unsupported(&self, to: DType) -> GalleonError {
        GalleonError::UnsupportedDType(format!(
            "cannot cast column '{}' from {} to {}",
            self.name(),
            self.dtype(),
            to
        ))
    }
}
