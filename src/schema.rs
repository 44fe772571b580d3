use crate::types::DType;
use crate::GalleonError;
use fxhash::FxHashMap;

/// An ordered mapping of column name to [`DType`] with a parallel
/// name-to-index lookup.
///
/// Column names must be unique. The field order is significant: it is the
/// column order of the frame the schema describes.
///
/// # Examples
///
/// ```rust
/// use galleon::schema::Schema;
/// use galleon::types::DType;
///
/// let schema = Schema::new(
///     vec!["id".to_string(), "x".to_string()],
///     vec![DType::I64, DType::F64],
/// )
/// .unwrap();
/// assert_eq!(schema.get("x"), Some(DType::F64));
/// assert_eq!(schema.index_of("id"), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<(String, DType)>,
    index: FxHashMap<String, usize>,
}

impl Schema {
    pub fn new(names: Vec<String>, dtypes: Vec<DType>) -> Result<Self, GalleonError> {
        if names.len() != dtypes.len() {
            return Err(GalleonError::LengthMismatch(format!(
                "schema has {} names but {} dtypes",
                names.len(),
                dtypes.len()
            )));
        }
        let mut index = FxHashMap::default();
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(GalleonError::DuplicateColumn(name.clone()));
            }
        }
        let fields = names.into_iter().zip(dtypes).collect();
        Ok(Schema { fields, index })
    }

    pub fn empty() -> Self {
        Schema {
            fields: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Builds a schema from `(name, dtype)` pairs; fails on duplicates.
    pub fn from_fields(fields: Vec<(String, DType)>) -> Result<Self, GalleonError> {
        let (names, dtypes) = fields.into_iter().unzip();
        Self::new(names, dtypes)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column names, in order. Returns an owned copy.
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Column dtypes, in order. Returns an owned copy.
    pub fn dtypes(&self) -> Vec<DType> {
        self.fields.iter().map(|(_, d)| *d).collect()
    }

    pub fn get(&self, name: &str) -> Option<DType> {
        self.index.get(name).map(|&i| self.fields[i].1)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn field(&self, i: usize) -> Option<(&str, DType)> {
        self.fields.get(i).map(|(n, d)| (n.as_str(), *d))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DType)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), *d))
    }
}
