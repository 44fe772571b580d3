//! Conversion between plain string columns and dictionary-encoded
//! categorical columns.

use crate::series::Series;
use crate::GalleonError;
use fxhash::FxHashMap;

impl Series {
    /// Dictionary-encodes a string column, deduplicating values while
    /// preserving first-occurrence order in the dictionary. A categorical
    /// input is returned unchanged.
    pub fn as_categorical(&self) -> Result<Series, GalleonError> {
        match self {
            Series::Categorical(_, _, _) => Ok(self.clone()),
            Series::Str(name, values) => {
                let mut dict: Vec<String> = Vec::new();
                let mut lookup: FxHashMap<&str, u32> = FxHashMap::default();
                let mut codes = Vec::with_capacity(values.len());
                for value in values {
                    let code = match lookup.get(value.as_str()) {
                        Some(&code) => code,
                        None => {
                            let code = dict.len() as u32;
                            dict.push(value.clone());
                            lookup.insert(value.as_str(), code);
                            code
                        }
                    };
                    codes.push(code);
                }
                Ok(Series::Categorical(name.clone(), dict, codes))
            }
            _ => Err(GalleonError::UnsupportedDType(format!(
                "cannot dictionary-encode {} column '{}'",
                self.dtype(),
                self.name()
            ))),
        }
    }

    /// Rematerializes a categorical column into plain strings. A string
    /// input is returned unchanged.
    pub fn as_string(&self) -> Result<Series, GalleonError> {
        match self {
            Series::Str(_, _) => Ok(self.clone()),
            Series::Categorical(name, dict, codes) => {
                let values = codes
                    .iter()
                    .map(|&c| dict[c as usize].clone())
                    .collect();
                Ok(Series::Str(name.clone(), values))
            }
            _ => Err(GalleonError::UnsupportedDType(format!(
                "cannot rematerialize {} column '{}' as strings",
                self.dtype(),
                self.name()
            ))),
        }
    }
}
