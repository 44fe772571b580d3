use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Defines the possible element types of a [`crate::series::Series`].
///
/// The enumeration is closed: every column in the engine is one of these
/// types. Width predicates and the byte size are used by the executor when
/// dispatching to the numeric kernels.
///
/// # Examples
///
/// ```rust
/// use galleon::types::DType;
///
/// assert!(DType::F64.is_numeric());
/// assert!(DType::F64.is_float());
/// assert_eq!(DType::I32.size(), 4);
/// assert_eq!(DType::Str.size(), -1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// 64-bit floating-point number. Null is encoded as NaN.
    F64,
    /// 32-bit floating-point number. Null is encoded as NaN.
    F32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit signed integer.
    I32,
    /// 64-bit unsigned integer.
    U64,
    /// 32-bit unsigned integer.
    U32,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Str,
    /// Dictionary-encoded string: ordered unique dictionary plus codes.
    Categorical,
    /// Unix timestamp in nanoseconds (i64).
    DateTime,
    /// Elapsed nanoseconds (i64).
    Duration,
    /// The type of a null literal; no column carries this dtype.
    Null,
}

impl DType {
    /// The six numeric types.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DType::F64 | DType::F32 | DType::I64 | DType::I32 | DType::U64 | DType::U32
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::F64 | DType::F32)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DType::I64 | DType::I32 | DType::U64 | DType::U32)
    }

    /// Floats and signed integers.
    pub fn is_signed(&self) -> bool {
        matches!(self, DType::F64 | DType::F32 | DType::I64 | DType::I32)
    }

    /// Fixed byte width per element, `-1` for variable-width types and `0`
    /// for `Null`.
    pub fn size(&self) -> i64 {
        match self {
            DType::F64 | DType::I64 | DType::U64 | DType::DateTime | DType::Duration => 8,
            DType::F32 | DType::I32 | DType::U32 => 4,
            DType::Bool => 1,
            DType::Str | DType::Categorical => -1,
            DType::Null => 0,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DType::F64 => "f64",
            DType::F32 => "f32",
            DType::I64 => "i64",
            DType::I32 => "i32",
            DType::U64 => "u64",
            DType::U32 => "u32",
            DType::Bool => "bool",
            DType::Str => "str",
            DType::Categorical => "cat",
            DType::DateTime => "datetime",
            DType::Duration => "duration",
            DType::Null => "null",
        };
        write!(f, "{}", name)
    }
}

/// Common dtype two binary-op operands promote to.
///
/// Floats win over integers, signedness is preserved, and bool promotes to
/// the numeric side. Signed and unsigned integers do not mix. String-like
/// and temporal dtypes only promote with themselves (categorical pairs
/// normalize through `Str`); everything else is a promotion failure.
pub fn promote_dtypes(left: DType, right: DType) -> Result<DType, crate::GalleonError> {
    use DType::*;
    if left == right {
        return Ok(match left {
            Categorical => Str,
            other => other,
        });
    }
    let promoted = match (left, right) {
        (F64, F32 | I64 | I32 | U64 | U32 | Bool) | (F32 | I64 | I32 | U64 | U32 | Bool, F64) => {
            Some(F64)
        }
        (F32, I64 | U64) | (I64 | U64, F32) => Some(F64),
        (F32, I32 | U32 | Bool) | (I32 | U32 | Bool, F32) => Some(F32),
        (I64, I32 | Bool) | (I32 | Bool, I64) => Some(I64),
        (I32, Bool) | (Bool, I32) => Some(I32),
        (U64, U32 | Bool) | (U32 | Bool, U64) => Some(U64),
        (U32, Bool) | (Bool, U32) => Some(U32),
        (Categorical, Str) | (Str, Categorical) => Some(Str),
        _ => None,
    };
    promoted.ok_or_else(|| {
        crate::GalleonError::TypePromotion(format!(
            "no common dtype for {} and {}",
            left, right
        ))
    })
}

/// A single data point, used for literals and for introspecting a series
/// element via [`crate::series::Series::get`].
///
/// `Scalar` implements `PartialEq`, `Eq`, `PartialOrd`, `Ord` and `Hash` so
/// it can serve as a composite group/join key component. Float payloads are
/// compared and hashed bitwise so that NaN behaves as an ordinary key value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    /// A null or missing value.
    Null,
    F64(f64),
    F32(f32),
    I64(i64),
    I32(i32),
    U64(u64),
    U32(u32),
    Bool(bool),
    Str(String),
    /// Unix timestamp in nanoseconds.
    DateTime(i64),
    /// Elapsed nanoseconds.
    Duration(i64),
}

impl Scalar {
    /// Returns the [`DType`] of this scalar. `Null` maps to `DType::Null`.
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::Null => DType::Null,
            Scalar::F64(_) => DType::F64,
            Scalar::F32(_) => DType::F32,
            Scalar::I64(_) => DType::I64,
            Scalar::I32(_) => DType::I32,
            Scalar::U64(_) => DType::U64,
            Scalar::U32(_) => DType::U32,
            Scalar::Bool(_) => DType::Bool,
            Scalar::Str(_) => DType::Str,
            Scalar::DateTime(_) => DType::DateTime,
            Scalar::Duration(_) => DType::Duration,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric payload widened to f64, if this scalar is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::F64(v) => Some(*v),
            Scalar::F32(v) => Some(*v as f64),
            Scalar::I64(v) => Some(*v as f64),
            Scalar::I32(v) => Some(*v as f64),
            Scalar::U64(v) => Some(*v as f64),
            Scalar::U32(v) => Some(*v as f64),
            Scalar::Bool(v) => Some(*v as u8 as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::I64(v) => Some(*v),
            Scalar::I32(v) => Some(*v as i64),
            Scalar::Bool(v) => Some(*v as i64),
            Scalar::DateTime(v) | Scalar::Duration(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(v) => Some(v),
            _ => None,
        }
    }

    // Discriminant for ordering otherwise incomparable variants.
    fn discriminant(&self) -> u8 {
        match self {
            Scalar::Null => 0,
            Scalar::F64(_) => 1,
            Scalar::F32(_) => 2,
            Scalar::I64(_) => 3,
            Scalar::I32(_) => 4,
            Scalar::U64(_) => 5,
            Scalar::U32(_) => 6,
            Scalar::Bool(_) => 7,
            Scalar::Str(_) => 8,
            Scalar::DateTime(_) => 9,
            Scalar::Duration(_) => 10,
        }
    }
}

impl PartialEq for Scalar {
    /// `Null == Null`; floats compare bitwise so NaN keys are stable.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::F64(l), Scalar::F64(r)) => l.to_bits() == r.to_bits(),
            (Scalar::F32(l), Scalar::F32(r)) => l.to_bits() == r.to_bits(),
            (Scalar::I64(l), Scalar::I64(r)) => l == r,
            (Scalar::I32(l), Scalar::I32(r)) => l == r,
            (Scalar::U64(l), Scalar::U64(r)) => l == r,
            (Scalar::U32(l), Scalar::U32(r)) => l == r,
            (Scalar::Bool(l), Scalar::Bool(r)) => l == r,
            (Scalar::Str(l), Scalar::Str(r)) => l == r,
            (Scalar::DateTime(l), Scalar::DateTime(r)) => l == r,
            (Scalar::Duration(l), Scalar::Duration(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Scalar::Null => 0u8.hash(state),
            Scalar::F64(v) => v.to_bits().hash(state),
            Scalar::F32(v) => v.to_bits().hash(state),
            Scalar::I64(v) => v.hash(state),
            Scalar::I32(v) => v.hash(state),
            Scalar::U64(v) => v.hash(state),
            Scalar::U32(v) => v.hash(state),
            Scalar::Bool(v) => v.hash(state),
            Scalar::Str(v) => v.hash(state),
            Scalar::DateTime(v) => v.hash(state),
            Scalar::Duration(v) => v.hash(state),
        }
    }
}

impl PartialOrd for Scalar {
    /// Numeric variants compare cross-type through f64; `Null` sorts before
    /// everything; incomparable pairs return `None`.
    #[allow(clippy::non_canonical_partial_ord_impl)]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use std::cmp::Ordering;
        match (self, other) {
            (Scalar::Null, Scalar::Null) => Some(Ordering::Equal),
            (Scalar::Null, _) => Some(Ordering::Less),
            (_, Scalar::Null) => Some(Ordering::Greater),
            (Scalar::Str(a), Scalar::Str(b)) => a.partial_cmp(b),
            (Scalar::Bool(a), Scalar::Bool(b)) => a.partial_cmp(b),
            (Scalar::DateTime(a), Scalar::DateTime(b)) => a.partial_cmp(b),
            (Scalar::Duration(a), Scalar::Duration(b)) => a.partial_cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if let Some(ord) = self.partial_cmp(other) {
            ord
        } else {
            self.discriminant().cmp(&other.discriminant())
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::F64(v) => write!(f, "{}", v),
            Scalar::F32(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::I32(v) => write!(f, "{}", v),
            Scalar::U64(v) => write!(f, "{}", v),
            Scalar::U32(v) => write!(f, "{}", v),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Str(v) => write!(f, "{}", v),
            Scalar::DateTime(v) => write!(f, "{}", v),
            Scalar::Duration(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::F32(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::I32(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::U64(v)
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::U32(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}
