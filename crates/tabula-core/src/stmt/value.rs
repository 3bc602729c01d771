/// A constant passed to the database as a statement parameter, or read back
/// from a result row.
///
/// Dates and date-times travel as `I64` epoch milliseconds.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Boolean value
    Bool(bool),

    /// Signed 32-bit integer
    I32(i32),

    /// Signed 64-bit integer
    I64(i64),

    /// Double precision float
    F64(f64),

    /// String value
    String(String),

    /// Binary value
    Bytes(Vec<u8>),

    /// Null value
    #[default]
    Null,
}

impl Value {
    pub const fn null() -> Self {
        Self::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view of the value. Strings holding integers are accepted
    /// since some drivers report aggregate results as text.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Self::Bool(v) => Some(*v as i64),
            Self::I32(v) => Some(*v as i64),
            Self::I64(v) => Some(*v),
            Self::F64(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::String(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::I32(v) => Some(*v as f64),
            Self::I64(v) => Some(*v as f64),
            Self::F64(v) => Some(*v),
            Self::String(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthiness the way the legacy boolean columns were read: non-zero
    /// numbers, `t`/`true`/`y`/`1` strings.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::I32(_) | Self::I64(_) | Self::F64(_) => self.to_i64().map(|v| v != 0),
            Self::String(v) => Some(matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "t" | "true" | "y" | "yes" | "1"
            )),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// The driver's native string form, `None` for null.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(v) => Some(if *v { "1" } else { "0" }.to_string()),
            Self::I32(v) => Some(v.to_string()),
            Self::I64(v) => Some(v.to_string()),
            Self::F64(v) => Some(v.to_string()),
            Self::String(v) => Some(v.clone()),
            Self::Bytes(v) => Some(String::from_utf8_lossy(v).into_owned()),
        }
    }
}

impl From<bool> for Value {
    fn from(src: bool) -> Self {
        Self::Bool(src)
    }
}

impl From<i32> for Value {
    fn from(src: i32) -> Self {
        Self::I32(src)
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Self {
        Self::I64(src)
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Self {
        Self::F64(src)
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Self {
        Self::String(src.to_string())
    }
}

impl From<String> for Value {
    fn from(src: String) -> Self {
        Self::String(src)
    }
}

impl From<Vec<u8>> for Value {
    fn from(src: Vec<u8>) -> Self {
        Self::Bytes(src)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(src: Option<T>) -> Self {
        src.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_view_accepts_text() {
        assert_eq!(Value::from("42").to_i64(), Some(42));
        assert_eq!(Value::from(2.0).to_i64(), Some(2));
        assert_eq!(Value::from(2.5).to_i64(), None);
        assert_eq!(Value::Null.to_i64(), None);
    }

    #[test]
    fn truthiness() {
        assert_eq!(Value::I64(0).to_bool(), Some(false));
        assert_eq!(Value::I64(3).to_bool(), Some(true));
        assert_eq!(Value::from("t").to_bool(), Some(true));
        assert_eq!(Value::from("false").to_bool(), Some(false));
        assert_eq!(Value::Null.to_bool(), None);
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }
}
