use std::collections::{BTreeMap, HashMap};

/// Protocol version sent with every call
pub const API_VERSION: &str = "2009-11-30";
/// Signature algorithm identifier
pub const SIGNATURE_METHOD: &str = "HmacSHA256";
/// Signature protocol version
pub const SIGNATURE_VERSION: &str = "2";
/// Every call is a form POST to the root path
pub const REQUEST_METHOD: &str = "POST";
pub const REQUEST_PATH: &str = "/";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Wire names of the protocol-mandated fields
pub mod fields {
    pub const ACTION: &str = "Action";
    pub const VERSION: &str = "Version";
    pub const ACCESS_KEY_ID: &str = "AWSAccessKeyId";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VERSION: &str = "SignatureVersion";
    pub const SIGNATURE: &str = "Signature";
}

/// A single call argument
///
/// Scalars of any primitive type are carried in their string form, which is
/// what ends up on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    Sequence(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Short description used in error messages
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Sequence(_) => "sequence",
            Self::Map(_) => "mapping",
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Scalar(value.clone())
    }
}

macro_rules! scalar_from_display {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParamValue {
                fn from(value: $t) -> Self {
                    Self::Scalar(value.to_string())
                }
            }
        )*
    };
}

scalar_from_display!(bool, i32, i64, u16, u32, u64, usize, f64);

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        Self::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<BTreeMap<String, T>> for ParamValue {
    fn from(entries: BTreeMap<String, T>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// Caller-supplied arguments for one call. No ordering is assumed.
pub type CallParams = HashMap<String, ParamValue>;

/// Flat string parameters as they go on the wire
///
/// A `BTreeMap` keeps iteration in byte order of the keys, which is the
/// order the signature is computed over.
pub type ExpandedParams = BTreeMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(ParamValue::from(5_i64), ParamValue::Scalar("5".to_string()));
        assert_eq!(ParamValue::from(true), ParamValue::Scalar("true".to_string()));
        assert_eq!(ParamValue::from("i-1234").as_scalar(), Some("i-1234"));
    }

    #[test]
    fn test_vec_becomes_sequence() {
        let value = ParamValue::from(vec!["a", "b"]);
        assert_eq!(
            value,
            ParamValue::Sequence(vec![
                ParamValue::Scalar("a".to_string()),
                ParamValue::Scalar("b".to_string()),
            ])
        );
        assert_eq!(value.kind(), "sequence");
        assert!(value.as_scalar().is_none());
    }
}
