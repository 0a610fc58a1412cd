//! Account identifiers and their resolution to series keys
//!
//! Two accounts are addressed by fixed UUID strings. Every other account is
//! addressed by an integer starting at 3, since 1 and 2 belong to the two
//! UUID accounts. Inbound values are validated once into an [`Identifier`];
//! resolution then only has to check the identifier exists in the data.

use crate::error::{ForecastError, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// First reserved account
pub const RESERVED_PRIMARY: &str = "698841bd-189c-4407-b582-9d5fa2689336";

/// Second reserved account
pub const RESERVED_SECONDARY: &str = "5c8251ce-1fe3-4225-97e8-33ec05f85927";

/// Smallest integer identifier accepted
pub const MIN_NUMERIC_ID: i64 = 3;

/// How many integer ids to list when an identifier is not found
const NOT_FOUND_SAMPLE: usize = 10;

/// One of the two accounts addressed by string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedAccount {
    Primary,
    Secondary,
}

impl ReservedAccount {
    /// Match a string exactly against the reserved identifiers
    pub fn from_identifier(raw: &str) -> Option<Self> {
        match raw {
            RESERVED_PRIMARY => Some(ReservedAccount::Primary),
            RESERVED_SECONDARY => Some(ReservedAccount::Secondary),
            _ => None,
        }
    }

    /// The identifier string for this account
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservedAccount::Primary => RESERVED_PRIMARY,
            ReservedAccount::Secondary => RESERVED_SECONDARY,
        }
    }
}

/// Untyped identifier as it arrives from a caller
#[derive(Debug, Clone, PartialEq)]
pub enum IdentifierInput {
    Text(String),
    Integer(i64),
    /// Non-negative integer too large for `i64`
    Unsigned(u64),
    /// Anything else, carrying a short type name for diagnostics
    Other(&'static str),
}

impl From<&str> for IdentifierInput {
    fn from(raw: &str) -> Self {
        IdentifierInput::Text(raw.to_string())
    }
}

impl From<String> for IdentifierInput {
    fn from(raw: String) -> Self {
        IdentifierInput::Text(raw)
    }
}

impl From<i64> for IdentifierInput {
    fn from(raw: i64) -> Self {
        IdentifierInput::Integer(raw)
    }
}

impl From<u64> for IdentifierInput {
    fn from(raw: u64) -> Self {
        match i64::try_from(raw) {
            Ok(i) => IdentifierInput::Integer(i),
            Err(_) => IdentifierInput::Unsigned(raw),
        }
    }
}

impl From<&Value> for IdentifierInput {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => IdentifierInput::Text(s.clone()),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => IdentifierInput::Integer(i),
                (None, Some(u)) => IdentifierInput::Unsigned(u),
                (None, None) => IdentifierInput::Other("float"),
            },
            Value::Bool(_) => IdentifierInput::Other("bool"),
            Value::Null => IdentifierInput::Other("null"),
            Value::Array(_) => IdentifierInput::Other("array"),
            Value::Object(_) => IdentifierInput::Other("object"),
        }
    }
}

/// Validated account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identifier {
    Reserved(ReservedAccount),
    Numeric(u64),
}

impl Identifier {
    /// Validate an inbound value
    pub fn parse(input: &IdentifierInput) -> Result<Self> {
        match input {
            IdentifierInput::Text(raw) => ReservedAccount::from_identifier(raw)
                .map(Identifier::Reserved)
                .ok_or_else(|| ForecastError::UnknownIdentifier(raw.clone())),
            IdentifierInput::Integer(id) if *id < MIN_NUMERIC_ID => {
                Err(ForecastError::OutOfRange(*id))
            }
            IdentifierInput::Integer(id) => Ok(Identifier::Numeric(*id as u64)),
            IdentifierInput::Unsigned(id) => Ok(Identifier::Numeric(*id)),
            IdentifierInput::Other(kind) => Err(ForecastError::InvalidType(kind.to_string())),
        }
    }

    /// The string form used to match series keys
    pub fn canonical_key(&self) -> String {
        match self {
            Identifier::Reserved(account) => account.as_str().to_string(),
            Identifier::Numeric(id) => id.to_string(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Reserved(account) => write!(f, "{}", account.as_str()),
            Identifier::Numeric(id) => write!(f, "{}", id),
        }
    }
}

impl TryFrom<&str> for Identifier {
    type Error = ForecastError;

    fn try_from(raw: &str) -> Result<Self> {
        Identifier::parse(&IdentifierInput::from(raw))
    }
}

impl TryFrom<i64> for Identifier {
    type Error = ForecastError;

    fn try_from(raw: i64) -> Result<Self> {
        Identifier::parse(&IdentifierInput::Integer(raw))
    }
}

impl TryFrom<&Value> for Identifier {
    type Error = ForecastError;

    fn try_from(value: &Value) -> Result<Self> {
        Identifier::parse(&IdentifierInput::from(value))
    }
}

/// Maps identifiers onto the keys present in a series table
#[derive(Debug)]
pub struct UserKeyResolver;

impl UserKeyResolver {
    /// Return the canonical key for `identifier` if it occurs in `available_keys`
    pub fn resolve(identifier: &Identifier, available_keys: &BTreeSet<String>) -> Result<String> {
        let key = identifier.canonical_key();
        if available_keys.contains(&key) {
            return Ok(key);
        }

        Err(ForecastError::IdentifierNotFound {
            identifier: key,
            sample: Self::integer_sample(available_keys),
        })
    }

    /// Validate an inbound value and resolve it in one go
    pub fn resolve_input(
        input: &IdentifierInput,
        available_keys: &BTreeSet<String>,
    ) -> Result<String> {
        let identifier = Identifier::parse(input)?;
        Self::resolve(&identifier, available_keys)
    }

    /// Smallest integer-like keys, for not-found diagnostics
    fn integer_sample(available_keys: &BTreeSet<String>) -> Vec<u64> {
        let mut ints: Vec<u64> = available_keys
            .iter()
            .filter(|k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|k| k.parse().ok())
            .collect();
        ints.sort_unstable();
        ints.truncate(NOT_FOUND_SAMPLE);
        ints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn keys(raw: &[&str]) -> BTreeSet<String> {
        raw.iter().map(|k| k.to_string()).collect()
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(0)]
    #[case(-7)]
    fn test_low_integers_are_out_of_range(#[case] id: i64) {
        let err = Identifier::try_from(id).unwrap_err();
        assert!(matches!(err, ForecastError::OutOfRange(v) if v == id));
    }

    #[rstest]
    #[case("bob")]
    #[case("884")]
    #[case("")]
    #[case("698841BD-189C-4407-B582-9D5FA2689336")]
    fn test_unrecognized_strings_are_unknown(#[case] raw: &str) {
        let err = Identifier::try_from(raw).unwrap_err();
        assert!(matches!(err, ForecastError::UnknownIdentifier(ref s) if s == raw));
    }

    #[rstest]
    #[case(json!(4.5), "float")]
    #[case(json!(true), "bool")]
    #[case(json!(null), "null")]
    #[case(json!([3]), "array")]
    fn test_other_types_are_invalid(#[case] value: Value, #[case] kind: &str) {
        let err = Identifier::try_from(&value).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidType(ref s) if s == kind));
    }

    #[test]
    fn test_reserved_identifier_resolves_to_itself() {
        let available = keys(&[RESERVED_PRIMARY, RESERVED_SECONDARY, "884"]);
        for raw in [RESERVED_PRIMARY, RESERVED_SECONDARY] {
            let id = Identifier::try_from(raw).unwrap();
            assert_eq!(UserKeyResolver::resolve(&id, &available).unwrap(), raw);
        }
    }

    #[test]
    fn test_numeric_identifier_matches_string_keys() {
        let available = keys(&["884", "12"]);
        let id = Identifier::try_from(&json!(884)).unwrap();
        assert_eq!(id, Identifier::Numeric(884));
        assert_eq!(UserKeyResolver::resolve(&id, &available).unwrap(), "884");
    }

    #[test]
    fn test_integer_beyond_i64_is_numeric() {
        let value = json!(u64::MAX);
        assert_eq!(IdentifierInput::from(&value), IdentifierInput::Unsigned(u64::MAX));

        let id = Identifier::try_from(&value).unwrap();
        assert_eq!(id, Identifier::Numeric(u64::MAX));

        let available = keys(&["884", "18446744073709551615"]);
        assert_eq!(
            UserKeyResolver::resolve(&id, &available).unwrap(),
            "18446744073709551615"
        );

        let err = UserKeyResolver::resolve(&id, &keys(&["884"])).unwrap_err();
        match err {
            ForecastError::IdentifierNotFound { identifier, sample } => {
                assert_eq!(identifier, u64::MAX.to_string());
                assert_eq!(sample, vec![884]);
            }
            other => panic!("Expected IdentifierNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_lists_integer_keys() {
        let available = keys(&[RESERVED_PRIMARY, "30", "4", "11", "x9"]);
        let err = UserKeyResolver::resolve_input(&IdentifierInput::Integer(5), &available)
            .unwrap_err();
        match err {
            ForecastError::IdentifierNotFound { identifier, sample } => {
                assert_eq!(identifier, "5");
                assert_eq!(sample, vec![4, 11, 30]);
            }
            other => panic!("Expected IdentifierNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_identifier_absent_from_data() {
        let available = keys(&["884"]);
        let err = UserKeyResolver::resolve_input(&RESERVED_SECONDARY.into(), &available)
            .unwrap_err();
        assert!(matches!(err, ForecastError::IdentifierNotFound { .. }));
        assert!(err.is_identifier_error());
    }
}
