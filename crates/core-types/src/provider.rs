use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a canonical provider identifier.
pub const PROVIDER_ID_WIDTH: usize = 6;

/// A provider identifier as it arrives from a caller, before normalization.
///
/// Source systems disagree on whether the identifier is a number or a string,
/// so a leading zero may or may not be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawProviderId {
    Numeric(u64),
    Text(String),
}

impl From<u64> for RawProviderId {
    fn from(value: u64) -> Self {
        RawProviderId::Numeric(value)
    }
}

impl From<u32> for RawProviderId {
    fn from(value: u32) -> Self {
        RawProviderId::Numeric(u64::from(value))
    }
}

impl From<&str> for RawProviderId {
    fn from(value: &str) -> Self {
        RawProviderId::Text(value.to_string())
    }
}

impl From<String> for RawProviderId {
    fn from(value: String) -> Self {
        RawProviderId::Text(value)
    }
}

impl fmt::Display for RawProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawProviderId::Numeric(n) => write!(f, "{n}"),
            RawProviderId::Text(s) => f.write_str(s),
        }
    }
}

/// A canonical provider identifier: six upper-case alphanumeric characters,
/// zero-padded on the left. The first two characters are the state code and the
/// last four the facility type code.
///
/// The only way to build one is through [`ProviderId::normalize`], so every
/// `ProviderId` in the system has already been padded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderId(String);

impl ProviderId {
    pub fn normalize(raw: impl Into<RawProviderId>) -> Result<Self, CoreError> {
        match raw.into() {
            RawProviderId::Numeric(n) => {
                let text = n.to_string();
                if text.len() > PROVIDER_ID_WIDTH {
                    return Err(CoreError::InvalidProviderId(text));
                }
                Ok(Self(format!("{n:0>width$}", width = PROVIDER_ID_WIDTH)))
            }
            RawProviderId::Text(text) => normalize_text(&text)
                .map(Self)
                .ok_or(CoreError::InvalidProviderId(text)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two-character state prefix.
    pub fn state_prefix(&self) -> &str {
        &self.0[..2]
    }

    /// The four characters following the state prefix.
    pub fn type_code(&self) -> &str {
        &self.0[2..]
    }
}

fn normalize_text(raw: &str) -> Option<String> {
    let mut text = raw.trim();

    // Spreadsheet exports turn 14000 into "14000.0".
    if let Some((integer, fraction)) = text.split_once('.') {
        if integer.is_empty() || !fraction.chars().all(|c| c == '0') {
            return None;
        }
        text = integer;
    }

    if text.is_empty() || !text.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    // Over-padded identifiers lose their surplus leading zeros.
    while text.len() > PROVIDER_ID_WIDTH && text.starts_with('0') {
        text = &text[1..];
    }
    if text.len() > PROVIDER_ID_WIDTH {
        return None;
    }

    Some(format!(
        "{:0>width$}",
        text.to_ascii_uppercase(),
        width = PROVIDER_ID_WIDTH
    ))
}

impl TryFrom<String> for ProviderId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProviderId::normalize(value)
    }
}

impl From<ProviderId> for String {
    fn from(value: ProviderId) -> Self {
        value.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_identifier_is_zero_padded() {
        let id = ProviderId::normalize(14000u64).unwrap();
        assert_eq!(id.as_str(), "014000");
        assert_eq!(id.state_prefix(), "01");
        assert_eq!(id.type_code(), "4000");
    }

    #[test]
    fn padded_and_unpadded_strings_agree() {
        let a = ProviderId::normalize("014000").unwrap();
        let b = ProviderId::normalize("14000").unwrap();
        let c = ProviderId::normalize(" 14000.0 ").unwrap();
        let d = ProviderId::normalize("0014000").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
    }

    #[test]
    fn letters_are_upper_cased() {
        let id = ProviderId::normalize("05s001").unwrap();
        assert_eq!(id.as_str(), "05S001");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ProviderId::normalize("").is_err());
        assert!(ProviderId::normalize("01-4000").is_err());
        assert!(ProviderId::normalize("14000.5").is_err());
        assert!(ProviderId::normalize("1234567").is_err());
        assert!(ProviderId::normalize(1_234_567u64).is_err());
    }

    #[test]
    fn deserialization_normalizes() {
        let id: ProviderId = serde_json::from_str("\"14000\"").unwrap();
        assert_eq!(id.as_str(), "014000");
    }
}
