//! Supervised label for the credit-score model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CreditScore {
    Good,
    Standard,
    Poor,
}

impl CreditScore {
    pub const ALL: [Self; 3] = [Self::Good, Self::Standard, Self::Poor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Standard => "Standard",
            Self::Poor => "Poor",
        }
    }

    /// Ordinal class code: Good = 0, Standard = 1, Poor = 2.
    pub fn code(&self) -> u8 {
        match self {
            Self::Good => 0,
            Self::Standard => 1,
            Self::Poor => 2,
        }
    }
}

impl FromStr for CreditScore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(Self::Good),
            "standard" => Ok(Self::Standard),
            "poor" => Ok(Self::Poor),
            other => Err(format!("not a credit score: '{other}'")),
        }
    }
}

impl fmt::Display for CreditScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(" good ".parse::<CreditScore>(), Ok(CreditScore::Good));
        assert_eq!("POOR".parse::<CreditScore>(), Ok(CreditScore::Poor));
        assert!("Excellent".parse::<CreditScore>().is_err());
    }

    #[test]
    fn test_codes_are_ordinal() {
        let codes: Vec<u8> = CreditScore::ALL.iter().map(CreditScore::code).collect();
        assert_eq!(codes, [0, 1, 2]);
    }
}
