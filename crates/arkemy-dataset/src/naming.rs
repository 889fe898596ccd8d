//! Metadata carried in dataset file names
//!
//! `arkemy_unified_NOK_adjusted.csv` names its currency (`NOK`) and the
//! measure set it carries (`adjusted`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

static CURRENCY_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9])([A-Z]{3})(?:[^A-Za-z0-9]|$)")
        .expect("currency pattern is a valid regex")
});

/// Three-letter uppercase currency code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Code as written, e.g. `NOK`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First standalone three-letter uppercase token of the file stem
    #[must_use]
    pub fn from_file_name(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        CURRENCY_TOKEN
            .captures(stem)
            .and_then(|c| c.get(1))
            .map(|m| Self(m.as_str().to_string()))
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(format!("not a three-letter currency code: '{s}'"))
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which parallel measure set a dataset file carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetVersion {
    /// Measures as recorded
    Regular,
    /// Measures after manual adjustment
    Adjusted,
}

impl DatasetVersion {
    /// Suffix as it appears in file names
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Adjusted => "adjusted",
        }
    }

    /// Version named by a `_regular` / `_adjusted` stem suffix
    #[must_use]
    pub fn from_file_name(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?.to_ascii_lowercase();
        if stem.ends_with("_regular") {
            Some(Self::Regular)
        } else if stem.ends_with("_adjusted") {
            Some(Self::Adjusted)
        } else {
            None
        }
    }
}

impl FromStr for DatasetVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(Self::Regular),
            "adjusted" => Ok(Self::Adjusted),
            other => Err(format!("unknown dataset version: '{other}'")),
        }
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn currency(name: &str) -> Option<String> {
        CurrencyCode::from_file_name(Path::new(name)).map(String::from)
    }

    #[test]
    fn currency_from_stem() {
        assert_eq!(currency("/data/arkemy_unified_NOK_regular.csv").as_deref(), Some("NOK"));
        assert_eq!(currency("USD-export.csv").as_deref(), Some("USD"));
        assert_eq!(currency("report_EUR.parquet").as_deref(), Some("EUR"));
    }

    #[test]
    fn currency_requires_standalone_token() {
        assert_eq!(currency("arkemy_unified_regular.csv"), None);
        assert_eq!(currency("NOKS_data.csv"), None);
        assert_eq!(currency("nok_data.csv"), None);
    }

    #[test]
    fn currency_override_parse() {
        assert_eq!("sek".parse::<CurrencyCode>().unwrap().as_str(), "SEK");
        assert!("kroner".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn version_from_suffix() {
        assert_eq!(
            DatasetVersion::from_file_name(Path::new("x_NOK_adjusted.csv")),
            Some(DatasetVersion::Adjusted)
        );
        assert_eq!(
            DatasetVersion::from_file_name(Path::new("x_NOK_regular.parquet")),
            Some(DatasetVersion::Regular)
        );
        assert_eq!(DatasetVersion::from_file_name(Path::new("x_NOK.csv")), None);
    }
}
