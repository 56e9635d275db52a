use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tracked target countries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Country {
    /// South Africa
    #[serde(rename = "SA", alias = "ZA")]
    SouthAfrica,
    /// Zimbabwe
    #[serde(rename = "ZW")]
    Zimbabwe,
}

impl Country {
    /// Every tracked country, in a fixed order
    pub const ALL: [Country; 2] = [Country::SouthAfrica, Country::Zimbabwe];

    /// Short code used in queries, config and logs
    pub fn code(self) -> &'static str {
        match self {
            Country::SouthAfrica => "SA",
            Country::Zimbabwe => "ZW",
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Country::SouthAfrica => "South Africa",
            Country::Zimbabwe => "Zimbabwe",
        }
    }

    /// International calling code, without the `+`
    pub fn default_calling_code(self) -> &'static str {
        match self {
            Country::SouthAfrica => "27",
            Country::Zimbabwe => "263",
        }
    }

    /// Parse from a short code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "SA" | "ZA" => Some(Country::SouthAfrica),
            "ZW" => Some(Country::Zimbabwe),
            _ => None,
        }
    }

    /// The tracked countries other than `self`
    pub fn others(self) -> impl Iterator<Item = Country> {
        Country::ALL.into_iter().filter(move |c| *c != self)
    }
}

impl FromStr for Country {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Country::from_code(s).ok_or_else(|| format!("unknown country code: {}", s))
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
