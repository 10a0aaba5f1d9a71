//! Detection channels

use crate::error::CoreError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// One independently configured detection pipeline.
///
/// The set is closed: every channel the server can expose is listed here,
/// whether or not its model and video are present at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Hard-hat compliance
    Helmet,
    /// High-visibility vest compliance
    Vest,
    /// Person intrusion
    Person,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Helmet, Channel::Vest, Channel::Person];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Helmet => "helmet",
            Channel::Vest => "vest",
            Channel::Person => "person",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|channel| channel.as_str() == s)
            .ok_or_else(|| CoreError::UnknownChannel(s.to_string()))
    }
}

// Parsed from a plain string so channels work as map keys in any format.
impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
