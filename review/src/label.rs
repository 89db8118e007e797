//! The fixed classification label set.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::{Result, ReviewError};

/// A label a reviewer can give to a character image.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationLabel {
    Alpha,
    Beta,
    Gamma,
    Delta,
    Epsilon,
    Zeta,
    Eta,
    Theta,
    Iota,
    Kappa,
    Lambda,
    Mu,
    Nu,
    Xi,
    Omicron,
    Pi,
    Rho,
    Sigma,
    Tau,
    Upsilon,
    Phi,
    Chi,
    Psi,
    Omega,
    NonLetter,
    Unclassified,
    Period,
    Semicolon,
    RaisedDot,
}

impl ClassificationLabel {
    /// Parse a label name, e.g. `"ALPHA"` or `"RAISED_DOT"`.
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name.trim()).map_err(|_| ReviewError::UnknownLabel(name.to_string()))
    }

    /// Unicode code point for Greek letter labels.
    pub fn code_point(self) -> Option<char> {
        uncial_font::greek_letter(self.as_ref())
    }

    /// Whether this label is one of the 24 Greek capitals.
    pub fn is_letter(self) -> bool {
        self.code_point().is_some()
    }

    /// The Greek letter labels in alphabet order.
    pub fn letters() -> impl Iterator<Item = Self> {
        Self::iter().filter(|label| label.is_letter())
    }
}
