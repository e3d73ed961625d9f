use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseLabelError {
    #[error("Unknown component: {0}. Expected `melody`, `bass` or an empty string.")]
    Component(String),

    #[error("Unknown f0 type: {0}. Expected `m`, `p` or `u`.")]
    F0Type(String),

    #[error("Unknown dataset version: {0}.")]
    DatasetVersion(String),

    #[error("Invalid index: {0}. Expected forms like `S01`, `R12` or `7`.")]
    Index(String),
}

/// Papel de un stem dentro de la mezcla.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Melody,
    Bass,
    #[default]
    None,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Melody => "melody",
            Component::Bass => "bass",
            Component::None => "",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "melody" => Ok(Component::Melody),
            "bass" => Ok(Component::Bass),
            "" | "none" => Ok(Component::None),
            _ => Err(ParseLabelError::Component(s.to_string())),
        }
    }
}

/// Clasificación del contenido de f0 de un instrumento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum F0Type {
    #[serde(rename = "m")]
    Monophonic,
    #[serde(rename = "p")]
    Polyphonic,
    #[serde(rename = "u")]
    Unpitched,
}

impl F0Type {
    pub fn code(&self) -> char {
        match self {
            F0Type::Monophonic => 'm',
            F0Type::Polyphonic => 'p',
            F0Type::Unpitched => 'u',
        }
    }
}

impl fmt::Display for F0Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for F0Type {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "m" | "mono" | "monophonic" => Ok(F0Type::Monophonic),
            "p" | "poly" | "polyphonic" => Ok(F0Type::Polyphonic),
            "u" | "unpitched" => Ok(F0Type::Unpitched),
            _ => Err(ParseLabelError::F0Type(s.to_string())),
        }
    }
}

/// Versión (lista de pistas) del dataset a la que pertenece una multipista.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasetVersion {
    V1,
    V2,
    Extra,
    Bach10,
}

impl DatasetVersion {
    pub const ALL: &'static [DatasetVersion] = &[
        DatasetVersion::V1,
        DatasetVersion::V2,
        DatasetVersion::Extra,
        DatasetVersion::Bach10,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetVersion::V1 => "V1",
            DatasetVersion::V2 => "V2",
            DatasetVersion::Extra => "EXTRA",
            DatasetVersion::Bach10 => "BACH10",
        }
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetVersion {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        DatasetVersion::ALL
            .iter()
            .find(|v| v.as_str() == upper)
            .copied()
            .ok_or_else(|| ParseLabelError::DatasetVersion(s.to_string()))
    }
}

/// Convierte claves como `S08`, `R01` o `12` en su índice numérico.
pub fn parse_index(raw: &str) -> Result<u32, ParseLabelError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(trimmed);

    digits
        .parse::<u32>()
        .map_err(|_| ParseLabelError::Index(raw.to_string()))
}
