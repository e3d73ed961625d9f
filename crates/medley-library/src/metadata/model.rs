use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// Contenido de `<track_id>_METADATA.yaml`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct MetadataFile {
    pub album: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub composer: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub producer: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub website: Vec<String>,
    #[serde(deserialize_with = "nullable_string")]
    pub genre: String,
    #[serde(deserialize_with = "nullable_string")]
    pub origin: String,
    #[serde(deserialize_with = "yes_no")]
    pub excerpt: bool,
    #[serde(deserialize_with = "yes_no")]
    pub has_bleed: bool,
    #[serde(deserialize_with = "yes_no")]
    pub instrumental: bool,
    pub mix_filename: Option<String>,
    pub raw_dir: Option<String>,
    pub stem_dir: Option<String>,
    #[serde(deserialize_with = "version")]
    pub version: Option<String>,
    pub stems: BTreeMap<String, StemEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct StemEntry {
    #[serde(deserialize_with = "nullable_string")]
    pub component: String,
    #[serde(deserialize_with = "nullable_string")]
    pub filename: String,
    #[serde(deserialize_with = "one_or_many")]
    pub instrument: Vec<String>,
    pub raw: BTreeMap<String, RawEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RawEntry {
    #[serde(deserialize_with = "nullable_string")]
    pub filename: String,
    #[serde(deserialize_with = "one_or_many")]
    pub instrument: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<OneOrMany> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => Vec::new(),
        Some(OneOrMany::One(s)) if s.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

fn yes_no<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Flag> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(false),
        Some(Flag::Bool(b)) => Ok(b),
        Some(Flag::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => Ok(true),
            "no" | "false" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected `yes` or `no`, found `{other}`"
            ))),
        },
    }
}

fn version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(s) => s,
    }))
}
