use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde::de::IgnoredAny;
use serde_json::Value;
use std::{fs::File, io::BufReader, path::Path};

use crate::constants::{INDIVIDUAL_ENUMERATION_TYPE, ORGANIZATION_ENUMERATION_TYPE};

/// One `[label, {"results": [...]}]` pair of the export. The label is not used.
pub type DatasetEntry = (IgnoredAny, ResultsBlock);

#[derive(Debug, Default, Deserialize)]
pub struct ResultsBlock {
    #[serde(default)]
    pub results: Vec<RawProviderRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawProviderRecord {
    /// The API emits this as either a JSON string or a JSON number.
    #[serde(default, deserialize_with = "lenient_text")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub enumeration_type: Option<String>,
    #[serde(default)]
    pub basic: Option<RawBasic>,
    #[serde(default)]
    pub addresses: Option<Vec<RawAddress>>,
    #[serde(default)]
    pub taxonomies: Option<Vec<RawTaxonomy>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawBasic {
    #[serde(default, deserialize_with = "lenient_text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub middle_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub credential: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub gender: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawAddress {
    #[serde(default, deserialize_with = "lenient_text")]
    pub address_purpose: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address_1: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub postal_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawTaxonomy {
    #[serde(default, deserialize_with = "lenient_text")]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub license: Option<String>,
    /// Kept untyped: only a literal JSON `true` marks the primary taxonomy.
    pub primary: Option<Value>,
}

/// Scalar field read as text: strings as-is, numbers and bools rendered,
/// null/arrays/objects treated as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationType {
    Individual,
    Organization,
    Other,
}

impl RawProviderRecord {
    /// The npi as given in the source, untrimmed. `None` when absent or null.
    pub fn identifier(&self) -> Option<String> {
        self.number.clone()
    }

    pub fn enumeration(&self) -> EnumerationType {
        match self.enumeration_type.as_deref() {
            Some(INDIVIDUAL_ENUMERATION_TYPE) => EnumerationType::Individual,
            Some(ORGANIZATION_ENUMERATION_TYPE) => EnumerationType::Organization,
            _ => EnumerationType::Other,
        }
    }

    pub fn addresses(&self) -> &[RawAddress] {
        self.addresses.as_deref().unwrap_or_default()
    }

    pub fn taxonomies(&self) -> &[RawTaxonomy] {
        self.taxonomies.as_deref().unwrap_or_default()
    }
}

impl RawTaxonomy {
    pub fn is_primary(&self) -> bool {
        matches!(self.primary, Some(Value::Bool(true)))
    }
}

pub fn load_dataset(path: &Path) -> Result<Vec<DatasetEntry>> {
    let file = File::open(path)
        .with_context(|| format!("Failed opening input dataset {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed parsing input dataset {}", path.display()))
}

#[cfg(test)]
pub fn parse_dataset(json: &str) -> Result<Vec<DatasetEntry>> {
    serde_json::from_str(json).context("Failed parsing input dataset JSON")
}
