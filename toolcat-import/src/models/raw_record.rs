//! Raw import input

use serde::{Deserialize, Serialize};
use toolcat_common::events::RecordRef;

/// Unvalidated `(name, link)` pair from an import source
///
/// The pair is also the dedup key: two records are the same tool only when
/// both fields are byte-for-byte equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRecord {
    /// Tool name (`nome` accepted for files exported by the legacy catalog)
    #[serde(alias = "nome", default)]
    pub name: String,
    #[serde(default)]
    pub link: String,
}

impl RawRecord {
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
        }
    }
}

impl From<&RawRecord> for RecordRef {
    fn from(record: &RawRecord) -> Self {
        RecordRef {
            name: record.name.clone(),
            link: record.link.clone(),
        }
    }
}
