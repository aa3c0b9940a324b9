//! Parser for the free-text `INFO` reply
//!
//! The reply has `# Section` headers followed by `key:value` lines. Keyspace
//! lines pack several counters into the value: `db0:keys=1,expires=0,avg_ttl=0`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `INFO` reply split by section, keyed by lowercased section name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoReply {
    pub sections: BTreeMap<String, BTreeMap<String, String>>,
}

/// Section name for lines that appear before any header
pub const DEFAULT_SECTION: &str = "default";

impl InfoReply {
    /// All fields of one section
    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.sections.get(&name.to_ascii_lowercase())
    }

    /// Look a field up in a specific section
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key).map(String::as_str)
    }

    /// Look a field up in whichever section carries it
    pub fn find(&self, key: &str) -> Option<&str> {
        self.sections
            .values()
            .find_map(|fields| fields.get(key))
            .map(String::as_str)
    }

    /// Parsed `db<N>` entries of the keyspace section
    pub fn keyspace(&self) -> BTreeMap<String, KeyspaceEntry> {
        self.section("keyspace")
            .map(|fields| {
                fields
                    .iter()
                    .map(|(db, value)| (db.clone(), KeyspaceEntry::parse(value)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Counters of one keyspace line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyspaceEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_ttl: Option<u64>,
}

impl KeyspaceEntry {
    /// Parse `keys=1,expires=0,avg_ttl=0`; unknown sub-fields are ignored
    pub fn parse(value: &str) -> Self {
        let mut entry = KeyspaceEntry::default();
        for field in value.split(',') {
            let Some((name, number)) = field.split_once('=') else {
                continue;
            };
            let number = number.trim().parse().ok();
            match name.trim() {
                "keys" => entry.keys = number,
                "expires" => entry.expires = number,
                "avg_ttl" => entry.avg_ttl = number,
                _ => {}
            }
        }
        entry
    }
}

/// Split an `INFO` reply into sections
pub fn parse_info(reply: &str) -> InfoReply {
    let mut info = InfoReply::default();
    let mut current = DEFAULT_SECTION.to_string();

    for line in reply.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('#') {
            current = header.trim().to_ascii_lowercase();
            info.sections.entry(current.clone()).or_default();
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            info.sections
                .entry(current.clone())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }
    }

    info
}
