//! Known server modules and how to recognise them

use std::fmt;

use serde::{Deserialize, Serialize};

/// Modules tracked by capability detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RedisModule {
    #[serde(rename = "ai")]
    Ai,
    #[serde(rename = "graph")]
    Graph,
    #[serde(rename = "rg")]
    Gears,
    #[serde(rename = "bf")]
    Bloom,
    #[serde(rename = "ReJSON")]
    Json,
    #[serde(rename = "search")]
    Search,
    #[serde(rename = "timeseries")]
    TimeSeries,
}

impl RedisModule {
    pub const ALL: [RedisModule; 7] = [
        RedisModule::Ai,
        RedisModule::Graph,
        RedisModule::Gears,
        RedisModule::Bloom,
        RedisModule::Json,
        RedisModule::Search,
        RedisModule::TimeSeries,
    ];

    /// Canonical module name
    pub fn as_str(&self) -> &'static str {
        match self {
            RedisModule::Ai => "ai",
            RedisModule::Graph => "graph",
            RedisModule::Gears => "rg",
            RedisModule::Bloom => "bf",
            RedisModule::Json => "ReJSON",
            RedisModule::Search => "search",
            RedisModule::TimeSeries => "timeseries",
        }
    }

    /// Command that only exists when the module is loaded
    pub fn signature_command(&self) -> &'static str {
        match self {
            RedisModule::Ai => "ai.info",
            RedisModule::Graph => "graph.query",
            RedisModule::Gears => "rg.pyexecute",
            RedisModule::Bloom => "bf.info",
            RedisModule::Json => "json.get",
            RedisModule::Search => "ft.info",
            RedisModule::TimeSeries => "ts.info",
        }
    }

    /// Map a raw `MODULE LIST` name onto a tracked module
    pub fn from_raw_name(name: &str) -> Option<Self> {
        RAW_NAMES
            .iter()
            .find(|(raw, _)| raw.eq_ignore_ascii_case(name))
            .map(|(_, module)| *module)
    }
}

impl fmt::Display for RedisModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const RAW_NAMES: &[(&str, RedisModule)] = &[
    ("ai", RedisModule::Ai),
    ("graph", RedisModule::Graph),
    ("rg", RedisModule::Gears),
    ("bf", RedisModule::Bloom),
    ("ReJSON", RedisModule::Json),
    ("search", RedisModule::Search),
    ("searchlight", RedisModule::Search),
    ("ft", RedisModule::Search),
    ("timeseries", RedisModule::TimeSeries),
];

/// Render a packed module version (`20412`) as `2.4.12`
pub fn semantic_version(version: i64) -> Option<String> {
    if version < 0 {
        return None;
    }
    let major = version / 10_000;
    let minor = (version / 100) % 100;
    let patch = version % 100;
    Some(format!("{}.{}.{}", major, minor, patch))
}
