//! Server status parsing and aggregation

pub mod parser;
pub mod stats;

pub use parser::{InfoReply, KeyspaceEntry, parse_info};
pub use stats::{DatabaseStats, get_general_info};
