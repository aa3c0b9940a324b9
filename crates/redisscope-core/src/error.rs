//! Unified error handling for redisscope-core
//!
//! Two layers of errors live here:
//!
//! - [`ReplyError`] is what a single protocol exchange produced. Probes and the
//!   command router inspect it through [`ReplyError::kind`] to tell "this server
//!   lacks the feature" apart from "you are not allowed" and everything else.
//! - [`CoreError`] is what library operations return to callers.
//!
//! # Example
//!
//! ```rust
//! use redisscope_core::{ReplyError, ReplyErrorKind};
//!
//! let err = ReplyError::server("ERR", "unknown command 'SENTINEL', with args beginning with: 'masters'");
//! assert_eq!(err.kind(), ReplyErrorKind::UnknownCommand);
//! ```

use thiserror::Error;

use crate::client::Endpoint;
use crate::config::ConfigError;

/// Failure of one protocol exchange with one node
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    /// The server answered with an error reply (`-CODE message`)
    #[error("{code} {message}")]
    Server { code: String, message: String },

    /// The exchange never produced a reply (I/O, dropped connection, timeout)
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Classification of a [`ReplyError`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyErrorKind {
    /// The command (or subcommand) is not known to this server
    UnknownCommand,
    /// `CLUSTER ...` against a node started without cluster support
    ClusterSupportDisabled,
    /// ACL denied the command
    NoPermission,
    /// The key's slot lives on another node
    Moved { slot: u16, endpoint: Endpoint },
    /// The key's slot is migrating to another node
    Ask { slot: u16, endpoint: Endpoint },
    /// Anything else
    Other,
}

impl ReplyError {
    /// Build a server error reply
    pub fn server(code: impl Into<String>, message: impl Into<String>) -> Self {
        ReplyError::Server {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ReplyErrorKind {
        let (code, message) = match self {
            ReplyError::Server { code, message } => (code.as_str(), message.as_str()),
            ReplyError::Connection(_) => return ReplyErrorKind::Other,
        };

        match code.to_ascii_uppercase().as_str() {
            "NOPERM" => return ReplyErrorKind::NoPermission,
            "MOVED" => {
                return parse_redirect(message)
                    .map(|(slot, endpoint)| ReplyErrorKind::Moved { slot, endpoint })
                    .unwrap_or(ReplyErrorKind::Other);
            }
            "ASK" => {
                return parse_redirect(message)
                    .map(|(slot, endpoint)| ReplyErrorKind::Ask { slot, endpoint })
                    .unwrap_or(ReplyErrorKind::Other);
            }
            _ => {}
        }

        let lower = message.to_ascii_lowercase();
        if lower.starts_with("unknown command") || lower.starts_with("unknown subcommand") {
            ReplyErrorKind::UnknownCommand
        } else if lower.contains("cluster support disabled") {
            ReplyErrorKind::ClusterSupportDisabled
        } else if lower.contains("no permissions") || lower.starts_with("noperm") {
            ReplyErrorKind::NoPermission
        } else {
            ReplyErrorKind::Other
        }
    }

    /// Returns true if the exchange failed below the protocol level
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ReplyError::Connection(_))
    }
}

/// Parse the `<slot> <host>:<port>` tail of a MOVED/ASK reply
fn parse_redirect(message: &str) -> Option<(u16, Endpoint)> {
    let mut parts = message.split_whitespace();
    let slot = parts.next()?.parse().ok()?;
    let endpoint = Endpoint::parse(parts.next()?)?;
    Some((slot, endpoint))
}

/// Core error type returned by library operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// A protocol exchange failed and the caller needs to know
    #[error("Redis error: {0}")]
    Reply(#[from] ReplyError),

    /// Sentinel discovery was pointed at an endpoint that is not a sentinel
    #[error("Wrong discovery tool: {0}")]
    WrongDiscoveryTool(String),

    /// The server denied the command for the current user
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An explicitly requested node is not part of the known topology
    #[error("Node {0} not found in the cluster topology")]
    NodeNotFound(Endpoint),

    /// Routing resolved no node at all
    #[error("No target nodes: {0}")]
    NoTargetNodes(String),

    /// Persisted entity does not exist
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected before reaching the server
    #[error("Validation error: {0}")]
    Validation(String),

    /// Reply could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Persistence collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Returns true if this is a permission error
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        match self {
            CoreError::Forbidden(_) => true,
            CoreError::Reply(e) => e.kind() == ReplyErrorKind::NoPermission,
            _ => false,
        }
    }

    /// Returns true if this is a "not found" error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. } | CoreError::NodeNotFound(_))
    }

    /// Returns true if sentinel discovery hit a non-sentinel endpoint
    #[must_use]
    pub fn is_wrong_discovery_tool(&self) -> bool {
        matches!(self, CoreError::WrongDiscoveryTool(_))
    }

    /// Returns true if the server could not be reached
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, CoreError::Reply(e) if e.is_connection_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command_kind() {
        let err = ReplyError::server(
            "ERR",
            "unknown command 'SENTINEL', with args beginning with: 'masters' ",
        );
        assert_eq!(err.kind(), ReplyErrorKind::UnknownCommand);

        let err = ReplyError::server("ERR", "unknown subcommand 'foo'. Try CLUSTER HELP.");
        assert_eq!(err.kind(), ReplyErrorKind::UnknownCommand);
    }

    #[test]
    fn test_cluster_disabled_kind() {
        let err = ReplyError::server("ERR", "This instance has cluster support disabled");
        assert_eq!(err.kind(), ReplyErrorKind::ClusterSupportDisabled);
    }

    #[test]
    fn test_no_permission_kind() {
        let err = ReplyError::server(
            "NOPERM",
            "this user has no permissions to run the 'config|get' command",
        );
        assert_eq!(err.kind(), ReplyErrorKind::NoPermission);

        // Older servers report ACL failures under the generic code
        let err = ReplyError::server("ERR", "NOPERM this user has no permissions");
        assert_eq!(err.kind(), ReplyErrorKind::NoPermission);
    }

    #[test]
    fn test_moved_kind() {
        let err = ReplyError::server("MOVED", "3999 127.0.0.1:7001");
        assert_eq!(
            err.kind(),
            ReplyErrorKind::Moved {
                slot: 3999,
                endpoint: Endpoint::new("127.0.0.1", 7001),
            }
        );

        let malformed = ReplyError::server("MOVED", "garbage");
        assert_eq!(malformed.kind(), ReplyErrorKind::Other);
    }

    #[test]
    fn test_ask_kind() {
        let err = ReplyError::server("ASK", "12 10.0.0.2:6380");
        assert_eq!(
            err.kind(),
            ReplyErrorKind::Ask {
                slot: 12,
                endpoint: Endpoint::new("10.0.0.2", 6380),
            }
        );
    }

    #[test]
    fn test_connection_error() {
        let err = ReplyError::Connection("broken pipe".to_string());
        assert_eq!(err.kind(), ReplyErrorKind::Other);
        assert!(err.is_connection_error());

        let core: CoreError = err.into();
        assert!(core.is_connection_error());
        assert!(!core.is_forbidden());
    }

    #[test]
    fn test_core_error_helpers() {
        assert!(CoreError::Forbidden("denied".to_string()).is_forbidden());
        assert!(CoreError::WrongDiscoveryTool("x".to_string()).is_wrong_discovery_tool());
        assert!(
            CoreError::NotFound {
                entity: "Command execution",
                id: "1".to_string()
            }
            .is_not_found()
        );
        assert!(CoreError::NodeNotFound(Endpoint::new("h", 1)).is_not_found());
    }

    #[test]
    fn test_core_error_display() {
        let err = CoreError::NodeNotFound(Endpoint::new("10.0.0.1", 7000));
        assert!(err.to_string().contains("10.0.0.1:7000"));

        let err: CoreError = ReplyError::server("ERR", "syntax error").into();
        assert_eq!(err.to_string(), "Redis error: ERR syntax error");
    }
}
