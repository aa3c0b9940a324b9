//! Capability probe outcomes
//!
//! A probe either observed the capability or learned why not. Keeping the "why"
//! typed lets each caller decide which absences are fine to swallow.

use tracing::{debug, warn};

use crate::error::{ReplyError, ReplyErrorKind};

/// Outcome of one capability probe
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<T> {
    /// The server answered
    Supported(T),
    /// The server does not know the command or has the feature switched off
    Unsupported(ReplyError),
    /// ACL rejected the probe
    Denied(ReplyError),
    /// Anything else, including connection failures
    Failed(ReplyError),
}

impl<T> Probe<T> {
    /// Classify the raw result of a probe command
    pub fn from_reply(result: Result<T, ReplyError>) -> Self {
        match result {
            Ok(value) => Probe::Supported(value),
            Err(err) => match err.kind() {
                ReplyErrorKind::UnknownCommand | ReplyErrorKind::ClusterSupportDisabled => {
                    Probe::Unsupported(err)
                }
                ReplyErrorKind::NoPermission => Probe::Denied(err),
                _ => Probe::Failed(err),
            },
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Probe<U> {
        match self {
            Probe::Supported(value) => Probe::Supported(f(value)),
            Probe::Unsupported(e) => Probe::Unsupported(e),
            Probe::Denied(e) => Probe::Denied(e),
            Probe::Failed(e) => Probe::Failed(e),
        }
    }

    /// Successful value, if any
    pub fn supported(self) -> Option<T> {
        match self {
            Probe::Supported(value) => Some(value),
            _ => None,
        }
    }

    /// Why the probe did not succeed
    pub fn error(&self) -> Option<&ReplyError> {
        match self {
            Probe::Supported(_) => None,
            Probe::Unsupported(e) | Probe::Denied(e) | Probe::Failed(e) => Some(e),
        }
    }

    /// Collapse into a conservative default, logging what was swallowed.
    ///
    /// Expected absences log at debug; unexpected failures log at warn so
    /// they are not silently lost.
    pub fn or_default_logged(self, probe: &str, default: T) -> T {
        match self {
            Probe::Supported(value) => value,
            Probe::Unsupported(e) => {
                debug!(probe, error = %e, "Capability not supported");
                default
            }
            Probe::Denied(e) => {
                debug!(probe, error = %e, "Capability probe denied");
                default
            }
            Probe::Failed(e) => {
                warn!(probe, error = %e, "Capability probe failed");
                default
            }
        }
    }
}
