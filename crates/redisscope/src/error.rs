//! Error types for redisscope

use colored::Colorize;
use redisscope_core::CoreError;
use redisscope_core::config::ConfigError;
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// ```text
/// error: No profiles configured
///
///   tip: create one: redisscope profile set local --url redis://127.0.0.1:6379
/// ```
pub struct CliDiagnostic {
    message: String,
    tips: Vec<String>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            tips: Vec::new(),
        }
    }

    pub fn tip(mut self, description: &str) -> Self {
        self.tips.push(description.to_string());
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for tip in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", tip);
        }
    }
}

/// Main error type for the redisscope application
#[derive(Error, Debug)]
pub enum RedisScopeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for redisscope operations
pub type Result<T> = std::result::Result<T, RedisScopeError>;

impl From<anyhow::Error> for RedisScopeError {
    fn from(err: anyhow::Error) -> Self {
        RedisScopeError::OutputError {
            message: format!("{:#}", err),
        }
    }
}

impl RedisScopeError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            RedisScopeError::Config(ConfigError::NoProfiles)
            | RedisScopeError::Core(CoreError::Config(ConfigError::NoProfiles)) => vec![
                "Create a profile: redisscope profile set local --url redis://127.0.0.1:6379"
                    .to_string(),
                "Or pass a URL directly: redisscope --url redis://127.0.0.1:6379 probe"
                    .to_string(),
            ],
            RedisScopeError::Config(ConfigError::ProfileNotFound { name }) => vec![
                "List available profiles: redisscope profile list".to_string(),
                format!(
                    "Create profile '{}': redisscope profile set {} --url <url>",
                    name, name
                ),
            ],
            RedisScopeError::Config(ConfigError::ParseError(_)) => vec![
                "Show the config file location: redisscope profile path".to_string(),
            ],
            RedisScopeError::Core(err) if err.is_connection_error() => vec![
                "Check that the server is reachable and the URL is correct".to_string(),
                "Use rediss:// for TLS endpoints".to_string(),
            ],
            RedisScopeError::Core(err) if err.is_forbidden() => vec![
                "The ACL user lacks permission for this command".to_string(),
            ],
            RedisScopeError::Core(err) if err.is_wrong_discovery_tool() => vec![
                "Point redisscope at a sentinel port (usually 26379) or use the node directly"
                    .to_string(),
            ],
            RedisScopeError::Core(CoreError::NodeNotFound(_)) => vec![
                "List cluster nodes: redisscope probe".to_string(),
            ],
            RedisScopeError::InvalidInput { .. } => vec![
                "Check the command syntax: redisscope <command> --help".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&self.to_string());

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion);
        }

        diag.print();
    }
}
