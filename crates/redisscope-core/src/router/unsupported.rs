//! Commands that cannot run in a request/response execution context

/// Interactive or streaming commands rejected before dispatch
pub const UNSUPPORTED_COMMANDS: &[&str] = &[
    "MONITOR",
    "SUBSCRIBE",
    "PSUBSCRIBE",
    "SSUBSCRIBE",
    "SYNC",
    "PSYNC",
    "SCRIPT DEBUG",
];

/// Deny-list matched on leading command tokens, case-insensitively
#[derive(Debug, Clone)]
pub struct UnsupportedCommands {
    entries: Vec<Vec<String>>,
}

impl Default for UnsupportedCommands {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl UnsupportedCommands {
    /// Built-in entries plus `extra`
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: Vec<Vec<String>> = Vec::new();
        let builtin = UNSUPPORTED_COMMANDS.iter().map(|s| s.to_string());
        for entry in builtin.chain(extra.into_iter().map(|s| s.as_ref().to_string())) {
            let tokens: Vec<String> = entry
                .split_whitespace()
                .map(|t| t.to_ascii_uppercase())
                .collect();
            if !tokens.is_empty() && !entries.contains(&tokens) {
                entries.push(tokens);
            }
        }
        Self { entries }
    }

    /// The matching entry, uppercased, if `args` is denied
    pub fn check(&self, args: &[String]) -> Option<String> {
        self.entries
            .iter()
            .find(|entry| {
                entry.len() <= args.len()
                    && entry
                        .iter()
                        .zip(args)
                        .all(|(denied, arg)| denied.eq_ignore_ascii_case(arg))
            })
            .map(|entry| entry.join(" "))
    }

    /// Message stored for a denied command
    pub fn message(&self, command: &str) -> String {
        let all = self
            .entries
            .iter()
            .map(|e| e.join(" "))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "'{}' is not supported in this execution context. The list of all unsupported commands: {}",
            command, all
        )
    }
}
