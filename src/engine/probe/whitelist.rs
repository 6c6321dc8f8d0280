//! The only arguments an installer may ever be launched with.

use std::fmt;

/// Diagnostic arguments that print usage or version text.
pub static DIAGNOSTIC_ARGUMENTS: &[&str] =
    &["--help", "-h", "/?", "/help", "-?", "--version", "/version"];

pub fn is_whitelisted(arg: &str) -> bool {
    DIAGNOSTIC_ARGUMENTS.contains(&arg)
}

/// An argument taken from `DIAGNOSTIC_ARGUMENTS`.
///
/// The field is private and the only constructor checks the whitelist, so
/// a `ProbeArgument` can never hold an install switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeArgument(&'static str);

impl ProbeArgument {
    pub fn whitelisted(arg: &str) -> Option<Self> {
        DIAGNOSTIC_ARGUMENTS
            .iter()
            .find(|&&allowed| allowed == arg)
            .map(|&allowed| ProbeArgument(allowed))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn all() -> impl Iterator<Item = ProbeArgument> {
        DIAGNOSTIC_ARGUMENTS.iter().map(|&a| ProbeArgument(a))
    }
}

impl fmt::Display for ProbeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
