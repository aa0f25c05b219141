//! Runtime environment detection.
//!
//! Single source of truth for the runtime environment, read from the
//! `PUSHWIRE_ENV` environment variable:
//!
//! - `test` - test mode (credentials in a file instead of the OS keyring)
//! - `development` or `dev` - development mode
//! - anything else or unset - production

/// Environment variable selecting the runtime environment.
pub const ENV_VAR: &str = "PUSHWIRE_ENV";

/// Runtime environment for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Production environment (default).
    Production,
    /// Development environment.
    Development,
    /// Test environment - uses file storage instead of the keyring.
    Test,
}

impl Environment {
    /// Detect the current environment from `PUSHWIRE_ENV`.
    #[must_use]
    pub fn current() -> Self {
        Self::parse(std::env::var(ENV_VAR).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("test") => Self::Test,
            Some("development" | "dev") => Self::Development,
            _ => Self::Production,
        }
    }

    /// Returns `true` if this is the test environment.
    #[must_use]
    pub fn is_test(self) -> bool {
        self == Self::Test
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Returns `true` if keyring should be bypassed in favour of file storage.
#[must_use]
pub fn should_skip_keyring() -> bool {
    Environment::current().is_test()
}
