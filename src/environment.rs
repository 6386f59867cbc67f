/// Environment variable consulted by [`Environment::from_env`].
pub const ENVIRONMENT_VAR: &str = "RETRYING_REQUEST_ENV";

/// Hosting environment policy passed in by the caller.
///
/// In [`Environment::Development`] the executor accepts any server
/// certificate. Never use it against production endpoints.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    /// Reads the environment from `RETRYING_REQUEST_ENV`.
    ///
    /// `development` or `dev` (any case) selects [`Environment::Development`];
    /// anything else, including an unset variable, is production.
    pub fn from_env() -> Self {
        std::env::var(ENVIRONMENT_VAR)
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("development") || value.eq_ignore_ascii_case("dev") {
            Self::Development
        } else {
            Self::Production
        }
    }

    /// Whether certificate validation is relaxed.
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}
