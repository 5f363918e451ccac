//! Environment lookup helpers shared by config resolution.

use crate::error::ConfigError;

/// Read an optional environment variable, treating empty as unset.
pub fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value is not valid unicode".to_string(),
        }),
    }
}

/// Parse a boolean env var, falling back to `default` when unset.
pub fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match optional_env(key)? {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got '{other}'"),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::parse_bool_env;

    // Env-var mutation is process-global; keep each test on its own key.

    #[test]
    fn parse_bool_env_falls_back_to_default() {
        assert!(parse_bool_env("PIPEBOARD_TEST_BOOL_UNSET", true).expect("bool"));
        assert!(!parse_bool_env("PIPEBOARD_TEST_BOOL_UNSET", false).expect("bool"));
    }

    #[test]
    fn parse_bool_env_accepts_common_spellings() {
        unsafe { std::env::set_var("PIPEBOARD_TEST_BOOL_ON", "yes") };
        assert!(parse_bool_env("PIPEBOARD_TEST_BOOL_ON", false).expect("bool"));
        unsafe { std::env::set_var("PIPEBOARD_TEST_BOOL_OFF", "0") };
        assert!(!parse_bool_env("PIPEBOARD_TEST_BOOL_OFF", true).expect("bool"));
    }

    #[test]
    fn parse_bool_env_rejects_garbage() {
        unsafe { std::env::set_var("PIPEBOARD_TEST_BOOL_BAD", "maybe") };
        assert!(parse_bool_env("PIPEBOARD_TEST_BOOL_BAD", true).is_err());
    }
}
