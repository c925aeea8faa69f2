//! Deployment profile

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment profile. Relaxed credential handling is only ever available
/// under `Development`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityProfile {
    #[default]
    Production,
    Development,
}

impl SecurityProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityProfile::Production => "production",
            SecurityProfile::Development => "development",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, SecurityProfile::Development)
    }
}

impl fmt::Display for SecurityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(SecurityProfile::Production),
            "development" | "dev" => Ok(SecurityProfile::Development),
            other => Err(ConfigError::InvalidValue(format!("Invalid profile: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parsing() {
        assert_eq!("Production".parse::<SecurityProfile>().unwrap(), SecurityProfile::Production);
        assert_eq!("dev".parse::<SecurityProfile>().unwrap(), SecurityProfile::Development);
        assert!("staging".parse::<SecurityProfile>().is_err());
    }
}
