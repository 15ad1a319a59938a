//! Invocation configuration loaded from environment variables.
//!
//! All six values are required; there are no defaults. A missing or
//! malformed value fails the invocation immediately with a named error
//! rather than surfacing later as an unguarded lookup fault.

/// Configuration for one invocation, immutable once loaded.
///
/// | Env Var           | Description                                      |
/// |-------------------|--------------------------------------------------|
/// | `EC2_INSTANCE_ID` | Target EC2 instance for the SSM command          |
/// | `RDS_ENDPOINT`    | RDS SQL Server endpoint hostname                 |
/// | `RDS_PORT`        | RDS SQL Server port                              |
/// | `SECRET_ARN`      | Secrets Manager ARN of the domain credentials    |
/// | `SSM_DOCUMENT`    | Name of the SSM command document to dispatch     |
/// | `AD_DOMAIN`       | Active Directory domain qualifying the DB login  |
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// EC2 instance that receives the SSM command.
    pub ec2_instance_id: String,
    /// SQL Server endpoint hostname.
    pub rds_endpoint: String,
    /// SQL Server port.
    pub rds_port: u16,
    /// Secrets Manager reference for the credential payload.
    pub secret_arn: String,
    /// SSM command document name.
    pub ssm_document: String,
    /// Active Directory domain for the `DOMAIN\user` login.
    pub ad_domain: String,
}

/// Errors raised while loading [`HandlerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// `RDS_PORT` is set but does not parse as a port number.
    #[error("RDS_PORT must be a valid port number, got {value:?}")]
    InvalidPort {
        /// The raw value found in the environment.
        value: String,
    },
}

impl HandlerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    ///
    /// `from_env` is a thin wrapper over this; tests drive it with a map
    /// instead of mutating the process environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let require = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        let ec2_instance_id = require("EC2_INSTANCE_ID")?;
        let rds_endpoint = require("RDS_ENDPOINT")?;
        let raw_port = require("RDS_PORT")?;
        let secret_arn = require("SECRET_ARN")?;
        let ssm_document = require("SSM_DOCUMENT")?;
        let ad_domain = require("AD_DOMAIN")?;

        let rds_port: u16 = raw_port
            .parse()
            .map_err(|_| ConfigError::InvalidPort { value: raw_port })?;

        Ok(Self {
            ec2_instance_id,
            rds_endpoint,
            rds_port,
            secret_arn,
            ssm_document,
            ad_domain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("EC2_INSTANCE_ID", "i-123"),
            ("RDS_ENDPOINT", "db.example.com"),
            ("RDS_PORT", "1433"),
            ("SECRET_ARN", "arn:secret:1"),
            ("SSM_DOCUMENT", "ReconnectDoc"),
            ("AD_DOMAIN", "CORP"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<HandlerConfig, ConfigError> {
        HandlerConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn loads_all_fields() {
        let config = load(&full_env()).expect("config should load");
        assert_eq!(config.ec2_instance_id, "i-123");
        assert_eq!(config.rds_endpoint, "db.example.com");
        assert_eq!(config.rds_port, 1433);
        assert_eq!(config.secret_arn, "arn:secret:1");
        assert_eq!(config.ssm_document, "ReconnectDoc");
        assert_eq!(config.ad_domain, "CORP");
    }

    #[test]
    fn missing_variable_is_named_in_the_error() {
        let mut env = full_env();
        env.remove("SECRET_ARN");
        assert_matches!(load(&env), Err(ConfigError::MissingVar("SECRET_ARN")));
    }

    #[test]
    fn empty_variable_counts_as_missing() {
        let mut env = full_env();
        env.insert("AD_DOMAIN", "");
        assert_matches!(load(&env), Err(ConfigError::MissingVar("AD_DOMAIN")));
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let mut env = full_env();
        env.insert("RDS_PORT", "fourteen-thirty-three");
        assert_matches!(
            load(&env),
            Err(ConfigError::InvalidPort { value }) if value == "fourteen-thirty-three"
        );
    }
}
