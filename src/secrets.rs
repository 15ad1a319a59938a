//! Domain credential retrieval from AWS Secrets Manager.
//!
//! The secret payload is a JSON object carrying an Active Directory
//! service-account username and password. It is decoded into a typed
//! [`DomainCredentials`] record at the boundary; a payload missing either
//! field (or carrying an empty one) is rejected before any database
//! connection is attempted.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::BoxError;

/// Secret payload field carrying the AD username.
pub const USERNAME_FIELD: &str = "CUSTOMER_MANAGED_ACTIVE_DIRECTORY_USERNAME";

/// Secret payload field carrying the AD password.
pub const PASSWORD_FIELD: &str = "CUSTOMER_MANAGED_ACTIVE_DIRECTORY_PASSWORD";

/// Active Directory service-account credentials decoded from the secret
/// payload. Held in memory only for the duration of one invocation.
#[derive(Clone, Deserialize)]
pub struct DomainCredentials {
    /// AD account name, without the domain qualifier.
    #[serde(rename = "CUSTOMER_MANAGED_ACTIVE_DIRECTORY_USERNAME")]
    pub username: String,
    /// AD account password.
    #[serde(rename = "CUSTOMER_MANAGED_ACTIVE_DIRECTORY_PASSWORD")]
    pub password: String,
}

// Manual Debug so the password can never leak into logs.
impl std::fmt::Debug for DomainCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Errors from the secret-resolution stage.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    /// The secret service call itself failed (unreachable, not found,
    /// access denied). The SDK fault is preserved as the source.
    #[error("Failed to retrieve secret {secret_id}: {source}")]
    Retrieval {
        /// The secret reference that was requested.
        secret_id: String,
        #[source]
        source: BoxError,
    },

    /// The secret exists but carries no string payload.
    #[error("Secret {secret_id} has no string payload")]
    MissingPayload {
        /// The secret reference that was requested.
        secret_id: String,
    },

    /// The payload is not valid JSON or lacks a required field.
    #[error("Malformed secret payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field is present but empty.
    #[error("Secret payload field {0} is empty")]
    EmptyField(&'static str),
}

impl DomainCredentials {
    /// Decode and validate a raw secret string payload.
    pub fn from_secret_string(payload: &str) -> Result<Self, SecretError> {
        let credentials: Self = serde_json::from_str(payload)?;
        if credentials.username.is_empty() {
            return Err(SecretError::EmptyField(USERNAME_FIELD));
        }
        if credentials.password.is_empty() {
            return Err(SecretError::EmptyField(PASSWORD_FIELD));
        }
        Ok(credentials)
    }
}

/// Source of domain credentials for the database probe.
#[async_trait]
pub trait SecretStore {
    /// Resolve the credential pair behind an opaque secret reference.
    /// No retry; any fault propagates.
    async fn resolve(&self, secret_id: &str) -> Result<DomainCredentials, SecretError>;
}

/// Production [`SecretStore`] backed by AWS Secrets Manager.
pub struct SecretsManagerStore {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerStore {
    /// Create a store from the shared AWS configuration.
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(config),
        }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn resolve(&self, secret_id: &str) -> Result<DomainCredentials, SecretError> {
        let value = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| SecretError::Retrieval {
                secret_id: secret_id.to_string(),
                source: Box::new(e),
            })?;

        let payload = value.secret_string().ok_or_else(|| SecretError::MissingPayload {
            secret_id: secret_id.to_string(),
        })?;

        DomainCredentials::from_secret_string(payload)
    }
}
