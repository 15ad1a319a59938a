//! Sequential pipeline for one invocation.
//!
//! Resolve credentials, probe the database for its server name, dispatch
//! the SSM command, and report the outcome. Control flows strictly top to
//! bottom; every stage fault is logged and re-raised unchanged. The one
//! absorbed condition is an empty server-name result, which is replaced
//! with a literal placeholder so the command can still be sent.

use std::time::Duration;

use serde::Serialize;

use crate::config::HandlerConfig;
use crate::db::ServerNameProbe;
use crate::error::HandlerError;
use crate::secrets::SecretStore;
use crate::ssm::{CommandRequest, CommandRunner};

/// Substituted when the server-name query returns no row.
pub const UNKNOWN_SERVER_NAME: &str = "Unknown";

/// Body of a successful response, before JSON encoding.
pub const SUCCESS_MESSAGE: &str = "Process completed successfully.";

/// Upper bound on remote command execution and the completion wait.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Result returned to the invoking framework on success.
///
/// Serializes as `{"statusCode": 200, "body": "\"...\""}` -- the body is
/// itself a JSON-encoded string, matching the contract of the framework
/// this step runs under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// Numeric status code; 200 on success.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded human-readable message.
    pub body: String,
}

impl HandlerResponse {
    fn success() -> Self {
        Self {
            status_code: 200,
            body: serde_json::Value::String(SUCCESS_MESSAGE.to_string()).to_string(),
        }
    }
}

/// Orchestrates the secret, database, and command stages for one event.
///
/// The collaborators are generic seams so tests can substitute mocks for
/// the AWS and SQL Server clients.
pub struct DnsChangeHandler<S, P, R> {
    config: HandlerConfig,
    secrets: S,
    probe: P,
    runner: R,
}

impl<S, P, R> DnsChangeHandler<S, P, R>
where
    S: SecretStore + Send + Sync,
    P: ServerNameProbe + Send + Sync,
    R: CommandRunner + Send + Sync,
{
    /// Create a handler from its configuration and collaborators.
    pub fn new(config: HandlerConfig, secrets: S, probe: P, runner: R) -> Self {
        Self {
            config,
            secrets,
            probe,
            runner,
        }
    }

    /// Run the full pipeline for one triggering event.
    ///
    /// The event payload is opaque: it is logged verbatim and otherwise
    /// unused. Any stage fault aborts the invocation.
    pub async fn handle(
        &self,
        event: &serde_json::Value,
    ) -> Result<HandlerResponse, HandlerError> {
        tracing::info!(event = %event, "Received event");

        let credentials = self
            .secrets
            .resolve(&self.config.secret_arn)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to retrieve credentials from Secrets Manager");
                e
            })?;

        let server_name = match self.probe.server_name(&credentials).await {
            Ok(Some(name)) => {
                tracing::info!(server_name = %name, "Server name discovered");
                name
            }
            Ok(None) => {
                tracing::warn!("No server name returned from the query");
                UNKNOWN_SERVER_NAME.to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, "Error connecting to or querying SQL Server");
                return Err(e.into());
            }
        };

        let request = CommandRequest::new(
            self.config.ec2_instance_id.clone(),
            self.config.ssm_document.clone(),
            &self.config.rds_endpoint,
            self.config.rds_port,
            &server_name,
            COMMAND_TIMEOUT,
        );

        let output = self.runner.run(&request).await.map_err(|e| {
            tracing::error!(error = %e, "Error executing SSM command");
            e
        })?;

        tracing::info!(output = %output, "Command output");

        Ok(HandlerResponse::success())
    }
}
