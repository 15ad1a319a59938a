//! Remote command dispatch via AWS Systems Manager.
//!
//! Submits a named command document to one EC2 instance, blocks on the
//! SDK's built-in `command_executed` waiter until the remote service
//! reports a terminal state, then fetches the captured standard output.
//! Only a completed command reaches output retrieval; failure and timeout
//! both surface as a distinct wait error. The command is never retried.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_ssm::client::Waiters;

use crate::error::BoxError;

/// Command parameter naming the RDS endpoint.
pub const PARAM_RDS_ENDPOINT: &str = "RDSEndpoint";

/// Command parameter naming the RDS port.
pub const PARAM_RDS_PORT: &str = "RDSPort";

/// Command parameter naming the discovered server name(s).
pub const PARAM_SERVER_NAMES: &str = "ServerNames";

/// One remote command invocation: target, document, parameters, and the
/// upper bound on execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    /// EC2 instance the document runs on.
    pub instance_id: String,
    /// Name of the SSM command document.
    pub document: String,
    /// Document parameters; each value is a one-element list of strings.
    pub parameters: HashMap<String, Vec<String>>,
    /// Execution timeout, also used to bound the completion wait.
    pub timeout: Duration,
}

impl CommandRequest {
    /// Build the request for the endpoint-change document.
    pub fn new(
        instance_id: String,
        document: String,
        rds_endpoint: &str,
        rds_port: u16,
        server_name: &str,
        timeout: Duration,
    ) -> Self {
        let parameters = HashMap::from([
            (PARAM_RDS_ENDPOINT.to_string(), vec![rds_endpoint.to_string()]),
            (PARAM_RDS_PORT.to_string(), vec![rds_port.to_string()]),
            (PARAM_SERVER_NAMES.to_string(), vec![server_name.to_string()]),
        ]);

        Self {
            instance_id,
            document,
            parameters,
            timeout,
        }
    }
}

/// Errors from the command-dispatch stage.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Submission of the command document failed.
    #[error("Failed to submit command to instance {instance_id}: {source}")]
    Submit {
        /// The instance the submission targeted.
        instance_id: String,
        #[source]
        source: BoxError,
    },

    /// The submission response carried no command id to poll on.
    #[error("Command submission returned no command id")]
    MissingCommandId,

    /// The completion wait failed or timed out. The original waiter
    /// error is preserved as the source.
    #[error("Error waiting for command {command_id} to finish: {source}")]
    Wait {
        /// The command whose completion was being awaited.
        command_id: String,
        #[source]
        source: BoxError,
    },

    /// Fetching the finished command's output failed.
    #[error("Failed to fetch output for command {command_id}: {source}")]
    Output {
        /// The command whose output was requested.
        command_id: String,
        #[source]
        source: BoxError,
    },
}

/// Executes one remote command and returns its captured standard output.
#[async_trait]
pub trait CommandRunner {
    /// Submit the command, wait for completion, and return its stdout.
    async fn run(&self, request: &CommandRequest) -> Result<String, DispatchError>;
}

/// Production [`CommandRunner`] backed by AWS Systems Manager.
pub struct SsmCommandRunner {
    client: aws_sdk_ssm::Client,
}

impl SsmCommandRunner {
    /// Create a runner from the shared AWS configuration.
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }
}

#[async_trait]
impl CommandRunner for SsmCommandRunner {
    async fn run(&self, request: &CommandRequest) -> Result<String, DispatchError> {
        let submitted = self
            .client
            .send_command()
            .instance_ids(&request.instance_id)
            .document_name(&request.document)
            .set_parameters(Some(request.parameters.clone()))
            .timeout_seconds(request.timeout.as_secs() as i32)
            .send()
            .await
            .map_err(|e| DispatchError::Submit {
                instance_id: request.instance_id.clone(),
                source: Box::new(e),
            })?;

        let command_id = submitted
            .command()
            .and_then(|command| command.command_id())
            .map(str::to_string)
            .ok_or(DispatchError::MissingCommandId)?;

        tracing::info!(
            command_id = %command_id,
            instance_id = %request.instance_id,
            "Command sent to EC2 instance",
        );

        self.client
            .wait_until_command_executed()
            .command_id(&command_id)
            .instance_id(&request.instance_id)
            .wait(request.timeout)
            .await
            .map_err(|e| DispatchError::Wait {
                command_id: command_id.clone(),
                source: Box::new(e),
            })?;

        tracing::info!(command_id = %command_id, "Command execution completed");

        let invocation = self
            .client
            .get_command_invocation()
            .command_id(&command_id)
            .instance_id(&request.instance_id)
            .send()
            .await
            .map_err(|e| DispatchError::Output {
                command_id: command_id.clone(),
                source: Box::new(e),
            })?;

        Ok(invocation
            .standard_output_content()
            .unwrap_or_default()
            .to_string())
    }
}
