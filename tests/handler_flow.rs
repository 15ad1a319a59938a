//! End-to-end pipeline tests with mocked collaborators.
//!
//! Substitutes in-memory implementations of the secret store, the server
//! name probe, and the command runner to verify the sequential pipeline:
//! parameter wiring, the `"Unknown"` placeholder, the success contract,
//! and transparent propagation of stage faults.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;

use rds_dns_change::config::HandlerConfig;
use rds_dns_change::db::{DatabaseError, ServerNameProbe};
use rds_dns_change::error::HandlerError;
use rds_dns_change::handler::DnsChangeHandler;
use rds_dns_change::secrets::{DomainCredentials, SecretError, SecretStore};
use rds_dns_change::ssm::{CommandRequest, CommandRunner, DispatchError};

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

/// Secret store serving a fixed payload.
struct StaticSecretStore {
    payload: &'static str,
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn resolve(&self, secret_id: &str) -> Result<DomainCredentials, SecretError> {
        assert_eq!(secret_id, "arn:secret:1");
        DomainCredentials::from_secret_string(self.payload)
    }
}

/// Probe returning a fixed result, recording whether it ran.
#[derive(Clone)]
struct FixedProbe {
    name: Option<&'static str>,
    called: Arc<AtomicBool>,
}

impl FixedProbe {
    fn returning(name: Option<&'static str>) -> Self {
        Self {
            name,
            called: Arc::new(AtomicBool::new(false)),
        }
    }

    fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServerNameProbe for FixedProbe {
    async fn server_name(
        &self,
        credentials: &DomainCredentials,
    ) -> Result<Option<String>, DatabaseError> {
        self.called.store(true, Ordering::SeqCst);
        assert_eq!(credentials.username, "svc");
        assert_eq!(credentials.password, "pw");
        Ok(self.name.map(str::to_string))
    }
}

/// Runner that records the dispatched request and returns fixed output.
#[derive(Clone)]
struct RecordingRunner {
    output: &'static str,
    seen: Arc<Mutex<Option<CommandRequest>>>,
}

impl RecordingRunner {
    fn new(output: &'static str) -> Self {
        Self {
            output,
            seen: Arc::new(Mutex::new(None)),
        }
    }

    fn dispatched(&self) -> CommandRequest {
        self.seen
            .lock()
            .unwrap()
            .clone()
            .expect("a command should have been dispatched")
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, request: &CommandRequest) -> Result<String, DispatchError> {
        *self.seen.lock().unwrap() = Some(request.clone());
        Ok(self.output.to_string())
    }
}

/// Runner whose completion wait always fails, simulating a poll timeout.
struct TimedOutRunner;

#[async_trait]
impl CommandRunner for TimedOutRunner {
    async fn run(&self, _request: &CommandRequest) -> Result<String, DispatchError> {
        Err(DispatchError::Wait {
            command_id: "cmd-42".to_string(),
            source: "waiter exceeded max wait time".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const VALID_PAYLOAD: &str = r#"{
    "CUSTOMER_MANAGED_ACTIVE_DIRECTORY_USERNAME": "svc",
    "CUSTOMER_MANAGED_ACTIVE_DIRECTORY_PASSWORD": "pw"
}"#;

fn fixture_config() -> HandlerConfig {
    HandlerConfig::from_lookup(|name| {
        let value = match name {
            "EC2_INSTANCE_ID" => "i-123",
            "RDS_ENDPOINT" => "db.example.com",
            "RDS_PORT" => "1433",
            "SECRET_ARN" => "arn:secret:1",
            "SSM_DOCUMENT" => "ReconnectDoc",
            "AD_DOMAIN" => "CORP",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("fixture config should load")
}

fn event() -> serde_json::Value {
    serde_json::json!({"detail": {"SourceIdentifier": "db-instance-1"}})
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Happy path: the response matches the framework contract exactly.
#[tokio::test]
async fn successful_run_returns_200_and_the_success_body() {
    let handler = DnsChangeHandler::new(
        fixture_config(),
        StaticSecretStore {
            payload: VALID_PAYLOAD,
        },
        FixedProbe::returning(Some("MYSERVER")),
        RecordingRunner::new("ok"),
    );

    let response = handler
        .handle(&event())
        .await
        .expect("pipeline should succeed");

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({
            "statusCode": 200,
            "body": "\"Process completed successfully.\"",
        })
    );
}

/// The dispatched request carries the document, target instance, timeout,
/// and the exact three one-element-list parameters.
#[tokio::test]
async fn dispatched_parameters_match_the_document_contract() {
    let runner = RecordingRunner::new("ok");
    let handler = DnsChangeHandler::new(
        fixture_config(),
        StaticSecretStore {
            payload: VALID_PAYLOAD,
        },
        FixedProbe::returning(Some("MYSERVER")),
        runner.clone(),
    );

    handler
        .handle(&event())
        .await
        .expect("pipeline should succeed");

    let request = runner.dispatched();
    assert_eq!(request.instance_id, "i-123");
    assert_eq!(request.document, "ReconnectDoc");
    assert_eq!(request.timeout, Duration::from_secs(600));
    assert_eq!(
        request.parameters,
        HashMap::from([
            (
                "RDSEndpoint".to_string(),
                vec!["db.example.com".to_string()]
            ),
            ("RDSPort".to_string(), vec!["1433".to_string()]),
            ("ServerNames".to_string(), vec!["MYSERVER".to_string()]),
        ])
    );
}

/// An empty query result is absorbed: the command still goes out, with
/// the literal placeholder as the server name.
#[tokio::test]
async fn missing_server_name_substitutes_unknown() {
    let runner = RecordingRunner::new("ok");
    let handler = DnsChangeHandler::new(
        fixture_config(),
        StaticSecretStore {
            payload: VALID_PAYLOAD,
        },
        FixedProbe::returning(None),
        runner.clone(),
    );

    let response = handler
        .handle(&event())
        .await
        .expect("pipeline should succeed");
    assert_eq!(response.status_code, 200);

    assert_eq!(
        runner.dispatched().parameters["ServerNames"],
        vec!["Unknown".to_string()]
    );
}

/// A malformed secret fails the invocation before the database probe runs.
#[tokio::test]
async fn bad_secret_fails_before_any_database_connection() {
    let probe = FixedProbe::returning(Some("MYSERVER"));
    let handler = DnsChangeHandler::new(
        fixture_config(),
        StaticSecretStore {
            payload: r#"{"CUSTOMER_MANAGED_ACTIVE_DIRECTORY_USERNAME": "svc"}"#,
        },
        probe.clone(),
        RecordingRunner::new("ok"),
    );

    let error = handler
        .handle(&event())
        .await
        .expect_err("pipeline should fail");

    assert_matches!(error, HandlerError::Secret(SecretError::Malformed(_)));
    assert!(!probe.was_called(), "probe must not run");
}

/// A simulated poll failure surfaces the wait error itself to the caller,
/// not a wrapped or generic error.
#[tokio::test]
async fn wait_failure_surfaces_the_original_wait_error() {
    let handler = DnsChangeHandler::new(
        fixture_config(),
        StaticSecretStore {
            payload: VALID_PAYLOAD,
        },
        FixedProbe::returning(Some("MYSERVER")),
        TimedOutRunner,
    );

    let error = handler
        .handle(&event())
        .await
        .expect_err("pipeline should fail");

    assert_matches!(
        &error,
        HandlerError::Dispatch(DispatchError::Wait { command_id, .. }) if command_id == "cmd-42"
    );

    // Transparent wrapping: the top-level display is the wait error's own.
    assert_eq!(
        error.to_string(),
        "Error waiting for command cmd-42 to finish: waiter exceeded max wait time"
    );
}
