//! `rds-dns-change` -- Lambda entrypoint.
//!
//! Wires the production collaborators (Secrets Manager, SQL Server,
//! Systems Manager) into the [`DnsChangeHandler`] pipeline and serves
//! invocations through the Lambda runtime. The triggering event payload
//! is opaque; it is logged and otherwise unused.
//!
//! # Environment variables
//!
//! | Variable          | Required | Description                              |
//! |-------------------|----------|------------------------------------------|
//! | `EC2_INSTANCE_ID` | yes      | Target EC2 instance for the SSM command  |
//! | `RDS_ENDPOINT`    | yes      | RDS SQL Server endpoint hostname         |
//! | `RDS_PORT`        | yes      | RDS SQL Server port                      |
//! | `SECRET_ARN`      | yes      | Secrets Manager ARN of the credentials   |
//! | `SSM_DOCUMENT`    | yes      | SSM command document to dispatch         |
//! | `AD_DOMAIN`       | yes      | AD domain qualifying the database login  |

use std::sync::Arc;

use lambda_runtime::{service_fn, LambdaEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rds_dns_change::config::HandlerConfig;
use rds_dns_change::db::SqlServerProbe;
use rds_dns_change::handler::DnsChangeHandler;
use rds_dns_change::secrets::SecretsManagerStore;
use rds_dns_change::ssm::SsmCommandRunner;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rds_dns_change=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = HandlerConfig::from_env()?;

    let aws_config =
        aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let probe = SqlServerProbe::new(
        config.rds_endpoint.clone(),
        config.rds_port,
        config.ad_domain.clone(),
    );

    let handler = Arc::new(DnsChangeHandler::new(
        config,
        SecretsManagerStore::new(&aws_config),
        probe,
        SsmCommandRunner::new(&aws_config),
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<serde_json::Value>| {
        let handler = Arc::clone(&handler);
        async move {
            handler
                .handle(&event.payload)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
}
