//! `rds-dns-change` library crate.
//!
//! Automation step triggered when an RDS SQL Server endpoint changes:
//! resolves domain credentials from Secrets Manager, probes the database
//! for its self-reported server name, then dispatches an SSM command
//! document to the EC2 instance that needs to be re-pointed at the new
//! endpoint. The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod secrets;
pub mod ssm;
