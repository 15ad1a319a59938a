//! SQL Server probe for the instance's self-reported server name.
//!
//! Opens one short-lived connection against the `master` database using a
//! domain-qualified login, runs `SELECT @@SERVERNAME`, and reads at most
//! one row/one column. The connection never outlives the probe: it is
//! closed explicitly after the query, and dropped (which tears down the
//! TCP stream) on every error path.

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::error::BoxError;
use crate::secrets::DomainCredentials;

/// The single query this probe is allowed to run.
const SERVER_NAME_QUERY: &str = "SELECT @@SERVERNAME";

/// Database selected for the session; the probe needs no schema beyond it.
const ADMIN_DATABASE: &str = "master";

/// Errors from the database-probing stage.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// TCP or TDS handshake failure while opening the connection.
    #[error("Failed to connect to SQL Server at {endpoint}:{port}: {source}")]
    Connect {
        /// Endpoint the probe attempted to reach.
        endpoint: String,
        /// Port the probe attempted to reach.
        port: u16,
        #[source]
        source: BoxError,
    },

    /// The server-name query failed after the connection was established.
    #[error("Server name query failed: {0}")]
    Query(#[from] tiberius::error::Error),
}

/// Source of the database server's self-reported name.
#[async_trait]
pub trait ServerNameProbe {
    /// Run the probe with the given credentials.
    ///
    /// Returns `Ok(None)` when the query yields no row or a NULL column;
    /// the caller decides what to substitute.
    async fn server_name(
        &self,
        credentials: &DomainCredentials,
    ) -> Result<Option<String>, DatabaseError>;
}

/// Production [`ServerNameProbe`] backed by [`tiberius`].
pub struct SqlServerProbe {
    endpoint: String,
    port: u16,
    ad_domain: String,
}

impl SqlServerProbe {
    /// Create a probe targeting one SQL Server endpoint.
    pub fn new(endpoint: String, port: u16, ad_domain: String) -> Self {
        Self {
            endpoint,
            port,
            ad_domain,
        }
    }

    fn connect_error(&self, source: BoxError) -> DatabaseError {
        DatabaseError::Connect {
            endpoint: self.endpoint.clone(),
            port: self.port,
            source,
        }
    }

    async fn connect(
        &self,
        credentials: &DomainCredentials,
    ) -> Result<Client<Compat<TcpStream>>, DatabaseError> {
        // RDS expects the classic DOMAIN\user login form.
        let login = format!("{}\\{}", self.ad_domain, credentials.username);

        let mut config = Config::new();
        config.host(&self.endpoint);
        config.port(self.port);
        config.database(ADMIN_DATABASE);
        config.authentication(AuthMethod::sql_server(&login, &credentials.password));
        config.trust_cert();

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| self.connect_error(Box::new(e)))?;
        tcp.set_nodelay(true)
            .map_err(|e| self.connect_error(Box::new(e)))?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| self.connect_error(Box::new(e)))
    }

    async fn query_server_name(
        client: &mut Client<Compat<TcpStream>>,
    ) -> Result<Option<String>, DatabaseError> {
        let stream = client.simple_query(SERVER_NAME_QUERY).await?;
        let row = stream.into_row().await?;
        Ok(row.and_then(|row| row.get::<&str, _>(0).map(str::to_string)))
    }
}

#[async_trait]
impl ServerNameProbe for SqlServerProbe {
    async fn server_name(
        &self,
        credentials: &DomainCredentials,
    ) -> Result<Option<String>, DatabaseError> {
        let mut client = self.connect(credentials).await?;

        let result = Self::query_server_name(&mut client).await;

        // Release the connection whether or not the query succeeded.
        if let Err(e) = client.close().await {
            tracing::warn!(error = %e, "Error closing SQL Server connection");
        }

        result
    }
}
