//! Connection handling.
//!
//! A run holds at most one live connection. It starts in [`ConnectionMode::Administrative`]
//! (statements autocommit; used for listing/creating databases) and is replaced by a
//! [`ConnectionMode::Target`] connection scoped to the destination database, where table DDL and
//! row inserts only run inside explicit transactions.

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config as PgConfig, NoTls, Transaction};
use tracing::{debug, info, warn};

use crate::error::{LoadError, LoadResult};

/// Database that always exists on a PostgreSQL server.
pub const ADMIN_DATABASE: &str = "postgres";

/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

/// Server address and credentials.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    /// Target database name.
    pub database: String,
    pub username: String,
    #[serde(skip)]
    pub password: String,
}

impl std::fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConnectParams {
    /// `true` if the host denotes the local machine.
    pub fn is_local(&self) -> bool {
        let host = self.host.trim();
        host.starts_with("localhost") || host == "127.0.0.1" || host == "::1"
    }

    /// Database for the first connection of a run.
    ///
    /// A local server may not have the target database yet, so the first connection goes to
    /// [`ADMIN_DATABASE`]. Remote targets are assumed to exist.
    pub fn initial_database(&self) -> &str {
        if self.is_local() {
            ADMIN_DATABASE
        } else {
            &self.database
        }
    }
}

/// Transaction discipline of a [`PgConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionMode {
    /// Every statement commits on its own. Required for `CREATE DATABASE`.
    Administrative,
    /// Work happens only inside explicit transactions.
    Target,
}

/// A live connection plus the task driving its socket.
pub struct PgConnection {
    client: Client,
    database: String,
    mode: ConnectionMode,
    driver: JoinHandle<()>,
}

impl PgConnection {
    /// Open a connection to `database` on the server described by `params`.
    pub async fn open(params: &ConnectParams, database: &str, mode: ConnectionMode) -> LoadResult<Self> {
        let mut config = PgConfig::new();
        config
            .host(&params.host)
            .port(params.port)
            .dbname(database)
            .user(&params.username)
            .password(&params.password)
            .application_name(env!("CARGO_PKG_NAME"));

        debug!(host = %params.host, port = params.port, database, ?mode, "connecting");
        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|source| LoadError::Connection {
                host: params.host.clone(),
                port: params.port,
                database: database.to_string(),
                source,
            })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("connection closed with error: {e}");
            }
        });

        info!("Connected to PostgreSQL: {}:{}/{}", params.host, params.port, database);
        Ok(Self {
            client,
            database: database.to_string(),
            mode,
            driver,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Start an explicit transaction.
    pub async fn transaction(&mut self) -> Result<Transaction<'_>, tokio_postgres::Error> {
        debug_assert_eq!(self.mode, ConnectionMode::Target, "transactions run on the target connection");
        self.client.transaction().await
    }

    /// Close the connection and wait for its driver task to finish.
    pub async fn close(self) {
        let Self { client, database, driver, .. } = self;
        drop(client);
        if let Err(e) = driver.await {
            warn!("connection task for {database} did not shut down cleanly: {e}");
        }
        debug!(database, "connection closed");
    }
}

/// Owner of the run's single connection slot.
///
/// Replacing the connection closes the previous one first; [`Session::close`] closes whatever is
/// open, so callers can close exactly once on every exit path.
#[derive(Default)]
pub struct Session {
    conn: Option<PgConnection>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the first, administrative connection.
    pub async fn connect(&mut self, params: &ConnectParams) -> LoadResult<&mut PgConnection> {
        let conn = PgConnection::open(params, params.initial_database(), ConnectionMode::Administrative).await?;
        Ok(self.replace(conn).await)
    }

    /// Close the current connection and reopen scoped to the target database.
    pub async fn reconnect_target(&mut self, params: &ConnectParams) -> LoadResult<&mut PgConnection> {
        if let Some(old) = self.conn.take() {
            old.close().await;
        }
        let conn = PgConnection::open(params, &params.database, ConnectionMode::Target).await?;
        Ok(self.replace(conn).await)
    }

    async fn replace(&mut self, conn: PgConnection) -> &mut PgConnection {
        if let Some(old) = self.conn.take() {
            old.close().await;
        }
        self.conn.insert(conn)
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Close the open connection, if any. Returns `true` if one was closed.
    pub async fn close(&mut self) -> bool {
        match self.conn.take() {
            Some(conn) => {
                conn.close().await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(host: &str) -> ConnectParams {
        ConnectParams {
            host: host.to_string(),
            port: DEFAULT_PORT,
            database: "sales".to_string(),
            username: "loader".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn local_hosts_start_on_the_admin_database() {
        assert_eq!(params("localhost").initial_database(), ADMIN_DATABASE);
        assert_eq!(params("127.0.0.1").initial_database(), ADMIN_DATABASE);
        assert_eq!(params("db.internal").initial_database(), "sales");
    }

    #[test]
    fn debug_output_redacts_the_password() {
        let rendered = format!("{:?}", params("localhost"));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let mut p = params("127.0.0.1");
        p.port = 1;
        let mut session = Session::new();
        let err = match session.connect(&p).await {
            Ok(_) => panic!("connected to a closed port"),
            Err(e) => e,
        };
        assert!(matches!(err, LoadError::Connection { port: 1, .. }));
        assert!(!session.is_open());
        assert!(!session.close().await);
    }
}
