//! Module for connecting to a postgres database and using one of its tables as the ledger store.
//!
//! Every contract invocation runs inside one database transaction. Concurrent inserts for the same
//! key are resolved by the primary key constraint of the ledger table.
use openssl::ssl::{SslConnector, SslFiletype, SslMethod, SslVerifyMode};
use postgres::{Client, Transaction};
use postgres_openssl::MakeTlsConnector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{KeyValue, LedgerStore, StoreError};

static SQL_CREATE_LEDGER: &'static str = include_str!("sql/create_ledger.sql");

static SQL_SELECT_STATE: &'static str = include_str!("sql/select_state.sql");
static SQL_SELECT_ALL_STATES: &'static str = include_str!("sql/select_all_states.sql");

static SQL_UPSERT_STATE: &'static str = include_str!("sql/upsert_state.sql");
static SQL_INSERT_STATE_IF_ABSENT: &'static str = include_str!("sql/insert_state_if_absent.sql");

#[derive(Serialize, Deserialize, Debug, Clone)]
/// Struct modeling the parameters required for a database connection.
///
/// This includes SSL/TLS encryption.
pub struct DatabaseParameters
{
    /// The hostname of the database server.
    pub hostname: String,
    /// The port for the database server.
    pub port: u32,
    /// The username to connect as.
    pub username: String,
    /// The password to connect with.
    pub password: String,
    /// The database to open on the server.
    pub database: String,
    /// Flag to enable tls for the database server connection.
    pub tls_enable: bool,
    /// Parameters for the tls connection to the database server.
    pub tls_params: Option<DatabaseTlsParameters>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
/// Struct for the parameters required for a tls connection to the database.
pub struct DatabaseTlsParameters {
    /// The path to the server certificate for TLS encryption.
    pub server_ca_path: String,
    /// The path to the client certificate for TLS encryption.
    pub client_cert_path: String,
    /// The path to the client key for TLS encryption.
    pub client_key_path: String,
}

#[derive(Error, Debug)]
/// Failure to open a database connection.
pub enum DatabaseError {
    #[error("TLS enabled but no TLS parameters specified")]
    MissingTlsParameters,
    #[error("Could not configure the tls connection: {0}")]
    Tls(#[from] openssl::error::ErrorStack),
    #[error("Could not establish database connection: {0}")]
    Connection(#[from] postgres::Error),
}

impl From<postgres::Error> for StoreError {
    fn from(err: postgres::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl DatabaseParameters {
    /// Connection string in the key/value form understood by postgres.
    pub fn connection_string(&self) -> String {
        format!("user={} password={} host={} port={} dbname={} application_name=reading-ledger",
                self.username,
                self.password,
                self.hostname,
                self.port,
                self.database)
    }
}

/// Function to open a connection to the database server.
///
/// # Arguments
///
/// * `connection_parameters` - Parameters for the database connection.
///
/// # Errors
///
/// Errors occur when one of the following conditions is met:
///
/// * TLS is enabled but no TLS parameters are given.
///
/// * The files for the TLS connection cannot be found.
///
/// * The connection cannot be established.
///
/// * The the user is not authorized for the database.
///
pub fn connect(connection_parameters: &DatabaseParameters) -> Result<Client, DatabaseError>
{
    let connection_string = connection_parameters.connection_string();

    let client = if connection_parameters.tls_enable {
        let tls_params = connection_parameters
            .tls_params
            .as_ref()
            .ok_or(DatabaseError::MissingTlsParameters)?;

        let mut ssl_connection_builder = SslConnector::builder(SslMethod::tls())?;
        ssl_connection_builder.set_verify(SslVerifyMode::NONE);
        ssl_connection_builder.set_ca_file(&tls_params.server_ca_path)?;
        ssl_connection_builder.set_certificate_file(&tls_params.client_cert_path, SslFiletype::PEM)?;
        ssl_connection_builder.set_private_key_file(&tls_params.client_key_path, SslFiletype::PEM)?;

        let tls_connector = MakeTlsConnector::new(ssl_connection_builder.build());
        Client::connect(connection_string.as_str(), tls_connector)?
    } else {
        Client::connect(connection_string.as_str(), postgres::NoTls)?
    };

    log::info!(target: "reading_ledger::db", "Database connection established!");
    Ok(client)
}

/// Creates the ledger table if it does not exist yet.
pub fn create_ledger(database_client: &mut Client) -> Result<(), StoreError>
{
    database_client.batch_execute(SQL_CREATE_LEDGER)?;
    log::info!(target: "reading_ledger::db", "Ledger table is ready!");
    Ok(())
}

/// Ledger store backed by the `ledger_state` table, scoped to one database transaction.
///
/// Dropping the store without calling [`PostgresStore::commit`] rolls back every write.
pub struct PostgresStore<'a> {
    transaction: Transaction<'a>,
}

impl<'a> PostgresStore<'a> {
    /// Opens a new database transaction on the client.
    pub fn begin(database_client: &'a mut Client) -> Result<Self, StoreError> {
        let transaction = database_client.transaction()?;
        log::trace!(target: "reading_ledger::db", "Transaction started!");
        Ok(PostgresStore { transaction })
    }

    pub fn commit(self) -> Result<(), StoreError> {
        self.transaction.commit()?;
        log::debug!(target: "reading_ledger::db", "Transaction committed!");
        Ok(())
    }
}

impl<'a> LedgerStore for PostgresStore<'a> {
    fn read(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let row = self.transaction.query_opt(SQL_SELECT_STATE, &[&key])?;
        match row {
            Some(row) => Ok(Some(row.try_get::<_, String>("value")?)),
            None => Ok(None),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.transaction.execute(SQL_UPSERT_STATE, &[&key, &value])?;
        Ok(())
    }

    fn insert_if_absent(&mut self, key: &str, value: &str) -> Result<bool, StoreError> {
        let inserted_rows = self.transaction.execute(SQL_INSERT_STATE_IF_ABSENT, &[&key, &value])?;
        Ok(inserted_rows == 1)
    }

    fn scan_all(&mut self) -> Result<Vec<KeyValue>, StoreError> {
        let rows = self.transaction.query(SQL_SELECT_ALL_STATES, &[])?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(KeyValue {
                key: row.try_get("key")?,
                value: row.try_get("value")?,
            });
        }
        Ok(entries)
    }
}
