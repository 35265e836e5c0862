//! Connection pre-check, retrying connect and identity lookup

use indexmap::IndexMap;
use serde::Serialize;

use crate::capability::InfoType;
use crate::config::RunConfig;
use crate::error::GatewayResult;
use crate::gateway::{ConnectionDescriptor, OdbcConnection, OdbcGateway};

/// Value reported for identity attributes the driver would not answer
pub const UNKNOWN: &str = "Unknown";

const IDENTITY_ATTRIBUTES: &[(&str, InfoType)] = &[
    ("driver_name", InfoType::DriverName),
    ("driver_version", InfoType::DriverVersion),
    ("driver_odbc_version", InfoType::DriverOdbcVersion),
    ("dbms_name", InfoType::DbmsName),
    ("dbms_version", InfoType::DbmsVersion),
    ("odbc_version", InfoType::OdbcVersion),
    ("server_name", InfoType::ServerName),
    ("database_name", InfoType::DatabaseName),
    ("user_name", InfoType::UserName),
];

/// Outcome of the pre-flight connection check
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionCheck {
    pub success: bool,
    /// `[SQLSTATE] message` of the failure
    pub error: Option<String>,
    pub diagnostic: Option<String>,
    /// Driver identity, only gathered when requested
    pub info: IndexMap<String, String>,
}

/// Read one attribute as text, `"Unknown"` when unavailable
pub fn info_or_unknown(conn: &dyn OdbcConnection, info: InfoType) -> String {
    match conn.get_info(info) {
        Ok(value) => value.to_string(),
        Err(e) => {
            tracing::debug!(attribute = info.name(), error = %e, "Attribute unavailable");
            UNKNOWN.to_string()
        }
    }
}

/// Identity attributes of an open connection
pub fn connection_info(conn: &dyn OdbcConnection) -> IndexMap<String, String> {
    IDENTITY_ATTRIBUTES
        .iter()
        .map(|(key, info)| (key.to_string(), info_or_unknown(conn, *info)))
        .collect()
}

/// Connect, retrying up to `connect_attempts` times with a fixed delay.
///
/// Some drivers fail spuriously when a database file is briefly locked by a
/// previous connection.
pub fn connect_with_retry<'g>(
    gateway: &'g dyn OdbcGateway,
    descriptor: &ConnectionDescriptor,
    config: &RunConfig,
) -> GatewayResult<Box<dyn OdbcConnection + 'g>> {
    let attempts = config.connect_attempts.max(1);
    let mut attempt = 1;
    loop {
        match gateway.connect(descriptor, config.connection_timeout()) {
            Ok(conn) => return Ok(conn),
            Err(e) if attempt < attempts => {
                tracing::warn!(attempt, sqlstate = %e.sqlstate, "Connect failed, retrying");
                std::thread::sleep(config.retry_delay());
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Try to connect once, reporting a diagnostic on failure.
pub fn check_connection(
    gateway: &dyn OdbcGateway,
    descriptor: &ConnectionDescriptor,
    config: &RunConfig,
    collect_info: bool,
) -> ConnectionCheck {
    tracing::info!(descriptor = %descriptor.redacted(), "Checking connection");
    match connect_with_retry(gateway, descriptor, config) {
        Ok(conn) => {
            let info = if collect_info {
                connection_info(conn.as_ref())
            } else {
                IndexMap::new()
            };
            if let Err(e) = conn.close() {
                tracing::warn!(error = %e, "Failed to close pre-check connection");
            }
            ConnectionCheck {
                success: true,
                error: None,
                diagnostic: None,
                info,
            }
        }
        Err(e) => ConnectionCheck {
            success: false,
            diagnostic: Some(e.diagnostic()),
            error: Some(e.to_string()),
            info: IndexMap::new(),
        },
    }
}
