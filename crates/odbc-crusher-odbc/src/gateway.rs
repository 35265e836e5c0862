//! Process-wide ODBC environment and connection factory

use std::time::Duration;

use odbc_api::{ConnectionOptions, Environment};
use once_cell::sync::Lazy;
use odbc_crusher_core::{
    ConnectionDescriptor, GatewayError, GatewayResult, OdbcConnection, OdbcGateway,
};

use crate::connection::OdbcApiConnection;
use crate::convert::map_error;

/// One environment per process, shared by every connection.
static ENV: Lazy<Result<Environment, GatewayError>> = Lazy::new(|| {
    tracing::debug!("Allocating ODBC environment");
    Environment::new().map_err(map_error)
});

/// Gateway over the system driver manager
#[derive(Debug, Default, Clone, Copy)]
pub struct OdbcApiGateway;

impl OdbcApiGateway {
    pub fn new() -> Self {
        Self
    }

    fn environment(&self) -> GatewayResult<&'static Environment> {
        ENV.as_ref().map_err(Clone::clone)
    }
}

impl OdbcGateway for OdbcApiGateway {
    fn probe_environment(&self) -> GatewayResult<()> {
        // A throwaway environment, so the shared one is not what gets freed
        let env = Environment::new().map_err(map_error)?;
        drop(env);
        Ok(())
    }

    #[tracing::instrument(skip(self, descriptor), fields(descriptor = %descriptor.redacted()))]
    fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        timeout: Duration,
    ) -> GatewayResult<Box<dyn OdbcConnection + '_>> {
        let env = self.environment()?;
        let options = ConnectionOptions {
            login_timeout_sec: Some(u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX)),
            ..ConnectionOptions::default()
        };
        let conn = env
            .connect_with_connection_string(descriptor.as_str(), options)
            .map_err(map_error)?;
        tracing::debug!("Connected");
        Ok(Box::new(OdbcApiConnection::new(conn)))
    }
}
