//! ODBC Crusher gateway backed by `odbc-api`
//!
//! Connects through the platform driver manager. The binding only exposes
//! part of the ODBC surface; anything missing answers `IM001` so the battery
//! records it as unsupported instead of failing.

mod connection;
mod convert;
mod gateway;

pub use connection::OdbcApiConnection;
pub use gateway::OdbcApiGateway;
