//! ODBC Crusher Core - the dialect-aware test battery engine
//!
//! This crate drives an ODBC driver through a fixed battery of conformance
//! probes and classifies what it finds. It defines:
//!
//! - `OdbcGateway` / `OdbcConnection` - the boundary to a native ODBC client
//! - `DialectResolver` - database family detection and fallback SQL candidates
//! - `CapabilityProbe` - the driver attribute/function/type snapshot
//! - `Suite` and `BatteryRunner` - the seven ordered test suites
//! - `TestResult`, `Summary` and the SQLSTATE diagnostic mapper

pub mod capability;
mod config;
mod connection;
mod diagnostic;
pub mod dialect;
mod error;
mod gateway;
mod report;
mod result;
mod runner;
pub mod suites;
mod types;

pub use capability::{
    CapabilityProbe, CapabilitySnapshot, FunctionBitmap, InfoKind, InfoType, Nullability,
    OdbcFunction, SupportProvenance, TypeDescriptor,
};
pub use config::*;
pub use connection::*;
pub use diagnostic::*;
pub use dialect::{DatabaseFamily, DialectFeature, DialectResolver, Fallback};
pub use error::*;
pub use gateway::*;
pub use report::*;
pub use result::*;
pub use runner::*;
pub use suites::{Suite, SuiteContext};
pub use types::*;

#[cfg(test)]
mod test_support;
