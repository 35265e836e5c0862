//! End-to-end battery scenarios against emulated drivers.
//!
//! Every scenario runs the real suites from `odbc-crusher-core` through the
//! in-memory [`fixtures::MockGateway`], which answers like a PostgreSQL,
//! MySQL, Oracle, SQL Server or Firebird driver would. No driver manager is
//! needed.
//!
//! # Test Organization
//!
//! - `dialect_tests` - family detection and FROM clause fallback
//! - `datatype_tests` - type round trips and binary representations
//! - `metadata_tests` - catalog functions, absent functions and empty databases
//! - `connection_tests` - refused, limited and flaky connections
//! - `battery_tests` - full runs per family
//! - `report_tests` - report shape and summary arithmetic
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p odbc-crusher-tests
//! RUST_LOG=odbc_crusher_core=debug cargo test -p odbc-crusher-tests -- --nocapture
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fixtures;

#[cfg(test)]
mod battery_tests;
#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod datatype_tests;
#[cfg(test)]
mod dialect_tests;
#[cfg(test)]
mod metadata_tests;
#[cfg(test)]
mod report_tests;
