//! Boundary to the native ODBC client library.
//!
//! Everything the battery knows about a driver flows through these two
//! traits. Implementations are synchronous and blocking; the battery never
//! issues two calls concurrently.

use std::fmt;
use std::time::Duration;

use crate::capability::{FunctionBitmap, InfoType, OdbcFunction};
use crate::error::GatewayResult;
use crate::types::{AttributeValue, Cursor, Value};

/// Connection string handed to the driver manager untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor(String);

const SECRET_KEYS: &[&str] = &["PWD", "PASSWORD"];

impl ConnectionDescriptor {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The descriptor with password values masked, safe to log.
    pub fn redacted(&self) -> String {
        self.0
            .split(';')
            .map(|pair| match pair.split_once('=') {
                Some((key, _)) if SECRET_KEYS.iter().any(|s| key.trim().eq_ignore_ascii_case(s)) => {
                    format!("{}=***", key)
                }
                _ => pair.to_string(),
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionDescriptor")
            .field(&self.redacted())
            .finish()
    }
}

impl From<&str> for ConnectionDescriptor {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ConnectionDescriptor {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Catalog functions a driver may implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum CatalogKind {
    #[strum(serialize = "SQLTables")]
    Tables,
    #[strum(serialize = "SQLColumns")]
    Columns,
    #[strum(serialize = "SQLPrimaryKeys")]
    PrimaryKeys,
    #[strum(serialize = "SQLForeignKeys")]
    ForeignKeys,
    #[strum(serialize = "SQLStatistics")]
    Statistics,
    #[strum(serialize = "SQLGetTypeInfo")]
    TypeInfo,
}

impl CatalogKind {
    /// The ODBC function backing this catalog call
    pub fn function(self) -> OdbcFunction {
        match self {
            CatalogKind::Tables => OdbcFunction::Tables,
            CatalogKind::Columns => OdbcFunction::Columns,
            CatalogKind::PrimaryKeys => OdbcFunction::PrimaryKeys,
            CatalogKind::ForeignKeys => OdbcFunction::ForeignKeys,
            CatalogKind::Statistics => OdbcFunction::Statistics,
            CatalogKind::TypeInfo => OdbcFunction::GetTypeInfo,
        }
    }
}

/// Filters for a catalog call. `None` means "any".
///
/// For foreign keys, `table` names the referencing (foreign key) table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub table_type: Option<String>,
}

impl CatalogFilter {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn table_type(kind: impl Into<String>) -> Self {
        Self {
            table_type: Some(kind.into()),
            ..Default::default()
        }
    }

    pub fn in_schema(mut self, catalog: Option<String>, schema: Option<String>) -> Self {
        self.catalog = catalog;
        self.schema = schema;
        self
    }
}

/// Entry point of a native ODBC client: one per process.
pub trait OdbcGateway {
    /// Allocate an environment handle and release it again.
    fn probe_environment(&self) -> GatewayResult<()>;

    /// Open a connection, waiting at most `timeout` for the login to complete.
    fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        timeout: Duration,
    ) -> GatewayResult<Box<dyn OdbcConnection + '_>>;
}

/// An open connection handle.
pub trait OdbcConnection {
    /// SQLGetInfo
    fn get_info(&self, info: InfoType) -> GatewayResult<AttributeValue>;

    /// Execute a statement directly, binding `params` positionally.
    fn execute(&self, sql: &str, params: &[Value]) -> GatewayResult<Cursor>;

    /// Prepare a statement for repeated execution.
    fn prepare<'c>(&'c self, sql: &str) -> GatewayResult<Box<dyn PreparedStatement + 'c>>;

    /// Run a catalog function. Returns `IM001` when the binding lacks it.
    fn catalog(&self, kind: CatalogKind, filter: &CatalogFilter) -> GatewayResult<Cursor>;

    /// Allocate `count` statement handles at once, then free them all.
    fn allocate_statements(&self, count: usize) -> GatewayResult<()>;

    fn autocommit(&self) -> GatewayResult<bool>;

    fn set_autocommit(&self, enabled: bool) -> GatewayResult<()>;

    fn commit(&self) -> GatewayResult<()>;

    fn rollback(&self) -> GatewayResult<()>;

    /// The driver's SQLGetFunctions bitmap, `None` when the platform binding
    /// cannot query it.
    fn function_bitmap(&self) -> GatewayResult<Option<FunctionBitmap>>;

    /// Whether the binding exposes `function` at all. Says nothing about the
    /// driver actually implementing it.
    fn has_binding(&self, function: OdbcFunction) -> bool;

    /// Disconnect and free the handle.
    fn close(self: Box<Self>) -> GatewayResult<()>;
}

/// A prepared statement bound to its connection
pub trait PreparedStatement {
    fn execute(&mut self, params: &[Value]) -> GatewayResult<Cursor>;
}
