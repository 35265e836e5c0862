//! A connection opened through `odbc-api`

use std::cell::Cell;

use odbc_api::{Connection, Prepared, handles::StatementImpl};
use odbc_crusher_core::{
    AttributeValue, CatalogFilter, CatalogKind, Cursor, FunctionBitmap, GatewayError,
    GatewayResult, InfoType, OdbcConnection, OdbcFunction, PreparedStatement, Value,
};

use crate::convert::{bind, drain, map_error};

/// Functions this binding can actually call
const BOUND_FUNCTIONS: &[OdbcFunction] = &[
    OdbcFunction::Connect,
    OdbcFunction::DriverConnect,
    OdbcFunction::Disconnect,
    OdbcFunction::ExecDirect,
    OdbcFunction::Prepare,
    OdbcFunction::Execute,
    OdbcFunction::Fetch,
    OdbcFunction::CloseCursor,
    OdbcFunction::Tables,
    OdbcFunction::Columns,
    OdbcFunction::ForeignKeys,
    OdbcFunction::GetData,
    OdbcFunction::BindCol,
    OdbcFunction::BindParameter,
    OdbcFunction::DescribeCol,
    OdbcFunction::NumResultCols,
    OdbcFunction::RowCount,
    OdbcFunction::EndTran,
    OdbcFunction::GetInfo,
    OdbcFunction::SetConnectAttr,
    OdbcFunction::AllocHandle,
    OdbcFunction::FreeHandle,
    OdbcFunction::GetDiagRec,
];

pub struct OdbcApiConnection {
    conn: Connection<'static>,
    /// `odbc-api` only sets the attribute, so the current mode is tracked here
    autocommit: Cell<bool>,
}

impl OdbcApiConnection {
    pub(crate) fn new(conn: Connection<'static>) -> Self {
        Self {
            conn,
            autocommit: Cell::new(true),
        }
    }

    fn integer<T: Into<i64>>(value: Result<T, odbc_api::Error>) -> GatewayResult<AttributeValue> {
        value
            .map(|v| AttributeValue::Integer(v.into()))
            .map_err(map_error)
    }

    fn text(value: Result<String, odbc_api::Error>) -> GatewayResult<AttributeValue> {
        value.map(AttributeValue::Text).map_err(map_error)
    }
}

/// Catalog filters take `""` for "no filter"
fn pattern(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

impl OdbcConnection for OdbcApiConnection {
    fn get_info(&self, info: InfoType) -> GatewayResult<AttributeValue> {
        match info {
            InfoType::DbmsName => Self::text(self.conn.database_management_system_name()),
            InfoType::DatabaseName => Self::text(self.conn.current_catalog()),
            InfoType::MaxColumnNameLen => Self::integer(self.conn.max_column_name_len()),
            InfoType::MaxTableNameLen => Self::integer(self.conn.max_table_name_len()),
            other => Err(GatewayError::unsupported(&format!("SQLGetInfo({})", other.name()))),
        }
    }

    fn execute(&self, sql: &str, params: &[Value]) -> GatewayResult<Cursor> {
        let params = bind(params);
        let mut statement = self.conn.preallocate().map_err(map_error)?;
        match statement.execute(sql, params.as_slice()).map_err(map_error)? {
            Some(cursor) => drain(cursor),
            None => Ok(Cursor::empty()),
        }
    }

    fn prepare<'c>(&'c self, sql: &str) -> GatewayResult<Box<dyn PreparedStatement + 'c>> {
        let prepared = self.conn.prepare(sql).map_err(map_error)?;
        Ok(Box::new(OdbcApiPrepared { prepared }))
    }

    fn catalog(&self, kind: CatalogKind, filter: &CatalogFilter) -> GatewayResult<Cursor> {
        let catalog = pattern(&filter.catalog);
        let schema = pattern(&filter.schema);
        let table = pattern(&filter.table);
        match kind {
            CatalogKind::Tables => {
                let cursor = self
                    .conn
                    .tables(catalog, schema, table, pattern(&filter.table_type))
                    .map_err(map_error)?;
                drain(cursor)
            }
            CatalogKind::Columns => {
                let cursor = self
                    .conn
                    .columns(catalog, schema, table, "")
                    .map_err(map_error)?;
                drain(cursor)
            }
            CatalogKind::ForeignKeys => {
                let cursor = self
                    .conn
                    .foreign_keys("", "", "", catalog, schema, table)
                    .map_err(map_error)?;
                drain(cursor)
            }
            CatalogKind::PrimaryKeys | CatalogKind::Statistics | CatalogKind::TypeInfo => {
                Err(GatewayError::unsupported(&kind.to_string()))
            }
        }
    }

    fn allocate_statements(&self, count: usize) -> GatewayResult<()> {
        let statements = (0..count)
            .map(|_| self.conn.preallocate().map_err(map_error))
            .collect::<GatewayResult<Vec<_>>>()?;
        tracing::trace!(count = statements.len(), "Statement handles allocated");
        Ok(())
    }

    fn autocommit(&self) -> GatewayResult<bool> {
        Ok(self.autocommit.get())
    }

    fn set_autocommit(&self, enabled: bool) -> GatewayResult<()> {
        self.conn.set_autocommit(enabled).map_err(map_error)?;
        self.autocommit.set(enabled);
        Ok(())
    }

    fn commit(&self) -> GatewayResult<()> {
        self.conn.commit().map_err(map_error)
    }

    fn rollback(&self) -> GatewayResult<()> {
        self.conn.rollback().map_err(map_error)
    }

    fn function_bitmap(&self) -> GatewayResult<Option<FunctionBitmap>> {
        // odbc-api does not expose SQLGetFunctions; capability collection falls back to has_binding
        Ok(None)
    }

    fn has_binding(&self, function: OdbcFunction) -> bool {
        BOUND_FUNCTIONS.contains(&function)
    }

    fn close(self: Box<Self>) -> GatewayResult<()> {
        // Dropping the connection disconnects and frees the handle
        drop(self);
        Ok(())
    }
}

struct OdbcApiPrepared<'c> {
    prepared: Prepared<StatementImpl<'c>>,
}

impl PreparedStatement for OdbcApiPrepared<'_> {
    fn execute(&mut self, params: &[Value]) -> GatewayResult<Cursor> {
        let params = bind(params);
        match self.prepared.execute(params.as_slice()).map_err(map_error)? {
            Some(cursor) => drain(cursor),
            None => Ok(Cursor::empty()),
        }
    }
}
