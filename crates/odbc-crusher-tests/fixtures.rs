//! Scriptable in-memory gateway emulating the database families the battery
//! knows about.
//!
//! A [`FamilyProfile`] describes how an emulated driver behaves: the DBMS name
//! it reports, which single-row FROM conventions its parser accepts, which
//! CAST targets it rejects, how it hands back binary data, which catalog
//! functions it lacks and whether it exposes a function bitmap. The
//! [`MockGateway`] built from a profile answers every statement the battery
//! issues by evaluating the scalar SELECT itself, so suites run end to end
//! without a driver manager.
//!
//! # Usage
//!
//! ```rust,ignore
//! use odbc_crusher_tests::fixtures::{FamilyProfile, MockGateway, run_battery};
//!
//! let gateway = MockGateway::new(FamilyProfile::postgres());
//! let outcome = run_battery(&gateway, &Default::default());
//! assert!(!outcome.has_failures());
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use odbc_crusher_core::dialect::FromClause;
use odbc_crusher_core::{
    AttributeValue, BatteryOutcome, BatteryRunner, CatalogFilter, CatalogKind,
    ConnectionDescriptor, Cursor, FunctionBitmap, GatewayError, GatewayResult, InfoType,
    OdbcConnection, OdbcFunction, OdbcGateway, PreparedStatement, RunConfig, Value,
};
use once_cell::sync::Lazy;
use strum::IntoEnumIterator;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

/// Descriptor every fixture run connects with
pub static DESCRIPTOR: Lazy<ConnectionDescriptor> =
    Lazy::new(|| ConnectionDescriptor::new("DSN=crusher;UID=ci;PWD=secret"));

/// How an emulated driver returns a value bound as binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryRepr {
    /// Raw bytes
    Bytes,
    /// PostgreSQL style `\x`-prefixed hex text
    HexText,
    /// Text with one character per byte, as a latin-1 client charset decodes it
    Latin1Text,
    /// Binary casts are rejected
    Unsupported,
}

/// Behaviour of one emulated driver
#[derive(Debug, Clone)]
pub struct FamilyProfile {
    /// Attributes answered by SQLGetInfo; anything else fails with HY096
    pub info: HashMap<InfoType, AttributeValue>,
    /// Single-row table conventions the SQL parser accepts
    pub from_clauses: Vec<FromClause>,
    /// SQLSTATE raised for statements the parser rejects
    pub syntax_error: &'static str,
    /// CAST target base names the parser rejects, uppercase
    pub rejected_casts: Vec<&'static str>,
    /// Representation of binary round trips
    pub binary: BinaryRepr,
    /// Catalog functions the binding reports as missing (IM001)
    pub unsupported_catalogs: Vec<CatalogKind>,
    /// Table names answered by SQLTables
    pub tables: Vec<&'static str>,
    /// `Some` exposes a verified SQLGetFunctions bitmap without these functions
    pub missing_functions: Option<Vec<OdbcFunction>>,
    /// Highest character the connection charset stores; others come back as `?`
    pub max_char: char,
    /// `Value::type_name`s the driver refuses to bind (07006)
    pub unbindable: Vec<&'static str>,
}

impl FamilyProfile {
    fn base(dbms_name: &str, driver_name: &str, from_clauses: Vec<FromClause>) -> Self {
        let mut info = HashMap::new();
        info.insert(InfoType::DbmsName, AttributeValue::Text(dbms_name.into()));
        info.insert(InfoType::DbmsVersion, AttributeValue::Text("1.0".into()));
        info.insert(InfoType::DriverName, AttributeValue::Text(driver_name.into()));
        info.insert(InfoType::DriverVersion, AttributeValue::Text("01.00.0000".into()));
        info.insert(InfoType::DriverOdbcVersion, AttributeValue::Text("03.51".into()));
        info.insert(InfoType::OdbcVersion, AttributeValue::Text("03.52.0000".into()));
        info.insert(InfoType::SqlConformance, AttributeValue::Integer(1));
        info.insert(InfoType::OdbcInterfaceConformance, AttributeValue::Integer(1));
        info.insert(InfoType::TxnCapable, AttributeValue::Integer(2));
        info.insert(InfoType::OjCapabilities, AttributeValue::Integer(0x7));
        info.insert(InfoType::CatalogName, AttributeValue::Text("Y".into()));
        info.insert(InfoType::Procedures, AttributeValue::Text("Y".into()));
        Self {
            info,
            from_clauses,
            syntax_error: "42000",
            rejected_casts: Vec::new(),
            binary: BinaryRepr::Bytes,
            unsupported_catalogs: Vec::new(),
            tables: vec!["customers", "orders"],
            missing_functions: None,
            max_char: char::MAX,
            unbindable: Vec::new(),
        }
    }

    /// PostgreSQL: no FROM clause, `bytea` comes back as hex text
    pub fn postgres() -> Self {
        let mut profile = Self::base("PostgreSQL", "psqlodbcw.so", vec![FromClause::None]);
        profile.binary = BinaryRepr::HexText;
        profile.syntax_error = "42601";
        profile
    }

    /// MySQL: accepts both `FROM DUAL` and no FROM clause
    pub fn mysql() -> Self {
        Self::base(
            "MySQL",
            "libmyodbc8w.so",
            vec![FromClause::None, FromClause::Dual],
        )
    }

    /// Oracle: requires `FROM DUAL` and has no TIME type
    pub fn oracle() -> Self {
        let mut profile = Self::base("Oracle", "libsqora.so", vec![FromClause::Dual]);
        profile.rejected_casts = vec!["TIME"];
        profile.syntax_error = "HY000";
        profile
    }

    /// SQL Server: exposes a complete function bitmap
    pub fn sql_server() -> Self {
        let mut profile = Self::base(
            "Microsoft SQL Server",
            "libmsodbcsql-18.so",
            vec![FromClause::None],
        );
        profile.missing_functions = Some(Vec::new());
        profile
    }

    /// Firebird: requires `FROM RDB$DATABASE`
    pub fn firebird() -> Self {
        let mut profile = Self::base(
            "Firebird",
            "libOdbcFb.so",
            vec![FromClause::RdbDatabase],
        );
        profile.tables = vec!["RDB$RELATIONS", "EMPLOYEE"];
        profile
    }

    /// A Firebird-compatible server whose name the resolver does not know
    pub fn interbase() -> Self {
        let mut profile = Self::firebird();
        profile
            .info
            .insert(InfoType::DbmsName, AttributeValue::Text("InterBase".into()));
        profile
    }

    /// Override the reported DBMS name
    pub fn with_dbms(mut self, name: &str) -> Self {
        self.info
            .insert(InfoType::DbmsName, AttributeValue::Text(name.into()));
        self
    }

    /// Override or add one SQLGetInfo answer
    pub fn with_info(mut self, info: InfoType, value: AttributeValue) -> Self {
        self.info.insert(info, value);
        self
    }

    /// Make SQLGetInfo fail for `info`
    pub fn without_info(mut self, info: InfoType) -> Self {
        self.info.remove(&info);
        self
    }

    /// Report `kind` as not implemented by the binding
    pub fn without_catalog(mut self, kind: CatalogKind) -> Self {
        self.unsupported_catalogs.push(kind);
        self
    }

    /// Expose a verified bitmap that lacks `function`
    pub fn without_function(mut self, function: OdbcFunction) -> Self {
        self.missing_functions
            .get_or_insert_with(Vec::new)
            .push(function);
        self
    }

    /// Change the binary round-trip representation
    pub fn with_binary(mut self, binary: BinaryRepr) -> Self {
        self.binary = binary;
        self
    }

    /// Store text in a charset topping out at `max`, like MySQL's 3-byte `utf8`
    pub fn with_max_char(mut self, max: char) -> Self {
        self.max_char = max;
        self
    }

    /// Reject CAST targets with this base type name
    pub fn rejecting_cast(mut self, base: &'static str) -> Self {
        self.rejected_casts.push(base);
        self
    }

    /// Refuse to bind parameters of this `Value::type_name`
    pub fn without_binding(mut self, type_name: &'static str) -> Self {
        self.unbindable.push(type_name);
        self
    }

    /// Replace the table list answered by SQLTables
    pub fn with_tables(mut self, tables: Vec<&'static str>) -> Self {
        self.tables = tables;
        self
    }

    fn bitmap(&self) -> Option<FunctionBitmap> {
        self.missing_functions.as_ref().map(|missing| {
            FunctionBitmap::from_functions(OdbcFunction::iter().filter(|f| !missing.contains(f)))
        })
    }
}

/// Gateway over a [`FamilyProfile`] that records what the battery did
pub struct MockGateway {
    /// Behaviour of every connection this gateway opens
    pub profile: FamilyProfile,
    /// Refuse every connect with this error
    pub refuse: Option<GatewayError>,
    /// Refuse connects while this many connections are open
    pub max_open: Option<usize>,
    /// Fail this many connect attempts before succeeding
    pub fail_first: usize,
    /// Connect attempts, successful or not
    pub connects: Cell<usize>,
    /// Successful connects
    pub opened: Cell<usize>,
    /// Connections closed
    pub closes: Cell<usize>,
    /// Every statement executed, in order
    pub executed: RefCell<Vec<String>>,
}

impl MockGateway {
    /// Gateway emulating `profile`
    pub fn new(profile: FamilyProfile) -> Self {
        Lazy::force(&TRACING);
        Self {
            profile,
            refuse: None,
            max_open: None,
            fail_first: 0,
            connects: Cell::new(0),
            opened: Cell::new(0),
            closes: Cell::new(0),
            executed: RefCell::new(Vec::new()),
        }
    }

    /// Gateway whose every connect fails with `error`
    pub fn refusing(error: GatewayError) -> Self {
        let mut gateway = Self::new(FamilyProfile::postgres());
        gateway.refuse = Some(error);
        gateway
    }

    /// Allow at most `count` simultaneously open connections
    pub fn limited_to(mut self, count: usize) -> Self {
        self.max_open = Some(count);
        self
    }

    /// Connections opened and not yet closed
    pub fn open_connections(&self) -> usize {
        self.opened.get() - self.closes.get()
    }

    /// Fail the first `count` connect attempts
    pub fn failing_first(mut self, count: usize) -> Self {
        self.fail_first = count;
        self
    }

    /// Open a connection outside of any suite
    pub fn open(&self) -> GatewayResult<Box<dyn OdbcConnection + '_>> {
        self.connect(&DESCRIPTOR, Duration::from_secs(5))
    }

    /// Statements executed so far
    pub fn statements(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    /// Forget recorded statements
    pub fn clear_statements(&self) {
        self.executed.borrow_mut().clear();
    }
}

impl OdbcGateway for MockGateway {
    fn probe_environment(&self) -> GatewayResult<()> {
        Ok(())
    }

    fn connect(
        &self,
        _descriptor: &ConnectionDescriptor,
        _timeout: Duration,
    ) -> GatewayResult<Box<dyn OdbcConnection + '_>> {
        let attempt = self.connects.get() + 1;
        self.connects.set(attempt);
        tracing::debug!(attempt, open = self.open_connections(), "Emulated connect");
        if let Some(error) = &self.refuse {
            return Err(error.clone());
        }
        if attempt <= self.fail_first {
            return Err(GatewayError::new(
                "HY000",
                "lock time-out on wait transaction, database file in use",
            ));
        }
        if self.max_open.is_some_and(|limit| self.open_connections() >= limit) {
            return Err(GatewayError::new(
                "08004",
                "Server rejected the connection: too many connections",
            ));
        }
        self.opened.set(self.opened.get() + 1);
        Ok(Box::new(MockConnection {
            gateway: self,
            autocommit: Cell::new(true),
        }))
    }
}

/// Connection evaluating the battery's probe statements
pub struct MockConnection<'g> {
    gateway: &'g MockGateway,
    autocommit: Cell<bool>,
}

impl MockConnection<'_> {
    fn profile(&self) -> &FamilyProfile {
        &self.gateway.profile
    }

    fn syntax_error(&self, message: impl Into<String>) -> GatewayError {
        GatewayError::new(self.profile().syntax_error, message)
    }

    fn select(&self, sql: &str, params: &[Value]) -> GatewayResult<Cursor> {
        let (sql, no_rows) = match sql.strip_suffix(" WHERE 1=0") {
            Some(sql) => (sql, true),
            None => (sql, false),
        };
        let body = sql
            .strip_prefix("SELECT ")
            .ok_or_else(|| self.syntax_error(format!("Unexpected statement: {sql}")))?;
        let (list, clause) = match body.split_once(" FROM ") {
            Some((list, "RDB$DATABASE")) => (list, FromClause::RdbDatabase),
            Some((list, "DUAL")) => (list, FromClause::Dual),
            Some((_, table)) => {
                return Err(GatewayError::new("42S02", format!("Table unknown: {table}")));
            }
            None => (body, FromClause::None),
        };
        if !self.profile().from_clauses.contains(&clause) {
            return Err(self.syntax_error(format!("Syntax error near '{body}'")));
        }

        let items = if list.starts_with("CAST(") {
            vec![("value".to_string(), self.cast(list, params)?)]
        } else {
            list.split(", ")
                .map(|item| self.item(item, params))
                .collect::<GatewayResult<Vec<_>>>()?
        };
        let (columns, values): (Vec<String>, Vec<Value>) = items.into_iter().unzip();
        let rows = if no_rows { Vec::new() } else { vec![values] };
        Ok(Cursor::new(columns, rows))
    }

    /// One `literal [AS alias]` select list item
    fn item(&self, item: &str, params: &[Value]) -> GatewayResult<(String, Value)> {
        let (literal, alias) = match item.split_once(" AS ") {
            Some((literal, alias)) => (literal, alias.to_string()),
            None => (item, "value".to_string()),
        };
        let value = if literal == "?" {
            self.param(params)?
        } else if let Ok(number) = literal.parse::<i64>() {
            Value::Int64(number)
        } else if let Some(text) = literal.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
            Value::from(text)
        } else {
            return Err(self.syntax_error(format!("Cannot evaluate '{literal}'")));
        };
        Ok((alias, value))
    }

    fn cast(&self, expression: &str, params: &[Value]) -> GatewayResult<Value> {
        let target = expression
            .strip_prefix("CAST(? AS ")
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| self.syntax_error(format!("Cannot evaluate '{expression}'")))?;
        let base = target
            .split(['(', ' '])
            .next()
            .unwrap_or(target)
            .to_uppercase();
        if self.profile().rejected_casts.contains(&base.as_str()) {
            return Err(self.syntax_error(format!("Data type unknown: {target}")));
        }

        match self.param(params)? {
            Value::Bytes(bytes) => match self.profile().binary {
                BinaryRepr::Bytes => Ok(Value::Bytes(bytes)),
                BinaryRepr::HexText => Ok(Value::String(format!("\\x{}", hex::encode(bytes)))),
                BinaryRepr::Latin1Text => {
                    Ok(Value::String(bytes.into_iter().map(char::from).collect()))
                }
                BinaryRepr::Unsupported => Err(GatewayError::new(
                    "HYC00",
                    format!("Optional feature not implemented: CAST AS {target}"),
                )),
            },
            value => Ok(value),
        }
    }

    /// The first bound parameter as the driver stores it
    fn param(&self, params: &[Value]) -> GatewayResult<Value> {
        let value = params
            .first()
            .cloned()
            .ok_or_else(|| GatewayError::new("07002", "COUNT field incorrect"))?;
        if self.profile().unbindable.contains(&value.type_name()) {
            return Err(GatewayError::new(
                "07006",
                format!("Restricted data type attribute violation: {}", value.type_name()),
            ));
        }
        let max_char = self.profile().max_char;
        Ok(match value {
            Value::String(text) => Value::String(
                text.chars()
                    .map(|c| if c > max_char { '?' } else { c })
                    .collect(),
            ),
            value => value,
        })
    }

    fn catalog_rows(&self, kind: CatalogKind, filter: &CatalogFilter) -> Cursor {
        let table = Value::String(filter.table.clone().unwrap_or_default());
        let schema = Value::from("public");
        let index = |suffix: &str| match &table {
            Value::String(name) => Value::String(format!("{name}_{suffix}")),
            _ => Value::Null,
        };
        let (columns, rows): (&[&str], Vec<Vec<Value>>) = match kind {
            CatalogKind::Tables => (
                TABLE_COLUMNS,
                self.profile()
                    .tables
                    .iter()
                    .map(|name| {
                        vec![
                            Value::Null,
                            schema.clone(),
                            Value::from(*name),
                            Value::from("TABLE"),
                            Value::Null,
                        ]
                    })
                    .collect(),
            ),
            CatalogKind::Columns => (
                COLUMN_COLUMNS,
                [("id", 4, "INTEGER"), ("name", 12, "VARCHAR")]
                    .into_iter()
                    .map(|(column, code, type_name)| {
                        vec![
                            Value::Null,
                            schema.clone(),
                            table.clone(),
                            Value::from(column),
                            Value::Int64(code),
                            Value::from(type_name),
                        ]
                    })
                    .collect(),
            ),
            CatalogKind::PrimaryKeys => (
                PRIMARY_KEY_COLUMNS,
                vec![vec![
                    Value::Null,
                    schema.clone(),
                    table.clone(),
                    Value::from("id"),
                    Value::Int64(1),
                    index("pkey"),
                ]],
            ),
            CatalogKind::ForeignKeys => (FOREIGN_KEY_COLUMNS, Vec::new()),
            CatalogKind::Statistics => (
                STATISTICS_COLUMNS,
                vec![
                    // SQL_TABLE_STAT row, no index name
                    vec![
                        Value::Null,
                        schema.clone(),
                        table.clone(),
                        Value::Null,
                        Value::Null,
                        Value::Null,
                    ],
                    vec![
                        Value::Null,
                        schema.clone(),
                        table.clone(),
                        Value::Int64(0),
                        Value::Null,
                        index("pkey"),
                    ],
                ],
            ),
            CatalogKind::TypeInfo => (
                TYPE_INFO_COLUMNS,
                [("INTEGER", 4, 10), ("VARCHAR", 12, 255), ("TIMESTAMP", 93, 26)]
                    .into_iter()
                    .map(|(name, code, size)| {
                        let mut row = vec![Value::Null; TYPE_INFO_COLUMNS.len()];
                        row[0] = Value::from(name);
                        row[1] = Value::Int64(code);
                        row[2] = Value::Int64(size);
                        row[6] = Value::Int64(1);
                        row[7] = Value::Int64(0);
                        row[8] = Value::Int64(3);
                        row[11] = Value::Int64(0);
                        row[12] = Value::from(name);
                        row
                    })
                    .collect(),
            ),
        };
        Cursor::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }
}

const TABLE_COLUMNS: &[&str] = &["TABLE_CAT", "TABLE_SCHEM", "TABLE_NAME", "TABLE_TYPE", "REMARKS"];
const COLUMN_COLUMNS: &[&str] = &[
    "TABLE_CAT",
    "TABLE_SCHEM",
    "TABLE_NAME",
    "COLUMN_NAME",
    "DATA_TYPE",
    "TYPE_NAME",
];
const PRIMARY_KEY_COLUMNS: &[&str] = &[
    "TABLE_CAT",
    "TABLE_SCHEM",
    "TABLE_NAME",
    "COLUMN_NAME",
    "KEY_SEQ",
    "PK_NAME",
];
const FOREIGN_KEY_COLUMNS: &[&str] = &["PKTABLE_CAT", "PKTABLE_SCHEM", "PKTABLE_NAME", "PKCOLUMN_NAME"];
const STATISTICS_COLUMNS: &[&str] = &[
    "TABLE_CAT",
    "TABLE_SCHEM",
    "TABLE_NAME",
    "NON_UNIQUE",
    "INDEX_QUALIFIER",
    "INDEX_NAME",
];
const TYPE_INFO_COLUMNS: &[&str] = &[
    "TYPE_NAME",
    "DATA_TYPE",
    "COLUMN_SIZE",
    "LITERAL_PREFIX",
    "LITERAL_SUFFIX",
    "CREATE_PARAMS",
    "NULLABLE",
    "CASE_SENSITIVE",
    "SEARCHABLE",
    "UNSIGNED_ATTRIBUTE",
    "FIXED_PREC_SCALE",
    "AUTO_UNIQUE_VALUE",
    "LOCAL_TYPE_NAME",
    "MINIMUM_SCALE",
    "MAXIMUM_SCALE",
];

impl OdbcConnection for MockConnection<'_> {
    fn get_info(&self, info: InfoType) -> GatewayResult<AttributeValue> {
        self.profile()
            .info
            .get(&info)
            .cloned()
            .ok_or_else(|| GatewayError::new("HY096", "Information type out of range"))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> GatewayResult<Cursor> {
        self.gateway.executed.borrow_mut().push(sql.to_string());
        if sql.starts_with("CREATE ") || sql.starts_with("DROP ") {
            return Ok(Cursor::empty());
        }
        self.select(sql, params)
    }

    fn prepare<'c>(&'c self, sql: &str) -> GatewayResult<Box<dyn PreparedStatement + 'c>> {
        Ok(Box::new(MockPrepared {
            conn: self,
            sql: sql.to_string(),
        }))
    }

    fn catalog(&self, kind: CatalogKind, filter: &CatalogFilter) -> GatewayResult<Cursor> {
        if self.profile().unsupported_catalogs.contains(&kind) {
            return Err(GatewayError::unsupported(&kind.to_string()));
        }
        Ok(self.catalog_rows(kind, filter))
    }

    fn allocate_statements(&self, _count: usize) -> GatewayResult<()> {
        Ok(())
    }

    fn autocommit(&self) -> GatewayResult<bool> {
        Ok(self.autocommit.get())
    }

    fn set_autocommit(&self, enabled: bool) -> GatewayResult<()> {
        self.autocommit.set(enabled);
        Ok(())
    }

    fn commit(&self) -> GatewayResult<()> {
        Ok(())
    }

    fn rollback(&self) -> GatewayResult<()> {
        Ok(())
    }

    fn function_bitmap(&self) -> GatewayResult<Option<FunctionBitmap>> {
        Ok(self.profile().bitmap())
    }

    fn has_binding(&self, _function: OdbcFunction) -> bool {
        true
    }

    fn close(self: Box<Self>) -> GatewayResult<()> {
        self.gateway.closes.set(self.gateway.closes.get() + 1);
        Ok(())
    }
}

struct MockPrepared<'c> {
    conn: &'c MockConnection<'c>,
    sql: String,
}

impl PreparedStatement for MockPrepared<'_> {
    fn execute(&mut self, params: &[Value]) -> GatewayResult<Cursor> {
        self.conn.execute(&self.sql, params)
    }
}

/// Run the whole battery against `gateway`
pub fn run_battery(gateway: &MockGateway, config: &RunConfig) -> BatteryOutcome {
    BatteryRunner::new(gateway, &DESCRIPTOR, config).run()
}

/// Config without connect retry delays
pub fn fast_config() -> RunConfig {
    RunConfig {
        retry_delay_ms: 0,
        ..RunConfig::default()
    }
}
