//! Static registries of SQLGetInfo attributes and ODBC API functions

use serde::{Deserialize, Serialize};

/// How a driver answers an info request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    /// Character string, including Y/N flags
    Text,
    /// SQLUSMALLINT/SQLUINTEGER code or bitmask
    Integer,
}

/// Driver attributes collected into the capability snapshot, in report order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InfoType {
    DriverName,
    #[strum(serialize = "DRIVER_VER")]
    #[serde(rename = "DRIVER_VER")]
    DriverVersion,
    #[strum(serialize = "DRIVER_ODBC_VER")]
    #[serde(rename = "DRIVER_ODBC_VER")]
    DriverOdbcVersion,
    DbmsName,
    #[strum(serialize = "DBMS_VER")]
    #[serde(rename = "DBMS_VER")]
    DbmsVersion,
    DatabaseName,
    ServerName,
    DataSourceName,
    UserName,
    SqlConformance,
    #[strum(serialize = "ODBC_VER")]
    #[serde(rename = "ODBC_VER")]
    OdbcVersion,
    OdbcInterfaceConformance,
    CatalogName,
    CatalogTerm,
    SchemaTerm,
    TableTerm,
    ProcedureTerm,
    IdentifierQuoteChar,
    IdentifierCase,
    QuotedIdentifierCase,
    MaxColumnNameLen,
    MaxTableNameLen,
    MaxColumnsInSelect,
    MaxColumnsInTable,
    MaxStatementLen,
    MaxTablesInSelect,
    TxnCapable,
    DefaultTxnIsolation,
    MultipleActiveTxn,
    Procedures,
    MultResultSets,
    AccessibleTables,
    AccessibleProcedures,
    OuterJoins,
    OjCapabilities,
    NullCollation,
    CursorCommitBehavior,
    CursorRollbackBehavior,
    DataSourceReadOnly,
    FileUsage,
    CollationSeq,
    StringFunctions,
    NumericFunctions,
    TimedateFunctions,
    SystemFunctions,
    ConvertFunctions,
}

impl InfoType {
    /// SQLGetInfo information type id
    pub fn id(self) -> u16 {
        match self {
            InfoType::DriverName => 6,
            InfoType::DriverVersion => 7,
            InfoType::DriverOdbcVersion => 77,
            InfoType::DbmsName => 17,
            InfoType::DbmsVersion => 18,
            InfoType::DatabaseName => 16,
            InfoType::ServerName => 13,
            InfoType::DataSourceName => 2,
            InfoType::UserName => 47,
            InfoType::SqlConformance => 118,
            InfoType::OdbcVersion => 10,
            InfoType::OdbcInterfaceConformance => 152,
            InfoType::CatalogName => 10003,
            InfoType::CatalogTerm => 42,
            InfoType::SchemaTerm => 39,
            InfoType::TableTerm => 45,
            InfoType::ProcedureTerm => 40,
            InfoType::IdentifierQuoteChar => 29,
            InfoType::IdentifierCase => 28,
            InfoType::QuotedIdentifierCase => 93,
            InfoType::MaxColumnNameLen => 30,
            InfoType::MaxTableNameLen => 35,
            InfoType::MaxColumnsInSelect => 100,
            InfoType::MaxColumnsInTable => 101,
            InfoType::MaxStatementLen => 105,
            InfoType::MaxTablesInSelect => 106,
            InfoType::TxnCapable => 46,
            InfoType::DefaultTxnIsolation => 26,
            InfoType::MultipleActiveTxn => 37,
            InfoType::Procedures => 21,
            InfoType::MultResultSets => 36,
            InfoType::AccessibleTables => 19,
            InfoType::AccessibleProcedures => 20,
            InfoType::OuterJoins => 38,
            InfoType::OjCapabilities => 115,
            InfoType::NullCollation => 85,
            InfoType::CursorCommitBehavior => 23,
            InfoType::CursorRollbackBehavior => 24,
            InfoType::DataSourceReadOnly => 25,
            InfoType::FileUsage => 74,
            InfoType::CollationSeq => 10004,
            InfoType::StringFunctions => 50,
            InfoType::NumericFunctions => 49,
            InfoType::TimedateFunctions => 52,
            InfoType::SystemFunctions => 51,
            InfoType::ConvertFunctions => 48,
        }
    }

    pub fn kind(self) -> InfoKind {
        match self {
            InfoType::SqlConformance
            | InfoType::OdbcInterfaceConformance
            | InfoType::IdentifierCase
            | InfoType::QuotedIdentifierCase
            | InfoType::MaxColumnNameLen
            | InfoType::MaxTableNameLen
            | InfoType::MaxColumnsInSelect
            | InfoType::MaxColumnsInTable
            | InfoType::MaxStatementLen
            | InfoType::MaxTablesInSelect
            | InfoType::TxnCapable
            | InfoType::DefaultTxnIsolation
            | InfoType::OjCapabilities
            | InfoType::NullCollation
            | InfoType::CursorCommitBehavior
            | InfoType::CursorRollbackBehavior
            | InfoType::FileUsage
            | InfoType::StringFunctions
            | InfoType::NumericFunctions
            | InfoType::TimedateFunctions
            | InfoType::SystemFunctions
            | InfoType::ConvertFunctions => InfoKind::Integer,
            _ => InfoKind::Text,
        }
    }

    /// Registry key used in the snapshot and reports
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// ODBC API functions whose support the probe records
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum OdbcFunction {
    #[strum(serialize = "SQLConnect")]
    Connect,
    #[strum(serialize = "SQLDriverConnect")]
    DriverConnect,
    #[strum(serialize = "SQLDisconnect")]
    Disconnect,
    #[strum(serialize = "SQLExecDirect")]
    ExecDirect,
    #[strum(serialize = "SQLPrepare")]
    Prepare,
    #[strum(serialize = "SQLExecute")]
    Execute,
    #[strum(serialize = "SQLFetch")]
    Fetch,
    #[strum(serialize = "SQLFetchScroll")]
    FetchScroll,
    #[strum(serialize = "SQLMoreResults")]
    MoreResults,
    #[strum(serialize = "SQLCloseCursor")]
    CloseCursor,
    #[strum(serialize = "SQLCancel")]
    Cancel,
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
    #[strum(serialize = "SQLSpecialColumns")]
    SpecialColumns,
    #[strum(serialize = "SQLProcedures")]
    Procedures,
    #[strum(serialize = "SQLProcedureColumns")]
    ProcedureColumns,
    #[strum(serialize = "SQLGetData")]
    GetData,
    #[strum(serialize = "SQLBindCol")]
    BindCol,
    #[strum(serialize = "SQLBindParameter")]
    BindParameter,
    #[strum(serialize = "SQLDescribeCol")]
    DescribeCol,
    #[strum(serialize = "SQLNumResultCols")]
    NumResultCols,
    #[strum(serialize = "SQLRowCount")]
    RowCount,
    #[strum(serialize = "SQLEndTran")]
    EndTran,
    #[strum(serialize = "SQLGetInfo")]
    GetInfo,
    #[strum(serialize = "SQLGetFunctions")]
    GetFunctions,
    #[strum(serialize = "SQLGetTypeInfo")]
    GetTypeInfo,
    #[strum(serialize = "SQLGetConnectAttr")]
    GetConnectAttr,
    #[strum(serialize = "SQLSetConnectAttr")]
    SetConnectAttr,
    #[strum(serialize = "SQLAllocHandle")]
    AllocHandle,
    #[strum(serialize = "SQLFreeHandle")]
    FreeHandle,
    #[strum(serialize = "SQLGetDiagRec")]
    GetDiagRec,
}

impl OdbcFunction {
    /// SQL_API_* function id
    pub fn id(self) -> u16 {
        match self {
            OdbcFunction::Connect => 7,
            OdbcFunction::DriverConnect => 41,
            OdbcFunction::Disconnect => 9,
            OdbcFunction::ExecDirect => 11,
            OdbcFunction::Prepare => 19,
            OdbcFunction::Execute => 12,
            OdbcFunction::Fetch => 13,
            OdbcFunction::FetchScroll => 1021,
            OdbcFunction::MoreResults => 61,
            OdbcFunction::CloseCursor => 1003,
            OdbcFunction::Cancel => 5,
            OdbcFunction::Tables => 54,
            OdbcFunction::Columns => 40,
            OdbcFunction::PrimaryKeys => 65,
            OdbcFunction::ForeignKeys => 60,
            OdbcFunction::Statistics => 53,
            OdbcFunction::SpecialColumns => 52,
            OdbcFunction::Procedures => 67,
            OdbcFunction::ProcedureColumns => 66,
            OdbcFunction::GetData => 43,
            OdbcFunction::BindCol => 4,
            OdbcFunction::BindParameter => 72,
            OdbcFunction::DescribeCol => 8,
            OdbcFunction::NumResultCols => 18,
            OdbcFunction::RowCount => 20,
            OdbcFunction::EndTran => 1005,
            OdbcFunction::GetInfo => 45,
            OdbcFunction::GetFunctions => 44,
            OdbcFunction::GetTypeInfo => 47,
            OdbcFunction::GetConnectAttr => 1007,
            OdbcFunction::SetConnectAttr => 1016,
            OdbcFunction::AllocHandle => 1001,
            OdbcFunction::FreeHandle => 1006,
            OdbcFunction::GetDiagRec => 1011,
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// SQL_API_ODBC3_ALL_FUNCTIONS bitmap as returned by SQLGetFunctions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBitmap(Vec<u16>);

impl FunctionBitmap {
    /// SQL_API_ODBC3_ALL_FUNCTIONS_SIZE
    pub const WORDS: usize = 250;

    pub fn new(words: Vec<u16>) -> Self {
        Self(words)
    }

    /// Bitmap with exactly the given functions set
    pub fn from_functions(functions: impl IntoIterator<Item = OdbcFunction>) -> Self {
        let mut words = vec![0u16; Self::WORDS];
        for function in functions {
            let id = function.id() as usize;
            if let Some(word) = words.get_mut(id / 16) {
                *word |= 1 << (id % 16);
            }
        }
        Self(words)
    }

    pub fn is_set(&self, function: OdbcFunction) -> bool {
        let id = function.id() as usize;
        self.0
            .get(id / 16)
            .is_some_and(|word| (word >> (id % 16)) & 1 == 1)
    }

    pub fn words(&self) -> &[u16] {
        &self.0
    }
}
