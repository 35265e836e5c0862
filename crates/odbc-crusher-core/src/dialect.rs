//! Database family detection and dialect-correct probe statements.
//!
//! The battery phrases every scalar probe as an abstract expression such as
//! `CAST(? AS INTEGER)`. The resolver turns that into complete SELECT
//! statements, most specific first, and runs them until one yields a row.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::capability::InfoType;
use crate::error::GatewayError;
use crate::gateway::OdbcConnection;
use crate::types::Value;

/// Database family as derived from the driver's reported DBMS name
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
    strum::AsRefStr,
)]
pub enum DatabaseFamily {
    Firebird,
    #[strum(serialize = "MySQL")]
    MySql,
    Oracle,
    #[strum(serialize = "SQL Server")]
    SqlServer,
    PostgreSQL,
    Unknown,
}

/// Substring patterns checked in order against the lowercased DBMS name
const DETECTION_PATTERNS: &[(&str, DatabaseFamily)] = &[
    ("firebird", DatabaseFamily::Firebird),
    ("mysql", DatabaseFamily::MySql),
    ("oracle", DatabaseFamily::Oracle),
    ("sql server", DatabaseFamily::SqlServer),
    ("microsoft", DatabaseFamily::SqlServer),
    ("postgres", DatabaseFamily::PostgreSQL),
];

impl DatabaseFamily {
    /// Total and deterministic: unmapped names are `Unknown`.
    pub fn detect(dbms_name: &str) -> Self {
        let name = dbms_name.to_lowercase();
        DETECTION_PATTERNS
            .iter()
            .find(|(pattern, _)| name.contains(pattern))
            .map(|(_, family)| *family)
            .unwrap_or(DatabaseFamily::Unknown)
    }

    /// The FROM clause a scalar SELECT needs on this family
    pub fn from_clause(self) -> FromClause {
        match self {
            DatabaseFamily::Firebird => FromClause::RdbDatabase,
            DatabaseFamily::Oracle => FromClause::Dual,
            DatabaseFamily::MySql
            | DatabaseFamily::SqlServer
            | DatabaseFamily::PostgreSQL
            | DatabaseFamily::Unknown => FromClause::None,
        }
    }

    fn features(self) -> &'static [DialectFeature] {
        FEATURE_MATRIX
            .iter()
            .find(|(family, _)| *family == self)
            .map(|(_, features)| *features)
            .unwrap_or(&[])
    }
}

/// Single-row table convention for scalar SELECTs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromClause {
    /// `FROM RDB$DATABASE`
    RdbDatabase,
    /// `FROM DUAL`
    Dual,
    /// No FROM clause
    None,
}

impl FromClause {
    /// Order in which conventions are tried after the family's own one
    pub const FALLBACK_ORDER: [FromClause; 3] =
        [FromClause::RdbDatabase, FromClause::Dual, FromClause::None];

    pub fn select(self, expression: &str) -> String {
        match self {
            FromClause::RdbDatabase => format!("SELECT {expression} FROM RDB$DATABASE"),
            FromClause::Dual => format!("SELECT {expression} FROM DUAL"),
            FromClause::None => format!("SELECT {expression}"),
        }
    }
}

/// Optional SQL features recorded per family
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DialectFeature {
    BinaryTypes,
    #[strum(to_string = "transaction_savepoints", serialize = "savepoints")]
    TransactionSavepoints,
    NamedParameters,
    MultipleResultSets,
}

const FEATURE_MATRIX: &[(DatabaseFamily, &[DialectFeature])] = &[
    (
        DatabaseFamily::Firebird,
        &[
            DialectFeature::BinaryTypes,
            DialectFeature::TransactionSavepoints,
        ],
    ),
    (
        DatabaseFamily::MySql,
        &[
            DialectFeature::BinaryTypes,
            DialectFeature::TransactionSavepoints,
        ],
    ),
    (
        DatabaseFamily::SqlServer,
        &[
            DialectFeature::BinaryTypes,
            DialectFeature::TransactionSavepoints,
            DialectFeature::NamedParameters,
            DialectFeature::MultipleResultSets,
        ],
    ),
    (
        DatabaseFamily::Oracle,
        &[
            DialectFeature::BinaryTypes,
            DialectFeature::TransactionSavepoints,
            DialectFeature::NamedParameters,
        ],
    ),
    (
        DatabaseFamily::PostgreSQL,
        &[
            DialectFeature::BinaryTypes,
            DialectFeature::TransactionSavepoints,
        ],
    ),
];

/// Outcome of running a probe expression through the candidate list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fallback {
    /// First column of the first row of the first candidate that produced one
    pub value: Option<Value>,
    /// The statement that produced `value`
    pub statement: Option<String>,
    /// Candidates that were tried and failed, in order
    pub failures: Vec<(String, GatewayError)>,
}

impl Fallback {
    pub fn succeeded(&self) -> bool {
        self.statement.is_some()
    }

    pub fn last_error(&self) -> Option<&GatewayError> {
        self.failures.last().map(|(_, e)| e)
    }
}

/// Builds and runs dialect-correct probe statements for one connection.
#[derive(Debug, Clone)]
pub struct DialectResolver {
    family: DatabaseFamily,
    last_error: Option<GatewayError>,
}

impl DialectResolver {
    pub fn for_family(family: DatabaseFamily) -> Self {
        Self {
            family,
            last_error: None,
        }
    }

    /// Detect the family from the connection's DBMS name. A failed lookup
    /// leaves the family `Unknown`.
    pub fn detect(conn: &dyn OdbcConnection) -> Self {
        let family = match conn.get_info(InfoType::DbmsName) {
            Ok(name) => DatabaseFamily::detect(&name.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "DBMS name unavailable, using generic dialect");
                DatabaseFamily::Unknown
            }
        };
        tracing::debug!(%family, "Detected database family");
        Self::for_family(family)
    }

    pub fn family(&self) -> DatabaseFamily {
        self.family
    }

    /// The most recent candidate failure seen by this resolver
    pub fn last_error(&self) -> Option<&GatewayError> {
        self.last_error.as_ref()
    }

    /// Complete candidate statements for `expression`, most specific first,
    /// without duplicates.
    pub fn resolve(&self, expression: &str) -> Vec<String> {
        let mut candidates = vec![self.family.from_clause().select(expression)];
        for clause in FromClause::FALLBACK_ORDER {
            let statement = clause.select(expression);
            if !candidates.contains(&statement) {
                candidates.push(statement);
            }
        }
        candidates
    }

    /// Run candidates in order until one returns a row.
    ///
    /// Execution errors and empty results move on to the next candidate.
    /// Never fails; every per-candidate failure is kept in the outcome.
    pub fn fallback(
        &mut self,
        conn: &dyn OdbcConnection,
        expression: &str,
        params: &[Value],
    ) -> Fallback {
        let mut outcome = Fallback::default();
        for statement in self.resolve(expression) {
            tracing::debug!(sql = %statement, "Trying probe candidate");
            match conn.execute(&statement, params) {
                Ok(mut cursor) => match cursor.fetch_one() {
                    Some(row) => {
                        outcome.value = Some(row.get(0).cloned().unwrap_or(Value::Null));
                        outcome.statement = Some(statement);
                        return outcome;
                    }
                    None => {
                        let error = GatewayError::new("02000", "Statement returned no rows");
                        self.last_error = Some(error.clone());
                        outcome.failures.push((statement, error));
                    }
                },
                Err(error) => {
                    tracing::debug!(sql = %statement, sqlstate = %error.sqlstate, "Probe candidate failed");
                    self.last_error = Some(error.clone());
                    outcome.failures.push((statement, error));
                }
            }
        }
        outcome
    }

    /// The scalar from the first working candidate, `None` if all fail
    pub fn execute_with_fallback(
        &mut self,
        conn: &dyn OdbcConnection,
        expression: &str,
        params: &[Value],
    ) -> Option<Value> {
        self.fallback(conn, expression, params).value
    }

    /// Look up a feature in the family matrix. Unknown feature names and
    /// unknown families answer `false`.
    pub fn supports_feature(&self, feature: &str) -> bool {
        DialectFeature::from_str(feature)
            .map(|f| self.supports(f))
            .unwrap_or(false)
    }

    pub fn supports(&self, feature: DialectFeature) -> bool {
        self.family.features().contains(&feature)
    }

    /// `CAST(? AS target)` with the target rewritten for this family
    pub fn cast_expression(&self, target: &str) -> String {
        format!("CAST(? AS {})", self.cast_target(target))
    }

    /// Rewrite a standard CAST target into one the family accepts.
    pub fn cast_target(&self, target: &str) -> String {
        let target = target.trim();
        let (base, args) = match target.find('(') {
            Some(idx) => (target[..idx].trim(), &target[idx..]),
            None => (target, ""),
        };
        let base = base.to_uppercase();

        match (self.family, base.as_str()) {
            (DatabaseFamily::MySql, "SMALLINT" | "INT" | "INTEGER" | "BIGINT") => {
                "SIGNED".to_string()
            }
            (DatabaseFamily::MySql, "VARCHAR") => format!("CHAR{args}"),
            (DatabaseFamily::MySql, "TIMESTAMP") => "DATETIME".to_string(),
            (DatabaseFamily::MySql, "VARBINARY") => format!("BINARY{args}"),
            (DatabaseFamily::MySql, "NUMERIC") => format!("DECIMAL{args}"),
            (DatabaseFamily::MySql, "DOUBLE PRECISION") => "DOUBLE".to_string(),

            (DatabaseFamily::Oracle, "BIGINT") => "NUMBER(19)".to_string(),
            (DatabaseFamily::Oracle, "SMALLINT") => "NUMBER(5)".to_string(),
            (DatabaseFamily::Oracle, "VARBINARY" | "BINARY") => format!("RAW{args}"),
            (DatabaseFamily::Oracle, "DATETIME") => "TIMESTAMP".to_string(),

            (DatabaseFamily::SqlServer, "TIMESTAMP") => "DATETIME2".to_string(),
            (DatabaseFamily::SqlServer, "DOUBLE PRECISION") => "FLOAT".to_string(),

            (DatabaseFamily::PostgreSQL, "VARBINARY" | "BINARY") => "BYTEA".to_string(),
            (DatabaseFamily::PostgreSQL, "DATETIME") => "TIMESTAMP".to_string(),

            (DatabaseFamily::Firebird, "VARBINARY" | "BINARY") => {
                format!("VARCHAR{args} CHARACTER SET OCTETS")
            }
            (DatabaseFamily::Firebird, "DATETIME") => "TIMESTAMP".to_string(),

            _ => target.to_string(),
        }
    }
}

#[cfg(test)]
mod tests;
