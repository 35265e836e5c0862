//! Catalog functions: tables, columns, keys, statistics and type info.
//!
//! Catalog support is optional for a driver, so an absent function is
//! reported as Skip rather than Fail.

use std::collections::BTreeSet;

use crate::capability::TypeDescriptor;
use crate::config::RunConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{CatalogFilter, CatalogKind, OdbcConnection};
use crate::result::{Severity, TestResult, TestStatus};
use crate::types::Row;

use super::{CaseEnv, Session, Suite, SuiteContext, SuiteRun, Verdict, case};

const SAMPLE_SIZE: usize = 3;

pub(super) fn run(ctx: &SuiteContext<'_>) -> Vec<TestResult> {
    let mut run = SuiteRun::new(ctx, Suite::Metadata);

    run.with_session(
        case(
            "test_tables",
            "SQLTables",
            "Retrieve table catalog information",
        ),
        |session, env| {
            let rows = match catalog_rows(session, env, CatalogKind::Tables, &CatalogFilter::default()) {
                Ok(rows) => rows,
                Err(verdict) => return verdict,
            };
            if rows.is_empty() {
                return Verdict::pass(
                    Severity::Info,
                    "No tables found (empty database or system tables only)",
                );
            }
            let sample: Vec<String> = rows.iter().filter_map(table_name).take(SAMPLE_SIZE).collect();
            Verdict::pass(
                Severity::Info,
                format!("Found {} tables (sample: {})", rows.len(), sample.join(", ")),
            )
        },
    );

    run.with_session(
        case(
            "test_columns",
            "SQLColumns",
            "Retrieve column information for a table",
        ),
        |session, env| {
            let table = match target_table(session, env) {
                Ok(table) => table,
                Err(verdict) => return verdict,
            };
            let rows = match catalog_rows(session, env, CatalogKind::Columns, &table.filter()) {
                Ok(rows) => rows,
                Err(verdict) => return verdict,
            };
            if rows.is_empty() {
                return Verdict::fail(
                    Severity::Warning,
                    format!("Table '{}' has no columns", table.name),
                )
                .with_diagnostic("Driver may not properly report column metadata");
            }
            let sample: Vec<String> = rows
                .iter()
                .take(SAMPLE_SIZE)
                .map(|row| {
                    format!(
                        "{}:{}",
                        column_text(row, "COLUMN_NAME", 3).unwrap_or_default(),
                        column_text(row, "TYPE_NAME", 5).unwrap_or_default()
                    )
                })
                .collect();
            Verdict::pass(
                Severity::Info,
                format!(
                    "Found {} columns in '{}' (sample: {})",
                    rows.len(),
                    table.name,
                    sample.join(", ")
                ),
            )
        },
    );

    run.with_session(
        case(
            "test_primary_keys",
            "SQLPrimaryKeys",
            "Retrieve primary key information",
        ),
        |session, env| {
            let table = match target_table(session, env) {
                Ok(table) => table,
                Err(verdict) => return verdict,
            };
            let rows = match catalog_rows(session, env, CatalogKind::PrimaryKeys, &table.filter()) {
                Ok(rows) => rows,
                Err(verdict) => return verdict,
            };
            if rows.is_empty() {
                return Verdict::pass(
                    Severity::Info,
                    format!("Table '{}' has no primary key", table.name),
                );
            }
            let columns: Vec<String> = rows
                .iter()
                .filter_map(|row| column_text(row, "COLUMN_NAME", 3))
                .collect();
            Verdict::pass(
                Severity::Info,
                format!(
                    "Found {} PK column(s) in '{}': {}",
                    rows.len(),
                    table.name,
                    columns.join(", ")
                ),
            )
        },
    );

    run.with_session(
        case(
            "test_foreign_keys",
            "SQLForeignKeys",
            "Retrieve foreign key information",
        ),
        |session, env| {
            let table = match target_table(session, env) {
                Ok(table) => table,
                Err(verdict) => return verdict,
            };
            match catalog_rows(session, env, CatalogKind::ForeignKeys, &table.filter()) {
                Ok(rows) => Verdict::pass(
                    Severity::Info,
                    format!("Found {} foreign key(s) in '{}'", rows.len(), table.name),
                ),
                Err(verdict) => verdict,
            }
        },
    );

    run.with_session(
        case(
            "test_statistics",
            "SQLStatistics",
            "Retrieve statistics and index information",
        ),
        |session, env| {
            let table = match target_table(session, env) {
                Ok(table) => table,
                Err(verdict) => return verdict,
            };
            let rows = match catalog_rows(session, env, CatalogKind::Statistics, &table.filter()) {
                Ok(rows) => rows,
                Err(verdict) => return verdict,
            };
            let indexes: BTreeSet<String> = rows
                .iter()
                .filter_map(|row| column_text(row, "INDEX_NAME", 5))
                .filter(|name| !name.is_empty())
                .collect();
            Verdict::pass(
                Severity::Info,
                format!(
                    "Found {} index(es) in '{}' ({} stat rows)",
                    indexes.len(),
                    table.name,
                    rows.len()
                ),
            )
        },
    );

    run.with_session(
        case(
            "test_type_info",
            "SQLGetTypeInfo",
            "Retrieve data type information",
        ),
        |session, env| {
            let rows = match catalog_rows(session, env, CatalogKind::TypeInfo, &CatalogFilter::default()) {
                Ok(rows) => rows,
                Err(verdict) => return verdict,
            };
            if rows.is_empty() {
                return Verdict::fail(Severity::Warning, "No data types reported")
                    .with_diagnostic("Driver should report at least basic SQL data types");
            }
            let sample: Vec<String> = rows
                .iter()
                .take(5)
                .map(|row| TypeDescriptor::from_row(row).display_name().to_string())
                .collect();
            Verdict::pass(
                Severity::Info,
                format!("Found {} data types (sample: {})", rows.len(), sample.join(", ")),
            )
        },
    );

    run.finish()
}

/// The table the per-table catalog cases inspect
#[derive(Debug, Clone, PartialEq)]
struct TargetTable {
    catalog: Option<String>,
    schema: Option<String>,
    name: String,
}

impl TargetTable {
    fn filter(&self) -> CatalogFilter {
        CatalogFilter::table(&self.name).in_schema(self.catalog.clone(), self.schema.clone())
    }
}

/// First user table, or any table when only system tables exist.
fn find_table(conn: &dyn OdbcConnection, config: &RunConfig) -> GatewayResult<Option<TargetTable>> {
    let tables = conn
        .catalog(CatalogKind::Tables, &CatalogFilter::default())?
        .fetch_all();
    let candidates: Vec<TargetTable> = tables
        .iter()
        .filter_map(|row| {
            Some(TargetTable {
                catalog: column_text(row, "TABLE_CAT", 0),
                schema: column_text(row, "TABLE_SCHEM", 1),
                name: table_name(row)?,
            })
        })
        .collect();

    let user_table = candidates
        .iter()
        .find(|table| !config.is_system_table(&table.name))
        .cloned();
    Ok(user_table.or_else(|| candidates.into_iter().next()))
}

fn target_table(session: &Session<'_>, env: &CaseEnv<'_, '_>) -> Result<TargetTable, Verdict> {
    match find_table(session.conn(), env.config()) {
        Ok(Some(table)) => {
            tracing::debug!(table = %table.name, "Selected catalog target table");
            Ok(table)
        }
        Ok(None) => Err(Verdict::skip(Severity::Info, "No tables available to test")),
        Err(e) if e.is_unsupported() => Err(unsupported(CatalogKind::Tables, &e)),
        Err(e) => Err(Verdict::from_error(
            TestStatus::Error,
            Severity::Warning,
            "Could not enumerate tables",
            &e,
        )),
    }
}

/// Run a catalog call, mapping absence to Skip and other failures to Fail.
fn catalog_rows(
    session: &Session<'_>,
    env: &CaseEnv<'_, '_>,
    kind: CatalogKind,
    filter: &CatalogFilter,
) -> Result<Vec<Row>, Verdict> {
    if env
        .capabilities()
        .is_some_and(|caps| caps.verifiably_unsupported(kind.function()))
    {
        return Err(Verdict::skip(
            Severity::Info,
            format!("{kind} not supported (SQLGetFunctions)"),
        ));
    }
    session
        .conn()
        .catalog(kind, filter)
        .map(|mut cursor| cursor.fetch_all())
        .map_err(|e| {
            if e.is_unsupported() {
                unsupported(kind, &e)
            } else {
                Verdict::from_error(TestStatus::Fail, Severity::Warning, &format!("{kind} failed"), &e)
            }
        })
}

fn unsupported(kind: CatalogKind, error: &GatewayError) -> Verdict {
    Verdict::skip(Severity::Info, format!("Function not supported: {error}"))
        .with_diagnostic(format!("Driver may not implement {kind}"))
}

fn table_name(row: &Row) -> Option<String> {
    column_text(row, "TABLE_NAME", 2)
}

/// Text of a catalog column, by name when the driver labels it, else by
/// its standard position
fn column_text(row: &Row, name: &str, position: usize) -> Option<String> {
    let value = row.get_by_name(name).or_else(|| row.get(position))?;
    if value.is_null() {
        None
    } else {
        Some(value.to_string())
    }
}
