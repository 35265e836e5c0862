//! `--driver-info`: the capability snapshot as a readable report

use std::fmt::Write as _;

use odbc_crusher_core::capability::{
    describe_identifier_case, describe_interface_conformance, describe_outer_joins,
    describe_sql_conformance, describe_txn_capable,
};
use odbc_crusher_core::{
    CapabilityProbe, CapabilitySnapshot, ConnectionDescriptor, GatewayResult, InfoType,
    Nullability, OdbcGateway, RunConfig, TypeDescriptor, connect_with_retry,
};

const RULE: &str =
    "================================================================================";
const MAX_TYPES_SHOWN: usize = 20;

/// Open one connection, probe it and close it again.
pub fn collect(
    gateway: &dyn OdbcGateway,
    descriptor: &ConnectionDescriptor,
    config: &RunConfig,
) -> GatewayResult<CapabilitySnapshot> {
    let conn = connect_with_retry(gateway, descriptor, config)?;
    let snapshot = CapabilityProbe::collect(conn.as_ref());
    if let Err(e) = conn.close() {
        tracing::warn!(error = %e, "Failed to close driver info connection");
    }
    Ok(snapshot)
}

fn value(snapshot: &CapabilitySnapshot, info: InfoType) -> String {
    snapshot
        .attribute(info)
        .map(ToString::to_string)
        .unwrap_or_else(|| "N/A".to_string())
}

fn decoded(snapshot: &CapabilitySnapshot, info: InfoType, decode: fn(i64) -> &'static str) -> String {
    match snapshot.integer(info) {
        Some(code) => decode(code).to_string(),
        None => "Unknown (N/A)".to_string(),
    }
}

fn line(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<22}{}", format!("{label}:"), value);
}

fn type_line(descriptor: &TypeDescriptor) -> String {
    let data_type = descriptor
        .data_type
        .map_or_else(|| "?".to_string(), |t| t.to_string());
    let size = descriptor
        .column_size
        .map_or_else(|| "?".to_string(), |s| s.to_string());
    let nullable = match descriptor.nullable {
        Nullability::Nullable => "NULL",
        Nullability::NoNulls | Nullability::Unknown => "NOT NULL",
    };
    let auto = if descriptor.auto_increment == Some(true) {
        "AUTO"
    } else {
        ""
    };
    format!(
        "  {:<20} (SQL type {:>3}) - Size: {:<8} {:<8} {}",
        descriptor.display_name(),
        data_type,
        size,
        nullable,
        auto
    )
    .trim_end()
    .to_string()
}

pub fn render(snapshot: &CapabilitySnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}\nDRIVER INFORMATION REPORT\n{RULE}");

    let _ = writeln!(out, "\n=== DRIVER & DATABASE MANAGEMENT SYSTEM ===");
    for (label, info) in [
        ("Driver Name", InfoType::DriverName),
        ("Driver Version", InfoType::DriverVersion),
        ("Driver ODBC Version", InfoType::DriverOdbcVersion),
        ("ODBC Version (DM)", InfoType::OdbcVersion),
        ("DBMS Name", InfoType::DbmsName),
        ("DBMS Version", InfoType::DbmsVersion),
        ("Database", InfoType::DatabaseName),
        ("Server", InfoType::ServerName),
        ("Data Source", InfoType::DataSourceName),
        ("User", InfoType::UserName),
    ] {
        line(&mut out, label, value(snapshot, info));
    }

    let _ = writeln!(out, "\n=== CONFORMANCE ===");
    line(
        &mut out,
        "SQL Conformance",
        decoded(snapshot, InfoType::SqlConformance, describe_sql_conformance),
    );
    line(
        &mut out,
        "ODBC Interface",
        decoded(
            snapshot,
            InfoType::OdbcInterfaceConformance,
            describe_interface_conformance,
        ),
    );

    let _ = writeln!(out, "\n=== TERMINOLOGY ===");
    let catalogs = if snapshot.text(InfoType::CatalogName) == Some("Y") {
        "YES"
    } else {
        "NO"
    };
    line(&mut out, "Catalog Support", catalogs);
    for (label, info) in [
        ("Catalog Term", InfoType::CatalogTerm),
        ("Schema Term", InfoType::SchemaTerm),
        ("Table Term", InfoType::TableTerm),
        ("Procedure Term", InfoType::ProcedureTerm),
        ("Quote Character", InfoType::IdentifierQuoteChar),
    ] {
        line(&mut out, label, value(snapshot, info));
    }
    line(
        &mut out,
        "Identifier Case",
        decoded(snapshot, InfoType::IdentifierCase, describe_identifier_case),
    );

    let _ = writeln!(out, "\n=== LIMITS ===");
    for (label, info) in [
        ("Max Column Name", InfoType::MaxColumnNameLen),
        ("Max Table Name", InfoType::MaxTableNameLen),
        ("Max Columns/SELECT", InfoType::MaxColumnsInSelect),
        ("Max Columns/TABLE", InfoType::MaxColumnsInTable),
        ("Max Statement Length", InfoType::MaxStatementLen),
        ("Max Tables/SELECT", InfoType::MaxTablesInSelect),
    ] {
        line(&mut out, label, value(snapshot, info));
    }

    let _ = writeln!(out, "\n=== FEATURES ===");
    for (label, info) in [
        ("Procedures", InfoType::Procedures),
        ("Multiple Result Sets", InfoType::MultResultSets),
        ("Outer Joins", InfoType::OuterJoins),
        ("Read Only", InfoType::DataSourceReadOnly),
    ] {
        line(&mut out, label, value(snapshot, info));
    }
    if let Some(bitmask) = snapshot.integer(InfoType::OjCapabilities) {
        let joins = describe_outer_joins(bitmask);
        let joins = if joins.is_empty() {
            "none".to_string()
        } else {
            joins.join(", ")
        };
        line(&mut out, "Outer Join Kinds", joins);
    }
    let supported = snapshot.functions.values().filter(|s| **s).count();
    line(
        &mut out,
        "API Functions",
        format!(
            "{supported}/{} ({})",
            snapshot.functions.len(),
            snapshot.function_provenance
        ),
    );

    let _ = writeln!(out, "\n=== TRANSACTIONS ===");
    line(
        &mut out,
        "Transaction Support",
        decoded(snapshot, InfoType::TxnCapable, describe_txn_capable),
    );
    line(
        &mut out,
        "Multiple Active TXN",
        value(snapshot, InfoType::MultipleActiveTxn),
    );

    let _ = writeln!(out, "\n=== CHARACTER SET ===");
    line(
        &mut out,
        "Collation Sequence",
        value(snapshot, InfoType::CollationSeq),
    );

    if let Some(error) = &snapshot.type_catalog_error {
        let _ = writeln!(out, "\n=== SUPPORTED DATA TYPES ===");
        let _ = writeln!(out, "  Unavailable: {error}");
    } else if !snapshot.types.is_empty() {
        let _ = writeln!(
            out,
            "\n=== SUPPORTED DATA TYPES ({} types) ===",
            snapshot.types.len()
        );
        for descriptor in snapshot.types.iter().take(MAX_TYPES_SHOWN) {
            let _ = writeln!(out, "{}", type_line(descriptor));
        }
        if snapshot.types.len() > MAX_TYPES_SHOWN {
            let _ = writeln!(
                out,
                "  ... and {} more types",
                snapshot.types.len() - MAX_TYPES_SHOWN
            );
        }
    }

    let _ = writeln!(out, "\n{RULE}");
    out
}
