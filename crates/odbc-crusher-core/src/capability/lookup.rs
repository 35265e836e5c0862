//! Decoders for numeric SQLGetInfo answers

/// SQL_SQL_CONFORMANCE
pub fn describe_sql_conformance(code: i64) -> &'static str {
    match code {
        0 => "SQL-92 Entry",
        1 => "FIPS127-2 Transitional",
        2 => "SQL-92 Intermediate",
        3 => "SQL-92 Full",
        _ => "Unknown",
    }
}

/// SQL_ODBC_INTERFACE_CONFORMANCE
pub fn describe_interface_conformance(code: i64) -> &'static str {
    match code {
        0 => "Core",
        1 => "Level 1",
        2 => "Level 2",
        _ => "Unknown",
    }
}

/// SQL_TXN_CAPABLE
pub fn describe_txn_capable(code: i64) -> &'static str {
    match code {
        0 => "Not Supported",
        1 => "DML only",
        2 => "DDL causes commit",
        3 => "DDL ignored",
        4 => "DML+DDL",
        _ => "Unknown",
    }
}

const OJ_LEFT: i64 = 0x1;
const OJ_RIGHT: i64 = 0x2;
const OJ_FULL: i64 = 0x4;

/// Join kinds set in an SQL_OJ_CAPABILITIES bitmask
pub fn describe_outer_joins(bitmask: i64) -> Vec<&'static str> {
    [(OJ_LEFT, "LEFT"), (OJ_RIGHT, "RIGHT"), (OJ_FULL, "FULL")]
        .into_iter()
        .filter(|(bit, _)| bitmask & bit != 0)
        .map(|(_, name)| name)
        .collect()
}

/// SQL_IDENTIFIER_CASE / SQL_QUOTED_IDENTIFIER_CASE
pub fn describe_identifier_case(code: i64) -> &'static str {
    match code {
        1 => "Upper",
        2 => "Lower",
        3 => "Sensitive",
        4 => "Mixed",
        _ => "Unknown",
    }
}
