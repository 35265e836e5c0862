//! SQLSTATE to human readable diagnostic mapping

/// Suggestions keyed by SQLSTATE
const SQLSTATE_DIAGNOSTICS: &[(&str, &str)] = &[
    (
        "IM002",
        "Data source name not found. Check DSN name in ODBC Data Source Administrator (odbcad32.exe)",
    ),
    (
        "28000",
        "Authentication failed. Verify username and password in connection string",
    ),
    (
        "08001",
        "Unable to connect to data source. Check server name, network connectivity, and firewall settings",
    ),
    (
        "08004",
        "Connection rejected by data source. Server may be refusing connections or database doesn't exist",
    ),
    (
        "HY000",
        "General error. Check the specific error message for details",
    ),
    ("HYC00", "Optional feature not implemented by the driver"),
    ("IM001", "Driver does not support this function"),
    (
        "IM003",
        "Specified driver could not be loaded. Check driver installation and architecture (32-bit vs 64-bit)",
    ),
    (
        "S1000",
        "General driver error. Check driver-specific documentation",
    ),
    ("42000", "Syntax error or access violation"),
];

const GENERIC_DIAGNOSTIC: &str =
    "Check connection string format and verify all connection parameters";

/// Map an SQLSTATE and message to a suggestion for the user.
///
/// Unknown codes fall back to keywords in the message text. Always returns a
/// non-empty string.
pub fn diagnose(sqlstate: &str, message: &str) -> String {
    let code = sqlstate.trim();
    if let Some((_, diagnostic)) = SQLSTATE_DIAGNOSTICS
        .iter()
        .find(|(state, _)| state.eq_ignore_ascii_case(code))
    {
        return (*diagnostic).to_string();
    }

    let message = message.to_lowercase();
    let suggestion = if message.contains("login") || message.contains("authentication") {
        "Authentication issue. Verify credentials and user permissions"
    } else if message.contains("timeout") {
        "Connection timeout. Check network connectivity and server availability"
    } else if message.contains("driver") && message.contains("not found") {
        "Driver not found. Verify driver is installed and name matches exactly"
    } else if message.contains("refused") {
        "Connection refused. Check if server is running and accepting connections on the specified port"
    } else {
        GENERIC_DIAGNOSTIC
    };
    suggestion.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::dsn_missing("IM002", "Data source name not found")]
    #[case::auth("28000", "Authentication failed")]
    #[case::unreachable("08001", "Unable to connect")]
    #[case::rejected("08004", "Connection rejected")]
    #[case::general("HY000", "General error")]
    #[case::optional_feature("HYC00", "Optional feature")]
    #[case::unsupported_function("IM001", "does not support this function")]
    #[case::driver_load("IM003", "could not be loaded")]
    #[case::legacy_general("S1000", "General driver error")]
    #[case::syntax("42000", "Syntax error")]
    fn test_known_sqlstates(#[case] code: &str, #[case] fragment: &str) {
        let diagnostic = diagnose(code, "irrelevant");
        assert!(diagnostic.contains(fragment), "{code}: {diagnostic}");
    }

    #[rstest]
    #[case::login("Login failed for user 'sa'", "Authentication issue")]
    #[case::authentication("AUTHENTICATION rejected", "Authentication issue")]
    #[case::timeout("Login timeout expired", "Authentication issue")]
    #[case::plain_timeout("query timeout expired", "Connection timeout")]
    #[case::driver("Driver 'Foo' not found", "Driver not found")]
    #[case::refused("connection refused (os error 111)", "Connection refused")]
    fn test_message_fallbacks(#[case] message: &str, #[case] fragment: &str) {
        let diagnostic = diagnose("99999", message);
        assert!(diagnostic.contains(fragment), "{message}: {diagnostic}");
    }

    #[test]
    fn test_always_non_empty() {
        assert_eq!(diagnose("", ""), GENERIC_DIAGNOSTIC);
        assert!(!diagnose("ZZZZZ", "something odd").is_empty());
    }
}
