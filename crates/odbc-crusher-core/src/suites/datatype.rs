//! Cast-bind-fetch round trips for each SQL type family.
//!
//! Every probe binds a value into `CAST(? AS <type>)`, rewritten for the
//! detected family, and runs it through the dialect fallback candidates.

use chrono::{NaiveDate, NaiveTime};

use crate::dialect::DialectFeature;
use crate::result::{Severity, TestResult};
use crate::types::Value;

use super::{CaseEnv, Session, Suite, SuiteContext, SuiteRun, Verdict, case};

const BINARY_SAMPLE: [u8; 5] = [0x00, 0x01, 0x02, 0x03, 0xFF];

pub(super) fn run(ctx: &SuiteContext<'_>) -> Vec<TestResult> {
    let mut run = SuiteRun::new(ctx, Suite::Datatype);

    run.with_session(
        case(
            "test_integer_types",
            "SQLBindParameter/SQLGetData (integers)",
            "SMALLINT, INTEGER and BIGINT should round-trip at their limits",
        ),
        |session, _| {
            let passed = round_trips(
                session,
                &[
                    ("SMALLINT", Value::Int32(i16::MAX.into())),
                    ("INTEGER", Value::Int32(i32::MAX)),
                    ("BIGINT", Value::Int64(i64::MAX)),
                ],
                |sent, received| sent.as_i64().is_some_and(|v| received.as_i64() == Some(v)),
            );
            match passed.len() {
                0 => Verdict::fail(Severity::Error, "No integer types could be tested")
                    .with_diagnostic(fallback_diagnostic(session, "integer")),
                1 => Verdict::pass(
                    Severity::Warning,
                    format!("Limited support: {}", passed[0]),
                )
                .with_diagnostic("Driver may not support all integer types"),
                n => Verdict::pass(
                    Severity::Info,
                    format!("Successfully tested {n} integer types: {}", passed.join(", ")),
                ),
            }
        },
    );

    run.with_session(
        case(
            "test_decimal_types",
            "SQLBindParameter/SQLGetData (decimal)",
            "DECIMAL and NUMERIC should round-trip within 0.01",
        ),
        |session, _| {
            let passed = round_trips(
                session,
                &[
                    ("DECIMAL(10,2)", Value::Decimal("123.45".into())),
                    ("NUMERIC(10,2)", Value::Decimal("678.90".into())),
                ],
                |sent, received| approx_eq(sent, received, 0.01),
            );
            some_passed(session, &passed, "decimal", Severity::Warning)
        },
    );

    run.with_session(
        case(
            "test_float_types",
            "SQLBindParameter/SQLGetData (float)",
            "FLOAT, DOUBLE PRECISION and REAL should round-trip within 0.001",
        ),
        |session, _| {
            let passed = round_trips(
                session,
                &[
                    ("FLOAT", Value::Float64(12.345)),
                    ("DOUBLE PRECISION", Value::Float64(6.789)),
                    ("REAL", Value::Float64(1.25)),
                ],
                |sent, received| approx_eq(sent, received, 0.001),
            );
            some_passed(session, &passed, "float", Severity::Warning)
        },
    );

    run.with_session(
        case(
            "test_character_types",
            "SQLBindParameter/SQLGetData (character)",
            "VARCHAR and CHAR should round-trip, ignoring trailing padding",
        ),
        |session, _| {
            let passed = round_trips(
                session,
                &[
                    ("VARCHAR(50)", Value::from("Hello World")),
                    ("CHAR(20)", Value::from("Fixed Width")),
                ],
                |sent, received| match (sent.as_str(), received.as_str()) {
                    (Some(sent), Some(received)) => received.trim_end() == sent,
                    _ => false,
                },
            );
            some_passed(session, &passed, "character", Severity::Error)
        },
    );

    run.with_session(
        case(
            "test_date_type",
            "SQLBindParameter/SQLGetData (DATE)",
            "DATE should round-trip",
        ),
        |session, _| {
            let Some(date) = NaiveDate::from_ymd_opt(2026, 2, 3) else {
                return Verdict::error(Severity::Error, "Invalid sample date");
            };
            temporal(session, "DATE", &["DATE"], Value::Date(date), |v| {
                v.as_date() == Some(date)
            })
        },
    );

    run.with_session(
        case(
            "test_time_type",
            "SQLBindParameter/SQLGetData (TIME)",
            "TIME should round-trip",
        ),
        |session, _| {
            let Some(time) = NaiveTime::from_hms_opt(14, 30, 45) else {
                return Verdict::error(Severity::Error, "Invalid sample time");
            };
            temporal(session, "TIME", &["TIME"], Value::Time(time), |v| {
                v.as_time() == Some(time)
            })
        },
    );

    run.with_session(
        case(
            "test_timestamp_type",
            "SQLBindParameter/SQLGetData (TIMESTAMP)",
            "TIMESTAMP should round-trip",
        ),
        |session, _| {
            let Some(timestamp) = NaiveDate::from_ymd_opt(2026, 2, 3)
                .and_then(|d| d.and_hms_opt(14, 30, 45))
            else {
                return Verdict::error(Severity::Error, "Invalid sample timestamp");
            };
            temporal(
                session,
                "TIMESTAMP",
                &["TIMESTAMP", "DATETIME"],
                Value::DateTime(timestamp),
                |v: &Value| v.as_datetime() == Some(timestamp),
            )
        },
    );

    run.with_session(
        case(
            "test_binary_types",
            "SQLBindParameter/SQLGetData (binary)",
            "Binary data should round-trip with its original bytes as a prefix",
        ),
        binary,
    );

    run.finish()
}

/// Run each `(target, value)` probe and return the targets whose fetched
/// value satisfied `matches`.
fn round_trips(
    session: &mut Session<'_>,
    probes: &[(&'static str, Value)],
    matches: impl Fn(&Value, &Value) -> bool,
) -> Vec<&'static str> {
    let mut passed = Vec::new();
    for (target, sent) in probes {
        let expression = session.dialect().cast_expression(target);
        let outcome = session.fallback(&expression, std::slice::from_ref(sent));
        let matched = outcome.value.as_ref().is_some_and(|received| {
            let ok = matches(sent, received);
            if !ok {
                tracing::debug!(%target, %sent, %received, "Round-trip mismatch");
            }
            ok
        });
        if matched {
            passed.push(*target);
        }
    }
    passed
}

fn some_passed(
    session: &Session<'_>,
    passed: &[&str],
    kind: &str,
    none_severity: Severity,
) -> Verdict {
    if passed.is_empty() {
        Verdict::fail(none_severity, format!("No {kind} types could be tested"))
            .with_diagnostic(fallback_diagnostic(session, kind))
    } else {
        Verdict::pass(
            Severity::Info,
            format!(
                "Successfully tested {} {kind} types: {}",
                passed.len(),
                passed.join(", ")
            ),
        )
    }
}

fn temporal(
    session: &mut Session<'_>,
    label: &str,
    targets: &[&str],
    sent: Value,
    matches: impl Fn(&Value) -> bool,
) -> Verdict {
    for target in targets {
        let expression = session.dialect().cast_expression(target);
        if let Some(received) = session.fallback(&expression, std::slice::from_ref(&sent)).value {
            if matches(&received) {
                return Verdict::pass(
                    Severity::Info,
                    format!("Successfully bound and retrieved {label}: {sent}"),
                );
            }
            tracing::debug!(%target, %received, "{label} round-trip mismatch");
        }
    }
    Verdict::fail(Severity::Warning, format!("{label} type could not be tested"))
        .with_diagnostic(fallback_diagnostic(session, label))
}

fn binary(session: &mut Session<'_>, _: &CaseEnv<'_, '_>) -> Verdict {
    let sent = Value::Bytes(BINARY_SAMPLE.to_vec());
    for target in ["VARBINARY(10)", "BINARY(10)"] {
        let expression = session.dialect().cast_expression(target);
        let Some(received) = session
            .fallback(&expression, std::slice::from_ref(&sent))
            .value
        else {
            continue;
        };
        if let Some(representation) = binary_match(&received, &BINARY_SAMPLE) {
            return Verdict::pass(
                Severity::Info,
                format!("{target} round-trip matched ({representation})"),
            );
        }
        tracing::debug!(%target, %received, "Binary round-trip mismatch");
    }

    if session.dialect().supports(DialectFeature::BinaryTypes) {
        Verdict::fail(Severity::Warning, "Binary data could not be round-tripped")
            .with_diagnostic(fallback_diagnostic(session, "binary"))
    } else {
        Verdict::skip(
            Severity::Info,
            format!(
                "Binary types not supported for {}",
                session.dialect().family()
            ),
        )
    }
}

/// How `received` carries `expected` as a prefix, if it does.
///
/// Drivers return binary either as bytes (often padded to the declared
/// length) or as text: hex with an optional `0x`/`\x` marker, the raw bytes
/// reinterpreted as UTF-8, or one character per byte as a latin-1 client
/// charset decodes them.
pub(crate) fn binary_match(received: &Value, expected: &[u8]) -> Option<&'static str> {
    match received {
        Value::Bytes(bytes) => bytes.starts_with(expected).then_some("bytes"),
        Value::String(text) => {
            let digits = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
                .or_else(|| text.strip_prefix("\\x"))
                .unwrap_or(text);
            if hex::decode(digits.trim_end()).is_ok_and(|decoded| decoded.starts_with(expected)) {
                Some("hex text")
            } else if text.as_bytes().starts_with(expected) {
                Some("raw text")
            } else if latin1_bytes(text).is_some_and(|bytes| bytes.starts_with(expected)) {
                Some("latin-1 text")
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Bytes of a string whose every character fits in one byte
fn latin1_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(c).ok()).collect()
}

fn approx_eq(sent: &Value, received: &Value, tolerance: f64) -> bool {
    match (sent.as_f64(), received.as_f64()) {
        (Some(sent), Some(received)) => (sent - received).abs() < tolerance,
        _ => false,
    }
}

fn fallback_diagnostic(session: &Session<'_>, kind: &str) -> String {
    match session.dialect().last_error() {
        Some(e) => format!("Driver may not support {kind} type binding. {}", e.diagnostic()),
        None => format!("Driver may not support {kind} type binding"),
    }
}
