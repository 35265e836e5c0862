//! odbc-crusher - run the ODBC conformance battery against a connection string

mod cli;
mod driver_info;
mod logging;
mod render;

use clap::Parser;
use odbc_crusher_core::{BatteryRunner, ConnectionDescriptor, OdbcGateway, check_connection};

use crate::cli::{App, OutputFormat};
use crate::logging::LoggingConfig;

/// No result was a Fail or Error
const EXIT_OK: i32 = 0;
/// A test failed, or the connection pre-check did
const EXIT_FAILURES: i32 = 1;
/// Bad arguments or configuration
const EXIT_USAGE: i32 = 2;

#[cfg(feature = "odbc")]
fn gateway() -> anyhow::Result<Box<dyn OdbcGateway>> {
    Ok(Box::new(odbc_crusher_odbc::OdbcApiGateway::new()))
}

#[cfg(not(feature = "odbc"))]
fn gateway() -> anyhow::Result<Box<dyn OdbcGateway>> {
    anyhow::bail!("odbc-crusher was built without driver manager support; rebuild with `--features odbc`")
}

fn main() {
    let app = App::parse();

    if let Err(e) = logging::init(&LoggingConfig::new(app.verbose, app.log_json)) {
        eprintln!("Error: {e:#}");
    }

    match run(&app) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(EXIT_USAGE);
        }
    }
}

fn run(app: &App) -> anyhow::Result<i32> {
    let config = app.run_config()?;
    let gateway = gateway()?;
    let descriptor = ConnectionDescriptor::new(app.connection_string.as_str());
    if app.verbose {
        eprintln!("Connection string: {}", descriptor.redacted());
    }

    if app.driver_info {
        return match driver_info::collect(gateway.as_ref(), &descriptor, &config) {
            Ok(snapshot) => {
                match app.output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                    OutputFormat::Text => print!("{}", driver_info::render(&snapshot)),
                }
                Ok(EXIT_OK)
            }
            Err(e) => {
                eprintln!("✗ Connection failed: {e}\n\nDiagnostic: {}", e.diagnostic());
                Ok(EXIT_FAILURES)
            }
        };
    }

    // Progress goes to stderr; stdout carries only the report
    eprintln!("Phase 1: Testing connection...\n");
    let check = check_connection(gateway.as_ref(), &descriptor, &config, app.verbose);
    eprint!("{}", render::render_connection_check(&check));
    if !check.success {
        return Ok(EXIT_FAILURES);
    }

    eprintln!("\nPhase 2: Running ODBC tests...\n");
    let outcome = BatteryRunner::new(gateway.as_ref(), &descriptor, &config).run();
    let report = outcome.report();

    match app.output {
        OutputFormat::Json => println!("{}", render::render_json(&report)?),
        OutputFormat::Text => print!("{}", render::render_text(&report)),
    }

    Ok(if report.has_failures() {
        EXIT_FAILURES
    } else {
        EXIT_OK
    })
}
