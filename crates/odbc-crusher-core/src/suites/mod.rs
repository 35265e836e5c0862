//! The seven ordered test suites and the machinery they share.
//!
//! Each suite is a fixed list of independent cases. A case produces exactly
//! one [`TestResult`]; nothing a case does (including panicking) escapes its
//! own boundary.

mod advanced;
mod capability;
mod connection;
mod datatype;
mod handle;
mod metadata;
mod statement;

pub use capability::run_collecting;

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::capability::{CapabilitySnapshot, FunctionBitmap, InfoType, OdbcFunction};
use crate::config::RunConfig;
use crate::connection::connect_with_retry;
use crate::dialect::{DialectResolver, Fallback};
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{
    CatalogFilter, CatalogKind, ConnectionDescriptor, OdbcConnection, OdbcGateway,
    PreparedStatement,
};
use crate::result::{Severity, TestResult, TestStatus};
use crate::types::{AttributeValue, Cursor, Value};

/// The closed set of suites, in execution order.
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
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Suite {
    Capability,
    Connection,
    Handle,
    Statement,
    Metadata,
    Advanced,
    Datatype,
}

impl Suite {
    /// Registry order. Capability must come first: it produces the snapshot
    /// the later suites read.
    pub const ALL: [Suite; 7] = [
        Suite::Capability,
        Suite::Connection,
        Suite::Handle,
        Suite::Statement,
        Suite::Metadata,
        Suite::Advanced,
        Suite::Datatype,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Suite::Capability => "Capability Tests",
            Suite::Connection => "Connection Tests",
            Suite::Handle => "Handle Tests",
            Suite::Statement => "Statement Tests",
            Suite::Metadata => "Metadata Tests",
            Suite::Advanced => "Advanced Tests",
            Suite::Datatype => "Data Type Tests",
        }
    }

    /// Severity recorded when a case cannot obtain a connection
    fn connect_severity(self) -> Severity {
        match self {
            Suite::Connection | Suite::Handle | Suite::Statement => Severity::Critical,
            Suite::Capability | Suite::Metadata | Suite::Advanced | Suite::Datatype => {
                Severity::Error
            }
        }
    }

    /// Run every case of the suite in order.
    pub fn run(self, ctx: &SuiteContext<'_>) -> Vec<TestResult> {
        tracing::info!(suite = %self, "Running {}", self.display_name());
        let results = match self {
            Suite::Capability => capability::run_collecting(ctx).0,
            Suite::Connection => connection::run(ctx),
            Suite::Handle => handle::run(ctx),
            Suite::Statement => statement::run(ctx),
            Suite::Metadata => metadata::run(ctx),
            Suite::Advanced => advanced::run(ctx),
            Suite::Datatype => datatype::run(ctx),
        };
        tracing::info!(suite = %self, cases = results.len(), "Suite finished");
        results
    }
}

/// Read-only inputs shared by every suite of a run
#[derive(Clone, Copy)]
pub struct SuiteContext<'a> {
    pub gateway: &'a dyn OdbcGateway,
    pub descriptor: &'a ConnectionDescriptor,
    pub config: &'a RunConfig,
    /// Snapshot from the capability suite, `None` before it ran or when it
    /// could not connect
    pub capabilities: Option<&'a CapabilitySnapshot>,
}

impl<'a> SuiteContext<'a> {
    pub fn new(
        gateway: &'a dyn OdbcGateway,
        descriptor: &'a ConnectionDescriptor,
        config: &'a RunConfig,
    ) -> Self {
        Self {
            gateway,
            descriptor,
            config,
            capabilities: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Option<&'a CapabilitySnapshot>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub(crate) fn open(&self) -> GatewayResult<Session<'a>> {
        connect_with_retry(self.gateway, self.descriptor, self.config).map(Session::new)
    }
}

/// An open connection plus its dialect. Closes on drop; a failed close is
/// logged and never replaces the case's own outcome.
pub(crate) struct Session<'g> {
    conn: Box<dyn OdbcConnection + 'g>,
    dialect: DialectResolver,
}

impl<'g> Session<'g> {
    pub(crate) fn new(conn: Box<dyn OdbcConnection + 'g>) -> Self {
        let dialect = DialectResolver::detect(conn.as_ref());
        Self { conn, dialect }
    }

    pub(crate) fn conn(&self) -> &(dyn OdbcConnection + 'g) {
        self.conn.as_ref()
    }

    pub(crate) fn dialect(&self) -> &DialectResolver {
        &self.dialect
    }

    /// Run a probe expression through the dialect fallback candidates
    pub(crate) fn fallback(&mut self, expression: &str, params: &[Value]) -> Fallback {
        self.dialect.fallback(self.conn.as_ref(), expression, params)
    }

    /// Disconnect now, surfacing the close error
    pub(crate) fn close(mut self) -> GatewayResult<()> {
        self.take_connection().close()
    }

    fn take_connection(&mut self) -> Box<dyn OdbcConnection + 'g> {
        std::mem::replace(&mut self.conn, Box::new(ClosedConnection))
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.take_connection().close() {
            tracing::warn!(error = %e, "Failed to close connection");
        }
    }
}

/// Stands in for a connection that has already been closed
struct ClosedConnection;

impl ClosedConnection {
    fn not_open<T>() -> GatewayResult<T> {
        Err(GatewayError::new("08003", "Connection not open"))
    }
}

impl OdbcConnection for ClosedConnection {
    fn get_info(&self, _: InfoType) -> GatewayResult<AttributeValue> {
        Self::not_open()
    }

    fn execute(&self, _: &str, _: &[Value]) -> GatewayResult<Cursor> {
        Self::not_open()
    }

    fn prepare<'c>(&'c self, _: &str) -> GatewayResult<Box<dyn PreparedStatement + 'c>> {
        Self::not_open()
    }

    fn catalog(&self, _: CatalogKind, _: &CatalogFilter) -> GatewayResult<Cursor> {
        Self::not_open()
    }

    fn allocate_statements(&self, _: usize) -> GatewayResult<()> {
        Self::not_open()
    }

    fn autocommit(&self) -> GatewayResult<bool> {
        Self::not_open()
    }

    fn set_autocommit(&self, _: bool) -> GatewayResult<()> {
        Self::not_open()
    }

    fn commit(&self) -> GatewayResult<()> {
        Self::not_open()
    }

    fn rollback(&self) -> GatewayResult<()> {
        Self::not_open()
    }

    fn function_bitmap(&self) -> GatewayResult<Option<FunctionBitmap>> {
        Self::not_open()
    }

    fn has_binding(&self, _: OdbcFunction) -> bool {
        false
    }

    fn close(self: Box<Self>) -> GatewayResult<()> {
        Ok(())
    }
}

/// Static description of a case
#[derive(Debug, Clone, Copy)]
pub(crate) struct CaseSpec {
    pub name: &'static str,
    pub function: &'static str,
    pub expected: &'static str,
}

pub(crate) const fn case(
    name: &'static str,
    function: &'static str,
    expected: &'static str,
) -> CaseSpec {
    CaseSpec {
        name,
        function,
        expected,
    }
}

/// What a case body concluded
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Verdict {
    pub status: TestStatus,
    pub severity: Severity,
    pub actual: String,
    pub diagnostic: Option<String>,
}

impl Verdict {
    fn new(status: TestStatus, severity: Severity, actual: impl Into<String>) -> Self {
        Self {
            status,
            severity,
            actual: actual.into(),
            diagnostic: None,
        }
    }

    pub fn pass(severity: Severity, actual: impl Into<String>) -> Self {
        Self::new(TestStatus::Pass, severity, actual)
    }

    pub fn fail(severity: Severity, actual: impl Into<String>) -> Self {
        Self::new(TestStatus::Fail, severity, actual)
    }

    pub fn skip(severity: Severity, actual: impl Into<String>) -> Self {
        Self::new(TestStatus::Skip, severity, actual)
    }

    pub fn error(severity: Severity, actual: impl Into<String>) -> Self {
        Self::new(TestStatus::Error, severity, actual)
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    /// `status` verdict describing a gateway failure, with its diagnostic
    pub fn from_error(
        status: TestStatus,
        severity: Severity,
        context: &str,
        error: &GatewayError,
    ) -> Self {
        Self::new(status, severity, format!("{context}: {error}")).with_diagnostic(error.diagnostic())
    }

    /// No connection could be opened for the case
    pub fn connect_error(severity: Severity, error: &GatewayError) -> Self {
        Self::from_error(TestStatus::Error, severity, "Connection error", error)
    }
}

/// Handed to each case body. Tracks connection attempts so the suite can
/// stop retrying once it is clear no connection can be opened at all.
pub(crate) struct CaseEnv<'c, 'a> {
    ctx: &'c SuiteContext<'a>,
    connected: Cell<bool>,
    failure: RefCell<Option<GatewayError>>,
}

impl<'a> CaseEnv<'_, 'a> {
    pub fn ctx(&self) -> &SuiteContext<'a> {
        self.ctx
    }

    pub fn config(&self) -> &'a RunConfig {
        self.ctx.config
    }

    pub fn capabilities(&self) -> Option<&'a CapabilitySnapshot> {
        self.ctx.capabilities
    }

    pub fn open(&self) -> GatewayResult<Session<'a>> {
        match self.ctx.open() {
            Ok(session) => {
                self.connected.set(true);
                Ok(session)
            }
            Err(e) => {
                self.failure.replace(Some(e.clone()));
                Err(e)
            }
        }
    }
}

/// Executes the cases of one suite and collects their results.
pub(crate) struct SuiteRun<'c, 'a> {
    ctx: &'c SuiteContext<'a>,
    suite: Suite,
    results: Vec<TestResult>,
    shared: Option<Session<'a>>,
    ever_connected: bool,
    connect_failure: Option<GatewayError>,
}

impl<'c, 'a> SuiteRun<'c, 'a> {
    pub fn new(ctx: &'c SuiteContext<'a>, suite: Suite) -> Self {
        Self {
            ctx,
            suite,
            results: Vec::new(),
            shared: None,
            ever_connected: false,
            connect_failure: None,
        }
    }

    pub fn connect_severity(&self) -> Severity {
        self.suite.connect_severity()
    }

    /// Run a case body in isolation and record its verdict.
    pub fn case(&mut self, spec: CaseSpec, body: impl FnOnce(&CaseEnv<'_, 'a>) -> Verdict) {
        if let Some(error) = self.short_circuit() {
            tracing::debug!(suite = %self.suite, test = spec.name, "No connection available, not running case");
            let verdict = Verdict::from_error(
                TestStatus::Error,
                self.connect_severity(),
                "Not run, no connection could be opened",
                &error,
            );
            self.record(spec, verdict, 0.0);
            return;
        }

        let env = CaseEnv {
            ctx: self.ctx,
            connected: Cell::new(false),
            failure: RefCell::new(None),
        };
        tracing::debug!(suite = %self.suite, test = spec.name, "Running case");
        let started = Instant::now();
        let verdict = match panic::catch_unwind(AssertUnwindSafe(|| body(&env))) {
            Ok(verdict) => verdict,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(suite = %self.suite, test = spec.name, %message, "Case panicked");
                Verdict::error(Severity::Error, format!("Unexpected failure: {message}"))
            }
        };
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        if env.connected.get() {
            self.ever_connected = true;
        }
        if let Some(error) = env.failure.into_inner() {
            if !self.ever_connected {
                self.connect_failure = Some(error);
            }
        }
        self.record(spec, verdict, duration_ms);
    }

    /// Run a case on the suite's shared connection, opening it on first use.
    pub fn with_session(
        &mut self,
        spec: CaseSpec,
        body: impl FnOnce(&mut Session<'a>, &CaseEnv<'_, 'a>) -> Verdict,
    ) {
        let severity = self.connect_severity();
        let mut shared = self.shared.take();
        self.case(spec, |env| {
            if shared.is_none() {
                match env.open() {
                    Ok(session) => shared = Some(session),
                    Err(e) => return Verdict::connect_error(severity, &e),
                }
            }
            match shared.as_mut() {
                Some(session) => body(session, env),
                None => Verdict::error(severity, "Connection unavailable"),
            }
        });
        self.shared = shared;
    }

    /// Run a case on a connection of its own, closed when the case ends.
    pub fn with_fresh_session(
        &mut self,
        spec: CaseSpec,
        body: impl FnOnce(&mut Session<'a>, &CaseEnv<'_, 'a>) -> Verdict,
    ) {
        let severity = self.connect_severity();
        self.case(spec, |env| match env.open() {
            Ok(mut session) => body(&mut session, env),
            Err(e) => Verdict::connect_error(severity, &e),
        });
    }

    /// Close the shared connection and hand back the results
    pub fn finish(mut self) -> Vec<TestResult> {
        self.shared.take();
        self.results
    }

    fn short_circuit(&self) -> Option<GatewayError> {
        if self.ever_connected {
            None
        } else {
            self.connect_failure.clone()
        }
    }

    fn record(&mut self, spec: CaseSpec, verdict: Verdict, duration_ms: f64) {
        tracing::debug!(
            suite = %self.suite,
            test = spec.name,
            status = %verdict.status,
            duration_ms,
            "Case finished"
        );
        self.results.push(TestResult {
            test_name: spec.name.to_string(),
            function: spec.function.to_string(),
            status: verdict.status,
            expected: spec.expected.to_string(),
            actual: verdict.actual,
            diagnostic: verdict.diagnostic,
            severity: verdict.severity,
            duration_ms: duration_ms.max(0.0),
        });
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Grade a count of passed variants: all pass cleanly, some pass with a
/// warning, none falls to `none`.
pub(crate) fn grade(passed: usize, total: usize, actual: String, none: Verdict) -> Verdict {
    if total > 0 && passed == total {
        Verdict::pass(Severity::Info, actual)
    } else if passed > 0 {
        Verdict::pass(Severity::Warning, actual)
    } else {
        none
    }
}
