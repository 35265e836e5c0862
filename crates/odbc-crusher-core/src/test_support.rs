//! In-crate stub gateway for unit tests

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::capability::{FunctionBitmap, InfoType, OdbcFunction};
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{
    CatalogFilter, CatalogKind, ConnectionDescriptor, OdbcConnection, OdbcGateway,
    PreparedStatement,
};
use crate::types::{AttributeValue, Cursor, Value};

type Responder = Box<dyn Fn(&str, &[Value]) -> GatewayResult<Cursor>>;

/// Connection whose answers are set up per test
pub(crate) struct StubConnection {
    pub info: HashMap<InfoType, GatewayResult<AttributeValue>>,
    pub responder: Responder,
    pub catalogs: HashMap<CatalogKind, GatewayResult<Cursor>>,
    pub bitmap: Option<FunctionBitmap>,
    pub executed: RefCell<Vec<String>>,
    pub closed: Cell<bool>,
    /// Shared with the gateway so tests can count disconnects
    pub close_counter: Option<Rc<Cell<usize>>>,
    pub close_error: Option<GatewayError>,
}

impl StubConnection {
    pub fn new() -> Self {
        Self {
            info: HashMap::new(),
            responder: Box::new(|_, _| Err(GatewayError::new("42000", "syntax error"))),
            catalogs: HashMap::new(),
            bitmap: None,
            executed: RefCell::new(Vec::new()),
            closed: Cell::new(false),
            close_counter: None,
            close_error: None,
        }
    }

    pub fn with_dbms(mut self, name: &str) -> Self {
        self.info
            .insert(InfoType::DbmsName, Ok(AttributeValue::Text(name.into())));
        self
    }

    pub fn with_info(mut self, info: InfoType, value: GatewayResult<AttributeValue>) -> Self {
        self.info.insert(info, value);
        self
    }

    pub fn responding(
        mut self,
        responder: impl Fn(&str, &[Value]) -> GatewayResult<Cursor> + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }

    pub fn with_catalog(mut self, kind: CatalogKind, result: GatewayResult<Cursor>) -> Self {
        self.catalogs.insert(kind, result);
        self
    }
}

/// A one-column, one-row cursor
pub(crate) fn scalar(value: Value) -> Cursor {
    Cursor::new(vec!["value".into()], vec![vec![value]])
}

impl OdbcConnection for StubConnection {
    fn get_info(&self, info: InfoType) -> GatewayResult<AttributeValue> {
        self.info
            .get(&info)
            .cloned()
            .unwrap_or_else(|| Err(GatewayError::new("HY096", "Information type out of range")))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> GatewayResult<Cursor> {
        self.executed.borrow_mut().push(sql.to_string());
        (self.responder)(sql, params)
    }

    fn prepare<'c>(&'c self, sql: &str) -> GatewayResult<Box<dyn PreparedStatement + 'c>> {
        Ok(Box::new(StubPrepared {
            conn: self,
            sql: sql.to_string(),
        }))
    }

    fn catalog(&self, kind: CatalogKind, _filter: &CatalogFilter) -> GatewayResult<Cursor> {
        self.catalogs
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Err(GatewayError::unsupported(&kind.to_string())))
    }

    fn allocate_statements(&self, _count: usize) -> GatewayResult<()> {
        Ok(())
    }

    fn autocommit(&self) -> GatewayResult<bool> {
        Ok(true)
    }

    fn set_autocommit(&self, _enabled: bool) -> GatewayResult<()> {
        Ok(())
    }

    fn commit(&self) -> GatewayResult<()> {
        Ok(())
    }

    fn rollback(&self) -> GatewayResult<()> {
        Ok(())
    }

    fn function_bitmap(&self) -> GatewayResult<Option<FunctionBitmap>> {
        Ok(self.bitmap.clone())
    }

    fn has_binding(&self, function: OdbcFunction) -> bool {
        !matches!(function, OdbcFunction::PrimaryKeys)
    }

    fn close(self: Box<Self>) -> GatewayResult<()> {
        self.closed.set(true);
        if let Some(counter) = &self.close_counter {
            counter.set(counter.get() + 1);
        }
        match self.close_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

struct StubPrepared<'c> {
    conn: &'c StubConnection,
    sql: String,
}

impl PreparedStatement for StubPrepared<'_> {
    fn execute(&mut self, params: &[Value]) -> GatewayResult<Cursor> {
        self.conn.execute(&self.sql, params)
    }
}

/// Gateway that builds a fresh stub per connect, or refuses
pub(crate) struct StubGateway {
    pub factory: Box<dyn Fn() -> StubConnection>,
    pub refuse: Option<GatewayError>,
    pub connects: Cell<usize>,
    pub closes: Rc<Cell<usize>>,
}

impl StubGateway {
    pub fn new(factory: impl Fn() -> StubConnection + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            refuse: None,
            connects: Cell::new(0),
            closes: Rc::default(),
        }
    }

    pub fn refusing(error: GatewayError) -> Self {
        Self {
            factory: Box::new(StubConnection::new),
            refuse: Some(error),
            connects: Cell::new(0),
            closes: Rc::default(),
        }
    }
}

impl OdbcGateway for StubGateway {
    fn probe_environment(&self) -> GatewayResult<()> {
        Ok(())
    }

    fn connect(
        &self,
        _descriptor: &ConnectionDescriptor,
        _timeout: Duration,
    ) -> GatewayResult<Box<dyn OdbcConnection + '_>> {
        self.connects.set(self.connects.get() + 1);
        match &self.refuse {
            Some(error) => Err(error.clone()),
            None => {
                let mut conn = (self.factory)();
                conn.close_counter = Some(self.closes.clone());
                Ok(Box::new(conn))
            }
        }
    }
}
