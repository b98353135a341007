#![allow(dead_code)]

use log::LevelFilter;
use rowkit::{
    Connection, DataSource, DriverError, DriverErrorKind, Error, IsolationLevel, Result, Row,
    Rows, RowsAffected, Statement, Value,
};
use std::{
    collections::VecDeque,
    env,
    sync::{Arc, Mutex, MutexGuard},
};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Scripted outcome of the next executed statement.
pub enum Reply {
    Rows(Vec<Vec<Value>>),
    Affected(RowsAffected),
    Fail(DriverErrorKind, &'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<Value>,
    pub generated_keys: bool,
}

#[derive(Default)]
pub struct MockState {
    pub quote: String,
    pub replies: VecDeque<Reply>,
    pub fail_connect: bool,
    pub fail_prepare: Option<DriverErrorKind>,
    pub fail_bind: bool,
    pub prepared: Vec<String>,
    pub executed: Vec<Executed>,
    pub connects: usize,
    pub releases: usize,
    pub closed_statements: usize,
    pub closed_rows: usize,
    pub auto_commit: Vec<bool>,
    pub isolation: Vec<IsolationLevel>,
    pub commits: usize,
    pub rollbacks: usize,
}

/// In memory data source, every connection shares the same scripted state.
#[derive(Clone)]
pub struct MockSource {
    state: Arc<Mutex<MockState>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                quote: "`".into(),
                ..Default::default()
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn reply(&self, reply: Reply) -> &Self {
        self.state().replies.push_back(reply);
        self
    }

    pub fn rows(&self, rows: Vec<Vec<Value>>) -> &Self {
        self.reply(Reply::Rows(rows))
    }

    pub fn affected(&self, rows_affected: u64) -> &Self {
        self.reply(Reply::Affected(RowsAffected {
            rows_affected,
            last_affected_id: None,
        }))
    }

    pub fn affected_with_id(&self, rows_affected: u64, id: i64) -> &Self {
        self.reply(Reply::Affected(RowsAffected {
            rows_affected,
            last_affected_id: Some(id),
        }))
    }

    pub fn fail(&self, kind: DriverErrorKind, message: &'static str) -> &Self {
        self.reply(Reply::Fail(kind, message))
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.state().executed.iter().map(|v| v.sql.clone()).collect()
    }
}

impl DataSource for MockSource {
    type Connection = MockConnection;

    async fn connect(&self) -> Result<MockConnection> {
        let mut state = self.state();
        if state.fail_connect {
            return Err(Error::msg("connection refused"));
        }
        state.connects += 1;
        Ok(MockConnection {
            state: self.state.clone(),
        })
    }

    fn release(&self, _connection: MockConnection) {
        self.state().releases += 1;
    }
}

pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl Connection for MockConnection {
    type Statement = MockStatement;

    async fn identifier_quote(&mut self) -> Result<String> {
        Ok(self.state().quote.clone())
    }

    async fn prepare(&mut self, sql: &str, generated_keys: bool) -> Result<MockStatement> {
        let mut state = self.state();
        state.prepared.push(sql.to_string());
        if let Some(kind) = state.fail_prepare.take() {
            return Err(DriverError::new(kind, "prepare rejected").into());
        }
        Ok(MockStatement {
            state: self.state.clone(),
            sql: sql.to_string(),
            generated_keys,
            params: Vec::new(),
        })
    }

    async fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()> {
        self.state().auto_commit.push(auto_commit);
        Ok(())
    }

    async fn set_isolation(&mut self, level: IsolationLevel) -> Result<()> {
        self.state().isolation.push(level);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.state().commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.state().rollbacks += 1;
        Ok(())
    }
}

pub struct MockStatement {
    state: Arc<Mutex<MockState>>,
    sql: String,
    generated_keys: bool,
    params: Vec<Value>,
}

impl MockStatement {
    fn record(&self) -> Option<Reply> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(Executed {
            sql: self.sql.clone(),
            params: self.params.clone(),
            generated_keys: self.generated_keys,
        });
        state.replies.pop_front()
    }
}

impl Statement for MockStatement {
    type Rows = MockRows;

    fn bind(&mut self, index: usize, value: Value) -> Result<()> {
        if self.state.lock().unwrap().fail_bind {
            return Err(Error::msg(format!("cannot bind parameter {index}")));
        }
        if self.params.len() <= index {
            self.params.resize(index + 1, Value::Null);
        }
        self.params[index] = value;
        Ok(())
    }

    fn clear_bindings(&mut self) -> Result<()> {
        self.params.clear();
        Ok(())
    }

    async fn execute_update(&mut self) -> Result<RowsAffected> {
        match self.record() {
            None => Ok(RowsAffected {
                rows_affected: 1,
                last_affected_id: None,
            }),
            Some(Reply::Affected(affected)) => Ok(affected),
            Some(Reply::Fail(kind, message)) => Err(DriverError::new(kind, message).into()),
            Some(Reply::Rows(..)) => Err(Error::msg("a query was scripted, not an update")),
        }
    }

    async fn execute_query(&mut self) -> Result<MockRows> {
        let rows = match self.record() {
            None => VecDeque::new(),
            Some(Reply::Rows(rows)) => rows.into_iter().map(Row::from).collect(),
            Some(Reply::Fail(kind, message)) => return Err(DriverError::new(kind, message).into()),
            Some(Reply::Affected(..)) => {
                return Err(Error::msg("an update was scripted, not a query"));
            }
        };
        Ok(MockRows {
            state: self.state.clone(),
            rows,
        })
    }

    fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().closed_statements += 1;
        Ok(())
    }
}

pub struct MockRows {
    state: Arc<Mutex<MockState>>,
    rows: VecDeque<Row>,
}

impl Rows for MockRows {
    async fn next(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().closed_rows += 1;
        Ok(())
    }
}
