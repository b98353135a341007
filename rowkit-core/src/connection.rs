use crate::{Result, Value};
use std::future::Future;

/// One physical row, values in projection order.
pub type Row = Box<[Value]>;

/// Outcome of a write statement.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    pub rows_affected: u64,
    /// Generated key, reported only when the statement was prepared asking for it.
    pub last_affected_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Source of connections, typically a pool owned by the driver.
pub trait DataSource: Send + Sync {
    type Connection: Connection;

    fn connect(&self) -> impl Future<Output = Result<Self::Connection>> + Send;

    /// Give a connection back, the default closes it.
    fn release(&self, connection: Self::Connection) {
        drop(connection);
    }
}

pub trait Connection: Send {
    type Statement: Statement;

    /// Character (or string) used to quote identifiers, empty when unsupported.
    fn identifier_quote(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Prepare `sql`, the `?` placeholders are bound by position.
    fn prepare(
        &mut self,
        sql: &str,
        generated_keys: bool,
    ) -> impl Future<Output = Result<Self::Statement>> + Send;

    fn set_auto_commit(&mut self, auto_commit: bool) -> impl Future<Output = Result<()>> + Send;

    fn set_isolation(&mut self, level: IsolationLevel) -> impl Future<Output = Result<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;
}

pub trait Statement: Send {
    type Rows: Rows;

    /// Bind the parameter at zero based `index`.
    fn bind(&mut self, index: usize, value: Value) -> Result<()>;

    fn clear_bindings(&mut self) -> Result<()>;

    fn execute_update(&mut self) -> impl Future<Output = Result<RowsAffected>> + Send;

    fn execute_query(&mut self) -> impl Future<Output = Result<Self::Rows>> + Send;

    fn close(&mut self) -> Result<()>;
}

pub trait Rows: Send {
    fn next(&mut self) -> impl Future<Output = Result<Option<Row>>> + Send;

    fn close(&mut self) -> Result<()>;
}
