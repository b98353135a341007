use crate::{
    Connection, Error, Reservation, Result, Row, Rows, Statement, Value, classify,
    stream::Stream, truncate_long,
};
use async_stream::try_stream;

/// Turns one physical row into the cursor output, receives the identifier quote.
pub type RowMapper<'a, O> = Box<dyn Fn(&[Value], &str) -> Result<O> + Send + 'a>;

/// Lazy, forward only, single pass cursor over a query.
///
/// It owns the reservation, the statement and the rows until closed, closing
/// releases them in reverse order and tolerates partially opened cursors.
pub struct Cursor<'a, C: Connection, O> {
    reservation: Option<Reservation<'a, C>>,
    statement: Option<C::Statement>,
    rows: Option<<C::Statement as Statement>::Rows>,
    current: Option<Row>,
    mapper: RowMapper<'a, O>,
    identifier_quote: String,
    sql: String,
}

impl<'a, C: Connection, O> Cursor<'a, C, O> {
    /// Prepare and execute `sql` on the reservation. On failure every resource
    /// acquired so far is released before the error is returned.
    pub async fn open(
        reservation: Reservation<'a, C>,
        sql: String,
        params: Vec<Value>,
        mapper: RowMapper<'a, O>,
    ) -> Result<Self> {
        log::debug!("iterator:\n{}", truncate_long!(sql));
        let identifier_quote = reservation.identifier_quote().to_string();
        let mut cursor = Self {
            reservation: Some(reservation),
            statement: None,
            rows: None,
            current: None,
            mapper,
            identifier_quote,
            sql,
        };
        if let Err(e) = cursor.execute(params).await {
            cursor.close();
            return Err(classify(e, "iterator", &cursor.identifier_quote, &cursor.sql));
        }
        Ok(cursor)
    }

    async fn execute(&mut self, params: Vec<Value>) -> Result<()> {
        let Some(reservation) = self.reservation.as_mut() else {
            return Err(Error::msg("The cursor is closed"));
        };
        let statement = reservation.get()?.prepare(&self.sql, false).await?;
        let statement = self.statement.insert(statement);
        for (i, value) in params.into_iter().enumerate() {
            statement.bind(i, value)?;
        }
        self.rows = Some(statement.execute_query().await?);
        Ok(())
    }

    /// Advance to the next row, false when exhausted or closed.
    pub async fn next(&mut self) -> Result<bool> {
        let Some(rows) = self.rows.as_mut() else {
            self.current = None;
            return Ok(false);
        };
        match rows.next().await {
            Ok(row) => {
                self.current = row;
                Ok(self.current.is_some())
            }
            Err(e) => {
                self.current = None;
                Err(classify(e, "iterator", &self.identifier_quote, &self.sql))
            }
        }
    }

    /// Map the current row. Calling it before a successful [`Cursor::next`] is an error.
    pub fn get(&self) -> Result<O> {
        let Some(row) = self.current.as_ref() else {
            return Err(Error::msg(
                "Cursor::get called without a current row, call next first",
            ));
        };
        (self.mapper)(row, &self.identifier_quote)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn is_closed(&self) -> bool {
        self.reservation.is_none()
    }

    /// Release rows, statement and reservation. Safe to call more than once.
    pub fn close(&mut self) {
        self.current = None;
        if let Some(mut rows) = self.rows.take() {
            if let Err(e) = rows.close() {
                log::warn!("Error while closing the rows: {e:#}");
            }
        }
        if let Some(mut statement) = self.statement.take() {
            if let Err(e) = statement.close() {
                log::warn!("Error while closing the statement: {e:#}");
            }
        }
        if let Some(mut reservation) = self.reservation.take() {
            reservation.close();
        }
    }

    /// Read up to `limit` rows (all when `None`) and close the cursor.
    pub async fn collect(mut self, limit: Option<usize>) -> Result<Vec<O>> {
        let mut result = Vec::new();
        while limit.is_none_or(|limit| result.len() < limit) && self.next().await? {
            result.push(self.get()?);
        }
        self.close();
        Ok(result)
    }

    /// Stream the remaining rows, the cursor closes when the stream ends or is dropped.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<O>> + 'a
    where
        C: 'a,
        O: 'a,
    {
        try_stream! {
            while self.next().await? {
                yield self.get()?;
            }
            self.close();
        }
    }
}

impl<'a, C: Connection, O> Drop for Cursor<'a, C, O> {
    fn drop(&mut self) {
        self.close();
    }
}
