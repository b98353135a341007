use crate::{
    Connection, Cursor, Error, IdentityKind, Repository, Reservation, Result, RowContract,
    RowMapper, RowProxy, RowSchema, RowTuple, RowkitError, RowsAffected, SessionConfig, Statement,
    Value, classify, sql, truncate_long,
};
use std::future::Future;
use tokio::sync::Mutex;

tokio::task_local! {
    static WRITE_IN_FLIGHT: ();
}

/// Serialize an insert or upsert sequence on `lock`, rejecting nested sequences on
/// the same task instead of deadlocking on the lock.
pub(crate) async fn guarded_write<T>(
    lock: &Mutex<()>,
    write: impl Future<Output = Result<T>>,
) -> Result<T> {
    if WRITE_IN_FLIGHT.try_with(|_| ()).is_ok() {
        log::error!("Nested insert or upsert, only one can be in flight per task");
        return Err(RowkitError::Reentry.into());
    }
    let _guard = lock.lock().await;
    WRITE_IN_FLIGHT.scope((), write).await
}

/// Prepare, bind and execute a write statement, the statement is always closed.
pub async fn execute_update<C: Connection>(
    reservation: &mut Reservation<'_, C>,
    operation: &'static str,
    sql: &str,
    params: Vec<Value>,
    generated_keys: bool,
) -> Result<RowsAffected> {
    log::debug!("{operation}:\n{}", truncate_long!(sql));
    let quote = reservation.identifier_quote().to_string();
    let connection = reservation.get()?;
    let mut statement = connection
        .prepare(sql, generated_keys)
        .await
        .map_err(|e| classify(e, operation, &quote, sql))?;
    let result = async {
        for (i, value) in params.into_iter().enumerate() {
            statement.bind(i, value)?;
        }
        statement.execute_update().await
    }
    .await;
    if let Err(e) = statement.close() {
        log::warn!("Error while closing the statement of {operation}: {e:#}");
    }
    result.map_err(|e| classify(e, operation, &quote, sql))
}

/// Source of connection reservations plus the raw row operations built on them.
///
/// Implementors provide [`Session::reserve`], everything else is derived from it.
pub trait Session {
    type Connection: Connection;

    /// Reserve a connection together with its identifier quote.
    fn reserve(&self) -> impl Future<Output = Result<Reservation<'_, Self::Connection>>>;

    fn config(&self) -> &SessionConfig;

    /// Lock serializing insert and upsert sequences on this session.
    fn write_lock(&self) -> &Mutex<()>;

    fn repository<R: RowContract>(&self) -> Repository<'_, Self, R>
    where
        Self: Sized,
    {
        Repository::new(self)
    }

    /// Execute a statement, returns the affected rows.
    fn execute_sql(
        &self,
        sql: &str,
        params: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> {
        async move {
            let mut reservation = self.reserve().await?;
            execute_update(&mut reservation, "execute", sql, params, false).await
        }
    }

    /// Write the dirty columns of `row`, exactly one row must be affected.
    fn update<R: RowContract>(&self, row: &mut RowProxy<R>) -> impl Future<Output = Result<()>> {
        async move {
            if !R::schema().has_identity() {
                return Err(Error::msg(format!(
                    "Cannot update {}, it does not declare an identity column",
                    R::schema().name
                )));
            }
            if row.dirty_columns(false).is_empty() {
                log::trace!("Nothing to update on {:?}", row);
                return Ok(());
            }
            let mut reservation = self.reserve().await?;
            row.set_identifier_quote(reservation.identifier_quote());
            let Some(identity) = row.identity_column() else {
                return Err(Error::msg(format!(
                    "{} lost its identity column",
                    R::schema().name
                )));
            };
            let columns = row.dirty_columns(false);
            let mut params = Vec::with_capacity(columns.len() + 1);
            for column in &columns {
                params.push(row.db_value(column)?);
            }
            params.push(row.db_value(&identity)?);
            let sql = sql::update(&row.table_name(), &columns, &identity);
            let result = execute_update(&mut reservation, "update", &sql, params, false).await?;
            reservation.close();
            if result.rows_affected != 1 {
                let error = RowkitError::RowCount {
                    operation: "update",
                    actual: result.rows_affected,
                    expected: "1".into(),
                };
                log::warn!("{error}");
                return Err(error.into());
            }
            row.mark_clean();
            Ok(())
        }
    }

    /// Update `row` into the table expression `table` instead of its own table.
    fn update_in<R: RowContract>(
        &self,
        table: &str,
        row: &mut RowProxy<R>,
    ) -> impl Future<Output = Result<()>> {
        row.set_table_name(Some(table.to_string()));
        self.update(row)
    }

    /// Delete `row` by identity, zero or one row may be affected.
    fn delete<R: RowContract>(&self, row: &RowProxy<R>) -> impl Future<Output = Result<()>> {
        async move {
            let mut reservation = self.reserve().await?;
            let quote = reservation.identifier_quote().to_string();
            let mut row = row.clone();
            row.set_identifier_quote(quote);
            let Some(identity) = row.identity_column() else {
                return Err(Error::msg(format!(
                    "Cannot delete {}, it does not declare an identity column",
                    R::schema().name
                )));
            };
            let sql = sql::delete(&row.table_name(), &identity);
            let params = vec![row.db_value(&identity)?];
            let result = execute_update(&mut reservation, "delete", &sql, params, false).await?;
            if result.rows_affected > 1 {
                let error = RowkitError::RowCount {
                    operation: "delete",
                    actual: result.rows_affected,
                    expected: "0 or 1".into(),
                };
                log::warn!("{error}");
                return Err(error.into());
            }
            Ok(())
        }
    }

    /// Insert (or upsert) `row` into its table. Unexpected affected row counts are
    /// logged and ignored. An upsert of an auto generated identity reads the key back.
    fn insert<R: RowContract>(
        &self,
        row: &mut RowProxy<R>,
        upsert: bool,
    ) -> impl Future<Output = Result<()>> {
        async move {
            let operation = if upsert { "upsert" } else { "insert" };
            let mut reservation = self.reserve().await?;
            row.set_identifier_quote(reservation.identifier_quote());
            let schema = R::schema();
            let auto = upsert && schema.identity == IdentityKind::AutoInteger;
            let sql = sql::insert(schema, row.identifier_quote(), &row.table_name(), upsert);
            let params = insert_params(row, upsert)?;
            let result = execute_update(&mut reservation, operation, &sql, params, auto).await?;
            reservation.close();
            if !self.config().accepted_write_counts.contains(&result.rows_affected) {
                let error = RowkitError::RowCount {
                    operation,
                    actual: result.rows_affected,
                    expected: format!("{:?}", self.config().accepted_write_counts),
                };
                log::warn!("{error}, ignored");
            }
            if auto {
                if let Some(id) = result.last_affected_id {
                    row.set(RowSchema::IDENTITY, id)?;
                }
            }
            row.mark_clean();
            Ok(())
        }
    }

    /// Insert `rows` through a single prepared statement.
    fn insert_batch<R: RowContract>(
        &self,
        rows: &mut [RowProxy<R>],
    ) -> impl Future<Output = Result<()>> {
        async move {
            if rows.is_empty() {
                return Ok(());
            }
            let mut reservation = self.reserve().await?;
            let quote = reservation.identifier_quote().to_string();
            rows[0].set_identifier_quote(quote.as_str());
            let table = rows[0].table_name();
            let sql = sql::insert(R::schema(), &quote, &table, false);
            log::debug!("insert batch of {}:\n{}", rows.len(), truncate_long!(sql));
            let connection = reservation.get()?;
            let mut statement = connection
                .prepare(&sql, false)
                .await
                .map_err(|e| classify(e, "insert batch", &quote, &sql))?;
            let result = async {
                for row in rows.iter_mut() {
                    row.set_identifier_quote(quote.as_str());
                    statement.clear_bindings()?;
                    for (i, value) in insert_params(row, false)?.into_iter().enumerate() {
                        statement.bind(i, value)?;
                    }
                    statement.execute_update().await?;
                    row.mark_clean();
                }
                Ok::<_, Error>(())
            }
            .await;
            if let Err(e) = statement.close() {
                log::warn!("Error while closing the statement of insert batch: {e:#}");
            }
            result.map_err(|e| classify(e, "insert batch", &quote, &sql))
        }
    }

    /// Restore `row` to the state it had when it was loaded.
    fn reset<R: RowContract>(&self, row: &mut RowProxy<R>) {
        row.reset();
    }

    /// Run a query, every row is turned into the output by `mapper`.
    fn query<'s, O>(
        &'s self,
        sql: String,
        params: Vec<Value>,
        mapper: RowMapper<'s, O>,
    ) -> impl Future<Output = Result<Cursor<'s, Self::Connection, O>>> {
        async move {
            let reservation = self.reserve().await?;
            Cursor::open(reservation, sql, params, mapper).await
        }
    }

    /// Joined select of several row contracts. The `tableish` is a table or join
    /// expression with `[*]` or `alias.[*]` splats, a `select` statement or a `call`.
    fn iterator<'s, T: RowTuple>(
        &'s self,
        tableish: &str,
        params: Vec<Value>,
    ) -> impl Future<Output = Result<Cursor<'s, Self::Connection, T::Output>>> {
        async move {
            let reservation = self.reserve().await?;
            let schemas = T::schemas();
            let sql = sql::iterator_select(&schemas, reservation.identifier_quote(), tableish);
            Cursor::open(reservation, sql, params, Box::new(T::materialize)).await
        }
    }
}

/// Insert bindings: identity when declared, data columns, data columns again for an upsert.
fn insert_params<R: RowContract>(row: &RowProxy<R>, upsert: bool) -> Result<Vec<Value>> {
    let columns = row.columns(false);
    let mut params = Vec::with_capacity(columns.len() * 2 + 1);
    if let Some(identity) = row.identity_column() {
        params.push(row.db_value(&identity)?);
    }
    for column in &columns {
        params.push(row.db_value(column)?);
    }
    if upsert {
        for column in &columns {
            params.push(row.db_value(column)?);
        }
    }
    Ok(params)
}

