use crate::{
    Cursor, Error, Result, RowContract, RowProxy, RowSchema, Session, Value,
    session::guarded_write, sql, util::quote_identifier,
};
use std::marker::PhantomData;

/// Per row contract facade over a [`Session`].
pub struct Repository<'s, S: Session, R: RowContract> {
    session: &'s S,
    table: Option<String>,
    _row: PhantomData<fn() -> R>,
}

impl<'s, S: Session, R: RowContract> Clone for Repository<'s, S, R> {
    fn clone(&self) -> Self {
        Self {
            session: self.session,
            table: self.table.clone(),
            _row: PhantomData,
        }
    }
}

impl<'s, S: Session, R: RowContract> Repository<'s, S, R> {
    pub fn new(session: &'s S) -> Self {
        Self {
            session,
            table: None,
            _row: PhantomData,
        }
    }

    /// Read and write `table` (used verbatim) instead of the contract table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn session(&self) -> &'s S {
        self.session
    }

    /// Table override or the unquoted contract table.
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| R::schema().table.clone())
    }

    fn quoted_table(&self, quote: &str) -> String {
        match &self.table {
            Some(table) => table.clone(),
            None => quote_identifier(quote, &R::schema().table),
        }
    }

    /// Fresh row, nothing loaded.
    pub fn define(&self) -> RowProxy<R> {
        RowProxy::<R>::new().with_table_name(self.table.clone())
    }

    pub fn define_with(&self, f: impl FnOnce(&mut R)) -> RowProxy<R> {
        let mut row = self.define();
        row.apply(f);
        row
    }

    /// Row loaded from `values` keyed by column.
    pub fn of<K: AsRef<str>>(
        &self,
        values: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<RowProxy<R>> {
        let mut row = self.define();
        row.load(values)?;
        Ok(row)
    }

    /// Filter on the columns set by `f`.
    pub fn key(&self, f: impl FnOnce(&mut R)) -> Filtered<'s, S, R> {
        Filtered {
            repository: self.clone(),
            filter: self.define_with(f),
        }
    }

    /// Filter on the identity column.
    pub fn id(&self, id: impl Into<Value>) -> Result<Filtered<'s, S, R>> {
        if !R::schema().has_identity() {
            return Err(Error::msg(format!(
                "{} does not declare an identity column",
                R::schema().name
            )));
        }
        let mut filter = self.define();
        filter.set(RowSchema::IDENTITY, id)?;
        Ok(Filtered {
            repository: self.clone(),
            filter,
        })
    }

    /// Rows equal to `filter` on every column it sets, all rows when it sets none.
    pub async fn select(
        &self,
        filter: &RowProxy<R>,
        order_by: Option<&str>,
    ) -> Result<Vec<RowProxy<R>>> {
        let reservation = self.session.reserve().await?;
        let quote = reservation.identifier_quote().to_string();
        let mut filter = filter.clone();
        filter.set_identifier_quote(quote.as_str());
        let (columns, params): (Vec<_>, Vec<_>) = filter.db_map().into_iter().unzip();
        let sql = sql::find_select(
            R::schema(),
            &quote,
            &self.quoted_table(&quote),
            &columns,
            order_by,
        );
        let table = self.table.clone();
        let cursor = Cursor::open(
            reservation,
            sql,
            params,
            Box::new(move |values: &[Value], quote: &str| {
                Ok(RowProxy::<R>::materialize(values, quote)?.with_table_name(table.clone()))
            }),
        )
        .await?;
        cursor.collect(None).await
    }

    /// First row matching `filter`.
    pub async fn find(&self, filter: &RowProxy<R>) -> Result<Option<RowProxy<R>>> {
        Ok(self.select(filter, None).await?.into_iter().next())
    }

    pub async fn list(&self) -> Result<Vec<RowProxy<R>>> {
        self.select(&self.define(), None).await
    }

    pub async fn list_ordered(&self, order_by: &str) -> Result<Vec<RowProxy<R>>> {
        self.select(&self.define(), Some(order_by)).await
    }

    async fn write(
        &self,
        mut row: RowProxy<R>,
        filter: Option<&RowProxy<R>>,
        updator: impl FnOnce(&mut RowProxy<R>),
        upsert: bool,
    ) -> Result<RowProxy<R>> {
        guarded_write(self.session.write_lock(), async move {
            if let Some(filter) = filter {
                for (property, value) in filter.to_map() {
                    (*row).write(property, value)?;
                }
            }
            updator(&mut row);
            if self.table.is_some() {
                row.set_table_name(self.table.clone());
            }
            self.session.insert(&mut row, upsert).await?;
            Ok(row)
        })
        .await
    }

    /// Insert `row` as it is.
    pub async fn insert(&self, row: RowProxy<R>) -> Result<RowProxy<R>> {
        self.write(row, None, |_| {}, false).await
    }

    /// Insert a fresh row populated by `updator`.
    pub async fn insert_with(&self, updator: impl FnOnce(&mut RowProxy<R>)) -> Result<RowProxy<R>> {
        self.write(self.define(), None, updator, false).await
    }

    pub async fn upsert(&self, row: RowProxy<R>) -> Result<RowProxy<R>> {
        self.write(row, None, |_| {}, true).await
    }

    pub async fn upsert_with(&self, updator: impl FnOnce(&mut RowProxy<R>)) -> Result<RowProxy<R>> {
        self.write(self.define(), None, updator, true).await
    }

    pub async fn insert_batch(&self, rows: &mut [RowProxy<R>]) -> Result<()> {
        if self.table.is_some() {
            for row in rows.iter_mut() {
                row.set_table_name(self.table.clone());
            }
        }
        self.session.insert_batch(rows).await
    }

    pub async fn update(&self, row: &mut RowProxy<R>) -> Result<()> {
        self.session.update(row).await
    }

    pub async fn delete(&self, row: &RowProxy<R>) -> Result<()> {
        self.session.delete(row).await
    }

    /// Delete every row of the table, one by one.
    pub async fn delete_all(&self) -> Result<()> {
        for row in self.list().await? {
            self.delete(&row).await?;
        }
        Ok(())
    }

    /// Delete the rows selected by `tableish`, see [`Repository::iterator`].
    pub async fn delete_where(&self, tableish: &str, params: Vec<Value>) -> Result<()> {
        for row in self.list_where(tableish, params).await? {
            self.delete(&row).await?;
        }
        Ok(())
    }

    /// Table expression for [`Repository::iterator`]. A `call` is kept verbatim, a
    /// `select` becomes a derived table, a `where` fragment is applied to the table
    /// and a table or join expression is wrapped in a derived table.
    pub fn tableish(&self, tableish: &str, quote: &str) -> String {
        let tableish = tableish.trim();
        let alias = quote_identifier(quote, &R::schema().alias);
        if sql::starts_with_keyword(tableish, "call") {
            return tableish.to_string();
        }
        if sql::starts_with_keyword(tableish, "select") {
            return format!("({tableish}) {alias}");
        }
        let inner = if sql::starts_with_keyword(tableish, "where") {
            format!("{} {alias} {tableish}", self.quoted_table(quote))
        } else if is_bare_identifier(tableish) {
            let plain = tableish.chars().all(|c| c.is_alphanumeric() || c == '_');
            if plain {
                format!("{} {alias}", quote_identifier(quote, tableish))
            } else {
                format!("{tableish} {alias}")
            }
        } else {
            tableish.to_string()
        };
        format!("(select [*] from {inner}) {alias}")
    }

    /// Rows of this contract selected by `tableish`, see [`Repository::tableish`].
    pub async fn iterator(
        &self,
        tableish: &str,
        params: Vec<Value>,
    ) -> Result<Cursor<'s, S::Connection, RowProxy<R>>> {
        let reservation = self.session.reserve().await?;
        let quote = reservation.identifier_quote();
        let tableish = self.tableish(tableish, quote);
        let sql = sql::iterator_select(&[R::schema()], quote, &tableish);
        let table = self.table.clone();
        Cursor::open(
            reservation,
            sql,
            params,
            Box::new(move |values: &[Value], quote: &str| {
                Ok(RowProxy::<R>::materialize(values, quote)?.with_table_name(table.clone()))
            }),
        )
        .await
    }

    pub async fn list_where(&self, tableish: &str, params: Vec<Value>) -> Result<Vec<RowProxy<R>>> {
        self.iterator(tableish, params).await?.collect(None).await
    }
}

fn is_bare_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '`' | '"'))
}

/// Repository operations constrained by a filter row, built by [`Repository::key`]
/// or [`Repository::id`].
pub struct Filtered<'s, S: Session, R: RowContract> {
    repository: Repository<'s, S, R>,
    filter: RowProxy<R>,
}

impl<'s, S: Session, R: RowContract> Filtered<'s, S, R> {
    pub fn filter(&self) -> &RowProxy<R> {
        &self.filter
    }

    /// Narrow the filter with the columns set by `f`.
    pub fn key(mut self, f: impl FnOnce(&mut R)) -> Self {
        self.filter.apply(f);
        self
    }

    pub async fn find(&self) -> Result<Option<RowProxy<R>>> {
        self.repository.find(&self.filter).await
    }

    pub async fn list(&self) -> Result<Vec<RowProxy<R>>> {
        self.repository.select(&self.filter, None).await
    }

    pub async fn list_ordered(&self, order_by: &str) -> Result<Vec<RowProxy<R>>> {
        self.repository.select(&self.filter, Some(order_by)).await
    }

    /// Matching row, or a fresh row carrying the filter values when there is none.
    pub async fn find_or_define(&self) -> Result<RowProxy<R>> {
        Ok(match self.find().await? {
            Some(row) => row,
            None => {
                let mut row = self.repository.define();
                for (property, value) in self.filter.to_map() {
                    (*row).write(property, value)?;
                }
                row
            }
        })
    }

    /// Insert a fresh row with the filter values.
    pub async fn insert(&self) -> Result<RowProxy<R>> {
        self.insert_with(|_| {}).await
    }

    /// Insert a fresh row with the filter values, then `updator` applied.
    pub async fn insert_with(&self, updator: impl FnOnce(&mut RowProxy<R>)) -> Result<RowProxy<R>> {
        let repository = &self.repository;
        repository
            .write(repository.define(), Some(&self.filter), updator, false)
            .await
    }

    pub async fn upsert(&self) -> Result<RowProxy<R>> {
        self.upsert_with(|_| {}).await
    }

    pub async fn upsert_with(&self, updator: impl FnOnce(&mut RowProxy<R>)) -> Result<RowProxy<R>> {
        let repository = &self.repository;
        repository
            .write(repository.define(), Some(&self.filter), updator, true)
            .await
    }

    /// Delete the matching rows.
    pub async fn delete(&self) -> Result<()> {
        for row in self.list().await? {
            self.repository.delete(&row).await?;
        }
        Ok(())
    }
}
