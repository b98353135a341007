use crate::{
    Connection, DataSource, Reservation, Result, RowContract, RowProxy, Session, SessionConfig,
    TransactionConfig, TransactionRunner, TransactionSession,
};
use tokio::sync::Mutex;

/// Session reserving a fresh connection from a [`DataSource`] for every operation.
pub struct DataSourceSession<D: DataSource> {
    source: D,
    config: SessionConfig,
    transaction: TransactionConfig,
    write_lock: Mutex<()>,
}

impl<D: DataSource> DataSourceSession<D> {
    pub fn new(source: D) -> Self {
        Self {
            source,
            config: Default::default(),
            transaction: Default::default(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_transaction_config(mut self, transaction: TransactionConfig) -> Self {
        self.transaction = transaction;
        self
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn transaction_config(&self) -> &TransactionConfig {
        &self.transaction
    }

    /// Run `work` in a transaction with this session's transaction settings.
    pub async fn run<T, F>(&self, work: F) -> Result<T>
    where
        F: AsyncFnMut(&TransactionSession<'_, D::Connection>) -> Result<T>,
    {
        TransactionRunner::new(self.transaction.clone())
            .run(self, work)
            .await
    }

    /// Upsert one fresh row per updator, in order. Each upsert runs on its own
    /// reservation, a failure stops the sequence.
    pub async fn upsert_all<R, F>(
        &self,
        updators: impl IntoIterator<Item = F>,
    ) -> Result<Vec<RowProxy<R>>>
    where
        R: RowContract,
        F: FnOnce(&mut RowProxy<R>),
    {
        let repository = self.repository::<R>();
        let mut result = Vec::new();
        for updator in updators {
            result.push(repository.upsert_with(updator).await?);
        }
        Ok(result)
    }
}

impl<D: DataSource> Session for DataSourceSession<D> {
    type Connection = D::Connection;

    async fn reserve(&self) -> Result<Reservation<'_, Self::Connection>> {
        let mut connection = self.source.connect().await?;
        match connection.identifier_quote().await {
            Ok(quote) => Ok(Reservation::new(connection, &self.source, quote)),
            Err(e) => {
                DataSource::release(&self.source, connection);
                Err(e)
            }
        }
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn write_lock(&self) -> &Mutex<()> {
        &self.write_lock
    }
}
