use crate::{
    Connection, Error, IsolationLevel, Reservation, Result, Session, SessionConfig,
    TransactionConfig, is_retryable,
};
use rand::Rng;
use std::time::Duration;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

/// Session bound to a single reservation with auto-commit disabled.
///
/// Reservations handed out by this session borrow the same connection, only one can
/// be open at a time: reserving while a cursor is still open fails fast.
pub struct TransactionSession<'s, C: Connection> {
    reservation: Mutex<Reservation<'s, C>>,
    identifier_quote: String,
    config: SessionConfig,
    write_lock: Mutex<()>,
}

impl<'s, C: Connection> TransactionSession<'s, C> {
    /// Start a transaction on `reservation`. On failure the reservation is released.
    pub async fn begin(
        mut reservation: Reservation<'s, C>,
        isolation: Option<IsolationLevel>,
        config: SessionConfig,
    ) -> Result<Self> {
        let started = async {
            let connection = reservation.get()?;
            if let Some(level) = isolation {
                connection.set_isolation(level).await?;
            }
            connection.set_auto_commit(false).await
        }
        .await;
        if let Err(e) = started {
            log::warn!("Could not start the transaction: {e:#}");
            reservation.close();
            return Err(e);
        }
        log::trace!("Transaction started");
        Ok(Self {
            identifier_quote: reservation.identifier_quote().to_string(),
            reservation: Mutex::new(reservation),
            config,
            write_lock: Mutex::new(()),
        })
    }

    fn lease(&self) -> Result<MappedMutexGuard<'_, C>> {
        let guard = self.reservation.try_lock().map_err(|_| {
            Error::msg("The transaction connection is in use, close the open cursors first")
        })?;
        MutexGuard::try_map(guard, |v| v.connection_mut())
            .map_err(|_| Error::msg("The transaction is already closed"))
    }

    pub async fn commit(&self) -> Result<()> {
        log::trace!("Commit");
        self.lease()?.commit().await
    }

    pub async fn rollback(&self) -> Result<()> {
        log::trace!("Rollback");
        self.lease()?.rollback().await
    }

    /// Restore auto-commit then release the reservation, whatever happened before.
    /// Returns the error of the restore, if any.
    pub async fn close(self) -> Result<()> {
        let mut reservation = self.reservation.into_inner();
        let restored = match reservation.get() {
            Ok(connection) => connection.set_auto_commit(true).await,
            Err(e) => Err(e),
        };
        reservation.close();
        if let Err(e) = &restored {
            log::warn!("Could not restore auto-commit: {e:#}");
        }
        restored
    }
}

impl<'s, C: Connection> Session for TransactionSession<'s, C> {
    type Connection = C;

    async fn reserve(&self) -> Result<Reservation<'_, C>> {
        Ok(Reservation::borrowed(
            self.lease()?,
            self.identifier_quote.clone(),
        ))
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn write_lock(&self) -> &Mutex<()> {
        &self.write_lock
    }
}

/// Runs units of work in a transaction, retrying the ones failing with a
/// [`crate::RetryableError`].
///
/// Between attempts it sleeps `retry_delay` plus a random jitter of up to the same
/// amount. Success commits, any other outcome rolls back once and returns the last
/// error. Auto-commit is restored and the connection released on every path.
#[derive(Default, Debug, Clone)]
pub struct TransactionRunner {
    config: TransactionConfig,
}

impl TransactionRunner {
    pub fn new(config: TransactionConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(TransactionConfig::from_env()?))
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    fn jittered_delay(&self) -> Duration {
        let delay = self.config.retry_delay;
        let millis = delay.as_millis().min(u64::MAX as u128) as u64;
        let jitter = rand::thread_rng().gen_range(0..=millis);
        delay + Duration::from_millis(jitter)
    }

    pub async fn run<S, T, F>(&self, session: &S, mut work: F) -> Result<T>
    where
        S: Session,
        F: AsyncFnMut(&TransactionSession<'_, S::Connection>) -> Result<T>,
    {
        let reservation = session.reserve().await?;
        let transaction =
            TransactionSession::begin(reservation, self.config.isolation, session.config().clone())
                .await?;
        let tries = self.config.tries.max(1);
        let mut attempt = 1;
        let result = loop {
            match work(&transaction).await {
                Ok(value) => break Ok(value),
                Err(e) if attempt < tries && is_retryable(&e) => {
                    let delay = self.jittered_delay();
                    log::debug!(
                        "Attempt {attempt} of {tries} failed, retrying in {delay:?}: {e:#}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => break Err(e),
            }
        };
        let result = match result {
            Ok(value) => transaction.commit().await.map(|_| value),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            log::trace!("Transaction failed, rolling back: {e:#}");
            if let Err(rollback) = transaction.rollback().await {
                log::error!("Rollback failed: {rollback:#}");
            }
        }
        let closed = transaction.close().await;
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(..), Err(e)) => Err(e),
            (Err(e), ..) => Err(e),
        }
    }
}
