use crate::{Connection, DataSource, Error, Result};
use tokio::sync::MappedMutexGuard;

/// Where a reserved connection goes back when the reservation closes.
pub trait Release<C>: Sync {
    fn release(&self, connection: C);
}

impl<D: DataSource> Release<D::Connection> for D {
    fn release(&self, connection: D::Connection) {
        DataSource::release(self, connection)
    }
}

enum Lease<'a, C> {
    /// Checked out from a source, given back on close.
    Owned {
        connection: C,
        source: &'a dyn Release<C>,
    },
    /// Borrowed from an enclosing transaction, the guard is dropped on close.
    Borrowed(MappedMutexGuard<'a, C>),
}

/// Scoped handle over one connection and its identifier quote.
///
/// Closing is idempotent and releases the connection exactly once, dropping the
/// reservation closes it.
pub struct Reservation<'a, C: Connection> {
    lease: Option<Lease<'a, C>>,
    identifier_quote: String,
}

impl<'a, C: Connection> Reservation<'a, C> {
    pub fn new(connection: C, source: &'a dyn Release<C>, identifier_quote: String) -> Self {
        Self {
            lease: Some(Lease::Owned { connection, source }),
            identifier_quote,
        }
    }

    pub fn borrowed(guard: MappedMutexGuard<'a, C>, identifier_quote: String) -> Self {
        Self {
            lease: Some(Lease::Borrowed(guard)),
            identifier_quote,
        }
    }

    pub fn identifier_quote(&self) -> &str {
        &self.identifier_quote
    }

    pub fn get(&mut self) -> Result<&mut C> {
        self.connection_mut()
            .ok_or_else(|| Error::msg("The connection reservation is already closed"))
    }

    pub fn connection_mut(&mut self) -> Option<&mut C> {
        match self.lease.as_mut()? {
            Lease::Owned { connection, .. } => Some(connection),
            Lease::Borrowed(guard) => Some(&mut **guard),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lease.is_none()
    }

    pub fn close(&mut self) {
        match self.lease.take() {
            Some(Lease::Owned { connection, source }) => {
                log::trace!("Releasing the reserved connection");
                source.release(connection);
            }
            Some(Lease::Borrowed(guard)) => drop(guard),
            None => {}
        }
    }
}

impl<'a, C: Connection> Drop for Reservation<'a, C> {
    fn drop(&mut self) {
        self.close();
    }
}
