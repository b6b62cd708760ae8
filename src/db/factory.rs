//! Connection factory.
//!
//! The factory owns the connection string and hands out a fresh, unopened
//! handle for every logical call. Opening happens on the handle, so a bad
//! connection string surfaces as a connection failure of the call, not of
//! the factory.

use crate::config::ConnectionSettings;
use crate::db::driver::Connector;
use crate::error::DalResult;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ConnectionFactory<C> {
    connection_string: Arc<str>,
    connector: C,
}

impl<C: Connector> ConnectionFactory<C> {
    pub fn new(settings: ConnectionSettings, connector: C) -> Self {
        Self {
            connection_string: Arc::from(settings.connection_string),
            connector,
        }
    }

    /// Produce an unopened handle. Pure construction, cannot fail.
    pub fn new_connection(&self) -> ConnectionHandle<'_, C> {
        ConnectionHandle {
            connection_string: Arc::clone(&self.connection_string),
            connector: &self.connector,
        }
    }
}

/// An unopened connection. Consumed by [`ConnectionHandle::open`].
#[derive(Debug)]
pub struct ConnectionHandle<'f, C> {
    connection_string: Arc<str>,
    connector: &'f C,
}

impl<C: Connector> ConnectionHandle<'_, C> {
    pub async fn open(self) -> DalResult<C::Session> {
        debug!("Opening database connection");
        self.connector.connect(&self.connection_string).await
    }
}
