// Single shared device connection: lazy connect, teardown on failure

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::source::SourceError;

/// Blocking connection factory for one device target. Implementations hold
/// the static target description (address, credentials) and nothing mutable.
pub trait Connect: Send + Sync + 'static {
    type Conn: Send + 'static;

    /// Establish one connection. Runs on the blocking thread pool.
    fn connect(&self) -> Result<Self::Conn, SourceError>;

    /// Target description for logs.
    fn target(&self) -> String;
}

/// Holds at most one live connection per device target.
///
/// The connection is created lazily on first use. A tick that finds no live
/// connection makes exactly one (re)connect attempt; there is no in-tick
/// retry or backoff. A `Transport`-class failure drops the connection so the
/// next fetch reconnects; `Protocol`/`Parse` failures keep it.
///
/// The inner mutex serializes access: device transports expect one command
/// in flight per connection, so concurrent subscriber fetches queue here.
pub struct TransportSession<C: Connect> {
    connector: Arc<C>,
    conn: Mutex<Option<C::Conn>>,
}

impl<C: Connect> TransportSession<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            conn: Mutex::new(None),
        }
    }

    /// Runs one blocking operation against the live connection, connecting
    /// first if necessary. The mutex guard spans connect + operation, so
    /// fetches are strictly serialized.
    pub async fn run<T, F>(&self, op: F) -> Result<T, SourceError>
    where
        F: FnOnce(&mut C::Conn) -> Result<T, SourceError> + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = self.conn.lock().await;
        let existing = guard.take();
        let connector = self.connector.clone();

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let mut conn = match existing {
                Some(c) => c,
                None => match connector.connect() {
                    Ok(c) => {
                        tracing::info!(device = %connector.target(), "device session created");
                        c
                    }
                    Err(e) => return (None, Err(e)),
                },
            };
            let result = op(&mut conn);
            (Some(conn), result)
        })
        .await
        .map_err(|e| SourceError::Transport(format!("blocking task join: {e}")))?;

        match result {
            Ok(value) => {
                *guard = conn;
                Ok(value)
            }
            Err(e) => {
                if e.tears_down_session() {
                    tracing::warn!(
                        device = %self.connector.target(),
                        error = %e,
                        "tearing down device session; next fetch reconnects"
                    );
                    // conn (if any) drops here, closing the handle
                } else {
                    *guard = conn;
                }
                Err(e)
            }
        }
    }

    /// Whether a live connection is currently held (diagnostics/tests).
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }
}
