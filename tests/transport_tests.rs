// TransportSession contract: lazy connect, teardown classes, reconnect

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ratewatch::source::SourceError;
use ratewatch::transport::{Connect, TransportSession};

/// Countable fake connection factory; a "connection" is just its serial.
struct FakeConnector {
    connects: AtomicU64,
    fail_connect: AtomicBool,
}

impl FakeConnector {
    fn new() -> Self {
        Self {
            connects: AtomicU64::new(0),
            fail_connect: AtomicBool::new(false),
        }
    }
}

impl Connect for FakeConnector {
    type Conn = u64;

    fn connect(&self) -> Result<u64, SourceError> {
        if self.fail_connect.load(Ordering::Relaxed) {
            return Err(SourceError::Transport("connection refused".into()));
        }
        Ok(self.connects.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn target(&self) -> String {
        "fake://device".into()
    }
}

#[tokio::test]
async fn connects_lazily_on_first_use() {
    let session = TransportSession::new(FakeConnector::new());
    assert!(!session.is_connected().await);

    let serial = session.run(|conn: &mut u64| Ok(*conn)).await.unwrap();
    assert_eq!(serial, 1);
    assert!(session.is_connected().await);

    // Second fetch reuses the live connection.
    let serial = session.run(|conn: &mut u64| Ok(*conn)).await.unwrap();
    assert_eq!(serial, 1);
}

#[tokio::test]
async fn protocol_error_retains_the_session() {
    let session = TransportSession::new(FakeConnector::new());
    session.run(|conn: &mut u64| Ok(*conn)).await.unwrap();

    let err = session
        .run(|_conn: &mut u64| -> Result<(), SourceError> {
            Err(SourceError::Protocol("bad oid".into()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Protocol(_)));
    assert!(session.is_connected().await);

    // Same connection serial: no reconnect happened.
    let serial = session.run(|conn: &mut u64| Ok(*conn)).await.unwrap();
    assert_eq!(serial, 1);
}

#[tokio::test]
async fn transport_error_tears_down_and_next_fetch_reconnects() {
    let session = TransportSession::new(FakeConnector::new());
    session.run(|conn: &mut u64| Ok(*conn)).await.unwrap();

    let err = session
        .run(|_conn: &mut u64| -> Result<(), SourceError> {
            Err(SourceError::Transport("timed out".into()))
        })
        .await
        .unwrap_err();
    assert!(err.tears_down_session());
    assert!(!session.is_connected().await);

    // The next tick's fetch transparently reconnects.
    let serial = session.run(|conn: &mut u64| Ok(*conn)).await.unwrap();
    assert_eq!(serial, 2);
    assert!(session.is_connected().await);
}

#[tokio::test]
async fn failed_connect_makes_exactly_one_attempt_per_call() {
    let connector = FakeConnector::new();
    connector.fail_connect.store(true, Ordering::Relaxed);
    let session = TransportSession::new(connector);

    let err = session
        .run(|conn: &mut u64| Ok(*conn))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Transport(_)));
    assert!(!session.is_connected().await);
}
