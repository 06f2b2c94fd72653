//! WebSocket Transport
//!
//! Owns the socket on a tokio task and talks to the frame loop through two
//! queues: a mutex-guarded inbound event queue drained once per frame, and
//! a bounded outbound channel fed with `try_send` so the frame loop never
//! blocks. Closing goes through a separate watch channel so a full
//! outbound queue can never swallow it. The transport never touches
//! world state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::{ReconnectPolicy, SyncConfig};
use crate::error::SyncError;
use crate::network::protocol::ClientMessage;

/// Something that happened on the wire, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A socket was opened (first connect or reconnect).
    Opened,
    /// A text frame arrived.
    Text(String),
    /// The socket closed or could not be opened.
    Closed {
        /// Human-readable cause.
        reason: String,
    },
}

enum PumpOutcome {
    LocalClose,
    Lost(String),
}

type InboundQueue = Arc<Mutex<VecDeque<TransportEvent>>>;

fn push(queue: &InboundQueue, event: TransportEvent) {
    match queue.lock() {
        Ok(mut queue) => queue.push_back(event),
        Err(poisoned) => poisoned.into_inner().push_back(event),
    }
}

/// Frame-loop side of a connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    outgoing: mpsc::Sender<String>,
    inbound: InboundQueue,
    shutdown: Arc<watch::Sender<bool>>,
}

/// Network-task side of a connection. Call [`ConnectionDriver::run`] on a
/// tokio runtime.
pub struct ConnectionDriver {
    url: String,
    reconnect: ReconnectPolicy,
    outgoing: mpsc::Receiver<String>,
    inbound: InboundQueue,
    shutdown: watch::Receiver<bool>,
}

/// Resolves once a close was requested or every handle is gone.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Create the two halves of a connection.
pub fn connection(config: &SyncConfig) -> (ConnectionHandle, ConnectionDriver) {
    let (outgoing_tx, outgoing_rx) = mpsc::channel(config.outgoing_capacity.max(1));
    let inbound: InboundQueue = Arc::new(Mutex::new(VecDeque::new()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = ConnectionHandle {
        outgoing: outgoing_tx,
        inbound: inbound.clone(),
        shutdown: Arc::new(shutdown_tx),
    };
    let driver = ConnectionDriver {
        url: config.server_url.clone(),
        reconnect: config.reconnect,
        outgoing: outgoing_rx,
        inbound,
        shutdown: shutdown_rx,
    };

    (handle, driver)
}

impl ConnectionHandle {
    /// Queue a message for the server. Fire-and-forget: a full channel
    /// drops the message.
    pub fn send(&self, msg: &ClientMessage) -> Result<(), SyncError> {
        let json = msg.to_json().map_err(|e| SyncError::malformed(e.to_string()))?;

        if *self.shutdown.borrow() {
            return Err(SyncError::ChannelClosed);
        }

        match self.outgoing.try_send(json) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Outgoing channel full, dropping message");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(SyncError::ChannelClosed),
        }
    }

    /// Take every event received since the last call.
    pub fn drain(&self) -> Vec<TransportEvent> {
        match self.inbound.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    /// Ask the network task to close the socket and stop. Never lost,
    /// whatever the state of the outbound queue.
    pub fn close(&self) {
        if !self.shutdown.send_replace(true) {
            debug!("Close requested");
        }
    }

    /// Whether the network task has stopped.
    pub fn is_closed(&self) -> bool {
        self.outgoing.is_closed()
    }
}

impl ConnectionDriver {
    /// Connect, pump frames, and reconnect per policy until closed locally
    /// or out of attempts.
    pub async fn run(mut self) {
        let mut retries = 0u32;

        loop {
            if *self.shutdown.borrow() {
                push(&self.inbound, TransportEvent::Closed { reason: "closed locally".into() });
                return;
            }
            info!("Connecting to {}...", self.url);

            let connect = tokio::select! {
                result = connect_async(self.url.as_str()) => Some(result),
                _ = stop_requested(&mut self.shutdown) => None,
            };

            let outcome = match connect {
                None => PumpOutcome::LocalClose,
                Some(Ok((ws_stream, _))) => {
                    info!("WebSocket connected!");
                    retries = 0;
                    if self.discard_stale() {
                        PumpOutcome::LocalClose
                    } else {
                        push(&self.inbound, TransportEvent::Opened);
                        self.pump(ws_stream).await
                    }
                }
                Some(Err(e)) => PumpOutcome::Lost(format!("connect failed: {e}")),
            };

            match outcome {
                PumpOutcome::LocalClose => {
                    info!("Connection closed locally");
                    push(&self.inbound, TransportEvent::Closed { reason: "closed locally".into() });
                    return;
                }
                PumpOutcome::Lost(reason) => {
                    warn!("Connection lost: {}", reason);
                    push(&self.inbound, TransportEvent::Closed { reason });
                }
            }

            if !self.reconnect.allows(retries) {
                info!("Not reconnecting after {} retries", retries);
                return;
            }
            retries += 1;

            let delay = self.reconnect.delay(retries);
            debug!("Reconnect attempt {} in {:?}", retries, delay);
            if self.wait_backoff(delay).await {
                return;
            }
        }
    }

    /// Drop messages queued while no socket was open. Returns true if a
    /// close was requested meanwhile.
    fn discard_stale(&mut self) -> bool {
        let mut dropped = 0usize;
        while self.outgoing.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Dropped {} stale outbound messages", dropped);
        }
        *self.shutdown.borrow()
    }

    /// Sleep out the backoff. Returns true if the handle asked to stop.
    async fn wait_backoff(&mut self, delay: std::time::Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                _ = stop_requested(&mut self.shutdown) => return true,
                outbound = self.outgoing.recv() => {
                    if outbound.is_none() {
                        return true;
                    }
                }
            }
        }
    }

    async fn pump(&mut self, ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> PumpOutcome {
        let (mut write, mut read) = ws_stream.split();
        let inbound = self.inbound.clone();

        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => push(&inbound, TransportEvent::Text(text)),
                    Some(Ok(Message::Binary(data))) => {
                        debug!("Ignoring {} byte binary frame", data.len());
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return PumpOutcome::Lost("closed by server".into());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return PumpOutcome::Lost(format!("read error: {e}")),
                },
                outbound = self.outgoing.recv() => match outbound {
                    Some(json) => {
                        if let Err(e) = write.send(Message::Text(json)).await {
                            return PumpOutcome::Lost(format!("write error: {e}"));
                        }
                    }
                    None => {
                        if let Err(e) = write.send(Message::Close(None)).await {
                            debug!("Close frame not delivered: {}", e);
                        }
                        return PumpOutcome::LocalClose;
                    }
                },
                _ = stop_requested(&mut self.shutdown) => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!("Close frame not delivered: {}", e);
                    }
                    return PumpOutcome::LocalClose;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(capacity: usize) -> SyncConfig {
        SyncConfig { outgoing_capacity: capacity, ..SyncConfig::default() }
    }

    #[test]
    fn test_drain_returns_events_in_order() {
        let (handle, driver) = connection(&config(4));
        push(&driver.inbound, TransportEvent::Opened);
        push(&driver.inbound, TransportEvent::Text("{}".into()));

        assert_eq!(handle.drain(), vec![TransportEvent::Opened, TransportEvent::Text("{}".into())]);
        assert!(handle.drain().is_empty());
    }

    #[test]
    fn test_send_drops_when_full() {
        let (handle, mut driver) = connection(&config(1));

        assert!(handle.send(&ClientMessage::StarCollected).is_ok());
        assert!(handle.send(&ClientMessage::StarCollected).is_ok());

        assert!(driver.outgoing.try_recv().is_ok());
        assert!(driver.outgoing.try_recv().is_err());
    }

    #[test]
    fn test_send_after_driver_dropped() {
        let (handle, driver) = connection(&config(4));
        drop(driver);

        assert_eq!(handle.send(&ClientMessage::StarCollected), Err(SyncError::ChannelClosed));
        assert!(handle.is_closed());
    }

    #[test]
    fn test_discard_stale_detects_close() {
        let (handle, mut driver) = connection(&config(4));
        handle.send(&ClientMessage::StarCollected).unwrap();
        assert!(!driver.discard_stale());

        handle.send(&ClientMessage::StarCollected).unwrap();
        handle.close();
        assert!(driver.discard_stale());
    }

    #[tokio::test]
    async fn test_close_survives_full_outgoing_queue() {
        let mut config = config(1);
        config.server_url = "ws://127.0.0.1:1".to_string();
        config.reconnect = ReconnectPolicy {
            max_attempts: 0,
            initial_backoff: std::time::Duration::from_secs(60),
            ..ReconnectPolicy::default()
        };

        let (handle, driver) = connection(&config);
        handle.send(&ClientMessage::StarCollected).unwrap();
        handle.close();
        assert_eq!(handle.send(&ClientMessage::StarCollected), Err(SyncError::ChannelClosed));

        tokio::time::timeout(std::time::Duration::from_secs(5), driver.run())
            .await
            .expect("driver should stop after close");

        assert!(handle.is_closed());
        let events = handle.drain();
        assert!(matches!(events.last(), Some(TransportEvent::Closed { reason }) if reason == "closed locally"));
    }

    #[tokio::test]
    async fn test_close_interrupts_backoff() {
        let mut config = config(4);
        config.server_url = "ws://127.0.0.1:1".to_string();
        config.reconnect = ReconnectPolicy {
            max_attempts: 0,
            initial_backoff: std::time::Duration::from_secs(60),
            max_backoff: std::time::Duration::from_secs(60),
            ..ReconnectPolicy::default()
        };

        let (handle, driver) = connection(&config);
        let task = tokio::spawn(driver.run());
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        handle.close();

        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("driver should leave backoff after close")
            .unwrap();
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_closed() {
        let mut config = config(4);
        config.server_url = "ws://127.0.0.1:1".to_string();
        config.reconnect = ReconnectPolicy::disabled();

        let (handle, driver) = connection(&config);
        driver.run().await;

        let events = handle.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TransportEvent::Closed { reason } if reason.starts_with("connect failed")));
    }
}
