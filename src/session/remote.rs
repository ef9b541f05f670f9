//! The live, persistent remote-control session: owns the TLS stream after
//! `connect`/`set_active`, runs a background receive loop, and serializes
//! writes from `send_command` and the pong auto-reply through one mutex.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_rustls::client::TlsStream;
use tracing::{debug, info, instrument, warn, Instrument};

use crate::error::AtvError;
use crate::identity::Identity;
use crate::state::{AtvEvent, ErrorCode, EventBus};
use crate::tls;
use crate::types::TVDevice;
use crate::wire::{extract_message, frame_message};

use super::messages::{self, DeviceInfo, RemoteFrame};

type WriteSide = Arc<Mutex<WriteHalf<TlsStream<TcpStream>>>>;

/// A connected remote-control session for one [`TVDevice`].
///
/// Dropping this value aborts the background receive loop and closes the
/// TLS connection.
pub struct RemoteSession {
    write_half: WriteSide,
    receive_task: JoinHandle<()>,
    device: TVDevice,
}

impl RemoteSession {
    /// Open a mutual-auth TLS connection to `device`'s control port, run
    /// the configure/activate handshake, and spawn the background receive
    /// loop.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::ConnectionFailed`] or [`AtvError::Tls`] if the
    /// handshake fails, or [`AtvError::Io`] if the configure/activate
    /// writes fail.
    #[instrument(skip(identity, device_info, event_bus), fields(device = %device.id))]
    pub async fn connect(
        device: TVDevice,
        identity: &Identity,
        device_info: &DeviceInfo,
        handshake_timeout: Duration,
        configure_settle_delay: Duration,
        event_bus: Arc<EventBus>,
    ) -> Result<Self, AtvError> {
        info!("connecting remote-control session");
        let (stream, _captured) = tls::connect(&device.host, device.control_port, identity, handshake_timeout)
            .await
            .inspect_err(|e| warn!(error = %e, "remote session TLS connect failed"))?;
        let (read_half, write_half) = tokio::io::split(stream);
        let write_half = Arc::new(Mutex::new(write_half));

        debug!("sending RemoteConfigure");
        {
            let mut guard = write_half.lock().await;
            guard.write_all(&frame_message(&messages::remote_configure(device_info))).await?;
            guard.flush().await?;
        }
        tokio::time::sleep(configure_settle_delay).await;
        debug!("sending RemoteSetActive");
        {
            let mut guard = write_half.lock().await;
            guard.write_all(&frame_message(&messages::remote_set_active())).await?;
            guard.flush().await?;
        }

        let receive_task = spawn_receive_loop(read_half, write_half.clone(), device.clone(), event_bus.clone());

        info!("remote-control session connected");
        event_bus.emit(AtvEvent::Connected { device: device.clone() });

        Ok(Self {
            write_half,
            receive_task,
            device,
        })
    }

    /// The device this session is connected to.
    #[must_use]
    pub fn device(&self) -> &TVDevice {
        &self.device
    }

    /// Inject a short key press.
    ///
    /// # Errors
    ///
    /// Returns [`AtvError::Io`] if the write fails (the session should be
    /// considered disconnected afterward).
    pub async fn send_key(&self, key_code: u32) -> Result<(), AtvError> {
        let frame = frame_message(&messages::remote_key_inject(key_code));
        let mut guard = self.write_half.lock().await;
        guard.write_all(&frame).await?;
        guard.flush().await?;
        Ok(())
    }

    /// Tear down the session: abort the receive loop and drop the TLS
    /// stream, closing the connection.
    pub fn disconnect(self) {
        info!(device = %self.device.id, "disconnecting remote-control session");
        self.receive_task.abort();
    }
}

fn spawn_receive_loop(
    mut read_half: ReadHalf<TlsStream<TcpStream>>,
    write_half: WriteSide,
    device: TVDevice,
    event_bus: Arc<EventBus>,
) -> JoinHandle<()> {
    let span = tracing::info_span!("remote_receive_loop", device = %device.id);
    tokio::spawn(async move {
        let mut recv_buf = Vec::new();
        let mut chunk = [0_u8; 4096];

        loop {
            let read = match read_half.read(&mut chunk).await {
                Ok(0) => {
                    debug!("connection closed by peer");
                    event_bus.emit(AtvEvent::Disconnected {
                        device: device.clone(),
                        reason: "connection closed by peer".to_string(),
                    });
                    return;
                }
                Ok(n) => n,
                Err(err) => {
                    warn!(error = %err, "remote session read failed");
                    event_bus.emit(AtvEvent::Error {
                        code: ErrorCode::Network,
                        message: err.to_string(),
                    });
                    return;
                }
            };
            recv_buf.extend_from_slice(&chunk[..read]);

            while let Some(msg) = extract_message(&mut recv_buf) {
                match messages::parse_frame(&msg) {
                    Some(RemoteFrame::Ping { val }) => {
                        debug!(val, "replying to ping with pong");
                        let reply = frame_message(&messages::pong(val));
                        let mut guard = write_half.lock().await;
                        if guard.write_all(&reply).await.is_err() {
                            warn!("failed to write pong reply");
                            return;
                        }
                        let _ = guard.flush().await;
                    }
                    Some(_) => {}
                    None => {
                        warn!("malformed remote-control frame");
                        event_bus.emit(AtvEvent::Error {
                            code: ErrorCode::Network,
                            message: "malformed remote-control frame".to_string(),
                        });
                    }
                }
            }
        }
    }.instrument(span))
}

#[cfg(test)]
mod tests {
    use super::*;

    // S6: the ping/pong liveness loop against a live TLS peer is exercised
    // by the integration test suite; `messages::parse_frame` unit tests
    // cover the framing logic this loop depends on.

    #[test]
    fn device_info_carries_package_id() {
        let info = DeviceInfo {
            model: "Pixel".to_string(),
            vendor: "Google".to_string(),
            package_id: "com.example.atvremote".to_string(),
        };
        assert_eq!(info.package_id, "com.example.atvremote");
    }
}
