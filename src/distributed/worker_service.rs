//! Worker service
//!
//! The worker service:
//! - Optionally pins itself to a fixed core
//! - Listens on its port with address reuse enabled
//! - Accepts exactly one coordinator connection
//! - Receives its row range and acknowledges it
//! - Reports how long the receive-and-acknowledge sequence took
//!
//! A worker never accepts a second connection: one session is its whole
//! operational lifetime.

use crate::config::{CoordinatorEntry, WorkerConfig};
use crate::distributed::protocol::{receive_partition, send_ack, Partition};
use crate::util::affinity::pin_current_thread;
use crate::util::time::Timestamp;
use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};

/// Pending-connection queue length for the listening socket
const LISTEN_BACKLOG: u32 = 16;

/// What a worker received and how long it took
#[derive(Debug)]
pub struct WorkerReport {
    /// Address of the coordinator that connected
    pub peer: SocketAddr,
    pub partition: Partition,
    /// From just before the first receive to just after the acknowledgment
    pub elapsed: Duration,
}

/// Single-shot worker
pub struct WorkerService {
    config: WorkerConfig,
    coordinator: Option<CoordinatorEntry>,
}

impl WorkerService {
    /// Create a worker service
    ///
    /// `coordinator` is the roster's coordinator entry; a connection from
    /// any other IP address is logged but still served.
    pub fn new(config: WorkerConfig, coordinator: Option<CoordinatorEntry>) -> Self {
        Self { config, coordinator }
    }

    /// Pin, listen on `port`, serve one session, and return its report
    ///
    /// Runs on the calling thread. Bind, listen, accept and session errors
    /// are all fatal for the worker.
    pub fn serve(self, port: u16) -> Result<WorkerReport> {
        if let Some(core) = self.config.pin_core {
            pin_current_thread(core);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        runtime.block_on(async {
            let bound = self.bind(port).await?;
            bound.serve_one().await
        })
    }

    /// Bind the listening socket with `SO_REUSEADDR`
    ///
    /// Port 0 picks an ephemeral port; see `BoundWorker::local_addr`.
    pub async fn bind(self, port: u16) -> Result<BoundWorker> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);

        let socket = TcpSocket::new_v4().context("Failed to create socket")?;
        socket
            .set_reuseaddr(true)
            .context("Failed to enable address reuse")?;
        socket
            .bind(addr)
            .with_context(|| format!("Failed to bind port {}", port))?;
        let listener = socket
            .listen(LISTEN_BACKLOG)
            .with_context(|| format!("Failed to listen on port {}", port))?;

        tracing::info!(port, "worker listening");

        Ok(BoundWorker {
            service: self,
            listener,
        })
    }
}

/// Worker with its listening socket open
pub struct BoundWorker {
    service: WorkerService,
    listener: TcpListener,
}

impl BoundWorker {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listening address")
    }

    /// Accept one connection and run the receive session on it
    ///
    /// The listener is closed when this returns.
    pub async fn serve_one(self) -> Result<WorkerReport> {
        let (mut stream, peer) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        drop(self.listener);

        tracing::info!(%peer, "connection accepted");
        self.service.check_peer(peer);

        let io_timeout = self.service.config.io_timeout();
        let start = Timestamp::now();

        let partition = receive_partition(&mut stream, io_timeout)
            .await
            .with_context(|| format!("Session with {} failed", peer))?;
        send_ack(&mut stream, io_timeout)
            .await
            .with_context(|| format!("Session with {} failed", peer))?;

        let elapsed = start.elapsed();
        tracing::debug!(%peer, rows = partition.range.count, "acknowledged partition");

        Ok(WorkerReport {
            peer,
            partition,
            elapsed,
        })
    }
}

impl WorkerService {
    fn check_peer(&self, peer: SocketAddr) {
        let Some(ref coordinator) = self.coordinator else {
            return;
        };
        if let Ok(expected) = coordinator.address.parse::<IpAddr>() {
            if expected != peer.ip() && !expected.is_unspecified() {
                tracing::warn!(
                    %peer,
                    expected = %expected,
                    "connection is not from the roster's coordinator"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::protocol::{encode_row, receive_ack, send_partition, Header, ACK};
    use crate::error::{SessionError, Stage};
    use crate::partition::RowRange;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    fn service() -> WorkerService {
        WorkerService::new(
            WorkerConfig {
                pin_core: None,
                io_timeout_ms: Some(5_000),
                ..Default::default()
            },
            Some(CoordinatorEntry {
                address: "127.0.0.1".to_string(),
                port: 9000,
            }),
        )
    }

    #[tokio::test]
    async fn test_serve_one_session() {
        let bound = service().bind(0).await.unwrap();
        let port = bound.local_addr().unwrap().port();
        let worker = tokio::spawn(bound.serve_one());

        let rows: Vec<i32> = (1..=6).collect();
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let header = Header::for_range(3, RowRange::new(1, 2)).unwrap();
        send_partition(&mut stream, header, &rows, None).await.unwrap();
        assert_eq!(receive_ack(&mut stream, None).await.unwrap(), ACK);

        let report = worker.await.unwrap().unwrap();
        assert_eq!(report.partition.matrix_size, 3);
        assert_eq!(report.partition.range, RowRange::new(1, 2));
        assert_eq!(report.partition.data, rows);
        let received: Vec<&[i32]> = report.partition.iter_rows().collect();
        assert_eq!(received, vec![&[1, 2, 3][..], &[4, 5, 6][..]]);
        assert!(report.peer.ip().is_loopback());
    }

    #[tokio::test]
    async fn test_empty_range_is_acknowledged() {
        let bound = service().bind(0).await.unwrap();
        let port = bound.local_addr().unwrap().port();
        let worker = tokio::spawn(bound.serve_one());

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let header = Header::for_range(3, RowRange::new(0, 0)).unwrap();
        send_partition(&mut stream, header, &[], None).await.unwrap();
        receive_ack(&mut stream, None).await.unwrap();

        let report = worker.await.unwrap().unwrap();
        assert!(report.partition.data.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_transfer_fails_session() {
        let bound = service().bind(0).await.unwrap();
        let port = bound.local_addr().unwrap().port();
        let worker = tokio::spawn(bound.serve_one());

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let header = Header::for_range(4, RowRange::new(0, 2)).unwrap();
        stream.write_all(&header.to_bytes()).await.unwrap();
        let mut buf = Vec::new();
        encode_row(&[1, 2, 3, 4], &mut buf);
        stream.write_all(&buf).await.unwrap();
        drop(stream);

        let err = worker.await.unwrap().unwrap_err();
        let session = err
            .downcast_ref::<SessionError>()
            .expect("session error in chain");
        assert_eq!(session.stage(), Some(Stage::ReceiveRows));
    }

    #[tokio::test]
    async fn test_listener_closed_after_session() {
        let bound = service().bind(0).await.unwrap();
        let port = bound.local_addr().unwrap().port();
        let worker = tokio::spawn(bound.serve_one());

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let header = Header::for_range(1, RowRange::new(0, 1)).unwrap();
        send_partition(&mut stream, header, &[7], None).await.unwrap();
        receive_ack(&mut stream, None).await.unwrap();
        worker.await.unwrap().unwrap();

        assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    }

    #[test]
    fn test_bind_conflict_is_fatal() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let first = rt.block_on(service().bind(0)).unwrap();
        let port = first.local_addr().unwrap().port();

        // SO_REUSEADDR does not allow two live listeners on one port
        assert!(rt.block_on(service().bind(port)).is_err());
    }
}
