//! Partition transfer protocol
//!
//! The wire format is a fixed sequence with no framing, no message tags and
//! no version negotiation. Both sides must agree on it byte for byte.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                          Worker
//!     |                                  |
//!     |-- n      (i32, native order) --->|
//!     |-- start  (i32, native order) --->|
//!     |-- count  (i32, native order) --->|
//!     |-- row[start]     (n × i32) ----->|
//!     |-- ...                            |
//!     |-- row[start+count-1] ----------->|
//!     |                                  |
//!     |<--------- "ack" (3 bytes) -------|
//! ```
//!
//! Integers are sent in the host's native byte order; both ends are assumed
//! to share it. Every transfer goes through `read_exact`/`write_all`, so a
//! short read or write is reported as a session failure instead of being
//! silently accepted.

use crate::error::{SessionError, Stage};
use crate::partition::RowRange;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Acknowledgment payload sent by the worker
pub const ACK: [u8; 3] = *b"ack";

/// Width of every integer on the wire
pub const INT_WIDTH: usize = std::mem::size_of::<i32>();

/// Bytes taken by `n`, `start`, `count`
pub const HEADER_LEN: usize = 3 * INT_WIDTH;

/// Partition header: matrix size and the row range that follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub matrix_size: i32,
    pub start: i32,
    pub count: i32,
}

impl Header {
    /// Header for sending `range` of a `matrix_size × matrix_size` matrix
    pub fn for_range(matrix_size: usize, range: RowRange) -> Result<Self, SessionError> {
        let invalid = || SessionError::InvalidHeader {
            n: matrix_size as i64,
            start: range.start as i64,
            count: range.count as i64,
        };

        Ok(Self {
            matrix_size: i32::try_from(matrix_size).map_err(|_| invalid())?,
            start: i32::try_from(range.start).map_err(|_| invalid())?,
            count: i32::try_from(range.count).map_err(|_| invalid())?,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..INT_WIDTH].copy_from_slice(&self.matrix_size.to_ne_bytes());
        buf[INT_WIDTH..2 * INT_WIDTH].copy_from_slice(&self.start.to_ne_bytes());
        buf[2 * INT_WIDTH..].copy_from_slice(&self.count.to_ne_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_LEN]) -> Self {
        Self {
            matrix_size: read_int(&buf[..INT_WIDTH]),
            start: read_int(&buf[INT_WIDTH..2 * INT_WIDTH]),
            count: read_int(&buf[2 * INT_WIDTH..]),
        }
    }

    /// Validate a received header
    ///
    /// Returns the matrix size and row range, or `InvalidHeader` when a value
    /// is negative, the range runs past the matrix, or the receive buffer
    /// size would overflow.
    pub fn validate(&self) -> Result<(usize, RowRange), SessionError> {
        let invalid = || SessionError::InvalidHeader {
            n: self.matrix_size as i64,
            start: self.start as i64,
            count: self.count as i64,
        };

        if self.matrix_size < 0 || self.start < 0 || self.count < 0 {
            return Err(invalid());
        }

        let size = self.matrix_size as usize;
        let range = RowRange::new(self.start as usize, self.count as usize);

        if range.count > 0 && range.end() > size {
            return Err(invalid());
        }
        range
            .count
            .checked_mul(size)
            .and_then(|values| values.checked_mul(INT_WIDTH))
            .ok_or_else(invalid)?;

        Ok((size, range))
    }
}

/// Rows received by a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub matrix_size: usize,
    pub range: RowRange,
    /// `range.count × matrix_size` values, row-major
    pub data: Vec<i32>,
}

impl Partition {
    pub fn iter_rows(&self) -> impl Iterator<Item = &[i32]> {
        self.data.chunks(self.matrix_size.max(1))
    }
}

#[inline]
fn read_int(bytes: &[u8]) -> i32 {
    let mut raw = [0u8; INT_WIDTH];
    raw.copy_from_slice(bytes);
    i32::from_ne_bytes(raw)
}

/// Encode one row into `buf`, replacing its contents
pub fn encode_row(row: &[i32], buf: &mut Vec<u8>) {
    buf.clear();
    buf.reserve(row.len() * INT_WIDTH);
    for value in row {
        buf.extend_from_slice(&value.to_ne_bytes());
    }
}

/// Decode native-order integers from `bytes` onto the end of `out`
pub fn decode_row(bytes: &[u8], out: &mut Vec<i32>) {
    out.extend(bytes.chunks_exact(INT_WIDTH).map(read_int));
}

/// Run an IO future under an optional timeout, tagging errors with `stage`
async fn timed<T, F>(stage: Stage, limit: Option<Duration>, fut: F) -> Result<T, SessionError>
where
    F: Future<Output = io::Result<T>>,
{
    let result = match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| SessionError::Timeout { stage })?,
        None => fut.await,
    };
    result.map_err(SessionError::io(stage))
}

/// Send steps 1-4: header followed by one contiguous block per row
///
/// `rows` holds `header.count` rows of `header.matrix_size` values each.
pub async fn send_partition<W>(
    stream: &mut W,
    header: Header,
    rows: &[i32],
    io_timeout: Option<Duration>,
) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    timed(Stage::SendHeader, io_timeout, stream.write_all(&header.to_bytes())).await?;
    tracing::debug!(?header, "sent partition header");

    let width = header.matrix_size.max(1) as usize;
    timed(Stage::SendRows, io_timeout, async {
        let mut buf = Vec::with_capacity(width * INT_WIDTH);
        for row in rows.chunks(width) {
            encode_row(row, &mut buf);
            stream.write_all(&buf).await?;
        }
        stream.flush().await
    })
    .await?;

    tracing::debug!(rows = header.count, "sent partition rows");
    Ok(())
}

/// Receive steps 1-4 into a freshly allocated buffer
pub async fn receive_partition<R>(
    stream: &mut R,
    io_timeout: Option<Duration>,
) -> Result<Partition, SessionError>
where
    R: AsyncRead + Unpin,
{
    let mut header_buf = [0u8; HEADER_LEN];
    timed(Stage::ReceiveHeader, io_timeout, stream.read_exact(&mut header_buf)).await?;
    let header = Header::from_bytes(&header_buf);
    let (matrix_size, range) = header.validate()?;
    tracing::debug!(?header, "received partition header");

    let mut data = Vec::with_capacity(range.count * matrix_size);
    timed(Stage::ReceiveRows, io_timeout, async {
        let mut row_buf = vec![0u8; matrix_size * INT_WIDTH];
        for _ in 0..range.count {
            stream.read_exact(&mut row_buf).await?;
            decode_row(&row_buf, &mut data);
        }
        Ok::<_, io::Error>(())
    })
    .await?;

    Ok(Partition {
        matrix_size,
        range,
        data,
    })
}

/// Send step 5
pub async fn send_ack<W>(stream: &mut W, io_timeout: Option<Duration>) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    timed(Stage::SendAck, io_timeout, async {
        stream.write_all(&ACK).await?;
        stream.flush().await
    })
    .await
}

/// Receive step 5 and check it is exactly `ack`
pub async fn receive_ack<R>(stream: &mut R, io_timeout: Option<Duration>) -> Result<[u8; 3], SessionError>
where
    R: AsyncRead + Unpin,
{
    let mut ack = [0u8; ACK.len()];
    timed(Stage::ReceiveAck, io_timeout, stream.read_exact(&mut ack)).await?;

    if ack != ACK {
        return Err(SessionError::BadAck(ack));
    }
    Ok(ack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;
    use crate::partition::partition_rows;

    #[test]
    fn test_header_layout_is_native_order() {
        let header = Header {
            matrix_size: 4,
            start: 2,
            count: 2,
        };
        let bytes = header.to_bytes();

        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..4], &4i32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &2i32.to_ne_bytes());
        assert_eq!(&bytes[8..], &2i32.to_ne_bytes());
        assert_eq!(Header::from_bytes(&bytes), header);
    }

    #[test]
    fn test_header_validation() {
        let ok = Header {
            matrix_size: 5,
            start: 2,
            count: 3,
        };
        assert_eq!(ok.validate().unwrap(), (5, RowRange::new(2, 3)));

        let negative = Header {
            matrix_size: 5,
            start: -1,
            count: 3,
        };
        assert!(matches!(negative.validate(), Err(SessionError::InvalidHeader { .. })));

        let past_end = Header {
            matrix_size: 5,
            start: 4,
            count: 3,
        };
        assert!(matches!(past_end.validate(), Err(SessionError::InvalidHeader { .. })));

        // empty range starting at the end is fine
        let empty = Header {
            matrix_size: 3,
            start: 3,
            count: 0,
        };
        assert_eq!(empty.validate().unwrap(), (3, RowRange::new(3, 0)));
    }

    #[test]
    fn test_header_for_range_overflow() {
        let huge = RowRange::new(0, i32::MAX as usize + 1);
        assert!(Header::for_range(10, huge).is_err());
    }

    #[test]
    fn test_encode_decode_row() {
        let mut buf = Vec::new();
        encode_row(&[1, -2, 300], &mut buf);
        assert_eq!(buf.len(), 3 * INT_WIDTH);

        let mut out = Vec::new();
        decode_row(&buf, &mut out);
        assert_eq!(out, vec![1, -2, 300]);
    }

    #[tokio::test]
    async fn test_partition_round_trip() {
        let matrix = Matrix::random(9, Some(3));

        for range in partition_rows(9, 4).unwrap() {
            let (mut tx, mut rx) = tokio::io::duplex(64);
            let header = Header::for_range(matrix.size(), range).unwrap();
            let rows = matrix.rows(range);

            let (sent, received) = tokio::join!(
                send_partition(&mut tx, header, rows, None),
                receive_partition(&mut rx, None),
            );
            sent.unwrap();
            let partition = received.unwrap();

            assert_eq!(partition.matrix_size, 9);
            assert_eq!(partition.range, range);
            assert_eq!(partition.data.as_slice(), rows);
        }
    }

    #[tokio::test]
    async fn test_short_transfer_is_detected() {
        let (mut tx, mut rx) = tokio::io::duplex(1024);
        let header = Header {
            matrix_size: 4,
            start: 0,
            count: 2,
        };
        tx.write_all(&header.to_bytes()).await.unwrap();
        // one full row and half of the second
        let mut buf = Vec::new();
        encode_row(&[1, 2, 3, 4, 5, 6], &mut buf);
        tx.write_all(&buf).await.unwrap();
        drop(tx);

        let err = receive_partition(&mut rx, None).await.unwrap_err();
        match err {
            SessionError::Io { stage, source } => {
                assert_eq!(stage, Stage::ReceiveRows);
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("Expected short read error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ack_exchange() {
        let (mut a, mut b) = tokio::io::duplex(16);
        send_ack(&mut a, None).await.unwrap();
        assert_eq!(receive_ack(&mut b, None).await.unwrap(), ACK);
    }

    #[tokio::test]
    async fn test_bad_ack_rejected() {
        let (mut a, mut b) = tokio::io::duplex(16);
        a.write_all(b"nak").await.unwrap();

        let err = receive_ack(&mut b, None).await.unwrap_err();
        assert!(matches!(err, SessionError::BadAck(bytes) if &bytes == b"nak"));
    }

    #[tokio::test]
    async fn test_truncated_ack_rejected() {
        let (mut a, mut b) = tokio::io::duplex(16);
        a.write_all(b"ac").await.unwrap();
        drop(a);

        let err = receive_ack(&mut b, None).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::ReceiveAck));
    }

    #[tokio::test]
    async fn test_receive_timeout() {
        let (_a, mut b) = tokio::io::duplex(16);
        let err = receive_ack(&mut b, Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Timeout { stage: Stage::ReceiveAck }));
    }
}
