//! Transport seam: how the channel obtains its duplex byte stream.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{ChannelError, ChannelResult};

/// Any bidirectional async byte stream the channel can frame over.
pub trait DuplexStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> DuplexStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

pub type BoxedStream = Box<dyn DuplexStream>;

/// Opens a fresh stream to the editing host.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> ChannelResult<BoxedStream>;

    /// Human-readable target, used in logs and errors.
    fn target(&self) -> String;
}

/// Plain TCP connection to a host bridge (e.g. `127.0.0.1:8013`).
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> ChannelResult<BoxedStream> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| ChannelError::Connect {
                target: self.address.clone(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true).ok();
        Ok(Box::new(stream))
    }

    fn target(&self) -> String {
        format!("tcp://{}", self.address)
    }
}

/// Hands out a stream that was established elsewhere (an inherited socket,
/// an in-memory pipe). Yields it exactly once.
pub struct PreparedConnector {
    stream: Mutex<Option<BoxedStream>>,
}

impl PreparedConnector {
    pub fn new<S: DuplexStream + 'static>(stream: S) -> Self {
        Self {
            stream: Mutex::new(Some(Box::new(stream))),
        }
    }
}

#[async_trait]
impl Connector for PreparedConnector {
    async fn connect(&self) -> ChannelResult<BoxedStream> {
        let taken = self
            .stream
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        taken.ok_or_else(|| ChannelError::Connect {
            target: self.target(),
            reason: "prepared stream already consumed".to_string(),
        })
    }

    fn target(&self) -> String {
        "prepared-stream".to_string()
    }
}
