//! TCP client for the booking server
//!
//! One request in flight at a time: write a frame, read the response
//! frame. Suits the form-driven callers this protocol serves.

use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{Request, Response};

/// Client handle for the booking protocol
pub struct Client {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connect to a booking server
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to booking server");
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self { reader, writer })
    }

    /// Send a request and wait for its response
    pub async fn call(&mut self, request: Request) -> Result<Response> {
        write_frame(&mut self.writer, &request).await?;
        let response = read_frame(&mut self.reader).await?;
        debug!("Received response");
        Ok(response)
    }

    /// Verify the connection is alive
    pub async fn ping(&mut self) -> Result<()> {
        match self.call(Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(Error::Protocol(format!(
                "expected Pong, got {other:?}"
            ))),
        }
    }
}
