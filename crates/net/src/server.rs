//! TCP server for the booking query surface
//!
//! Each connection is an independent request handler task; every frame
//! carries one request and gets exactly one response frame back. The
//! server owns no booking logic; requests are dispatched to an injected
//! [`RequestHandler`].

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{Request, Response};

/// Handles one request, producing its response
///
/// Implementations must be cheap to call concurrently; each booking
/// operation is a short read-modify-write against the ledger.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, request: Request) -> Response;
}

/// Booking server handle
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Start the server on the given port (0 picks a free one)
    pub async fn start(port: u16, handler: Arc<dyn RequestHandler>) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Booking server started");

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(accept_loop(listener, handler, shutdown_rx));

        Ok(Server {
            addr: bound_addr,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    handler: Arc<dyn RequestHandler>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        let handler = handler.clone();
                        tokio::spawn(handle_connection(stream, addr, handler));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single client connection
async fn handle_connection(stream: TcpStream, addr: SocketAddr, handler: Arc<dyn RequestHandler>) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    loop {
        let request: Request = match read_frame(&mut reader).await {
            Ok(request) => request,
            Err(Error::ConnectionClosed) => {
                debug!(addr = %addr, "Connection closed");
                break;
            }
            Err(e) => {
                warn!(addr = %addr, error = %e, "Read error");
                break;
            }
        };

        let response = match request {
            Request::Ping => Response::Pong,
            request => handler.handle(request),
        };

        if let Err(e) = write_frame(&mut writer, &response).await {
            warn!(addr = %addr, error = %e, "Write failed");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;

    fn local(server: &Server) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], server.addr().port()))
    }

    struct EchoSlots;

    impl RequestHandler for EchoSlots {
        fn handle(&self, request: Request) -> Response {
            match request {
                Request::AvailableSlots { .. } => Response::AvailableSlots {
                    success: true,
                    message: None,
                    slots: vec!["09:00".to_string()],
                    total_slots: 18,
                    booked_slots: 17,
                },
                _ => Response::Cancelled {
                    success: false,
                    message: Some("unsupported".to_string()),
                },
            }
        }
    }

    #[tokio::test]
    async fn test_server_start() {
        let server = Server::start(0, Arc::new(EchoSlots)).await.unwrap();
        assert!(server.addr().port() > 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_request_response_roundtrip() {
        let server = Server::start(0, Arc::new(EchoSlots)).await.unwrap();
        let mut client = Client::connect(local(&server)).await.unwrap();

        // Ping is answered by the server itself
        client.ping().await.unwrap();

        let response = client
            .call(Request::AvailableSlots {
                date: "2030-06-01".parse().unwrap(),
            })
            .await
            .unwrap();

        match response {
            Response::AvailableSlots { success, slots, .. } => {
                assert!(success);
                assert_eq!(slots, ["09:00"]);
            }
            other => panic!("wrong response: {other:?}"),
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_multiple_sequential_requests() {
        let server = Server::start(0, Arc::new(EchoSlots)).await.unwrap();
        let mut client = Client::connect(local(&server)).await.unwrap();

        for _ in 0..3 {
            let response = client
                .call(Request::AvailableSlots {
                    date: "2030-06-01".parse().unwrap(),
                })
                .await
                .unwrap();
            assert!(response.success());
        }

        server.shutdown();
    }
}
