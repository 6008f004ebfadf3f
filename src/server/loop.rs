// Server loop module
// Accepts connections until shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;

use super::connection::{accept_connection, ConnectionSettings};
use super::signal::Shutdown;
use crate::app::App;
use crate::logger;

/// Serve `app` on `listener` until `shutdown` fires.
///
/// The listener is dropped on return; connections already accepted keep
/// running in their own tasks.
pub async fn serve(
    listener: TcpListener,
    app: Arc<App>,
    settings: ConnectionSettings,
    shutdown: Arc<Shutdown>,
) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &app, settings, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.wait() => {
                break;
            }
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));
    Ok(())
}
