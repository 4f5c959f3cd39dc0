//! Control listener and session supervision.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use ftp2s3_core::{DriverFactory, Ftp2S3Config};

use crate::error::{FtpError, FtpResult};
use crate::passive::PassivePorts;
use crate::session::Session;

/// State shared by every session of one server.
#[derive(Debug)]
pub(crate) struct ServerContext {
    pub(crate) server_name: String,
    pub(crate) passive: PassivePorts,
    /// Address announced in `227` replies; the control connection's local
    /// address when unset.
    pub(crate) passive_address: Option<IpAddr>,
    pub(crate) factory: Arc<dyn DriverFactory>,
}

/// A bound FTP server, ready to serve.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use ftp2s3_core::Ftp2S3Config;
/// use ftp2s3_ftp::FtpServer;
/// use ftp2s3_s3::{MemoryObjectStore, S3DriverFactory};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Ftp2S3Config::default();
/// let factory = S3DriverFactory::from_config(Arc::new(MemoryObjectStore::new()), &config);
/// let server = FtpServer::bind(&config, Arc::new(factory)).await?;
/// server.serve().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FtpServer {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
}

impl FtpServer {
    /// Bind the control listener described by `config`.
    pub async fn bind(config: &Ftp2S3Config, factory: Arc<dyn DriverFactory>) -> FtpResult<Self> {
        let passive_address = config
            .passive_address
            .as_deref()
            .map(|addr| {
                addr.parse::<IpAddr>()
                    .map_err(|_| FtpError::InvalidPassiveAddress(addr.to_owned()))
            })
            .transpose()?;

        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| FtpError::Bind {
                addr: addr.clone(),
                source,
            })?;

        Ok(Self {
            listener,
            ctx: Arc::new(ServerContext {
                server_name: config.server_name.clone(),
                passive: PassivePorts::new(config.passive_port_low, config.passive_port_high),
                passive_address,
                factory,
            }),
        })
    }

    /// Address the control listener is bound to.
    pub fn local_addr(&self) -> FtpResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> FtpResult<()> {
        self.serve_with_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("received shutdown signal, closing sessions");
        })
        .await
    }

    /// Serve until `shutdown` completes, then tell every session to close and
    /// wait for them.
    pub async fn serve_with_shutdown(self, shutdown: impl Future<Output = ()>) -> FtpResult<()> {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };
                    let ctx = Arc::clone(&self.ctx);
                    let stop = stop_rx.clone();
                    sessions.spawn(run_session(ctx, stream, peer, stop));
                }
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "session task panicked");
                    }
                }
                () = &mut shutdown => {
                    info!("shutting down gracefully");
                    break;
                }
            }
        }

        drop(self.listener);
        stop_tx.send_replace(true);
        while let Some(joined) = sessions.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "session task panicked");
            }
        }
        info!("all sessions closed");
        Ok(())
    }
}

async fn run_session(
    ctx: Arc<ServerContext>,
    stream: TcpStream,
    peer: SocketAddr,
    stop: watch::Receiver<bool>,
) {
    let local_ip = match stream.local_addr() {
        Ok(addr) => addr.ip(),
        Err(e) => {
            warn!(peer = %peer, error = %e, "connection lost before greeting");
            return;
        }
    };

    info!(peer = %peer, "client connected");
    match Session::new(ctx, peer, local_ip).run(stream, stop).await {
        Ok(()) => debug!(peer = %peer, "session ended"),
        Err(e) => warn!(peer = %peer, error = %e, "session ended with error"),
    }
}
