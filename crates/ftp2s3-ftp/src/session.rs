//! One control connection from greeting to `QUIT`.
//!
//! A session owns its driver (and with it the working directory), at most one
//! pending passive listener, and the `REST`/`RNFR` state carried between
//! commands. Driver failures are answered with a reply and the loop carries
//! on; only control-connection I/O errors end the session early.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use ftp2s3_core::{DriverError, FileSystemDriver};

use crate::command::Command;
use crate::error::FtpResult;
use crate::format::{list_line, mdtm, quote_path};
use crate::passive::{epsv_text, pasv_text};
use crate::reply::Reply;
use crate::server::ServerContext;

/// Longest accepted control line, including CRLF.
const MAX_LINE_BYTES: u64 = 4096;

/// How long a client has to connect after `PASV`/`EPSV`.
const DATA_ACCEPT_TIMEOUT: Duration = Duration::from_secs(30);

const FEATURES: [&str; 6] = ["SIZE", "MDTM", "REST STREAM", "EPSV", "PASV", "UTF8"];

enum Flow {
    Continue,
    Quit,
}

pub(crate) struct Session {
    ctx: Arc<ServerContext>,
    driver: Box<dyn FileSystemDriver>,
    peer: SocketAddr,
    local_ip: IpAddr,
    pending_user: Option<String>,
    logged_in: bool,
    data: Option<TcpListener>,
    rest_offset: u64,
    rename_from: Option<String>,
}

impl Session {
    pub(crate) fn new(ctx: Arc<ServerContext>, peer: SocketAddr, local_ip: IpAddr) -> Self {
        let driver = ctx.factory.new_driver();
        Self {
            ctx,
            driver,
            peer,
            local_ip,
            pending_user: None,
            logged_in: false,
            data: None,
            rest_offset: 0,
            rename_from: None,
        }
    }

    /// Serve the connection until `QUIT`, EOF, or shutdown.
    pub(crate) async fn run(
        mut self,
        stream: TcpStream,
        mut shutdown: watch::Receiver<bool>,
    ) -> FtpResult<()> {
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let greeting = Reply::new(220, format!("{} ready", self.ctx.server_name));
        send(&mut writer, &greeting).await?;

        let mut line = Vec::new();
        loop {
            line.clear();
            let read = tokio::select! {
                read = read_line(&mut reader, &mut line) => read?,
                _ = shutdown.changed() => {
                    send(&mut writer, &Reply::new(421, "Server shutting down")).await?;
                    info!(peer = %self.peer, "session closed by server shutdown");
                    return Ok(());
                }
            };

            if read == 0 {
                debug!(peer = %self.peer, "client closed control connection");
                return Ok(());
            }
            if !line.ends_with(b"\n") && read as u64 >= MAX_LINE_BYTES {
                send(&mut writer, &Reply::new(500, "Command line too long")).await?;
                warn!(peer = %self.peer, "dropping client after overlong command line");
                return Ok(());
            }

            let command = Command::parse(&String::from_utf8_lossy(&line));
            debug!(peer = %self.peer, command = %command, "received command");

            if let Flow::Quit = self.handle(command, &mut writer).await? {
                return Ok(());
            }
        }
    }

    async fn handle(&mut self, command: Command, w: &mut OwnedWriteHalf) -> FtpResult<Flow> {
        if !self.logged_in && !command.allowed_before_login() {
            send(w, &Reply::new(530, "Please login with USER and PASS")).await?;
            return Ok(Flow::Continue);
        }

        let reply = match command {
            Command::User(name) => {
                self.logged_in = false;
                let reply = Reply::new(331, format!("Password required for {name}"));
                self.pending_user = Some(name);
                reply
            }
            Command::Pass(password) => self.login(&password),
            Command::Syst => Reply::new(215, "UNIX Type: L8"),
            Command::Feat => {
                let mut lines = vec!["Features:".to_owned()];
                lines.extend(FEATURES.iter().map(|f| (*f).to_owned()));
                lines.push("End".to_owned());
                Reply::multi(211, lines)
            }
            Command::Opts(option) => {
                if option.eq_ignore_ascii_case("UTF8 ON") {
                    Reply::new(200, "UTF8 mode enabled")
                } else {
                    Reply::new(501, "Option not understood")
                }
            }
            Command::Noop => Reply::new(200, "OK"),
            Command::Pwd => {
                let cwd = quote_path(&self.driver.working_directory());
                Reply::new(257, format!("{cwd} is the current directory"))
            }
            Command::Cwd(path) => self.change_directory(&path).await,
            Command::Cdup => self.change_directory("..").await,
            Command::Type(code) => match code.to_ascii_uppercase().as_str() {
                "A" | "A N" | "I" | "L 8" => Reply::new(200, format!("Type set to {code}")),
                _ => Reply::new(504, "Type not supported"),
            },
            Command::Mode(code) => single_choice(&code, "S", "Mode"),
            Command::Stru(code) => single_choice(&code, "F", "Structure"),
            Command::Pasv => self.open_passive(false).await,
            Command::Epsv => self.open_passive(true).await,
            Command::Active => Reply::new(502, "Active mode is not supported, use PASV or EPSV"),
            Command::List(path) => return self.list(path.as_deref(), true, w).await,
            Command::Nlst(path) => return self.list(path.as_deref(), false, w).await,
            Command::Retr(path) => return self.retrieve(&path, w).await,
            Command::Stor(path) => return self.store(&path, w).await,
            Command::Dele(path) => match self.driver.delete_file(&path).await {
                Ok(()) => Reply::new(250, "File deleted"),
                Err(e) => self.failure("DELE", &path, &e),
            },
            Command::Rmd(path) => match self.driver.delete_directory(&path).await {
                Ok(()) => Reply::new(250, "Directory removed"),
                Err(e) => self.failure("RMD", &path, &e),
            },
            Command::Mkd(path) => match self.driver.make_directory(&path).await {
                Ok(()) => Reply::new(257, format!("{} created", quote_path(&path))),
                Err(e) => self.failure("MKD", &path, &e),
            },
            Command::Rnfr(path) => {
                self.rename_from = Some(path);
                Reply::new(350, "Ready for RNTO")
            }
            Command::Rnto(to) => match self.rename_from.take() {
                Some(from) => match self.driver.rename(&from, &to).await {
                    Ok(()) => Reply::new(250, "Rename successful"),
                    Err(e) => self.failure("RNTO", &from, &e),
                },
                None => Reply::new(503, "RNFR required first"),
            },
            Command::Size(path) => match self.driver.size(&path).await {
                Ok(size) => Reply::new(213, size.to_string()),
                Err(e) => self.failure("SIZE", &path, &e),
            },
            Command::Mdtm(path) => match self.driver.modified_time(&path).await {
                Ok(time) => Reply::new(213, mdtm(time)),
                Err(e) => self.failure("MDTM", &path, &e),
            },
            Command::Rest(offset) => {
                self.rest_offset = offset;
                Reply::new(350, format!("Restarting at {offset}"))
            }
            Command::Quit => {
                send(w, &Reply::new(221, "Goodbye")).await?;
                info!(peer = %self.peer, "client quit");
                return Ok(Flow::Quit);
            }
            Command::MissingArgument(verb) => {
                Reply::new(501, format!("{verb} requires an argument"))
            }
            Command::InvalidArgument(verb) => {
                Reply::new(501, format!("Invalid argument to {verb}"))
            }
            Command::Unknown(verb) => Reply::new(502, format!("{verb} not implemented")),
        };

        send(w, &reply).await?;
        Ok(Flow::Continue)
    }

    fn login(&mut self, password: &str) -> Reply {
        let Some(user) = self.pending_user.take() else {
            return Reply::new(503, "Login with USER first");
        };

        if self.driver.authenticate(&user, password) {
            self.logged_in = true;
            info!(peer = %self.peer, user = %user, "login succeeded");
            Reply::new(230, "User logged in")
        } else {
            warn!(peer = %self.peer, user = %user, "login failed");
            Reply::new(530, "Login incorrect")
        }
    }

    async fn change_directory(&mut self, path: &str) -> Reply {
        match self.driver.change_directory(path).await {
            Ok(()) => Reply::new(
                250,
                format!("Directory changed to {}", self.driver.working_directory()),
            ),
            Err(e) => self.failure("CWD", path, &e),
        }
    }

    async fn open_passive(&mut self, extended: bool) -> Reply {
        // A new PASV replaces any listener the client never connected to.
        self.data = None;

        let listener = match self.ctx.passive.bind(self.local_ip).await {
            Ok(listener) => listener,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "cannot open passive listener");
                return Reply::new(425, "Cannot open passive connection");
            }
        };
        let port = match listener.local_addr() {
            Ok(addr) => addr.port(),
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "passive listener has no address");
                return Reply::new(425, "Cannot open passive connection");
            }
        };

        let reply = if extended {
            Reply::new(229, epsv_text(port))
        } else {
            let advertised = self.ctx.passive_address.unwrap_or(self.local_ip);
            match advertised {
                IpAddr::V4(ip) => Reply::new(227, pasv_text(ip, port)),
                IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
                    Some(ip) => Reply::new(227, pasv_text(ip, port)),
                    None => return Reply::new(522, "PASV requires IPv4, use EPSV"),
                },
            }
        };

        debug!(peer = %self.peer, port, "passive listener ready");
        self.data = Some(listener);
        reply
    }

    async fn list(
        &mut self,
        path: Option<&str>,
        long: bool,
        w: &mut OwnedWriteHalf,
    ) -> FtpResult<Flow> {
        let path = path.unwrap_or("");
        if self.data.is_none() {
            send(w, &no_data_connection()).await?;
            return Ok(Flow::Continue);
        }

        let entries = match self.driver.list_directory(path).await {
            Ok(entries) => entries,
            Err(e) => {
                self.data = None;
                send(w, &self.failure("LIST", path, &e)).await?;
                return Ok(Flow::Continue);
            }
        };

        let now = Utc::now();
        let mut body = String::new();
        for entry in &entries {
            if long {
                body.push_str(&list_line(entry, now));
            } else {
                body.push_str(entry.name());
            }
            body.push_str("\r\n");
        }

        send(w, &Reply::new(150, "Opening data connection for directory listing")).await?;
        let Some(mut data) = self.accept_data(w).await? else {
            return Ok(Flow::Continue);
        };

        let reply = match write_all_and_close(&mut data, body.as_bytes()).await {
            Ok(()) => Reply::new(226, format!("Transfer complete, {} entries", entries.len())),
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "listing transfer aborted");
                Reply::new(426, "Connection closed; transfer aborted")
            }
        };
        send(w, &reply).await?;
        Ok(Flow::Continue)
    }

    async fn retrieve(&mut self, path: &str, w: &mut OwnedWriteHalf) -> FtpResult<Flow> {
        let offset = std::mem::take(&mut self.rest_offset);
        if self.data.is_none() {
            send(w, &no_data_connection()).await?;
            return Ok(Flow::Continue);
        }

        let mut reader = match self.driver.read(path, offset).await {
            Ok(reader) => reader,
            Err(e) => {
                self.data = None;
                send(w, &self.failure("RETR", path, &e)).await?;
                return Ok(Flow::Continue);
            }
        };

        send(w, &Reply::new(150, format!("Opening data connection for {path}"))).await?;
        let Some(mut data) = self.accept_data(w).await? else {
            return Ok(Flow::Continue);
        };

        let copied = tokio::io::copy(&mut reader, &mut data).await;
        let closed = data.shutdown().await;
        let reply = match (copied, closed) {
            (Ok(bytes), Ok(())) => {
                info!(peer = %self.peer, path, bytes, "sent file");
                Reply::new(226, "Transfer complete")
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(peer = %self.peer, path, error = %e, "download aborted");
                Reply::new(426, "Connection closed; transfer aborted")
            }
        };
        send(w, &reply).await?;
        Ok(Flow::Continue)
    }

    async fn store(&mut self, path: &str, w: &mut OwnedWriteHalf) -> FtpResult<Flow> {
        if std::mem::take(&mut self.rest_offset) > 0 {
            debug!(peer = %self.peer, path, "REST is ignored for uploads");
        }
        if self.data.is_none() {
            send(w, &no_data_connection()).await?;
            return Ok(Flow::Continue);
        }

        send(w, &Reply::new(150, format!("Ready to receive {path}"))).await?;
        let Some(mut data) = self.accept_data(w).await? else {
            return Ok(Flow::Continue);
        };

        let reply = match self.driver.write(path, &mut data).await {
            Ok(bytes) => {
                info!(peer = %self.peer, path, bytes, "received file");
                Reply::new(226, "Transfer complete")
            }
            Err(e) => self.failure("STOR", path, &e),
        };
        // Anything still unread is dropped with the socket.
        drop(data);
        send(w, &reply).await?;
        Ok(Flow::Continue)
    }

    /// Accept the data connection for the pending passive listener.
    ///
    /// Returns `None` after replying `425` when no connection arrives.
    async fn accept_data(&mut self, w: &mut OwnedWriteHalf) -> FtpResult<Option<TcpStream>> {
        let Some(listener) = self.data.take() else {
            send(w, &no_data_connection()).await?;
            return Ok(None);
        };

        let failure = match timeout(DATA_ACCEPT_TIMEOUT, listener.accept()).await {
            Ok(Ok((stream, addr))) if addr.ip() == self.peer.ip() => {
                debug!(peer = %self.peer, data_peer = %addr, "data connection accepted");
                return Ok(Some(stream));
            }
            Ok(Ok((_, addr))) => {
                warn!(peer = %self.peer, data_peer = %addr, "data connection from foreign address");
                "Data connection from unexpected address"
            }
            Ok(Err(e)) => {
                warn!(peer = %self.peer, error = %e, "data connection failed");
                "Cannot open data connection"
            }
            Err(_) => {
                warn!(peer = %self.peer, "data connection timed out");
                "Data connection timed out"
            }
        };

        send(w, &Reply::new(425, failure)).await?;
        Ok(None)
    }

    fn failure(&self, verb: &str, path: &str, err: &DriverError) -> Reply {
        debug!(peer = %self.peer, verb, path, kind = %err.kind(), error = %err, "command failed");
        Reply::from_driver_error(err)
    }
}

fn no_data_connection() -> Reply {
    Reply::new(425, "Use PASV or EPSV first")
}

fn single_choice(code: &str, accepted: &str, what: &str) -> Reply {
    if code.eq_ignore_ascii_case(accepted) {
        Reply::new(200, format!("{what} set to {accepted}"))
    } else {
        Reply::new(504, format!("{what} not supported"))
    }
}

async fn read_line(
    reader: &mut BufReader<OwnedReadHalf>,
    buf: &mut Vec<u8>,
) -> std::io::Result<usize> {
    reader.take(MAX_LINE_BYTES).read_until(b'\n', buf).await
}

async fn send(w: &mut OwnedWriteHalf, reply: &Reply) -> FtpResult<()> {
    w.write_all(reply.to_string().as_bytes()).await?;
    Ok(())
}

async fn write_all_and_close(data: &mut TcpStream, body: &[u8]) -> std::io::Result<()> {
    data.write_all(body).await?;
    data.shutdown().await
}
