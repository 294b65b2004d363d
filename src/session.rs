//! Long-lived TLS peer processes.
//!
//! A [`TlsSession`] owns a running toolkit peer and the two byte streams wired
//! to it: writes go to the peer's stdin, reads come from its stdout. Starting a
//! session returns as soon as the process is running; nothing waits for the
//! handshake. Reads block until the peer produces data or closes, so sessions
//! that must progress concurrently need their streams driven from separate
//! threads (see [`TlsSession::take_stdin`] and [`TlsSession::take_stdout`]).

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, ExitStatus};

use bon::Builder;
use tracing::{debug, info, warn};

use crate::error::{ExternalToolError, Result};
use crate::toolkit::CryptoToolInvoker;

/// Which side of the handshake the peer plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Server,
    Client,
}

/// Material for a server peer that requires and verifies a client certificate.
#[derive(Clone, Debug, Builder)]
pub struct ServerParams {
    #[builder(into)]
    pub cert: PathBuf,
    #[builder(into)]
    pub key: PathBuf,
    /// CA certificate client certificates must chain to.
    #[builder(into)]
    pub ca: PathBuf,
}

/// Material for a client peer connecting to `address` (`host:port`).
#[derive(Clone, Debug, Builder)]
pub struct ClientParams {
    #[builder(into)]
    pub address: String,
    #[builder(into)]
    pub cert: PathBuf,
    #[builder(into)]
    pub key: PathBuf,
    /// CA certificate the server must chain to.
    #[builder(into)]
    pub ca_cert: PathBuf,
}

/// A running TLS peer and its duplex byte channel.
///
/// The caller owns the process. [`TlsSession::close`] terminates it; dropping
/// an unclosed session does the same on a best-effort basis.
#[derive(Debug)]
pub struct TlsSession {
    role: SessionRole,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    reaped: bool,
}

impl TlsSession {
    /// Starts a server peer listening on the toolkit's configured port.
    pub fn start_server<T>(tool: &T, params: &ServerParams) -> Result<Self>
    where
        T: CryptoToolInvoker + ?Sized,
    {
        tool.start_tls_server(params)
    }

    /// Starts a client peer connecting to `params.address`.
    pub fn start_client<T>(tool: &T, params: &ClientParams) -> Result<Self>
    where
        T: CryptoToolInvoker + ?Sized,
    {
        tool.start_tls_client(params)
    }

    /// Wraps an already spawned peer.
    pub fn from_parts(
        role: SessionRole,
        child: Child,
        stdin: ChildStdin,
        stdout: ChildStdout,
    ) -> Self {
        info!(role = ?role, pid = child.id(), "TLS session started");
        Self {
            role,
            child,
            stdin: Some(stdin),
            stdout: Some(stdout),
            reaped: false,
        }
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    /// OS process id of the peer.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// The peer process itself.
    pub fn process(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Moves the write end out, e.g. to drive it from another thread.
    ///
    /// Returns `None` once taken. Dropping the returned stream closes the
    /// peer's stdin.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Moves the read end out. Returns `None` once taken.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Exit status if the peer has already exited.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    /// Closes stdin, kills the peer and waits for it.
    pub fn close(mut self) -> Result<ExitStatus> {
        self.stdin.take();
        self.terminate()
            .map_err(|e| ExternalToolError::setup("Failed to terminate TLS session", e))
    }

    fn terminate(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            self.reaped = true;
            return Ok(status);
        }
        match self.child.kill() {
            Ok(()) => {}
            // Exited between the two calls.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        let status = self.child.wait()?;
        self.reaped = true;
        debug!(role = ?self.role, status = %status, "TLS session terminated");
        Ok(status)
    }
}

impl Write for TlsSession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.stdin {
            Some(stdin) => stdin.write(buf),
            None => Err(io::Error::from(io::ErrorKind::BrokenPipe)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.stdin {
            Some(stdin) => stdin.flush(),
            None => Ok(()),
        }
    }
}

impl Read for TlsSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stdout {
            Some(stdout) => stdout.read(buf),
            None => Ok(0),
        }
    }
}

impl Drop for TlsSession {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        self.stdin.take();
        if let Err(e) = self.terminate() {
            warn!(role = ?self.role, error = %e, "failed to terminate TLS session on drop");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::runner::ProcessRunner;

    fn cat_session() -> TlsSession {
        let (child, stdin, stdout) = ProcessRunner::new("cat")
            .spawn_piped("cat", std::iter::empty::<&str>())
            .unwrap();
        TlsSession::from_parts(SessionRole::Client, child, stdin, stdout)
    }

    #[test]
    fn session_is_a_duplex_byte_channel() {
        let mut session = cat_session();
        session.write_all(b"GET / HTTP/1.0\r\n").unwrap();
        session.flush().unwrap();
        let mut buf = [0u8; 16];
        session.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"GET / HTTP/1.0\r\n");
        session.close().unwrap();
    }

    #[test]
    fn taken_streams_leave_the_session_half_closed() {
        let mut session = cat_session();
        let stdin = session.take_stdin();
        assert!(stdin.is_some());
        assert!(session.take_stdin().is_none());
        assert_eq!(
            session.write(b"x").unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
        drop(stdin);

        let mut out = Vec::new();
        session.read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn close_after_exit_reports_status() {
        let mut session = cat_session();
        drop(session.take_stdin());
        let status = session.process().wait().unwrap();
        assert!(status.success());
        // A reaped child is reported, not killed again.
        let closed = session.close().unwrap();
        assert!(closed.success());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn drop_kills_a_running_peer() {
        let session = cat_session();
        let pid = session.id();
        drop(session);
        assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists());
    }
}
