//! Endpoint publication for launcher discovery.
//!
//! The console is started by an editor plugin that needs to know where to
//! connect. Each listener binds a random loopback port and publishes it to a
//! file at a path the launcher supplied; the file is removed again when the
//! console shuts down so a stale file never points at a dead process.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::error::Result;

/// How the endpoint is serialized into the published file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointFormat {
    /// Full `host:port` address (command session endpoint).
    HostPort,
    /// Bare decimal port (test-runner endpoint; the runner always dials
    /// loopback).
    PortOnly,
}

impl EndpointFormat {
    fn serialize(self, addr: SocketAddr) -> String {
        match self {
            EndpointFormat::HostPort => addr.to_string(),
            EndpointFormat::PortOnly => addr.port().to_string(),
        }
    }
}

/// Removes the published file when dropped.
#[derive(Debug)]
pub struct EndpointGuard {
    path: PathBuf,
}

impl Drop for EndpointGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove endpoint file");
        }
    }
}

/// Bind a loopback listener on a random port and publish its endpoint.
///
/// The listener is returned alongside a guard that removes the file on drop.
pub async fn publish_endpoint(
    info_file: &Path,
    format: EndpointFormat,
) -> Result<(TcpListener, EndpointGuard)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    if let Err(e) = std::fs::write(info_file, format.serialize(addr)) {
        // Don't leave a listener up that nobody can discover
        drop(listener);
        return Err(e.into());
    }

    debug!(path = %info_file.display(), %addr, "endpoint published");
    Ok((
        listener,
        EndpointGuard {
            path: info_file.to_path_buf(),
        },
    ))
}

/// Write this process's pid to the given file.
pub fn write_pid_file(path: &Path) -> Result<()> {
    std::fs::write(path, std::process::id().to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_host_port_writes_dialable_address() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("client.addr");

        let (listener, guard) = publish_endpoint(&file, EndpointFormat::HostPort)
            .await
            .unwrap();

        let published = std::fs::read_to_string(&file).unwrap();
        let addr: SocketAddr = published.parse().unwrap();
        assert_eq!(addr, listener.local_addr().unwrap());
        assert!(addr.ip().is_loopback());

        drop(guard);
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn publish_port_only_writes_bare_port() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("program.port");

        let (listener, _guard) = publish_endpoint(&file, EndpointFormat::PortOnly)
            .await
            .unwrap();

        let published = std::fs::read_to_string(&file).unwrap();
        let port: u16 = published.parse().unwrap();
        assert_eq!(port, listener.local_addr().unwrap().port());
    }

    #[tokio::test]
    async fn publish_to_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("missing-subdir").join("client.addr");
        assert!(publish_endpoint(&file, EndpointFormat::HostPort)
            .await
            .is_err());
    }

    #[test]
    fn pid_file_contains_our_pid() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("console.pid");
        write_pid_file(&file).unwrap();
        let pid: u32 = std::fs::read_to_string(&file).unwrap().parse().unwrap();
        assert_eq!(pid, std::process::id());
    }
}
