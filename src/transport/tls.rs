use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use rustls::{ServerConfig, ServerConnection};

use super::{Transport, is_would_block};

/// Encrypted transport: a rustls server session over a non-blocking stream.
///
/// The handshake is driven implicitly by `read`, `write` and `pending`, so
/// the connection above sees plaintext only.
pub struct TlsTransport {
    session: ServerConnection,
    stream: TcpStream,
    /// The TCP stream reported EOF.
    eof: bool,
}

impl TlsTransport {
    pub fn new(config: Arc<ServerConfig>, stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        let session = ServerConnection::new(config).map_err(io::Error::other)?;

        Ok(Self {
            session,
            stream,
            eof: false,
        })
    }

    /// Write out whatever records rustls has queued, until the socket would block.
    fn flush_records(&mut self) -> io::Result<()> {
        while self.session.wants_write() {
            match self.session.write_tls(&mut self.stream) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if is_would_block(&e) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn pull_records(&mut self) -> io::Result<()> {
        if self.eof || !self.session.wants_read() {
            return Ok(());
        }

        match self.session.read_tls(&mut self.stream) {
            Ok(0) => self.eof = true,
            Ok(_) => {}
            Err(e) if is_would_block(&e) => return Ok(()),
            Err(e) => return Err(e),
        }

        if let Err(e) = self.session.process_new_packets() {
            // best effort: let the peer see the alert
            let _ = self.flush_records();
            return Err(io::Error::new(io::ErrorKind::InvalidData, e));
        }
        Ok(())
    }

    fn pump(&mut self) -> io::Result<()> {
        self.flush_records()?;
        self.pull_records()?;
        self.flush_records()
    }
}

impl Transport for TlsTransport {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.pump()?;

        match self.session.reader().read(dst) {
            Ok(n) => Ok(n),
            // TCP closed without close_notify
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock && self.eof => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.pump()?;

        let n = self.session.writer().write(src)?;
        self.flush_records()?;

        if n == 0 && !src.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        Ok(n)
    }

    fn pending(&mut self) -> usize {
        if self.pump().is_err() {
            return 0;
        }
        self.session
            .process_new_packets()
            .map(|state| state.plaintext_bytes_to_read())
            .unwrap_or(0)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.session.send_close_notify();
        self.flush_records()
    }

    fn is_secure(&self) -> bool {
        true
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

/// Build a server config from PEM certificate chain and private key files.
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> anyhow::Result<Arc<ServerConfig>> {
    use rustls::pki_types::pem::PemObject;
    use rustls::pki_types::{CertificateDer, PrivateKeyDer};

    let certs: Vec<CertificateDer<'static>> = CertificateDer::pem_file_iter(cert_path)
        .with_context(|| format!("failed to read {}", cert_path.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse certificates from {}", cert_path.display()))?;

    if certs.is_empty() {
        bail!("no certificates found in {}", cert_path.display());
    }

    let key = PrivateKeyDer::from_pem_file(key_path)
        .with_context(|| format!("failed to parse private key from {}", key_path.display()))?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("invalid TLS certificate/key")?;

    Ok(Arc::new(config))
}
