use std::sync::Arc;

use anyhow::Context;
use rustls::ServerConfig as TlsServerConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::http::connection::{Connection, Progress};
use crate::http::resolver::Resolver;
use crate::transport::{PlainTransport, TlsTransport, Transport, tls};

/// Upper bound on back-to-back steps for one connection per tick.
const MAX_STEPS_PER_TICK: usize = 32;

type Pool<'a> = Vec<Connection<'a, Box<dyn Transport>>>;

/// Accept connections and drive them until the future is dropped.
///
/// All connections are stepped on this task: after every accept and on
/// every poll tick.
pub async fn run(cfg: &Config, resolver: &dyn Resolver) -> anyhow::Result<()> {
    let tls_config = match &cfg.server.tls {
        Some(tls_cfg) => Some(tls::load_server_config(&tls_cfg.cert_path, &tls_cfg.key_path)?),
        None => None,
    };
    let default_headers = cfg.default_headers();

    let listener = TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.listen_addr))?;
    info!(
        addr = %cfg.server.listen_addr,
        secure = tls_config.is_some(),
        max_connections = cfg.server.max_connections,
        "listening"
    );

    let mut ticker = time::interval(cfg.server.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut pool: Pool<'_> = Vec::with_capacity(cfg.server.max_connections);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) if pool.len() >= cfg.server.max_connections => {
                    warn!(%peer, open = pool.len(), "connection limit reached, refusing");
                    drop(socket);
                }
                Ok((socket, peer)) => match open_transport(socket, tls_config.as_ref()) {
                    Ok(transport) => {
                        let mut conn = Connection::new(resolver, &cfg.connection);
                        match conn.initialize(transport, &default_headers) {
                            Ok(()) => {
                                info!(%peer, open = pool.len() + 1, "accepted connection");
                                pool.push(conn);
                            }
                            Err(e) => warn!(%peer, error = %e, "failed to initialize connection"),
                        }
                    }
                    Err(e) => warn!(%peer, error = %e, "failed to set up transport"),
                },
                Err(e) => warn!(error = %e, "accept failed"),
            },
            _ = ticker.tick() => {}
        }

        step_all(&mut pool);
    }
}

fn open_transport(
    socket: TcpStream,
    tls_config: Option<&Arc<TlsServerConfig>>,
) -> std::io::Result<Box<dyn Transport>> {
    let stream = socket.into_std()?;
    let transport: Box<dyn Transport> = match tls_config {
        Some(config) => Box::new(TlsTransport::new(Arc::clone(config), stream)?),
        None => Box::new(PlainTransport::new(stream)?),
    };
    Ok(transport)
}

fn step_all(pool: &mut Pool<'_>) {
    for conn in pool.iter_mut() {
        for _ in 0..MAX_STEPS_PER_TICK {
            if conn.step() != Progress::Busy {
                break;
            }
        }
    }

    let before = pool.len();
    pool.retain(|conn| !conn.is_closed());
    if pool.len() != before {
        debug!(retired = before - pool.len(), open = pool.len(), "retired connections");
    }
}
