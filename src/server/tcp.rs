//! # Dispatch Loop TCP
//! src/server/tcp.rs
//!
//! El thread principal solo acepta conexiones: estampa la hora de llegada y
//! encola la conexión. Si la cola está llena, `enqueue` bloquea y el accept se
//! frena con él; las conexiones nuevas esperan en el backlog del kernel.
//!
//! Todo el trabajo de HTTP ocurre en los workers del pool. Cada conexión sale
//! del loop con un timeout de lectura: un cliente mudo libera a su worker con un
//! error en vez de retenerlo para siempre.

use crate::config::Config;
use crate::error::{QueueError, StartupError};
use crate::handler::RequestHandler;
use crate::log::ServerLog;
use crate::pool::{PoolReport, QueuedRequest, RequestQueue, WorkerPool};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cuánto espera la conexión de despertador antes de rendirse
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Servidor HTTP/1.0 con pool fijo de workers
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    queue: RequestQueue<QueuedRequest<TcpStream>>,
    pool: WorkerPool<TcpStream>,
    log: Arc<ServerLog>,
    shutdown: ShutdownHandle,
    read_timeout: Duration,
}

impl Server {
    /// Arma el servidor completo: cola, log, pool y listener
    ///
    /// Los workers arrancan antes del bind; si el bind falla se detienen y se
    /// esperan antes de devolver el error.
    ///
    /// # Errores
    ///
    /// * `StartupError::InvalidConfig` - `threads`, `queue_size` o el timeout en 0
    /// * `StartupError::SpawnWorker` - no se pudo crear un worker
    /// * `StartupError::Bind` - no se pudo escuchar en `host:port`
    pub fn bind<H>(config: &Config, handler: H) -> Result<Self, StartupError>
    where
        H: RequestHandler<TcpStream> + 'static,
    {
        config.validate().map_err(StartupError::InvalidConfig)?;

        let queue = RequestQueue::new(config.queue_size);
        let log = Arc::new(ServerLog::new());
        let pool = WorkerPool::spawn(
            config.threads,
            queue.clone(),
            Arc::clone(&log),
            Arc::new(handler),
        )?;

        let address = config.address();
        let bound = TcpListener::bind(&address).and_then(|listener| {
            let local_addr = listener.local_addr()?;
            Ok((listener, local_addr))
        });

        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                pool.shutdown();
                return Err(StartupError::Bind { address, source });
            }
        };

        info!(address = %local_addr, "server bound");

        let shutdown = ShutdownHandle {
            stop: Arc::new(AtomicBool::new(false)),
            queue: queue.clone(),
            wake_addr: wake_address(local_addr),
        };

        Ok(Self {
            listener,
            local_addr,
            queue,
            pool,
            log,
            shutdown,
            read_timeout: config.read_timeout(),
        })
    }

    /// Dirección real en la que escucha (útil con el puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Log compartido de estadísticas
    pub fn log(&self) -> &Arc<ServerLog> {
        &self.log
    }

    /// Handle para detener el servidor desde otro thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Acepta conexiones hasta que se pida el apagado
    ///
    /// Al salir detiene el pool (los requests ya encolados se atienden) y
    /// devuelve el reporte final.
    pub fn run(self) -> PoolReport {
        let Self {
            listener,
            queue,
            pool,
            shutdown,
            read_timeout,
            ..
        } = self;

        for stream in listener.incoming() {
            if shutdown.is_requested() {
                break;
            }

            let conn = match stream {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = ?conn.peer_addr().ok(), "connection accepted");

            if let Err(e) = conn.set_read_timeout(Some(read_timeout)) {
                warn!(error = %e, "dropping connection without read timeout");
                continue;
            }

            match queue.enqueue(QueuedRequest::new(conn)) {
                Ok(()) => debug!(pending = queue.len(), "connection enqueued"),
                Err(QueueError::Closed(_)) => break,
                Err(e @ QueueError::Allocation(_)) => {
                    warn!(error = %e, "dropping connection");
                }
            }
        }

        drop(listener);
        info!("dispatch loop stopped");

        let report = pool.shutdown();
        match report.to_json() {
            Ok(json) => info!(report = %json, "shutdown summary"),
            Err(e) => warn!(error = %e, "failed to serialize pool report"),
        }
        report
    }
}

/// Pide el apagado cooperativo del servidor
///
/// Marca el flag, cierra la cola (destraba un `enqueue` bloqueado) y se conecta
/// al propio listener para destrabar un `accept` bloqueado.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    queue: RequestQueue<QueuedRequest<TcpStream>>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Detiene el servidor; llamadas repetidas no hacen nada
    pub fn shutdown(&self) {
        if self.stop.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("shutdown requested");
        self.queue.close();

        if let Err(e) = wake(self.wake_addr) {
            debug!(error = %e, "wake-up connection failed");
        }
    }

    pub fn is_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

fn wake(addr: SocketAddr) -> io::Result<()> {
    TcpStream::connect_timeout(&addr, WAKE_TIMEOUT).map(drop)
}

/// Dirección a la que conectarse para despertar al listener
///
/// Una dirección comodín no sirve como destino; se usa loopback.
fn wake_address(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}
