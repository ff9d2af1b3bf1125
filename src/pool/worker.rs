//! # Pool Fijo de Workers
//! src/pool/worker.rs
//!
//! N threads de larga vida. Cada uno repite:
//!
//! 1. `dequeue` (bloqueante) de la cola acotada
//! 2. calcula la latencia de despacho (llegada vs. ahora)
//! 3. invoca al handler con la conexión, los tiempos, su `WorkerContext` y el log
//! 4. cierra la conexión (drop) y descarta el request
//!
//! El handler se invoca siempre fuera del lock de la cola. Los workers terminan
//! solo cuando la cola se cierra y queda vacía.

use crate::error::StartupError;
use crate::handler::{RequestHandler, RequestKind};
use crate::log::ServerLog;
use crate::pool::queue::RequestQueue;
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Conexión pendiente más su instante de llegada
pub struct QueuedRequest<C> {
    pub conn: C,
    pub arrival: SystemTime,
}

impl<C> QueuedRequest<C> {
    /// Estampa la llegada con la hora actual
    pub fn new(conn: C) -> Self {
        Self::with_arrival(conn, SystemTime::now())
    }

    pub fn with_arrival(conn: C, arrival: SystemTime) -> Self {
        Self { conn, arrival }
    }

    /// Tiempo transcurrido desde la llegada hasta `now`
    ///
    /// Si el reloj retrocedió, se reporta cero.
    pub fn dispatch_latency(&self, now: SystemTime) -> Duration {
        now.duration_since(self.arrival).unwrap_or(Duration::ZERO)
    }
}

/// Identidad y contadores de un worker
///
/// Cada worker es dueño exclusivo de su contexto, así que no necesita lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerContext {
    id: usize,
    total: u64,
    static_requests: u64,
    dynamic_requests: u64,
    post_requests: u64,
}

impl WorkerContext {
    /// Crea el contexto del worker `id` (empieza en 1)
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Cuenta un request atendido
    ///
    /// Los errores solo suman al total.
    pub fn record(&mut self, kind: RequestKind) {
        self.total += 1;
        match kind {
            RequestKind::Static => self.static_requests += 1,
            RequestKind::Dynamic => self.dynamic_requests += 1,
            RequestKind::Post => self.post_requests += 1,
            RequestKind::Error => {}
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn static_requests(&self) -> u64 {
        self.static_requests
    }

    pub fn dynamic_requests(&self) -> u64 {
        self.dynamic_requests
    }

    pub fn post_requests(&self) -> u64 {
        self.post_requests
    }
}

/// Resumen final del pool, devuelto al apagarlo
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    pub workers: Vec<WorkerContext>,
    pub total_requests: u64,
    pub static_requests: u64,
    pub dynamic_requests: u64,
    pub post_requests: u64,
    pub error_requests: u64,
}

impl PoolReport {
    fn from_workers(mut workers: Vec<WorkerContext>) -> Self {
        workers.sort_by_key(WorkerContext::id);

        let mut report = Self::default();
        for ctx in &workers {
            report.total_requests += ctx.total;
            report.static_requests += ctx.static_requests;
            report.dynamic_requests += ctx.dynamic_requests;
            report.post_requests += ctx.post_requests;
        }
        report.error_requests = report.total_requests
            - report.static_requests
            - report.dynamic_requests
            - report.post_requests;
        report.workers = workers;

        report
    }

    /// Serializa el reporte a JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Pool de tamaño fijo que drena una `RequestQueue`
pub struct WorkerPool<C> {
    queue: RequestQueue<QueuedRequest<C>>,
    handles: Vec<JoinHandle<WorkerContext>>,
}

impl<C: Send + 'static> WorkerPool<C> {
    /// Lanza `size` workers sobre la cola y el log compartidos
    ///
    /// # Errores
    ///
    /// `StartupError::SpawnWorker` si el sistema no puede crear un thread. En ese
    /// caso la cola se cierra y los workers ya creados se detienen antes de volver.
    pub fn spawn<H>(
        size: usize,
        queue: RequestQueue<QueuedRequest<C>>,
        log: Arc<ServerLog>,
        handler: Arc<H>,
    ) -> Result<Self, StartupError>
    where
        H: RequestHandler<C> + 'static,
    {
        let mut pool = Self {
            queue: queue.clone(),
            handles: Vec::with_capacity(size),
        };

        for id in 1..=size {
            let ctx = WorkerContext::new(id);
            let queue = queue.clone();
            let log = Arc::clone(&log);
            let handler = Arc::clone(&handler);

            let spawned = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || Self::worker_loop(ctx, queue, log, handler));

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(source) => {
                    error!(worker = id, error = %source, "failed to spawn worker");
                    pool.stop();
                    return Err(StartupError::SpawnWorker { id, source });
                }
            }
        }

        info!(workers = size, queue_capacity = queue.capacity(), "worker pool started");
        Ok(pool)
    }

    /// Loop principal del worker
    fn worker_loop<H>(
        mut ctx: WorkerContext,
        queue: RequestQueue<QueuedRequest<C>>,
        log: Arc<ServerLog>,
        handler: Arc<H>,
    ) -> WorkerContext
    where
        H: RequestHandler<C>,
    {
        debug!(worker = ctx.id(), "worker started");

        while let Ok(request) = queue.dequeue() {
            let dispatch = request.dispatch_latency(SystemTime::now());
            let QueuedRequest { mut conn, arrival } = request;

            debug!(
                worker = ctx.id(),
                dispatch_us = dispatch.as_micros() as u64,
                "request dequeued"
            );

            match handler.handle(&mut conn, arrival, dispatch, &mut ctx, &log) {
                Ok(outcome) => debug!(
                    worker = ctx.id(),
                    kind = ?outcome.kind,
                    bytes = outcome.bytes_sent,
                    "request handled"
                ),
                Err(e) => warn!(worker = ctx.id(), error = %e, "request failed"),
            }

            // Cerrar la conexión
            drop(conn);
        }

        debug!(worker = ctx.id(), served = ctx.total(), "worker stopped");
        ctx
    }
}

impl<C> WorkerPool<C> {
    /// Cantidad de workers vivos
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Cierra la cola, espera a que los workers terminen y arma el reporte
    ///
    /// Los requests que quedaban encolados se atienden antes de salir.
    pub fn shutdown(mut self) -> PoolReport {
        let workers = self.stop();
        let report = PoolReport::from_workers(workers);
        info!(total_requests = report.total_requests, "worker pool stopped");
        report
    }

    fn stop(&mut self) -> Vec<WorkerContext> {
        self.queue.close();

        let mut workers = Vec::with_capacity(self.handles.len());
        for handle in self.handles.drain(..) {
            match handle.join() {
                Ok(ctx) => workers.push(ctx),
                Err(_) => error!("worker thread panicked"),
            }
        }
        workers
    }
}

impl<C> Drop for WorkerPool<C> {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.stop();
        }
    }
}
