//! # Atención de Requests
//! src/handler/mod.rs
//!
//! Frontera entre el pool de workers y el protocolo. El pool no sabe nada de
//! HTTP: le entrega a un `RequestHandler` la conexión, los tiempos del request,
//! el contexto del worker y el log compartido.
//!
//! - `stats`: headers de estadísticas y registro del log
//! - `http_handler`: contenido estático, CGI y volcado del log por POST

pub mod http_handler;
pub mod stats;

pub use http_handler::HttpHandler;
pub use stats::RequestStats;

use crate::log::ServerLog;
use crate::pool::WorkerContext;
use std::io;
use std::time::{Duration, SystemTime};

/// Clasificación de un request atendido
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// GET de un archivo
    Static,

    /// GET de un programa CGI
    Dynamic,

    /// POST (volcado del log)
    Post,

    /// Cualquier respuesta de error; solo suma al total
    Error,
}

/// Resultado de atender un request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleOutcome {
    /// Bytes escritos en la conexión
    pub bytes_sent: usize,
    pub kind: RequestKind,
}

/// Atiende un request sobre una conexión de tipo `C`
///
/// Se comparte entre todos los workers. El handler debe contar el request en
/// `ctx` antes de emitir estadísticas, de modo que los headers de la respuesta
/// ya lo incluyan. No cierra la conexión: de eso se encarga el worker.
pub trait RequestHandler<C>: Send + Sync {
    fn handle(
        &self,
        conn: &mut C,
        arrival: SystemTime,
        dispatch: Duration,
        ctx: &mut WorkerContext,
        log: &ServerLog,
    ) -> io::Result<HandleOutcome>;
}
