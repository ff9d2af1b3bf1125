//! # Errores del Servidor
//! src/error.rs
//!
//! Taxonomía de errores del núcleo concurrente:
//!
//! - **Agotamiento de recursos** (`Allocation`): no se pudo reservar memoria al encolar o
//!   agregar al log. La operación no deja efectos parciales.
//! - **Argumento inválido** (`EmptyRecord`): se rechaza antes de tomar cualquier lock.
//! - **Fatales de arranque** (`StartupError`): el proceso debe terminar después de
//!   liberar lo que ya se construyó.
//!
//! No hay reintentos en ningún lado: cada espera bloqueante es una espera intencional
//! por una precondición, no un reintento.

use std::fmt;
use std::io;
use thiserror::Error;

/// Errores de la cola acotada de requests
#[derive(Error)]
pub enum QueueError<T> {
    /// La cola fue cerrada; en `enqueue` se devuelve el item rechazado
    #[error("request queue is closed")]
    Closed(Option<T>),

    /// No se pudo reservar espacio para el nuevo item
    #[error("could not reserve memory for a queued request")]
    Allocation(T),
}

impl<T> QueueError<T> {
    /// Recupera el item que no pudo encolarse (si lo hay)
    pub fn into_item(self) -> Option<T> {
        match self {
            QueueError::Closed(item) => item,
            QueueError::Allocation(item) => Some(item),
        }
    }

    /// Indica si el error se debe a que la cola está cerrada
    pub fn is_closed(&self) -> bool {
        matches!(self, QueueError::Closed(_))
    }
}

// Manual para no exigir `T: Debug` (las conexiones no siempre lo implementan)
impl<T> fmt::Debug for QueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Closed(item) => f
                .debug_tuple("Closed")
                .field(&item.as_ref().map(|_| ".."))
                .finish(),
            QueueError::Allocation(_) => f.debug_tuple("Allocation").field(&"..").finish(),
        }
    }
}

/// Errores del log compartido
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogError {
    /// Se intentó agregar un registro vacío
    #[error("log record must not be empty")]
    EmptyRecord,

    /// No se pudo reservar memoria para el registro o para la secuencia
    #[error("could not reserve {0} bytes for the log")]
    Allocation(usize),
}

/// Errores fatales durante el arranque del servidor
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn worker {id}: {source}")]
    SpawnWorker {
        id: usize,
        #[source]
        source: io::Error,
    },
}
