//! # Headers de Estadísticas
//! src/handler/stats.rs
//!
//! Cada respuesta lleva siete headers con doble dos puntos, en este orden:
//!
//! ```text
//! Stat-Req-Arrival:: 1700000000.123456
//! Stat-Req-Dispatch:: 0.000120
//! Stat-Thread-Id:: 2
//! Stat-Thread-Count:: 5
//! Stat-Thread-Static:: 3
//! Stat-Thread-Dynamic:: 1
//! Stat-Thread-Post:: 0
//! ```
//!
//! Los tiempos van como `<segundos>.<microsegundos en 6 dígitos>`. El mismo
//! bloque es el registro que se agrega al log después de un GET exitoso.

use crate::http::Response;
use crate::pool::WorkerContext;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Foto de los tiempos y contadores de un request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStats {
    /// Llegada, medida desde la época Unix
    arrival: Duration,
    dispatch: Duration,
    thread_id: usize,
    thread_count: u64,
    thread_static: u64,
    thread_dynamic: u64,
    thread_post: u64,
}

impl RequestStats {
    /// Toma los contadores actuales de `ctx`
    ///
    /// Llamar después de `ctx.record(..)`.
    pub fn capture(arrival: SystemTime, dispatch: Duration, ctx: &WorkerContext) -> Self {
        Self {
            arrival: arrival.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO),
            dispatch,
            thread_id: ctx.id(),
            thread_count: ctx.total(),
            thread_static: ctx.static_requests(),
            thread_dynamic: ctx.dynamic_requests(),
            thread_post: ctx.post_requests(),
        }
    }

    /// Pares nombre/valor en el orden en que se emiten
    pub fn fields(&self) -> [(&'static str, String); 7] {
        [
            ("Stat-Req-Arrival", format_timeval(self.arrival)),
            ("Stat-Req-Dispatch", format_timeval(self.dispatch)),
            ("Stat-Thread-Id", self.thread_id.to_string()),
            ("Stat-Thread-Count", self.thread_count.to_string()),
            ("Stat-Thread-Static", self.thread_static.to_string()),
            ("Stat-Thread-Dynamic", self.thread_dynamic.to_string()),
            ("Stat-Thread-Post", self.thread_post.to_string()),
        ]
    }

    /// Agrega los headers a la respuesta
    pub fn apply(&self, response: &mut Response) {
        for (name, value) in self.fields() {
            // `Name:` + `: value` produce la línea `Name:: value`
            response.add_header(&format!("{}:", name), &value);
        }
    }

    /// Bloque de headers tal como se envía, para el log
    pub fn to_record(&self) -> String {
        self.fields()
            .iter()
            .map(|(name, value)| format!("{}:: {}\r\n", name, value))
            .collect()
    }
}

/// `<segundos>.<microsegundos>` con seis dígitos
pub fn format_timeval(d: Duration) -> String {
    format!("{}.{:06}", d.as_secs(), d.subsec_micros())
}
