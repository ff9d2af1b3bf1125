//! # Log Compartido del Servidor
//! src/log/mod.rs
//!
//! Registro de estadísticas por request, compartido por todos los workers:
//! - `rwlock`: lock lectores/escritor con preferencia de escritores
//! - `server_log`: secuencia de registros de solo-agregado protegida por ese lock
//!
//! No confundir con el logging de diagnóstico del proceso (`tracing`).

pub mod rwlock;
pub mod server_log;

pub use rwlock::{LockStats, WriterPreferringLock};
pub use server_log::{LogRecord, ServerLog};
