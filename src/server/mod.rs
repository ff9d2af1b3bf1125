//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! Dispatch loop sobre TCP:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones y las encola con su hora de llegada
//! 3. Al apagarse, detiene el pool y devuelve el reporte final

pub mod tcp;

pub use tcp::{Server, ShutdownHandle};
