//! # HTTP Pool Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 concurrente con un número fijo de workers. Un dispatch
//! loop acepta conexiones y las deja en una cola acotada; los workers las
//! atienden y registran estadísticas en un log compartido protegido por un lock
//! lectores/escritor con preferencia de escritores.
//!
//! ## Arquitectura
//!
//! ```text
//!              accept()                 dequeue()
//!  Cliente ──► Dispatch Loop ──► RequestQueue ──► WorkerPool (N threads)
//!                                                     │
//!                                     append/snapshot ▼
//!                                                 ServerLog
//! ```
//!
//! - `config`: argumentos CLI y variables de entorno
//! - `error`: errores de cola, log y arranque
//! - `pool`: cola acotada y pool de workers
//! - `log`: lock lectores/escritor y log de solo-agregado
//! - `handler`: frontera entre el pool y el protocolo, y el handler HTTP
//! - `http`: parsing de requests y construcción de responses HTTP/1.0
//! - `server`: dispatch loop TCP y apagado cooperativo
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use http_pool_server::config::Config;
//! use http_pool_server::handler::HttpHandler;
//! use http_pool_server::server::Server;
//!
//! let config = Config::default();
//! let server = Server::bind(&config, HttpHandler::new(&config.public_dir))
//!     .expect("Error al iniciar servidor");
//! let report = server.run();
//! println!("{} requests", report.total_requests);
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod log;
pub mod pool;
pub mod server;
