//! # Configuración del Servidor
//! src/config.rs
//!
//! Argumentos CLI y variables de entorno. Se mantiene la invocación clásica
//! `server <port> <threads> <queue_size>` con argumentos posicionales.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./server 8080 4 10 --public-dir ./public
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 WORKER_THREADS=8 QUEUE_SIZE=32 ./server
//! ```

use clap::Parser;
use std::time::Duration;

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "server")]
#[command(about = "Servidor HTTP/1.0 con pool fijo de workers y log compartido")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(default_value_t = 8080, env = "HTTP_PORT")]
    pub port: u16,

    /// Cantidad de workers del pool
    #[arg(default_value_t = 4, env = "WORKER_THREADS")]
    pub threads: usize,

    /// Capacidad de la cola de conexiones pendientes
    #[arg(default_value_t = 10, env = "QUEUE_SIZE")]
    pub queue_size: usize,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio con el contenido estático y los programas CGI
    #[arg(long = "public-dir", default_value = "./public", env = "PUBLIC_DIR")]
    pub public_dir: String,

    /// Nivel de log si `RUST_LOG` no está definida
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,

    /// Tiempo máximo de espera al leer de un cliente (milisegundos)
    #[arg(long = "read-timeout-ms", default_value_t = 30_000, env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,
}

impl Config {
    /// Crea la configuración parseando argumentos CLI y entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use http_pool_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout de lectura que se aplica a cada conexión aceptada
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Valida la configuración
    ///
    /// Un pool sin workers o una cola sin capacidad no pueden atender nada.
    /// Un timeout en 0 no es válido para `set_read_timeout`.
    pub fn validate(&self) -> Result<(), String> {
        if self.threads == 0 {
            return Err("worker threads must be >= 1".to_string());
        }
        if self.queue_size == 0 {
            return Err("queue size must be >= 1".to_string());
        }
        if self.read_timeout_ms == 0 {
            return Err("read timeout must be >= 1 ms".to_string());
        }
        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════╗");
        println!("║        HTTP Pool Server Configuration        ║");
        println!("╚══════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!("   Public dir:   {}", self.public_dir);
        println!();
        println!("👷 Worker Pool:");
        println!("   Workers:      {}", self.threads);
        println!("   Queue size:   {}", self.queue_size);
        println!("   Read timeout: {} ms", self.read_timeout_ms);
        println!();
        println!("📝 Log level:    {}", self.log_level);
        println!();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            threads: 4,
            queue_size: 10,
            host: "0.0.0.0".to_string(),
            public_dir: "./public".to_string(),
            log_level: "info".to_string(),
            read_timeout_ms: 30_000,
        }
    }
}
