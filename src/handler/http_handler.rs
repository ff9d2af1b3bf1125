//! # Handler HTTP
//! src/handler/http_handler.rs
//!
//! Sirve el directorio público:
//!
//! | Request                  | Respuesta                                   | Tipo      |
//! |--------------------------|---------------------------------------------|-----------|
//! | `GET /archivo`           | contenido del archivo                       | `Static`  |
//! | `GET /...cgi...?query`   | salida del programa con `QUERY_STRING`      | `Dynamic` |
//! | `POST <cualquier uri>`   | volcado del log (`text/plain`)              | `Post`    |
//! | otro método              | 501                                         | `Error`   |
//!
//! Una URI que termina en `/` sirve `home.html`. Un archivo estático necesita
//! permiso de lectura del dueño y un CGI permiso de ejecución del dueño; si no,
//! 403. Si no existe, 404.
//!
//! Después de un GET exitoso se agrega al log el bloque de estadísticas. El
//! registro se agrega antes de escribir la respuesta: un cliente que ya leyó su
//! respuesta siempre lo ve en un POST posterior.

use super::stats::RequestStats;
use super::{HandleOutcome, RequestHandler, RequestKind};
use crate::http::{Method, Request, Response, StatusCode};
use crate::log::ServerLog;
use crate::pool::WorkerContext;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Archivo que se sirve para URIs que terminan en `/`
pub const HOME_PAGE: &str = "home.html";

const OWNER_READ: u32 = 0o400;
const OWNER_EXEC: u32 = 0o100;

/// Qué hacer con un request ya clasificado
#[derive(Debug)]
enum Plan {
    Static {
        path: PathBuf,
        content_type: &'static str,
    },
    Dynamic {
        path: PathBuf,
        query: String,
    },
    Dump,
    Reject {
        status: StatusCode,
        cause: String,
    },
}

impl Plan {
    fn kind(&self) -> RequestKind {
        match self {
            Plan::Static { .. } => RequestKind::Static,
            Plan::Dynamic { .. } => RequestKind::Dynamic,
            Plan::Dump => RequestKind::Post,
            Plan::Reject { .. } => RequestKind::Error,
        }
    }

    fn reject(status: StatusCode, cause: impl Into<String>) -> Self {
        Plan::Reject {
            status,
            cause: cause.into(),
        }
    }
}

/// Handler HTTP/1.0 sobre un directorio público
#[derive(Debug, Clone)]
pub struct HttpHandler {
    public_dir: PathBuf,
}

impl HttpHandler {
    /// Crea un handler que sirve archivos desde `public_dir`
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use http_pool_server::handler::HttpHandler;
    ///
    /// let handler = HttpHandler::new("./public");
    /// assert_eq!(handler.public_dir().to_str(), Some("./public"));
    /// ```
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        Self {
            public_dir: public_dir.into(),
        }
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    fn plan(&self, request: &Request) -> Plan {
        match request.method() {
            Method::Post => Plan::Dump,
            Method::Get => self.plan_get(request),
            Method::Other(name) => Plan::reject(
                StatusCode::NotImplemented,
                format!("{} is not supported", name),
            ),
        }
    }

    fn plan_get(&self, request: &Request) -> Plan {
        let uri_path = request.path();
        if uri_path.split('/').any(|segment| segment == "..") {
            return Plan::reject(StatusCode::Forbidden, request.uri());
        }

        let dynamic = request.uri().contains("cgi");

        let mut relative = uri_path.trim_start_matches('/').to_string();
        if !dynamic && (relative.is_empty() || relative.ends_with('/')) {
            relative.push_str(HOME_PAGE);
        }
        let path = self.public_dir.join(relative);

        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Plan::reject(StatusCode::Forbidden, request.uri());
            }
            Err(_) => return Plan::reject(StatusCode::NotFound, request.uri()),
        };

        if dynamic {
            if !meta.is_file() || !owner_can(&meta, OWNER_EXEC) {
                return Plan::reject(StatusCode::Forbidden, request.uri());
            }
            Plan::Dynamic {
                path,
                query: request.query().to_string(),
            }
        } else {
            if !meta.is_file() || !owner_can(&meta, OWNER_READ) {
                return Plan::reject(StatusCode::Forbidden, request.uri());
            }
            let content_type = content_type_for(&path);
            Plan::Static { path, content_type }
        }
    }

    fn execute(&self, plan: Plan, log: &ServerLog) -> Response {
        match plan {
            Plan::Static { path, content_type } => match fs::read(&path) {
                Ok(body) => Response::content(body, content_type),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read static file");
                    Response::error(StatusCode::InternalServerError, "could not read the file")
                }
            },
            Plan::Dynamic { path, query } => run_cgi(&path, &query),
            Plan::Dump => match log.snapshot() {
                Ok(content) => Response::content(content, "text/plain"),
                Err(e) => {
                    warn!(error = %e, "failed to snapshot the log");
                    Response::error(StatusCode::InternalServerError, "could not read the log")
                }
            },
            Plan::Reject { status, cause } => Response::error(status, &cause),
        }
    }
}

impl<C: Read + Write> RequestHandler<C> for HttpHandler {
    fn handle(
        &self,
        conn: &mut C,
        arrival: SystemTime,
        dispatch: Duration,
        ctx: &mut WorkerContext,
        log: &ServerLog,
    ) -> io::Result<HandleOutcome> {
        let raw = Request::read_head(conn)?;

        let plan = match Request::parse(&raw) {
            Ok(request) => {
                debug!(
                    worker = ctx.id(),
                    method = request.method().as_str(),
                    uri = request.uri(),
                    "request received"
                );
                if request.method() == &Method::Post {
                    request.discard_body(conn, raw.len() - request.head_len())?;
                }
                self.plan(&request)
            }
            Err(e) => Plan::reject(StatusCode::BadRequest, e.to_string()),
        };

        let kind = plan.kind();
        ctx.record(kind);
        let stats = RequestStats::capture(arrival, dispatch, ctx);

        let mut response = self.execute(plan, log);
        stats.apply(&mut response);

        let served = matches!(kind, RequestKind::Static | RequestKind::Dynamic)
            && response.status().is_success();
        if served {
            if let Err(e) = log.append(stats.to_record().as_bytes()) {
                warn!(worker = ctx.id(), error = %e, "failed to append to the log");
            }
        }

        let bytes = response.to_bytes();
        conn.write_all(&bytes)?;
        conn.flush()?;

        debug!(
            worker = ctx.id(),
            status = response.status().as_u16(),
            bytes = bytes.len(),
            "response sent"
        );

        Ok(HandleOutcome {
            bytes_sent: bytes.len(),
            kind,
        })
    }
}

/// Ejecuta un programa CGI y arma la respuesta con su salida
fn run_cgi(path: &Path, query: &str) -> Response {
    let output = Command::new(path)
        .env("QUERY_STRING", query)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output();

    match output {
        Ok(output) => {
            if !output.status.success() {
                warn!(program = %path.display(), status = %output.status, "CGI program failed");
            }
            Response::cgi(output.stdout)
        }
        Err(e) => {
            warn!(program = %path.display(), error = %e, "failed to run CGI program");
            Response::error(StatusCode::InternalServerError, "could not run the program")
        }
    }
}

/// Content-Type según la extensión
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html",
        Some("gif") => "image/gif",
        Some("jpg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "text/plain",
    }
}

#[cfg(unix)]
fn owner_can(meta: &fs::Metadata, bits: u32) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & bits != 0
}

#[cfg(not(unix))]
fn owner_can(_meta: &fs::Metadata, bits: u32) -> bool {
    bits == OWNER_READ
}
