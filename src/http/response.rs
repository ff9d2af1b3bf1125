//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Las respuestas siempre salen como HTTP/1.0 y los headers se escriben en el
//! orden en que se agregaron.
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Server: http-pool-server\r\n
//! Content-Length: 5\r\n
//! Content-Type: text/html\r\n
//! Stat-Req-Arrival:: 1700000000.123456\r\n
//! ...
//! \r\n
//! hello
//! ```
//!
//! Una respuesta CGI es distinta: el programa escribe sus propios headers
//! (`Content-Type`, línea vacía) y el body. Para esas respuestas el servidor no
//! cierra la cabecera; la salida del programa va pegada a continuación.

use super::StatusCode;

/// Nombre con el que se identifica el servidor
pub const SERVER_NAME: &str = "http-pool-server";

/// Cómo termina la respuesta después de los headers del servidor
#[derive(Debug, Clone, PartialEq, Eq)]
enum Body {
    /// Línea vacía y body con `Content-Length`
    Bytes(Vec<u8>),

    /// Salida cruda de un programa CGI (trae sus propios headers)
    Cgi(Vec<u8>),
}

/// Representa una respuesta HTTP/1.0 completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Headers en orden de inserción
    headers: Vec<(String, String)>,

    body: Body,
}

impl Response {
    /// Crea una respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Bytes(Vec::new()),
        }
    }

    /// Agrega un header al final (versión builder)
    ///
    /// # Ejemplo
    /// ```
    /// use http_pool_server::http::{Response, StatusCode};
    ///
    /// let response = Response::new(StatusCode::Ok)
    ///     .with_header("Content-Type", "text/plain");
    /// assert_eq!(response.header("content-type"), Some("text/plain"));
    /// ```
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Agrega un header al final (versión mutable)
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Establece el body y su `Content-Length`
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.add_header("Content-Length", &body.len().to_string());
        self.body = Body::Bytes(body);
        self
    }

    /// Respuesta 200 con un body y su tipo
    pub fn content(body: Vec<u8>, content_type: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Server", SERVER_NAME)
            .with_body(body)
            .with_header("Content-Type", content_type)
    }

    /// Respuesta 200 cuyo resto lo escribe un programa CGI
    pub fn cgi(output: Vec<u8>) -> Self {
        let mut response = Self::new(StatusCode::Ok).with_header("Server", SERVER_NAME);
        response.body = Body::Cgi(output);
        response
    }

    /// Respuesta de error con una página HTML corta
    ///
    /// # Ejemplo
    /// ```
    /// use http_pool_server::http::{Response, StatusCode};
    ///
    /// let response = Response::error(StatusCode::NotFound, "/missing.html");
    /// assert_eq!(response.status(), StatusCode::NotFound);
    /// assert_eq!(response.header("Content-Type"), Some("text/html"));
    /// ```
    pub fn error(status: StatusCode, cause: &str) -> Self {
        let body = format!(
            "<html><title>{server} Error</title><body bgcolor=ffffff>\r\n\
             {status}\r\n\
             <p>{cause}\r\n\
             <hr>{server}\r\n\
             </body></html>\r\n",
            server = SERVER_NAME,
            status = status,
            cause = escape_html(cause),
        );

        Self::new(status)
            .with_header("Server", SERVER_NAME)
            .with_body(body.into_bytes())
            .with_header("Content-Type", "text/html")
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    ///
    /// - Status line: `HTTP/1.0 200 OK\r\n`
    /// - Headers: `Header-Name: Value\r\n`
    /// - Línea vacía y body, o la salida CGI tal cual
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = format!("HTTP/1.0 {}\r\n", self.status).into_bytes();

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        match &self.body {
            Body::Bytes(body) => {
                result.extend_from_slice(b"\r\n");
                result.extend_from_slice(body);
            }
            Body::Cgi(output) => result.extend_from_slice(output),
        }

        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Primer header con ese nombre (sin distinguir mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Body o salida CGI
    pub fn body(&self) -> &[u8] {
        match &self.body {
            Body::Bytes(body) | Body::Cgi(body) => body,
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
