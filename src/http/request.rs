//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Solo interesa la cabecera del request: la request line y los headers.
//!
//! ```text
//! GET /output.cgi?1 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! ```
//!
//! El path y la query se separan por el primer `?`. La query no se decodifica:
//! se le pasa tal cual al programa CGI.

use std::collections::HashMap;
use std::io::{self, Read};
use thiserror::Error;

/// Tamaño máximo de la cabecera que se lee del socket
pub const MAX_HEAD_SIZE: usize = 8192;

/// Tope de body que se descarta antes de responder
const MAX_DISCARDED_BODY: usize = 64 * 1024;

/// Métodos HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - contenido estático o dinámico
    Get,

    /// POST - volcado del log
    Post,

    /// Cualquier otro método (se responde 501)
    Other(String),
}

impl Method {
    fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(name) => name,
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty request")]
    EmptyRequest,

    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

/// Cabecera de un request HTTP parseada
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// URI completa tal como llegó (ej: "/output.cgi?1")
    uri: String,

    /// Parte de la URI antes del `?`
    path: String,

    /// Parte de la URI después del `?`, sin decodificar
    query: String,

    version: String,

    headers: HashMap<String, String>,

    /// Bytes que ocupó la cabecera (incluye la línea vacía si llegó)
    head_len: usize,
}

impl Request {
    /// Lee la cabecera del request desde la conexión
    ///
    /// Lee hasta encontrar la línea vacía, hasta `MAX_HEAD_SIZE` bytes o hasta EOF.
    /// El buffer puede traer bytes del body que llegaron en la misma lectura.
    pub fn read_head<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
        let mut head = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];

        while head.len() < MAX_HEAD_SIZE && find_head_end(&head).is_none() {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
        }

        Ok(head)
    }

    /// Parsea la cabecera de un request
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use http_pool_server::http::{Method, Request};
    ///
    /// let raw = b"GET /output.cgi?1 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.method(), &Method::Get);
    /// assert_eq!(request.path(), "/output.cgi");
    /// assert_eq!(request.query(), "1");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let head_len = find_head_end(buffer).unwrap_or(buffer.len());
        let buffer = &buffer[..head_len];
        let text = std::str::from_utf8(buffer).map_err(|_| ParseError::InvalidRequestLine)?;

        if text.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = text.split("\r\n");
        let request_line = lines.next().ok_or(ParseError::EmptyRequest)?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::parse(parts[0]);
        let uri = parts[1].to_string();

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (uri.clone(), String::new()),
        };

        let mut headers = HashMap::new();
        for line in lines {
            if line.trim().is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(Request {
            method,
            uri,
            path,
            query,
            version,
            headers,
            head_len,
        })
    }

    /// Descarta el body anunciado por `Content-Length` (con tope)
    ///
    /// Cerrar el socket con datos sin leer puede resetear la conexión antes de
    /// que el cliente lea la respuesta.
    pub fn discard_body<R: Read>(&self, reader: &mut R, already_read: usize) -> io::Result<()> {
        let announced = self.content_length().unwrap_or(0).min(MAX_DISCARDED_BODY);
        let pending = announced.saturating_sub(already_read) as u64;
        if pending > 0 {
            io::copy(&mut reader.take(pending), &mut io::sink())?;
        }
        Ok(())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Obtiene un header (el nombre no distingue mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    pub fn head_len(&self) -> usize {
        self.head_len
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length")?.parse().ok()
    }
}

/// Posición donde termina la cabecera (incluye el `\r\n\r\n`)
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_simple_get() {
        let raw = b"GET / HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.path(), "/");
        assert_eq!(request.query(), "");
        assert_eq!(request.version(), "HTTP/1.0");
    }

    #[test]
    fn test_parse_query_kept_raw() {
        let raw = b"GET /output.cgi?msg=Hello%20there&x=1 HTTP/1.1\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.uri(), "/output.cgi?msg=Hello%20there&x=1");
        assert_eq!(request.path(), "/output.cgi");
        assert_eq!(request.query(), "msg=Hello%20there&x=1");
    }

    #[test]
    fn test_parse_post_and_other_methods() {
        let post = Request::parse(b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert_eq!(post.method(), &Method::Post);
        assert_eq!(post.content_length(), Some(0));

        let put = Request::parse(b"PUT /test.txt HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(put.method(), &Method::Other("PUT".to_string()));
        assert_eq!(put.method().as_str(), "PUT");
    }

    #[test]
    fn test_parse_with_headers() {
        let raw = b"GET / HTTP/1.0\r\nHost: localhost:8080\r\nUser-Agent: test\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.header("Host"), Some("localhost:8080"));
        assert_eq!(request.header("user-agent"), Some("test"));
        assert_eq!(request.header("Missing"), None);
    }

    #[test]
    fn test_invalid_version() {
        let result = Request::parse(b"GET / HTTP/2.0\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidHttpVersion(_))));
    }

    #[test]
    fn test_empty_request() {
        assert_eq!(Request::parse(b"").unwrap_err(), ParseError::EmptyRequest);
        assert_eq!(Request::parse(b"\r\n\r\n").unwrap_err(), ParseError::EmptyRequest);
    }

    #[test]
    fn test_invalid_request_line() {
        let result = Request::parse(b"GET\r\n\r\n");
        assert_eq!(result.unwrap_err(), ParseError::InvalidRequestLine);

        let result = Request::parse(b"\x00\x01\x02\x03garbage");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_header() {
        let result = Request::parse(b"GET / HTTP/1.0\r\nNoColonHere\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidHeader(_))));
    }

    #[test]
    fn test_read_head_stops_at_blank_line() {
        let mut input = Cursor::new(b"GET / HTTP/1.0\r\nHost: x\r\n\r\n".to_vec());
        let head = Request::read_head(&mut input).unwrap();
        assert_eq!(head, b"GET / HTTP/1.0\r\nHost: x\r\n\r\n");
    }

    #[test]
    fn test_body_bytes_after_head_are_ignored() {
        let raw = b"POST / HTTP/1.0\r\nContent-Length: 6\r\n\r\n\xff\xfebody";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.head_len(), raw.len() - 6);

        let mut rest = Cursor::new(b"".to_vec());
        request.discard_body(&mut rest, 6).unwrap();
    }

    #[test]
    fn test_discard_body_consumes_pending_bytes() {
        let request = Request::parse(b"POST / HTTP/1.0\r\nContent-Length: 10\r\n\r\n").unwrap();
        let mut rest = Cursor::new(b"0123456789tail".to_vec());

        request.discard_body(&mut rest, 4).unwrap();
        assert_eq!(rest.position(), 6);
    }

    #[test]
    fn test_read_head_until_eof() {
        let mut input = Cursor::new(b"GET / HTTP/1.0".to_vec());
        let head = Request::read_head(&mut input).unwrap();
        assert_eq!(head, b"GET / HTTP/1.0");
    }

    #[test]
    fn test_find_head_end() {
        assert_eq!(find_head_end(b"ab\r\n\r\ncd"), Some(6));
        assert_eq!(find_head_end(b"ab\r\n"), None);
    }
}
