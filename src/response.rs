use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str;

use mime_guess;
use serde_json;

use enums::Status;

/// A response value a handler may return: mime type, body bytes and a
/// status code. Consumed by the responder when written to the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    mime: String,
    body: Vec<u8>,
    status: Status,
}

impl Response {
    pub fn new<M, B>(mime: M, body: B, status: Status) -> Response
        where M: Into<String>, B: Into<Vec<u8>>
    {
        Response {
            mime: mime.into(),
            body: body.into(),
            status: status,
        }
    }

    /// Reads a whole file into a response, guessing the mime type from
    /// the extension and falling back to content sniffing. A file that
    /// cannot be opened or read yields `404 Not Found` with an empty
    /// body.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Response {
        let path = path.as_ref();
        let mut data = Vec::new();
        match File::open(path).and_then(|mut f| f.read_to_end(&mut data)) {
            Ok(_) => {}
            Err(e) => {
                debug!("can't read {:?}: {}", path, e);
                return Response::new("application/x-empty", Vec::new(),
                                     Status::NotFound);
            }
        }
        let mime = match mime_guess::from_path(path).first() {
            Some(m) => m.to_string(),
            None => sniff_mime(&data).to_string(),
        };
        Response::new(mime, data, Status::Ok)
    }

    pub fn data(&self) -> &[u8] {
        &self.body
    }

    pub fn mime_type(&self) -> &str {
        &self.mime
    }

    pub fn status_code(&self) -> &Status {
        &self.status
    }

    pub(crate) fn into_parts(self) -> (String, Vec<u8>, Status) {
        (self.mime, self.body, self.status)
    }
}

/// Tiny content sniffer for responses built from raw bytes.
///
/// Recognizes a few common signatures and falls back to `text/plain`
/// for valid UTF-8 without control bytes, `application/octet-stream`
/// otherwise.
fn sniff_mime(data: &[u8]) -> &'static str {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif";
    }
    if data.starts_with(b"\xff\xd8\xff") {
        return "image/jpeg";
    }
    if data.starts_with(b"%PDF-") {
        return "application/pdf";
    }
    if data.starts_with(b"\x1f\x8b") {
        return "application/gzip";
    }
    match str::from_utf8(data) {
        Ok(text) => {
            let control = text.chars()
                .any(|c| c.is_control() && c != '\r' && c != '\n'
                                        && c != '\t');
            if control { "application/octet-stream" } else { "text/plain" }
        }
        Err(_) => "application/octet-stream",
    }
}

impl From<Status> for Response {
    fn from(status: Status) -> Response {
        Response::new("application/x-empty", Vec::new(), status)
    }
}

impl<'a> From<&'a str> for Response {
    fn from(data: &'a str) -> Response {
        Response::new("text/plain", data.as_bytes().to_vec(), Status::Ok)
    }
}

impl From<String> for Response {
    fn from(data: String) -> Response {
        Response::new("text/plain", data.into_bytes(), Status::Ok)
    }
}

impl From<Vec<u8>> for Response {
    fn from(data: Vec<u8>) -> Response {
        let mime = sniff_mime(&data);
        Response::new(mime, data, Status::Ok)
    }
}

impl From<serde_json::Value> for Response {
    fn from(data: serde_json::Value) -> Response {
        let body = serde_json::to_vec(&data)
            .expect("serializing a json value never fails");
        Response::new("application/json", body, Status::Ok)
    }
}

impl Response {
    /// The error page the high-level server answers with when no rule
    /// matched (and for other canned error responses).
    pub fn error_page(status: Status) -> Response {
        let body = format!("\
            <!DOCTYPE html>\n\
            <html>\n\
              <head>\n\
                <title>{code} {reason}</title>\n\
              </head>\n\
              <body>\n\
                <h1>{code} {reason}</h1>\n\
              </body>\n\
            </html>\n",
            code=status.code(), reason=status.reason());
        Response::new("text/html", body.into_bytes(), status)
    }
}
