//! Centralized error types for the ordergate gateway.

use http::{Response, StatusCode, header::ALLOW};
use http_body_util::Full;
use hyper::body::Bytes;

/// Every failure the gateway can surface, with a fixed HTTP mapping.
///
/// Authentication failures deliberately collapse to an opaque 401 at the
/// response boundary; the detail only ever reaches the logs.
#[derive(Debug)]
pub enum GatewayError {
    /// Missing, invalid, or mismatched credential, or a remote verification
    /// that did not explicitly succeed.
    Unauthorized,
    /// A required query parameter was absent.
    MissingParameter(&'static str),
    /// `partNumber` was present but not a positive integer.
    InvalidPartNumber(String),
    /// A request that requires a body arrived without one.
    MissingBody,
    /// A request body that could not be parsed.
    MalformedBody(String),
    /// The `action` query parameter named something we don't serve.
    UnknownAction { action: String, method: String },
    /// No `action` query parameter at all.
    MissingAction(String),
    /// HTTP method outside the supported set.
    MethodNotAllowed,
    /// The requested object does not exist in the store.
    ObjectNotFound(String),
    /// The store rejected creating a multipart upload.
    CreateFailure(String),
    /// The store rejected an uploaded part.
    PartUploadFailure(String),
    /// The store rejected completing a multipart upload.
    CompletionFailure(String),
    /// The store rejected aborting a multipart upload.
    AbortFailure(String),
    /// The store rejected a read or delete.
    StoreFailure(String),
    /// Token could not be signed (malformed key).
    Signing(String),
    /// Startup-time configuration problem.
    Configuration(String),
    Io(std::io::Error),
    Http(String),
    Hyper(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Unauthorized => f.write_str("Unauthorized"),
            GatewayError::MissingParameter(name) => {
                write!(f, "Missing required parameter {}", name)
            }
            GatewayError::InvalidPartNumber(value) => {
                write!(f, "Invalid partNumber: {}", value)
            }
            GatewayError::MissingBody => f.write_str("Missing request body"),
            GatewayError::MalformedBody(msg) => write!(f, "Malformed request body: {}", msg),
            GatewayError::UnknownAction { action, method } => {
                write!(f, "Unknown action {} for {}", action, method)
            }
            GatewayError::MissingAction(method) => {
                write!(f, "No action specified for {}", method)
            }
            GatewayError::MethodNotAllowed => f.write_str("Method not allowed"),
            GatewayError::ObjectNotFound(key) => write!(f, "No such object: {}", key),
            GatewayError::CreateFailure(msg)
            | GatewayError::PartUploadFailure(msg)
            | GatewayError::CompletionFailure(msg)
            | GatewayError::AbortFailure(msg)
            | GatewayError::StoreFailure(msg) => f.write_str(msg),
            GatewayError::Signing(msg) => write!(f, "Token signing failed: {}", msg),
            GatewayError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            GatewayError::Io(err) => write!(f, "IO error: {}", err),
            GatewayError::Http(msg) => write!(f, "HTTP response error: {}", msg),
            GatewayError::Hyper(msg) => write!(f, "Hyper HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err)
    }
}

impl From<http::Error> for GatewayError {
    fn from(err: http::Error) -> Self {
        GatewayError::Http(err.to_string())
    }
}

impl From<hyper::Error> for GatewayError {
    fn from(err: hyper::Error) -> Self {
        GatewayError::Hyper(err.to_string())
    }
}

impl From<std::net::AddrParseError> for GatewayError {
    fn from(err: std::net::AddrParseError) -> Self {
        GatewayError::Configuration(err.to_string())
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::MissingParameter(_)
            | GatewayError::InvalidPartNumber(_)
            | GatewayError::MissingBody
            | GatewayError::MalformedBody(_)
            | GatewayError::UnknownAction { .. }
            | GatewayError::MissingAction(_)
            | GatewayError::CreateFailure(_)
            | GatewayError::PartUploadFailure(_)
            | GatewayError::CompletionFailure(_)
            | GatewayError::AbortFailure(_)
            | GatewayError::StoreFailure(_) => StatusCode::BAD_REQUEST,
            GatewayError::ObjectNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Signing(_)
            | GatewayError::Configuration(_)
            | GatewayError::Io(_)
            | GatewayError::Http(_)
            | GatewayError::Hyper(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for Response<Full<Bytes>> {
    fn from(err: GatewayError) -> Response<Full<Bytes>> {
        let status = err.status_code();
        let mut res = Response::new(Full::new(Bytes::from(err.to_string())));
        *res.status_mut() = status;
        if status == StatusCode::METHOD_NOT_ALLOWED {
            res.headers_mut()
                .insert(ALLOW, http::HeaderValue::from_static("PUT, POST, GET, DELETE"));
        }
        res
    }
}
