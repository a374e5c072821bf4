use http::StatusCode;
use std::fmt;

#[derive(Debug)]
pub enum GatewayError {
    /// Request path failed traversal validation.
    InvalidPath(String),
    NotFound(String),
    /// The outbound client only speaks GET and POST.
    UnsupportedMethod(String),
    UpstreamTimeout,
    UpstreamConnect(String),
    Http(reqwest::Error),
    Io(std::io::Error),
    Config(String),
    Internal(String),
}

impl GatewayError {
    /// Status code used when this error terminates a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidPath(_) => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::UnsupportedMethod(_) => StatusCode::NOT_IMPLEMENTED,
            GatewayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamConnect(_) | GatewayError::Http(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Io(_) | GatewayError::Config(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short client-facing message. Never includes internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::InvalidPath(_) => "forbidden",
            GatewayError::NotFound(_) => "not found",
            GatewayError::UnsupportedMethod(_) => "method not implemented",
            GatewayError::UpstreamTimeout => "gateway timeout",
            GatewayError::UpstreamConnect(_) | GatewayError::Http(_) => "bad gateway",
            GatewayError::Io(_) | GatewayError::Config(_) | GatewayError::Internal(_) => {
                "internal server error"
            }
        }
    }

    /// Classify a transport error from the outbound client.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::UpstreamTimeout
        } else if err.is_connect() {
            GatewayError::UpstreamConnect(err.to_string())
        } else {
            GatewayError::Http(err)
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::InvalidPath(path) => write!(f, "invalid path: {}", path),
            GatewayError::NotFound(what) => write!(f, "not found: {}", what),
            GatewayError::UnsupportedMethod(method) => write!(f, "unsupported method: {}", method),
            GatewayError::UpstreamTimeout => write!(f, "upstream timeout"),
            GatewayError::UpstreamConnect(msg) => write!(f, "upstream connect error: {}", msg),
            GatewayError::Http(e) => write!(f, "http error: {}", e),
            GatewayError::Io(e) => write!(f, "io error: {}", e),
            GatewayError::Config(msg) => write!(f, "config error: {}", msg),
            GatewayError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Http(e) => Some(e),
            GatewayError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
