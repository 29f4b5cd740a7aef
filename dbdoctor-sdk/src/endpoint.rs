//! Location of the alert socket.
//!
//! The server exposes alerts at `/ws/alerts` on the same host that serves the
//! dashboard. The socket scheme follows the page scheme, so a dashboard
//! loaded over TLS gets a TLS socket.

use url::Url;

/// Path of the alert stream on the server.
pub const ALERTS_PATH: &str = "/ws/alerts";

/// Errors produced while deriving the alert socket URL.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("unsupported scheme {0:?}, expected http, https, ws or wss")]
    UnsupportedScheme(String),

    #[error("url has no host: {0}")]
    MissingHost(String),

    #[error("invalid url: {0}")]
    Parse(#[from] url::ParseError),
}

/// Socket scheme matching a page scheme: `https` maps to `wss`, `http` to
/// `ws`. Socket schemes map to themselves.
pub fn socket_scheme(page_scheme: &str) -> Option<&'static str> {
    match page_scheme {
        "https" | "wss" => Some("wss"),
        "http" | "ws" => Some("ws"),
        _ => None,
    }
}

/// Derive `<ws|wss>://<host>[:port]/ws/alerts` from the dashboard URL.
///
/// Path, query and fragment of `page_url` are discarded.
pub fn alerts_endpoint(page_url: &Url) -> Result<Url, EndpointError> {
    let scheme = socket_scheme(page_url.scheme())
        .ok_or_else(|| EndpointError::UnsupportedScheme(page_url.scheme().to_string()))?;
    let host = page_url
        .host_str()
        .ok_or_else(|| EndpointError::MissingHost(page_url.to_string()))?;

    let authority = match page_url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok(Url::parse(&format!("{scheme}://{authority}{ALERTS_PATH}"))?)
}

/// Check that `url` can be dialled as a WebSocket.
pub fn ensure_socket_url(url: &Url) -> Result<(), EndpointError> {
    match url.scheme() {
        "ws" | "wss" => {}
        other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
    }
    if url.host_str().is_none() {
        return Err(EndpointError::MissingHost(url.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(page: &str) -> Result<String, EndpointError> {
        alerts_endpoint(&Url::parse(page).unwrap()).map(|u| u.to_string())
    }

    #[test]
    fn test_secure_page_gets_secure_socket() {
        assert_eq!(
            derive("https://dbdoctor.example.com/dashboard?tab=alerts#top").unwrap(),
            "wss://dbdoctor.example.com/ws/alerts"
        );
    }

    #[test]
    fn test_plain_page_keeps_port() {
        assert_eq!(
            derive("http://localhost:5173/").unwrap(),
            "ws://localhost:5173/ws/alerts"
        );
        assert_eq!(
            derive("http://[::1]:8080/ai-monitor").unwrap(),
            "ws://[::1]:8080/ws/alerts"
        );
    }

    #[test]
    fn test_default_port_is_not_repeated() {
        assert_eq!(
            derive("https://example.com:443/").unwrap(),
            "wss://example.com/ws/alerts"
        );
    }

    #[test]
    fn test_socket_scheme_is_preserved() {
        assert_eq!(
            derive("wss://alerts.example.com/anything").unwrap(),
            "wss://alerts.example.com/ws/alerts"
        );
    }

    #[test]
    fn test_unsupported_scheme() {
        assert!(matches!(
            derive("ftp://example.com/"),
            Err(EndpointError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn test_ensure_socket_url() {
        assert!(ensure_socket_url(&Url::parse("ws://127.0.0.1:9000/ws/alerts").unwrap()).is_ok());
        assert!(matches!(
            ensure_socket_url(&Url::parse("https://example.com/ws/alerts").unwrap()),
            Err(EndpointError::UnsupportedScheme(_))
        ));
    }
}
