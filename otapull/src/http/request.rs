//! Update request construction.
//!
//! One `UpdateRequest` is built per connection attempt from the session's
//! current target URL and the device identity. The rendered head carries the
//! two identification headers the update server keys on, so redirect hops
//! re-send them automatically.

use thiserror::Error;
use url::Url;

use crate::config::{DeviceIdentity, TlsConfig};

/// Header carrying `{device_id} {mac_address}`.
pub const HEADER_DEVICE_ID: &str = "X-Device-Id";

/// Header carrying `{arch} {version} {build_id}`.
pub const HEADER_FIRMWARE_VERSION: &str = "X-Firmware-Version";

/// Placeholder sent when an identity field is not configured.
const IDENTITY_FALLBACK: &str = "-";

/// Errors constructing an update request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid update URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported URL scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("update URL has no host")]
    MissingHost,
}

/// A prepared GET request for one connection attempt.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    url: Url,
    device: DeviceIdentity,
    tls: Option<TlsConfig>,
}

impl UpdateRequest {
    /// Parse and validate `url`, binding it to the requesting device.
    pub fn new(
        url: &str,
        device: &DeviceIdentity,
        tls: Option<TlsConfig>,
    ) -> Result<Self, RequestError> {
        let parsed = Url::parse(url).map_err(|source| RequestError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(RequestError::UnsupportedScheme {
                    scheme: other.to_string(),
                })
            }
        }
        if parsed.host_str().is_none() {
            return Err(RequestError::MissingHost);
        }

        Ok(Self {
            url: parsed,
            device: device.clone(),
            tls,
        })
    }

    /// The validated URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host to connect to.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Port to connect to (scheme default unless overridden in the URL).
    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(80)
    }

    /// True for `https` URLs.
    pub fn is_tls(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// TLS parameters, when configured.
    pub fn tls(&self) -> Option<&TlsConfig> {
        self.tls.as_ref()
    }

    /// Request target as sent on the request line (path plus query).
    pub fn request_target(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// Render the full request head as raw bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let firmware = &self.device.firmware;
        format!(
            "GET {target} HTTP/1.1\r\n\
             Host: {host}\r\n\
             Connection: close\r\n\
             {HEADER_DEVICE_ID}: {device_id} {mac}\r\n\
             {HEADER_FIRMWARE_VERSION}: {arch} {version} {build_id}\r\n\
             \r\n",
            target = self.request_target(),
            host = self.host_header(),
            device_id = or_fallback(&self.device.device_id),
            mac = or_fallback(&self.device.mac_address),
            arch = firmware.arch,
            version = firmware.version,
            build_id = firmware.build_id,
        )
        .into_bytes()
    }

    /// `Host` header value, keeping an explicit non-default port.
    fn host_header(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{port}", self.host()),
            None => self.host().to_string(),
        }
    }
}

fn or_fallback(value: &str) -> &str {
    if value.is_empty() {
        IDENTITY_FALLBACK
    } else {
        value
    }
}
