//! Configuration for the update client.
//!
//! All components receive read-only snapshots (`DeviceIdentity`,
//! `ScheduleSettings`, `TlsConfig`, `SessionOptions`) that are built once and
//! injected; nothing in the library reads ambient global state. `ConfigFile`
//! is the INI-backed store the CLI loads those snapshots from.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

/// Errors raised while loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for '{key}': '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Identity of the device requesting an update.
///
/// Rendered into the request headers of every update attempt so the server
/// can select the right image (or answer 304).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceIdentity {
    /// Logical device id; an empty id is sent as `-`.
    pub device_id: String,
    /// Hardware (MAC) address.
    pub mac_address: String,
    /// Currently running firmware.
    pub firmware: FirmwareInfo,
}

/// Version triple of the currently installed firmware.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirmwareInfo {
    /// Target architecture, e.g. `esp32`.
    pub arch: String,
    /// Human-readable version, e.g. `1.4.2`.
    pub version: String,
    /// Build identifier, e.g. a timestamp or VCS hash.
    pub build_id: String,
}

impl DeviceIdentity {
    /// Create an identity with the given id and hardware address.
    pub fn new(device_id: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            mac_address: mac_address.into(),
            firmware: FirmwareInfo::default(),
        }
    }

    /// Set the firmware version triple.
    pub fn with_firmware(mut self, firmware: FirmwareInfo) -> Self {
        self.firmware = firmware;
        self
    }
}

impl FirmwareInfo {
    /// Create a firmware version triple.
    pub fn new(
        arch: impl Into<String>,
        version: impl Into<String>,
        build_id: impl Into<String>,
    ) -> Self {
        Self {
            arch: arch.into(),
            version: version.into(),
            build_id: build_id.into(),
        }
    }
}

/// TLS parameters forwarded to the transport.
///
/// The bundled TCP transport is plaintext-only and rejects `https` URLs;
/// these values exist so a TLS-capable `Transport` implementation can be
/// dropped in without touching the session core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsConfig {
    /// Server name for SNI / certificate validation.
    pub server_name: Option<String>,
    /// CA certificate bundle path.
    pub ca_file: Option<PathBuf>,
    /// Client certificate path (mutual TLS).
    pub client_cert_file: Option<PathBuf>,
}

impl TlsConfig {
    /// True if any TLS parameter is set.
    pub fn is_configured(&self) -> bool {
        self.server_name.is_some() || self.ca_file.is_some() || self.client_cert_file.is_some()
    }
}

/// Scheduler settings: where to poll and how often.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSettings {
    /// Update URL; `None` disables scheduled attempts.
    pub url: Option<String>,
    /// Poll interval; zero disables scheduled attempts.
    pub interval: Duration,
    /// Commit timeout forwarded to the firmware writer.
    pub commit_timeout: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            url: None,
            interval: Duration::ZERO,
            commit_timeout: Duration::ZERO,
        }
    }
}

impl ScheduleSettings {
    /// True when both a URL and a non-zero interval are configured.
    pub fn is_enabled(&self) -> bool {
        self.url.is_some() && !self.interval.is_zero()
    }
}

/// Per-attempt options carried into the firmware writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOptions {
    /// Accept an image even if it reports the already-running version.
    pub ignore_same_version: bool,
    /// Time the applied image has to be committed before rollback.
    pub commit_timeout: Duration,
}

// ============================================================================
// Config file
// ============================================================================

/// Persistent configuration, stored as an INI file.
///
/// Sections: `[device]` (id, mac_address), `[firmware]` (arch, version,
/// build_id), `[update]` (url, interval, commit_timeout), `[tls]`
/// (server_name, ca_file, client_cert_file).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Device identity, from `[device]` and `[firmware]`.
    pub device: DeviceIdentity,
    /// Scheduled update settings, from `[update]`.
    pub update: ScheduleSettings,
    /// TLS parameters, from `[tls]`.
    pub tls: TlsConfig,
}

impl ConfigFile {
    /// Load from the default configuration path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let device = DeviceIdentity {
            device_id: get_string(&ini, "device", "id"),
            mac_address: get_string(&ini, "device", "mac_address"),
            firmware: FirmwareInfo {
                arch: get_string(&ini, "firmware", "arch"),
                version: get_string(&ini, "firmware", "version"),
                build_id: get_string(&ini, "firmware", "build_id"),
            },
        };

        let update = ScheduleSettings {
            url: get_optional(&ini, "update", "url"),
            interval: Duration::from_secs(get_u64(&ini, "update", "interval")?),
            commit_timeout: Duration::from_secs(get_u64(&ini, "update", "commit_timeout")?),
        };

        let tls = TlsConfig {
            server_name: get_optional(&ini, "tls", "server_name"),
            ca_file: get_optional(&ini, "tls", "ca_file").map(PathBuf::from),
            client_cert_file: get_optional(&ini, "tls", "client_cert_file").map(PathBuf::from),
        };

        Ok(Self {
            device,
            update,
            tls,
        })
    }

    /// Save to the default configuration path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("device"))
            .set("id", &self.device.device_id)
            .set("mac_address", &self.device.mac_address);
        ini.with_section(Some("firmware"))
            .set("arch", &self.device.firmware.arch)
            .set("version", &self.device.firmware.version)
            .set("build_id", &self.device.firmware.build_id);
        ini.with_section(Some("update"))
            .set("url", self.update.url.as_deref().unwrap_or(""))
            .set("interval", self.update.interval.as_secs().to_string())
            .set(
                "commit_timeout",
                self.update.commit_timeout.as_secs().to_string(),
            );
        ini.with_section(Some("tls"))
            .set("server_name", self.tls.server_name.as_deref().unwrap_or(""))
            .set("ca_file", path_str(&self.tls.ca_file))
            .set("client_cert_file", path_str(&self.tls.client_cert_file));

        ini.write_to_file(path).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Per-attempt session options derived from the `[update]` section.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            ignore_same_version: false,
            commit_timeout: self.update.commit_timeout,
        }
    }

    /// TLS parameters, if any are configured.
    pub fn tls_config(&self) -> Option<TlsConfig> {
        if self.tls.is_configured() {
            Some(self.tls.clone())
        } else {
            None
        }
    }
}

/// Default location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("otapull")
        .join("config.ini")
}

fn get_string(ini: &Ini, section: &str, key: &str) -> String {
    ini.get_from(Some(section), key).unwrap_or("").to_string()
}

fn get_optional(ini: &Ini, section: &str, key: &str) -> Option<String> {
    ini.get_from(Some(section), key)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn get_u64(ini: &Ini, section: &str, key: &str) -> Result<u64, ConfigError> {
    match ini.get_from(Some(section), key) {
        None | Some("") => Ok(0),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: format!("{section}.{key}"),
            value: value.to_string(),
        }),
    }
}

fn path_str(path: &Option<PathBuf>) -> String {
    path.as_deref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}
