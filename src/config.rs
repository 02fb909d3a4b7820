use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, ErrorKind};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use pgwire::tokio::TlsAcceptor;
use pgwire::tokio::tokio_rustls::rustls::ServerConfig;

// ── Errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { var: &'static str, value: String },
    TlsPair,
    BadUser(String),
    NoUsers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { var, value } => write!(f, "invalid value for {var}: {value:?}"),
            ConfigError::TlsPair => {
                f.write_str("both ROTA_TLS_CERT and ROTA_TLS_KEY must be set, or neither")
            }
            ConfigError::BadUser(entry) => {
                write!(f, "invalid ROTA_USERS entry {entry:?}, expected user:password:role")
            }
            ConfigError::NoUsers => f.write_str("ROTA_USERS defines no users"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ── Engine settings ──────────────────────────────────────────────

/// How a paste numbers the entries it copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// Every target day numbers its copies from 1.
    PerDay,
    /// One counter for the whole paste, starting above the highest id on any
    /// stored day, so copied ids never collide with any stored id.
    #[default]
    Global,
}

impl IdPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            IdPolicy::PerDay => "per-day",
            IdPolicy::Global => "global",
        }
    }
}

impl fmt::Display for IdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-day" | "per_day" | "perday" => Ok(IdPolicy::PerDay),
            "global" => Ok(IdPolicy::Global),
            _ => Err(ConfigError::Invalid {
                var: "ROTA_PASTE_IDS",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub paste_ids: IdPolicy,
}

// ── Users & roles ────────────────────────────────────────────────

/// Advisory permission level. Each level includes the ones below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }

    pub fn allows(self, required: Role) -> bool {
        self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Users {
    by_name: HashMap<String, User>,
}

pub const DEFAULT_USERS: &str = "admin:rota:admin";

impl Default for Users {
    fn default() -> Self {
        Users {
            by_name: HashMap::from([(
                "admin".to_string(),
                User {
                    name: "admin".into(),
                    password: "rota".into(),
                    role: Role::Admin,
                },
            )]),
        }
    }
}

impl Users {
    /// Parse `user:password:role` entries separated by commas. The password may
    /// itself contain `:`.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let mut by_name = HashMap::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let bad = || ConfigError::BadUser(entry.to_string());
            let (rest, role) = entry.rsplit_once(':').ok_or_else(bad)?;
            let (name, password) = rest.split_once(':').ok_or_else(bad)?;
            let role: Role = role.parse().map_err(|()| bad())?;
            if name.is_empty() || by_name.contains_key(name) {
                return Err(bad());
            }
            by_name.insert(
                name.to_string(),
                User {
                    name: name.to_string(),
                    password: password.to_string(),
                    role,
                },
            );
        }
        if by_name.is_empty() {
            return Err(ConfigError::NoUsers);
        }
        Ok(Users { by_name })
    }

    pub fn get(&self, name: &str) -> Option<&User> {
        self.by_name.get(name)
    }

    pub fn role_of(&self, name: &str) -> Option<Role> {
        self.get(name).map(|u| u.role)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// ── TLS ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl TlsPaths {
    /// Load the PEM certificate chain and private key into an acceptor.
    pub fn acceptor(&self) -> io::Result<TlsAcceptor> {
        let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(File::open(&self.cert)?))
            .collect::<Result<_, _>>()?;
        let key = rustls_pemfile::private_key(&mut BufReader::new(File::open(&self.key)?))?
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "no private key found in key file"))?;

        let mut config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))?;
        config.alpn_protocols = vec![b"postgresql".to_vec()];
        Ok(TlsAcceptor::from(Arc::new(config)))
    }
}

// ── Server config ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub max_connections: usize,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
    pub tls: Option<TlsPaths>,
    pub users: Users,
    pub engine: EngineConfig,
    /// Load the sample roster and day into every new, empty tenant.
    pub seed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "0.0.0.0".into(),
            port: 5433,
            data_dir: PathBuf::from("./data"),
            max_connections: 256,
            compact_threshold: 1000,
            metrics_port: None,
            tls: None,
            users: Users::default(),
            engine: EngineConfig::default(),
            seed: false,
        }
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from `lookup`, falling back to defaults for unset vars.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(v) = lookup("ROTA_BIND") {
            config.bind = v;
        }
        if let Some(v) = lookup("ROTA_PORT") {
            config.port = parse_var("ROTA_PORT", v)?;
        }
        if let Some(v) = lookup("ROTA_DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ROTA_MAX_CONNECTIONS") {
            config.max_connections = parse_var("ROTA_MAX_CONNECTIONS", v)?;
            if config.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "ROTA_MAX_CONNECTIONS",
                    value: "0".into(),
                });
            }
        }
        if let Some(v) = lookup("ROTA_COMPACT_THRESHOLD") {
            config.compact_threshold = parse_var("ROTA_COMPACT_THRESHOLD", v)?;
        }
        if let Some(v) = lookup("ROTA_METRICS_PORT") {
            config.metrics_port = Some(parse_var("ROTA_METRICS_PORT", v)?);
        }
        config.tls = match (lookup("ROTA_TLS_CERT"), lookup("ROTA_TLS_KEY")) {
            (None, None) => None,
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            _ => return Err(ConfigError::TlsPair),
        };
        if let Some(v) = lookup("ROTA_USERS") {
            config.users = Users::parse(&v)?;
        }
        if let Some(v) = lookup("ROTA_PASTE_IDS") {
            config.engine.paste_ids = v.parse()?;
        }
        if let Some(v) = lookup("ROTA_SEED") {
            config.seed = parse_flag("ROTA_SEED", v)?;
        }
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
