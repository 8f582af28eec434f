use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, SalesWebError};

pub const DEFAULT_CONFIG_PATH: &str = "appsettings.toml";
pub const ENVIRONMENT_VAR: &str = "SALESWEB_ENVIRONMENT";
pub const FALLBACK_ENVIRONMENT_VAR: &str = "ASPNETCORE_ENVIRONMENT";
pub const CONNECTION_STRING_VAR: &str = "SALESWEB_CONNECTION_STRING";
pub const PORT_VAR: &str = "PORT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }

    pub fn name(self) -> &'static str {
        match self {
            Environment::Development => "Development",
            Environment::Staging => "Staging",
            Environment::Production => "Production",
        }
    }

    /// Reads the environment name from `SALESWEB_ENVIRONMENT`, then
    /// `ASPNETCORE_ENVIRONMENT`. Unset means Production.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ENVIRONMENT_VAR).or_else(|_| std::env::var(FALLBACK_ENVIRONMENT_VAR)) {
            Ok(name) => name.parse(),
            Err(_) => Ok(Environment::default()),
        }
    }
}

impl FromStr for Environment {
    type Err = SalesWebError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(SalesWebError::Config(format!("Unknown environment '{other}'"))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub connection_strings: ConnectionStrings,
    pub localization: LocalizationSettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
    #[serde(skip)]
    pub environment: Environment,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub https_port: Option<u16>,
    pub web_root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionStrings {
    #[serde(rename = "SalesWebContext")]
    pub sales_web_context: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalizationSettings {
    pub default_culture: String,
    pub supported_cultures: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub filter: String,
    pub json_file: bool,
}

/// Prometheus exporter listener, started by `Startup::run`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            https_port: None,
            web_root: PathBuf::from("wwwroot"),
        }
    }
}

impl Default for ConnectionStrings {
    fn default() -> Self {
        Self {
            sales_web_context: "saleswebmvc.db".to_string(),
        }
    }
}

impl Default for LocalizationSettings {
    fn default() -> Self {
        Self {
            default_culture: "en-US".to_string(),
            supported_cultures: vec!["en-US".to_string()],
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            filter: "sales_web=info,tower_http=info".to_string(),
            json_file: true,
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 9898,
        }
    }
}

impl Settings {
    /// Loads settings for `environment`.
    ///
    /// The base file is read first (a missing default file means defaults, a
    /// missing explicit file is an error), then `appsettings.{Environment}.toml`
    /// next to it is merged on top, then environment variables win.
    pub fn load(path: Option<&Path>, environment: Environment) -> Result<Self> {
        let base_path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut merged = match read_table(base_path)? {
            Some(table) => table,
            None if path.is_some() => {
                return Err(SalesWebError::Config(format!(
                    "Failed to read config file '{}': file not found",
                    base_path.display()
                )))
            }
            None => toml::Table::new(),
        };

        if let Some(overlay) = read_table(&environment_file(base_path, environment))? {
            merge_tables(&mut merged, overlay);
        }

        let mut settings: Settings = toml::Value::Table(merged).try_into()?;
        settings.environment = environment;
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a TOML string without touching the file system or
    /// the process environment.
    pub fn from_toml(content: &str, environment: Environment) -> Result<Self> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.environment = environment;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(connection_string) = std::env::var(CONNECTION_STRING_VAR) {
            self.connection_strings.sales_web_context = connection_string;
        }
        if let Ok(port) = std::env::var(PORT_VAR) {
            self.server.port = port
                .parse()
                .map_err(|_| SalesWebError::Config(format!("Invalid {PORT_VAR} value '{port}'")))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.connection_strings.sales_web_context.trim().is_empty() {
            return Err(SalesWebError::Config(
                "Connection string 'SalesWebContext' is empty".to_string(),
            ));
        }
        if self.metrics.enabled && self.metrics.port == self.server.port {
            return Err(SalesWebError::Config(format!(
                "Metrics port {} collides with the server port",
                self.metrics.port
            )));
        }
        if self.localization.supported_cultures.is_empty() {
            return Err(SalesWebError::Config(
                "At least one supported culture is required".to_string(),
            ));
        }
        Ok(())
    }
}

fn environment_file(base: &Path, environment: Environment) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("appsettings");
    base.with_file_name(format!("{stem}.{}.toml", environment.name()))
}

fn read_table(path: &Path) -> Result<Option<toml::Table>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(toml::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SalesWebError::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))),
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}
