use std::{fmt, path::PathBuf, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing_subscriber::filter::LevelFilter;

fn deserialize_fromstr<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let string = String::deserialize(deserializer)?;
    T::from_str(&string)
        .map_err(|e| de::Error::custom(format!("Error parsing '{}': {}", string, e)))
}

pub fn serialize_to_string<T: std::fmt::Display, S: Serializer>(
    field: T,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.serialize_str(&field.to_string())
}

fn default_loglevel() -> LevelFilter {
    LevelFilter::INFO
}

/// Everything we need to know for talking to the wallet provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Path to the socket the provider's RPC server listens on.
    pub socket_path: PathBuf,
}

/// Static configuration. All settings live in the configuration file,
/// except for the funding-target catalog which is compiled in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Where to reach the wallet provider. Without it we probe the default
    /// socket location, and its absence is a normal state.
    pub provider_config: Option<ProviderConfig>,
    /// An optional custom data directory, for the log and session store.
    pub data_dir: Option<PathBuf>,
    /// What messages to log.
    #[serde(
        deserialize_with = "deserialize_fromstr",
        serialize_with = "serialize_to_string",
        default = "default_loglevel"
    )]
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider_config: None,
            data_dir: None,
            log_level: default_loglevel(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    DatadirNotFound,
    FileNotFound,
    ReadingFile(String),
    Unexpected(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DatadirNotFound => write!(f, "Could not locate the configuration directory."),
            Self::FileNotFound => write!(f, "Could not locate the configuration file."),
            Self::ReadingFile(e) => write!(f, "Error while reading file: '{}'", e),
            Self::Unexpected(e) => write!(f, "Unexpected error: '{}'", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound
        } else {
            Self::ReadingFile(e.to_string())
        }
    }
}

/// Get the absolute path to the folder with our configuration file.
pub fn config_folder_path() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    let configs_dir = dirs::home_dir();

    #[cfg(not(target_os = "linux"))]
    let configs_dir = dirs::config_dir();

    if let Some(mut path) = configs_dir {
        #[cfg(target_os = "linux")]
        path.push(".lnboard");

        #[cfg(not(target_os = "linux"))]
        path.push("Lnboard");

        return Some(path);
    }

    None
}

fn config_file_path() -> Option<PathBuf> {
    config_folder_path().map(|mut path| {
        path.push("lnboard.toml");
        path
    })
}

impl Config {
    /// Get our static configuration out of the configuration file, the
    /// default one or `custom_path`.
    pub fn from_file(custom_path: Option<PathBuf>) -> Result<Config, ConfigError> {
        let config_file =
            custom_path.unwrap_or(config_file_path().ok_or(ConfigError::DatadirNotFound)?);

        let config = toml::from_slice::<Config>(&std::fs::read(config_file)?)
            .map_err(|e| ConfigError::ReadingFile(format!("Parsing configuration file: {}", e)))?;

        Ok(config)
    }
}
