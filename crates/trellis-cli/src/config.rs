use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Settings read from `trellis.toml` and `TRELLIS_*` environment variables.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite file holding every list, section and task.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Default `tracing` level when neither `--verbose` nor `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Where `trellis ingest` files records when no target is given.
    #[serde(default = "default_inbox_list")]
    pub inbox_list: String,
    #[serde(default = "default_inbox_section")]
    pub inbox_section: String,
}

fn default_database_path() -> String {
    "trellis.db".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_inbox_list() -> String {
    "Inbox".to_string()
}

fn default_inbox_section() -> String {
    "Inbox".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
            inbox_list: default_inbox_list(),
            inbox_section: default_inbox_section(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("trellis.toml"))
                .merge(Env::prefixed("TRELLIS_")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        figment.extract()
    }

    /// The configured level, falling back to `warn` for unrecognized names.
    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::WARN)
    }
}
