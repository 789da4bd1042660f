use figment::{
    providers::{Env, Serialized},
    value::{Dict, Value},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Variables read from the environment and from `.env`
const ENV_KEYS: [&str; 5] = ["host", "port", "database_url", "allowed_origins", "log_level"];

/// Origins allowed to call the API when `ALLOWED_ORIGINS` is not set
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,https://yokoshimadness.github.io";

/// Process configuration for the server and CLI.
///
/// Built from defaults, then a `.env` file in the working directory, then raw
/// environment variables: `HOST`, `PORT`, `DATABASE_URL`,
/// `ALLOWED_ORIGINS` (comma separated), `LOG_LEVEL`. Real environment
/// variables win over `.env`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub allowed_origins: String,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: "finance.db".to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn figment(dotenv_path: &Path) -> Figment {
        Figment::from(Serialized::defaults(ServerConfig::default()))
            .merge(Serialized::defaults(dotenv_values(dotenv_path)))
            .merge(Env::raw().only(&ENV_KEYS))
    }

    /// Load from defaults + `.env` + environment
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment(Path::new(".env")).extract()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Allowed CORS origins, blanks dropped
    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Known keys from a dotenv file, parsed the way `Env` parses values.
/// The process environment is left untouched.
fn dotenv_values(path: &Path) -> Dict {
    let mut values = Dict::new();

    let Ok(entries) = dotenvy::from_path_iter(path) else {
        return values;
    };

    for entry in entries {
        match entry {
            Ok((key, raw)) => {
                let key = key.to_ascii_lowercase();
                if ENV_KEYS.contains(&key.as_str()) {
                    let value = raw.parse::<Value>().unwrap_or_else(|_| Value::from(raw.clone()));
                    values.insert(key, value);
                }
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping malformed .env line"),
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();

        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
        assert_eq!(config.database_url, "finance.db");
        assert_eq!(
            config.origins(),
            vec!["http://localhost:3000", "https://yokoshimadness.github.io"]
        );
    }

    #[test]
    fn test_environment_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("HOST", "127.0.0.1");
            jail.set_env("PORT", "8087");
            jail.set_env("DATABASE_URL", "/var/lib/ledger/expenses.db");
            jail.set_env("ALLOWED_ORIGINS", "https://a.example, ,https://b.example");
            jail.set_env("LOG_LEVEL", "debug");

            let config = ServerConfig::load()?;

            assert_eq!(config.listen_addr(), "127.0.0.1:8087");
            assert_eq!(config.database_url, "/var/lib/ledger/expenses.db");
            assert_eq!(config.origins(), vec!["https://a.example", "https://b.example"]);
            assert_eq!(config.log_level, "debug");
            Ok(())
        });
    }

    #[test]
    fn test_dotenv_file_fills_in_settings() {
        Jail::expect_with(|jail| {
            jail.create_file(
                ".env",
                "# local overrides\nPORT=6001\nDATABASE_URL=from-dotenv.db\nUNRELATED=1\n",
            )?;
            jail.set_env("PORT", "7002");

            let config = ServerConfig::load()?;

            // Process environment beats .env, .env beats defaults
            assert_eq!(config.port, 7002);
            assert_eq!(config.database_url, "from-dotenv.db");
            Ok(())
        });
    }

    #[test]
    fn test_missing_dotenv_file_is_ignored() {
        Jail::expect_with(|jail| {
            let values = dotenv_values(&jail.directory().join(".env"));
            assert!(values.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "not-a-port");
            assert!(ServerConfig::load().is_err());
            Ok(())
        });
    }
}
