use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::TokenConfig;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const STORE_FILE: &str = "store.json";

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub api: Option<ApiCfg>,
    pub storage: Option<StorageCfg>,
    pub tokens: Option<TokensCfg>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiCfg {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageCfg {
    pub path: Option<String>, // `~/` is expanded
}

#[derive(Debug, Default, Deserialize)]
pub struct TokensCfg {
    pub input: Option<u64>,
    pub output: Option<u64>,
}

pub fn load_user_config(home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)?;
    let cfg: UserConfig = toml::from_str(&s)?;
    Ok(Some(cfg))
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Values taken from the environment; `None` means unset.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub store: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Effective runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub timeout: Duration,
    pub store_path: PathBuf,
    pub tokens: TokenConfig,
}

impl Settings {
    /// Layer env over `config.toml` over defaults.
    pub fn resolve(home: &Path, user: Option<&UserConfig>, env: &EnvOverrides) -> Self {
        let api = user.and_then(|c| c.api.as_ref());
        let storage = user.and_then(|c| c.storage.as_ref());
        let tokens = user.and_then(|c| c.tokens.as_ref());
        let defaults = TokenConfig::default();

        let api_url = env
            .api_url
            .clone()
            .or_else(|| api.and_then(|a| a.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let timeout_secs = env
            .timeout_secs
            .or_else(|| api.and_then(|a| a.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let store_path = env
            .store
            .as_deref()
            .or_else(|| storage.and_then(|s| s.path.as_deref()))
            .map(expand_home)
            .unwrap_or_else(|| home.join(STORE_FILE));

        Settings {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
            store_path,
            tokens: TokenConfig {
                input: env
                    .input_tokens
                    .or_else(|| tokens.and_then(|t| t.input))
                    .unwrap_or(defaults.input),
                output: env
                    .output_tokens
                    .or_else(|| tokens.and_then(|t| t.output))
                    .unwrap_or(defaults.output),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_user_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[api\nbase_url = ").unwrap();
        assert!(load_user_config(dir.path()).is_err());
    }

    #[test]
    fn defaults_without_config() {
        let home = Path::new("/tmp/cb-home");
        let s = Settings::resolve(home, None, &EnvOverrides::default());
        assert_eq!(s.api_url, DEFAULT_API_URL);
        assert_eq!(s.timeout, Duration::from_secs(30));
        assert_eq!(s.store_path, home.join("store.json"));
        assert_eq!(s.tokens, TokenConfig::default());
    }

    #[test]
    fn env_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"
[api]
base_url = "http://pricing.internal:9000"
timeout_secs = 5

[storage]
path = "/var/lib/costboard/providers.json"

[tokens]
input = 4000

[logging]
level = "debug"
"#,
        )
        .unwrap();
        let cfg = load_user_config(dir.path()).unwrap().expect("config");
        assert_eq!(
            cfg.logging.as_ref().and_then(|l| l.level.as_deref()),
            Some("debug")
        );

        let s = Settings::resolve(dir.path(), Some(&cfg), &EnvOverrides::default());
        assert_eq!(s.api_url, "http://pricing.internal:9000");
        assert_eq!(s.timeout, Duration::from_secs(5));
        assert_eq!(s.store_path, PathBuf::from("/var/lib/costboard/providers.json"));
        assert_eq!(s.tokens.input, 4000);
        assert_eq!(s.tokens.output, 500);

        let env = EnvOverrides {
            api_url: Some("http://localhost:1234".into()),
            timeout_secs: Some(1),
            store: Some("/tmp/other.json".into()),
            input_tokens: None,
            output_tokens: Some(42),
        };
        let s = Settings::resolve(dir.path(), Some(&cfg), &env);
        assert_eq!(s.api_url, "http://localhost:1234");
        assert_eq!(s.timeout, Duration::from_secs(1));
        assert_eq!(s.store_path, PathBuf::from("/tmp/other.json"));
        assert_eq!(s.tokens.input, 4000);
        assert_eq!(s.tokens.output, 42);
    }

    #[test]
    fn expand_home_only_touches_tilde_prefix() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel/~/x"), PathBuf::from("rel/~/x"));
    }
}
