use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CachePolicy;
use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::links::Channel;
use crate::sources::SourceKind;

pub const DEFAULT_CONFIG_PATH: &str = ".skyreview.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub source: Option<SourceKind>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub label: Option<String>,
    pub moderator_label: Option<String>,
    pub api_base: Option<String>,
    pub web_base: Option<String>,
    pub token_env: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_expires: Option<bool>,
    pub page_size: Option<usize>,
    pub store_dir: Option<String>,
    pub template_dir: Option<String>,
    pub require_consent: Option<bool>,
    pub channels: Option<Vec<Channel>>,
    pub whatsapp_number: Option<String>,
    pub contact_email: Option<String>,
    pub opener: Option<String>,
    pub link_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source: SourceKind,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub label: String,
    pub moderator_label: String,
    pub api_base: String,
    pub web_base: String,
    pub token_env: String,
    pub cache: CachePolicy,
    pub page_size: usize,
    pub store_dir: String,
    pub template_dir: Option<String>,
    pub require_consent: bool,
    pub channels: Vec<Channel>,
    pub whatsapp_number: Option<String>,
    pub contact_email: Option<String>,
    pub opener: String,
    pub link_delay_ms: u64,
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceKind::Remote,
            owner: None,
            repo: None,
            label: "review".to_string(),
            moderator_label: "approved".to_string(),
            api_base: "https://api.github.com".to_string(),
            web_base: "https://github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            cache: CachePolicy::default(),
            page_size: 3,
            store_dir: ".skyreview".to_string(),
            template_dir: None,
            require_consent: true,
            channels: vec![Channel::Github],
            whatsapp_number: None,
            contact_email: None,
            opener: "xdg-open".to_string(),
            link_delay_ms: 1000,
            dry_run: false,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = match cli.config.as_deref() {
            Some(path) => {
                let path = Path::new(path);
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path.to_path_buf()));
                }
                parse_config(&std::fs::read_to_string(path)?)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    parse_config(&std::fs::read_to_string(path)?)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        let config = merge(file_config, cli);
        if config.page_size == 0 {
            return Err(Error::ConfigValidation("page_size must be > 0".to_string()));
        }
        Ok(config)
    }

    /// Owner and repo of the issue tracker, required by the remote source and
    /// the GitHub submission channel.
    pub fn repository(&self) -> Result<(&str, &str)> {
        match (self.owner.as_deref(), self.repo.as_deref()) {
            (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
                Ok((owner, repo))
            }
            _ => Err(Error::ConfigValidation(
                "owner and repo must be set to use GitHub".to_string(),
            )),
        }
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ttl) = config.cache_ttl_secs
        && ttl == 0
    {
        return Err(Error::ConfigValidation(
            "cache_ttl_secs must be > 0 (use cache_expires = false to disable expiry)".to_string(),
        ));
    }
    if let Some(page_size) = config.page_size
        && page_size == 0
    {
        return Err(Error::ConfigValidation("page_size must be > 0".to_string()));
    }
    if let Some(ref label) = config.label
        && label.trim().is_empty()
    {
        return Err(Error::ConfigValidation("label must not be empty".to_string()));
    }
    if let Some(ref channels) = config.channels
        && channels.is_empty()
    {
        return Err(Error::ConfigValidation(
            "channels must name at least one of: github, whatsapp, email".to_string(),
        ));
    }
    if let Some(ref number) = config.whatsapp_number
        && (number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(Error::ConfigValidation(format!(
            "whatsapp_number must be digits only in international format: {number}"
        )));
    }
    if let Some(ref email) = config.contact_email
        && !email.contains('@')
    {
        return Err(Error::ConfigValidation(format!(
            "contact_email is not an email address: {email}"
        )));
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Config {
    let defaults = Config::default();
    let cache = match (file.cache_expires, file.cache_ttl_secs) {
        (Some(false), _) => CachePolicy::NoExpiry,
        (_, Some(secs)) => CachePolicy::Expires(Duration::from_secs(secs)),
        _ => defaults.cache,
    };

    Config {
        source: cli.source.or(file.source).unwrap_or(defaults.source),
        owner: file.owner,
        repo: file.repo,
        label: file.label.unwrap_or(defaults.label),
        moderator_label: file.moderator_label.unwrap_or(defaults.moderator_label),
        api_base: file.api_base.unwrap_or(defaults.api_base),
        web_base: file.web_base.unwrap_or(defaults.web_base),
        token_env: file.token_env.unwrap_or(defaults.token_env),
        cache,
        page_size: cli
            .page_size
            .or(file.page_size)
            .unwrap_or(defaults.page_size),
        store_dir: cli
            .store_dir
            .clone()
            .or(file.store_dir)
            .unwrap_or(defaults.store_dir),
        template_dir: file.template_dir,
        require_consent: file.require_consent.unwrap_or(defaults.require_consent),
        channels: file.channels.unwrap_or(defaults.channels),
        whatsapp_number: file.whatsapp_number,
        contact_email: file.contact_email,
        opener: file.opener.unwrap_or(defaults.opener),
        link_delay_ms: file.link_delay_ms.unwrap_or(defaults.link_delay_ms),
        dry_run: cli.dry_run,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
source = "remote"
owner = "goldensky"
repo = "site"
label = "review"
moderator_label = "approved"
cache_ttl_secs = 3600
page_size = 6
channels = ["github", "whatsapp"]
whatsapp_number = "97400000000"
contact_email = "info@example.com"
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.source, Some(SourceKind::Remote));
        assert_eq!(config.owner.as_deref(), Some("goldensky"));
        assert_eq!(config.cache_ttl_secs, Some(3600));
        assert_eq!(
            config.channels,
            Some(vec![Channel::Github, Channel::Whatsapp])
        );
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_invalid_source() {
        let err = parse_config(r#"source = "linear""#).unwrap_err();
        assert!(err.to_string().contains("config parse error"));
    }

    #[test]
    fn test_parse_zero_ttl() {
        let err = parse_config("cache_ttl_secs = 0").unwrap_err();
        assert!(err.to_string().contains("cache_ttl_secs must be > 0"));
    }

    #[test]
    fn test_parse_zero_page_size() {
        let err = parse_config("page_size = 0").unwrap_err();
        assert!(err.to_string().contains("page_size must be > 0"));
    }

    #[test]
    fn test_parse_empty_channels() {
        let err = parse_config("channels = []").unwrap_err();
        assert!(err.to_string().contains("channels must name"));
    }

    #[test]
    fn test_parse_bad_whatsapp_number() {
        let err = parse_config(r#"whatsapp_number = "+974 555""#).unwrap_err();
        assert!(err.to_string().contains("whatsapp_number"));
    }

    #[test]
    fn test_parse_unknown_field() {
        let err = parse_config(r#"bogus = "value""#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let file = ConfigFile {
            source: Some(SourceKind::Remote),
            page_size: Some(6),
            store_dir: Some("/file/store".to_string()),
            label: Some("feedback".to_string()),
            ..Default::default()
        };
        let cli = Cli::parse_from([
            "skyreview",
            "show",
            "--source",
            "local",
            "--page-size",
            "9",
        ]);
        let config = merge(file, &cli);
        assert_eq!(config.source, SourceKind::Local); // CLI wins
        assert_eq!(config.page_size, 9); // CLI wins
        assert_eq!(config.store_dir, "/file/store"); // file value kept
        assert_eq!(config.label, "feedback"); // file value kept
    }

    #[test]
    fn test_defaults_applied() {
        let cli = Cli::parse_from(["skyreview", "stats"]);
        let config = merge(ConfigFile::default(), &cli);
        assert_eq!(config, Config::default());
        assert_eq!(config.cache, CachePolicy::Expires(Duration::from_secs(300)));
        assert_eq!(config.page_size, 3);
        assert!(config.require_consent);
    }

    #[test]
    fn test_cache_policy_from_file() {
        let cli = Cli::parse_from(["skyreview", "stats"]);
        let hour = ConfigFile {
            cache_ttl_secs: Some(3600),
            ..Default::default()
        };
        assert_eq!(
            merge(hour, &cli).cache,
            CachePolicy::Expires(Duration::from_secs(3600))
        );

        let never = ConfigFile {
            cache_ttl_secs: Some(3600),
            cache_expires: Some(false),
            ..Default::default()
        };
        assert_eq!(merge(never, &cli).cache, CachePolicy::NoExpiry);
    }

    #[test]
    fn test_repository_required() {
        let config = Config::default();
        assert!(config.repository().is_err());
        let config = Config {
            owner: Some("goldensky".to_string()),
            repo: Some("site".to_string()),
            ..Config::default()
        };
        assert_eq!(config.repository().unwrap(), ("goldensky", "site"));
    }

    #[test]
    fn test_load_missing_explicit_config() {
        let cli = Cli::parse_from([
            "skyreview",
            "stats",
            "--config",
            "/nonexistent/skyreview.toml",
        ]);
        let err = Config::load(&cli).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_explicit_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("skyreview.toml");
        std::fs::write(&path, "owner = \"goldensky\"\nrepo = \"site\"\npage_size = 4\n").unwrap();
        let cli = Cli::parse_from([
            "skyreview",
            "show",
            "--config",
            path.to_str().unwrap(),
        ]);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.page_size, 4);
        assert_eq!(config.repository().unwrap(), ("goldensky", "site"));
    }

    #[test]
    fn test_load_rejects_zero_page_size_from_cli() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("skyreview.toml");
        std::fs::write(&path, "").unwrap();
        let cli = Cli::parse_from([
            "skyreview",
            "show",
            "--config",
            path.to_str().unwrap(),
            "--page-size",
            "0",
        ]);
        let err = Config::load(&cli).unwrap_err();
        assert!(err.to_string().contains("page_size must be > 0"));
    }
}
