//! `reelgatectl link`: issue a signed URL.

use anyhow::{Context, Result};
use reelgate_core::Clock;
use reelgate_core::config::{AppConfig, PLACEHOLDER_BASE_URL, PLACEHOLDER_SECRET};
use reelgate_signer::{SecretKey, SignedLink, Ttl, issue_link};
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Values given on the command line; anything missing comes from config.
#[derive(Debug, Default)]
pub struct LinkArgs {
    pub path: String,
    pub ttl: Option<Ttl>,
    pub base_url: Option<String>,
    pub secret: Option<String>,
}

/// Fully resolved signing inputs.
#[derive(Debug)]
pub struct LinkSettings {
    pub base_url: String,
    pub secret: String,
    pub ttl: Ttl,
    pub warnings: Vec<String>,
}

/// Fill in missing arguments from config, falling back to the placeholders.
pub fn resolve_settings(args: &LinkArgs, config: &AppConfig) -> Result<LinkSettings> {
    let mut warnings = Vec::new();

    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.link.base_url.clone())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_BASE_URL.to_string());
    if base_url.contains("your-worker") {
        warnings.push(
            "using the placeholder base URL; pass one or set REELGATE_LINK__BASE_URL".to_string(),
        );
    }

    let secret = args
        .secret
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| config.access.secret().map(String::from))
        .unwrap_or_else(|| PLACEHOLDER_SECRET.to_string());
    if secret.contains("change-this") {
        warnings.push(
            "using the placeholder secret; pass one or set REELGATE_ACCESS__SECRET_KEY".to_string(),
        );
    }

    let ttl = match args.ttl {
        Some(ttl) => ttl,
        None => Ttl::from_secs(config.link.default_ttl_secs)
            .context("invalid link.default_ttl_secs in configuration")?,
    };

    Ok(LinkSettings {
        base_url,
        secret,
        ttl,
        warnings,
    })
}

/// Sign `path` with the resolved settings.
pub fn generate(settings: &LinkSettings, path: &str, clock: Arc<dyn Clock>) -> Result<SignedLink> {
    let secret = SecretKey::new(&settings.secret).context("invalid secret")?;
    issue_link(&settings.base_url, path, settings.ttl, &secret, clock)
        .with_context(|| format!("failed to sign {path}"))
}

/// Human-readable report for a generated link.
pub fn render(link: &SignedLink, ttl: Ttl) -> String {
    let expires = OffsetDateTime::from_unix_timestamp(link.expires_at)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| link.expires_at.to_string());

    format!(
        "Signed link generated\n\n  Path:    {}\n  TTL:     {}\n  Expires: {} ({})\n\n{}\n",
        link.path, ttl, expires, link.expires_at, link.url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgate_core::FixedClock;

    const NOW: i64 = 1_700_000_000;

    fn args(path: &str) -> LinkArgs {
        LinkArgs {
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn explicit_arguments_win() {
        let mut config = AppConfig::default();
        config.link.base_url = Some("https://config.example.com".to_string());
        config.access.secret_key = Some("config-secret-value".to_string());

        let args = LinkArgs {
            ttl: Some(Ttl::from_secs(60).unwrap()),
            base_url: Some("https://cli.example.com".to_string()),
            secret: Some("cli-secret-value-123".to_string()),
            ..args("video/a.mp4")
        };
        let settings = resolve_settings(&args, &config).unwrap();
        assert_eq!(settings.base_url, "https://cli.example.com");
        assert_eq!(settings.secret, "cli-secret-value-123");
        assert_eq!(settings.ttl.as_secs(), 60);
        assert!(settings.warnings.is_empty());
    }

    #[test]
    fn config_fills_missing_arguments() {
        let mut config = AppConfig::default();
        config.link.base_url = Some("https://config.example.com".to_string());
        config.link.default_ttl_secs = 7200;
        config.access.secret_key = Some("config-secret-value".to_string());

        let settings = resolve_settings(&args("a.mp4"), &config).unwrap();
        assert_eq!(settings.base_url, "https://config.example.com");
        assert_eq!(settings.secret, "config-secret-value");
        assert_eq!(settings.ttl.as_secs(), 7200);
    }

    #[test]
    fn placeholders_produce_warnings() {
        let settings = resolve_settings(&args("a.mp4"), &AppConfig::default()).unwrap();
        assert_eq!(settings.base_url, PLACEHOLDER_BASE_URL);
        assert_eq!(settings.secret, PLACEHOLDER_SECRET);
        assert_eq!(settings.warnings.len(), 2);
        assert_eq!(settings.ttl, Ttl::DEFAULT);
    }

    #[test]
    fn zero_default_ttl_is_rejected() {
        let mut config = AppConfig::default();
        config.link.default_ttl_secs = 0;
        assert!(resolve_settings(&args("a.mp4"), &config).is_err());
    }

    #[test]
    fn generates_known_link() {
        let settings = LinkSettings {
            base_url: "https://cdn.example.com/".to_string(),
            secret: "test-secret".to_string(),
            ttl: Ttl::DEFAULT,
            warnings: Vec::new(),
        };
        let link = generate(&settings, "/video/a.mp4", Arc::new(FixedClock::new(NOW))).unwrap();
        assert_eq!(
            link.url,
            "https://cdn.example.com/video/a.mp4?expires=1700003600&signature=5d53b71fb7da53912b9b47bb2411d93834f8d781ab6b80319ca0c34c486d31ee"
        );

        let report = render(&link, settings.ttl);
        assert!(report.contains("Path:    video/a.mp4"));
        assert!(report.contains("TTL:     1 hour"));
        assert!(report.contains("2023-11-14T23:13:20Z (1700003600)"));
        assert!(report.ends_with(&format!("{}\n", link.url)));
    }
}
