use crate::{api, api::auth::TokenConfig, cli::telemetry};
use anyhow::Result;
use secrecy::SecretString;
use std::fmt;
use tracing::info;
use url::Url;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub access_token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_secret: SecretString,
    pub refresh_token_ttl_seconds: i64,
    pub token_issuer: String,
    pub frontend_base_url: String,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &redact_dsn(&self.dsn))
            .field("access_token_secret", &"***")
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_secret", &"***")
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .field("token_issuer", &self.token_issuer)
            .field("frontend_base_url", &self.frontend_base_url)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the token settings are invalid, the database is
/// unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let token_config = TokenConfig::new(args.access_token_secret, args.refresh_token_secret)
        .with_access_ttl_seconds(args.access_token_ttl_seconds)
        .with_refresh_ttl_seconds(args.refresh_token_ttl_seconds)
        .with_issuer(args.token_issuer);

    let result = api::new(args.port, args.dsn, token_config, &args.frontend_base_url).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        (
            "access_token_ttl_seconds",
            args.access_token_ttl_seconds.to_string(),
        ),
        (
            "refresh_token_ttl_seconds",
            args.refresh_token_ttl_seconds.to_string(),
        ),
        ("token_issuer", args.token_issuer.clone()),
        ("frontend_base_url", args.frontend_base_url.clone()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} ({})\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_dsn_hides_password() {
        assert_eq!(
            redact_dsn("postgres://app:hunter2@db:5432/foodbridge"),
            "postgres://app:REDACTED@db:5432/foodbridge"
        );
        assert_eq!(
            redact_dsn("postgres://db:5432/foodbridge"),
            "postgres://db:5432/foodbridge"
        );
        assert_eq!(redact_dsn("::not a url::"), "invalid-dsn");
    }

    #[test]
    fn args_debug_redacts_secrets() {
        let args = Args {
            port: 8080,
            dsn: "postgres://app:hunter2@db:5432/foodbridge".to_string(),
            access_token_secret: SecretString::from("access-secret-access-secret-0123456789"),
            access_token_ttl_seconds: 900,
            refresh_token_secret: SecretString::from("refresh-secret-refresh-secret-0123456789"),
            refresh_token_ttl_seconds: 864_000,
            token_issuer: "foodbridge".to_string(),
            frontend_base_url: "http://localhost:3000".to_string(),
        };
        let rendered = format!("{args:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("access-secret"));
        assert!(!rendered.contains("refresh-secret"));
    }

    #[test]
    fn short_commit_truncates() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("unknown"), "unknown");
    }
}
