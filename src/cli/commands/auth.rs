use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::fmt;

pub const ARG_ACCESS_TOKEN_SECRET: &str = "access-token-secret";
pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_SECRET: &str = "refresh-token-secret";
pub const ARG_REFRESH_TOKEN_TTL: &str = "refresh-token-ttl-seconds";
pub const ARG_TOKEN_ISSUER: &str = "token-issuer";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_SECRET)
                .long(ARG_ACCESS_TOKEN_SECRET)
                .help("HMAC secret for access tokens (at least 32 bytes)")
                .env("FOODBRIDGE_ACCESS_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long(ARG_ACCESS_TOKEN_TTL)
                .help("Access token and cookie TTL in seconds")
                .env("FOODBRIDGE_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_SECRET)
                .long(ARG_REFRESH_TOKEN_SECRET)
                .help("HMAC secret for refresh tokens (at least 32 bytes, distinct from the access secret)")
                .env("FOODBRIDGE_REFRESH_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL)
                .long(ARG_REFRESH_TOKEN_TTL)
                .help("Refresh token and cookie TTL in seconds")
                .env("FOODBRIDGE_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("864000")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_TOKEN_ISSUER)
                .long(ARG_TOKEN_ISSUER)
                .help("Issuer claim for signed tokens")
                .env("FOODBRIDGE_TOKEN_ISSUER")
                .default_value("foodbridge"),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL, used as the allowed CORS origin")
                .env("FOODBRIDGE_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
}

pub struct Options {
    pub access_token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_secret: SecretString,
    pub refresh_token_ttl_seconds: i64,
    pub token_issuer: String,
    pub frontend_base_url: String,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("access_token_secret", &"***")
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_secret", &"***")
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .field("token_issuer", &self.token_issuer)
            .field("frontend_base_url", &self.frontend_base_url)
            .finish()
    }
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret = |name: &str| -> Result<SecretString> {
            matches
                .get_one::<String>(name)
                .map(|s| SecretString::from(s.clone()))
                .with_context(|| format!("missing required argument: --{name}"))
        };

        Ok(Self {
            access_token_secret: secret(ARG_ACCESS_TOKEN_SECRET)?,
            access_token_ttl_seconds: matches
                .get_one::<i64>(ARG_ACCESS_TOKEN_TTL)
                .copied()
                .unwrap_or(900),
            refresh_token_secret: secret(ARG_REFRESH_TOKEN_SECRET)?,
            refresh_token_ttl_seconds: matches
                .get_one::<i64>(ARG_REFRESH_TOKEN_TTL)
                .copied()
                .unwrap_or(864_000),
            token_issuer: matches
                .get_one::<String>(ARG_TOKEN_ISSUER)
                .cloned()
                .unwrap_or_else(|| "foodbridge".to_string()),
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
        })
    }
}
