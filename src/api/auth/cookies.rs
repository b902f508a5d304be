//! Session cookies and token extraction from request headers.

use super::tokens::{TokenIssuer, TokenPair};
use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

const COOKIE_ATTRIBUTES: &str = "Path=/; HttpOnly; Secure; SameSite=Lax";

/// Build a secure `HttpOnly` cookie that expires with the token it carries.
pub(crate) fn session_cookie(
    name: &str,
    value: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}={value}; {COOKIE_ATTRIBUTES}; Max-Age={max_age_seconds}"
    ))
}

/// Expire a cookie previously set by [`session_cookie`].
pub(crate) fn clear_cookie(name: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!("{name}=; {COOKIE_ATTRIBUTES}; Max-Age=0"))
}

/// `Set-Cookie` headers for both tokens of a freshly issued pair.
pub(crate) fn token_cookies(
    tokens: &TokenIssuer,
    pair: &TokenPair,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        session_cookie(
            ACCESS_TOKEN_COOKIE,
            &pair.access_token,
            tokens.config().access_ttl_seconds(),
        )?,
    );
    headers.append(
        SET_COOKIE,
        session_cookie(
            REFRESH_TOKEN_COOKIE,
            &pair.refresh_token,
            tokens.config().refresh_ttl_seconds(),
        )?,
    );
    Ok(headers)
}

/// `Set-Cookie` headers that remove both session cookies.
pub(crate) fn cleared_token_cookies() -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, clear_cookie(ACCESS_TOKEN_COOKIE)?);
    headers.append(SET_COOKIE, clear_cookie(REFRESH_TOKEN_COOKIE)?);
    Ok(headers)
}

pub(crate) fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == name && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
