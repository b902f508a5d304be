//! # Foodbridge (food donation matching API)
//!
//! `foodbridge` lets users register, authenticate, post food donations and
//! search the ones still available by postal code.
//!
//! ## Sessions
//!
//! Login issues a short-lived access token and a longer-lived refresh token,
//! both HS256 JWTs signed with distinct secrets. Both are sent as `HttpOnly`
//! cookies and repeated in the JSON body for clients that cannot use cookies.
//!
//! The refresh token is also stored on the user record. Its presence there is
//! the session: logout clears it, and every refresh replaces it, so a used or
//! logged-out refresh token can never be exchanged again. Access tokens are
//! stateless and stay valid until they expire.
//!
//! ## Responses
//!
//! Every endpoint under `/api` answers with the same envelope:
//! `{ statusCode, data, message, success }`. The embedded `statusCode` is
//! always the transport status.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
