//! Token issuance, session cookies, and the authenticated-user extractor.

pub mod cookies;
pub mod tokens;
mod user;

pub use tokens::{IssueError, TokenConfig, TokenError, TokenIssuer, TokenPair};
pub use user::AuthUser;
