use super::{
    auth::cookies::ACCESS_TOKEN_COOKIE,
    handlers::{current_user, donations, health, token_refresh, user_login, user_logout, user_register},
};
use utoipa::{
    openapi::{
        security::{ApiKey, ApiKeyValue, SecurityScheme},
        Contact, InfoBuilder, License, Tag,
    },
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        user_register::register,
        user_login::login,
        user_logout::logout,
        token_refresh::refresh,
        current_user::current_user,
        donations::donate,
        donations::all_donations,
        donations::donations_by_postal,
    ),
    modifiers(&SessionCookie)
)]
struct ApiDoc;

/// The access token travels in the `accessToken` cookie (or a bearer header).
struct SessionCookie;

impl Modify for SessionCookie {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "accessToken",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(ACCESS_TOKEN_COOKIE))),
        );
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();
    spec.info = cargo_info();

    let mut users_tag = Tag::new("users");
    users_tag.description = Some("Registration and sessions".to_string());

    let mut donations_tag = Tag::new("donations");
    donations_tag.description = Some("Posting and finding food donations".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service and database status".to_string());

    spec.tags = Some(vec![users_tag, donations_tag, health_tag]);
    spec
}

// Use Cargo.toml metadata instead of the utoipa defaults.
fn cargo_info() -> utoipa::openapi::Info {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });
    info
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = match primary.split_once('<') {
        Some((name, email)) => (name.trim(), email.trim_end_matches('>').trim()),
        None => (primary, ""),
    };
    if name.is_empty() && email.is_empty() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = optional_str(name).map(str::to_string);
    contact.email = optional_str(email).map(str::to_string);
    Some(contact)
}

fn optional_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
