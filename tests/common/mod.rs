#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use foodbridge::{
    api::{
        self,
        auth::{TokenConfig, TokenIssuer},
    },
    store::{memory::MemoryStore, Store},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery staple";

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub tokens: Arc<TokenIssuer>,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Raw `Set-Cookie` header values, in order.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(ToString::to_string)
            .collect()
    }

    /// Value of the named cookie from `Set-Cookie`, if set.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies().iter().find_map(|cookie| {
            let (pair, _) = cookie.split_once(';')?;
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(TokenConfig::new(
            SecretString::from("access-secret-access-secret-0123456789"),
            SecretString::from("refresh-secret-refresh-secret-0123456789"),
        ))
    }

    pub fn with_config(config: TokenConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(TokenIssuer::new(config));
        let shared: Arc<dyn Store> = store.clone();
        let router = api::router(shared, tokens.clone());
        Self {
            store,
            tokens,
            router,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> Result<TestResponse> {
        self.send(json_request(Method::POST, uri, body, None)?).await
    }

    /// POST a JSON body with an access token in the `Authorization` header.
    pub async fn post_json_as(&self, uri: &str, token: &str, body: &Value) -> Result<TestResponse> {
        self.send(json_request(Method::POST, uri, body, Some(token))?)
            .await
    }

    pub async fn get_as(&self, uri: &str, token: &str) -> Result<TestResponse> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())?;
        self.send(request).await
    }

    pub async fn register(&self, email: &str) -> Result<TestResponse> {
        self.post_json("/api/v1/users/register", &registration(email))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TestResponse> {
        self.post_json(
            "/api/v1/users/login",
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Register and log in, returning the login response.
    pub async fn signed_in(&self, email: &str) -> Result<TestResponse> {
        let registered = self.register(email).await?;
        anyhow::ensure!(
            registered.status == StatusCode::CREATED,
            "register failed: {}",
            registered.body
        );
        let login = self.login(email, PASSWORD).await?;
        anyhow::ensure!(login.status == StatusCode::OK, "login failed: {}", login.body);
        Ok(login)
    }
}

pub fn registration(email: &str) -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "contact": "9876543210",
        "email": email,
        "password": PASSWORD,
    })
}

pub fn json_request(
    method: Method,
    uri: &str,
    body: &Value,
    token: Option<&str>,
) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::from(serde_json::to_vec(body)?))?)
}

pub fn access_token(login: &TestResponse) -> Result<String> {
    login.body["data"]["accessToken"]
        .as_str()
        .map(ToString::to_string)
        .context("login response carries no access token")
}

pub fn refresh_token(login: &TestResponse) -> Result<String> {
    login.body["data"]["refreshToken"]
        .as_str()
        .map(ToString::to_string)
        .context("login response carries no refresh token")
}
