//! Stateless HTTP request builder and response parser for the Dawn Eats API.
//!
//! # Design
//! `DawnClient` holds only a `base_url` and carries no mutable state between
//! calls. Every endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`. The
//! session token is passed in explicitly, so the builder never reads storage
//! and the same code serves the async `Dispatcher` and the FFI bridge.
//!
//! Header composition is fixed: `Content-Type: application/json` always,
//! `Authorization: Bearer <token>` only when a non-empty token is given, then
//! caller headers merged over both.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, FALLBACK_MESSAGE};
use crate::http::{merge_header, HttpRequest, HttpResponse, RequestOptions};
use crate::types::{
    AuthTokens, LoginUser, Post, PostCreate, Recipe, RecipeCreate, RegisterUser, User,
};

/// Development API root used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

pub const DEFAULT_SKIP: i64 = 0;
pub const DEFAULT_LIMIT: i64 = 100;

/// Synchronous, stateless client for the Dawn Eats API.
#[derive(Debug, Clone)]
pub struct DawnClient {
    base_url: String,
}

impl Default for DawnClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl DawnClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Compose a request for `path` (which must start with `/`).
    pub fn build_request(
        &self,
        token: Option<&str>,
        path: &str,
        options: RequestOptions,
    ) -> HttpRequest {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        for (name, value) in options.headers {
            merge_header(&mut headers, name, value);
        }
        HttpRequest {
            method: options.method,
            url: format!("{}{path}", self.base_url),
            headers,
            body: options.body,
        }
    }

    fn build_json<B: Serialize>(
        &self,
        token: Option<&str>,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.build_request(token, path, RequestOptions::post(body)))
    }

    // -- auth ---------------------------------------------------------------

    pub fn build_register(
        &self,
        token: Option<&str>,
        input: &RegisterUser,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(token, "/users/register", input)
    }

    pub fn build_login(
        &self,
        token: Option<&str>,
        input: &LoginUser,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(token, "/users/login", input)
    }

    pub fn build_get_profile(&self, token: Option<&str>) -> HttpRequest {
        self.build_request(token, "/users/profile", RequestOptions::get())
    }

    // -- posts --------------------------------------------------------------

    /// `skip` and `limit` are forwarded verbatim; the server owns bounds.
    pub fn build_get_posts(&self, token: Option<&str>, skip: i64, limit: i64) -> HttpRequest {
        let path = format!("/posts?skip={skip}&limit={limit}");
        self.build_request(token, &path, RequestOptions::get())
    }

    pub fn build_create_post(
        &self,
        token: Option<&str>,
        input: &PostCreate,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(token, "/posts", input)
    }

    pub fn build_get_post(&self, token: Option<&str>, id: i64) -> HttpRequest {
        self.build_request(token, &format!("/posts/{id}"), RequestOptions::get())
    }

    // -- recipes ------------------------------------------------------------

    pub fn build_get_recipes(&self, token: Option<&str>, skip: i64, limit: i64) -> HttpRequest {
        let path = format!("/recipes?skip={skip}&limit={limit}");
        self.build_request(token, &path, RequestOptions::get())
    }

    pub fn build_create_recipe(
        &self,
        token: Option<&str>,
        input: &RecipeCreate,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(token, "/recipes", input)
    }

    pub fn build_get_recipe(&self, token: Option<&str>, id: i64) -> HttpRequest {
        self.build_request(token, &format!("/recipes/{id}"), RequestOptions::get())
    }

    // -- parsing ------------------------------------------------------------

    /// Check the status, then decode the body into `T`.
    pub fn parse_json<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        check_status(&response)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Parses responses from register and profile.
    pub fn parse_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        self.parse_json(response)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<AuthTokens, ApiError> {
        self.parse_json(response)
    }

    pub fn parse_posts(&self, response: HttpResponse) -> Result<Vec<Post>, ApiError> {
        self.parse_json(response)
    }

    /// Parses responses from create-post and get-post.
    pub fn parse_post(&self, response: HttpResponse) -> Result<Post, ApiError> {
        self.parse_json(response)
    }

    pub fn parse_recipes(&self, response: HttpResponse) -> Result<Vec<Recipe>, ApiError> {
        self.parse_json(response)
    }

    pub fn parse_recipe(&self, response: HttpResponse) -> Result<Recipe, ApiError> {
        self.parse_json(response)
    }
}

/// Map a non-2xx response to the matching `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::from_status(
        response.status,
        error_message(&response.body),
    ))
}

/// Pull a human-readable message out of an error body.
///
/// A string `detail` is used as-is and a non-zero number or `true` is
/// rendered as text. A list `detail` (request validation failures) is
/// flattened by joining each entry's `msg`. Anything else, including a body
/// that is not JSON, yields [`FALLBACK_MESSAGE`].
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return FALLBACK_MESSAGE.to_string();
    };
    match value.get("detail") {
        Some(serde_json::Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(serde_json::Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        Some(serde_json::Value::Bool(true)) => "true".to_string(),
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            if messages.is_empty() {
                FALLBACK_MESSAGE.to_string()
            } else {
                messages.join("; ")
            }
        }
        _ => FALLBACK_MESSAGE.to_string(),
    }
}
