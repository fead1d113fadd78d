//! API and session layer for the Dawn Eats campus food-sharing app.
//!
//! # Overview
//! `DawnClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network (host-does-IO pattern). `Dispatcher` layers a
//! persisted `Session` token and a pluggable `Transport` on top of it to give
//! the async `auth` / `posts` / `recipes` resource clients the app calls.
//!
//! # Design
//! - `DawnClient` is stateless; it holds only `base_url`. The session token
//!   is an explicit argument to every `build_*` method.
//! - `Session` wraps a `TokenStore` and swallows storage failures, so an
//!   unreadable token behaves like being signed out.
//! - Every response body is decoded into its declared type at the boundary;
//!   a mismatched shape is `ApiError::Decode`, never a half-valid value.
//! - Types use owned `String` / `Vec` fields so the FFI bridge can re-export
//!   them without lifetimes.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use client::{DawnClient, DEFAULT_BASE_URL, DEFAULT_LIMIT, DEFAULT_SKIP};
pub use config::{ClientConfig, ConfigError};
pub use dispatcher::{AuthApi, Dispatcher, PostsApi, RecipesApi};
pub use error::{ApiError, FALLBACK_MESSAGE};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
pub use session::{Session, StoreError, TokenStore, TOKEN_KEY};
pub use store::{FileTokenStore, MemoryTokenStore};
pub use transport::Transport;
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use types::{
    AuthTokens, LoginUser, Post, PostCreate, Recipe, RecipeCreate, RegisterUser, User,
};
