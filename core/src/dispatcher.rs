//! Authenticated request dispatch and the typed resource clients.
//!
//! # Design
//! `Dispatcher` owns a `DawnClient`, a `Session` and a `Transport`. Each call
//! reads the token once, builds the request, performs a single transport
//! round trip and decodes the body into the caller's type. There is no retry
//! and no refresh: a 401 surfaces as `ApiError::Unauthorized` and the caller
//! signs in again.
//!
//! The token is read before the request is sent, so a `sign_out` that races
//! an in-flight call does not affect that call.
//!
//! Resource clients (`AuthApi`, `PostsApi`, `RecipesApi`) are `Copy` handles
//! over `&Dispatcher` and add nothing but the endpoint binding. Their methods
//! take `self`, so a future borrows the dispatcher rather than the handle and
//! `join!(d.posts().get_latest(), d.recipes().get_latest())` works directly.

use log::{debug, error, info};
use serde::de::DeserializeOwned;

use crate::client::{DawnClient, DEFAULT_LIMIT, DEFAULT_SKIP};
use crate::error::ApiError;
use crate::http::{HttpRequest, RequestOptions};
use crate::session::Session;
use crate::transport::Transport;
use crate::types::{
    AuthTokens, LoginUser, Post, PostCreate, Recipe, RecipeCreate, RegisterUser, User,
};

#[derive(Debug, Clone)]
pub struct Dispatcher<T> {
    client: DawnClient,
    session: Session,
    transport: T,
}

#[cfg(feature = "reqwest")]
impl Dispatcher<crate::transport::ReqwestTransport> {
    /// Dispatcher with a file-backed session and the `reqwest` transport.
    ///
    /// `DAWN_API_URL`, when set, wins over `config.base_url`.
    pub fn from_config(
        config: &crate::config::ClientConfig,
    ) -> Result<Self, crate::config::ConfigError> {
        let config = config.clone().with_env_overrides();
        Ok(Self::new(
            DawnClient::new(&config.base_url),
            config.file_session()?,
            crate::transport::ReqwestTransport::default(),
        ))
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(client: DawnClient, session: Session, transport: T) -> Self {
        Self {
            client,
            session,
            transport,
        }
    }

    pub fn client(&self) -> &DawnClient {
        &self.client
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn auth(&self) -> AuthApi<'_, T> {
        AuthApi { dispatcher: self }
    }

    pub fn posts(&self) -> PostsApi<'_, T> {
        PostsApi { dispatcher: self }
    }

    pub fn recipes(&self) -> RecipesApi<'_, T> {
        RecipesApi { dispatcher: self }
    }

    /// Issue `options.method` against `path` with the session credential.
    pub async fn request<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, ApiError> {
        let token = self.session.get();
        let request = self.client.build_request(token.as_deref(), path, options);
        self.send(request).await
    }

    async fn send<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        let method = request.method;
        let url = request.url.clone();
        debug!("{method} {url}");

        let result = match self.transport.execute(request).await {
            Ok(response) => self.client.parse_json(response),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            error!("API request error for {method} {url}: {e}");
        }
        result
    }

    /// Log in, persist the returned token and fetch the profile.
    ///
    /// On any failure the session is left without a token.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let tokens = self.auth().login(email, password).await?;
        self.session.set(&tokens.access_token);
        match self.auth().get_profile().await {
            Ok(user) => {
                info!("{} signed in", user.username);
                Ok(user)
            }
            Err(e) => {
                self.session.clear();
                Err(e)
            }
        }
    }

    pub fn sign_out(&self) {
        self.session.clear();
        info!("signed out");
    }
}

/// `/users/*` endpoints.
pub struct AuthApi<'a, T> {
    dispatcher: &'a Dispatcher<T>,
}

impl<T> Clone for AuthApi<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AuthApi<'_, T> {}

impl<T: Transport> AuthApi<'_, T> {
    pub async fn register(
        self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let d = self.dispatcher;
        let input = RegisterUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let token = d.session.get();
        let request = d.client.build_register(token.as_deref(), &input)?;
        d.send(request).await
    }

    /// Returns the new token pair. Persisting it is the caller's job (see
    /// `Dispatcher::sign_in`).
    pub async fn login(self, email: &str, password: &str) -> Result<AuthTokens, ApiError> {
        let d = self.dispatcher;
        let input = LoginUser {
            email: email.to_string(),
            password: password.to_string(),
        };
        let token = d.session.get();
        let request = d.client.build_login(token.as_deref(), &input)?;
        d.send(request).await
    }

    pub async fn get_profile(self) -> Result<User, ApiError> {
        let d = self.dispatcher;
        let token = d.session.get();
        d.send(d.client.build_get_profile(token.as_deref())).await
    }
}

/// `/posts` endpoints.
pub struct PostsApi<'a, T> {
    dispatcher: &'a Dispatcher<T>,
}

impl<T> Clone for PostsApi<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PostsApi<'_, T> {}

impl<T: Transport> PostsApi<'_, T> {
    pub async fn get_posts(self, skip: i64, limit: i64) -> Result<Vec<Post>, ApiError> {
        let d = self.dispatcher;
        let token = d.session.get();
        d.send(d.client.build_get_posts(token.as_deref(), skip, limit))
            .await
    }

    /// First page with the default size.
    pub async fn get_latest(self) -> Result<Vec<Post>, ApiError> {
        self.get_posts(DEFAULT_SKIP, DEFAULT_LIMIT).await
    }

    pub async fn create_post(self, input: &PostCreate) -> Result<Post, ApiError> {
        let d = self.dispatcher;
        let token = d.session.get();
        let request = d.client.build_create_post(token.as_deref(), input)?;
        d.send(request).await
    }

    pub async fn get_post(self, id: i64) -> Result<Post, ApiError> {
        let d = self.dispatcher;
        let token = d.session.get();
        d.send(d.client.build_get_post(token.as_deref(), id)).await
    }
}

/// `/recipes` endpoints.
pub struct RecipesApi<'a, T> {
    dispatcher: &'a Dispatcher<T>,
}

impl<T> Clone for RecipesApi<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RecipesApi<'_, T> {}

impl<T: Transport> RecipesApi<'_, T> {
    pub async fn get_recipes(self, skip: i64, limit: i64) -> Result<Vec<Recipe>, ApiError> {
        let d = self.dispatcher;
        let token = d.session.get();
        d.send(d.client.build_get_recipes(token.as_deref(), skip, limit))
            .await
    }

    pub async fn get_latest(self) -> Result<Vec<Recipe>, ApiError> {
        self.get_recipes(DEFAULT_SKIP, DEFAULT_LIMIT).await
    }

    pub async fn create_recipe(self, input: &RecipeCreate) -> Result<Recipe, ApiError> {
        let d = self.dispatcher;
        let token = d.session.get();
        let request = d.client.build_create_recipe(token.as_deref(), input)?;
        d.send(request).await
    }

    pub async fn get_recipe(self, id: i64) -> Result<Recipe, ApiError> {
        let d = self.dispatcher;
        let token = d.session.get();
        d.send(d.client.build_get_recipe(token.as_deref(), id)).await
    }
}
