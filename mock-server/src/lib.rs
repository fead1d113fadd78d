use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub user_id: i64,
    pub author: User,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<String>,
    pub nutrition_info: Option<serde_json::Map<String, Value>>,
    pub user_id: i64,
    pub author: User,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PostCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct RecipeCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub nutrition_info: Option<serde_json::Map<String, Value>>,
}

#[derive(Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
pub struct Store {
    accounts: Vec<Account>,
    sessions: HashMap<String, i64>,
    posts: Vec<Post>,
    recipes: Vec<Recipe>,
}

pub type Db = Arc<RwLock<Store>>;

/// Error response in the `{"detail": ...}` shape.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    detail: Value,
}

impl ApiFailure {
    fn new(status: StatusCode, detail: &str) -> Self {
        Self {
            status,
            detail: Value::String(detail.to_string()),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Could not validate credentials")
    }

    /// 422 with a single-entry validation list located at `loc`.
    fn unprocessable(loc: &str, msg: String) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: json!([{
                "loc": [loc],
                "msg": msg,
                "type": "value_error",
            }]),
        }
    }

    fn invalid_body(rejection: JsonRejection) -> Self {
        Self::unprocessable("body", rejection.body_text())
    }

    fn invalid_path(rejection: PathRejection) -> Self {
        Self::unprocessable("path", rejection.body_text())
    }

    fn invalid_query(rejection: QueryRejection) -> Self {
        Self::unprocessable("query", rejection.body_text())
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(json!({ "detail": self.detail }))).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

pub fn app() -> Router {
    app_with_state(Db::default())
}

pub fn app_with_state(db: Db) -> Router {
    let api = Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/profile", get(profile))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post))
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/{id}", get(get_recipe));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest(API_PREFIX, api)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn authenticate(store: &Store, headers: &HeaderMap) -> Result<User, ApiFailure> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(ApiFailure::unauthorized)?;
    let user_id = store.sessions.get(token).ok_or_else(ApiFailure::unauthorized)?;
    store
        .accounts
        .iter()
        .find(|a| a.user.id == *user_id)
        .map(|a| a.user.clone())
        .ok_or_else(ApiFailure::unauthorized)
}

fn page<T: Clone>(items: &[T], page: &Page) -> Vec<T> {
    let skip = page.skip.max(0) as usize;
    let limit = page.limit.max(0) as usize;
    items.iter().skip(skip).take(limit).cloned().collect()
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Dawn Eats API" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Dawn Eats API is running" }))
}

async fn register(
    State(db): State<Db>,
    body: Result<Json<RegisterUser>, JsonRejection>,
) -> Result<Json<User>, ApiFailure> {
    let Json(input) = body.map_err(ApiFailure::invalid_body)?;
    let mut store = db.write().await;
    if store
        .accounts
        .iter()
        .any(|a| a.user.email == input.email || a.user.username == input.username)
    {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "Email or username already registered",
        ));
    }

    let user = User {
        id: store.accounts.len() as i64 + 1,
        username: input.username,
        email: input.email,
        created_at: now(),
        updated_at: None,
    };
    store.accounts.push(Account {
        user: user.clone(),
        password: input.password,
    });
    info!("{} registered", user.username);
    Ok(Json(user))
}

async fn login(
    State(db): State<Db>,
    body: Result<Json<LoginUser>, JsonRejection>,
) -> Result<Json<Token>, ApiFailure> {
    let Json(input) = body.map_err(ApiFailure::invalid_body)?;
    let mut store = db.write().await;
    let (user_id, username) = store
        .accounts
        .iter()
        .find(|a| a.user.email == input.email && a.password == input.password)
        .map(|a| (a.user.id, a.user.username.clone()))
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "Incorrect email or password"))?;

    let access_token = Uuid::new_v4().to_string();
    store.sessions.insert(access_token.clone(), user_id);
    info!("{username} login: new session created");
    Ok(Json(Token {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

async fn profile(State(db): State<Db>, headers: HeaderMap) -> Result<Json<User>, ApiFailure> {
    let store = db.read().await;
    authenticate(&store, &headers).map(Json)
}

async fn list_posts(
    State(db): State<Db>,
    query: Result<Query<Page>, QueryRejection>,
) -> Result<Json<Vec<Post>>, ApiFailure> {
    let Query(p) = query.map_err(ApiFailure::invalid_query)?;
    let store = db.read().await;
    Ok(Json(page(&store.posts, &p)))
}

async fn create_post(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Result<Json<PostCreate>, JsonRejection>,
) -> Result<Json<Post>, ApiFailure> {
    let mut store = db.write().await;
    let author = authenticate(&store, &headers)?;
    let Json(input) = body.map_err(ApiFailure::invalid_body)?;

    let post = Post {
        id: store.posts.len() as i64 + 1,
        title: input.title,
        description: input.description,
        image_url: input.image_url,
        user_id: author.id,
        author,
        created_at: now(),
        updated_at: None,
    };
    store.posts.push(post.clone());
    info!("{} created post {}", post.author.username, post.id);
    Ok(Json(post))
}

async fn get_post(
    State(db): State<Db>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Post>, ApiFailure> {
    let Path(id) = path.map_err(ApiFailure::invalid_path)?;
    let store = db.read().await;
    store
        .posts
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Post not found"))
}

async fn list_recipes(
    State(db): State<Db>,
    query: Result<Query<Page>, QueryRejection>,
) -> Result<Json<Vec<Recipe>>, ApiFailure> {
    let Query(p) = query.map_err(ApiFailure::invalid_query)?;
    let store = db.read().await;
    Ok(Json(page(&store.recipes, &p)))
}

async fn create_recipe(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Result<Json<RecipeCreate>, JsonRejection>,
) -> Result<Json<Recipe>, ApiFailure> {
    let mut store = db.write().await;
    let author = authenticate(&store, &headers)?;
    let Json(input) = body.map_err(ApiFailure::invalid_body)?;

    let recipe = Recipe {
        id: store.recipes.len() as i64 + 1,
        title: input.title,
        description: input.description,
        ingredients: input.ingredients,
        instructions: input.instructions,
        nutrition_info: input.nutrition_info,
        user_id: author.id,
        author,
        created_at: now(),
        updated_at: None,
    };
    store.recipes.push(recipe.clone());
    info!("{} created recipe {}", recipe.author.username, recipe.id);
    Ok(Json(recipe))
}

async fn get_recipe(
    State(db): State<Db>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Recipe>, ApiFailure> {
    let Path(id) = path.map_err(ApiFailure::invalid_path)?;
    let store = db.read().await;
    store
        .recipes
        .iter()
        .find(|r| r.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Recipe not found"))
}
