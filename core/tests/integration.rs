//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises the client two
//! ways: the sans-IO `build_*`/`parse_*` pair executed with ureq (the path a
//! mobile host takes through the FFI bridge), and the async `Dispatcher` over
//! the `reqwest` transport.

use dawn_core::{
    ApiError, DawnClient, Dispatcher, HttpMethod, HttpRequest, HttpResponse, LoginUser,
    PostCreate, RecipeCreate, RegisterUser, ReqwestTransport, Session,
};

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data rather than `Err`, letting the core
/// client handle status interpretation.
fn execute(req: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut response = match req.method {
        HttpMethod::Get => {
            let mut builder = agent.get(&req.url);
            for (name, value) in &req.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Post => {
            let mut builder = agent.post(&req.url);
            for (name, value) in &req.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let body = req.body.clone().unwrap_or_default();
            builder.send(body.as_bytes())
        }
    }
    .expect("HTTP transport error");

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();

    HttpResponse::new(status, body)
}

/// Start the mock server on its own runtime thread and return the API root.
fn spawn_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}/api/v1")
}

#[test]
fn host_driven_lifecycle() {
    let client = DawnClient::new(&spawn_server());

    // Step 1: register.
    let input = RegisterUser {
        username: "li".to_string(),
        email: "li@campus.edu".to_string(),
        password: "pw".to_string(),
    };
    let req = client.build_register(None, &input).unwrap();
    let user = client.parse_user(execute(req)).unwrap();
    assert_eq!(user.username, "li");

    // Step 2: registering again fails with the server's message.
    let req = client.build_register(None, &input).unwrap();
    let err = client.parse_user(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::Validation { status: 400, .. }));
    assert_eq!(err.to_string(), "Email or username already registered");

    // Step 3: profile without a token is unauthorized.
    let req = client.build_get_profile(None);
    let err = client.parse_user(execute(req)).unwrap_err();
    assert!(err.is_unauthorized());

    // Step 4: login and keep the token.
    let login = LoginUser {
        email: "li@campus.edu".to_string(),
        password: "pw".to_string(),
    };
    let req = client.build_login(None, &login).unwrap();
    let tokens = client.parse_login(execute(req)).unwrap();
    let session = Session::in_memory();
    session.set(&tokens.access_token);
    assert_eq!(session.get(), Some(tokens.access_token.clone()));
    let token = session.get();

    // Step 5: profile with the token.
    let req = client.build_get_profile(token.as_deref());
    let profile = client.parse_user(execute(req)).unwrap();
    assert_eq!(profile, user);

    // Step 6: create and fetch a post.
    let req = client
        .build_create_post(
            token.as_deref(),
            &PostCreate {
                title: "Jianbing guozi".to_string(),
                description: Some("Cart by the north gate".to_string()),
                image_url: None,
            },
        )
        .unwrap();
    let created = client.parse_post(execute(req)).unwrap();
    assert_eq!(created.author, user);
    assert!(created.image_url.is_none());

    let req = client.build_get_post(token.as_deref(), created.id);
    let fetched = client.parse_post(execute(req)).unwrap();
    assert_eq!(fetched, created);

    // Step 7: unknown post is NotFound.
    let req = client.build_get_post(token.as_deref(), created.id + 100);
    let err = client.parse_post(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(err.to_string(), "Post not found");

    // Step 8: list posts, then a page past the end.
    let req = client.build_get_posts(token.as_deref(), 0, 100);
    assert_eq!(client.parse_posts(execute(req)).unwrap().len(), 1);
    let req = client.build_get_posts(token.as_deref(), 1, 100);
    assert!(client.parse_posts(execute(req)).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatcher_lifecycle() {
    let base_url = spawn_server();
    let d = Dispatcher::new(
        DawnClient::new(&base_url),
        Session::in_memory(),
        ReqwestTransport::default(),
    );

    let registered = d
        .auth()
        .register("wang", "wang@campus.edu", "secret")
        .await
        .unwrap();

    let err = d.sign_in("wang@campus.edu", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Incorrect email or password");
    assert!(!d.session().is_authenticated());

    let user = d.sign_in("wang@campus.edu", "secret").await.unwrap();
    assert_eq!(user, registered);

    let recipe = d
        .recipes()
        .create_recipe(&RecipeCreate {
            title: "Soy milk".to_string(),
            ingredients: Some(vec!["soybeans".to_string(), "water".to_string()]),
            nutrition_info: Some(
                [("calories".to_string(), serde_json::json!(120))]
                    .into_iter()
                    .collect(),
            ),
            ..RecipeCreate::default()
        })
        .await
        .unwrap();
    assert_eq!(recipe.user_id, user.id);
    assert_eq!(d.recipes().get_recipe(recipe.id).await.unwrap(), recipe);

    let (posts, recipes) = tokio::join!(d.posts().get_latest(), d.recipes().get_latest());
    assert!(posts.unwrap().is_empty());
    assert_eq!(recipes.unwrap().len(), 1);

    d.sign_out();
    let err = d.auth().get_profile().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Could not validate credentials");

    let err = d
        .posts()
        .create_post(&PostCreate {
            title: "after sign out".to_string(),
            ..PostCreate::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let d = Dispatcher::new(
        DawnClient::new(&format!("http://127.0.0.1:{port}/api/v1")),
        Session::in_memory(),
        ReqwestTransport::default(),
    );
    let err = d.posts().get_latest().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}
