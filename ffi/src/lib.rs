//! C-ABI bridge from the mobile host to `dawn-core`.
//!
//! # Overview
//! The iOS/Android shell keeps its own HTTP stack. Through these `extern "C"`
//! functions it asks the core to build each request (URL, headers including
//! the bearer token, JSON body), executes it natively, and hands the raw
//! status and body back for validation and error classification.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - The client handle owns an in-memory `Session`. The host persists the
//!   token in Keychain/Keystore and restores it with
//!   `dawn_session_set_token` on launch.
//! - One `FfiDawnResult` envelope conveys success payloads (as JSON) and
//!   errors uniformly.
//! - The caller owns all returned pointers and must release them with the
//!   matching `dawn_free_*` function.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use dawn_core::{
    ApiError, DawnClient, HttpRequest, HttpResponse, LoginUser, PostCreate, RecipeCreate,
    RegisterUser, Session,
};
use log::warn;
use serde::Serialize;

use types::*;

/// Copy a nullable C string. Null or invalid UTF-8 yields `None`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn opt_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(str::to_string)
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client bound to `base_url` with an empty session.
///
/// Returns null if `base_url` is null or not UTF-8.
/// The caller must free the returned pointer with `dawn_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_client_new(base_url: *const c_char) -> *mut FfiDawnClient {
    catch_unwind(|| {
        let Some(url) = (unsafe { opt_string(base_url) }) else {
            return std::ptr::null_mut();
        };
        Box::into_raw(Box::new(FfiDawnClient {
            inner: DawnClient::new(&url),
            session: Session::in_memory(),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `dawn_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_client_free(client: *mut FfiDawnClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Store `token` as the session credential. Returns false on null input.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_session_set_token(client: *const FfiDawnClient, token: *const c_char) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return false;
        }
        let client = unsafe { &*client };
        match unsafe { opt_string(token) } {
            Some(token) => {
                client.session.set(&token);
                true
            }
            None => false,
        }
    }))
    .unwrap_or(false)
}

/// Forget the session credential. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_session_clear_token(client: *const FfiDawnClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            unsafe { &*client }.session.clear();
        }));
    }
}

/// Current session token, or null when signed out.
/// Free the returned string with `dawn_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_session_get_token(client: *const FfiDawnClient) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        match unsafe { &*client }.session.get() {
            Some(token) => to_c_string(token),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Run `build` with the client and its current token.
///
/// Null `client`, a `None` from `build` and panics all yield null.
fn build_with<F>(client: *const FfiDawnClient, build: F) -> *mut FfiHttpRequest
where
    F: FnOnce(&DawnClient, Option<&str>) -> Option<HttpRequest>,
{
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let token = client.session.get();
        match build(&client.inner, token.as_deref()) {
            Some(req) => FfiHttpRequest::from_core(req),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Build `POST /users/register`. Returns null if any argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_build_register(
    client: *const FfiDawnClient,
    username: *const c_char,
    email: *const c_char,
    password: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c, token| {
        let input = RegisterUser {
            username: unsafe { opt_string(username) }?,
            email: unsafe { opt_string(email) }?,
            password: unsafe { opt_string(password) }?,
        };
        c.build_register(token, &input).ok()
    })
}

/// Build `POST /users/login`. Returns null if any argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_build_login(
    client: *const FfiDawnClient,
    email: *const c_char,
    password: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c, token| {
        let input = LoginUser {
            email: unsafe { opt_string(email) }?,
            password: unsafe { opt_string(password) }?,
        };
        c.build_login(token, &input).ok()
    })
}

/// Build `GET /users/profile`.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_build_get_profile(client: *const FfiDawnClient) -> *mut FfiHttpRequest {
    build_with(client, |c, token| Some(c.build_get_profile(token)))
}

/// Build `GET /posts?skip=..&limit=..`. Values are passed through unchecked.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_build_get_posts(
    client: *const FfiDawnClient,
    skip: i64,
    limit: i64,
) -> *mut FfiHttpRequest {
    build_with(client, |c, token| Some(c.build_get_posts(token, skip, limit)))
}

/// Build `POST /posts`.
///
/// `description` and `image_url` may be null to omit them.
/// Returns null if `client` or `title` is null.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_build_create_post(
    client: *const FfiDawnClient,
    title: *const c_char,
    description: *const c_char,
    image_url: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c, token| {
        let input = PostCreate {
            title: unsafe { opt_string(title) }?,
            description: unsafe { opt_string(description) },
            image_url: unsafe { opt_string(image_url) },
        };
        c.build_create_post(token, &input).ok()
    })
}

/// Build `GET /posts/{id}`.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_build_get_post(client: *const FfiDawnClient, id: i64) -> *mut FfiHttpRequest {
    build_with(client, |c, token| Some(c.build_get_post(token, id)))
}

/// Build `GET /recipes?skip=..&limit=..`.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_build_get_recipes(
    client: *const FfiDawnClient,
    skip: i64,
    limit: i64,
) -> *mut FfiHttpRequest {
    build_with(client, |c, token| Some(c.build_get_recipes(token, skip, limit)))
}

/// Build `POST /recipes` from a JSON `RecipeCreate` document.
///
/// Returns null if `recipe_json` is null or does not describe a recipe
/// (for example, a missing `title`).
#[unsafe(no_mangle)]
pub extern "C" fn dawn_build_create_recipe(
    client: *const FfiDawnClient,
    recipe_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c, token| {
        let raw = unsafe { opt_string(recipe_json) }?;
        let input: RecipeCreate = match serde_json::from_str(&raw) {
            Ok(input) => input,
            Err(e) => {
                warn!("rejected recipe payload: {e}");
                return None;
            }
        };
        c.build_create_recipe(token, &input).ok()
    })
}

/// Build `GET /recipes/{id}`.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_build_get_recipe(
    client: *const FfiDawnClient,
    id: i64,
) -> *mut FfiHttpRequest {
    build_with(client, |c, token| Some(c.build_get_recipe(token, id)))
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body reads
/// as empty.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = unsafe { opt_string(resp.body) }.unwrap_or_default();
    HttpResponse::new(resp.status, body)
}

fn parse_with<T, F>(
    client: *const FfiDawnClient,
    response: *const FfiHttpResponse,
    op: &str,
    parse: F,
) -> *mut FfiDawnResult
where
    T: Serialize,
    F: FnOnce(&DawnClient, HttpResponse) -> Result<T, ApiError>,
{
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiDawnResult::null_arg("client");
        }
        if response.is_null() {
            return FfiDawnResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let core_resp = ffi_response_to_core(unsafe { &*response });
        match parse(&client.inner, core_resp) {
            Ok(value) => FfiDawnResult::ok(&value),
            Err(e) => {
                warn!("{op}: {e}");
                FfiDawnResult::from_error(e)
            }
        }
    }))
    .unwrap_or_else(|_| FfiDawnResult::panic(&format!("panic in {op}")))
}

/// Parse a register or profile response into a `User`.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_parse_user(
    client: *const FfiDawnClient,
    response: *const FfiHttpResponse,
) -> *mut FfiDawnResult {
    parse_with(client, response, "dawn_parse_user", DawnClient::parse_user)
}

/// Parse a login response into `{access_token, token_type}`.
///
/// The token is not stored; call `dawn_session_set_token` with it.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_parse_login(
    client: *const FfiDawnClient,
    response: *const FfiHttpResponse,
) -> *mut FfiDawnResult {
    parse_with(client, response, "dawn_parse_login", DawnClient::parse_login)
}

#[unsafe(no_mangle)]
pub extern "C" fn dawn_parse_posts(
    client: *const FfiDawnClient,
    response: *const FfiHttpResponse,
) -> *mut FfiDawnResult {
    parse_with(client, response, "dawn_parse_posts", DawnClient::parse_posts)
}

/// Parse a create-post or get-post response.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_parse_post(
    client: *const FfiDawnClient,
    response: *const FfiHttpResponse,
) -> *mut FfiDawnResult {
    parse_with(client, response, "dawn_parse_post", DawnClient::parse_post)
}

#[unsafe(no_mangle)]
pub extern "C" fn dawn_parse_recipes(
    client: *const FfiDawnClient,
    response: *const FfiHttpResponse,
) -> *mut FfiDawnResult {
    parse_with(client, response, "dawn_parse_recipes", DawnClient::parse_recipes)
}

/// Parse a create-recipe or get-recipe response.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_parse_recipe(
    client: *const FfiDawnClient,
    response: *const FfiHttpResponse,
) -> *mut FfiDawnResult {
    parse_with(client, response, "dawn_parse_recipe", DawnClient::parse_recipe)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `dawn_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.url.is_null() {
            drop(unsafe { CString::from_raw(req.url) });
        }
        if !req.body.is_null() {
            drop(unsafe { CString::from_raw(req.body) });
        }
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                if !h.key.is_null() {
                    drop(unsafe { CString::from_raw(h.key) });
                }
                if !h.value.is_null() {
                    drop(unsafe { CString::from_raw(h.value) });
                }
            }
        }
    }));
}

/// Free an `FfiDawnResult` returned by any `dawn_parse_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_free_result(result: *mut FfiDawnResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.data_json.is_null() {
            drop(unsafe { CString::from_raw(result.data_json) });
        }
    }));
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dawn_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { CString::from_raw(s) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const USER_JSON: &str = r#"{"id":1,"username":"li","email":"li@campus.edu","created_at":"2024-03-01T07:00:00","updated_at":null}"#;

    fn new_client() -> *mut FfiDawnClient {
        let url = CString::new("http://localhost:8000/api/v1").unwrap();
        let client = dawn_client_new(url.as_ptr());
        assert!(!client.is_null());
        client
    }

    fn c_str(ptr: *const c_char) -> &'static str {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap()
    }

    fn headers_of(req: &FfiHttpRequest) -> Vec<(String, String)> {
        if req.headers.is_null() {
            return Vec::new();
        }
        unsafe { std::slice::from_raw_parts(req.headers, req.headers_len as usize) }
            .iter()
            .map(|h| (c_str(h.key).to_string(), c_str(h.value).to_string()))
            .collect()
    }

    fn parse(
        f: extern "C" fn(*const FfiDawnClient, *const FfiHttpResponse) -> *mut FfiDawnResult,
        status: u16,
        body: &str,
    ) -> *mut FfiDawnResult {
        let client = new_client();
        let body = CString::new(body).unwrap();
        let resp = FfiHttpResponse {
            status,
            body: body.as_ptr(),
        };
        let result = f(client, &resp);
        dawn_client_free(client);
        assert!(!result.is_null());
        result
    }

    #[test]
    fn client_new_null_returns_null() {
        assert!(dawn_client_new(std::ptr::null()).is_null());
    }

    #[test]
    fn client_free_null_is_safe() {
        dawn_client_free(std::ptr::null_mut());
        dawn_free_request(std::ptr::null_mut());
        dawn_free_result(std::ptr::null_mut());
        dawn_free_string(std::ptr::null_mut());
    }

    #[test]
    fn session_token_set_get_clear() {
        let client = new_client();
        assert!(dawn_session_get_token(client).is_null());

        let token = CString::new("tok-1").unwrap();
        assert!(dawn_session_set_token(client, token.as_ptr()));
        let stored = dawn_session_get_token(client);
        assert_eq!(c_str(stored), "tok-1");
        dawn_free_string(stored);

        dawn_session_clear_token(client);
        assert!(dawn_session_get_token(client).is_null());
        assert!(!dawn_session_set_token(client, std::ptr::null()));
        dawn_client_free(client);
    }

    #[test]
    fn build_get_posts_anonymous() {
        let client = new_client();
        let req = dawn_build_get_posts(client, 10, 5);
        assert!(!req.is_null());
        let r = unsafe { &*req };
        assert!(matches!(r.method, FfiHttpMethod::Get));
        assert_eq!(c_str(r.url), "http://localhost:8000/api/v1/posts?skip=10&limit=5");
        assert!(r.body.is_null());
        assert_eq!(
            headers_of(r),
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
        dawn_free_request(req);
        dawn_client_free(client);
    }

    #[test]
    fn build_uses_session_token() {
        let client = new_client();
        let token = CString::new("abc").unwrap();
        dawn_session_set_token(client, token.as_ptr());

        let req = dawn_build_get_profile(client);
        let r = unsafe { &*req };
        assert_eq!(c_str(r.url), "http://localhost:8000/api/v1/users/profile");
        assert!(headers_of(r).contains(&("Authorization".to_string(), "Bearer abc".to_string())));
        dawn_free_request(req);
        dawn_client_free(client);
    }

    #[test]
    fn build_null_client_returns_null() {
        assert!(dawn_build_get_profile(std::ptr::null()).is_null());
        assert!(dawn_build_get_post(std::ptr::null(), 1).is_null());
    }

    #[test]
    fn build_login_requires_all_arguments() {
        let client = new_client();
        let email = CString::new("li@campus.edu").unwrap();
        assert!(dawn_build_login(client, email.as_ptr(), std::ptr::null()).is_null());

        let password = CString::new("pw").unwrap();
        let req = dawn_build_login(client, email.as_ptr(), password.as_ptr());
        assert!(!req.is_null());
        let r = unsafe { &*req };
        assert!(matches!(r.method, FfiHttpMethod::Post));
        let body: serde_json::Value = serde_json::from_str(c_str(r.body)).unwrap();
        assert_eq!(body, serde_json::json!({"email": "li@campus.edu", "password": "pw"}));
        dawn_free_request(req);
        dawn_client_free(client);
    }

    #[test]
    fn build_create_post_omits_null_fields() {
        let client = new_client();
        let title = CString::new("Youtiao").unwrap();
        let req = dawn_build_create_post(client, title.as_ptr(), std::ptr::null(), std::ptr::null());
        let r = unsafe { &*req };
        assert_eq!(c_str(r.url), "http://localhost:8000/api/v1/posts");
        let body: serde_json::Value = serde_json::from_str(c_str(r.body)).unwrap();
        assert_eq!(body, serde_json::json!({"title": "Youtiao"}));
        dawn_free_request(req);
        dawn_client_free(client);
    }

    #[test]
    fn build_create_recipe_validates_json() {
        let client = new_client();
        let bad = CString::new(r#"{"ingredients":["rice"]}"#).unwrap();
        assert!(dawn_build_create_recipe(client, bad.as_ptr()).is_null());

        let good = CString::new(r#"{"title":"Congee","ingredients":["rice","water"]}"#).unwrap();
        let req = dawn_build_create_recipe(client, good.as_ptr());
        assert!(!req.is_null());
        let body: serde_json::Value = serde_json::from_str(c_str(unsafe { &*req }.body)).unwrap();
        assert_eq!(body["ingredients"], serde_json::json!(["rice", "water"]));
        dawn_free_request(req);
        dawn_client_free(client);
    }

    #[test]
    fn parse_user_success_returns_json() {
        let result = parse(dawn_parse_user, 200, USER_JSON);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());
        let user: serde_json::Value = serde_json::from_str(c_str(r.data_json)).unwrap();
        assert_eq!(user["username"], "li");
        assert!(user.get("updated_at").is_none());
        dawn_free_result(result);
    }

    #[test]
    fn parse_posts_empty() {
        let result = parse(dawn_parse_posts, 200, "[]");
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(c_str(r.data_json), "[]");
        dawn_free_result(result);
    }

    #[test]
    fn parse_login_error_carries_detail() {
        let result = parse(dawn_parse_login, 401, r#"{"detail":"bad credentials"}"#);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Unauthorized);
        assert_eq!(r.http_status, 401);
        assert_eq!(c_str(r.error_message), "bad credentials");
        assert!(r.data_json.is_null());
        dawn_free_result(result);
    }

    #[test]
    fn parse_post_not_found() {
        let result = parse(dawn_parse_post, 404, r#"{"detail":"Post not found"}"#);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NotFound);
        assert_eq!(r.http_status, 404);
        dawn_free_result(result);
    }

    #[test]
    fn parse_recipe_wrong_shape_is_decode_error() {
        let result = parse(dawn_parse_recipe, 200, r#"{"id":1}"#);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Decode);
        assert_eq!(r.http_status, 0);
        dawn_free_result(result);
    }

    #[test]
    fn parse_null_response_is_null_arg() {
        let client = new_client();
        let result = dawn_parse_recipes(client, std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        assert_eq!(c_str(r.error_message), "null argument: response");
        dawn_free_result(result);
        dawn_client_free(client);
    }

    #[test]
    fn parse_null_body_uses_fallback_message() {
        let client = new_client();
        let resp = FfiHttpResponse {
            status: 503,
            body: std::ptr::null(),
        };
        let result = dawn_parse_posts(client, &resp);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Http);
        assert_eq!(c_str(r.error_message), "API request failed");
        dawn_free_result(result);
        dawn_client_free(client);
    }
}
