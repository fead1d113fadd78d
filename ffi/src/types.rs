//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Requests are exposed field by field so the host can hand them straight
//! to its HTTP stack. Parsed payloads are not mirrored as C structs: after
//! the core has validated a response against its Rust type, the value is
//! re-serialized to JSON and handed over as `data_json`, which Swift's
//! `Codable` and Kotlin's serialization decode directly.

use std::ffi::CString;
use std::os::raw::c_char;

use dawn_core::{ApiError, DawnClient, HttpMethod, HttpRequest, Session};
use serde::Serialize;

/// Opaque handle to a client plus its session. C callers receive a pointer
/// to this and pass it back into every FFI function.
pub struct FfiDawnClient {
    pub(crate) inner: DawnClient,
    pub(crate) session: Session,
}

/// Convert to an owned C string. Interior NULs yield an empty string.
pub(crate) fn to_c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `dawn_build_*` functions with the session's bearer header
/// already applied. The host executes the request and passes the response
/// back through `dawn_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let url = to_c_string(req.url);
        let body = match req.body {
            Some(b) => to_c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c_string(k),
                    value: to_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The host constructs this after executing an HTTP request, then passes a
/// pointer to a `dawn_parse_*` function. The FFI layer reads but does not
/// free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiDawnResult`.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Unauthorized = 1,
    NotFound = 2,
    Validation = 3,
    Http = 4,
    Network = 5,
    Decode = 6,
    Serialization = 7,
    Panic = 8,
    NullArg = 9,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and
/// `data_json` holds the validated payload as JSON.
/// On failure `error_code` describes the category, `error_message` is the
/// human-readable message (the server's `detail` when it sent one),
/// `http_status` is the response status or 0, and `data_json` is null.
#[repr(C)]
pub struct FfiDawnResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_json: *mut c_char,
}

impl FfiDawnResult {
    fn boxed(
        error_code: FfiErrorCode,
        error_message: *mut c_char,
        http_status: u16,
        data_json: *mut c_char,
    ) -> *mut Self {
        Box::into_raw(Box::new(FfiDawnResult {
            error_code,
            error_message,
            http_status,
            data_json,
        }))
    }

    /// Build a success result carrying `value` as JSON.
    pub(crate) fn ok<T: Serialize>(value: &T) -> *mut Self {
        match serde_json::to_string(value) {
            Ok(json) => Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), 0, to_c_string(json)),
            Err(e) => Self::from_error(ApiError::Serialization(e.to_string())),
        }
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let error_code = match &err {
            ApiError::Unauthorized { .. } => FfiErrorCode::Unauthorized,
            ApiError::NotFound { .. } => FfiErrorCode::NotFound,
            ApiError::Validation { .. } => FfiErrorCode::Validation,
            ApiError::Http { .. } => FfiErrorCode::Http,
            ApiError::Network(_) => FfiErrorCode::Network,
            ApiError::Decode(_) => FfiErrorCode::Decode,
            ApiError::Serialization(_) => FfiErrorCode::Serialization,
        };
        let http_status = err.status().unwrap_or(0);
        Self::boxed(
            error_code,
            to_c_string(err.to_string()),
            http_status,
            std::ptr::null_mut(),
        )
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(
            FfiErrorCode::NullArg,
            to_c_string(format!("null argument: {name}")),
            0,
            std::ptr::null_mut(),
        )
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::Panic, to_c_string(msg), 0, std::ptr::null_mut())
    }
}
