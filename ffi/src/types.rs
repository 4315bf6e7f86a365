//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Requests cross as plain C strings and a header array. Results cross as
//! one `FfiResult` shape for every operation: an error code plus message
//! and detail on failure, or the operation tag plus the payload as a JSON
//! string on success. Hosts already carry a JSON decoder, so payload DTOs
//! are not mirrored field by field.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use authenticating_core::{ApiError, AuthenticatingApi, Completion, Dispatcher, ErrorKind, Operation, Payload};

/// Opaque handle. C callers receive a pointer to this and pass it back into
/// every FFI function.
pub struct FfiClient {
    pub(crate) dispatcher: Dispatcher,
    // Owns the worker threads behind `dispatcher`; dropped last.
    pub(crate) _runtime: tokio::runtime::Runtime,
}

impl FfiClient {
    pub(crate) fn new(api: AuthenticatingApi) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("authsdk-worker")
            .build()?;
        Ok(Self {
            dispatcher: Dispatcher::new(api, runtime.handle().clone()),
            _runtime: runtime,
        })
    }

    pub(crate) fn api(&self) -> &AuthenticatingApi {
        self.dispatcher.api()
    }
}

/// Copy `s` into a freshly allocated C string, dropping interior NULs.
pub(crate) fn c_string(s: impl Into<String>) -> *mut c_char {
    let mut s = s.into();
    s.retain(|c| c != '\0');
    CString::new(s).unwrap_or_default().into_raw()
}

pub(crate) fn c_string_opt(s: Option<String>) -> *mut c_char {
    s.map_or(std::ptr::null_mut(), c_string)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Remote operation, used to pick the parser for a host-executed response.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiOperation {
    VerifyPhone = 0,
    VerifyPhoneCode = 1,
    VerifyEmail = 2,
    VerifySocialNetworks = 3,
    GetAvailableNetworks = 4,
    GetQuiz = 5,
    VerifyQuiz = 6,
    GenerateCriminalReport = 7,
    GetUser = 8,
    UpdateUser = 9,
    AuthenticateProfile = 10,
    ComparePhotos = 11,
    UploadId = 12,
    UploadIdEnhanced = 13,
    UploadPassport = 14,
    CheckUploadId = 15,
    CheckUploadPassport = 16,
}

impl From<FfiOperation> for Operation {
    fn from(op: FfiOperation) -> Self {
        match op {
            FfiOperation::VerifyPhone => Operation::VerifyPhone,
            FfiOperation::VerifyPhoneCode => Operation::VerifyPhoneCode,
            FfiOperation::VerifyEmail => Operation::VerifyEmail,
            FfiOperation::VerifySocialNetworks => Operation::VerifySocialNetworks,
            FfiOperation::GetAvailableNetworks => Operation::GetAvailableNetworks,
            FfiOperation::GetQuiz => Operation::GetQuiz,
            FfiOperation::VerifyQuiz => Operation::VerifyQuiz,
            FfiOperation::GenerateCriminalReport => Operation::GenerateCriminalReport,
            FfiOperation::GetUser => Operation::GetUser,
            FfiOperation::UpdateUser => Operation::UpdateUser,
            FfiOperation::AuthenticateProfile => Operation::AuthenticateProfile,
            FfiOperation::ComparePhotos => Operation::ComparePhotos,
            FfiOperation::UploadId => Operation::UploadId,
            FfiOperation::UploadIdEnhanced => Operation::UploadIdEnhanced,
            FfiOperation::UploadPassport => Operation::UploadPassport,
            FfiOperation::CheckUploadId => Operation::CheckUploadId,
            FfiOperation::CheckUploadPassport => Operation::CheckUploadPassport,
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// A request for the host to execute. Always a `POST` with a JSON body.
#[repr(C)]
pub struct FfiHttpRequest {
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: authenticating_core::HttpRequest) -> *mut Self {
        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };
        Box::into_raw(Box::new(FfiHttpRequest {
            url: c_string(req.url),
            headers,
            headers_len,
            body: c_string(req.body),
        }))
    }
}

/// A response the host received. Read but never freed by this library.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Precondition = 1,
    Domain = 2,
    Http = 3,
    Parse = 4,
    Transport = 5,
    Resource = 6,
    Panic = 7,
    NullArg = 8,
    InvalidArg = 9,
}

/// Result of a parse or execute call.
///
/// On success `error_code` is `Ok`, `tag` is the payload tag (19000..19005)
/// and `payload_json` holds the payload. On failure `tag` is 19001, 3311 or
/// 3312, `error_message` is always set and `error_detail` may be null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub error_detail: *mut c_char,
    pub http_status: u16,
    pub tag: i32,
    pub payload_json: *mut c_char,
}

impl FfiResult {
    fn boxed(result: FfiResult) -> *mut Self {
        Box::into_raw(Box::new(result))
    }

    pub(crate) fn from_completion(completion: Completion) -> *mut Self {
        match completion.outcome {
            Ok(payload) => Self::from_payload(payload),
            Err(err) => Self::from_error(&err),
        }
    }

    pub(crate) fn from_payload(payload: Payload) -> *mut Self {
        let tag = payload.tag();
        match serde_json::to_string(&payload) {
            Ok(json) => Self::boxed(FfiResult {
                error_code: FfiErrorCode::Ok,
                error_message: std::ptr::null_mut(),
                error_detail: std::ptr::null_mut(),
                http_status: 0,
                tag,
                payload_json: c_string(json),
            }),
            Err(e) => Self::from_error(&ApiError::Serialization(e.to_string())),
        }
    }

    pub(crate) fn from_error(err: &ApiError) -> *mut Self {
        let error_code = match (err, err.kind()) {
            (ApiError::HttpStatus { .. }, _) => FfiErrorCode::Http,
            (_, ErrorKind::Precondition) => FfiErrorCode::Precondition,
            (_, ErrorKind::Domain) => FfiErrorCode::Domain,
            (_, ErrorKind::Parse) => FfiErrorCode::Parse,
            (_, ErrorKind::Transport) => FfiErrorCode::Transport,
            (_, ErrorKind::Resource) => FfiErrorCode::Resource,
        };
        let http_status = match err {
            ApiError::HttpStatus { status, .. } => *status,
            _ => 0,
        };
        Self::boxed(FfiResult {
            error_code,
            error_message: c_string(err.message()),
            error_detail: c_string_opt(err.detail()),
            http_status,
            tag: authenticating_core::operation::error_tag(err),
            payload_json: std::ptr::null_mut(),
        })
    }

    fn failure(error_code: FfiErrorCode, message: String) -> *mut Self {
        Self::boxed(FfiResult {
            error_code,
            error_message: c_string(message),
            error_detail: std::ptr::null_mut(),
            http_status: 0,
            tag: authenticating_core::tags::ERROR,
            payload_json: std::ptr::null_mut(),
        })
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, format!("null argument: {name}"))
    }

    pub(crate) fn invalid_arg(message: String) -> *mut Self {
        Self::failure(FfiErrorCode::InvalidArg, message)
    }

    pub(crate) fn panic(message: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, message.to_string())
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Completion callback for `authsdk_execute_async`.
///
/// Receives ownership of `result` (free it with `authsdk_free_result`),
/// the outcome tag and the caller's `user_data`. May run on a worker thread.
pub type FfiCompletionCallback = extern "C" fn(result: *mut FfiResult, tag: i32, user_data: *mut c_void);

/// Caller context carried to the worker thread. The caller guarantees the
/// pointer stays valid and is safe to use from another thread.
pub(crate) struct UserData(*mut c_void);

unsafe impl Send for UserData {}

impl UserData {
    pub(crate) fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub(crate) fn into_raw(self) -> *mut c_void {
        self.0
    }
}
