//! C-ABI wrapper around `authenticating-core`.
//!
//! # Overview
//! Exposes the verification API through `extern "C"` functions in two
//! styles:
//!
//! - host-does-IO: `authsdk_build_request` turns a JSON call description
//!   into an HTTP request the host sends itself, and `authsdk_parse_response`
//!   turns the host's response into a result;
//! - library-does-IO: `authsdk_execute` blocks on the call, and
//!   `authsdk_execute_async` runs it on a worker thread and reports through
//!   a callback.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Calls are described as JSON, e.g.
//!   `{"operation":"verifyPhone","accessCode":"abc123"}`, so one entry point
//!   covers all operations.
//! - A single `FfiResult` with a tag and a JSON payload conveys success
//!   payloads and errors uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `authsdk_free_*` function to release them.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use authenticating_core::{AuthenticatingApi, Call, HttpResponse, Operation, SdkConfig};

use types::*;

/// Read a borrowed C string. `None` for null or invalid UTF-8.
fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn parse_call(call_json: *const c_char) -> Result<Call, *mut FfiResult> {
    let json = read_str(call_json).ok_or_else(|| FfiResult::null_arg("call_json"))?;
    serde_json::from_str(json).map_err(|e| FfiResult::invalid_arg(format!("invalid call: {e}")))
}

fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse::new(resp.status, read_str(resp.body).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client from a JSON configuration.
///
/// `config_json` takes the same fields as the core `SdkConfig`, e.g.
/// `{"api_key":"...","base_url":"https://api.authenticating.com/"}`.
/// Returns null if the argument is null, the configuration is invalid, or
/// an internal panic occurs. Free with `authsdk_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn authsdk_client_new(config_json: *const c_char) -> *mut FfiClient {
    catch_unwind(|| {
        let Some(json) = read_str(config_json) else {
            return std::ptr::null_mut();
        };
        let api = SdkConfig::from_json(json)
            .map_err(|e| e.to_string())
            .and_then(|config| AuthenticatingApi::new(config).map_err(|e| e.to_string()));
        let api = match api {
            Ok(api) => api,
            Err(err) => {
                tracing::warn!(error = %err, "rejected client configuration");
                return std::ptr::null_mut();
            }
        };
        match FfiClient::new(api) {
            Ok(client) => Box::into_raw(Box::new(client)),
            Err(err) => {
                tracing::warn!(error = %err, "could not start worker runtime");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `authsdk_client_new`. Safe to call with null.
///
/// Blocks until calls already running on the worker thread have finished.
#[unsafe(no_mangle)]
pub extern "C" fn authsdk_client_free(client: *mut FfiClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

/// Switch wire logging of requests and responses on or off.
#[unsafe(no_mangle)]
pub extern "C" fn authsdk_set_logging(client: *const FfiClient, enabled: bool) {
    if client.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let client = unsafe { &*client };
        client.api().set_logging(enabled);
    }));
}

// ---------------------------------------------------------------------------
// Host-does-IO
// ---------------------------------------------------------------------------

/// Build the HTTP request for a JSON call description.
///
/// The request is always a `POST` with a JSON body. Images in photo calls
/// are normalized and encoded here. Returns null on failure; when
/// `error_out` is non-null it then receives an `FfiResult` describing the
/// failure, which the caller frees with `authsdk_free_result`.
/// Free the returned request with `authsdk_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn authsdk_build_request(
    client: *const FfiClient,
    call_json: *const c_char,
    error_out: *mut *mut FfiResult,
) -> *mut FfiHttpRequest {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return Err(FfiResult::null_arg("client"));
        }
        let client = unsafe { &*client };
        let call = parse_call(call_json)?;
        let api = client.api();
        match api.prepare(&call) {
            Ok(req) => {
                api.wire_log().request(call.operation(), &req);
                Ok(FfiHttpRequest::from_core(req))
            }
            Err(err) => {
                api.wire_log().failure(call.operation(), &err);
                Err(FfiResult::from_error(&err))
            }
        }
    }))
    .unwrap_or_else(|_| Err(FfiResult::panic("panic in authsdk_build_request")));

    match outcome {
        Ok(req) => req,
        Err(result) => {
            if error_out.is_null() {
                authsdk_free_result(result);
            } else {
                unsafe { *error_out = result };
            }
            std::ptr::null_mut()
        }
    }
}

/// Parse the response the host received for `operation`.
#[unsafe(no_mangle)]
pub extern "C" fn authsdk_parse_response(
    client: *const FfiClient,
    operation: FfiOperation,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = ffi_response_to_core(unsafe { &*response });
        let operation = Operation::from(operation);
        let api = client.api();
        api.wire_log().response(operation, &resp);
        match api.client().parse_for(operation, &resp) {
            Ok(payload) => FfiResult::from_payload(payload),
            Err(err) => {
                api.wire_log().failure(operation, &err);
                FfiResult::from_error(&err)
            }
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in authsdk_parse_response"))
}

// ---------------------------------------------------------------------------
// Library-does-IO
// ---------------------------------------------------------------------------

/// Run a JSON call description to completion on the calling thread.
#[unsafe(no_mangle)]
pub extern "C" fn authsdk_execute(client: *const FfiClient, call_json: *const c_char) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        match parse_call(call_json) {
            Ok(call) => FfiResult::from_completion(client.api().execute(&call)),
            Err(result) => result,
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in authsdk_execute"))
}

/// Run a JSON call description in the background.
///
/// `callback` receives the result, its tag and `user_data`, exactly once.
/// Returns 1 when the call was scheduled (the callback will run on a worker
/// thread), 0 when it failed before scheduling (the callback already ran on
/// this thread), and -1 when `client` or `callback` was unusable (the
/// callback is not called).
#[unsafe(no_mangle)]
pub extern "C" fn authsdk_execute_async(
    client: *const FfiClient,
    call_json: *const c_char,
    callback: Option<FfiCompletionCallback>,
    user_data: *mut c_void,
) -> i32 {
    let (Some(callback), false) = (callback, client.is_null()) else {
        return -1;
    };
    catch_unwind(AssertUnwindSafe(|| {
        let client = unsafe { &*client };
        let call = match parse_call(call_json) {
            Ok(call) => call,
            Err(result) => {
                callback(result, authenticating_core::tags::ERROR, user_data);
                return 0;
            }
        };
        let user_data = UserData::new(user_data);
        let scheduled = client.dispatcher.submit(call, move |completion| {
            let tag = completion.tag();
            callback(FfiResult::from_completion(completion), tag, user_data.into_raw());
        });
        if scheduled.is_some() { 1 } else { 0 }
    }))
    .unwrap_or(-1)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `authsdk_build_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn authsdk_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Vec::from_raw_parts(req.headers, req.headers_len as usize, req.headers_len as usize)
            };
            for h in headers {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiResult` returned by any function of this library.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn authsdk_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        free_c_string(result.error_detail);
        free_c_string(result.payload_json);
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn authsdk_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::mpsc;

    const CONFIG: &str = r#"{"api_key":"test-key","base_url":"http://127.0.0.1:9"}"#;

    fn new_client(config: &str) -> *mut FfiClient {
        let config = CString::new(config).unwrap();
        authsdk_client_new(config.as_ptr())
    }

    fn c_str<'a>(ptr: *const c_char) -> &'a str {
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap()
    }

    fn payload(result: &FfiResult) -> serde_json::Value {
        serde_json::from_str(c_str(result.payload_json)).unwrap()
    }

    #[test]
    fn client_new_and_free() {
        let client = new_client(CONFIG);
        assert!(!client.is_null());
        authsdk_client_free(client);
    }

    #[test]
    fn client_new_null_returns_null() {
        let client = authsdk_client_new(std::ptr::null());
        assert!(client.is_null());
    }

    #[test]
    fn client_new_rejects_missing_api_key() {
        assert!(new_client(r#"{"base_url":"http://127.0.0.1:9"}"#).is_null());
        assert!(new_client("not json").is_null());
    }

    #[test]
    fn client_free_null_is_safe() {
        authsdk_client_free(std::ptr::null_mut());
    }

    #[test]
    fn set_logging_toggles_the_client() {
        let client = new_client(CONFIG);
        authsdk_set_logging(client, true);
        assert!(unsafe { &*client }.api().logging_enabled());
        authsdk_set_logging(client, false);
        assert!(!unsafe { &*client }.api().logging_enabled());
        authsdk_set_logging(std::ptr::null(), true);
        authsdk_client_free(client);
    }

    #[test]
    fn build_verify_phone_request() {
        let client = new_client(CONFIG);
        let call = CString::new(r#"{"operation":"verifyPhone","accessCode":"abc123"}"#).unwrap();
        let req = authsdk_build_request(client, call.as_ptr(), std::ptr::null_mut());
        assert!(!req.is_null());

        let r = unsafe { &*req };
        assert_eq!(c_str(r.url), "http://127.0.0.1:9/api/v2/verifyPhone");
        let body: serde_json::Value = serde_json::from_str(c_str(r.body)).unwrap();
        assert_eq!(body, serde_json::json!({"accessCode": "abc123"}));

        let headers = unsafe { std::slice::from_raw_parts(r.headers, r.headers_len as usize) };
        let auth = headers
            .iter()
            .find(|h| c_str(h.key) == "authKey")
            .map(|h| c_str(h.value));
        assert_eq!(auth, Some("test-key"));

        authsdk_free_request(req);
        authsdk_client_free(client);
    }

    #[test]
    fn build_with_blank_access_code_reports_precondition() {
        let client = new_client(CONFIG);
        let call = CString::new(r#"{"operation":"getQuiz","accessCode":" "}"#).unwrap();
        let mut error: *mut FfiResult = std::ptr::null_mut();
        let req = authsdk_build_request(client, call.as_ptr(), &mut error);
        assert!(req.is_null());
        assert!(!error.is_null());

        let e = unsafe { &*error };
        assert_eq!(e.error_code, FfiErrorCode::Precondition);
        assert_eq!(e.tag, 19001);
        assert_eq!(c_str(e.error_message), "You must include the AccessCode in this call");
        assert!(e.payload_json.is_null());

        authsdk_free_result(error);
        authsdk_client_free(client);
    }

    #[test]
    fn build_with_unknown_operation_is_invalid_arg() {
        let client = new_client(CONFIG);
        let call = CString::new(r#"{"operation":"launchRocket"}"#).unwrap();
        let mut error: *mut FfiResult = std::ptr::null_mut();
        assert!(authsdk_build_request(client, call.as_ptr(), &mut error).is_null());
        assert_eq!(unsafe { &*error }.error_code, FfiErrorCode::InvalidArg);
        authsdk_free_result(error);
        authsdk_client_free(client);
    }

    #[test]
    fn build_null_client_returns_null() {
        let call = CString::new(r#"{"operation":"verifyEmail","accessCode":"a"}"#).unwrap();
        let req = authsdk_build_request(std::ptr::null(), call.as_ptr(), std::ptr::null_mut());
        assert!(req.is_null());
    }

    #[test]
    fn parse_simple_response_success() {
        let client = new_client(CONFIG);
        let body = CString::new(r#"{"successful":true,"data":{"resultMessage":"sent"}}"#).unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let result = authsdk_parse_response(client, FfiOperation::VerifyPhone, &resp);
        assert!(!result.is_null());

        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());
        assert_eq!(r.tag, 19000);
        assert_eq!(payload(r)["resultMessage"], "sent");

        authsdk_free_result(result);
        authsdk_client_free(client);
    }

    #[test]
    fn parse_nested_error_envelope() {
        let client = new_client(CONFIG);
        let body =
            CString::new(r#"{"error":{"errorMessage":"missing address","missingInfo":["address"]}}"#).unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let result = authsdk_parse_response(client, FfiOperation::GetQuiz, &resp);

        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Domain);
        assert_eq!(r.tag, 19001);
        assert_eq!(c_str(r.error_message), "missing address");

        authsdk_free_result(result);
        authsdk_client_free(client);
    }

    #[test]
    fn parse_html_page_is_parse_failure() {
        let client = new_client(CONFIG);
        let body = CString::new("<html><body>gateway</body></html>").unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let result = authsdk_parse_response(client, FfiOperation::GetUser, &resp);

        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Parse);
        assert_eq!(r.tag, 3311);

        authsdk_free_result(result);
        authsdk_client_free(client);
    }

    #[test]
    fn parse_unauthorized_status() {
        let client = new_client(CONFIG);
        let body = CString::new("<html>401</html>").unwrap();
        let resp = FfiHttpResponse {
            status: 401,
            body: body.as_ptr(),
        };
        let result = authsdk_parse_response(client, FfiOperation::CheckUploadId, &resp);

        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Http);
        assert_eq!(r.http_status, 401);

        authsdk_free_result(result);
        authsdk_client_free(client);
    }

    #[test]
    fn parse_null_arguments() {
        let client = new_client(CONFIG);
        let result = authsdk_parse_response(client, FfiOperation::GetUser, std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        authsdk_free_result(result);

        let body = CString::new("{}").unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let result = authsdk_parse_response(std::ptr::null(), FfiOperation::GetUser, &resp);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        authsdk_free_result(result);
        authsdk_client_free(client);
    }

    #[test]
    fn execute_against_unreachable_host_is_transport_failure() {
        let client = new_client(CONFIG);
        let call = CString::new(r#"{"operation":"verifyEmail","accessCode":"abc123"}"#).unwrap();
        let result = authsdk_execute(client, call.as_ptr());

        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Transport);
        assert_eq!(r.tag, 3312);

        authsdk_free_result(result);
        authsdk_client_free(client);
    }

    struct Delivery {
        code: FfiErrorCode,
        tag: i32,
        payload: Option<String>,
    }

    extern "C" fn deliver(result: *mut FfiResult, tag: i32, user_data: *mut c_void) {
        let tx = unsafe { &*(user_data as *const mpsc::Sender<Delivery>) };
        let r = unsafe { &*result };
        let payload = (!r.payload_json.is_null()).then(|| c_str(r.payload_json).to_string());
        let _ = tx.send(Delivery {
            code: r.error_code,
            tag,
            payload,
        });
        authsdk_free_result(result);
    }

    #[test]
    fn execute_async_precondition_runs_callback_inline() {
        let client = new_client(CONFIG);
        let (tx, rx) = mpsc::channel::<Delivery>();
        let call = CString::new(r#"{"operation":"verifyPhone","accessCode":""}"#).unwrap();
        let status = authsdk_execute_async(
            client,
            call.as_ptr(),
            Some(deliver),
            &tx as *const _ as *mut c_void,
        );
        assert_eq!(status, 0);
        let d = rx.try_recv().unwrap();
        assert_eq!(d.code, FfiErrorCode::Precondition);
        assert_eq!(d.tag, 19001);
        authsdk_client_free(client);
    }

    #[test]
    fn execute_async_without_callback_is_rejected() {
        let client = new_client(CONFIG);
        let call = CString::new(r#"{"operation":"verifyPhone","accessCode":"a"}"#).unwrap();
        assert_eq!(authsdk_execute_async(client, call.as_ptr(), None, std::ptr::null_mut()), -1);
        authsdk_client_free(client);
    }

    #[test]
    fn execute_async_against_mock_server() {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let listener = rt.block_on(tokio::net::TcpListener::bind("127.0.0.1:0")).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = mock_server::MockState::new(
            mock_server::DEFAULT_API_KEY,
            mock_server::Store::default().with_session("abc123", mock_server::Session::new(Default::default())),
        );
        std::thread::spawn(move || rt.block_on(mock_server::run_with(listener, state)));

        let client = new_client(&format!(r#"{{"api_key":"test-key","base_url":"http://{addr}"}}"#));
        let (tx, rx) = mpsc::channel::<Delivery>();
        let call = CString::new(r#"{"operation":"getAvailableNetworks","accessCode":"abc123"}"#).unwrap();
        let status = authsdk_execute_async(
            client,
            call.as_ptr(),
            Some(deliver),
            &tx as *const _ as *mut c_void,
        );
        assert_eq!(status, 1);

        let d = rx.recv_timeout(std::time::Duration::from_secs(10)).unwrap();
        assert_eq!(d.code, FfiErrorCode::Ok);
        assert_eq!(d.tag, 19002);
        let payload: serde_json::Value = serde_json::from_str(&d.payload.unwrap()).unwrap();
        assert!(payload["availableNetworks"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n == "facebook"));

        authsdk_client_free(client);
    }

    #[test]
    fn free_request_null_is_safe() {
        authsdk_free_request(std::ptr::null_mut());
    }

    #[test]
    fn free_result_null_is_safe() {
        authsdk_free_result(std::ptr::null_mut());
    }

    #[test]
    fn free_string_null_is_safe() {
        authsdk_free_string(std::ptr::null_mut());
    }

    #[test]
    fn header_is_generated_into_out_dir() {
        let path = std::path::Path::new(env!("AUTHSDK_HEADER"));
        assert!(path.starts_with(env!("OUT_DIR")));
        let header = std::fs::read_to_string(path).unwrap();
        assert!(header.contains("AUTHSDK_H"));
        for function in ["authsdk_client_new", "authsdk_execute_async", "authsdk_free_result"] {
            assert!(header.contains(function), "{function} missing from header");
        }
    }
}
