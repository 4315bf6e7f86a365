use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_with, MockState, Profile, Session, Store, DEFAULT_API_KEY, NETWORKS, SMS_CODE};
use serde_json::{json, Value};
use tower::ServiceExt;

const CODE: &str = "abc123";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn api_request(operation: &str, body: Value) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/v2/{operation}"))
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("authKey", DEFAULT_API_KEY)
        .body(body.to_string())
        .unwrap()
}

fn profile() -> Profile {
    Profile {
        first_name: Some("Jane".into()),
        last_name: Some("Doe".into()),
        email: Some("jane@example.com".into()),
        phone: Some("2135550100".into()),
        year: Some(1980),
        month: Some(2),
        day: Some(29),
        address: Some("1 Main St".into()),
        city: Some("Springfield".into()),
        state: Some("IL".into()),
        zipcode: Some("62701".into()),
        ..Profile::default()
    }
}

fn seeded(profile: Profile) -> (Router, MockState) {
    let state = MockState::new(DEFAULT_API_KEY, Store::default().with_session(CODE, Session::new(profile)));
    (app_with(state.clone()), state)
}

async fn call(app: &Router, operation: &str, body: Value) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(api_request(operation, body)).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

// --- auth ---

#[tokio::test]
async fn missing_auth_key_returns_html_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v2/getUser")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(json!({"accessCode": CODE}).to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_bytes(resp).await;
    assert!(String::from_utf8_lossy(&body).starts_with("<!DOCTYPE html>"));
}

#[tokio::test]
async fn wrong_auth_key_returns_401() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v2/getUser")
        .header("authKey", "nope")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body("{}".to_string())
        .unwrap();
    let resp = app().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- sessions ---

#[tokio::test]
async fn missing_access_code_is_flat_error() {
    let (status, body) = call(&app(), "getUser", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["successful"], false);
    assert_eq!(body["data"]["errorMessage"], "You must include the AccessCode in this call");
}

#[tokio::test]
async fn unknown_access_code_is_404() {
    let (status, body) = call(&app(), "getUser", json!({"accessCode": "nobody"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn get_and_update_user() {
    let (app, _) = seeded(profile());
    let (status, body) = call(&app, "getUser", json!({"accessCode": CODE})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["firstName"], "Jane");
    assert_eq!(body["data"]["accessCode"], CODE);

    let (_, body) = call(&app, "updateUser", json!({"accessCode": CODE, "city": "Chicago", "ssn": "123456789"})).await;
    assert_eq!(body["data"]["city"], "Chicago");
    assert_eq!(body["data"]["lastName"], "Doe");
    assert!(body["data"].get("ssn").is_none());
}

// --- phone ---

#[tokio::test]
async fn phone_verification_flow() {
    let (app, state) = seeded(profile());
    let (_, body) = call(&app, "verifyPhone", json!({"accessCode": CODE})).await;
    assert_eq!(body["data"]["resultMessage"], "sent");

    let (status, body) = call(&app, "verifyPhoneCode", json!({"accessCode": CODE, "smsCode": "000000"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["errorMessage"], "Invalid verification code");

    let (status, _) = call(&app, "verifyPhoneCode", json!({"accessCode": CODE, "smsCode": SMS_CODE})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.session(CODE).await.unwrap().phone_verified);
}

#[tokio::test]
async fn verify_phone_without_phone_is_nested_error() {
    let (app, _) = seeded(Profile {
        phone: None,
        ..profile()
    });
    let (status, body) = call(&app, "verifyPhone", json!({"accessCode": CODE})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["missingInfo"], json!(["phone"]));
}

// --- networks ---

#[tokio::test]
async fn available_networks_is_bare_list() {
    let (app, _) = seeded(profile());
    let (_, body) = call(&app, "getAvailableNetworks", json!({"accessCode": CODE})).await;
    assert_eq!(body["data"], json!(NETWORKS));
}

#[tokio::test]
async fn social_network_must_be_supported() {
    let (app, state) = seeded(profile());
    let (status, _) = call(
        &app,
        "verifySocialNetworks",
        json!({"accessCode": CODE, "network": "myspace", "socialMediaAccessToken": "t", "socialMediaUserId": "u"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "verifySocialNetworks",
        json!({"accessCode": CODE, "network": "Google", "socialMediaAccessToken": "t", "socialMediaUserId": "u"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.session(CODE).await.unwrap().networks, vec!["google".to_string()]);
}

// --- quiz ---

#[tokio::test]
async fn quiz_requires_address() {
    let (app, _) = seeded(Profile {
        address: None,
        ..profile()
    });
    let (status, body) = call(&app, "getQuiz", json!({"accessCode": CODE})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["errorMessage"], "missing address");
}

#[tokio::test]
async fn quiz_round_trip() {
    let (app, state) = seeded(profile());
    let (_, body) = call(&app, "getQuiz", json!({"accessCode": CODE})).await;
    let quiz = &body["data"];
    assert_eq!(quiz["numQuestions"], "2");
    let answers: Vec<Value> = quiz["question"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| json!({"questionId": q["nsquestionId"], "choiceId": q["choice"][0]["nschoiceId"]}))
        .collect();

    let (status, body) = call(
        &app,
        "verifyQuiz",
        json!({"accessCode": CODE, "quizId": "wrong", "transactionID": quiz["transactionID"],
               "responseUniqueId": quiz["responseUniqueId"], "answers": answers}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["errorMessage"], "Quiz identifiers do not match the issued quiz");

    let (status, body) = call(
        &app,
        "verifyQuiz",
        json!({"accessCode": CODE, "quizId": quiz["quizId"], "transactionID": quiz["transactionID"],
               "responseUniqueId": quiz["responseUniqueId"], "answers": answers}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["resultMessage"], "passed");
    assert!(state.session(CODE).await.unwrap().quiz_passed);
}

// --- reports and profile ---

#[tokio::test]
async fn criminal_report_requires_ssn() {
    let (app, _) = seeded(profile());
    let (_, body) = call(&app, "generateCriminalReport", json!({"accessCode": CODE})).await;
    assert_eq!(body["error"]["missingInfo"], json!(["ssn"]));
}

#[tokio::test]
async fn authenticate_profile_lists_outstanding_steps() {
    let (app, _) = seeded(profile());
    let (_, body) = call(&app, "authenticateProfile", json!({"accessCode": CODE})).await;
    assert_eq!(body["error"]["missingInfo"], json!(["phoneVerification", "identityQuiz"]));
}

// --- uploads ---

#[tokio::test]
async fn upload_and_check_id() {
    let (app, _) = seeded(profile());
    let (_, body) = call(&app, "checkUploadId", json!({"accessCode": CODE})).await;
    assert_eq!(body["data"]["result"], "notUploaded");

    let (status, body) = call(&app, "uploadId", json!({"accessCode": CODE, "idFront": "QUJD"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["missingInfo"], json!(["idFront", "idBack"]));

    let (status, _) = call(&app, "uploadIdEnhanced", json!({"accessCode": CODE, "idFront": "QUJD", "idBack": "REVG"})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "checkUploadId", json!({"accessCode": CODE})).await;
    assert_eq!(body["data"]["result"], "approved");
    assert_eq!(body["data"]["numAttemptsLeft"], 2);
}

#[tokio::test]
async fn passport_needs_front_only() {
    let (app, _) = seeded(profile());
    let (status, _) = call(&app, "uploadPassport", json!({"accessCode": CODE, "idFront": "QUJD"})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, "checkUploadPassport", json!({"accessCode": CODE})).await;
    assert_eq!(body["data"]["description"], "1 image(s) verified");
}

#[tokio::test]
async fn compare_photos_needs_both_images() {
    let (app, state) = seeded(profile());
    let (status, _) = call(&app, "comparePhotos", json!({"accessCode": CODE, "img1": "QUJD"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "comparePhotos", json!({"accessCode": CODE, "img1": "QUJD", "img2": "REVG"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.session(CODE).await.unwrap().photos_compared);
}

#[tokio::test]
async fn unknown_operation_is_404() {
    let resp = app().oneshot(api_request("deleteUser", json!({}))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
