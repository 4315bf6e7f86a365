//! End-to-end verification flow against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then walks one access code
//! through every operation over real HTTP: once through
//! `AuthenticatingApi` and its bundled ureq transport, and once with the
//! test acting as the host that executes requests itself.

use authenticating_core::{
    ApiError, AuthenticatingApi, AuthenticatingClient, Call, HttpRequest, HttpResponse, Operation, Payload, Photo,
    QuizAnswers, SdkConfig, SocialNetworkVerification, User,
};
use image::{DynamicImage, RgbImage};
use mock_server::{MockState, Profile, Session, Store, DEFAULT_API_KEY, SMS_CODE};

/// Start the mock server with `store` and return its base URL.
fn start_server(store: Store) -> String {
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
            mock_server::run_with(listener, MockState::new(DEFAULT_API_KEY, store)).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn contact_only() -> Profile {
    Profile {
        email: Some("jane@example.com".into()),
        phone: Some("5551234567".into()),
        ..Profile::default()
    }
}

fn photo(width: u32, height: u32) -> Photo {
    Photo::Image(DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([120, 90, 60]))))
}

/// Execute an `HttpRequest` using ureq, the way a host application would.
///
/// 4xx/5xx responses are returned as data so the core client interprets them.
fn execute(req: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut builder = agent.post(&req.url);
    for (name, value) in &req.headers {
        builder = builder.header(name, value);
    }
    let mut response = builder.send(req.body.as_bytes()).expect("HTTP transport error");

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();
    HttpResponse::new(status, body)
}

#[test]
fn verification_lifecycle() {
    let base_url = start_server(Store::default().with_session("abc123", Session::new(contact_only())));
    let api = AuthenticatingApi::new(SdkConfig::new(DEFAULT_API_KEY).with_base_url(&base_url)).unwrap();

    // Phone: request a code, then confirm it.
    let sent = api.verify_phone("abc123").unwrap();
    assert_eq!(sent.result_message(), "sent");
    let wrong = api.verify_phone_code("abc123", "000000").unwrap_err();
    assert_eq!(wrong.message(), "Invalid verification code");
    let verified = api.verify_phone_code("abc123", SMS_CODE).unwrap();
    assert_eq!(verified.result_message(), "verified");

    assert_eq!(api.verify_email("abc123").unwrap().result_message(), "sent");

    // Social networks.
    let networks = api.get_available_networks("abc123").unwrap();
    assert!(networks.available_networks.iter().any(|n| n == "linkedin"));
    let social = SocialNetworkVerification {
        access_code: "abc123".into(),
        network: "linkedin".into(),
        social_media_access_token: "token".into(),
        social_media_user_id: "user-1".into(),
    };
    assert_eq!(api.verify_social_network(&social).unwrap().result_message(), "verified");

    // The quiz needs a complete profile.
    let err = api.get_quiz("abc123").unwrap_err();
    match &err {
        ApiError::Domain { missing_info, .. } => assert!(missing_info.contains(&"address".to_string())),
        other => panic!("expected missing profile data, got {other:?}"),
    }

    let update = User {
        first_name: Some("Jane".into()),
        last_name: Some("Doe".into()),
        year: Some(1980),
        month: Some(2),
        day: Some(29),
        address: Some("1 Main St".into()),
        city: Some("Springfield".into()),
        state: Some("IL".into()),
        zipcode: Some("62701".into()),
        ssn: Some("123-45-6789".into()),
        ..User::with_access_code("abc123")
    };
    let updated = api.update_user(&update).unwrap();
    assert_eq!(updated.first_name.as_deref(), Some("Jane"));
    assert!(updated.ssn.is_none(), "service never echoes the ssn");

    let quiz = api.get_quiz("abc123").unwrap();
    assert_eq!(quiz.questions.len(), 2);
    assert_eq!(quiz.question_count(), 2);
    let answers = quiz.questions.iter().fold(QuizAnswers::for_quiz("abc123", &quiz), |answers, q| {
        let question = q.question_id.as_deref().unwrap();
        answers.answer(question, &format!("{question}-0"))
    });
    assert_eq!(api.verify_quiz(&answers).unwrap().result_message(), "passed");

    assert_eq!(
        api.generate_criminal_report("abc123").unwrap().result_message(),
        "Report generation started"
    );
    assert_eq!(api.authenticate_profile("abc123").unwrap().result_message(), "authenticated");

    let user = api.get_user("abc123").unwrap();
    assert_eq!(user.access_code.as_deref(), Some("abc123"));
    assert_eq!(user.city.as_deref(), Some("Springfield"));

    // Documents.
    let status = api.check_upload_id("abc123").unwrap();
    assert_eq!(status.result.as_deref(), Some("notUploaded"));
    let uploaded = api.upload_id("abc123", &photo(640, 400), &photo(640, 400)).unwrap();
    assert_eq!(uploaded.result_message(), "ID received");
    let status = api.check_upload_id("abc123").unwrap();
    assert_eq!(status.result.as_deref(), Some("approved"));
    assert_eq!(status.num_attempts_left, Some(2));

    api.upload_id_enhanced("abc123", &photo(320, 200), &photo(320, 200)).unwrap();
    assert_eq!(api.check_upload_id("abc123").unwrap().num_attempts_left, Some(1));

    api.upload_passport("abc123", &photo(500, 700)).unwrap();
    assert_eq!(api.check_upload_passport("abc123").unwrap().result.as_deref(), Some("approved"));

    let compared = api.compare_photos("abc123", &photo(300, 300), &photo(300, 300)).unwrap();
    assert_eq!(compared.result_message(), "Photos received");
}

#[test]
fn unknown_access_code_is_a_domain_error() {
    let base_url = start_server(Store::default());
    let api = AuthenticatingApi::new(SdkConfig::new(DEFAULT_API_KEY).with_base_url(&base_url)).unwrap();
    let err = api.get_user("nobody").unwrap_err();
    assert!(matches!(err, ApiError::Domain { .. }));
    assert_eq!(err.message(), "Invalid access code");
}

#[test]
fn wrong_api_key_is_unauthorized() {
    let base_url = start_server(Store::default().with_session("abc123", Session::new(contact_only())));
    let api = AuthenticatingApi::new(SdkConfig::new("wrong-key").with_base_url(&base_url)).unwrap();
    let err = api.verify_email("abc123").unwrap_err();
    match err {
        ApiError::HttpStatus { status, .. } => assert_eq!(status, 401),
        other => panic!("expected HTTP 401, got {other:?}"),
    }
}

#[test]
fn host_executes_requests_itself() {
    let base_url = start_server(Store::default().with_session("abc123", Session::new(contact_only())));
    let client = AuthenticatingClient::new(&base_url, "v2", DEFAULT_API_KEY);

    let req = client.build_verify_phone("abc123").unwrap();
    assert_eq!(req.url, format!("{base_url}/api/v2/verifyPhone"));
    let sent = client.parse_simple_response(&execute(req)).unwrap();
    assert_eq!(sent.result_message(), "sent");

    let req = client.build_get_available_networks("abc123").unwrap();
    let payload = client
        .parse_for(Operation::GetAvailableNetworks, &execute(req))
        .unwrap();
    assert!(matches!(payload, Payload::Networks(ref n) if n.available_networks.len() == 4));

    let req = client.build_get_quiz("abc123").unwrap();
    let err = client.parse_quiz(&execute(req)).unwrap_err();
    assert!(err.message().starts_with("missing firstName"));

    let req = client.build_check_upload_passport("abc123").unwrap();
    let status = client.parse_check_photo_result(&execute(req)).unwrap();
    assert_eq!(status.result.as_deref(), Some("notUploaded"));
    assert_eq!(status.num_attempts_left, Some(3));
}

#[test]
fn execute_accepts_json_call_descriptions() {
    let base_url = start_server(Store::default().with_session("abc123", Session::new(contact_only())));
    let api = AuthenticatingApi::new(SdkConfig::new(DEFAULT_API_KEY).with_base_url(&base_url)).unwrap();

    let call: Call = serde_json::from_str(r#"{"operation":"verifyEmail","accessCode":"abc123"}"#).unwrap();
    let done = api.execute(&call);
    assert_eq!(done.operation, Operation::VerifyEmail);
    assert!(done.is_success());
    assert_eq!(done.tag(), authenticating_core::tags::SIMPLE_RESPONSE);
}
