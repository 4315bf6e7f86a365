//! In-memory stand-in for the Authenticating verification API.
//!
//! Serves `POST /api/v2/{operation}` for every endpoint the SDK calls,
//! answering in both envelope styles the live service uses: flat
//! `{"successful", "code", "data"}` for most outcomes and nested
//! `{"error": {"errorMessage", "missingInfo"}}` when profile data is
//! missing. Requests without the right `authKey` get an HTML 401 page.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_API_KEY: &str = "test-key";
pub const SMS_CODE: &str = "123456";
pub const NETWORKS: [&str; 4] = ["facebook", "google", "linkedin", "twitter"];
const UPLOAD_ATTEMPTS: i32 = 3;

/// Profile fields as the service stores them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssn: Option<String>,
}

impl Profile {
    fn merge(&mut self, update: Profile) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if update.$field.is_some() { self.$field = update.$field; })*
            };
        }
        take!(first_name, last_name, email, phone, year, month, day, address, city, state, zipcode, country, ssn);
    }

    /// Fields the identity quiz needs, in the order the service reports them.
    fn missing_for_quiz(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if blank(&self.first_name) {
            missing.push("firstName");
        }
        if blank(&self.last_name) {
            missing.push("lastName");
        }
        if self.year.is_none() || self.month.is_none() || self.day.is_none() {
            missing.push("dob");
        }
        if blank(&self.address) {
            missing.push("address");
        }
        if blank(&self.city) {
            missing.push("city");
        }
        if blank(&self.state) {
            missing.push("state");
        }
        if blank(&self.zipcode) {
            missing.push("zipcode");
        }
        missing
    }
}

#[derive(Clone, Debug)]
struct IssuedQuiz {
    quiz_id: String,
    transaction_id: String,
    response_unique_id: String,
    correct: Vec<(String, String)>,
}

#[derive(Clone, Debug)]
pub struct Upload {
    pub images: usize,
    pub attempts_left: i32,
}

/// Verification state for one access code.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub profile: Profile,
    pub company_id: Option<String>,
    pub sms_code: Option<String>,
    pub phone_verified: bool,
    pub email_verified: bool,
    pub networks: Vec<String>,
    pub quiz_passed: bool,
    pub photos_compared: bool,
    pub id_upload: Option<Upload>,
    pub passport_upload: Option<Upload>,
    quiz: Option<IssuedQuiz>,
}

impl Session {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct Store {
    sessions: HashMap<String, Session>,
}

impl Store {
    pub fn with_session(mut self, access_code: &str, session: Session) -> Self {
        self.sessions.insert(access_code.to_string(), session);
        self
    }
}

#[derive(Clone)]
pub struct MockState {
    api_key: Arc<str>,
    store: Arc<RwLock<Store>>,
}

impl MockState {
    pub fn new(api_key: &str, store: Store) -> Self {
        Self {
            api_key: Arc::from(api_key),
            store: Arc::new(RwLock::new(store)),
        }
    }

    pub async fn session(&self, access_code: &str) -> Option<Session> {
        self.store.read().await.sessions.get(access_code).cloned()
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY, Store::default())
    }
}

pub fn app() -> Router {
    app_with(MockState::default())
}

pub fn app_with(state: MockState) -> Router {
    let api = Router::new()
        .route("/verifyPhone", post(verify_phone))
        .route("/verifyPhoneCode", post(verify_phone_code))
        .route("/verifyEmail", post(verify_email))
        .route("/verifySocialNetworks", post(verify_social_networks))
        .route("/getAvailableNetworks", post(get_available_networks))
        .route("/getQuiz", post(get_quiz))
        .route("/verifyQuiz", post(verify_quiz))
        .route("/generateCriminalReport", post(generate_criminal_report))
        .route("/getUser", post(get_user))
        .route("/updateUser", post(update_user))
        .route("/authenticateProfile", post(authenticate_profile))
        .route("/comparePhotos", post(compare_photos))
        .route("/uploadId", post(upload_id))
        .route("/uploadIdEnhanced", post(upload_id))
        .route("/uploadPassport", post(upload_passport))
        .route("/checkUploadId", post(check_upload_id))
        .route("/checkUploadPassport", post(check_upload_passport))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth_key));
    Router::new().nest("/api/v2", api).with_state(state)
}

pub async fn run_with(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

async fn require_auth_key(State(state): State<MockState>, headers: HeaderMap, request: Request, next: Next) -> Response {
    let key = headers.get("authkey").and_then(|v| v.to_str().ok());
    if key != Some(&*state.api_key) {
        tracing::warn!(path = %request.uri().path(), "rejected request without a valid authKey");
        return (
            StatusCode::UNAUTHORIZED,
            Html("<!DOCTYPE html><html><head><title>401</title></head><body>Unauthorized</body></html>"),
        )
            .into_response();
    }
    next.run(request).await
}

// --- envelopes ---

fn ok(data: Value) -> Response {
    Json(json!({"successful": true, "code": 200, "data": data})).into_response()
}

fn message(text: &str) -> Response {
    ok(json!({"success": true, "resultMessage": text}))
}

fn flat_error(status: StatusCode, text: &str) -> Response {
    (
        status,
        Json(json!({"successful": false, "code": status.as_u16(), "data": {"errorMessage": text}})),
    )
        .into_response()
}

fn nested_error(text: &str, missing: &[&str]) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": {"errorMessage": text, "missingInfo": missing}})),
    )
        .into_response()
}

fn missing_error(missing: &[&str]) -> Response {
    nested_error(&format!("missing {}", missing.join(", ")), missing)
}

// --- request bodies ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeBody {
    pub access_code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneCodeBody {
    pub access_code: Option<String>,
    pub sms_code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialBody {
    pub access_code: Option<String>,
    pub network: Option<String>,
    pub social_media_access_token: Option<String>,
    pub social_media_user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerBody {
    pub question_id: String,
    pub choice_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswersBody {
    pub access_code: Option<String>,
    pub quiz_id: Option<String>,
    #[serde(rename = "transactionID")]
    pub transaction_id: Option<String>,
    pub response_unique_id: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBody {
    pub access_code: Option<String>,
    #[serde(flatten)]
    pub profile: Profile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBody {
    pub access_code: Option<String>,
    pub img1: Option<String>,
    pub img2: Option<String>,
    pub id_front: Option<String>,
    pub id_back: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Run `f` against the session for `access_code`, or answer with the
/// service's precondition / unknown-session errors.
async fn with_session<F>(state: &MockState, access_code: Option<&str>, f: F) -> Response
where
    F: FnOnce(&mut Session) -> Response,
{
    let Some(code) = access_code.filter(|c| !c.trim().is_empty()) else {
        return flat_error(StatusCode::BAD_REQUEST, "You must include the AccessCode in this call");
    };
    let mut store = state.store.write().await;
    match store.sessions.get_mut(code) {
        Some(session) => f(session),
        None => flat_error(StatusCode::NOT_FOUND, "Invalid access code"),
    }
}

// --- handlers ---

async fn verify_phone(State(state): State<MockState>, Json(body): Json<AccessCodeBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        if !present(&session.profile.phone) {
            return missing_error(&["phone"]);
        }
        session.sms_code = Some(SMS_CODE.to_string());
        tracing::info!("sms code issued");
        message("sent")
    })
    .await
}

async fn verify_phone_code(State(state): State<MockState>, Json(body): Json<PhoneCodeBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        match (&session.sms_code, &body.sms_code) {
            (None, _) => flat_error(StatusCode::BAD_REQUEST, "No verification code has been sent"),
            (Some(expected), Some(given)) if expected == given.trim() => {
                session.phone_verified = true;
                session.sms_code = None;
                message("verified")
            }
            _ => flat_error(StatusCode::BAD_REQUEST, "Invalid verification code"),
        }
    })
    .await
}

async fn verify_email(State(state): State<MockState>, Json(body): Json<AccessCodeBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        if !present(&session.profile.email) {
            return missing_error(&["email"]);
        }
        session.email_verified = true;
        message("sent")
    })
    .await
}

async fn verify_social_networks(State(state): State<MockState>, Json(body): Json<SocialBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        let network = body.network.as_deref().unwrap_or_default().to_ascii_lowercase();
        if !NETWORKS.contains(&network.as_str()) {
            return flat_error(StatusCode::BAD_REQUEST, "Unsupported social network");
        }
        if !present(&body.social_media_access_token) || !present(&body.social_media_user_id) {
            return missing_error(&["socialMediaAccessToken", "socialMediaUserId"]);
        }
        if !session.networks.contains(&network) {
            session.networks.push(network);
        }
        message("verified")
    })
    .await
}

async fn get_available_networks(State(state): State<MockState>, Json(body): Json<AccessCodeBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |_| ok(json!(NETWORKS))).await
}

async fn get_quiz(State(state): State<MockState>, Json(body): Json<AccessCodeBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        let missing = session.profile.missing_for_quiz();
        if !missing.is_empty() {
            return missing_error(&missing);
        }
        let questions = [
            ("Which of these streets have you lived on?", ["Elm Street", "Oak Avenue", "None of the above"]),
            ("Which of these vehicles have you owned?", ["Honda Civic", "Ford Focus", "None of the above"]),
        ];
        let mut correct = Vec::new();
        let question: Vec<Value> = questions
            .iter()
            .enumerate()
            .map(|(q, (text, choices))| {
                let question_id = Uuid::new_v4().to_string();
                let choice: Vec<Value> = choices
                    .iter()
                    .enumerate()
                    .map(|(c, choice_text)| {
                        json!({"nschoiceId": format!("{question_id}-{c}"), "nssequenceId": (c + 1).to_string(), "text": choice_text})
                    })
                    .collect();
                correct.push((question_id.clone(), format!("{question_id}-0")));
                json!({
                    "nsquestionId": question_id,
                    "nssequenceId": (q + 1).to_string(),
                    "nseq": (q + 1).to_string(),
                    "type": "single",
                    "text": text,
                    "choice": choice,
                })
            })
            .collect();
        let issued = IssuedQuiz {
            quiz_id: Uuid::new_v4().to_string(),
            transaction_id: Uuid::new_v4().to_string(),
            response_unique_id: Uuid::new_v4().to_string(),
            correct,
        };
        let data = json!({
            "transactionID": issued.transaction_id,
            "responseUniqueId": issued.response_unique_id,
            "quizId": issued.quiz_id,
            "numQuestions": question.len().to_string(),
            "question": question,
        });
        session.quiz = Some(issued);
        ok(data)
    })
    .await
}

async fn verify_quiz(State(state): State<MockState>, Json(body): Json<QuizAnswersBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        let Some(quiz) = session.quiz.take() else {
            return flat_error(StatusCode::BAD_REQUEST, "No quiz has been issued");
        };
        let matches = body.quiz_id.as_deref() == Some(quiz.quiz_id.as_str())
            && body.transaction_id.as_deref() == Some(quiz.transaction_id.as_str())
            && body.response_unique_id.as_deref() == Some(quiz.response_unique_id.as_str());
        if !matches {
            session.quiz = Some(quiz);
            return flat_error(StatusCode::BAD_REQUEST, "Quiz identifiers do not match the issued quiz");
        }
        let passed = quiz.correct.iter().all(|(question, choice)| {
            body.answers
                .iter()
                .any(|a| &a.question_id == question && &a.choice_id == choice)
        });
        if !passed {
            return flat_error(StatusCode::BAD_REQUEST, "Quiz failed");
        }
        session.quiz_passed = true;
        message("passed")
    })
    .await
}

async fn generate_criminal_report(State(state): State<MockState>, Json(body): Json<AccessCodeBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        if !present(&session.profile.ssn) {
            return missing_error(&["ssn"]);
        }
        message("Report generation started")
    })
    .await
}

fn user_json(access_code: &str, session: &Session) -> Value {
    let mut user = serde_json::to_value(&session.profile).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut user {
        map.remove("ssn");
        map.insert("accessCode".into(), json!(access_code));
        if let Some(company) = &session.company_id {
            map.insert("companyId".into(), json!(company));
        }
    }
    user
}

async fn get_user(State(state): State<MockState>, Json(body): Json<AccessCodeBody>) -> Response {
    let code = body.access_code.clone().unwrap_or_default();
    with_session(&state, body.access_code.as_deref(), |session| ok(user_json(&code, session))).await
}

async fn update_user(State(state): State<MockState>, Json(body): Json<UpdateUserBody>) -> Response {
    let code = body.access_code.clone().unwrap_or_default();
    with_session(&state, body.access_code.as_deref(), |session| {
        session.profile.merge(body.profile);
        ok(user_json(&code, session))
    })
    .await
}

async fn authenticate_profile(State(state): State<MockState>, Json(body): Json<AccessCodeBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        let mut missing = Vec::new();
        if !session.phone_verified {
            missing.push("phoneVerification");
        }
        if !session.quiz_passed {
            missing.push("identityQuiz");
        }
        if !missing.is_empty() {
            return nested_error("Profile has not completed verification", &missing);
        }
        message("authenticated")
    })
    .await
}

async fn compare_photos(State(state): State<MockState>, Json(body): Json<UploadBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        if !present(&body.img1) || !present(&body.img2) {
            return missing_error(&["img1", "img2"]);
        }
        session.photos_compared = true;
        message("Photos received")
    })
    .await
}

async fn upload_id(State(state): State<MockState>, Json(body): Json<UploadBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        if !present(&body.id_front) || !present(&body.id_back) {
            return missing_error(&["idFront", "idBack"]);
        }
        session.id_upload = Some(record_upload(session.id_upload.take(), 2));
        message("ID received")
    })
    .await
}

async fn upload_passport(State(state): State<MockState>, Json(body): Json<UploadBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| {
        if !present(&body.id_front) {
            return missing_error(&["idFront"]);
        }
        session.passport_upload = Some(record_upload(session.passport_upload.take(), 1));
        message("Passport received")
    })
    .await
}

fn record_upload(previous: Option<Upload>, images: usize) -> Upload {
    let attempts_left = previous.map_or(UPLOAD_ATTEMPTS, |u| u.attempts_left) - 1;
    Upload {
        images,
        attempts_left: attempts_left.max(0),
    }
}

fn upload_status(upload: &Option<Upload>) -> Response {
    match upload {
        None => ok(json!({
            "result": "notUploaded",
            "numAttemptsLeft": UPLOAD_ATTEMPTS,
            "description": "No document has been uploaded",
        })),
        Some(upload) => ok(json!({
            "result": "approved",
            "numAttemptsLeft": upload.attempts_left,
            "description": format!("{} image(s) verified", upload.images),
        })),
    }
}

async fn check_upload_id(State(state): State<MockState>, Json(body): Json<AccessCodeBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| upload_status(&session.id_upload)).await
}

async fn check_upload_passport(State(state): State<MockState>, Json(body): Json<AccessCodeBody>) -> Response {
    with_session(&state, body.access_code.as_deref(), |session| upload_status(&session.passport_upload)).await
}
