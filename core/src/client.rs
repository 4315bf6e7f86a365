//! Request builder and response parser for the verification API.
//!
//! # Design
//! `AuthenticatingClient` holds the endpoint root and the company API key and
//! carries no other state. Every operation is split into a `build_*` method
//! that checks local preconditions and produces an `HttpRequest`, and a
//! `parse_*` method that turns an `HttpResponse` into a typed result. The
//! caller executes the round-trip in between, which keeps this type free of
//! I/O and lets a mobile host drive it across the C boundary.
//!
//! Parsing runs in a fixed order: domain errors in either envelope shape
//! win, then a non-2xx status becomes `HttpStatus`, then the body is
//! converted (envelope `data` first, top level second), and anything left
//! over is a `Parse` error with the body classified for diagnostics.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SdkConfig;
use crate::envelope::check_for_error;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, AUTH_HEADER, CONTENT_TYPE};
use crate::operation::{require_access_code, Operation, Payload, ResultShape};
use crate::parser::{self, convert, convert_raw, BodyKind};
use crate::types::{
    AvailableNetworks, CheckPhotoResult, PhoneVerification, PhotoUpload, Quiz, QuizAnswers, SimpleResponse,
    SocialNetworkVerification, User,
};

#[derive(Debug, Clone)]
pub struct AuthenticatingClient {
    api_root: String,
    api_key: String,
}

impl AuthenticatingClient {
    /// `base_url` is the service root (e.g. `https://api.authenticating.com/`);
    /// requests go to `{base_url}/api/{api_version}/{operation}`.
    pub fn new(base_url: &str, api_version: &str, api_key: &str) -> Self {
        Self {
            api_root: format!(
                "{}/api/{}",
                base_url.trim_end_matches('/'),
                api_version.trim_matches('/')
            ),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self::new(&config.base_url, &config.api_version, &config.api_key)
    }

    pub fn endpoint(&self, operation: Operation) -> String {
        format!("{}/{}", self.api_root, operation.path())
    }

    /// Build a `POST` for `operation` with `body` as JSON.
    pub fn build<B: Serialize + ?Sized>(&self, operation: Operation, body: &B) -> Result<HttpRequest, ApiError> {
        if self.api_key.trim().is_empty() {
            return Err(ApiError::MissingAuthKey);
        }
        let body = serde_json::to_string(body)?;
        Ok(HttpRequest {
            url: self.endpoint(operation),
            headers: vec![
                ("content-type".to_string(), CONTENT_TYPE.to_string()),
                (AUTH_HEADER.to_string(), self.api_key.clone()),
            ],
            body,
        })
    }

    fn build_access_code_only(&self, operation: Operation, access_code: &str) -> Result<HttpRequest, ApiError> {
        let access_code = require_access_code(Some(access_code))?;
        self.build(operation, &User::with_access_code(access_code))
    }

    /// Ask the service to text a verification code to the user's phone.
    pub fn build_verify_phone(&self, access_code: &str) -> Result<HttpRequest, ApiError> {
        self.build_access_code_only(Operation::VerifyPhone, access_code)
    }

    /// Submit the code the user received by SMS.
    pub fn build_verify_phone_code(&self, input: &PhoneVerification) -> Result<HttpRequest, ApiError> {
        require_access_code(Some(&input.access_code))?;
        self.build(Operation::VerifyPhoneCode, input)
    }

    pub fn build_verify_email(&self, access_code: &str) -> Result<HttpRequest, ApiError> {
        self.build_access_code_only(Operation::VerifyEmail, access_code)
    }

    pub fn build_verify_social_network(&self, input: &SocialNetworkVerification) -> Result<HttpRequest, ApiError> {
        require_access_code(Some(&input.access_code))?;
        self.build(Operation::VerifySocialNetworks, input)
    }

    pub fn build_get_available_networks(&self, access_code: &str) -> Result<HttpRequest, ApiError> {
        self.build_access_code_only(Operation::GetAvailableNetworks, access_code)
    }

    pub fn build_get_quiz(&self, access_code: &str) -> Result<HttpRequest, ApiError> {
        self.build_access_code_only(Operation::GetQuiz, access_code)
    }

    pub fn build_verify_quiz(&self, input: &QuizAnswers) -> Result<HttpRequest, ApiError> {
        require_access_code(Some(&input.access_code))?;
        self.build(Operation::VerifyQuiz, input)
    }

    pub fn build_generate_criminal_report(&self, access_code: &str) -> Result<HttpRequest, ApiError> {
        self.build_access_code_only(Operation::GenerateCriminalReport, access_code)
    }

    pub fn build_get_user(&self, access_code: &str) -> Result<HttpRequest, ApiError> {
        self.build_access_code_only(Operation::GetUser, access_code)
    }

    /// Blank fields are dropped and the phone number reduced to digits
    /// before the body is encoded.
    pub fn build_update_user(&self, user: &User) -> Result<HttpRequest, ApiError> {
        require_access_code(user.access_code.as_deref())?;
        self.build(Operation::UpdateUser, &user.clone().normalized())
    }

    pub fn build_authenticate_profile(&self, access_code: &str) -> Result<HttpRequest, ApiError> {
        self.build_access_code_only(Operation::AuthenticateProfile, access_code)
    }

    pub fn build_compare_photos(&self, upload: &PhotoUpload) -> Result<HttpRequest, ApiError> {
        self.build_upload(Operation::ComparePhotos, upload, &[upload.img1.as_deref(), upload.img2.as_deref()])
    }

    pub fn build_upload_id(&self, upload: &PhotoUpload) -> Result<HttpRequest, ApiError> {
        self.build_upload(Operation::UploadId, upload, &[upload.id_front.as_deref(), upload.id_back.as_deref()])
    }

    pub fn build_upload_id_enhanced(&self, upload: &PhotoUpload) -> Result<HttpRequest, ApiError> {
        self.build_upload(
            Operation::UploadIdEnhanced,
            upload,
            &[upload.id_front.as_deref(), upload.id_back.as_deref()],
        )
    }

    pub fn build_upload_passport(&self, upload: &PhotoUpload) -> Result<HttpRequest, ApiError> {
        self.build_upload(Operation::UploadPassport, upload, &[upload.id_front.as_deref()])
    }

    fn build_upload(
        &self,
        operation: Operation,
        upload: &PhotoUpload,
        required: &[Option<&str>],
    ) -> Result<HttpRequest, ApiError> {
        require_access_code(Some(&upload.access_code))?;
        if required.iter().any(|image| image.map_or(true, |i| i.trim().is_empty())) {
            return Err(ApiError::InvalidImage(format!("{operation} is missing a required image")));
        }
        self.build(operation, upload)
    }

    pub fn build_check_upload_id(&self, access_code: &str) -> Result<HttpRequest, ApiError> {
        self.build_access_code_only(Operation::CheckUploadId, access_code)
    }

    pub fn build_check_upload_passport(&self, access_code: &str) -> Result<HttpRequest, ApiError> {
        self.build_access_code_only(Operation::CheckUploadPassport, access_code)
    }

    /// Parse a `SimpleResponse`, accepting a bare `true`/`false` or an
    /// unquoted message as well as the JSON shapes.
    pub fn parse_simple_response(&self, response: &HttpResponse) -> Result<SimpleResponse, ApiError> {
        check_response(response)?;
        if let Some(parsed) = convert::<SimpleResponse>(&response.body) {
            return Ok(parsed);
        }
        let kind = BodyKind::classify(&response.body);
        if !matches!(kind, BodyKind::Boolean | BodyKind::String | BodyKind::Text) {
            return Err(parse_failure(response, "SimpleResponse"));
        }
        if let Some(flag) = convert_raw::<bool>(&response.body) {
            return Ok(SimpleResponse {
                successful: Some(flag),
                success: Some(flag),
                result_message: None,
            });
        }
        if let Some(message) = convert_raw::<String>(&response.body) {
            return Ok(SimpleResponse {
                successful: Some(true),
                success: None,
                result_message: Some(message),
            });
        }
        Err(parse_failure(response, "SimpleResponse"))
    }

    pub fn parse_available_networks(&self, response: &HttpResponse) -> Result<AvailableNetworks, ApiError> {
        parse(response, "AvailableNetworks")
    }

    pub fn parse_quiz(&self, response: &HttpResponse) -> Result<Quiz, ApiError> {
        parse(response, "Quiz")
    }

    pub fn parse_user(&self, response: &HttpResponse) -> Result<User, ApiError> {
        parse(response, "User")
    }

    pub fn parse_check_photo_result(&self, response: &HttpResponse) -> Result<CheckPhotoResult, ApiError> {
        parse(response, "CheckPhotoResult")
    }

    /// Parse the response of any operation into its payload variant.
    pub fn parse_for(&self, operation: Operation, response: &HttpResponse) -> Result<Payload, ApiError> {
        match operation.result_shape() {
            ResultShape::Simple => self.parse_simple_response(response).map(Payload::Simple),
            ResultShape::Networks => self.parse_available_networks(response).map(Payload::Networks),
            ResultShape::User => self.parse_user(response).map(Payload::User),
            ResultShape::Quiz => self.parse_quiz(response).map(Payload::Quiz),
            ResultShape::PhotoCheck => self.parse_check_photo_result(response).map(Payload::PhotoCheck),
        }
    }
}

/// Domain errors first, then the HTTP status.
fn check_response(response: &HttpResponse) -> Result<(), ApiError> {
    check_for_error(&response.body)?;
    if !response.is_success() {
        return Err(ApiError::HttpStatus {
            status: response.status,
            body: response.body.clone(),
        });
    }
    Ok(())
}

fn parse<T: DeserializeOwned>(response: &HttpResponse, expected: &'static str) -> Result<T, ApiError> {
    check_response(response)?;
    convert(&response.body).ok_or_else(|| parse_failure(response, expected))
}

fn parse_failure(response: &HttpResponse, expected: &'static str) -> ApiError {
    let found = parser::log_failure(&response.body, expected);
    ApiError::Parse { expected, found }
}
