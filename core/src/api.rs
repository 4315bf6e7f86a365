//! Blocking verification API.
//!
//! # Design
//! `AuthenticatingApi` owns everything a call needs: the request builder,
//! a [`Transport`], the [`WireLog`] switch and the image normalizer. It is
//! constructed explicitly from an [`SdkConfig`] and cloned cheaply (`Arc`
//! inside), so there is no process-wide client to rebuild when logging is
//! toggled.
//!
//! Each method checks preconditions, builds the request, sends it and
//! parses the result. Precondition failures never reach the transport.
//! Photo methods check the access code before doing any image work.

use std::sync::Arc;

use crate::client::AuthenticatingClient;
use crate::config::{ConfigError, SdkConfig};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::logging::WireLog;
use crate::operation::{require_access_code, Call, Completion, Operation, Payload};
use crate::photo::{ImageNormalizer, Photo};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    AvailableNetworks, CheckPhotoResult, PhoneVerification, PhotoUpload, Quiz, QuizAnswers, SimpleResponse,
    SocialNetworkVerification, User,
};

#[derive(Clone)]
pub struct AuthenticatingApi {
    inner: Arc<Inner>,
}

struct Inner {
    client: AuthenticatingClient,
    transport: Box<dyn Transport>,
    log: WireLog,
    images: ImageNormalizer,
}

impl std::fmt::Debug for AuthenticatingApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatingApi")
            .field("client", &self.inner.client.endpoint(Operation::GetUser))
            .field("logging", &self.inner.log.is_enabled())
            .field("images", &self.inner.images)
            .finish_non_exhaustive()
    }
}

impl AuthenticatingApi {
    /// Validate `config` and connect through `ureq`.
    pub fn new(config: SdkConfig) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let transport = UreqTransport::from_config(&config);
        Ok(Self::assemble(config, Box::new(transport)))
    }

    /// Validate `config` and send requests through `transport`.
    pub fn with_transport<T: Transport + 'static>(config: SdkConfig, transport: T) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        Ok(Self::assemble(config, Box::new(transport)))
    }

    fn assemble(config: SdkConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                client: AuthenticatingClient::from_config(&config),
                transport,
                log: WireLog::new(config.log_json),
                images: ImageNormalizer::new(config.max_image_bytes),
            }),
        }
    }

    pub fn client(&self) -> &AuthenticatingClient {
        &self.inner.client
    }

    pub fn images(&self) -> &ImageNormalizer {
        &self.inner.images
    }

    /// Switch wire logging on or off. Takes effect for the next request.
    pub fn set_logging(&self, enabled: bool) {
        self.inner.log.set_enabled(enabled);
    }

    pub fn logging_enabled(&self) -> bool {
        self.inner.log.is_enabled()
    }

    /// The wire logger, for hosts that execute requests themselves.
    pub fn wire_log(&self) -> &WireLog {
        &self.inner.log
    }

    /// Send a built request, logging both directions when enabled.
    pub fn send(&self, operation: Operation, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.inner.log.request(operation, request);
        let response = self.inner.transport.execute(request)?;
        self.inner.log.response(operation, &response);
        Ok(response)
    }

    fn call<T, P>(&self, operation: Operation, request: Result<HttpRequest, ApiError>, parse: P) -> Result<T, ApiError>
    where
        P: FnOnce(&AuthenticatingClient, &HttpResponse) -> Result<T, ApiError>,
    {
        let result = request
            .and_then(|req| self.send(operation, &req))
            .and_then(|resp| parse(&self.inner.client, &resp));
        if let Err(err) = &result {
            self.inner.log.failure(operation, err);
        }
        result
    }

    pub fn verify_phone(&self, access_code: &str) -> Result<SimpleResponse, ApiError> {
        self.call(
            Operation::VerifyPhone,
            self.client().build_verify_phone(access_code),
            AuthenticatingClient::parse_simple_response,
        )
    }

    pub fn verify_phone_code(&self, access_code: &str, sms_code: &str) -> Result<SimpleResponse, ApiError> {
        self.call(
            Operation::VerifyPhoneCode,
            self.client()
                .build_verify_phone_code(&PhoneVerification::new(access_code, sms_code)),
            AuthenticatingClient::parse_simple_response,
        )
    }

    pub fn verify_email(&self, access_code: &str) -> Result<SimpleResponse, ApiError> {
        self.call(
            Operation::VerifyEmail,
            self.client().build_verify_email(access_code),
            AuthenticatingClient::parse_simple_response,
        )
    }

    pub fn verify_social_network(&self, input: &SocialNetworkVerification) -> Result<SimpleResponse, ApiError> {
        self.call(
            Operation::VerifySocialNetworks,
            self.client().build_verify_social_network(input),
            AuthenticatingClient::parse_simple_response,
        )
    }

    pub fn get_available_networks(&self, access_code: &str) -> Result<AvailableNetworks, ApiError> {
        self.call(
            Operation::GetAvailableNetworks,
            self.client().build_get_available_networks(access_code),
            AuthenticatingClient::parse_available_networks,
        )
    }

    pub fn get_quiz(&self, access_code: &str) -> Result<Quiz, ApiError> {
        self.call(
            Operation::GetQuiz,
            self.client().build_get_quiz(access_code),
            AuthenticatingClient::parse_quiz,
        )
    }

    pub fn verify_quiz(&self, answers: &QuizAnswers) -> Result<SimpleResponse, ApiError> {
        self.call(
            Operation::VerifyQuiz,
            self.client().build_verify_quiz(answers),
            AuthenticatingClient::parse_simple_response,
        )
    }

    pub fn generate_criminal_report(&self, access_code: &str) -> Result<SimpleResponse, ApiError> {
        self.call(
            Operation::GenerateCriminalReport,
            self.client().build_generate_criminal_report(access_code),
            AuthenticatingClient::parse_simple_response,
        )
    }

    pub fn get_user(&self, access_code: &str) -> Result<User, ApiError> {
        self.call(
            Operation::GetUser,
            self.client().build_get_user(access_code),
            AuthenticatingClient::parse_user,
        )
    }

    pub fn update_user(&self, user: &User) -> Result<User, ApiError> {
        self.call(
            Operation::UpdateUser,
            self.client().build_update_user(user),
            AuthenticatingClient::parse_user,
        )
    }

    pub fn authenticate_profile(&self, access_code: &str) -> Result<SimpleResponse, ApiError> {
        self.call(
            Operation::AuthenticateProfile,
            self.client().build_authenticate_profile(access_code),
            AuthenticatingClient::parse_simple_response,
        )
    }

    pub fn compare_photos(&self, access_code: &str, img1: &Photo, img2: &Photo) -> Result<SimpleResponse, ApiError> {
        let request = self.encode_pair(access_code, img1, img2).and_then(|(a, b)| {
            self.client()
                .build_compare_photos(&PhotoUpload::compare(access_code, a, b))
        });
        self.call(Operation::ComparePhotos, request, AuthenticatingClient::parse_simple_response)
    }

    pub fn upload_id(&self, access_code: &str, front: &Photo, back: &Photo) -> Result<SimpleResponse, ApiError> {
        let request = self
            .encode_pair(access_code, front, back)
            .and_then(|(f, b)| self.client().build_upload_id(&PhotoUpload::id_card(access_code, f, b)));
        self.call(Operation::UploadId, request, AuthenticatingClient::parse_simple_response)
    }

    pub fn upload_id_enhanced(
        &self,
        access_code: &str,
        front: &Photo,
        back: &Photo,
    ) -> Result<SimpleResponse, ApiError> {
        let request = self.encode_pair(access_code, front, back).and_then(|(f, b)| {
            self.client()
                .build_upload_id_enhanced(&PhotoUpload::id_card(access_code, f, b))
        });
        self.call(Operation::UploadIdEnhanced, request, AuthenticatingClient::parse_simple_response)
    }

    pub fn upload_passport(&self, access_code: &str, front: &Photo) -> Result<SimpleResponse, ApiError> {
        let request = require_access_code(Some(access_code))
            .and_then(|_| self.images().prepare(front))
            .and_then(|f| self.client().build_upload_passport(&PhotoUpload::passport(access_code, f)));
        self.call(Operation::UploadPassport, request, AuthenticatingClient::parse_simple_response)
    }

    pub fn check_upload_id(&self, access_code: &str) -> Result<CheckPhotoResult, ApiError> {
        self.call(
            Operation::CheckUploadId,
            self.client().build_check_upload_id(access_code),
            AuthenticatingClient::parse_check_photo_result,
        )
    }

    pub fn check_upload_passport(&self, access_code: &str) -> Result<CheckPhotoResult, ApiError> {
        self.call(
            Operation::CheckUploadPassport,
            self.client().build_check_upload_passport(access_code),
            AuthenticatingClient::parse_check_photo_result,
        )
    }

    // Access code first so a missing token never pays for image work.
    fn encode_pair(&self, access_code: &str, first: &Photo, second: &Photo) -> Result<(String, String), ApiError> {
        require_access_code(Some(access_code))?;
        let first = self.images().prepare(first)?;
        let second = self.images().prepare(second)?;
        Ok((first, second))
    }

    /// Build the request for `call`, normalizing and encoding any images.
    pub fn prepare(&self, call: &Call) -> Result<HttpRequest, ApiError> {
        call.check_preconditions()?;
        let client = self.client();
        match call {
            Call::VerifyPhone { access_code } => client.build_verify_phone(access_code),
            Call::VerifyPhoneCode {
                access_code,
                sms_code,
            } => client.build_verify_phone_code(&PhoneVerification::new(access_code, sms_code)),
            Call::VerifyEmail { access_code } => client.build_verify_email(access_code),
            Call::VerifySocialNetworks(input) => client.build_verify_social_network(input),
            Call::GetAvailableNetworks { access_code } => client.build_get_available_networks(access_code),
            Call::GetQuiz { access_code } => client.build_get_quiz(access_code),
            Call::VerifyQuiz(answers) => client.build_verify_quiz(answers),
            Call::GenerateCriminalReport { access_code } => client.build_generate_criminal_report(access_code),
            Call::GetUser { access_code } => client.build_get_user(access_code),
            Call::UpdateUser(user) => client.build_update_user(user),
            Call::AuthenticateProfile { access_code } => client.build_authenticate_profile(access_code),
            Call::ComparePhotos {
                access_code,
                img1,
                img2,
            } => {
                let (a, b) = self.encode_pair(access_code, img1, img2)?;
                client.build_compare_photos(&PhotoUpload::compare(access_code, a, b))
            }
            Call::UploadId {
                access_code,
                front,
                back,
            } => {
                let (f, b) = self.encode_pair(access_code, front, back)?;
                client.build_upload_id(&PhotoUpload::id_card(access_code, f, b))
            }
            Call::UploadIdEnhanced {
                access_code,
                front,
                back,
            } => {
                let (f, b) = self.encode_pair(access_code, front, back)?;
                client.build_upload_id_enhanced(&PhotoUpload::id_card(access_code, f, b))
            }
            Call::UploadPassport { access_code, front } => {
                let f = self.images().prepare(front)?;
                client.build_upload_passport(&PhotoUpload::passport(access_code, f))
            }
            Call::CheckUploadId { access_code } => client.build_check_upload_id(access_code),
            Call::CheckUploadPassport { access_code } => client.build_check_upload_passport(access_code),
        }
    }

    /// Run `call` to completion on the current thread.
    pub fn execute(&self, call: &Call) -> Completion {
        let operation = call.operation();
        let outcome: Result<Payload, ApiError> = self.call(operation, self.prepare(call), |client, response| {
            client.parse_for(operation, response)
        });
        Completion { operation, outcome }
    }
}
