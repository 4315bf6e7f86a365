//! Remote operations, call descriptions and completion values.
//!
//! # Design
//! [`Operation`] names an endpoint. [`Call`] is one operation together with
//! its typed parameters; it is serde-tagged so the C surface can accept it
//! as JSON. [`Completion`] is what the asynchronous surface hands back: the
//! operation plus a `Result` over [`Payload`], replacing a single listener
//! that dispatched on magic integers. The integers survive only as
//! [`tags`] for C callers.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorKind};
use crate::photo::Photo;
use crate::types::{
    AvailableNetworks, CheckPhotoResult, QuizAnswers, Quiz, SimpleResponse, SocialNetworkVerification, User,
};

/// Integer outcome tags delivered to C callbacks.
pub mod tags {
    pub const SIMPLE_RESPONSE: i32 = 19000;
    pub const ERROR: i32 = 19001;
    pub const AVAILABLE_NETWORKS: i32 = 19002;
    pub const USER: i32 = 19003;
    pub const QUIZ: i32 = 19004;
    pub const CHECK_PHOTO_RESULT: i32 = 19005;
    pub const PARSE_FAILURE: i32 = 3311;
    pub const TRANSPORT_FAILURE: i32 = 3312;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    VerifyPhone,
    VerifyPhoneCode,
    VerifyEmail,
    VerifySocialNetworks,
    GetAvailableNetworks,
    GetQuiz,
    VerifyQuiz,
    GenerateCriminalReport,
    GetUser,
    UpdateUser,
    AuthenticateProfile,
    ComparePhotos,
    UploadId,
    UploadIdEnhanced,
    UploadPassport,
    CheckUploadId,
    CheckUploadPassport,
}

/// Shape of the success payload an operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Simple,
    Networks,
    User,
    Quiz,
    PhotoCheck,
}

impl Operation {
    pub const ALL: [Operation; 17] = [
        Operation::VerifyPhone,
        Operation::VerifyPhoneCode,
        Operation::VerifyEmail,
        Operation::VerifySocialNetworks,
        Operation::GetAvailableNetworks,
        Operation::GetQuiz,
        Operation::VerifyQuiz,
        Operation::GenerateCriminalReport,
        Operation::GetUser,
        Operation::UpdateUser,
        Operation::AuthenticateProfile,
        Operation::ComparePhotos,
        Operation::UploadId,
        Operation::UploadIdEnhanced,
        Operation::UploadPassport,
        Operation::CheckUploadId,
        Operation::CheckUploadPassport,
    ];

    /// Last path segment of the endpoint URL.
    pub fn path(self) -> &'static str {
        match self {
            Operation::VerifyPhone => "verifyPhone",
            Operation::VerifyPhoneCode => "verifyPhoneCode",
            Operation::VerifyEmail => "verifyEmail",
            Operation::VerifySocialNetworks => "verifySocialNetworks",
            Operation::GetAvailableNetworks => "getAvailableNetworks",
            Operation::GetQuiz => "getQuiz",
            Operation::VerifyQuiz => "verifyQuiz",
            Operation::GenerateCriminalReport => "generateCriminalReport",
            Operation::GetUser => "getUser",
            Operation::UpdateUser => "updateUser",
            Operation::AuthenticateProfile => "authenticateProfile",
            Operation::ComparePhotos => "comparePhotos",
            Operation::UploadId => "uploadId",
            Operation::UploadIdEnhanced => "uploadIdEnhanced",
            Operation::UploadPassport => "uploadPassport",
            Operation::CheckUploadId => "checkUploadId",
            Operation::CheckUploadPassport => "checkUploadPassport",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.path() == path)
    }

    pub fn result_shape(self) -> ResultShape {
        match self {
            Operation::GetAvailableNetworks => ResultShape::Networks,
            Operation::GetQuiz => ResultShape::Quiz,
            Operation::GetUser | Operation::UpdateUser => ResultShape::User,
            Operation::CheckUploadId | Operation::CheckUploadPassport => ResultShape::PhotoCheck,
            _ => ResultShape::Simple,
        }
    }

    /// Photo endpoints normalize images before the request is built.
    pub fn uploads_images(self) -> bool {
        matches!(
            self,
            Operation::ComparePhotos | Operation::UploadId | Operation::UploadIdEnhanced | Operation::UploadPassport
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// One operation with its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Call {
    VerifyPhone { access_code: String },
    VerifyPhoneCode { access_code: String, sms_code: String },
    VerifyEmail { access_code: String },
    VerifySocialNetworks(SocialNetworkVerification),
    GetAvailableNetworks { access_code: String },
    GetQuiz { access_code: String },
    VerifyQuiz(QuizAnswers),
    GenerateCriminalReport { access_code: String },
    GetUser { access_code: String },
    UpdateUser(User),
    AuthenticateProfile { access_code: String },
    ComparePhotos { access_code: String, img1: Photo, img2: Photo },
    UploadId { access_code: String, front: Photo, back: Photo },
    UploadIdEnhanced { access_code: String, front: Photo, back: Photo },
    UploadPassport { access_code: String, front: Photo },
    CheckUploadId { access_code: String },
    CheckUploadPassport { access_code: String },
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::VerifyPhone { .. } => Operation::VerifyPhone,
            Call::VerifyPhoneCode { .. } => Operation::VerifyPhoneCode,
            Call::VerifyEmail { .. } => Operation::VerifyEmail,
            Call::VerifySocialNetworks(_) => Operation::VerifySocialNetworks,
            Call::GetAvailableNetworks { .. } => Operation::GetAvailableNetworks,
            Call::GetQuiz { .. } => Operation::GetQuiz,
            Call::VerifyQuiz(_) => Operation::VerifyQuiz,
            Call::GenerateCriminalReport { .. } => Operation::GenerateCriminalReport,
            Call::GetUser { .. } => Operation::GetUser,
            Call::UpdateUser(_) => Operation::UpdateUser,
            Call::AuthenticateProfile { .. } => Operation::AuthenticateProfile,
            Call::ComparePhotos { .. } => Operation::ComparePhotos,
            Call::UploadId { .. } => Operation::UploadId,
            Call::UploadIdEnhanced { .. } => Operation::UploadIdEnhanced,
            Call::UploadPassport { .. } => Operation::UploadPassport,
            Call::CheckUploadId { .. } => Operation::CheckUploadId,
            Call::CheckUploadPassport { .. } => Operation::CheckUploadPassport,
        }
    }

    pub fn access_code(&self) -> Option<&str> {
        match self {
            Call::VerifyPhone { access_code }
            | Call::VerifyPhoneCode { access_code, .. }
            | Call::VerifyEmail { access_code }
            | Call::GetAvailableNetworks { access_code }
            | Call::GetQuiz { access_code }
            | Call::GenerateCriminalReport { access_code }
            | Call::GetUser { access_code }
            | Call::AuthenticateProfile { access_code }
            | Call::ComparePhotos { access_code, .. }
            | Call::UploadId { access_code, .. }
            | Call::UploadIdEnhanced { access_code, .. }
            | Call::UploadPassport { access_code, .. }
            | Call::CheckUploadId { access_code }
            | Call::CheckUploadPassport { access_code } => Some(access_code),
            Call::VerifySocialNetworks(body) => Some(&body.access_code),
            Call::VerifyQuiz(body) => Some(&body.access_code),
            Call::UpdateUser(user) => user.access_code.as_deref(),
        }
    }

    pub fn photos(&self) -> Vec<&Photo> {
        match self {
            Call::ComparePhotos { img1, img2, .. } => vec![img1, img2],
            Call::UploadId { front, back, .. } | Call::UploadIdEnhanced { front, back, .. } => vec![front, back],
            Call::UploadPassport { front, .. } => vec![front],
            _ => Vec::new(),
        }
    }

    /// Cheap local checks that must pass before anything is scheduled or
    /// sent. Image decoding is deferred to the worker.
    pub fn check_preconditions(&self) -> Result<(), ApiError> {
        require_access_code(self.access_code())?;
        self.photos().into_iter().try_for_each(Photo::validate)
    }
}

pub(crate) fn require_access_code(access_code: Option<&str>) -> Result<&str, ApiError> {
    match access_code.map(str::trim) {
        Some(code) if !code.is_empty() => Ok(code),
        _ => Err(ApiError::MissingAccessCode),
    }
}

/// Success payload of a completed call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Simple(SimpleResponse),
    Networks(AvailableNetworks),
    User(User),
    Quiz(Quiz),
    PhotoCheck(CheckPhotoResult),
}

impl Payload {
    pub fn tag(&self) -> i32 {
        match self {
            Payload::Simple(_) => tags::SIMPLE_RESPONSE,
            Payload::Networks(_) => tags::AVAILABLE_NETWORKS,
            Payload::User(_) => tags::USER,
            Payload::Quiz(_) => tags::QUIZ,
            Payload::PhotoCheck(_) => tags::CHECK_PHOTO_RESULT,
        }
    }
}

/// Tag for a failed call.
pub fn error_tag(err: &ApiError) -> i32 {
    match err.kind() {
        ErrorKind::Parse => tags::PARSE_FAILURE,
        ErrorKind::Transport => tags::TRANSPORT_FAILURE,
        ErrorKind::Precondition | ErrorKind::Domain | ErrorKind::Resource => tags::ERROR,
    }
}

/// Outcome of one call, as delivered to a listener.
#[derive(Debug, Clone)]
pub struct Completion {
    pub operation: Operation,
    pub outcome: Result<Payload, ApiError>,
}

impl Completion {
    pub fn tag(&self) -> i32 {
        match &self.outcome {
            Ok(payload) => payload.tag(),
            Err(err) => error_tag(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_path(op.path()), Some(op));
        }
        assert_eq!(Operation::from_path("deleteUser"), None);
    }

    #[test]
    fn operation_serializes_as_path() {
        for op in Operation::ALL {
            let json = serde_json::to_value(op).unwrap();
            assert_eq!(json, serde_json::Value::String(op.path().to_string()));
        }
    }

    #[test]
    fn call_from_json() {
        let call: Call =
            serde_json::from_str(r#"{"operation":"verifyPhoneCode","accessCode":"abc123","smsCode":"123456"}"#)
                .unwrap();
        assert_eq!(call.operation(), Operation::VerifyPhoneCode);
        assert_eq!(call.access_code(), Some("abc123"));

        let call: Call = serde_json::from_str(
            r#"{"operation":"verifySocialNetworks","accessCode":"abc123","network":"facebook",
                "socialMediaAccessToken":"t","socialMediaUserId":"u"}"#,
        )
        .unwrap();
        assert_eq!(call.operation(), Operation::VerifySocialNetworks);
    }

    #[test]
    fn photo_call_from_json() {
        let call: Call = serde_json::from_str(
            r#"{"operation":"uploadPassport","accessCode":"abc123","front":{"path":"/tmp/passport.jpg"}}"#,
        )
        .unwrap();
        assert_eq!(call.operation(), Operation::UploadPassport);
        assert_eq!(call.photos().len(), 1);
    }

    #[test]
    fn blank_access_code_fails_precondition() {
        let call = Call::GetQuiz {
            access_code: "   ".into(),
        };
        assert!(matches!(call.check_preconditions(), Err(ApiError::MissingAccessCode)));
        let call = Call::UpdateUser(User::default());
        assert!(matches!(call.check_preconditions(), Err(ApiError::MissingAccessCode)));
    }

    #[test]
    fn empty_photo_fails_precondition() {
        let call = Call::UploadPassport {
            access_code: "abc123".into(),
            front: Photo::Bytes(Vec::new()),
        };
        assert!(matches!(call.check_preconditions(), Err(ApiError::InvalidImage(_))));
    }

    #[test]
    fn shapes_and_tags() {
        assert_eq!(Operation::GetQuiz.result_shape(), ResultShape::Quiz);
        assert_eq!(Operation::CheckUploadPassport.result_shape(), ResultShape::PhotoCheck);
        assert_eq!(Operation::UploadId.result_shape(), ResultShape::Simple);
        assert!(Operation::UploadIdEnhanced.uploads_images());
        assert!(!Operation::CheckUploadId.uploads_images());

        let done = Completion {
            operation: Operation::GetUser,
            outcome: Ok(Payload::User(User::default())),
        };
        assert_eq!(done.tag(), tags::USER);
        let failed = Completion {
            operation: Operation::GetUser,
            outcome: Err(ApiError::Transport("timed out".into())),
        };
        assert_eq!(failed.tag(), tags::TRANSPORT_FAILURE);
        assert_eq!(error_tag(&ApiError::MissingAccessCode), tags::ERROR);
    }
}
