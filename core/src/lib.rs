//! Client core for the Authenticating identity-verification API.
//!
//! # Overview
//! Phone, email and social-network verification, identity quizzes, photo
//! and document upload, background reports and user profile calls against
//! `{base}/api/{version}/{operation}`.
//!
//! # Design
//! - [`AuthenticatingClient`] builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network, so a host can
//!   drive the I/O itself (the C surface does this).
//! - [`AuthenticatingApi`] pairs the client with a [`Transport`] for
//!   blocking calls; [`Dispatcher`] runs those calls in the background and
//!   reports a [`Completion`] to a listener.
//! - Both response envelope revisions are understood; see [`envelope`].
//! - Photos are shrunk to a raw byte budget in one proportional resize
//!   before upload; see [`photo`].

pub mod api;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod http;
pub mod logging;
pub mod operation;
pub mod parser;
pub mod photo;
pub mod transport;
pub mod types;

pub use api::AuthenticatingApi;
pub use client::AuthenticatingClient;
pub use config::{ConfigError, SdkConfig};
pub use dispatch::Dispatcher;
pub use error::{ApiError, ErrorKind};
pub use http::{HttpRequest, HttpResponse};
pub use logging::WireLog;
pub use operation::{tags, Call, Completion, Operation, Payload};
pub use photo::{ImageNormalizer, Photo};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Answer, AvailableNetworks, CheckPhotoResult, Choice, Company, PhoneVerification, PhotoUpload, Quiz, QuizAnswers,
    QuizQuestion, SimpleResponse, SocialNetworkVerification, User,
};
