//! Request and response DTOs for the verification API.
//!
//! # Design
//! Field names follow the remote JSON contract exactly (camelCase, plus the
//! handful of legacy spellings such as `transactionID` and `nsquestionId`).
//! Optional fields are `Option` and are omitted from outbound JSON when
//! unset; nothing is defaulted on the way out. Response DTOs tolerate missing
//! fields and expose defaulting accessors where the old SDK defaulted on read.

mod company;
mod photos;
mod quiz;
mod user;
mod verification;

pub use company::Company;
pub use photos::{CheckPhotoResult, PhotoUpload};
pub use quiz::{Answer, Choice, Quiz, QuizAnswers, QuizQuestion};
pub use user::User;
pub use verification::{AvailableNetworks, PhoneVerification, SimpleResponse, SocialNetworkVerification};

use serde::{Deserialize, Deserializer};

/// Accept either a JSON string or number and keep it as a string.
///
/// The API is not consistent about quoting counters and ids.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(s)) => Some(s),
        Some(Loose::Int(n)) => Some(n.to_string()),
        Some(Loose::Float(n)) => Some(n.to_string()),
        None => None,
    })
}

/// `true` for `None`, empty, or whitespace-only strings.
pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}
