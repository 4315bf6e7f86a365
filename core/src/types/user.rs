use std::fmt;

use serde::{Deserialize, Serialize};

use super::is_blank;

/// The person under verification.
///
/// Used both as the request body for user-scoped calls (often with only
/// `access_code` set) and as the response payload of `getUser` /
/// `updateUser`. `street`, `province` and `building_number` are the
/// Canadian address fields.
///
/// The `ssn` field must never be persisted by the embedding application;
/// `Debug` output redacts it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
}

impl User {
    /// A request body carrying only the session token.
    pub fn with_access_code(access_code: &str) -> Self {
        Self {
            access_code: Some(access_code.to_string()),
            ..Self::default()
        }
    }

    /// Date of birth as `(year, month, day)`, each defaulting to 0.
    pub fn date_of_birth(&self) -> (i32, i32, i32) {
        (
            self.year.unwrap_or(0),
            self.month.unwrap_or(0),
            self.day.unwrap_or(0),
        )
    }

    /// Prepare a profile for an update call.
    ///
    /// Blank strings are dropped so they are omitted from the body rather
    /// than clearing the server-side value, and `phone` is reduced to digits.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.first_name,
            &mut self.last_name,
            &mut self.email,
            &mut self.address,
            &mut self.city,
            &mut self.state,
            &mut self.zipcode,
            &mut self.country,
            &mut self.street,
            &mut self.province,
            &mut self.building_number,
            &mut self.ssn,
        ] {
            if is_blank(field.as_deref()) {
                *field = None;
            }
        }
        self.phone = self
            .phone
            .map(|p| p.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|p| !p.is_empty());
        self
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("access_code", &self.access_code)
            .field("company_id", &self.company_id)
            .field("user_id", &self.user_id)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("date_of_birth", &(self.year, self.month, self.day))
            .field("address", &self.address)
            .field("city", &self.city)
            .field("state", &self.state)
            .field("zipcode", &self.zipcode)
            .field("country", &self.country)
            .field("ssn", &self.ssn.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}
