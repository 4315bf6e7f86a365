use serde::{Deserialize, Serialize};

/// Body for `verifyPhoneCode`. `verifyPhone` sends only the access code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneVerification {
    pub access_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_code: Option<String>,
}

impl PhoneVerification {
    pub fn new(access_code: &str, sms_code: &str) -> Self {
        Self {
            access_code: access_code.to_string(),
            sms_code: Some(sms_code.to_string()),
        }
    }
}

/// Body for `verifySocialNetworks`: proof that the user controls an account
/// on `network`, as returned by that network's OAuth flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialNetworkVerification {
    pub access_code: String,
    pub network: String,
    pub social_media_access_token: String,
    pub social_media_user_id: String,
}

/// Generic acknowledgement returned by most verification steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_message: Option<String>,
}

impl SimpleResponse {
    pub fn result_message(&self) -> &str {
        self.result_message.as_deref().unwrap_or_default()
    }
}

/// Social networks the company allows the user to verify against.
///
/// Older responses carry `{"availableNetworks": [...]}`; newer ones put a
/// bare list in the envelope's `data` member. Both deserialize here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "NetworksRepr")]
pub struct AvailableNetworks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    #[serde(default)]
    pub available_networks: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NetworksRepr {
    List(Vec<String>),
    #[serde(rename_all = "camelCase")]
    Object {
        #[serde(default)]
        successful: Option<bool>,
        #[serde(default)]
        available_networks: Option<Vec<String>>,
    },
}

impl From<NetworksRepr> for AvailableNetworks {
    fn from(repr: NetworksRepr) -> Self {
        match repr {
            NetworksRepr::List(available_networks) => Self {
                successful: None,
                available_networks,
            },
            NetworksRepr::Object {
                successful,
                available_networks,
            } => Self {
                successful,
                available_networks: available_networks.unwrap_or_default(),
            },
        }
    }
}
