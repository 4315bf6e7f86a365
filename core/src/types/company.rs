use serde::{Deserialize, Serialize};

/// The company account a session belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_take_test: Option<f32>,
    #[serde(rename = "networks", default)]
    pub allowed_networks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_from_envelope_data() {
        let company: Company = crate::parser::convert(
            r#"{"successful":true,"data":{"companyId":"c1","companyName":"Acme","daysToTakeTest":3.5,"networks":["facebook"]}}"#,
        )
        .unwrap();
        assert_eq!(company.company_name.as_deref(), Some("Acme"));
        assert_eq!(company.days_to_take_test, Some(3.5));
        assert_eq!(company.allowed_networks, vec!["facebook"]);
    }
}
