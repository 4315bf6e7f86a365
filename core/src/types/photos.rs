use serde::{Deserialize, Serialize};

/// Upload body shared by the photo and document endpoints.
///
/// `comparePhotos` fills `img1`/`img2`; `uploadId` and `uploadIdEnhanced`
/// fill `idFront`/`idBack`; `uploadPassport` fills `idFront` only. Values
/// are base64-encoded JPEG.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpload {
    pub access_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_back: Option<String>,
}

impl PhotoUpload {
    pub fn compare(access_code: &str, img1: String, img2: String) -> Self {
        Self {
            access_code: access_code.to_string(),
            img1: Some(img1),
            img2: Some(img2),
            ..Self::default()
        }
    }

    pub fn id_card(access_code: &str, front: String, back: String) -> Self {
        Self {
            access_code: access_code.to_string(),
            id_front: Some(front),
            id_back: Some(back),
            ..Self::default()
        }
    }

    pub fn passport(access_code: &str, front: String) -> Self {
        Self {
            access_code: access_code.to_string(),
            id_front: Some(front),
            ..Self::default()
        }
    }

    /// The encoded images present, in wire order.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        [&self.img1, &self.img2, &self.id_front, &self.id_back]
            .into_iter()
            .filter_map(|i| i.as_deref())
    }
}

// Image payloads run to megabytes; print sizes instead.
impl std::fmt::Debug for PhotoUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = |i: &Option<String>| i.as_ref().map(String::len);
        f.debug_struct("PhotoUpload")
            .field("access_code", &self.access_code)
            .field("img1_len", &len(&self.img1))
            .field("img2_len", &len(&self.img2))
            .field("id_front_len", &len(&self.id_front))
            .field("id_back_len", &len(&self.id_back))
            .finish()
    }
}

/// Status of a previously uploaded document (`checkUploadId`,
/// `checkUploadPassport`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPhotoResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_attempts_left: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
