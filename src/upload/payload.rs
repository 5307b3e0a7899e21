//! Backend JSON bodies

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Body of a backend POST, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendPayload {
    UploadTemplate {
        filename: String,
        #[serde(rename = "contentType")]
        content_type: String,
        #[serde(rename = "streamUrl")]
        stream_url: String,
        /// `data:<mime>;base64,<bytes>`
        data: String,
    },
    AlignmentPerson {
        person_ratio_percent: f64,
        center_position: CenterPosition,
        face_center_offset_deg: f64,
    },
}

/// Body landmark the subject is centered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CenterPosition {
    Eyes,
    Shoulders,
    Hips,
    Knees,
}

impl std::str::FromStr for CenterPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eyes" => Ok(CenterPosition::Eyes),
            "shoulders" => Ok(CenterPosition::Shoulders),
            "hips" => Ok(CenterPosition::Hips),
            "knees" => Ok(CenterPosition::Knees),
            other => Err(format!("unknown center position: {}", other)),
        }
    }
}

/// Subject framing measurements sent as `alignment_person`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSubmission {
    pub person_ratio_percent: f64,
    pub center_position: CenterPosition,
    pub face_center_offset_deg: f64,
}

impl AlignmentSubmission {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.person_ratio_percent) {
            return Err(format!(
                "person ratio must be within 0-100, got {}",
                self.person_ratio_percent
            ));
        }
        if !self.face_center_offset_deg.is_finite() {
            return Err("face center offset must be a finite number".to_string());
        }
        Ok(())
    }
}

impl From<AlignmentSubmission> for BackendPayload {
    fn from(submission: AlignmentSubmission) -> Self {
        BackendPayload::AlignmentPerson {
            person_ratio_percent: submission.person_ratio_percent,
            center_position: submission.center_position,
            face_center_offset_deg: submission.face_center_offset_deg,
        }
    }
}

/// Encode bytes as a base64 data URL
pub fn data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}
