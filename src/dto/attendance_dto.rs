use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSignatureLinkRequest {
    pub attendance_sheet_id: Uuid,
    #[validate(length(min = 1, message = "studentIds must not be empty"))]
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SignatureLinkResponse {
    pub success: bool,
    pub message: String,
    pub link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignSheetRequest {
    pub user_id: Uuid,
    pub present: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateSheetRequest {
    pub validated_by: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_link_request_uses_camel_case() {
        let raw = r#"{
            "attendanceSheetId": "7f0a1f34-7d30-4d5e-9f3a-1f4f2b4a2b31",
            "studentIds": ["9c56a3a1-51d5-4f9e-8f3e-1a2b3c4d5e6f"]
        }"#;
        let parsed: CreateSignatureLinkRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.student_ids.len(), 1);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn empty_student_list_fails_validation() {
        let raw = r#"{
            "attendanceSheetId": "7f0a1f34-7d30-4d5e-9f3a-1f4f2b4a2b31",
            "studentIds": []
        }"#;
        let parsed: CreateSignatureLinkRequest = serde_json::from_str(raw).unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn sign_request_parses_presence_flag() {
        let raw = r#"{"userId": "9c56a3a1-51d5-4f9e-8f3e-1a2b3c4d5e6f", "present": false}"#;
        let parsed: SignSheetRequest = serde_json::from_str(raw).unwrap();
        assert!(!parsed.present);
    }
}
