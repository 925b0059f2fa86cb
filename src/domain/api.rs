//! Wire models for the remote attendance API and the normalized
//! recognition result the views consume.

use serde::{Deserialize, Serialize};

/// Names of the cached read queries.
pub mod queries {
    pub const STUDENTS: &str = "students";
    pub const ATTENDANCE_STATS: &str = "attendance-stats";
    pub const TODAY_ATTENDANCE: &str = "today-attendance";
    pub const ATTENDANCE_HISTORY: &str = "attendance-history";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub name: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub registered_at: Option<String>,
}

/// Response of `GET /api/students`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentListResponse {
    pub students: Vec<Student>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub name: String,
    pub timestamp: String,
    pub confidence: f64,
}

/// Response of `GET /api/attendance/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceStats {
    pub total_students: u32,
    pub present_today: u32,
    pub attendance_rate: f64,
    pub recent_entries: Vec<AttendanceRecord>,
}

/// Response of `GET /api/attendance/today`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayAttendance {
    pub date: String,
    pub total_entries: u32,
    pub unique_students: u32,
    pub records: Vec<AttendanceRecord>,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    pub count: u32,
    pub attendees: Vec<String>,
}

/// Response of `GET /api/attendance/history?days=N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceHistory {
    pub history: Vec<HistoryEntry>,
}

/// Response of `DELETE /api/students/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Response of `POST /api/register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub message: String,
    #[serde(default)]
    pub student_id: Option<String>,
    pub faces_detected: u32,
    #[serde(default)]
    pub model_used: String,
}

/// One face as returned by `POST /api/recognize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedFace {
    pub name: String,
    pub confidence: f64,
    #[serde(default)]
    pub student_id: Option<String>,
    pub bbox: Vec<f64>,
}

/// Response of `POST /api/recognize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    pub message: String,
    pub recognized_faces: Vec<RecognizedFace>,
    pub total_faces_detected: u32,
    #[serde(default)]
    pub model_used: String,
}

/// One recognized identity, normalized for display.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub name: String,
    /// Raw confidence in `[0, 1]`, kept unrounded; rounding happens only in
    /// display formatting.
    pub confidence: f64,
    pub student_id: Option<String>,
    pub bounding_box: [f64; 4],
}

impl FaceMatch {
    /// Confidence rendered for display, e.g. `92.0%`.
    pub fn confidence_display(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

/// Normalized recognition outcome. Matches keep the order the server
/// returned them in; ordering is server authority.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub message: String,
    pub total_faces_detected: u32,
    pub model_used: String,
    pub matches: Vec<FaceMatch>,
}

impl From<RecognitionResponse> for RecognitionResult {
    fn from(response: RecognitionResponse) -> Self {
        let matches = response
            .recognized_faces
            .into_iter()
            .map(|face| {
                let mut bounding_box = [0.0; 4];
                for (slot, value) in bounding_box.iter_mut().zip(face.bbox) {
                    *slot = value;
                }

                FaceMatch {
                    name: face.name,
                    confidence: face.confidence,
                    student_id: face.student_id,
                    bounding_box,
                }
            })
            .collect();

        Self {
            message: response.message,
            total_faces_detected: response.total_faces_detected,
            model_used: response.model_used,
            matches,
        }
    }
}
