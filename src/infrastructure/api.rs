//! Request builders for the attendance API and the loader that feeds the
//! read queries.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::api::queries;
use crate::domain::query::QueryKey;
use crate::domain::submission::ImageFile;
use crate::domain::ClientError;
use crate::infrastructure::cache::QueryLoader;
use crate::infrastructure::transport::{MultipartBody, RequestSpec, Transport};

/// Day range requested when a history key carries no `days` parameter.
pub const DEFAULT_HISTORY_DAYS: u32 = 7;

pub fn students_key() -> QueryKey {
    QueryKey::new(queries::STUDENTS)
}

pub fn attendance_stats_key() -> QueryKey {
    QueryKey::new(queries::ATTENDANCE_STATS)
}

pub fn today_attendance_key() -> QueryKey {
    QueryKey::new(queries::TODAY_ATTENDANCE)
}

pub fn attendance_history_key(days: u32) -> QueryKey {
    QueryKey::new(queries::ATTENDANCE_HISTORY).with_param("days", days.to_string())
}

pub fn list_students() -> RequestSpec {
    RequestSpec::get("/api/students")
}

pub fn attendance_stats() -> RequestSpec {
    RequestSpec::get("/api/attendance/stats")
}

pub fn today_attendance() -> RequestSpec {
    RequestSpec::get("/api/attendance/today")
}

pub fn attendance_history(days: u32) -> RequestSpec {
    RequestSpec::get("/api/attendance/history").query_param("days", days.to_string())
}

/// The identity name goes into the path, URL-encoded.
pub fn delete_student(name: &str) -> RequestSpec {
    RequestSpec::delete(format!("/api/students/{}", urlencoding::encode(name)))
}

pub fn register_student(
    name: &str,
    student_id: Option<&str>,
    file: ImageFile,
) -> RequestSpec {
    let mut body = MultipartBody::new().field("name", name);
    if let Some(student_id) = student_id {
        body = body.field("student_id", student_id);
    }

    RequestSpec::post("/api/register").multipart(body.file(file))
}

pub fn recognize_faces(file: ImageFile) -> RequestSpec {
    RequestSpec::post("/api/recognize").multipart(MultipartBody::new().file(file))
}

/// Loads the four read queries through the transport gateway. Registered in
/// the cache once for each query name.
#[derive(Debug, Clone)]
pub struct ApiLoader {
    transport: Arc<dyn Transport>,
}

impl ApiLoader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl QueryLoader for ApiLoader {
    async fn load(&self, key: &QueryKey) -> Result<Value, ClientError> {
        let spec = match key.name() {
            queries::STUDENTS => list_students(),
            queries::ATTENDANCE_STATS => attendance_stats(),
            queries::TODAY_ATTENDANCE => today_attendance(),
            queries::ATTENDANCE_HISTORY => {
                let days = key
                    .param("days")
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(DEFAULT_HISTORY_DAYS);
                attendance_history(days)
            }
            other => {
                return Err(ClientError::validation(format!(
                    "Unknown query name: {}",
                    other
                )));
            }
        };

        self.transport.request(spec).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::infrastructure::transport::mock::MockTransport;
    use crate::infrastructure::transport::{Body, Method};

    #[test]
    fn test_delete_path_is_url_encoded() {
        let spec = delete_student("Mary Jane");
        assert_eq!(spec.method, Method::Delete);
        assert_eq!(spec.path, "/api/students/Mary%20Jane");
    }

    #[test]
    fn test_register_includes_optional_student_id() {
        let file = ImageFile::new("face.jpg", vec![0xff]);
        let spec = register_student("Alice", Some("S-1"), file);

        let Body::Multipart(body) = spec.body else {
            panic!("Expected multipart body");
        };
        assert!(body.fields.contains(&("name".to_string(), "Alice".to_string())));
        assert!(body.fields.contains(&("student_id".to_string(), "S-1".to_string())));
        assert_eq!(body.file.unwrap().file_name, "face.jpg");
    }

    #[test]
    fn test_register_omits_empty_student_id() {
        let file = ImageFile::new("face.jpg", vec![0xff]);
        let spec = register_student("Alice", None, file);

        let Body::Multipart(body) = spec.body else {
            panic!("Expected multipart body");
        };
        assert_eq!(body.fields.len(), 1);
    }

    #[tokio::test]
    async fn test_loader_routes_each_query_name() {
        let transport = Arc::new(
            MockTransport::new()
                .with_response("/api/students", json!({"students": [], "total": 0}))
                .with_response("/api/attendance/stats", json!({"present_today": 0}))
                .with_response("/api/attendance/today", json!({"total_entries": 0}))
                .with_response("/api/attendance/history", json!({"history": []})),
        );
        let loader = ApiLoader::new(transport.clone());

        loader.load(&students_key()).await.unwrap();
        loader.load(&attendance_stats_key()).await.unwrap();
        loader.load(&today_attendance_key()).await.unwrap();
        loader.load(&attendance_history_key(14)).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(
            requests[3].query,
            vec![("days".to_string(), "14".to_string())]
        );
    }

    #[tokio::test]
    async fn test_history_without_days_uses_default() {
        let transport = Arc::new(
            MockTransport::new().with_response("/api/attendance/history", json!({"history": []})),
        );
        let loader = ApiLoader::new(transport.clone());

        loader
            .load(&QueryKey::new(queries::ATTENDANCE_HISTORY))
            .await
            .unwrap();

        assert_eq!(
            transport.requests()[0].query,
            vec![("days".to_string(), DEFAULT_HISTORY_DAYS.to_string())]
        );
    }

    #[tokio::test]
    async fn test_unknown_query_name_is_rejected() {
        let loader = ApiLoader::new(Arc::new(MockTransport::new()));
        let error = loader.load(&QueryKey::new("bogus")).await.unwrap_err();
        assert!(error.is_validation());
    }
}
