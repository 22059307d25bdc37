use serde::Deserialize;

pub const LOGIN_PATH: &str = "/api/auth/login";

pub const UPLOAD_PATH: &str = "/api/admin/upload-students";

pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Headers the server reads, in canonical spelling.
pub const HEADERS: [&str; 5] = ["Name", "RollNo", "Section", "Password", "Semester"];

/// Error body returned by the server for any non-2xx answer.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub msg: String,
    #[serde(default)]
    pub error: Option<String>,
}
