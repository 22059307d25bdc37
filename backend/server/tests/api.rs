use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use catalog::{
    Branch,
    payloads::{AdminRoleName, NewAdmin},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use server::{
    admins::create_admin,
    config::Config,
    database::MemoryStore,
    routes::router,
    state::AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    app: Router,
    state: Arc<AppState>,
}

impl TestApp {
    fn new() -> Self {
        let config = Config {
            bcrypt_cost: 4,
            ..Config::default()
        };
        let state = AppState::with_store(config, Arc::new(MemoryStore::default()));

        Self {
            app: router(state.clone()),
            state,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    async fn admin(&self, username: &str, branch: Option<Branch>, role: AdminRoleName) -> String {
        create_admin(
            self.state.store(),
            NewAdmin {
                name: Some(username.to_string()),
                username: Some(username.to_string()),
                password: Some("secret".to_string()),
                branch,
                role: Some(role),
            },
            4,
        )
        .await
        .unwrap();

        self.login(json!({ "username": username, "password": "secret" }))
            .await
    }

    async fn login(&self, body: Value) -> String {
        let (status, body) = self
            .call(Method::POST, "/api/auth/login", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        body["token"].as_str().unwrap().to_string()
    }

    async fn elective(&self, token: &str, code: &str, elective_type: &str, number: i64) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/electives",
                Some(token),
                Some(json!({
                    "name": format!("Elective {code}"),
                    "code": code,
                    "electiveType": elective_type,
                    "electiveNumber": number,
                    "semester": 5,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        body["elective"]["id"].as_str().unwrap().to_string()
    }

    async fn upload(&self, token: &str, rows: Value) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/admin/upload-students",
                Some(token),
                Some(json!({ "rows": rows })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        body["results"].clone()
    }
}

fn student_row(roll_no: &str) -> Value {
    json!({
        "Name": format!("Student {roll_no}"),
        "RollNo": roll_no,
        "Section": "A",
        "Password": 1234,
        "Semester": 5,
    })
}

#[tokio::test]
async fn test_index_and_health() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    let (status, body) = app.call(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["auth"], "/api/auth");
}

#[tokio::test]
async fn test_register_then_slot_filled() {
    let app = TestApp::new();
    let admin = app.admin("admincse", Some(Branch::Cse), AdminRoleName::Admin).await;

    let first = app.elective(&admin, "OE1", "open", 1).await;
    let second = app.elective(&admin, "OE1B", "open", 1).await;

    let results = app.upload(&admin, json!([student_row("21CS001")])).await;
    assert_eq!(results["created"], 1);

    let student = app
        .login(json!({ "rollNo": "21CS001", "password": "1234" }))
        .await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/registrations",
            Some(&student),
            Some(json!({ "electiveId": first })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["registration"]["semester"], 5);
    assert_eq!(body["registration"]["electiveType"], "open");
    assert_eq!(body["registration"]["electiveNumber"], 1);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/registrations",
            Some(&student),
            Some(json!({ "electiveId": second })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "You have already registered for this elective slot");

    let (status, body) = app
        .call(Method::GET, "/api/registrations/me", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["elective"]["code"], "OE1");

    let (_, students) = app
        .call(Method::GET, "/api/admin/students", Some(&admin), None)
        .await;
    let selections = students[0]["selectedElectives"].as_array().unwrap();
    assert_eq!(selections.len(), 1);
    assert_eq!(selections[0]["elective"], first.as_str());
    assert!(students[0].get("passwordHash").is_none());

    let (status, body) = app
        .call(Method::GET, "/api/electives/my", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_range_rejected_over_http() {
    let app = TestApp::new();
    let admin = app.admin("admincse", Some(Branch::Cse), AdminRoleName::Admin).await;

    for (elective_type, number) in [("professional", 0), ("professional", 7), ("open", 4)] {
        let (status, body) = app
            .call(
                Method::POST,
                "/api/electives",
                Some(&admin),
                Some(json!({
                    "name": "Bad",
                    "code": format!("BAD{number}"),
                    "electiveType": elective_type,
                    "electiveNumber": number,
                    "semester": 5,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn test_form_numbers_as_text() {
    let app = TestApp::new();
    let admin = app.admin("admincse", Some(Branch::Cse), AdminRoleName::Admin).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/electives",
            Some(&admin),
            Some(json!({
                "name": "Cloud Computing",
                "code": "CS501",
                "electiveType": "professional",
                "electiveNumber": "3",
                "semester": "5",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["elective"]["electiveNumber"], 3);
    assert_eq!(body["elective"]["semester"], 5);

    let id = body["elective"]["id"].as_str().unwrap().to_string();
    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/electives/{id}"),
            Some(&admin),
            Some(json!({ "electiveNumber": "6", "semester": "7" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["updated"]["electiveNumber"], 6);
    assert_eq!(body["updated"]["semester"], 7);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/electives/{id}"),
            Some(&admin),
            Some(json!({ "electiveNumber": "7" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/electives",
            Some(&admin),
            Some(json!({
                "name": "Bad",
                "code": "BAD1",
                "electiveType": "open",
                "electiveNumber": "one",
                "semester": "5",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_or_bad_token() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/api/electives", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "No token provided");

    let (status, body) = app
        .call(Method::GET, "/api/electives", Some("forged.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Invalid token");
}

#[tokio::test]
async fn test_roles_are_enforced() {
    let app = TestApp::new();
    let admin = app.admin("admincse", Some(Branch::Cse), AdminRoleName::Admin).await;
    app.upload(&admin, json!([student_row("21CS001")])).await;
    let student = app
        .login(json!({ "rollNo": "21CS001", "password": "1234" }))
        .await;

    let (status, _) = app.call(Method::GET, "/api/electives", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/registrations",
            Some(&admin),
            Some(json!({ "electiveId": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, "/api/super-admin/admins", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/auth/change-password",
            Some(&student),
            Some(json!({ "currentPassword": "1234", "newPassword": "5678" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_other_branch_elective_looks_missing() {
    let app = TestApp::new();
    let cse = app.admin("admincse", Some(Branch::Cse), AdminRoleName::Admin).await;
    let ece = app.admin("adminece", Some(Branch::Ece), AdminRoleName::Admin).await;
    let foreign = app.elective(&ece, "EC1", "open", 1).await;

    let patch = json!({ "name": "Renamed" });
    let (foreign_status, foreign_body) = app
        .call(
            Method::PUT,
            &format!("/api/electives/{foreign}"),
            Some(&cse),
            Some(patch.clone()),
        )
        .await;
    let (missing_status, missing_body) = app
        .call(
            Method::PUT,
            &format!("/api/electives/{}", Uuid::new_v4()),
            Some(&cse),
            Some(patch),
        )
        .await;

    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_status, missing_status);
    assert_eq!(foreign_body, missing_body);

    let (status, body) = app.call(Method::GET, "/api/electives", Some(&cse), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = app
        .call(Method::DELETE, "/api/electives/not-a-uuid", Some(&cse), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_reports_bad_rows() {
    let app = TestApp::new();
    let admin = app.admin("admincse", Some(Branch::Cse), AdminRoleName::Admin).await;

    let mut broken = student_row("21CS002");
    broken.as_object_mut().unwrap().remove("Semester");

    let results = app
        .upload(&admin, json!([student_row("21CS001"), broken, student_row("21CS003")]))
        .await;
    assert_eq!(results["created"], 2);
    assert_eq!(results["updated"], 0);
    assert_eq!(results["errors"].as_array().unwrap().len(), 1);

    let results = app
        .upload(&admin, json!([student_row("21CS001"), student_row("21CS003")]))
        .await;
    assert_eq!(results["created"], 0);
    assert_eq!(results["updated"], 2);
}

#[tokio::test]
async fn test_super_admin_manages_admins() {
    let app = TestApp::new();
    let root = app.admin("root", None, AdminRoleName::SuperAdmin).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/super-admin/admins",
            Some(&root),
            Some(json!({
                "name": "IT Admin",
                "username": "adminit",
                "password": "pw",
                "branch": "IT",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["role"], "admin");
    assert_eq!(body["branch"], "IT");
    assert!(body.get("passwordHash").is_none());
    let created = body["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::POST,
            "/api/super-admin/admins",
            Some(&root),
            Some(json!({
                "name": "Again",
                "username": "adminit",
                "password": "pw",
                "branch": "IT",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(Method::GET, "/api/super-admin/admins", Some(&root), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let root_id = app
        .state
        .store()
        .admin_by_username("root")
        .await
        .unwrap()
        .unwrap()
        .id;
    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/super-admin/admins/{root_id}"),
            Some(&root),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/super-admin/admins/{created}"),
            Some(&root),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Admin deleted successfully");
}

#[tokio::test]
async fn test_super_admin_upload_needs_branch() {
    let app = TestApp::new();
    let root = app.admin("root", None, AdminRoleName::SuperAdmin).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/upload-students",
            Some(&root),
            Some(json!({ "rows": [student_row("21CS001")] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Branch is required");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/upload-students",
            Some(&root),
            Some(json!({ "rows": [student_row("21CS001")], "branch": "CSE" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["created"], 1);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let admin = app.admin("admincse", Some(Branch::Cse), AdminRoleName::Admin).await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/auth/change-password",
            Some(&admin),
            Some(json!({ "currentPassword": "secret", "newPassword": "fresh" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["msg"], "Password updated successfully");

    app.login(json!({ "username": "admincse", "password": "fresh" }))
        .await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "admincse", "password": "secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Invalid credentials");
}
