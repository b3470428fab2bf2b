#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum::{body::Body, http::Request};
use mongodb::bson::oid::ObjectId;

use media_vault::{
    config::AppConfig,
    dto::auth::RegisterRequest,
    repositories::{InMemoryFileRepository, InMemoryUserRepository},
    services::media::{DestroyOutcome, MediaError, MediaStore, UploadedAsset},
    utils::LocalFile,
    AppState,
};

pub const PASSWORD: &str = "correct-horse-battery";
pub const BOUNDARY: &str = "media-vault-test-boundary";

/// Media host stand-in that records every call.
#[derive(Default)]
pub struct FakeMediaStore {
    counter: AtomicUsize,
    pub uploads: Mutex<Vec<String>>,
    pub destroys: Mutex<Vec<String>>,
    pub fail_uploads: AtomicBool,
    pub fail_destroys: AtomicBool,
}

impl FakeMediaStore {
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn destroys(&self) -> Vec<String> {
        self.destroys.lock().unwrap().clone()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_destroys(&self, fail: bool) {
        self.fail_destroys.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn upload(&self, file: &LocalFile) -> Result<UploadedAsset, MediaError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::NotConfigured("upload disabled in test"));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let public_id = format!("media-vault/asset-{}", n);
        self.uploads.lock().unwrap().push(public_id.clone());

        let format = file
            .original_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        Ok(UploadedAsset {
            original_filename: file.original_name.clone(),
            secure_url: format!("https://media.test/{}", public_id),
            public_id,
            format,
            bytes: file.size,
            resource_type: "image".to_string(),
        })
    }

    async fn destroy(
        &self,
        public_id: &str,
        _resource_type: &str,
    ) -> Result<DestroyOutcome, MediaError> {
        self.destroys.lock().unwrap().push(public_id.to_string());
        if self.fail_destroys.load(Ordering::SeqCst) {
            return Err(MediaError::NotConfigured("destroy disabled in test"));
        }
        if self.uploads().iter().any(|id| id == public_id) {
            Ok(DestroyOutcome::Deleted)
        } else {
            Ok(DestroyOutcome::NotFound)
        }
    }
}

pub struct TestApp {
    pub state: AppState,
    pub users: InMemoryUserRepository,
    pub files: InMemoryFileRepository,
    pub media: Arc<FakeMediaStore>,
    pub scratch: PathBuf,
}

pub fn test_config(scratch: &PathBuf) -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.access_token_secret = "test-access-secret".to_string();
    config.auth.refresh_token_secret = "test-refresh-secret".to_string();
    config.auth.bcrypt_cost = 4;
    config.auth.secure_cookies = false;
    config.database.in_memory = true;
    config.server.static_dir = scratch.join("public").to_string_lossy().into_owned();
    config.server.temp_dir = scratch.join("temp").to_string_lossy().into_owned();
    config
}

pub fn setup_test_app() -> TestApp {
    let scratch = std::env::temp_dir().join(format!("media_vault_test_{}", uuid::Uuid::new_v4().simple()));
    let config = Arc::new(test_config(&scratch));

    let users = InMemoryUserRepository::new();
    let files = InMemoryFileRepository::new();
    let media = Arc::new(FakeMediaStore::default());

    let state = AppState::new(
        config,
        Arc::new(users.clone()),
        Arc::new(files.clone()),
        media.clone(),
    );

    TestApp {
        state,
        users,
        files,
        media,
        scratch,
    }
}

pub async fn cleanup(app: &TestApp) {
    let _ = tokio::fs::remove_dir_all(&app.scratch).await;
}

pub fn register_request(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: Some(username.to_string()),
        email: Some(format!("{}@example.com", username)),
        full_name: Some(format!("{} Tester", username)),
        password: Some(PASSWORD.to_string()),
    }
}

/// Register a user through the service and return its id.
pub async fn register_user(app: &TestApp, username: &str) -> ObjectId {
    let user = app
        .state
        .user_service
        .register(register_request(username))
        .await
        .expect("register user");
    ObjectId::parse_str(&user.id).expect("user id is an object id")
}

/// Write `contents` to the scratch temp dir as if a client had uploaded it.
pub async fn local_file(app: &TestApp, name: &str, contents: &[u8]) -> LocalFile {
    let dir = PathBuf::from(&app.state.config.server.temp_dir);
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let path = dir.join(format!("{}_{}", uuid::Uuid::new_v4().simple(), name));
    tokio::fs::write(&path, contents).await.unwrap();

    LocalFile {
        path,
        original_name: name.to_string(),
        content_type: Some("image/png".to_string()),
        size: contents.len() as u64,
    }
}

pub fn multipart_body(field: &str, file_name: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, method: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}
