use axum::{
    body::to_bytes,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use mongodb::bson::{doc, oid::ObjectId, Bson};
use serde_json::{json, Value};

use media_vault::{
    dto::{file::FileResponse, response::ApiResponse},
    error::AppError,
    middleware::{
        auth::{cookie_value, extract_token_from_headers},
        failure::panic_response,
    },
    models::{
        file::{FileDetail, FileRecord},
        user::{normalize_identifier, User},
    },
    repositories::{literal_pattern, FileFilter, FilePatch, UserFilter, UserPatch},
    services::media::sign_params,
    utils::logging::DEFAULT_DIRECTIVES,
};
use tracing_subscriber::EnvFilter;

fn sample_record(owner: ObjectId) -> FileRecord {
    FileRecord::new(
        owner,
        vec![FileDetail {
            name: "Report-2024.PDF".to_string(),
            url: "https://media.test/report".to_string(),
            public_id: "vault/report".to_string(),
            content_type: "pdf".to_string(),
            size: 2048,
            resource_type: "image".to_string(),
        }],
    )
}

async fn response_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_success_envelope_shape() {
    let (status, body) =
        response_json(ApiResponse::created(json!({ "a": 1 }), "Created").into_response()).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({ "statusCode": 201, "payload": { "a": 1 }, "message": "Created", "success": true })
    );
}

#[tokio::test]
async fn test_error_envelope_matches_status() {
    let cases = [
        (AppError::validation("bad"), 400),
        (AppError::unauthorized("who"), 401),
        (AppError::not_found("gone"), 404),
        (AppError::Conflict("dup".into()), 409),
        (AppError::PayloadTooLarge("big".into()), 413),
    ];

    for (err, code) in cases {
        let message = err.to_string();
        let (status, body) = response_json(err.into_response()).await;
        assert_eq!(status.as_u16(), code);
        assert_eq!(body["statusCode"], code);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], message);
    }
}

#[tokio::test]
async fn test_internal_error_hides_cause() {
    let err = AppError::internal("Error while fetching data", anyhow::anyhow!("socket reset by peer"));
    let (status, body) = response_json(err.into_response()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error while fetching data");
    assert!(!body.to_string().contains("socket reset"));
    assert!(body["errors"]["error_id"].is_string());
}

#[tokio::test]
async fn test_panic_response_is_enveloped() {
    let (status, body) = response_json(panic_response(Box::new("boom"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["statusCode"], 500);
    assert_eq!(body["success"], false);
}

#[test]
fn test_file_response_uses_wire_names() {
    let owner = ObjectId::new();
    let mut record = sample_record(owner);
    record.id = Some(ObjectId::new());

    let value = serde_json::to_value(FileResponse::from(&record)).unwrap();

    assert_eq!(value["user"], owner.to_hex());
    assert_eq!(value["fileDetails"][0]["type"], "pdf");
    assert_eq!(value["fileDetails"][0]["public_id"], "vault/report");
    assert!(value["fileDetails"][0].get("resource_type").is_none());
}

#[test]
fn test_file_record_bson_layout() {
    let record = sample_record(ObjectId::new());
    let document = mongodb::bson::to_document(&record).unwrap();

    assert!(document.get("_id").is_none());
    let details = document.get_array("fileDetails").unwrap();
    let Bson::Document(first) = &details[0] else {
        panic!("expected embedded document");
    };
    assert_eq!(first.get_str("type").unwrap(), "pdf");
    assert_eq!(document.get_bool("pending_delete").unwrap(), false);
}

#[test]
fn test_user_new_normalizes_identifiers() {
    let user = User::new("  Alice ", "Alice@Example.COM", " Alice Tester ", "hash".into());

    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.full_name, "Alice Tester");
    assert_eq!(normalize_identifier(" MiXeD "), "mixed");
}

#[test]
fn test_user_filter_documents() {
    let filter = UserFilter::UsernameOrEmail {
        username: "alice".into(),
        email: "alice@example.com".into(),
    };
    assert_eq!(
        filter.to_document(),
        doc! { "$or": [ { "username": "alice" }, { "email": "alice@example.com" } ] }
    );
    assert!(filter.matches(&User::new("bob", "alice@example.com", "Bob", "hash".into())));
}

#[test]
fn test_logout_patch_unsets_refresh_token() {
    let patch = UserPatch {
        refresh_token: Some(None),
        ..UserPatch::default()
    };
    let update = patch.to_update().unwrap();

    assert_eq!(update.get_document("$unset").unwrap(), &doc! { "refresh_token": "" });
    assert!(update.get_document("$set").unwrap().contains_key("updated_at"));
}

#[test]
fn test_name_search_is_literal_and_case_insensitive() {
    let owner = ObjectId::new();
    let record = sample_record(owner);

    assert_eq!(literal_pattern("a.b*"), r"a\.b\*");

    let filter = FileFilter::OwnerNameContains {
        owner,
        pattern: "2024.PDF".into(),
    };
    assert!(filter.matches(&record));
    assert_eq!(
        filter.to_document(),
        doc! {
            "user": owner,
            "pending_delete": { "$ne": true },
            "fileDetails.name": { "$regex": r"2024\.PDF", "$options": "i" },
        }
    );

    let wildcard = FileFilter::OwnerNameContains {
        owner,
        pattern: "Report.*".into(),
    };
    assert!(!wildcard.matches(&record));

    let other_owner = FileFilter::OwnerNameContains {
        owner: ObjectId::new(),
        pattern: "report".into(),
    };
    assert!(!other_owner.matches(&record));

    let mut pending = sample_record(owner);
    pending.pending_delete = true;
    assert!(!filter.matches(&pending));
    assert!(!FileFilter::Owner(owner).matches(&pending));
    assert!(FileFilter::PendingDelete.matches(&pending));
}

#[test]
fn test_rename_patch_targets_one_entry() {
    let (update, array_filters) = FilePatch::RenameDetail {
        public_id: "vault/report".into(),
        name: "Q4.pdf".into(),
    }
    .to_update();

    let set = update.get_document("$set").unwrap();
    assert_eq!(set.get_str("fileDetails.$[detail].name").unwrap(), "Q4.pdf");
    assert_eq!(
        array_filters,
        Some(vec![doc! { "detail.public_id": "vault/report" }])
    );

    let mut record = sample_record(ObjectId::new());
    FilePatch::RenameDetail {
        public_id: "vault/report".into(),
        name: "Q4.pdf".into(),
    }
    .apply(&mut record);
    assert_eq!(record.file_details[0].name, "Q4.pdf");
}

#[test]
fn test_sign_params_sorts_and_skips_empty_values() {
    let params = [
        ("timestamp", "1315060510".to_string()),
        ("folder", "docs".to_string()),
        ("tags", String::new()),
    ];

    assert_eq!(
        sign_params(&params, "abcd"),
        "5d35b1215ebcbca95d5110de36e95e2d60e3270d73ae56b32968c4d3250acba4"
    );
}

#[test]
fn test_token_extraction_prefers_bearer_then_cookie() {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_static("theme=dark; access_token=from-cookie; refresh_token=r"),
    );
    assert_eq!(extract_token_from_headers(&headers).as_deref(), Some("from-cookie"));
    assert_eq!(cookie_value(&headers, "refresh_token").as_deref(), Some("r"));
    assert_eq!(cookie_value(&headers, "missing"), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
    assert_eq!(extract_token_from_headers(&headers).as_deref(), Some("from-header"));

    let mut basic = HeaderMap::new();
    basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    assert_eq!(extract_token_from_headers(&basic), None);
}

#[test]
fn test_default_log_directives_parse() {
    let filter: EnvFilter = DEFAULT_DIRECTIVES.parse().unwrap();
    let rendered = filter.to_string();

    assert!(rendered.contains("media_vault=debug"));
    assert!(rendered.contains("tower_http=debug"));
}
