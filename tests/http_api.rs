//! HTTP API tests.
//!
//! Drive the axum router directly with `oneshot`, against a temporary SQLite
//! database and mock vector-store / source-CMS servers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cms_harness::config::parse_config;
use cms_harness::server::{build_router, AppState};
use cms_harness::sites::{self, NewSite};
use cms_harness::{db, migrate};

struct Harness {
    _tmp: TempDir,
    state: AppState,
}

impl Harness {
    async fn new(vector_url: &str) -> Self {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("data").join("cmsh.sqlite");
        let toml = format!(
            "[db]\npath = {:?}\n\n[vector_store]\nurl = {:?}\napi_key_env = \"CMSH_TEST_UNSET_KEY\"\nbatch_size = 2\n",
            db_path.display().to_string(),
            vector_url
        );
        let config = parse_config(&toml).unwrap();
        let pool = db::connect(&config).await.unwrap();
        migrate::apply(&pool).await.unwrap();
        let state = AppState::from_config(config, pool).unwrap();
        Self { _tmp: tmp, state }
    }

    fn app(&self) -> Router {
        build_router(self.state.clone())
    }

    async fn add_site(&self, url: &str) -> i64 {
        sites::add_site(
            &self.state.pool,
            NewSite {
                site_name: "Legacy Blog".into(),
                site_url: url.into(),
                cms_id: 7,
            },
        )
        .await
        .unwrap()
        .id
    }
}

async fn call(app: Router, http_method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(http_method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send(app, request).await
}

async fn call_raw(app: Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn node(nid: &str, status: &str) -> Value {
    json!({
        "nid": nid,
        "title": format!("Post {}", nid),
        "body": {"und": [{"value": format!("<p>Body of {}</p>", nid), "format": "full_html"}]},
        "created": "1690000000",
        "status": status,
        "type": "article"
    })
}

#[tokio::test]
async fn health_reports_version() {
    let h = Harness::new("").await;
    let (status, body) = call(h.app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn create_schema_stores_inferred_schema() {
    let h = Harness::new("").await;
    let (status, body) = call(
        h.app(),
        "POST",
        "/createSchema",
        Some(json!({
            "siteId": 3,
            "cmsId": "7",
            "examplePayload": {"structure": [{
                "nid": "12",
                "title": "Hello",
                "uid": "1",
                "field_tags": {"und": [{"tid": "4"}]}
            }]},
            "createdBy": "alice"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Schema created");
    assert_eq!(body["schema"]["site_id"], 3);
    assert_eq!(body["schema"]["cms_id"], 7);
    assert_eq!(body["schema"]["version"], "1.0.0");
    assert_eq!(body["schema"]["created_by"], "alice");

    let schema: Value =
        serde_json::from_str(body["schema"]["schema_json"].as_str().unwrap()).unwrap();
    assert_eq!(schema["nid"], json!({"kind": "number", "coerce": true}));
    assert_eq!(schema["uid"], json!({"kind": "number", "coerce": true}));
    assert_eq!(schema["title"]["kind"], "string");
    assert!(schema.get("field_tags").is_some());
}

#[tokio::test]
async fn create_schema_twice_inserts_two_rows() {
    let h = Harness::new("").await;
    let request = json!({
        "site_id": 1, "cms_id": 1,
        "example_payload": {"nid": "1", "title": "A"},
        "created_by": "bob"
    });

    let (_, first) = call(h.app(), "POST", "/createSchema", Some(request.clone())).await;
    let (_, second) = call(h.app(), "POST", "/createSchema", Some(request)).await;
    assert_ne!(first["schema"]["id"], second["schema"]["id"]);

    let stored = cms_harness::schema_store::list_schemas(&h.state.pool, 1)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn create_schema_missing_fields_is_400() {
    let h = Harness::new("").await;
    let (status, body) = call(
        h.app(),
        "POST",
        "/createSchema",
        Some(json!({"siteId": 1, "examplePayload": {"nid": "1"}, "createdBy": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Request missing fields: siteId, cmsId, payload, createdBy"
    );
}

#[tokio::test]
async fn create_schema_non_object_payload_is_400() {
    let h = Harness::new("").await;
    let (status, body) = call(
        h.app(),
        "POST",
        "/createSchema",
        Some(json!({"siteId": 1, "cmsId": 1, "examplePayload": "just text", "createdBy": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn create_schema_numeric_version_is_stringified() {
    let h = Harness::new("").await;
    let (status, body) = call(
        h.app(),
        "POST",
        "/createSchema",
        Some(json!({
            "siteId": 2, "cmsId": 1,
            "examplePayload": {"nid": "1", "title": "A"},
            "createdBy": "carol",
            "version": 2,
            "description": null
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["schema"]["version"], "2");
    assert_eq!(body["schema"]["description"], "");
}

#[tokio::test]
async fn malformed_json_gets_error_envelope() {
    let h = Harness::new("").await;
    for uri in ["/createSchema", "/writeWeaviate", "/vectorize", "/onboardSite"] {
        let (status, body) = call_raw(h.app(), uri, Some("application/json"), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false, "{}", uri);
        assert_eq!(body["code"], "invalid-argument", "{}", uri);
        assert!(body["error"].as_str().unwrap().contains("JSON"), "{}", body);
    }
}

#[tokio::test]
async fn missing_content_type_gets_error_envelope() {
    let h = Harness::new("").await;
    let (status, body) = call_raw(
        h.app(),
        "/createSchema",
        None,
        r#"{"siteId": 1, "cmsId": 1, "examplePayload": {"nid": "1"}, "createdBy": "x"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Content-Type"), "{}", body);
}

#[tokio::test]
async fn write_objects_batch_uses_default_class() {
    let weaviate = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .and(body_partial_json(json!({"class": "IntelligensiAi"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "uuid-1"})))
        .expect(2)
        .mount(&weaviate)
        .await;

    let h = Harness::new(&weaviate.uri()).await;
    let (status, body) = call(
        h.app(),
        "POST",
        "/writeWeaviate",
        Some(json!({"objects": [
            {"properties": {"nid": "1", "title": "a"}},
            {"properties": {"nid": "2", "title": "b"}}
        ]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "2 object(s) successfully written to Weaviate");
    assert_eq!(
        body["results"],
        json!([
            {"id": "uuid-1", "nid": "1", "status": "created"},
            {"id": "uuid-1", "nid": "2", "status": "created"}
        ])
    );
}

#[tokio::test]
async fn write_objects_invalid_shape_is_400() {
    let weaviate = MockServer::start().await;
    let h = Harness::new(&weaviate.uri()).await;
    let (status, body) = call(h.app(), "POST", "/writeWeaviate", Some(json!({"foo": "bar"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid request format. Expected either single object or batch operation"
    );
}

#[tokio::test]
async fn write_objects_store_failure_is_500() {
    let weaviate = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad property"))
        .mount(&weaviate)
        .await;

    let h = Harness::new(&weaviate.uri()).await;
    let (status, body) = call(
        h.app(),
        "POST",
        "/writeWeaviate",
        Some(json!({"class": "Custom", "properties": {"nid": "1"}})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("bad property"));
}

#[tokio::test]
async fn vectorize_isolates_failed_items() {
    let source = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bulk-export"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            node("1", "1"),
            node("2", "0"),
            node("3", "1")
        ])))
        .mount(&source)
        .await;

    let weaviate = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .and(body_partial_json(json!({"properties": {"nid": "2"}})))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&weaviate)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "created"})))
        .mount(&weaviate)
        .await;

    let h = Harness::new(&weaviate.uri()).await;
    let site_id = h.add_site(&source.uri()).await;

    let (status, body) = call(h.app(), "POST", "/vectorize", Some(json!({"siteId": site_id}))).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["objectsCreated"], 2);
    assert_eq!(body["siteName"], "Legacy Blog");
    assert_eq!(body["total"], 3);
    assert_eq!(body["failed"][0]["nid"], "2");
    assert_eq!(body["progress"], json!([33, 67, 100]));
}

#[tokio::test]
async fn vectorize_sends_cleaned_body_and_status_label() {
    let source = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bulk-export"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"structure": [node("9", "1")]})),
        )
        .mount(&source)
        .await;

    let weaviate = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .and(body_partial_json(json!({
            "class": "IntelligensiAi",
            "properties": {"nid": "9", "body": "Body of 9", "status": "published", "type": "article"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
        .expect(1)
        .mount(&weaviate)
        .await;

    let h = Harness::new(&weaviate.uri()).await;
    let site_id = h.add_site(&source.uri()).await;
    let (status, body) = call(h.app(), "POST", "/vectorize", Some(json!({"site_id": site_id}))).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["objectsCreated"], 1);
}

#[tokio::test]
async fn vectorize_empty_export_is_400() {
    let source = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bulk-export"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&source)
        .await;

    let weaviate = MockServer::start().await;
    let h = Harness::new(&weaviate.uri()).await;
    let site_id = h.add_site(&source.uri()).await;

    let (status, body) = call(h.app(), "POST", "/vectorize", Some(json!({"siteId": site_id}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No content available to vectorize");
}

#[tokio::test]
async fn vectorize_unknown_site_is_404() {
    let weaviate = MockServer::start().await;
    let h = Harness::new(&weaviate.uri()).await;
    let (status, body) = call(h.app(), "POST", "/vectorize", Some(json!({"siteId": 404}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not-found");
}

#[tokio::test]
async fn onboard_site_links_new_schema() {
    let source = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bulk-export"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "structure": [node("12", "1"), node("13", "0")]
        })))
        .mount(&source)
        .await;

    let h = Harness::new("").await;
    let site_id = h.add_site(&source.uri()).await;

    let (status, body) = call(
        h.app(),
        "POST",
        "/onboardSite",
        Some(json!({"siteId": site_id, "createdBy": "carol"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["site"]["status"], "active");
    assert_eq!(body["site"]["schema_id"], body["schema"]["id"]);
    assert_eq!(body["schema"]["cms_id"], 7);

    let schema: Value =
        serde_json::from_str(body["schema"]["schema_json"].as_str().unwrap()).unwrap();
    assert_eq!(schema["nid"]["kind"], "number");
    assert_eq!(schema["body"]["kind"], "object");
}

#[tokio::test]
async fn onboard_site_source_failure_is_500() {
    let source = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bulk-export"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&source)
        .await;

    let h = Harness::new("").await;
    let site_id = h.add_site(&source.uri()).await;
    let (status, body) = call(
        h.app(),
        "POST",
        "/onboardSite",
        Some(json!({"siteId": site_id, "createdBy": "carol"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let site = sites::get_site(&h.state.pool, site_id).await.unwrap();
    assert_eq!(site.status, "pending");
}

#[tokio::test]
async fn check_vector_store_readiness() {
    let weaviate = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/.well-known/ready"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&weaviate)
        .await;

    let h = Harness::new(&weaviate.uri()).await;
    let (status, body) = call(h.app(), "GET", "/checkWeaviate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Weaviate is ready.");
}

#[tokio::test]
async fn vector_endpoints_fail_without_store() {
    let h = Harness::new("").await;
    let (status, _) = call(h.app(), "GET", "/checkWeaviate", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn write_schema_creates_missing_class() {
    let weaviate = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/schema"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"classes": [{"class": "Other"}]})),
        )
        .mount(&weaviate)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/schema"))
        .and(body_partial_json(json!({"class": "IntelligensiAi", "vectorizer": "text2vec-openai"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&weaviate)
        .await;

    let h = Harness::new(&weaviate.uri()).await;
    let (status, body) = call(h.app(), "POST", "/writeSchema", None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(
        body["message"],
        "Schema created successfully for IntelligensiAi class."
    );
}
