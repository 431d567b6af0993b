use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use geom_kernel::{AnalysisReport, Kernel, KernelIntrospect, MockKernel, Shape};
use serde_json::Value;
use step_service::{router, AppState, ServiceConfig};
use tower::ServiceExt;

const BOUNDARY: &str = "step-forge-test-boundary";

// ── Helper Functions ─────────────────────────────────────────────────────

fn app(dir: &Path) -> Router {
    let config = ServiceConfig {
        temp_dir: Some(dir.to_path_buf()),
        ..ServiceConfig::default()
    };
    router(AppState::new(config, Arc::new(MockKernel::new())))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, header::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a multipart body from an optional STEP upload and optional script.
fn multipart_request(uri: &str, file: Option<(&str, &[u8])>, script: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some((name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"step_file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(script) = script {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"script\"\r\n\r\n{script}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn error_message(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["error"].as_str().unwrap().to_string()
}

fn decode(body: &[u8]) -> (MockKernel, Shape) {
    let kernel = MockKernel::new();
    let shape = kernel.import_step(std::str::from_utf8(body).unwrap()).unwrap();
    (kernel, shape)
}

fn step_upload(shapes: &[Shape], kernel: &MockKernel) -> Vec<u8> {
    let shape = kernel.compound(shapes).unwrap();
    kernel.export_step(&shape).unwrap().into_bytes()
}

fn leftovers(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

// ── Liveness ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn liveness_returns_text() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, _, body) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.is_empty());
}

// ── Generate ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_box_returns_step_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let request = json_request(
        "/generate",
        r#"{"script": "let a = cq_box(10, 10, 10); let result = a;"}"#,
    );
    let (status, headers, body) = send(app(dir.path()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("generated_model.step"), "{disposition}");

    let (kernel, shape) = decode(&body);
    assert_eq!(kernel.list_solids(&shape).unwrap().len(), 1);
    assert!((kernel.mass_properties(&shape).unwrap().volume - 1000.0).abs() < 1e-9);
    let bbox = kernel.bounding_box(&shape).unwrap();
    for extent in bbox.extents() {
        assert!((extent - 10.0).abs() < 1e-9);
    }
    assert_eq!(leftovers(dir.path()), 0);
}

#[tokio::test]
async fn generate_without_script_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let (status, _, body) = send(app(dir.path()), json_request("/generate", r#"{"code": "x"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("script"));

    let (status, _, _) = send(app(dir.path()), json_request("/generate", "not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_without_artifact_is_no_result() {
    let dir = tempfile::tempdir().unwrap();
    let request = json_request("/generate", r#"{"script": "let x = 1 + 1;"}"#);
    let (status, headers, body) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(headers.get(header::CONTENT_DISPOSITION).is_none());
    assert!(error_message(&body).contains("no Workplane or Shape"));
    assert_eq!(leftovers(dir.path()), 0);
}

#[tokio::test]
async fn generate_script_error_is_500_with_stage() {
    let dir = tempfile::tempdir().unwrap();
    let request = json_request("/generate", r#"{"script": "let a = cq_sphere(-1);"}"#);
    let (status, _, body) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(&body).starts_with("error executing script: "));
}

#[tokio::test]
async fn generate_prefers_result_binding() {
    let dir = tempfile::tempdir().unwrap();
    let request = json_request(
        "/generate",
        r#"{"script": "let small = cq_box(1, 1, 1); let big = cq_box(10, 10, 10); let result = big;"}"#,
    );
    let (status, _, body) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::OK);
    let (kernel, shape) = decode(&body);
    assert!((kernel.mass_properties(&shape).unwrap().volume - 1000.0).abs() < 1e-9);
}

// ── Modify ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn modify_translates_uploaded_model() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = MockKernel::new();
    let original = kernel.make_box(10.0, 10.0, 10.0).unwrap();
    let before = kernel.mass_properties(&original).unwrap().center_of_mass;
    let upload = step_upload(&[original], &kernel);

    let request = multipart_request(
        "/modify",
        Some(("part.step", upload.as_slice())),
        Some("let result = model.translate([5, 0, 0]);"),
    );
    let (status, headers, body) = send(app(dir.path()), request).await;

    assert_eq!(status, StatusCode::OK);
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("modified_model.step"));
    let (kernel, shape) = decode(&body);
    let after = kernel.mass_properties(&shape).unwrap().center_of_mass;
    assert!((after[0] - before[0] - 5.0).abs() < 1e-9);
    assert_eq!(leftovers(dir.path()), 0);
}

#[tokio::test]
async fn modify_requires_file_and_script() {
    let dir = tempfile::tempdir().unwrap();
    let request = multipart_request("/modify", None, Some("let result = model;"));
    let (status, _, body) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("step_file"));

    let request = multipart_request("/modify", Some(("part.step", &b"ISO-10303-21;"[..])), None);
    let (status, _, body) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("script"));

    let (status, _, _) = send(app(dir.path()), json_request("/modify", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn modify_with_unparsable_upload_is_500_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let request = multipart_request(
        "/modify",
        Some(("broken.step", &b"definitely not STEP"[..])),
        Some("let result = model;"),
    );
    let (status, _, body) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(&body).starts_with("error modifying model: "));
    assert_eq!(leftovers(dir.path()), 0);
}

#[tokio::test]
async fn modify_that_only_rebinds_input_has_no_result() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = MockKernel::new();
    let upload = step_upload(&[kernel.make_box(1.0, 1.0, 1.0).unwrap()], &kernel);
    let request = multipart_request("/modify", Some(("part.step", upload.as_slice())), Some("let copy = model;"));
    let (status, _, _) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(leftovers(dir.path()), 0);
}

// ── Analyze ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn analyze_reports_every_solid() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = MockKernel::new();
    let shapes = [
        kernel.make_box(10.0, 10.0, 10.0).unwrap(),
        kernel.make_cylinder(1.0, 4.0).unwrap(),
        kernel.make_sphere(2.0).unwrap(),
    ];
    let upload = step_upload(&shapes, &kernel);

    let request = multipart_request("/analyze", Some(("three.step", upload.as_slice())), None);
    let (status, _, body) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::OK);

    let report: AnalysisReport = serde_json::from_slice(&body).unwrap();
    assert_eq!(report.file_name, "three.step");
    assert_eq!(report.summary.total_solids, 3);
    let indices: Vec<usize> = report.solids.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);

    let first = &report.solids[0];
    assert!((first.volume - 1000.0).abs() < 1e-9);
    assert_eq!(first.topology.faces, 6);
    assert_eq!(first.face_types.get("planar"), Some(&6));
    assert_eq!(report.solids[1].face_types.get("cylindrical"), Some(&1));
    assert_eq!(leftovers(dir.path()), 0);
}

#[tokio::test]
async fn analyze_empty_model_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = MockKernel::new();
    let upload = step_upload(&[], &kernel);
    let request = multipart_request("/analyze", Some(("empty.step", upload.as_slice())), None);
    let (status, _, body) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("empty.step"));
    assert_eq!(leftovers(dir.path()), 0);
}

#[tokio::test]
async fn analyze_requires_file() {
    let dir = tempfile::tempdir().unwrap();
    let request = multipart_request("/analyze", None, None);
    let (status, _, _) = send(app(dir.path()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Gear ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn gear_with_defaults_returns_step() {
    let dir = tempfile::tempdir().unwrap();
    let (status, headers, body) = send(app(dir.path()), json_request("/generate_gear", "{}")).await;
    assert_eq!(status, StatusCode::OK);
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("generated_gear.step"));
    let (kernel, shape) = decode(&body);
    assert_eq!(kernel.list_solids(&shape).unwrap().len(), 1);
}

#[tokio::test]
async fn gear_rejects_bad_parameters() {
    let dir = tempfile::tempdir().unwrap();
    for body in [
        r#"{"teeth": 3}"#,
        r#"{"teeth": 4000000000}"#,
        r#"{"spokes": 4}"#,
        r#"{"plane": "AB"}"#,
        r#"{"module": -1}"#,
    ] {
        let (status, _, response) = send(app(dir.path()), json_request("/generate_gear", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert!(!error_message(&response).is_empty());
    }
}
