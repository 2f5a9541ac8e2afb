mod common;

use common::{file_part, post_upload, spawn, TOKEN};
use dropshare::config::Environment;
use dropshare::upload::{UploadResponse, MAX_FILE_SIZE};
use reqwest::StatusCode;

async fn error_of(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_upload_png_succeeds() {
    let server = spawn(Environment::Development).await;
    let data = b"\x89PNG\r\n\x1a\nfake".to_vec();

    let response = post_upload(
        &server,
        Some(TOKEN),
        Some(TOKEN),
        Some(file_part("photo.png", "image/png", data.clone())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: UploadResponse = response.json().await.unwrap();
    assert!(body.success);
    assert_eq!(body.message, "File uploaded successfully");
    assert_eq!(body.file_name, "photo.png");
    assert_eq!(body.file_type, "image/png");
    assert_eq!(body.file_size, data.len() as u64);
    assert!(body.unique_filename.ends_with(".png"));

    let host = server.base_url.trim_start_matches("http://");
    assert_eq!(
        body.file_url,
        format!("http://{host}/uploads/{}", body.unique_filename)
    );
    assert_eq!(
        body.shareable_url,
        format!("http://{host}/shared/{}", body.unique_filename)
    );

    let on_disk = std::fs::read(server.upload_dir.join(&body.unique_filename)).unwrap();
    assert_eq!(on_disk, data);
}

#[tokio::test]
async fn test_identical_uploads_get_distinct_names() {
    let server = spawn(Environment::Development).await;

    let mut names = Vec::new();
    for _ in 0..3 {
        let response = post_upload(
            &server,
            Some(TOKEN),
            Some(TOKEN),
            Some(file_part("same.pdf", "application/pdf", b"%PDF-1.4".to_vec())),
        )
        .await;
        let body: UploadResponse = response.json().await.unwrap();
        names.push(body.unique_filename);
    }

    names.sort();
    names.dedup();
    assert_eq!(names.len(), 3);
}

#[tokio::test]
async fn test_production_issues_https_urls() {
    let server = spawn(Environment::Production).await;

    let response = post_upload(
        &server,
        Some(TOKEN),
        Some(TOKEN),
        Some(file_part("doc.pdf", "application/pdf", b"%PDF".to_vec())),
    )
    .await;
    let body: UploadResponse = response.json().await.unwrap();
    assert!(body.file_url.starts_with("https://"));
    assert!(body.shareable_url.starts_with("https://"));
}

#[tokio::test]
async fn test_mismatched_tokens_are_forbidden() {
    let server = spawn(Environment::Development).await;

    let response = post_upload(
        &server,
        Some("A"),
        Some("B"),
        Some(file_part("photo.png", "image/png", b"png".to_vec())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(response).await, "Invalid or missing CSRF token");
    assert!(!server.upload_dir.exists());
}

#[tokio::test]
async fn test_missing_tokens_are_forbidden() {
    let server = spawn(Environment::Development).await;
    let png = || Some(file_part("photo.png", "image/png", b"png".to_vec()));

    let response = post_upload(&server, None, Some(TOKEN), png()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_upload(&server, Some(TOKEN), None, png()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_upload(&server, Some(""), Some(""), png()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_csrf_is_checked_before_file() {
    let server = spawn(Environment::Development).await;

    let response = post_upload(&server, Some("A"), Some("B"), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_file_is_bad_request() {
    let server = spawn(Environment::Development).await;

    let response = post_upload(&server, Some(TOKEN), Some(TOKEN), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(response).await, "No file provided");
}

#[tokio::test]
async fn test_text_plain_is_rejected_regardless_of_size() {
    let server = spawn(Environment::Development).await;

    for size in [1usize, MAX_FILE_SIZE as usize + 1] {
        let response = post_upload(
            &server,
            Some(TOKEN),
            Some(TOKEN),
            Some(file_part("notes.txt", "text/plain", vec![b'a'; size])),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_of(response).await,
            "File type not allowed. Allowed types: JPEG, PNG, PDF"
        );
    }
}

#[tokio::test]
async fn test_size_limit_boundary() {
    let server = spawn(Environment::Development).await;

    let response = post_upload(
        &server,
        Some(TOKEN),
        Some(TOKEN),
        Some(file_part(
            "big.jpg",
            "image/jpeg",
            vec![0u8; MAX_FILE_SIZE as usize + 1],
        )),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(response).await, "File size exceeds the 10MB limit");

    let response = post_upload(
        &server,
        Some(TOKEN),
        Some(TOKEN),
        Some(file_part(
            "exact.jpg",
            "image/jpeg",
            vec![0u8; MAX_FILE_SIZE as usize],
        )),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: UploadResponse = response.json().await.unwrap();
    assert_eq!(body.file_size, MAX_FILE_SIZE);
}

#[tokio::test]
async fn test_well_oversize_file_gets_size_error() {
    let server = spawn(Environment::Development).await;
    let twelve_mib = vec![0u8; 12 * 1024 * 1024];

    let response = post_upload(
        &server,
        Some(TOKEN),
        Some(TOKEN),
        Some(file_part("huge.png", "image/png", twelve_mib.clone())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(response).await, "File size exceeds the 10MB limit");

    let response = post_upload(
        &server,
        Some(TOKEN),
        Some(TOKEN),
        Some(file_part("huge.txt", "text/plain", twelve_mib)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_of(response).await,
        "File type not allowed. Allowed types: JPEG, PNG, PDF"
    );
    assert!(!server.upload_dir.exists());
}

#[tokio::test]
async fn test_well_oversize_file_still_checks_csrf_first() {
    let server = spawn(Environment::Development).await;

    let response = post_upload(
        &server,
        Some("A"),
        Some("B"),
        Some(file_part("huge.png", "image/png", vec![0u8; 12 * 1024 * 1024])),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(response).await, "Invalid or missing CSRF token");
}

#[tokio::test]
async fn test_unwritable_storage_is_server_error() {
    let server = spawn(Environment::Development).await;
    // A regular file where the upload directory should be
    std::fs::create_dir_all(server.upload_dir.parent().unwrap()).unwrap();
    std::fs::write(&server.upload_dir, b"not a directory").unwrap();

    let response = post_upload(
        &server,
        Some(TOKEN),
        Some(TOKEN),
        Some(file_part("a.png", "image/png", b"png".to_vec())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_of(response).await, "Failed to upload file");
}

#[tokio::test]
async fn test_uploaded_file_is_served_with_type() {
    let server = spawn(Environment::Development).await;
    let response = post_upload(
        &server,
        Some(TOKEN),
        Some(TOKEN),
        Some(file_part("scan.pdf", "application/pdf", b"%PDF-1.4".to_vec())),
    )
    .await;
    let body: UploadResponse = response.json().await.unwrap();

    let client = reqwest::Client::new();
    let url = format!("{}/uploads/{}", server.base_url, body.unique_filename);

    let head = client.head(&url).send().await.unwrap();
    assert_eq!(head.status(), StatusCode::OK);

    let get = client.get(&url).send().await.unwrap();
    assert_eq!(get.status(), StatusCode::OK);
    assert_eq!(
        get.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    assert_eq!(get.bytes().await.unwrap().as_ref(), b"%PDF-1.4");

    let missing = client
        .head(format!("{}/uploads/missing.pdf", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_home_page_issues_fresh_tokens() {
    let server = spawn(Environment::Development).await;

    let first = reqwest::get(format!("{}/", server.base_url))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let second = reqwest::get(format!("{}/", server.base_url))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let a = dropshare::csrf::CsrfToken::from_page(&first).unwrap();
    let b = dropshare::csrf::CsrfToken::from_page(&second).unwrap();
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_share_page_round_trip() {
    let server = spawn(Environment::Development).await;
    let response = post_upload(
        &server,
        Some(TOKEN),
        Some(TOKEN),
        Some(file_part("photo.png", "image/png", b"png".to_vec())),
    )
    .await;
    let body: UploadResponse = response.json().await.unwrap();
    assert!(body
        .shareable_url
        .ends_with(&format!("/shared/{}", body.unique_filename)));

    let page = reqwest::get(&body.shareable_url).await.unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    let html = page.text().await.unwrap();
    assert!(html.contains(&format!("src=\"/uploads/{}\"", body.unique_filename)));
    assert!(html.contains(&format!(
        "href=\"/uploads/{}\" download",
        body.unique_filename
    )));

    let missing = reqwest::get(format!("{}/shared/nope.png", server.base_url))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert!(missing.text().await.unwrap().contains("File Not Found"));
}

#[tokio::test]
async fn test_health() {
    let server = spawn(Environment::Development).await;
    let body: serde_json::Value = reqwest::get(format!("{}/_internal/health", server.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}
