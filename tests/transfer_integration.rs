//! Integration tests for downloading and rehosting through Chibisafe.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use metamaster_core::transfer::{ChibisafeTransfer, ImageTransfer, TransferError, publish_copy};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn png_bytes() -> Vec<u8> {
    let image = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

#[tokio::test]
async fn test_rehost_posts_multipart_with_api_key() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(header("x-api-key", "secret"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"abc.png\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "abc.png", "url": "https://files.example/abc.png"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transfer =
        ChibisafeTransfer::new(format!("{}/api/upload", server.uri()), "secret").unwrap();
    let url = transfer.rehost(b"bytes".to_vec(), "abc.png").await.unwrap();
    assert_eq!(url, "https://files.example/abc.png");
}

#[tokio::test]
async fn test_rehost_without_url_is_malformed() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .mount(&server)
        .await;

    let transfer = ChibisafeTransfer::new(format!("{}/api/upload", server.uri()), "k").unwrap();
    let err = transfer.rehost(vec![1, 2, 3], "a.png").await.unwrap_err();
    assert!(matches!(err, TransferError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_rehost_unauthorized_suggests_key() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let transfer = ChibisafeTransfer::new(format!("{}/api/upload", server.uri()), "k").unwrap();
    let err = transfer.rehost(vec![1], "a.png").await.unwrap_err();
    assert!(err.to_string().contains("CHIBISAFE_API_KEY"));
}

#[tokio::test]
async fn test_download_missing_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/_images/h/1.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let transfer = ChibisafeTransfer::new(format!("{}/api/upload", server.uri()), "k").unwrap();
    let err = transfer
        .download(&format!("{}/_images/h/1.png", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_publish_copy_recompresses_to_webp() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/_images/h/1.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"url": "https://files.example/h.webp"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transfer = ChibisafeTransfer::new(format!("{}/api/upload", server.uri()), "k").unwrap();
    let url = publish_copy(
        &transfer,
        &format!("{}/_images/h/1.png", server.uri()),
        "h",
        "png",
        true,
    )
    .await
    .unwrap();
    assert_eq!(url, "https://files.example/h.webp");

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/api/upload")
        .unwrap();
    assert!(contains(&upload.body, b"filename=\"h.webp\""));
    assert!(contains(&upload.body, b"image/webp"));
    assert!(contains(&upload.body, b"WEBP"));
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
