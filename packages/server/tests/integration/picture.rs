use std::sync::Arc;

use crate::common::{TestApp, routes};

mod upload {
    use super::*;

    #[tokio::test]
    async fn upload_then_fetch_returns_bytes_and_type() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(Some("T1"), Some("B1"), "a.png", b"bytes A".to_vec(), Some("image/png"))
            .await;
        assert_eq!(res.status, 200, "upload failed: {}", res.text());
        assert_eq!(
            res.body["message"].as_str().unwrap(),
            "File uploaded successfully."
        );
        assert!(res.body["id"].as_str().is_some());
        assert_eq!(res.body["replaced"].as_u64().unwrap(), 0);

        let picture = app.get_picture("T1", "B1").await;
        assert_eq!(picture.status, 200);
        assert_eq!(picture.bytes, b"bytes A");
        assert_eq!(picture.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn reupload_replaces_previous_picture() {
        let app = TestApp::spawn().await;

        let first = app
            .upload(Some("T1"), Some("B1"), "a.png", b"bytes A".to_vec(), Some("image/png"))
            .await;
        assert_eq!(first.status, 200);

        let second = app
            .upload(Some("T1"), Some("B1"), "b.jpg", b"bytes B".to_vec(), Some("image/jpeg"))
            .await;
        assert_eq!(second.status, 200);
        assert_eq!(second.body["replaced"].as_u64().unwrap(), 1);
        assert_ne!(first.body["id"], second.body["id"]);

        let picture = app.get_picture("T1", "B1").await;
        assert_eq!(picture.bytes, b"bytes B");
        assert_eq!(picture.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(app.sidecar_count(), 1);
    }

    #[tokio::test]
    async fn different_pairs_are_independent() {
        let app = TestApp::spawn().await;

        app.upload(Some("T1"), Some("B1"), "1.png", b"one".to_vec(), Some("image/png"))
            .await;
        app.upload(Some("T1"), Some("B2"), "2.png", b"two".to_vec(), Some("image/png"))
            .await;
        app.upload(Some("T2"), Some("B1"), "3.png", b"three".to_vec(), Some("image/png"))
            .await;

        assert_eq!(app.get_picture("T1", "B1").await.bytes, b"one");
        assert_eq!(app.get_picture("T1", "B2").await.bytes, b"two");
        assert_eq!(app.get_picture("T2", "B1").await.bytes, b"three");
        assert_eq!(app.sidecar_count(), 3);
    }

    #[tokio::test]
    async fn content_type_guessed_from_filename() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(Some("T1"), Some("B1"), "photo.jpg", b"JPEG".to_vec(), None)
            .await;
        assert_eq!(res.status, 200);

        let picture = app.get_picture("T1", "B1").await;
        assert_eq!(picture.content_type.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn missing_identifiers_are_empty_strings() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(None, None, "a.png", b"anonymous".to_vec(), Some("image/png"))
            .await;
        assert_eq!(res.status, 200);

        let picture = app.get_without_query(routes::PICTURE).await;
        assert_eq!(picture.status, 200);
        assert_eq!(picture.bytes, b"anonymous");

        assert_eq!(app.get_picture("T1", "").await.status, 404);
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;

        let form = reqwest::multipart::Form::new()
            .text("travelId", "T1")
            .text("bicycleId", "B1");
        let res = app.send_form(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"].as_str().unwrap(), "VALIDATION_ERROR");
        assert_eq!(app.sidecar_count(), 0);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn_with_max_size(8).await;

        let res = app
            .upload(Some("T1"), Some("B1"), "big.png", vec![0u8; 64], Some("image/png"))
            .await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"].as_str().unwrap(), "PAYLOAD_TOO_LARGE");
        assert_eq!(app.sidecar_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_uploads_for_same_pair_leave_one_picture() {
        let app = Arc::new(TestApp::spawn().await);

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                app.upload(Some("T1"), Some("B1"), "a.png", vec![i], Some("image/png"))
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().status, 200);
        }

        assert_eq!(app.sidecar_count(), 1);
        let picture = app.get_picture("T1", "B1").await;
        assert_eq!(picture.bytes.len(), 1);
        assert!(picture.bytes[0] < 8);
    }
}

mod fetch {
    use super::*;

    #[tokio::test]
    async fn unknown_pair_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_picture("T404", "B404").await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["error"].as_str().unwrap(), "No matching image found.");
        assert_eq!(res.body["code"].as_str().unwrap(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn post_form_of_picture_route_still_works() {
        let app = TestApp::spawn().await;
        app.upload(Some("T1"), Some("B1"), "a.png", b"legacy client".to_vec(), Some("image/png"))
            .await;

        let res = app.post_picture("T1", "B1").await;
        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, b"legacy client");

        assert_eq!(app.post_picture("T1", "B2").await.status, 404);
    }

    #[tokio::test]
    async fn identifiers_match_exactly() {
        let app = TestApp::spawn().await;
        app.upload(Some("T1"), Some("B1"), "a.png", b"exact".to_vec(), Some("image/png"))
            .await;

        assert_eq!(app.get_picture("t1", "B1").await.status, 404);
        assert_eq!(app.get_picture("T1 ", "B1").await.status, 404);
        assert_eq!(app.get_picture("T1", "B1").await.status, 200);
    }

    #[tokio::test]
    async fn corrupt_sidecar_does_not_break_lookups() {
        let app = TestApp::spawn().await;
        std::fs::write(app.storage_dir.join("broken.json"), b"{ not json").unwrap();

        app.upload(Some("T1"), Some("B1"), "a.png", b"fine".to_vec(), Some("image/png"))
            .await;

        let res = app.get_picture("T1", "B1").await;
        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, b"fine");
        assert_eq!(app.get_picture("T2", "B2").await.status, 404);
    }

    #[tokio::test]
    async fn response_carries_inline_disposition() {
        let app = TestApp::spawn().await;
        app.upload(Some("T1"), Some("B1"), "bike.png", b"png".to_vec(), Some("image/png"))
            .await;

        let res = app
            .client
            .get(format!("http://{}{}", app.addr, routes::PICTURE))
            .query(&[("travelId", "T1"), ("bicycleId", "B1")])
            .send()
            .await
            .unwrap();

        let disposition = res
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("inline; filename=\"bike.png\""));
    }
}

mod docs {
    use super::*;

    #[tokio::test]
    async fn openapi_document_lists_picture_routes() {
        let app = TestApp::spawn().await;

        let res = app.get_without_query("/api-docs/openapi.json").await;
        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/upload"]["post"].is_object());
        assert!(res.body["paths"]["/picture"]["get"].is_object());
        assert!(res.body["paths"]["/picture"]["post"].is_object());
    }
}
