/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
mod helpers;

#[cfg(test)]
mod test {
    use crate::helpers;
    use bynder::v4::{BynderError, UploadProtocol, UploadRequest, UploadSettings, UploadStage};
    use serde_json::json;
    use sha2::{Digest, Sha256};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const CONTENT: &[u8] = b"test content in file";

    async fn mount_direct_upload(server: &MockServer, save_path: &str) {
        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/prepare"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file_id": "f1"})))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/f1/chunk/1"))
            .and(header(
                "content-sha256",
                hex::encode(Sha256::digest(CONTENT)).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/f1/finalise_api"))
            .respond_with(ResponseTemplate::new(201).insert_header("X-API-Correlation-ID", "corr-1"))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(save_path))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "mediaid": "media-1"})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn direct_upload_runs_prepare_chunk_finalize_save() {
        helpers::init_logging();
        let server = MockServer::start().await;
        mount_direct_upload(&server, "/api/v4/media/save/f1").await;

        let file = helpers::temp_file(CONTENT);
        let client = helpers::permanent_token_client(&server);
        let outcome = client
            .asset_bank_manager()
            .upload_file(
                UploadRequest::new(file.path())
                    .with_brand_id("B1")
                    .with_name("n"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.file_id, "f1");
        assert_eq!(outcome.correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(outcome.media["mediaid"], "media-1");

        let requests = server.received_requests().await.unwrap();
        let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
        assert_eq!(
            paths,
            vec![
                "/v7/file_cmds/upload/prepare",
                "/v7/file_cmds/upload/f1/chunk/1",
                "/v7/file_cmds/upload/f1/finalise_api",
                "/api/v4/media/save/f1",
            ]
        );

        assert_eq!(requests[1].body, CONTENT);

        let finalize = &requests[2];
        let file_name = file.path().file_name().unwrap().to_str().unwrap();
        assert_eq!(helpers::form_value(finalize, "fileName").as_deref(), Some(file_name));
        assert_eq!(helpers::form_value(finalize, "fileSize").as_deref(), Some("20"));
        assert_eq!(helpers::form_value(finalize, "chunksCount").as_deref(), Some("1"));
        assert_eq!(
            helpers::form_value(finalize, "sha256"),
            Some(hex::encode(Sha256::digest(CONTENT)))
        );
        assert_eq!(
            helpers::form_value(finalize, "intent").as_deref(),
            Some("upload_main_uploader_asset")
        );

        let save = &requests[3];
        assert_eq!(helpers::form_value(save, "brandId").as_deref(), Some("B1"));
        assert_eq!(helpers::form_value(save, "name").as_deref(), Some("n"));
        for request in &requests {
            assert_eq!(
                helpers::header_value(request, "authorization").as_deref(),
                Some("Bearer permanent-token")
            );
        }
    }

    #[tokio::test]
    async fn new_version_saves_to_media_without_sending_media_id() {
        let server = MockServer::start().await;
        mount_direct_upload(&server, "/api/v4/media/m1/save/f1").await;

        let file = helpers::temp_file(CONTENT);
        let client = helpers::permanent_token_client(&server);
        client
            .asset_bank_manager()
            .upload_file(
                UploadRequest::new(file.path())
                    .with_media_id("m1")
                    .with_description("second version"),
            )
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let save = requests.last().unwrap();
        assert_eq!(save.url.path(), "/api/v4/media/m1/save/f1");
        let form = helpers::form(save);
        assert!(!form.iter().any(|(k, _)| k == "mediaId"));
        assert!(form.contains(&("description".to_string(), "second version".to_string())));
    }

    #[tokio::test]
    async fn multiple_chunks_are_sent_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/prepare"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file_id": "f1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::path_regex(r"^/v7/file_cmds/upload/f1/chunk/\d+$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/f1/finalise_api"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v4/media/save/f1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let file = helpers::temp_file(CONTENT);
        let client = helpers::upload_client(&server, UploadSettings::default().with_chunk_size(8));
        let outcome = client
            .asset_bank_manager()
            .upload_file(UploadRequest::new(file.path()).with_brand_id("B1"))
            .await
            .unwrap();
        assert_eq!(outcome.correlation_id, None);

        let requests = server.received_requests().await.unwrap();
        let chunks: Vec<&Request> = requests
            .iter()
            .filter(|r| r.url.path().contains("/chunk/"))
            .collect();
        assert_eq!(chunks[0].url.path(), "/v7/file_cmds/upload/f1/chunk/1");
        assert_eq!(chunks[1].url.path(), "/v7/file_cmds/upload/f1/chunk/2");
        assert_eq!(chunks[2].url.path(), "/v7/file_cmds/upload/f1/chunk/3");
        assert_eq!(chunks[2].body, b"file");
        assert_eq!(
            helpers::header_value(chunks[1], "content-sha256"),
            Some(hex::encode(Sha256::digest(b"tent in ")))
        );

        let finalize = requests
            .iter()
            .find(|r| r.url.path().ends_with("finalise_api"))
            .unwrap();
        assert_eq!(helpers::form_value(finalize, "chunksCount").as_deref(), Some("3"));
        assert_eq!(
            helpers::form_value(finalize, "sha256"),
            Some(hex::encode(Sha256::digest(CONTENT)))
        );
    }

    #[tokio::test]
    async fn missing_brand_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let file = helpers::temp_file(CONTENT);
        let client = helpers::permanent_token_client(&server);
        let err = client
            .asset_bank_manager()
            .upload_file(UploadRequest::new(file.path()).with_name("n"))
            .await
            .unwrap_err();
        assert!(matches!(err, BynderError::UploadValidation(_)));

        let empty = helpers::temp_file(b"");
        let err = client
            .asset_bank_manager()
            .upload_file(UploadRequest::new(empty.path()).with_brand_id("B1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BynderError::UploadValidation(_)));

        let err = client
            .asset_bank_manager()
            .upload_file(UploadRequest::new("/no/such/file.jpg").with_brand_id("B1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BynderError::UploadValidation(_)));
    }

    #[tokio::test]
    async fn failing_step_aborts_the_pipeline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/prepare"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file_id": "f1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/f1/chunk/1"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/f1/finalise_api"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let file = helpers::temp_file(CONTENT);
        let client = helpers::permanent_token_client(&server);
        let err = client
            .asset_bank_manager()
            .upload_file(UploadRequest::new(file.path()).with_brand_id("B1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BynderError::UploadStep {
                stage: UploadStage::Chunks,
                ..
            }
        ));
        assert!(err.is_server_error());
        assert_eq!(err.status(), Some(502));
    }

    fn s3_settings(concurrency: usize, max_polls: u32) -> UploadSettings {
        UploadSettings::default()
            .with_protocol(UploadProtocol::S3Multipart)
            .with_chunk_size(8)
            .with_concurrency(concurrency)
            .with_polling(max_polls, Duration::from_millis(1))
    }

    async fn mount_s3_upload(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/upload/endpoint"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!(format!("{}/s3/", server.uri()))),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/upload/init"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "s3file": {"uploadid": "u1", "targetid": "t1"},
                "s3_filename": "prefix/file",
                "multipart_params": {
                    "key": "prefix/file",
                    "acl": "private",
                    "Policy": "policy",
                    "success_action_status": "201"
                }
            })))
            .mount(server)
            .await;
        // The first part is slow so later parts finish earlier
        Mock::given(method("POST"))
            .and(path("/s3/"))
            .respond_with(|req: &Request| {
                if String::from_utf8_lossy(&req.body).contains("prefix/file/p1\r\n") {
                    ResponseTemplate::new(201).set_delay(Duration::from_millis(200))
                } else {
                    ResponseTemplate::new(201)
                }
            })
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v4/upload/u1/"))
            .respond_with(|req: &Request| {
                if helpers::form_value(req, "s3_filename").is_some() {
                    ResponseTemplate::new(200)
                        .insert_header("X-API-Correlation-ID", "corr-s3")
                        .set_body_json(json!({"importId": "imp1", "success": true}))
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({"success": true}))
                }
            })
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn s3_chunks_register_in_order_after_their_upload() {
        helpers::init_logging();
        let server = MockServer::start().await;
        mount_s3_upload(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/upload/poll/"))
            .and(query_param("items", "imp1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"itemsDone": ["imp1"], "itemsFailed": []})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v4/media/save/imp1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"mediaid": "m9"})))
            .expect(1)
            .mount(&server)
            .await;

        let file = helpers::temp_file(CONTENT);
        let client = helpers::upload_client(&server, s3_settings(3, 5));
        let outcome = client
            .asset_bank_manager()
            .upload_file(UploadRequest::new(file.path()).with_brand_id("B1"))
            .await
            .unwrap();
        assert_eq!(outcome.file_id, "imp1");
        assert_eq!(outcome.correlation_id.as_deref(), Some("corr-s3"));
        assert_eq!(outcome.media["mediaid"], "m9");

        let requests = server.received_requests().await.unwrap();
        let registrations: Vec<(usize, String)> = requests
            .iter()
            .enumerate()
            .filter_map(|(i, r)| helpers::form_value(r, "chunkNumber").map(|n| (i, n)))
            .collect();
        assert_eq!(
            registrations.iter().map(|(_, n)| n.as_str()).collect::<Vec<_>>(),
            vec!["1", "2", "3"]
        );

        for (index, number) in &registrations {
            let key = format!("prefix/file/p{}\r\n", number);
            let uploaded = requests
                .iter()
                .position(|r| {
                    r.url.path() == "/s3/" && String::from_utf8_lossy(&r.body).contains(&key)
                })
                .unwrap();
            assert!(uploaded < *index);
            assert_eq!(
                helpers::form_value(&requests[*index], "filename"),
                Some(format!("prefix/file/p{}", number))
            );
        }

        // Storage uploads are never signed for Bynder
        for r in requests.iter().filter(|r| r.url.path() == "/s3/") {
            assert!(helpers::header_value(r, "authorization").is_none());
        }

        let finalize = requests
            .iter()
            .find(|r| helpers::form_value(r, "s3_filename").is_some())
            .unwrap();
        assert_eq!(
            helpers::form_value(finalize, "s3_filename").as_deref(),
            Some("prefix/file/p3")
        );
        assert_eq!(helpers::form_value(finalize, "chunks").as_deref(), Some("3"));
        assert_eq!(helpers::form_value(finalize, "id").as_deref(), Some("u1"));
        assert_eq!(helpers::form_value(finalize, "targetid").as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn failed_conversion_skips_save() {
        let server = MockServer::start().await;
        mount_s3_upload(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/upload/poll/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"itemsDone": [], "itemsFailed": ["imp1"]})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v4/media/save/imp1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let file = helpers::temp_file(CONTENT);
        let client = helpers::upload_client(&server, s3_settings(1, 5));
        let err = client
            .asset_bank_manager()
            .upload_file(UploadRequest::new(file.path()).with_brand_id("B1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BynderError::ConversionFailed(ref id) if id == "imp1"));
    }

    #[tokio::test]
    async fn exhausted_polling_is_a_conversion_failure() {
        let server = MockServer::start().await;
        mount_s3_upload(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/upload/poll/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"itemsDone": [], "itemsFailed": []})),
            )
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v4/media/save/imp1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let file = helpers::temp_file(CONTENT);
        let client = helpers::upload_client(&server, s3_settings(1, 3));
        let err = client
            .asset_bank_manager()
            .upload_file(UploadRequest::new(file.path()).with_brand_id("B1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BynderError::ConversionFailed(_)));
    }

    #[tokio::test]
    async fn upload_endpoint_is_resolved_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/upload/endpoint"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!("https://bucket.s3.amazonaws.com/")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = helpers::upload_client(&server, s3_settings(1, 1));
        let uploader = client.asset_bank_manager().file_uploader();
        assert_eq!(
            uploader.upload_endpoint().await.unwrap(),
            "https://bucket.s3.amazonaws.com/"
        );
        assert_eq!(
            uploader.upload_endpoint().await.unwrap(),
            "https://bucket.s3.amazonaws.com/"
        );
    }
}
