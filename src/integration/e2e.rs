//! End-to-end integration tests

#[cfg(test)]
mod tests {
    use axum::http::{header, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::TranscodeMode;
    use crate::integration::fixtures::{body_bytes, media_bytes, TestServer};
    use crate::storage::JsonFileMetadataStore;
    use crate::transcode::manifest::Manifest;
    use crate::transcode::runner::tests::{Script, ScriptedTranscoder};
    use crate::transcode::queue::TranscodeStatus;

    fn scripted(script: Script) -> Arc<ScriptedTranscoder> {
        Arc::new(ScriptedTranscoder::new(script))
    }

    async fn upload_id(server: &TestServer, data: &[u8]) -> String {
        let (status, asset) = server.upload("Sintel", "sintel.mp4", data).await;
        assert_eq!(status, 200, "upload failed: {}", asset);
        asset["id"].as_str().unwrap().to_string()
    }

    /// Fetch the whole original through consecutive open-ended range requests
    async fn fetch_by_ranges(server: &TestServer, id: &str) -> Vec<u8> {
        let uri = format!("/videos/streaming/{}", id);
        let mut out = Vec::new();
        loop {
            let response = server
                .get_range(&uri, &format!("bytes={}-", out.len()))
                .await;
            if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
                return out;
            }
            assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
            out.extend(body_bytes(response).await);
        }
    }

    #[tokio::test]
    async fn test_upload_transcode_stream() {
        let server = TestServer::new(scripted(Script::Complete(3)), TranscodeMode::Background, 64);
        let data = media_bytes(1000);
        let id = upload_id(&server, &data).await;

        assert_eq!(
            server.wait_for_transcode(&id).await,
            Some(TranscodeStatus::Ready { segments: 3 })
        );

        // Raw playback reassembles the original in chunk-sized windows
        assert_eq!(fetch_by_ranges(&server, &id).await, data);

        let response = server.get(&format!("/videos/{}/master.m3u8", id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let text = String::from_utf8(body_bytes(response).await).unwrap();
        let manifest = Manifest::parse(&text).unwrap();
        assert_eq!(manifest.segments.len(), 3);

        for segment in &manifest.segments {
            let response = server.get(&format!("/videos/{}/{}", id, segment)).await;
            assert_eq!(response.status(), StatusCode::OK, "{}", segment);
            assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp2t");
        }
    }

    #[tokio::test]
    async fn test_failed_transcode_keeps_raw_playback() {
        let server = TestServer::new(scripted(Script::Fail(1)), TranscodeMode::Background, 256);
        let data = media_bytes(300);
        let id = upload_id(&server, &data).await;

        assert_eq!(
            server.wait_for_transcode(&id).await,
            Some(TranscodeStatus::Failed { exit_code: Some(1) })
        );

        let response = server.get(&format!("/videos/getVideo/{}", id)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = server
            .get_range(&format!("/videos/streaming/{}", id), "bytes=0-")
            .await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-255/300");
        assert_eq!(body_bytes(response).await, &data[..256]);

        let response = server.get(&format!("/videos/{}/master.m3u8", id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = server.get(&format!("/videos/{}/status", id)).await;
        let status: serde_json::Value =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(status["status"], "failed");
        assert_eq!(status["exit_code"], 1);
    }

    #[tokio::test]
    async fn test_blocking_failure_returns_error_but_keeps_asset() {
        let server = TestServer::new(scripted(Script::Fail(2)), TranscodeMode::Blocking, 1024);
        let data = media_bytes(100);

        let (status, body) = server.upload("Broken", "broken.mp4", &data).await;
        assert_eq!(status, 500);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");

        let assets = server.state.metadata.list().await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(fetch_by_ranges(&server, &assets[0].id).await, data);
    }

    #[tokio::test]
    async fn test_manifest_hidden_while_transcoding() {
        let server = TestServer::new(
            scripted(Script::Slow(Duration::from_millis(300))),
            TranscodeMode::Background,
            1024,
        );
        let id = upload_id(&server, &media_bytes(10)).await;
        let manifest_uri = format!("/videos/{}/master.m3u8", id);

        assert_eq!(server.get(&manifest_uri).await.status(), StatusCode::NOT_FOUND);

        server.wait_for_transcode(&id).await;

        let response = server.get(&manifest_uri).await;
        assert_eq!(response.status(), StatusCode::OK);

        // Every segment the manifest names is servable
        let text = String::from_utf8(body_bytes(response).await).unwrap();
        for segment in Manifest::parse(&text).unwrap().segments {
            let response = server.get(&format!("/videos/{}/{}", id, segment)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        // Nothing but the finished set is left in the HLS root
        let names: Vec<_> = std::fs::read_dir(&server.state.config.storage.hls_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![id]);
    }

    #[tokio::test]
    async fn test_restart_recovers_ready_sets() {
        let root = tempfile::tempdir().unwrap();
        let store_path = root.path().join("assets.json");

        let first = TestServer::with_metadata(
            root,
            scripted(Script::Complete(2)),
            TranscodeMode::Blocking,
            1024,
            Arc::new(JsonFileMetadataStore::open(&store_path).await.unwrap()),
        );
        let id = upload_id(&first, &media_bytes(50)).await;
        let TestServer { root, .. } = first;

        let second = TestServer::with_metadata(
            root,
            scripted(Script::Fail(1)),
            TranscodeMode::Blocking,
            1024,
            Arc::new(JsonFileMetadataStore::open(&store_path).await.unwrap()),
        );
        assert_eq!(second.state.transcodes.status(&id), None);

        let assets = second.state.metadata.list().await.unwrap();
        assert_eq!(second.state.transcodes.recover(&assets).await, 1);
        assert_eq!(
            second.state.transcodes.status(&id),
            Some(TranscodeStatus::Ready { segments: 2 })
        );

        let response = second.get(&format!("/videos/{}/master.m3u8", id)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
