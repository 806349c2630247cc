use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use axum_test::TestServer;
use opsconsole::api;
use opsconsole::auth::{AuthConfig, Viewer};
use opsconsole::console::ConsoleBuilder;
use opsconsole::media::MediaConfig;

const HELLO: &[u8] = b"hello, world\n";
const PDF: &[u8] = b"%PDF-1.4 q1 report";

fn media_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("Failed to create media dir");
    std::fs::write(dir.path().join("hello.txt"), HELLO).unwrap();
    std::fs::create_dir_all(dir.path().join("reports")).unwrap();
    std::fs::write(dir.path().join("reports/q1.pdf"), PDF).unwrap();
    dir
}

fn setup(media: MediaConfig) -> TestServer {
    let console = Arc::new(ConsoleBuilder::new().finish());
    let auth = AuthConfig::with_viewers(vec![(
        "user-token".to_string(),
        Viewer::user("2", "bob"),
    )]);

    let app = api::create_router(console, auth, media);
    TestServer::new(app).expect("Failed to create test server")
}

fn setup_direct() -> (TestServer, tempfile::TempDir) {
    let dir = media_root();
    let media = MediaConfig::direct(dir.path()).expect("Failed to build media config");
    (setup(media), dir)
}

fn setup_offload() -> (TestServer, tempfile::TempDir) {
    let dir = media_root();
    let media = MediaConfig::offload(dir.path()).expect("Failed to build media config");
    (setup(media), dir)
}

mod authentication {
    use super::*;

    #[tokio::test]
    async fn unauthenticated_requests_are_rejected() {
        let (server, _dir) = setup_direct();

        let existing = server.get("/files/hello.txt").await;
        existing.assert_status(StatusCode::UNAUTHORIZED);

        // Same answer whether or not the file exists; rejection happens
        // before any filesystem access.
        let missing = server.get("/files/nope.txt").await;
        missing.assert_status(StatusCode::UNAUTHORIZED);
    }
}

mod direct_delivery {
    use super::*;

    #[tokio::test]
    async fn streams_a_contained_file_with_headers() {
        let (server, _dir) = setup_direct();

        let response = server
            .get("/files/hello.txt")
            .add_header(header::AUTHORIZATION, "Bearer user-token")
            .await;

        response.assert_status_ok();
        assert_eq!(response.as_bytes().as_ref(), HELLO);

        let headers = response.headers();
        assert!(headers
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(
            headers.get(header::CONTENT_DISPOSITION).unwrap(),
            "inline; filename=\"hello.txt\""
        );
        assert_eq!(
            headers.get(header::CACHE_CONTROL).unwrap(),
            "private, max-age=3600"
        );
        assert_eq!(
            headers.get(header::CONTENT_LENGTH).unwrap().to_str().unwrap(),
            HELLO.len().to_string()
        );
    }

    #[tokio::test]
    async fn head_returns_the_same_headers_and_no_body() {
        let (server, _dir) = setup_direct();

        let response = server
            .method(Method::HEAD, "/files/hello.txt")
            .add_header(header::AUTHORIZATION, "Bearer user-token")
            .await;

        response.assert_status_ok();
        assert!(response.as_bytes().is_empty());
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_LENGTH)
                .unwrap()
                .to_str()
                .unwrap(),
            HELLO.len().to_string()
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "inline; filename=\"hello.txt\""
        );
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let (server, _dir) = setup_direct();

        let response = server
            .get("/files/reports/q2.pdf")
            .add_header(header::AUTHORIZATION, "Bearer user-token")
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn directory_is_not_found() {
        let (server, _dir) = setup_direct();

        let response = server
            .get("/files/reports")
            .add_header(header::AUTHORIZATION, "Bearer user-token")
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod containment {
    use super::*;

    #[tokio::test]
    async fn dotdot_traversal_answers_a_generic_not_found() {
        let (server, _dir) = setup_direct();

        let response = server
            .get("/files/../../etc/passwd")
            .add_header(header::AUTHORIZATION, "Bearer user-token")
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        // Indistinguishable from a plain miss: no path echo, no
        // distinct status.
        assert_eq!(response.text(), "File not found");
    }

    #[tokio::test]
    async fn deep_dotdot_traversal_from_a_subdirectory_is_not_found() {
        let (server, _dir) = setup_direct();

        let response = server
            .get("/files/reports/../../../../etc/hostname")
            .add_header(header::AUTHORIZATION, "Bearer user-token")
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escape_is_not_found() {
        let (server, dir) = setup_direct();
        let outside = dir.path().parent().unwrap().join("gateway-secret.txt");
        std::fs::write(&outside, b"secret").unwrap();
        std::os::unix::fs::symlink(&outside, dir.path().join("leak.txt")).unwrap();

        let response = server
            .get("/files/leak.txt")
            .add_header(header::AUTHORIZATION, "Bearer user-token")
            .await;

        std::fs::remove_file(&outside).ok();
        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod offload_delivery {
    use super::*;

    #[tokio::test]
    async fn emits_internal_redirect_and_no_body() {
        let (server, _dir) = setup_offload();

        let response = server
            .get("/files/reports/q1.pdf")
            .add_header(header::AUTHORIZATION, "Bearer user-token")
            .await;

        response.assert_status_ok();
        assert!(response.as_bytes().is_empty());

        let headers = response.headers();
        assert_eq!(
            headers.get("X-Accel-Redirect").unwrap(),
            "/protected-media/reports/q1.pdf"
        );
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert!(headers
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("q1.pdf"));
        assert_eq!(
            headers.get(header::CACHE_CONTROL).unwrap(),
            "private, max-age=3600"
        );
    }

    #[tokio::test]
    async fn containment_applies_in_offload_mode_too() {
        let (server, _dir) = setup_offload();

        let response = server
            .get("/files/../../etc/passwd")
            .add_header(header::AUTHORIZATION, "Bearer user-token")
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.headers().get("X-Accel-Redirect").is_none());
    }
}
