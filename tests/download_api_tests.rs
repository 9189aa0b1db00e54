mod common;

#[cfg(test)]
mod download_api_tests {
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use policy_docs_server::configure_routes;
    use policy_docs_server::generator::RenderFailurePolicy;
    use serde_json::Value;

    use crate::common::{put_generated, read_zip_entry, test_state, zip_entry_names};

    fn encode(value: &str) -> String {
        let mut out = String::new();
        for byte in value.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    out.push(byte as char)
                }
                _ => out.push_str(&format!("%{byte:02X}")),
            }
        }
        out
    }

    #[actix_web::test]
    async fn test_download_by_query_and_path() {
        let (_dir, state) = test_state(RenderFailurePolicy::Fail).await;
        put_generated(&state, "Acme_Terms_2025-03-04T10-11-12-345Z.txt", b"Terms for Acme");
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/download?file=Acme_Terms_2025-03-04T10-11-12-345Z.txt")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("Acme_Terms_2025-03-04T10-11-12-345Z.txt"));
        assert!(resp
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(test::read_body(resp).await.as_ref(), b"Terms for Acme");

        let req = test::TestRequest::get()
            .uri("/api/download/Acme_Terms_2025-03-04T10-11-12-345Z.txt")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/download?id=acme_terms_2025-03-04t10-11-12-345z.TXT")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await.as_ref(), b"Terms for Acme");
    }

    #[actix_web::test]
    async fn test_download_rejects_traversal() {
        let (_dir, state) = test_state(RenderFailurePolicy::Fail).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        for name in ["../../etc/passwd", "..", "sub\\file.docx"] {
            let uri = format!("/api/download?file={}", encode(name));
            let req = test::TestRequest::get().uri(&uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{name}");
        }

        let req = test::TestRequest::get()
            .uri("/api/download/..%2F..%2Fetc%2Fpasswd")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_download_missing_and_empty() {
        let (_dir, state) = test_state(RenderFailurePolicy::Fail).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/download?file=missing.docx")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/download").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_download_all_bundles_requested_files() {
        let (_dir, state) = test_state(RenderFailurePolicy::Fail).await;
        put_generated(&state, "a.docx", b"first");
        put_generated(&state, "b.docx", b"second");
        put_generated(&state, "c.txt", b"third");
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let files = r#"["a.docx","/srv/app/generated_docs/b.docx","generated_docs/c.txt"]"#;
        let uri = format!("/api/download-all?files={}", encode(files));
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/zip"
        );
        assert!(resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("policy_documents.zip"));

        let archive = test::read_body(resp).await;
        assert_eq!(zip_entry_names(&archive), vec!["a.docx", "b.docx", "c.txt"]);
        assert_eq!(read_zip_entry(&archive, "b.docx").unwrap(), b"second");
    }

    #[actix_web::test]
    async fn test_download_all_skips_traversal_and_missing() {
        let (_dir, state) = test_state(RenderFailurePolicy::Fail).await;
        put_generated(&state, "a.docx", b"first");
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let files = r#"["../secret.docx","generated_docs/../../etc/passwd","missing.docx","a.docx"]"#;
        let uri = format!("/api/download-all?files={}", encode(files));
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let archive = test::read_body(resp).await;
        assert_eq!(zip_entry_names(&archive), vec!["a.docx"]);

        let files = r#"["../secret.docx","missing.docx"]"#;
        let uri = format!("/api/download-all?files={}", encode(files));
        let req = test::TestRequest::get().uri(&uri).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_download_all_rejects_bad_parameter() {
        let (_dir, state) = test_state(RenderFailurePolicy::Fail).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/download-all").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let uri = format!("/api/download-all?files={}", encode(r#"{"not":"a list"}"#));
        let req = test::TestRequest::get().uri(&uri).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_list_documents_newest_first() {
        let (_dir, state) = test_state(RenderFailurePolicy::Fail).await;
        put_generated(&state, "older.docx", b"1");
        let older = std::fs::File::options()
            .write(true)
            .open(state.config.generated_dir.join("older.docx"))
            .unwrap();
        older
            .set_modified(std::time::SystemTime::now() - std::time::Duration::from_secs(3600))
            .unwrap();
        put_generated(&state, "newer.docx", b"22");
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/documents").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let documents = body["documents"].as_array().unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["filename"], "newer.docx");
        assert_eq!(documents[0]["size"], 2);
        assert_eq!(documents[0]["downloadUrl"], "/api/download/newer.docx");
        assert_eq!(documents[1]["filename"], "older.docx");
    }
}
