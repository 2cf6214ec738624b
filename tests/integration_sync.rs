mod common;

#[cfg(feature = "integration-tests")]
mod integration_tests {
	use super::common::{self, PASSWORD, call, file_app, memory_app};
	use axum::body::Body;
	use axum::http::{Method, Request, StatusCode, header};
	use cybermuse_sync::config::Settings;
	use cybermuse_sync::persist::MemoryRepo;
	use serde_json::json;
	use std::sync::Arc;
	use tower::ServiceExt;

	/// Empty store -> upload -> list -> download -> delete -> list -> 404.
	#[tokio::test]
	async fn end_to_end_lifecycle() {
		let dir = tempfile::tempdir().unwrap();
		let app = file_app(dir.path());

		let (status, body) = call(&app, Method::GET, "/list", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, json!({"documents": [], "deletions": []}));

		let doc = json!({"lastUpdate": 100, "version": 1, "title": "hello"});
		let (status, body) = call(
			&app,
			Method::PUT,
			"/upload",
			Some(json!({"key": "doc1", "doc": doc})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, json!({"success": true}));

		let (_, body) = call(&app, Method::GET, "/list", None).await;
		assert_eq!(
			body,
			json!({
				"documents": [{"key": "doc1", "lastUpdate": 100, "version": 1}],
				"deletions": []
			})
		);

		let (status, body) = call(&app, Method::GET, "/download/doc1", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, doc);

		let (status, body) = call(
			&app,
			Method::DELETE,
			"/",
			Some(json!({"key": "doc1", "deletedAt": 200})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, json!({"success": true}));

		let (_, body) = call(&app, Method::GET, "/list", None).await;
		assert_eq!(
			body,
			json!({"documents": [], "deletions": [{"key": "doc1", "deletedAt": 200}]})
		);

		let (status, body) = call(&app, Method::GET, "/download/doc1", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "not_found");
		assert!(body["message"].as_str().unwrap().contains("doc1"));
	}

	#[tokio::test]
	async fn identical_upload_is_idempotent() {
		let dir = tempfile::tempdir().unwrap();
		let app = file_app(dir.path());
		let upload = json!({"key": "a", "doc": {"lastUpdate": 5, "version": 2, "body": [1, 2]}});

		call(&app, Method::PUT, "/upload", Some(upload.clone())).await;
		let snapshot_once = std::fs::read(dir.path().join("db.json")).unwrap();
		let (_, list_once) = call(&app, Method::GET, "/list", None).await;

		let (status, _) = call(&app, Method::PUT, "/upload", Some(upload)).await;
		assert_eq!(status, StatusCode::OK);
		let (_, list_twice) = call(&app, Method::GET, "/list", None).await;

		assert_eq!(list_once, list_twice);
		assert_eq!(std::fs::read(dir.path().join("db.json")).unwrap(), snapshot_once);
	}

	#[tokio::test]
	async fn tombstones_keep_first_deleted_at() {
		let dir = tempfile::tempdir().unwrap();
		let app = file_app(dir.path());

		for deleted_at in [100, 200] {
			let (status, _) = call(
				&app,
				Method::DELETE,
				"/",
				Some(json!({"key": "k", "deletedAt": deleted_at})),
			)
			.await;
			assert_eq!(status, StatusCode::OK);
		}

		let (_, body) = call(&app, Method::GET, "/list", None).await;
		assert_eq!(body["deletions"], json!([{"key": "k", "deletedAt": 100}]));
	}

	#[tokio::test]
	async fn deleting_unknown_key_creates_tombstone() {
		let dir = tempfile::tempdir().unwrap();
		let app = file_app(dir.path());

		let (status, _) = call(
			&app,
			Method::DELETE,
			"/",
			Some(json!({"key": "ghost", "deletedAt": 50})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);

		let (_, body) = call(&app, Method::GET, "/list", None).await;
		assert_eq!(body["documents"], json!([]));
		assert_eq!(body["deletions"], json!([{"key": "ghost", "deletedAt": 50}]));
	}

	#[tokio::test]
	async fn tombstoned_key_absorbs_later_uploads() {
		let dir = tempfile::tempdir().unwrap();
		let app = file_app(dir.path());

		call(&app, Method::DELETE, "/", Some(json!({"key": "k", "deletedAt": 10}))).await;
		let (status, body) = call(
			&app,
			Method::PUT,
			"/upload",
			Some(json!({"key": "k", "doc": {"lastUpdate": 20, "version": 1}})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, json!({"success": true}));

		let (_, body) = call(&app, Method::GET, "/list", None).await;
		assert_eq!(body["documents"], json!([]));
		assert_eq!(body["deletions"], json!([{"key": "k", "deletedAt": 10}]));
	}

	#[tokio::test]
	async fn batch_upload_applies_deletions_after_upserts() {
		let dir = tempfile::tempdir().unwrap();
		let app = file_app(dir.path());

		let batch = json!({
			"documents": [
				{"key": "a", "doc": {"lastUpdate": 1, "version": 1}},
				{"key": "b", "doc": {"lastUpdate": 2, "version": 1, "n": 1}},
				{"key": "b", "doc": {"lastUpdate": 3, "version": 2, "n": 2}}
			],
			"deletions": [{"key": "a", "deletedAt": 9}]
		});
		let (status, _) = call(&app, Method::PUT, "/upload", Some(batch)).await;
		assert_eq!(status, StatusCode::OK);

		let (_, body) = call(&app, Method::GET, "/list", None).await;
		assert_eq!(
			body,
			json!({
				"documents": [{"key": "b", "lastUpdate": 3, "version": 2}],
				"deletions": [{"key": "a", "deletedAt": 9}]
			})
		);
		let (_, doc) = call(&app, Method::GET, "/download/b", None).await;
		assert_eq!(doc["n"], 2);
	}

	#[tokio::test]
	async fn batch_download_is_all_or_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let app = file_app(dir.path());
		let batch = json!({
			"documents": [
				{"key": "x", "doc": {"lastUpdate": 1, "version": 1, "v": "x"}},
				{"key": "y", "doc": {"lastUpdate": 2, "version": 1, "v": "y"}}
			]
		});
		call(&app, Method::PUT, "/upload", Some(batch)).await;

		let (status, body) = call(
			&app,
			Method::POST,
			"/download",
			Some(json!({"keys": ["y", "x"]})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(
			body,
			json!([
				{"key": "y", "document": {"lastUpdate": 2, "version": 1, "v": "y"}},
				{"key": "x", "document": {"lastUpdate": 1, "version": 1, "v": "x"}}
			])
		);

		let (status, body) = call(
			&app,
			Method::POST,
			"/download",
			Some(json!({"keys": ["x", "nope", "y", "also-nope"]})),
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["message"], "document not found: nope");
	}

	#[tokio::test]
	async fn collections_are_separate_stores() {
		let dir = tempfile::tempdir().unwrap();
		let app = file_app(dir.path());

		let (status, _) = call(&app, Method::GET, "/download/notes/n1", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);

		call(
			&app,
			Method::PUT,
			"/upload?collection=notes",
			Some(json!({"key": "n1", "doc": {"lastUpdate": 1, "version": 1, "text": "hi"}})),
		)
		.await;
		assert!(dir.path().join("collections").join("notes.json").exists());

		let (status, body) = call(&app, Method::GET, "/download/notes/n1", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["text"], "hi");

		let (status, _) = call(&app, Method::GET, "/download/n1", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);

		let (_, body) = call(&app, Method::GET, "/list?collection=notes", None).await;
		assert_eq!(body["documents"][0]["key"], "n1");
		let (_, body) = call(&app, Method::GET, "/list", None).await;
		assert_eq!(body["documents"], json!([]));

		let (status, body) = call(&app, Method::GET, "/list?collection=..%2Fetc", None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "bad_request");
	}

	#[tokio::test]
	async fn malformed_bodies_are_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let app = file_app(dir.path());

		let cases = [
			(Method::PUT, "/upload", json!({"key": "a", "doc": {"title": "no envelope"}})),
			(Method::PUT, "/upload", json!({"key": "", "doc": {"lastUpdate": 1, "version": 1}})),
			(Method::DELETE, "/", json!({"key": "a"})),
			(Method::POST, "/download", json!({"keys": "a"})),
		];
		for (method, uri, body) in cases {
			let (status, resp) = call(&app, method, uri, Some(body)).await;
			assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
			assert_eq!(resp["error"], "bad_request");
		}

		assert!(!dir.path().join("db.json").exists());
	}

	#[tokio::test]
	async fn collections_are_discoverable() {
		let dir = tempfile::tempdir().unwrap();
		let app = file_app(dir.path());

		let (status, body) = call(&app, Method::GET, "/collections", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, json!({"collections": []}));

		for collection in ["tasks", "notes"] {
			let uri = format!("/upload?collection={collection}");
			let upload = json!({"key": "k", "doc": {"lastUpdate": 1, "version": 1}});
			let (status, _) = call(&app, Method::PUT, &uri, Some(upload)).await;
			assert_eq!(status, StatusCode::OK);
		}
		call(
			&app,
			Method::PUT,
			"/upload",
			Some(json!({"key": "root", "doc": {"lastUpdate": 1, "version": 1}})),
		)
		.await;

		let (_, body) = call(&app, Method::GET, "/collections", None).await;
		assert_eq!(body, json!({"collections": ["notes", "tasks"]}));

		for collection in body["collections"].as_array().unwrap() {
			let uri = format!("/list?collection={}", collection.as_str().unwrap());
			let (_, manifest) = call(&app, Method::GET, &uri, None).await;
			assert_eq!(manifest["documents"][0]["key"], "k");
		}
	}

	#[tokio::test]
	async fn fractional_last_update_is_echoed_verbatim() {
		let (app, _repo) = memory_app();
		let doc = json!({"lastUpdate": 1700000000000.5, "version": 1, "title": "half"});
		let (status, _) = call(&app, Method::PUT, "/upload", Some(json!({"key": "f", "doc": doc}))).await;
		assert_eq!(status, StatusCode::OK);

		let (_, body) = call(&app, Method::GET, "/download/f", None).await;
		assert_eq!(body, doc);
		let (_, manifest) = call(&app, Method::GET, "/list", None).await;
		assert_eq!(manifest["documents"][0]["lastUpdate"], json!(1700000000000.5));
	}

	#[tokio::test]
	async fn bad_upload_errors_say_what_is_wrong() {
		let (app, _repo) = memory_app();
		let (status, body) = call(
			&app,
			Method::PUT,
			"/upload",
			Some(json!({"key": "a", "doc": {"version": 1}})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		let message = body["message"].as_str().unwrap();
		assert!(message.contains("lastUpdate"), "{message}");
		assert!(!message.contains("untagged"), "{message}");
	}

	#[tokio::test]
	async fn query_rejections_use_the_error_shape() {
		let (app, repo) = memory_app();
		let (status, body) = call(&app, Method::GET, "/list?collection=a&collection=b", None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "bad_request");
		assert!(body["message"].is_string());
		assert_eq!(repo.load_count(), 0);
	}

	#[tokio::test]
	async fn oversized_and_untyped_bodies_keep_their_status() {
		let settings = Settings {
			body_limit_bytes: 64,
			..common::settings()
		};
		let repo = Arc::new(MemoryRepo::new());
		let app = common::app(&settings, repo.clone());

		let big = json!({"key": "a", "doc": {"lastUpdate": 1, "version": 1, "pad": "x".repeat(500)}});
		let (status, body) = call(&app, Method::PUT, "/upload", Some(big)).await;
		assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
		assert_eq!(body["error"], "payload_too_large");

		let req = Request::builder()
			.method(Method::PUT)
			.uri("/upload")
			.header(header::AUTHORIZATION, format!("Bearer {PASSWORD}"))
			.body(Body::from(r#"{"key":"a","doc":{"lastUpdate":1,"version":1}}"#))
			.unwrap();
		let resp = app.oneshot(req).await.unwrap();
		assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

		assert_eq!(repo.load_count(), 0);
		assert_eq!(repo.replace_count(), 0);
	}
}
