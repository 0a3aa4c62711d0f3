//! Integration tests for a full harvest run
//!
//! These tests use wiremock to stand in for the note platform, the
//! summarization endpoint and the push endpoint, and drive complete runs
//! through `run_harvest`.

use chrono::Local;
use note_harvester::config::{load_config, Config};
use note_harvester::crawler::{run_harvest, Collaborators, CrawlStatus, HaltReason};
use note_harvester::output::{ChatSummarizer, DigestBuilder, DigestOutcome, WebhookNotifier};
use note_harvester::provider::{CookieSigner, WebApiSource};
use note_harvester::sink::{DisabledExtractor, MediaDownloader};
use note_harvester::storage::{SqliteStorage, Storage};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/api/sns/web/v1/user_posted";
const FEED_PATH: &str = "/api/sns/web/v1/feed";

/// Writes a config and an owner list into `dir` and loads the config
fn create_test_config(dir: &TempDir, server: &MockServer) -> Config {
    let owners = dir.path().join("owners.txt");
    std::fs::write(&owners, "# watched owners\nowner1\n").unwrap();

    let content = format!(
        r#"
[crawler]
mode = "exhaustive"
interval = "all"
item-delay-secs = 0
retry-backoff-secs = 0

[provider]
base-url = "{uri}"
web-url = "https://www.example.com"

[input]
owners-file = "{owners}"

[output]
database-path = "{db}"
media-root = "{media}"
media = "images"
"#,
        uri = server.uri(),
        owners = owners.display(),
        db = dir.path().join("notes.db").display(),
        media = dir.path().join("media").display(),
    );

    let path = dir.path().join("harvester.toml");
    std::fs::write(&path, content).unwrap();
    load_config(&path).unwrap()
}

fn note_json(server: &MockServer, id: &str, upload_millis: i64) -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "items": [{
                "id": id,
                "note_card": {
                    "type": "normal",
                    "user": {"user_id": "owner1", "nickname": "Owner One", "avatar": ""},
                    "title": format!("Title {}", id),
                    "desc": "a description",
                    "interact_info": {"liked_count": "12", "collected_count": 3, "comment_count": "1", "share_count": "0"},
                    "image_list": [{"info_list": [{"url": format!("{}/img/{}.jpg", server.uri(), id)}]}],
                    "tag_list": [{"name": "travel"}],
                    "time": upload_millis,
                    "ip_location": "Shanghai"
                }
            }]
        }
    })
}

/// Mounts a one-page listing of `ids` plus the detail and image endpoints
async fn mount_platform(server: &MockServer, ids: &[&str]) {
    let notes: Vec<_> = ids
        .iter()
        .map(|id| json!({"note_id": id, "xsec_token": format!("tok-{}", id)}))
        .collect();

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"notes": notes, "cursor": "", "has_more": false}
        })))
        .mount(server)
        .await;

    let now = Local::now().timestamp_millis();
    for (i, id) in ids.iter().enumerate() {
        Mock::given(method("POST"))
            .and(path(FEED_PATH))
            .and(body_partial_json(json!({"source_note_id": id})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(note_json(server, id, now - i as i64 * 60_000)),
            )
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/img/{}.jpg", id)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
            .mount(server)
            .await;
    }
}

fn collaborators(config: &Config, digest: Option<DigestBuilder>) -> Collaborators {
    let client = reqwest::Client::new();
    let signer = Arc::new(CookieSigner::new("a1=abc; web_session=xyz", "https://www.example.com"));
    Collaborators {
        source: Arc::new(WebApiSource::new(
            client.clone(),
            signer,
            config.provider.base_url.clone(),
            config.crawler.page_size,
        )),
        downloader: MediaDownloader::new(client),
        extractor: Arc::new(DisabledExtractor),
        digest,
    }
}

async fn feed_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == FEED_PATH)
        .count()
}

#[tokio::test]
async fn test_full_run_archives_notes() {
    let server = MockServer::start().await;
    mount_platform(&server, &["n1", "n2"]).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &server);

    let report = run_harvest(&config, "hash", collaborators(&config, None))
        .await
        .unwrap();

    assert_eq!(report.total_new, 2);
    assert_eq!(report.owners.len(), 1);
    assert_eq!(report.owners[0].status, CrawlStatus::Success);
    assert_eq!(report.owners[0].halt, HaltReason::Exhausted);
    assert!(report.digest.is_none());

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let items = storage.get_items_for_owner("owner1").unwrap();
    let ids: Vec<_> = items.iter().map(|i| i.record.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"n1") && ids.contains(&"n2"));

    for item in &items {
        let dir = item.local_path.as_ref().expect("note directory recorded");
        assert!(dir.join("info.json").exists());
        assert!(dir.join("detail.txt").exists());
        assert_eq!(std::fs::read(dir.join("image_0.jpg")).unwrap(), b"jpeg bytes");
        assert_eq!(item.record.geo_label, "Shanghai");
        assert_eq!(item.record.collected_count, "3");
    }

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.new_items, 2);
}

#[tokio::test]
async fn test_second_run_fetches_nothing_known() {
    let server = MockServer::start().await;
    mount_platform(&server, &["n1", "n2"]).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &server);

    run_harvest(&config, "hash", collaborators(&config, None))
        .await
        .unwrap();
    assert_eq!(feed_requests(&server).await, 2);

    let report = run_harvest(&config, "hash", collaborators(&config, None))
        .await
        .unwrap();

    assert_eq!(report.total_new, 0);
    assert_eq!(feed_requests(&server).await, 2);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(storage.count_items(Some("owner1")).unwrap(), 2);
    assert_eq!(storage.count_runs().unwrap(), 2);
}

#[tokio::test]
async fn test_run_ends_with_digest() {
    let server = MockServer::start().await;
    mount_platform(&server, &["n1"]).await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "daily summary"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_partial_json(json!({"content": "daily summary", "uids": ["UID_a"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &server);
    let digest_dir = dir.path().join("digests");

    let client = reqwest::Client::new();
    let builder = DigestBuilder::new(
        Arc::new(
            ChatSummarizer::new(client.clone(), server.uri(), "model", "prompt", "UNUSED_KEY_ENV")
                .with_api_key("key"),
        ),
        Arc::new(WebhookNotifier::new(
            client,
            format!("{}/send", server.uri()),
            "AT_1",
        )),
        vec!["UID_a".to_string()],
        &digest_dir,
    );

    let report = run_harvest(&config, "hash", collaborators(&config, Some(builder)))
        .await
        .unwrap();

    let Some(DigestOutcome::Summarized {
        content_path,
        summary_path,
        notified,
    }) = report.digest
    else {
        panic!("expected a summarized digest");
    };
    assert_eq!(notified, 1);
    assert_eq!(std::fs::read_to_string(summary_path).unwrap(), "daily summary");

    let content = std::fs::read_to_string(content_path).unwrap();
    assert!(content.contains("Note ID: n1"));
    assert!(content.contains("Tags: travel"));
}

#[tokio::test]
async fn test_rejected_listing_fails_owner_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("user_id", "blocked"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "msg": "login required"})),
        )
        .mount(&server)
        .await;
    mount_platform(&server, &["n1", "n2"]).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &server);
    std::fs::write(&config.input.owners_file, "blocked\nowner1\n").unwrap();

    let report = run_harvest(&config, "hash", collaborators(&config, None))
        .await
        .unwrap();

    assert_eq!(report.owners.len(), 2);
    assert_eq!(report.owners[0].owner_id, "blocked");
    assert_eq!(report.owners[0].status, CrawlStatus::Failed);
    assert_eq!(report.owners[0].halt, HaltReason::PageFailed);
    assert_eq!(report.owners[0].new_items, 0);
    assert!(report.owners[0].message.contains("login required"));

    assert_eq!(report.owners[1].owner_id, "owner1");
    assert_eq!(report.owners[1].status, CrawlStatus::Success);
    assert_eq!(report.owners[1].new_items, 2);
    assert_eq!(report.total_new, 2);
    assert_eq!(feed_requests(&server).await, 2);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(storage.count_items(Some("blocked")).unwrap(), 0);
    assert_eq!(storage.count_items(Some("owner1")).unwrap(), 2);
}

#[tokio::test]
async fn test_missing_owner_list_fails_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, &server);
    config.input.owners_file = dir.path().join("missing.txt").display().to_string();

    let result = run_harvest(&config, "hash", collaborators(&config, None)).await;
    assert!(result.is_err());

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status.to_db_string(), "failed");
}
