//! Integration tests for the storage client using MinIO via testcontainers
//!
//! These tests require Docker to be running and use the testcontainers crate
//! to spin up a MinIO instance. MinIO speaks the S3 API with HMAC
//! credentials, so the IAM path and the extended listing fields are not
//! covered here.
//!
//! Run with: cargo test --test cos_integration
//!
//! Note: Tests are skipped if Docker is not available.

use cos_access::cos::{
    resolve, ClientOptions, CosClient, CosError, PutOptions, ServiceCredential,
};
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::minio::MinIO;

/// MinIO default credentials
const MINIO_ACCESS_KEY: &str = "minioadmin";
const MINIO_SECRET_KEY: &str = "minioadmin";

/// Test helper to check if Docker is available
fn docker_available() -> bool {
    std::process::Command::new("docker")
        .arg("info")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

async fn start_minio() -> (ContainerAsync<MinIO>, String) {
    let container = MinIO::default()
        .with_env_var("MINIO_ROOT_USER", MINIO_ACCESS_KEY)
        .with_env_var("MINIO_ROOT_PASSWORD", MINIO_SECRET_KEY)
        .start()
        .await
        .expect("Failed to start MinIO container");

    let host = container.get_host().await.expect("Failed to get container host");
    let port = container
        .get_host_port_ipv4(9000)
        .await
        .expect("Failed to get MinIO port");

    // Wait for MinIO to be ready
    tokio::time::sleep(Duration::from_secs(2)).await;

    (container, format!("http://{}:{}", host, port))
}

/// HMAC client configured for MinIO
async fn create_minio_client(endpoint: &str) -> CosClient {
    let credential = resolve(&ServiceCredential::hmac(MINIO_ACCESS_KEY, MINIO_SECRET_KEY))
        .expect("HMAC credential should resolve");
    let options = ClientOptions {
        signing_region: "us-east-1".to_string(),
        force_path_style: true,
        ..Default::default()
    };
    CosClient::build(endpoint, &credential, &options)
        .await
        .expect("Failed to create MinIO client")
}

/// Test bucket creation and listing
#[tokio::test]
async fn test_create_and_list_buckets() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let (_container, endpoint) = start_minio().await;
    let client = create_minio_client(&endpoint).await;

    client.create_bucket("test-bucket-1", None).await.expect("Failed to create bucket 1");
    client.create_bucket("test-bucket-2", None).await.expect("Failed to create bucket 2");

    let buckets = client.list_buckets().await.expect("Failed to list buckets");
    let names: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
    assert!(names.contains(&"test-bucket-1"));
    assert!(names.contains(&"test-bucket-2"));
}

/// Test upload with content type and metadata, then download and head
#[tokio::test]
async fn test_put_get_head_object() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let (_container, endpoint) = start_minio().await;
    let client = create_minio_client(&endpoint).await;
    client.create_bucket("data-bucket", None).await.expect("Failed to create bucket");

    let test_data = b"Hello, MinIO! This is test data.";
    let options = PutOptions::default()
        .with_content_type("text/plain")
        .with_metadata("origin", "upload-form");
    client
        .put_object("data-bucket", "test-file.txt", test_data.to_vec(), &options)
        .await
        .expect("Failed to put object");

    let downloaded = client
        .get_object("data-bucket", "test-file.txt")
        .await
        .expect("Failed to get object");
    assert_eq!(downloaded, test_data.to_vec());

    let info = client
        .head_object("data-bucket", "test-file.txt")
        .await
        .expect("Failed to head object")
        .expect("Object should exist");
    assert_eq!(info.size, test_data.len() as u64);
    assert_eq!(info.content_type.as_deref(), Some("text/plain"));
    assert_eq!(info.metadata.get("origin").map(String::as_str), Some("upload-form"));

    let missing = client.head_object("data-bucket", "missing.txt").await.unwrap();
    assert!(missing.is_none());
}

/// Test listing objects with prefix
#[tokio::test]
async fn test_list_objects_with_prefix() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let (_container, endpoint) = start_minio().await;
    let client = create_minio_client(&endpoint).await;
    client.create_bucket("files-bucket", None).await.expect("Failed to create bucket");

    let options = PutOptions::default();
    for (key, body) in [
        ("docs/readme.md", "# Readme"),
        ("docs/guide.md", "# Guide"),
        ("src/main.rs", "fn main() {}"),
        ("root.txt", "root file"),
    ] {
        client
            .put_object("files-bucket", key, body.as_bytes().to_vec(), &options)
            .await
            .unwrap();
    }

    // Folders (docs/, src/) and root.txt
    let result = client
        .list_objects("files-bucket", None, None, 1000)
        .await
        .expect("Failed to list objects");
    let keys: Vec<&str> = result.objects.iter().map(|o| o.key.as_str()).collect();
    assert!(keys.contains(&"docs/"));
    assert!(keys.contains(&"src/"));
    assert!(keys.contains(&"root.txt"));

    let docs = client
        .list_objects("files-bucket", Some("docs/"), None, 1000)
        .await
        .expect("Failed to list docs objects");
    let doc_keys: Vec<&str> = docs.objects.iter().map(|o| o.key.as_str()).collect();
    assert!(doc_keys.contains(&"docs/readme.md"));
    assert!(doc_keys.contains(&"docs/guide.md"));
    assert!(!doc_keys.contains(&"root.txt"));
}

/// Test pagination with many objects
#[tokio::test]
async fn test_pagination_with_many_objects() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let (_container, endpoint) = start_minio().await;
    let client = create_minio_client(&endpoint).await;
    client.create_bucket("pagination-test", None).await.expect("Failed to create bucket");

    let options = PutOptions::default();
    for i in 0..25 {
        let key = format!("file-{:04}.txt", i);
        let data = format!("Content for file {}", i);
        client
            .put_object("pagination-test", &key, data.into_bytes(), &options)
            .await
            .unwrap();
    }

    let first_page = client
        .list_objects("pagination-test", None, None, 10)
        .await
        .expect("Failed to list first page");
    assert_eq!(first_page.objects.len(), 10);
    assert!(first_page.is_truncated);
    assert!(first_page.next_token.is_some());

    let mut total = first_page.objects.len();
    let mut token = first_page.next_token;
    while let Some(next) = token {
        let page = client
            .list_objects("pagination-test", None, Some(&next), 10)
            .await
            .expect("Failed to list page");
        total += page.objects.len();
        token = page.next_token;
    }
    assert_eq!(total, 25);
}

/// Test object deletion
#[tokio::test]
async fn test_delete_object() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let (_container, endpoint) = start_minio().await;
    let client = create_minio_client(&endpoint).await;
    client.create_bucket("delete-test", None).await.expect("Failed to create bucket");
    client
        .put_object("delete-test", "to-delete.txt", b"Delete me".to_vec(), &PutOptions::default())
        .await
        .unwrap();

    assert!(client.object_exists("delete-test", "to-delete.txt").await.unwrap());

    client
        .delete_object("delete-test", "to-delete.txt")
        .await
        .expect("Failed to delete");

    assert!(!client.object_exists("delete-test", "to-delete.txt").await.unwrap());
}

/// A handle re-targeted at the same server keeps working with the same credentials
#[tokio::test]
async fn test_with_endpoint_shares_credentials() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let (_container, endpoint) = start_minio().await;
    let base = create_minio_client("http://127.0.0.1:1").await;
    let bound = base.with_endpoint(&endpoint).expect("Failed to rebind");
    assert_eq!(base.endpoint(), "http://127.0.0.1:1");

    bound.create_bucket("rebound", None).await.expect("Failed to create bucket via bound handle");
    let buckets = bound.list_buckets().await.unwrap();
    assert!(buckets.iter().any(|b| b.name == "rebound"));
}

/// Requests against a dead endpoint surface as storage errors
#[tokio::test]
async fn test_unreachable_endpoint_is_storage_error() {
    let client = create_minio_client("http://127.0.0.1:1").await;
    let result = client.get_object("any", "key").await;
    assert!(matches!(result, Err(CosError::Storage { operation: "GetObject", .. })));
}
