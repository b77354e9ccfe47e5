//! Integration tests for the S3 storage provider using MinIO via testcontainers
//!
//! These tests require Docker to be running.
//!
//! Run with: cargo test --test storage_integration
//!
//! Note: Tests are skipped if Docker is not available.

use bytes::Bytes;
use media_gallery::backend::{S3ClientConfig, S3Storage, StorageProvider, RESOURCE_EXISTS};
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::minio::MinIO;
use url::Url;

/// MinIO default credentials
const MINIO_ACCESS_KEY: &str = "minioadmin";
const MINIO_SECRET_KEY: &str = "minioadmin";

fn docker_available() -> bool {
    std::process::Command::new("docker")
        .arg("info")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

async fn start_minio() -> ContainerAsync<MinIO> {
    let container = MinIO::default()
        .with_env_var("MINIO_ROOT_USER", MINIO_ACCESS_KEY)
        .with_env_var("MINIO_ROOT_PASSWORD", MINIO_SECRET_KEY)
        .start()
        .await
        .expect("Failed to start MinIO container");

    // Wait for MinIO to be ready
    tokio::time::sleep(Duration::from_secs(2)).await;
    container
}

async fn minio_storage(container: &ContainerAsync<MinIO>, bucket: &str) -> S3Storage {
    let host = container.get_host().await.expect("Failed to get container host");
    let port = container.get_host_port_ipv4(9000).await.expect("Failed to get MinIO port");
    let endpoint = format!("http://{}:{}", host, port);

    let config = S3ClientConfig {
        endpoint_url: Some(endpoint),
        force_path_style: true,
        region: Some("us-east-1".to_string()),
        access_key_id: Some(MINIO_ACCESS_KEY.to_string()),
        secret_access_key: Some(MINIO_SECRET_KEY.to_string()),
    };
    let public_base = Url::parse("https://project.example.co").unwrap();

    let storage = S3Storage::with_config(config, bucket, public_base)
        .await
        .expect("Failed to create storage");
    storage.create_bucket().await.expect("Failed to create bucket");
    storage
}

#[tokio::test]
async fn test_upload_list_download_remove() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let container = start_minio().await;
    let storage = minio_storage(&container, "media").await;

    assert!(storage.list().await.expect("Failed to list").is_empty());

    let data = Bytes::from_static(b"\x89PNG fake image data");
    storage
        .upload("cat.png", data.clone(), "image/png")
        .await
        .expect("Failed to upload");
    storage
        .upload("song.mp3", Bytes::from_static(b"ID3"), "audio/mpeg")
        .await
        .expect("Failed to upload");

    let listed = storage.list().await.expect("Failed to list");
    let names: Vec<&str> = listed.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["cat.png", "song.mp3"]);
    assert!(listed.iter().all(|o| o.created_at.is_some()));
    assert_eq!(listed[0].size, data.len() as u64);

    let downloaded = storage.download("cat.png").await.expect("Failed to download");
    assert_eq!(downloaded, data);

    storage
        .remove(&["cat.png".to_string()])
        .await
        .expect("Failed to remove");

    let names: Vec<String> = storage
        .list()
        .await
        .expect("Failed to list")
        .into_iter()
        .map(|o| o.name)
        .collect();
    assert_eq!(names, vec!["song.mp3".to_string()]);
}

#[tokio::test]
async fn test_list_skips_folders() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let container = start_minio().await;
    let storage = minio_storage(&container, "media").await;

    storage
        .upload("top.gif", Bytes::from_static(b"GIF89a"), "image/gif")
        .await
        .expect("Failed to upload");
    storage
        .upload("nested/inner.gif", Bytes::from_static(b"GIF89a"), "image/gif")
        .await
        .expect("Failed to upload");

    let names: Vec<String> = storage
        .list()
        .await
        .expect("Failed to list")
        .into_iter()
        .map(|o| o.name)
        .collect();
    assert_eq!(names, vec!["top.gif".to_string()]);
}

#[tokio::test]
async fn test_upload_never_replaces_existing_object() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let container = start_minio().await;
    let storage = minio_storage(&container, "media").await;

    storage
        .upload("clip.mp4", Bytes::from_static(b"first"), "video/mp4")
        .await
        .expect("Failed to upload");

    let err = storage
        .upload("clip.mp4", Bytes::from_static(b"second"), "video/mp4")
        .await
        .expect_err("second upload under the same name should fail");
    assert_eq!(err.message, RESOURCE_EXISTS);

    let data = storage.download("clip.mp4").await.expect("Failed to download");
    assert_eq!(data, Bytes::from_static(b"first"));
}

#[tokio::test]
async fn test_download_missing_object_fails() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let container = start_minio().await;
    let storage = minio_storage(&container, "media").await;

    assert!(storage.download("absent.png").await.is_err());
}

#[tokio::test]
async fn test_public_url_uses_project_base() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }

    let container = start_minio().await;
    let storage = minio_storage(&container, "media").await;

    assert_eq!(
        storage.public_url("a b.png"),
        "https://project.example.co/storage/v1/object/public/media/a%20b.png"
    );
}
