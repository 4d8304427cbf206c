use dish_console::storage::{MockStorageService, S3StorageClient, StorageService, sanitize_key};

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn put_object_returns_url_and_records_write() {
        let mock = MockStorageService::new();
        let url = mock
            .put_object("uploads/1-pizza.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .expect("mock write");

        assert!(url.ends_with("/uploads/1-pizza.jpg"));
        assert_eq!(
            mock.stored(),
            vec![("uploads/1-pizza.jpg".to_string(), 3, "image/jpeg".to_string())]
        );
    }

    #[tokio::test]
    async fn clones_share_the_recorded_writes() {
        let mock = MockStorageService::new();
        let handle = mock.clone();
        handle
            .put_object("uploads/a.png", vec![0; 10], "image/png")
            .await
            .unwrap();
        assert_eq!(mock.stored().len(), 1);
    }

    #[tokio::test]
    async fn failing_mock_stores_nothing() {
        let mock = MockStorageService::new_failing();
        let result = mock.put_object("uploads/a.png", vec![0], "image/png").await;
        assert!(result.is_err());
        assert!(mock.stored().is_empty());
    }

    #[test]
    fn keys_built_from_hostile_names_stay_flat() {
        for name in ["../../etc/passwd", "a/b/../c.png", "..\\..\\win.ini", "/"] {
            let key = sanitize_key(name);
            assert!(!key.contains('/'), "{}", key);
            assert!(!key.contains('\\'), "{}", key);
            assert!(!key.contains(".."), "{}", key);
            assert!(!key.is_empty());
        }
        assert_eq!(sanitize_key("menu (final).webp"), "menu__final_.webp");
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn s3_client_creation() {
        let _client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
        )
        .await;
        // Construction alone performs no network calls.
    }

    #[tokio::test]
    #[ignore = "requires a running MinIO at localhost:9000"]
    async fn s3_put_object_against_minio() {
        let client = S3StorageClient::new(
            "http://localhost:9000/",
            "us-east-1",
            "admin",
            "password",
            "dish-images-test",
        )
        .await;
        client.ensure_bucket_exists().await;

        let key = format!("uploads/{}-test.png", uuid::Uuid::new_v4());
        let url = client
            .put_object(&key, b"not-a-png".to_vec(), "image/png")
            .await
            .expect("upload to MinIO");

        assert_eq!(
            url,
            format!("http://localhost:9000/dish-images-test/{}", key)
        );
    }
}
