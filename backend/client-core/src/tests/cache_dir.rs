use crate::cache_dir::ensure_exists;

#[tokio::test]
async fn given_missing_nested_dir_when_ensured_then_creates_all_parents() {
    // GIVEN: A path two levels below an empty temp dir
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("analysis-server").join("fixture");

    // WHEN: Ensuring it exists
    ensure_exists(&path).await.unwrap();

    // THEN: It is a directory
    assert!(path.is_dir());
}

#[tokio::test]
async fn given_existing_dir_when_ensured_then_is_noop() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("http"), "9090").unwrap();

    ensure_exists(root.path()).await.unwrap();

    assert_eq!(std::fs::read_to_string(root.path().join("http")).unwrap(), "9090");
}

#[tokio::test]
async fn given_path_under_regular_file_when_ensured_then_returns_io_error() {
    let root = tempfile::tempdir().unwrap();
    let file = root.path().join("not-a-dir");
    std::fs::write(&file, "").unwrap();

    let result = ensure_exists(&file.join("cache")).await;

    assert!(result.is_err());
}
