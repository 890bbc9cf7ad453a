//! End-to-end pipeline tests with mocked source, object store and parameter
//! store: per-root-path failure isolation, publishing side effects, scratch
//! cleanup, and the (deliberate) lack of idempotence across runs.

use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

use layer_publisher::config::Config;
use layer_publisher::contract::{
    EntryKind, MockObjectStore, MockParameterStore, MockRepoSource, RemoteEntry,
};
use layer_publisher::pipeline::{run, RootOutcome};

fn entry(path: &str, kind: EntryKind) -> RemoteEntry {
    RemoteEntry {
        path: path.to_string(),
        kind,
    }
}

fn test_config(scratch: &Path, root_paths: Vec<&str>) -> Config {
    Config {
        workspace: "acme".into(),
        repository: "layers".into(),
        token_parameter: "/acme/bitbucket/token".into(),
        reference: "main".into(),
        bucket: "layer-archives".into(),
        root_paths: root_paths.into_iter().map(str::to_string).collect(),
        api_base_url: "https://api.example.test/2.0".into(),
        scratch_dir: scratch.to_path_buf(),
    }
}

/// Source with one good root ("good" containing package "pkg") and one root
/// whose listing always fails.
fn mixed_source() -> MockRepoSource {
    let mut source = MockRepoSource::new();
    source.expect_list_directory().returning(|path| match path {
        "good" => Ok(vec![entry("good/pkg", EntryKind::Directory)]),
        "good/pkg" => Ok(vec![entry("good/pkg/lib.py", EntryKind::File)]),
        "bad" => Err("listing request returned 500".into()),
        other => Err(format!("unexpected listing for {other}").into()),
    });
    source
        .expect_fetch_file()
        .returning(|_, _| Ok(Some(b"print('hi')".to_vec())));
    source
}

type PutRecord = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

fn recording_store(records: PutRecord) -> MockObjectStore {
    let mut store = MockObjectStore::new();
    store.expect_put_object().returning(move |key, body| {
        records.lock().unwrap().push((key.to_string(), body));
        Ok(())
    });
    store
}

type ParamRecord = Arc<Mutex<Vec<(String, String, String)>>>;

fn recording_params(records: ParamRecord) -> MockParameterStore {
    let mut params = MockParameterStore::new();
    params
        .expect_put_string()
        .returning(move |name, value, description| {
            records
                .lock()
                .unwrap()
                .push((name.to_string(), value.to_string(), description.to_string()));
            Ok(())
        });
    params
}

#[tokio::test]
async fn failing_root_path_does_not_abort_the_next_one() {
    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path(), vec!["/bad", "/good"]);
    let source = mixed_source();
    let objects: PutRecord = Arc::new(Mutex::new(Vec::new()));
    let parameters: ParamRecord = Arc::new(Mutex::new(Vec::new()));
    let store = recording_store(objects.clone());
    let params = recording_params(parameters.clone());

    let report = run(&config, &source, &store, &params).await;

    assert_eq!(report.roots.len(), 2);
    assert_eq!(report.roots[0].root_path, "/bad");
    match &report.roots[0].outcome {
        RootOutcome::Failed { error } => assert!(error.contains("500")),
        other => panic!("first root should fail, got {other:?}"),
    }
    match &report.roots[1].outcome {
        RootOutcome::Published {
            package,
            archive_name,
            parameter_name,
            files_downloaded,
            files_skipped,
        } => {
            assert_eq!(package, "pkg");
            assert!(archive_name.starts_with("pkg_") && archive_name.ends_with(".zip"));
            assert_eq!(parameter_name, "/org/layer/package/good/pkg/zipArchive");
            assert_eq!(*files_downloaded, 1);
            assert_eq!(*files_skipped, 0);
        }
        other => panic!("second root should publish, got {other:?}"),
    }

    // Exactly one archive was uploaded, and the parameter records its name.
    let objects = objects.lock().unwrap();
    assert_eq!(objects.len(), 1);
    let parameters = parameters.lock().unwrap();
    assert_eq!(parameters.len(), 1);
    assert_eq!(parameters[0].0, "/org/layer/package/good/pkg/zipArchive");
    assert_eq!(parameters[0].1, objects[0].0);
    assert!(parameters[0].2.contains("layer-archives"));
}

#[tokio::test]
async fn uploaded_archive_contains_the_package_files() {
    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path(), vec!["/good"]);
    let source = mixed_source();
    let objects: PutRecord = Arc::new(Mutex::new(Vec::new()));
    let parameters: ParamRecord = Arc::new(Mutex::new(Vec::new()));
    let store = recording_store(objects.clone());
    let params = recording_params(parameters.clone());

    run(&config, &source, &store, &params).await;

    let objects = objects.lock().unwrap();
    assert_eq!(objects.len(), 1);
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(objects[0].1.clone())).expect("valid zip");
    let mut contents = String::new();
    archive
        .by_name("lib.py")
        .expect("lib.py should be in the archive")
        .read_to_string(&mut contents)
        .unwrap();
    assert_eq!(contents, "print('hi')");
}

#[tokio::test]
async fn scratch_package_directory_is_removed_after_publishing() {
    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path(), vec!["/good"]);
    let source = mixed_source();
    let store = recording_store(Arc::new(Mutex::new(Vec::new())));
    let params = recording_params(Arc::new(Mutex::new(Vec::new())));

    run(&config, &source, &store, &params).await;

    assert!(!scratch.path().join("good/pkg").exists());
    let leftover_zips: Vec<_> = std::fs::read_dir(scratch.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".zip"))
        .collect();
    assert!(leftover_zips.is_empty(), "scratch zip should be removed");
}

#[tokio::test]
async fn scratch_is_cleaned_even_when_the_upload_fails() {
    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path(), vec!["/good"]);
    let source = mixed_source();
    let mut store = MockObjectStore::new();
    store
        .expect_put_object()
        .returning(|_, _| Err("failed to write object to s3: access denied".into()));
    let params = recording_params(Arc::new(Mutex::new(Vec::new())));

    let report = run(&config, &source, &store, &params).await;

    assert!(matches!(
        report.roots[0].outcome,
        RootOutcome::Failed { .. }
    ));
    assert!(!scratch.path().join("good/pkg").exists());
}

#[tokio::test]
async fn reruns_accumulate_archive_objects_in_storage() {
    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path(), vec!["/good"]);
    let objects: PutRecord = Arc::new(Mutex::new(Vec::new()));
    let parameters: ParamRecord = Arc::new(Mutex::new(Vec::new()));
    let store = recording_store(objects.clone());
    let params = recording_params(parameters.clone());

    let source = mixed_source();
    run(&config, &source, &store, &params).await;
    let source = mixed_source();
    run(&config, &source, &store, &params).await;

    // Old archives are never deleted; each run adds a new object and
    // overwrites the same parameter key.
    assert_eq!(objects.lock().unwrap().len(), 2);
    let parameters = parameters.lock().unwrap();
    assert_eq!(parameters.len(), 2);
    assert_eq!(parameters[0].0, parameters[1].0);
}

#[tokio::test]
async fn root_without_matching_prefix_resolves_no_package() {
    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path(), vec!["/empty"]);
    let mut source = MockRepoSource::new();
    source.expect_list_directory().returning(|path| match path {
        "empty" => Ok(vec![entry("empty/readme.txt", EntryKind::File)]),
        other => Err(format!("unexpected listing for {other}").into()),
    });
    source
        .expect_fetch_file()
        .returning(|_, _| Ok(Some(b"hello".to_vec())));
    let store = recording_store(Arc::new(Mutex::new(Vec::new())));
    let params = recording_params(Arc::new(Mutex::new(Vec::new())));

    let report = run(&config, &source, &store, &params).await;

    assert!(matches!(report.roots[0].outcome, RootOutcome::NoPackage));
}

#[tokio::test]
async fn token_failure_aborts_the_whole_run() {
    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path(), vec!["/good"]);
    let store = MockObjectStore::new();
    let mut params = MockParameterStore::new();
    params
        .expect_get_secret()
        .returning(|_| Err("parameter not found".into()));

    let err = layer_publisher::run(&config, &store, &params)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("bearer token"));
}
