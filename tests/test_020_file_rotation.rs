
use smartinspect::SmartInspect;

#[test]
fn size_cap_splits_across_multiple_files() {
    test_utils::init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cap.sil");

    let si = SmartInspect::new("test_020");
    si.set_connections(&format!(
        "file(filename=\"{}\",maxsize=256,maxparts=0)",
        path.to_str().unwrap()
    ))
    .unwrap();

    for i in 0..50 {
        si.submit(smartinspect::LogEntry::new(0, format!("entry number {i}")).into());
    }
    si.clear_connections();

    let stem = path.file_stem().unwrap().to_string_lossy().to_string();
    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(&format!("{stem}-")))
        .collect();

    assert!(files.len() > 1, "expected multiple rotated parts, got {}", files.len());
    for entry in &files {
        let len = entry.metadata().unwrap().len();
        assert!(len <= 256, "file {:?} exceeded maxsize: {len} bytes", entry.path());
    }
}

#[test]
fn maxparts_retention_deletes_oldest_parts_through_the_public_api() {
    test_utils::init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parts.sil");

    let si = SmartInspect::new("test_020");
    si.set_connections(&format!(
        "file(filename=\"{}\",maxsize=64,maxparts=2)",
        path.to_str().unwrap()
    ))
    .unwrap();

    for i in 0..200 {
        si.submit(smartinspect::LogEntry::new(0, format!("e{i}")).into());
    }
    si.clear_connections();

    let stem = path.file_stem().unwrap().to_string_lossy().to_string();
    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(&format!("{stem}-")))
        .collect();

    assert_eq!(files.len(), 2, "expected retention to cap at maxparts=2");
}
