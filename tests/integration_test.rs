use fileglue::{merge, split, GlueError, RECORD_SIZE};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir).unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_example_merge_and_split() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"foo");
    let b = write_file(tmp.path(), "b.log", b"barz");
    let container = tmp.path().join("out.bin");

    merge(&[a, b], &container).unwrap();
    assert_eq!(fs::metadata(&container).unwrap().len(), 3 + 4 + 264 + 264 + 8);
    assert_eq!(fs::metadata(&container).unwrap().len(), 543);

    let out = tmp.path().join("d");
    split(&container, &out).unwrap();
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"foo");
    assert_eq!(fs::read(out.join("b.log")).unwrap(), b"barz");
    assert_eq!(sorted_names(&out), vec!["a.txt", "b.log"]);
}

#[test]
fn test_roundtrip_preserves_order_and_content() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    fs::create_dir(&src).unwrap();

    let big: Vec<u8> = (0u8..=255).cycle().take(300 * 1024).collect();
    let files: Vec<(&str, Vec<u8>)> = vec![
        ("zeta.bin",      big.clone()),
        ("alpha.txt",     b"Alpha file contents".to_vec()),
        ("no_extension",  b"plain".to_vec()),
        ("archive.tar.gz", vec![0x1f, 0x8b, 0x08, 0x00]),
        ("empty.dat",     Vec::new()),
    ];
    let paths: Vec<PathBuf> = files.iter()
        .map(|(name, data)| write_file(&src, name, data))
        .collect();

    let container = tmp.path().join("bundle.glue");
    merge(&paths, &container).unwrap();

    let payload: u64 = files.iter().map(|(_, d)| d.len() as u64).sum();
    let expected = payload + files.len() as u64 * RECORD_SIZE as u64 + 8;
    assert_eq!(fs::metadata(&container).unwrap().len(), expected);

    // Payloads appear in input order at the front of the container.
    let raw = fs::read(&container).unwrap();
    assert_eq!(&raw[..big.len()], &big[..]);

    let entries = fileglue::list(&container).unwrap();
    let listed: Vec<String> = entries.iter().map(|e| e.display_name().into_owned()).collect();
    assert_eq!(listed, files.iter().map(|(n, _)| n.to_string()).collect::<Vec<_>>());

    let out = tmp.path().join("out");
    split(&container, &out).unwrap();
    for (name, data) in &files {
        assert_eq!(&fs::read(out.join(name)).unwrap(), data, "{name}");
    }
}

#[test]
fn test_split_twice_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"first");
    let b = write_file(tmp.path(), "b.md", b"# second");
    let container = tmp.path().join("c.bin");
    merge(&[a, b], &container).unwrap();

    let out = tmp.path().join("fresh/target");
    split(&container, &out).unwrap();
    let first: Vec<Vec<u8>> = sorted_names(&out).iter().map(|n| fs::read(out.join(n)).unwrap()).collect();
    split(&container, &out).unwrap();
    let second: Vec<Vec<u8>> = sorted_names(&out).iter().map(|n| fs::read(out.join(n)).unwrap()).collect();

    assert_eq!(first, second);
    assert_eq!(sorted_names(&out), vec!["a.txt", "b.md"]);
}

#[test]
fn test_long_name_is_truncated() {
    let tmp = TempDir::new().unwrap();
    // 250 + ".txt" stays under the usual 255-byte file name limit.
    let long = "n".repeat(250);
    let a = write_file(tmp.path(), &format!("{long}.txt"), b"long");
    let b = write_file(tmp.path(), "short.txt", b"short");
    let container = tmp.path().join("c.bin");
    merge(&[a, b], &container).unwrap();

    let out = tmp.path().join("out");
    split(&container, &out).unwrap();
    let truncated = format!("{}.txt", &long[..247]);
    assert_eq!(fs::read(out.join(&truncated)).unwrap(), b"long");
    assert_eq!(sorted_names(&out), vec![truncated, "short.txt".to_string()]);
}

#[test]
fn test_duplicate_sources_are_packed_twice() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "same.txt", b"twice");
    let container = tmp.path().join("c.bin");
    merge(&[&a, &a], &container).unwrap();

    assert_eq!(fs::metadata(&container).unwrap().len(), 5 * 2 + 264 * 2 + 8);
    let entries = fileglue::list(&container).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!((entries[1].offset, entries[1].size), (5, 5));
}

#[test]
fn test_merge_creates_missing_parent() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"foo");
    let container = tmp.path().join("deep/er/out.bin");
    merge(&[a], &container).unwrap();
    assert!(container.is_file());
    // Only the container itself, no staging leftovers.
    assert_eq!(sorted_names(container.parent().unwrap()), vec!["out.bin"]);
}

#[test]
fn test_merge_replaces_existing_target() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"foo");
    let container = write_file(tmp.path(), "out.bin", &[0xFF; 4096]);
    merge(&[a], &container).unwrap();
    assert_eq!(fs::metadata(&container).unwrap().len(), 3 + 264 + 8);
}

#[test]
fn test_directory_source_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"foo");
    let sub = tmp.path().join("subdir");
    fs::create_dir(&sub).unwrap();
    let container = tmp.path().join("out.bin");

    let err = merge(&[a, sub], &container).unwrap_err();
    assert!(matches!(err, GlueError::InvalidArgument(_)), "{err}");
    assert!(!container.exists());
}

#[test]
fn test_truncated_container_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"foo");
    let b = write_file(tmp.path(), "b.log", b"barz");
    let container = tmp.path().join("out.bin");
    merge(&[a, b], &container).unwrap();
    let full = fs::read(&container).unwrap();

    // Shorter than the count field, and shorter than count * 264 + 8.
    for len in [0usize, 5, 7, 2 * 264 + 7, 300] {
        let cut = tmp.path().join(format!("cut_{len}.bin"));
        fs::write(&cut, &full[..len]).unwrap();
        let out = tmp.path().join(format!("out_{len}"));
        let err = split(&cut, &out).unwrap_err();
        assert!(matches!(err, GlueError::InvalidContainer(_)), "len {len}: {err}");
        assert!(!out.exists(), "len {len} created output");
    }
}

#[test]
fn test_record_section_cut_from_the_front() {
    // Keep the tail intact but drop payload bytes: the records then claim
    // more payload than precedes them.
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"foo");
    let container = tmp.path().join("out.bin");
    merge(&[a], &container).unwrap();
    let full = fs::read(&container).unwrap();

    let cut = tmp.path().join("cut.bin");
    fs::write(&cut, &full[2..]).unwrap();
    let out = tmp.path().join("out");
    assert!(matches!(split(&cut, &out), Err(GlueError::InvalidContainer(_))));
    assert!(!out.exists());
}

#[test]
fn test_zero_count_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("zero.bin");
    let mut f = fs::File::create(&path).unwrap();
    f.write_all(b"some payload bytes").unwrap();
    f.write_all(&0u64.to_be_bytes()).unwrap();
    drop(f);

    let out = tmp.path().join("out");
    assert!(matches!(split(&path, &out), Err(GlueError::InvalidContainer(_))));
    assert!(!out.exists());
}

#[test]
fn test_unwritable_target_dir() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"foo");
    let container = tmp.path().join("out.bin");
    merge(&[a], &container).unwrap();

    // A regular file where the target directory should be.
    let blocker = write_file(tmp.path(), "blocker", b"");
    let err = split(&container, &blocker).unwrap_err();
    assert!(matches!(err, GlueError::DestinationWrite { .. }), "{err}");
}
