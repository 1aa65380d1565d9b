use baler::pack::{create_tar, CreateOptions, CreateOutcome};
use baler::transform::CompressionFormat;
use baler::unpack::{extract_tar, ExtractOptions};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn build_tree(dir: &Path) {
    fs::write(dir.join("a.txt"), b"alpha contents").unwrap();
    fs::write(dir.join("empty.bin"), b"").unwrap();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("nested/b.dat"), &[0u8, 1, 2, 3, 250]).unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink("a.txt", dir.join("link")).unwrap();
}

fn mtime_secs(path: &Path) -> u64 {
    fs::symlink_metadata(path)
        .unwrap()
        .modified()
        .unwrap()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[cfg(unix)]
fn mode_bits(path: &Path) -> u32 {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).unwrap().mode() & 0o7777
}

fn create_into(src: &Path, archive: &Path, format: Option<CompressionFormat>) -> CreateOutcome {
    let mut options = CreateOptions::new(src);
    options.output = Some(archive.to_path_buf());
    create_tar(&options, format).unwrap()
}

fn extract_into(archive: &Path, out: &Path, format: Option<CompressionFormat>) {
    let mut options = ExtractOptions::new(out);
    options.input = Some(archive.to_path_buf());
    extract_tar(&options, format).unwrap();
}

#[test]
fn tar_roundtrip_restores_contents_times_and_modes() {
    let src = tempdir().unwrap();
    build_tree(src.path());
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(src.path().join("a.txt"), fs::Permissions::from_mode(0o640)).unwrap();
    }

    let arch = tempdir().unwrap();
    let archive = arch.path().join("tree.tar");
    let outcome = create_into(src.path(), &archive, None);
    assert!(matches!(outcome, CreateOutcome::Archived { .. }));

    let out = tempdir().unwrap();
    extract_into(&archive, out.path(), None);

    for name in ["a.txt", "empty.bin", "nested/b.dat"] {
        assert_eq!(
            fs::read(out.path().join(name)).unwrap(),
            fs::read(src.path().join(name)).unwrap(),
            "contents differ for {name}"
        );
        assert_eq!(
            mtime_secs(&out.path().join(name)),
            mtime_secs(&src.path().join(name)),
            "mtime differs for {name}"
        );
    }
    assert!(out.path().join("nested").is_dir());

    #[cfg(unix)]
    {
        assert_eq!(mode_bits(&out.path().join("a.txt")), 0o640);
        let link = out.path().join("link");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("a.txt"));
    }
}

#[test]
fn tar_roundtrip_through_each_compression_transform() {
    for format in [
        Some(CompressionFormat::Gzip),
        Some(CompressionFormat::Bzip2),
        Some(CompressionFormat::Xz),
        Some(CompressionFormat::Zstd),
    ] {
        let src = tempdir().unwrap();
        fs::write(src.path().join("data.txt"), b"payload ".repeat(64)).unwrap();

        let arch = tempdir().unwrap();
        let archive = arch.path().join("tree.tar.c");
        create_into(src.path(), &archive, format);

        let out = tempdir().unwrap();
        extract_into(&archive, out.path(), format);
        assert_eq!(
            fs::read(out.path().join("data.txt")).unwrap(),
            fs::read(src.path().join("data.txt")).unwrap(),
            "format {format:?}"
        );
    }
}

#[test]
fn rename_applies_when_creating() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("abc.txt"), b"x").unwrap();

    let arch = tempdir().unwrap();
    let archive = arch.path().join("r.tar");
    let mut options = CreateOptions::new(src.path());
    options.output = Some(archive.clone());
    options.rename = baler::rename::Rename::new(Some(r"\.txt$"), Some(".md")).unwrap();
    create_tar(&options, None).unwrap();

    let out = tempdir().unwrap();
    extract_into(&archive, out.path(), None);
    assert!(out.path().join("abc.md").exists());
    assert!(!out.path().join("abc.txt").exists());
}

#[test]
fn rename_applies_when_extracting() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("abc.txt"), b"x").unwrap();

    let arch = tempdir().unwrap();
    let archive = arch.path().join("r.tar");
    create_into(src.path(), &archive, None);

    let out = tempdir().unwrap();
    let mut options = ExtractOptions::new(out.path());
    options.input = Some(archive);
    options.rename = baler::rename::Rename::new(Some(r"\.txt$"), Some(".md")).unwrap();
    extract_tar(&options, None).unwrap();
    assert!(out.path().join("abc.md").exists());
}

#[test]
fn extract_filter_skips_excluded_entries() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("keep.txt"), b"k").unwrap();
    fs::write(src.path().join("drop.tmp"), b"d").unwrap();

    let arch = tempdir().unwrap();
    let archive = arch.path().join("f.tar");
    create_into(src.path(), &archive, None);

    let out = tempdir().unwrap();
    let mut options = ExtractOptions::new(out.path());
    options.input = Some(archive);
    options.excludes = vec!["*.tmp".to_string()];
    extract_tar(&options, None).unwrap();
    assert!(out.path().join("keep.txt").exists());
    assert!(!out.path().join("drop.tmp").exists());
}

#[cfg(unix)]
#[test]
fn permission_rules_assign_modes_to_matching_entries() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("run.sh"), b"#!/bin/sh\n").unwrap();
    fs::write(src.path().join("data.txt"), b"d").unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(src.path().join("data.txt"), fs::Permissions::from_mode(0o600))
            .unwrap();
    }

    let arch = tempdir().unwrap();
    let archive = arch.path().join("p.tar");
    let mut options = CreateOptions::new(src.path());
    options.output = Some(archive.clone());
    options.permissions =
        baler::rules::PermissionMap::load(&[r".*\.sh$=0755".to_string()], None).unwrap();
    create_tar(&options, None).unwrap();

    let out = tempdir().unwrap();
    extract_into(&archive, out.path(), None);
    assert_eq!(mode_bits(&out.path().join("run.sh")), 0o755);
    // Unmatched entries keep their real bits.
    assert_eq!(mode_bits(&out.path().join("data.txt")), 0o600);
}

#[test]
fn zero_matches_is_a_distinct_outcome_and_writes_nothing() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"x").unwrap();

    let arch = tempdir().unwrap();
    let archive = arch.path().join("none.tar");
    let mut options = CreateOptions::new(src.path());
    options.output = Some(archive.clone());
    options.includes = vec!["*.rs".to_string()];
    let outcome = create_tar(&options, None).unwrap();
    assert_eq!(outcome, CreateOutcome::NoMatches);
    assert!(!archive.exists());
}
