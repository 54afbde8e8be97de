//! Capability-based filesystem helpers built on `cap-std` and `camino`.
//!
//! The response cache stores one file per entry inside a single directory.
//! These helpers open that directory once and perform every later read and
//! write relative to it, with writes staged in a temporary sibling and
//! renamed into place.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::{Dir, OpenOptions};
use cap_std::ambient_authority;
use std::io::{self, Write};
use std::path::Component;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

const TEMP_SUFFIX: &str = ".partial";
const MAX_TEMP_ATTEMPTS: u32 = 16;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Create `path` (and any missing parents) and open it as a capability.
pub fn open_or_create_dir(path: &Utf8Path) -> io::Result<Dir> {
    let (base, relative) = split_ambient_base(path)?;
    if relative.as_str().is_empty() {
        return Ok(base);
    }
    base.create_dir_all(&relative)?;
    base.open_dir(&relative)
}

/// Read `name` from `dir`, reporting a missing file as `None`.
pub fn read_if_present(dir: &Dir, name: &str) -> io::Result<Option<Vec<u8>>> {
    match dir.read(name) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Return whether `name` exists in `dir` as a regular file.
pub fn is_file(dir: &Dir, name: &str) -> io::Result<bool> {
    match dir.metadata(name) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Write `bytes` to `name` so readers observe either the old or the new
/// contents, never a prefix.
///
/// The data lands in a uniquely named temporary file in the same directory,
/// is synced to disk, then renamed over `name`. Concurrent writers of the
/// same name each use their own temporary file; the last rename wins.
pub fn write_atomic(dir: &Dir, name: &str, bytes: &[u8]) -> io::Result<()> {
    let (temp_name, mut file) = create_temp(dir, name)?;
    let staged = file.write_all(bytes).and_then(|()| file.sync_all());
    drop(file);
    let outcome = staged.and_then(|()| dir.rename(&temp_name, dir, name));
    if outcome.is_err() {
        // The temporary file is garbage either way; report the original failure.
        let _cleanup = dir.remove_file(&temp_name);
    }
    outcome
}

fn create_temp(dir: &Dir, name: &str) -> io::Result<(String, cap_std::fs_utf8::File)> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let mut last_error = None;
    for _ in 0..MAX_TEMP_ATTEMPTS {
        let sequence = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_name = format!(".{name}.{}.{sequence}{TEMP_SUFFIX}", process::id());
        match dir.open_with(&temp_name, &options) {
            Ok(file) => return Ok((temp_name, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => last_error = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_error.unwrap_or_else(|| io::Error::other("no temporary file name available")))
}

/// Split a path into an ambient directory capability and the remainder
/// relative to it.
///
/// Absolute paths are anchored at the filesystem root (or the drive prefix on
/// Windows); relative paths at the current directory.
pub fn split_ambient_base(path: &Utf8Path) -> io::Result<(Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();
    let mut components = std_path.components();
    let base = match components.next() {
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            // Consume the root that follows a drive prefix.
            if matches!(components.clone().next(), Some(Component::RootDir)) {
                components.next();
            }
            Utf8PathBuf::from(format!("{prefix}{}", std::path::MAIN_SEPARATOR))
        }
        Some(Component::RootDir) => Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string()),
        _ => {
            components = std_path.components();
            Utf8PathBuf::from(".")
        }
    };
    let relative = Utf8PathBuf::from_path_buf(components.as_path().to_path_buf())
        .map_err(|_| io::Error::other("non-UTF-8 path"))?;
    let dir = Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn workspace() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .expect("temp dir should be UTF-8");
        (temp, root)
    }

    #[rstest]
    fn creates_nested_directories(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let target = root.join("a/b/cache");
        let dir = open_or_create_dir(&target).expect("create cache dir");
        write_atomic(&dir, "entry", b"x").expect("write entry");
        assert!(target.join("entry").as_std_path().is_file());
    }

    #[rstest]
    fn atomic_write_replaces_and_leaves_no_temporaries(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let dir = open_or_create_dir(&root).expect("open dir");
        write_atomic(&dir, "entry", b"first").expect("first write");
        write_atomic(&dir, "entry", b"second").expect("second write");
        let contents = read_if_present(&dir, "entry").expect("read entry");
        assert_eq!(contents.as_deref(), Some(&b"second"[..]));
        let names: Vec<String> = dir
            .entries()
            .expect("list dir")
            .map(|entry| entry.and_then(|e| e.file_name()).expect("entry name"))
            .collect();
        assert_eq!(names, ["entry"]);
    }

    #[rstest]
    fn missing_files_read_as_none(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let dir = open_or_create_dir(&root).expect("open dir");
        assert_eq!(read_if_present(&dir, "absent").expect("read"), None);
        assert!(!is_file(&dir, "absent").expect("metadata"));
    }

    #[rstest]
    fn splits_relative_paths_from_current_directory() {
        let (_dir, relative) =
            split_ambient_base(Utf8Path::new("cache/entries")).expect("split relative");
        assert_eq!(relative, Utf8PathBuf::from("cache/entries"));
    }

    #[cfg(unix)]
    #[rstest]
    fn splits_absolute_paths_from_root() {
        let (_dir, relative) =
            split_ambient_base(Utf8Path::new("/tmp/cache")).expect("split absolute");
        assert_eq!(relative, Utf8PathBuf::from("tmp/cache"));
    }
}
