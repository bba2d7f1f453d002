//! In-memory mock filesystem for testing the backend without a real `/proc`.
//!
//! `MockFs` is a cheap handle to shared state: clones see each other's
//! writes. Tests hand one clone to a backend and keep another to mutate
//! `/proc/<pid>/stat` between samples or to make a process disappear.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, Vec<u8>>,
    links: HashMap<PathBuf, PathBuf>,
    devices: HashMap<PathBuf, u64>,
    directories: HashSet<PathBuf>,
    denied: HashSet<PathBuf>,
}

impl MockState {
    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
            || self.directories.contains(path)
            || self.links.contains_key(path)
            || self.devices.contains_key(path)
    }
}

/// In-memory filesystem for testing.
///
/// Besides files and directories it models symlinks, device nodes and
/// permission-denied paths, and counts every access so tests can assert that
/// a code path performed no I/O.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    state: Arc<RwLock<MockState>>,
    reads: Arc<AtomicUsize>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one access and fails if the path was marked as denied.
    fn access(&self, path: &Path) -> io::Result<RwLockReadGuard<'_, MockState>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if state.denied.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", path),
            ));
        }
        Ok(state)
    }

    /// Adds (or replaces) a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut state = self.state_mut();
        state.add_parents(path);
        state
            .files
            .insert(path.to_path_buf(), content.as_ref().to_vec());
    }

    /// Adds an empty directory.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state_mut();
        state.add_parents(path);
        state.directories.insert(path.to_path_buf());
    }

    /// Adds a symbolic link pointing at `target`.
    pub fn add_link(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state_mut();
        state.add_parents(path);
        state
            .links
            .insert(path.to_path_buf(), target.as_ref().to_path_buf());
    }

    /// Adds a device node with the given `st_rdev`.
    pub fn add_device(&self, path: impl AsRef<Path>, rdev: u64) {
        let path = path.as_ref();
        let mut state = self.state_mut();
        state.add_parents(path);
        state.devices.insert(path.to_path_buf(), rdev);
    }

    /// Makes every access to `path` fail with `PermissionDenied`.
    pub fn deny(&self, path: impl AsRef<Path>) {
        self.state_mut().denied.insert(path.as_ref().to_path_buf());
    }

    /// Removes `path` and everything below it, like a process exiting.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state_mut();
        state.files.retain(|p, _| !p.starts_with(path));
        state.links.retain(|p, _| !p.starts_with(path));
        state.devices.retain(|p, _| !p.starts_with(path));
        state.directories.retain(|p| !p.starts_with(path));
    }

    /// Number of filesystem accesses performed so far, across all clones.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Adds a process with its core `/proc/[pid]/` files.
    ///
    /// # Arguments
    /// * `pid` - Process ID
    /// * `stat` - Content of `/proc/[pid]/stat`
    /// * `status` - Content of `/proc/[pid]/status`
    /// * `statm` - Content of `/proc/[pid]/statm`
    /// * `io` - Content of `/proc/[pid]/io` (skipped when empty)
    /// * `cmdline` - Content of `/proc/[pid]/cmdline`
    pub fn add_process(
        &self,
        pid: i32,
        stat: &str,
        status: &str,
        statm: &str,
        io: &str,
        cmdline: &str,
    ) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_dir(base.join("fd"));
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("status"), status);
        self.add_file(base.join("statm"), statm);
        if !io.is_empty() {
            self.add_file(base.join("io"), io);
        }
        self.add_file(base.join("cmdline"), cmdline);
    }
}

fn not_found(what: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found: {:?}", what, path),
    )
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.access(path)?
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found("file", path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.state().contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.access(path)?;
        if !state.directories.contains(path) {
            return Err(not_found("directory", path));
        }

        let is_child = |p: &PathBuf| p.parent().is_some_and(|parent| parent == path);

        let mut entries: HashSet<PathBuf> = HashSet::new();
        entries.extend(state.files.keys().filter(|p| is_child(p)).cloned());
        entries.extend(state.links.keys().filter(|p| is_child(p)).cloned());
        entries.extend(state.devices.keys().filter(|p| is_child(p)).cloned());
        entries.extend(
            state
                .directories
                .iter()
                .filter(|p| is_child(p) && p.as_path() != path)
                .cloned(),
        );

        Ok(entries.into_iter().collect())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        let state = self.access(path)?;
        match state.links.get(path) {
            Some(target) => Ok(target.clone()),
            None if state.contains(path) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {:?}", path),
            )),
            None => Err(not_found("link", path)),
        }
    }

    fn device_id(&self, path: &Path) -> io::Result<u64> {
        self.access(path)?
            .devices
            .get(path)
            .copied()
            .ok_or_else(|| not_found("device", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 16384 kB\n");

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.exists(Path::new("/proc")));

        let content = fs.read_to_string(Path::new("/proc/meminfo")).unwrap();
        assert_eq!(content, "MemTotal: 16384 kB\n");
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let fs = MockFs::new();
        fs.add_file("/proc/1/stat", "stat content");
        fs.add_file("/proc/1/status", "status content");
        fs.add_link("/proc/1/cwd", "/");
        fs.add_file("/proc/2/stat", "stat content 2");

        let proc_entries = fs.read_dir(Path::new("/proc")).unwrap();
        assert_eq!(proc_entries.len(), 2); // /proc/1 and /proc/2

        let proc1_entries = fs.read_dir(Path::new("/proc/1")).unwrap();
        assert_eq!(proc1_entries.len(), 3); // stat, status and cwd
    }

    #[test]
    fn test_mock_fs_add_process() {
        let fs = MockFs::new();
        fs.add_process(
            1234,
            "1234 (bash) S 1233 1234 1234 0 -1 4194304 100 0 0 0 10 5 0 0 20 0 1 0 12345 12345678 100 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "Name:\tbash\nPid:\t1234\nPPid:\t1233\n",
            "100 50 20 10 0 30 0\n",
            "rchar: 1000\nwchar: 500\nsyscr: 100\nsyscw: 50\n",
            "/bin/bash\0--login\0",
        );

        assert!(fs.exists(Path::new("/proc/1234")));
        assert!(fs.exists(Path::new("/proc/1234/stat")));
        assert!(fs.exists(Path::new("/proc/1234/statm")));
        assert!(fs.exists(Path::new("/proc/1234/io")));
        assert!(fs.exists(Path::new("/proc/1234/fd")));
        assert_eq!(
            fs.read(Path::new("/proc/1234/cmdline")).unwrap(),
            b"/bin/bash\0--login\0"
        );
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_fs_denied() {
        let fs = MockFs::new();
        fs.add_file("/proc/1/io", "syscr: 1\n");
        fs.deny("/proc/1/io");

        let err = fs.read_to_string(Path::new("/proc/1/io")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_mock_fs_links_and_devices() {
        let fs = MockFs::new();
        fs.add_link("/proc/1/fd/0", "/dev/null");
        fs.add_device("/dev/pts/0", 34816);

        assert_eq!(
            fs.read_link(Path::new("/proc/1/fd/0")).unwrap(),
            PathBuf::from("/dev/null")
        );
        assert_eq!(fs.device_id(Path::new("/dev/pts/0")).unwrap(), 34816);
        assert!(fs.read_link(Path::new("/dev/pts/0")).is_err());
    }

    #[test]
    fn test_mock_fs_clones_share_state() {
        let fs = MockFs::new();
        let other = fs.clone();
        other.add_file("/proc/1/stat", "a");
        fs.add_file("/proc/1/stat", "b");

        assert_eq!(other.read_to_string(Path::new("/proc/1/stat")).unwrap(), "b");
        assert_eq!(fs.read_count(), 1);

        fs.remove("/proc/1");
        assert!(!other.exists(Path::new("/proc/1/stat")));
        assert!(!other.exists(Path::new("/proc/1")));
        assert!(other.exists(Path::new("/proc")));
    }
}
