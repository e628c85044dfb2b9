//! # Change Detection
//!
//! Comparators decide whether a watched file changed since the last check.
//! Each comparator owns the last signature it observed for one file and
//! updates it on every check.
//!
//! The default set is modification time plus content hash. Inode comparison
//! and filesystem notifications are opt-in.

use errors::{ConfigurationError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use tracing::debug;

pub trait Comparator: Send {
    fn path(&self) -> &Path;

    /// Compare the file against the last observation and record the new one.
    fn has_changed(&mut self) -> Result<bool>;
}

/// Builds one comparator per watched path.
pub type ComparatorFactory = Arc<dyn Fn(&Path) -> Result<Box<dyn Comparator>> + Send + Sync>;

fn observe<T>(path: &Path, what: &str, read: impl FnOnce(&Path) -> std::io::Result<T>) -> Option<T> {
    match read(path) {
        Ok(signature) => Some(signature),
        Err(e) => {
            debug!(path = ?path, error = %e, "Failed to read {}", what);
            None
        }
    }
}

/// Compares modification timestamps. A file that appears or disappears
/// counts as changed.
#[derive(Debug)]
pub struct MTimeComparator {
    path: PathBuf,
    last: Option<SystemTime>,
}

impl MTimeComparator {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let last = Self::mtime(&path);
        Self { path, last }
    }

    fn mtime(path: &Path) -> Option<SystemTime> {
        observe(path, "mtime", |p| std::fs::metadata(p)?.modified())
    }

    pub fn factory() -> ComparatorFactory {
        Arc::new(|path: &Path| Ok(Box::new(Self::new(path)) as Box<dyn Comparator>))
    }
}

impl Comparator for MTimeComparator {
    fn path(&self) -> &Path {
        &self.path
    }

    fn has_changed(&mut self) -> Result<bool> {
        let current = Self::mtime(&self.path);
        let changed = current != self.last;
        self.last = current;
        Ok(changed)
    }
}

/// Compares a SHA-256 digest of the file content.
#[derive(Debug)]
pub struct HashComparator {
    path: PathBuf,
    last: Option<String>,
}

impl HashComparator {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let last = Self::digest(&path);
        Self { path, last }
    }

    fn digest(path: &Path) -> Option<String> {
        observe(path, "content hash", utils::compute_file_hash)
    }

    pub fn factory() -> ComparatorFactory {
        Arc::new(|path: &Path| Ok(Box::new(Self::new(path)) as Box<dyn Comparator>))
    }
}

impl Comparator for HashComparator {
    fn path(&self) -> &Path {
        &self.path
    }

    fn has_changed(&mut self) -> Result<bool> {
        let current = Self::digest(&self.path);
        let changed = current != self.last;
        self.last = current;
        Ok(changed)
    }
}

/// Compares device and inode numbers, which catches a file replaced by
/// another one with the same timestamp and content.
#[derive(Debug)]
pub struct InodeComparator {
    path: PathBuf,
    last: Option<(u64, u64)>,
}

impl InodeComparator {
    #[cfg(unix)]
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let last = Self::identity(&path);
        Ok(Self { path, last })
    }

    #[cfg(not(unix))]
    pub fn new(_path: impl AsRef<Path>) -> Result<Self> {
        Err(ConfigurationError::Unsupported {
            capability: "inode comparison".to_string(),
        }
        .into())
    }

    #[cfg(unix)]
    fn identity(path: &Path) -> Option<(u64, u64)> {
        use std::os::unix::fs::MetadataExt;
        observe(path, "inode", |p| {
            let meta = std::fs::metadata(p)?;
            Ok((meta.dev(), meta.ino()))
        })
    }

    #[cfg(not(unix))]
    fn identity(_path: &Path) -> Option<(u64, u64)> {
        None
    }

    pub fn factory() -> ComparatorFactory {
        Arc::new(|path: &Path| Ok(Box::new(Self::new(path)?) as Box<dyn Comparator>))
    }
}

impl Comparator for InodeComparator {
    fn path(&self) -> &Path {
        &self.path
    }

    fn has_changed(&mut self) -> Result<bool> {
        let current = Self::identity(&self.path);
        let changed = current != self.last;
        self.last = current;
        Ok(changed)
    }
}

/// Records filesystem events for a file into a flag that the next check
/// consumes. Events arrive on the notifier's thread; nothing is reloaded
/// there.
pub struct NotifyComparator {
    path: PathBuf,
    dirty: Arc<AtomicBool>,
    _watcher: notify::RecommendedWatcher,
}

impl std::fmt::Debug for NotifyComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyComparator")
            .field("path", &self.path)
            .field("dirty", &self.dirty.load(Ordering::Relaxed))
            .finish()
    }
}

impl NotifyComparator {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        use notify::{EventKind, RecursiveMode, Watcher};

        let path = path.as_ref().to_path_buf();
        let watch_error = |e: notify::Error| ConfigurationError::Watch {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let dirty = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dirty);
        let file_name = path.file_name().map(std::ffi::OsStr::to_os_string);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) && event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref());
                    if relevant {
                        flag.store(true, Ordering::Release);
                    }
                }
                Err(e) => debug!(error = %e, "File watch error"),
            }
        })
        .map_err(watch_error)?;

        // Watch the directory so replacing the file is still seen.
        let target = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher
            .watch(&target, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        Ok(Self {
            path,
            dirty,
            _watcher: watcher,
        })
    }

    pub fn factory() -> ComparatorFactory {
        Arc::new(|path: &Path| Ok(Box::new(Self::new(path)?) as Box<dyn Comparator>))
    }
}

impl Comparator for NotifyComparator {
    fn path(&self) -> &Path {
        &self.path
    }

    fn has_changed(&mut self) -> Result<bool> {
        Ok(self.dirty.swap(false, Ordering::AcqRel))
    }
}

/// A comparator driven by a closure. Each path gets its own clone of `check`.
pub struct FnComparator<F> {
    path: PathBuf,
    check: F,
}

impl<F> Comparator for FnComparator<F>
where
    F: FnMut(&Path) -> Result<bool> + Send,
{
    fn path(&self) -> &Path {
        &self.path
    }

    fn has_changed(&mut self) -> Result<bool> {
        (self.check)(&self.path)
    }
}

pub fn custom_comparator<F>(check: F) -> ComparatorFactory
where
    F: FnMut(&Path) -> Result<bool> + Clone + Send + Sync + 'static,
{
    Arc::new(move |path: &Path| {
        Ok(Box::new(FnComparator {
            path: path.to_path_buf(),
            check: check.clone(),
        }) as Box<dyn Comparator>)
    })
}

/// Modification time and content hash.
pub fn default_comparators() -> Vec<ComparatorFactory> {
    vec![MTimeComparator::factory(), HashComparator::factory()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write(path: &Path, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    fn set_mtime(path: &Path, secs_from_epoch: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_from_epoch))
            .unwrap();
    }

    #[test]
    fn test_mtime_comparator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.yaml");
        write(&path, "a: 1");
        set_mtime(&path, 1_000);

        let mut comparator = MTimeComparator::new(&path);
        assert!(!comparator.has_changed().unwrap());

        set_mtime(&path, 2_000);
        assert!(comparator.has_changed().unwrap());
        assert!(!comparator.has_changed().unwrap());
    }

    #[test]
    fn test_hash_comparator_ignores_touch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.yaml");
        write(&path, "a: 1");

        let mut comparator = HashComparator::new(&path);
        set_mtime(&path, 5_000);
        assert!(!comparator.has_changed().unwrap());

        write(&path, "a: 2");
        assert!(comparator.has_changed().unwrap());
        assert!(!comparator.has_changed().unwrap());
    }

    #[test]
    fn test_missing_file_appearing_is_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.yaml");

        let mut comparator = HashComparator::new(&path);
        assert!(!comparator.has_changed().unwrap());
        write(&path, "a: 1");
        assert!(comparator.has_changed().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_inode_comparator_detects_replacement() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.yaml");
        let other = dir.path().join("c.yaml.new");
        write(&path, "a: 1");

        let mut comparator = InodeComparator::new(&path).unwrap();
        assert!(!comparator.has_changed().unwrap());

        write(&other, "a: 1");
        std::fs::rename(&other, &path).unwrap();
        assert!(comparator.has_changed().unwrap());
    }

    fn wait_for_change(comparator: &mut NotifyComparator) -> bool {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            if comparator.has_changed().unwrap() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn test_notify_comparator_flags_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.yaml");
        write(&path, "a: 1");

        let mut comparator = NotifyComparator::new(&path).unwrap();
        assert!(!comparator.has_changed().unwrap());

        write(&dir.path().join("other.yaml"), "b: 1");
        std::thread::sleep(Duration::from_millis(200));
        assert!(!comparator.has_changed().unwrap());

        write(&path, "a: 2");
        assert!(wait_for_change(&mut comparator));

        // A single write may surface as several events; let them settle.
        std::thread::sleep(Duration::from_millis(200));
        comparator.has_changed().unwrap();
        assert!(!comparator.has_changed().unwrap());

        write(&path, "a: 3");
        assert!(wait_for_change(&mut comparator));
    }

    #[test]
    fn test_notify_comparator_missing_directory_is_a_watch_error() {
        let err = NotifyComparator::new("/nonexistent/dir/c.yaml").unwrap_err();
        assert!(matches!(
            err,
            errors::StaticConfError::Configuration(ConfigurationError::Watch { .. })
        ));
    }

    #[test]
    fn test_custom_comparator_factory() {
        let factory = custom_comparator(|_path: &Path| Ok(true));
        let mut comparator = factory(Path::new("anything")).unwrap();
        assert_eq!(comparator.path(), Path::new("anything"));
        assert!(comparator.has_changed().unwrap());
    }
}
