use staticconf::{Registry, RegistrySnapshot};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::NamedTempFile;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, id)
}

pub fn unique_namespace(prefix: &str) -> String {
    unique_id(&format!("test-{prefix}"))
}

/// Restores every namespace and all help text of a registry when dropped.
pub struct RegistryGuard {
    registry: Arc<Registry>,
    snapshot: Option<RegistrySnapshot>,
}

impl RegistryGuard {
    pub fn new(registry: &Arc<Registry>) -> Self {
        Self {
            registry: Arc::clone(registry),
            snapshot: Some(registry.snapshot()),
        }
    }

    pub fn global() -> Self {
        Self::new(&Registry::global())
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.registry.restore(snapshot);
        }
    }
}

/// A named temporary file whose extension selects the loader format.
/// Deleted when dropped.
pub struct ConfigFile {
    file: NamedTempFile,
}

impl ConfigFile {
    pub fn new(extension: &str, content: &str) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("staticconf-")
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn yaml(content: &str) -> std::io::Result<Self> {
        Self::new("yaml", content)
    }

    pub fn json(content: &str) -> std::io::Result<Self> {
        Self::new("json", content)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Replace the file content in place.
    pub fn rewrite(&self, content: &str) -> std::io::Result<()> {
        std::fs::write(self.file.path(), content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staticconf::{LoadOptions, Value, loader};

    #[test]
    fn test_unique_namespace_differs() {
        let a = unique_namespace("ns");
        let b = unique_namespace("ns");
        assert_ne!(a, b);
        assert!(a.starts_with("test-ns-"));
    }

    #[test]
    fn test_registry_guard_restores() {
        let registry = Arc::new(Registry::new());
        loader::dict(&registry, Value::map([("kept", 1)]), LoadOptions::new()).unwrap();

        {
            let _guard = RegistryGuard::new(&registry);
            loader::dict(&registry, Value::map([("added", 2)]), LoadOptions::new()).unwrap();
            loader::dict(
                &registry,
                Value::map([("other", 3)]),
                LoadOptions::new().namespace("other"),
            )
            .unwrap();
        }

        let ns = registry.get(staticconf::DEFAULT).unwrap();
        assert!(ns.get("kept").is_some());
        assert!(ns.get("added").is_none());
        assert!(registry.get("other").is_none_or(|ns| ns.values().is_empty()));
    }

    #[test]
    fn test_config_file_rewrite() {
        let file = ConfigFile::yaml("a: 1\n").unwrap();
        assert_eq!(file.path().extension().unwrap(), "yaml");

        file.rewrite("a: 2\n").unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "a: 2\n");
    }
}
