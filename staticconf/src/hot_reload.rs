//! # Configuration Hot Reload
//!
//! Polling-based reload of configuration files. Nothing runs in the
//! background: the application calls
//! [`ConfigurationWatcher::reload_if_changed`] on its own schedule, and the
//! check, the reload and the callbacks all complete before it returns.
//!
//! ## State Machine
//! `Idle` → `Checking` → (`Reloading` → `Idle`) | `Idle`
//!
//! - Checks closer together than `min_interval` are skipped unless forced
//! - The last-check time is updated before the loader runs, so a failing
//!   loader is not retried in a hot loop
//! - A loader failure propagates and skips the callbacks; the namespace
//!   keeps its last successful content

use crate::callback::ReloadCallbackChain;
use crate::clock::{Clock, SystemClock};
use crate::comparator::{Comparator, ComparatorFactory, default_comparators};
use crate::container::ConfigValues;
use crate::file_loader::FileSource;
use crate::loader::{ConfigSource, LoadMode, LoadOptions};
use crate::registry::Registry;
use errors::{ConfigurationError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub type ConfigLoader = Box<dyn FnMut() -> Result<ConfigValues> + Send>;

/// Wrap a source and load options as a watcher loader.
pub fn build_loader<S>(registry: Arc<Registry>, source: S, options: LoadOptions) -> ConfigLoader
where
    S: ConfigSource + 'static,
{
    Box::new(move || registry.load(&source, &options))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Checking,
    Reloading,
}

pub struct ConfigurationWatcherBuilder {
    loader: ConfigLoader,
    paths: Vec<PathBuf>,
    min_interval: Duration,
    comparators: Vec<ComparatorFactory>,
    clock: Arc<dyn Clock>,
    reloader: Option<ReloadCallbackChain>,
}

impl ConfigurationWatcherBuilder {
    #[must_use]
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Replace the default modification-time and content-hash comparators.
    #[must_use]
    pub fn comparators(mut self, comparators: Vec<ComparatorFactory>) -> Self {
        self.comparators = comparators;
        self
    }

    #[must_use]
    pub fn add_comparator(mut self, comparator: ComparatorFactory) -> Self {
        self.comparators.push(comparator);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Callbacks run after each reload. Defaults to a chain over every
    /// namespace of the global registry.
    #[must_use]
    pub fn reloader(mut self, chain: ReloadCallbackChain) -> Self {
        self.reloader = Some(chain);
        self
    }

    /// Run no callbacks after a reload.
    #[must_use]
    pub fn without_reloader(mut self) -> Self {
        self.reloader = None;
        self
    }

    /// Resolve the paths and take the initial observation of every file.
    pub fn build(self) -> Result<ConfigurationWatcher> {
        let paths = utils::absolute_sorted_paths(&self.paths).map_err(|e| ConfigurationError::Io {
            source_name: "current directory".to_string(),
            reason: e.to_string(),
        })?;

        let mut comparators = Vec::with_capacity(paths.len() * self.comparators.len());
        for path in &paths {
            for factory in &self.comparators {
                comparators.push(factory(path.as_path())?);
            }
        }

        let last_check = self.clock.now();
        Ok(ConfigurationWatcher {
            loader: self.loader,
            paths,
            min_interval: self.min_interval,
            comparators,
            clock: self.clock,
            last_check,
            reloader: self.reloader,
            state: WatcherState::Idle,
        })
    }
}

/// Watches a set of files and reloads one logical configuration when any
/// of them changes.
pub struct ConfigurationWatcher {
    loader: ConfigLoader,
    paths: Vec<PathBuf>,
    min_interval: Duration,
    comparators: Vec<Box<dyn Comparator>>,
    clock: Arc<dyn Clock>,
    last_check: Instant,
    reloader: Option<ReloadCallbackChain>,
    state: WatcherState,
}

impl std::fmt::Debug for ConfigurationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationWatcher")
            .field("paths", &self.paths)
            .field("min_interval", &self.min_interval)
            .field("comparators", &self.comparators.len())
            .field("state", &self.state)
            .finish()
    }
}

impl ConfigurationWatcher {
    /// Start building a watcher that runs `loader` when any of `paths`
    /// changes.
    ///
    /// # M-CANONICAL-DOCS
    ///
    /// ## Usage
    /// ```rust,no_run
    /// use staticconf::hot_reload::{build_loader, ConfigurationWatcher};
    /// use staticconf::{FileSource, LoadOptions, Registry};
    /// use std::time::Duration;
    ///
    /// fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let registry = Registry::global();
    ///     let loader = build_loader(registry, FileSource::yaml("config.yaml"), LoadOptions::new());
    ///     let mut watcher = ConfigurationWatcher::builder(loader, ["config.yaml"])
    ///         .min_interval(Duration::from_secs(10))
    ///         .build()?;
    ///
    ///     loop {
    ///         watcher.reload_if_changed(false)?;
    ///         // ... do work ...
    ///     }
    /// }
    /// ```
    pub fn builder<I, P>(loader: ConfigLoader, paths: I) -> ConfigurationWatcherBuilder
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        ConfigurationWatcherBuilder {
            loader,
            paths: paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            min_interval: Duration::ZERO,
            comparators: default_comparators(),
            clock: Arc::new(SystemClock),
            reloader: Some(ReloadCallbackChain::global()),
        }
    }

    /// Watched paths, absolute and sorted.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn reloader(&self) -> Option<&ReloadCallbackChain> {
        self.reloader.as_ref()
    }

    pub fn reloader_mut(&mut self) -> Option<&mut ReloadCallbackChain> {
        self.reloader.as_mut()
    }

    fn should_check(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_check) >= self.min_interval
    }

    /// Run every comparator. All of them run even after one reports a
    /// change, so each records the current signature.
    fn files_modified(&mut self) -> Result<bool> {
        let mut modified = false;
        for comparator in &mut self.comparators {
            if comparator.has_changed()? {
                debug!(path = ?comparator.path(), "Configuration file changed");
                modified = true;
            }
        }
        Ok(modified)
    }

    /// Reload when a watched file changed.
    ///
    /// Returns the loaded values when a reload happened, `None` when the
    /// check was throttled or found no change.
    pub fn reload_if_changed(&mut self, force: bool) -> Result<Option<ConfigValues>> {
        let now = self.clock.now();
        if !force && !self.should_check(now) {
            return Ok(None);
        }

        self.state = WatcherState::Checking;
        let modified = self.files_modified();
        self.last_check = now;
        match modified {
            Ok(true) => self.reload().map(Some),
            Ok(false) => {
                self.state = WatcherState::Idle;
                Ok(None)
            }
            Err(e) => {
                self.state = WatcherState::Idle;
                Err(e)
            }
        }
    }

    /// Run the loader, then the callbacks, regardless of file changes.
    pub fn reload(&mut self) -> Result<ConfigValues> {
        self.state = WatcherState::Reloading;
        let result = self.run_reload();
        self.state = WatcherState::Idle;
        result
    }

    fn run_reload(&mut self) -> Result<ConfigValues> {
        let values = match (self.loader)() {
            Ok(values) => values,
            Err(e) => {
                warn!(paths = ?self.paths, error = %e, "Configuration reload failed");
                return Err(e);
            }
        };
        info!(paths = ?self.paths, keys = values.len(), "Configuration reloaded");

        if let Some(chain) = &self.reloader {
            chain.invoke()?;
        }
        Ok(values)
    }

    /// Run the loader only.
    pub fn load_config(&mut self) -> Result<ConfigValues> {
        (self.loader)()
    }
}

/// A watcher over one file whose loads replace one namespace, paired with
/// the callback chain for that namespace.
///
/// ```rust,no_run
/// use staticconf::{ConfigFacade, FileSource, Registry};
/// use std::time::Duration;
///
/// let mut facade = ConfigFacade::load(
///     &Registry::global(),
///     FileSource::yaml("service.yaml"),
///     "service",
///     Duration::from_secs(5),
/// )
/// .unwrap();
/// facade.add_callback("log", || {
///     println!("service configuration reloaded");
///     Ok(())
/// });
/// facade.reload_if_changed(false).unwrap();
/// ```
#[derive(Debug)]
pub struct ConfigFacade {
    watcher: ConfigurationWatcher,
}

impl ConfigFacade {
    pub fn new(watcher: ConfigurationWatcher) -> Self {
        Self { watcher }
    }

    /// Build the watcher and perform the initial load.
    pub fn load(
        registry: &Arc<Registry>,
        source: FileSource,
        namespace: &str,
        min_interval: Duration,
    ) -> Result<Self> {
        let path = source.path().to_path_buf();
        let options = LoadOptions::new()
            .namespace(namespace)
            .mode(LoadMode::Replace);
        let loader = build_loader(Arc::clone(registry), source, options);

        let mut watcher = ConfigurationWatcher::builder(loader, [path])
            .min_interval(min_interval)
            .reloader(ReloadCallbackChain::new(registry, namespace, false))
            .build()?;
        watcher.load_config()?;
        Ok(Self { watcher })
    }

    pub fn add_callback<F>(&mut self, identifier: impl Into<String>, callback: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if let Some(chain) = self.watcher.reloader_mut() {
            chain.add(identifier, callback);
        }
    }

    pub fn remove_callback(&mut self, identifier: &str) -> Result<()> {
        match self.watcher.reloader_mut() {
            Some(chain) => chain.remove(identifier),
            None => Err(ConfigurationError::UnknownCallback {
                identifier: identifier.to_string(),
            }
            .into()),
        }
    }

    pub fn reload_if_changed(&mut self, force: bool) -> Result<Option<ConfigValues>> {
        self.watcher.reload_if_changed(force)
    }

    pub fn watcher(&self) -> &ConfigurationWatcher {
        &self.watcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::comparator::custom_comparator;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn counting_loader(count: &Arc<AtomicUsize>) -> ConfigLoader {
        let count = Arc::clone(count);
        Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(ConfigValues::new())
        })
    }

    fn switch() -> (Arc<AtomicBool>, ComparatorFactory) {
        let changed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&changed);
        let factory = custom_comparator(move |_path: &Path| Ok(flag.load(Ordering::SeqCst)));
        (changed, factory)
    }

    #[test]
    fn test_throttled_check_does_not_reload() {
        let loads = Arc::new(AtomicUsize::new(0));
        let clock = Arc::new(ManualClock::new());
        let (changed, comparator) = switch();
        let mut watcher = ConfigurationWatcher::builder(counting_loader(&loads), ["watched.yaml"])
            .min_interval(Duration::from_secs(10))
            .comparators(vec![comparator])
            .clock(clock.clone())
            .without_reloader()
            .build()
            .unwrap();

        changed.store(true, Ordering::SeqCst);
        clock.advance(Duration::from_secs(1));
        assert!(watcher.reload_if_changed(false).unwrap().is_none());
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        assert!(watcher.reload_if_changed(true).unwrap().is_some());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(watcher.state(), WatcherState::Idle);
    }

    #[test]
    fn test_interval_elapsed_checks_again() {
        let loads = Arc::new(AtomicUsize::new(0));
        let clock = Arc::new(ManualClock::new());
        let (changed, comparator) = switch();
        let mut watcher = ConfigurationWatcher::builder(counting_loader(&loads), ["watched.yaml"])
            .min_interval(Duration::from_secs(10))
            .comparators(vec![comparator])
            .clock(clock.clone())
            .without_reloader()
            .build()
            .unwrap();

        clock.advance(Duration::from_secs(10));
        assert!(watcher.reload_if_changed(false).unwrap().is_none());

        changed.store(true, Ordering::SeqCst);
        clock.advance(Duration::from_secs(10));
        assert!(watcher.reload_if_changed(false).unwrap().is_some());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_loader_failure_skips_callbacks() {
        let registry = Arc::new(Registry::new());
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let chain = ReloadCallbackChain::new(&registry, "watched", false).with_callback("cb", move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        let (changed, comparator) = switch();
        changed.store(true, Ordering::SeqCst);
        let loader: ConfigLoader = Box::new(|| {
            Err(ConfigurationError::SourceNotFound {
                source_name: "gone".to_string(),
            }
            .into())
        });
        let mut watcher = ConfigurationWatcher::builder(loader, ["watched.yaml"])
            .comparators(vec![comparator])
            .reloader(chain)
            .build()
            .unwrap();

        assert!(watcher.reload_if_changed(false).is_err());
        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(watcher.state(), WatcherState::Idle);
    }

    #[test]
    fn test_callbacks_run_after_reload() {
        let registry = Arc::new(Registry::new());
        let called = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&called);
        let chain = ReloadCallbackChain::new(&registry, "watched", false).with_callback("cb", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let loads = Arc::new(AtomicUsize::new(0));
        let mut watcher = ConfigurationWatcher::builder(counting_loader(&loads), ["watched.yaml"])
            .comparators(vec![custom_comparator(|_path: &Path| Ok(true))])
            .reloader(chain)
            .build()
            .unwrap();

        watcher.reload_if_changed(false).unwrap();
        assert_eq!(called.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_paths_are_absolute_and_sorted() {
        let loads = Arc::new(AtomicUsize::new(0));
        let watcher = ConfigurationWatcher::builder(counting_loader(&loads), ["b.yaml", "a.yaml"])
            .comparators(Vec::new())
            .without_reloader()
            .build()
            .unwrap();

        assert!(watcher.paths().iter().all(|p| p.is_absolute()));
        assert!(watcher.paths()[0].ends_with("a.yaml"));
    }
}
