//! Ordered collection of loaded plugins and the three dispatch passes.
//!
//! One mutex guards the collection and every call into a plugin, so plugin
//! code never runs concurrently with itself or with load/unload. Internal
//! diagnostics may be emitted while that lock is held; a host must not route
//! the `log` facade back into a [`Logger`](crate::Logger) that owns this
//! registry.

use crate::error::{LogError, Result};
use crate::event::LogEntry;
use crate::plugin::{
    NativeModule, PluginBackend, PluginConfig, PluginDescriptor, PluginKind, PluginModule,
    PluginResult, PluginSettings, PluginState,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Where an instance was loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PluginSource {
    Image(PathBuf),
    Builtin,
}

struct PluginInstance {
    name: String,
    source: PluginSource,
    descriptor: PluginDescriptor,
    module: PluginBackend,
    state: PluginState,
    priority: i64,
    seq: u64,
    config: PluginConfig,
}

impl PluginInstance {
    /// Run the plugin's init and settle its state. Returns the init status.
    fn initialize(&mut self, allowed: bool) -> i32 {
        let code = self.module.init(&self.config);
        self.state = if code != 0 {
            PluginState::Disabled
        } else {
            PluginState::Initialized
        };
        if self.state == PluginState::Initialized {
            self.state = if allowed {
                PluginState::Active
            } else {
                PluginState::Disabled
            };
        }
        code
    }

    fn is_enabled(&self) -> bool {
        self.state == PluginState::Active
    }

    fn unload(&mut self) {
        if self.is_enabled() {
            self.state = PluginState::ShuttingDown;
            self.module.shutdown();
        }
        self.state = PluginState::Unloaded;
    }
}

struct RegistryInner {
    settings: PluginSettings,
    instances: Vec<PluginInstance>,
    next_seq: u64,
}

/// Outcome of the admission path, reported once the lock is released.
struct Admission {
    name: String,
    version: String,
    kind: PluginKind,
    init_code: i32,
    state: PluginState,
}

impl Admission {
    fn report(&self) {
        if self.init_code != 0 {
            log::error!(
                "{}",
                LogError::InitRejected {
                    name: self.name.clone(),
                    code: self.init_code,
                }
            );
        }
        log::info!(
            "Loaded plugin {} v{} ({}, {})",
            self.name,
            self.version,
            self.kind,
            self.state
        );
    }
}

impl RegistryInner {
    fn contains(&self, name: &str) -> bool {
        self.instances.iter().any(|i| i.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut PluginInstance> {
        self.instances.iter_mut().find(|i| i.name == name)
    }

    fn find(&self, name: &str) -> Option<&PluginInstance> {
        self.instances.iter().find(|i| i.name == name)
    }

    fn admit(
        &mut self,
        name: &str,
        source: PluginSource,
        module: PluginBackend,
    ) -> Result<Admission> {
        if self.contains(name) {
            return Err(LogError::DuplicateName {
                name: name.to_string(),
            });
        }

        let descriptor = module
            .descriptor()
            .unwrap_or_else(|| PluginDescriptor::synthesized(name));
        let allowed = self.settings.is_allowed(name);
        let priority = self.settings.priority(name);
        let seq = self.next_seq;
        self.next_seq += 1;

        let mut instance = PluginInstance {
            name: name.to_string(),
            source,
            descriptor,
            module,
            state: PluginState::Resolved,
            priority,
            seq,
            config: self.settings.config_for(name),
        };
        let init_code = instance.initialize(allowed);

        let admission = Admission {
            name: instance.name.clone(),
            version: instance.descriptor.version.clone(),
            kind: instance.descriptor.kind,
            init_code,
            state: instance.state,
        };

        let at = self
            .instances
            .partition_point(|i| (i.priority, i.seq) <= (priority, seq));
        self.instances.insert(at, instance);
        Ok(admission)
    }

    fn active_of(&mut self, kind: PluginKind) -> impl Iterator<Item = &mut PluginInstance> {
        self.instances
            .iter_mut()
            .filter(move |i| i.is_enabled() && i.descriptor.kind == kind)
    }
}

/// Loaded plugins, kept in dispatch order: by position in the configured
/// order list, then by load order.
pub struct PluginRegistry {
    inner: Mutex<RegistryInner>,
}

impl PluginRegistry {
    /// Store the settings. Nothing is loaded until [`scan_and_load`] or
    /// [`register`] is called.
    ///
    /// [`scan_and_load`]: PluginRegistry::scan_and_load
    /// [`register`]: PluginRegistry::register
    pub fn new(settings: PluginSettings) -> Self {
        PluginRegistry {
            inner: Mutex::new(RegistryInner {
                settings,
                instances: Vec::new(),
                next_seq: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load every shared library found directly under the search paths.
    /// Returns how many were admitted; failures are logged and skipped.
    pub fn scan_and_load(&self) -> usize {
        let paths = self.lock().settings.search_paths.clone();
        let mut loaded = 0;

        for dir in &paths {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    log::error!("Cannot read plugin directory {}: {e}", dir.display());
                    continue;
                }
            };

            log::debug!("Scanning plugin directory {}", dir.display());
            for entry in entries.flatten() {
                let path = entry.path();
                if !is_candidate(&path) {
                    continue;
                }
                match self.load_image(&path) {
                    Ok(admission) => {
                        admission.report();
                        loaded += 1;
                    }
                    Err(LogError::DuplicateName { name }) => {
                        log::warn!(
                            "Plugin {name} already loaded, skipping {}",
                            path.display()
                        );
                    }
                    Err(e) => log::error!("{e}"),
                }
            }
        }

        log::info!("Plugin scan finished, {loaded} loaded");
        loaded
    }

    fn load_image(&self, path: &Path) -> Result<Admission> {
        let name = derive_name(path)?;
        let mut inner = self.lock();
        if inner.contains(&name) {
            return Err(LogError::DuplicateName { name });
        }
        let module = NativeModule::load(path, &name)?;
        inner.admit(
            &name,
            PluginSource::Image(path.to_path_buf()),
            PluginBackend::Native(module),
        )
    }

    /// Admit a statically linked plugin under `name`. A plugin whose init
    /// fails stays registered but disabled; only a name clash is an error.
    pub fn register(&self, name: &str, module: Box<dyn PluginModule>) -> Result<()> {
        let admission = self
            .lock()
            .admit(name, PluginSource::Builtin, PluginBackend::Builtin(module))?;
        admission.report();
        Ok(())
    }

    /// Run the enabled filters in order. The first non-`Ok` result vetoes
    /// the entry and stops the pass.
    pub fn filter_pass(&self, entry: &LogEntry) -> bool {
        let mut inner = self.lock();
        for instance in inner.active_of(PluginKind::Filter) {
            let result = instance.module.process(entry);
            if !result.is_ok() {
                log::trace!("Filter {} vetoed entry ({result:?})", instance.name);
                return false;
            }
        }
        true
    }

    /// Hand the entry to every enabled sink.
    pub fn sink_pass(&self, entry: &LogEntry) {
        self.broadcast(PluginKind::Sink, entry);
    }

    /// Hand the entry to every enabled analyser.
    pub fn analysis_pass(&self, entry: &LogEntry) {
        self.broadcast(PluginKind::Analysis, entry);
    }

    fn broadcast(&self, kind: PluginKind, entry: &LogEntry) {
        let mut inner = self.lock();
        for instance in inner.active_of(kind) {
            let result = instance.module.process(entry);
            if result != PluginResult::Ok {
                log::debug!("{kind} plugin {} returned {result:?}", instance.name);
            }
        }
    }

    /// Switch a loaded plugin on or off for subsequent entries. Returns
    /// `false` if no plugin has that name or it never initialized.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let changed = {
            let mut inner = self.lock();
            match inner.find_mut(name) {
                Some(instance) if instance.state.is_toggleable() => {
                    instance.state = if enabled {
                        PluginState::Active
                    } else {
                        PluginState::Disabled
                    };
                    true
                }
                _ => false,
            }
        };

        if changed {
            log::info!(
                "Plugin {name} {}",
                if enabled { "enabled" } else { "disabled" }
            );
        } else {
            log::warn!("{}", LogError::PluginNotFound { name: name.to_string() });
        }
        changed
    }

    /// Shut down every enabled plugin and release all of them. Safe to call
    /// more than once.
    pub fn unload_all(&self) {
        let released = {
            let mut inner = self.lock();
            let mut instances = std::mem::take(&mut inner.instances);
            for instance in &mut instances {
                instance.unload();
            }
            instances.len()
        };

        if released > 0 {
            log::info!("Unloaded {released} plugin(s)");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().instances.is_empty()
    }

    /// Descriptors in dispatch order.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.lock()
            .instances
            .iter()
            .map(|i| i.descriptor.clone())
            .collect()
    }

    pub fn descriptor(&self, name: &str) -> Option<PluginDescriptor> {
        self.lock().find(name).map(|i| i.descriptor.clone())
    }

    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.lock().find(name).map(|i| i.state)
    }

    pub fn source(&self, name: &str) -> Option<PluginSource> {
        self.lock().find(name).map(|i| i.source.clone())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.lock().find(name).is_some_and(PluginInstance::is_enabled)
    }

    /// Registry names in dispatch order.
    pub fn names(&self) -> Vec<String> {
        self.lock().instances.iter().map(|i| i.name.clone()).collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        PluginRegistry::new(PluginSettings::default())
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        self.unload_all();
    }
}

fn is_candidate(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
}

/// The registry name of an image is its file stem without the platform's
/// library prefix, so `libkeyword_filter.so` registers as `keyword_filter`.
fn derive_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| {
            s.strip_prefix(std::env::consts::DLL_PREFIX)
                .filter(|rest| !rest.is_empty())
                .unwrap_or(s)
        })
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LogError::ImageLoad {
            path: path.to_path_buf(),
            reason: "file name is not valid UTF-8".to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::plugin::MockPluginModule;
    use mockall::Sequence;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn mock_of(kind: PluginKind, name: &str) -> MockPluginModule {
        let mut mock = MockPluginModule::new();
        let descriptor = PluginDescriptor::new(name, kind);
        mock.expect_descriptor()
            .returning(move || Some(descriptor.clone()));
        mock.expect_init().returning(|_| 0);
        mock
    }

    fn entry() -> LogEntry {
        LogEntry::info(Some("test"), "payload")
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = PluginRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_filter_short_circuits_on_veto() {
        let registry = PluginRegistry::new(PluginSettings::new().with_order(&["first", "second"]));

        let mut first = mock_of(PluginKind::Filter, "first");
        first
            .expect_process()
            .times(1)
            .returning(|_| PluginResult::Skip);
        first.expect_shutdown().return_const(());

        let mut second = mock_of(PluginKind::Filter, "second");
        second.expect_process().times(0);
        second.expect_shutdown().return_const(());

        registry.register("second", Box::new(second)).unwrap();
        registry.register("first", Box::new(first)).unwrap();

        assert!(!registry.filter_pass(&entry()));
    }

    #[test]
    fn test_filters_pass_when_all_ok() {
        let registry = PluginRegistry::default();
        let mut filter = mock_of(PluginKind::Filter, "allow_all");
        filter
            .expect_process()
            .times(2)
            .returning(|_| PluginResult::Ok);
        filter.expect_shutdown().return_const(());
        registry.register("allow_all", Box::new(filter)).unwrap();

        assert!(registry.filter_pass(&entry()));
        assert!(registry.filter_pass(&entry()));
    }

    #[test]
    fn test_sinks_never_short_circuit() {
        let registry = PluginRegistry::default();
        for name in ["a", "b", "c"] {
            let mut sink = mock_of(PluginKind::Sink, name);
            sink.expect_process()
                .times(1)
                .returning(|_| PluginResult::Error);
            sink.expect_shutdown().return_const(());
            registry.register(name, Box::new(sink)).unwrap();
        }
        registry.sink_pass(&entry());
    }

    #[test]
    fn test_passes_only_reach_their_kind() {
        let registry = PluginRegistry::default();

        let mut sink = mock_of(PluginKind::Sink, "sink");
        sink.expect_process().times(1).returning(|_| PluginResult::Ok);
        sink.expect_shutdown().return_const(());

        let mut analysis = mock_of(PluginKind::Analysis, "analysis");
        analysis.expect_process().times(0);
        analysis.expect_shutdown().return_const(());

        let mut unknown = MockPluginModule::new();
        unknown.expect_descriptor().returning(|| None);
        unknown.expect_init().returning(|_| 0);
        unknown.expect_process().times(0);
        unknown.expect_shutdown().return_const(());

        registry.register("sink", Box::new(sink)).unwrap();
        registry.register("analysis", Box::new(analysis)).unwrap();
        registry.register("mystery", Box::new(unknown)).unwrap();

        assert!(registry.filter_pass(&entry()));
        registry.sink_pass(&entry());

        let synthesized = registry.descriptor("mystery").unwrap();
        assert_eq!(synthesized.kind, PluginKind::Unknown);
        assert_eq!(synthesized.version, "unknown");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = PluginRegistry::default();
        let mut first = mock_of(PluginKind::Sink, "dup");
        first.expect_shutdown().times(1).return_const(());
        registry.register("dup", Box::new(first)).unwrap();

        let mut second = MockPluginModule::new();
        second.expect_init().times(0);
        second.expect_descriptor().times(0);
        let err = registry.register("dup", Box::new(second)).unwrap_err();

        assert!(matches!(err, LogError::DuplicateName { ref name } if name == "dup"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_init_rejection_keeps_plugin_disabled() {
        let registry = PluginRegistry::default();
        let mut mock = MockPluginModule::new();
        mock.expect_descriptor()
            .returning(|| Some(PluginDescriptor::new("broken", PluginKind::Sink)));
        mock.expect_init().times(1).returning(|_| 3);
        mock.expect_process().times(0);
        mock.expect_shutdown().times(0);

        registry.register("broken", Box::new(mock)).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.state("broken"), Some(PluginState::Disabled));
        registry.sink_pass(&entry());
        registry.unload_all();
    }

    #[test]
    fn test_deny_list_wins_but_plugin_is_initialized() {
        let registry = PluginRegistry::new(
            PluginSettings::new()
                .with_enabled(&["quiet"])
                .with_disabled(&["quiet"]),
        );
        let mut mock = MockPluginModule::new();
        mock.expect_descriptor()
            .returning(|| Some(PluginDescriptor::new("quiet", PluginKind::Sink)));
        mock.expect_init().times(1).returning(|_| 0);
        mock.expect_process().times(0);
        mock.expect_shutdown().times(0);

        registry.register("quiet", Box::new(mock)).unwrap();
        assert!(!registry.is_enabled("quiet"));
        registry.sink_pass(&entry());
    }

    #[test]
    fn test_allow_list_excludes_unlisted() {
        let registry = PluginRegistry::new(PluginSettings::new().with_enabled(&["wanted"]));
        let mut wanted = mock_of(PluginKind::Sink, "wanted");
        wanted.expect_shutdown().return_const(());
        let mut other = mock_of(PluginKind::Sink, "other");
        other.expect_shutdown().times(0);

        registry.register("wanted", Box::new(wanted)).unwrap();
        registry.register("other", Box::new(other)).unwrap();

        assert!(registry.is_enabled("wanted"));
        assert!(!registry.is_enabled("other"));
        assert_eq!(registry.state("other"), Some(PluginState::Disabled));
    }

    #[test]
    fn test_init_receives_its_own_config() {
        let registry = PluginRegistry::new(
            PluginSettings::new().with_config("cfg", serde_json::json!({ "limit": 7 })),
        );
        let mut mock = MockPluginModule::new();
        mock.expect_descriptor().returning(|| None);
        mock.expect_init()
            .withf(|config| config.get_int("limit", 0) == 7)
            .times(1)
            .returning(|_| 0);
        mock.expect_shutdown().return_const(());

        registry.register("cfg", Box::new(mock)).unwrap();
    }

    #[test]
    fn test_dispatch_order_follows_order_list_then_load_order() {
        let registry =
            PluginRegistry::new(PluginSettings::new().with_order(&["late", "early"]));
        let mut seq = Sequence::new();

        let mut modules = Vec::new();
        for name in ["unlisted_a", "early", "unlisted_b", "late"] {
            modules.push((name, mock_of(PluginKind::Sink, name)));
        }
        for expected in ["late", "early", "unlisted_a", "unlisted_b"] {
            if let Some((_, m)) = modules.iter_mut().find(|(n, _)| *n == expected) {
                m.expect_process()
                    .times(1)
                    .in_sequence(&mut seq)
                    .returning(|_| PluginResult::Ok);
                m.expect_shutdown().return_const(());
            }
        }
        for (name, m) in modules {
            registry.register(name, Box::new(m)).unwrap();
        }

        assert_eq!(
            registry.names(),
            vec!["late", "early", "unlisted_a", "unlisted_b"]
        );
        registry.sink_pass(&entry());
    }

    #[test]
    fn test_disable_and_reenable_between_entries() {
        let registry = PluginRegistry::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let mut sink = mock_of(PluginKind::Sink, "counting");
        sink.expect_process().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            PluginResult::Ok
        });
        sink.expect_shutdown().return_const(());
        registry.register("counting", Box::new(sink)).unwrap();

        registry.sink_pass(&entry());
        assert!(registry.set_enabled("counting", false));
        registry.sink_pass(&entry());
        assert!(registry.set_enabled("counting", true));
        registry.sink_pass(&entry());

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_enabled_unknown_name() {
        let registry = PluginRegistry::default();
        assert!(!registry.set_enabled("nope", true));
    }

    #[test]
    fn test_unload_all_is_idempotent() {
        let registry = PluginRegistry::default();
        let mut active = mock_of(PluginKind::Sink, "active");
        active.expect_shutdown().times(1).return_const(());
        let mut disabled = mock_of(PluginKind::Sink, "disabled");
        disabled.expect_shutdown().times(0);

        registry.register("active", Box::new(active)).unwrap();
        registry.register("disabled", Box::new(disabled)).unwrap();
        registry.set_enabled("disabled", false);

        registry.unload_all();
        assert!(registry.is_empty());
        registry.unload_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_drop_shuts_down_enabled_plugins() {
        let mut mock = mock_of(PluginKind::Analysis, "analysis");
        mock.expect_shutdown().times(1).return_const(());
        {
            let registry = PluginRegistry::default();
            registry.register("analysis", Box::new(mock)).unwrap();
        }
    }

    #[test]
    fn test_builtin_source_recorded() {
        let registry = PluginRegistry::default();
        let mut mock = mock_of(PluginKind::Sink, "src");
        mock.expect_shutdown().return_const(());
        registry.register("src", Box::new(mock)).unwrap();
        assert_eq!(registry.source("src"), Some(PluginSource::Builtin));
    }

    #[test]
    fn test_scan_skips_missing_directory_and_junk() {
        let dir = tempfile::tempdir().unwrap();
        let ext = std::env::consts::DLL_EXTENSION;
        std::fs::write(dir.path().join(format!("junk.{ext}")), b"garbage").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        std::fs::create_dir(dir.path().join(format!("subdir.{ext}"))).unwrap();

        let registry = PluginRegistry::new(
            PluginSettings::new()
                .with_search_path(dir.path().join("missing"))
                .with_search_path(dir.path()),
        );

        assert_eq!(registry.scan_and_load(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_derive_name_uses_stem() {
        let name = derive_name(Path::new("/plugins/sample_filter.so")).unwrap();
        assert_eq!(name, "sample_filter");
    }

    #[test]
    fn test_derive_name_strips_library_prefix() {
        use std::env::consts::{DLL_EXTENSION, DLL_PREFIX};

        let image = format!("/plugins/{DLL_PREFIX}sample_filter.{DLL_EXTENSION}");
        assert_eq!(derive_name(Path::new(&image)).unwrap(), "sample_filter");
    }

    #[cfg(unix)]
    #[test]
    fn test_derive_name_keeps_prefix_only_stem() {
        assert_eq!(derive_name(Path::new("/plugins/lib.so")).unwrap(), "lib");
    }
}
