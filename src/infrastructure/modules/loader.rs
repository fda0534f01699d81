//! Load and unload orchestration
//!
//! `load_all` fans verification and loading out as independent tasks and
//! fires a single readiness barrier once the whole batch has drained; a bad
//! candidate is logged and skipped, never aborting its siblings or blocking
//! the barrier. `unload_all` fans out over a snapshot of the registry and
//! completes after exactly that many unload attempts.

use crate::application::errors::LifecycleError;
use crate::application::events::{EventBus, EventKind};
use crate::domain::entities::{Platform, UnitDescriptor};
use crate::domain::traits::{ConfigStore, Scanner};
use crate::infrastructure::modules::registry::{LoadedUnit, UnitRegistry};
use crate::infrastructure::modules::verifier::VerifierChain;
use crate::infrastructure::scanner::FsScanner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Name of the reserved built-in unit candidate under the builtin directory.
pub const BUILTIN_UNIT: &str = "core";

pub struct ModuleLoader {
    chain: Arc<VerifierChain>,
    registry: Arc<UnitRegistry>,
    scanner: Arc<dyn Scanner>,
    events: EventBus,
    modules_dir: PathBuf,
    builtin_dir: PathBuf,
}

impl ModuleLoader {
    pub fn new(modules_dir: impl Into<PathBuf>, builtin_dir: impl Into<PathBuf>) -> Self {
        Self::with_parts(
            Arc::new(VerifierChain::native()),
            Arc::new(FsScanner),
            modules_dir,
            builtin_dir,
        )
    }

    pub fn with_parts(
        chain: Arc<VerifierChain>,
        scanner: Arc<dyn Scanner>,
        modules_dir: impl Into<PathBuf>,
        builtin_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            chain,
            registry: Arc::new(UnitRegistry::new()),
            scanner,
            events: EventBus::default(),
            modules_dir: modules_dir.into(),
            builtin_dir: builtin_dir.into(),
        }
    }

    pub fn registry(&self) -> &Arc<UnitRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The ordered candidate list: the reserved built-in candidate first,
    /// then the scanner's entries.
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut candidates = vec![self.builtin_dir.join(BUILTIN_UNIT)];
        match self.scanner.entries(&self.modules_dir) {
            Ok(names) => {
                candidates.extend(names.into_iter().map(|n| self.modules_dir.join(n)));
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to scan modules directory {}: {}",
                    self.modules_dir.display(),
                    e
                );
            }
        }
        candidates
    }

    /// Classify a single candidate path.
    pub fn verify(&self, path: &Path) -> Option<UnitDescriptor> {
        self.chain.recognize(path)
    }

    /// Load and register a single verified unit, then run its post-load
    /// hook. Emits `load` on success; any failure is logged, emits `fail`
    /// and leaves the unit unregistered.
    pub async fn load_unit(&self, descriptor: &UnitDescriptor, platform: Arc<Platform>) -> bool {
        let unit = match instantiate(&self.chain, descriptor, platform.clone()).await {
            Ok(unit) => unit,
            Err(e) => {
                tracing::error!("Loading unit '{}' failed: {}", descriptor.name, e);
                self.events.emit(EventKind::Fail {
                    name: descriptor.name.clone(),
                });
                return false;
            }
        };

        // The hook runs before registration so a failing hook leaves no
        // trace in the registry.
        if let Err(e) = unit.instance.load(platform).await {
            tracing::error!("Post-load hook for '{}' failed: {}", descriptor.name, e);
            self.events.emit(EventKind::Fail {
                name: descriptor.name.clone(),
            });
            return false;
        }

        if let Err(e) = self.registry.insert(unit) {
            tracing::error!("Registering unit '{}' failed: {}", descriptor.name, e);
            self.events.emit(EventKind::Fail {
                name: descriptor.name.clone(),
            });
            return false;
        }

        self.events.emit(EventKind::Load {
            name: descriptor.name.clone(),
        });
        true
    }

    /// Discover, verify and load every candidate, then run the post-load
    /// hooks of all registered units exactly once, in registry order.
    ///
    /// Verification passes and load operations complete in no particular
    /// order; the hook pass happens only after both sets have fully
    /// drained.
    pub async fn load_all(&self, platform: Arc<Platform>) {
        let candidates = self.discover();
        self.events.emit(EventKind::Loading {
            candidates: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        });

        let mut verifications: JoinSet<Option<UnitDescriptor>> = JoinSet::new();
        for path in candidates {
            let chain = self.chain.clone();
            verifications.spawn_blocking(move || chain.recognize(&path));
        }

        let mut loads: JoinSet<()> = JoinSet::new();
        while let Some(result) = verifications.join_next().await {
            let descriptor = match result {
                Ok(Some(descriptor)) => descriptor,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!("Verification pass panicked: {}", e);
                    continue;
                }
            };

            let chain = self.chain.clone();
            let registry = self.registry.clone();
            let events = self.events.clone();
            let platform = platform.clone();
            loads.spawn(async move {
                match instantiate(&chain, &descriptor, platform).await {
                    Ok(unit) => match registry.insert(unit) {
                        Ok(()) => events.emit(EventKind::Load {
                            name: descriptor.name.clone(),
                        }),
                        Err(e) => {
                            tracing::error!(
                                "Registering unit '{}' failed: {}",
                                descriptor.name,
                                e
                            );
                            events.emit(EventKind::Fail {
                                name: descriptor.name.clone(),
                            });
                        }
                    },
                    Err(e) => {
                        tracing::error!("Loading unit '{}' failed: {}", descriptor.name, e);
                        events.emit(EventKind::Fail {
                            name: descriptor.name.clone(),
                        });
                    }
                }
            });
        }

        // Readiness barrier: verification finished above, now wait out the
        // in-flight loads.
        while loads.join_next().await.is_some() {}

        for unit in self.registry.snapshot() {
            if let Err(e) = unit.instance.load(platform.clone()).await {
                tracing::error!("Post-load hook for '{}' failed: {}", unit.name(), e);
            }
        }
    }

    /// Unload a single unit. The pre-unload hook and config persistence are
    /// best-effort; removal and the `unload` event are not rolled back.
    /// Unloading a unit that was never registered is a hard error.
    pub async fn unload_unit(
        &self,
        unit: Arc<LoadedUnit>,
        config: Arc<dyn ConfigStore>,
    ) -> Result<(), LifecycleError> {
        unload_inner(&self.registry, &self.events, unit, config).await
    }

    /// Unload a snapshot of the currently registered units. Returns once
    /// every unit in the snapshot has completed (successfully or not);
    /// units registered after the snapshot are unaffected.
    pub async fn unload_all(&self, config: Arc<dyn ConfigStore>) {
        let snapshot = self.registry.snapshot();
        let mut unloads: JoinSet<()> = JoinSet::new();
        for unit in snapshot {
            let registry = self.registry.clone();
            let events = self.events.clone();
            let config = config.clone();
            unloads.spawn(async move {
                if let Err(e) = unload_inner(&registry, &events, unit, config).await {
                    tracing::error!("Unload failed: {}", e);
                }
            });
        }
        while unloads.join_next().await.is_some() {}
    }
}

/// Dispatch to the verifier that recognized the descriptor and decorate the
/// resulting instance into a registry entry.
async fn instantiate(
    chain: &VerifierChain,
    descriptor: &UnitDescriptor,
    platform: Arc<Platform>,
) -> Result<Arc<LoadedUnit>, crate::application::errors::UnitError> {
    let verifier = chain.get(descriptor.verifier_index).ok_or_else(|| {
        crate::application::errors::UnitError::Internal(format!(
            "No verifier at index {}",
            descriptor.verifier_index
        ))
    })?;
    let instance = verifier.load(descriptor, platform.clone()).await?;
    Ok(Arc::new(LoadedUnit::new(
        descriptor.clone(),
        instance.unit,
        instance.library,
        platform,
    )))
}

async fn unload_inner(
    registry: &UnitRegistry,
    events: &EventBus,
    unit: Arc<LoadedUnit>,
    config: Arc<dyn ConfigStore>,
) -> Result<(), LifecycleError> {
    if let Err(e) = unit.instance.unload().await {
        tracing::error!("Unload hook for '{}' failed: {}", unit.name(), e);
    }
    if let Err(e) = config.save_config(unit.name()) {
        tracing::error!("Persisting config for '{}' failed: {}", unit.name(), e);
    }

    let removed = registry.remove(unit.name());
    unit.clear_platform();
    match removed {
        Ok(_) => {
            events.emit(EventKind::Unload {
                name: unit.name().to_string(),
            });
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::{ConfigError, UnitError};
    use crate::domain::traits::{ConfigSection, MemoryConfigStore, Unit};
    use serde_json::Value;
    use crate::infrastructure::modules::manifest::UnitManifest;
    use crate::infrastructure::modules::verifier::{UnitInstance, Verifier};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::io;
    use std::sync::Mutex;

    struct StubScanner {
        names: Vec<&'static str>,
    }

    impl Scanner for StubScanner {
        fn entries(&self, _root: &Path) -> io::Result<Vec<String>> {
            Ok(self.names.iter().map(|n| n.to_string()).collect())
        }
    }

    struct RecordingUnit {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        fail_hook: bool,
    }

    #[async_trait]
    impl Unit for RecordingUnit {
        fn name(&self) -> &str {
            &self.name
        }

        async fn load(&self, _platform: Arc<Platform>) -> Result<(), UnitError> {
            if self.fail_hook {
                return Err(UnitError::Hook("refused".into()));
            }
            self.log.lock().unwrap().push(format!("load:{}", self.name));
            Ok(())
        }

        async fn unload(&self) -> Result<(), UnitError> {
            self.log.lock().unwrap().push(format!("unload:{}", self.name));
            Ok(())
        }
    }

    /// Recognizes candidates by directory name from a fixed table.
    struct TableVerifier {
        priorities: HashMap<&'static str, i64>,
        fail_load: HashSet<&'static str>,
        fail_hook: HashSet<&'static str>,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Verifier for TableVerifier {
        fn kind(&self) -> &str {
            "table"
        }

        fn recognize(&self, path: &Path) -> Result<Option<UnitManifest>, UnitError> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            let Some(priority) = self.priorities.get(name.as_str()).copied() else {
                return Ok(None);
            };
            Ok(Some(UnitManifest {
                name,
                startup: "lib.so".to_string(),
                version: None,
                priority: Some(crate::domain::entities::PriorityToken::Number(priority)),
            }))
        }

        async fn load(
            &self,
            descriptor: &UnitDescriptor,
            _platform: Arc<Platform>,
        ) -> Result<UnitInstance, UnitError> {
            if self.fail_load.iter().any(|n| *n == descriptor.name) {
                return Err(UnitError::Load("broken unit".into()));
            }
            Ok(UnitInstance {
                unit: Arc::new(RecordingUnit {
                    name: descriptor.name.clone(),
                    log: self.log.clone(),
                    fail_hook: self.fail_hook.iter().any(|n| *n == descriptor.name),
                }),
                library: None,
            })
        }
    }

    fn platform() -> Arc<Platform> {
        Arc::new(Platform::new(
            "test",
            "/",
            Arc::new(MemoryConfigStore::new()),
        ))
    }

    fn loader_with(
        names: Vec<&'static str>,
        priorities: HashMap<&'static str, i64>,
        fail_load: HashSet<&'static str>,
        fail_hook: HashSet<&'static str>,
        log: Arc<Mutex<Vec<String>>>,
    ) -> ModuleLoader {
        let chain = VerifierChain::new(vec![Arc::new(TableVerifier {
            priorities,
            fail_load,
            fail_hook,
            log,
        })]);
        ModuleLoader::with_parts(
            Arc::new(chain),
            Arc::new(StubScanner { names }),
            "/virtual/modules",
            "/virtual/builtin",
        )
    }

    fn drain_events(
        rx: &mut tokio::sync::broadcast::Receiver<crate::application::events::LifecycleEvent>,
    ) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind);
        }
        kinds
    }

    #[tokio::test]
    async fn load_all_registers_units_and_runs_hooks_in_priority_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let loader = loader_with(
            vec!["omega", "alpha", "mid", "not-a-unit"],
            HashMap::from([("alpha", i64::MIN), ("mid", 0), ("omega", i64::MAX)]),
            HashSet::new(),
            HashSet::new(),
            log.clone(),
        );
        let mut rx = loader.events().subscribe();

        loader.load_all(platform()).await;

        let names: Vec<_> = loader
            .registry()
            .snapshot()
            .iter()
            .map(|u| u.name().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "omega"]);

        // Barrier pass: every registered unit's hook exactly once, in order.
        assert_eq!(
            *log.lock().unwrap(),
            vec!["load:alpha", "load:mid", "load:omega"]
        );

        let kinds = drain_events(&mut rx);
        assert!(matches!(kinds.first(), Some(EventKind::Loading { .. })));
        let loads = kinds
            .iter()
            .filter(|k| matches!(k, EventKind::Load { .. }))
            .count();
        assert_eq!(loads, 3);
    }

    #[tokio::test]
    async fn a_failing_candidate_never_blocks_its_siblings_or_the_barrier() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let loader = loader_with(
            vec!["good", "bad"],
            HashMap::from([("good", 0), ("bad", 0)]),
            HashSet::from(["bad"]),
            HashSet::new(),
            log.clone(),
        );
        let mut rx = loader.events().subscribe();

        loader.load_all(platform()).await;

        assert_eq!(loader.registry().len(), 1);
        assert!(loader.registry().get("good").is_some());
        assert_eq!(*log.lock().unwrap(), vec!["load:good"]);

        let kinds = drain_events(&mut rx);
        assert!(kinds
            .iter()
            .any(|k| matches!(k, EventKind::Fail { name } if name == "bad")));
    }

    #[tokio::test]
    async fn load_unit_with_a_failing_hook_registers_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let loader = loader_with(
            vec![],
            HashMap::from([("touchy", 0)]),
            HashSet::new(),
            HashSet::from(["touchy"]),
            log,
        );
        let mut rx = loader.events().subscribe();

        let descriptor = loader
            .verify(Path::new("/virtual/modules/touchy"))
            .expect("recognized");
        assert!(!loader.load_unit(&descriptor, platform()).await);
        assert!(loader.registry().is_empty());

        let kinds = drain_events(&mut rx);
        assert!(kinds
            .iter()
            .any(|k| matches!(k, EventKind::Fail { name } if name == "touchy")));
    }

    #[tokio::test]
    async fn load_unit_registers_and_emits_load() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let loader = loader_with(
            vec![],
            HashMap::from([("joke", 4)]),
            HashSet::new(),
            HashSet::new(),
            log.clone(),
        );

        let descriptor = loader
            .verify(Path::new("/virtual/modules/joke"))
            .expect("recognized");
        assert!(loader.load_unit(&descriptor, platform()).await);
        assert_eq!(loader.registry().len(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["load:joke"]);
    }

    #[tokio::test]
    async fn unload_all_drains_the_snapshot_and_persists_configs() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let loader = loader_with(
            vec!["alpha", "beta"],
            HashMap::from([("alpha", 0), ("beta", 1)]),
            HashSet::new(),
            HashSet::new(),
            log.clone(),
        );
        loader.load_all(platform()).await;
        assert_eq!(loader.registry().len(), 2);

        let config = Arc::new(MemoryConfigStore::new());
        let mut rx = loader.events().subscribe();
        loader.unload_all(config.clone()).await;

        assert!(loader.registry().is_empty());
        let mut saved = config.saved();
        saved.sort();
        assert_eq!(saved, vec!["alpha", "beta"]);

        let unloads = drain_events(&mut rx)
            .iter()
            .filter(|k| matches!(k, EventKind::Unload { .. }))
            .count();
        assert_eq!(unloads, 2);

        let hook_log: Vec<_> = log
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.starts_with("unload:"))
            .cloned()
            .collect();
        assert_eq!(hook_log.len(), 2);
    }

    /// Store whose persistence always fails.
    struct BrokenStore;

    impl ConfigStore for BrokenStore {
        fn get_system_config(&self, _section: &str) -> ConfigSection {
            Arc::new(std::sync::RwLock::new(serde_json::Map::new()))
        }

        fn load_config(&self, _folder: &Path, _name: &str) -> Result<Value, ConfigError> {
            Ok(Value::Object(serde_json::Map::new()))
        }

        fn save_config(&self, name: &str) -> Result<(), ConfigError> {
            Err(ConfigError::NotFound(name.to_string()))
        }
    }

    /// Unit whose pre-unload hook always fails.
    struct GrumpyUnit;

    #[async_trait]
    impl Unit for GrumpyUnit {
        fn name(&self) -> &str {
            "grumpy"
        }

        async fn unload(&self) -> Result<(), UnitError> {
            Err(UnitError::Unload("refused".into()))
        }
    }

    #[tokio::test]
    async fn failed_hook_and_persistence_never_roll_back_the_removal() {
        let loader = loader_with(
            vec![],
            HashMap::new(),
            HashSet::new(),
            HashSet::new(),
            Arc::new(Mutex::new(Vec::new())),
        );
        let platform = platform();
        let unit = Arc::new(LoadedUnit::new(
            UnitDescriptor {
                name: "grumpy".to_string(),
                startup: "lib.so".to_string(),
                version: "0.0.0".to_string(),
                priority: 0,
                folder_path: "/virtual".into(),
                verifier_index: 0,
            },
            Arc::new(GrumpyUnit),
            None,
            platform,
        ));
        loader.registry().insert(unit.clone()).unwrap();
        let mut rx = loader.events().subscribe();

        loader.unload_unit(unit, Arc::new(BrokenStore)).await.unwrap();

        // The hook and persistence errors are logged and swallowed; the
        // unit still leaves the registry and the event still fires.
        assert!(loader.registry().is_empty());
        let kinds = drain_events(&mut rx);
        assert!(kinds
            .iter()
            .any(|k| matches!(k, EventKind::Unload { name } if name == "grumpy")));
    }

    /// Unit whose pre-unload hook registers another unit, proving that the
    /// snapshot taken by `unload_all` is not affected by concurrent
    /// registrations.
    struct SpawningUnit {
        registry: Arc<UnitRegistry>,
        platform: Arc<Platform>,
    }

    #[async_trait]
    impl Unit for SpawningUnit {
        fn name(&self) -> &str {
            "spawner"
        }

        async fn unload(&self) -> Result<(), UnitError> {
            let descriptor = UnitDescriptor {
                name: "late-arrival".to_string(),
                startup: "lib.so".to_string(),
                version: "0.0.0".to_string(),
                priority: 0,
                folder_path: "/virtual".into(),
                verifier_index: 0,
            };
            let unit = Arc::new(LoadedUnit::new(
                descriptor,
                Arc::new(RecordingUnit {
                    name: "late-arrival".to_string(),
                    log: Arc::new(Mutex::new(Vec::new())),
                    fail_hook: false,
                }),
                None,
                self.platform.clone(),
            ));
            self.registry.insert(unit).map_err(|e| UnitError::Internal(e.to_string()))?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn units_registered_during_unload_all_are_excluded_from_the_snapshot() {
        let loader = loader_with(vec![], HashMap::new(), HashSet::new(), HashSet::new(), {
            Arc::new(Mutex::new(Vec::new()))
        });
        let platform = platform();

        let descriptor = UnitDescriptor {
            name: "spawner".to_string(),
            startup: "lib.so".to_string(),
            version: "0.0.0".to_string(),
            priority: 0,
            folder_path: "/virtual".into(),
            verifier_index: 0,
        };
        let unit = Arc::new(LoadedUnit::new(
            descriptor,
            Arc::new(SpawningUnit {
                registry: loader.registry().clone(),
                platform: platform.clone(),
            }),
            None,
            platform,
        ));
        loader.registry().insert(unit).unwrap();

        loader.unload_all(Arc::new(MemoryConfigStore::new())).await;

        // The snapshot held only "spawner"; the unit registered mid-unload
        // survives untouched.
        assert_eq!(loader.registry().len(), 1);
        assert!(loader.registry().get("late-arrival").is_some());
    }

    #[tokio::test]
    async fn unloading_a_never_loaded_unit_is_a_state_error() {
        let loader = loader_with(
            vec![],
            HashMap::new(),
            HashSet::new(),
            HashSet::new(),
            Arc::new(Mutex::new(Vec::new())),
        );
        let platform = platform();
        let unit = Arc::new(LoadedUnit::new(
            UnitDescriptor {
                name: "ghost".to_string(),
                startup: "lib.so".to_string(),
                version: "0.0.0".to_string(),
                priority: 0,
                folder_path: "/virtual".into(),
                verifier_index: 0,
            },
            Arc::new(RecordingUnit {
                name: "ghost".to_string(),
                log: Arc::new(Mutex::new(Vec::new())),
                fail_hook: false,
            }),
            None,
            platform,
        ));

        let err = loader
            .unload_unit(unit, Arc::new(MemoryConfigStore::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotLoaded(_)));
    }

    #[tokio::test]
    async fn discover_prepends_the_reserved_builtin_candidate() {
        let loader = loader_with(
            vec!["joke"],
            HashMap::new(),
            HashSet::new(),
            HashSet::new(),
            Arc::new(Mutex::new(Vec::new())),
        );
        let candidates = loader.discover();
        assert_eq!(candidates[0], PathBuf::from("/virtual/builtin/core"));
        assert_eq!(candidates[1], PathBuf::from("/virtual/modules/joke"));
    }
}
