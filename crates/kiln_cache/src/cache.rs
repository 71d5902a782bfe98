//! The per-target cache facade.
//!
//! [`IncrementalCache`] ties the typed maps, the format version stamp and the
//! dependent-cache links together behind the operations the build
//! orchestrator calls each round:
//!
//! 1. [`mark_output_classes_dirty`](IncrementalCache::mark_output_classes_dirty)
//!    for every recompiled or removed source,
//! 2. [`save_file_to_cache`](IncrementalCache::save_file_to_cache) for every
//!    unit the compiler produced,
//! 3. [`clear_cache_for_removed_classes`](IncrementalCache::clear_cache_for_removed_classes)
//!    and [`get_files_to_reinline`](IncrementalCache::get_files_to_reinline)
//!    to find what else must be rebuilt,
//! 4. [`flush`](IncrementalCache::flush).

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use kiln_common::{InternalError, PathKey, UnitName};
use kiln_config::{CacheSettings, ResolvedTarget, StoreBackend};
use tracing::{debug, info, warn};

use crate::changes::ChangeRecord;
use crate::dump::CacheDump;
use crate::error::CacheError;
use crate::maps::{
    open_store, CacheMap, ConstantMap, DescriptorMap, DirtyInlineFunctionsMap, DirtyOutputsMap,
    InlineFunctionMap, InlineUsageMap, PackagePartMap, SourceToOutputsMap,
};
use crate::scan::{scan_constants, scan_inline_functions};
use crate::unit::{CompiledUnit, UnitBody, UnitKind};
use crate::version::CacheFormatVersion;

/// Reserved unit name under which the module mapping blob is stored.
pub const MODULE_MAPPING_UNIT: &str = ".kiln_module";

/// Everything needed to open one target's cache.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Target name, used in logs and errors.
    pub target: String,
    /// Directory holding the cache directory and the version stamp.
    pub data_root: PathBuf,
    /// Directory the target's artifacts are written to.
    pub output_dir: Option<PathBuf>,
    /// Shared cache settings.
    pub settings: CacheSettings,
}

impl CacheOptions {
    /// Options with default settings.
    pub fn new(
        target: impl Into<String>,
        data_root: impl Into<PathBuf>,
        output_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            target: target.into(),
            data_root: data_root.into(),
            output_dir,
            settings: CacheSettings::default(),
        }
    }

    /// Selects the store backend.
    pub fn with_backend(mut self, backend: StoreBackend) -> Self {
        self.settings.backend = backend;
        self
    }

    /// Directory holding the typed map files.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_root.join(&self.settings.directory)
    }
}

impl From<&ResolvedTarget> for CacheOptions {
    fn from(target: &ResolvedTarget) -> Self {
        Self {
            target: target.name.clone(),
            data_root: target.data_root.clone(),
            output_dir: Some(target.output_dir.clone()),
            settings: target.cache.clone(),
        }
    }
}

/// Non-owning link to another target's inline usage edges.
struct DependentCache {
    target: String,
    inlined_to: Weak<RefCell<InlineUsageMap>>,
}

/// Incremental compilation cache of one build target.
///
/// Created once per build session, reused across rounds, flushed after each
/// round and closed at session end. All operations assume a single writer.
pub struct IncrementalCache {
    target: String,
    cache_dir: PathBuf,
    output_dir: PathBuf,
    artifact_extension: String,
    backend: StoreBackend,

    descriptors: DescriptorMap,
    constants: ConstantMap,
    inline_functions: InlineFunctionMap,
    package_parts: PackagePartMap,
    source_outputs: SourceToOutputsMap,
    dirty_outputs: DirtyOutputsMap,
    dirty_inline: DirtyInlineFunctionsMap,
    inlined_to: Rc<RefCell<InlineUsageMap>>,

    format_version: CacheFormatVersion,
    dependents: Vec<DependentCache>,
    needs_rebuild: bool,
}

impl IncrementalCache {
    /// Opens the cache of one target.
    ///
    /// Fails if the target has no output directory or a store cannot be read.
    /// If the format version stamp does not match, every persisted map is
    /// discarded first and [`needs_rebuild`](Self::needs_rebuild) reports it.
    pub fn open(options: &CacheOptions) -> Result<Self, CacheError> {
        let output_dir = options
            .output_dir
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| CacheError::MissingOutputDir {
                target: options.target.clone(),
            })?;
        let output_dir = std::path::absolute(output_dir).map_err(|e| CacheError::io(output_dir, e))?;

        let cache_dir = options.cache_dir();
        let backend = options.settings.backend;
        let format_version = CacheFormatVersion::new(&options.data_root);

        let mut needs_rebuild = false;
        if backend == StoreBackend::Disk && format_version.is_incompatible(&cache_dir)? {
            info!(
                build_target = %options.target,
                dir = %cache_dir.display(),
                "cache format changed, discarding cached state"
            );
            remove_dir_if_exists(&cache_dir)?;
            format_version.clean()?;
            needs_rebuild = true;
        }

        let dir = cache_dir.as_path();
        Ok(Self {
            target: options.target.clone(),
            output_dir,
            artifact_extension: options.settings.artifact_extension.clone(),
            backend,
            descriptors: DescriptorMap::new(open_store(backend, dir, DescriptorMap::NAME)?),
            constants: ConstantMap::new(open_store(backend, dir, ConstantMap::NAME)?),
            inline_functions: InlineFunctionMap::new(open_store(
                backend,
                dir,
                InlineFunctionMap::NAME,
            )?),
            package_parts: PackagePartMap::new(open_store(backend, dir, PackagePartMap::NAME)?),
            source_outputs: SourceToOutputsMap::new(open_store(
                backend,
                dir,
                SourceToOutputsMap::NAME,
            )?),
            dirty_outputs: DirtyOutputsMap::new(open_store(backend, dir, DirtyOutputsMap::NAME)?),
            dirty_inline: DirtyInlineFunctionsMap::new(open_store(
                backend,
                dir,
                DirtyInlineFunctionsMap::NAME,
            )?),
            inlined_to: Rc::new(RefCell::new(InlineUsageMap::new(open_store(
                backend,
                dir,
                InlineUsageMap::NAME,
            )?))),
            cache_dir,
            format_version,
            dependents: Vec::new(),
            needs_rebuild,
        })
    }

    /// Deletes a target's persisted cache and stamp without opening it.
    ///
    /// Used to recover from a cache that fails to open.
    pub fn discard(options: &CacheOptions) -> Result<(), CacheError> {
        remove_dir_if_exists(&options.cache_dir())?;
        CacheFormatVersion::new(&options.data_root).clean()
    }

    /// The target name.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The absolute output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns `true` if persisted state was discarded at open because of a
    /// format version mismatch; the target needs a full rebuild.
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Path of the artifact produced for `name`.
    pub fn artifact_path(&self, name: &UnitName) -> PathKey {
        PathKey::new(
            self.output_dir
                .join(format!("{name}.{}", self.artifact_extension)),
        )
    }

    /// Records that the compiler inlined `signature` from `from_artifact` into `to_path`.
    pub fn register_inline(
        &mut self,
        from_artifact: impl AsRef<Path>,
        signature: &str,
        to_path: impl AsRef<Path>,
    ) {
        self.inlined_to.borrow_mut().add(
            absolute_key(from_artifact),
            signature,
            absolute_key(to_path),
        );
    }

    /// Links the cache of a target that may inline functions from this one.
    ///
    /// The link does not keep `other` alive; once it is closed its edges are
    /// no longer consulted.
    pub fn add_dependent_cache(&mut self, other: &IncrementalCache) {
        if Rc::ptr_eq(&self.inlined_to, &other.inlined_to) {
            return;
        }
        let known = self
            .dependents
            .iter()
            .any(|d| d.inlined_to.ptr_eq(&Rc::downgrade(&other.inlined_to)));
        if !known {
            self.dependents.push(DependentCache {
                target: other.target.clone(),
                inlined_to: Rc::downgrade(&other.inlined_to),
            });
        }
    }

    /// Flags every output of the given sources dirty and forgets the
    /// source-to-output association; the sources are about to be recompiled
    /// or were removed. Relative paths resolve against the working directory,
    /// as they do in [`save_file_to_cache`](Self::save_file_to_cache).
    pub fn mark_output_classes_dirty<P: AsRef<Path>>(&mut self, sources: &[P]) {
        for source in sources {
            let key = absolute_key(source);
            for unit in self.source_outputs.get(&key) {
                self.dirty_outputs.mark_dirty(&unit);
            }
            self.source_outputs.clear_outputs_for_source(&key);
        }
    }

    /// Records one compiled unit and returns what changed about it.
    pub fn save_file_to_cache(&mut self, unit: &CompiledUnit) -> Result<ChangeRecord, CacheError> {
        let name = &unit.name;
        if unit.kind.is_package_part() && unit.source_files.len() != 1 {
            return Err(InternalError::new(format!(
                "package part {name} compiled from {} source files",
                unit.source_files.len()
            ))
            .into());
        }

        self.dirty_outputs.not_dirty(name);
        for source in &unit.source_files {
            self.source_outputs.add(&absolute_key(source), name);
        }

        let record = match unit.kind {
            UnitKind::PackageFacade => self.descriptors.process(name, &unit.descriptor, true, true),
            UnitKind::FileFacade => {
                self.package_parts.add(name);
                self.descriptors.process(name, &unit.descriptor, true, true)
                    | self.process_body(name, &unit.body)?
            }
            UnitKind::Class => {
                self.descriptors.process(name, &unit.descriptor, false, true)
                    | self.process_body(name, &unit.body)?
            }
            UnitKind::SyntheticPackagePart => {
                self.package_parts.add(name);
                self.process_body(name, &unit.body)?
            }
            UnitKind::Other => ChangeRecord::NONE,
        };

        log_if_changed(name, &record);
        Ok(record)
    }

    fn process_body(&mut self, name: &UnitName, body: &UnitBody) -> Result<ChangeRecord, CacheError> {
        let constants = scan_constants(body)?;
        let inline = scan_inline_functions(body);
        Ok(self.constants.process(name, constants)
            | self
                .inline_functions
                .process(name, inline, &mut self.dirty_inline))
    }

    /// Stores the module mapping blob produced for `source_files`.
    ///
    /// The blob is opaque, so this never reports a change.
    pub fn save_module_mapping<P: AsRef<Path>>(
        &mut self,
        source_files: &[P],
        bytes: &[u8],
    ) -> ChangeRecord {
        let name = UnitName::new(MODULE_MAPPING_UNIT);
        self.descriptors.process(&name, bytes, false, false);
        self.dirty_outputs.not_dirty(&name);
        for source in source_files {
            self.source_outputs.add(&absolute_key(source), &name);
        }
        ChangeRecord::NONE
    }

    /// Purges every unit still flagged dirty after the round's units were saved.
    ///
    /// The returned record reports a descriptor or constants change for each
    /// purged unit that had one stored.
    pub fn clear_cache_for_removed_classes(&mut self) -> ChangeRecord {
        let mut record = ChangeRecord::NONE;
        for name in self.dirty_outputs.dirty_outputs() {
            let removed = ChangeRecord {
                descriptor_changed: self.descriptors.contains(&name),
                constants_changed: self.constants.contains(&name),
                ..ChangeRecord::NONE
            };
            log_if_changed(&name, &removed);
            record |= removed;

            self.descriptors.remove(&name);
            self.package_parts.remove(&name);
            self.constants.remove(&name);
            self.inline_functions.remove(&name);
        }
        self.dirty_outputs.clear();
        record
    }

    /// Dirty units that are package parts; their contributions to the
    /// package index are stale.
    pub fn get_obsolete_package_parts(&self) -> Vec<UnitName> {
        let obsolete: Vec<UnitName> = self
            .dirty_outputs
            .dirty_outputs()
            .into_iter()
            .filter(|name| self.package_parts.is_package_part(name))
            .collect();
        debug!(build_target = %self.target, ?obsolete, "obsolete package parts");
        obsolete
    }

    /// Files whose inlined copies of a changed inline function are stale.
    ///
    /// Looks up the edges of every changed signature in this cache and in
    /// every linked dependent cache, then consumes the pending changes.
    pub fn get_files_to_reinline(&mut self) -> BTreeSet<PathKey> {
        let pending = self.dirty_inline.entries();
        let mut files = BTreeSet::new();
        if pending.is_empty() {
            return files;
        }

        let facades = self.package_facades_by_package();
        let dependents: Vec<Rc<RefCell<InlineUsageMap>>> = self
            .dependents
            .iter()
            .filter_map(|d| {
                let edges = d.inlined_to.upgrade();
                if edges.is_none() {
                    warn!(
                        build_target = %self.target,
                        dependent = %d.target,
                        "dependent cache already closed, skipping its inline edges"
                    );
                }
                edges
            })
            .collect();

        {
            let own = self.inlined_to.borrow();
            for (unit, signatures) in &pending {
                let Some(owner) = self.reinline_owner(unit, &facades) else {
                    debug!(
                        build_target = %self.target,
                        %unit,
                        "no saved package facade for package part, skipping reinline lookup"
                    );
                    continue;
                };
                let artifact = self.artifact_path(&owner);
                for signature in signatures {
                    files.extend(own.get(&artifact, signature));
                    for edges in &dependents {
                        files.extend(edges.borrow().get(&artifact, signature));
                    }
                }
            }
        }

        self.dirty_inline.clear();
        files
    }

    /// The unit whose artifact callers reference for `unit`'s inline functions.
    ///
    /// Package parts are exposed through their package facade; without a saved
    /// facade there is nothing to resolve to.
    fn reinline_owner(
        &self,
        unit: &UnitName,
        facades: &BTreeMap<String, UnitName>,
    ) -> Option<UnitName> {
        if self.package_parts.is_package_part(unit) {
            facades.get(unit.package()).cloned()
        } else {
            Some(unit.clone())
        }
    }

    fn package_facades_by_package(&self) -> BTreeMap<String, UnitName> {
        let mut facades = BTreeMap::new();
        for name in self.descriptors.package_facades() {
            if !self.package_parts.is_package_part(&name) {
                facades
                    .entry(name.package().to_string())
                    .or_insert(name);
            }
        }
        facades
    }

    /// Stored descriptor bytes of `name`.
    pub fn get_descriptor_bytes(&self, name: &UnitName) -> Option<&[u8]> {
        self.descriptors.get(name).map(|v| v.bytes.as_slice())
    }

    /// Stored module mapping blob.
    pub fn module_mapping_data(&self) -> Option<&[u8]> {
        self.get_descriptor_bytes(&UnitName::new(MODULE_MAPPING_UNIT))
    }

    /// Stamps the current format version. Call once the round's state is flushed.
    pub fn save_format_version(&self) -> Result<(), CacheError> {
        match self.backend {
            StoreBackend::Disk => self.format_version.save_if_needed(),
            StoreBackend::Memory => Ok(()),
        }
    }

    /// Persists every map; see [`KeyedStore::flush`](crate::KeyedStore::flush).
    pub fn flush(&mut self, memory_only: bool) -> Result<(), CacheError> {
        self.for_each_map(|map| map.flush(memory_only))
    }

    /// Discards all cached state, including the version stamp.
    pub fn clean(&mut self) -> Result<(), CacheError> {
        info!(build_target = %self.target, dir = %self.cache_dir.display(), "cleaning cache");
        self.for_each_map(|map| map.clean())?;
        self.format_version.clean()
    }

    /// Flushes durably and releases every store.
    pub fn close(mut self) -> Result<(), CacheError> {
        self.for_each_map(|map| map.close())
    }

    /// Runs `op` on every map, returning the first error after trying all.
    fn for_each_map(
        &mut self,
        mut op: impl FnMut(&mut dyn CacheMap) -> Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        let results = [
            op(&mut self.descriptors),
            op(&mut self.constants),
            op(&mut self.inline_functions),
            op(&mut self.package_parts),
            op(&mut self.source_outputs),
            op(&mut self.dirty_outputs),
            op(&mut self.dirty_inline),
            op(&mut *self.inlined_to.borrow_mut()),
        ];
        results.into_iter().collect()
    }

    /// Read-only snapshot of every map.
    pub fn dump(&self) -> CacheDump {
        CacheDump {
            target: self.target.clone(),
            descriptors: self.descriptors.dump(),
            constants: self.constants.dump(),
            inline_functions: self.inline_functions.dump(),
            package_parts: self.package_parts.dump(),
            source_outputs: self.source_outputs.dump(),
            dirty_outputs: self.dirty_outputs.dump(),
            dirty_inline_functions: self.dirty_inline.dump(),
            inlined_to: self.inlined_to.borrow().dump(),
        }
    }
}

fn log_if_changed(name: &UnitName, record: &ChangeRecord) {
    if record.has_changes() {
        debug!(unit = %name, changes = %record, "unit is changed");
    }
}

/// Key of a caller-supplied path, resolved against the working directory.
///
/// Falls back to the lexical form for paths `std::path::absolute` rejects,
/// which is only the empty path.
fn absolute_key(path: impl AsRef<Path>) -> PathKey {
    let path = path.as_ref();
    match std::path::absolute(path) {
        Ok(absolute) => PathKey::new(absolute),
        Err(_) => PathKey::new(path),
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<(), CacheError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(dir, e)),
    }
}
