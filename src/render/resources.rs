use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::foundation::core::Extent3;
use crate::foundation::error::{TexflowError, TexflowResult};
use crate::graph::model::NodeId;
use crate::graph::shape::ResolvedShape;
use crate::render::arena::{TextureArena, TextureHandle};
use crate::render::kernel::{ComputeProgram, ProgramRegistry};
use crate::texture::format::{FormatSupport, TextureFormat};
use crate::texture::storage::{FilterMode, MipOptions, Texture, TextureDesc, WrapMode};

/// Identity of a render target: the owning node plus a per-node slot name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    /// Node the target belongs to; releasing the node frees every slot it owns.
    pub node: NodeId,
    /// Slot name inside the node (most nodes only use `"output"`).
    pub slot: &'static str,
}

impl ResourceKey {
    /// Key of a node's main output target.
    pub fn output(node: NodeId) -> Self {
        Self {
            node,
            slot: "output",
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.node, self.slot)
    }
}

/// Allocation options that are not part of the resolved shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TargetOptions {
    /// Allocate a read/write pair so passes can ping-pong without reading their own target.
    pub double_buffered: bool,
    /// Addressing mode; changing it reconfigures the textures without reallocating.
    pub wrap: WrapMode,
    /// Sampling filter, reconfigured in place like `wrap`.
    pub filter: FilterMode,
    /// Mip chain request; toggling it reallocates the mip levels only.
    pub mips: MipOptions,
}

/// A node-owned texture, optionally double buffered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderTarget {
    requested: ResolvedShape,
    format: TextureFormat,
    opts: TargetOptions,
    read: TextureHandle,
    write: Option<TextureHandle>,
}

impl RenderTarget {
    /// Shape the target was last ensured with.
    pub fn shape(&self) -> ResolvedShape {
        self.requested
    }

    /// Allocated format (after device fallback).
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Allocation options.
    pub fn options(&self) -> TargetOptions {
        self.opts
    }

    /// Return `true` when a separate write instance exists.
    pub fn is_double_buffered(&self) -> bool {
        self.write.is_some()
    }

    /// Instance downstream nodes read. Single-buffered targets have only this one.
    pub fn read_instance(&self) -> TextureHandle {
        self.read
    }

    /// Instance dispatches write. Equal to the read instance when single buffered.
    pub fn write_instance(&self) -> TextureHandle {
        self.write.unwrap_or(self.read)
    }

    /// Exchange the read and write roles. No-op for single-buffered targets.
    pub fn swap(&mut self) {
        if let Some(w) = self.write.as_mut() {
            std::mem::swap(w, &mut self.read);
        }
    }

    fn handles(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        std::iter::once(self.read).chain(self.write)
    }
}

/// Counters of allocation work, used to verify that unchanged shapes cost nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceStats {
    /// Textures allocated (a double-buffered target counts two).
    pub allocations: u64,
    /// Targets released and reallocated because format or dimension changed.
    pub recreations: u64,
    /// Targets resized in place.
    pub resizes: u64,
    /// Targets whose sampler or mip state changed.
    pub reconfigurations: u64,
    /// Textures released.
    pub releases: u64,
}

/// Observable allocation decisions, drained by the scheduler into its event list.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceEvent {
    /// First allocation of a target.
    Created {
        /// Target that did not exist before this run.
        key: ResourceKey,
        /// Format after device fallback.
        format: TextureFormat,
    },
    /// Target reallocated after a format or dimension change.
    Recreated {
        /// Target whose replaced textures stay alive until the node commits.
        key: ResourceKey,
        /// Format of the new textures after device fallback.
        format: TextureFormat,
    },
    /// Target resized in place.
    Resized {
        /// Target whose texture handles are unchanged.
        key: ResourceKey,
        /// New logical extent.
        extent: Extent3,
    },
    /// The requested format is unsupported; a fallback was allocated instead.
    FormatFallback {
        /// Target that received the fallback.
        key: ResourceKey,
        /// Format the settings resolved to.
        requested: TextureFormat,
        /// Format actually allocated.
        actual: TextureFormat,
    },
}

/// Owner of every node's render targets and cached programs.
///
/// Dropping the manager releases everything; [`ResourceManager::release_node`] tears down a single
/// node when it is disabled or removed.
#[derive(Debug, Default)]
pub struct ResourceManager {
    arena: TextureArena,
    targets: BTreeMap<ResourceKey, RenderTarget>,
    programs: BTreeMap<NodeId, BTreeMap<&'static str, ComputeProgram>>,
    // Replaced textures that may still be published on the node's ports.
    retired: BTreeMap<NodeId, Vec<TextureHandle>>,
    support: FormatSupport,
    stats: ResourceStats,
    events: Vec<ResourceEvent>,
}

impl ResourceManager {
    /// Manager allocating from the given format table.
    pub fn new(support: FormatSupport) -> Self {
        Self {
            support,
            ..Self::default()
        }
    }

    fn desc(shape: &ResolvedShape, format: TextureFormat, opts: &TargetOptions) -> TextureDesc {
        TextureDesc {
            extent: shape.extent(),
            format,
            dimension: shape.dimension,
            wrap: opts.wrap,
            filter: opts.filter,
            mips: opts.mips,
        }
    }

    fn resolve_format(
        &mut self,
        key: ResourceKey,
        requested: TextureFormat,
    ) -> TexflowResult<TextureFormat> {
        let actual = self.support.resolve(requested)?;
        if actual != requested {
            warn!(target = %key, ?requested, ?actual, "texture format unsupported, using fallback");
            self.events.push(ResourceEvent::FormatFallback {
                key,
                requested,
                actual,
            });
        }
        Ok(actual)
    }

    fn allocate(
        &mut self,
        shape: &ResolvedShape,
        format: TextureFormat,
        opts: &TargetOptions,
    ) -> RenderTarget {
        let desc = Self::desc(shape, format, opts);
        let read = self.arena.allocate(desc);
        let write = opts.double_buffered.then(|| self.arena.allocate(desc));
        self.stats.allocations += 1 + u64::from(write.is_some());
        RenderTarget {
            requested: *shape,
            format,
            opts: *opts,
            read,
            write,
        }
    }

    fn free(&mut self, target: &RenderTarget) {
        for h in target.handles() {
            if self.arena.release(h) {
                self.stats.releases += 1;
            }
        }
    }

    /// Make the target at `key` match `shape` and `opts`.
    ///
    /// Returns `true` when the target was allocated by this call. Format or dimension changes
    /// recreate the textures, size changes resize them in place, sampler changes only update
    /// state. When nothing differs no work is done.
    ///
    /// Textures replaced by a recreation stay alive until [`ResourceManager::commit`] is called
    /// for the node, so outputs published by an earlier run remain readable if this run fails.
    pub fn ensure(
        &mut self,
        key: ResourceKey,
        shape: &ResolvedShape,
        opts: TargetOptions,
    ) -> TexflowResult<bool> {
        let Some(existing) = self.targets.get(&key) else {
            let format = self.resolve_format(key, shape.format)?;
            let target = self.allocate(shape, format, &opts);
            debug!(target = %key, ?format, extent = ?shape.extent(), "render target created");
            self.events.push(ResourceEvent::Created { key, format });
            self.targets.insert(key, target);
            return Ok(true);
        };

        if existing.requested == *shape && existing.opts == opts {
            return Ok(false);
        }

        let requested = existing.requested;
        if requested.format != shape.format || requested.dimension != shape.dimension {
            let old: Vec<TextureHandle> = existing.handles().collect();
            self.retired.entry(key.node).or_default().extend(old);
            let format = self.resolve_format(key, shape.format)?;
            let target = self.allocate(shape, format, &opts);
            self.stats.recreations += 1;
            debug!(target = %key, ?format, "render target recreated");
            self.events.push(ResourceEvent::Recreated { key, format });
            self.targets.insert(key, target);
            return Ok(false);
        }

        let mut target = existing.clone();
        if target.requested.extent() != shape.extent() {
            for h in target.handles() {
                if let Some(t) = self.arena.get_mut(h) {
                    t.resize_in_place(shape.extent());
                }
            }
            self.stats.resizes += 1;
            self.events.push(ResourceEvent::Resized {
                key,
                extent: shape.extent(),
            });
        }

        if target.opts.double_buffered != opts.double_buffered {
            if opts.double_buffered {
                let desc = Self::desc(shape, target.format, &opts);
                target.write = Some(self.arena.allocate(desc));
                self.stats.allocations += 1;
            } else if let Some(w) = target.write.take() {
                // Keep whichever instance currently holds the published result.
                if self.arena.release(w) {
                    self.stats.releases += 1;
                }
            }
        }

        let (old, new) = (target.opts, opts);
        if (old.wrap, old.filter, old.mips) != (new.wrap, new.filter, new.mips) {
            for h in target.handles() {
                if let Some(t) = self.arena.get_mut(h) {
                    t.set_sampling(new.wrap, new.filter, new.mips);
                }
            }
            self.stats.reconfigurations += 1;
        }

        target.requested = *shape;
        target.opts = opts;
        self.targets.insert(key, target);
        Ok(false)
    }

    /// Free the textures a node's targets replaced. Called once the node has published outputs
    /// that no longer reference them. Returns the number of textures freed.
    pub fn commit(&mut self, node: NodeId) -> usize {
        let Some(handles) = self.retired.remove(&node) else {
            return 0;
        };
        let mut freed = 0;
        for h in handles {
            if self.arena.release(h) {
                freed += 1;
            }
        }
        self.stats.releases += freed as u64;
        if freed > 0 {
            debug!(%node, freed, "replaced textures released");
        }
        freed
    }

    /// Number of replaced textures a node still keeps alive.
    pub fn retired(&self, node: NodeId) -> usize {
        self.retired.get(&node).map_or(0, Vec::len)
    }

    /// Target registered under `key`.
    pub fn target(&self, key: ResourceKey) -> Option<&RenderTarget> {
        self.targets.get(&key)
    }

    /// Exchange read and write instances of a double-buffered target.
    pub fn swap(&mut self, key: ResourceKey) -> TexflowResult<()> {
        let t = self
            .targets
            .get_mut(&key)
            .ok_or_else(|| TexflowError::not_found(format!("render target {key}")))?;
        if !t.is_double_buffered() {
            return Err(TexflowError::validation(format!(
                "render target {key} is not double buffered"
            )));
        }
        t.swap();
        Ok(())
    }

    /// Per-node cached program lookup. Unknown programs fail on first use.
    pub fn program(
        &mut self,
        node: NodeId,
        name: &'static str,
        registry: &ProgramRegistry,
    ) -> TexflowResult<ComputeProgram> {
        let cache = self.programs.entry(node).or_default();
        if let Some(p) = cache.get(name) {
            return Ok(*p);
        }
        let program = registry.get(name)?;
        cache.insert(name, program);
        Ok(program)
    }

    /// Number of programs cached for a node.
    pub fn cached_programs(&self, node: NodeId) -> usize {
        self.programs.get(&node).map_or(0, BTreeMap::len)
    }

    /// Release every target and cached program of a node. Returns the number of textures freed.
    pub fn release_node(&mut self, node: NodeId) -> usize {
        let keys: Vec<ResourceKey> = self
            .targets
            .keys()
            .filter(|k| k.node == node)
            .copied()
            .collect();
        let before = self.stats.releases;
        for key in keys {
            if let Some(t) = self.targets.remove(&key) {
                self.free(&t);
            }
        }
        self.programs.remove(&node);
        self.commit(node);
        let freed = (self.stats.releases - before) as usize;
        if freed > 0 {
            debug!(%node, freed, "released node resources");
        }
        freed
    }

    /// Return `true` when the node owns at least one target.
    pub fn has_targets(&self, node: NodeId) -> bool {
        self.targets.keys().any(|k| k.node == node)
    }

    /// Borrow a texture.
    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.arena.get(handle)
    }

    /// Mutably borrow a texture (host-side uploads).
    pub fn texture_mut(&mut self, handle: TextureHandle) -> Option<&mut Texture> {
        self.arena.get_mut(handle)
    }

    /// The texture arena.
    pub fn arena(&self) -> &TextureArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut TextureArena {
        &mut self.arena
    }

    /// Device format table.
    pub fn support(&self) -> &FormatSupport {
        &self.support
    }

    /// Allocation counters.
    pub fn stats(&self) -> ResourceStats {
        self.stats
    }

    /// Take the events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<ResourceEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/resources.rs"]
mod tests;
