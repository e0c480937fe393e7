//! Bone Hierarchy
//!
//! The template skeleton shared by every [`SkeletonInstance`](crate::scene::SkeletonInstance)
//! created from it. Holds the rest pose of each bone (relative to its parent)
//! and lazily caches the absolute (root-relative) transform of every bone.
//!
//! # Cache discipline
//!
//! Two levels of staleness are tracked (see [`CacheState`]):
//!
//! - Structural edits (`create_bone` / `remove_bone`) invalidate the
//!   evaluation order. The next read rebuilds it with a topological sort of
//!   the parent → child edges.
//! - Value edits (`set_transform_*`) only invalidate the absolute transforms.
//!   The next read walks the known order once, composing each bone onto its
//!   parent.
//!
//! Bones whose parent links form a cycle receive no position in the order;
//! their absolute transforms stay at identity. Use [`BoneHierarchy::validate`]
//! to detect this at setup time.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{Result, SkeletonError};
use crate::scene::BoneId;
use crate::scene::transform::BoneTransform;
use crate::utils::topo_sort::{TopoResult, topological_sort};
use crate::utils::version::ChangeTracker;

/// Shared handle to a hierarchy. Skeleton instances keep a `Weak` to it.
pub type SharedHierarchy = Arc<RwLock<BoneHierarchy>>;

/// Staleness of a cached aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CacheState {
    /// Order and values are up to date.
    Clean,
    /// The order is valid, the derived transforms are not.
    ValuesDirty,
    /// The order itself must be rebuilt (implies `ValuesDirty`).
    StructureDirty,
}

impl CacheState {
    #[inline]
    pub(crate) fn mark_values(&mut self) {
        if *self == Self::Clean {
            *self = Self::ValuesDirty;
        }
    }

    #[inline]
    pub(crate) fn mark_structure(&mut self) {
        *self = Self::StructureDirty;
    }
}

/// A single bone slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneDefinition {
    pub parent: Option<BoneId>,
    /// Rest transform relative to the parent bone.
    pub transform: BoneTransform,
    /// `false` for tombstoned slots left behind by `remove_bone`.
    pub created: bool,
}

impl BoneDefinition {
    const TOMBSTONE: Self = Self {
        parent: None,
        transform: BoneTransform::IDENTITY,
        created: false,
    };
}

#[derive(Debug, Clone)]
pub struct BoneHierarchy {
    bones: Vec<BoneDefinition>,
    names: Vec<Option<String>>,
    name_lookup: FxHashMap<String, BoneId>,

    // === Caches ===
    order: Vec<BoneId>,
    absolute: Vec<BoneTransform>,
    cache: CacheState,
    /// Bumped on every structural or rest-pose edit.
    version: ChangeTracker,
}

impl Default for BoneHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl BoneHierarchy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bones: Vec::new(),
            names: Vec::new(),
            name_lookup: FxHashMap::default(),
            order: Vec::new(),
            absolute: Vec::new(),
            cache: CacheState::Clean,
            version: ChangeTracker::new(),
        }
    }

    /// Wraps the hierarchy for sharing with skeleton instances.
    #[must_use]
    pub fn into_shared(self) -> SharedHierarchy {
        Arc::new(RwLock::new(self))
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Creates a bone under `parent` with an identity rest transform.
    ///
    /// Reuses the first tombstoned slot if there is one, otherwise appends.
    pub fn create_bone(&mut self, parent: Option<BoneId>) -> BoneId {
        if let Some(parent) = parent {
            self.assert_bone(parent);
        }

        let definition = BoneDefinition {
            parent,
            transform: BoneTransform::IDENTITY,
            created: true,
        };

        let id = if let Some(free) = self.bones.iter().position(|b| !b.created) {
            self.bones[free] = definition;
            self.names[free] = None;
            free
        } else {
            self.bones.push(definition);
            self.names.push(None);
            self.absolute.push(BoneTransform::IDENTITY);
            self.bones.len() - 1
        };

        log::trace!("Created bone {id} (parent: {parent:?})");
        self.cache.mark_structure();
        self.version.changed();
        id
    }

    /// Removes a bone. Its children are detached and become roots.
    ///
    /// The tail slot is truncated; any other slot is tombstoned for reuse.
    pub fn remove_bone(&mut self, id: BoneId) {
        self.assert_bone(id);

        if let Some(name) = self.names[id].take() {
            self.name_lookup.remove(&name);
        }

        for bone in self.bones.iter_mut().filter(|b| b.created && b.parent == Some(id)) {
            bone.parent = None;
        }

        if id + 1 == self.bones.len() {
            self.bones.pop();
            self.names.pop();
            self.absolute.pop();
        } else {
            self.bones[id] = BoneDefinition::TOMBSTONE;
        }

        log::trace!("Removed bone {id}");
        self.cache.mark_structure();
        self.version.changed();
    }

    #[inline]
    #[must_use]
    pub fn has_bone(&self, id: BoneId) -> bool {
        self.bones.get(id).is_some_and(|b| b.created)
    }

    /// Number of live (non-tombstoned) bones.
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.iter().filter(|b| b.created).count()
    }

    /// Length of the bone array, tombstones included.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.bones.len()
    }

    /// Highest bone id currently in use.
    #[must_use]
    pub fn top_bone_id(&self) -> Option<BoneId> {
        self.bones.iter().rposition(|b| b.created)
    }

    #[inline]
    #[must_use]
    pub fn bone_parent(&self, id: BoneId) -> Option<BoneId> {
        self.assert_bone(id);
        self.bones[id].parent
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[BoneDefinition] {
        &self.bones
    }

    // ========================================================================
    // Names
    // ========================================================================

    pub fn set_bone_name(&mut self, id: BoneId, name: &str) {
        self.assert_bone(id);
        if let Some(old) = self.names[id].take() {
            self.name_lookup.remove(&old);
        }
        if let Some(previous) = self.name_lookup.insert(name.to_string(), id) {
            log::warn!("Bone name '{name}' moved from bone {previous} to bone {id}");
            self.names[previous] = None;
        }
        self.names[id] = Some(name.to_string());
    }

    #[must_use]
    pub fn bone_name(&self, id: BoneId) -> Option<&str> {
        self.names.get(id).and_then(|n| n.as_deref())
    }

    #[must_use]
    pub fn find_bone(&self, name: &str) -> Option<BoneId> {
        self.name_lookup.get(name).copied()
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn transform_bone_space(&self, id: BoneId) -> BoneTransform {
        self.assert_bone(id);
        self.bones[id].transform
    }

    pub fn set_transform_bone_space(&mut self, id: BoneId, transform: BoneTransform) {
        self.assert_bone(id);
        self.bones[id].transform = transform;
        self.cache.mark_values();
        self.version.changed();
    }

    pub fn transform_abs_space(&mut self, id: BoneId) -> BoneTransform {
        self.assert_bone(id);
        self.update_caches();
        self.absolute[id]
    }

    /// Sets the absolute transform of a bone by back-solving its local
    /// transform against the parent's current absolute transform.
    pub fn set_transform_abs_space(&mut self, id: BoneId, transform: BoneTransform) {
        self.assert_bone(id);
        self.update_caches();

        self.bones[id].transform = match self.bones[id].parent {
            Some(parent) => self.absolute[parent].relative(&transform),
            None => transform,
        };
        self.cache.mark_values();
        self.version.changed();
    }

    /// Absolute transform from the cache without refreshing it.
    ///
    /// The caller must have brought the cache up to date first
    /// (see [`BoneHierarchy::needs_update`]).
    #[inline]
    #[must_use]
    pub fn cached_transform_abs_space(&self, id: BoneId) -> BoneTransform {
        debug_assert_eq!(self.cache, CacheState::Clean, "absolute cache is stale");
        self.absolute[id]
    }

    // ========================================================================
    // Cache maintenance
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn cache_state(&self) -> CacheState {
        self.cache
    }

    /// Changes whenever the structure or a rest transform is edited.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.version()
    }

    #[inline]
    #[must_use]
    pub fn needs_update(&self) -> bool {
        self.cache != CacheState::Clean
    }

    /// Brings the evaluation order and the absolute transforms up to date.
    pub fn update_caches(&mut self) {
        if self.cache == CacheState::StructureDirty {
            self.rebuild_order();
        }
        if self.cache != CacheState::Clean {
            compute_absolute(&self.bones, &self.order, &mut self.absolute);
            self.cache = CacheState::Clean;
        }
    }

    /// The topological evaluation order, rebuilt if the structure changed.
    pub fn bone_order(&mut self) -> &[BoneId] {
        self.update_caches();
        &self.order
    }

    /// The evaluation order as last computed.
    #[inline]
    #[must_use]
    pub fn cached_bone_order(&self) -> &[BoneId] {
        &self.order
    }

    /// Checks that every live bone can be ordered (no parent cycles).
    pub fn validate(&self) -> Result<()> {
        let sorted = sort_bones(&self.bones);
        let ordered = sorted.order.iter().filter(|b| b.is_some()).count();
        let total = self.bone_count();
        if ordered < total {
            return Err(SkeletonError::CyclicHierarchy { ordered, total });
        }
        Ok(())
    }

    fn rebuild_order(&mut self) {
        let sorted = sort_bones(&self.bones);
        self.order.clear();
        self.order.extend(sorted.order.into_iter().flatten());

        let total = self.bone_count();
        if self.order.len() < total {
            log::warn!(
                "Bone hierarchy contains a cycle: {} of {} bones are left out of the evaluation order",
                total - self.order.len(),
                total
            );
        }
        log::debug!("Rebuilt bone order ({} bones)", self.order.len());
    }

    #[inline]
    fn assert_bone(&self, id: BoneId) {
        assert!(self.has_bone(id), "invalid bone id {id}");
    }
}

/// Sorts the live bones parent-first. `None` is the "no parent" pseudo-node
/// and sorts ahead of every root bone.
fn sort_bones(bones: &[BoneDefinition]) -> TopoResult<Option<BoneId>> {
    let edges: Vec<(Option<BoneId>, Option<BoneId>)> = bones
        .iter()
        .enumerate()
        .filter(|(_, b)| b.created)
        .map(|(id, b)| (b.parent, Some(id)))
        .collect();
    topological_sort(&edges)
}

/// Composes local transforms down `order` into `absolute`.
///
/// Bones missing from `order` are left at identity.
pub(crate) fn compute_absolute(
    bones: &[BoneDefinition],
    order: &[BoneId],
    absolute: &mut Vec<BoneTransform>,
) {
    absolute.clear();
    absolute.resize(bones.len(), BoneTransform::IDENTITY);

    for &id in order {
        let bone = &bones[id];
        absolute[id] = match bone.parent {
            Some(parent) => absolute[parent].compose(&bone.transform),
            None => bone.transform,
        };
    }
}
