//! The particle store: owner of every per-particle buffer on one rank.

use mirra_core::{
    CustomCategory, CustomHandle, Domain, ExtensionOwner, FieldId, FieldMask, GrowError,
    OwnerId, Permutation, StepIndex, SyncError,
};
use mirra_custom::{CustomRegistry, ValueType};
use mirra_mirror::{DualField, Element, HostField, Mirrored, SyncCoordinator, SyncReport};
use mirra_sort::{BinSorter, Geometry, SortMode, SortPlan, SortState};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::extension::Extensions;
use crate::fields::{self, CoreFieldIds};
use crate::metrics::StoreMetrics;

/// Result of a sort request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortOutcome {
    /// The cadence step has not been reached; nothing happened.
    NotDue,
    /// The bin grid collapsed to a single bin; no data moved.
    Skipped,
    /// Every per-particle field and extension owner was relocated.
    Sorted {
        /// Where the sort ran.
        mode: SortMode,
        /// The permutation applied to the local particles.
        permutation: Permutation,
    },
}

/// Dual-domain storage for the particles of one rank.
///
/// Owns the core fields (registered in a [`SyncCoordinator`]), the custom
/// property registry, the bin sorter and the registered extension owners.
/// The live row count of every per-particle buffer is `local + ghost`;
/// sorts reorder only the first `local` rows.
///
/// Masks passed to [`mark_modified`](Self::mark_modified) and friends may
/// mix core groups with [`FieldMask::DVECTOR`], which addresses every
/// live scalar-float custom property. Both halves follow the same
/// [`SyncPolicy`](mirra_mirror::SyncPolicy).
pub struct ParticleStore {
    config: StoreConfig,
    fields: SyncCoordinator,
    ids: CoreFieldIds,
    custom: CustomRegistry,
    sorter: BinSorter,
    extensions: Extensions,
    local: usize,
    ghost: usize,
    capacity: usize,
    metrics: StoreMetrics,
}

impl ParticleStore {
    /// Validate `config` and allocate every field at the initial capacity.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let capacity = config.initial_capacity;
        let mut coordinator = SyncCoordinator::new(config.policy);
        let ids = fields::register(
            &mut coordinator,
            &config.layout,
            capacity,
            config.atom_types,
        )?;
        let sorter = BinSorter::new(config.sort.sorter_config(), config.sort.initial_mode());
        tracing::debug!(
            capacity,
            fields = coordinator.field_count(),
            policy = ?config.policy,
            sort_mode = %sorter.mode(),
            "particle store created"
        );
        Ok(Self {
            config,
            fields: coordinator,
            ids,
            custom: CustomRegistry::new(capacity),
            sorter,
            extensions: Extensions::default(),
            local: 0,
            ghost: 0,
            capacity,
            metrics: StoreMetrics::default(),
        })
    }

    /// The configuration the store was built from.
    ///
    /// `layout.max_special` tracks [`set_max_special`](Self::set_max_special).
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Ids of the core fields.
    pub fn ids(&self) -> &CoreFieldIds {
        &self.ids
    }

    /// The core-field coordinator, for read-only inspection.
    pub fn fields(&self) -> &SyncCoordinator {
        &self.fields
    }

    // ── Counts and capacity ────────────────────────────────────────

    /// Local (owned) particles.
    pub fn local(&self) -> usize {
        self.local
    }

    /// Ghost particles stored after the local ones.
    pub fn ghost(&self) -> usize {
        self.ghost
    }

    /// Rows allocated in every per-particle buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set the local and ghost counts. `local + ghost` must fit the
    /// current capacity.
    pub fn set_counts(&mut self, local: usize, ghost: usize) -> Result<(), StoreError> {
        let total = local.saturating_add(ghost);
        if total > self.capacity {
            return Err(GrowError::CapacityBelowCount {
                requested: self.capacity,
                live: total,
            }
            .into());
        }
        self.fields.set_len(total)?;
        self.custom.set_len(total)?;
        self.local = local;
        self.ghost = ghost;
        Ok(())
    }

    /// Reallocate every per-particle buffer, core and custom, to
    /// `new_capacity` rows.
    ///
    /// Live rows are preserved and every buffer ends consistent across
    /// domains. Fails if `new_capacity < local + ghost` or if an
    /// overlapped transfer has not been joined.
    pub fn grow(&mut self, new_capacity: usize) -> Result<(), StoreError> {
        let live = self.local + self.ghost;
        if new_capacity < live {
            return Err(GrowError::CapacityBelowCount {
                requested: new_capacity,
                live,
            }
            .into());
        }
        let core = self.fields.registered_groups();
        self.fields.check_grow(core, new_capacity)?;
        self.custom.check_grow(new_capacity)?;

        let old_capacity = self.capacity;
        self.fields.grow(core, new_capacity)?;
        self.custom.grow(new_capacity)?;
        self.capacity = new_capacity;
        self.metrics.grow_events += 1;
        tracing::debug!(old_capacity, new_capacity, "store grown");
        Ok(())
    }

    /// Change the width of the special-neighbor list.
    ///
    /// Existing entries up to the new width are kept in both domains.
    pub fn set_max_special(&mut self, max_special: usize) -> Result<(), StoreError> {
        let id = self.ids.special.ok_or(SyncError::UnregisteredGroup {
            mask: FieldMask::SPECIAL,
        })?;
        self.fields
            .field_mut::<i64>(id)?
            .reshape_columns(max_special)?;
        self.config.layout.max_special = max_special;
        tracing::debug!(max_special, "special list width changed");
        Ok(())
    }

    // ── Synchronization ────────────────────────────────────────────

    /// Every group a mask may name: the registered core groups and
    /// [`FieldMask::DVECTOR`].
    pub fn registered_groups(&self) -> FieldMask {
        self.fields.registered_groups() | FieldMask::DVECTOR
    }

    /// Split `mask` into its core and custom halves, rejecting unknown tags
    /// before anything is touched.
    fn split(&self, mask: FieldMask) -> Result<(FieldMask, FieldMask), SyncError> {
        let unknown = mask.difference(self.registered_groups());
        if !unknown.is_empty() {
            return Err(SyncError::UnregisteredGroup { mask: unknown });
        }
        Ok((
            mask.difference(FieldMask::DVECTOR),
            mask.intersection(FieldMask::DVECTOR),
        ))
    }

    /// Record that the groups in `mask` were just written in `domain`.
    pub fn mark_modified(
        &mut self,
        domain: Domain,
        mask: FieldMask,
    ) -> Result<SyncReport, StoreError> {
        let (core, custom) = self.split(mask)?;
        let policy = self.config.policy;
        let mut report = SyncReport::default();
        if !core.is_empty() {
            report = report.merged(self.fields.mark_modified(domain, core)?);
        }
        if !custom.is_empty() {
            report = report.merged(policy.mark_modified(&mut self.custom, domain, custom)?);
        }
        Ok(report)
    }

    /// Make the groups in `mask` current in `domain`.
    pub fn ensure_valid(
        &mut self,
        domain: Domain,
        mask: FieldMask,
    ) -> Result<SyncReport, StoreError> {
        let (core, custom) = self.split(mask)?;
        let policy = self.config.policy;
        let mut report = SyncReport::default();
        if !core.is_empty() {
            report = report.merged(self.fields.ensure_valid(domain, core)?);
        }
        if !custom.is_empty() {
            report = report.merged(policy.ensure_valid(&mut self.custom, domain, custom)?);
        }
        Ok(report)
    }

    /// Start making `mask` current in `domain` without waiting for the
    /// copies. They are joined by the next access to each field, or by
    /// [`join`](Self::join).
    pub fn overlapped_ensure_valid(
        &mut self,
        domain: Domain,
        mask: FieldMask,
    ) -> Result<SyncReport, StoreError> {
        let (core, custom) = self.split(mask)?;
        let policy = self.config.policy;
        let mut report = SyncReport::default();
        if !core.is_empty() {
            report = report.merged(self.fields.overlapped_ensure_valid(domain, core)?);
        }
        if !custom.is_empty() {
            report = report.merged(policy.overlapped_ensure_valid(
                &mut self.custom,
                domain,
                custom,
            )?);
        }
        Ok(report)
    }

    /// Wait for in-flight transfers in `mask`. Returns how many were joined.
    pub fn join(&mut self, mask: FieldMask) -> Result<usize, StoreError> {
        let (core, custom) = self.split(mask)?;
        let mut joined = 0;
        if !core.is_empty() {
            joined += self.fields.join(core)?;
        }
        if !custom.is_empty() {
            joined += self.custom.join();
        }
        Ok(joined)
    }

    // ── Core field access ──────────────────────────────────────────

    /// Typed read access to a core field. Fails while an overlapped
    /// transfer on it is unjoined.
    pub fn field<T: Element>(&self, id: FieldId) -> Result<&Mirrored<T, 2>, StoreError> {
        Ok(self.fields.field::<T>(id)?)
    }

    /// Typed write access to a core field. Joins any in-flight transfer.
    ///
    /// Writes are not tracked; follow them with
    /// [`mark_modified`](Self::mark_modified) for the written domain.
    pub fn field_mut<T: Element>(
        &mut self,
        id: FieldId,
    ) -> Result<&mut Mirrored<T, 2>, StoreError> {
        Ok(self.fields.field_mut::<T>(id)?)
    }

    /// Current per-type masses in host memory, indexed by type.
    /// Row 0 is unused.
    pub fn type_masses(&mut self) -> Result<&[f64], StoreError> {
        self.ensure_valid(Domain::Host, FieldMask::TYPE_MASS)?;
        Ok(self.fields.field::<f64>(self.ids.type_mass)?.view(Domain::Host))
    }

    /// Set the mass of particle type `ty` on the host.
    ///
    /// Fails if `ty` is not in `1..=atom_types`.
    pub fn set_type_mass(&mut self, ty: usize, mass: f64) -> Result<(), StoreError> {
        let types = self.config.atom_types;
        if !(1..=types).contains(&ty) {
            return Err(StoreError::UnknownType { ty, types });
        }
        self.ensure_valid(Domain::Host, FieldMask::TYPE_MASS)?;
        self.fields.field_mut::<f64>(self.ids.type_mass)?.view_mut(Domain::Host)[ty] = mass;
        self.mark_modified(Domain::Host, FieldMask::TYPE_MASS)?;
        Ok(())
    }

    // ── Custom properties ──────────────────────────────────────────

    /// Add a custom per-particle property sized to the current capacity.
    ///
    /// Scalar-float properties are mirrored: the existing scalar-float set
    /// is first made valid on the device, and after the new entry is
    /// allocated the whole set is marked device-modified.
    pub fn add_custom(
        &mut self,
        name: &str,
        value_type: ValueType,
        cols: usize,
    ) -> Result<CustomHandle, StoreError> {
        let mirrored = value_type.category(cols) == CustomCategory::ScalarFloat;
        let policy = self.config.policy;
        if mirrored {
            policy.ensure_valid(&mut self.custom, Domain::Device, FieldMask::DVECTOR)?;
        }
        let handle = self.custom.add(name, value_type, cols);
        if mirrored {
            policy.mark_modified(&mut self.custom, Domain::Device, FieldMask::DVECTOR)?;
        }
        self.metrics.custom_added += 1;
        Ok(handle)
    }

    /// Free a custom property and tombstone its handle.
    pub fn remove_custom(&mut self, handle: CustomHandle) -> Result<(), StoreError> {
        self.custom.remove(handle)?;
        self.metrics.custom_removed += 1;
        Ok(())
    }

    /// The custom property registry, for lookup and reads.
    pub fn custom(&self) -> &CustomRegistry {
        &self.custom
    }

    /// Mutable integer storage of a custom property.
    pub fn custom_ints_mut(
        &mut self,
        handle: CustomHandle,
    ) -> Result<&mut HostField<i32>, StoreError> {
        Ok(self.custom.ints_mut(handle)?)
    }

    /// Mutable storage of an array-float custom property.
    pub fn custom_floats_mut(
        &mut self,
        handle: CustomHandle,
    ) -> Result<&mut HostField<f64>, StoreError> {
        Ok(self.custom.floats_mut(handle)?)
    }

    /// Mutable storage of a scalar-float (mirrored) custom property.
    pub fn custom_mirrored_mut(
        &mut self,
        handle: CustomHandle,
    ) -> Result<&mut DualField<f64>, StoreError> {
        Ok(self.custom.mirrored_mut(handle)?)
    }

    // ── Extension owners ───────────────────────────────────────────

    /// Register an owner whose arrays are relocated by every sort.
    pub fn register_extension(&mut self, owner: Box<dyn ExtensionOwner>) -> OwnerId {
        self.extensions.register(owner)
    }

    /// Unregister an owner and hand it back.
    pub fn unregister_extension(&mut self, id: OwnerId) -> Option<Box<dyn ExtensionOwner>> {
        self.extensions.unregister(id)
    }

    /// A registered owner.
    pub fn extension(&self, id: OwnerId) -> Option<&dyn ExtensionOwner> {
        self.extensions.get(id)
    }

    /// Number of registered owners.
    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }

    // ── Sorting ────────────────────────────────────────────────────

    /// Where sorts currently run.
    pub fn sort_mode(&self) -> SortMode {
        self.sorter.mode()
    }

    /// Bin grid lifecycle state.
    pub fn sort_state(&self) -> SortState {
        self.sorter.state()
    }

    /// First step at which [`request_sort`](Self::request_sort) will sort.
    pub fn next_sort(&self) -> StepIndex {
        self.sorter.next_sort()
    }

    /// The bin sorter, for inspecting the current grid.
    pub fn sorter(&self) -> &BinSorter {
        &self.sorter
    }

    /// Record that the simulation box changed. Bins are recomputed before
    /// the next sort.
    pub fn geometry_changed(&mut self) {
        self.sorter.geometry_changed();
    }

    /// Sort at `step` if the cadence says one is due.
    pub fn request_sort(
        &mut self,
        step: StepIndex,
        geometry: &dyn Geometry,
    ) -> Result<SortOutcome, StoreError> {
        if !self.sorter.is_due(step) {
            return Ok(SortOutcome::NotDue);
        }
        self.sort(step, geometry)
    }

    /// Sort the local particles by spatial bin now, regardless of cadence.
    ///
    /// The next cadence sort is rescheduled from `step` either way.
    pub fn sort(
        &mut self,
        step: StepIndex,
        geometry: &dyn Geometry,
    ) -> Result<SortOutcome, StoreError> {
        let span = tracing::info_span!("sort", %step, local = self.local);
        let _guard = span.enter();

        if self.sorter.check_extensions(self.extensions.iter()) {
            self.metrics.downgrades += 1;
        }
        let mode = self.sorter.mode();

        if self.sorter.prepare(step, geometry, self.local)? == SortPlan::Skipped {
            self.metrics.sorts_skipped += 1;
            return Ok(SortOutcome::Skipped);
        }

        let applied = self.relocate_all(geometry, mode.domain());
        self.sorter.finish();
        let permutation = applied?;

        self.metrics.sorts += 1;
        if mode == SortMode::Host {
            self.metrics.host_sorts += 1;
        }
        tracing::debug!(%mode, particles = permutation.len(), "sort applied");
        Ok(SortOutcome::Sorted { mode, permutation })
    }

    /// Bin positions in `domain`, then move every per-particle buffer and
    /// extension array by the resulting permutation.
    fn relocate_all(
        &mut self,
        geometry: &dyn Geometry,
        domain: Domain,
    ) -> Result<Permutation, StoreError> {
        self.fields.ensure_valid(domain, FieldMask::X)?;
        let positions = self.fields.field::<f64>(self.ids.x)?.view(domain);
        let permutation = self.sorter.permutation(geometry, positions, self.local)?;

        let core = self
            .fields
            .registered_groups()
            .difference(FieldMask::TYPE_MASS);
        let policy = self.config.policy;
        self.fields.ensure_valid(domain, core)?;
        policy.ensure_valid(&mut self.custom, domain, FieldMask::DVECTOR)?;

        self.fields.permute(core, &permutation, domain)?;
        self.custom.permute(&permutation, domain);

        self.fields.mark_modified(domain, core)?;
        policy.mark_modified(&mut self.custom, domain, FieldMask::DVECTOR)?;

        self.extensions.relocate(&permutation, domain);
        Ok(permutation)
    }

    // ── Metrics ────────────────────────────────────────────────────

    /// Counters since construction. Transfer counts include custom
    /// properties, removed ones too.
    pub fn metrics(&self) -> StoreMetrics {
        let transfers = self.fields.stats().merged(self.custom.stats());
        self.metrics.clone().with_transfers(transfers)
    }

    /// Bytes allocated per domain across core fields, the mass table and
    /// custom properties.
    pub fn allocation_bytes(&self) -> usize {
        self.fields.allocation_bytes() + self.custom.allocation_bytes()
    }
}
