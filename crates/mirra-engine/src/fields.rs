//! The core per-particle fields and the groups they are registered under.

use mirra_core::{Domain, FieldId, FieldMask, SyncError};
use mirra_mirror::{DualField, Element, FieldScope, SyncCoordinator};

use crate::config::Layout;

/// Ids of the fields a store always carries, plus the optional ones its
/// layout asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreFieldIds {
    /// Positions, 3 columns.
    pub x: FieldId,
    /// Velocities, 3 columns.
    pub v: FieldId,
    /// Forces, 3 columns.
    pub f: FieldId,
    /// Global particle tags.
    pub tag: FieldId,
    /// Particle types, `1..=atom_types`.
    pub type_: FieldId,
    /// Group membership bits.
    pub mask: FieldId,
    /// Packed periodic image counts.
    pub image: FieldId,
    /// Per-type masses, one row per type plus an unused row 0.
    pub type_mass: FieldId,
    /// Charge.
    pub q: Option<FieldId>,
    /// Molecule id.
    pub molecule: Option<FieldId>,
    /// Sphere radius.
    pub radius: Option<FieldId>,
    /// Per-particle mass.
    pub rmass: Option<FieldId>,
    /// Angular velocity, 3 columns.
    pub omega: Option<FieldId>,
    /// Torque, 3 columns.
    pub torque: Option<FieldId>,
    /// Angular momentum, 3 columns.
    pub angmom: Option<FieldId>,
    /// Bond count per particle.
    pub num_bond: Option<FieldId>,
    /// Bond types, `max_bonds_per_particle` columns.
    pub bond_type: Option<FieldId>,
    /// Bond partner tags, `max_bonds_per_particle` columns.
    pub bond_atom: Option<FieldId>,
    /// Angle count per particle.
    pub num_angle: Option<FieldId>,
    /// Angle types, `max_angles_per_particle` columns.
    pub angle_type: Option<FieldId>,
    /// Angle atom tags: `max_angles_per_particle` triples, flattened.
    pub angle_atom: Option<FieldId>,
    /// Dihedral count per particle.
    pub num_dihedral: Option<FieldId>,
    /// Dihedral types, `max_dihedrals_per_particle` columns.
    pub dihedral_type: Option<FieldId>,
    /// Dihedral atom tags: `max_dihedrals_per_particle` quadruples, flattened.
    pub dihedral_atom: Option<FieldId>,
    /// Improper count per particle.
    pub num_improper: Option<FieldId>,
    /// Improper types, `max_impropers_per_particle` columns.
    pub improper_type: Option<FieldId>,
    /// Improper atom tags: `max_impropers_per_particle` quadruples, flattened.
    pub improper_atom: Option<FieldId>,
    /// Special-neighbor counts (1-2, 1-3, 1-4), 3 columns.
    pub nspecial: Option<FieldId>,
    /// Special-neighbor tags, `max_special` columns.
    pub special: Option<FieldId>,
}

/// Count, type and atom-tuple fields of one topology kind.
type TopologyIds = (Option<FieldId>, Option<FieldId>, Option<FieldId>);

/// Register the three fields of a topology kind under `group` when `on`.
///
/// Each row of the atom field holds `width` tuples of `arity` tags.
fn add_topology(
    c: &mut SyncCoordinator,
    on: bool,
    group: FieldMask,
    kind: &str,
    width: usize,
    arity: usize,
    capacity: usize,
) -> Result<TopologyIds, SyncError> {
    if !on {
        return Ok((None, None, None));
    }
    let num = add::<i32>(c, group, &format!("num_{kind}"), 1, capacity)?;
    let ty = add::<i32>(c, group, &format!("{kind}_type"), width, capacity)?;
    let atom = add::<i64>(c, group, &format!("{kind}_atom"), arity * width, capacity)?;
    Ok((Some(num), Some(ty), Some(atom)))
}

fn add<T: Element>(
    c: &mut SyncCoordinator,
    group: FieldMask,
    name: &str,
    cols: usize,
    capacity: usize,
) -> Result<FieldId, SyncError> {
    c.register(
        group,
        DualField::<T>::new(name, FieldScope::PerParticle, cols, capacity),
    )
}

/// Register every field `layout` calls for.
///
/// The mass table is sized `atom_types + 1` with all rows live and starts
/// host-modified, so its first device read transfers it.
pub(crate) fn register(
    c: &mut SyncCoordinator,
    layout: &Layout,
    capacity: usize,
    atom_types: usize,
) -> Result<CoreFieldIds, SyncError> {
    let x = add::<f64>(c, FieldMask::X, "x", 3, capacity)?;
    let v = add::<f64>(c, FieldMask::V, "v", 3, capacity)?;
    let f = add::<f64>(c, FieldMask::F, "f", 3, capacity)?;
    let tag = add::<i64>(c, FieldMask::TAG, "tag", 1, capacity)?;
    let type_ = add::<i32>(c, FieldMask::TYPE, "type", 1, capacity)?;
    let mask = add::<i32>(c, FieldMask::MASK, "mask", 1, capacity)?;
    let image = add::<i64>(c, FieldMask::IMAGE, "image", 1, capacity)?;

    let rows = atom_types + 1;
    let table = DualField::<f64>::with_live_rows("mass", FieldScope::Table, 1, rows, rows);
    let type_mass = c.register(FieldMask::TYPE_MASS, table)?;
    c.mark_modified(Domain::Host, FieldMask::TYPE_MASS)?;

    let q = layout
        .charge
        .then(|| add::<f64>(c, FieldMask::Q, "q", 1, capacity))
        .transpose()?;
    let molecule = layout
        .molecule
        .then(|| add::<i64>(c, FieldMask::MOLECULE, "molecule", 1, capacity))
        .transpose()?;

    let (mut radius, mut rmass, mut omega, mut torque) = (None, None, None, None);
    if layout.sphere {
        radius = Some(add::<f64>(c, FieldMask::RADIUS, "radius", 1, capacity)?);
        rmass = Some(add::<f64>(c, FieldMask::RMASS, "rmass", 1, capacity)?);
        omega = Some(add::<f64>(c, FieldMask::OMEGA, "omega", 3, capacity)?);
        torque = Some(add::<f64>(c, FieldMask::TORQUE, "torque", 3, capacity)?);
    }
    let angmom = layout
        .angmom
        .then(|| add::<f64>(c, FieldMask::ANGMOM, "angmom", 3, capacity))
        .transpose()?;

    let (num_bond, bond_type, bond_atom) = add_topology(
        c,
        layout.bonds,
        FieldMask::BOND,
        "bond",
        layout.max_bonds_per_particle,
        1,
        capacity,
    )?;
    let (num_angle, angle_type, angle_atom) = add_topology(
        c,
        layout.angles,
        FieldMask::ANGLE,
        "angle",
        layout.max_angles_per_particle,
        3,
        capacity,
    )?;
    let (num_dihedral, dihedral_type, dihedral_atom) = add_topology(
        c,
        layout.dihedrals,
        FieldMask::DIHEDRAL,
        "dihedral",
        layout.max_dihedrals_per_particle,
        4,
        capacity,
    )?;
    let (num_improper, improper_type, improper_atom) = add_topology(
        c,
        layout.impropers,
        FieldMask::IMPROPER,
        "improper",
        layout.max_impropers_per_particle,
        4,
        capacity,
    )?;

    let (mut nspecial, mut special) = (None, None);
    if layout.special {
        nspecial = Some(add::<i32>(c, FieldMask::SPECIAL, "nspecial", 3, capacity)?);
        special = Some(add::<i64>(
            c,
            FieldMask::SPECIAL,
            "special",
            layout.max_special,
            capacity,
        )?);
    }

    Ok(CoreFieldIds {
        x,
        v,
        f,
        tag,
        type_,
        mask,
        image,
        type_mass,
        q,
        molecule,
        radius,
        rmass,
        omega,
        torque,
        angmom,
        num_bond,
        bond_type,
        bond_atom,
        num_angle,
        angle_type,
        angle_atom,
        num_dihedral,
        dihedral_type,
        dihedral_atom,
        num_improper,
        improper_type,
        improper_atom,
        nspecial,
        special,
    })
}
