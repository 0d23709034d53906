//! Late-storage analysis (§4.1.4, §9 open question 2).
//!
//! The original lacks a precise liveness analysis here; the specification
//! explicitly licenses leaving this a conservative stub. We do exactly
//! that: every occurrence whose active constraint is kept gets
//! `store_active_constraint = true` unless the constraint is already
//! flagged never-stored by §4.1.3 (in which case storing would be
//! contradictory — never-stored always wins).

use crate::catalog::{Catalog, ConstraintId};

/// Decides `store_active_constraint` for one occurrence whose active
/// constraint is `id` and is kept by its rule. `keep_active` must be
/// checked by the caller before calling this — a deleted active constraint
/// never reaches this decision (it is unconditionally not stored, §4.4).
pub fn store_active_constraint(catalog: &Catalog, id: ConstraintId) -> bool {
    !catalog.get(id).never_stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ConstraintDecl, Mode, Parameter};

    #[test]
    fn defaults_to_true_unless_never_stored() {
        let mut catalog = Catalog::new();
        let id = catalog
            .declare(ConstraintDecl::new(
                "a",
                vec![Parameter {
                    mode: Mode::Any,
                    type_text: "int".into(),
                }],
                vec![],
            ))
            .unwrap();
        assert!(store_active_constraint(&catalog, id));
        catalog.get_mut(id).never_stored = true;
        assert!(!store_active_constraint(&catalog, id));
    }
}
