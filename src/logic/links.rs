use std::collections::{BTreeSet, HashMap};

use crate::model::{Category, Id};

/// Plan for re-pointing the model↔category association. `detach` and
/// `attach` are applied in that order, so a category present in both the
/// previous and the proposed set is never transiently lost or duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRelink {
    pub detach: BTreeSet<Id>,
    pub attach: BTreeSet<Id>,
}

impl CategoryRelink {
    pub fn for_create(categories: &BTreeSet<Id>) -> Self {
        Self {
            detach: BTreeSet::new(),
            attach: categories.clone(),
        }
    }

    /// An update drops every previously-held link before re-attaching the
    /// full proposed set.
    pub fn for_update(previous: &BTreeSet<Id>, proposed: &BTreeSet<Id>) -> Self {
        Self {
            detach: previous.clone(),
            attach: proposed.clone(),
        }
    }
}

/// Applies a relink plan to both sides of the association in one pass.
/// After the call, `model_categories` equals the plan's attach set minus
/// nothing, and every touched category's model set agrees with it.
pub fn apply_relink(
    model_id: Id,
    model_categories: &mut BTreeSet<Id>,
    categories: &mut HashMap<Id, Category>,
    plan: &CategoryRelink,
) {
    for id in &plan.detach {
        if let Some(category) = categories.get_mut(id) {
            category.models.remove(&model_id);
        }
        model_categories.remove(id);
    }
    for id in &plan.attach {
        if let Some(category) = categories.get_mut(id) {
            category.models.insert(model_id);
        }
        model_categories.insert(*id);
    }
}
