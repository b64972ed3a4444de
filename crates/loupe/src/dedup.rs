//! Duplicate grouping.
//!
//! [`DuplicateClusterer`] keeps a partition of the active catalog IDs. Two
//! IDs land in the same [`DuplicateGroup`] when a chain of neighbor matches
//! at or above the dedup threshold links them.
//!
//! The structure is a disjoint-set forest over slots with path compression
//! and union by size. Each root also owns the slot list of its members, which
//! makes group enumeration proportional to the group and lets an ID leave its
//! group without disturbing the others.

use std::collections::HashMap;

use loupe_vector::CatalogId;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A set of catalog IDs considered duplicates of each other, sorted by ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DuplicateGroup {
    members: Vec<CatalogId>,
}

impl DuplicateGroup {
    fn new(mut members: Vec<CatalogId>) -> Self {
        members.sort();
        Self { members }
    }

    /// The members, sorted.
    #[must_use]
    pub fn members(&self) -> &[CatalogId] {
        &self.members
    }

    /// Number of members. Always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Groups are never empty; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `id` is a member.
    #[must_use]
    pub fn contains(&self, id: &CatalogId) -> bool {
        self.members.binary_search(id).is_ok()
    }

    /// The smallest member ID, used as a stable label for the group.
    #[must_use]
    pub fn representative(&self) -> Option<&CatalogId> {
        self.members.first()
    }

    /// Whether the group holds more than one ID.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.members.len() > 1
    }
}

impl IntoIterator for DuplicateGroup {
    type Item = CatalogId;
    type IntoIter = std::vec::IntoIter<CatalogId>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

#[derive(Debug)]
struct Slot {
    id: Option<CatalogId>,
    parent: usize,
    /// Member slots; non-empty only on roots.
    members: Vec<usize>,
}

/// Union-find partition of catalog IDs.
#[derive(Debug, Default)]
pub struct DuplicateClusterer {
    slots: Vec<Slot>,
    index: HashMap<CatalogId, usize>,
    free: Vec<usize>,
    groups: usize,
}

impl DuplicateClusterer {
    /// Create an empty partition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked IDs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no IDs are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of groups, singletons included.
    #[must_use]
    pub const fn group_count(&self) -> usize {
        self.groups
    }

    /// Whether `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: &CatalogId) -> bool {
        self.index.contains_key(id)
    }

    /// Track `id` as a singleton group. Returns `false` if it was already
    /// tracked, leaving its group unchanged.
    pub fn insert(&mut self, id: &CatalogId) -> bool {
        if self.index.contains_key(id) {
            return false;
        }
        let slot = if let Some(slot) = self.free.pop() {
            self.slots[slot] = Slot { id: Some(id.clone()), parent: slot, members: vec![slot] };
            slot
        } else {
            let slot = self.slots.len();
            self.slots.push(Slot { id: Some(id.clone()), parent: slot, members: vec![slot] });
            slot
        };
        self.index.insert(id.clone(), slot);
        self.groups += 1;
        true
    }

    /// Merge the groups of `a` and `b`. Returns `true` if they were separate.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if either ID is not tracked.
    pub fn union(&mut self, a: &CatalogId, b: &CatalogId) -> Result<bool> {
        let a = self.slot(a)?;
        let b = self.slot(b)?;
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return Ok(false);
        }

        let (large, small) = if self.slots[root_a].members.len() >= self.slots[root_b].members.len()
        {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        let moved = std::mem::take(&mut self.slots[small].members);
        self.slots[small].parent = large;
        self.slots[large].members.extend(moved);
        self.groups -= 1;
        Ok(true)
    }

    /// Whether `a` and `b` share a group. Untracked IDs share nothing.
    #[must_use]
    pub fn same_group(&self, a: &CatalogId, b: &CatalogId) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&a), Some(&b)) => self.root(a) == self.root(b),
            _ => false,
        }
    }

    /// The group of `id`, or `None` if it is not tracked.
    #[must_use]
    pub fn group_of(&self, id: &CatalogId) -> Option<DuplicateGroup> {
        let slot = *self.index.get(id)?;
        Some(self.group_at(self.root(slot)))
    }

    /// Size of the group of `id`, or 0 if it is not tracked.
    #[must_use]
    pub fn group_size(&self, id: &CatalogId) -> usize {
        self.index.get(id).map_or(0, |&slot| self.slots[self.root(slot)].members.len())
    }

    /// Every group, ordered by representative.
    #[must_use]
    pub fn all_groups(&self) -> Vec<DuplicateGroup> {
        self.collect_groups(1)
    }

    /// Groups with at least two members, ordered by representative.
    #[must_use]
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        self.collect_groups(2)
    }

    /// Drop `id` from the partition. The rest of its group stays together
    /// under a new root; nothing is re-evaluated. Returns `false` if `id`
    /// was not tracked.
    pub fn remove(&mut self, id: &CatalogId) -> bool {
        let Some(slot) = self.index.remove(id) else {
            return false;
        };
        let root = self.find(slot);
        let mut members = std::mem::take(&mut self.slots[root].members);
        members.retain(|&m| m != slot);

        if members.is_empty() {
            self.groups -= 1;
        } else {
            let new_root = if root == slot { members[0] } else { root };
            for &member in &members {
                self.slots[member].parent = new_root;
            }
            self.slots[new_root].members = members;
        }

        self.slots[slot] = Slot { id: None, parent: slot, members: Vec::new() };
        self.free.push(slot);
        true
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.free.clear();
        self.groups = 0;
    }

    /// Verify that the groups partition the tracked IDs.
    ///
    /// # Errors
    ///
    /// [`Error::InvariantViolation`] describing the first inconsistency.
    pub fn check_invariants(&self) -> Result<()> {
        let mut owner: HashMap<usize, usize> = HashMap::with_capacity(self.index.len());
        let mut roots = 0;

        for (root, slot) in self.slots.iter().enumerate() {
            if slot.members.is_empty() {
                continue;
            }
            if slot.parent != root {
                return Err(Error::invariant(format!("slot {root} lists members but is not a root")));
            }
            roots += 1;
            for &member in &slot.members {
                if let Some(previous) = owner.insert(member, root) {
                    let id = self.slots[member].id.as_ref().map_or("<vacant>", CatalogId::as_str);
                    return Err(Error::invariant(format!(
                        "{id} belongs to the groups rooted at {previous} and {root}"
                    )));
                }
                if self.root(member) != root {
                    return Err(Error::invariant(format!(
                        "slot {member} is listed under {root} but its root is {}",
                        self.root(member)
                    )));
                }
            }
        }

        for (id, &slot) in &self.index {
            if self.slots[slot].id.as_ref() != Some(id) {
                return Err(Error::invariant(format!("{id} maps to a slot holding another id")));
            }
            if !owner.contains_key(&slot) {
                return Err(Error::invariant(format!("{id} is in no group")));
            }
        }
        if owner.len() != self.index.len() {
            return Err(Error::invariant(format!(
                "{} grouped slots for {} tracked ids",
                owner.len(),
                self.index.len()
            )));
        }
        if roots != self.groups {
            return Err(Error::invariant(format!(
                "{roots} roots but {} groups counted",
                self.groups
            )));
        }
        Ok(())
    }

    fn slot(&self, id: &CatalogId) -> Result<usize> {
        self.index.get(id).copied().ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn root(&self, mut slot: usize) -> usize {
        while self.slots[slot].parent != slot {
            slot = self.slots[slot].parent;
        }
        slot
    }

    /// Root of `slot`, pointing every slot on the way directly at it.
    fn find(&mut self, slot: usize) -> usize {
        let root = self.root(slot);
        let mut current = slot;
        while current != root {
            let next = self.slots[current].parent;
            self.slots[current].parent = root;
            current = next;
        }
        root
    }

    fn group_at(&self, root: usize) -> DuplicateGroup {
        DuplicateGroup::new(
            self.slots[root].members.iter().filter_map(|&m| self.slots[m].id.clone()).collect(),
        )
    }

    fn collect_groups(&self, min_size: usize) -> Vec<DuplicateGroup> {
        let mut groups: Vec<DuplicateGroup> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(root, slot)| slot.parent == *root && slot.members.len() >= min_size)
            .map(|(root, _)| self.group_at(root))
            .collect();
        groups.sort_by(|a, b| a.representative().cmp(&b.representative()));
        groups
    }
}
