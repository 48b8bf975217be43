//! Plant module: the root forest of one plant, stored using the arena pattern.

use crate::model::root::{Root, RootIndex, PRIMARY_ORDER};
use std::collections::HashMap;


// =#========================================================================#=
// PLANT
// =#========================================================================#=
/// A plant with its forest of [Root]s.
///
/// Roots are stored in a contiguous vector and referenced by [RootIndex].
/// The arena doubles as the flat root set of the plant; lookup by identifier
/// goes through a hash map kept in sync with the arena.
///
/// # Structure
/// - Order-1 roots are listed as `primaries`, each the top of one tree
/// - Every other root has a parent in the same arena
/// - Roots are only ever appended, so indices stay stable
///
/// # Example
/// ```
/// use rsmltrack::model::geometry::{Geometry, Point};
/// use rsmltrack::model::plant::Plant;
/// use rsmltrack::model::root::Root;
///
/// let mut plant = Plant::new("1", "plant");
/// let shape = Geometry::from_points(vec![Point::new(0.0, 0.0), Point::new(0.0, 10.0)]);
/// let primary = plant.add_root(None, Root::new("1.1", "root", shape.clone()));
/// let lateral = plant.add_root(Some(primary), Root::new("1.1.1", "lat", shape));
///
/// assert_eq!(plant[lateral].order(), 2);
/// assert_eq!(plant.root_by_id("1.1.1").map(|r| r.index()), Some(lateral));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plant {
    id: String,
    label: String,
    /// All roots of this plant (arena pattern)
    roots: Vec<Root>,
    /// Indices of the order-1 roots
    primaries: Vec<RootIndex>,
    /// Root identifier to arena index
    by_id: HashMap<String, RootIndex>,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl Plant {
    /// Creates an empty plant.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    /// Adds a root to the plant, assigning index and branching order, which
    /// gets returned.
    ///
    /// # Arguments
    /// * `parent` - Index of the parent root, or `None` to attach to the plant
    /// * `root` - The root to add; its index, order and parent are overwritten
    ///
    /// # Returns
    /// The index of the newly added root.
    ///
    /// # Panics
    /// Panics if `parent` is not a valid index of this plant.
    pub fn add_root(&mut self, parent: Option<RootIndex>, mut root: Root) -> RootIndex {
        let index = self.roots.len();
        root.index = index;
        root.parent = parent;
        root.children.clear();

        match parent {
            Some(parent_index) => {
                root.order = self[parent_index].order + 1;
                self[parent_index].children.push(index);
            }
            None => {
                root.order = PRIMARY_ORDER;
                self.primaries.push(index);
            }
        }

        self.by_id.insert(root.id.clone(), index);
        self.roots.push(root);
        index
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the number of roots over all orders.
    pub fn num_roots(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Returns the indices of the order-1 roots.
    pub fn primaries(&self) -> &[RootIndex] {
        &self.primaries
    }

    /// Returns all roots in arena order (flat root set).
    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    /// Returns the root with identifier `id`.
    ///
    /// If reconciliation gave two roots the same identifier, the one
    /// renamed last is returned.
    pub fn root_by_id(&self, id: &str) -> Option<&Root> {
        self.by_id.get(id).map(|&index| &self.roots[index])
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Overwrites the identifier of the root at `index`, keeping the lookup
    /// table in sync.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn set_root_id(&mut self, index: RootIndex, id: impl Into<String>) {
        let id = id.into();
        let old = std::mem::replace(&mut self.roots[index].id, id.clone());
        if self.by_id.get(&old) == Some(&index) {
            self.by_id.remove(&old);
        }
        self.by_id.insert(id, index);
    }

    /// Returns the indices of all roots in the subtree below `index`,
    /// excluding `index` itself.
    pub fn descendants(&self, index: RootIndex) -> Vec<RootIndex> {
        let mut found = Vec::new();
        let mut stack: Vec<RootIndex> = self[index].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            found.push(current);
            stack.extend(self[current].children.iter().rev());
        }
        found
    }

    /// Trims the function list of every root to the smallest number of
    /// functions found on any root of this plant.
    pub fn trim_functions(&mut self) {
        let Some(min) = self.roots.iter().map(|root| root.functions.len()).min() else {
            return;
        };
        for root in &mut self.roots {
            root.functions.truncate(min);
        }
    }

    /// Multiplies every root coordinate by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for root in &mut self.roots {
            root.geometry_mut().scale(factor);
        }
    }

    /// Checks the arena invariants.
    ///
    /// Checks:
    /// - Each root's index matches its arena position
    /// - Order-1 roots have no parent and are listed as primaries
    /// - Every other root's order is its parent's order plus one and its parent lists it as child
    /// - Every root is reachable from a primary
    ///
    /// # Returns
    /// `true` if the plant is consistent, `false` otherwise
    pub fn is_valid(&self) -> bool {
        for (index, root) in self.roots.iter().enumerate() {
            if root.index != index {
                return false;
            }
            match root.parent {
                None => {
                    if root.order != PRIMARY_ORDER || !self.primaries.contains(&index) {
                        return false;
                    }
                }
                Some(parent) => {
                    if parent >= self.roots.len() {
                        return false;
                    }
                    let parent = &self.roots[parent];
                    if root.order != parent.order + 1 || !parent.children.contains(&index) {
                        return false;
                    }
                }
            }
        }

        self.pre_order_iter().count() == self.roots.len()
    }

    /// Returns an iterator over all roots in pre-order (parents before
    /// children), visiting the trees of the primaries in insertion order.
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }
}

impl std::ops::Index<RootIndex> for Plant {
    type Output = Root;

    fn index(&self, index: RootIndex) -> &Self::Output {
        &self.roots[index]
    }
}

impl std::ops::IndexMut<RootIndex> for Plant {
    fn index_mut(&mut self, index: RootIndex) -> &mut Self::Output {
        &mut self.roots[index]
    }
}


// =#========================================================================#=
// ITERATOR
// =#========================================================================#=
/// Iterator over the roots of a [Plant] in pre-order.
pub struct PreOrderIter<'a> {
    plant: &'a Plant,
    stack: Vec<RootIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(plant: &'a Plant) -> Self {
        let stack = plant.primaries.iter().rev().copied().collect();
        PreOrderIter { plant, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a Root;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let root = &self.plant[index];

        // Push children in reverse, so the first child is visited first
        self.stack.extend(root.children.iter().rev());

        Some(root)
    }
}
