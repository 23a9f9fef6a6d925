//! The graph coordinator.
//!
//! `Graph` owns the node block pool and three families of Boolean matrices:
//! one adjacency matrix for untyped connectivity, one matrix per relation
//! type holding the typed subset of the adjacency, and one diagonal matrix
//! per label. All matrices share the square dimension `node_count`, and the
//! accessors resize a matrix on the way out so a handed-out handle is always
//! consistent with the live node count.

use std::fmt;
use std::ops::{Deref, Index, IndexMut};

use fixedbitset::FixedBitSet;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::block_pool::{BlockPool, NodeId, NodeIter};
use crate::matrix::BitMatrix;

/// Index of a relation (edge type) matrix.
pub type RelationId = usize;
/// Index of a label matrix.
pub type LabelId = usize;

/// A read handle on one of a graph's matrices.
///
/// Dereferences to [`BitMatrix`]; the handle is read-only, so holders can
/// query and extract but never resize the matrix out from under the graph.
pub struct MatrixRef<'a>(RwLockReadGuard<'a, BitMatrix>);

impl<'a> Deref for MatrixRef<'a> {
    type Target = BitMatrix;

    #[inline]
    fn deref(&self) -> &BitMatrix {
        &self.0
    }
}

/// An in-memory labeled property graph backed by Boolean sparse matrices.
///
/// `N` is the node property payload; it is owned by the node pool and
/// dropped with the graph. Node ids are dense: they always form the
/// interval `[0, node_count)`, and bulk deletion restores this by moving
/// the highest surviving nodes into the vacated slots.
///
/// Mutation goes through `&mut self` and must be serialised by the caller
/// against readers, which is exactly what the borrow checker enforces. The
/// one internally synchronised path is the resize-on-access of the matrix
/// accessors, guarded by a single per-graph mutex.
pub struct Graph<N> {
    pool: BlockPool<N>,
    adjacency: RwLock<BitMatrix>,
    relations: Vec<RwLock<BitMatrix>>,
    labels: Vec<RwLock<BitMatrix>>,
    resize_lock: Mutex<()>,
}

/// Bring an exclusively owned matrix to the target dimension.
fn refresh(matrix: &mut RwLock<BitMatrix>, dim: usize) -> &mut BitMatrix {
    let m = matrix.get_mut();
    if m.dim() != dim {
        m.resize(dim);
    }
    m
}

impl<N> Graph<N> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty graph with room for at least `nodes` nodes before
    /// block storage has to grow.
    pub fn with_capacity(nodes: usize) -> Self {
        let pool = BlockPool::with_capacity(nodes);
        let adjacency = BitMatrix::with_capacity(pool.capacity());
        Graph {
            pool,
            adjacency: RwLock::new(adjacency),
            relations: Vec::new(),
            labels: Vec::new(),
            resize_lock: Mutex::new(()),
        }
    }

    /// Number of live nodes; the dimension of every matrix.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.pool.len()
    }

    /// Number of allocated node slots.
    #[inline]
    pub fn node_capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Number of relation matrices.
    #[inline]
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Number of label matrices.
    #[inline]
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Number of edges recorded in the adjacency matrix.
    pub fn edge_count(&self) -> usize {
        self.adjacency_matrix().nvals()
    }

    /// Allocate a matrix for a new relation type and return its id.
    pub fn add_relation(&mut self) -> RelationId {
        self.relations.push(RwLock::new(self.fresh_matrix()));
        self.relations.len() - 1
    }

    /// Allocate a matrix for a new label and return its id.
    pub fn add_label(&mut self) -> LabelId {
        self.labels.push(RwLock::new(self.fresh_matrix()));
        self.labels.len() - 1
    }

    fn fresh_matrix(&self) -> BitMatrix {
        let mut m = BitMatrix::with_capacity(self.pool.capacity());
        m.resize(self.pool.len());
        m
    }

    /// Create `count` unlabeled nodes with default weights and return a
    /// cursor over them.
    pub fn create_nodes(&mut self, count: usize) -> NodeIter<'_, N>
    where
        N: Default,
    {
        let start = self.grow(count);
        self.pool.iter(start, start + count, 1)
    }

    /// Create one node per entry of `labels`, applying the given label
    /// where one is present, and return a cursor over the new nodes.
    ///
    /// **Panics** if a label id is out of bounds.
    pub fn create_nodes_with_labels(&mut self, labels: &[Option<LabelId>]) -> NodeIter<'_, N>
    where
        N: Default,
    {
        for &label in labels.iter().flatten() {
            assert!(label < self.labels.len(), "label {} does not exist", label);
        }
        let start = self.grow(labels.len());
        let count = self.pool.len();
        for (offset, &label) in labels.iter().enumerate() {
            if let Some(label) = label {
                let id = start + offset;
                refresh(&mut self.labels[label], count).insert(id, id);
            }
        }
        self.pool.iter(start, start + labels.len(), 1)
    }

    /// Grow block storage, append `count` default nodes and bring the
    /// adjacency matrix up to the new dimension. Returns the first new id.
    fn grow(&mut self, count: usize) -> NodeId
    where
        N: Default,
    {
        let start = self.pool.len();
        // Materialise any resize still pending from an earlier deletion:
        // once the count moves past it, a stale dimension would look
        // current again and keep its dead entries.
        self.refresh_all(start);
        self.pool.grow_to(start + count);
        for _ in 0..count {
            self.pool.push(N::default());
        }
        refresh(&mut self.adjacency, self.pool.len());
        start
    }

    fn refresh_all(&mut self, dim: usize) {
        refresh(&mut self.adjacency, dim);
        for matrix in &mut self.relations {
            refresh(matrix, dim);
        }
        for matrix in &mut self.labels {
            refresh(matrix, dim);
        }
    }

    /// Record a batch of edges, each `(src, dest, relation)`.
    ///
    /// Every edge is entered into the adjacency matrix; a typed edge is
    /// additionally entered into its relation matrix. Re-connecting an
    /// existing pair is a no-op.
    ///
    /// **Panics** if a node or relation id is out of bounds.
    pub fn connect_nodes(&mut self, edges: &[(NodeId, NodeId, Option<RelationId>)]) {
        let count = self.pool.len();
        for &(src, dest, relation) in edges {
            assert!(
                src < count && dest < count,
                "edge ({}, {}) references a nonexistent node",
                src,
                dest
            );
            refresh(&mut self.adjacency, count).insert(dest, src);
            if let Some(relation) = relation {
                assert!(
                    relation < self.relations.len(),
                    "relation {} does not exist",
                    relation
                );
                refresh(&mut self.relations[relation], count).insert(dest, src);
            }
        }
    }

    /// Delete the edge from `src` to `dest`.
    ///
    /// With `relation == None` the edge is removed from the adjacency
    /// matrix and every relation matrix. With a specific relation, only
    /// that matrix is cleared; the adjacency entry is kept as long as any
    /// other relation still records the pair.
    ///
    /// Returns false (and changes nothing) if the pair is not connected.
    ///
    /// **Panics** if a node or relation id is out of bounds.
    pub fn delete_edge(&mut self, src: NodeId, dest: NodeId, relation: Option<RelationId>) -> bool {
        let count = self.pool.len();
        assert!(
            src < count && dest < count,
            "edge ({}, {}) references a nonexistent node",
            src,
            dest
        );
        if !refresh(&mut self.adjacency, count).contains(dest, src) {
            return false;
        }
        match relation {
            None => {
                self.adjacency.get_mut().remove(dest, src);
                for matrix in &mut self.relations {
                    refresh(matrix, count).remove(dest, src);
                }
            }
            Some(relation) => {
                assert!(
                    relation < self.relations.len(),
                    "relation {} does not exist",
                    relation
                );
                refresh(&mut self.relations[relation], count).remove(dest, src);
                let still_typed = self
                    .relations
                    .iter_mut()
                    .any(|matrix| refresh(matrix, count).contains(dest, src));
                if !still_typed {
                    self.adjacency.get_mut().remove(dest, src);
                }
            }
        }
        true
    }

    /// Delete a batch of nodes and restore the dense id interval.
    ///
    /// `ids` must be sorted ascending and free of duplicates. Each vacated
    /// slot below the post-deletion count is filled by the highest
    /// surviving node: its row and column are migrated in the adjacency
    /// and every relation matrix, its diagonal bit in every label matrix,
    /// and its record is moved down in the pool with its id rewritten.
    /// Every incident edge of a deleted node dies with it.
    ///
    /// The adjacency matrix is resized immediately; the other matrices
    /// shrink on their next access.
    ///
    /// **Panics** if `ids` is unsorted, has duplicates, or references a
    /// nonexistent node.
    pub fn delete_nodes(&mut self, ids: &[NodeId]) {
        if ids.is_empty() {
            return;
        }
        let count = self.pool.len();
        assert!(
            ids.windows(2).all(|pair| pair[0] < pair[1]),
            "deletion ids must be sorted ascending without duplicates"
        );
        assert!(
            ids[ids.len() - 1] < count,
            "node id {} out of bounds",
            ids[ids.len() - 1]
        );

        let post = count - ids.len();

        // Every matrix takes part in the migration, so none of them may
        // lag behind the current dimension.
        self.refresh_all(count);

        // Two-pointer sweep: `to_replace_idx` walks the deletion list
        // upward over the slots to refill, `id_to_save` walks the
        // surviving high ids downward, skipping candidates that are
        // themselves scheduled for deletion. Whenever a relocation
        // happens, `ids[to_replace_idx] < post <= id_to_save`, which keeps
        // the unsigned arithmetic in range.
        let mut to_replace_idx = 0;
        let mut largest_delete_idx = ids.len() - 1;
        let mut id_to_save = count - 1;

        while to_replace_idx < ids.len() && ids[to_replace_idx] < post {
            while id_to_save == ids[largest_delete_idx] {
                id_to_save -= 1;
                if largest_delete_idx == 0 {
                    break;
                }
                largest_delete_idx -= 1;
            }
            self.relocate(id_to_save, ids[to_replace_idx]);
            to_replace_idx += 1;
            id_to_save -= 1;
        }

        self.pool.truncate(post);
        refresh(&mut self.adjacency, post);
    }

    /// Move node `src` into slot `dest` in every matrix and in the pool.
    fn relocate(&mut self, src: NodeId, dest: NodeId) {
        migrate(self.adjacency.get_mut(), src, dest);
        for matrix in &mut self.relations {
            migrate(matrix.get_mut(), src, dest);
        }
        for matrix in &mut self.labels {
            let m = matrix.get_mut();
            let src_labeled = m.contains(src, src);
            let dest_labeled = m.contains(dest, dest);
            if src_labeled && !dest_labeled {
                m.insert(dest, dest);
            } else if dest_labeled && !src_labeled {
                m.remove(dest, dest);
            }
        }
        self.pool.swap(src, dest);
    }

    /// Apply the given label to every node in the inclusive id range
    /// `[start, end]` and return a cursor over the range.
    ///
    /// **Panics** if the range or label id is out of bounds.
    pub fn label_nodes(&mut self, start: NodeId, end: NodeId, label: LabelId) -> NodeIter<'_, N> {
        let count = self.pool.len();
        assert!(start <= end && end < count, "node range out of bounds");
        assert!(label < self.labels.len(), "label {} does not exist", label);
        let matrix = refresh(&mut self.labels[label], count);
        for id in start..=end {
            matrix.insert(id, id);
        }
        self.pool.iter(start, end + 1, 1)
    }

    /// A cursor over all nodes in ascending id order.
    pub fn nodes(&self) -> NodeIter<'_, N> {
        self.pool.iter(0, self.pool.len(), 1)
    }

    /// Access the weight of node `id`.
    ///
    /// Also available with indexing syntax: `&graph[id]`.
    ///
    /// **Panics** if the node doesn't exist.
    pub fn node_weight(&self, id: NodeId) -> &N {
        &self.pool.get(id).weight
    }

    /// Access the weight of node `id`, mutably.
    ///
    /// Also available with indexing syntax: `&mut graph[id]`.
    ///
    /// **Panics** if the node doesn't exist.
    pub fn node_weight_mut(&mut self, id: NodeId) -> &mut N {
        &mut self.pool.get_mut(id).weight
    }

    /// Return true if there is an edge from `src` to `dest`.
    ///
    /// **Panics** if either node doesn't exist.
    pub fn has_edge(&self, src: NodeId, dest: NodeId) -> bool {
        self.adjacency_matrix().contains(dest, src)
    }

    /// The destinations reachable from `src` over one edge, as a mask over
    /// node ids. This is the column extract of the adjacency matrix.
    pub fn outgoing(&self, src: NodeId) -> FixedBitSet {
        self.adjacency_matrix().extract_column(src)
    }

    /// The sources with an edge into `dest`, as a mask over node ids.
    pub fn incoming(&self, dest: NodeId) -> FixedBitSet {
        self.adjacency_matrix().extract_row(dest)
    }

    /// The adjacency matrix, resized to the current node count.
    pub fn adjacency_matrix(&self) -> MatrixRef<'_> {
        self.read_synced(&self.adjacency)
    }

    /// The matrix of the given relation, resized to the current node count.
    ///
    /// **Panics** if the relation doesn't exist.
    pub fn relation_matrix(&self, relation: RelationId) -> MatrixRef<'_> {
        assert!(
            relation < self.relations.len(),
            "relation {} does not exist",
            relation
        );
        self.read_synced(&self.relations[relation])
    }

    /// The matrix of the given label, resized to the current node count.
    ///
    /// **Panics** if the label doesn't exist.
    pub fn label_matrix(&self, label: LabelId) -> MatrixRef<'_> {
        assert!(label < self.labels.len(), "label {} does not exist", label);
        self.read_synced(&self.labels[label])
    }

    /// Force every matrix up to the current node count and materialise its
    /// entry count, so external readers that keep matrix handles across
    /// mutations observe consistent dimensions.
    pub fn synchronize(&self) {
        let _ = self.adjacency_matrix().nvals();
        for relation in 0..self.relations.len() {
            let _ = self.relation_matrix(relation).nvals();
        }
        for label in 0..self.labels.len() {
            let _ = self.label_matrix(label).nvals();
        }
    }

    /// Hand out a read handle whose dimension matches the node count,
    /// resizing first if the matrix lags behind.
    fn read_synced<'a>(&'a self, matrix: &'a RwLock<BitMatrix>) -> MatrixRef<'a> {
        let dim = self.pool.len();
        {
            let m = matrix.read();
            if m.dim() == dim {
                return MatrixRef(m);
            }
        }
        // Double-checked: take the graph resize lock, then re-test under
        // the write lock, since a concurrent reader may have resized while
        // we waited.
        let _resize = self.resize_lock.lock();
        {
            let mut m = matrix.write();
            if m.dim() != dim {
                m.resize(dim);
            }
        }
        MatrixRef(matrix.read())
    }
}

/// Move row and column `src` onto row and column `dest`: the destination
/// column is cleared, then the source row and column are copied over. The
/// source's own row and column are left for the following shrink to clear.
fn migrate(matrix: &mut BitMatrix, src: NodeId, dest: NodeId) {
    matrix.clear_column(dest);
    let row = matrix.extract_row(src);
    matrix.assign_row(dest, &row);
    let column = matrix.extract_column(src);
    matrix.assign_column(dest, &column);
}

impl<N> Default for Graph<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Index the graph by node id to access node weights.
///
/// **Panics** if the node doesn't exist.
impl<N> Index<NodeId> for Graph<N> {
    type Output = N;

    fn index(&self, id: NodeId) -> &N {
        self.node_weight(id)
    }
}

/// Index the graph by node id to access node weights, mutably.
///
/// **Panics** if the node doesn't exist.
impl<N> IndexMut<NodeId> for Graph<N> {
    fn index_mut(&mut self, id: NodeId) -> &mut N {
        self.node_weight_mut(id)
    }
}

impl<N> fmt::Debug for Graph<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.pool.len())
            .field("node_capacity", &self.pool.capacity())
            .field("relations", &self.relations.len())
            .field("labels", &self.labels.len())
            .finish()
    }
}
