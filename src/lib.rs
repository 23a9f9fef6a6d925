//! **bitgraph** is an in-memory, labeled property-graph store whose edges
//! live in Boolean sparse matrices.
//!
//! The central type is [`Graph`]: nodes carry arbitrary associated data and
//! a dense integer id, edges are entries in a family of square
//! [`BitMatrix`] matrices sharing the dimension `node_count`: one
//! adjacency matrix for untyped connectivity, one matrix per relation type
//! for the typed subset, and one diagonal matrix per label. The matrices
//! are exposed read-only for linear-algebra traversal clients.
//!
//! The encoding convention is column = source, row = destination:
//! `A[d, s]` is true iff there is an edge from `s` to `d`, so following the
//! outgoing edges of `s` is the column extract `A · e_s`.
//!
//! Node records live in a chained pool of fixed-capacity blocks
//! ([`BlockPool`]), which keeps a node's address stable for its lifetime
//! while its id stays a valid matrix index. Bulk deletion compacts the id
//! space by relocating the highest surviving nodes into the vacated slots,
//! rewriting the affected matrix rows and columns in place.
//!
//! Precondition violations (out-of-range ids, unsorted deletion input) are
//! programmer errors and panic; there are no recoverable errors at this
//! layer.

pub mod block_pool;
pub mod graph;
pub mod matrix;

pub use crate::block_pool::{BlockPool, Node, NodeId, NodeIter, BLOCK_CAP};
pub use crate::graph::{Graph, LabelId, MatrixRef, RelationId};
pub use crate::matrix::BitMatrix;
