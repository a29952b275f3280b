//! # Keel Syntax Tree
//!
//! The tree handed over by the external front end. The compiler never
//! mutates it; inferred types live in a side table keyed by [`node::NodeId`].
//!
//! Trees travel between the front end and the compiler as postcard blobs.

pub mod build;
pub mod node;

pub use build::TreeBuilder;
pub use node::{Expr, ExprKind, NodeId, Position, SourceTree, Stmt, StmtKind};
