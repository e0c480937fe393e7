//! Utility Module
//!
//! This module provides small building blocks shared by the skeleton and
//! animation modules:
//!
//! - [`topo_sort`]: Dependency ordering of directed edge sets
//! - [`ChangeTracker`]: Monotonic version counter for change detection
//!
//! # Topological Sort
//!
//! ```rust,ignore
//! use myth_skeleton::utils::topological_sort;
//!
//! let result = topological_sort::<u32, _>(&[(0, 1), (1, 2)]);
//! assert_eq!(result.order, vec![0, 1, 2]);
//! assert!(result.is_complete());
//! ```

pub mod topo_sort;
pub mod version;

pub use topo_sort::{GraphEdge, TopoResult, topological_sort};
pub use version::ChangeTracker;
