//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`SkeletonError`] covers the failures that can occur
//! while a skeleton or an animation packet is being set up:
//! - Bone hierarchies whose parent links contain a cycle
//! - Animation packets referencing clips or nodes that do not exist
//! - Name collisions in the packet registries
//!
//! Per-frame evaluation never reports errors. Degenerate data (zero-length
//! intervals, empty tracks, zero-norm rotations) falls back to a defined
//! pose instead, and misuse of ids is caught by assertions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_skeleton::errors::{SkeletonError, Result};
//!
//! fn build() -> Result<()> {
//!     hierarchy.validate()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for skeleton and animation setup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkeletonError {
    // ========================================================================
    // Hierarchy Errors
    // ========================================================================
    /// The bone parent links form a cycle, so some bones have no evaluation order.
    #[error("Bone hierarchy contains a cycle: {ordered} of {total} bones could be ordered")]
    CyclicHierarchy {
        /// Number of bones that received a position in the evaluation order
        ordered: usize,
        /// Number of live bones in the hierarchy
        total: usize,
    },

    // ========================================================================
    // Packet Errors
    // ========================================================================
    /// A clip node refers to an animation that is not registered in the packet.
    #[error("Animation not found: {0}")]
    AnimationNotFound(String),

    /// A node with the given name does not exist.
    #[error("Animation node not found: {0}")]
    NodeNotFound(String),

    /// A node factory (indirectly) lists itself as one of its children.
    #[error("Animation node references itself: {0}")]
    RecursiveNode(String),

    /// The packet factory has no root node to instantiate.
    #[error("Animation packet has no root node")]
    MissingRoot,

    /// A clip or node with this name is already registered.
    #[error("Name already registered: {0}")]
    DuplicateName(String),

    /// A state machine was asked for a state it does not have.
    #[error("Invalid state id: {0}")]
    InvalidState(u32),
}

/// Alias for `Result<T, SkeletonError>`.
pub type Result<T> = std::result::Result<T, SkeletonError>;
