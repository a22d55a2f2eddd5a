//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! Errors are only produced while *building* things: validating a model
//! descriptor or wiring up an animator. The per-frame pipeline (morphs, bone
//! hierarchy, IK, physics sync, skinning) never fails; it degrades silently
//! so that one bad reference cannot abort a whole frame.
//!
//! ```rust,ignore
//! use marionette::errors::Result;
//! use marionette::model::ModelDataBuilder;
//!
//! fn load() -> Result<()> {
//!     let data = ModelDataBuilder::new().build()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarionetteError {
    // ========================================================================
    // Descriptor Validation Errors
    // ========================================================================
    /// An index stored in a descriptor points outside its target array.
    #[error("Index out of bounds: {context} (index: {index})")]
    IndexOutOfBounds {
        /// Description of what was being referenced
        context: String,
        /// The invalid index
        index: usize,
    },

    /// A parent bone would be resolved after its child in deform order.
    #[error("Bone {bone} deforms before its parent {parent}")]
    DeformOrderViolation {
        /// Index of the child bone
        bone: usize,
        /// Index of the offending parent
        parent: usize,
    },

    /// A morph payload is inconsistent (e.g. a group morph referencing itself).
    #[error("Invalid morph {index}: {reason}")]
    InvalidMorph {
        /// Index of the morph
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// A bone carries the IK flag but no chain (or vice versa).
    #[error("Invalid IK setup on bone {bone}: {reason}")]
    InvalidIk {
        /// Index of the IK bone
        bone: usize,
        /// What is wrong with it
        reason: String,
    },

    // ========================================================================
    // Animation Errors
    // ========================================================================
    /// An animator operation referenced a state that was never registered.
    #[error("Unknown animator state")]
    UnknownState,

    /// A pose was produced for a different model than the one it is used with.
    #[error("Pose size mismatch: expected {expected} {what}, found {found}")]
    PoseMismatch {
        /// "bones" or "morphs"
        what: &'static str,
        /// Count required by the model
        expected: usize,
        /// Count found in the pose
        found: usize,
    },
}

impl MarionetteError {
    pub(crate) fn out_of_bounds(context: impl Into<String>, index: usize) -> Self {
        Self::IndexOutOfBounds {
            context: context.into(),
            index,
        }
    }
}

/// Alias for `Result<T, MarionetteError>`.
pub type Result<T> = std::result::Result<T, MarionetteError>;
