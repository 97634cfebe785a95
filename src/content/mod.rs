//! Lookup table from exercises to their lesson, module and concept tags
//!
//! Content files are parsed elsewhere; this module only holds the resulting
//! immutable snapshot for one session.

pub mod index;

pub use index::{ContentError, ExerciseIndex, ExerciseIndexEntry, StaticExerciseIndex};
