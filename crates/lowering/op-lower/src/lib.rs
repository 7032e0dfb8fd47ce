//! Lowering from the resolved tree to C IR
//!
//! Every data and object type becomes a set of C declarations: one
//! field-layer struct per inheritance level, a typedef'd instance
//! struct led by the reference-count header, descriptor globals the
//! runtime allocator consumes, and v-tables for object methods and
//! trait conformances. Functions become name-mangled C functions;
//! top-level statements collect into a synthesized `main`.
//!
//! Lowering performs no user-facing checking. The resolution pass has
//! accepted the input; an inconsistency here is an internal bug.

pub mod lower;
pub mod mangle;

pub use lower::{LoweringContext, lower};
