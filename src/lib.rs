//! Weave static advice methods into JVM method bodies
//!
//! An advice class declares up to two static methods: one marked as running on method entry and
//! one marked as running on method exit. Their compiled bodies are copied (not called) into
//! every method selected by a [`advice::Pipeline`] stage, with their parameters rebound to the
//! receiver, arguments, return value, or thrown exception of the instrumented method.
//!
//! The [`jvm`] module holds the small JVM model the weaver works over: names, descriptors, an
//! arena-backed class graph, and a symbolic instruction stream that can be replayed through a
//! [`jvm::code::CodeVisitor`].

pub mod advice;
pub mod jvm;
pub mod util;
