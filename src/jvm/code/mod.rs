//! Method bodies
//!
//! A body is either held in memory as a [`MethodCode`] or streamed through a chain of
//! [`CodeVisitor`]s. Bodies read from class files go through [`decode_code`] first, which
//! resolves constant pool references into the class graph and replaces byte offsets with
//! [`SynLabel`]s. The last visitor in a chain is normally a [`CodeWriter`], which collects the
//! transformed body and recomputes its maximum stack and locals.

mod code;
mod code_writer;
mod decoder;
mod instructions;
mod label;
mod stack_heights;
mod visitor;

pub use code::*;
pub use code_writer::*;
pub use decoder::*;
pub use instructions::*;
pub use label::*;
pub use stack_heights::*;
pub use visitor::*;
