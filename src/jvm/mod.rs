//! Read-only model of JVM classes and method bodies
//!
//! This is only as much of the JVM as advice weaving needs:
//!
//!   - [`class_graph`] tracks classes and the signatures of their members (including the
//!     annotations used to mark advice)
//!   - [`code`] represents method bodies as a flat stream of symbolic instructions, labels, and
//!     line numbers which can be replayed through a [`code::CodeVisitor`]
//!
//! ### Simple example
//!
//! ```
//! use jvm_advice::jvm::class_graph::*;
//! use jvm_advice::jvm::code::{MethodCode, Instruction::*, BranchInstruction::*};
//! use jvm_advice::jvm::*;
//!
//! let class_graph_arenas = ClassGraphArenas::new();
//! let class_graph = ClassGraph::new(&class_graph_arenas);
//! let java = class_graph.insert_java_library_types();
//!
//! let class = class_graph.add_class(ClassData::new(
//!     BinaryName::from_string(String::from("me/alec/Calculator")).unwrap(),
//!     java.lang.object,
//!     ClassAccessFlags::PUBLIC,
//! ));
//! let add = class_graph.add_method(MethodData::new(
//!     class,
//!     UnqualifiedName::from_string(String::from("add")).unwrap(),
//!     MethodDescriptor {
//!         parameters: vec![FieldType::int(), FieldType::int()],
//!         return_type: Some(FieldType::int()),
//!     },
//!     MethodAccessFlags::PUBLIC,
//! ));
//! assert_eq!(add.frame_size(), 3);
//! assert_eq!(add.key(), "add(II)I");
//!
//! let mut code = MethodCode::new();
//! code.push_instruction(ILoad(1));
//! code.push_instruction(ILoad(2));
//! code.push_instruction(IAdd);
//! code.push_branch_instruction(IReturn);
//! assert_eq!(code.exit_sites().count(), 1);
//! ```

mod access_flags;
pub mod class_graph;
pub mod code;
mod descriptors;
mod errors;
mod names;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
