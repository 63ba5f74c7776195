//! Weaving of advice methods into instrumented methods
//!
//! Advice is resolved once from a donor class with [`Advice::to`]: this finds the methods
//! marked as entry and exit advice, checks how their parameters are marked, binds the value
//! produced by the entry advice to the exit advice, and loads their code.
//!
//! Resolved advice is then applied to methods by adding it as a stage of a [`Pipeline`]. Each
//! selected method gets:
//!
//!   - the entry advice code copied in at the very start
//!   - the exit advice code copied in before every `return` (and `athrow`, by default)
//!
//! Parameters of the advice methods are rewritten into reads of the corresponding locals of the
//! instrumented method (see [`OffsetLayout`] for where everything lives) and returns in the
//! advice code are rewritten into jumps past the copied code. Every check is done before
//! anything is emitted, so a method is either fully woven or not touched.

mod access;
mod copier;
mod dispatcher;
mod donor;
mod errors;
mod marker;
mod offsets;
mod pipeline;
mod resolver;
mod settings;
mod weaver;

pub use access::*;
pub use copier::*;
pub use dispatcher::*;
pub use donor::*;
pub use errors::*;
pub use marker::*;
pub use offsets::*;
pub use pipeline::*;
pub use resolver::*;
pub use settings::*;
pub use weaver::*;
