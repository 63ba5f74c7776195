use super::code::SynLabel;
use crate::util::Offset;

#[derive(Debug)]
pub enum Error {
    /// The code array ends in the middle of an instruction
    TruncatedCode(Offset),

    /// Opcode which is either invalid or deliberately not supported (`jsr`, `ret`,
    /// `invokedynamic`)
    UnsupportedOpcode { offset: Offset, opcode: u8 },

    /// Jump (or line number) pointing outside the code or into the middle of an instruction
    InvalidJumpTarget { offset: Offset, target: isize },

    /// Constant pool index which the resolver doesn't know about (or which has the wrong kind)
    MissingConstant { offset: Offset, index: u16 },

    /// Code with exception handlers (`try`/`catch` or `finally`), which can't be decoded
    UnsupportedExceptionHandler { handler_pc: Offset, handlers: usize },

    /// Instruction pops more than is on the stack
    StackUnderflow { element: usize, height: usize, pops: usize },

    /// Two control flow paths reach the same element with different stack heights
    InconsistentStackHeight {
        element: usize,
        expected: usize,
        found: usize,
    },

    /// A jump targets a label which is never placed
    UnknownLabel(SynLabel),

    /// Execution can run past the last instruction of the method
    MethodCodeFallsOffEnd,

    MethodCodeMaxLocalsOverflow(Offset),
    MethodCodeMaxStackOverflow(Offset),
}
