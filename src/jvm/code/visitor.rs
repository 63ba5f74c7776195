use crate::jvm::class_graph::ConstantData;
use crate::jvm::code::{BranchInstruction, Instruction, SynLabel};
use crate::jvm::UnqualifiedName;

/// Streaming consumer of a method body
///
/// Events arrive in a fixed order:
///
///   1. `visit_parameter` for each named parameter, then `visit_annotation_default` (if any)
///   2. `visit_code` once, if the method has a body
///   3. instructions, branches, labels, and line numbers in program order
///   4. `visit_maxs` once, after the last code element
///   5. `visit_end`
///
/// Visitors are meant to be stacked: a transforming visitor receives events, rewrites some of
/// them, and forwards the result to the visitor it wraps. Labels must be unique across the final
/// method, so new labels are always requested from the innermost visitor via `fresh_label`.
pub trait CodeVisitor<'g, E> {
    /// Name of the next method parameter
    fn visit_parameter(&mut self, name: UnqualifiedName) -> Result<(), E>;

    /// Default value of an annotation interface method
    fn visit_annotation_default(&mut self, value: ConstantData<'g>) -> Result<(), E>;

    /// Start of the method body
    fn visit_code(&mut self) -> Result<(), E>;

    /// Straight-line instruction
    fn visit_instruction(&mut self, instruction: Instruction<'g>) -> Result<(), E>;

    /// Branching instruction
    fn visit_branch(&mut self, branch: BranchInstruction<SynLabel>) -> Result<(), E>;

    /// Place a label at the current position
    fn visit_label(&mut self, label: SynLabel) -> Result<(), E>;

    /// Source line starting at a (previously placed) label
    fn visit_line_number(&mut self, line: u16, start: SynLabel) -> Result<(), E>;

    /// Declared maximum stack and locals (these are recomputed by the final writer)
    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> Result<(), E>;

    /// End of the method
    fn visit_end(&mut self) -> Result<(), E>;

    /// Label which has not been used anywhere in the method yet
    fn fresh_label(&mut self) -> SynLabel;
}

impl<'g, E, V: CodeVisitor<'g, E> + ?Sized> CodeVisitor<'g, E> for Box<V> {
    fn visit_parameter(&mut self, name: UnqualifiedName) -> Result<(), E> {
        (**self).visit_parameter(name)
    }

    fn visit_annotation_default(&mut self, value: ConstantData<'g>) -> Result<(), E> {
        (**self).visit_annotation_default(value)
    }

    fn visit_code(&mut self) -> Result<(), E> {
        (**self).visit_code()
    }

    fn visit_instruction(&mut self, instruction: Instruction<'g>) -> Result<(), E> {
        (**self).visit_instruction(instruction)
    }

    fn visit_branch(&mut self, branch: BranchInstruction<SynLabel>) -> Result<(), E> {
        (**self).visit_branch(branch)
    }

    fn visit_label(&mut self, label: SynLabel) -> Result<(), E> {
        (**self).visit_label(label)
    }

    fn visit_line_number(&mut self, line: u16, start: SynLabel) -> Result<(), E> {
        (**self).visit_line_number(line, start)
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> Result<(), E> {
        (**self).visit_maxs(max_stack, max_locals)
    }

    fn visit_end(&mut self) -> Result<(), E> {
        (**self).visit_end()
    }

    fn fresh_label(&mut self) -> SynLabel {
        (**self).fresh_label()
    }
}
