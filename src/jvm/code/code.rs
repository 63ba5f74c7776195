use crate::jvm::class_graph::ConstantData;
use crate::jvm::code::{
    BranchInstruction, CodeVisitor, Instruction, LabelGenerator, SynLabel, SynLabelGenerator,
};
use crate::jvm::UnqualifiedName;

/// One entry in the flat representation of a method body
#[derive(Clone, Debug, PartialEq)]
pub enum CodeElement<'g> {
    Instruction(Instruction<'g>),
    Branch(BranchInstruction<SynLabel>),
    Label(SynLabel),
    LineNumber { line: u16, start: SynLabel },
}

/// Semantic representation of a method body
///
/// The body is kept as the linear sequence of elements it would be visited in, so that it can
/// be replayed (any number of times) through a [`CodeVisitor`]. A method without a body (such as
/// an abstract or annotation interface method) has no elements.
#[derive(Clone, Debug)]
pub struct MethodCode<'g> {
    /// Names from the `MethodParameters` attribute
    pub parameters: Vec<UnqualifiedName>,

    /// Value of the `AnnotationDefault` attribute
    pub annotation_default: Option<ConstantData<'g>>,

    /// Instructions, labels, and line numbers in program order
    pub elements: Vec<CodeElement<'g>>,

    /// Maximum size of stack through the method
    pub max_stack: u16,

    /// Maximum size of locals through the method
    pub max_locals: u16,

    /// Generator to produce the next label
    pub label_generator: SynLabelGenerator,
}

impl<'g> MethodCode<'g> {
    /// Empty method body
    pub fn new() -> MethodCode<'g> {
        MethodCode {
            parameters: vec![],
            annotation_default: None,
            elements: vec![],
            max_stack: 0,
            max_locals: 0,
            label_generator: SynLabelGenerator::default(),
        }
    }

    /// Get a label that has not been used in this code yet
    pub fn fresh_label(&mut self) -> SynLabel {
        self.label_generator.fresh_label()
    }

    pub fn push_instruction(&mut self, instruction: Instruction<'g>) {
        self.elements.push(CodeElement::Instruction(instruction));
    }

    pub fn push_branch_instruction(&mut self, branch: BranchInstruction<SynLabel>) {
        self.elements.push(CodeElement::Branch(branch));
    }

    pub fn place_label(&mut self, label: SynLabel) {
        self.elements.push(CodeElement::Label(label));
    }

    /// Mark the code that follows as coming from a source line
    pub fn mark_line(&mut self, line: u16) {
        let start = self.fresh_label();
        self.place_label(start);
        self.elements.push(CodeElement::LineNumber { line, start });
    }

    /// Every return and throw instruction in the code, along with its element index
    pub fn exit_sites(
        &self,
    ) -> Box<dyn Iterator<Item = (usize, &BranchInstruction<SynLabel>)> + '_> {
        Box::new(
            self.elements
                .iter()
                .enumerate()
                .filter_map(|(index, element)| match element {
                    CodeElement::Branch(branch) if branch.is_exit() => Some((index, branch)),
                    _ => None,
                }),
        )
    }

    /// Does the method have a body at all? (abstract and native methods don't)
    pub fn has_body(&self) -> bool {
        !self.elements.is_empty()
    }

    /// Replay the method through a visitor
    pub fn accept<E, V: CodeVisitor<'g, E> + ?Sized>(&self, visitor: &mut V) -> Result<(), E> {
        for parameter in &self.parameters {
            visitor.visit_parameter(parameter.clone())?;
        }
        if let Some(default) = &self.annotation_default {
            visitor.visit_annotation_default(default.clone())?;
        }
        if !self.has_body() {
            return visitor.visit_end();
        }
        visitor.visit_code()?;
        for element in &self.elements {
            match element {
                CodeElement::Instruction(instruction) => {
                    visitor.visit_instruction(instruction.clone())?
                }
                CodeElement::Branch(branch) => visitor.visit_branch(branch.clone())?,
                CodeElement::Label(label) => visitor.visit_label(*label)?,
                CodeElement::LineNumber { line, start } => {
                    visitor.visit_line_number(*line, *start)?
                }
            }
        }
        visitor.visit_maxs(self.max_stack, self.max_locals)?;
        visitor.visit_end()
    }
}

impl<'g> Default for MethodCode<'g> {
    fn default() -> Self {
        MethodCode::new()
    }
}
