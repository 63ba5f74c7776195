use crate::jvm::class_graph::{ConstantData, MethodId};
use crate::jvm::code::{
    BranchInstruction, CodeElement, CodeVisitor, Instruction, LabelGenerator, MethodCode,
    StackHeights, SynLabel,
};
use crate::jvm::{Error, UnqualifiedName};
use crate::util::Offset;
use std::marker::PhantomData;

/// Innermost visitor, which records the events it receives back into a [`MethodCode`]
///
/// The `max_stack` and `max_locals` declared in `visit_maxs` are ignored. Instead, they are
/// recomputed from the recorded code so that code spliced in by outer visitors is accounted for.
/// Both are zero if no body was recorded.
pub struct CodeWriter<'a, 'g, E> {
    /// Method whose code is being written
    method: MethodId<'g>,

    /// Where the code ends up
    output: &'a mut MethodCode<'g>,

    _error: PhantomData<fn() -> E>,
}

impl<'a, 'g, E> CodeWriter<'a, 'g, E> {
    /// Write into `output`, discarding any code it already had
    ///
    /// The label generator of `output` is kept: it should be a clone of the generator of the code
    /// being transformed.
    pub fn new(method: MethodId<'g>, output: &'a mut MethodCode<'g>) -> CodeWriter<'a, 'g, E> {
        output.parameters.clear();
        output.annotation_default = None;
        output.elements.clear();
        output.max_stack = 0;
        output.max_locals = 0;
        CodeWriter {
            method,
            output,
            _error: PhantomData,
        }
    }

    /// Largest local variable slot (plus one) used anywhere, including the method arguments
    fn compute_max_locals(&self) -> usize {
        self.output
            .elements
            .iter()
            .filter_map(|element| match element {
                CodeElement::Instruction(instruction) => instruction.local_slot(),
                _ => None,
            })
            .map(|(slot, width)| slot as usize + width)
            .fold(self.method.frame_size(), usize::max)
    }
}

impl<'a, 'g, E: From<Error>> CodeVisitor<'g, E> for CodeWriter<'a, 'g, E> {
    fn visit_parameter(&mut self, name: UnqualifiedName) -> Result<(), E> {
        self.output.parameters.push(name);
        Ok(())
    }

    fn visit_annotation_default(&mut self, value: ConstantData<'g>) -> Result<(), E> {
        self.output.annotation_default = Some(value);
        Ok(())
    }

    fn visit_code(&mut self) -> Result<(), E> {
        Ok(())
    }

    fn visit_instruction(&mut self, instruction: Instruction<'g>) -> Result<(), E> {
        self.output.push_instruction(instruction);
        Ok(())
    }

    fn visit_branch(&mut self, branch: BranchInstruction<SynLabel>) -> Result<(), E> {
        self.output.push_branch_instruction(branch);
        Ok(())
    }

    fn visit_label(&mut self, label: SynLabel) -> Result<(), E> {
        self.output.place_label(label);
        Ok(())
    }

    fn visit_line_number(&mut self, line: u16, start: SynLabel) -> Result<(), E> {
        self.output
            .elements
            .push(CodeElement::LineNumber { line, start });
        Ok(())
    }

    fn visit_maxs(&mut self, _max_stack: u16, _max_locals: u16) -> Result<(), E> {
        if !self.output.has_body() {
            self.output.max_stack = 0;
            self.output.max_locals = 0;
            return Ok(());
        }
        let max_stack = StackHeights::analyze(&self.output.elements)?.max_stack();
        let max_locals = self.compute_max_locals();

        self.output.max_stack = u16::try_from(max_stack)
            .map_err(|_| Error::MethodCodeMaxStackOverflow(Offset(max_stack)))?;
        self.output.max_locals = u16::try_from(max_locals)
            .map_err(|_| Error::MethodCodeMaxLocalsOverflow(Offset(max_locals)))?;
        Ok(())
    }

    fn visit_end(&mut self) -> Result<(), E> {
        log::trace!(
            "Wrote {:?} ({} elements, max_stack = {}, max_locals = {})",
            self.method,
            self.output.elements.len(),
            self.output.max_stack,
            self.output.max_locals
        );
        Ok(())
    }

    fn fresh_label(&mut self) -> SynLabel {
        self.output.label_generator.fresh_label()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_graph::{ClassGraph, ClassGraphArenas, MethodData};
    use crate::jvm::code::{BranchInstruction::*, Instruction::*};
    use crate::jvm::{FieldType, MethodAccessFlags, MethodDescriptor, Name};

    #[test]
    fn recomputes_maxs() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();
        let method = class_graph.add_method(MethodData::new(
            java.lang.object,
            UnqualifiedName::from_string(String::from("twice")).unwrap(),
            MethodDescriptor {
                parameters: vec![FieldType::long()],
                return_type: Some(FieldType::long()),
            },
            MethodAccessFlags::STATIC,
        ));

        let mut source = MethodCode::new();
        source.parameters.push(UnqualifiedName::from_string(String::from("x")).unwrap());
        source.mark_line(12);
        source.push_instruction(LLoad(0));
        source.push_instruction(LLoad(0));
        source.push_instruction(LAdd);
        source.push_instruction(LStore(4));
        source.push_instruction(LLoad(4));
        source.push_branch_instruction(LReturn);
        source.max_stack = 100;

        let mut output = MethodCode::new();
        output.label_generator = source.label_generator.clone();
        {
            let mut writer: CodeWriter<Error> = CodeWriter::new(method, &mut output);
            source.accept(&mut writer).unwrap();
        }

        assert_eq!(output.elements, source.elements);
        assert_eq!(output.parameters, source.parameters);
        assert_eq!(output.max_stack, 4);
        assert_eq!(output.max_locals, 6);
        assert_eq!(output.fresh_label(), source.fresh_label());
    }

    #[test]
    fn empty_body_has_no_maxs() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();
        let method = class_graph.add_method(MethodData::new(
            java.lang.object,
            UnqualifiedName::from_string(String::from("size")).unwrap(),
            MethodDescriptor {
                parameters: vec![],
                return_type: Some(FieldType::int()),
            },
            MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
        ));

        let mut output = MethodCode::new();
        output.max_stack = 3;
        let mut writer: CodeWriter<Error> = CodeWriter::new(method, &mut output);
        writer.visit_code().unwrap();
        writer.visit_maxs(3, 1).unwrap();
        writer.visit_end().unwrap();
        drop(writer);

        assert!(output.elements.is_empty());
        assert_eq!((output.max_stack, output.max_locals), (0, 0));
    }
}
