use crate::advice::{
    splice, AccessMapping, Advice, BoundDispatcher, Error, MethodVisitorWrapper, OffsetLayout,
    ResolvedOffsets, Settings,
};
use crate::jvm::class_graph::{ClassId, ConstantData, MethodId};
use crate::jvm::code::{
    BranchInstruction, CodeElement, CodeVisitor, Instruction, MethodCode, StackHeights, SynLabel,
};
use crate::jvm::{Name, UnqualifiedName};

/// Visitor which weaves advice into the code passing through it
///
/// The body of the method is buffered from `visit_code` up to `visit_maxs`. At that point every
/// rule is checked against the whole body and, only if they all hold, the woven body is emitted
/// into the delegate:
///
///   - the `Copying` prelude (if any)
///   - the entry advice, followed by the store of the value it produced
///   - the original body, with its locals relocated and the exit advice spliced in before every
///     return (and `athrow`, unless disabled)
///
/// Events outside the body are passed straight through, and so is an empty body.
pub struct AdviceVisitor<'a, 'g> {
    advice: &'a Advice<'g>,
    method: MethodId<'g>,
    delegate: Box<dyn CodeVisitor<'g, Error> + 'a>,
    body: Option<Vec<CodeElement<'g>>>,
}

/// Advice code which has been checked against the method and is ready to be copied in
struct CheckedSplice<'b, 'g> {
    code: &'b MethodCode<'g>,
    mapping: AccessMapping<'g>,
}

impl<'a, 'g> AdviceVisitor<'a, 'g> {
    pub fn new(
        advice: &'a Advice<'g>,
        method: MethodId<'g>,
        delegate: Box<dyn CodeVisitor<'g, Error> + 'a>,
    ) -> AdviceVisitor<'a, 'g> {
        AdviceVisitor {
            advice,
            method,
            delegate,
            body: None,
        }
    }

    fn buffer(&mut self, element: CodeElement<'g>) -> Result<(), Error> {
        match &mut self.body {
            Some(body) => body.push(element),
            None => match element {
                CodeElement::Instruction(instruction) => {
                    self.delegate.visit_instruction(instruction)?
                }
                CodeElement::Branch(branch) => self.delegate.visit_branch(branch)?,
                CodeElement::Label(label) => self.delegate.visit_label(label)?,
                CodeElement::LineNumber { line, start } => {
                    self.delegate.visit_line_number(line, start)?
                }
            },
        }
        Ok(())
    }

    /// Check everything, then emit the woven body
    fn weave(&mut self, body: Vec<CodeElement<'g>>) -> Result<(), Error> {
        let advice = self.advice;
        let method = self.method;
        let settings = &advice.settings;
        let overflow = || Error::LocalsOverflow {
            target: format!("{:?}", method),
        };

        let layout = OffsetLayout::new(
            settings.offset_handler,
            method,
            advice.entry.produced_value(),
            advice.exit.is_active(),
        )?;
        let entry = advice
            .entry
            .as_bound()
            .map(|bound| check_splice(advice, bound, &layout.resolve_enter()))
            .transpose()?;
        let exit = advice
            .exit
            .as_bound()
            .map(|bound| check_splice(advice, bound, &layout.resolve_exit()))
            .transpose()?;

        if exit.is_some() {
            let heights = StackHeights::analyze(&body)?;
            for (index, element) in body.iter().enumerate() {
                let branch = match element {
                    CodeElement::Branch(branch) if is_exit_site(branch, settings) => branch,
                    _ => continue,
                };
                if let Some(height) = heights.height_before(index) {
                    if height != branch.pops() {
                        return Err(Error::NonEmptyStackAtExit {
                            target: format!("{:?}", method),
                            element: index,
                            height,
                        });
                    }
                }
            }
        }

        let body = body
            .into_iter()
            .map(|element| -> Result<CodeElement<'g>, Error> {
                match element {
                    CodeElement::Instruction(instruction) => {
                        Ok(CodeElement::Instruction(instruction.map_local_slot(|slot| {
                            layout.relocate(slot).ok_or_else(overflow)
                        })?))
                    }
                    other => Ok(other),
                }
            })
            .collect::<Result<Vec<_>, Error>>()?;

        // Nothing has been emitted up to this point
        let sink: &mut dyn CodeVisitor<'g, Error> = &mut *self.delegate;
        sink.visit_code()?;
        layout.copy_arguments(sink)?;
        if let Some(entry) = &entry {
            let region = splice(entry.code, &entry.mapping, sink)?;
            log::trace!(
                "Spliced entry advice into {:?} ({} elements, ending at {:?})",
                method,
                region.copied,
                region.end
            );
        }
        advice.exit.prepare(&layout.resolve_exit(), sink)?;

        for element in body {
            match element {
                CodeElement::Branch(branch) => match &exit {
                    Some(exit) if is_exit_site(&branch, settings) => {
                        exit_sequence(method, &layout, exit, branch, sink)?
                    }
                    _ => sink.visit_branch(branch)?,
                },
                CodeElement::Instruction(instruction) => sink.visit_instruction(instruction)?,
                CodeElement::Label(label) => sink.visit_label(label)?,
                CodeElement::LineNumber { line, start } => sink.visit_line_number(line, start)?,
            }
        }

        Ok(())
    }
}

fn check_splice<'b, 'g>(
    advice: &'b Advice<'g>,
    bound: &BoundDispatcher<'g>,
    offsets: &ResolvedOffsets<'_, 'g>,
) -> Result<CheckedSplice<'b, 'g>, Error> {
    let code = advice
        .program
        .code(bound.method)
        .ok_or_else(|| Error::MissingDonorCode {
            donor: format!("{:?}", bound.method),
        })?;
    let mapping = AccessMapping::build(bound, offsets)?;
    mapping.check(code)?;
    Ok(CheckedSplice { code, mapping })
}

/// Does exit advice run before this instruction?
fn is_exit_site(branch: &BranchInstruction<SynLabel>, settings: &Settings) -> bool {
    branch.is_return() || (settings.exit_on_throw && matches!(branch, BranchInstruction::AThrow))
}

/// Run exit advice, then carry on with the original return or throw
///
/// The value the instruction consumes is moved into its reserved slot for the duration of the
/// advice. The other reserved slot gets a placeholder if the advice reads it.
fn exit_sequence<'g>(
    method: MethodId<'g>,
    layout: &OffsetLayout<'g>,
    exit: &CheckedSplice<'_, 'g>,
    branch: BranchInstruction<SynLabel>,
    sink: &mut dyn CodeVisitor<'g, Error>,
) -> Result<(), Error> {
    let return_type = method.descriptor.return_type.as_ref();

    if let BranchInstruction::AThrow = branch {
        sink.visit_instruction(Instruction::AStore(layout.thrown()))?;
        if exit.mapping.reads_returned() {
            if let Some(return_type) = return_type {
                sink.visit_instruction(Instruction::default_value(return_type))?;
                sink.visit_instruction(Instruction::store(return_type, layout.returned()))?;
            }
        }
    } else {
        if let Some(return_type) = return_type {
            sink.visit_instruction(Instruction::store(return_type, layout.returned()))?;
        }
        if exit.mapping.reads_thrown() {
            sink.visit_instruction(Instruction::AConstNull)?;
            sink.visit_instruction(Instruction::AStore(layout.thrown()))?;
        }
    }

    let region = splice(exit.code, &exit.mapping, sink)?;
    log::trace!(
        "Spliced exit advice into {:?} before {:?} ({} elements, ending at {:?})",
        method,
        branch,
        region.copied,
        region.end
    );

    if let BranchInstruction::AThrow = branch {
        sink.visit_instruction(Instruction::ALoad(layout.thrown()))?;
    } else if let Some(return_type) = return_type {
        sink.visit_instruction(Instruction::load(return_type, layout.returned()))?;
    }
    sink.visit_branch(branch)
}

impl<'a, 'g> CodeVisitor<'g, Error> for AdviceVisitor<'a, 'g> {
    fn visit_parameter(&mut self, name: UnqualifiedName) -> Result<(), Error> {
        self.delegate.visit_parameter(name)
    }

    fn visit_annotation_default(&mut self, value: ConstantData<'g>) -> Result<(), Error> {
        self.delegate.visit_annotation_default(value)
    }

    fn visit_code(&mut self) -> Result<(), Error> {
        self.body = Some(vec![]);
        Ok(())
    }

    fn visit_instruction(&mut self, instruction: Instruction<'g>) -> Result<(), Error> {
        self.buffer(CodeElement::Instruction(instruction))
    }

    fn visit_branch(&mut self, branch: BranchInstruction<SynLabel>) -> Result<(), Error> {
        self.buffer(CodeElement::Branch(branch))
    }

    fn visit_label(&mut self, label: SynLabel) -> Result<(), Error> {
        self.buffer(CodeElement::Label(label))
    }

    fn visit_line_number(&mut self, line: u16, start: SynLabel) -> Result<(), Error> {
        self.buffer(CodeElement::LineNumber { line, start })
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> Result<(), Error> {
        match self.body.take() {
            Some(body) if body.is_empty() => self.delegate.visit_code()?,
            Some(body) => self.weave(body)?,
            None => (),
        }
        self.delegate.visit_maxs(max_stack, max_locals)
    }

    fn visit_end(&mut self) -> Result<(), Error> {
        self.delegate.visit_end()
    }

    fn fresh_label(&mut self) -> SynLabel {
        self.delegate.fresh_label()
    }
}

impl<'g> MethodVisitorWrapper<'g> for Advice<'g> {
    fn wrap<'a>(
        &'a self,
        class: ClassId<'g>,
        method: MethodId<'g>,
        delegate: Box<dyn CodeVisitor<'g, Error> + 'a>,
    ) -> Box<dyn CodeVisitor<'g, Error> + 'a>
    where
        'g: 'a,
    {
        log::trace!(
            "Wrapping {:?} of {} with advice from {}",
            method,
            class.name.as_str(),
            self.donor.name.as_str()
        );
        Box::new(AdviceVisitor::new(self, method, delegate))
    }
}
