use crate::advice::{AdviceRole, Error};
use crate::jvm::class_graph::{ClassId, MethodId};
use crate::jvm::code::{CodeVisitor, Instruction};
use crate::jvm::FieldType;
use crate::util::{Offset, OffsetVec, Width};

/// Policy for how advice reaches the receiver and arguments of the instrumented method
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OffsetHandler {
    /// Advice reads the original local variable slots
    Retaining,

    /// The receiver and arguments are copied to fresh slots on entry, and advice reads those
    Copying,
}

/// Local variable layout of an instrumented method
///
/// Slots are laid out as follows, where `F` is the frame size of the method:
///
/// ```text
///   0 .. F                     receiver and arguments
///   F .. F + S                 copies of the receiver and arguments (only with `Copying`)
///   enter                      value produced by entry advice (also where entry advice locals start)
///   returned                   snapshot of the return value (exit only)
///   thrown                     snapshot of the thrown exception (exit only)
///   locals_base ..             exit advice locals, and the relocated locals of the method body
/// ```
///
/// In a constructor, the receiver is not initialized on entry and so is never copied: advice
/// reads it from slot 0 even with `Copying`.
#[derive(Debug)]
pub struct OffsetLayout<'g> {
    target: MethodId<'g>,
    handler: OffsetHandler,
    this: Option<usize>,
    arguments: OffsetVec<FieldType<ClassId<'g>>>,
    enter: usize,
    returned: usize,
    thrown: usize,
    locals_base: usize,
}

impl<'g> OffsetLayout<'g> {
    /// Lay out the locals of a method, given the type of the value entry advice produces (if
    /// any) and whether there is exit advice
    pub fn new(
        handler: OffsetHandler,
        target: MethodId<'g>,
        entered: Option<&FieldType<ClassId<'g>>>,
        exit_active: bool,
    ) -> Result<OffsetLayout<'g>, Error> {
        let frame_size = target.frame_size();
        let receiver_width = usize::from(!target.is_static());

        let (this, arguments_start, shadow_width) = match handler {
            OffsetHandler::Retaining => ((!target.is_static()).then(|| 0), receiver_width, 0),
            OffsetHandler::Copying if target.is_constructor() => {
                (Some(0), frame_size, frame_size - receiver_width)
            }
            OffsetHandler::Copying => (
                (!target.is_static()).then(|| frame_size),
                frame_size + receiver_width,
                frame_size,
            ),
        };

        let mut arguments = OffsetVec::new_starting_at(Offset(arguments_start));
        for parameter in &target.descriptor.parameters {
            arguments.push(*parameter);
        }

        let enter = frame_size + shadow_width;
        let returned = enter + entered.map_or(0, Width::width);
        let thrown = returned + target.descriptor.return_type.as_ref().map_or(0, Width::width);
        let locals_base = if exit_active { thrown + 1 } else { returned };

        if locals_base > u16::MAX as usize {
            return Err(Error::LocalsOverflow {
                target: format!("{:?}", target),
            });
        }

        Ok(OffsetLayout {
            target,
            handler,
            this,
            arguments,
            enter,
            returned,
            thrown,
            locals_base,
        })
    }

    pub fn target(&self) -> MethodId<'g> {
        self.target
    }

    /// Offsets as seen by entry advice
    pub fn resolve_enter(&self) -> ResolvedOffsets<'_, 'g> {
        ResolvedOffsets {
            layout: self,
            role: AdviceRole::Enter,
        }
    }

    /// Offsets as seen by exit advice
    pub fn resolve_exit(&self) -> ResolvedOffsets<'_, 'g> {
        ResolvedOffsets {
            layout: self,
            role: AdviceRole::Exit,
        }
    }

    /// Slot the return value is kept in while exit advice runs
    pub fn returned(&self) -> u16 {
        self.returned as u16
    }

    /// Slot the thrown exception (or `null`) is kept in while exit advice runs
    pub fn thrown(&self) -> u16 {
        self.thrown as u16
    }

    /// Number of slots the locals of the method body get shifted up by
    pub fn padding(&self) -> usize {
        self.locals_base - self.target.frame_size()
    }

    /// New slot for a local variable of the method body
    ///
    /// The receiver and arguments stay in place. Everything above them moves past the slots
    /// reserved for advice. Returns `None` if the new slot doesn't fit in a `u16`.
    pub fn relocate(&self, slot: u16) -> Option<u16> {
        if (slot as usize) < self.target.frame_size() {
            Some(slot)
        } else {
            u16::try_from(slot as usize + self.padding()).ok()
        }
    }

    /// Emit the copies of the receiver and arguments (nothing unless the policy is `Copying`)
    ///
    /// This must run before any advice does.
    pub fn copy_arguments<V: CodeVisitor<'g, Error> + ?Sized>(
        &self,
        sink: &mut V,
    ) -> Result<(), Error> {
        if self.handler != OffsetHandler::Copying {
            return Ok(());
        }

        let receiver_width = usize::from(!self.target.is_static());
        if let Some(this) = self.this.filter(|this| *this != 0) {
            sink.visit_instruction(Instruction::ALoad(0))?;
            sink.visit_instruction(Instruction::AStore(this as u16))?;
        }

        let mut originals: OffsetVec<FieldType<ClassId<'g>>> =
            OffsetVec::new_starting_at(Offset(receiver_width));
        for (Offset(copy), _, field_type) in self.arguments.iter() {
            let Offset(original) = originals.push(*field_type);
            sink.visit_instruction(Instruction::load(field_type, original as u16))?;
            sink.visit_instruction(Instruction::store(field_type, copy as u16))?;
        }

        Ok(())
    }
}

/// Offsets of an [`OffsetLayout`] as seen by advice of one role
#[derive(Copy, Clone, Debug)]
pub struct ResolvedOffsets<'a, 'g> {
    layout: &'a OffsetLayout<'g>,
    role: AdviceRole,
}

impl<'a, 'g> ResolvedOffsets<'a, 'g> {
    pub fn role(&self) -> AdviceRole {
        self.role
    }

    pub fn target(&self) -> MethodId<'g> {
        self.layout.target
    }

    /// Slot holding the receiver (`None` for static methods)
    pub fn this(&self) -> Option<u16> {
        self.layout.this.map(|this| this as u16)
    }

    /// Number of arguments the instrumented method takes
    pub fn argument_count(&self) -> usize {
        self.layout.arguments.len()
    }

    /// Slot and type of an argument
    pub fn argument(&self, index: usize) -> Option<(u16, &'a FieldType<ClassId<'g>>)> {
        self.layout
            .arguments
            .get_index(index)
            .map(|(Offset(slot), field_type)| (slot as u16, field_type))
    }

    /// Slot reserved for the value produced by entry advice
    pub fn enter(&self) -> u16 {
        self.layout.enter as u16
    }

    /// Slot holding the return value (exit only)
    pub fn returned(&self) -> Option<u16> {
        match self.role {
            AdviceRole::Enter => None,
            AdviceRole::Exit => Some(self.layout.returned()),
        }
    }

    /// Slot holding the thrown exception, or `null` (exit only)
    pub fn thrown(&self) -> Option<u16> {
        match self.role {
            AdviceRole::Enter => None,
            AdviceRole::Exit => Some(self.layout.thrown()),
        }
    }

    /// First slot advice can use for its own locals
    pub fn locals(&self) -> u16 {
        match self.role {
            AdviceRole::Enter => self.layout.enter as u16,
            AdviceRole::Exit => self.layout.locals_base as u16,
        }
    }

    /// Does the advice run before the receiver is initialized?
    pub fn is_non_initialized(&self) -> bool {
        self.role == AdviceRole::Enter && self.layout.target.is_constructor()
    }
}
