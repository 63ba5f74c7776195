use crate::advice::{BoundDispatcher, Error, ParameterMarker, ResolvedOffsets};
use crate::jvm::class_graph::{
    accepts_throwable, Assignable, ClassId, ConstantData, FieldId, MethodId,
};
use crate::jvm::code::{CodeElement, Instruction, MethodCode};
use crate::jvm::{FieldType, Name};
use crate::util::{Offset, OffsetVec, Width};
use std::borrow::Cow;

/// What reads and writes of an advice parameter turn into in the instrumented method
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterTarget<'g> {
    /// Local variable slot of the instrumented method
    Local { slot: u16, read_only: bool },

    /// Field read (with the receiver from slot 0 if the field isn't static)
    Field(FieldId<'g>),

    /// Constant pushed with `ldc`
    Constant(ConstantData<'g>),

    /// Default value of the parameter type (writes are popped)
    Ignored,
}

#[derive(Debug)]
struct MappedParameter<'g> {
    index: usize,
    slot: u16,
    parameter_type: FieldType<ClassId<'g>>,
    target: ParameterTarget<'g>,
}

/// Where each local variable of an advice method ends up in the instrumented method
///
/// Parameters are mapped to whatever they are bound to. Every other local is moved up by a
/// constant so that it lands in the space reserved for advice locals.
#[derive(Debug)]
pub struct AccessMapping<'g> {
    donor: MethodId<'g>,
    target: MethodId<'g>,
    parameters: Vec<MappedParameter<'g>>,

    /// Frame size of the advice method
    donor_frame_size: u16,

    /// First slot available to advice locals in the instrumented method
    locals_base: u16,

    reads_returned: bool,
    reads_thrown: bool,
}

impl<'g> AccessMapping<'g> {
    /// Check every parameter of an advice method against the instrumented method
    pub fn build(
        dispatcher: &BoundDispatcher<'g>,
        offsets: &ResolvedOffsets<'_, 'g>,
    ) -> Result<AccessMapping<'g>, Error> {
        let donor = dispatcher.method;
        let target = offsets.target();
        let donor_name = || format!("{:?}", donor);
        let target_name = || format!("{:?}", target);

        let donor_parameters: OffsetVec<FieldType<ClassId<'g>>> =
            donor.descriptor.parameters.iter().copied().collect();

        let mut parameters = vec![];
        let mut reads_returned = false;
        let mut reads_thrown = false;
        for (Offset(donor_slot), index, parameter_type) in donor_parameters.iter() {
            let mapped = match &dispatcher.markers[index] {
                ParameterMarker::This { read_only } => {
                    let this = offsets.this().ok_or_else(|| Error::StaticHasNoThis {
                        donor: donor_name(),
                        target: target_name(),
                    })?;
                    if offsets.is_non_initialized() {
                        return Err(Error::UninitializedThisAccess {
                            donor: donor_name(),
                            target: target_name(),
                        });
                    }
                    let receiver_type = FieldType::object(target.class);
                    if !compatible(&receiver_type, parameter_type, *read_only) {
                        return Err(Error::ThisTypeMismatch {
                            donor: donor_name(),
                            target: target_name(),
                        });
                    }
                    ParameterTarget::Local {
                        slot: this,
                        read_only: *read_only,
                    }
                }
                ParameterMarker::Argument { index: argument, read_only } => {
                    let (slot, argument_type) = offsets.argument(*argument).ok_or_else(|| {
                        Error::ArgumentIndexOutOfRange {
                            donor: donor_name(),
                            target: target_name(),
                            index: *argument,
                            arguments: offsets.argument_count(),
                        }
                    })?;
                    if !compatible(argument_type, parameter_type, *read_only) {
                        return Err(Error::ArgumentTypeMismatch {
                            donor: donor_name(),
                            target: target_name(),
                            index: *argument,
                        });
                    }
                    ParameterTarget::Local {
                        slot,
                        read_only: *read_only,
                    }
                }
                ParameterMarker::Enter { read_only } => {
                    if dispatcher.value_binding.is_none() {
                        return Err(Error::ValueMarkerWithoutEntry {
                            donor: donor_name(),
                            parameter: index,
                        });
                    }
                    ParameterTarget::Local {
                        slot: offsets.enter(),
                        read_only: *read_only,
                    }
                }
                ParameterMarker::Return { read_only } => {
                    let returned = offsets.returned().ok_or_else(|| Error::ExitOnlyMarker {
                        donor: donor_name(),
                        parameter: index,
                    })?;
                    let matches_return = target
                        .descriptor
                        .return_type
                        .map_or(false, |return_type| {
                            compatible(&return_type, parameter_type, *read_only)
                        });
                    if !matches_return {
                        return Err(Error::ReturnTypeMismatch {
                            donor: donor_name(),
                            target: target_name(),
                        });
                    }
                    reads_returned = true;
                    ParameterTarget::Local {
                        slot: returned,
                        read_only: *read_only,
                    }
                }
                ParameterMarker::Thrown => {
                    let thrown = offsets.thrown().ok_or_else(|| Error::ExitOnlyMarker {
                        donor: donor_name(),
                        parameter: index,
                    })?;
                    if !accepts_throwable(parameter_type) {
                        return Err(Error::ThrownTypeMismatch {
                            donor: donor_name(),
                            target: target_name(),
                        });
                    }
                    reads_thrown = true;
                    ParameterTarget::Local {
                        slot: thrown,
                        read_only: false,
                    }
                }
                ParameterMarker::Ignored => ParameterTarget::Ignored,
                ParameterMarker::Origin(pattern) => {
                    ParameterTarget::Constant(ConstantData::String(Cow::Owned(
                        pattern.render(target),
                    )))
                }
                ParameterMarker::FieldValue(name) => {
                    let field = target.class.0.field(name).ok_or_else(|| Error::FieldNotFound {
                        donor: donor_name(),
                        target: target_name(),
                        field: String::from(name.as_str()),
                    })?;
                    if !field.descriptor.is_assignable(parameter_type) {
                        return Err(Error::FieldTypeMismatch {
                            donor: donor_name(),
                            target: target_name(),
                            field: format!("{:?}", field),
                        });
                    }
                    if !field.is_static() {
                        if target.is_static() {
                            return Err(Error::InstanceFieldFromStatic {
                                donor: donor_name(),
                                target: target_name(),
                                field: format!("{:?}", field),
                            });
                        }
                        if offsets.is_non_initialized() {
                            return Err(Error::UninitializedThisAccess {
                                donor: donor_name(),
                                target: target_name(),
                            });
                        }
                    }
                    ParameterTarget::Field(field)
                }
            };
            parameters.push(MappedParameter {
                index,
                slot: donor_slot as u16,
                parameter_type: *parameter_type,
                target: mapped,
            });
        }

        Ok(AccessMapping {
            donor,
            target,
            parameters,
            donor_frame_size: donor_parameters.offset_len().0 as u16,
            locals_base: offsets.locals(),
            reads_returned,
            reads_thrown,
        })
    }

    /// Constant added to the slot of every advice local which isn't a parameter
    pub fn offset_correction(&self) -> isize {
        self.locals_base as isize - self.donor_frame_size as isize
    }

    fn parameter(&self, slot: u16) -> Option<&MappedParameter<'g>> {
        self.parameters.iter().find(|parameter| {
            let width = parameter.parameter_type.width() as u16;
            (parameter.slot..parameter.slot + width).contains(&slot)
        })
    }

    /// Slot in the instrumented method for a slot of the advice method
    ///
    /// Returns `None` if the slot belongs to a parameter not backed by a local variable, or if it
    /// would be past the largest possible local.
    pub fn map(&self, slot: u16) -> Option<u16> {
        match self.parameter(slot) {
            Some(MappedParameter {
                slot: donor_slot,
                target: ParameterTarget::Local { slot: target_slot, .. },
                ..
            }) => Some(*target_slot + (slot - *donor_slot)),
            Some(_) => None,
            None => u16::try_from(slot as isize + self.offset_correction()).ok(),
        }
    }

    /// Instructions replacing one instruction of the advice code
    ///
    /// Only accesses to local variables change. Accesses to parameters follow their
    /// [`ParameterTarget`], and every other local is shifted into the advice locals.
    pub fn rewrite(&self, instruction: &Instruction<'g>) -> Result<Vec<Instruction<'g>>, Error> {
        let slot = match instruction.local_slot() {
            None => return Ok(vec![instruction.clone()]),
            Some((slot, _)) => slot,
        };
        let overflow = || Error::LocalsOverflow {
            target: format!("{:?}", self.target),
        };
        let parameter = match self.parameter(slot) {
            None => {
                let shifted =
                    instruction.map_local_slot(|slot| self.map(slot).ok_or_else(overflow))?;
                return Ok(vec![shifted]);
            }
            Some(parameter) => parameter,
        };

        let is_write = instruction.is_local_write();
        let read_only = || Error::ReadOnlyWrite {
            donor: format!("{:?}", self.donor),
            parameter: parameter.index,
        };
        let rewritten = match &parameter.target {
            ParameterTarget::Local { read_only: true, .. } if is_write => return Err(read_only()),
            ParameterTarget::Local { slot: target_slot, .. } => {
                let mapped = *target_slot + (slot - parameter.slot);
                vec![instruction.map_local_slot(|_| Ok::<u16, Error>(mapped))?]
            }
            ParameterTarget::Field(_) | ParameterTarget::Constant(_) if is_write => {
                return Err(read_only())
            }
            ParameterTarget::Field(field) if field.is_static() => {
                vec![Instruction::GetStatic(*field)]
            }
            ParameterTarget::Field(field) => {
                vec![Instruction::ALoad(0), Instruction::GetField(*field)]
            }
            ParameterTarget::Constant(constant) => vec![Instruction::Ldc(constant.clone())],
            ParameterTarget::Ignored => match instruction {
                Instruction::IInc(_, _) => vec![],
                _ if is_write && parameter.parameter_type.width() == 2 => vec![Instruction::Pop2],
                _ if is_write => vec![Instruction::Pop],
                _ => vec![Instruction::default_value(&parameter.parameter_type)],
            },
        };
        Ok(rewritten)
    }

    /// Check that every instruction of the advice code can be rewritten
    pub fn check(&self, code: &MethodCode<'g>) -> Result<(), Error> {
        for element in &code.elements {
            if let CodeElement::Instruction(instruction) = element {
                self.rewrite(instruction)?;
            }
        }
        Ok(())
    }

    /// Does the advice read the return value?
    pub fn reads_returned(&self) -> bool {
        self.reads_returned
    }

    /// Does the advice read the thrown exception?
    pub fn reads_thrown(&self) -> bool {
        self.reads_thrown
    }
}

/// Can a parameter of type `parameter_type` be bound to a value of type `value_type`?
///
/// Read-only parameters only need to accept the value. Writable ones must have exactly its type.
fn compatible<'g>(
    value_type: &FieldType<ClassId<'g>>,
    parameter_type: &FieldType<ClassId<'g>>,
    read_only: bool,
) -> bool {
    if read_only {
        value_type.is_assignable(parameter_type)
    } else {
        value_type == parameter_type
    }
}
