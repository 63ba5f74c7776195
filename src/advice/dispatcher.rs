use crate::advice::{Error, ParameterMarker, ResolvedOffsets};
use crate::jvm::class_graph::{Assignable, ClassId, MethodId};
use crate::jvm::code::{CodeVisitor, Instruction};
use crate::jvm::FieldType;
use std::fmt;

/// When advice runs
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum AdviceRole {
    Enter,
    Exit,
}

impl fmt::Display for AdviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdviceRole::Enter => f.write_str("entry"),
            AdviceRole::Exit => f.write_str("exit"),
        }
    }
}

/// Advice for one role, which may be absent
#[derive(Debug)]
pub enum Dispatcher<'g> {
    Inactive,
    Bound(BoundDispatcher<'g>),
}

#[derive(Debug)]
pub struct BoundDispatcher<'g> {
    /// Advice method whose code gets spliced in
    pub method: MethodId<'g>,

    pub role: AdviceRole,

    /// What each parameter of the advice method reads
    pub markers: Vec<ParameterMarker>,

    /// Type of the value produced by entry advice and read by this (exit) advice
    pub value_binding: Option<FieldType<ClassId<'g>>>,
}

impl<'g> Dispatcher<'g> {
    /// Dispatcher for an advice method
    ///
    /// The method must be static, and entry advice can't use the markers that only make sense
    /// on exit. Entry advice can't read the entered value either, since there is none yet.
    pub fn bound(method: MethodId<'g>, role: AdviceRole) -> Result<Dispatcher<'g>, Error> {
        if !method.is_static() {
            return Err(Error::InvalidDonor {
                donor: format!("{:?}", method),
                reason: String::from("advice methods must be static"),
            });
        }

        let markers = ParameterMarker::of_method(method)?;
        if role == AdviceRole::Enter {
            for (parameter, marker) in markers.iter().enumerate() {
                if let ParameterMarker::Enter { .. } = marker {
                    return Err(Error::ValueMarkerWithoutEntry {
                        donor: format!("{:?}", method),
                        parameter,
                    });
                } else if marker.is_exit_only() {
                    return Err(Error::ExitOnlyMarker {
                        donor: format!("{:?}", method),
                        parameter,
                    });
                }
            }
        }

        Ok(Dispatcher::Bound(BoundDispatcher {
            method,
            role,
            markers,
            value_binding: None,
        }))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Dispatcher::Bound(_))
    }

    pub fn as_bound(&self) -> Option<&BoundDispatcher<'g>> {
        match self {
            Dispatcher::Inactive => None,
            Dispatcher::Bound(bound) => Some(bound),
        }
    }

    /// Type of the value left on the stack when the advice finishes (`None` if it returns void)
    pub fn produced_value(&self) -> Option<&FieldType<ClassId<'g>>> {
        self.as_bound()
            .and_then(|bound| bound.method.descriptor.return_type.as_ref())
    }

    /// Bind this exit dispatcher to the value produced by an entry dispatcher
    pub fn bind_to(self, entry: &Dispatcher<'g>) -> Result<Dispatcher<'g>, Error> {
        let produced = entry.produced_value().copied();
        let never_read = || Error::ValueNeverRead {
            donor: entry
                .as_bound()
                .map(|bound| format!("{:?}", bound.method))
                .unwrap_or_default(),
        };

        let mut exit = match self {
            Dispatcher::Inactive if produced.is_some() => return Err(never_read()),
            Dispatcher::Inactive => return Ok(Dispatcher::Inactive),
            Dispatcher::Bound(exit) => exit,
        };
        let donor = format!("{:?}", exit.method);

        // Nothing picks up a value left behind by exit advice
        if exit.method.descriptor.return_type.is_some() {
            return Err(Error::ValueNeverRead { donor });
        }

        // (parameter, read only) for each parameter reading the entered value
        let value_parameters: Vec<(usize, bool)> = exit
            .markers
            .iter()
            .enumerate()
            .filter_map(|(parameter, marker)| match marker {
                ParameterMarker::Enter { read_only } => Some((parameter, *read_only)),
                _ => None,
            })
            .collect();

        match (produced, value_parameters.as_slice()) {
            (None, []) => (),
            (None, [(parameter, _), ..]) => {
                return Err(Error::ValueMarkerWithoutEntry {
                    donor,
                    parameter: *parameter,
                })
            }
            (Some(_), []) => return Err(never_read()),
            (Some(value_type), [(parameter, read_only)]) => {
                let declared = &exit.method.descriptor.parameters[*parameter];
                let compatible = if *read_only {
                    value_type.is_assignable(declared)
                } else {
                    value_type == *declared
                };
                if !compatible {
                    return Err(Error::IncompatibleValueType {
                        donor,
                        parameter: *parameter,
                    });
                }
                exit.value_binding = Some(value_type);
            }
            (Some(_), [_, (parameter, _), ..]) => {
                return Err(Error::IncompatibleValueType {
                    donor,
                    parameter: *parameter,
                })
            }
        }

        log::debug!(
            "Bound {:?} to entry value {:?}",
            exit.method,
            exit.value_binding
        );
        Ok(Dispatcher::Bound(exit))
    }

    /// Store the value produced by entry advice into its reserved slot
    ///
    /// This runs once, right after the entry advice is spliced in and while the value is still
    /// on top of the stack. It does nothing unless this dispatcher is bound to an entry value.
    pub fn prepare<V: CodeVisitor<'g, Error> + ?Sized>(
        &self,
        offsets: &ResolvedOffsets<'_, 'g>,
        sink: &mut V,
    ) -> Result<(), Error> {
        if let Some(value_type) = self.as_bound().and_then(|bound| bound.value_binding.as_ref()) {
            sink.visit_instruction(Instruction::store(value_type, offsets.enter()))?;
        }
        Ok(())
    }
}
