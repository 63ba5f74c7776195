use crate::advice::{AccessMapping, Error};
use crate::jvm::code::{BranchInstruction, CodeElement, CodeVisitor, MethodCode, SynLabel};
use std::collections::HashMap;

/// How far along a splice is
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum CopierState {
    Unstarted,
    Copying { copied: usize, returns: usize },
}

/// Copies the code of an advice method into an instrumented method, one element at a time
///
///   - instructions accessing local variables are rewritten by the [`AccessMapping`]
///   - every return becomes a jump to a single end label, leaving any returned value on the stack
///   - labels are swapped for fresh ones from the sink
///   - line numbers are dropped
///
/// The splice finishes with [`DonorCopier::join`], which places the end label.
pub struct DonorCopier<'a, 'g> {
    mapping: &'a AccessMapping<'g>,
    end: SynLabel,
    labels: HashMap<SynLabel, SynLabel>,
    state: CopierState,
}

/// Splice which has been joined back into the surrounding code
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SplicedRegion {
    /// Label right after the copied code
    pub end: SynLabel,

    /// Number of elements copied (not counting the dropped line numbers)
    pub copied: usize,

    /// Number of returns turned into jumps to `end`
    pub returns: usize,
}

impl<'a, 'g> DonorCopier<'a, 'g> {
    pub fn new<V: CodeVisitor<'g, Error> + ?Sized>(
        mapping: &'a AccessMapping<'g>,
        sink: &mut V,
    ) -> DonorCopier<'a, 'g> {
        DonorCopier {
            mapping,
            end: sink.fresh_label(),
            labels: HashMap::new(),
            state: CopierState::Unstarted,
        }
    }

    /// Copy the next element of the advice code
    pub fn copy<V: CodeVisitor<'g, Error> + ?Sized>(
        &mut self,
        element: &CodeElement<'g>,
        sink: &mut V,
    ) -> Result<(), Error> {
        let (copied, mut returns) = match self.state {
            CopierState::Unstarted => (0, 0),
            CopierState::Copying { copied, returns } => (copied, returns),
        };

        match element {
            CodeElement::Instruction(instruction) => {
                for instruction in self.mapping.rewrite(instruction)? {
                    sink.visit_instruction(instruction)?;
                }
            }
            CodeElement::Branch(branch) if branch.is_return() => {
                sink.visit_branch(BranchInstruction::Goto(self.end))?;
                returns += 1;
            }
            CodeElement::Branch(branch) => {
                let labels = &mut self.labels;
                let branch = branch
                    .map_labels(|label| *labels.entry(*label).or_insert_with(|| sink.fresh_label()));
                sink.visit_branch(branch)?;
            }
            CodeElement::Label(label) => {
                let label = *self
                    .labels
                    .entry(*label)
                    .or_insert_with(|| sink.fresh_label());
                sink.visit_label(label)?;
            }
            CodeElement::LineNumber { .. } => return Ok(()),
        }

        self.state = CopierState::Copying {
            copied: copied + 1,
            returns,
        };
        Ok(())
    }

    /// Place the end label, after which control continues with the instrumented code
    pub fn join<V: CodeVisitor<'g, Error> + ?Sized>(
        self,
        sink: &mut V,
    ) -> Result<SplicedRegion, Error> {
        sink.visit_label(self.end)?;
        let (copied, returns) = match self.state {
            CopierState::Unstarted => (0, 0),
            CopierState::Copying { copied, returns } => (copied, returns),
        };
        Ok(SplicedRegion {
            end: self.end,
            copied,
            returns,
        })
    }
}

/// Copy all of an advice method's code into the sink
pub fn splice<'g, V: CodeVisitor<'g, Error> + ?Sized>(
    code: &MethodCode<'g>,
    mapping: &AccessMapping<'g>,
    sink: &mut V,
) -> Result<SplicedRegion, Error> {
    let mut copier = DonorCopier::new(mapping, sink);
    for element in &code.elements {
        copier.copy(element, sink)?;
    }
    copier.join(sink)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::advice::{AdviceRole, Dispatcher, OffsetHandler, OffsetLayout};
    use crate::jvm::class_graph::{ClassGraph, ClassGraphArenas, MethodData};
    use crate::jvm::code::{CodeWriter, Instruction, OrdComparison};
    use crate::jvm::{FieldType, MethodAccessFlags, MethodDescriptor, Name, UnqualifiedName};

    #[test]
    fn returns_join_at_one_label() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        // static void run(int, long)
        let target = class_graph.add_method(MethodData::new(
            java.lang.object,
            UnqualifiedName::from_string(String::from("run")).unwrap(),
            MethodDescriptor {
                parameters: vec![FieldType::int(), FieldType::long()],
                return_type: None,
            },
            MethodAccessFlags::STATIC,
        ));

        // static int pick(int flag)
        let pick = class_graph.add_method(MethodData::new(
            java.lang.object,
            UnqualifiedName::from_string(String::from("pick")).unwrap(),
            MethodDescriptor {
                parameters: vec![FieldType::int()],
                return_type: Some(FieldType::int()),
            },
            MethodAccessFlags::STATIC,
        ));
        let mut donor = MethodCode::new();
        let other = donor.fresh_label();
        donor.mark_line(3);
        donor.push_instruction(Instruction::ILoad(0));
        donor.push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, other));
        donor.push_instruction(Instruction::IConst1);
        donor.push_branch_instruction(BranchInstruction::IReturn);
        donor.place_label(other);
        donor.push_instruction(Instruction::IConst2);
        donor.push_instruction(Instruction::IStore(1));
        donor.push_instruction(Instruction::ILoad(1));
        donor.push_branch_instruction(BranchInstruction::IReturn);

        let dispatcher = Dispatcher::bound(pick, AdviceRole::Enter).unwrap();
        let layout =
            OffsetLayout::new(OffsetHandler::Retaining, target, Some(&FieldType::int()), false)
                .unwrap();
        let mapping =
            AccessMapping::build(dispatcher.as_bound().unwrap(), &layout.resolve_enter())
                .unwrap();
        assert_eq!(mapping.offset_correction(), 2);

        let mut output = MethodCode::new();
        let region = {
            let mut writer: CodeWriter<Error> = CodeWriter::new(target, &mut output);
            splice(&donor, &mapping, &mut writer).unwrap()
        };

        assert_eq!(region.returns, 2);
        assert_eq!(region.copied, 10);
        let jumps_to_end = output
            .elements
            .iter()
            .filter(|element| {
                **element == CodeElement::Branch(BranchInstruction::Goto(region.end))
            })
            .count();
        assert_eq!(jumps_to_end, 2);
        assert_eq!(output.elements.last(), Some(&CodeElement::Label(region.end)));
        assert_eq!(
            output
                .elements
                .iter()
                .filter(|element| **element == CodeElement::Label(region.end))
                .count(),
            1
        );
        assert!(!output
            .elements
            .iter()
            .any(|element| matches!(element, CodeElement::LineNumber { .. })));
        assert!(!output
            .elements
            .iter()
            .any(|element| matches!(element, CodeElement::Branch(branch) if branch.is_return())));
        assert!(output
            .elements
            .contains(&CodeElement::Instruction(Instruction::IStore(3))));
        assert!(output
            .elements
            .contains(&CodeElement::Instruction(Instruction::ILoad(0))));

        // The branch and the label it targets agree, and neither reuses a donor label
        let branch_target = output.elements.iter().find_map(|element| match element {
            CodeElement::Branch(BranchInstruction::If(_, label)) => Some(*label),
            _ => None,
        });
        let branch_target = branch_target.unwrap();
        assert_ne!(branch_target, region.end);
        assert!(output
            .elements
            .contains(&CodeElement::Label(branch_target)));
    }
}
