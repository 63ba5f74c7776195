use crate::jvm::code::{CodeElement, SynLabel};
use crate::jvm::Error;
use std::collections::HashMap;

/// Operand stack height (in slots) on entry to every element of a method body
///
/// This is a plain forward dataflow over the control flow graph. Only heights are tracked, not
/// types, which is enough to recompute `max_stack` and to check what is on the stack at a given
/// instruction. Elements that are never reached have no height.
#[derive(Debug)]
pub struct StackHeights {
    heights: Vec<Option<usize>>,
    max_stack: usize,
}

impl StackHeights {
    pub fn analyze(elements: &[CodeElement<'_>]) -> Result<StackHeights, Error> {
        let label_indices: HashMap<SynLabel, usize> = elements
            .iter()
            .enumerate()
            .filter_map(|(index, element)| match element {
                CodeElement::Label(label) => Some((*label, index)),
                _ => None,
            })
            .collect();

        let mut heights = vec![None; elements.len()];
        let mut worklist: Vec<(usize, usize)> = vec![];
        let mut max_stack = 0;
        flow(&mut heights, &mut worklist, 0, 0)?;

        while let Some((index, height)) = worklist.pop() {
            match &elements[index] {
                CodeElement::Instruction(instruction) => {
                    let effect = instruction.stack_effect();
                    if effect.pops > height {
                        return Err(Error::StackUnderflow {
                            element: index,
                            height,
                            pops: effect.pops,
                        });
                    }
                    let next_height = height - effect.pops + effect.pushes;
                    max_stack = max_stack.max(next_height);
                    flow(&mut heights, &mut worklist, index + 1, next_height)?;
                }
                CodeElement::Branch(branch) => {
                    let pops = branch.pops();
                    if pops > height {
                        return Err(Error::StackUnderflow {
                            element: index,
                            height,
                            pops,
                        });
                    }
                    let next_height = height - pops;
                    for target in branch.jump_targets() {
                        let target_index = *label_indices
                            .get(&target)
                            .ok_or(Error::UnknownLabel(target))?;
                        flow(&mut heights, &mut worklist, target_index, next_height)?;
                    }
                    if branch.falls_through() {
                        flow(&mut heights, &mut worklist, index + 1, next_height)?;
                    }
                }
                CodeElement::Label(_) | CodeElement::LineNumber { .. } => {
                    flow(&mut heights, &mut worklist, index + 1, height)?;
                }
            }
        }

        Ok(StackHeights { heights, max_stack })
    }

    /// Height of the stack just before an element executes (`None` if it is unreachable)
    pub fn height_before(&self, element: usize) -> Option<usize> {
        self.heights.get(element).copied().flatten()
    }

    /// Largest height the stack reaches anywhere in the method
    pub fn max_stack(&self) -> usize {
        self.max_stack
    }
}

/// Record that control reaches `index` with the given height
fn flow(
    heights: &mut [Option<usize>],
    worklist: &mut Vec<(usize, usize)>,
    index: usize,
    height: usize,
) -> Result<(), Error> {
    match heights.get(index).copied() {
        None => Err(Error::MethodCodeFallsOffEnd),
        Some(None) => {
            heights[index] = Some(height);
            worklist.push((index, height));
            Ok(())
        }
        Some(Some(expected)) if expected == height => Ok(()),
        Some(Some(expected)) => Err(Error::InconsistentStackHeight {
            element: index,
            expected,
            found: height,
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{BranchInstruction::*, Instruction::*, MethodCode, OrdComparison};

    #[test]
    fn straight_line() {
        let mut code = MethodCode::new();
        code.push_instruction(LConst1);
        code.push_instruction(LConst0);
        code.push_instruction(LAdd);
        code.push_branch_instruction(LReturn);

        let heights = StackHeights::analyze(&code.elements).unwrap();
        assert_eq!(heights.max_stack(), 4);
        assert_eq!(heights.height_before(0), Some(0));
        assert_eq!(heights.height_before(2), Some(4));
        assert_eq!(heights.height_before(3), Some(2));
    }

    #[test]
    fn branches_and_unreachable_code() {
        let mut code = MethodCode::new();
        let other = code.fresh_label();
        code.push_instruction(ILoad(0));
        code.push_branch_instruction(If(OrdComparison::EQ, other));
        code.push_instruction(IConst1);
        code.push_branch_instruction(IReturn);
        code.push_instruction(Pop); // dead
        code.place_label(other);
        code.push_instruction(IConst0);
        code.push_branch_instruction(IReturn);

        let heights = StackHeights::analyze(&code.elements).unwrap();
        assert_eq!(heights.height_before(3), Some(1));
        assert_eq!(heights.height_before(4), None);
        assert_eq!(heights.height_before(5), Some(0));
        assert_eq!(heights.max_stack(), 1);
    }

    #[test]
    fn malformed_code() {
        let mut underflow = MethodCode::new();
        underflow.push_instruction(Pop);
        underflow.push_branch_instruction(Return);
        assert!(matches!(
            StackHeights::analyze(&underflow.elements),
            Err(Error::StackUnderflow { element: 0, .. })
        ));

        let mut falls_off = MethodCode::new();
        falls_off.push_instruction(Nop);
        assert!(matches!(
            StackHeights::analyze(&falls_off.elements),
            Err(Error::MethodCodeFallsOffEnd)
        ));

        let mut inconsistent = MethodCode::new();
        let join = inconsistent.fresh_label();
        inconsistent.push_instruction(ILoad(0));
        inconsistent.push_instruction(Dup);
        inconsistent.push_branch_instruction(If(OrdComparison::NE, join));
        inconsistent.push_instruction(Pop);
        inconsistent.place_label(join);
        inconsistent.push_branch_instruction(Return);
        assert!(matches!(
            StackHeights::analyze(&inconsistent.elements),
            Err(Error::InconsistentStackHeight { element: 4, .. })
        ));

        let mut unknown = MethodCode::new();
        let nowhere = unknown.fresh_label();
        unknown.push_branch_instruction(Goto(nowhere));
        assert!(matches!(
            StackHeights::analyze(&unknown.elements),
            Err(Error::UnknownLabel(_))
        ));
    }
}
