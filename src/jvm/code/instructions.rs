//! This module contains the AST of JVM bytecode. The representation is slightly different from
//! the usual presentation to make it more convenient to rewrite bytecode. For instance:
//!
//!   - The "wide" instruction doesn't show up at all, but instead gets merged into the
//!     instructions it is allowed to modify
//!
//!   - Some instructions (like the branches) get abstracted into one instruction with a field.
//!     This helps with repetitive pattern matches.
//!
//!   - Constant pool references are already resolved into the class graph
//!
//!   - Some instructions (`jsr`, `ret`, `invokedynamic`) are just omitted. Advice code never
//!     needs them.

use crate::jvm::class_graph::{ClassId, ConstantData, FieldId, MethodId};
use crate::jvm::{BaseType, FieldType, RefType};
use crate::util::Width;
use std::ops::Not;

/// Non-branching JVM bytecode instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction<'g> {
    Nop,
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush(i8),
    SiPush(i16),
    Ldc(ConstantData<'g>), // covers both `ldc` and `ldc_w`
    Ldc2(ConstantData<'g>),
    ILoad(u16), // covers `iload`, `iload{0,3}`, and `wide iload`
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IStore(u16), // covers `istore`, `istore{0,3}`, and `wide istore`
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishr`, `ishl`, and `iushr`
    LSh(ShiftType), // covers `lshr`, `lshl`, and `lushr`
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode), // covers `dcmpl` and `dcmpg`
    GetStatic(FieldId<'g>),
    PutStatic(FieldId<'g>),
    GetField(FieldId<'g>),
    PutField(FieldId<'g>),
    Invoke(InvokeType, MethodId<'g>),
    New(ClassId<'g>),
    NewArray(BaseType),
    ANewArray(RefType<ClassId<'g>>),
    ArrayLength,
    CheckCast(RefType<ClassId<'g>>),
    InstanceOf(RefType<ClassId<'g>>),
    MonitorEnter,
    MonitorExit,
    MultiANewArray(RefType<ClassId<'g>>, u8),
}

/// Number of stack slots consumed and then produced by an instruction
///
/// `long` and `double` values count for two slots, just like they do for `max_stack`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct StackEffect {
    pub pops: usize,
    pub pushes: usize,
}

const fn effect(pops: usize, pushes: usize) -> StackEffect {
    StackEffect { pops, pushes }
}

impl<'g> Instruction<'g> {
    /// Local variable slot accessed by the instruction, along with the width of the access
    pub fn local_slot(&self) -> Option<(u16, usize)> {
        use Instruction::*;

        match self {
            ILoad(slot) | FLoad(slot) | ALoad(slot) | IStore(slot) | FStore(slot)
            | AStore(slot) | IInc(slot, _) => Some((*slot, 1)),
            LLoad(slot) | DLoad(slot) | LStore(slot) | DStore(slot) => Some((*slot, 2)),
            _ => None,
        }
    }

    /// Does the instruction write to its local variable slot? (`iinc` both reads and writes)
    pub fn is_local_write(&self) -> bool {
        use Instruction::*;

        matches!(
            self,
            IStore(_) | LStore(_) | FStore(_) | DStore(_) | AStore(_) | IInc(_, _)
        )
    }

    /// Copy of the instruction with its local variable slot (if it has one) rewritten
    pub fn map_local_slot<E>(
        &self,
        map_slot: impl FnOnce(u16) -> Result<u16, E>,
    ) -> Result<Instruction<'g>, E> {
        use Instruction::*;

        Ok(match self {
            ILoad(slot) => ILoad(map_slot(*slot)?),
            LLoad(slot) => LLoad(map_slot(*slot)?),
            FLoad(slot) => FLoad(map_slot(*slot)?),
            DLoad(slot) => DLoad(map_slot(*slot)?),
            ALoad(slot) => ALoad(map_slot(*slot)?),
            IStore(slot) => IStore(map_slot(*slot)?),
            LStore(slot) => LStore(map_slot(*slot)?),
            FStore(slot) => FStore(map_slot(*slot)?),
            DStore(slot) => DStore(map_slot(*slot)?),
            AStore(slot) => AStore(map_slot(*slot)?),
            IInc(slot, delta) => IInc(map_slot(*slot)?, *delta),
            other => other.clone(),
        })
    }

    /// Load a local variable of the given type
    pub fn load<C>(field_type: &FieldType<C>, slot: u16) -> Instruction<'g> {
        match field_type {
            FieldType::Base(BaseType::Long) => Instruction::LLoad(slot),
            FieldType::Base(BaseType::Float) => Instruction::FLoad(slot),
            FieldType::Base(BaseType::Double) => Instruction::DLoad(slot),
            FieldType::Base(_) => Instruction::ILoad(slot),
            FieldType::Ref(_) => Instruction::ALoad(slot),
        }
    }

    /// Store a value of the given type into a local variable
    pub fn store<C>(field_type: &FieldType<C>, slot: u16) -> Instruction<'g> {
        match field_type {
            FieldType::Base(BaseType::Long) => Instruction::LStore(slot),
            FieldType::Base(BaseType::Float) => Instruction::FStore(slot),
            FieldType::Base(BaseType::Double) => Instruction::DStore(slot),
            FieldType::Base(_) => Instruction::IStore(slot),
            FieldType::Ref(_) => Instruction::AStore(slot),
        }
    }

    /// Push the default (zero) value of a type
    pub fn default_value<C>(field_type: &FieldType<C>) -> Instruction<'g> {
        match field_type {
            FieldType::Base(BaseType::Long) => Instruction::LConst0,
            FieldType::Base(BaseType::Float) => Instruction::FConst0,
            FieldType::Base(BaseType::Double) => Instruction::DConst0,
            FieldType::Base(_) => Instruction::IConst0,
            FieldType::Ref(_) => Instruction::AConstNull,
        }
    }

    /// Effect of the instruction on the operand stack
    pub fn stack_effect(&self) -> StackEffect {
        use Instruction::*;

        match self {
            Nop | IInc(_, _) => effect(0, 0),
            AConstNull | IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5
            | FConst0 | FConst1 | FConst2 | BiPush(_) | SiPush(_) => effect(0, 1),
            LConst0 | LConst1 | DConst0 | DConst1 => effect(0, 2),
            Ldc(_) => effect(0, 1),
            Ldc2(_) => effect(0, 2),
            ILoad(_) | FLoad(_) | ALoad(_) => effect(0, 1),
            LLoad(_) | DLoad(_) => effect(0, 2),
            IALoad | FALoad | AALoad | BALoad | CALoad | SALoad => effect(2, 1),
            LALoad | DALoad => effect(2, 2),
            IStore(_) | FStore(_) | AStore(_) => effect(1, 0),
            LStore(_) | DStore(_) => effect(2, 0),
            IAStore | FAStore | AAStore | BAStore | CAStore | SAStore => effect(3, 0),
            LAStore | DAStore => effect(4, 0),
            Pop => effect(1, 0),
            Pop2 => effect(2, 0),
            Dup => effect(1, 2),
            DupX1 => effect(2, 3),
            DupX2 => effect(3, 4),
            Dup2 => effect(2, 4),
            Dup2X1 => effect(3, 5),
            Dup2X2 => effect(4, 6),
            Swap => effect(2, 2),
            IAdd | FAdd | ISub | FSub | IMul | FMul | IDiv | FDiv | IRem | FRem | IAnd | IOr
            | IXor | ISh(_) => effect(2, 1),
            LAdd | DAdd | LSub | DSub | LMul | DMul | LDiv | DDiv | LRem | DRem | LAnd | LOr
            | LXor => effect(4, 2),
            LSh(_) => effect(3, 2),
            INeg | FNeg => effect(1, 1),
            LNeg | DNeg => effect(2, 2),
            I2F | F2I | I2B | I2C | I2S => effect(1, 1),
            I2L | I2D | F2L | F2D => effect(1, 2),
            L2I | L2F | D2I | D2F => effect(2, 1),
            L2D | D2L => effect(2, 2),
            LCmp | DCmp(_) => effect(4, 1),
            FCmp(_) => effect(2, 1),
            GetStatic(field) => effect(0, field.descriptor.width()),
            PutStatic(field) => effect(field.descriptor.width(), 0),
            GetField(field) => effect(1, field.descriptor.width()),
            PutField(field) => effect(1 + field.descriptor.width(), 0),
            Invoke(invoke_type, method) => {
                let has_receiver = !matches!(invoke_type, InvokeType::Static);
                let pushes = method.descriptor.return_type.as_ref().map_or(0, Width::width);
                effect(method.descriptor.parameter_length(has_receiver), pushes)
            }
            New(_) => effect(0, 1),
            NewArray(_) | ANewArray(_) | ArrayLength | CheckCast(_) | InstanceOf(_) => {
                effect(1, 1)
            }
            MonitorEnter | MonitorExit => effect(1, 0),
            MultiANewArray(_, dimensions) => effect(*dimensions as usize, 1),
        }
    }
}

/// Branching JVM bytecode instruction
///
/// Unlike in the class file, conditional branches don't mention their fallthrough: the next
/// element in the code is what follows when the branch is not taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchInstruction<Lbl> {
    If(OrdComparison, Lbl), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, Lbl), // covers `if_icmpeq`, `if_icmpne`, `if_icmplt`, ... `if_icmple`
    IfACmp(EqComparison, Lbl), // covers `if_acmpeq`, `if_acmpne`
    IfNull(EqComparison, Lbl), // covers `ifnull`, `ifnonnull`
    Goto(Lbl),                 // covers `goto` and `goto_w`
    TableSwitch {
        /// Jump target if the argument is less than `low` or greater than
        /// `low + targets.len()`
        default: Lbl,

        /// Value associated with the first jump target
        low: i32,

        /// Jump targets
        targets: Vec<Lbl>,
    },
    LookupSwitch {
        /// Jump target if there is no corresponding key
        default: Lbl,

        /// Jump targets (sorted so that the keys are ascending)
        targets: Vec<(i32, Lbl)>,
    },
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
    AThrow,
}

impl<Lbl: Copy> BranchInstruction<Lbl> {
    /// Labels the instruction may jump to (not including the fallthrough)
    pub fn jump_targets(&self) -> Vec<Lbl> {
        use BranchInstruction::*;

        match self {
            If(_, lbl) | IfICmp(_, lbl) | IfACmp(_, lbl) | IfNull(_, lbl) | Goto(lbl) => {
                vec![*lbl]
            }
            TableSwitch {
                default, targets, ..
            } => {
                let mut ts = vec![*default];
                ts.extend(targets.iter().copied());
                ts
            }
            LookupSwitch { default, targets } => {
                let mut ts = vec![*default];
                ts.extend(targets.iter().map(|(_, target)| *target));
                ts
            }
            IReturn | LReturn | FReturn | DReturn | AReturn | Return | AThrow => vec![],
        }
    }
}

impl<Lbl> BranchInstruction<Lbl> {
    /// Can execution continue with the next element?
    pub fn falls_through(&self) -> bool {
        matches!(
            self,
            BranchInstruction::If(_, _)
                | BranchInstruction::IfICmp(_, _)
                | BranchInstruction::IfACmp(_, _)
                | BranchInstruction::IfNull(_, _)
        )
    }

    /// Is this one of the return instructions?
    pub fn is_return(&self) -> bool {
        matches!(
            self,
            BranchInstruction::IReturn
                | BranchInstruction::LReturn
                | BranchInstruction::FReturn
                | BranchInstruction::DReturn
                | BranchInstruction::AReturn
                | BranchInstruction::Return
        )
    }

    /// Does this instruction leave the method (either by returning or by throwing)?
    pub fn is_exit(&self) -> bool {
        self.is_return() || matches!(self, BranchInstruction::AThrow)
    }

    /// Number of stack slots consumed by the instruction
    pub fn pops(&self) -> usize {
        use BranchInstruction::*;

        match self {
            If(_, _) | IfNull(_, _) => 1,
            IfICmp(_, _) | IfACmp(_, _) => 2,
            Goto(_) | Return => 0,
            TableSwitch { .. } | LookupSwitch { .. } => 1,
            IReturn | FReturn | AReturn | AThrow => 1,
            LReturn | DReturn => 2,
        }
    }

    pub fn map_labels<Lbl2>(
        &self,
        mut map_label: impl FnMut(&Lbl) -> Lbl2,
    ) -> BranchInstruction<Lbl2> {
        use BranchInstruction::*;

        match self {
            If(op, lbl) => If(*op, map_label(lbl)),
            IfICmp(op, lbl) => IfICmp(*op, map_label(lbl)),
            IfACmp(op, lbl) => IfACmp(*op, map_label(lbl)),
            IfNull(op, lbl) => IfNull(*op, map_label(lbl)),
            Goto(lbl) => Goto(map_label(lbl)),
            TableSwitch {
                default,
                low,
                targets,
            } => TableSwitch {
                default: map_label(default),
                low: *low,
                targets: targets.iter().map(&mut map_label).collect(),
            },
            LookupSwitch { default, targets } => LookupSwitch {
                default: map_label(default),
                targets: targets
                    .iter()
                    .map(|(key, lbl)| (*key, map_label(lbl)))
                    .collect(),
            },
            IReturn => IReturn,
            LReturn => LReturn,
            FReturn => FReturn,
            DReturn => DReturn,
            AReturn => AReturn,
            Return => Return,
            AThrow => AThrow,
        }
    }
}

/// Possible bit shifts
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// Type of method to invoke
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface(u8), // `count` is of total arguments, where `long`/`double` count for 2
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{LabelGenerator, SynLabelGenerator};

    #[test]
    fn local_slots() {
        assert_eq!(Instruction::ILoad(3).local_slot(), Some((3, 1)));
        assert_eq!(Instruction::DStore(4).local_slot(), Some((4, 2)));
        assert_eq!(Instruction::IInc(1, -1).local_slot(), Some((1, 1)));
        assert!(Instruction::IInc(1, -1).is_local_write());
        assert!(Instruction::DStore(2).is_local_write());
        assert!(!Instruction::DLoad(2).is_local_write());
        assert_eq!(Instruction::IAdd.local_slot(), None);

        let shifted = Instruction::IInc(1, -1).map_local_slot(|slot| Ok::<u16, ()>(slot + 5));
        assert_eq!(shifted, Ok(Instruction::IInc(6, -1)));
        let untouched = Instruction::IAdd.map_local_slot(|_| Err::<u16, ()>(()));
        assert_eq!(untouched, Ok(Instruction::IAdd));
    }

    #[test]
    fn typed_locals() {
        let long: FieldType<()> = FieldType::long();
        let boolean: FieldType<()> = FieldType::boolean();
        let object: FieldType<()> = FieldType::object(());

        assert_eq!(Instruction::load(&long, 2), Instruction::LLoad(2));
        assert_eq!(Instruction::store(&boolean, 1), Instruction::IStore(1));
        assert_eq!(Instruction::store(&object, 7), Instruction::AStore(7));
        assert_eq!(Instruction::default_value(&long), Instruction::LConst0);
        assert_eq!(Instruction::default_value(&object), Instruction::AConstNull);
    }

    #[test]
    fn stack_effects() {
        assert_eq!(Instruction::LAdd.stack_effect(), effect(4, 2));
        assert_eq!(Instruction::LSh(ShiftType::Left).stack_effect(), effect(3, 2));
        assert_eq!(Instruction::Dup2X1.stack_effect(), effect(3, 5));
        assert_eq!(Instruction::I2D.stack_effect(), effect(1, 2));
        assert_eq!(Instruction::IInc(0, 1).stack_effect(), effect(0, 0));
    }

    #[test]
    fn branch_targets() {
        let mut labels = SynLabelGenerator::default();
        let (l0, l1, l2) = (labels.fresh_label(), labels.fresh_label(), labels.fresh_label());

        let switch = BranchInstruction::LookupSwitch {
            default: l0,
            targets: vec![(1, l1), (5, l2)],
        };
        assert_eq!(switch.jump_targets(), vec![l0, l1, l2]);
        assert!(!switch.falls_through());
        assert_eq!(switch.pops(), 1);

        let branch = BranchInstruction::IfICmp(OrdComparison::LT, l1);
        assert!(branch.falls_through());
        assert_eq!(
            branch.map_labels(|_| l2),
            BranchInstruction::IfICmp(OrdComparison::LT, l2)
        );

        assert!(BranchInstruction::<()>::DReturn.is_return());
        assert_eq!(BranchInstruction::<()>::DReturn.pops(), 2);
        assert!(BranchInstruction::<()>::AThrow.is_exit());
        assert!(!BranchInstruction::<()>::AThrow.is_return());
        assert_eq!(!OrdComparison::LT, OrdComparison::GE);
    }
}
