use crate::jvm::class_graph::{ClassId, ConstantData, FieldId, MethodId};
use crate::jvm::code::{
    BranchInstruction, CodeElement, CompareMode, EqComparison, Instruction, InvokeType,
    MethodCode, OrdComparison, ShiftType, SynLabel,
};
use crate::jvm::{BaseType, Error, RefType};
use crate::util::Offset;
use byteorder::{BigEndian, ReadBytesExt};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::{self, Cursor};

/// Lookup of constant pool entries, already resolved into the class graph
///
/// Returning `None` means the entry is missing or is not of the requested kind.
pub trait ConstantResolver<'g> {
    /// Loadable constant (for `ldc`, `ldc_w`, and `ldc2_w`)
    fn constant(&self, index: u16) -> Option<ConstantData<'g>>;

    /// Class, interface, or array type
    fn class(&self, index: u16) -> Option<RefType<ClassId<'g>>>;

    /// Field reference
    fn field(&self, index: u16) -> Option<FieldId<'g>>;

    /// Method or interface method reference
    fn method(&self, index: u16) -> Option<MethodId<'g>>;
}

/// Contents of a `Code` attribute, before decoding
#[derive(Clone, Debug, Default)]
pub struct RawCode {
    pub max_stack: u16,
    pub max_locals: u16,

    /// Bytecode
    pub code: Vec<u8>,

    /// Entries of the `exception_table`
    pub exception_table: Vec<ExceptionHandler>,

    /// Entries of the `LineNumberTable` attribute, as `(start_pc, line_number)`
    pub line_numbers: Vec<(u16, u16)>,
}

/// Entry of the exception table of a `Code` attribute
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,

    /// Constant pool index of the caught class, or 0 for any exception
    pub catch_type: u16,
}

/// Instruction decoded from the code array, with jump targets still as absolute byte offsets
enum Decoded<'g> {
    Instruction(Instruction<'g>),
    Branch(BranchInstruction<isize>),
}

/// Decode bytecode into the symbolic representation
///
/// Every byte offset which is the target of a jump or the start of a line number gets exactly one
/// label, in increasing order of offset. The label generator of the result starts after those.
///
/// Exception handlers can't be represented, so code with a non-empty exception table is rejected.
pub fn decode_code<'g, R: ConstantResolver<'g> + ?Sized>(
    raw: &RawCode,
    resolver: &R,
) -> Result<MethodCode<'g>, Error> {
    if let Some(handler) = raw.exception_table.first() {
        return Err(Error::UnsupportedExceptionHandler {
            handler_pc: Offset(handler.handler_pc as usize),
            handlers: raw.exception_table.len(),
        });
    }

    let mut cursor = Cursor::new(raw.code.as_slice());
    let mut decoded: Vec<(usize, Decoded<'g>)> = vec![];
    while (cursor.position() as usize) < raw.code.len() {
        let start = cursor.position() as usize;
        decoded.push((start, decode_instruction(&mut cursor, resolver)?));
    }

    let instruction_starts: HashSet<usize> = decoded.iter().map(|(start, _)| *start).collect();
    let mut targets: BTreeSet<usize> = BTreeSet::new();
    for (start, instruction) in &decoded {
        if let Decoded::Branch(branch) = instruction {
            for target in branch.jump_targets() {
                targets.insert(check_target(&instruction_starts, *start, target)?);
            }
        }
    }
    let mut lines: BTreeMap<usize, Vec<u16>> = BTreeMap::new();
    for (start_pc, line) in &raw.line_numbers {
        let start_pc = *start_pc as usize;
        let start = check_target(&instruction_starts, start_pc, start_pc as isize)?;
        targets.insert(start);
        lines.entry(start).or_default().push(*line);
    }

    let mut code = MethodCode::new();
    let labels: HashMap<usize, SynLabel> = targets
        .into_iter()
        .map(|target| (target, code.fresh_label()))
        .collect();

    for (start, instruction) in decoded {
        if let Some(label) = labels.get(&start) {
            code.place_label(*label);
            for line in lines.get(&start).into_iter().flatten() {
                code.elements.push(CodeElement::LineNumber {
                    line: *line,
                    start: *label,
                });
            }
        }
        match instruction {
            Decoded::Instruction(instruction) => code.push_instruction(instruction),
            Decoded::Branch(branch) => {
                // every target was checked and labelled above
                let branch = branch.map_labels(|target| labels[&(*target as usize)]);
                code.push_branch_instruction(branch);
            }
        }
    }

    code.max_stack = raw.max_stack;
    code.max_locals = raw.max_locals;
    Ok(code)
}

/// Ensure a jump target lands on the start of an instruction
fn check_target(
    instruction_starts: &HashSet<usize>,
    offset: usize,
    target: isize,
) -> Result<usize, Error> {
    usize::try_from(target)
        .ok()
        .filter(|target| instruction_starts.contains(target))
        .ok_or(Error::InvalidJumpTarget {
            offset: Offset(offset),
            target,
        })
}

fn decode_instruction<'g, R: ConstantResolver<'g> + ?Sized>(
    cursor: &mut Cursor<&[u8]>,
    resolver: &R,
) -> Result<Decoded<'g>, Error> {
    use BranchInstruction::*;
    use Instruction::*;

    let start = cursor.position() as usize;
    let eof = move |_: io::Error| Error::TruncatedCode(Offset(start));
    let missing = move |index: u16| Error::MissingConstant {
        offset: Offset(start),
        index,
    };
    let relative = move |delta: i32| start as isize + delta as isize;

    let opcode = cursor.read_u8().map_err(eof)?;
    if let Some(instruction) = simple_instruction(opcode) {
        return Ok(Decoded::Instruction(instruction));
    }

    let instruction = match opcode {
        0x10 => BiPush(cursor.read_i8().map_err(eof)?),
        0x11 => SiPush(cursor.read_i16::<BigEndian>().map_err(eof)?),
        0x12 | 0x13 | 0x14 => {
            let index = if opcode == 0x12 {
                cursor.read_u8().map_err(eof)? as u16
            } else {
                cursor.read_u16::<BigEndian>().map_err(eof)?
            };
            let wide = opcode == 0x14;
            let constant = resolver
                .constant(index)
                .filter(|constant| constant.is_wide() == wide)
                .ok_or_else(|| missing(index))?;
            if wide {
                Ldc2(constant)
            } else {
                Ldc(constant)
            }
        }
        0x15..=0x19 => typed_local(opcode - 0x15, cursor.read_u8().map_err(eof)? as u16, true),
        0x36..=0x3a => typed_local(opcode - 0x36, cursor.read_u8().map_err(eof)? as u16, false),
        0x84 => {
            let slot = cursor.read_u8().map_err(eof)? as u16;
            IInc(slot, cursor.read_i8().map_err(eof)? as i16)
        }
        0x99..=0xa6 | 0xa7 | 0xc6 | 0xc7 | 0xc8 => {
            let delta = if opcode == 0xc8 {
                cursor.read_i32::<BigEndian>().map_err(eof)?
            } else {
                cursor.read_i16::<BigEndian>().map_err(eof)? as i32
            };
            let target = relative(delta);
            let branch = match opcode {
                0x99..=0x9e => If(ord_comparison(opcode - 0x99), target),
                0x9f..=0xa4 => IfICmp(ord_comparison(opcode - 0x9f), target),
                0xa5 => IfACmp(EqComparison::EQ, target),
                0xa6 => IfACmp(EqComparison::NE, target),
                0xc6 => IfNull(EqComparison::EQ, target),
                0xc7 => IfNull(EqComparison::NE, target),
                _ => Goto(target),
            };
            return Ok(Decoded::Branch(branch));
        }
        0xaa => {
            skip_switch_padding(cursor).map_err(eof)?;
            let default = relative(cursor.read_i32::<BigEndian>().map_err(eof)?);
            let low = cursor.read_i32::<BigEndian>().map_err(eof)?;
            let high = cursor.read_i32::<BigEndian>().map_err(eof)?;
            let mut targets = vec![];
            for _ in i64::from(low)..=i64::from(high) {
                targets.push(relative(cursor.read_i32::<BigEndian>().map_err(eof)?));
            }
            return Ok(Decoded::Branch(TableSwitch {
                default,
                low,
                targets,
            }));
        }
        0xab => {
            skip_switch_padding(cursor).map_err(eof)?;
            let default = relative(cursor.read_i32::<BigEndian>().map_err(eof)?);
            let pairs = cursor.read_i32::<BigEndian>().map_err(eof)?;
            let mut targets = vec![];
            for _ in 0..pairs {
                let key = cursor.read_i32::<BigEndian>().map_err(eof)?;
                targets.push((key, relative(cursor.read_i32::<BigEndian>().map_err(eof)?)));
            }
            return Ok(Decoded::Branch(LookupSwitch { default, targets }));
        }
        0xac => return Ok(Decoded::Branch(IReturn)),
        0xad => return Ok(Decoded::Branch(LReturn)),
        0xae => return Ok(Decoded::Branch(FReturn)),
        0xaf => return Ok(Decoded::Branch(DReturn)),
        0xb0 => return Ok(Decoded::Branch(AReturn)),
        0xb1 => return Ok(Decoded::Branch(Return)),
        0xbf => return Ok(Decoded::Branch(AThrow)),
        0xb2..=0xb5 => {
            let index = cursor.read_u16::<BigEndian>().map_err(eof)?;
            let field = resolver.field(index).ok_or_else(|| missing(index))?;
            match opcode {
                0xb2 => GetStatic(field),
                0xb3 => PutStatic(field),
                0xb4 => GetField(field),
                _ => PutField(field),
            }
        }
        0xb6..=0xb9 => {
            let index = cursor.read_u16::<BigEndian>().map_err(eof)?;
            let method = resolver.method(index).ok_or_else(|| missing(index))?;
            let invoke_type = match opcode {
                0xb6 => InvokeType::Virtual,
                0xb7 => InvokeType::Special,
                0xb8 => InvokeType::Static,
                _ => {
                    let count = cursor.read_u8().map_err(eof)?;
                    cursor.read_u8().map_err(eof)?;
                    InvokeType::Interface(count)
                }
            };
            Invoke(invoke_type, method)
        }
        0xbb => {
            let index = cursor.read_u16::<BigEndian>().map_err(eof)?;
            match resolver.class(index) {
                Some(RefType::Object(class)) => New(class),
                _ => return Err(missing(index)),
            }
        }
        0xbc => {
            let base_type = match cursor.read_u8().map_err(eof)? {
                4 => BaseType::Boolean,
                5 => BaseType::Char,
                6 => BaseType::Float,
                7 => BaseType::Double,
                8 => BaseType::Byte,
                9 => BaseType::Short,
                10 => BaseType::Int,
                11 => BaseType::Long,
                _ => {
                    return Err(Error::UnsupportedOpcode {
                        offset: Offset(start),
                        opcode,
                    })
                }
            };
            NewArray(base_type)
        }
        0xbd | 0xc0 | 0xc1 | 0xc5 => {
            let index = cursor.read_u16::<BigEndian>().map_err(eof)?;
            let class = resolver.class(index).ok_or_else(|| missing(index))?;
            match opcode {
                0xbd => ANewArray(class),
                0xc0 => CheckCast(class),
                0xc1 => InstanceOf(class),
                _ => MultiANewArray(class, cursor.read_u8().map_err(eof)?),
            }
        }
        0xc4 => {
            let modified = cursor.read_u8().map_err(eof)?;
            match modified {
                0x15..=0x19 => typed_local(
                    modified - 0x15,
                    cursor.read_u16::<BigEndian>().map_err(eof)?,
                    true,
                ),
                0x36..=0x3a => typed_local(
                    modified - 0x36,
                    cursor.read_u16::<BigEndian>().map_err(eof)?,
                    false,
                ),
                0x84 => {
                    let slot = cursor.read_u16::<BigEndian>().map_err(eof)?;
                    IInc(slot, cursor.read_i16::<BigEndian>().map_err(eof)?)
                }
                _ => {
                    return Err(Error::UnsupportedOpcode {
                        offset: Offset(start),
                        opcode: modified,
                    })
                }
            }
        }

        // `jsr`, `ret`, `invokedynamic`, `jsr_w`, and anything undefined
        _ => {
            return Err(Error::UnsupportedOpcode {
                offset: Offset(start),
                opcode,
            })
        }
    };

    Ok(Decoded::Instruction(instruction))
}

/// Switch operands are aligned to a multiple of four bytes from the start of the code
fn skip_switch_padding(cursor: &mut Cursor<&[u8]>) -> io::Result<()> {
    while cursor.position() % 4 != 0 {
        cursor.read_u8()?;
    }
    Ok(())
}

/// Operand order shared by `if<cond>` and `if_icmp<cond>`
fn ord_comparison(index: u8) -> OrdComparison {
    match index {
        0 => OrdComparison::EQ,
        1 => OrdComparison::NE,
        2 => OrdComparison::LT,
        3 => OrdComparison::GE,
        4 => OrdComparison::GT,
        _ => OrdComparison::LE,
    }
}

/// Load or store in the `int`, `long`, `float`, `double`, `reference` opcode order
fn typed_local<'g>(kind: u8, slot: u16, is_load: bool) -> Instruction<'g> {
    use Instruction::*;

    match (kind, is_load) {
        (0, true) => ILoad(slot),
        (1, true) => LLoad(slot),
        (2, true) => FLoad(slot),
        (3, true) => DLoad(slot),
        (_, true) => ALoad(slot),
        (0, false) => IStore(slot),
        (1, false) => LStore(slot),
        (2, false) => FStore(slot),
        (3, false) => DStore(slot),
        (_, false) => AStore(slot),
    }
}

/// Instructions without any operands
fn simple_instruction<'g>(opcode: u8) -> Option<Instruction<'g>> {
    use Instruction::*;

    let instruction = match opcode {
        0x00 => Nop,
        0x01 => AConstNull,
        0x02 => IConstM1,
        0x03 => IConst0,
        0x04 => IConst1,
        0x05 => IConst2,
        0x06 => IConst3,
        0x07 => IConst4,
        0x08 => IConst5,
        0x09 => LConst0,
        0x0a => LConst1,
        0x0b => FConst0,
        0x0c => FConst1,
        0x0d => FConst2,
        0x0e => DConst0,
        0x0f => DConst1,
        0x1a..=0x2d => typed_local((opcode - 0x1a) / 4, ((opcode - 0x1a) % 4) as u16, true),
        0x2e => IALoad,
        0x2f => LALoad,
        0x30 => FALoad,
        0x31 => DALoad,
        0x32 => AALoad,
        0x33 => BALoad,
        0x34 => CALoad,
        0x35 => SALoad,
        0x3b..=0x4e => typed_local((opcode - 0x3b) / 4, ((opcode - 0x3b) % 4) as u16, false),
        0x4f => IAStore,
        0x50 => LAStore,
        0x51 => FAStore,
        0x52 => DAStore,
        0x53 => AAStore,
        0x54 => BAStore,
        0x55 => CAStore,
        0x56 => SAStore,
        0x57 => Pop,
        0x58 => Pop2,
        0x59 => Dup,
        0x5a => DupX1,
        0x5b => DupX2,
        0x5c => Dup2,
        0x5d => Dup2X1,
        0x5e => Dup2X2,
        0x5f => Swap,
        0x60 => IAdd,
        0x61 => LAdd,
        0x62 => FAdd,
        0x63 => DAdd,
        0x64 => ISub,
        0x65 => LSub,
        0x66 => FSub,
        0x67 => DSub,
        0x68 => IMul,
        0x69 => LMul,
        0x6a => FMul,
        0x6b => DMul,
        0x6c => IDiv,
        0x6d => LDiv,
        0x6e => FDiv,
        0x6f => DDiv,
        0x70 => IRem,
        0x71 => LRem,
        0x72 => FRem,
        0x73 => DRem,
        0x74 => INeg,
        0x75 => LNeg,
        0x76 => FNeg,
        0x77 => DNeg,
        0x78 => ISh(ShiftType::Left),
        0x79 => LSh(ShiftType::Left),
        0x7a => ISh(ShiftType::ArithmeticRight),
        0x7b => LSh(ShiftType::ArithmeticRight),
        0x7c => ISh(ShiftType::LogicalRight),
        0x7d => LSh(ShiftType::LogicalRight),
        0x7e => IAnd,
        0x7f => LAnd,
        0x80 => IOr,
        0x81 => LOr,
        0x82 => IXor,
        0x83 => LXor,
        0x85 => I2L,
        0x86 => I2F,
        0x87 => I2D,
        0x88 => L2I,
        0x89 => L2F,
        0x8a => L2D,
        0x8b => F2I,
        0x8c => F2L,
        0x8d => F2D,
        0x8e => D2I,
        0x8f => D2L,
        0x90 => D2F,
        0x91 => I2B,
        0x92 => I2C,
        0x93 => I2S,
        0x94 => LCmp,
        0x95 => FCmp(CompareMode::L),
        0x96 => FCmp(CompareMode::G),
        0x97 => DCmp(CompareMode::L),
        0x98 => DCmp(CompareMode::G),
        0xbe => ArrayLength,
        0xc2 => MonitorEnter,
        0xc3 => MonitorExit,
        _ => return None,
    };
    Some(instruction)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_graph::{ClassGraph, ClassGraphArenas, FieldData, MethodData};
    use crate::jvm::code::{LabelGenerator, SynLabelGenerator};
    use crate::jvm::{
        FieldAccessFlags, FieldType, MethodAccessFlags, MethodDescriptor, Name, UnqualifiedName,
    };
    use std::borrow::Cow;

    #[derive(Default)]
    struct TestResolver<'g> {
        constants: HashMap<u16, ConstantData<'g>>,
        classes: HashMap<u16, RefType<ClassId<'g>>>,
        fields: HashMap<u16, FieldId<'g>>,
        methods: HashMap<u16, MethodId<'g>>,
    }

    impl<'g> ConstantResolver<'g> for TestResolver<'g> {
        fn constant(&self, index: u16) -> Option<ConstantData<'g>> {
            self.constants.get(&index).cloned()
        }

        fn class(&self, index: u16) -> Option<RefType<ClassId<'g>>> {
            self.classes.get(&index).copied()
        }

        fn field(&self, index: u16) -> Option<FieldId<'g>> {
            self.fields.get(&index).copied()
        }

        fn method(&self, index: u16) -> Option<MethodId<'g>> {
            self.methods.get(&index).copied()
        }
    }

    fn raw_code(code: Vec<u8>) -> RawCode {
        RawCode {
            max_stack: 2,
            max_locals: 1,
            code,
            exception_table: vec![],
            line_numbers: vec![],
        }
    }

    #[test]
    fn branches_and_line_numbers() {
        let resolver = TestResolver::default();
        let mut raw = raw_code(vec![
            0x1a, // iload_0
            0x99, 0x00, 0x05, // ifeq +5
            0x04, // iconst_1
            0xac, // ireturn
            0x03, // iconst_0
            0xac, // ireturn
        ]);
        raw.line_numbers = vec![(0, 10), (6, 12)];
        let mut code = decode_code(&raw, &resolver).unwrap();

        let mut labels = SynLabelGenerator::default();
        let (l0, l1) = (labels.fresh_label(), labels.fresh_label());
        assert_eq!(
            code.elements,
            vec![
                CodeElement::Label(l0),
                CodeElement::LineNumber { line: 10, start: l0 },
                CodeElement::Instruction(Instruction::ILoad(0)),
                CodeElement::Branch(BranchInstruction::If(OrdComparison::EQ, l1)),
                CodeElement::Instruction(Instruction::IConst1),
                CodeElement::Branch(BranchInstruction::IReturn),
                CodeElement::Label(l1),
                CodeElement::LineNumber { line: 12, start: l1 },
                CodeElement::Instruction(Instruction::IConst0),
                CodeElement::Branch(BranchInstruction::IReturn),
            ]
        );
        assert_eq!(code.max_stack, 2);
        assert_eq!(code.fresh_label(), labels.fresh_label());
    }

    #[test]
    fn wide_and_switch() {
        let resolver = TestResolver::default();
        let raw = raw_code(vec![
            0xc4, 0x84, 0x01, 0x00, 0xff, 0xff, // wide iinc 256 -1
            0x15, 0x05, // iload 5
            0xaa, 0x00, 0x00, 0x00, // tableswitch + padding
            0x00, 0x00, 0x00, 0x18, // default: +24
            0x00, 0x00, 0x00, 0x00, // low: 0
            0x00, 0x00, 0x00, 0x01, // high: 1
            0x00, 0x00, 0x00, 0x18, // 0: +24
            0x00, 0x00, 0x00, 0x19, // 1: +25
            0xb1, // return
            0xb1, // return
        ]);
        let code = decode_code(&raw, &resolver).unwrap();

        let mut labels = SynLabelGenerator::default();
        let (l0, l1) = (labels.fresh_label(), labels.fresh_label());
        assert_eq!(
            code.elements,
            vec![
                CodeElement::Instruction(Instruction::IInc(256, -1)),
                CodeElement::Instruction(Instruction::ILoad(5)),
                CodeElement::Branch(BranchInstruction::TableSwitch {
                    default: l0,
                    low: 0,
                    targets: vec![l0, l1],
                }),
                CodeElement::Label(l0),
                CodeElement::Branch(BranchInstruction::Return),
                CodeElement::Label(l1),
                CodeElement::Branch(BranchInstruction::Return),
            ]
        );
    }

    #[test]
    fn resolves_constants() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();
        let value_of = class_graph.add_method(MethodData::new(
            java.lang.string,
            UnqualifiedName::from_string(String::from("valueOf")).unwrap(),
            MethodDescriptor {
                parameters: vec![FieldType::object(java.lang.object)],
                return_type: Some(FieldType::object(java.lang.string)),
            },
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        ));

        let max_value = class_graph.add_field(FieldData {
            class: java.lang.integer,
            name: UnqualifiedName::from_string(String::from("MAX_VALUE")).unwrap(),
            descriptor: FieldType::int(),
            access_flags: FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC,
        });

        let mut resolver = TestResolver::default();
        resolver.fields.insert(3, max_value);
        resolver
            .constants
            .insert(1, ConstantData::String(Cow::Borrowed("hi")));
        resolver.methods.insert(2, value_of);
        resolver
            .classes
            .insert(4, RefType::Object(java.lang.object));

        let raw = raw_code(vec![
            0x12, 0x01, // ldc #1
            0xb8, 0x00, 0x02, // invokestatic #2
            0x57, // pop
            0xbb, 0x00, 0x04, // new #4
            0x57, // pop
            0xb2, 0x00, 0x03, // getstatic #3
            0x57, // pop
            0xb1, // return
        ]);
        let code = decode_code(&raw, &resolver).unwrap();
        assert_eq!(
            code.elements,
            vec![
                CodeElement::Instruction(Instruction::Ldc(ConstantData::String(Cow::Borrowed(
                    "hi"
                )))),
                CodeElement::Instruction(Instruction::Invoke(InvokeType::Static, value_of)),
                CodeElement::Instruction(Instruction::Pop),
                CodeElement::Instruction(Instruction::New(java.lang.object)),
                CodeElement::Instruction(Instruction::Pop),
                CodeElement::Instruction(Instruction::GetStatic(max_value)),
                CodeElement::Instruction(Instruction::Pop),
                CodeElement::Branch(BranchInstruction::Return),
            ]
        );

        // `ldc2_w` of a constant that isn't a `long` or `double`
        assert!(matches!(
            decode_code(&raw_code(vec![0x14, 0x00, 0x01, 0xb1]), &resolver),
            Err(Error::MissingConstant { index: 1, .. })
        ));
    }

    #[test]
    fn malformed_code() {
        let resolver = TestResolver::default();

        assert!(matches!(
            decode_code(&raw_code(vec![0xa8, 0x00, 0x03, 0xb1]), &resolver),
            Err(Error::UnsupportedOpcode { opcode: 0xa8, .. })
        ));
        assert!(matches!(
            decode_code(&raw_code(vec![0x11, 0x01]), &resolver),
            Err(Error::TruncatedCode(Offset(0)))
        ));
        assert!(matches!(
            decode_code(&raw_code(vec![0xa7, 0x00, 0x01, 0xb1]), &resolver),
            Err(Error::InvalidJumpTarget { target: 1, .. })
        ));
        assert!(matches!(
            decode_code(&raw_code(vec![0xc4, 0xa9, 0x00, 0x01]), &resolver),
            Err(Error::UnsupportedOpcode { opcode: 0xa9, .. })
        ));
    }

    #[test]
    fn exception_handlers() {
        let resolver = TestResolver::default();

        // try { return; } catch (Throwable t) { throw t; }
        let mut raw = raw_code(vec![
            0xb1, // return
            0x4b, // astore_0
            0x2a, // aload_0
            0xbf, // athrow
        ]);
        raw.exception_table = vec![ExceptionHandler {
            start_pc: 0,
            end_pc: 1,
            handler_pc: 1,
            catch_type: 0,
        }];
        assert!(matches!(
            decode_code(&raw, &resolver),
            Err(Error::UnsupportedExceptionHandler {
                handler_pc: Offset(1),
                handlers: 1,
            })
        ));

        raw.exception_table.clear();
        assert!(decode_code(&raw, &resolver).is_ok());
    }
}
