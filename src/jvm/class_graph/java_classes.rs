use super::{BinaryName, ClassAccessFlags, ClassData, ClassGraph, ClassId};
use elsa::FrozenVec;

/// Classes inside `java.*` which advice signatures commonly mention
pub struct JavaClasses<'g> {
    pub lang: LangClasses<'g>,
    pub io: IoClasses<'g>,
}

/// Classes inside `java.lang.*`
pub struct LangClasses<'g> {
    pub object: ClassId<'g>,
    pub cloneable: ClassId<'g>,
    pub char_sequence: ClassId<'g>,
    pub string: ClassId<'g>,
    pub number: ClassId<'g>,
    pub integer: ClassId<'g>,
    pub throwable: ClassId<'g>,
    pub exception: ClassId<'g>,
    pub runtime_exception: ClassId<'g>,
}

/// Classes inside `java.io.*`
pub struct IoClasses<'g> {
    pub serializable: ClassId<'g>,
}

impl<'g> JavaClasses<'g> {
    pub fn add_to_graph(class_graph: &ClassGraph<'g>) -> JavaClasses<'g> {
        let object = class_graph.add_class(ClassData {
            name: BinaryName::OBJECT,
            superclass: None,
            interfaces: FrozenVec::new(),
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            methods: FrozenVec::new(),
            fields: FrozenVec::new(),
        });

        let interface = ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE;
        let class = ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER;
        let final_class = class | ClassAccessFlags::FINAL;

        let serializable =
            class_graph.add_class(ClassData::new(BinaryName::SERIALIZABLE, object, interface));
        let cloneable =
            class_graph.add_class(ClassData::new(BinaryName::CLONEABLE, object, interface));
        let char_sequence =
            class_graph.add_class(ClassData::new(BinaryName::CHARSEQUENCE, object, interface));
        let string =
            class_graph.add_class(ClassData::new(BinaryName::STRING, object, final_class));
        let number = class_graph.add_class(ClassData::new(BinaryName::NUMBER, object, class));
        let integer =
            class_graph.add_class(ClassData::new(BinaryName::INTEGER, number, final_class));
        let throwable =
            class_graph.add_class(ClassData::new(BinaryName::THROWABLE, object, class));
        let exception =
            class_graph.add_class(ClassData::new(BinaryName::EXCEPTION, throwable, class));
        let runtime_exception = class_graph.add_class(ClassData::new(
            BinaryName::RUNTIMEEXCEPTION,
            exception,
            class,
        ));

        string.interfaces.push(char_sequence.0);
        string.interfaces.push(serializable.0);
        number.interfaces.push(serializable.0);
        throwable.interfaces.push(serializable.0);

        JavaClasses {
            lang: LangClasses {
                object,
                cloneable,
                char_sequence,
                string,
                number,
                integer,
                throwable,
                exception,
                runtime_exception,
            },
            io: IoClasses { serializable },
        }
    }
}
