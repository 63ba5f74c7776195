use super::{
    BinaryName, ClassAccessFlags, FieldAccessFlags, FieldType, MethodAccessFlags,
    MethodDescriptor, Name, RefType, RenderDescriptor, UnqualifiedName,
};
use crate::util::RefId;
use elsa::FrozenVec;
use std::borrow::Cow;
use std::fmt;
use std::fmt::Debug;
use typed_arena::Arena;

mod assignable;
mod java_classes;

pub use assignable::*;
pub use java_classes::*;

pub type ClassId<'g> = RefId<'g, ClassData<'g>>;
pub type MethodId<'g> = RefId<'g, MethodData<'g>>;
pub type FieldId<'g> = RefId<'g, FieldData<'g>>;

pub struct ClassGraphArenas<'g> {
    class_arena: Arena<ClassData<'g>>,
    method_arena: Arena<MethodData<'g>>,
    field_arena: Arena<FieldData<'g>>,
}

impl<'g> ClassGraphArenas<'g> {
    pub fn new() -> Self {
        ClassGraphArenas {
            class_arena: Arena::new(),
            method_arena: Arena::new(),
            field_arena: Arena::new(),
        }
    }
}

impl<'g> Default for ClassGraphArenas<'g> {
    fn default() -> Self {
        ClassGraphArenas::new()
    }
}

/// Tracks the relationships between classes/interfaces and the members on those classes
///
/// Both the advice class and the classes being instrumented live in the same graph, so that the
/// parameter types of advice methods can be checked for assignability against the types of the
/// instrumented methods.
pub struct ClassGraph<'g> {
    arenas: &'g ClassGraphArenas<'g>,
}

impl<'g> ClassGraph<'g> {
    /// New empty graph
    pub fn new(arenas: &'g ClassGraphArenas<'g>) -> Self {
        ClassGraph { arenas }
    }

    /// Add a new class to the class graph
    pub fn add_class(&self, data: ClassData<'g>) -> ClassId<'g> {
        RefId(self.arenas.class_arena.alloc(data))
    }

    /// Add a field to the class graph and to its class
    pub fn add_field(&self, field: FieldData<'g>) -> FieldId<'g> {
        let data = &*self.arenas.field_arena.alloc(field);
        data.class.fields.push(data);
        RefId(data)
    }

    /// Add a method to the class graph and to its class
    ///
    /// If the class already has a method with the same name, descriptor, and staticness, that
    /// method is returned instead.
    pub fn add_method(&self, method: MethodData<'g>) -> MethodId<'g> {
        if let Some(m) = method.class.0.methods.iter().find(|m| {
            m.name == method.name
                && m.descriptor == method.descriptor
                && m.is_static() == method.is_static()
        }) {
            RefId(m)
        } else {
            let data = &*self.arenas.method_arena.alloc(method);
            data.class.methods.push(data);
            RefId(data)
        }
    }

    /// Add standard types to the class graph
    pub fn insert_java_library_types(&self) -> JavaClasses<'g> {
        JavaClasses::add_to_graph(self)
    }
}

pub struct ClassData<'g> {
    /// Name of the class
    pub name: BinaryName,

    /// Superclass is only ever missing for `java/lang/Object` itself
    pub superclass: Option<ClassId<'g>>,

    /// Interfaces implemented (or super-interfaces)
    pub interfaces: FrozenVec<&'g ClassData<'g>>,

    /// Access flags for the class
    pub access_flags: ClassAccessFlags,

    /// Methods
    pub methods: FrozenVec<&'g MethodData<'g>>,

    /// Fields
    pub fields: FrozenVec<&'g FieldData<'g>>,
}

impl<'g> ClassData<'g> {
    pub fn new(
        name: BinaryName,
        superclass: ClassId<'g>,
        access_flags: ClassAccessFlags,
    ) -> ClassData<'g> {
        ClassData {
            name,
            superclass: Some(superclass),
            interfaces: FrozenVec::new(),
            access_flags,
            methods: FrozenVec::new(),
            fields: FrozenVec::new(),
        }
    }

    /// Is this an interface?
    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    /// Find a field by name, on this class or else on the closest superclass declaring it
    pub fn field(&'g self, name: &UnqualifiedName) -> Option<FieldId<'g>> {
        let mut class: Option<&'g ClassData<'g>> = Some(self);
        while let Some(current) = class {
            if let Some(field) = current.fields.iter().find(|field| &field.name == name) {
                return Some(RefId(field));
            }
            class = current.superclass.map(|superclass| superclass.0);
        }
        None
    }
}

impl<'g> RenderDescriptor for ClassData<'g> {
    fn render_to(&self, write_to: &mut String) {
        self.name.render_to(write_to)
    }
}

impl<'g> Debug for ClassData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

pub struct MethodData<'g> {
    /// Class
    pub class: ClassId<'g>,

    /// Name of the method
    pub name: UnqualifiedName,

    /// Type of the method
    pub descriptor: MethodDescriptor<ClassId<'g>>,

    /// Method access flags
    pub access_flags: MethodAccessFlags,

    /// Annotations on the method itself
    pub annotations: Vec<Annotation>,

    /// Annotations on each parameter (missing trailing entries mean no annotations)
    pub parameter_annotations: Vec<Vec<Annotation>>,
}

impl<'g> MethodData<'g> {
    /// Method with no annotations
    pub fn new(
        class: ClassId<'g>,
        name: UnqualifiedName,
        descriptor: MethodDescriptor<ClassId<'g>>,
        access_flags: MethodAccessFlags,
    ) -> MethodData<'g> {
        MethodData {
            class,
            name,
            descriptor,
            access_flags,
            annotations: vec![],
            parameter_annotations: vec![],
        }
    }

    /// Add an annotation to the method
    pub fn annotated(mut self, annotation: Annotation) -> MethodData<'g> {
        self.annotations.push(annotation);
        self
    }

    /// Add an annotation to the parameter at the given index
    pub fn annotated_parameter(
        mut self,
        parameter: usize,
        annotation: Annotation,
    ) -> MethodData<'g> {
        if self.parameter_annotations.len() <= parameter {
            self.parameter_annotations.resize_with(parameter + 1, Vec::new);
        }
        self.parameter_annotations[parameter].push(annotation);
        self
    }

    /// Is this a static method?
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Is this an instance initialization method?
    pub fn is_constructor(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }

    /// Number of local slots taken by the receiver (if any) and the arguments on method entry
    pub fn frame_size(&self) -> usize {
        self.descriptor.parameter_length(!self.is_static())
    }

    /// Key identifying this method within its class (name followed by descriptor)
    pub fn key(&self) -> String {
        let mut key = String::from(self.name.as_str());
        self.descriptor.render_to(&mut key);
        key
    }

    /// Find an annotation of the given type on the method
    pub fn annotation(&self, annotation_type: &BinaryName) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|annotation| &annotation.annotation_type == annotation_type)
    }

    /// Annotations on the parameter at the given index
    pub fn parameter_annotations(&self, parameter: usize) -> &[Annotation] {
        self.parameter_annotations
            .get(parameter)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl<'g> Debug for MethodData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "{}.{}:{}",
            self.class.name.as_str(),
            self.name.as_str(),
            self.descriptor.render(),
        ))
    }
}

pub struct FieldData<'g> {
    /// Class
    ///
    /// Note: this is a pointer back to the class (so don't derive `Debug`)
    pub class: ClassId<'g>,

    /// Name of the field
    pub name: UnqualifiedName,

    /// Type of the field
    pub descriptor: FieldType<ClassId<'g>>,

    /// Field access flags
    pub access_flags: FieldAccessFlags,
}

impl<'g> FieldData<'g> {
    /// Is this a static field?
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlags::STATIC)
    }
}

impl<'g> Debug for FieldData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "{}.{}:{}",
            self.class.name.as_str(),
            self.name.as_str(),
            self.descriptor.render(),
        ))
    }
}

/// Runtime-visible annotation on a method or parameter
///
/// Only the annotation type and constant element values are tracked.
#[derive(Clone, PartialEq, Debug)]
pub struct Annotation {
    pub annotation_type: BinaryName,
    pub elements: Vec<(UnqualifiedName, ElementValue)>,
}

impl Annotation {
    /// Annotation without any elements
    pub fn marker(annotation_type: BinaryName) -> Annotation {
        Annotation {
            annotation_type,
            elements: vec![],
        }
    }

    /// Add an element to the annotation
    pub fn with_element(mut self, name: UnqualifiedName, value: ElementValue) -> Annotation {
        self.elements.push((name, value));
        self
    }

    /// Look up an element by name
    pub fn element(&self, name: &UnqualifiedName) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(element_name, _)| element_name == name)
            .map(|(_, value)| value)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ElementValue {
    Int(i32),
    Boolean(bool),
    String(Cow<'static, str>),
}

#[derive(PartialEq, Clone)]
pub enum ConstantData<'g> {
    String(Cow<'static, str>),
    Class(RefType<ClassId<'g>>),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl<'g> ConstantData<'g> {
    /// Long and double constants take two stack slots (and need `ldc2_w`)
    pub fn is_wide(&self) -> bool {
        matches!(self, ConstantData::Long(_) | ConstantData::Double(_))
    }
}

impl<'g> Debug for ConstantData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantData::String(string) => string.fmt(f),
            ConstantData::Class(ref_type) => ref_type.fmt(f),
            ConstantData::Integer(integer) => integer.fmt(f),
            ConstantData::Long(long) => long.fmt(f),
            ConstantData::Float(float) => float.fmt(f),
            ConstantData::Double(double) => double.fmt(f),
        }
    }
}
