use crate::advice::Error;
use crate::jvm::class_graph::{ClassId, MethodId};
use crate::jvm::code::{CodeVisitor, CodeWriter, MethodCode};
use crate::jvm::Name;

/// Something that can transform the code of a method by wrapping the visitor it is fed into
pub trait MethodVisitorWrapper<'g> {
    /// Wrap the visitor that receives the code of `method` (declared in `class`)
    fn wrap<'a>(
        &'a self,
        class: ClassId<'g>,
        method: MethodId<'g>,
        delegate: Box<dyn CodeVisitor<'g, Error> + 'a>,
    ) -> Box<dyn CodeVisitor<'g, Error> + 'a>
    where
        'g: 'a;
}

struct Stage<'p, 'g> {
    matcher: Box<dyn Fn(ClassId<'g>, MethodId<'g>) -> bool + 'p>,
    wrapper: &'p dyn MethodVisitorWrapper<'g>,
}

/// Ordered list of transformations, each applied to the methods its predicate selects
///
/// Stages are applied in the order they were added: the first stage sees the original code and
/// every later stage sees the output of the stages before it. For advice, this means the entry
/// code of a later stage runs before that of an earlier stage, and its exit code runs after.
pub struct Pipeline<'p, 'g> {
    stages: Vec<Stage<'p, 'g>>,
}

impl<'p, 'g> Pipeline<'p, 'g> {
    pub fn new() -> Pipeline<'p, 'g> {
        Pipeline { stages: vec![] }
    }

    /// Add a stage at the end of the pipeline
    pub fn stage(
        mut self,
        matcher: impl Fn(ClassId<'g>, MethodId<'g>) -> bool + 'p,
        wrapper: &'p dyn MethodVisitorWrapper<'g>,
    ) -> Pipeline<'p, 'g> {
        self.stages.push(Stage {
            matcher: Box::new(matcher),
            wrapper,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Replay the code of a method through every matching stage
    pub fn transform_method(
        &self,
        class: ClassId<'g>,
        method: MethodId<'g>,
        code: &MethodCode<'g>,
    ) -> Result<MethodCode<'g>, Error> {
        let mut output = MethodCode {
            label_generator: code.label_generator.clone(),
            ..MethodCode::new()
        };

        let mut applied = 0;
        {
            let mut visitor: Box<dyn CodeVisitor<'g, Error> + '_> =
                Box::new(CodeWriter::new(method, &mut output));
            for stage in self.stages.iter().rev() {
                if (stage.matcher)(class, method) {
                    visitor = stage.wrapper.wrap(class, method, visitor);
                    applied += 1;
                }
            }
            code.accept(&mut *visitor)?;
        }

        log::debug!(
            "Transformed {:?} through {} of {} stages",
            method,
            applied,
            self.stages.len()
        );
        Ok(output)
    }

    /// Transform every method of a type
    ///
    /// Either all of the methods are transformed, or the first error is returned and none of
    /// the transformed code is.
    pub fn transform_type(
        &self,
        class: ClassId<'g>,
        methods: &[(MethodId<'g>, MethodCode<'g>)],
    ) -> Result<Vec<MethodCode<'g>>, Error> {
        let transformed = methods
            .iter()
            .map(|(method, code)| self.transform_method(class, *method, code))
            .collect::<Result<Vec<_>, Error>>()?;
        log::debug!(
            "Transformed {} methods of {}",
            transformed.len(),
            class.name.as_str()
        );
        Ok(transformed)
    }
}

impl<'p, 'g> Default for Pipeline<'p, 'g> {
    fn default() -> Self {
        Pipeline::new()
    }
}
