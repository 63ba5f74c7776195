use crate::jvm;
use crate::jvm::class_graph::MethodId;
use crate::jvm::code::{decode_code, ConstantResolver, MethodCode, RawCode};
use std::collections::HashMap;

/// Source of the compiled code of advice methods
pub trait CodeLocator<'g> {
    /// Code of a method (`None` if the locator doesn't know about the method)
    fn locate(&self, method: MethodId<'g>) -> Result<Option<MethodCode<'g>>, jvm::Error>;
}

/// Already decoded code, keyed by method name and descriptor
impl<'g> CodeLocator<'g> for HashMap<String, MethodCode<'g>> {
    fn locate(&self, method: MethodId<'g>) -> Result<Option<MethodCode<'g>>, jvm::Error> {
        Ok(self.get(&method.key()).cloned())
    }
}

/// Raw `Code` attributes, keyed by method name and descriptor, decoded on demand
pub struct BytecodeLocator<'a, R: ?Sized> {
    pub resolver: &'a R,
    pub methods: HashMap<String, RawCode>,
}

impl<'a, 'g, R: ConstantResolver<'g> + ?Sized> CodeLocator<'g> for BytecodeLocator<'a, R> {
    fn locate(&self, method: MethodId<'g>) -> Result<Option<MethodCode<'g>>, jvm::Error> {
        self.methods
            .get(&method.key())
            .map(|raw| decode_code(raw, self.resolver))
            .transpose()
    }
}

/// Decoded code of the advice methods of one donor class
///
/// The code is never modified: every splice replays it from the start.
#[derive(Debug, Default)]
pub struct DonorProgram<'g> {
    methods: HashMap<String, MethodCode<'g>>,
}

impl<'g> DonorProgram<'g> {
    pub fn new() -> DonorProgram<'g> {
        DonorProgram {
            methods: HashMap::new(),
        }
    }

    pub fn insert(&mut self, method: MethodId<'g>, code: MethodCode<'g>) {
        self.methods.insert(method.key(), code);
    }

    /// Code for an advice method
    pub fn code(&self, method: MethodId<'g>) -> Option<&MethodCode<'g>> {
        self.methods.get(&method.key())
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
