use crate::compiler_frontend::schema::schema_nodes::{ClassId, VarId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassAnalysis {
    pub class: ClassId,

    pub(crate) has_default_constructor: bool,
    pub(crate) needs_default_constructor: bool,

    // A super.new(...) argument touches state that doesn't exist yet in the generated
    // constructor, so the call has to be rewritten.
    pub(crate) transform_super_constructor_call: bool,

    pub(crate) possibly_unassigned_fields: Vec<VarId>,
    pub(crate) analyzed: bool,
}

impl ClassAnalysis {
    pub(crate) fn new(class: ClassId) -> Self {
        Self {
            class,
            has_default_constructor: false,
            needs_default_constructor: false,
            transform_super_constructor_call: false,
            possibly_unassigned_fields: Vec::new(),
            analyzed: false,
        }
    }

    pub fn has_default_constructor(&self) -> bool {
        self.has_default_constructor
    }

    pub fn needs_default_constructor(&self) -> bool {
        self.needs_default_constructor
    }

    pub fn transform_super_constructor_call(&self) -> bool {
        self.transform_super_constructor_call
    }

    pub fn possibly_unassigned_fields(&self) -> &[VarId] {
        &self.possibly_unassigned_fields
    }
}
