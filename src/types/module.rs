use std::collections::HashMap;
use std::rc::Rc;

use super::definition::{TypeDefinition, TypeIdentifier};
use super::primitive::Primitive;

/// Module holding the built-in types.
pub const CORE_MODULE: &str = "core";

/// Name of the built-in string type.
pub const STRING_TYPE: &str = "str";

/// A named unit of type visibility.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    auto_import: bool,
    types: Vec<Rc<TypeDefinition>>,
}

impl Module {
    pub fn new(name: impl Into<String>, auto_import: bool) -> Self {
        Self {
            name: name.into(),
            auto_import,
            types: Vec::new(),
        }
    }

    /// The built-in module: every primitive plus `str`.
    pub fn core() -> Self {
        let mut module = Module::new(CORE_MODULE, true);
        for primitive in Primitive::ALL {
            module.add(TypeDefinition::primitive(CORE_MODULE, primitive));
        }
        module.add(TypeDefinition::reference(CORE_MODULE, STRING_TYPE));
        module
    }

    pub fn with_type(mut self, definition: TypeDefinition) -> Self {
        self.add(definition);
        self
    }

    pub fn add(&mut self, definition: TypeDefinition) {
        self.types.push(Rc::new(definition));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn auto_import(&self) -> bool {
        self.auto_import
    }

    pub fn get(&self, name: &str) -> Option<&Rc<TypeDefinition>> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn types(&self) -> &[Rc<TypeDefinition>] {
        &self.types
    }
}

/// Statically declared registry of importable modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: HashMap<String, Module>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with only the `core` module registered.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        catalog.register(Module::core());
        catalog
    }

    pub fn register(&mut self, module: Module) {
        self.modules.insert(module.name.clone(), module);
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Modules whose types are loaded without an import, in name order.
    pub fn auto_imports(&self) -> Vec<&Module> {
        let mut modules: Vec<_> = self.modules.values().filter(|m| m.auto_import).collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    /// Handles to the built-in types, independent of what a program imports.
    pub fn core_types(&self) -> Option<CoreTypes> {
        CoreTypes::from_module(self.get(CORE_MODULE)?)
    }
}

/// Direct handles to the `core` definitions. Literals are typed through
/// these even when the program never imports `core`.
#[derive(Debug, Clone)]
pub struct CoreTypes {
    primitives: Vec<TypeIdentifier>,
    string: TypeIdentifier,
}

impl CoreTypes {
    fn from_module(core: &Module) -> Option<Self> {
        let primitives = Primitive::ALL
            .iter()
            .map(|p| core.get(p.name()).cloned().map(TypeIdentifier::of))
            .collect::<Option<Vec<_>>>()?;
        let string = TypeIdentifier::of(core.get(STRING_TYPE)?.clone());
        Some(Self { primitives, string })
    }

    pub fn primitive(&self, primitive: Primitive) -> TypeIdentifier {
        self.primitives[primitive.ordinal()].clone()
    }

    pub fn bool(&self) -> TypeIdentifier {
        self.primitive(Primitive::Bool)
    }

    pub fn string(&self) -> TypeIdentifier {
        self.string.clone()
    }
}

/// Types visible to one compilation, by unqualified name.
#[derive(Debug, Clone, Default)]
pub struct TypeScope {
    visible: HashMap<String, Rc<TypeDefinition>>,
}

impl TypeScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make one type visible. Returns `false` when the name was already
    /// visible; the earlier binding is kept.
    pub fn import(&mut self, definition: Rc<TypeDefinition>) -> bool {
        if self.visible.contains_key(&definition.name) {
            return false;
        }
        self.visible.insert(definition.name.clone(), definition);
        true
    }

    /// Make every type of a module visible. Returns the names that were
    /// already visible.
    pub fn import_module(&mut self, module: &Module) -> Vec<String> {
        module
            .types()
            .iter()
            .filter(|t| !self.import(Rc::clone(t)))
            .map(|t| t.name.clone())
            .collect()
    }

    pub fn lookup(&self, name: &str) -> Option<&Rc<TypeDefinition>> {
        self.visible.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.visible.contains_key(name)
    }
}
