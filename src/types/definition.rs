use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::primitive::Primitive;

/// Size of a reference-type handle on the operand stack.
pub const HANDLE_SIZE: u32 = 8;

/// Visibility and mutability flags of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub public: bool,
    pub mutable: bool,
}

impl Modifiers {
    pub const PUBLIC: Modifiers = Modifiers {
        public: true,
        mutable: false,
    };
}

/// Storage class of a type.
///
/// Value types live inline and are sized by their layout; reference types
/// are always a fixed-size heap handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Value,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: TypeIdentifier,
    /// Byte offset of the field inside its owner.
    pub offset: u32,
}

/// A callable member of a type. Calls are resolved against `params` in
/// order; `returns` is `None` for a method that yields nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDefinition {
    pub name: String,
    pub params: Vec<TypeIdentifier>,
    pub returns: Option<TypeIdentifier>,
    pub modifiers: Modifiers,
}

/// A named, module-qualified type. Immutable once built.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub module: String,
    pub name: String,
    pub modifiers: Modifiers,
    pub kind: TypeKind,
    pub primitive: Option<Primitive>,
    /// Names of generic parameters; a `TypeIdentifier` must supply one
    /// argument per entry.
    pub generic_params: Vec<String>,
    pub fields: Vec<FieldDefinition>,
    pub methods: Vec<MethodDefinition>,
    size: u32,
}

impl TypeDefinition {
    pub fn primitive(module: &str, primitive: Primitive) -> Self {
        Self {
            module: module.to_string(),
            name: primitive.name().to_string(),
            modifiers: Modifiers::PUBLIC,
            kind: TypeKind::Value,
            primitive: Some(primitive),
            generic_params: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            size: primitive.size() as u32,
        }
    }

    pub fn reference(module: &str, name: &str) -> Self {
        Self {
            module: module.to_string(),
            name: name.to_string(),
            modifiers: Modifiers::PUBLIC,
            kind: TypeKind::Reference,
            primitive: None,
            generic_params: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            size: HANDLE_SIZE,
        }
    }

    /// A value type whose fields are laid out back to back in declaration
    /// order. Field offsets are assigned here.
    pub fn structure(
        module: &str,
        name: &str,
        modifiers: Modifiers,
        fields: Vec<(String, TypeIdentifier)>,
    ) -> Self {
        let mut offset = 0;
        let fields = fields
            .into_iter()
            .map(|(name, ty)| {
                let field = FieldDefinition {
                    name,
                    offset,
                    ty: ty.clone(),
                };
                offset += ty.size();
                field
            })
            .collect();

        Self {
            module: module.to_string(),
            name: name.to_string(),
            modifiers,
            kind: TypeKind::Value,
            primitive: None,
            generic_params: Vec::new(),
            fields,
            methods: Vec::new(),
            size: offset,
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    pub fn is_reference(&self) -> bool {
        self.kind == TypeKind::Reference
    }

    /// Byte size of a value of this type as seen by the operand stack.
    pub fn size(&self) -> u32 {
        match self.kind {
            TypeKind::Reference => HANDLE_SIZE,
            TypeKind::Value => self.size,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn with_methods(mut self, methods: Vec<MethodDefinition>) -> Self {
        self.methods = methods;
        self
    }

    pub fn method(&self, name: &str) -> Option<&MethodDefinition> {
        self.methods.iter().find(|m| m.name == name)
    }
}

// Identity of a definition is its qualified name; a module cannot hold two
// types with the same name.
impl PartialEq for TypeDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module && self.name == other.name
    }
}

impl Eq for TypeDefinition {}

impl Hash for TypeDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.module.hash(state);
        self.name.hash(state);
    }
}

/// A concrete type: a definition plus its generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeIdentifier {
    definition: Rc<TypeDefinition>,
    params: Vec<TypeIdentifier>,
}

impl TypeIdentifier {
    pub fn new(definition: Rc<TypeDefinition>, params: Vec<TypeIdentifier>) -> Self {
        Self { definition, params }
    }

    pub fn of(definition: Rc<TypeDefinition>) -> Self {
        Self::new(definition, Vec::new())
    }

    pub fn definition(&self) -> &TypeDefinition {
        &self.definition
    }

    pub fn params(&self) -> &[TypeIdentifier] {
        &self.params
    }

    pub fn primitive(&self) -> Option<Primitive> {
        self.definition.primitive
    }

    pub fn size(&self) -> u32 {
        self.definition.size()
    }

    pub fn is_reference(&self) -> bool {
        self.definition.is_reference()
    }

    pub fn is_primitive(&self, primitive: Primitive) -> bool {
        self.primitive() == Some(primitive)
    }
}

impl std::fmt::Display for TypeIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.definition.name)?;
        if !self.params.is_empty() {
            write!(f, "<")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prim(p: Primitive) -> TypeIdentifier {
        TypeIdentifier::of(Rc::new(TypeDefinition::primitive("core", p)))
    }

    #[test]
    fn test_identifiers_compare_structurally() {
        assert_eq!(prim(Primitive::I32), prim(Primitive::I32));
        assert_ne!(prim(Primitive::I32), prim(Primitive::U32));

        let boxed = Rc::new(TypeDefinition::reference("core", "box"));
        let a = TypeIdentifier::new(boxed.clone(), vec![prim(Primitive::I8)]);
        let b = TypeIdentifier::new(boxed.clone(), vec![prim(Primitive::I8)]);
        let c = TypeIdentifier::new(boxed, vec![prim(Primitive::I16)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "box<i8>");
    }

    #[test]
    fn test_structure_layout() {
        let def = TypeDefinition::structure(
            "app",
            "Pair",
            Modifiers::default(),
            vec![
                ("a".to_string(), prim(Primitive::U8)),
                ("b".to_string(), prim(Primitive::I32)),
                ("c".to_string(), prim(Primitive::F64)),
            ],
        );

        assert_eq!(def.size(), 13);
        assert_eq!(def.field("b").map(|f| f.offset), Some(1));
        assert_eq!(def.field("c").map(|f| f.offset), Some(5));
        assert!(def.field("d").is_none());
    }

    #[test]
    fn test_reference_size_is_handle() {
        let def = TypeDefinition::reference("core", "str");
        assert!(def.is_reference());
        assert_eq!(def.size(), HANDLE_SIZE);
    }

    #[test]
    fn test_methods() {
        let def = TypeDefinition::reference("core", "str").with_methods(vec![
            MethodDefinition {
                name: "len".to_string(),
                params: Vec::new(),
                returns: Some(prim(Primitive::U64)),
                modifiers: Modifiers::PUBLIC,
            },
            MethodDefinition {
                name: "push".to_string(),
                params: vec![prim(Primitive::Char)],
                returns: None,
                modifiers: Modifiers {
                    public: true,
                    mutable: true,
                },
            },
        ]);

        let len = def.method("len").unwrap();
        assert!(len.params.is_empty());
        assert_eq!(len.returns, Some(prim(Primitive::U64)));
        assert_eq!(def.method("push").map(|m| m.params.len()), Some(1));
        assert!(def.method("push").unwrap().modifiers.mutable);
        assert!(def.method("pop").is_none());
        // methods do not change the layout
        assert_eq!(def.size(), HANDLE_SIZE);
        assert!(TypeDefinition::primitive("core", Primitive::I8).methods.is_empty());
    }
}
