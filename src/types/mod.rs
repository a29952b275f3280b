//! # Type system
//!
//! Type identity, the built-in module registry, primitive cast rules and
//! literal width inference.

pub mod cast;
pub mod definition;
pub mod literal;
pub mod module;
pub mod primitive;

pub use cast::{BinaryError, BinaryResolution, CastEngine, Operand, PrimitiveCast};
pub use definition::{
    FieldDefinition, MethodDefinition, Modifiers, TypeDefinition, TypeIdentifier, TypeKind,
};
pub use module::{CoreTypes, Module, ModuleCatalog, TypeScope};
pub use primitive::{Family, Primitive};
