//! Pass 1: make types visible.
//!
//! Loads auto-imported modules, applies the program's imports, then sizes the
//! program's own struct declarations. Structs start as drafts (declared but
//! not laid out); a draft is sized once every field type is known, which is
//! also where a struct that contains itself is caught.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::issue::{Issue, IssueCollector, IssueId};
use crate::lang::node::{ImportItem, SourceTree, StructDecl, TypeRef};
use crate::types::definition::{Modifiers, TypeDefinition, TypeIdentifier};
use crate::types::module::{CoreTypes, ModuleCatalog, TypeScope};

/// Module name used when the program does not declare one.
pub const DEFAULT_MODULE: &str = "main";

/// Everything pass 2 needs from pass 1.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub module: String,
    pub types: TypeScope,
    pub core: CoreTypes,
}

/// Turn a written type into a type identifier.
pub fn resolve_type(types: &TypeScope, ty: &TypeRef) -> Result<TypeIdentifier, Issue> {
    let definition = types
        .lookup(&ty.name)
        .ok_or_else(|| Issue::unknown_type(&ty.name, ty.position))?;

    if definition.generic_params.len() != ty.params.len() {
        return Err(Issue::new(
            IssueId::GenericArity,
            ty.position,
            format!(
                "type '{}' takes {} generic argument(s), found {}",
                ty.name,
                definition.generic_params.len(),
                ty.params.len()
            ),
        ));
    }

    let params = ty
        .params
        .iter()
        .map(|p| resolve_type(types, p))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TypeIdentifier::new(Rc::clone(definition), params))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DraftState {
    Pending,
    Sizing,
    Done,
    Failed,
}

struct Drafts<'t> {
    decls: HashMap<&'t str, &'t StructDecl>,
    state: HashMap<&'t str, DraftState>,
}

pub fn resolve(
    tree: &SourceTree,
    catalog: &ModuleCatalog,
    auto_import: bool,
    issues: &mut IssueCollector,
) -> Option<Resolution> {
    let module = tree
        .module
        .clone()
        .unwrap_or_else(|| DEFAULT_MODULE.to_string());
    debug!(module = %module, "pass 1");

    // literals are typed through core even when the program never imports it
    let Some(core) = catalog.core_types() else {
        issues.report(
            IssueId::UnknownModule,
            Default::default(),
            "module catalog has no 'core' module",
        );
        return None;
    };

    let mut types = TypeScope::new();
    if auto_import {
        for m in catalog.auto_imports() {
            types.import_module(m);
        }
    }

    for import in &tree.imports {
        let Some(source) = catalog.get(&import.module) else {
            issues.report(
                IssueId::UnknownModule,
                import.position,
                format!("unknown module '{}'", import.module),
            );
            continue;
        };

        match &import.item {
            ImportItem::Single(name) => match source.get(name) {
                Some(definition) => {
                    if !types.import(Rc::clone(definition)) {
                        issues.report(
                            IssueId::DuplicateImport,
                            import.position,
                            format!("'{}' is already imported", name),
                        );
                    }
                }
                None => issues.push(Issue::new(
                    IssueId::UnknownType,
                    import.position,
                    format!("module '{}' has no type '{}'", import.module, name),
                )),
            },
            ImportItem::All => {
                let duplicates = types.import_module(source).len();
                if duplicates > 0 {
                    issues.report(
                        IssueId::DuplicateImport,
                        import.position,
                        format!(
                            "{} type(s) of '{}' were already imported",
                            duplicates, import.module
                        ),
                    );
                }
            }
        }
    }

    let mut drafts = Drafts {
        decls: HashMap::new(),
        state: HashMap::new(),
    };
    for decl in &tree.structs {
        if types.contains(&decl.name) || drafts.decls.contains_key(decl.name.as_str()) {
            issues.report(
                IssueId::DuplicateType,
                decl.position,
                format!("type '{}' is already defined", decl.name),
            );
            continue;
        }
        drafts.decls.insert(&decl.name, decl);
        drafts.state.insert(&decl.name, DraftState::Pending);
    }

    for decl in &tree.structs {
        if drafts.state.get(decl.name.as_str()) == Some(&DraftState::Pending) {
            size_struct(decl, &module, &mut drafts, &mut types, issues);
        }
    }

    debug!(structs = tree.structs.len(), "pass 1 done");
    Some(Resolution {
        module,
        types,
        core,
    })
}

/// Lay out one draft, sizing the drafts it contains first. Returns `false`
/// when the struct could not be sized.
fn size_struct<'t>(
    decl: &'t StructDecl,
    module: &str,
    drafts: &mut Drafts<'t>,
    types: &mut TypeScope,
    issues: &mut IssueCollector,
) -> bool {
    match drafts.state.get(decl.name.as_str()) {
        Some(DraftState::Done) => return true,
        Some(DraftState::Failed) => return false,
        Some(DraftState::Sizing) => {
            issues.report(
                IssueId::CircularStruct,
                decl.position,
                format!("struct '{}' contains itself", decl.name),
            );
            drafts.state.insert(&decl.name, DraftState::Failed);
            return false;
        }
        _ => {}
    }
    drafts.state.insert(&decl.name, DraftState::Sizing);

    let mut fields = Vec::with_capacity(decl.fields.len());
    let mut ok = true;
    for field in &decl.fields {
        if let Some(&inner) = drafts.decls.get(field.ty.name.as_str()) {
            if !size_struct(inner, module, drafts, types, issues) {
                ok = false;
                continue;
            }
        }
        if fields.iter().any(|(name, _)| *name == field.name) {
            issues.report(
                IssueId::DuplicateVariable,
                field.position,
                format!("field '{}' is declared twice", field.name),
            );
            ok = false;
            continue;
        }
        match resolve_type(types, &field.ty) {
            Ok(ty) => fields.push((field.name.clone(), ty)),
            Err(issue) => {
                issues.push(issue);
                ok = false;
            }
        }
    }

    // a cycle through this struct already marked it failed
    if !ok || drafts.state.get(decl.name.as_str()) == Some(&DraftState::Failed) {
        drafts.state.insert(&decl.name, DraftState::Failed);
        return false;
    }

    let modifiers = Modifiers {
        public: decl.public,
        mutable: true,
    };
    let definition = TypeDefinition::structure(module, &decl.name, modifiers, fields);
    debug!(name = %decl.name, size = definition.size(), "struct sized");
    types.import(Rc::new(definition));
    drafts.state.insert(&decl.name, DraftState::Done);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::issue::Severity;
    use crate::lang::build::TreeBuilder;
    use crate::types::module::Module;
    use crate::types::primitive::Primitive;

    fn run(tree: &SourceTree, auto_import: bool) -> (Option<Resolution>, IssueCollector) {
        let mut issues = IssueCollector::new();
        let catalog = ModuleCatalog::standard();
        let resolution = resolve(tree, &catalog, auto_import, &mut issues);
        (resolution, issues)
    }

    fn ids(issues: &IssueCollector) -> Vec<IssueId> {
        issues.issues().iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_auto_import_core() {
        let tree = TreeBuilder::new().finish();
        let (res, issues) = run(&tree, true);
        let res = res.unwrap();
        assert!(issues.is_empty());
        assert!(res.types.contains("i32"));
        assert!(res.types.contains("str"));
        assert_eq!(res.module, DEFAULT_MODULE);
    }

    #[test]
    fn test_no_auto_import_needs_explicit_import() {
        let mut b = TreeBuilder::new();
        b.import("core", "u8");
        let (res, issues) = run(&b.finish(), false);
        let res = res.unwrap();
        assert!(issues.is_empty());
        assert!(res.types.contains("u8"));
        assert!(!res.types.contains("i32"));
    }

    #[test]
    fn test_unknown_module_and_type() {
        let mut b = TreeBuilder::new();
        b.import("geometry", "*");
        b.at(2, 1).import("core", "u256");
        let (_, issues) = run(&b.finish(), true);
        assert_eq!(ids(&issues), vec![IssueId::UnknownModule, IssueId::UnknownType]);
        assert_eq!(issues.issues()[1].position.line, 2);
    }

    #[test]
    fn test_duplicate_import_warns() {
        let mut b = TreeBuilder::new();
        b.import("core", "i8");
        let (_, issues) = run(&b.finish(), true);
        assert_eq!(ids(&issues), vec![IssueId::DuplicateImport]);
        assert!(!issues.has_at_least(Severity::Error));
    }

    #[test]
    fn test_struct_layout() {
        let mut b = TreeBuilder::new();
        b.module("geo");
        let (x, y) = (b.ty("i32"), b.ty("i32"));
        b.structure("point", vec![("x", x), ("y", y)]);
        let (origin, tag) = (b.ty("point"), b.ty("u8"));
        b.structure("marker", vec![("tag", tag), ("origin", origin)]);
        let (res, issues) = run(&b.finish(), true);
        assert!(issues.is_empty(), "{:?}", issues.issues());

        let res = res.unwrap();
        let marker = res.types.lookup("marker").unwrap();
        assert_eq!(marker.size(), 9);
        assert_eq!(marker.field("origin").unwrap().offset, 1);
        assert_eq!(marker.module, "geo");
    }

    #[test]
    fn test_struct_using_later_struct() {
        let mut b = TreeBuilder::new();
        let inner = b.ty("inner");
        b.structure("outer", vec![("i", inner)]);
        let v = b.ty("u16");
        b.structure("inner", vec![("v", v)]);
        let (res, issues) = run(&b.finish(), true);
        assert!(issues.is_empty(), "{:?}", issues.issues());
        assert_eq!(res.unwrap().types.lookup("outer").unwrap().size(), 2);
    }

    #[test]
    fn test_circular_struct() {
        let mut b = TreeBuilder::new();
        let b_ty = b.ty("b");
        b.structure("a", vec![("next", b_ty)]);
        let a_ty = b.ty("a");
        b.structure("b", vec![("prev", a_ty)]);
        let (res, issues) = run(&b.finish(), true);
        assert!(ids(&issues).contains(&IssueId::CircularStruct));
        let res = res.unwrap();
        assert!(!res.types.contains("a"));
        assert!(!res.types.contains("b"));
    }

    #[test]
    fn test_self_containing_struct() {
        let mut b = TreeBuilder::new();
        let me = b.ty("node");
        b.structure("node", vec![("child", me)]);
        let (_, issues) = run(&b.finish(), true);
        assert_eq!(ids(&issues), vec![IssueId::CircularStruct]);
    }

    #[test]
    fn test_duplicate_type() {
        let mut b = TreeBuilder::new();
        let f = b.ty("u8");
        b.structure("i32", vec![("f", f)]);
        let (_, issues) = run(&b.finish(), true);
        assert_eq!(ids(&issues), vec![IssueId::DuplicateType]);
    }

    #[test]
    fn test_generic_arity() {
        let mut boxed = TypeDefinition::reference("heap", "box");
        boxed.generic_params = vec!["T".to_string()];
        let mut catalog = ModuleCatalog::standard();
        catalog.register(Module::new("heap", true).with_type(boxed));

        let mut b = TreeBuilder::new();
        let bare = b.ty("box");
        let i8_ty = b.ty("i8");
        let good = b.generic("box", vec![i8_ty]);
        b.structure("holder", vec![("a", good)]);
        b.structure("broken", vec![("b", bare)]);

        let mut issues = IssueCollector::new();
        let res = resolve(&b.finish(), &catalog, true, &mut issues).unwrap();
        assert_eq!(ids(&issues), vec![IssueId::GenericArity]);

        let holder = res.types.lookup("holder").unwrap();
        let field = holder.field("a").unwrap();
        assert_eq!(field.ty.to_string(), "box<i8>");
        assert_eq!(holder.size(), 8);
        assert!(field.ty.params()[0].is_primitive(Primitive::I8));
    }
}
