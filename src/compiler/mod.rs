//! # Keel Compiler
//!
//! Turns a [`SourceTree`] into a [`Script`] in two passes:
//!
//! 1. [`resolve`](resolve::resolve) makes types visible: imports, auto-imports
//!    and the program's own struct declarations.
//! 2. [`infer`](infer::infer) types every expression into a side table, then
//!    [`codegen`](codegen::generate) emits instructions from it.
//!
//! Problems are collected as [`Issue`]s. The collector is checked after
//! decoding, after pass 1 and after pass 2; the first failing gate stops the
//! compilation and no script is produced.

pub mod codegen;
pub mod emitter;
pub mod infer;
pub mod issue;
pub mod resolve;

use tracing::{debug, instrument, warn};

use crate::bytecode::script::{Script, assemble};
use crate::lang::node::{Position, SourceTree};
use crate::types::cast::CastEngine;
use crate::types::module::ModuleCatalog;
use issue::{Issue, IssueCollector, IssueId, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Stop at warnings as well as errors.
    pub warnings_as_errors: bool,
    /// Load auto-import modules (`core`) before the program's own imports.
    pub auto_import: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            warnings_as_errors: false,
            auto_import: true,
        }
    }
}

impl CompileOptions {
    fn threshold(&self) -> Severity {
        if self.warnings_as_errors {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

/// Outcome of one compilation. `script` is `None` whenever a gate failed.
#[derive(Debug)]
pub struct Compilation {
    pub script: Option<Script>,
    pub issues: Vec<Issue>,
}

impl Compilation {
    pub fn is_success(&self) -> bool {
        self.script.is_some()
    }

    fn failed(issues: IssueCollector) -> Self {
        Compilation {
            script: None,
            issues: issues.into_vec(),
        }
    }
}

pub struct Compiler {
    options: CompileOptions,
    catalog: ModuleCatalog,
    casts: CastEngine,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self::with_catalog(options, ModuleCatalog::standard())
    }

    pub fn with_catalog(options: CompileOptions, catalog: ModuleCatalog) -> Self {
        Self {
            options,
            catalog,
            casts: CastEngine::new(),
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Decode a postcard-encoded tree and compile it.
    pub fn compile_bytes(&self, bytes: &[u8]) -> Compilation {
        match postcard::from_bytes::<SourceTree>(bytes) {
            Ok(tree) => self.compile(&tree),
            Err(e) => {
                let mut issues = IssueCollector::new();
                issues.report(
                    IssueId::ParseFailure,
                    Position::default(),
                    format!("could not decode syntax tree: {}", e),
                );
                warn!("gate 1 failed: tree did not decode");
                Compilation::failed(issues)
            }
        }
    }

    #[instrument(skip_all, name = "compile")]
    pub fn compile(&self, tree: &SourceTree) -> Compilation {
        let mut issues = IssueCollector::new();
        let threshold = self.options.threshold();

        let Some(resolution) = resolve::resolve(
            tree,
            &self.catalog,
            self.options.auto_import,
            &mut issues,
        ) else {
            return Compilation::failed(issues);
        };
        if issues.has_at_least(threshold) {
            debug!(issues = issues.issues().len(), "gate 2 failed");
            return Compilation::failed(issues);
        }

        let annotations = infer::infer(tree, &resolution, &self.casts, &mut issues);
        if issues.has_at_least(threshold) {
            debug!(issues = issues.issues().len(), "gate 3 failed");
            return Compilation::failed(issues);
        }

        let Some(emitter) = codegen::generate(&tree.body, &annotations, &resolution) else {
            warn!("code generation disagreed with inference");
            return Compilation::failed(issues);
        };

        let (data, code) = emitter.into_parts();
        let script = assemble(data, code, Some(&resolution.module));
        Compilation {
            script: Some(script),
            issues: issues.into_vec(),
        }
    }
}
