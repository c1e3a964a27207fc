use super::types::{Error, Position, SourceContext};
use crate::assembler::{
    self,
    model::{Ast, Composite, Kind, Node},
    BuildOptions,
};
use crate::common;
use log::{debug, trace, warn};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const IMPORT_NAME: &str = "import";

/// Case-folds a module name and cleans up its path components, so that
/// `Gfx//Sprites/` and `gfx/./sprites` name the same module.
pub fn normalize_module(module: &str) -> String {
    let mut components: Vec<&str> = Vec::new();
    for part in module.split(|c| c == '/' || c == '\\') {
        match part {
            "" | "." => (),
            ".." if components.last().map_or(false, |last| *last != "..") => {
                components.pop();
            }
            part => components.push(part),
        }
    }
    components.join("/").to_lowercase()
}

#[derive(Debug)]
pub struct CacheEntry {
    pub module: String,
    pub ast: Ast,
}

/// Fully parsed modules in the order they were first reached, which is a
/// pre-order walk of the import graph: every module precedes its imports.
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: Vec<CacheEntry>,
}

impl ModuleCache {
    pub fn contains(&self, module: &str) -> bool {
        self.entries.iter().any(|entry| entry.module == module)
    }

    pub fn get(&self, module: &str) -> Option<&Ast> {
        self.entries
            .iter()
            .find(|entry| entry.module == module)
            .map(|entry| &entry.ast)
    }

    fn insert(&mut self, module: String, ast: Ast) {
        debug_assert!(!self.contains(&module));
        self.entries.push(CacheEntry { module, ast });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.module.as_str())
    }

    pub fn into_entries(self) -> Vec<CacheEntry> {
        self.entries
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Import {
    pos: Position,
    path: String,
}

/// Reads the import path out of an `import` instruction. The path is the
/// first element of the last argument, and only one or two arguments are
/// allowed.
fn import_path(inst: &Composite) -> Result<Import, Error> {
    let invalid = || Error::InvalidImport(inst.pos().clone());

    let arg = match inst.len() {
        2 | 3 => inst.get(inst.len() - 1),
        _ => None,
    }
    .ok_or_else(invalid)?;

    let path = arg
        .as_composite()
        .and_then(|expr| expr.get(0))
        .and_then(Node::value)
        .ok_or_else(invalid)?;

    Ok(Import {
        pos: inst.pos().clone(),
        path: path.to_owned(),
    })
}

fn is_import(inst: &Composite) -> bool {
    inst.kind() == Kind::Instruction
        && inst
            .name()
            .map_or(false, |name| common::eq_ignore_case(name, IMPORT_NAME))
}

// Kept as individual results so a malformed import only fails the build once
// the imports before it have been followed.
fn find_imports(ast: &Ast) -> Vec<Result<Import, Error>> {
    ast.nodes()
        .iter()
        .filter_map(Node::as_composite)
        .filter(|inst| is_import(inst))
        .map(import_path)
        .collect()
}

/// Mutable state for one build: the module cache plus every source file
/// parsed so far.
pub struct Context<'a> {
    options: &'a BuildOptions,
    cache: ModuleCache,
    parsed_files: HashSet<PathBuf>,
}

impl<'a> Context<'a> {
    pub fn new(options: &'a BuildOptions) -> Self {
        Context {
            options,
            cache: ModuleCache::default(),
            parsed_files: HashSet::new(),
        }
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    pub fn into_cache(self) -> ModuleCache {
        self.cache
    }

    /// Parses `module` and, depth first, everything it imports. The chain
    /// holds the modules on the current import path and is extended by value
    /// on every descent.
    pub fn resolve(&mut self, module: &str, import_chain: Vec<String>) -> Result<(), Error> {
        let name = module;
        let module = normalize_module(name);
        // The import root itself has no scope to wrap its files in.
        if module.is_empty() {
            return Err(Error::InvalidModuleName(name.to_owned()));
        }

        if self.cache.contains(&module) {
            trace!("module \"{}\" already parsed", module);
            return Ok(());
        }

        if import_chain.contains(&module) {
            return Err(Error::CircularImport {
                module,
                chain: import_chain,
            });
        }

        let mut chain = import_chain;
        chain.push(module.clone());

        debug!("resolving module \"{}\"", module);
        let ast = self.parse_module(&module)?;
        let imports = find_imports(&ast);

        // Recorded before its imports are followed, so a later path back to
        // this module short-circuits above instead of reporting a cycle.
        self.cache.insert(module, ast);

        for import in imports {
            let Import { pos, path } = import?;
            self.resolve(&path, chain.clone())
                .map_err(|err| err.at_import(pos))?;
        }

        Ok(())
    }

    fn parse_module(&mut self, module: &str) -> Result<Ast, Error> {
        let mut ast = Ast::new();
        for file in self.collate_sources(module)? {
            if !self.parsed_files.insert(file.clone()) {
                trace!("skipping '{}', already parsed", file.display());
                continue;
            }

            trace!("parsing '{}'", file.display());
            let source = fs::read_to_string(&file)
                .map_err(|err| source_error(module, SourceContext::Read(file.clone()), err))?;
            ast.merge(assembler::parse_source(&source, &file.to_string_lossy())?);
        }
        Ok(ast)
    }

    /// Lists the canonical paths of the module's source files, in directory
    /// listing order unless sorting was asked for. Canonical paths let a
    /// symlinked module directory be recognised as files already parsed.
    fn collate_sources(&self, module: &str) -> Result<Vec<PathBuf>, Error> {
        let dir = self.options.import_root.join(module);
        let entries = fs::read_dir(&dir)
            .map_err(|err| source_error(module, SourceContext::Locate, err))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| source_error(module, SourceContext::List, err))?
                .path();
            if path.is_dir() || !self.is_source_file(&path) {
                continue;
            }

            files.push(
                fs::canonicalize(&path)
                    .map_err(|err| source_error(module, SourceContext::List, err))?,
            );
        }

        if self.options.sort_sources {
            files.sort();
        }
        if files.is_empty() {
            warn!("module \"{}\" has no source files in '{}'", module, dir.display());
        }

        Ok(files)
    }

    fn is_source_file(&self, path: &Path) -> bool {
        let ext = match path.extension() {
            Some(ext) => ext.to_string_lossy(),
            None => return false,
        };

        self.options
            .extensions
            .iter()
            .any(|known| common::eq_ignore_case(known.trim_start_matches('.'), &ext))
    }
}

/// Parses `module` and its transitive imports, returning the module cache in
/// first-visit order.
pub fn resolve_module(options: &BuildOptions, module: &str) -> Result<ModuleCache, Error> {
    let mut ctx = Context::new(options);
    ctx.resolve(module, Vec::new())?;
    Ok(ctx.into_cache())
}

fn source_error(module: &str, context: SourceContext, err: io::Error) -> Error {
    Error::Source {
        module: module.to_owned(),
        context,
        err,
    }
}
