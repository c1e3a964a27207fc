pub mod model;
pub mod phases;

pub use phases::types::{Error, Located, Position};

use crate::assets;
use log::info;
use model::Ast;
use std::path::PathBuf;

/// Settings for one build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Module names are resolved as directories below this path.
    pub import_root: PathBuf,
    /// File extensions, without the dot, that count as module sources.
    pub extensions: Vec<String>,
    /// List each module's files in name order rather than directory order.
    pub sort_sources: bool,
    /// Passed through untouched to `BuildOutput::debug`.
    pub debug: bool,
}

impl BuildOptions {
    pub fn new(import_root: impl Into<PathBuf>) -> Self {
        BuildOptions {
            import_root: import_root.into(),
            ..BuildOptions::default()
        }
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            import_root: assets::default_import_root(),
            extensions: assets::default_source_exts(),
            sort_sources: false,
            debug: false,
        }
    }
}

#[derive(Debug)]
pub struct BuildOutput {
    pub ast: Ast,
    /// Every module in the build, in the order its tree appears in `ast`.
    pub modules: Vec<String>,
    pub debug: bool,
}

/// Turns one source text into a tree. `file` is only used for positions.
pub fn parse_source(source: &str, file: &str) -> Result<Ast, Error> {
    let tokens = phases::tokenize(source, file)?;
    Ok(phases::parse(tokens)?)
}

/// Parses `module` and everything it transitively imports into one tree,
/// each module wrapped in the scopes named by its path.
pub fn build(options: &BuildOptions, module: &str) -> Result<BuildOutput, Error> {
    let cache = phases::resolve_module(options, module)?;
    let modules: Vec<String> = cache.modules().map(str::to_owned).collect();
    let ast = phases::merge(cache);

    info!(
        "built \"{}\": {} module(s), {} top-level node(s)",
        module,
        modules.len(),
        ast.len()
    );

    Ok(BuildOutput {
        ast,
        modules,
        debug: options.debug,
    })
}

pub fn build_ast(import_root: impl Into<PathBuf>, module: &str) -> Result<Ast, Error> {
    Ok(build(&BuildOptions::new(import_root), module)?.ast)
}
