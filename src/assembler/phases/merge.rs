use super::resolve::{CacheEntry, ModuleCache};
use super::types::Position;
use crate::assembler::model::{Ast, Kind, Node};
use log::trace;

/// Splits a normalized module name into the scope names it is wrapped in.
pub fn scope_names(module: &str) -> impl DoubleEndedIterator<Item = &str> {
    module.split('/').filter(|part| !part.is_empty() && *part != ".")
}

/// Wraps a module's tree in one scope per path component, outermost first.
/// The markers take the position of the module's first node.
fn wrap_in_scopes(module: &str, ast: Ast) -> Ast {
    let pos = ast
        .nodes()
        .first()
        .map(|node| node.pos().clone())
        .unwrap_or_else(Position::default);
    let names: Vec<&str> = scope_names(module).collect();

    let mut nodes = Vec::with_capacity(ast.len() + 2 * names.len());
    nodes.extend(
        names
            .iter()
            .map(|name| Node::terminal(pos.clone(), Kind::ScopeBegin, *name)),
    );
    nodes.extend(ast.into_nodes());
    nodes.extend(
        names
            .iter()
            .map(|_| Node::terminal(pos.clone(), Kind::ScopeEnd, "")),
    );

    Ast::from_nodes(nodes)
}

/// Concatenates every cached module, in cache order, into a single tree.
pub fn merge(cache: ModuleCache) -> Ast {
    let mut merged = Ast::new();
    for CacheEntry { module, ast } in cache.into_entries() {
        trace!("merging module \"{}\" ({} nodes)", module, ast.len());
        merged.merge(wrap_in_scopes(&module, ast));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::{scope_names, wrap_in_scopes};
    use crate::assembler::{model::Kind, parse_source};

    #[test]
    fn names_from_path() {
        assert_eq!(scope_names("gfx/sprites").collect::<Vec<_>>(), vec!["gfx", "sprites"]);
        assert_eq!(scope_names("main").collect::<Vec<_>>(), vec!["main"]);
    }

    #[test]
    fn nested_scopes() {
        let ast = parse_source("  nop\nhalt", "s.svm").unwrap();
        let wrapped = wrap_in_scopes("gfx/sprites", ast);

        let shape: Vec<_> = wrapped
            .nodes()
            .iter()
            .map(|node| (node.kind(), node.value().unwrap_or("{..}")))
            .collect();
        assert_eq!(
            shape,
            vec![
                (Kind::ScopeBegin, "gfx"),
                (Kind::ScopeBegin, "sprites"),
                (Kind::Instruction, "{..}"),
                (Kind::Instruction, "{..}"),
                (Kind::ScopeEnd, ""),
                (Kind::ScopeEnd, ""),
            ]
        );

        let first = wrapped.nodes()[2].pos().clone();
        assert_eq!((first.line(), first.col()), (1, 3));
        assert!(wrapped.nodes().iter().take(2).all(|node| *node.pos() == first));
        assert_eq!(*wrapped.nodes()[5].pos(), first);
    }

    #[test]
    fn empty_module_markers_have_no_position() {
        let wrapped = wrap_in_scopes("empty", parse_source("; nothing\n", "e.svm").unwrap());
        assert_eq!(wrapped.len(), 2);
        assert!(wrapped.nodes().iter().all(|node| node.pos().is_zero()));
    }
}
