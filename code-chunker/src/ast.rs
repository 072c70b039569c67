use crate::error::ChunkerError;
use crate::language::Language;
use crate::segmenter::Segmenter;
use ragcode_domain::{ChunkType, CodeChunk};
use std::collections::HashSet;
use syn::spanned::Spanned;
use syn::visit::Visit;
use syn::{Expr, ExprCall, ExprMethodCall, Item, Type, UseTree};
use tracing::debug;

/// Syntax-tree segmenter for Rust sources.
///
/// Emits one chunk per top-level item. Functions and methods record their
/// declared `name` and the distinct call references found in their bodies;
/// methods additionally record the `receiver` type. Type declarations become
/// class chunks carrying the introduced names in `types`; `use` items become
/// import chunks with the dotted path in `imports`.
pub struct AstSegmenter;

impl AstSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AstSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for AstSegmenter {
    fn segment(&self, file_path: &str, content: &str) -> Result<Vec<CodeChunk>, ChunkerError> {
        let file = syn::parse_file(content).map_err(|e| ChunkerError::Parse {
            path: file_path.to_string(),
            message: e.to_string(),
        })?;

        let lines: Vec<&str> = content.lines().collect();
        let mut chunks = Vec::new();

        for item in &file.items {
            extract_item(file_path, &lines, item, &mut chunks);
        }

        debug!(path = file_path, chunks = chunks.len(), "segmented rust file");
        Ok(chunks)
    }
}

fn extract_item(file_path: &str, lines: &[&str], item: &Item, out: &mut Vec<CodeChunk>) {
    match item {
        Item::Fn(func) => {
            let (start, end) = span_lines(item.span(), lines.len());
            let mut chunk = make_chunk(file_path, lines, ChunkType::Function, start, end);
            chunk.metadata.insert("name".into(), func.sig.ident.to_string());
            record_calls(&mut chunk, |collector| collector.visit_block(&func.block));
            out.push(chunk);
        }
        Item::Impl(imp) => {
            let receiver = self_type_name(&imp.self_ty);
            for inner in &imp.items {
                if let syn::ImplItem::Fn(method) = inner {
                    let (start, end) = span_lines(inner.span(), lines.len());
                    let mut chunk = make_chunk(file_path, lines, ChunkType::Method, start, end);
                    chunk.metadata.insert("name".into(), method.sig.ident.to_string());
                    if let Some(recv) = &receiver {
                        chunk.metadata.insert("receiver".into(), recv.clone());
                    }
                    record_calls(&mut chunk, |collector| collector.visit_block(&method.block));
                    out.push(chunk);
                }
            }
        }
        Item::Struct(s) => push_type_chunk(file_path, lines, item, s.ident.to_string(), out),
        Item::Enum(e) => push_type_chunk(file_path, lines, item, e.ident.to_string(), out),
        Item::Trait(t) => push_type_chunk(file_path, lines, item, t.ident.to_string(), out),
        Item::Type(alias) => push_type_chunk(file_path, lines, item, alias.ident.to_string(), out),
        Item::Use(use_item) => {
            let mut paths = Vec::new();
            collect_use_paths(&use_item.tree, String::new(), &mut paths);
            if paths.is_empty() {
                return;
            }
            let (start, end) = span_lines(item.span(), lines.len());
            let mut chunk = make_chunk(file_path, lines, ChunkType::Import, start, end);
            chunk.metadata.insert("imports".into(), paths.join(","));
            chunk.dependencies = paths;
            out.push(chunk);
        }
        Item::Const(c) => push_other_chunk(file_path, lines, item, Some(c.ident.to_string()), out),
        Item::Static(s) => push_other_chunk(file_path, lines, item, Some(s.ident.to_string()), out),
        Item::Mod(m) => push_other_chunk(file_path, lines, item, Some(m.ident.to_string()), out),
        _ => {}
    }
}

fn push_type_chunk(
    file_path: &str,
    lines: &[&str],
    item: &Item,
    name: String,
    out: &mut Vec<CodeChunk>,
) {
    let (start, end) = span_lines(item.span(), lines.len());
    let mut chunk = make_chunk(file_path, lines, ChunkType::Class, start, end);
    chunk.metadata.insert("name".into(), name.clone());
    chunk.metadata.insert("types".into(), name);
    out.push(chunk);
}

fn push_other_chunk(
    file_path: &str,
    lines: &[&str],
    item: &Item,
    name: Option<String>,
    out: &mut Vec<CodeChunk>,
) {
    let (start, end) = span_lines(item.span(), lines.len());
    let mut chunk = make_chunk(file_path, lines, ChunkType::Other, start, end);
    if let Some(name) = name {
        chunk.metadata.insert("name".into(), name);
    }
    out.push(chunk);
}

fn make_chunk(
    file_path: &str,
    lines: &[&str],
    chunk_type: ChunkType,
    start: usize,
    end: usize,
) -> CodeChunk {
    let content = lines[start - 1..end].join("\n");
    CodeChunk::new(file_path, Language::Rust.name(), chunk_type, content, start, end)
}

fn span_lines(span: proc_macro2::Span, total_lines: usize) -> (usize, usize) {
    let last = total_lines.max(1);
    let start = span.start().line.clamp(1, last);
    let end = span.end().line.clamp(start, last);
    (start, end)
}

fn record_calls(chunk: &mut CodeChunk, visit: impl FnOnce(&mut CallCollector)) {
    let mut collector = CallCollector::default();
    visit(&mut collector);
    if !collector.calls.is_empty() {
        chunk.metadata.insert("calls".into(), collector.calls.join(","));
        chunk.dependencies = collector.calls;
    }
}

/// The bare type name a method hangs off, with one level of reference
/// indirection stripped (`&mut Foo<T>` → `Foo`).
fn self_type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|seg| seg.ident.to_string()),
        Type::Reference(r) => self_type_name(&r.elem),
        Type::Paren(p) => self_type_name(&p.elem),
        _ => None,
    }
}

/// Flatten a use tree into dotted paths (`std::collections::HashMap` →
/// `std.collections.HashMap`; globs render as `prefix.*`).
fn collect_use_paths(tree: &UseTree, prefix: String, out: &mut Vec<String>) {
    let join = |prefix: &str, part: &str| {
        if prefix.is_empty() {
            part.to_string()
        } else {
            format!("{prefix}.{part}")
        }
    };

    match tree {
        UseTree::Path(path) => {
            collect_use_paths(&path.tree, join(&prefix, &path.ident.to_string()), out)
        }
        UseTree::Name(name) => out.push(join(&prefix, &name.ident.to_string())),
        UseTree::Rename(rename) => out.push(join(&prefix, &rename.ident.to_string())),
        UseTree::Glob(_) => out.push(join(&prefix, "*")),
        UseTree::Group(group) => {
            for item in &group.items {
                collect_use_paths(item, prefix.clone(), out);
            }
        }
    }
}

/// Collects distinct call references from a function body, in source order.
/// Bare calls record the callee identifier, path calls record the last two
/// segments joined with a dot, method calls record `receiver.method` when the
/// receiver is a simple identifier (including `self`).
#[derive(Default)]
struct CallCollector {
    calls: Vec<String>,
    seen: HashSet<String>,
}

impl CallCollector {
    fn record(&mut self, reference: String) {
        if self.seen.insert(reference.clone()) {
            self.calls.push(reference);
        }
    }
}

impl<'ast> Visit<'ast> for CallCollector {
    fn visit_expr_call(&mut self, node: &'ast ExprCall) {
        if let Expr::Path(path) = &*node.func {
            let segments: Vec<String> = path
                .path
                .segments
                .iter()
                .map(|seg| seg.ident.to_string())
                .collect();
            match segments.as_slice() {
                [] => {}
                [single] => self.record(single.clone()),
                [.., qualifier, name] => self.record(format!("{qualifier}.{name}")),
            }
        }
        syn::visit::visit_expr_call(self, node);
    }

    fn visit_expr_method_call(&mut self, node: &'ast ExprMethodCall) {
        let method = node.method.to_string();
        match &*node.receiver {
            Expr::Path(path) if path.path.segments.len() == 1 => {
                let receiver = path.path.segments[0].ident.to_string();
                self.record(format!("{receiver}.{method}"));
            }
            _ => self.record(method),
        }
        syn::visit::visit_expr_method_call(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segment(content: &str) -> Vec<CodeChunk> {
        AstSegmenter::new().segment("src/demo.rs", content).unwrap()
    }

    #[test]
    fn functions_record_name_and_calls() {
        let chunks = segment(
            "fn process(input: &str) -> usize {\n    let cleaned = sanitize(input);\n    tokens::count(&cleaned)\n}\n",
        );
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.chunk_type, ChunkType::Function);
        assert_eq!(chunk.meta("name"), "process");
        assert_eq!(chunk.meta("calls"), "sanitize,tokens.count");
        assert_eq!(chunk.start_line, 1);
        assert_eq!(chunk.end_line, 4);
    }

    #[test]
    fn methods_record_receiver_without_indirection() {
        let chunks = segment(
            "struct Parser;\n\nimpl Parser {\n    fn run(&self) {\n        self.scan();\n    }\n}\n",
        );
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_type, ChunkType::Class);
        assert_eq!(chunks[0].meta("types"), "Parser");

        let method = &chunks[1];
        assert_eq!(method.chunk_type, ChunkType::Method);
        assert_eq!(method.meta("name"), "run");
        assert_eq!(method.meta("receiver"), "Parser");
        assert_eq!(method.meta("calls"), "self.scan");
    }

    #[test]
    fn reference_impl_target_strips_one_level() {
        assert_eq!(
            self_type_name(&syn::parse_str::<Type>("&mut Store<u8>").unwrap()),
            Some("Store".to_string())
        );
        assert_eq!(
            self_type_name(&syn::parse_str::<Type>("config::Settings").unwrap()),
            Some("Settings".to_string())
        );
    }

    #[test]
    fn use_items_become_import_chunks() {
        let chunks = segment("use std::collections::{HashMap, HashSet};\nuse serde::*;\n");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_type, ChunkType::Import);
        assert_eq!(
            chunks[0].meta("imports"),
            "std.collections.HashMap,std.collections.HashSet"
        );
        assert_eq!(chunks[1].meta("imports"), "serde.*");
    }

    #[test]
    fn doc_comments_stay_attached_to_their_item() {
        let chunks = segment("/// Greets the caller.\nfn greet() {}\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert!(chunks[0].content.contains("Greets the caller"));
    }

    #[test]
    fn calls_are_deduplicated_in_source_order() {
        let chunks = segment(
            "fn twice() {\n    step();\n    step();\n    finish();\n}\n",
        );
        assert_eq!(chunks[0].meta("calls"), "step,finish");
    }

    #[test]
    fn empty_source_yields_no_chunks() {
        assert!(segment("").is_empty());
    }
}
