//! Go symbol provider using tree-sitter.

use async_trait::async_trait;
use std::path::Path;
use tree_sitter::{Node, Parser as TSParser, Tree};

use super::error::LookupError;
use super::symbols::{Symbol, SymbolKind, SymbolProvider};
use crate::model::SourceRange;

/// Extracts top-level function and method declarations from Go files.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoSymbolProvider;

impl GoSymbolProvider {
    pub fn new() -> Self {
        Self
    }

    /// Parse Go source into a tree-sitter tree.
    fn parse_tree(content: &str) -> Result<Tree, String> {
        let mut parser = TSParser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| format!("Failed to set language: {}", e))?;

        parser
            .parse(content, None)
            .ok_or_else(|| "Failed to parse content".to_string())
    }

    /// Extract function symbols from Go source text.
    pub fn parse_symbols(content: &str) -> Result<Vec<Symbol>, String> {
        let tree = Self::parse_tree(content)?;
        let root = tree.root_node();

        let mut symbols = Vec::new();
        let mut cursor = root.walk();
        for node in root.children(&mut cursor) {
            match node.kind() {
                "function_declaration" => {
                    if let Some(name) = Self::child_text(&node, "name", content) {
                        symbols.push(Symbol {
                            name: name.to_string(),
                            kind: SymbolKind::Function,
                            range: Self::range(&node),
                        });
                    }
                }
                "method_declaration" => {
                    let Some(name) = Self::child_text(&node, "name", content) else {
                        continue;
                    };
                    let label = match Self::receiver_type(&node, content) {
                        Some(recv) => format!("({}).{}", recv, name),
                        None => name.to_string(),
                    };
                    symbols.push(Symbol {
                        name: label,
                        kind: SymbolKind::Method,
                        range: Self::range(&node),
                    });
                }
                _ => {}
            }
        }

        Ok(symbols)
    }

    fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
        &content[node.byte_range()]
    }

    fn child_text<'a>(node: &Node, field: &str, content: &'a str) -> Option<&'a str> {
        node.child_by_field_name(field)
            .map(|n| Self::node_text(&n, content))
    }

    /// Receiver type as written, e.g. `*Suite`.
    fn receiver_type(node: &Node, content: &str) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let mut cursor = receiver.walk();
        let param = receiver
            .children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;
        let ty = param.child_by_field_name("type")?;
        Some(Self::node_text(&ty, content).to_string())
    }

    fn range(node: &Node) -> SourceRange {
        SourceRange {
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
        }
    }
}

#[async_trait]
impl SymbolProvider for GoSymbolProvider {
    async fn extract_symbols(&self, file: &Path) -> Result<Vec<Symbol>, LookupError> {
        let content = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| LookupError::io(file, e))?;

        tokio::task::spawn_blocking(move || Self::parse_symbols(&content))
            .await
            .map_err(|e| LookupError::parse(file, e.to_string()))?
            .map_err(|message| LookupError::parse(file, message))
    }
}
