//! Symbol provider contract and test entry point recognition.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::LookupError;
use crate::config::{ConfigError, DiscoveryConfig};
use crate::model::SourceRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    /// Function with a receiver; the symbol name is `(<receiver>).<name>`.
    Method,
}

/// A function-like declaration found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub range: SourceRange,
}

/// Extracts function symbols from a source file.
///
/// Implementations return every function and method; deciding which of them
/// are tests is left to [`TestSymbolFilter`].
#[async_trait]
pub trait SymbolProvider: Send + Sync {
    async fn extract_symbols(&self, file: &Path) -> Result<Vec<Symbol>, LookupError>;
}

/// Decides which symbols are test entry points.
#[derive(Debug, Clone)]
pub struct TestSymbolFilter {
    prefixes: Vec<String>,
    receiver_method: Regex,
}

impl TestSymbolFilter {
    pub fn new(prefixes: Vec<String>, receiver_method: Regex) -> Self {
        Self {
            prefixes,
            receiver_method,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.test_prefixes.clone(),
            config.receiver_method_regex()?,
        ))
    }

    pub fn is_test(&self, symbol: &Symbol) -> bool {
        self.prefixes.iter().any(|p| symbol.name.starts_with(p.as_str()))
            || self.receiver_method.is_match(&symbol.name)
    }

    /// Keeps the test symbols, sorted by name (case-sensitive, byte order).
    pub fn select(&self, symbols: Vec<Symbol>) -> Vec<Symbol> {
        let mut tests: Vec<Symbol> = symbols.into_iter().filter(|s| self.is_test(s)).collect();
        tests.sort_by(|a, b| a.name.cmp(&b.name));
        tests
    }
}
