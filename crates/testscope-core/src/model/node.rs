use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::result::RunResult;
use super::status::Status;

/// Identity of a node in the tree: where it lives and what it is called.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub location: PathBuf,
    pub name: String,
}

impl NodeKey {
    pub fn new(location: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.location.display(), self.name)
    }
}

/// Line span of a symbol in its source file (1-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start_line: u32,
    pub end_line: u32,
}

/// A single discovered test function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Function name as reported by the symbol provider.
    pub name: String,
    /// File containing the function.
    pub location: PathBuf,
    /// Where the function is declared, if known.
    pub range: Option<SourceRange>,
    loading: bool,
    last_result: Option<RunResult>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            range: None,
            loading: false,
            last_result: None,
        }
    }

    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(&self.location, &self.name)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_result(&self) -> Option<&RunResult> {
        self.last_result.as_ref()
    }

    pub fn status(&self) -> Status {
        Status::of_leaf(self.loading, self.last_result.as_ref())
    }

    pub(crate) fn set_loading(&mut self) {
        self.loading = true;
    }

    /// Attaching a result always ends loading.
    pub(crate) fn attach_result(&mut self, result: RunResult) {
        self.last_result = Some(result);
        self.loading = false;
    }
}

/// A test file and the test functions discovered in it, in name order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    /// File base name, e.g. `parser_test.go`.
    pub name: String,
    pub location: PathBuf,
    pub children: Vec<TestCase>,
    loading: bool,
    last_result: Option<RunResult>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>, children: Vec<TestCase>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            children,
            loading: false,
            last_result: None,
        }
    }

    /// Creates a suite named after the base name of `location`.
    pub fn for_file(location: &Path, children: Vec<TestCase>) -> Self {
        let name = location
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| location.display().to_string());
        Self::new(name, location, children)
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(&self.location, &self.name)
    }

    /// A file without test functions is not a suite for run and aggregation purposes.
    pub fn is_suite(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Synthetic result of the last whole-suite run.
    pub fn last_result(&self) -> Option<&RunResult> {
        self.last_result.as_ref()
    }

    /// Status derived from the children; an empty suite behaves like a leaf.
    pub fn status(&self) -> Status {
        if self.is_suite() {
            Status::aggregate(self.children.iter().map(TestCase::status))
        } else {
            Status::of_leaf(self.loading, self.last_result.as_ref())
        }
    }

    pub fn case(&self, name: &str) -> Option<&TestCase> {
        self.children.iter().find(|c| c.name == name)
    }

    pub(crate) fn set_loading(&mut self) {
        self.loading = true;
    }

    pub(crate) fn attach_result(&mut self, result: RunResult) {
        self.last_result = Some(result);
        self.loading = false;
    }
}

/// Borrowed view of any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Suite(&'a TestSuite),
    Case(&'a TestCase),
}

impl NodeRef<'_> {
    pub fn name(&self) -> &str {
        match self {
            NodeRef::Suite(s) => &s.name,
            NodeRef::Case(c) => &c.name,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            NodeRef::Suite(s) => s.status(),
            NodeRef::Case(c) => c.status(),
        }
    }

    pub fn is_loading(&self) -> bool {
        match self {
            NodeRef::Suite(s) => s.is_loading(),
            NodeRef::Case(c) => c.is_loading(),
        }
    }

    pub fn last_result(&self) -> Option<&RunResult> {
        match self {
            NodeRef::Suite(s) => s.last_result(),
            NodeRef::Case(c) => c.last_result(),
        }
    }
}
