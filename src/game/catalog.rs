//! Level Catalog
//!
//! The fixed, ordered list of nodes the hacker has to breach.
//! Loaded once at startup (built-in or from JSON) and never mutated.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// PUZZLE / NODE
// =============================================================================

/// A single challenge inside a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    /// Text shown to the hacker.
    pub prompt: String,
    /// Text shown to the spy.
    pub hint: String,
    /// Expected answer (compared case-insensitively).
    pub answer: String,
}

impl Puzzle {
    /// Create a puzzle.
    pub fn new(prompt: impl Into<String>, hint: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            hint: hint.into(),
            answer: answer.into(),
        }
    }
}

/// A stage of the catalog.
///
/// `puzzles.len()` may be smaller than `required_successes`; progress past
/// the last puzzle simply has no current puzzle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Display name.
    pub name: String,
    /// Correct answers needed to clear the node.
    pub required_successes: u32,
    /// Puzzles in the order they are presented.
    pub puzzles: Vec<Puzzle>,
}

impl Node {
    /// Puzzle at a given progress index, if any.
    pub fn puzzle(&self, progress: u32) -> Option<&Puzzle> {
        self.puzzles.get(progress as usize)
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog file is not valid JSON for a catalog.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Catalog has no nodes.
    #[error("catalog has no nodes")]
    Empty,

    /// A node requires zero successes.
    #[error("node {index} ({name}) must require at least one success")]
    ZeroRequirement {
        /// Node index.
        index: usize,
        /// Node name.
        name: String,
    },

    /// A puzzle has an empty expected answer.
    #[error("node {index} puzzle {puzzle} has an empty answer")]
    EmptyAnswer {
        /// Node index.
        index: usize,
        /// Puzzle index within the node.
        puzzle: usize,
    },
}

/// Ordered sequence of nodes. The index is the node identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    nodes: Vec<Node>,
}

impl Catalog {
    /// Build a catalog, validating every node.
    pub fn new(nodes: Vec<Node>) -> Result<Self, CatalogError> {
        let catalog = Self { nodes };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse and validate a JSON catalog (array of nodes).
    pub fn from_json(s: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(s)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a JSON catalog from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.nodes.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if node.required_successes == 0 {
                return Err(CatalogError::ZeroRequirement {
                    index,
                    name: node.name.clone(),
                });
            }
            if let Some(puzzle) = node.puzzles.iter().position(|p| p.answer.trim().is_empty()) {
                return Err(CatalogError::EmptyAnswer { index, puzzle });
            }
        }
        Ok(())
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a validated catalog.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by index.
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// All nodes in order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Resolve the puzzle at `(node, progress)`.
    pub fn puzzle(&self, node: usize, progress: u32) -> Option<&Puzzle> {
        self.node(node)?.puzzle(progress)
    }

    /// The catalog shipped with the server.
    pub fn builtin() -> Self {
        Self {
            nodes: vec![
                Node {
                    name: "PERIMETER_FIREWALL".to_string(),
                    required_successes: 2,
                    puzzles: vec![
                        Puzzle::new(
                            "Tripwire armed. Cut one wire: [r]ed / [b]lue / [g]reen",
                            "Schematic: the RED wire feeds the alarm relay. Tell the hacker to cut red (r).",
                            "r",
                        ),
                        Puzzle::new(
                            "Login prompt: enter the admin username.",
                            "Sticky note on the sysadmin's monitor reads: user = root",
                            "root",
                        ),
                        Puzzle::new(
                            "Port knock required: enter the third port of the sequence.",
                            "Intercepted knock sequence: 7000, 8000, 9000.",
                            "9000",
                        ),
                    ],
                },
                Node {
                    name: "DATABASE_VAULT".to_string(),
                    required_successes: 2,
                    puzzles: vec![
                        Puzzle::new(
                            "Offset register reads 0x1F. Enter it in decimal.",
                            "Hex 1F is 16 + 15.",
                            "31",
                        ),
                        Puzzle::new(
                            "Password hint: 'name of my dog'. Enter password.",
                            "Personnel file: the DBA's dog is called Byte.",
                            "byte",
                        ),
                        Puzzle::new(
                            "Select cipher mode: [c]bc / [e]cb / [g]cm",
                            "Only GCM is authenticated. The answer is g.",
                            "g",
                        ),
                    ],
                },
                Node {
                    name: "MAINFRAME_CORE".to_string(),
                    required_successes: 3,
                    puzzles: vec![
                        Puzzle::new(
                            "Key fragment 1: name the protocol this tunnel rides on.",
                            "We are tunnelling over a WebSocket. Answer: websocket",
                            "websocket",
                        ),
                        Puzzle::new(
                            "Key fragment 2: reverse the string KCAH.",
                            "KCAH backwards is HACK.",
                            "hack",
                        ),
                        Puzzle::new(
                            "Key fragment 3: convert binary 101 to decimal.",
                            "101 in binary is 5.",
                            "5",
                        ),
                        Puzzle::new(
                            "Abort sequence detected. Confirm abort? [y]es / [n]o",
                            "Never abort. The answer is n.",
                            "n",
                        ),
                    ],
                },
            ],
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
