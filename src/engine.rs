//! Single-file transformation: parse, rewrite, generate.

use thiserror::Error;
use tracing::debug;

use crate::{
    dialect::Dialect,
    generator::{CodeGenerator, CodeGeneratorError},
    graph::SyntaxTree,
    matcher::{CallMatcher, TargetNames, DEFAULT_RECEIVER},
    parser::{ParseError, SourceUnit},
    remover::NodeRemover,
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of transforming one source text.
pub struct Transformation {
    pub output: String,
    pub modified: bool,
    pub removed_count: usize,
}

impl Transformation {
    fn unchanged(text: &str) -> Self {
        Self {
            output: text.to_owned(),
            modified: false,
            removed_count: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Parse error at {0}")]
    Parse(#[from] ParseError),
    #[error("Code generation failed: {0}")]
    Generation(#[from] CodeGeneratorError),
    #[error("Generated code does not parse, {0}")]
    InvalidOutput(ParseError),
}

#[derive(Debug, Clone)]
pub struct Transformer {
    matcher: CallMatcher,
    verify_output: bool,
}

impl Transformer {
    pub fn new(receiver: impl Into<String>, targets: TargetNames) -> Self {
        Self {
            matcher: CallMatcher::new(receiver, targets),
            verify_output: true,
        }
    }

    /// Whether generated code is parsed again before it is returned.
    pub fn with_verification(mut self, verify_output: bool) -> Self {
        self.verify_output = verify_output;
        self
    }

    pub fn transform(&self, text: &str, dialect: Dialect) -> Result<Transformation, EngineError> {
        let unit = SourceUnit::parse(text, dialect)?;
        let mut syntax_tree = SyntaxTree::from_unit(&unit);

        let stats = NodeRemover::new(&self.matcher).rewrite(&mut syntax_tree);
        if !stats.modified() {
            return Ok(Transformation::unchanged(text));
        }

        let output = CodeGenerator::new(&syntax_tree, unit.tokens()).generate()?;
        debug!(removed = stats.removed, "generated rewritten source");

        if self.verify_output {
            SourceUnit::parse(&output, dialect).map_err(EngineError::InvalidOutput)?;
        }

        Ok(Transformation {
            output,
            modified: true,
            removed_count: stats.removed,
        })
    }
}

/// Removes calls on the default receiver whose member is in `targets`.
pub fn transform_source(
    text: &str,
    dialect: Dialect,
    targets: &TargetNames,
) -> Result<Transformation, EngineError> {
    Transformer::new(DEFAULT_RECEIVER, targets.clone()).transform(text, dialect)
}
