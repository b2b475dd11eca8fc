//! Removes diagnostic calls such as `console.log(...)` from JavaScript and TypeScript sources while
//! keeping the rest of each file as it was written.
//!
//! A file goes through [`parser::SourceUnit`], an arena [`graph::SyntaxTree`], the
//! [`remover::NodeRemover`] and finally the [`generator::CodeGenerator`]; [`engine::Transformer`]
//! ties those together, and [`project`] runs it over a directory tree.

pub mod config;
pub mod dialect;
pub mod engine;
pub mod generator;
pub mod graph;
pub mod matcher;
pub mod parser;
pub mod project;
pub mod remover;
pub mod searcher;

pub use dialect::Dialect;
pub use engine::{transform_source, EngineError, Transformation, Transformer};
pub use matcher::{TargetNames, DEFAULT_RECEIVER};
