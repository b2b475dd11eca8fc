//! Grammar dialect of a source file.

use std::path::Path;

use tree_sitter::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Optional grammar extensions a source file is allowed to use.
pub struct Dialect {
    pub jsx: bool,
    pub typescript: bool,
    pub decorators: bool,
    pub optional_chaining: bool,
    pub top_level_await: bool,
    pub dynamic_import: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The tree-sitter grammar a dialect is parsed with.
pub enum Grammar {
    JavaScript,
    TypeScript,
    Tsx,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::all()
    }
}

impl Dialect {
    /// Every extension enabled.
    pub const fn all() -> Self {
        Self {
            jsx: true,
            typescript: true,
            decorators: true,
            optional_chaining: true,
            top_level_await: true,
            dynamic_import: true,
        }
    }

    /// Plain JavaScript with JSX.
    pub const fn javascript() -> Self {
        Self {
            typescript: false,
            ..Self::all()
        }
    }

    /// TypeScript without JSX, so that `<T>value` assertions parse.
    pub const fn typescript() -> Self {
        Self {
            jsx: false,
            ..Self::all()
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "mts" | "cts" => Self::typescript(),
            "tsx" => Self::all(),
            "js" | "jsx" | "mjs" | "cjs" => Self::javascript(),
            _ => Self::all(),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or_default()
    }

    pub fn grammar(&self) -> Grammar {
        match (self.typescript, self.jsx) {
            (true, true) => Grammar::Tsx,
            (true, false) => Grammar::TypeScript,
            (false, _) => Grammar::JavaScript,
        }
    }
}

impl Grammar {
    pub fn language(self) -> Language {
        match self {
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{Dialect, Grammar};

    #[test]
    fn dialect_from_extension() {
        assert_eq!(Dialect::from_extension("ts").grammar(), Grammar::TypeScript);
        assert_eq!(Dialect::from_extension("MTS").grammar(), Grammar::TypeScript);
        assert_eq!(Dialect::from_extension("tsx").grammar(), Grammar::Tsx);
        assert_eq!(Dialect::from_extension("jsx").grammar(), Grammar::JavaScript);
        assert_eq!(Dialect::from_extension("cjs").grammar(), Grammar::JavaScript);
        assert_eq!(Dialect::from_extension("vue"), Dialect::all());
    }

    #[test]
    fn dialect_from_path_without_extension() {
        assert_eq!(Dialect::from_path(Path::new("bin/run")), Dialect::all());
        assert!(!Dialect::from_path(Path::new("src/app.ts")).jsx);
        assert!(Dialect::from_path(Path::new("src/app.js")).jsx);
    }
}
