use crate::error::{GenError, Result};
use log::debug;
use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::fs;
use std::path::{Path, PathBuf};

/// TypeScript parser front-end.
///
/// The `AstParser` wraps the `oxc` parser. Because oxc allocates its syntax tree in an arena
/// that must outlive every borrowed node, callers never hold on to a tree: they hand a closure
/// to [`AstParser::with_program`] and extract whatever owned data they need while it runs.
///
/// # Example
///
/// ```no_run
/// use hono_openapi_gen::parser::AstParser;
/// use std::path::Path;
///
/// let file = AstParser::read_file(Path::new("src/app.ts")).unwrap();
/// let statements = AstParser::with_program(&file, |program| program.body.len()).unwrap();
/// println!("Parsed {} statements", statements);
/// ```
pub struct AstParser;

/// A TypeScript source file loaded into memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Full source text
    pub text: String,
}

impl SourceFile {
    pub fn new(path: PathBuf, text: String) -> Self {
        Self { path, text }
    }
}

impl AstParser {
    /// Reads a source file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Io`] if the file cannot be read.
    pub fn read_file(path: &Path) -> Result<SourceFile> {
        debug!("Reading file: {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| GenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(SourceFile::new(path.to_path_buf(), text))
    }

    /// Parses `file` and runs `f` over the resulting program.
    ///
    /// The source type is derived from the file extension (`.d.ts`, `.ts`, `.tsx`, ...) and
    /// falls back to plain TypeScript when the extension is not recognized.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Parse`] if the parser reports any syntax error.
    pub fn with_program<T, F>(file: &SourceFile, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&Program<'a>) -> T,
    {
        debug!("Parsing file: {}", file.path.display());

        let source_type = SourceType::from_path(&file.path).unwrap_or_else(|_| SourceType::ts());
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, &file.text, source_type).parse();

        if ret.panicked || !ret.errors.is_empty() {
            let message = ret
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GenError::Parse {
                file: file.path.clone(),
                message: if message.is_empty() {
                    "parser aborted".to_string()
                } else {
                    message
                },
            });
        }

        debug!("Successfully parsed file: {}", file.path.display());
        Ok(f(&ret.program))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    #[test]
    fn test_parse_valid_typescript_file() {
        let temp_dir = TempDir::new().unwrap();
        let code = r#"
            import { Hono } from 'hono'

            export interface User {
                id: number
                name: string
            }

            const app = new Hono().get('/users', (c) => c.json([]))
            export type AppType = typeof app
        "#;

        let path = create_temp_file(&temp_dir, "app.ts", code);
        let file = AstParser::read_file(&path).unwrap();
        let count = AstParser::with_program(&file, |program| program.body.len()).unwrap();

        assert_eq!(file.path, path);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_parse_declaration_file() {
        let temp_dir = TempDir::new().unwrap();
        let code = r#"
            declare const app: import("hono/hono-base").HonoBase<{}, {}, "/">;
            export type AppType = typeof app;
            export {};
        "#;

        let path = create_temp_file(&temp_dir, "app.d.ts", code);
        let file = AstParser::read_file(&path).unwrap();
        let is_definition =
            AstParser::with_program(&file, |program| program.source_type.is_typescript_definition());

        assert!(is_definition.unwrap());
    }

    #[test]
    fn test_parse_invalid_file() {
        let file = SourceFile::new(
            PathBuf::from("broken.ts"),
            "const app = new Hono().get('/x', (c => {".to_string(),
        );
        let result = AstParser::with_program(&file, |_| ());

        match result {
            Err(GenError::Parse { file, .. }) => assert_eq!(file, PathBuf::from("broken.ts")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_nonexistent_file() {
        let result = AstParser::read_file(Path::new("/nonexistent/app.ts"));

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("/nonexistent/app.ts"));
    }

    #[test]
    fn test_parse_empty_file() {
        let file = SourceFile::new(PathBuf::from("empty.ts"), String::new());
        let count = AstParser::with_program(&file, |program| program.body.len()).unwrap();

        assert_eq!(count, 0);
    }
}
