//! The Assembler module is in charge of taking uFork
//! assembly source and producing a CRLF document from
//! the AST submodule.
//!
//! It does this with a regex tokenizer, a parser built from
//! PEG combinators, and a code generator that resolves
//! labels and checks every statement's operands.

pub mod ast;
pub mod codegen;
pub mod combinator;
pub mod error;
pub mod lexer;
pub mod parser;

use serde::Serialize;

use ast::Document;
use error::Failure;
use lexer::Tokenizer;

/// Assembles `source`, returning the document or the first failure.
/// `file` only ends up in debug info.
pub fn compile(source: &str, file: &str) -> Result<Document, Failure> {
    let module = parser::parse(Tokenizer::new(source))?;
    let document = codegen::generate(&module, file)?;
    info!("assembled {} with {} definition(s)", file, document.ast.define.len());
    Ok(document)
}

/// Like `compile`, but a failure becomes an error record, so the result can
/// always be handed to the caller as data.
pub fn assemble(source: &str, file: &str) -> Assembly {
    match compile(source, file) {
        Ok(document) => Assembly::Module(document),
        Err(failure) => {
            debug!("{} failed to assemble: {:?}", file, failure);
            Assembly::Error(ErrorRecord::new(&failure, file))
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(untagged)]
pub enum Assembly {
    Module(Document),
    Error(ErrorRecord),
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(tag = "kind", rename = "error")]
pub struct ErrorRecord {
    pub message: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl ErrorRecord {
    pub fn new(failure: &Failure, file: &str) -> Self {
        ErrorRecord {
            message: failure.to_string(),
            file: file.to_owned(),
            line: failure.line(),
            column: failure.column(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_assemble_module() {
        let source = indoc! {r#"
            .import
                std: "./std.asm"

            boot:           ; entry point
                msg 0
                push std.nil
                alu add
                end commit

            .export
                boot
        "#};
        let assembly = assemble(source, "boot.asm");
        let document = match &assembly {
            Assembly::Module(document) => document,
            Assembly::Error(record) => panic!("failed to assemble: {:?}", record),
        };
        assert_eq!(document.ast.export, vec!["boot".to_owned()]);
        let keys: Vec<&String> = document.ast.define.keys().collect();
        assert_eq!(keys, vec!["boot"]);

        let value = serde_json::to_value(&assembly).unwrap();
        assert_eq!(value["lang"], "uFork");
        assert_eq!(value["ast"]["kind"], "module");
        assert_eq!(value["ast"]["define"]["boot"]["debug"], json!({"file": "boot.asm", "line": 4}));
    }

    #[test]
    fn test_assemble_error_record() {
        let assembly = assemble("a:\n end commit\n.export\n b\n", "mod.asm");
        assert_eq!(
            serde_json::to_value(&assembly).unwrap(),
            json!({"kind": "error", "message": "Not defined", "file": "mod.asm", "line": 3, "column": 1})
        );
    }

    #[test]
    fn test_assemble_lexical_error() {
        let assembly = assemble("a:\n push 9007199254740992\n end commit\n", "big.asm");
        match assembly {
            Assembly::Error(record) => {
                assert_eq!(record.message, "Unexpected token.");
                assert_eq!(record.line, Some(0));
                assert_eq!(record.column, Some(0));
            }
            Assembly::Module(_) => panic!("unsafe integer was accepted"),
        }
        assert!(compile("a:\n push 9007199254740991\n end commit\n", "ok.asm").is_ok());
    }

    #[test]
    fn test_error_record_without_position() {
        let record = ErrorRecord::new(&Failure::end_of_stream(), "eof.asm");
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"kind": "error", "message": "Unexpected end of stream.", "file": "eof.asm"})
        );
    }

    #[test]
    fn test_failure_leaves_no_output() {
        let source = "a:\n end commit\na:\n end stop\n";
        let failure = compile(source, "dup.asm").unwrap_err();
        assert_eq!(failure.to_string(), "Redefinition of 'a'");
    }
}
