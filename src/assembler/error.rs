//! Failures raised by the tokenizer, the parser and the code generator.
//!
//! Every stage stops at its first failure, so a single `Failure` is all a
//! caller ever sees.
use thiserror::Error;

use super::lexer::Token;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ErrorKind {
    // Syntactic
    #[error("Unexpected end of stream.")]
    EndOfStream,
    #[error("Unexpected.")]
    Rejected,
    #[error("Unexpected")]
    NoAlternative,
    #[error("Unexpected token.")]
    TrailingToken,

    // Semantic
    #[error("Redefinition of '{0}'")]
    Redefinition(String),
    #[error("Not defined")]
    NotDefined,
    #[error("Not imported")]
    NotImported,
    #[error("Expected a name")]
    ExpectedName,
    #[error("Expected a literal")]
    ExpectedLiteral,
    #[error("Expected a type")]
    ExpectedType,
    #[error("Expected a fixnum")]
    ExpectedFixnum,
    #[error("Bad label")]
    BadLabel,
    #[error("Bad op")]
    BadOp,
    #[error("Too few operands")]
    TooFewOperands,
    #[error("Unexpected operand")]
    UnexpectedOperand,
    /// A statement follows an instruction that takes no continuation.
    #[error("Unexpected")]
    UnexpectedAfterTerminal,
    /// A statement follows an explicit continuation operand.
    #[error("Unexpected statement")]
    UnexpectedStatement,
    #[error("Missing continuation")]
    MissingContinuation,
    #[error("Expected an instruction, not data")]
    ExpectedInstruction,
    #[error("Cyclic reference")]
    CyclicReference,
}

/// A failure together with the token it was raised at. The token is absent
/// when the input ran out.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct Failure {
    pub kind: ErrorKind,
    pub token: Option<Token>,
}

impl Failure {
    pub fn at(kind: ErrorKind, token: &Token) -> Self {
        Failure { kind, token: Some(token.clone()) }
    }

    pub fn end_of_stream() -> Self {
        Failure { kind: ErrorKind::EndOfStream, token: None }
    }

    pub fn line(&self) -> Option<usize> {
        self.token.as_ref().map(|token| token.line)
    }

    pub fn column(&self) -> Option<usize> {
        self.token.as_ref().map(|token| token.column)
    }
}
