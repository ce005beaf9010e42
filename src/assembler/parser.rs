//! The Parser module takes the token stream from the Tokenizer and converts
//! it into a parse tree.
//!
//! ```text
//! newline     = (space? comment)? LINEBREAK
//! module      = newline* import_decl? definition* export_decl?
//! import_decl = "." "import" newline+ importation*
//! importation = space name ":" space STRING newline+
//! definition  = label+ statement+
//! label       = name ":" newline+
//! statement   = space name operand* newline+
//! operand     = space value
//! value       = LITERAL | NUMBER | ref
//! ref         = (name "." name) | name
//! export_decl = "." "export" newline+ exportation*
//! exportation = space name newline+
//! ```
use super::combinator::{and, many, one, optional, or, repeat, Input, Matcher, TokenBuffer};
use super::error::{ErrorKind, Failure};
use super::lexer::{Token, TokenKind};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Module {
    pub imports: Vec<Importation>,
    pub definitions: Vec<Definition>,
    pub exports: Vec<Token>,
}

impl Module {
    /// Every label declared in the module, in source order.
    pub fn labels(&self) -> impl Iterator<Item = &Token> {
        self.definitions.iter().flat_map(Definition::labels)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Importation {
    pub alias: Token,
    pub specifier: String,
}

/// One or more labels naming one or more statements. The first statement
/// heads the chain, the rest supply its continuations.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Definition {
    pub label: Token,
    pub aliases: Vec<Token>,
    pub statement: Statement,
    pub following: Vec<Statement>,
}

impl Definition {
    pub fn labels(&self) -> impl Iterator<Item = &Token> {
        std::iter::once(&self.label).chain(self.aliases.iter())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Statement {
    pub operator: Token,
    pub operands: Vec<Value>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Value {
    Literal(Token),
    Number(i64, Token),
    Ref(Ref),
}

impl Value {
    /// The token that errors about this operand point at.
    pub fn token(&self) -> &Token {
        match self {
            Value::Literal(token) | Value::Number(_, token) => token,
            Value::Ref(Ref::Local(name)) => name,
            Value::Ref(Ref::Qualified { module, .. }) => module,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Ref {
    Local(Token),
    Qualified { module: Token, name: Token },
}

/// Parses a whole module. Input left over after the module is an error.
pub fn parse<I>(tokens: I) -> Result<Module, Failure>
where
    I: Iterator<Item = Token>,
{
    let buffer = TokenBuffer::new(tokens);
    let (rest, module) = module().parse(Input::start(&buffer))?;
    if let Some(token) = rest.token() {
        return Err(Failure::at(ErrorKind::TrailingToken, &token));
    }
    debug!(
        "parsed {} tokens into {} import(s), {} definition(s), {} export(s)",
        buffer.pulled(),
        module.imports.len(),
        module.definitions.len(),
        module.exports.len()
    );
    Ok(module)
}

fn kind(kind: TokenKind) -> Matcher<Token> {
    one(move |token: &Token| if token.kind == kind { Some(token.clone()) } else { None })
}

fn punct(text: &'static str) -> Matcher<Token> {
    one(move |token: &Token| {
        if token.kind == TokenKind::Punct && token.text == text {
            Some(token.clone())
        } else {
            None
        }
    })
}

fn keyword(text: &'static str) -> Matcher<Token> {
    one(move |token: &Token| {
        if token.is_name() && token.text == text {
            Some(token.clone())
        } else {
            None
        }
    })
}

fn name() -> Matcher<Token> {
    kind(TokenKind::Name)
}

fn space() -> Matcher<Token> {
    kind(TokenKind::Space)
}

fn newline() -> Matcher<()> {
    let comment = optional(space()).then(kind(TokenKind::Comment));
    optional(comment).then(kind(TokenKind::Newline)).map(|_| ())
}

fn newlines() -> Matcher<()> {
    many(newline()).map(|_| ())
}

fn directive(name: &'static str) -> Matcher<()> {
    and(vec![punct("."), keyword(name)]).map(|_| ())
}

fn importation() -> Matcher<Importation> {
    let string = one(|token: &Token| {
        if token.kind == TokenKind::Str {
            Some(token.string_value().to_owned())
        } else {
            None
        }
    });
    space()
        .then(name())
        .then(punct(":"))
        .then(space())
        .then(string)
        .then(newlines())
        .map(|(((((_, alias), _), _), specifier), ())| Importation { alias, specifier })
}

fn import_declaration() -> Matcher<Vec<Importation>> {
    directive("import").then(newlines()).then(repeat(importation())).map(|(_, imports)| imports)
}

fn label() -> Matcher<Token> {
    name().then(punct(":")).then(newlines()).map(|((name, _), ())| name)
}

fn reference() -> Matcher<Ref> {
    let qualified = name()
        .then(punct("."))
        .then(name())
        .map(|((module, _), name)| Ref::Qualified { module, name });
    or(vec![qualified, name().map(Ref::Local)])
}

fn value() -> Matcher<Value> {
    let literal = kind(TokenKind::Literal).map(Value::Literal);
    let number = one(|token: &Token| match token.kind {
        TokenKind::Number(number) => Some(Value::Number(number, token.clone())),
        _ => None,
    });
    or(vec![literal, number, reference().map(Value::Ref)])
}

fn statement() -> Matcher<Statement> {
    let operand = space().then(value()).map(|(_, value)| value);
    space()
        .then(name())
        .then(repeat(operand))
        .then(newlines())
        .map(|(((_, operator), operands), ())| Statement { operator, operands })
}

fn definition() -> Matcher<Definition> {
    label()
        .then(repeat(label()))
        .then(statement())
        .then(repeat(statement()))
        .map(|(((label, aliases), statement), following)| Definition {
            label,
            aliases,
            statement,
            following,
        })
}

fn exportation() -> Matcher<Token> {
    space().then(name()).then(newlines()).map(|((_, name), ())| name)
}

fn export_declaration() -> Matcher<Vec<Token>> {
    directive("export").then(newlines()).then(repeat(exportation())).map(|(_, exports)| exports)
}

fn module() -> Matcher<Module> {
    repeat(newline())
        .then(optional(import_declaration()))
        .then(repeat(definition()))
        .then(optional(export_declaration()))
        .map(|(((_, imports), definitions), exports)| Module {
            imports: imports.unwrap_or_default(),
            definitions,
            exports: exports.unwrap_or_default(),
        })
}
