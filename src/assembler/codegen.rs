//! Turns a parse tree into a CRLF document.
//!
//! Generation is a single forward pass over the imports and definitions.
//! References that must land on an instruction are only recorded during
//! that pass, because their label may be defined further down; they are
//! checked once every definition exists.
use std::collections::HashSet;

use indexmap::IndexMap;

use super::ast::{
    DebugInfo, Document, ExprOp, FixnumOp, Instr, Literal, MnemonicOp, ModuleAst, Node, Ref, Target,
    TypeTag, END_MNEMONICS, LANG,
};
use super::error::{ErrorKind, Failure};
use super::lexer::Token;
use super::parser::{self, Module, Statement, Value};

type Result<T> = std::result::Result<T, Failure>;

pub fn generate(module: &Module, file: &str) -> Result<Document> {
    Generator::new(module, file).run()
}

struct Generator<'m> {
    module: &'m Module,
    file: &'m str,
    labels: HashSet<&'m str>,
    imports: IndexMap<String, String>,
    define: IndexMap<String, Node>,
    /// Local references used where only an instruction may go.
    supposed_instructions: Vec<Token>,
}

/// The statement being generated along with the statements after it in the
/// same definition.
struct Step<'m> {
    statement: &'m Statement,
    following: &'m [Statement],
}

impl<'m> Step<'m> {
    fn operator(&self) -> &'m Token {
        &self.statement.operator
    }

    fn operands(&self) -> &'m [Value] {
        &self.statement.operands
    }

    /// Checks the operand count against `required` and `optional`. An
    /// instruction without optional operands takes no continuation, so no
    /// statement may follow it either.
    fn check_operands(&self, required: usize, optional: usize) -> Result<()> {
        let operands = self.operands();
        if operands.len() < required {
            return Err(Failure::at(ErrorKind::TooFewOperands, self.operator()));
        }
        if let Some(excess) = operands.get(required + optional) {
            return Err(Failure::at(ErrorKind::UnexpectedOperand, excess.token()));
        }
        if optional == 0 {
            if let Some(next) = self.following.first() {
                return Err(Failure::at(ErrorKind::UnexpectedAfterTerminal, &next.operator));
            }
        }
        Ok(())
    }
}

/// A statement generated up to its continuation.
enum Partial {
    Pair { head: Node, debug: DebugInfo },
    Dict { key: Node, value: Node, debug: DebugInfo },
    Typeq { imm: TypeTag, debug: DebugInfo },
    Fixnum { op: FixnumOp, imm: i64, debug: DebugInfo },
    Expr { op: ExprOp, imm: Node, debug: DebugInfo },
    Depth { debug: DebugInfo },
    If { branch: Node, negated: bool, debug: DebugInfo },
    Mnemonic { op: MnemonicOp, imm: &'static str, debug: DebugInfo },
}

impl Partial {
    fn complete(self, k: Node) -> Node {
        let k = Box::new(k);
        let (instr, debug) = match self {
            Partial::Pair { head, debug } => {
                return Node::Pair { head: Box::new(head), tail: k, debug };
            }
            Partial::Dict { key, value, debug } => {
                return Node::Dict { key: Box::new(key), value: Box::new(value), next: k, debug };
            }
            Partial::Typeq { imm, debug } => (Instr::Typeq { imm, k }, debug),
            Partial::Fixnum { op, imm, debug } => (Instr::Fixnum { op, imm, k }, debug),
            Partial::Expr { op, imm, debug } => (Instr::Expr { op, imm: Box::new(imm), k }, debug),
            Partial::Depth { debug } => (Instr::Depth { k }, debug),
            Partial::If { branch, negated, debug } => {
                let branch = Box::new(branch);
                let (t, f) = if negated { (k, branch) } else { (branch, k) };
                (Instr::If { t, f }, debug)
            }
            Partial::Mnemonic { op, imm, debug } => (Instr::Mnemonic { op, imm, k }, debug),
        };
        Node::Instr { instr, debug }
    }
}

enum Generated {
    /// The statement ends the chain.
    Complete(Node),
    /// The statement continues with the operand at `index`, or with the next
    /// statement when there is no such operand.
    Partial { partial: Partial, index: usize, as_instruction: bool },
}

impl Generated {
    fn data(partial: Partial, index: usize) -> Self {
        Generated::Partial { partial, index, as_instruction: false }
    }

    fn instruction(partial: Partial, index: usize) -> Self {
        Generated::Partial { partial, index, as_instruction: true }
    }
}

impl<'m> Generator<'m> {
    fn new(module: &'m Module, file: &'m str) -> Self {
        Generator {
            module,
            file,
            labels: module.labels().map(|token| token.text.as_str()).collect(),
            imports: IndexMap::new(),
            define: IndexMap::new(),
            supposed_instructions: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Document> {
        let module = self.module;

        for importation in module.imports.iter() {
            let alias = &importation.alias;
            if self.imports.contains_key(&alias.text) {
                return Err(Failure::at(ErrorKind::Redefinition(alias.text.clone()), alias));
            }
            self.imports.insert(alias.text.clone(), importation.specifier.clone());
        }
        debug!("{} import(s)", self.imports.len());

        for definition in module.definitions.iter() {
            self.claim(&definition.label)?;
            let node = self.gen_chain(&definition.statement, &definition.following, false)?;
            self.define.insert(definition.label.text.clone(), node);
            for alias in definition.aliases.iter() {
                self.claim(alias)?;
                let node = Node::Ref(Ref {
                    target: Target::Local(definition.label.text.clone()),
                    debug: self.debug(alias),
                });
                self.define.insert(alias.text.clone(), node);
            }
        }
        debug!("{} definition(s)", self.define.len());

        for token in self.supposed_instructions.iter() {
            self.check_instruction(token)?;
        }
        debug!("{} instruction reference(s) verified", self.supposed_instructions.len());

        let mut export = Vec::with_capacity(module.exports.len());
        for token in module.exports.iter() {
            if !self.labels.contains(token.text.as_str()) {
                return Err(Failure::at(ErrorKind::NotDefined, token));
            }
            if export.contains(&token.text) {
                warn!("{}:{}: '{}' is exported more than once", self.file, token.line, token.text);
            }
            export.push(token.text.clone());
        }

        Ok(Document {
            lang: LANG,
            ast: ModuleAst { import: self.imports, define: self.define, export },
        })
    }

    /// Fails if `label` is already an import alias or a defined label.
    fn claim(&self, label: &Token) -> Result<()> {
        if self.define.contains_key(&label.text) || self.imports.contains_key(&label.text) {
            return Err(Failure::at(ErrorKind::Redefinition(label.text.clone()), label));
        }
        Ok(())
    }

    /// Follows local alias refs from `token` until something other than a
    /// local ref is reached. External refs are trusted to be instructions.
    fn check_instruction(&self, token: &Token) -> Result<()> {
        let mut visited = HashSet::new();
        let mut name = token.text.as_str();
        loop {
            if !visited.insert(name) {
                return Err(Failure::at(ErrorKind::CyclicReference, token));
            }
            match self.define.get(name) {
                Some(Node::Ref(Ref { target: Target::Local(next), .. })) => name = next.as_str(),
                Some(Node::Ref(Ref { target: Target::Qualified { .. }, .. })) => return Ok(()),
                Some(Node::Instr { .. }) => return Ok(()),
                Some(_) => return Err(Failure::at(ErrorKind::ExpectedInstruction, token)),
                None => return Err(Failure::at(ErrorKind::NotDefined, token)),
            }
        }
    }

    fn debug(&self, token: &Token) -> DebugInfo {
        DebugInfo { file: self.file.to_owned(), line: token.line }
    }

    /// Generates the chain that starts at `statement`. Statements are
    /// generated front to back, each one left waiting for its continuation,
    /// and then closed from the back so long chains don't nest calls.
    fn gen_chain(
        &mut self,
        statement: &'m Statement,
        following: &'m [Statement],
        as_instruction: bool,
    ) -> Result<Node> {
        let mut step = Step { statement, following };
        let mut as_instruction = as_instruction;
        let mut partials = Vec::new();

        let last = loop {
            let generated = self.gen_statement(&step, as_instruction)?;
            let (partial, index, continues_as_instruction) = match generated {
                Generated::Complete(node) => break node,
                Generated::Partial { partial, index, as_instruction } => {
                    (partial, index, as_instruction)
                }
            };
            partials.push(partial);

            // The continuation comes either from the operand at `index` or
            // from the next statement, never both.
            let (operands, following) = (step.operands(), step.following);
            match (operands.get(index), following.split_first()) {
                (Some(operand), None) => {
                    break self.gen_continuation_expression(operand, continues_as_instruction)?;
                }
                (Some(_), Some((next, _))) => {
                    return Err(Failure::at(ErrorKind::UnexpectedStatement, &next.operator));
                }
                (None, Some((next, rest))) => {
                    step = Step { statement: next, following: rest };
                    as_instruction = continues_as_instruction;
                }
                (None, None) => {
                    return Err(Failure::at(ErrorKind::MissingContinuation, step.operator()));
                }
            }
        };

        trace!("closing a chain of {} statement(s)", partials.len() + 1);
        Ok(partials.into_iter().rev().fold(last, |k, partial| partial.complete(k)))
    }

    fn gen_statement(&mut self, step: &Step<'m>, as_instruction: bool) -> Result<Generated> {
        let operator = step.operator();
        let operands = step.operands();
        let debug = self.debug(operator);

        match operator.text.as_str() {
            "pair_t" => {
                if as_instruction {
                    return Err(Failure::at(ErrorKind::ExpectedInstruction, operator));
                }
                step.check_operands(1, 1)?;
                let head = self.gen_expression(&operands[0])?;
                Ok(Generated::data(Partial::Pair { head, debug }, 1))
            }
            "dict_t" => {
                if as_instruction {
                    return Err(Failure::at(ErrorKind::ExpectedInstruction, operator));
                }
                step.check_operands(2, 1)?;
                let key = self.gen_expression(&operands[0])?;
                let value = self.gen_expression(&operands[1])?;
                Ok(Generated::data(Partial::Dict { key, value, debug }, 2))
            }
            "ref" => {
                step.check_operands(1, 0)?;
                let node = self.gen_continuation_expression(&operands[0], as_instruction)?;
                Ok(Generated::Complete(node))
            }
            // From here on the statement is an instruction, and so is
            // everything its continuation leads to.
            _ => self.gen_instruction(step, debug),
        }
    }

    fn gen_instruction(&mut self, step: &Step<'m>, debug: DebugInfo) -> Result<Generated> {
        let operator = step.operator();
        let operands = step.operands();
        let name = operator.text.as_str();

        if name == "typeq" {
            step.check_operands(1, 1)?;
            let imm = self.gen_type(&operands[0])?;
            return Ok(Generated::instruction(Partial::Typeq { imm, debug }, 1));
        }
        if let Some(op) = FixnumOp::from_name(name) {
            step.check_operands(1, 1)?;
            let imm = self.gen_fixnum(&operands[0])?;
            return Ok(Generated::instruction(Partial::Fixnum { op, imm, debug }, 1));
        }
        if let Some(op) = ExprOp::from_name(name) {
            step.check_operands(1, 1)?;
            let imm = self.gen_expression(&operands[0])?;
            return Ok(Generated::instruction(Partial::Expr { op, imm, debug }, 1));
        }
        if name == "depth" {
            step.check_operands(0, 1)?;
            return Ok(Generated::instruction(Partial::Depth { debug }, 0));
        }
        if name == "if" || name == "if_not" {
            step.check_operands(1, 1)?;
            let branch = self.gen_ref(&operands[0], true)?;
            let negated = name == "if_not";
            return Ok(Generated::instruction(Partial::If { branch, negated, debug }, 1));
        }
        if let Some(op) = MnemonicOp::from_name(name) {
            step.check_operands(1, 1)?;
            let imm = gen_mnemonic(&operands[0], op.mnemonics())?;
            return Ok(Generated::instruction(Partial::Mnemonic { op, imm, debug }, 1));
        }
        if name == "end" {
            step.check_operands(1, 0)?;
            let imm = gen_mnemonic(&operands[0], END_MNEMONICS)?;
            return Ok(Generated::Complete(Node::Instr { instr: Instr::End { imm }, debug }));
        }
        Err(Failure::at(ErrorKind::BadOp, operator))
    }

    fn gen_continuation_expression(
        &mut self,
        operand: &Value,
        as_instruction: bool,
    ) -> Result<Node> {
        if as_instruction {
            self.gen_ref(operand, true)
        } else {
            self.gen_expression(operand)
        }
    }

    fn gen_expression(&mut self, operand: &Value) -> Result<Node> {
        match operand {
            Value::Number(number, _) => Ok(Node::Fixnum(*number)),
            Value::Literal(token) if token.literal_name().ends_with("_t") => {
                self.gen_type(operand).map(Node::Type)
            }
            Value::Literal(token) => gen_literal(token),
            Value::Ref(_) => self.gen_ref(operand, false),
        }
    }

    fn gen_type(&self, operand: &Value) -> Result<TypeTag> {
        match operand {
            Value::Literal(token) => {
                TypeTag::from_name(token.literal_name())
                    .ok_or_else(|| Failure::at(ErrorKind::ExpectedType, token))
            }
            other => Err(Failure::at(ErrorKind::ExpectedType, other.token())),
        }
    }

    fn gen_fixnum(&self, operand: &Value) -> Result<i64> {
        match operand {
            Value::Number(number, _) => Ok(*number),
            other => Err(Failure::at(ErrorKind::ExpectedFixnum, other.token())),
        }
    }

    fn gen_ref(&mut self, operand: &Value, as_instruction: bool) -> Result<Node> {
        let reference = match operand {
            Value::Ref(reference) => reference,
            other => return Err(Failure::at(ErrorKind::ExpectedName, other.token())),
        };
        match reference {
            parser::Ref::Qualified { module, name } => {
                if !self.imports.contains_key(&module.text) {
                    return Err(Failure::at(ErrorKind::NotImported, module));
                }
                Ok(Node::Ref(Ref {
                    target: Target::Qualified {
                        module: module.text.clone(),
                        name: name.text.clone(),
                    },
                    debug: self.debug(module),
                }))
            }
            parser::Ref::Local(name) => {
                if !self.labels.contains(name.text.as_str()) {
                    return Err(Failure::at(ErrorKind::NotDefined, name));
                }
                if as_instruction {
                    self.supposed_instructions.push(name.clone());
                }
                Ok(Node::Ref(Ref {
                    target: Target::Local(name.text.clone()),
                    debug: self.debug(name),
                }))
            }
        }
    }
}

fn gen_literal(token: &Token) -> Result<Node> {
    Literal::from_name(token.literal_name())
        .map(Node::Literal)
        .ok_or_else(|| Failure::at(ErrorKind::ExpectedLiteral, token))
}

/// Accepts a bare name drawn from `mnemonics`.
fn gen_mnemonic(operand: &Value, mnemonics: &'static [&'static str]) -> Result<&'static str> {
    if let Value::Ref(parser::Ref::Local(name)) = operand {
        if let Some(mnemonic) = mnemonics.iter().find(|mnemonic| **mnemonic == name.text) {
            return Ok(*mnemonic);
        }
    }
    Err(Failure::at(ErrorKind::BadLabel, operand.token()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::lexer::Tokenizer;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value as Json};

    fn compile(source: &str) -> Result<Document> {
        let module = parser::parse(Tokenizer::new(source))?;
        generate(&module, "test.asm")
    }

    fn compile_json(source: &str) -> Json {
        serde_json::to_value(compile(source).unwrap()).unwrap()
    }

    /// Message and (line, column) of the failure.
    fn fail(source: &str) -> (String, Option<(usize, usize)>) {
        let failure = compile(source).unwrap_err();
        let position = failure.token.as_ref().map(|token| (token.line, token.column));
        (failure.to_string(), position)
    }

    fn debug(line: usize) -> Json {
        json!({"file": "test.asm", "line": line})
    }

    #[test]
    fn test_push_end_chain() {
        let document = compile_json("foo:\n push 42\n end commit\n");
        assert_eq!(
            document,
            json!({
                "lang": "uFork",
                "ast": {
                    "kind": "module",
                    "import": {},
                    "define": {
                        "foo": {
                            "kind": "instr",
                            "op": "push",
                            "imm": 42,
                            "k": {
                                "kind": "instr",
                                "op": "end",
                                "imm": "commit",
                                "debug": debug(2)
                            },
                            "debug": debug(1)
                        }
                    },
                    "export": []
                }
            })
        );
    }

    #[test]
    fn test_forward_and_backward_references() {
        let source = indoc! {"
            done:
                end commit
            start:
                dup 1
                if done later
            later:
                end abort
        "};
        let document = compile_json(source);
        let start = &document["ast"]["define"]["start"];
        assert_eq!(start["op"], "dup");
        assert_eq!(start["k"]["op"], "if");
        assert_eq!(start["k"]["t"], json!({"kind": "ref", "name": "done", "debug": debug(4)}));
        assert_eq!(start["k"]["f"], json!({"kind": "ref", "name": "later", "debug": debug(4)}));
    }

    #[test]
    fn test_if_not_swaps_branches() {
        let source = indoc! {"
            a:
                if_not b
                end stop
            b:
                end commit
        "};
        let document = compile_json(source);
        let a = &document["ast"]["define"]["a"];
        assert_eq!(a["op"], "if");
        assert_eq!(a["f"]["name"], "b");
        assert_eq!(a["t"]["op"], "end");
        assert_eq!(a["t"]["imm"], "stop");
    }

    #[test]
    fn test_data_definitions() {
        let source = indoc! {"
            list:
                pair_t 1
                pair_t #t
                ref #nil
            table:
                dict_t #fixnum_t #? list
            empty:
                ref #unit
            answer:
                ref 42
        "};
        let document = compile_json(source);
        let define = &document["ast"]["define"];
        assert_eq!(
            define["list"],
            json!({
                "kind": "pair",
                "head": 1,
                "tail": {
                    "kind": "pair",
                    "head": {"kind": "literal", "value": "true"},
                    "tail": {"kind": "literal", "value": "nil"},
                    "debug": debug(2)
                },
                "debug": debug(1)
            })
        );
        assert_eq!(
            define["table"],
            json!({
                "kind": "dict",
                "key": {"kind": "type", "name": "fixnum_t"},
                "value": {"kind": "literal", "value": "undef"},
                "next": {"kind": "ref", "name": "list", "debug": debug(5)},
                "debug": debug(5)
            })
        );
        assert_eq!(define["empty"], json!({"kind": "literal", "value": "unit"}));
        assert_eq!(define["answer"], json!(42));
    }

    #[test]
    fn test_imports_and_qualified_refs() {
        let source = indoc! {r#"
            .import
                std: "../lib/std.asm"
            start:
                push std.empty
                std.loop
            .export
                start
        "#};
        let failure = compile(source).unwrap_err();
        // A qualified name can't be an operator.
        assert_eq!(failure.kind, ErrorKind::TrailingToken);

        let source = indoc! {r#"
            .import
                std: "../lib/std.asm"
            start:
                push std.empty
                ref std.loop
            .export
                start
        "#};
        let document = compile_json(source);
        assert_eq!(document["ast"]["import"], json!({"std": "../lib/std.asm"}));
        let start = &document["ast"]["define"]["start"];
        assert_eq!(start["imm"], json!({"kind": "ref", "module": "std", "name": "empty", "debug": debug(3)}));
        assert_eq!(start["k"], json!({"kind": "ref", "module": "std", "name": "loop", "debug": debug(4)}));
        assert_eq!(document["ast"]["export"], json!(["start"]));
    }

    #[test]
    fn test_every_instruction_family() {
        let source = indoc! {"
            start:
                typeq #pair_t
                pair 2
                part 1
                nth -1
                drop 0
                pick 3
                dup 1
                roll -2
                eq 0
                msg 1
                send -1
                new 0
                beh 1
                push #f
                is_eq 0
                is_ne #?
                depth
                dict get
                deque pop
                alu add
                cmp lt
                my self
                if start done
            done:
                end release
        "};
        let document = compile_json(source);
        let mut node = &document["ast"]["define"]["start"];
        let mut ops = vec![];
        while node["kind"] == "instr" {
            ops.push(node["op"].as_str().unwrap().to_owned());
            node = if node["op"] == "if" { &node["f"] } else { &node["k"] };
        }
        assert_eq!(
            ops,
            vec![
                "typeq", "pair", "part", "nth", "drop", "pick", "dup", "roll", "eq", "msg", "send", "new", "beh",
                "push", "is_eq", "is_ne", "depth", "dict", "deque", "alu", "cmp", "my", "if"
            ]
        );
        assert_eq!(node["name"], "done");
        let start = &document["ast"]["define"]["start"];
        assert_eq!(start["imm"], json!({"kind": "type", "name": "pair_t"}));
        assert_eq!(document["ast"]["define"]["done"]["imm"], "release");
    }

    #[test]
    fn test_explicit_continuation_operand() {
        let source = indoc! {"
            loop:
                dup 1 loop
            fin:
                depth fin
        "};
        let document = compile_json(source);
        assert_eq!(document["ast"]["define"]["loop"]["k"], json!({"kind": "ref", "name": "loop", "debug": debug(1)}));
        assert_eq!(document["ast"]["define"]["fin"]["k"]["name"], "fin");
    }

    #[test]
    fn test_multiple_labels() {
        let source = indoc! {"
            a:
            b:
            c:
                end commit
            d:
                push 1 c
        "};
        let document = compile_json(source);
        let define = document["ast"]["define"].as_object().unwrap();
        let keys: Vec<&str> = define.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
        assert_eq!(define["b"], json!({"kind": "ref", "name": "a", "debug": debug(1)}));
        assert_eq!(define["c"], json!({"kind": "ref", "name": "a", "debug": debug(2)}));
    }

    #[test]
    fn test_instruction_through_alias_chain() {
        let source = indoc! {"
            real:
                end commit
            alias:
                ref real
            start:
                push 1 alias
        "};
        assert!(compile(source).is_ok());
    }

    #[test]
    fn test_data_in_instruction_position() {
        let source = indoc! {"
            data:
                pair_t 1 2
            start:
                push 1 data
        "};
        assert_eq!(fail(source), ("Expected an instruction, not data".to_owned(), Some((3, 11))));

        let source = indoc! {"
            start:
                if data
                end commit
            data:
                ref 7
        "};
        assert_eq!(fail(source), ("Expected an instruction, not data".to_owned(), Some((1, 7))));

        let source = indoc! {"
            start:
                push 1
                pair_t 1 2
        "};
        assert_eq!(fail(source), ("Expected an instruction, not data".to_owned(), Some((2, 4))));

        // The same label is fine as plain data.
        let source = indoc! {"
            data:
                pair_t 1 2
            start:
                push data
                end commit
        "};
        assert!(compile(source).is_ok());
    }

    #[test]
    fn test_cyclic_alias() {
        let source = indoc! {"
            a:
                ref b
            b:
                ref a
            start:
                push 0 a
        "};
        assert_eq!(fail(source), ("Cyclic reference".to_owned(), Some((5, 11))));
    }

    #[test]
    fn test_redefinition() {
        let source = "a:\n end commit\na:\n end stop\n";
        assert_eq!(fail(source), ("Redefinition of 'a'".to_owned(), Some((2, 0))));

        let source = "a:\nb:\na:\n end stop\n";
        assert_eq!(fail(source), ("Redefinition of 'a'".to_owned(), Some((2, 0))));

        let source = ".import\n std: \"x\"\nstd:\n end stop\n";
        assert_eq!(fail(source), ("Redefinition of 'std'".to_owned(), Some((2, 0))));

        let source = ".import\n std: \"x\"\n lib: \"y\"\n std: \"z\"\n";
        assert_eq!(fail(source), ("Redefinition of 'std'".to_owned(), Some((3, 1))));
    }

    #[test]
    fn test_references() {
        assert_eq!(fail("a:\n push b\n end commit\n"), ("Not defined".to_owned(), Some((1, 6))));
        assert_eq!(fail("a:\n push std.x\n end commit\n"), ("Not imported".to_owned(), Some((1, 6))));
        // Import aliases are not labels.
        let source = ".import\n std: \"x\"\na:\n push std\n end commit\n";
        assert_eq!(fail(source), ("Not defined".to_owned(), Some((3, 6))));
        assert_eq!(fail("a:\n if 1\n end commit\n"), ("Expected a name".to_owned(), Some((1, 4))));
    }

    #[test]
    fn test_operand_arity() {
        assert_eq!(fail("a:\n push\n end commit\n"), ("Too few operands".to_owned(), Some((1, 1))));
        assert_eq!(fail("a:\n end\n"), ("Too few operands".to_owned(), Some((1, 1))));
        assert_eq!(fail("a:\n dict_t 1\n"), ("Too few operands".to_owned(), Some((1, 1))));
        assert_eq!(fail("a:\n push 1 a 2\n"), ("Unexpected operand".to_owned(), Some((1, 10))));
        assert_eq!(fail("a:\n end commit a\n"), ("Unexpected operand".to_owned(), Some((1, 12))));
        assert_eq!(fail("a:\n depth a a\n"), ("Unexpected operand".to_owned(), Some((1, 9))));
        assert_eq!(fail("a:\n end commit\n end stop\n"), ("Unexpected".to_owned(), Some((2, 1))));
        assert_eq!(fail("a:\n ref 1\n end stop\n"), ("Unexpected".to_owned(), Some((2, 1))));
    }

    /// Operator, required and optional operand counts, and operands that
    /// fill every slot.
    const ARITIES: &[(&str, usize, usize, &[&str])] = &[
        ("typeq", 1, 1, &["#pair_t", "k"]),
        ("pair", 1, 1, &["1", "k"]),
        ("part", 1, 1, &["1", "k"]),
        ("nth", 1, 1, &["1", "k"]),
        ("drop", 1, 1, &["1", "k"]),
        ("pick", 1, 1, &["1", "k"]),
        ("dup", 1, 1, &["1", "k"]),
        ("roll", 1, 1, &["1", "k"]),
        ("eq", 1, 1, &["1", "k"]),
        ("msg", 1, 1, &["1", "k"]),
        ("send", 1, 1, &["1", "k"]),
        ("new", 1, 1, &["1", "k"]),
        ("beh", 1, 1, &["1", "k"]),
        ("push", 1, 1, &["1", "k"]),
        ("is_eq", 1, 1, &["1", "k"]),
        ("is_ne", 1, 1, &["1", "k"]),
        ("depth", 0, 1, &["k"]),
        ("if", 1, 1, &["k", "k"]),
        ("if_not", 1, 1, &["k", "k"]),
        ("dict", 1, 1, &["get", "k"]),
        ("deque", 1, 1, &["pop", "k"]),
        ("alu", 1, 1, &["add", "k"]),
        ("cmp", 1, 1, &["lt", "k"]),
        ("my", 1, 1, &["self", "k"]),
        ("end", 1, 0, &["commit"]),
        ("pair_t", 1, 1, &["1", "k"]),
        ("dict_t", 2, 1, &["1", "2", "k"]),
        ("ref", 1, 0, &["k"]),
    ];

    #[test]
    fn test_every_operator_arity() {
        for &(op, required, optional, operands) in ARITIES {
            let statement = |count: usize| {
                let mut line = format!(" {}", op);
                for operand in &operands[..count] {
                    line.push(' ');
                    line.push_str(operand);
                }
                line
            };
            let source = |line: &str, rest: &str| format!("k:\n end commit\na:\n{}\n{}", line, rest);
            let next = if op == "pair_t" || op == "dict_t" { " ref k\n" } else { " end commit\n" };

            let full = statement(required + optional);
            assert!(compile(&source(&full, "")).is_ok(), "{} with every operand", op);
            if optional > 0 {
                let short = statement(required);
                assert!(compile(&source(&short, next)).is_ok(), "{} followed by a statement", op);
            }
            if required > 0 {
                let short = statement(required - 1);
                assert_eq!(
                    fail(&source(&short, next)),
                    ("Too few operands".to_owned(), Some((3, 1))),
                    "{} below its minimum",
                    op
                );
            }
            let excess = format!("{} k", full);
            assert_eq!(
                fail(&source(&excess, "")),
                ("Unexpected operand".to_owned(), Some((3, full.len() + 1))),
                "{} above its maximum",
                op
            );
        }
    }

    #[test]
    fn test_long_chains() {
        let mut source = "a:\n".to_owned();
        source.push_str(&" push 1\n".repeat(10_000));
        source.push_str(" end commit\n");
        let document = compile(&source).unwrap();

        let mut node = &document.ast.define["a"];
        let mut pushes = 0;
        while let Node::Instr { instr: Instr::Expr { op: ExprOp::Push, k, .. }, .. } = node {
            pushes += 1;
            node = &**k;
        }
        assert_eq!(pushes, 10_000);
        assert!(matches!(node, Node::Instr { instr: Instr::End { imm: "commit" }, .. }));

        let mut source = "list:\n".to_owned();
        source.push_str(&" pair_t 1\n".repeat(10_000));
        source.push_str(" ref #nil\n");
        let document = compile(&source).unwrap();

        let mut node = &document.ast.define["list"];
        let mut pairs = 0;
        while let Node::Pair { tail, .. } = node {
            pairs += 1;
            node = &**tail;
        }
        assert_eq!(pairs, 10_000);
        assert_eq!(*node, Node::Literal(Literal::Nil));
    }

    #[test]
    fn test_continuations() {
        assert_eq!(fail("a:\n push 1\n"), ("Missing continuation".to_owned(), Some((1, 1))));
        assert_eq!(fail("a:\n pair_t 1\n"), ("Missing continuation".to_owned(), Some((1, 1))));
        assert_eq!(fail("a:\n push 1 a\n end stop\n"), ("Unexpected statement".to_owned(), Some((2, 1))));
    }

    #[test]
    fn test_immediates() {
        assert!(compile("a:\n alu add\n end commit\n").is_ok());
        assert_eq!(fail("a:\n alu frobnicate\n end commit\n"), ("Bad label".to_owned(), Some((1, 5))));
        assert_eq!(fail("a:\n alu 1\n end commit\n"), ("Bad label".to_owned(), Some((1, 5))));
        assert_eq!(fail("a:\n end std.commit\n"), ("Bad label".to_owned(), Some((1, 5))));
        assert_eq!(fail("a:\n end get\n"), ("Bad label".to_owned(), Some((1, 5))));
        assert_eq!(fail("a:\n typeq #nil\n end commit\n"), ("Expected a type".to_owned(), Some((1, 7))));
        assert_eq!(fail("a:\n typeq #list_t\n end commit\n"), ("Expected a type".to_owned(), Some((1, 7))));
        assert_eq!(fail("a:\n dup #t\n end commit\n"), ("Expected a fixnum".to_owned(), Some((1, 5))));
        assert_eq!(fail("a:\n push #maybe\n end commit\n"), ("Expected a literal".to_owned(), Some((1, 6))));
        assert_eq!(fail("a:\n jump 1\n end commit\n"), ("Bad op".to_owned(), Some((1, 1))));
    }

    #[test]
    fn test_exports() {
        let source = "a:\n end commit\n.export\n a\n a\n";
        assert_eq!(compile_json(source)["ast"]["export"], json!(["a", "a"]));

        let source = "a:\n end commit\n.export\n a\n b\n";
        assert_eq!(fail(source), ("Not defined".to_owned(), Some((4, 1))));

        let source = ".import\n std: \"x\"\n.export\n std\n";
        assert_eq!(fail(source), ("Not defined".to_owned(), Some((3, 1))));
    }
}
