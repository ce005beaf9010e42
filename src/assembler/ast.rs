//! This AST describes an assembled uFork module in the CRLF intermediate
//! representation, the form the uFork loader consumes.
//!
//! ```json
//! {
//!     "lang": "uFork",
//!     "ast": {
//!         "kind": "module",
//!         "import": {"std": "./std.asm"},
//!         "define": {"start": {"kind": "instr", "op": "end", "imm": "commit", "debug": {...}}},
//!         "export": ["start"]
//!     }
//! }
//! ```
//!
//! Fixnums encode as bare JSON integers, every other node is an object
//! tagged by its `kind`.
use std::fmt;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

pub const LANG: &str = "uFork";

#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize)]
pub struct Document {
    pub lang: &'static str,
    pub ast: ModuleAst,
}

#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize)]
#[serde(tag = "kind", rename = "module")]
pub struct ModuleAst {
    pub import: IndexMap<String, String>,
    pub define: IndexMap<String, Node>,
    pub export: Vec<String>,
}

/// Source position attached to nodes for the loader's diagnostics.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize)]
pub struct DebugInfo {
    pub file: String,
    pub line: usize,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Node {
    Literal(Literal),
    Type(TypeTag),
    Fixnum(i64),
    Ref(Ref),
    Pair { head: Box<Node>, tail: Box<Node>, debug: DebugInfo },
    Dict { key: Box<Node>, value: Box<Node>, next: Box<Node>, debug: DebugInfo },
    Instr { instr: Instr, debug: DebugInfo },
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Literal(_) => "literal",
            Node::Type(_) => "type",
            Node::Fixnum(_) => "fixnum",
            Node::Ref(_) => "ref",
            Node::Pair { .. } => "pair",
            Node::Dict { .. } => "dict",
            Node::Instr { .. } => "instr",
        }
    }

    /// Moves the boxed children out onto `stack`, leaving fixnums behind.
    fn take_children(&mut self, stack: &mut Vec<Node>) {
        let mut take = |child: &mut Box<Node>| {
            stack.push(std::mem::replace(&mut **child, Node::Fixnum(0)));
        };
        match self {
            Node::Pair { head, tail, .. } => {
                take(head);
                take(tail);
            }
            Node::Dict { key, value, next, .. } => {
                take(key);
                take(value);
                take(next);
            }
            Node::Instr { instr, .. } => match instr {
                Instr::Typeq { k, .. }
                | Instr::Fixnum { k, .. }
                | Instr::Depth { k }
                | Instr::Mnemonic { k, .. } => take(k),
                Instr::Expr { imm, k, .. } => {
                    take(imm);
                    take(k);
                }
                Instr::If { t, f } => {
                    take(t);
                    take(f);
                }
                Instr::End { .. } => {}
            },
            Node::Literal(_) | Node::Type(_) | Node::Fixnum(_) | Node::Ref(_) => {}
        }
    }
}

// Instruction chains nest as deep as a definition is long, so they are torn
// down with an explicit stack.
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        self.take_children(&mut stack);
        while let Some(mut node) = stack.pop() {
            node.take_children(&mut stack);
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Literal {
    Undef,
    Nil,
    Unit,
    True,
    False,
}

impl Literal {
    /// Maps a literal symbol name (without the `#`) to its constant.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "?" => Some(Literal::Undef),
            "nil" => Some(Literal::Nil),
            "unit" => Some(Literal::Unit),
            "t" => Some(Literal::True),
            "f" => Some(Literal::False),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Literal::Undef => "undef",
            Literal::Nil => "nil",
            Literal::Unit => "unit",
            Literal::True => "true",
            Literal::False => "false",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TypeTag {
    Literal,
    Fixnum,
    Type,
    Pair,
    Dict,
    Instr,
    Actor,
}

impl TypeTag {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "literal_t" => Some(TypeTag::Literal),
            "fixnum_t" => Some(TypeTag::Fixnum),
            "type_t" => Some(TypeTag::Type),
            "pair_t" => Some(TypeTag::Pair),
            "dict_t" => Some(TypeTag::Dict),
            "instr_t" => Some(TypeTag::Instr),
            "actor_t" => Some(TypeTag::Actor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Literal => "literal_t",
            TypeTag::Fixnum => "fixnum_t",
            TypeTag::Type => "type_t",
            TypeTag::Pair => "pair_t",
            TypeTag::Dict => "dict_t",
            TypeTag::Instr => "instr_t",
            TypeTag::Actor => "actor_t",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Ref {
    pub target: Target,
    pub debug: DebugInfo,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Target {
    /// A label of this module.
    Local(String),
    /// An export of an imported module.
    Qualified { module: String, name: String },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instr {
    Typeq { imm: TypeTag, k: Box<Node> },
    Fixnum { op: FixnumOp, imm: i64, k: Box<Node> },
    Expr { op: ExprOp, imm: Box<Node>, k: Box<Node> },
    Depth { k: Box<Node> },
    /// Both `if` and `if_not`; the latter is stored with its branches swapped.
    If { t: Box<Node>, f: Box<Node> },
    Mnemonic { op: MnemonicOp, imm: &'static str, k: Box<Node> },
    End { imm: &'static str },
}

impl Instr {
    pub fn op(&self) -> &'static str {
        match self {
            Instr::Typeq { .. } => "typeq",
            Instr::Fixnum { op, .. } => op.as_str(),
            Instr::Expr { op, .. } => op.as_str(),
            Instr::Depth { .. } => "depth",
            Instr::If { .. } => "if",
            Instr::Mnemonic { op, .. } => op.as_str(),
            Instr::End { .. } => "end",
        }
    }
}

/// Instructions whose immediate is a fixnum.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FixnumOp {
    Pair,
    Part,
    Nth,
    Drop,
    Pick,
    Dup,
    Roll,
    Eq,
    Msg,
    Send,
    New,
    Beh,
}

impl FixnumOp {
    pub fn from_name(name: &str) -> Option<Self> {
        use FixnumOp::*;
        match name {
            "pair" => Some(Pair),
            "part" => Some(Part),
            "nth" => Some(Nth),
            "drop" => Some(Drop),
            "pick" => Some(Pick),
            "dup" => Some(Dup),
            "roll" => Some(Roll),
            "eq" => Some(Eq),
            "msg" => Some(Msg),
            "send" => Some(Send),
            "new" => Some(New),
            "beh" => Some(Beh),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use FixnumOp::*;
        match self {
            Pair => "pair",
            Part => "part",
            Nth => "nth",
            Drop => "drop",
            Pick => "pick",
            Dup => "dup",
            Roll => "roll",
            Eq => "eq",
            Msg => "msg",
            Send => "send",
            New => "new",
            Beh => "beh",
        }
    }
}

/// Instructions whose immediate is an arbitrary expression.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ExprOp {
    Push,
    IsEq,
    IsNe,
}

impl ExprOp {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "push" => Some(ExprOp::Push),
            "is_eq" => Some(ExprOp::IsEq),
            "is_ne" => Some(ExprOp::IsNe),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExprOp::Push => "push",
            ExprOp::IsEq => "is_eq",
            ExprOp::IsNe => "is_ne",
        }
    }
}

/// Instructions whose immediate is a mnemonic from a fixed vocabulary.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MnemonicOp {
    Dict,
    Deque,
    Alu,
    Cmp,
    My,
}

impl MnemonicOp {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "dict" => Some(MnemonicOp::Dict),
            "deque" => Some(MnemonicOp::Deque),
            "alu" => Some(MnemonicOp::Alu),
            "cmp" => Some(MnemonicOp::Cmp),
            "my" => Some(MnemonicOp::My),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MnemonicOp::Dict => "dict",
            MnemonicOp::Deque => "deque",
            MnemonicOp::Alu => "alu",
            MnemonicOp::Cmp => "cmp",
            MnemonicOp::My => "my",
        }
    }

    pub fn mnemonics(&self) -> &'static [&'static str] {
        match self {
            MnemonicOp::Dict => &["has", "get", "add", "set", "del"],
            MnemonicOp::Deque => &["new", "empty", "push", "pop", "put", "pull", "len"],
            MnemonicOp::Alu => &["not", "and", "or", "xor", "add", "sub", "mul"],
            MnemonicOp::Cmp => &["eq", "ge", "gt", "lt", "le", "ne"],
            MnemonicOp::My => &["self", "beh", "state"],
        }
    }
}

pub const END_MNEMONICS: &[&str] = &["abort", "stop", "commit", "release"];

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (instr, debug) = match self {
            Node::Fixnum(number) => return serializer.serialize_i64(*number),
            Node::Literal(literal) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("kind", "literal")?;
                map.serialize_entry("value", literal.as_str())?;
                return map.end();
            }
            Node::Type(tag) => return serialize_type(*tag, serializer),
            Node::Ref(reference) => return reference.serialize(serializer),
            Node::Pair { head, tail, debug } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("kind", "pair")?;
                map.serialize_entry("head", head)?;
                map.serialize_entry("tail", tail)?;
                map.serialize_entry("debug", debug)?;
                return map.end();
            }
            Node::Dict { key, value, next, debug } => {
                let mut map = serializer.serialize_map(Some(5))?;
                map.serialize_entry("kind", "dict")?;
                map.serialize_entry("key", key)?;
                map.serialize_entry("value", value)?;
                map.serialize_entry("next", next)?;
                map.serialize_entry("debug", debug)?;
                return map.end();
            }
            Node::Instr { instr, debug } => (instr, debug),
        };

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", "instr")?;
        map.serialize_entry("op", instr.op())?;
        match instr {
            Instr::Typeq { imm, k } => {
                map.serialize_entry("imm", &TypeImmediate(*imm))?;
                map.serialize_entry("k", k)?;
            }
            Instr::Fixnum { imm, k, .. } => {
                map.serialize_entry("imm", imm)?;
                map.serialize_entry("k", k)?;
            }
            Instr::Expr { imm, k, .. } => {
                map.serialize_entry("imm", imm)?;
                map.serialize_entry("k", k)?;
            }
            Instr::Depth { k } => map.serialize_entry("k", k)?,
            Instr::If { t, f } => {
                map.serialize_entry("t", t)?;
                map.serialize_entry("f", f)?;
            }
            Instr::Mnemonic { imm, k, .. } => {
                map.serialize_entry("imm", imm)?;
                map.serialize_entry("k", k)?;
            }
            Instr::End { imm } => map.serialize_entry("imm", imm)?,
        }
        map.serialize_entry("debug", debug)?;
        map.end()
    }
}

impl Serialize for Ref {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", "ref")?;
        match &self.target {
            Target::Local(name) => map.serialize_entry("name", name)?,
            Target::Qualified { module, name } => {
                map.serialize_entry("module", module)?;
                map.serialize_entry("name", name)?;
            }
        }
        map.serialize_entry("debug", &self.debug)?;
        map.end()
    }
}

struct TypeImmediate(TypeTag);

impl Serialize for TypeImmediate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_type(self.0, serializer)
    }
}

fn serialize_type<S: Serializer>(tag: TypeTag, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(2))?;
    map.serialize_entry("kind", "type")?;
    map.serialize_entry("name", tag.as_str())?;
    map.end()
}

/// Short, single-line rendering used by the listing grid.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Literal(literal) => write!(f, "#{}", literal.as_str()),
            Node::Type(tag) => write!(f, "#{}", tag.as_str()),
            Node::Fixnum(number) => write!(f, "{}", number),
            Node::Ref(reference) => write!(f, "{}", reference),
            Node::Pair { head, tail, .. } => write!(f, "({} . {})", head, tail),
            Node::Dict { key, value, next, .. } => write!(f, "{{{}: {}}} {}", key, value, next),
            Node::Instr { instr, .. } => match instr {
                Instr::Typeq { imm, k } => write!(f, "typeq #{} -> {}", imm.as_str(), k),
                Instr::Fixnum { op, imm, k } => write!(f, "{} {} -> {}", op.as_str(), imm, k),
                Instr::Expr { op, imm, k } => write!(f, "{} {} -> {}", op.as_str(), imm, k),
                Instr::Depth { k } => write!(f, "depth -> {}", k),
                Instr::If { t, f: other } => write!(f, "if {} else {}", t, other),
                Instr::Mnemonic { op, imm, k } => write!(f, "{} {} -> {}", op.as_str(), imm, k),
                Instr::End { imm } => write!(f, "end {}", imm),
            },
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.target {
            Target::Local(name) => write!(f, "{}", name),
            Target::Qualified { module, name } => write!(f, "{}.{}", module, name),
        }
    }
}
