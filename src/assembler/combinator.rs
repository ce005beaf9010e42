//! Parsing expression grammar primitives.
//!
//! A `Matcher<T>` takes an `Input` cursor and either succeeds with the
//! advanced cursor and a node of type `T`, or fails with a `Failure`. The
//! grammar in the parser module is built entirely out of these.
use std::cell::RefCell;
use std::rc::Rc;

use super::error::{ErrorKind, Failure};
use super::lexer::Token;

pub type Outcome<'b, 's, T> = Result<(Input<'b, 's>, T), Failure>;

/// Memoizing buffer over a token stream. Tokens are pulled from the
/// underlying stream only when a position past the end of the buffer is
/// requested, so alternatives that restart at the same position never
/// re-run the tokenizer.
pub struct TokenBuffer<'s> {
    stream: RefCell<Box<dyn Iterator<Item = Token> + 's>>,
    tokens: RefCell<Vec<Token>>,
}

impl<'s> TokenBuffer<'s> {
    pub fn new<I>(stream: I) -> Self
    where
        I: Iterator<Item = Token> + 's,
    {
        TokenBuffer {
            stream: RefCell::new(Box::new(stream)),
            tokens: RefCell::new(Vec::with_capacity(256)),
        }
    }

    fn get(&self, position: usize) -> Option<Token> {
        let mut tokens = self.tokens.borrow_mut();
        while tokens.len() <= position {
            match self.stream.borrow_mut().next() {
                Some(token) => {
                    trace!("token {}", token);
                    tokens.push(token);
                }
                None => return None,
            }
        }
        tokens.get(position).cloned()
    }

    /// Number of tokens pulled from the stream so far.
    pub fn pulled(&self) -> usize {
        self.tokens.borrow().len()
    }
}

/// A position within a `TokenBuffer`. Cheap to copy; advancing returns a new
/// cursor and leaves the old one valid.
#[derive(Copy, Clone)]
pub struct Input<'b, 's> {
    buffer: &'b TokenBuffer<'s>,
    position: usize,
}

impl<'b, 's> Input<'b, 's> {
    pub fn start(buffer: &'b TokenBuffer<'s>) -> Self {
        Input { buffer, position: 0 }
    }

    /// The token at this position, or `None` once the stream is exhausted.
    pub fn token(&self) -> Option<Token> {
        self.buffer.get(self.position)
    }

    pub fn next(self) -> Self {
        Input { buffer: self.buffer, position: self.position + 1 }
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

pub struct Matcher<T>(Rc<dyn for<'b, 's> Fn(Input<'b, 's>) -> Outcome<'b, 's, T>>);

impl<T> Clone for Matcher<T> {
    fn clone(&self) -> Self {
        Matcher(Rc::clone(&self.0))
    }
}

impl<T: 'static> Matcher<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'b, 's> Fn(Input<'b, 's>) -> Outcome<'b, 's, T> + 'static,
    {
        Matcher(Rc::new(f))
    }

    pub fn parse<'b, 's>(&self, input: Input<'b, 's>) -> Outcome<'b, 's, T> {
        (self.0)(input)
    }

    /// Transforms the node of a successful match.
    pub fn map<U: 'static, F>(self, f: F) -> Matcher<U>
    where
        F: Fn(T) -> U + 'static,
    {
        Matcher::new(move |input| {
            let (input, node) = self.parse(input)?;
            Ok((input, f(node)))
        })
    }

    /// Sequence of two matchers with differently typed nodes.
    pub fn then<U: 'static>(self, other: Matcher<U>) -> Matcher<(T, U)> {
        Matcher::new(move |input| {
            let (input, first) = self.parse(input)?;
            let (input, second) = other.parse(input)?;
            Ok((input, (first, second)))
        })
    }
}

/// Always succeeds without consuming anything.
pub fn zero() -> Matcher<()> {
    Matcher::new(|input| Ok((input, ())))
}

/// Consumes exactly one token, if `select` turns it into a node.
pub fn one<T: 'static, F>(select: F) -> Matcher<T>
where
    F: Fn(&Token) -> Option<T> + 'static,
{
    Matcher::new(move |input| {
        let token = input.token().ok_or_else(Failure::end_of_stream)?;
        match select(&token) {
            Some(node) => Ok((input.next(), node)),
            None => Err(Failure::at(ErrorKind::Rejected, &token)),
        }
    })
}

/// Ordered choice: the first alternative that matches wins.
pub fn or<T: 'static>(matchers: Vec<Matcher<T>>) -> Matcher<T> {
    Matcher::new(move |input| {
        for matcher in matchers.iter() {
            if let Ok(result) = matcher.parse(input) {
                return Ok(result);
            }
        }
        Err(Failure { kind: ErrorKind::NoAlternative, token: input.token() })
    })
}

/// Sequence: every matcher must succeed, in order.
pub fn and<T: 'static>(matchers: Vec<Matcher<T>>) -> Matcher<Vec<T>> {
    Matcher::new(move |mut input| {
        let mut nodes = Vec::with_capacity(matchers.len());
        for matcher in matchers.iter() {
            let (next, node) = matcher.parse(input)?;
            input = next;
            nodes.push(node);
        }
        Ok((input, nodes))
    })
}

/// Zero or more.
pub fn repeat<T: 'static>(matcher: Matcher<T>) -> Matcher<Vec<T>> {
    Matcher::new(move |mut input| {
        let mut nodes = Vec::new();
        while let Ok((next, node)) = matcher.parse(input) {
            // A match that consumes nothing would match forever.
            let stalled = next.position() == input.position();
            input = next;
            nodes.push(node);
            if stalled {
                break;
            }
        }
        Ok((input, nodes))
    })
}

/// One or more.
pub fn many<T: 'static>(matcher: Matcher<T>) -> Matcher<Vec<T>> {
    let tail = repeat(matcher.clone());
    matcher.then(tail).map(|(head, mut tail)| {
        tail.insert(0, head);
        tail
    })
}

pub fn optional<T: 'static>(matcher: Matcher<T>) -> Matcher<Option<T>> {
    or(vec![matcher.map(Some), zero().map(|()| None)])
}
