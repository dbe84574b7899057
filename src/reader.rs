//! A minimal convenience term reader (§6.5) for the REPL and tests —
//! not the surface-syntax parser that spec §1 puts out of scope. No
//! operator-precedence table, no DCG, no C-statement desugaring: just
//! atoms, quoted atoms, strings, integers, reals, variables, functors,
//! lists, and the four reserved combinators `,` `;` `->` `:-`, each
//! left-associative, nested in the usual precedence order (`:-`
//! loosest, then `;`, then `->`, then `,`, tightest).

use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::term::TermRef;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Atom(String),
    QuotedAtom(String),
    Var(String),
    Integer(i64),
    Real(f64),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Bar,
    Comma,
    Dot,
    Semicolon,
    Arrow,
    ClauseArrow,
    Eof,
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer { src: src.as_bytes(), pos: 0 }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.peek_byte() == Some(b'%') {
                while !matches!(self.peek_byte(), None | Some(b'\n')) {
                    self.pos += 1;
                }
                continue;
            }
            break;
        }
    }

    fn next_token(&mut self) -> Result<Token, String> {
        self.skip_ws_and_comments();
        let Some(b) = self.peek_byte() else {
            return Ok(Token::Eof);
        };
        match b {
            b'(' => { self.pos += 1; Ok(Token::LParen) }
            b')' => { self.pos += 1; Ok(Token::RParen) }
            b'[' => { self.pos += 1; Ok(Token::LBracket) }
            b']' => { self.pos += 1; Ok(Token::RBracket) }
            b'|' => { self.pos += 1; Ok(Token::Bar) }
            b',' => { self.pos += 1; Ok(Token::Comma) }
            b'\'' => self.read_quoted_atom(),
            b'"' => self.read_string(),
            b'_' | b'A'..=b'Z' => Ok(self.read_var()),
            b'0'..=b'9' => self.read_number(),
            b';' => { self.pos += 1; Ok(Token::Semicolon) }
            b'!' => { self.pos += 1; Ok(Token::Atom("!".to_string())) }
            _ if is_symbol_byte(b) => self.read_symbolic(),
            b'a'..=b'z' | b'$' => Ok(self.read_bare_atom()),
            _ => Err(format!("unexpected character {:?}", b as char)),
        }
    }

    fn read_bare_atom(&mut self) -> Token {
        let start = self.pos;
        self.pos += 1; // the leading byte that dispatched here ('a'-'z' or '$')
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let s = std::str::from_utf8(&self.src[start..self.pos]).unwrap().to_string();
        Token::Atom(s)
    }

    fn read_var(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let s = std::str::from_utf8(&self.src[start..self.pos]).unwrap().to_string();
        Token::Var(s)
    }

    fn read_quoted_atom(&mut self) -> Result<Token, String> {
        self.pos += 1; // opening quote
        let s = self.read_quoted_body(b'\'')?;
        Ok(Token::QuotedAtom(s))
    }

    fn read_string(&mut self) -> Result<Token, String> {
        self.pos += 1;
        let s = self.read_quoted_body(b'"')?;
        Ok(Token::Str(s))
    }

    fn read_quoted_body(&mut self, quote: u8) -> Result<String, String> {
        let mut out = String::new();
        loop {
            match self.peek_byte() {
                None => return Err("unterminated quoted text".to_string()),
                Some(b) if b == quote => {
                    self.pos += 1;
                    if self.peek_byte() == Some(quote) {
                        out.push(quote as char);
                        self.pos += 1;
                        continue;
                    }
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    let esc = self.peek_byte().ok_or("unterminated escape")?;
                    let ch = match esc {
                        b'n' => '\n',
                        b't' => '\t',
                        b'\\' => '\\',
                        b'\'' => '\'',
                        b'"' => '"',
                        other => other as char,
                    };
                    out.push(ch);
                    self.pos += 1;
                }
                Some(b) => {
                    out.push(b as char);
                    self.pos += 1;
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, String> {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut is_real = false;
        if self.peek_byte() == Some(b'.') && matches!(self.src.get(self.pos + 1), Some(b) if b.is_ascii_digit()) {
            is_real = true;
            self.pos += 1;
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte(), Some(b'e') | Some(b'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                is_real = true;
                while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        if is_real {
            text.parse::<f64>().map(Token::Real).map_err(|e| e.to_string())
        } else {
            text.parse::<i64>().map(Token::Integer).map_err(|e| e.to_string())
        }
    }

    fn read_symbolic(&mut self) -> Result<Token, String> {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if is_symbol_byte(b)) {
            self.pos += 1;
        }
        let s = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        match s {
            "." => Ok(Token::Dot),
            "->" => Ok(Token::Arrow),
            ":-" => Ok(Token::ClauseArrow),
            other => Ok(Token::Atom(other.to_string())),
        }
    }
}

fn is_symbol_byte(b: u8) -> bool {
    matches!(b, b'+' | b'-' | b'*' | b'/' | b'\\' | b'^' | b'<' | b'>' | b'=' | b'~' | b':' | b'.' | b'?' | b'@' | b'#' | b'&')
}

struct Parser<'a, 'c> {
    lex: Lexer<'a>,
    tok: Token,
    ctx: &'c Context,
    vars: HashMap<String, TermRef>,
}

impl<'a, 'c> Parser<'a, 'c> {
    fn new(ctx: &'c Context, src: &'a str) -> Result<Self, String> {
        let mut lex = Lexer::new(src);
        let tok = lex.next_token()?;
        Ok(Parser { lex, tok, ctx, vars: HashMap::new() })
    }

    fn advance(&mut self) -> Result<(), String> {
        self.tok = self.lex.next_token()?;
        Ok(())
    }

    fn expect(&mut self, want: &Token) -> Result<(), String> {
        if &self.tok == want {
            self.advance()
        } else {
            Err(format!("expected {:?}, found {:?}", want, self.tok))
        }
    }

    /// `:-` outermost, then `;`, then `->`, then `,`, then a primary —
    /// each left-associative by folding into the matching control atom.
    /// A leading `:-` or `?-` is the prefix directive/query form (§6.2:
    /// "the parser wraps top-level goal declarations as `?-(Goal)` and
    /// immediate directives as `:-(Directive)`"), folded into a
    /// one-argument functor rather than the two-argument clause functor
    /// the infix form below produces.
    fn parse_clause_level(&mut self) -> Result<TermRef, String> {
        if self.tok == Token::ClauseArrow {
            self.advance()?;
            let rhs = self.parse_semicolon_level()?;
            return Ok(self.ctx.arena.create_functor(self.ctx.atoms.clause.clone(), vec![rhs]));
        }
        if matches!(&self.tok, Token::Atom(s) if s == "?-") {
            self.advance()?;
            let rhs = self.parse_semicolon_level()?;
            return Ok(self.ctx.arena.create_functor(self.ctx.atoms.query.clone(), vec![rhs]));
        }
        let lhs = self.parse_semicolon_level()?;
        if self.tok == Token::ClauseArrow {
            self.advance()?;
            let rhs = self.parse_semicolon_level()?;
            return Ok(self.ctx.arena.create_functor(self.ctx.atoms.clause.clone(), vec![lhs, rhs]));
        }
        Ok(lhs)
    }

    fn parse_semicolon_level(&mut self) -> Result<TermRef, String> {
        let mut acc = self.parse_arrow_level()?;
        while self.tok == Token::Semicolon {
            self.advance()?;
            let rhs = self.parse_arrow_level()?;
            acc = self.ctx.arena.create_functor(self.ctx.atoms.semicolon.clone(), vec![acc, rhs]);
        }
        Ok(acc)
    }

    fn parse_arrow_level(&mut self) -> Result<TermRef, String> {
        let mut acc = self.parse_comma_level()?;
        while self.tok == Token::Arrow {
            self.advance()?;
            let rhs = self.parse_comma_level()?;
            acc = self.ctx.arena.create_functor(self.ctx.atoms.arrow.clone(), vec![acc, rhs]);
        }
        Ok(acc)
    }

    fn parse_comma_level(&mut self) -> Result<TermRef, String> {
        let mut acc = self.parse_primary()?;
        while self.tok == Token::Comma {
            self.advance()?;
            let rhs = self.parse_primary()?;
            acc = self.ctx.arena.create_functor(self.ctx.atoms.comma.clone(), vec![acc, rhs]);
        }
        Ok(acc)
    }

    fn parse_primary(&mut self) -> Result<TermRef, String> {
        match self.tok.clone() {
            Token::LParen => {
                self.advance()?;
                let inner = self.parse_clause_level()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                self.advance()?;
                self.parse_list()
            }
            Token::Integer(n) => {
                self.advance()?;
                Ok(self.ctx.arena.create_integer(n))
            }
            Token::Real(r) => {
                self.advance()?;
                Ok(self.ctx.arena.create_real(r))
            }
            Token::Str(s) => {
                self.advance()?;
                Ok(self.ctx.arena.create_string(s.as_bytes()))
            }
            Token::Var(name) => {
                self.advance()?;
                Ok(self.var_term(&name))
            }
            Token::Atom(name) | Token::QuotedAtom(name) => {
                self.advance()?;
                if self.tok == Token::LParen {
                    self.advance()?;
                    let args = self.parse_arglist()?;
                    self.expect(&Token::RParen)?;
                    let atom = self.ctx.arena.intern(name.as_bytes());
                    Ok(self.ctx.arena.create_functor(atom, args))
                } else {
                    Ok(self.ctx.arena.create_atom_term(name.as_bytes()))
                }
            }
            other => Err(format!("unexpected token {:?}", other)),
        }
    }

    fn parse_arglist(&mut self) -> Result<Vec<TermRef>, String> {
        let mut args = vec![self.parse_comma_arg()?];
        while self.tok == Token::Comma {
            self.advance()?;
            args.push(self.parse_comma_arg()?);
        }
        Ok(args)
    }

    /// Functor arguments parse at the `->` level, with `:-` allowed as
    /// an infix wrapper on top of that: a bare `,` inside an argument
    /// list is the argument separator, not the conjunction operator, so
    /// arguments must not themselves swallow a `,` by calling down into
    /// `parse_semicolon_level`/`parse_comma_level`. `:-` doesn't have
    /// that hazard, so it's handled here directly — this is what lets
    /// `assertz(Head :- Body)` read a whole rule as one argument.
    fn parse_comma_arg(&mut self) -> Result<TermRef, String> {
        let lhs = self.parse_arrow_level()?;
        if self.tok == Token::ClauseArrow {
            self.advance()?;
            let rhs = self.parse_arrow_level()?;
            return Ok(self.ctx.arena.create_functor(self.ctx.atoms.clause.clone(), vec![lhs, rhs]));
        }
        Ok(lhs)
    }

    fn parse_list(&mut self) -> Result<TermRef, String> {
        if self.tok == Token::RBracket {
            self.advance()?;
            return Ok(self.ctx.arena.nil());
        }
        let mut items = vec![self.parse_comma_arg()?];
        while self.tok == Token::Comma {
            self.advance()?;
            items.push(self.parse_comma_arg()?);
        }
        let tail = if self.tok == Token::Bar {
            self.advance()?;
            self.parse_comma_arg()?
        } else {
            self.ctx.arena.nil()
        };
        self.expect(&Token::RBracket)?;
        let mut acc = tail;
        for item in items.into_iter().rev() {
            acc = self.ctx.arena.cons(item, acc);
        }
        Ok(acc)
    }

    fn var_term(&mut self, name: &str) -> TermRef {
        if name == "_" {
            return self.ctx.arena.create_var(None);
        }
        if let Some(existing) = self.vars.get(name) {
            return existing.clone();
        }
        let atom = self.ctx.arena.intern(name.as_bytes());
        let v = self.ctx.arena.create_var(Some(atom));
        self.vars.insert(name.to_string(), v.clone());
        v
    }
}

/// Read one `.`-terminated term from `text` (§6.5). The trailing `.`
/// is consumed; anything after it is ignored, matching how a REPL line
/// carries exactly one clause or query.
pub fn read_term(ctx: &Context, text: &str) -> EngineResult<TermRef> {
    let mut parser = Parser::new(ctx, text).map_err(EngineError::Reader)?;
    if parser.tok == Token::Eof {
        return Err(EngineError::Reader("empty input".to_string()));
    }
    let term = parser.parse_clause_level().map_err(EngineError::Reader)?;
    match parser.tok {
        Token::Dot => Ok(term),
        Token::Eof => Ok(term),
        other => Err(EngineError::Reader(format!("expected '.', found {:?}", other))),
    }
}

/// Variable names bound while reading `text`, keyed by source name,
/// useful for a REPL to print `Name = Value` solutions (§6.5).
pub fn read_term_with_vars(ctx: &Context, text: &str) -> EngineResult<(TermRef, HashMap<String, TermRef>)> {
    let mut parser = Parser::new(ctx, text).map_err(EngineError::Reader)?;
    if parser.tok == Token::Eof {
        return Err(EngineError::Reader("empty input".to_string()));
    }
    let term = parser.parse_clause_level().map_err(EngineError::Reader)?;
    match parser.tok {
        Token::Dot | Token::Eof => Ok((term, parser.vars)),
        other => Err(EngineError::Reader(format!("expected '.', found {:?}", other))),
    }
}

/// Read every `.`-terminated term in `text` in order (§6.1
/// `consult_source`). Each term gets its own fresh variable scope —
/// a `Var` named `X` in one clause is unrelated to an `X` in the next,
/// matching how a real source file's clauses don't share variables.
pub fn read_all_terms(ctx: &Context, text: &str) -> EngineResult<Vec<TermRef>> {
    let mut lex = Lexer::new(text);
    let mut tok = lex.next_token().map_err(EngineError::Reader)?;
    let mut terms = Vec::new();
    while tok != Token::Eof {
        let mut parser = Parser {
            lex,
            tok,
            ctx,
            vars: HashMap::new(),
        };
        let term = parser.parse_clause_level().map_err(EngineError::Reader)?;
        match parser.tok {
            Token::Dot => parser.advance().map_err(EngineError::Reader)?,
            Token::Eof => {}
            other => return Err(EngineError::Reader(format!("expected '.', found {:?}", other))),
        }
        terms.push(term);
        lex = parser.lex;
        tok = parser.tok;
    }
    Ok(terms)
}
