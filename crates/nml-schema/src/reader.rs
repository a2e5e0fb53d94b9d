//! # Namelist Reader
//!
//! Parses Fortran namelist text into `name -> value` trees that the
//! validator can check. Arrays are returned nested with the outermost list
//! running over the last Fortran index; elements never assigned are `null`.
//!
//! Supported input: `&group ... /` (also `$group`, `&end`, `$end`), `!`
//! comments, quoted strings with doubled-quote escapes, logicals (`.true.`,
//! `.t.`, `T`, `F`), integers, reals with `e`/`d` exponents, repeat counts
//! (`3*0.5`, `2*`), null values (`1, , 3`), and element or slice targets
//! (`a(2) = ..`, `a(:, 3) = ..`, `a(1:2, 1) = ..`). Keys are lower-cased.

use std::collections::BTreeMap;
use std::path::Path;

use nml_core::{is_identifier, NmlError, NmlResult};
use serde_json::{Map, Number, Value};

/// One `&name ... /` block.
#[derive(Debug, Clone, PartialEq)]
pub struct NamelistGroup {
    /// Group name, lower-cased.
    pub name: String,
    /// Assigned variables in first-assignment order.
    pub values: Map<String, Value>,
}

/// Parse namelist text. `origin` names the input in error messages.
pub fn parse_namelist(text: &str, origin: &str) -> NmlResult<Vec<NamelistGroup>> {
    let mut lexer = Lexer::new(text, origin);
    let mut groups = Vec::new();
    while let Some(name) = lexer.next_group_start()? {
        let tokens = lexer.group_tokens()?;
        let values = GroupParser::new(&tokens, origin).parse()?;
        groups.push(NamelistGroup { name, values });
    }
    tracing::trace!(origin, groups = groups.len(), "parsed namelist");
    Ok(groups)
}

/// Read and parse a namelist file.
pub fn read_namelist_file(path: &Path) -> NmlResult<Vec<NamelistGroup>> {
    let text = std::fs::read_to_string(path).map_err(|source| NmlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_namelist(&text, &path.display().to_string())
}

fn parse_error(origin: &str, line: usize, reason: impl std::fmt::Display) -> NmlError {
    NmlError::Parse {
        path: origin.to_string(),
        reason: format!("line {line}: {reason}"),
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Word(String),
    Str(String),
    LParen,
    RParen,
    Eq,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
struct Spanned {
    tok: Tok,
    line: usize,
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    origin: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(text: &str, origin: &'a str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            origin,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Skip text between groups; return the next group name.
    fn next_group_start(&mut self) -> NmlResult<Option<String>> {
        while let Some(c) = self.bump() {
            match c {
                '!' => self.skip_line(),
                '&' | '$' => {
                    let mut name = String::new();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                    let lower = name.to_ascii_lowercase();
                    if lower == "end" || lower.is_empty() {
                        continue;
                    }
                    if !is_identifier(&name) {
                        return Err(parse_error(self.origin, self.line, format!("invalid group name '{name}'")));
                    }
                    return Ok(Some(lower));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Tokens up to (not including) the group terminator.
    fn group_tokens(&mut self) -> NmlResult<Vec<Spanned>> {
        let start = self.line;
        let mut out = Vec::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(parse_error(self.origin, start, "namelist group is not terminated"));
            };
            let line = self.line;
            let tok = match c {
                c if c.is_whitespace() || c == ';' => {
                    self.bump();
                    continue;
                }
                '!' => {
                    self.skip_line();
                    continue;
                }
                '/' => {
                    self.bump();
                    return Ok(out);
                }
                ',' => {
                    self.bump();
                    Tok::Comma
                }
                '=' => {
                    self.bump();
                    Tok::Eq
                }
                '(' => {
                    self.bump();
                    Tok::LParen
                }
                ')' => {
                    self.bump();
                    Tok::RParen
                }
                '\'' | '"' => Tok::Str(self.string(c)?),
                _ => {
                    let word = self.word();
                    let lower = word.to_ascii_lowercase();
                    if matches!(lower.as_str(), "&end" | "$end" | "&" | "$") {
                        return Ok(out);
                    }
                    Tok::Word(word)
                }
            };
            out.push(Spanned { tok, line });
        }
    }

    fn string(&mut self, quote: char) -> NmlResult<String> {
        let start = self.line;
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(parse_error(self.origin, start, "unterminated string")),
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        s.push(quote);
                    } else {
                        return Ok(s);
                    }
                }
                Some(c) => s.push(c),
            }
        }
    }

    fn word(&mut self) -> String {
        let mut w = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, ',' | '=' | '(' | ')' | '/' | '!' | '\'' | '"' | ';') {
                break;
            }
            w.push(c);
            self.pos += 1;
        }
        w
    }
}

// ---------------------------------------------------------------------------
// Group parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum IndexSpec {
    Single(i64),
    Range(Option<i64>, Option<i64>),
}

/// Everything assigned to one variable.
#[derive(Debug, Default)]
struct Entry {
    scalar: Option<Value>,
    cells: BTreeMap<Vec<i64>, Value>,
    rank: usize,
}

struct GroupParser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    origin: &'a str,
}

impl<'a> GroupParser<'a> {
    fn new(tokens: &'a [Spanned], origin: &'a str) -> Self {
        Self { tokens, pos: 0, origin }
    }

    fn peek(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset).map(|s| &s.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |s| s.line)
    }

    fn err(&self, reason: impl std::fmt::Display) -> NmlError {
        parse_error(self.origin, self.line(), reason)
    }

    fn at_key(&self) -> bool {
        matches!(self.peek(0), Some(Tok::Word(_))) && matches!(self.peek(1), Some(Tok::Eq | Tok::LParen))
    }

    fn parse(mut self) -> NmlResult<Map<String, Value>> {
        let mut order: Vec<String> = Vec::new();
        let mut entries: BTreeMap<String, Entry> = BTreeMap::new();

        while self.pos < self.tokens.len() {
            if self.peek(0) == Some(&Tok::Comma) {
                self.pos += 1;
                continue;
            }
            let Some(Tok::Word(raw)) = self.peek(0).cloned() else {
                return Err(self.err("expected a variable name"));
            };
            if !self.at_key() {
                return Err(self.err(format!("expected '=' after '{raw}'")));
            }
            if !is_identifier(&raw) {
                return Err(self.err(format!("invalid variable name '{raw}'")));
            }
            let key = raw.to_ascii_lowercase();
            self.pos += 1;

            let index = if self.peek(0) == Some(&Tok::LParen) {
                self.pos += 1;
                Some(self.index_specs()?)
            } else {
                None
            };
            if self.peek(0) != Some(&Tok::Eq) {
                return Err(self.err(format!("expected '=' after '{key}(...)'")));
            }
            self.pos += 1;
            let values = self.values()?;

            if !entries.contains_key(&key) {
                order.push(key.clone());
            }
            let entry = entries.entry(key.clone()).or_default();
            assign(entry, index.as_deref(), values).map_err(|reason| self.err(format!("{key}: {reason}")))?;
        }

        let mut out = Map::new();
        for key in order {
            if let Some(entry) = entries.remove(&key) {
                out.insert(key, entry.into_value());
            }
        }
        Ok(out)
    }

    fn index_specs(&mut self) -> NmlResult<Vec<IndexSpec>> {
        let mut specs = Vec::new();
        loop {
            match self.peek(0).cloned() {
                Some(Tok::Word(w)) => {
                    specs.push(parse_index(&w).ok_or_else(|| self.err(format!("invalid index '{w}'")))?);
                    self.pos += 1;
                }
                _ => return Err(self.err("expected an index")),
            }
            match self.peek(0) {
                Some(Tok::Comma) => self.pos += 1,
                Some(Tok::RParen) => {
                    self.pos += 1;
                    return Ok(specs);
                }
                _ => return Err(self.err("expected ',' or ')' in index")),
            }
        }
    }

    /// Values after `=`, up to the next `name =` / `name(`.
    fn values(&mut self) -> NmlResult<Vec<Value>> {
        let mut out = Vec::new();
        let mut expect_value = true;
        while self.pos < self.tokens.len() && !self.at_key() {
            let tok = self.peek(0).cloned();
            match tok {
                Some(Tok::Comma) => {
                    if expect_value {
                        out.push(Value::Null);
                    }
                    expect_value = true;
                    self.pos += 1;
                }
                Some(Tok::Str(s)) => {
                    out.push(Value::String(s));
                    expect_value = false;
                    self.pos += 1;
                }
                Some(Tok::Word(w)) => {
                    self.pos += 1;
                    match w.split_once('*') {
                        Some((count, rest)) if count.chars().all(|c| c.is_ascii_digit()) && !count.is_empty() => {
                            let n: usize = count.parse().map_err(|_| self.err(format!("invalid repeat count '{count}'")))?;
                            let value = if !rest.is_empty() {
                                scalar_value(rest).ok_or_else(|| self.err(format!("invalid value '{rest}'")))?
                            } else if let Some(Tok::Str(s)) = self.peek(0).cloned() {
                                self.pos += 1;
                                Value::String(s)
                            } else {
                                Value::Null
                            };
                            out.extend(std::iter::repeat(value).take(n));
                        }
                        _ => out.push(scalar_value(&w).ok_or_else(|| self.err(format!("invalid value '{w}'")))?),
                    }
                    expect_value = false;
                }
                Some(other) => return Err(self.err(format!("unexpected {other:?} in value list"))),
                None => break,
            }
        }
        Ok(out)
    }
}

fn parse_index(w: &str) -> Option<IndexSpec> {
    let bound = |s: &str| -> Option<Option<i64>> {
        if s.is_empty() {
            Some(None)
        } else {
            s.parse().ok().map(Some)
        }
    };
    match w.split_once(':') {
        None => w.parse().ok().map(IndexSpec::Single),
        Some((lo, hi)) => Some(IndexSpec::Range(bound(lo)?, bound(hi)?)),
    }
}

/// Interpret an unquoted value token.
fn scalar_value(w: &str) -> Option<Value> {
    if let Ok(i) = w.parse::<i64>() {
        return Some(Value::Number(Number::from(i)));
    }
    if w.chars().any(|c| c.is_ascii_digit()) {
        let normalized = w.replace(['d', 'D'], "e");
        if let Ok(f) = normalized.parse::<f64>() {
            return Number::from_f64(f).map(Value::Number);
        }
    }
    let body = w.strip_prefix('.').unwrap_or(w);
    match body.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('t') => Some(Value::Bool(true)),
        Some('f') => Some(Value::Bool(false)),
        _ => None,
    }
}

fn assign(entry: &mut Entry, index: Option<&[IndexSpec]>, values: Vec<Value>) -> Result<(), String> {
    let Some(specs) = index else {
        if values.len() == 1 && entry.cells.is_empty() {
            entry.scalar = values.into_iter().next();
            return Ok(());
        }
        let specs = [IndexSpec::Range(Some(1), None)];
        return assign(entry, Some(&specs), values);
    };

    // `x(:, :) = ...` on a fresh entry is a whole-array assignment
    let whole = specs
        .iter()
        .all(|s| matches!(s, IndexSpec::Range(None | Some(1), None)));
    if whole && entry.rank == 0 && entry.cells.is_empty() && entry.scalar.is_none() {
        if values.iter().all(Value::is_null) {
            return Ok(());
        }
        return assign(entry, None, values);
    }

    if entry.rank != 0 && entry.rank != specs.len() {
        return Err(format!("index rank {} does not match earlier rank {}", specs.len(), entry.rank));
    }
    entry.rank = specs.len();
    if let Some(scalar) = entry.scalar.take() {
        entry.cells.insert(vec![1; specs.len()], scalar);
    }

    let open: Vec<usize> = specs
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s, IndexSpec::Range(..)))
        .map(|(i, _)| i)
        .collect();

    let mut start: Vec<i64> = specs
        .iter()
        .map(|s| match s {
            IndexSpec::Single(i) => *i,
            IndexSpec::Range(lo, _) => lo.unwrap_or(1),
        })
        .collect();
    if start.iter().any(|&i| i < 1) {
        return Err("indices must be >= 1".to_string());
    }

    if values.iter().all(Value::is_null) {
        return Ok(());
    }

    // all-single: continue along the first axis
    let axes: Vec<usize> = if open.is_empty() { vec![0] } else { open };
    let mut extents: Vec<Option<i64>> = Vec::with_capacity(axes.len());
    for (n, &axis) in axes.iter().enumerate() {
        let extent = match specs[axis] {
            IndexSpec::Range(lo, Some(hi)) => {
                let lo = lo.unwrap_or(1);
                if hi < lo {
                    return Err(format!("empty index range {lo}:{hi}"));
                }
                Some(hi - lo + 1)
            }
            _ => None,
        };
        if extent.is_none() && n + 1 < axes.len() {
            return Err("only the last open dimension may be unbounded".to_string());
        }
        extents.push(extent);
    }
    let capacity: Option<i64> = extents.iter().copied().product::<Option<i64>>();
    if let Some(cap) = capacity {
        if values.len() as i64 > cap {
            return Err(format!("{} values exceed the {cap} target elements", values.len()));
        }
    }

    let origin = start.clone();
    for value in values {
        if !value.is_null() {
            entry.cells.insert(start.clone(), value);
        }
        // advance column-major over the open axes
        for (n, &axis) in axes.iter().enumerate() {
            start[axis] += 1;
            match extents[n] {
                Some(ext) if start[axis] - origin[axis] >= ext => start[axis] = origin[axis],
                _ => break,
            }
        }
    }
    Ok(())
}

impl Entry {
    fn into_value(self) -> Value {
        if self.cells.is_empty() {
            return self.scalar.unwrap_or(Value::Null);
        }
        let mut extents = vec![0i64; self.rank];
        for idx in self.cells.keys() {
            for (axis, &i) in idx.iter().enumerate() {
                extents[axis] = extents[axis].max(i);
            }
        }
        let mut index = vec![0i64; self.rank];
        build(&self.cells, &extents, self.rank, &mut index)
    }
}

/// Nested list for axes `0..depth`, outermost = axis `depth - 1`.
fn build(cells: &BTreeMap<Vec<i64>, Value>, extents: &[i64], depth: usize, index: &mut Vec<i64>) -> Value {
    if depth == 0 {
        return cells.get(index.as_slice()).cloned().unwrap_or(Value::Null);
    }
    let axis = depth - 1;
    let mut items = Vec::with_capacity(extents[axis] as usize);
    for i in 1..=extents[axis] {
        index[axis] = i;
        items.push(build(cells, extents, depth - 1, index));
    }
    Value::Array(items)
}
