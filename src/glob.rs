//! Extended-glob compiler.
//!
//! Rule files (`.distignore`, `.distfiles`, ...) are written in an
//! extended-glob dialect. This module turns one pattern line into a
//! [`Matcher`] that tests `/`-separated paths relative to the project root.
//!
//! ## Grammar
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `*` | any run of characters except `/` |
//! | `**/` | zero or more whole path segments |
//! | `**` | any run of characters, `/` included |
//! | `?` | exactly one character other than `/` |
//! | `[abc]`, `[a-z]`, `[!x]` | bracket expression (never matches `/`) |
//! | `[:digit:]` ... | POSIX class, bare or inside `[...]` |
//! | `+(a\|b)` | one or more of the alternatives |
//! | `*(a\|b)` | zero or more |
//! | `?(a\|b)` | zero or one |
//! | `@(a\|b)` | exactly one |
//! | `\c` | `c` taken literally |
//!
//! ## Two passes
//!
//! Compilation never does textual substitution on the pattern. The parser
//! first builds a small AST of `Node`s, then each node is rendered into the
//! `regex` dialect. Literal runs are escaped as they are rendered, so there
//! are no placeholder strings that could collide with pattern text.
//!
//! ## Anchoring
//!
//! ```text
//! /bootstrap.php   ^bootstrap\.php(?:$|/)          root only
//! *.php            (?:^|/)[^/]*\.php(?:$|/)        any basename, any depth
//! .github/ci.yml   (?:^|/)\.github/ci\.yml(?:$|/)  dot patterns float
//! src/*.js         ^src/[^/]*\.js(?:$|/)           contains `/`: root relative
//! vendor/          (?:^|/)vendor(?:$|/)            directory and everything below
//! ```
//!
//! Every pattern also matches everything beneath whatever it names, so a
//! pattern naming a directory covers the files inside it. Two consequences:
//!
//! - `/src` matches `src` and every path below it, not only the exact path.
//! - A slash-free `src` matches `src/Plugin.php` although the basename
//!   `Plugin.php` does not match. Basename agreement holds only when no
//!   directory segment of the path matches the pattern.
//!
//! ## Malformed patterns
//!
//! An unbalanced group such as `+(a|b` does not raise. The whole pattern is
//! escaped and matched literally instead: a typo in an ignore file must not
//! stop a release.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const FLOATING_PREFIX: &str = "(?:^|/)";
const ROOT_PREFIX: &str = "^";
const SUBTREE_SUFFIX: &str = "(?:$|/)";

/// A compiled path test.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// The pattern parsed as an extended glob.
    Glob(Regex),
    /// The pattern was malformed and is matched as literal text.
    Literal(Regex),
    /// The pattern can never match (empty after anchoring was stripped).
    Never,
}

impl Matcher {
    /// Test a `/`-separated path relative to the project root.
    pub fn test(&self, relative_path: &str) -> bool {
        match self {
            Matcher::Glob(re) | Matcher::Literal(re) => re.is_match(relative_path),
            Matcher::Never => false,
        }
    }

    pub fn is_literal_fallback(&self) -> bool {
        matches!(self, Matcher::Literal(_))
    }

    /// The rendered regex, if any. Useful when debugging rule files.
    pub fn as_regex(&self) -> Option<&str> {
        match self {
            Matcher::Glob(re) | Matcher::Literal(re) => Some(re.as_str()),
            Matcher::Never => None,
        }
    }
}

/// Compile one pattern line.
///
/// `root_anchored` forces the pattern to match from the start of the
/// relative path even when it has no leading `/`.
pub fn compile(pattern: &str, root_anchored: bool) -> Matcher {
    let (prefix, body) = anchoring(pattern, root_anchored);
    if body.is_empty() {
        return Matcher::Never;
    }

    match parse(body) {
        Ok(nodes) => {
            let source = format!("{prefix}{}{SUBTREE_SUFFIX}", render(&nodes));
            match Regex::new(&source) {
                Ok(re) => Matcher::Glob(re),
                Err(err) => {
                    tracing::warn!(pattern, %err, "glob rendered to an invalid regex; matching literally");
                    literal(prefix, body)
                }
            }
        }
        Err(err) => {
            tracing::warn!(pattern, %err, "malformed glob; matching literally");
            literal(prefix, body)
        }
    }
}

fn literal(prefix: &str, body: &str) -> Matcher {
    let source = format!("{prefix}{}{SUBTREE_SUFFIX}", regex::escape(body));
    Regex::new(&source)
        .map(Matcher::Literal)
        .unwrap_or(Matcher::Never)
}

/// Split a pattern into its regex anchor and the glob body to parse.
fn anchoring(pattern: &str, root_anchored: bool) -> (&'static str, &str) {
    // `dir/` means `dir/**`, which the subtree suffix already provides.
    let body = pattern.trim_end_matches('/');

    if let Some(rest) = body.strip_prefix('/') {
        return (ROOT_PREFIX, rest);
    }
    if root_anchored {
        return (ROOT_PREFIX, body);
    }
    if !body.contains('/') || body.starts_with('.') {
        (FLOATING_PREFIX, body)
    } else {
        (ROOT_PREFIX, body)
    }
}

// ============================================================================
// Pattern
// ============================================================================

/// A raw rule line plus its lazily compiled matcher.
///
/// Compilation happens on first use and is cached for the life of the
/// pattern, so a rule set shared across worker threads compiles each line
/// once.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    anchored: bool,
    matcher: OnceLock<Matcher>,
}

impl Pattern {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            anchored: false,
            matcher: OnceLock::new(),
        }
    }

    /// A pattern always matched from the project root.
    pub fn anchored(raw: impl Into<String>) -> Self {
        Self {
            anchored: true,
            ..Self::new(raw)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn matcher(&self) -> &Matcher {
        self.matcher
            .get_or_init(|| compile(&self.raw, self.anchored))
    }

    pub fn matches(&self, relative_path: &str) -> bool {
        self.matcher().test(relative_path)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.anchored == other.anchored
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ============================================================================
// Pass 1: parse
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(String),
    /// `*`
    Star,
    /// `**` not followed by `/`
    GlobStar,
    /// `**/`
    GlobStarSlash,
    /// `?`
    AnyChar,
    Class {
        negated: bool,
        items: Vec<ClassItem>,
    },
    Group {
        kind: GroupKind,
        alternatives: Vec<Vec<Node>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClassItem {
    Char(char),
    Range(char, char),
    Posix(PosixClass),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GroupKind {
    /// `+(...)`
    OneOrMore,
    /// `*(...)`
    ZeroOrMore,
    /// `?(...)`
    Optional,
    /// `@(...)`
    ExactlyOne,
}

impl GroupKind {
    fn from_sigil(c: char) -> Option<Self> {
        match c {
            '+' => Some(GroupKind::OneOrMore),
            '*' => Some(GroupKind::ZeroOrMore),
            '?' => Some(GroupKind::Optional),
            '@' => Some(GroupKind::ExactlyOne),
            _ => None,
        }
    }

    fn quantifier(self) -> &'static str {
        match self {
            GroupKind::OneOrMore => "+",
            GroupKind::ZeroOrMore => "*",
            GroupKind::Optional => "?",
            GroupKind::ExactlyOne => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PosixClass {
    Upper,
    Lower,
    Alpha,
    Digit,
    Xdigit,
    Alnum,
    Blank,
    Space,
    Word,
}

impl PosixClass {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "upper" => PosixClass::Upper,
            "lower" => PosixClass::Lower,
            "alpha" => PosixClass::Alpha,
            "digit" => PosixClass::Digit,
            "xdigit" => PosixClass::Xdigit,
            "alnum" => PosixClass::Alnum,
            "blank" => PosixClass::Blank,
            "space" => PosixClass::Space,
            "word" => PosixClass::Word,
            _ => return None,
        })
    }

    /// Bracket-expression body, without the surrounding `[]`.
    fn members(self) -> &'static str {
        match self {
            PosixClass::Upper => "A-Z",
            PosixClass::Lower => "a-z",
            PosixClass::Alpha => "A-Za-z",
            PosixClass::Digit => "0-9",
            PosixClass::Xdigit => "0-9A-Fa-f",
            PosixClass::Alnum => "A-Za-z0-9",
            PosixClass::Blank => r" \t",
            PosixClass::Space => r" \t\n\r\x0B\x0C",
            PosixClass::Word => "A-Za-z0-9_",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseError {
    UnclosedGroup { start: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnclosedGroup { start } => {
                write!(f, "group opened at offset {start} is never closed")
            }
        }
    }
}

fn parse(pattern: &str) -> Result<Vec<Node>, ParseError> {
    let mut parser = Parser {
        chars: pattern.chars().collect(),
        pos: 0,
    };
    parser.sequence(false).map(|(nodes, _)| nodes)
}

/// How a sequence inside a group ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    End,
    Bar,
    Close,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Parse until end of input, or, inside a group, until `|` or `)`.
    fn sequence(&mut self, in_group: bool) -> Result<(Vec<Node>, Terminator), ParseError> {
        let mut nodes = Vec::new();

        while let Some(c) = self.bump() {
            match c {
                '|' if in_group => return Ok((nodes, Terminator::Bar)),
                ')' if in_group => return Ok((nodes, Terminator::Close)),
                '\\' => {
                    let escaped = self.bump().unwrap_or('\\');
                    push_literal(&mut nodes, escaped);
                }
                '+' | '*' | '?' | '@' if self.peek() == Some('(') => {
                    let start = self.pos - 1;
                    self.pos += 1;
                    let kind = GroupKind::from_sigil(c).unwrap_or(GroupKind::ExactlyOne);
                    nodes.push(self.group(kind, start)?);
                }
                '*' if self.peek() == Some('*') => {
                    self.pos += 1;
                    // Runs of three or more stars collapse into one globstar.
                    while self.peek() == Some('*') {
                        self.pos += 1;
                    }
                    if self.peek() == Some('/') {
                        self.pos += 1;
                        nodes.push(Node::GlobStarSlash);
                    } else {
                        nodes.push(Node::GlobStar);
                    }
                }
                '*' => nodes.push(Node::Star),
                '?' => nodes.push(Node::AnyChar),
                '[' => match self.bracket() {
                    Some(class) => nodes.push(class),
                    None => push_literal(&mut nodes, '['),
                },
                other => push_literal(&mut nodes, other),
            }
        }

        Ok((nodes, Terminator::End))
    }

    /// Parse the alternatives of a group whose `(` was just consumed.
    fn group(&mut self, kind: GroupKind, start: usize) -> Result<Node, ParseError> {
        let mut alternatives = Vec::new();
        loop {
            let (alt, end) = self.sequence(true)?;
            alternatives.push(alt);
            match end {
                Terminator::Bar => continue,
                Terminator::Close => return Ok(Node::Group { kind, alternatives }),
                Terminator::End => return Err(ParseError::UnclosedGroup { start }),
            }
        }
    }

    /// Parse a bracket expression whose `[` was just consumed.
    ///
    /// Returns `None` (and rewinds) when there is no closing `]`, in which
    /// case the `[` is an ordinary character.
    fn bracket(&mut self) -> Option<Node> {
        let open = self.pos;

        if let Some(class) = self.posix_name() {
            return Some(Node::Class {
                negated: false,
                items: vec![ClassItem::Posix(class)],
            });
        }

        let negated = matches!(self.peek(), Some('!' | '^'));
        if negated {
            self.pos += 1;
        }

        let mut items = Vec::new();
        let mut first = true;
        loop {
            let Some(c) = self.bump() else {
                self.pos = open;
                return None;
            };
            match c {
                ']' if !first => return Some(Node::Class { negated, items }),
                '[' if self.peek() == Some(':') => {
                    match self.posix_name() {
                        Some(class) => items.push(ClassItem::Posix(class)),
                        None => items.push(ClassItem::Char('[')),
                    }
                }
                _ => {
                    let lo = if c == '\\' { self.bump().unwrap_or('\\') } else { c };
                    if self.peek() == Some('-') && !matches!(self.peek_at(1), Some(']') | None) {
                        self.pos += 1;
                        let mut hi = self.bump().unwrap_or(lo);
                        if hi == '\\' {
                            hi = self.bump().unwrap_or('\\');
                        }
                        if lo <= hi {
                            items.push(ClassItem::Range(lo, hi));
                        } else {
                            items.push(ClassItem::Range(hi, lo));
                        }
                    } else {
                        items.push(ClassItem::Char(lo));
                    }
                }
            }
            first = false;
        }
    }

    /// Recognize `:name:]` at the cursor (the `[` already consumed).
    fn posix_name(&mut self) -> Option<PosixClass> {
        if self.peek() != Some(':') {
            return None;
        }
        let rest: String = self.chars[self.pos + 1..].iter().collect();
        let end = rest.find(":]")?;
        let class = PosixClass::from_name(&rest[..end])?;
        self.pos += 1 + rest[..end].chars().count() + 2;
        Some(class)
    }
}

fn push_literal(nodes: &mut Vec<Node>, c: char) {
    if let Some(Node::Literal(text)) = nodes.last_mut() {
        text.push(c);
    } else {
        nodes.push(Node::Literal(c.to_string()));
    }
}

// ============================================================================
// Pass 2: render
// ============================================================================

fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, &mut out);
    }
    out
}

fn render_node(node: &Node, out: &mut String) {
    match node {
        Node::Literal(text) => out.push_str(&regex::escape(text)),
        Node::Star => out.push_str("[^/]*"),
        Node::GlobStar => out.push_str(".*"),
        Node::GlobStarSlash => out.push_str("(?:.+/)?"),
        Node::AnyChar => out.push_str("[^/]"),
        Node::Class { negated, items } => {
            out.push('[');
            if *negated {
                out.push_str("^/");
            }
            for item in items {
                match item {
                    ClassItem::Char(c) => push_class_char(out, *c),
                    ClassItem::Range(lo, hi) => {
                        push_class_char(out, *lo);
                        out.push('-');
                        push_class_char(out, *hi);
                    }
                    ClassItem::Posix(class) => out.push_str(class.members()),
                }
            }
            out.push(']');
        }
        Node::Group { kind, alternatives } => {
            out.push_str("(?:");
            for (i, alt) in alternatives.iter().enumerate() {
                if i > 0 {
                    out.push('|');
                }
                out.push_str(&render(alt));
            }
            out.push(')');
            out.push_str(kind.quantifier());
        }
    }
}

fn push_class_char(out: &mut String, c: char) {
    if matches!(c, '\\' | ']' | '[' | '^' | '-' | '&' | '~') {
        out.push('\\');
    }
    out.push(c);
}
