//! Code Isolation
//!
//! Rewrites a candidate snippet so that its entry point is bound under a
//! unique name and cannot collide with other candidates:
//!
//! - the definition (`function name(`, `async function`, generators,
//!   `const|let|var name =`) is renamed, and an `export` prefix dropped
//! - every other reference to the old name is renamed too, skipping string
//!   and template text, comments, regex literals, property accesses and
//!   object-literal or method keys; a shorthand property `{ name }` keeps
//!   its key and becomes `{ name: New }`
//! - a snippet with no recognizable definition is bound as an expression
//! - a named entry point that is missing while other definitions exist
//!   becomes a stub, so a helper is never benchmarked in its place
//! - anything that cannot be rewritten becomes a stub that throws, so the
//!   candidate still runs and fails through the normal error path

use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Reasons a snippet cannot be rewritten
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IsolationError {
    /// Nothing but whitespace
    #[error("source is empty")]
    EmptySource,

    /// Entry point or binding name is not a legal identifier
    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),

    /// String, template or comment runs to the end of the source
    #[error("unterminated {kind} starting at byte {offset}")]
    Unterminated {
        /// What was left open
        kind: &'static str,
        /// Byte offset of the opening delimiter
        offset: usize,
    },

    /// The named entry point is not defined, though other functions are
    #[error("entry point '{name}' is not defined (found '{found}')")]
    EntryPointNotFound {
        /// Name the module asked for
        name: String,
        /// First definition the snippet does contain
        found: String,
    },
}

/// How the entry point was bound under its new name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsolationStrategy {
    /// `function name(...)` renamed in place
    FunctionDeclaration,
    /// `const|let|var name = ...` renamed in place
    VariableBinding,
    /// Whole snippet wrapped as `const name = (...)`
    Expression,
    /// Snippet replaced by a throwing stand-in
    Stub(String),
}

impl IsolationStrategy {
    /// Whether the snippet was replaced by a stand-in
    pub fn is_stub(&self) -> bool {
        matches!(self, IsolationStrategy::Stub(_))
    }
}

impl fmt::Display for IsolationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationStrategy::FunctionDeclaration => write!(f, "function declaration"),
            IsolationStrategy::VariableBinding => write!(f, "variable binding"),
            IsolationStrategy::Expression => write!(f, "expression"),
            IsolationStrategy::Stub(reason) => write!(f, "stub ({reason})"),
        }
    }
}

/// A rewritten snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isolation {
    /// Source to evaluate in the sandbox
    pub code: String,
    /// How the entry point ended up bound
    pub strategy: IsolationStrategy,
}

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

// Keywords after which a `/` starts a regex literal rather than a division.
const REGEX_PRECEDING_WORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

/// Whether `name` can be used as a JavaScript binding name.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_ident_start(first) => {}
        _ => return false,
    }
    chars.all(is_ident_char) && !RESERVED_WORDS.contains(&name)
}

/// Rewrite `source` so its entry point is bound as `new_name`.
///
/// `original` names the entry point; when `None` the first definition in the
/// snippet is used. Never fails: an unrewritable snippet yields a stub that
/// throws when called.
pub fn isolate(source: &str, original: Option<&str>, new_name: &str) -> Isolation {
    match try_isolate(source, original, new_name) {
        Ok(isolation) => isolation,
        Err(err) => {
            tracing::warn!(candidate = new_name, error = %err, "isolation failed, using stub");
            let reason = err.to_string();
            Isolation {
                code: stub_source(new_name, &format!("candidate could not be isolated: {reason}")),
                strategy: IsolationStrategy::Stub(reason),
            }
        }
    }
}

/// Rewrite `source`, reporting why it cannot be rewritten.
pub fn try_isolate(
    source: &str,
    original: Option<&str>,
    new_name: &str,
) -> Result<Isolation, IsolationError> {
    if !is_valid_identifier(new_name) {
        return Err(IsolationError::InvalidIdentifier(new_name.to_string()));
    }
    if let Some(name) = original {
        if !is_valid_identifier(name) {
            return Err(IsolationError::InvalidIdentifier(name.to_string()));
        }
    }
    if source.trim().is_empty() {
        return Err(IsolationError::EmptySource);
    }

    let masked = mask_source(source)?;

    let definition = match original {
        Some(name) => match find_definition(&masked, Some(name)) {
            Some(definition) => Some(definition),
            None => match find_definition(&masked, None) {
                Some(other) => {
                    return Err(IsolationError::EntryPointNotFound {
                        name: name.to_string(),
                        found: other.name,
                    });
                }
                None => None,
            },
        },
        None => find_definition(&masked, None),
    };

    let Some(definition) = definition else {
        tracing::warn!(candidate = new_name, "no definition found, binding snippet as expression");
        let body = source.trim().trim_end_matches(';').trim_end();
        return Ok(Isolation {
            code: format!("const {new_name} = (\n{body}\n);\n"),
            strategy: IsolationStrategy::Expression,
        });
    };

    let mut edits: Vec<(usize, usize, String)> = Vec::new();
    if let Some((start, end)) = definition.export_prefix {
        edits.push((start, end, String::new()));
    }
    for reference in reference_spans(&masked, &definition.name) {
        let replacement = if reference.shorthand {
            format!("{}: {new_name}", definition.name)
        } else {
            new_name.to_string()
        };
        edits.push((reference.start, reference.end, replacement));
    }
    edits.sort_by_key(|&(start, _, _)| start);

    let mut code = String::with_capacity(source.len() + edits.len() * new_name.len());
    let mut cursor = 0;
    for (start, end, replacement) in edits {
        code.push_str(&source[cursor..start]);
        code.push_str(&replacement);
        cursor = end;
    }
    code.push_str(&source[cursor..]);

    Ok(Isolation {
        code,
        strategy: definition.strategy,
    })
}

/// Source for a binding that throws `message` when called.
pub fn stub_source(name: &str, message: &str) -> String {
    let literal = serde_json::to_string(message).unwrap_or_else(|_| "\"isolation failed\"".into());
    format!("const {name} = function () {{ throw new Error({literal}); }};\n")
}

struct Definition {
    name: String,
    strategy: IsolationStrategy,
    export_prefix: Option<(usize, usize)>,
}

fn find_definition(masked: &str, name: Option<&str>) -> Option<Definition> {
    let name_pattern = match name {
        Some(name) => regex::escape(name),
        None => r"[\p{L}_$][\p{L}\p{N}_$]*".to_string(),
    };
    let function_re = Regex::new(&format!(
        r"(?:^|[^\p{{L}}\p{{N}}_$.])((?:export\s+(?:default\s+)?)?)(?:async\s+)?function\s*\*?\s*({name_pattern})\s*\("
    ))
    .ok()?;
    let binding_re = Regex::new(&format!(
        r"(?:^|[^\p{{L}}\p{{N}}_$.])((?:export\s+)?)(?:const|let|var)\s+({name_pattern})\s*=(?:[^=]|$)"
    ))
    .ok()?;

    let candidates = [
        (function_re.captures(masked), IsolationStrategy::FunctionDeclaration),
        (binding_re.captures(masked), IsolationStrategy::VariableBinding),
    ];

    candidates
        .into_iter()
        .filter_map(|(caps, strategy)| {
            let caps = caps?;
            let ident = caps.get(2)?;
            let export_prefix = caps
                .get(1)
                .filter(|m| !m.as_str().is_empty())
                .map(|m| (m.start(), m.end()));
            Some((
                ident.start(),
                Definition {
                    name: ident.as_str().to_string(),
                    strategy,
                    export_prefix,
                },
            ))
        })
        .min_by_key(|(start, _)| *start)
        .map(|(_, definition)| definition)
}

struct Reference {
    start: usize,
    end: usize,
    /// `{ name }` shorthand, which must keep its property key
    shorthand: bool,
}

/// Every code-context occurrence of `name`.
fn reference_spans(masked: &str, name: &str) -> Vec<Reference> {
    let mut spans = Vec::new();
    let mut chars = masked.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if !is_ident_char(c) {
            continue;
        }
        let mut end = start + c.len_utf8();
        while let Some(&(idx, next)) = chars.peek() {
            if !is_ident_char(next) {
                break;
            }
            end = idx + next.len_utf8();
            chars.next();
        }

        if c.is_ascii_digit() || &masked[start..end] != name {
            continue;
        }
        if is_property_access(masked, start)
            || is_object_key(masked, start, end)
            || is_method_name(masked, start, end)
        {
            continue;
        }
        spans.push(Reference {
            start,
            end,
            shorthand: is_shorthand_property(masked, start, end),
        });
    }
    spans
}

fn prev_significant(masked: &str, before: usize) -> Option<(usize, char)> {
    masked[..before]
        .char_indices()
        .rev()
        .find(|(_, c)| !c.is_whitespace())
}

fn next_significant(masked: &str, after: usize) -> Option<char> {
    masked[after..].chars().find(|c| !c.is_whitespace())
}

fn is_property_access(masked: &str, start: usize) -> bool {
    match prev_significant(masked, start) {
        // `...name` is a spread, not a member access
        Some((idx, '.')) => !masked[..=idx].ends_with("..."),
        _ => false,
    }
}

fn is_object_key(masked: &str, start: usize, end: usize) -> bool {
    if next_significant(masked, end) != Some(':') {
        return false;
    }
    matches!(prev_significant(masked, start), Some((_, '{' | ',')))
}

/// Identifier ending just after the char at `last`.
fn word_ending_at(masked: &str, last: usize) -> &str {
    let end = last + masked[last..].chars().next().map_or(0, char::len_utf8);
    let start = masked[..end]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map_or(end, |(idx, _)| idx);
    &masked[start..end]
}

/// Innermost unclosed bracket before `before`.
fn enclosing_opener(masked: &str, before: usize) -> Option<(usize, char)> {
    let mut depth = 0usize;
    for (idx, c) in masked[..before].char_indices().rev() {
        match c {
            ')' | ']' | '}' => depth += 1,
            '(' | '[' | '{' if depth == 0 => return Some((idx, c)),
            '(' | '[' | '{' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn matching_paren(masked: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in masked[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth <= 1 => return Some(open + idx),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

// Keywords after which a `{` opens an object literal or pattern.
const OBJECT_PRECEDING_WORDS: &[&str] = &[
    "return", "yield", "await", "const", "let", "var", "case", "in", "of", "typeof", "void",
    "delete", "throw",
];

/// Whether the `{` at `brace` opens an object literal or destructuring
/// pattern rather than a block.
fn is_object_brace(masked: &str, brace: usize) -> bool {
    match prev_significant(masked, brace) {
        // `=> {` is a function body
        Some((idx, '>')) => !masked[..idx].ends_with('='),
        Some((
            _,
            '(' | ',' | '=' | ':' | '[' | '?' | '!' | '&' | '|' | '+' | '-' | '*' | '%' | '<' | '~'
            | '^',
        )) => true,
        Some((idx, c)) if is_ident_char(c) => {
            OBJECT_PRECEDING_WORDS.contains(&word_ending_at(masked, idx))
        }
        _ => false,
    }
}

fn is_shorthand_property(masked: &str, start: usize, end: usize) -> bool {
    if !matches!(prev_significant(masked, start), Some((_, '{' | ','))) {
        return false;
    }
    if !matches!(next_significant(masked, end), Some(',' | '}')) {
        return false;
    }
    matches!(enclosing_opener(masked, start), Some((idx, '{')) if is_object_brace(masked, idx))
}

/// `name() {` in an object literal or class body, including `get`, `set`,
/// `async`, `static` and generator forms.
fn is_method_name(masked: &str, start: usize, end: usize) -> bool {
    if next_significant(masked, end) != Some('(') {
        return false;
    }
    let after_member_start = match prev_significant(masked, start) {
        Some((_, '{' | ',' | '}' | ';' | '*')) => true,
        Some((idx, c)) if is_ident_char(c) => {
            matches!(word_ending_at(masked, idx), "get" | "set" | "async" | "static")
        }
        _ => false,
    };
    if !after_member_start {
        return false;
    }
    let Some(open) = masked[end..].find('(').map(|offset| end + offset) else {
        return false;
    };
    matching_paren(masked, open).is_some_and(|close| next_significant(masked, close + 1) == Some('{'))
}

/// Copy of `source` with the contents of strings, template text, comments
/// and regex literals blanked out. Byte offsets are preserved.
fn mask_source(source: &str) -> Result<String, IsolationError> {
    let mut scanner = Scanner {
        src: source.as_bytes(),
        pos: 0,
        out: Vec::with_capacity(source.len()),
    };
    scanner.code(None)?;
    // Only whole ASCII delimiters are kept, every other masked byte is a space
    Ok(String::from_utf8_lossy(&scanner.out).into_owned())
}

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    out: Vec<u8>,
}

impl Scanner<'_> {
    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn copy(&mut self) {
        self.out.push(self.src[self.pos]);
        self.pos += 1;
    }

    fn blank(&mut self) {
        let b = self.src[self.pos];
        self.out.push(if b == b'\n' { b'\n' } else { b' ' });
        self.pos += 1;
    }

    /// Scan code. Inside a template substitution (`template_start` set) this
    /// returns at the closing `}` without consuming it.
    fn code(&mut self, template_start: Option<usize>) -> Result<(), IsolationError> {
        let mut depth = 0usize;

        while let Some(b) = self.peek(0) {
            match b {
                b'"' | b'\'' => self.string(b)?,
                b'`' => self.template()?,
                b'/' if self.peek(1) == Some(b'/') => {
                    while self.peek(0).is_some_and(|b| b != b'\n') {
                        self.blank();
                    }
                }
                b'/' if self.peek(1) == Some(b'*') => self.block_comment()?,
                b'/' if self.regex_allowed() => {
                    if !self.regex() {
                        self.copy();
                    }
                }
                b'{' => {
                    depth += 1;
                    self.copy();
                }
                b'}' => {
                    if template_start.is_some() && depth == 0 {
                        return Ok(());
                    }
                    depth = depth.saturating_sub(1);
                    self.copy();
                }
                _ => self.copy(),
            }
        }

        match template_start {
            Some(offset) => Err(IsolationError::Unterminated {
                kind: "template literal",
                offset,
            }),
            None => Ok(()),
        }
    }

    fn string(&mut self, quote: u8) -> Result<(), IsolationError> {
        let offset = self.pos;
        self.copy();
        loop {
            match self.peek(0) {
                None | Some(b'\n') => {
                    return Err(IsolationError::Unterminated {
                        kind: "string literal",
                        offset,
                    });
                }
                Some(b'\\') => {
                    self.blank();
                    if self.peek(0).is_some() {
                        self.blank();
                    }
                }
                Some(b) if b == quote => {
                    self.copy();
                    return Ok(());
                }
                Some(_) => self.blank(),
            }
        }
    }

    fn template(&mut self) -> Result<(), IsolationError> {
        let offset = self.pos;
        self.copy();
        loop {
            match self.peek(0) {
                None => {
                    return Err(IsolationError::Unterminated {
                        kind: "template literal",
                        offset,
                    });
                }
                Some(b'\\') => {
                    self.blank();
                    if self.peek(0).is_some() {
                        self.blank();
                    }
                }
                Some(b'`') => {
                    self.copy();
                    return Ok(());
                }
                Some(b'$') if self.peek(1) == Some(b'{') => {
                    self.copy();
                    self.copy();
                    self.code(Some(offset))?;
                    // code() stops on the closing brace
                    self.copy();
                }
                Some(_) => self.blank(),
            }
        }
    }

    fn block_comment(&mut self) -> Result<(), IsolationError> {
        let offset = self.pos;
        self.blank();
        self.blank();
        loop {
            match self.peek(0) {
                None => {
                    return Err(IsolationError::Unterminated {
                        kind: "block comment",
                        offset,
                    });
                }
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.blank();
                    self.blank();
                    return Ok(());
                }
                Some(_) => self.blank(),
            }
        }
    }

    fn regex_allowed(&self) -> bool {
        let Some(idx) = self.out.iter().rposition(|b| !b.is_ascii_whitespace()) else {
            return true;
        };
        let last = self.out[idx];
        if b"(,=:[!&|?{};+-*%<>~^".contains(&last) {
            return true;
        }
        if last.is_ascii_alphanumeric() || last == b'_' || last == b'$' {
            let word_start = self.out[..=idx]
                .iter()
                .rposition(|b| !(b.is_ascii_alphanumeric() || *b == b'_' || *b == b'$'))
                .map_or(0, |p| p + 1);
            let word = &self.out[word_start..=idx];
            return REGEX_PRECEDING_WORDS.iter().any(|w| w.as_bytes() == word);
        }
        false
    }

    /// Blank a regex literal. Returns false (consuming nothing) when the
    /// slash does not open a literal that closes on the same line.
    fn regex(&mut self) -> bool {
        let mut end = self.pos + 1;
        let mut in_class = false;
        loop {
            match self.src.get(end) {
                None | Some(b'\n') => return false,
                Some(b'\\') => end += 2,
                Some(b'[') => {
                    in_class = true;
                    end += 1;
                }
                Some(b']') => {
                    in_class = false;
                    end += 1;
                }
                Some(b'/') if !in_class => break,
                Some(_) => end += 1,
            }
        }

        self.copy();
        while self.pos < end {
            self.blank();
        }
        self.copy();
        while self
            .peek(0)
            .is_some_and(|b| b.is_ascii_alphabetic())
        {
            self.blank();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recursive_function_renamed() {
        let out = isolate("function f(n){return n<=1?1:n*f(n-1);}", Some("f"), "Alt1");
        assert_eq!(out.strategy, IsolationStrategy::FunctionDeclaration);
        assert_eq!(out.code, "function Alt1(n){return n<=1?1:n*Alt1(n-1);}");
        assert!(!out.code.contains("f("));
    }

    #[test]
    fn test_variable_bound_closure() {
        let src = "const sum = (xs) => xs.length ? xs[0] + sum(xs.slice(1)) : 0;";
        let out = isolate(src, Some("sum"), "Original");
        assert_eq!(out.strategy, IsolationStrategy::VariableBinding);
        assert_eq!(
            out.code,
            "const Original = (xs) => xs.length ? xs[0] + Original(xs.slice(1)) : 0;"
        );
    }

    #[test]
    fn test_skips_strings_comments_and_properties() {
        let src = r#"function f(o) {
  // f is recursive
  const label = "f(" + 'f' + `f ${f.name}`;
  const obj = { f: 1, g: o.f, h: o?.f };
  return /f/.test(label) ? f(obj) : f;
}"#;
        let out = isolate(src, Some("f"), "Alt");
        assert_eq!(
            out.code,
            r#"function Alt(o) {
  // f is recursive
  const label = "f(" + 'f' + `f ${Alt.name}`;
  const obj = { f: 1, g: o.f, h: o?.f };
  return /f/.test(label) ? Alt(obj) : Alt;
}"#
        );
    }

    #[test]
    fn test_longer_identifiers_untouched() {
        let out = isolate(
            "function fib(n) { const fibs = [0, 1]; return fibonacci(fibs, n) + fib(n - 1); }",
            Some("fib"),
            "Alt2",
        );
        assert_eq!(
            out.code,
            "function Alt2(n) { const fibs = [0, 1]; return fibonacci(fibs, n) + Alt2(n - 1); }"
        );
    }

    #[test]
    fn test_spread_is_renamed() {
        let out = isolate("const xs = [1]; const f = () => [...xs];", Some("xs"), "Alt");
        assert_eq!(out.code, "const Alt = [1]; const f = () => [...Alt];");
    }

    #[test]
    fn test_export_and_async_prefixes() {
        let out = isolate("export async function load(x) { return x; }", Some("load"), "Alt");
        assert_eq!(out.strategy, IsolationStrategy::FunctionDeclaration);
        assert_eq!(out.code, "async function Alt(x) { return x; }");

        let out = isolate("function* gen() { yield 1; }", Some("gen"), "Alt");
        assert_eq!(out.code, "function* Alt() { yield 1; }");
    }

    #[test]
    fn test_infers_first_definition() {
        let src = "function helper(x) { return x * 2; }\nfunction main(x) { return helper(x); }";
        let out = isolate(src, None, "Alt");
        assert_eq!(
            out.code,
            "function Alt(x) { return x * 2; }\nfunction main(x) { return Alt(x); }"
        );
    }

    #[test]
    fn test_definition_inside_string_ignored() {
        let src = "const note = 'function f() {}';\nfunction g() { return note; }";
        let out = isolate(src, Some("f"), "Alt");
        // f only appears inside a string, and g must not stand in for it
        assert!(out.strategy.is_stub());
        assert!(!out.code.contains("function g"));
        assert_eq!(
            try_isolate(src, Some("f"), "Alt"),
            Err(IsolationError::EntryPointNotFound {
                name: "f".to_string(),
                found: "note".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_entry_point_never_binds_helper() {
        let src = "function swap(a, i, j) { const t = a[i]; a[i] = a[j]; a[j] = t; }\n\
                   function sortFast(xs) { const a = xs.slice(); swap(a, 0, 1); return a; }";
        let out = isolate(src, Some("sortNums"), "Alt1");
        assert!(out.strategy.is_stub());
        assert!(!out.code.contains("function Alt1"));
        assert!(out.code.contains("entry point 'sortNums' is not defined (found 'swap')"));

        // Without a name the first definition is still inferred
        let out = isolate(src, None, "Alt1");
        assert_eq!(out.strategy, IsolationStrategy::FunctionDeclaration);
        assert!(out.code.starts_with("function Alt1(a, i, j)"));
    }

    #[test]
    fn test_shorthand_property_keeps_key() {
        let src = "function f(x) { return { f, g: 1, h: [f] }; }";
        let out = isolate(src, Some("f"), "Alt");
        assert_eq!(out.code, "function Alt(x) { return { f: Alt, g: 1, h: [Alt] }; }");

        let src = "const f = (x) => x;\nconst table = { id: 1, f };";
        let out = isolate(src, Some("f"), "Alt");
        assert_eq!(out.code, "const Alt = (x) => x;\nconst table = { id: 1, f: Alt };");
    }

    #[test]
    fn test_block_statement_is_not_shorthand() {
        let out = isolate("function f(n) { if (n) { f } return n; }", Some("f"), "Alt");
        assert_eq!(out.code, "function Alt(n) { if (n) { Alt } return n; }");
    }

    #[test]
    fn test_method_shorthand_untouched() {
        let src = "function f(x) {\n  const api = { f() { return 1; }, async g() {} };\n  return api.f() + f(x - 1);\n}";
        let out = isolate(src, Some("f"), "Alt");
        assert_eq!(
            out.code,
            "function Alt(x) {\n  const api = { f() { return 1; }, async g() {} };\n  return api.f() + Alt(x - 1);\n}"
        );

        let src = "const f = (n) => n;\nclass Box { static f(v) { return f(v); } get f() { return f; } }";
        let out = isolate(src, Some("f"), "Alt");
        assert_eq!(
            out.code,
            "const Alt = (n) => n;\nclass Box { static f(v) { return Alt(v); } get f() { return Alt; } }"
        );
    }

    #[test]
    fn test_expression_fallback() {
        let out = isolate("(a, b) => a + b;", Some("add"), "Alt");
        assert_eq!(out.strategy, IsolationStrategy::Expression);
        assert_eq!(out.code, "const Alt = (\n(a, b) => a + b\n);\n");
    }

    #[test]
    fn test_stub_on_unterminated_input() {
        let out = isolate("function f() { return 'oops; }", Some("f"), "Alt");
        assert!(out.strategy.is_stub());
        assert!(out.code.starts_with("const Alt = function () { throw new Error("));

        let out = isolate("function f() { /* never closed }", Some("f"), "Alt");
        assert!(out.strategy.is_stub());

        let out = isolate("const f = () => `${1 + ", Some("f"), "Alt");
        assert!(out.strategy.is_stub());
    }

    #[test]
    fn test_stub_on_empty_or_invalid() {
        assert!(isolate("   ", Some("f"), "Alt").strategy.is_stub());
        assert_eq!(
            try_isolate("function f() {}", Some("f"), "1bad"),
            Err(IsolationError::InvalidIdentifier("1bad".to_string()))
        );
        assert!(try_isolate("function f() {}", Some("class"), "Alt").is_err());
    }

    #[test]
    fn test_division_is_not_regex() {
        let src = "function half(x) { return x / 2 / half.factor; }";
        let out = isolate(src, Some("half"), "Alt");
        assert_eq!(out.code, "function Alt(x) { return x / 2 / Alt.factor; }");
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("Original"));
        assert!(is_valid_identifier("_x1"));
        assert!(is_valid_identifier("$el"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("9lives"));
        assert!(!is_valid_identifier("return"));
        assert!(!is_valid_identifier("a-b"));
    }
}
