//! Path template compilation.
//!
//! A path template is a string of literal text and placeholders:
//!
//! ```ignore
//!  Syntax              Matches
//!  {name}              any non-empty run of characters except '/'
//!  {name:shortcut}     the character class bound to `shortcut`
//!  {name:regex}        a custom regular expression
//!  [...]               an optional trailing part (may nest)
//! ```
//!
//! Shortcuts are rewritten into regex fragments before the template is
//! parsed, so the forward compiler (dispatch) and the reverse generator (URL
//! building) always see exactly the same placeholder patterns.

use regex::Regex;

use crate::routing::error::CompilationError;

/// Regex used for placeholders that declare no pattern.
pub const DEFAULT_PLACEHOLDER_REGEX: &str = "[^/]+";

/// The built-in placeholder shortcuts, in expansion order.
pub const DEFAULT_SHORTCUTS: [(&str, &str); 5] = [
    ("number", "[0-9]+"),
    ("word", "[a-zA-Z]+"),
    ("alphanum_dash", "[a-zA-Z0-9_-]+"),
    ("slug", "[a-z0-9-]+"),
    ("uuid", "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"),
];

/// One piece of a parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, matched verbatim.
    Static(String),
    /// A named variable with the regex it must match.
    Placeholder { name: String, regex: String },
}

/// One alternative of a template: `/posts[/{id}]` has two variants,
/// `/posts` and `/posts/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub segments: Vec<Segment>,
}

impl Variant {
    /// Placeholder names in template order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder { name, .. } => Some(name.as_str()),
            Segment::Static(_) => None,
        })
    }

    /// Whether the variant has no placeholders at all.
    pub fn is_static(&self) -> bool {
        self.segments.iter().all(|segment| matches!(segment, Segment::Static(_)))
    }

    /// The literal text preceding the first placeholder.
    pub fn static_prefix(&self) -> String {
        self.segments
            .iter()
            .map_while(|segment| match segment {
                Segment::Static(text) => Some(text.as_str()),
                Segment::Placeholder { .. } => None,
            })
            .collect()
    }
}

/// A variant compiled into an anchored regular expression.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Anchored regex source; placeholder `i` is captured as group `p{i}`.
    pub pattern: String,
    /// Placeholder names, in template order.
    pub placeholders: Vec<String>,
    /// Literal text before the first placeholder.
    pub static_prefix: String,
    /// The full path when the variant contains no placeholders.
    pub static_path: Option<String>,
    pub regex: Regex,
}

impl CompiledPattern {
    /// Match `path` and return the captured variables in template order.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let captures = self.regex.captures(path)?;
        self.placeholders
            .iter()
            .enumerate()
            .map(|(i, name)| {
                captures
                    .name(&capture_group(i))
                    .map(|value| (name.clone(), value.as_str().to_string()))
            })
            .collect()
    }
}

fn capture_group(index: usize) -> String {
    format!("p{index}")
}

/// Expands placeholder shortcuts and compiles path templates.
///
/// The compiler holds nothing but its shortcut table, so compiling the same
/// template twice always yields byte-identical patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternCompiler {
    shortcuts: Vec<(String, String)>,
}

impl Default for PatternCompiler {
    fn default() -> Self {
        Self {
            shortcuts: DEFAULT_SHORTCUTS
                .iter()
                .map(|(name, fragment)| (name.to_string(), fragment.to_string()))
                .collect(),
        }
    }
}

impl PatternCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shortcut, or replace the fragment of an existing one with the same key.
    pub fn with_shortcut(mut self, name: impl Into<String>, fragment: impl Into<String>) -> Self {
        self.set_shortcut(name, fragment);
        self
    }

    pub fn set_shortcut(&mut self, name: impl Into<String>, fragment: impl Into<String>) {
        let name = name.into();
        let fragment = fragment.into();
        match self.shortcuts.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = fragment,
            None => self.shortcuts.push((name, fragment)),
        }
    }

    pub fn shortcuts(&self) -> &[(String, String)] {
        &self.shortcuts
    }

    /// The regex fragment bound to a shortcut.
    pub fn fragment(&self, shortcut: &str) -> Option<&str> {
        self.shortcuts
            .iter()
            .find(|(key, _)| key == shortcut)
            .map(|(_, fragment)| fragment.as_str())
    }

    /// Rewrite every `{name:shortcut}` into `{name:fragment}`.
    ///
    /// Anything that is not a well-formed placeholder naming a known shortcut
    /// is copied through untouched, so expanding an expanded template is a no-op.
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let Some(len) = placeholder_len(&rest[start..]) else {
                out.push_str(&rest[start..]);
                return out;
            };
            let block = &rest[start..start + len];
            let inner = &block[1..block.len() - 1];
            match inner.split_once(':') {
                Some((name, shortcut)) => match self.fragment(shortcut.trim()) {
                    Some(fragment) => {
                        out.push('{');
                        out.push_str(name.trim());
                        out.push(':');
                        out.push_str(fragment);
                        out.push('}');
                    }
                    None => out.push_str(block),
                },
                None => out.push_str(block),
            }
            rest = &rest[start + len..];
        }

        out.push_str(rest);
        out
    }

    /// Expand and parse a template into its variants, shortest first.
    pub fn parse(&self, template: &str) -> Result<Vec<Variant>, CompilationError> {
        self.check_shortcuts(template)?;
        let expanded = self.expand(template);

        let without_closing = expanded.trim_end_matches(']');
        let closing = expanded.len() - without_closing.len();
        let parts = split_optionals(template, without_closing)?;

        if closing != parts.len() - 1 {
            return Err(if contains_unenclosed(without_closing, ']') {
                CompilationError::OptionalNotAtEnd(template.to_string())
            } else {
                CompilationError::UnbalancedOptional(template.to_string())
            });
        }

        let mut current = String::new();
        let mut variants = Vec::with_capacity(parts.len());
        for (n, part) in parts.iter().enumerate() {
            if part.is_empty() && n != 0 {
                return Err(CompilationError::EmptyOptional(template.to_string()));
            }
            current.push_str(part);
            variants.push(parse_variant(template, &current)?);
        }

        Ok(variants)
    }

    /// Compile every variant of a template, shortest first.
    pub fn compile(&self, template: &str) -> Result<Vec<CompiledPattern>, CompilationError> {
        self.parse(template)?
            .iter()
            .map(|variant| compile_variant(template, variant))
            .collect()
    }

    /// An anchored validator for a placeholder regex, used when generating URLs.
    ///
    /// Accepts exactly the values the compiled pattern captures for that placeholder.
    pub fn validator(&self, template: &str, regex: &str) -> Result<Regex, CompilationError> {
        Regex::new(&format!("^(?:{regex})$")).map_err(|source| CompilationError::InvalidRegex {
            template: template.to_string(),
            source,
        })
    }

    /// Reject `{name:word}` where `word` names no shortcut. Runs on the
    /// unexpanded template, so a shortcut whose fragment is itself a bare word
    /// is not mistaken for a typo.
    fn check_shortcuts(&self, template: &str) -> Result<(), CompilationError> {
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            // Unbalanced braces are reported by the parser proper.
            let Some(len) = placeholder_len(&rest[start..]) else {
                return Ok(());
            };
            let inner = &rest[start + 1..start + len - 1];
            if let Some((_, shortcut)) = inner.split_once(':') {
                let shortcut = shortcut.trim();
                if is_identifier(shortcut, false) && self.fragment(shortcut).is_none() {
                    return Err(CompilationError::UnknownShortcut {
                        template: template.to_string(),
                        shortcut: shortcut.to_string(),
                    });
                }
            }
            rest = &rest[start + len..];
        }
        Ok(())
    }
}

/// Length in bytes of the balanced `{...}` block starting at `text[0]`.
fn placeholder_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn contains_unenclosed(text: &str, needle: char) -> bool {
    let mut depth = 0usize;
    text.chars().any(|c| {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        depth == 0 && c == needle
    })
}

/// Split on every `[` that is not inside a placeholder.
fn split_optionals<'a>(template: &str, text: &'a str) -> Result<Vec<&'a str>, CompilationError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CompilationError::UnbalancedBraces(template.to_string()))?;
            }
            '[' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(CompilationError::UnbalancedBraces(template.to_string()));
    }

    parts.push(&text[start..]);
    Ok(parts)
}

fn parse_variant(template: &str, text: &str) -> Result<Variant, CompilationError> {
    let mut segments = Vec::new();
    let mut names: Vec<String> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(['{', '}', ']']) {
        if !rest[start..].starts_with('{') {
            return Err(if rest[start..].starts_with(']') {
                CompilationError::OptionalNotAtEnd(template.to_string())
            } else {
                CompilationError::UnbalancedBraces(template.to_string())
            });
        }
        if start > 0 {
            segments.push(Segment::Static(rest[..start].to_string()));
        }

        let len = placeholder_len(&rest[start..])
            .ok_or_else(|| CompilationError::UnbalancedBraces(template.to_string()))?;
        let inner = &rest[start + 1..start + len - 1];
        let (name, regex) = match inner.split_once(':') {
            Some((name, regex)) => (name.trim(), regex.trim()),
            None => (inner.trim(), DEFAULT_PLACEHOLDER_REGEX),
        };

        if !is_identifier(name, true) {
            return Err(CompilationError::InvalidPlaceholderName {
                template: template.to_string(),
                name: name.to_string(),
            });
        }
        if names.iter().any(|existing| existing == name) {
            return Err(CompilationError::DuplicatePlaceholder {
                template: template.to_string(),
                name: name.to_string(),
            });
        }

        names.push(name.to_string());
        segments.push(Segment::Placeholder {
            name: name.to_string(),
            regex: regex.to_string(),
        });
        rest = &rest[start + len..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Static(rest.to_string()));
    }

    Ok(Variant { segments })
}

fn is_identifier(text: &str, allow_dash: bool) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_dash && c == '-'))
}

fn compile_variant(template: &str, variant: &Variant) -> Result<CompiledPattern, CompilationError> {
    let mut pattern = String::from("^");
    let mut placeholders = Vec::new();

    for segment in &variant.segments {
        match segment {
            Segment::Static(text) => pattern.push_str(&regex::escape(text)),
            Segment::Placeholder { name, regex: fragment } => {
                pattern.push_str(&format!("(?P<{}>{fragment})", capture_group(placeholders.len())));
                placeholders.push(name.clone());
            }
        }
    }
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|source| CompilationError::InvalidRegex {
        template: template.to_string(),
        source,
    })?;

    let static_path = variant.is_static().then(|| variant.static_prefix());

    Ok(CompiledPattern {
        static_prefix: variant.static_prefix(),
        pattern,
        placeholders,
        static_path,
        regex,
    })
}
