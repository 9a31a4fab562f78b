//! Type-name synonyms and default-text normalization.

use std::collections::HashMap;

use super::metadata::ColumnMetadata;

/// Synonym table mapping vendor spellings to one canonical type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEquivalence {
    synonyms: HashMap<String, String>,
}

impl TypeEquivalence {
    /// Synonyms shared by every vendor.
    #[must_use]
    pub fn standard() -> Self {
        [
            ("INT", "INTEGER"),
            ("INT4", "INTEGER"),
            ("INT8", "BIGINT"),
            ("INT2", "SMALLINT"),
            ("BOOL", "BOOLEAN"),
            ("CHARACTER VARYING", "VARCHAR"),
            ("CHARACTER", "CHAR"),
            ("DOUBLE PRECISION", "DOUBLE"),
            ("FLOAT8", "DOUBLE"),
            ("FLOAT4", "REAL"),
            ("NUMERIC", "DECIMAL"),
            ("TIMESTAMP WITHOUT TIME ZONE", "TIMESTAMP"),
            ("TIMESTAMP WITH TIME ZONE", "TIMESTAMPTZ"),
            ("TIME WITHOUT TIME ZONE", "TIME"),
        ]
        .into_iter()
        .fold(
            Self {
                synonyms: HashMap::new(),
            },
            |eq, (from, to)| eq.with(from, to),
        )
    }

    /// Treats `from` as a spelling of `to`.
    #[must_use]
    pub fn with(mut self, from: &str, to: &str) -> Self {
        self.synonyms.insert(canonical_words(from), canonical_words(to));
        self
    }

    /// Canonical spelling of a bare type name.
    #[must_use]
    pub fn canonical(&self, name: &str) -> String {
        let mut current = canonical_words(name);
        // Bounded so that a synonym loop cannot hang.
        for _ in 0..8 {
            match self.synonyms.get(&current) {
                Some(next) if *next != current => current.clone_from(next),
                _ => break,
            }
        }
        current
    }

    /// Whether a declared type and a live column describe the same type.
    ///
    /// Names are compared after synonym resolution. Length and precision are
    /// compared only where both sides report them.
    #[must_use]
    pub fn equivalent(&self, declared: &str, live: &ColumnMetadata) -> bool {
        let (declared_name, declared_args) = split_type(declared);
        let (live_name, mut live_args) = split_type(&live.sql_type);
        if self.canonical(&declared_name) != self.canonical(&live_name) {
            return false;
        }
        if live_args.is_empty() {
            live_args.extend(live.size.map(|s| s.to_string()));
            live_args.extend(live.scale.map(|s| s.to_string()));
        }
        declared_args
            .iter()
            .zip(&live_args)
            .all(|(d, l)| match (d.parse::<u64>(), l.parse::<u64>()) {
                (Ok(d), Ok(l)) => d == l,
                (Ok(_), Err(_)) | (Err(_), Ok(_)) => true,
                (Err(_), Err(_)) => d.eq_ignore_ascii_case(l),
            })
    }
}

impl Default for TypeEquivalence {
    fn default() -> Self {
        Self::standard()
    }
}

fn canonical_words(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits `DECIMAL(10, 2) UNSIGNED` into `("DECIMAL UNSIGNED", ["10", "2"])`.
fn split_type(ty: &str) -> (String, Vec<String>) {
    let mut name = String::with_capacity(ty.len());
    let mut args = Vec::new();
    let mut rest = ty;
    while let Some(open) = rest.find('(') {
        name.push_str(&rest[..open]);
        name.push(' ');
        let Some(close) = rest[open..].find(')') else {
            rest = "";
            break;
        };
        if args.is_empty() {
            args = rest[open + 1..open + close]
                .split(',')
                .map(|a| String::from(a.trim()))
                .filter(|a| !a.is_empty())
                .collect();
        }
        rest = &rest[open + close + 1..];
    }
    name.push_str(rest);
    (canonical_words(&name), args)
}

/// Canonical text of a default expression; `None` means no default.
///
/// Outer parentheses and trailing `::type` casts are removed, and text outside
/// string literals is upper-cased with whitespace collapsed. Quoted content is
/// kept byte for byte, so `' '` and `''` stay distinct. Whitespace-only and
/// empty input are returned unchanged.
#[must_use]
pub fn normalize_default(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return Some(String::from(raw));
    }
    let mut text = raw.trim();
    while text.starts_with('(') && text.ends_with(')') && wraps_whole(text) {
        text = text[1..text.len() - 1].trim();
    }
    let text = strip_cast(text);
    if text.eq_ignore_ascii_case("NULL") {
        return None;
    }
    Some(canonical_expression(text))
}

/// Whether two normalized defaults denote the same default.
///
/// A quoted literal on the declared side also matches its unquoted content,
/// which is how some catalogs report string defaults.
#[must_use]
pub fn defaults_match(declared: Option<&str>, live: Option<&str>) -> bool {
    match (declared, live) {
        (None, None) => true,
        (Some(d), Some(l)) if d == l => true,
        (Some(d), Some(l)) => unquote(d).is_some_and(|content| content == l),
        _ => false,
    }
}

fn unquote(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("''", "'"))
}

/// Whether the first `(` closes at the last character.
fn wraps_whole(text: &str) -> bool {
    let mut depth = 0usize;
    let mut quoted = false;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i + 1 < text.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Cuts a top-level `::type` cast.
fn strip_cast(text: &str) -> &str {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quoted = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => quoted = !quoted,
            b'(' if !quoted => depth += 1,
            b')' if !quoted => depth = depth.saturating_sub(1),
            b':' if !quoted && depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                return text[..i].trim_end();
            }
            _ => {}
        }
    }
    text
}

/// Upper-cases and collapses whitespace outside string literals.
pub(crate) fn canonical_expression(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quoted = false;
    let mut pending_space = false;
    for c in text.chars() {
        if quoted {
            out.push(c);
            if c == '\'' {
                quoted = false;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if c == '\'' {
            quoted = true;
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonyms_resolve() {
        let eq = TypeEquivalence::standard().with("SERIAL", "INT");
        assert_eq!(eq.canonical("serial"), "INTEGER");
        assert_eq!(eq.canonical("character  varying"), "VARCHAR");
        assert_eq!(eq.canonical("TEXT"), "TEXT");
    }

    #[test]
    fn test_size_and_precision() {
        let eq = TypeEquivalence::standard();
        let live = ColumnMetadata::new("name", "character varying").size(50);
        assert!(eq.equivalent("VARCHAR(50)", &live));
        assert!(!eq.equivalent("VARCHAR(80)", &live));
        let live = ColumnMetadata::new("price", "numeric").precision(10, 2);
        assert!(eq.equivalent("DECIMAL(10, 2)", &live));
        assert!(!eq.equivalent("DECIMAL(10, 3)", &live));
        let live = ColumnMetadata::new("id", "int(11) unsigned");
        assert!(eq.equivalent("INT UNSIGNED", &live));
        assert!(!eq.equivalent("BIGINT UNSIGNED", &live));
    }

    #[test]
    fn test_normalize_default() {
        assert_eq!(normalize_default("NULL"), None);
        assert_eq!(normalize_default("(0)").as_deref(), Some("0"));
        assert_eq!(
            normalize_default("'abc'::character varying").as_deref(),
            Some("'abc'")
        );
        assert_eq!(normalize_default("now()").as_deref(), Some("NOW()"));
        assert_eq!(
            normalize_default("nextval('s'::regclass)").as_deref(),
            Some("NEXTVAL('s'::REGCLASS)")
        );
        assert_eq!(normalize_default("(a) + (b)").as_deref(), Some("(A) + (B)"));
    }

    #[test]
    fn test_whitespace_defaults_stay_distinct() {
        assert_ne!(normalize_default("' '"), normalize_default("''"));
        assert_eq!(normalize_default(" ").as_deref(), Some(" "));
        assert_eq!(normalize_default("").as_deref(), Some(""));
        assert!(!defaults_match(Some("' '"), Some("")));
        assert!(defaults_match(Some("'it''s'"), Some("it's")));
    }
}
