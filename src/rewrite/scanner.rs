//! Small hand-written scanner for the constructs the rewrite stages touch:
//! JSX tags and their attributes, import statements, and balanced
//! delimiters in script code.
//!
//! Every function here is linear in the scanned span. Delimiters are ASCII so
//! byte offsets always land on `char` boundaries.

use std::ops::Range;

/// Longest span searched for the `from` clause of one import statement.
const MAX_IMPORT_SPAN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, or the whole `{...spread}` expression.
    pub name: Range<usize>,
    /// Value including its quotes or braces.
    pub value: Option<Range<usize>>,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Offset of `<`.
    pub start: usize,
    /// Offset one past `>`.
    pub end: usize,
    pub name: Range<usize>,
    pub attrs: Vec<Attribute>,
    /// Offset of the `/>` or `>` terminator.
    pub terminator: usize,
    pub self_closing: bool,
}

impl Tag {
    pub fn attr(&self, text: &str, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| &text[a.name.clone()] == name)
    }

    /// Offset right after the last attribute (or the tag name), before any
    /// whitespace that precedes the terminator.
    pub fn attrs_end(&self) -> usize {
        self.attrs
            .last()
            .map(|a| a.span.end)
            .unwrap_or(self.name.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// From `import` through the optional trailing `;`.
    pub span: Range<usize>,
    /// Text between `import` and `from`, trimmed. Empty for side-effect imports.
    pub clause: Range<usize>,
    pub module: String,
}

pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// All opening (or self-closing) tags named exactly `name`.
pub fn find_tags(text: &str, name: &str) -> Vec<Tag> {
    let bytes = text.as_bytes();
    let needle = format!("<{name}");
    let mut tags = Vec::new();
    let mut from = 0;

    while let Some(rel) = text[from..].find(&needle) {
        let start = from + rel;
        let after = start + needle.len();
        let boundary = bytes
            .get(after)
            .map(|b| b.is_ascii_whitespace() || *b == b'/' || *b == b'>')
            .unwrap_or(false);
        if boundary {
            if let Some(tag) = parse_tag(text, start, start + 1..after) {
                from = tag.end;
                tags.push(tag);
                continue;
            }
        }
        from = after;
    }
    tags
}

/// Spans of every `</name>` closing tag.
pub fn find_closing_tags(text: &str, name: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let needle = format!("</{name}");
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(rel) = text[from..].find(&needle) {
        let start = from + rel;
        let mut i = start + needle.len();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) == Some(&b'>') {
            spans.push(start..i + 1);
            from = i + 1;
        } else {
            from = start + needle.len();
        }
    }
    spans
}

fn parse_tag(text: &str, start: usize, name: Range<usize>) -> Option<Tag> {
    let bytes = text.as_bytes();
    let mut attrs = Vec::new();
    let mut i = name.end;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match *bytes.get(i)? {
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Some(Tag {
                    start,
                    end: i + 2,
                    name,
                    attrs,
                    terminator: i,
                    self_closing: true,
                });
            }
            b'>' => {
                return Some(Tag {
                    start,
                    end: i + 1,
                    name,
                    attrs,
                    terminator: i,
                    self_closing: false,
                });
            }
            b'{' => {
                let close = find_matching(text, i)?;
                attrs.push(Attribute {
                    name: i..close + 1,
                    value: None,
                    span: i..close + 1,
                });
                i = close + 1;
            }
            _ => {
                let name_start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/' | b'{' | b'<')
                {
                    i += 1;
                }
                if i == name_start {
                    return None;
                }
                let attr_name = name_start..i;

                let mut j = i;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if bytes.get(j) != Some(&b'=') {
                    attrs.push(Attribute {
                        name: attr_name.clone(),
                        value: None,
                        span: attr_name,
                    });
                    continue;
                }
                j += 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                let value_start = j;
                let value_end = match *bytes.get(j)? {
                    q @ (b'"' | b'\'') => {
                        let close = text[j + 1..].find(q as char)?;
                        j + 1 + close + 1
                    }
                    b'{' => find_matching(text, j)? + 1,
                    _ => {
                        while j < bytes.len()
                            && !bytes[j].is_ascii_whitespace()
                            && bytes[j] != b'>'
                        {
                            j += 1;
                        }
                        j
                    }
                };
                attrs.push(Attribute {
                    name: attr_name.clone(),
                    value: Some(value_start..value_end),
                    span: attr_name.start..value_end,
                });
                i = value_end;
            }
        }
    }
}

/// Offset of the delimiter closing the `{`, `(` or `[` at `open`.
///
/// Skips string literals, template literals (including `${}` holes) and
/// comments. A quote with no closing partner on the same line is treated as
/// plain text, which keeps apostrophes in JSX text from derailing the scan.
pub fn find_matching(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let (open_ch, close_ch) = match *bytes.get(open)? {
        b'{' => (b'{', b'}'),
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        _ => return None,
    };
    let mut depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'`' => i = skip_template(text, i)?,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = bytes[i..]
                    .iter()
                    .position(|b| *b == b'\n')
                    .map(|p| i + p)
                    .unwrap_or(bytes.len());
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = text[i + 2..].find("*/").map(|p| i + 2 + p + 2)?;
            }
            c if c == open_ch => {
                depth += 1;
                i += 1;
            }
            c if c == close_ch => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return start + 1,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    start + 1
}

fn skip_template(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Some(i + 1),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i = find_matching(text, i + 1)? + 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// Every static `import ... from "module"` or `import "module"` statement
/// that begins a line (leading indentation allowed).
pub fn find_imports(text: &str) -> Vec<ImportStatement> {
    let bytes = text.as_bytes();
    let mut imports = Vec::new();
    let mut from = 0;

    while let Some(rel) = text[from..].find("import") {
        let start = from + rel;
        from = start + "import".len();
        if !starts_statement(bytes, start) {
            continue;
        }
        match bytes.get(from) {
            Some(b) if b.is_ascii_whitespace() || matches!(b, b'{' | b'*' | b'"' | b'\'') => {}
            _ => continue,
        }
        if let Some(stmt) = parse_import(text, start) {
            from = stmt.span.end;
            imports.push(stmt);
        }
    }
    imports
}

fn starts_statement(bytes: &[u8], start: usize) -> bool {
    let mut i = start;
    while i > 0 {
        match bytes[i - 1] {
            b' ' | b'\t' => i -= 1,
            b'\n' | b';' => return true,
            _ => return false,
        }
    }
    true
}

fn parse_import(text: &str, start: usize) -> Option<ImportStatement> {
    let bytes = text.as_bytes();
    let body = start + "import".len();
    let mut i = body;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    let (clause, module_start) = if matches!(bytes.get(i), Some(b'"' | b'\'')) {
        (i..i, i)
    } else {
        let limit = (body + MAX_IMPORT_SPAN).min(bytes.len());
        let mut depth = 0usize;
        let mut found = None;
        while i < limit {
            match bytes[i] {
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                b';' | b'"' | b'\'' if depth == 0 => return None,
                b'f' if depth == 0
                    && text[i..].starts_with("from")
                    && !is_ident_byte(bytes[i - 1])
                    && !bytes.get(i + 4).copied().map(is_ident_byte).unwrap_or(false) =>
                {
                    found = Some(i);
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        let from_kw = found?;
        let clause = trim_range(text, body..from_kw);
        let mut m = from_kw + "from".len();
        while m < bytes.len() && bytes[m].is_ascii_whitespace() {
            m += 1;
        }
        (clause, m)
    };

    let quote = *bytes.get(module_start)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let close = module_start + 1 + text[module_start + 1..].find(quote as char)?;
    let module = text[module_start + 1..close].to_string();
    if module.contains('\n') {
        return None;
    }

    let mut end = close + 1;
    let mut j = end;
    while j < bytes.len() && matches!(bytes[j], b' ' | b'\t') {
        j += 1;
    }
    if bytes.get(j) == Some(&b';') {
        end = j + 1;
    }

    Some(ImportStatement {
        span: start..end,
        clause,
        module,
    })
}

fn trim_range(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = &text[range.clone()];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    range.start + lead..range.end - trail
}

/// Offsets of `ident` where it stands alone: not preceded by an identifier
/// character or `.`, not followed by an identifier character.
pub fn find_identifier(text: &str, ident: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut hits = Vec::new();
    let mut from = 0;
    while let Some(rel) = text[from..].find(ident) {
        let at = from + rel;
        let end = at + ident.len();
        let before_ok = at == 0 || !(is_ident_byte(bytes[at - 1]) || bytes[at - 1] == b'.');
        let after_ok = bytes.get(end).map(|b| !is_ident_byte(*b)).unwrap_or(true);
        if before_ok && after_ok {
            hits.push(at);
        }
        from = end;
    }
    hits
}

pub fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Non-overlapping replacements applied in one pass.
#[derive(Debug, Default)]
pub struct Edits {
    edits: Vec<(Range<usize>, String)>,
}

impl Edits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, range: Range<usize>, with: impl Into<String>) {
        self.edits.push((range, with.into()));
    }

    pub fn insert(&mut self, at: usize, with: impl Into<String>) {
        self.edits.push((at..at, with.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply the edits. Overlapping edits after the first are dropped.
    pub fn apply(mut self, text: &str) -> String {
        self.edits.sort_by_key(|(r, _)| (r.start, r.end));
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (range, with) in self.edits {
            if range.start < cursor {
                continue;
            }
            out.push_str(&text[cursor..range.start]);
            out.push_str(&with);
            cursor = range.end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_attributes_in_order() {
        let text = r#"<Image src="/a.png" alt={`x ${y}`} width="200" priority />"#;
        let tags = find_tags(text, "Image");
        assert_eq!(tags.len(), 1);
        let tag = &tags[0];
        let names: Vec<&str> = tag.attrs.iter().map(|a| &text[a.name.clone()]).collect();
        assert_eq!(names, vec!["src", "alt", "width", "priority"]);
        assert!(tag.self_closing);
        assert_eq!(tag.end, text.len());
    }

    #[test]
    fn test_tag_name_boundary() {
        let text = "<ImageGallery items={xs} /><Image src='a' />";
        let tags = find_tags(text, "Image");
        assert_eq!(tags.len(), 1);
        assert_eq!(&text[tags[0].start..tags[0].end], "<Image src='a' />");
    }

    #[test]
    fn test_arrow_inside_attribute_does_not_end_tag() {
        let text = r#"<Link href="/x" onClick={() => go(">")}>Go</Link>"#;
        let tags = find_tags(text, "Link");
        assert_eq!(tags.len(), 1);
        assert_eq!(&text[tags[0].end..], "Go</Link>");
        assert_eq!(find_closing_tags(text, "Link").len(), 1);
    }

    #[test]
    fn test_find_matching_skips_strings_and_comments() {
        let text = "{ const s = '}'; // }\n /* } */ return `${a}}` }";
        assert_eq!(find_matching(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn test_unbalanced_returns_none() {
        assert_eq!(find_matching("{ a: { b }", 0), None);
    }

    #[test]
    fn test_multiline_import() {
        let text = "import React from 'react'\nimport {\n  useRouter,\n} from \"next/router\";\nconst x = 1;";
        let imports = find_imports(text);
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[1].module, "next/router");
        assert!(text[imports[1].span.clone()].ends_with("\"next/router\";"));
        assert_eq!(&text[imports[0].clause.clone()], "React");
    }

    #[test]
    fn test_dynamic_import_is_ignored() {
        let text = "const Page = dynamic(() => import('next/link'));";
        assert!(find_imports(text).is_empty());
    }

    #[test]
    fn test_identifier_boundaries() {
        let text = "router.push(a); myrouter.push(b); x.router.push(c)";
        assert_eq!(find_identifier(text, "router"), vec![0]);
    }

    #[test]
    fn test_edits_apply_in_order() {
        let mut edits = Edits::new();
        edits.replace(6..11, "there");
        edits.insert(0, ">> ");
        assert_eq!(edits.apply("hello world"), ">> hello there");
    }
}
