use super::scanner::{
    find_identifier, find_matching, find_tags, is_ident_byte, skip_whitespace, Edits,
};
use super::RewriteStage;
use std::ops::Range;

/// Attribute renames made by [`RoutingStage`], as (element, source, target).
pub const ATTRIBUTE_RENAMES: &[(&str, &str, &str)] = &[("Link", "href", "to")];

const DEFAULT_ROUTER_IDENT: &str = "router";
const QUERY_EXPR: &str = "Object.fromEntries(new URLSearchParams(useLocation().search))";
const PATHNAME_EXPR: &str = "useLocation().pathname";
const AS_PATH_EXPR: &str = "(useLocation().pathname + useLocation().search)";
const SEARCH_PARAMS_EXPR: &str = "new URLSearchParams(useLocation().search)";

/// Navigation hooks, router call sites and `<Link href>`.
pub struct RoutingStage;

impl RewriteStage for RoutingStage {
    fn name(&self) -> &'static str {
        "routing"
    }

    fn matches(&self, text: &str) -> bool {
        ["useRouter", "useNavigate", "usePathname", "useSearchParams", "<Link"]
            .iter()
            .any(|needle| text.contains(needle))
    }

    fn apply(&self, text: &str) -> String {
        let mut edits = Edits::new();
        let mut idents = Vec::new();

        for call in hook_calls(text, "useRouter") {
            if let Some(binding) = binding_before(text, call.start) {
                let name = text[binding.clone()].to_string();
                if !idents.contains(&name) {
                    idents.push(name);
                }
                edits.replace(binding.start..call.end, "navigate = useNavigate()");
            } else if let Some(pattern) = destructuring_before(text, call.start) {
                match pattern.declarations(text) {
                    Some(declarations) => {
                        edits.replace(pattern.keyword.start..call.end, declarations)
                    }
                    None => edits.replace(call, "useNavigate()"),
                }
            } else {
                edits.replace(call, "useNavigate()");
            }
        }

        for call in hook_calls(text, "usePathname") {
            edits.replace(call, PATHNAME_EXPR);
        }
        // `const [params] = useSearchParams()` is already the react-router form.
        for call in hook_calls(text, "useSearchParams") {
            let array_pattern = target_end(text.as_bytes(), call.start)
                .is_some_and(|end| text.as_bytes()[end - 1] == b']');
            if !array_pattern {
                edits.replace(call, SEARCH_PARAMS_EXPR);
            }
        }

        if idents.is_empty() && (text.contains("useRouter") || text.contains("useNavigate")) {
            idents.push(DEFAULT_ROUTER_IDENT.to_string());
        }
        for ident in &idents {
            rewrite_call_sites(text, ident, &mut edits);
        }

        for (element, source, target) in ATTRIBUTE_RENAMES {
            for tag in find_tags(text, element) {
                if let Some(attr) = tag.attr(text, source) {
                    edits.replace(attr.name.clone(), *target);
                }
            }
        }

        if edits.is_empty() {
            return text.to_string();
        }
        edits.apply(text)
    }
}

/// Spans of `hook()` calls, allowing whitespace inside the parens.
fn hook_calls(text: &str, hook: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    find_identifier(text, hook)
        .into_iter()
        .filter_map(|at| {
            let open = skip_whitespace(bytes, at + hook.len());
            if bytes.get(open) != Some(&b'(') {
                return None;
            }
            let close = skip_whitespace(bytes, open + 1);
            (bytes.get(close) == Some(&b')')).then(|| at..close + 1)
        })
        .collect()
}

/// End of the assignment target when `call_start` is the right-hand side of
/// a plain `=`.
fn target_end(bytes: &[u8], call_start: usize) -> Option<usize> {
    let mut i = call_start;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    if i == 0 || bytes[i - 1] != b'=' || (i >= 2 && matches!(bytes[i - 2], b'=' | b'!' | b'<' | b'>')) {
        return None;
    }
    i -= 1;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    (i > 0).then_some(i)
}

/// Start of a `const`, `let` or `var` keyword ending at `end`.
fn keyword_before(text: &str, end: usize) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    let mut i = end;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    let keyword_end = i;
    while i > 0 && is_ident_byte(bytes[i - 1]) {
        i -= 1;
    }
    let before_ok = i == 0 || !is_ident_byte(bytes[i - 1]);
    (before_ok && matches!(&text[i..keyword_end], "const" | "let" | "var")).then_some(i..keyword_end)
}

/// For `const router = useRouter()` returns the span of `router`.
fn binding_before(text: &str, call_start: usize) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    let ident_end = target_end(bytes, call_start)?;
    let mut i = ident_end;
    while i > 0 && is_ident_byte(bytes[i - 1]) {
        i -= 1;
    }
    let ident = i..ident_end;
    if ident.is_empty() || bytes[ident.start].is_ascii_digit() {
        return None;
    }
    keyword_before(text, i).map(|_| ident)
}

/// `const { query, push: go } = useRouter()`.
struct Destructuring {
    keyword: Range<usize>,
    /// Between the braces.
    fields: Range<usize>,
}

fn destructuring_before(text: &str, call_start: usize) -> Option<Destructuring> {
    let bytes = text.as_bytes();
    let end = target_end(bytes, call_start)?;
    if bytes[end - 1] != b'}' {
        return None;
    }
    let mut depth = 0usize;
    let mut i = end;
    while i > 0 {
        i -= 1;
        match bytes[i] {
            b'}' => depth += 1,
            b'{' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    Some(Destructuring {
        keyword: keyword_before(text, i)?,
        fields: i + 1..end - 1,
    })
}

impl Destructuring {
    /// One declaration per field, preceded by a `navigate` binding when a
    /// navigation method is used. `None` for defaults, rest elements and
    /// computed keys.
    fn declarations(&self, text: &str) -> Option<String> {
        let keyword = &text[self.keyword.clone()];
        let line_start = text[..self.keyword.start].rfind('\n').map_or(0, |p| p + 1);
        let indent = &text[line_start..self.keyword.start];
        let indent = if indent.trim().is_empty() { indent } else { "" };

        let mut navigate = false;
        let mut declarations = Vec::new();
        for field in split_fields(&text[self.fields.clone()]) {
            let (key, pattern) = match field.split_once(':') {
                Some((key, pattern)) => (key.trim(), pattern.trim()),
                None => (field, field),
            };
            if !is_identifier(key) || pattern.is_empty() || pattern.contains('=') {
                return None;
            }
            let value = match key {
                "query" => QUERY_EXPR,
                "pathname" => PATHNAME_EXPR,
                "asPath" => AS_PATH_EXPR,
                "isReady" => "true",
                "push" => "navigate",
                "replace" => "(to, options) => navigate(to, { ...options, replace: true })",
                "back" => "() => navigate(-1)",
                _ => "undefined",
            };
            navigate |= value.contains("navigate");
            if pattern != "navigate" {
                declarations.push(format!("{keyword} {pattern} = {value}"));
            }
        }
        if navigate || declarations.is_empty() {
            declarations.insert(0, format!("{keyword} navigate = useNavigate()"));
        }
        Some(declarations.join(&format!(";\n{indent}")))
    }
}

/// Top-level comma-separated fields, trimmed, nested patterns kept whole.
fn split_fields(fields: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, b) in fields.bytes().enumerate() {
        match b {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(fields[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(fields[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && !s.as_bytes()[0].is_ascii_digit() && s.bytes().all(is_ident_byte)
}

fn rewrite_call_sites(text: &str, ident: &str, edits: &mut Edits) {
    let bytes = text.as_bytes();
    for at in find_identifier(text, ident) {
        let dot = at + ident.len();
        if bytes.get(dot) != Some(&b'.') {
            continue;
        }
        let member_start = dot + 1;
        let mut member_end = member_start;
        while member_end < bytes.len() && is_ident_byte(bytes[member_end]) {
            member_end += 1;
        }
        let member = &text[member_start..member_end];
        let open = skip_whitespace(bytes, member_end);
        let called = bytes.get(open) == Some(&b'(');

        match member {
            "push" if called => edits.replace(at..member_end, "navigate"),
            "replace" if called => {
                if let Some(close) = find_matching(text, open) {
                    edits.replace(at..member_end, "navigate");
                    edits.insert(close, ", { replace: true }");
                }
            }
            "back" if called => {
                if let Some(close) = find_matching(text, open) {
                    edits.replace(at..close + 1, "navigate(-1)");
                }
            }
            "query" if !called => edits.replace(at..member_end, QUERY_EXPR),
            "pathname" if !called => edits.replace(at..member_end, PATHNAME_EXPR),
            "asPath" if !called => edits.replace(at..member_end, AS_PATH_EXPR),
            _ => {}
        }
    }
}
