use super::scanner::{
    find_identifier, find_imports, find_matching, is_ident_byte, skip_whitespace, Edits,
};
use super::RewriteStage;
use std::ops::Range;

const FETCHERS: &[&str] = &["getStaticProps", "getServerSideProps"];
const HOOKS: &[&str] = &["useState", "useEffect"];
/// How far past the name a `: Type =` annotation may extend.
const MAX_TYPE_SPAN: usize = 512;

/// Build-time and request-time data exports, turned into state plus an
/// effect that runs once on mount.
pub struct DataFetchingStage;

#[derive(Debug, Clone, PartialEq, Eq)]
struct DataExport {
    span: Range<usize>,
    params: String,
    body: Range<usize>,
}

impl RewriteStage for DataFetchingStage {
    fn name(&self) -> &'static str {
        "data-fetching"
    }

    fn matches(&self, text: &str) -> bool {
        FETCHERS.iter().any(|name| text.contains(name))
    }

    fn apply(&self, text: &str) -> String {
        let exports = find_exports(text);
        if exports.is_empty() {
            return text.to_string();
        }

        let mut edits = Edits::new();
        let target = component_body_start(text)
            .filter(|at| exports.iter().all(|e| !e.span.contains(at)));

        match target {
            Some(at) => {
                let indent = body_indent(text, at);
                let blocks: Vec<String> = exports
                    .iter()
                    .enumerate()
                    .map(|(i, e)| hook_block(text, e, i == 0, &indent))
                    .collect();
                edits.insert(at, format!("\n{}\n", blocks.join("\n\n")));
                for export in &exports {
                    edits.replace(removal_span(text, &export.span), "");
                }
            }
            None => {
                for (i, export) in exports.iter().enumerate() {
                    edits.replace(export.span.clone(), hook_block(text, export, i == 0, ""));
                }
            }
        }

        ensure_hook_imports(&edits.apply(text))
    }
}

fn find_exports(text: &str) -> Vec<DataExport> {
    let mut found: Vec<DataExport> = FETCHERS
        .iter()
        .flat_map(|name| {
            find_identifier(text, name)
                .into_iter()
                .filter_map(move |at| {
                    parse_function_form(text, at, name).or_else(|| parse_const_form(text, at, name))
                })
        })
        .collect();
    found.sort_by_key(|e| e.span.start);

    let mut kept: Vec<DataExport> = Vec::with_capacity(found.len());
    for export in found {
        if kept.last().map_or(true, |prev| export.span.start >= prev.span.end) {
            kept.push(export);
        }
    }
    kept
}

/// The identifier ending right before `end`, skipping whitespace.
fn prev_word(text: &str, end: usize) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    let mut i = end;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    let word_end = i;
    while i > 0 && is_ident_byte(bytes[i - 1]) {
        i -= 1;
    }
    (i < word_end).then_some(i..word_end)
}

fn word_is(text: &str, range: &Range<usize>, word: &str) -> bool {
    &text[range.clone()] == word
}

fn starts_with_word(text: &str, at: usize, word: &str) -> bool {
    text[at..].starts_with(word)
        && !text
            .as_bytes()
            .get(at + word.len())
            .copied()
            .map(is_ident_byte)
            .unwrap_or(false)
}

/// `export [async] function NAME(params) { body }`
fn parse_function_form(text: &str, at: usize, name: &str) -> Option<DataExport> {
    let bytes = text.as_bytes();
    let function = prev_word(text, at)?;
    if !word_is(text, &function, "function") {
        return None;
    }
    let mut export = prev_word(text, function.start)?;
    if word_is(text, &export, "async") {
        export = prev_word(text, export.start)?;
    }
    if !word_is(text, &export, "export") {
        return None;
    }

    let open = skip_whitespace(bytes, at + name.len());
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let close = find_matching(text, open)?;
    let brace = skip_whitespace(bytes, close + 1);
    if bytes.get(brace) != Some(&b'{') {
        return None;
    }
    let body_close = find_matching(text, brace)?;

    Some(DataExport {
        span: export.start..body_close + 1,
        params: text[open + 1..close].trim().to_string(),
        body: brace + 1..body_close,
    })
}

/// `export const NAME[: Type] = async (params) => { body };`
fn parse_const_form(text: &str, at: usize, name: &str) -> Option<DataExport> {
    let bytes = text.as_bytes();
    let keyword = prev_word(text, at)?;
    if !word_is(text, &keyword, "const") {
        return None;
    }
    let export = prev_word(text, keyword.start)?;
    if !word_is(text, &export, "export") {
        return None;
    }

    let mut i = skip_whitespace(bytes, at + name.len());
    if bytes.get(i) == Some(&b':') {
        i = find_assignment(bytes, i + 1)?;
    }
    if bytes.get(i) != Some(&b'=') || bytes.get(i + 1) == Some(&b'=') {
        return None;
    }
    i = skip_whitespace(bytes, i + 1);
    if starts_with_word(text, i, "async") {
        i = skip_whitespace(bytes, i + "async".len());
    }

    let (params, after_params) = if bytes.get(i) == Some(&b'(') {
        let close = find_matching(text, i)?;
        (text[i + 1..close].trim().to_string(), close + 1)
    } else {
        let start = i;
        while i < bytes.len() && is_ident_byte(bytes[i]) {
            i += 1;
        }
        if start == i {
            return None;
        }
        (text[start..i].to_string(), i)
    };

    let window_end = (after_params + MAX_TYPE_SPAN).min(text.len());
    let arrow = after_params + text[after_params..window_end].find("=>")?;
    let brace = skip_whitespace(bytes, arrow + 2);
    if bytes.get(brace) != Some(&b'{') {
        return None;
    }
    let body_close = find_matching(text, brace)?;

    let mut end = body_close + 1;
    let mut j = end;
    while j < bytes.len() && matches!(bytes[j], b' ' | b'\t') {
        j += 1;
    }
    if bytes.get(j) == Some(&b';') {
        end = j + 1;
    }

    Some(DataExport {
        span: export.start..end,
        params,
        body: brace + 1..body_close,
    })
}

/// Position of the `=` ending a type annotation that starts at `from`.
fn find_assignment(bytes: &[u8], from: usize) -> Option<usize> {
    let limit = (from + MAX_TYPE_SPAN).min(bytes.len());
    let mut depth = 0usize;
    for i in from..limit {
        match bytes[i] {
            b'<' | b'(' | b'[' | b'{' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'=' => {}
            b'>' | b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'=' if depth == 0 && bytes.get(i + 1) != Some(&b'>') => return Some(i),
            b';' => return None,
            _ => {}
        }
    }
    None
}

/// Offset just inside the body brace of the default-exported function
/// component, if there is one.
fn component_body_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    for at in find_identifier(text, "export") {
        let mut i = skip_whitespace(bytes, at + "export".len());
        if !starts_with_word(text, i, "default") {
            continue;
        }
        i = skip_whitespace(bytes, i + "default".len());
        if starts_with_word(text, i, "async") {
            i = skip_whitespace(bytes, i + "async".len());
        }
        if starts_with_word(text, i, "function") {
            i = skip_whitespace(bytes, i + "function".len());
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            return body_after_params(text, skip_whitespace(bytes, i));
        }

        let start = i;
        while i < bytes.len() && is_ident_byte(bytes[i]) {
            i += 1;
        }
        if start == i {
            continue;
        }
        return declared_component_body(text, &text[start..i]);
    }
    None
}

/// Body of `function NAME(...) {` or `const NAME = (...) => {`.
fn declared_component_body(text: &str, name: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    for at in find_identifier(text, name) {
        let Some(keyword) = prev_word(text, at) else {
            continue;
        };
        let after_name = skip_whitespace(bytes, at + name.len());
        if word_is(text, &keyword, "function") {
            return body_after_params(text, after_name);
        }
        if (word_is(text, &keyword, "const") || word_is(text, &keyword, "let"))
            && bytes.get(after_name) == Some(&b'=')
        {
            let window_end = (after_name + MAX_TYPE_SPAN).min(text.len());
            let arrow = after_name + text[after_name..window_end].find("=>")?;
            let brace = skip_whitespace(bytes, arrow + 2);
            return (bytes.get(brace) == Some(&b'{')).then_some(brace + 1);
        }
    }
    None
}

fn body_after_params(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let close = find_matching(text, open)?;
    let brace = skip_whitespace(bytes, close + 1);
    (bytes.get(brace) == Some(&b'{')).then_some(brace + 1)
}

/// Indentation of the first non-blank line after `at`.
fn body_indent(text: &str, at: usize) -> String {
    text[at..]
        .lines()
        .skip(1)
        .find(|line| !line.trim().is_empty())
        .map(|line| {
            line.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect::<String>()
        })
        .filter(|indent| !indent.is_empty())
        .unwrap_or_else(|| "  ".to_string())
}

/// The export span plus the line break that follows it.
fn removal_span(text: &str, span: &Range<usize>) -> Range<usize> {
    let rest = &text[span.end..];
    let trailing = if rest.starts_with("\r\n") {
        2
    } else if rest.starts_with('\n') {
        1
    } else {
        0
    };
    span.start..span.end + trailing
}

fn hook_block(text: &str, export: &DataExport, declare_state: bool, indent: &str) -> String {
    let body = &text[export.body.clone()];
    let store = if declare_state {
        "setData(value);"
    } else {
        "setData((prev) => ({ ...(prev || {}), ...value }));"
    };

    let mut lines: Vec<String> = Vec::new();
    if declare_state {
        lines.push("const [data, setData] = useState(null);".to_string());
        lines.push("const [loading, setLoading] = useState(true);".to_string());
        lines.push(String::new());
    }
    lines.push("useEffect(() => {".to_string());
    lines.push("  const fetchData = async () => {".to_string());
    lines.push("    try {".to_string());
    lines.push("      setLoading(true);".to_string());
    lines.push(format!(
        "      const result = await (async ({}) => {{{}}})({{ params: {{}}, query: {{}} }});",
        export.params, body
    ));
    lines.push(
        "      const value = result && result.props !== undefined ? result.props : result;"
            .to_string(),
    );
    lines.push(format!("      {store}"));
    lines.push("    } catch (error) {".to_string());
    lines.push("      console.error('Error fetching data:', error);".to_string());
    lines.push("    } finally {".to_string());
    lines.push("      setLoading(false);".to_string());
    lines.push("    }".to_string());
    lines.push("  };".to_string());
    lines.push(String::new());
    lines.push("  fetchData();".to_string());
    lines.push("}, []);".to_string());

    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Make `useState` and `useEffect` importable from `react`, merging into an
/// existing named import when there is one.
fn ensure_hook_imports(text: &str) -> String {
    let imports = find_imports(text);
    let mut edits = Edits::new();

    let react = imports.iter().find(|i| i.module == "react");
    match react {
        Some(import) => {
            let clause = &text[import.clause.clone()];
            if let (Some(open), Some(close)) = (clause.find('{'), clause.rfind('}')) {
                let inner = &clause[open + 1..close];
                let mut names: Vec<String> = inner
                    .split(',')
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect();
                let before = names.len();
                for hook in HOOKS {
                    if !names
                        .iter()
                        .any(|n| n.split_whitespace().next() == Some(*hook))
                    {
                        names.push(hook.to_string());
                    }
                }
                if names.len() == before {
                    return text.to_string();
                }
                let braces = import.clause.start + open..import.clause.start + close + 1;
                edits.replace(braces, format!("{{ {} }}", names.join(", ")));
            } else if !clause.is_empty() && !clause.starts_with('*') {
                edits.insert(import.clause.end, format!(", {{ {} }}", HOOKS.join(", ")));
            } else {
                edits.insert(import.span.end, format!("\n{}", hook_import()));
            }
        }
        None => match imports.last() {
            Some(last) => edits.insert(last.span.end, format!("\n{}", hook_import())),
            None => edits.insert(0, format!("{}\n", hook_import())),
        },
    }

    edits.apply(text)
}

fn hook_import() -> String {
    format!("import {{ {} }} from \"react\";", HOOKS.join(", "))
}
