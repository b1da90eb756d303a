//! Structural equivalence of markup before and after a rewrite.
//!
//! Both texts are reduced to their markup skeleton: one normalized token per
//! `<...>` run, carrying the tag kind, the element name and the attribute
//! names in order. Attribute values are not structure. Element and attribute
//! renames done by the rewrite stages map back to their source names, and
//! attributes the stages add are left out. The skeletons are fingerprinted
//! with xxh3-128; two structurally different files with the same fingerprint
//! would pass.

mod diff;

pub use diff::{line_diff, unified, DiffKind, DiffLine};

use crate::rewrite::scanner::{find_matching, is_ident_byte, skip_whitespace};
use crate::rewrite::{ADDED_ATTRIBUTES, ATTRIBUTE_RENAMES, TAG_RENAMES};
use serde::Serialize;
use std::fmt;
use xxhash_rust::xxh3::xxh3_128;

/// Lines of context around each hunk in rendered diffs.
pub const DIFF_CONTEXT: usize = 3;

const SEPARATOR: &str = "\u{1f}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Open,
    Close,
    SelfClosing,
}

/// A `<...>` run reduced to its structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum SkeletonToken {
    Element {
        kind: TokenKind,
        name: String,
        attrs: Vec<String>,
    },
    /// Fragments, comparisons and anything else without an element name.
    Anonymous,
}

impl fmt::Display for SkeletonToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self::Element { kind, name, attrs } = self else {
            return f.write_str("<?>");
        };
        if *kind == TokenKind::Close {
            f.write_str("</")?;
        } else {
            f.write_str("<")?;
        }
        f.write_str(name)?;
        for attr in attrs {
            write!(f, " {attr}")?;
        }
        if *kind == TokenKind::SelfClosing {
            f.write_str("/")?;
        }
        f.write_str(">")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub equal: bool,
    pub original_fingerprint: String,
    pub converted_fingerprint: String,
    /// Empty when `equal`.
    pub diff: Vec<DiffLine>,
    #[serde(skip)]
    rendered: String,
}

impl VerificationResult {
    /// Unified-style diff with [`DIFF_CONTEXT`] lines of context.
    pub fn render_diff(&self) -> &str {
        &self.rendered
    }

    pub fn into_parts(self) -> (Vec<DiffLine>, String) {
        (self.diff, self.rendered)
    }
}

#[derive(Debug, Clone)]
pub struct StructuralVerifier {
    /// (converted name, source name)
    aliases: Vec<(String, String)>,
    /// (element, converted attribute, source attribute)
    attribute_aliases: Vec<(String, String, String)>,
    /// (element, attribute) pairs added by a rewrite.
    added: Vec<(String, String)>,
}

impl StructuralVerifier {
    /// A verifier aware of every rename and addition the standard stages make.
    pub fn new() -> Self {
        let mut verifier =
            Self::with_aliases(TAG_RENAMES.iter().map(|(source, target)| (*source, *target)));
        verifier.attribute_aliases = ATTRIBUTE_RENAMES
            .iter()
            .map(|(element, source, target)| {
                (element.to_string(), target.to_string(), source.to_string())
            })
            .collect();
        verifier.added = ADDED_ATTRIBUTES
            .iter()
            .map(|(element, attr)| (element.to_string(), attr.to_string()))
            .collect();
        verifier
    }

    /// A verifier treating each `(source, converted)` pair as one element.
    /// Attributes are compared by name as written.
    pub fn with_aliases<'a>(renames: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            aliases: renames
                .into_iter()
                .map(|(source, target)| (target.to_string(), source.to_string()))
                .collect(),
            attribute_aliases: Vec::new(),
            added: Vec::new(),
        }
    }

    pub fn verify(&self, original: &str, converted: &str) -> VerificationResult {
        let original_fingerprint = self.fingerprint(original);
        let converted_fingerprint = self.fingerprint(converted);
        let equal = original_fingerprint == converted_fingerprint;

        let (diff, rendered) = if equal {
            (Vec::new(), String::new())
        } else {
            let mut diff = line_diff(original, converted);
            let rendered = unified(original, converted, DIFF_CONTEXT);
            if diff.is_empty() {
                // Whitespace-only line changes still moved a tag boundary.
                diff = skeleton_diff(
                    &self.extract_skeleton(original),
                    &self.extract_skeleton(converted),
                );
            }
            (diff, rendered)
        };

        VerificationResult {
            equal,
            original_fingerprint,
            converted_fingerprint,
            diff,
            rendered,
        }
    }

    /// Hex xxh3-128 of the joined skeleton tokens.
    pub fn fingerprint(&self, text: &str) -> String {
        let joined = self
            .extract_skeleton(text)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        format!("{:032x}", xxh3_128(joined.as_bytes()))
    }

    pub fn extract_skeleton(&self, text: &str) -> Vec<SkeletonToken> {
        let bytes = text.as_bytes();
        let mut tokens = Vec::new();
        let mut i = 0;

        while let Some(rel) = text[i..].find('<') {
            let start = i + rel;
            let closing = bytes.get(start + 1) == Some(&b'/');
            // Type arguments and tight comparisons: `Promise<T>`, `a<b`.
            let after_ident = start > 0 && is_ident_byte(bytes[start - 1]);
            // No tag starts with these: `a < b`, `n <= 2`, `x <1`, `a << b`.
            let operator = match bytes.get(start + 1) {
                None => true,
                Some(b) => b.is_ascii_whitespace() || b.is_ascii_digit() || matches!(*b, b'=' | b'<'),
            };
            if !closing && (after_ident || operator) {
                i = start + 1;
                continue;
            }
            let Some(len) = text[start..].find('>') else {
                break;
            };
            let end = start + len;
            tokens.push(self.normalize(&text[start..=end]));
            i = end + 1;
        }
        tokens
    }

    fn normalize(&self, token: &str) -> SkeletonToken {
        let inner = &token[1..token.len() - 1];
        let (kind, rest) = match inner.strip_prefix('/') {
            Some(rest) => (TokenKind::Close, rest),
            None if inner.ends_with('/') => (TokenKind::SelfClosing, inner),
            None => (TokenKind::Open, inner),
        };

        let name_len = rest
            .bytes()
            .take_while(|b| is_ident_byte(*b) || matches!(*b, b'.' | b'-' | b':'))
            .count();
        let name = &rest[..name_len];
        if name.is_empty() || !name.as_bytes()[0].is_ascii_alphabetic() {
            return SkeletonToken::Anonymous;
        }

        let name = self
            .aliases
            .iter()
            .find(|(target, _)| target == name)
            .map(|(_, source)| source.as_str())
            .unwrap_or(name);
        let attrs = attribute_names(&rest[name_len..])
            .into_iter()
            .filter_map(|attr| self.source_attribute(name, attr))
            .collect();
        SkeletonToken::Element {
            kind,
            name: name.to_string(),
            attrs,
        }
    }

    fn source_attribute(&self, element: &str, attr: &str) -> Option<String> {
        if self.added.iter().any(|(e, a)| e == element && a == attr) {
            return None;
        }
        let attr = self
            .attribute_aliases
            .iter()
            .find(|(e, converted, _)| e == element && converted == attr)
            .map(|(_, _, source)| source.as_str())
            .unwrap_or(attr);
        Some(attr.to_string())
    }
}

/// Attribute names of a tag body in order; spreads read as `{...}`. Stops at
/// the first thing that is not attribute syntax, which includes a value cut
/// short by a `>` inside an expression.
fn attribute_names(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut names = Vec::new();
    let mut i = 0;

    loop {
        i = skip_whitespace(bytes, i);
        match bytes.get(i) {
            None => break,
            Some(b'/') => i += 1,
            Some(b'{') => match find_matching(body, i) {
                Some(end) => {
                    names.push("{...}");
                    i = end + 1;
                }
                None => break,
            },
            Some(b) if is_ident_byte(*b) => {
                let start = i;
                while i < bytes.len() && is_attr_byte(bytes[i]) {
                    i += 1;
                }
                names.push(&body[start..i]);

                let eq = skip_whitespace(bytes, i);
                if bytes.get(eq) != Some(&b'=') {
                    continue;
                }
                let value = skip_whitespace(bytes, eq + 1);
                i = match bytes.get(value) {
                    Some(quote @ (b'"' | b'\'')) => {
                        match body[value + 1..].find(*quote as char) {
                            Some(rel) => value + 1 + rel + 1,
                            None => break,
                        }
                    }
                    Some(b'{') => match find_matching(body, value) {
                        Some(end) => end + 1,
                        None => break,
                    },
                    Some(_) => {
                        let mut end = value;
                        while end < bytes.len()
                            && !bytes[end].is_ascii_whitespace()
                            && bytes[end] != b'/'
                        {
                            end += 1;
                        }
                        end
                    }
                    None => break,
                };
            }
            Some(_) => break,
        }
    }
    names
}

fn is_attr_byte(b: u8) -> bool {
    is_ident_byte(b) || matches!(b, b'-' | b':')
}

impl Default for StructuralVerifier {
    fn default() -> Self {
        Self::new()
    }
}

fn skeleton_diff(original: &[SkeletonToken], converted: &[SkeletonToken]) -> Vec<DiffLine> {
    let render = |tokens: &[SkeletonToken]| {
        tokens
            .iter()
            .map(|t| format!("{t}\n"))
            .collect::<String>()
    };
    line_diff(&render(original), &render(converted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::{RewriteEngine, RewriteStage};

    const MARKUP: &str = r#"export default function Card({ item }) {
  return (
    <section className="card">
      <Image src={item.src} width="200" height="100" />
      <p>{item.count > 3 ? 'many' : 'few'}</p>
      <>
        <span>{item.label}</span>
      </>
    </section>
  );
}
"#;

    struct DeleteParagraph;

    impl RewriteStage for DeleteParagraph {
        fn name(&self) -> &'static str {
            "delete-paragraph"
        }
        fn matches(&self, text: &str) -> bool {
            text.contains("<p>")
        }
        fn apply(&self, text: &str) -> String {
            let start = text.find("      <p>").unwrap();
            let end = text[start..].find('\n').unwrap() + start + 1;
            format!("{}{}", &text[..start], &text[end..])
        }
    }

    struct DuplicateSpan;

    impl RewriteStage for DuplicateSpan {
        fn name(&self) -> &'static str {
            "duplicate-span"
        }
        fn matches(&self, text: &str) -> bool {
            text.contains("<span>")
        }
        fn apply(&self, text: &str) -> String {
            let line = "        <span>{item.label}</span>\n";
            text.replacen(line, &line.repeat(2), 1)
        }
    }

    #[test]
    fn test_no_rules_is_equal() {
        let verifier = StructuralVerifier::new();
        let converted = RewriteEngine::empty().rewrite(MARKUP);
        let result = verifier.verify(MARKUP, &converted);
        assert!(result.equal);
        assert!(result.diff.is_empty());
        assert_eq!(result.original_fingerprint, result.converted_fingerprint);
        assert_eq!(result.original_fingerprint.len(), 32);
    }

    #[test]
    fn test_attribute_and_name_changes_are_equal() {
        let verifier = StructuralVerifier::new();
        let converted = RewriteEngine::standard().rewrite(MARKUP);
        assert!(converted.contains(r#"<img src={item.src} width="200" height="100" loading="lazy" />"#));
        assert!(verifier.verify(MARKUP, &converted).equal);
    }

    #[test]
    fn test_deleted_element_is_reported() {
        let verifier = StructuralVerifier::new();
        let converted = RewriteEngine::standard()
            .with_stage(DeleteParagraph)
            .rewrite(MARKUP);
        let result = verifier.verify(MARKUP, &converted);
        assert!(!result.equal);
        assert!(result
            .diff
            .iter()
            .any(|l| l.kind == DiffKind::Delete && l.text.contains("<p>")));
        assert!(result.render_diff().contains("-      <p>"));
    }

    #[test]
    fn test_duplicated_element_is_reported() {
        let verifier = StructuralVerifier::new();
        let converted = RewriteEngine::empty().with_stage(DuplicateSpan).rewrite(MARKUP);
        let result = verifier.verify(MARKUP, &converted);
        assert!(!result.equal);
        assert!(!result.diff.is_empty());
        assert!(result.diff.iter().all(|l| l.kind == DiffKind::Insert));
    }

    #[test]
    fn test_skeleton_normalization() {
        let verifier = StructuralVerifier::new();
        let tokens = verifier.extract_skeleton(
            r#"const x: Promise<Props> = a < b; <Helmet><title>t</title></Helmet><img src="a"/><></>"#,
        );
        let rendered: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["<Head>", "<title>", "</title>", "</Head>", "<Image src/>", "<?>", "<?>"]
        );
    }

    #[test]
    fn test_comparisons_are_not_tags() {
        let verifier = StructuralVerifier::new();
        let tokens = verifier.extract_skeleton("if (a < 1 || b <= c || d <2 || e << 1) {} <ul>");
        let rendered: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["<ul>"]);
    }

    #[test]
    fn test_moved_data_fetching_body_is_equal() {
        let page = r#"export default function Posts({ posts }) {
  return <ul>{posts.map((p) => <li key={p.id}>{p.title}</li>)}</ul>;
}

export async function getStaticProps() {
  const posts = await loadPosts();
  if (posts.length < 1) {
    return { notFound: true };
  }
  return { props: { posts } };
}
"#;
        let converted = RewriteEngine::standard().rewrite(page);
        assert!(converted.find("posts.length < 1") < converted.find("return <ul>"));
        let result = StructuralVerifier::new().verify(page, &converted);
        assert!(result.equal, "{}", result.render_diff());
    }

    #[test]
    fn test_attribute_names_are_structure() {
        let verifier = StructuralVerifier::new();
        let tokens = verifier.extract_skeleton(
            r#"<Link href="/a" {...rest}><img src={s} loading="lazy" /><button onClick={() => go()}>"#,
        );
        let rendered: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["<Link href {...}>", "<Image src/>", "<button onClick>"]
        );

        let original = r#"<Image src="/a.png" width="200" height="100" />"#;
        let dropped = r#"<img src="/a.png" height="100" loading="lazy" />"#;
        assert!(!verifier.verify(original, dropped).equal);
        let kept = r#"<img src="/a.png" width="200" height="100" loading="lazy" />"#;
        assert!(verifier.verify(original, kept).equal);
        assert!(verifier.verify(r#"<Link href="/">x</Link>"#, r#"<Link to="/">x</Link>"#).equal);
    }
}
