use super::scanner::{find_imports, Edits};
use super::RewriteStage;

/// Source module and the statement that replaces any import of it. An empty
/// replacement drops the import together with its line break.
const IMPORT_MAP: &[(&str, &str)] = &[
    (
        "next/router",
        r#"import { useNavigate, useLocation, useParams } from "react-router-dom";"#,
    ),
    (
        "next/navigation",
        r#"import { useNavigate, useLocation, useParams } from "react-router-dom";"#,
    ),
    ("next/link", r#"import { Link } from "react-router-dom";"#),
    ("next/head", r#"import { Helmet } from "react-helmet";"#),
    ("next/image", ""),
];

/// Replaces framework import statements, keyed on the module name only.
pub struct ImportStage;

fn replacement_for(module: &str) -> Option<&'static str> {
    IMPORT_MAP
        .iter()
        .find(|(source, _)| *source == module)
        .map(|(_, target)| *target)
}

impl RewriteStage for ImportStage {
    fn name(&self) -> &'static str {
        "imports"
    }

    fn matches(&self, text: &str) -> bool {
        text.contains("next/")
    }

    fn apply(&self, text: &str) -> String {
        let mut edits = Edits::new();
        for import in find_imports(text) {
            let Some(target) = replacement_for(&import.module) else {
                continue;
            };
            let mut span = import.span;
            if target.is_empty() {
                if text[span.end..].starts_with("\r\n") {
                    span.end += 2;
                } else if text[span.end..].starts_with('\n') {
                    span.end += 1;
                }
            }
            edits.replace(span, target);
        }
        if edits.is_empty() {
            return text.to_string();
        }
        edits.apply(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symbol_list_spelling_is_irrelevant() {
        let a = ImportStage.apply("import { useRouter } from 'next/router'\n");
        let b = ImportStage.apply("import {useRouter,withRouter} from \"next/router\";\n");
        let expected = "import { useNavigate, useLocation, useParams } from \"react-router-dom\";\n";
        assert_eq!(a, expected);
        assert_eq!(b, expected);
    }

    #[test]
    fn test_image_import_is_dropped() {
        let text = "import Image from 'next/image';\nimport Head from 'next/head';\n";
        assert_eq!(
            ImportStage.apply(text),
            "import { Helmet } from \"react-helmet\";\n"
        );
    }

    #[test]
    fn test_unrelated_imports_untouched() {
        let text = "import styles from '../styles/next/Home.module.css';\nimport x from 'next-auth';\n";
        assert_eq!(ImportStage.apply(text), text);
    }

    #[test]
    fn test_idempotent() {
        let text = "import Link from 'next/link';\nimport { useRouter } from 'next/navigation';\n";
        let once = ImportStage.apply(text);
        assert_eq!(ImportStage.apply(&once), once);
    }
}
