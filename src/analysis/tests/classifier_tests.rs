use crate::analysis::{Category, FileClassifier};
use crate::config::ScanConfig;
use std::path::Path;

fn classify(path: &str, content: Option<&str>) -> Category {
    FileClassifier::default().classify(Path::new(path), content)
}

#[test]
fn test_config_files_win_over_everything() {
    assert_eq!(classify("next.config.js", Some("module.exports = {}")), Category::Config);
    assert_eq!(classify("pages/tsconfig.json", Some("{}")), Category::Config);
    assert_eq!(classify(".eslintrc.json", Some("{}")), Category::Config);
    assert_eq!(classify("tailwind.config.ts", None), Category::Config);
}

#[test]
fn test_styles_by_extension() {
    assert_eq!(classify("styles/Home.module.css", Some(".a{}")), Category::Style);
    assert_eq!(classify("components/Button.SCSS", Some("$x: 1;")), Category::Style);
}

#[test]
fn test_api_route_needs_handler_signature() {
    let handler = "export default function handler(req, res) { res.status(200).json({}) }";
    assert_eq!(classify("pages/api/hello.js", Some(handler)), Category::ApiRoute);
    // No handler: falls through to the pages rule.
    assert_eq!(
        classify("pages/api/constants.js", Some("export const A = 1;")),
        Category::Page
    );
}

#[test]
fn test_components() {
    let button = "import React from 'react';\nexport default function Button() { return <button/> }";
    assert_eq!(classify("src/Components/Button.jsx", Some(button)), Category::Component);
    assert_eq!(
        classify("components/util.ts", Some("export const sum = (a, b) => a + b;")),
        Category::Unclassified
    );
}

#[test]
fn test_pages_by_segment_or_data_hook() {
    assert_eq!(classify("pages/index.tsx", Some("export default () => null")), Category::Page);
    assert_eq!(classify("app/about/page.tsx", Some("export default () => null")), Category::Page);
    assert_eq!(
        classify("lib/posts.js", Some("export async function getStaticProps() {}")),
        Category::Page
    );
}

#[test]
fn test_layouts() {
    assert_eq!(classify("app/layout.tsx", Some("export default () => null")), Category::Layout);
    assert_eq!(
        classify("lib/Shell.jsx", Some("export const Shell = ({ children }) => children")),
        Category::Layout
    );
}

#[test]
fn test_assets_and_fallback() {
    assert_eq!(classify("public/logo.png", None), Category::Asset);
    assert_eq!(classify("assets/fonts/a.woff2", None), Category::Asset);
    assert_eq!(classify("README.md", Some("# readme")), Category::Unclassified);
}

#[test]
fn test_unreadable_file_never_convertible() {
    assert_eq!(classify("pages/index.js", None), Category::Unclassified);
    assert_eq!(classify("styles/site.css", None), Category::Unclassified);
}

#[test]
fn test_deterministic() {
    let classifier = FileClassifier::new(&ScanConfig::default());
    let path = Path::new("components/Card.tsx");
    let content = Some("export default function Card({ children }) { return <div>{children}</div> }");
    let first = classifier.classify(path, content);
    for _ in 0..10 {
        assert_eq!(classifier.classify(path, content), first);
    }
    assert_eq!(first, Category::Component);
}

#[test]
fn test_rule_order() {
    let names: Vec<Category> = FileClassifier::default().rules().iter().map(|r| r.category).collect();
    assert_eq!(
        names,
        vec![
            Category::Config,
            Category::Style,
            Category::ApiRoute,
            Category::Component,
            Category::Page,
            Category::Layout,
            Category::Asset,
        ]
    );
}
