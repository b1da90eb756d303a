use super::scanner::{find_closing_tags, find_tags, Edits};
use super::RewriteStage;

/// Element renames performed by [`ComponentStage`], as (source, target).
/// The structural verifier uses this table to treat both names as the same
/// element.
pub const TAG_RENAMES: &[(&str, &str)] = &[("Image", "img"), ("Head", "Helmet")];

/// Attributes [`ComponentStage`] adds to an element, as (source element,
/// attribute).
pub const ADDED_ATTRIBUTES: &[(&str, &str)] = &[("Image", "loading")];

const LOADING_HINT: &str = r#" loading="lazy""#;

/// Optimized-image and document-head components.
pub struct ComponentStage;

impl RewriteStage for ComponentStage {
    fn name(&self) -> &'static str {
        "components"
    }

    fn matches(&self, text: &str) -> bool {
        TAG_RENAMES
            .iter()
            .any(|(source, _)| text.contains(&format!("<{source}")) || text.contains(&format!("</{source}")))
    }

    fn apply(&self, text: &str) -> String {
        let mut edits = Edits::new();

        for (source, target) in TAG_RENAMES {
            for tag in find_tags(text, source) {
                edits.replace(tag.name.clone(), *target);
                if *source == "Image" && tag.attr(text, "loading").is_none() {
                    edits.insert(tag.attrs_end(), LOADING_HINT);
                }
            }
            for closing in find_closing_tags(text, source) {
                edits.replace(closing, format!("</{target}>"));
            }
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
    fn test_image_keeps_every_attribute() {
        let text = r#"<Image className="hero" src="/hero.png" width="200" height="100" priority />"#;
        assert_eq!(
            ComponentStage.apply(text),
            r#"<img className="hero" src="/hero.png" width="200" height="100" priority loading="lazy" />"#
        );
    }

    #[test]
    fn test_existing_loading_is_kept() {
        let text = r#"<Image src={src} loading="eager" alt="" />"#;
        assert_eq!(
            ComponentStage.apply(text),
            r#"<img src={src} loading="eager" alt="" />"#
        );
    }

    #[test]
    fn test_multiline_image_with_closing_tag() {
        let text = "<Image\n  src=\"/a.png\"\n  width={40}\n></Image>";
        assert_eq!(
            ComponentStage.apply(text),
            "<img\n  src=\"/a.png\"\n  width={40} loading=\"lazy\"\n></img>"
        );
    }

    #[test]
    fn test_head_becomes_helmet() {
        let text = "<Head>\n  <title>Home</title>\n</Head>";
        assert_eq!(
            ComponentStage.apply(text),
            "<Helmet>\n  <title>Home</title>\n</Helmet>"
        );
    }

    #[test]
    fn test_lookalike_names_untouched() {
        let text = "<Header /><ImageGrid items={x} /><Heading>t</Heading>";
        assert_eq!(ComponentStage.apply(text), text);
    }

    #[test]
    fn test_idempotent() {
        let text = r#"<Head><title>x</title></Head><Image src="a" />"#;
        let once = ComponentStage.apply(text);
        assert_eq!(ComponentStage.apply(&once), once);
    }
}
