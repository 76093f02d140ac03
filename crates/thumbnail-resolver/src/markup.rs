use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::warn;

pub type Attributes = HashMap<String, String>;

/// Element lookup over a piece of markup.
pub trait MarkupQuery: Send + Sync {
    /// Returns the attributes of every element named `tag`, in document order.
    fn find_elements(&self, html: &str, tag: &str) -> Vec<Attributes>;
}

/// `MarkupQuery` backed by an HTML5 fragment parser.
#[derive(Debug, Default, Clone)]
pub struct HtmlMarkup;

impl MarkupQuery for HtmlMarkup {
    fn find_elements(&self, html: &str, tag: &str) -> Vec<Attributes> {
        if html.trim().is_empty() {
            return vec![];
        }

        let selector = match Selector::parse(tag) {
            Ok(selector) => selector,
            Err(error) => {
                warn!(tag, ?error, "Unable to build element selector");
                return vec![];
            }
        };

        Html::parse_fragment(html)
            .select(&selector)
            .map(|el| {
                el.value()
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect()
            })
            .collect()
    }
}

fn extract_sources(
    markup: &dyn MarkupQuery,
    html: &str,
    tag: &str,
) -> impl Iterator<Item = String> {
    markup
        .find_elements(html, tag)
        .into_iter()
        .filter_map(|mut attributes| attributes.remove("src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty())
}

pub fn extract_iframe_sources(markup: &dyn MarkupQuery, html: &str) -> Vec<String> {
    extract_sources(markup, html, "iframe").collect()
}

/// Image sources in document order. Inline `data:` images are skipped.
pub fn extract_image_sources(markup: &dyn MarkupQuery, html: &str) -> Vec<String> {
    extract_sources(markup, html, "img")
        .filter(|src| !is_data_uri(src))
        .collect()
}

fn is_data_uri(src: &str) -> bool {
    src.get(..5)
        .map(|scheme| scheme.eq_ignore_ascii_case("data:"))
        .unwrap_or(false)
}
