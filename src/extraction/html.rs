// Copyright 2024. Felix Engl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::extraction::{read_all, ContentExtractor, ExtractedContent, ExtractionError};
use crate::metadata::Metadata;
use crate::provider::{LazyStream, Locator};
use async_trait::async_trait;
use itertools::Itertools;
use scraper::{Html, Node};
use url::Url;

/// Extracts the visible text, the title and the outgoing links of a page.
///
/// Links are resolved against `<base href>` or the url of the page. Only
/// http(s) links are kept, without fragment and without duplicates. Links marked
/// `nofollow` and pages with a robots `nofollow` are respected.
#[derive(Debug, Default, Copy, Clone)]
pub struct HtmlExtractor;

#[async_trait]
impl ContentExtractor for HtmlExtractor {
    async fn extract(
        &self,
        stream: LazyStream,
        metadata: &Metadata,
    ) -> Result<ExtractedContent, ExtractionError> {
        let bytes = read_all(stream).await?;
        Ok(extract_html(&bytes, metadata))
    }
}

/// The url the relative links of a page are resolved against.
fn page_url(metadata: &Metadata) -> Option<Url> {
    [metadata.exists_id.as_deref(), metadata.source.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(|value| Url::parse(value).ok())
        .next()
}

pub(crate) fn extract_html(bytes: &[u8], metadata: &Metadata) -> ExtractedContent {
    let html = Html::parse_document(&String::from_utf8_lossy(bytes));
    let mut content = ExtractedContent::default();

    if let Some(title) = html.select(&selectors::TITLE).next() {
        let title = title.text().collect::<String>();
        let title = title.trim();
        if !title.is_empty() {
            content.fields.insert("title".to_string(), title.to_string());
        }
    }
    if let Some(description) = html
        .select(&selectors::META_DESCRIPTION)
        .next()
        .and_then(|element| element.attr("content"))
    {
        content
            .fields
            .insert("description".to_string(), description.trim().to_string());
    }

    content.text = html
        .tree
        .root()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    matches!(
                        ancestor.value(),
                        Node::Element(element)
                            if matches!(element.name(), "head" | "script" | "style" | "noscript" | "template")
                    )
                });
                let text = text.trim();
                (!hidden && !text.is_empty()).then_some(text)
            }
            _ => None,
        })
        .join(" ");

    if html.select(&selectors::META_NO_FOLLOW).next().is_some() {
        log::debug!("Respecting no-follow metatag of {}", metadata.display_name());
        return content;
    }
    let Some(page) = page_url(metadata) else {
        log::debug!("{} has no url to resolve links.", metadata.display_name());
        return content;
    };
    let base = html
        .select(&selectors::BASE)
        .next()
        .and_then(|element| element.attr("href"))
        .and_then(|href| page.join(href.trim()).ok())
        .unwrap_or(page);

    content.links = html
        .select(&selectors::HREF_HOLDER)
        .filter(|element| {
            element
                .attr("rel")
                .map_or(true, |rel| !rel.split_ascii_whitespace().any(|value| value == "nofollow"))
        })
        .filter_map(|element| element.attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            Locator::new(url)
        })
        .unique()
        .collect();
    content
}

mod selectors {
    use scraper::Selector;
    use std::sync::LazyLock as Lazy;

    pub static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
    pub static BASE: Lazy<Selector> = Lazy::new(|| Selector::parse("base[href]").unwrap());
    pub static HREF_HOLDER: Lazy<Selector> =
        Lazy::new(|| Selector::parse("a[href],area[href]").unwrap());
    pub static META_DESCRIPTION: Lazy<Selector> =
        Lazy::new(|| Selector::parse("meta[name=\"description\"]").unwrap());
    pub static META_NO_FOLLOW: Lazy<Selector> =
        Lazy::new(|| Selector::parse("meta[name=\"robots\"][content~=\"nofollow\"]").unwrap());
}

#[cfg(test)]
mod test {
    use super::*;

    const PAGE: &'static str = r#"<!DOCTYPE html>
<html>
<head><title> The Page </title><meta name="description" content="About things"><style>p {}</style></head>
<body>
  <p>Hello <b>World</b></p>
  <script>var x = "hidden";</script>
  <a href="b.html#top">B</a>
  <a href="/c.html">C</a>
  <a href="b.html">B again</a>
  <a href="https://other.org/">Other</a>
  <a href="mailto:someone@example.com">Mail</a>
  <a href="/secret" rel="nofollow">Secret</a>
</body>
</html>"#;

    fn metadata(url: &str) -> Metadata {
        let mut metadata = Metadata::for_locator(&Locator::parse(url).unwrap());
        metadata.exists_id = Some(url.to_string());
        metadata
    }

    #[test]
    fn pages_yield_text_fields_and_links() {
        let content = extract_html(PAGE.as_bytes(), &metadata("https://example.com/dir/a.html"));
        assert_eq!(Some("The Page"), content.fields.get("title").map(String::as_str));
        assert_eq!(
            Some("About things"),
            content.fields.get("description").map(String::as_str)
        );
        assert!(content.text.contains("Hello World"));
        assert!(!content.text.contains("hidden"));
        assert!(!content.text.contains("The Page"));
        assert_eq!(
            vec![
                "https://example.com/dir/b.html",
                "https://example.com/c.html",
                "https://other.org/",
            ],
            content.links.iter().map(Locator::as_str).collect::<Vec<_>>()
        );
    }

    #[test]
    fn base_overrides_the_page_url() {
        let page = r#"<html><head><base href="https://cdn.example.com/x/"></head><body><a href="y">Y</a></body></html>"#;
        let content = extract_html(page.as_bytes(), &metadata("https://example.com/"));
        assert_eq!(
            vec!["https://cdn.example.com/x/y"],
            content.links.iter().map(Locator::as_str).collect::<Vec<_>>()
        );
    }

    #[test]
    fn robots_nofollow_drops_all_links() {
        let page = r#"<html><head><meta name="robots" content="noindex nofollow"></head><body><a href="y">Y</a></body></html>"#;
        let content = extract_html(page.as_bytes(), &metadata("https://example.com/"));
        assert!(content.links.is_empty());
        assert_eq!("Y", content.text);
    }
}
