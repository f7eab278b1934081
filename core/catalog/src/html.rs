//! Read-only query layer over a parsed HTML page.
//!
//! The listing scraper only needs a handful of operations: select by CSS
//! selector, look an element up by `id`, read an attribute, read the text
//! content, and walk to following siblings. They are implemented here once,
//! on top of the `scraper` crate, so that [`listing`](crate::listing) stays
//! independent of the parser.

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::errors::CatalogError;

/// A compiled CSS selector.
#[derive(Debug, Clone)]
pub struct Query(Selector);

impl Query {
    /// Compiles a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Config`] if the selector does not parse.
    /// Selectors come from configuration, so a bad one is a configuration
    /// problem rather than a fetch problem.
    pub fn new(css: &str) -> Result<Self, CatalogError> {
        Selector::parse(css)
            .map(Self)
            .map_err(|e| CatalogError::config(format!("invalid selector `{css}`: {e}")))
    }
}

/// A parsed HTML page together with the URL it was fetched from.
pub struct Document {
    html: Html,
    url: Url,
}

impl Document {
    /// Parses `body` as an HTML document fetched from `url`.
    ///
    /// HTML parsing is error tolerant, so this never fails.
    #[must_use]
    pub fn parse(body: &str, url: Url) -> Self {
        Self {
            html: Html::parse_document(body),
            url,
        }
    }

    /// Returns the URL this document was fetched from.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns every element matching `query`, in document order.
    #[must_use]
    pub fn select(&self, query: &Query) -> Vec<Node<'_>> {
        self.html.select(&query.0).map(Node).collect()
    }

    /// Returns the first element matching `query`.
    #[must_use]
    pub fn first(&self, query: &Query) -> Option<Node<'_>> {
        self.html.select(&query.0).next().map(Node)
    }

    /// Finds the element carrying `id="{id}"`.
    ///
    /// Done by a tree walk rather than a `#id` selector, because version
    /// labels may contain characters (such as `.`) that are not valid in a
    /// CSS identifier.
    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<Node<'_>> {
        self.html
            .tree
            .nodes()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().id() == Some(id))
            .map(Node)
    }

    /// Resolves a possibly relative `href` against the document URL.
    #[must_use]
    pub fn resolve(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        self.url.join(href).ok()
    }
}

/// An element inside a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    /// Returns every descendant matching `query`, in document order.
    #[must_use]
    pub fn select(&self, query: &Query) -> Vec<Node<'a>> {
        self.0.select(&query.0).map(Node).collect()
    }

    /// Returns the first descendant matching `query`.
    #[must_use]
    pub fn first(&self, query: &Query) -> Option<Node<'a>> {
        self.0.select(&query.0).next().map(Node)
    }

    /// Returns the value of attribute `name`, if present.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    /// Returns the element's `id` attribute, if present.
    #[must_use]
    pub fn id(&self) -> Option<&'a str> {
        self.0.value().id()
    }

    /// Returns the element's tag name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.0.value().name()
    }

    /// Returns the concatenated text content of the element and its descendants.
    #[must_use]
    pub fn text(&self) -> String {
        self.0.text().collect()
    }

    /// Iterates over the element siblings that follow this element.
    pub fn following_siblings(&self) -> impl Iterator<Item = Node<'a>> + use<'a> {
        self.0.next_siblings().filter_map(ElementRef::wrap).map(Node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <html><body>
          <ul class="tabs"><li><a href="#java21">JDK 21</a></li></ul>
          <div id="java21"><p>Section <b>twenty-one</b></p></div>
          <nav>skip</nav>
          <section id="v1.8"><table><tr><td>cell</td></tr></table></section>
        </body></html>
    "##;

    fn document() -> Document {
        let url = Url::parse("https://downloads.example.com/java/").expect("valid url");
        Document::parse(PAGE, url)
    }

    #[test]
    fn query_rejects_invalid_selector() {
        let result = Query::new("ul[");
        assert!(matches!(result, Err(CatalogError::Config { .. })));
    }

    #[test]
    fn select_and_attr_read_anchor() {
        let doc = document();
        let anchors = doc.select(&Query::new("ul.tabs a").expect("selector"));
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].attr("href"), Some("#java21"));
        assert_eq!(anchors[0].attr("title"), None);
        assert_eq!(anchors[0].name(), "a");
    }

    #[test]
    fn text_concatenates_descendants() {
        let doc = document();
        let section = doc.element_by_id("java21").expect("section");
        assert_eq!(section.text(), "Section twenty-one");
    }

    #[test]
    fn element_by_id_handles_dotted_ids() {
        let doc = document();
        let section = doc.element_by_id("v1.8").expect("section");
        assert_eq!(section.id(), Some("v1.8"));
        assert!(section.first(&Query::new("table").expect("selector")).is_some());
        assert!(doc.element_by_id("v9").is_none());
    }

    #[test]
    fn following_siblings_skip_text_nodes() {
        let doc = document();
        let section = doc.element_by_id("java21").expect("section");
        let names: Vec<&str> = section.following_siblings().map(|n| n.name()).collect();
        assert_eq!(names, vec!["nav", "section"]);
    }

    #[test]
    fn following_siblings_cross_text_between_elements() {
        let url = Url::parse("https://downloads.example.com/java/").expect("valid url");
        let doc = Document::parse(
            "<div><h3 id=\"java8\">JDK 8</h3>loose text<!-- note -->\n  <p>intro</p> more text <table><tbody><tr><td>row</td></tr></tbody></table></div>",
            url,
        );
        let heading = doc.element_by_id("java8").expect("heading");
        let siblings: Vec<Node<'_>> = heading.following_siblings().collect();
        let names: Vec<&str> = siblings.iter().map(Node::name).collect();
        assert_eq!(names, vec!["p", "table"]);
        assert_eq!(siblings[1].text(), "row");
    }

    #[test]
    fn resolve_joins_relative_links() {
        let doc = document();
        assert_eq!(
            doc.resolve("/otn/jdk-21_linux-x64_bin.tar.gz")
                .expect("resolved")
                .as_str(),
            "https://downloads.example.com/otn/jdk-21_linux-x64_bin.tar.gz"
        );
        assert_eq!(
            doc.resolve("https://cdn.example.org/a.zip")
                .expect("resolved")
                .as_str(),
            "https://cdn.example.org/a.zip"
        );
        assert!(doc.resolve("   ").is_none());
    }
}
