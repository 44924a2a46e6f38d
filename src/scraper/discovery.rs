// discovery.rs
//
// Structural assumptions about the results page live here and nowhere else.
use crate::scraper::ParseError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

pub const PAGINATION_SELECTOR: &str = r#"ul[data-cy="nexus-pagination-component"]"#;
// The site renders page numbers as buttons on some pages and anchors on others.
const PAGE_ENTRY_SELECTOR: &str = "li button, li a";
const LISTING_LINK_SELECTOR: &str = r#"a[data-cy="listing-item-link"]"#;

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(e.to_string()))
}

/// Highest page number in the pagination control, or 1 when there is none.
pub fn max_page_count(html: &str) -> Result<u32, ParseError> {
    let document = Html::parse_document(html);
    let container_sel = selector(PAGINATION_SELECTOR)?;
    let entry_sel = selector(PAGE_ENTRY_SELECTOR)?;

    let Some(container) = document.select(&container_sel).next() else {
        return Ok(1);
    };

    let max = container
        .select(&entry_sel)
        .filter_map(|el| {
            let text: String = el.text().collect();
            let text = text.trim();
            if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
                text.parse::<u32>().ok()
            } else {
                None
            }
        })
        .max()
        .unwrap_or(1);

    Ok(max.max(1))
}

/// Absolute URLs of every listing on a results page.
pub fn extract_links(html: &str, origin: &Url) -> Result<HashSet<String>, ParseError> {
    let document = Html::parse_document(html);
    let link_sel = selector(LISTING_LINK_SELECTOR)?;

    let links = document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| origin.join(href).ok())
        .map(String::from)
        .collect();

    Ok(links)
}

/// `base?page=N`, or `base&page=N` when the base already carries a query.
pub fn page_url(base: &str, page: u32) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}page={page}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://www.otodom.pl").unwrap()
    }

    #[test]
    fn no_pagination_means_single_page() {
        let html = "<html><body><div>3 wyniki</div></body></html>";
        assert_eq!(max_page_count(html).unwrap(), 1);
    }

    #[test]
    fn last_page_shortcut_wins() {
        let html = r#"
            <ul data-cy="nexus-pagination-component">
              <li><button aria-label="previous">&lt;</button></li>
              <li><a href="?page=1">1</a></li>
              <li><button>2</button></li>
              <li><a href="?page=3"> 3 </a></li>
              <li><span>...</span></li>
              <li><a href="?page=5">5</a></li>
              <li><a href="?page=2">następna</a></li>
            </ul>"#;
        assert_eq!(max_page_count(html).unwrap(), 5);
    }

    #[test]
    fn pagination_without_numbers_is_one_page() {
        let html = r#"<ul data-cy="nexus-pagination-component"><li><button>dalej</button></li></ul>"#;
        assert_eq!(max_page_count(html).unwrap(), 1);
    }

    #[test]
    fn numbers_outside_the_control_are_ignored() {
        let html = r#"
            <ul data-cy="nexus-pagination-component"><li><a>1</a></li><li><a>2</a></li></ul>
            <ul><li><a>99</a></li></ul>"#;
        assert_eq!(max_page_count(html).unwrap(), 2);
    }

    #[test]
    fn links_are_resolved_and_deduplicated() {
        let html = r#"
            <a data-cy="listing-item-link" href="/pl/oferta/a-ID1">A</a>
            <a data-cy="listing-item-link" href="/pl/oferta/a-ID1">A again</a>
            <a data-cy="listing-item-link" href="https://www.otodom.pl/pl/oferta/b-ID2">B</a>
            <a data-cy="listing-item-link">no href</a>
            <a href="/pl/oferta/c-ID3">not a listing</a>"#;
        let links = extract_links(html, &origin()).unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.contains("https://www.otodom.pl/pl/oferta/a-ID1"));
        assert!(links.contains("https://www.otodom.pl/pl/oferta/b-ID2"));
    }

    #[test]
    fn page_url_respects_existing_query() {
        assert_eq!(page_url("https://x.pl/wola", 2), "https://x.pl/wola?page=2");
        assert_eq!(page_url("https://x.pl/wola?limit=72", 3), "https://x.pl/wola?limit=72&page=3");
    }
}
