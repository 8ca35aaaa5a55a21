//! Fallback query reformulation for degraded core engines.
//!
//! When both core engines are being denied, the remaining engines answer
//! better to a broadened, retailer-anchored query: the original term ANDed
//! with a currency marker, ORed across known price-comparison sites, with
//! common noise paths (blogs, promos, "best-of" lists) negated. The
//! transformation is deterministic given the term.

use crate::types::SearchQuery;

/// Brazilian price-comparison and retail sites used as `site:` anchors.
const RETAILER_SITES: &[&str] = &[
    "zoom.com.br",
    "buscape.com.br",
    "mercadolivre.com.br",
    "magazineluiza.com.br",
    "americanas.com.br",
];

/// Currency marker that keeps results anchored on product/price pages.
const PRICE_MARKER: &str = "\"R$\"";

/// Negated noise paths: blog posts, promo landing pages, "best-of" lists.
const NOISE_FILTERS: &[&str] = &["-inurl:blog", "-inurl:promocao", "-intitle:melhores"];

/// Build the broadened fallback query for `term`.
///
/// The result is a new [`SearchQuery`] with no engine restriction — the
/// point is to lean on whichever engines are still healthy.
pub fn reformulate(term: &str) -> SearchQuery {
    let sites = RETAILER_SITES
        .iter()
        .map(|site| format!("site:{site}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    let noise = NOISE_FILTERS.join(" ");
    SearchQuery::new(format!("{term} {PRICE_MARKER} ({sites}) {noise}"))
}
