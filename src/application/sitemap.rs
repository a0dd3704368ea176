//! sitemap.xml and robots.txt generation for the blog section.

use time::format_description::well_known::Rfc3339;
use url::Url;

use crate::domain::entities::SitemapEntry;

const BLOG_PREFIX: &str = "/blog/";

/// Render a sitemap listing the blog index followed by every post.
pub fn render_sitemap_xml(public_site_url: &Url, entries: &[SitemapEntry]) -> String {
    let base = normalize_public_site_url(public_site_url);

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    xml.push_str(&format!(
        "  <url><loc>{}</loc></url>\n",
        escape_xml(&canonical_url(&base, "/blog"))
    ));
    for entry in entries {
        xml.push_str(&sitemap_entry(&base, entry));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn render_robots_txt(public_site_url: &Url) -> String {
    let base = normalize_public_site_url(public_site_url);
    let sitemap_url = format!("{base}sitemap.xml");
    format!("User-agent: *\nAllow: /\nSitemap: {sitemap_url}\n")
}

fn normalize_public_site_url(url: &Url) -> String {
    let trimmed = url.as_str().trim_end_matches('/');
    format!("{trimmed}/")
}

fn sitemap_entry(base: &str, entry: &SitemapEntry) -> String {
    let loc = escape_xml(&canonical_url(
        base,
        &format!("{BLOG_PREFIX}{}", entry.slug),
    ));
    let lastmod = entry
        .last_modified
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .map(|formatted| format!("<lastmod>{formatted}</lastmod>"))
        .unwrap_or_default();

    format!(
        "  <url><loc>{loc}</loc>{lastmod}<changefreq>{}</changefreq><priority>{:.1}</priority></url>\n",
        entry.change_frequency.as_str(),
        entry.priority
    )
}

fn canonical_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path == "/" {
        base.to_string()
    } else {
        format!("{base}{path}")
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
