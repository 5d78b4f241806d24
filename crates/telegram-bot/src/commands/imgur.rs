//! Image link extraction from imgur pages.

use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use scraper::{Html, Selector};

const ALBUM_SELECTOR: &str = ".album-view-image-link a";
const IMAGE_SELECTOR: &str = ".image a";

/// Fetch an imgur page and return the image URLs it links to.
pub async fn get_image_links_from_imgur(client: &Client, imgur_url: &str) -> Result<Vec<String>> {
    if !imgur_url.contains("imgur.com") {
        bail!("given URL does not appear to be an imgur URL");
    }
    if is_direct_link(imgur_url) {
        return extract_image_links(imgur_url, "");
    }

    let response = client.get(imgur_url).send().await?;
    if !response.status().is_success() {
        bail!("there was something wrong with the given URL");
    }
    let html = response.text().await?;
    extract_image_links(imgur_url, &html)
}

/// Image URLs in an imgur page: every image of an album, the URL itself for
/// a direct `i.imgur.com` link, or the single image of an image page.
pub fn extract_image_links(imgur_url: &str, html: &str) -> Result<Vec<String>> {
    let links = if imgur_url.contains("/a/") {
        hrefs(html, ALBUM_SELECTOR, usize::MAX)?
    } else if is_direct_link(imgur_url) {
        vec![imgur_url.to_string()]
    } else {
        hrefs(html, IMAGE_SELECTOR, 1)?
    };

    Ok(links.iter().map(|url| normalize(url)).collect())
}

/// `href` attributes of the elements matching `css`.
fn hrefs(html: &str, css: &str, limit: usize) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(css).map_err(|e| anyhow!("invalid selector {}: {:?}", css, e))?;

    let links: Vec<String> = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .take(limit)
        .map(str::to_string)
        .collect();
    Ok(links)
}

fn is_direct_link(url: &str) -> bool {
    url.contains("i.imgur.com") && !url.contains("/a/")
}

/// Protocol-relative and bare links get an explicit scheme.
fn normalize(url: &str) -> String {
    let url = url.trim_matches('/');
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}
