// SPDX-License-Identifier: MIT

//! Document loading and chunking
//!
//! - URLs (http/https) are fetched and stripped of markup
//! - `.pdf` files are rejected
//! - anything else is read as UTF-8 text

use crate::adk::error::{Result, TutorError};
use crate::adk::retriever::Chunk;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use url::Url;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// A loaded document before chunking
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    pub source: String,
}

/// Loads documents from files or web pages
pub struct DocumentLoader {
    client: Client,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Load a document, picking the strategy from the source string
    pub async fn load(&self, source: &str) -> Result<Document> {
        if let Some(url) = web_url(source) {
            return self.load_web(url).await;
        }

        let path = Path::new(source);
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            return Err(TutorError::loader(source, "PDF documents are not supported"));
        }

        log::info!("Loading text: {}", source);
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TutorError::loader(source, e.to_string()))?;
        Ok(Document {
            content,
            source: source.to_string(),
        })
    }

    async fn load_web(&self, url: Url) -> Result<Document> {
        log::info!("Loading web: {}", url);
        let resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(TutorError::loader(
                url.as_str(),
                format!("HTTP {}", resp.status()),
            ));
        }
        let html = resp.text().await?;
        Ok(Document {
            content: strip_markup(&html),
            source: url.to_string(),
        })
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn web_url(source: &str) -> Option<Url> {
    Url::parse(source)
        .ok()
        .filter(|u| u.scheme() == "http" || u.scheme() == "https")
}

/// Elements whose text never reaches the document
const SKIPPED: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that end a paragraph
const BLOCKS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "div", "section",
    "article", "header", "footer", "blockquote", "pre", "table", "tr", "br",
];

/// Page text with entities decoded, one paragraph per block element
fn strip_markup(html: &str) -> String {
    let document = Html::parse_document(html);
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut text = String::with_capacity(html.len());
    collect_text(body, &mut text);

    text.split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if SKIPPED.contains(&name) {
                continue;
            }
            let block = BLOCKS.contains(&name);
            if block {
                out.push_str("\n\n");
            }
            collect_text(child, out);
            if block {
                out.push_str("\n\n");
            }
        }
    }
}

/// Split documents on blank lines, packing paragraphs into chunks of at most
/// `max_chars` characters. A single paragraph longer than that is kept whole.
pub fn chunk_documents(docs: &[Document], max_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for doc in docs {
        let mut current = String::new();
        for paragraph in split_paragraphs(&doc.content) {
            if !current.is_empty() && current.len() + 2 + paragraph.len() > max_chars {
                chunks.push(Chunk::new(std::mem::take(&mut current), &doc.source));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&paragraph);
        }
        if !current.is_empty() {
            chunks.push(Chunk::new(current, &doc.source));
        }
    }

    log::info!(
        "Generated {} chunks from {} documents",
        chunks.len(),
        docs.len()
    );
    chunks
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}
