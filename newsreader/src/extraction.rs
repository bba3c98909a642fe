//! Heuristic article extraction from raw HTML.
//!
//! Every field is resolved by walking an ordered list of CSS selectors. The
//! lists live in [`ExtractionRules`] so they can be tuned from configuration
//! and exercised against fixture pages without touching the network.

use anyhow::{anyhow, Result};
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use common::ExtractionConfig;

/// Structured result of a successful extraction. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub url: String,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub meta_description: Option<String>,
}

impl ArticleRecord {
    /// Number of whitespace-delimited tokens in the content.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("article content too short ({length} chars, need at least {minimum})")]
    ContentTooShort { length: usize, minimum: usize },
}

/// Ordered selector lists driving the extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRules {
    pub title_selectors: Vec<String>,
    /// Elements removed from the working copy before looking for body text
    pub strip_selectors: Vec<String>,
    /// Candidate containers; the longest text among all matches wins
    pub content_selectors: Vec<String>,
    pub author_selectors: Vec<String>,
    pub date_selectors: Vec<String>,
    pub min_content_chars: usize,
    pub fallback_title: String,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            title_selectors: owned(&["h1", r#"[class*="title"]"#, r#"[class*="headline"]"#, "title"]),
            strip_selectors: owned(&[
                "script",
                "style",
                "nav",
                "header",
                "footer",
                "aside",
                "advertisement",
                "iframe",
            ]),
            content_selectors: owned(&[
                r#"[class*="content"]"#,
                r#"[class*="article"]"#,
                r#"[class*="story"]"#,
                r#"[class*="post"]"#,
                "main",
                ".entry-content",
                "#content",
                "article",
                ".post-content",
                ".story-body",
                ".article-body",
            ]),
            author_selectors: owned(&[
                r#"[class*="author"]"#,
                r#"[class*="byline"]"#,
                r#"[rel="author"]"#,
                ".writer",
                ".journalist",
            ]),
            date_selectors: owned(&[r#"[class*="date"]"#, r#"[class*="time"]"#, "time", "[datetime]"]),
            min_content_chars: 100,
            fallback_title: "Untitled Article".to_string(),
        }
    }
}

impl ExtractionRules {
    /// Defaults overlaid with whatever the `[extraction]` section sets.
    pub fn from_config(cfg: Option<&ExtractionConfig>) -> Self {
        let mut rules = Self::default();
        let Some(cfg) = cfg else {
            return rules;
        };
        if let Some(list) = &cfg.title_selectors {
            rules.title_selectors = list.clone();
        }
        if let Some(list) = &cfg.strip_selectors {
            rules.strip_selectors = list.clone();
        }
        if let Some(list) = &cfg.content_selectors {
            rules.content_selectors = list.clone();
        }
        if let Some(list) = &cfg.author_selectors {
            rules.author_selectors = list.clone();
        }
        if let Some(list) = &cfg.date_selectors {
            rules.date_selectors = list.clone();
        }
        if let Some(min) = cfg.min_content_chars {
            rules.min_content_chars = min;
        }
        if let Some(title) = &cfg.fallback_title {
            rules.fallback_title = title.clone();
        }
        rules
    }
}

/// Compiled form of [`ExtractionRules`]. Cheap to share, pure to call.
#[derive(Debug, Clone)]
pub struct Extractor {
    title: Vec<Selector>,
    strip: Vec<Selector>,
    content: Vec<Selector>,
    author: Vec<Selector>,
    date: Vec<Selector>,
    paragraph: Selector,
    body: Selector,
    meta_description: Selector,
    min_content_chars: usize,
    fallback_title: String,
}

fn compile(list: &[String]) -> Result<Vec<Selector>> {
    list.iter().map(|s| parse_selector(s)).collect()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow!("invalid selector '{}': {:?}", s, e))
}

impl Extractor {
    pub fn new(rules: &ExtractionRules) -> Result<Self> {
        Ok(Self {
            title: compile(&rules.title_selectors)?,
            strip: compile(&rules.strip_selectors)?,
            content: compile(&rules.content_selectors)?,
            author: compile(&rules.author_selectors)?,
            date: compile(&rules.date_selectors)?,
            paragraph: parse_selector("p")?,
            body: parse_selector("body")?,
            meta_description: parse_selector(r#"meta[name="description"]"#)?,
            min_content_chars: rules.min_content_chars,
            fallback_title: rules.fallback_title.clone(),
        })
    }

    /// Derive an [`ArticleRecord`] from a page.
    pub fn extract(&self, url: &str, html: &str) -> Result<ArticleRecord, ExtractError> {
        let document = Html::parse_document(html);

        let content = self.extract_content(&document);
        let length = content.chars().count();
        if length < self.min_content_chars {
            return Err(ExtractError::ContentTooShort {
                length,
                minimum: self.min_content_chars,
            });
        }

        Ok(ArticleRecord {
            url: url.to_string(),
            title: self.extract_title(&document),
            content,
            author: self.extract_author(&document),
            published_date: self.extract_date(&document),
            meta_description: self.extract_meta_description(&document),
        })
    }

    fn extract_title(&self, document: &Html) -> String {
        self.title
            .iter()
            .filter_map(|sel| document.select(sel).next())
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| self.fallback_title.clone())
    }

    fn extract_content(&self, document: &Html) -> String {
        let mut working = document.clone();
        let doomed: Vec<NodeId> = self
            .strip
            .iter()
            .flat_map(|sel| working.select(sel).map(|el| el.id()).collect::<Vec<_>>())
            .collect();
        for id in doomed {
            if let Some(mut node) = working.tree.get_mut(id) {
                node.detach();
            }
        }

        // Greedy: every match of every selector competes on length.
        let mut best = String::new();
        let mut best_len = 0;
        for sel in &self.content {
            for el in working.select(sel) {
                let text = element_text(&el);
                let len = text.chars().count();
                if len > best_len {
                    best = text;
                    best_len = len;
                }
            }
        }

        if best.is_empty() {
            best = working
                .select(&self.paragraph)
                .map(|p| element_text(&p))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if !best.is_empty() {
                debug!("extraction: no container matched, using paragraph fallback");
            }
        }

        if best.is_empty() {
            if let Some(body) = working.select(&self.body).next() {
                best = element_text(&body);
                debug!("extraction: falling back to body text");
            }
        }

        normalize_whitespace(&best)
    }

    fn extract_author(&self, document: &Html) -> Option<String> {
        self.author
            .iter()
            .filter_map(|sel| document.select(sel).next())
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty())
    }

    fn extract_date(&self, document: &Html) -> Option<String> {
        self.date
            .iter()
            .filter_map(|sel| document.select(sel).next())
            .map(|el| {
                el.value()
                    .attr("datetime")
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| element_text(&el))
            })
            .find(|date| !date.is_empty())
    }

    fn extract_meta_description(&self, document: &Html) -> Option<String> {
        document
            .select(&self.meta_description)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Collapse every whitespace run, newlines included, into a single space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
