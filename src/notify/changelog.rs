//! Changelog manifest and its text rendering.
//!
//! A manifest is a versioned list of blocks:
//! ```json
//! { "id": "2024-03-01", "date": "2024-03-01",
//!   "contents": [ { "type": "HEADER", "text": "Fixed", "color": "RED" },
//!                 { "text": "Paragraph", "list": ["item", "item"] } ] }
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Underline placed below every header.
const HEADER_RULE: &str = "======================";

/// Locale of the rendered document.
pub const CHANGELOG_LOCALE: &str = "en-us";

/// Header colors and the semantic class each one maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangelogColor {
    Green,
    Orange,
    Red,
    Blurple,
}

impl ChangelogColor {
    pub fn class(&self) -> &'static str {
        match self {
            ChangelogColor::Green => "added",
            ChangelogColor::Orange => "progress",
            ChangelogColor::Red => "fixed",
            ChangelogColor::Blurple => "improved",
        }
    }
}

/// One block of a changelog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawBlock")]
pub enum ChangelogBlock {
    Header {
        text: String,
        color: ChangelogColor,
        no_margin: bool,
    },
    Body {
        text: Option<String>,
        list: Option<Vec<String>>,
    },
}

/// Wire shape of a block: headers are tagged, bodies are not.
#[derive(Deserialize)]
struct RawBlock {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
    color: Option<ChangelogColor>,
    #[serde(rename = "noMargin", default)]
    no_margin: bool,
    list: Option<Vec<String>>,
}

impl TryFrom<RawBlock> for ChangelogBlock {
    type Error = String;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        if raw.kind.as_deref() == Some("HEADER") {
            let text = raw.text.ok_or("HEADER block without text")?;
            let color = raw.color.ok_or("HEADER block without color")?;
            return Ok(ChangelogBlock::Header {
                text,
                color,
                no_margin: raw.no_margin,
            });
        }
        Ok(ChangelogBlock::Body {
            text: raw.text,
            list: raw.list,
        })
    }
}

/// A versioned changelog manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangelogDocument {
    pub id: String,
    pub date: String,
    pub contents: Vec<ChangelogBlock>,
}

impl ChangelogDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read changelog from {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse changelog from {}", path.display()))
    }

    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the manifest into a single formatted document.
    pub fn render(&self) -> RenderedChangelog {
        let mut body = String::new();

        for block in &self.contents {
            match block {
                ChangelogBlock::Header {
                    text,
                    color,
                    no_margin,
                } => {
                    body.push_str(&text.to_uppercase());
                    body.push_str(" {");
                    body.push_str(color.class());
                    if *no_margin {
                        body.push_str(" marginTop");
                    }
                    body.push_str("}\n");
                    body.push_str(HEADER_RULE);
                    body.push_str("\n\n");
                }
                ChangelogBlock::Body { text, list } => {
                    if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                        body.push_str(text);
                        body.push_str("\n\n");
                    }
                    if let Some(list) = list {
                        body.push_str(" * ");
                        body.push_str(&list.join("\n\n * "));
                        body.push_str("\n\n");
                    }
                }
            }
        }

        RenderedChangelog {
            date: self.date.clone(),
            locale: CHANGELOG_LOCALE.to_string(),
            revision: 1,
            body,
        }
    }
}

/// Rendered changelog handed to the presenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedChangelog {
    pub date: String,
    pub locale: String,
    pub revision: u32,
    pub body: String,
}

/// Shows a rendered changelog; resolves once the user dismissed it.
#[async_trait]
pub trait ChangelogPresenter: Send + Sync {
    async fn present(&self, changelog: &RenderedChangelog) -> Result<()>;
}
