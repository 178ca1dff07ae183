//! Built-in link previewer.
//!
//! Derives preview metadata from the first `http(s)://` URL in a message
//! without any network I/O. Title, description and image stay empty.

use async_trait::async_trait;

use crate::domain::{LinkPreview, LinkPreviewer};
use crate::shared::error::AppError;

#[derive(Debug, Default, Clone)]
pub struct UrlPreviewer;

impl UrlPreviewer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LinkPreviewer for UrlPreviewer {
    async fn preview(&self, content: &str) -> Result<Option<LinkPreview>, AppError> {
        Ok(first_url(content).and_then(|url| {
            let site = host_of(url)?;
            Some(LinkPreview {
                url: url.to_string(),
                site: site.to_string(),
                title: None,
                description: None,
                image: None,
            })
        }))
    }
}

/// First whitespace-delimited token starting with an http(s) scheme.
fn first_url(content: &str) -> Option<&str> {
    content
        .split_whitespace()
        .map(|token| token.trim_end_matches(|c: char| matches!(c, '.' | ',' | ')' | '!' | '?')))
        .find(|token| token.starts_with("https://") || token.starts_with("http://"))
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = host_port.split(':').next()?;
    (!host.is_empty()).then_some(host)
}
