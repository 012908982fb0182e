//! Two-pass page publishing.
//!
//! A multi-page document needs every page to link to its neighbours, but a
//! page URL is only known once the page exists. Publishing therefore runs in
//! two strictly sequential passes:
//!
//! 1. **Create**: one page per part, in order. A failure is retried, waiting
//!    as long as the service asks (see [`crate::retry::hinted_or`]). Running
//!    out of attempts aborts the whole publish and reports how far it got.
//! 2. **Link**: each page is re-sent with its original content followed by
//!    a rule, a prev/next paragraph and a page index. A page that cannot be
//!    linked is recorded in the [`LinkReport`] and skipped: its content is
//!    already online, only the navigation is missing.
//!
//! Nothing runs in parallel here. The service rate-limits page creation per
//! account, and concurrency only converts into longer flood waits.

use crate::node::Node;
use crate::retry::{Pause, ThreadPause, hinted_or};
use crate::telegraph::{CreatedPage, RemotePublisher};
use std::time::Duration;
use thiserror::Error;

/// Shown on a page that would otherwise be empty (the service rejects those).
pub const EMPTY_PAGE_TEXT: &str = "(Empty Page)";
const PREV_LABEL: &str = "◀ Previous / 上一页";
const NEXT_LABEL: &str = "Next / 下一页 ▶";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(
        "Failed to publish Part {part}/{total} after {attempts} attempts: {message}\nSuccessfully published: {created} pages. First page: {}",
        first_url.as_deref().unwrap_or("none")
    )]
    CreateFailed {
        part: usize,
        total: usize,
        attempts: u32,
        created: usize,
        first_url: Option<String>,
        message: String,
    },
    #[error("nothing to publish")]
    NoContent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionPolicy {
    pub create_attempts: u32,
    pub link_attempts: u32,
    /// Wait after a create failure that carries no retry hint.
    pub create_fallback: Duration,
    /// Wait after an edit failure that carries no retry hint.
    pub link_fallback: Duration,
    pub between_creates: Duration,
    pub between_edits: Duration,
    /// Below this many pages the index lists every page; otherwise it shows
    /// `i / total`.
    pub full_index_below: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            create_attempts: 5,
            link_attempts: 3,
            create_fallback: Duration::from_secs(2),
            link_fallback: Duration::from_secs(1),
            between_creates: Duration::from_millis(500),
            between_edits: Duration::from_millis(300),
            full_index_below: 50,
        }
    }
}

/// A created page, with the content it was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedPage {
    pub path: String,
    pub url: String,
    pub title: String,
    pub content: Vec<Node>,
    pub part: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub linked: usize,
    pub failed_parts: Vec<usize>,
}

impl LinkReport {
    /// User-facing note when some pages lack navigation.
    pub fn failure_note(&self) -> Option<String> {
        if self.failed_parts.is_empty() {
            return None;
        }
        Some(format!(
            "Note: Navigation failed for parts: {:?}. Content is still accessible.",
            self.failed_parts
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    /// URL of the first page.
    pub url: String,
    pub pages: Vec<PublishedPage>,
    pub links: LinkReport,
}

/// `"{title} ({part}/{total})"` for multi-page documents, else `title`.
pub fn page_title(title: &str, part: usize, total: usize) -> String {
    if total > 1 {
        format!("{title} ({part}/{total})")
    } else {
        title.to_string()
    }
}

pub struct PublishSession<P: RemotePublisher> {
    publisher: P,
    pause: Box<dyn Pause>,
    policy: SessionPolicy,
}

impl<P: RemotePublisher> PublishSession<P> {
    pub fn new(publisher: P) -> Self {
        Self {
            publisher,
            pause: Box::new(ThreadPause),
            policy: SessionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pause(mut self, pause: Box<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Create and link one page per part; returns the first page's URL.
    pub fn publish_parts(
        &self,
        title: &str,
        parts: Vec<Vec<Node>>,
    ) -> Result<SessionOutcome, SessionError> {
        let pages = self.create_pages(title, parts)?;
        let url = pages
            .first()
            .map(|p| p.url.clone())
            .ok_or(SessionError::NoContent)?;
        let links = self.link_pages(&pages);
        Ok(SessionOutcome { url, pages, links })
    }

    /// Pass one: create every page, in order.
    pub fn create_pages(
        &self,
        title: &str,
        parts: Vec<Vec<Node>>,
    ) -> Result<Vec<PublishedPage>, SessionError> {
        let total = parts.len();
        let mut pages: Vec<PublishedPage> = Vec::with_capacity(total);

        for (i, content) in parts.into_iter().enumerate() {
            let part = i + 1;
            let page_title = page_title(title, part, total);
            let content = if content.is_empty() {
                vec![Node::paragraph(vec![Node::text(EMPTY_PAGE_TEXT)])]
            } else {
                content
            };

            tracing::info!(part, total, title = %page_title, "creating page");
            let created = self.create_with_retry(&page_title, &content, part, total, &pages)?;
            pages.push(PublishedPage {
                path: created.path,
                url: created.url,
                title: page_title,
                content,
                part,
            });

            if part < total {
                self.pause.pause(self.policy.between_creates);
            }
        }
        Ok(pages)
    }

    fn create_with_retry(
        &self,
        title: &str,
        content: &[Node],
        part: usize,
        total: usize,
        done: &[PublishedPage],
    ) -> Result<CreatedPage, SessionError> {
        let attempts = self.policy.create_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.publisher.create_page(title, content) {
                Ok(page) => return Ok(page),
                Err(e) => {
                    let message = e.to_string();
                    if attempt >= attempts {
                        return Err(SessionError::CreateFailed {
                            part,
                            total,
                            attempts,
                            created: done.len(),
                            first_url: done.first().map(|p| p.url.clone()),
                            message,
                        });
                    }
                    let wait = hinted_or(&message, self.policy.create_fallback);
                    tracing::warn!(part, attempt, wait_s = wait.as_secs_f64(), error = %message, "page creation failed, waiting");
                    self.pause.pause(wait);
                }
            }
        }
    }

    /// Pass two: append navigation to every page. No-op for a single page.
    pub fn link_pages(&self, pages: &[PublishedPage]) -> LinkReport {
        let mut report = LinkReport::default();
        if pages.len() <= 1 {
            return report;
        }

        for (i, page) in pages.iter().enumerate() {
            let mut content = page.content.clone();
            content.extend(navigation(pages, i, self.policy.full_index_below));

            match self.edit_with_retry(page, &content) {
                Ok(()) => {
                    report.linked += 1;
                    if i + 1 < pages.len() {
                        self.pause.pause(self.policy.between_edits);
                    }
                }
                Err(message) => {
                    tracing::warn!(part = page.part, error = %message, "failed to link page");
                    report.failed_parts.push(page.part);
                }
            }
        }
        report
    }

    fn edit_with_retry(&self, page: &PublishedPage, content: &[Node]) -> Result<(), String> {
        let attempts = self.policy.link_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.publisher.edit_page(&page.path, &page.title, content) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    let message = e.to_string();
                    if attempt >= attempts {
                        return Err(message);
                    }
                    self.pause
                        .pause(hinted_or(&message, self.policy.link_fallback));
                }
            }
        }
    }
}

/// Nodes appended to page `index`: a rule, prev/next links, and the index.
pub fn navigation(pages: &[PublishedPage], index: usize, full_index_below: usize) -> Vec<Node> {
    let mut nodes = vec![Node::hr()];
    let total = pages.len();

    let mut links = Vec::new();
    if index > 0 {
        links.push(Node::link(&pages[index - 1].url, PREV_LABEL));
    }
    if index + 1 < total {
        if !links.is_empty() {
            links.push(Node::text(" | "));
        }
        links.push(Node::link(&pages[index + 1].url, NEXT_LABEL));
    }
    if !links.is_empty() {
        nodes.push(Node::paragraph(links));
    }

    let current = &pages[index];
    let index_children = if total < full_index_below {
        let mut children = vec![Node::text("Pages: ")];
        for (i, page) in pages.iter().enumerate() {
            let label = format!("[{}]", page.part);
            if i == index {
                children.push(Node::bold(label));
            } else {
                children.push(Node::link(&page.url, label));
            }
            children.push(Node::text(" "));
        }
        children
    } else {
        vec![Node::text(format!("Pages: {} / {}", current.part, total))]
    };
    nodes.push(Node::paragraph(index_children));
    nodes
}
