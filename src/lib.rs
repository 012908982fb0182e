//! # telepress
//!
//! Publish text, single images and zipped image galleries to Telegraph.
//!
//! # Architecture: Upload, Create, Link
//!
//! Every publish follows the same shape:
//!
//! ```text
//! 1. Prepare   text → chunks → nodes        images → compress → host URLs
//! 2. Create    one page per part, strictly in order, retrying on flood waits
//! 3. Link      re-send each page with prev/next navigation and a page index
//! ```
//!
//! Page URLs only exist after creation, so linking is a second pass. A
//! failure in pass 2 costs navigation, never content; a failure in pass 1
//! aborts and reports how many pages made it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`publish`] | Entry points: routes a file to the text, image or gallery pipeline |
//! | [`server`] | HTTP API over the same entry points (`telepress serve`) |
//! | [`session`] | Two-pass page creation and linking with retry |
//! | [`upload`] | Per-image compression and retry; parallel batches on a rayon pool |
//! | [`host`] | `ImageHost` trait and the directory, rclone and custom HTTP backends |
//! | [`imaging`] | Quality and scale ladders that shrink an image under a byte budget |
//! | [`telegraph`] | `RemotePublisher` trait and the Telegraph API client |
//! | [`convert`] | Markdown or plain text to Telegraph nodes |
//! | [`node`] | The Telegraph content tree |
//! | [`chunk`] | Splitting text into page-sized parts on natural boundaries |
//! | [`cache`] | Content fingerprints and the persisted duplicate cache |
//! | [`archive`] | Zip extraction with traversal checks; image collection |
//! | [`naming`] | Natural filename ordering |
//! | [`retry`] | Backoff, jitter, retry hints and the `Pause` seam |
//! | [`config`] | Layered TOML and environment configuration |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Synchronous Pipeline
//!
//! Uploads run on a bounded rayon pool with a blocking HTTP client, and page
//! creation is sequential because the service rate-limits it per account.
//! Only [`server`] runs a tokio runtime, and it hands each publish to the
//! blocking pool.
//!
//! ## Seams as Traits
//!
//! The image host, the page service, the text converter, the cache store and
//! even sleeping ([`retry::Pause`]) are traits. Tests drive the whole
//! pipeline with recording doubles and never touch the network or wait.

pub mod archive;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod convert;
pub mod host;
pub mod imaging;
pub mod naming;
pub mod node;
pub mod output;
pub mod publish;
pub mod retry;
pub mod server;
pub mod session;
pub mod telegraph;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
