use std::io::Write;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Where a submitted review is sent for moderation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Pre-filled issue-creation page
    Github,
    /// Chat deep link with the message as text
    Whatsapp,
    /// `mailto:` link with subject and body
    Email,
}

/// A URL that opens an external application pre-filled with data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pub channel: Channel,
    pub url: String,
}

pub fn issue_link(
    web_base: &str,
    owner: &str,
    repo: &str,
    title: &str,
    body: &str,
    label: &str,
) -> DeepLink {
    DeepLink {
        channel: Channel::Github,
        url: format!(
            "{}/{owner}/{repo}/issues/new?title={}&body={}&labels={}",
            web_base.trim_end_matches('/'),
            urlencoding::encode(title),
            urlencoding::encode(body),
            urlencoding::encode(label),
        ),
    }
}

pub fn whatsapp_link(number: &str, text: &str) -> DeepLink {
    DeepLink {
        channel: Channel::Whatsapp,
        url: format!("https://wa.me/{number}?text={}", urlencoding::encode(text)),
    }
}

pub fn mailto_link(address: &str, subject: &str, body: &str) -> DeepLink {
    DeepLink {
        channel: Channel::Email,
        url: format!(
            "mailto:{address}?subject={}&body={}",
            urlencoding::encode(subject),
            urlencoding::encode(body)
        ),
    }
}

/// Opens deep links. Opening is fire-and-forget: nothing reports whether the
/// external application acted on the link.
pub trait Navigator {
    fn open(&self, url: &str) -> Result<()>;
}

/// Hands the URL to an external opener program (`xdg-open`, `open`, ...).
pub struct CommandNavigator {
    program: String,
}

impl CommandNavigator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Navigator for CommandNavigator {
    fn open(&self, url: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .arg(url)
            .status()
            .map_err(|e| Error::Navigation(format!("failed to run {}: {e}", self.program)))?;
        if !status.success() {
            return Err(Error::Navigation(format!(
                "{} exited with {status}",
                self.program
            )));
        }
        Ok(())
    }
}

/// Writes each URL on its own line instead of opening it.
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn open(&self, url: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{url}")?;
        Ok(())
    }
}

/// Open links in order, pausing between consecutive openings so the second
/// navigation is not dropped. Failures are logged and skipped.
pub async fn open_all<N: Navigator + ?Sized>(
    navigator: &N,
    links: &[DeepLink],
    delay: Duration,
) -> usize {
    let mut opened = 0;
    for (i, link) in links.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            debug!(?delay, "waiting before next deep link");
            tokio::time::sleep(delay).await;
        }
        match navigator.open(&link.url) {
            Ok(()) => {
                info!(channel = ?link.channel, "opened deep link");
                opened += 1;
            }
            Err(e) => warn!(channel = ?link.channel, error = %e, "failed to open deep link"),
        }
    }
    opened
}
