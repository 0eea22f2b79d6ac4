use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

pub const BOARD: &str = "board.html";
pub const ISSUE_BODY: &str = "issue-body.md";
pub const CHAT_MESSAGE: &str = "chat-message.txt";
pub const EMAIL_BODY: &str = "email-body.txt";

const DEFAULTS: &[(&str, &str)] = &[
    (BOARD, include_str!("default_templates/board.html")),
    (ISSUE_BODY, include_str!("default_templates/issue-body.md")),
    (CHAT_MESSAGE, include_str!("default_templates/chat-message.txt")),
    (EMAIL_BODY, include_str!("default_templates/email-body.txt")),
];

/// Markup and message templates, embedded defaults with optional overrides.
pub struct Templates {
    engine: upon::Engine<'static>,
}

impl Templates {
    /// Compile every template. A file named like a default inside
    /// `override_dir` replaces that default.
    pub fn new(override_dir: Option<&Path>) -> Result<Self> {
        let mut engine = upon::Engine::new();
        for (name, default) in DEFAULTS {
            let source = match override_dir.map(|dir| dir.join(name)) {
                Some(path) if path.exists() => {
                    debug!(path = %path.display(), "using template override");
                    std::fs::read_to_string(&path).map_err(|e| {
                        Error::Render(format!(
                            "failed to read override template {}: {e}",
                            path.display()
                        ))
                    })?
                }
                _ => default.to_string(),
            };
            engine
                .add_template(*name, source)
                .map_err(|e| Error::Render(format!("invalid template {name}: {e}")))?;
        }
        Ok(Self { engine })
    }

    pub fn render<C: Serialize>(&self, name: &str, ctx: C) -> Result<String> {
        self.engine
            .template(name)
            .render(ctx)
            .to_string()
            .map_err(|e| Error::Render(format!("failed to render {name}: {e}")))
    }
}

/// Escape text for HTML element content and attribute values.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
