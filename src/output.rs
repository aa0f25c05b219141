//! Message output formats.
//!
//! Downloaded messages are written to stdout in one of three formats:
//!
//! - `json` - one JSON object per line
//! - `text` - `From {app}: {title} - {message}`, plus ` - URL: {url}` when set
//! - `template` - a user template with `{{.Field}}` placeholders
//!
//! Template field names match message fields case-insensitively with
//! underscores ignored, so `{{.Title}}`, `{{.URL}}` and `{{.DispatchedDate}}`
//! all resolve. Unknown fields are rejected when the template is compiled.

use std::io::Write;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::api::Message;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\.(\w+)\s*\}\}").expect("placeholder regex is valid")
});

/// Output format selected on the command line or in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per message.
    #[default]
    Json,
    /// Human-readable single line.
    Text,
    /// User-supplied template.
    Template,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "template" => Ok(Self::Template),
            other => anyhow::bail!("unknown output format: {other}"),
        }
    }
}

/// A parsed message template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
}

impl Template {
    /// Compile a template, rejecting unknown placeholders.
    pub fn parse(source: &str) -> Result<Self> {
        let blank = Message::default();
        for caps in PLACEHOLDER.captures_iter(source) {
            let name = &caps[1];
            if message_field(&blank, name).is_none() {
                anyhow::bail!("unknown template field: {name}");
            }
        }
        Ok(Self {
            source: source.to_string(),
        })
    }

    /// Render the template for one message.
    pub fn render(&self, message: &Message) -> String {
        PLACEHOLDER
            .replace_all(&self.source, |caps: &regex::Captures<'_>| {
                message_field(message, &caps[1]).unwrap_or_default()
            })
            .into_owned()
    }
}

/// Look up a message field by template name.
fn message_field(message: &Message, name: &str) -> Option<String> {
    let key: String = name
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let value = match key.as_str() {
        "id" => message.id.to_string(),
        "idstr" => message.id_str.clone(),
        "message" => message.message.clone(),
        "app" => message.app.clone(),
        "aid" => message.aid.to_string(),
        "aidstr" => message.aid_str.clone(),
        "icon" => message.icon.clone(),
        "date" => message.date.to_string(),
        "priority" => message.priority.to_string(),
        "acked" => message.acked.to_string(),
        "umid" => message.umid.to_string(),
        "umidstr" => message.umid_str.clone(),
        "title" => message.title.clone(),
        "dispatcheddate" => message.dispatched_date.to_string(),
        "url" => message.url.clone(),
        "queueddate" => message.queued_date.to_string(),
        _ => return None,
    };
    Some(value)
}

/// Writes messages in the selected format.
#[derive(Debug, Clone)]
pub enum Formatter {
    /// JSON lines.
    Json,
    /// Plain text lines.
    Text,
    /// User template, written as-is.
    Template(Template),
}

impl Formatter {
    /// Build a formatter. A template is required for [`OutputFormat::Template`].
    pub fn new(format: OutputFormat, template: Option<&str>) -> Result<Self> {
        match format {
            OutputFormat::Json => Ok(Self::Json),
            OutputFormat::Text => Ok(Self::Text),
            OutputFormat::Template => {
                let source = template
                    .filter(|t| !t.is_empty())
                    .context("template format requires --template")?;
                Ok(Self::Template(Template::parse(source)?))
            }
        }
    }

    /// Write one message.
    pub fn write_message(&self, out: &mut dyn Write, message: &Message) -> Result<()> {
        match self {
            Self::Json => {
                serde_json::to_writer(&mut *out, message).context("error encoding message")?;
                writeln!(out)?;
            }
            Self::Text => {
                write!(
                    out,
                    "From {}: {} - {}",
                    message.app, message.title, message.message
                )?;
                if !message.url.is_empty() {
                    write!(out, " - URL: {}", message.url)?;
                }
                writeln!(out)?;
            }
            Self::Template(template) => {
                out.write_all(template.render(message).as_bytes())?;
            }
        }
        Ok(())
    }

    /// Write every message in order, then flush.
    pub fn write_all(&self, out: &mut dyn Write, messages: &[Message]) -> Result<()> {
        for message in messages {
            self.write_message(out, message)?;
        }
        out.flush().context("error flushing output")?;
        Ok(())
    }
}
