//! Output routing: console versus append-only redirect destinations.
//!
//! Redirect destinations are opened, written, and closed per message. A
//! failed append is logged and the line dropped; the reactor never dies on
//! an unwritable destination.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use wowtty_sdk::packet::Packet;
use wowtty_sdk::types::ChatMessage;

use crate::options::{Options, DEFAULT_TIME_FORMAT};

pub struct OutputRouter {
    console: Box<dyn Write + Send>,
}

impl OutputRouter {
    pub fn stdout() -> Self {
        Self { console: Box::new(std::io::stdout()) }
    }

    /// Route console output somewhere else (tests, future curses frontend).
    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self { console: sink }
    }

    /// Plain console line.
    pub fn print(&mut self, text: &str) {
        if writeln!(self.console, "{text}").is_err() {
            tracing::warn!("console write failed");
        }
        let _ = self.console.flush();
    }

    /// Timestamped console line.
    pub fn info(&mut self, opts: &Options, text: &str) {
        let line = format!("{} {}", timestamp(opts), text);
        self.print(&line);
    }

    /// Route one chat message. Redirect-table hits go to their destinations
    /// and never to the console; otherwise the console, except addon-language
    /// traffic which is suppressed there.
    pub fn chat(&mut self, opts: &Options, msg: &ChatMessage) {
        let line = format!("{} {}", timestamp(opts), format_message(opts, msg));
        if let Some(dests) = opts.redirects.get(&msg.routing_key()) {
            for dest in dests {
                append_line(dest, &line);
            }
        } else if !msg.language.is_addon() {
            self.print(&line);
        }
    }

    pub fn notify(&mut self, opts: &Options, text: &str) {
        let line = format!("{} <Notification> {}", timestamp(opts), text);
        match &opts.notify_redirect {
            Some(dest) => append_line(dest, &line),
            None => self.print(&line),
        }
    }

    /// Packet trace dump. Gating on the verbose flag and per-opcode
    /// overrides happens in the orchestrator; this only resolves the sink.
    pub fn trace(&mut self, opts: &Options, direction: &str, pk: &Packet) {
        let mut text = format!("{direction} {pk}\n");
        text.push_str(&pk.hexdump());
        let text = text.trim_end();
        match &opts.verbose_redirect {
            Some(dest) => append_line(dest, text),
            None => self.print(text),
        }
    }
}

fn append_line(path: &Path, line: &str) {
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| writeln!(file, "{line}"));
    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "redirect write failed, line dropped");
    }
}

fn timestamp(opts: &Options) -> String {
    let now = Local::now();
    let mut out = String::new();
    if write!(out, "{}", now.format(&opts.time_format)).is_err() {
        // bad strftime string from the operator; fall back to the default
        return now.format(DEFAULT_TIME_FORMAT).to_string();
    }
    out
}

/// Render a message with the operator's template, or the default rendering.
pub fn format_message(opts: &Options, msg: &ChatMessage) -> String {
    match &opts.message_format {
        Some(template) => expand_template(template, msg),
        None => sanitize_text(&msg.to_string()),
    }
}

fn expand_template(template: &str, msg: &ChatMessage) -> String {
    let mut out = String::with_capacity(template.len() + msg.text.len());
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push_str(msg.kind.tag()),
            Some('T') => {
                let _ = write!(out, "{}", msg.kind.as_u8());
            }
            Some('s') => out.push_str(msg.sender_name.as_deref().unwrap_or("Unknown")),
            Some('g') => {
                let _ = write!(out, "{}", msg.sender);
            }
            Some('S') => out.push(':'),
            Some('m') => out.push_str(&sanitize_text(&msg.text)),
            Some('M') => out.push_str(&msg.text),
            Some('l') => out.push_str(msg.language.name()),
            Some('r') => out.push_str(msg.target.as_deref().unwrap_or("")),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Strip terminal control characters so remote players cannot inject
/// escape sequences into the operator's terminal.
pub fn sanitize_text(s: &str) -> String {
    s.chars()
        .filter(|&c| c == '\n' || c == '\t' || (c >= ' ' && c != '\x7f'))
        .collect()
}
