//! CLI surface and runtime options.
//!
//! Everything here is resolved once at startup. The only field mutated
//! afterwards is `verbose`, which the `/verbose` slash command toggles.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

pub const DEFAULT_HOST: &str = "logon.hellground.net";
pub const DEFAULT_PORT: u16 = 3724;
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Parser)]
#[command(name = "wowtty", about = "Console chat client for HellGround-style game servers")]
pub struct Cli {
    /// Connection shorthand: user[:password]@host[:port][/character]
    pub conninfo: Option<String>,

    /// Host name
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port number
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Account name
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Account password
    #[arg(short = 'P', long)]
    pub pass: Option<String>,

    /// Character to use on login
    #[arg(short = 'c', long = "char")]
    pub character: Option<String>,

    /// Channels to join after login
    #[arg(short = 'j', long = "join", value_name = "chan1,chan2,...", value_delimiter = ',')]
    pub chans: Option<Vec<String>>,

    /// Output packet traces
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Redirect a channel or message type to a file (repeatable)
    #[arg(short = 'r', long = "redirect", value_name = "KEY:PATH")]
    pub redirects: Vec<String>,

    /// Append notifications to a file instead of the console
    #[arg(long, value_name = "PATH")]
    pub notify_redirect: Option<PathBuf>,

    /// Append packet traces to a file instead of the console
    #[arg(long, value_name = "PATH")]
    pub verbose_redirect: Option<PathBuf>,

    /// Timestamp format (strftime)
    #[arg(short = 't', long, default_value = DEFAULT_TIME_FORMAT)]
    pub time_format: String,

    /// Message template: %t type, %T raw type, %s sender, %g sender id,
    /// %S separator, %m text, %M raw text, %l language, %r recipient
    #[arg(short = 'f', long)]
    pub format: Option<String>,
}

/// Resolved runtime options.
#[derive(Debug, Clone)]
pub struct Options {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub character: Option<String>,
    pub chans: Vec<String>,
    pub verbose: bool,
    pub time_format: String,
    pub message_format: Option<String>,
    /// Redirect key (lowercased channel name or type tag) to destinations,
    /// in registration order.
    pub redirects: HashMap<String, Vec<PathBuf>>,
    pub notify_redirect: Option<PathBuf>,
    pub verbose_redirect: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: None,
            pass: None,
            character: None,
            chans: vec!["world".to_string()],
            verbose: false,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            message_format: None,
            redirects: HashMap::new(),
            notify_redirect: None,
            verbose_redirect: None,
        }
    }
}

/// Fields parsed out of the `user[:password]@host[:port][/character]` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnInfo {
    pub user: String,
    pub pass: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub character: Option<String>,
}

/// Parse the connection shorthand. Errors abort startup before any
/// connection attempt.
pub fn parse_conninfo(input: &str) -> Result<ConnInfo> {
    let Some((creds, rest)) = input.split_once('@') else {
        bail!("connection info '{input}' is missing '@'");
    };
    let (user, pass) = match creds.split_once(':') {
        Some((user, pass)) => (user, Some(pass.to_string())),
        None => (creds, None),
    };
    if user.is_empty() {
        bail!("connection info '{input}' has an empty user");
    }

    let (hostport, character) = match rest.split_once('/') {
        Some((hostport, character)) => {
            if character.is_empty() {
                bail!("connection info '{input}' has an empty character");
            }
            (hostport, Some(character.to_string()))
        }
        None => (rest, None),
    };

    let (host, port) = match hostport.split_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("bad port '{port}' in connection info"))?;
            (host, Some(port))
        }
        None => (hostport, None),
    };
    if host.is_empty() {
        bail!("connection info '{input}' has an empty host");
    }

    Ok(ConnInfo {
        user: user.to_string(),
        pass,
        host: host.to_string(),
        port,
        character,
    })
}

impl Options {
    /// Resolve: specific flags win; shorthand fields fill the gaps;
    /// defaults last.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let shorthand = match &cli.conninfo {
            Some(raw) => Some(parse_conninfo(raw)?),
            None => None,
        };
        let mut redirects: HashMap<String, Vec<PathBuf>> = HashMap::new();
        for rule in &cli.redirects {
            let Some((key, path)) = rule.split_once(':') else {
                bail!("redirect rule '{rule}' is not KEY:PATH");
            };
            if key.is_empty() || path.is_empty() {
                bail!("redirect rule '{rule}' is not KEY:PATH");
            }
            redirects
                .entry(key.to_lowercase())
                .or_default()
                .push(PathBuf::from(path));
        }

        let defaults = Options::default();
        Ok(Options {
            host: cli
                .host
                .or_else(|| shorthand.as_ref().map(|s| s.host.clone()))
                .unwrap_or(defaults.host),
            port: cli
                .port
                .or_else(|| shorthand.as_ref().and_then(|s| s.port))
                .unwrap_or(defaults.port),
            user: cli.user.or_else(|| shorthand.as_ref().map(|s| s.user.clone())),
            pass: cli.pass.or_else(|| shorthand.as_ref().and_then(|s| s.pass.clone())),
            character: cli
                .character
                .or_else(|| shorthand.as_ref().and_then(|s| s.character.clone())),
            chans: cli.chans.unwrap_or(defaults.chans),
            verbose: cli.verbose,
            time_format: cli.time_format,
            message_format: cli.format,
            redirects,
            notify_redirect: cli.notify_redirect,
            verbose_redirect: cli.verbose_redirect,
        })
    }
}
