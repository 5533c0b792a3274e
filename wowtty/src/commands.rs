//! Slash command registry, dispatcher, and handlers.
//!
//! Commands are a closed set of variants selected by name lookup; the
//! registry is built once at startup and re-registration of an alias
//! overwrites the previous handler. Precondition failures are silent, with
//! two exceptions: an unknown command and `/login` against a name that is
//! not on the character list.

use std::collections::HashMap;

use wowtty_sdk::types::{ChatMessage, MessageType};

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    Channel,
    Say,
    Yell,
    Party,
    Raid,
    Guild,
    Officer,
    Whisper,
    Reply,
    Join,
    Leave,
    Friend,
    Unfriend,
    Friends,
    Ignore,
    Unignore,
    Ignores,
    Login,
    Logout,
    Roster,
    Item,
    Quest,
    Whois,
    Help,
    Verbose,
    Supress,
    Unsupress,
    Quit,
}

pub struct Registry {
    commands: HashMap<&'static str, SlashCommand>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut reg = Self { commands: HashMap::new() };
        reg.register(&["channel", "c"], SlashCommand::Channel);
        reg.register(&["say", "s"], SlashCommand::Say);
        reg.register(&["yell", "y"], SlashCommand::Yell);
        reg.register(&["party", "p"], SlashCommand::Party);
        reg.register(&["raid", "ra"], SlashCommand::Raid);
        reg.register(&["guild", "g"], SlashCommand::Guild);
        reg.register(&["officer", "o"], SlashCommand::Officer);
        reg.register(&["whisper", "w"], SlashCommand::Whisper);
        reg.register(&["reply", "r"], SlashCommand::Reply);
        reg.register(&["join"], SlashCommand::Join);
        reg.register(&["leave"], SlashCommand::Leave);
        reg.register(&["friend"], SlashCommand::Friend);
        reg.register(&["unfriend"], SlashCommand::Unfriend);
        reg.register(&["friends"], SlashCommand::Friends);
        reg.register(&["ignore"], SlashCommand::Ignore);
        reg.register(&["unignore"], SlashCommand::Unignore);
        reg.register(&["ignores"], SlashCommand::Ignores);
        reg.register(&["login"], SlashCommand::Login);
        reg.register(&["logout", "camp"], SlashCommand::Logout);
        reg.register(&["roster"], SlashCommand::Roster);
        reg.register(&["item"], SlashCommand::Item);
        reg.register(&["quest"], SlashCommand::Quest);
        reg.register(&["whois"], SlashCommand::Whois);
        reg.register(&["help", "?"], SlashCommand::Help);
        reg.register(&["verbose"], SlashCommand::Verbose);
        reg.register(&["supress"], SlashCommand::Supress);
        reg.register(&["unsupress"], SlashCommand::Unsupress);
        reg.register(&["quit"], SlashCommand::Quit);
        reg
    }

    /// Register a command under each alias; the latest registration for an
    /// alias wins.
    pub fn register(&mut self, names: &[&'static str], command: SlashCommand) {
        for name in names {
            self.commands.insert(name, command);
        }
    }

    /// Dispatch one input line. Lines that do not match `/` followed by
    /// letters or `?` are ignored at this layer.
    pub fn dispatch(&self, raw: &str, session: &mut Session) {
        let line = raw.trim_end_matches(['\r', '\n']);
        let Some(rest) = line.strip_prefix('/') else { return };
        let token_len = rest
            .chars()
            .take_while(|c| c.is_ascii_alphabetic() || *c == '?')
            .count();
        if token_len == 0 {
            return;
        }
        let (token, tail) = rest.split_at(token_len);
        let args = tail.trim_start();
        match self.commands.get(token) {
            Some(SlashCommand::Help) => {
                let listing = self.help_text();
                session.print(&listing);
            }
            Some(command) => command.execute(session, args),
            None => session.print("There is no such command."),
        }
    }

    fn help_text(&self) -> String {
        let mut names: Vec<&str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        let mut out = String::from("Available commands are:");
        for row in names.chunks(6) {
            out.push('\n');
            let cells: Vec<String> = row.iter().map(|name| format!("{:<10}", format!("/{name}"))).collect();
            out.push_str(cells.concat().trim_end());
        }
        out
    }
}

impl SlashCommand {
    pub fn execute(self, session: &mut Session, args: &str) {
        match self {
            SlashCommand::Channel => {
                if let Some((chan, text)) = split_target(args) {
                    let chan = chan.to_string();
                    send_chat(session, MessageType::Channel, text, Some(chan));
                }
            }
            SlashCommand::Say => send_chat(session, MessageType::Say, args, None),
            SlashCommand::Yell => send_chat(session, MessageType::Yell, args, None),
            SlashCommand::Party => send_chat(session, MessageType::Party, args, None),
            SlashCommand::Raid => send_chat(session, MessageType::Raid, args, None),
            SlashCommand::Guild => send_chat(session, MessageType::Guild, args, None),
            SlashCommand::Officer => send_chat(session, MessageType::Officer, args, None),
            SlashCommand::Whisper => {
                let Some((target, text)) = split_target(args) else { return };
                if session.chat.is_none() {
                    return;
                }
                let target = target.to_string();
                send_chat(session, MessageType::Whisper, text, Some(target.clone()));
                session.last_whisper_target = Some(target);
            }
            SlashCommand::Reply => {
                let Some(target) = session.last_whisper_target.clone() else { return };
                send_chat(session, MessageType::Whisper, args, Some(target));
            }
            SlashCommand::Join => {
                let chan = args.trim();
                if chan.is_empty() {
                    return;
                }
                if let Some(chat) = &session.chat {
                    chat.join(chan);
                }
            }
            SlashCommand::Leave => {
                let chan = args.trim();
                if chan.is_empty() {
                    return;
                }
                if let Some(chat) = &session.chat {
                    chat.leave(chan);
                }
            }
            SlashCommand::Friend => {
                if !args.is_empty() {
                    if let Some(social) = &session.social {
                        social.friend(args);
                    }
                }
            }
            SlashCommand::Unfriend => {
                if !args.is_empty() {
                    if let Some(social) = &session.social {
                        social.unfriend(args);
                    }
                }
            }
            SlashCommand::Friends => {
                let Some(social) = &session.social else { return };
                let lines: Vec<String> = social.online().map(|e| format!(" > {e}")).collect();
                session.print("Friends:");
                for line in &lines {
                    session.print(line);
                }
            }
            SlashCommand::Ignore => {
                if !args.is_empty() {
                    if let Some(social) = &session.social {
                        social.ignore(args);
                    }
                }
            }
            SlashCommand::Unignore => {
                if !args.is_empty() {
                    if let Some(social) = &session.social {
                        social.unignore(args);
                    }
                }
            }
            SlashCommand::Ignores => {
                let Some(social) = &session.social else { return };
                let lines: Vec<String> = social.ignores.iter().map(|e| format!(" > {e}")).collect();
                session.print("Ignores:");
                for line in &lines {
                    session.print(line);
                }
            }
            SlashCommand::Login => {
                if args.is_empty() || session.characters.is_none() {
                    return;
                }
                session.attempt_login(args);
            }
            SlashCommand::Logout => {
                if session.player.is_some() {
                    if let Some(conn) = &session.conn {
                        conn.logout();
                    }
                }
            }
            SlashCommand::Roster => {
                if session.player.is_some() {
                    if let Some(conn) = &session.conn {
                        conn.guild_roster();
                    }
                }
            }
            SlashCommand::Item => {
                if session.player.is_none() {
                    return;
                }
                let Some(id) = parse_id(args) else { return };
                if let Some(item) = session.items.get(&id) {
                    let line = item.to_string();
                    session.print(&line);
                } else if let Some(conn) = &session.conn {
                    conn.item_query(id);
                }
            }
            SlashCommand::Quest => {
                if session.player.is_none() {
                    return;
                }
                let Some(id) = parse_id(args) else { return };
                if let Some(quest) = session.quests.get(&id) {
                    let line = quest.to_string();
                    session.print(&line);
                } else if let Some(conn) = &session.conn {
                    conn.quest_query(id);
                }
            }
            SlashCommand::Whois => {
                if session.player.is_none() || args.is_empty() {
                    return;
                }
                if let Some(conn) = &session.conn {
                    conn.name_query(args);
                }
            }
            // help needs the registry and is resolved in dispatch
            SlashCommand::Help => {}
            SlashCommand::Verbose => session.options.verbose = args == "on",
            SlashCommand::Supress => set_trace(session, args, false),
            SlashCommand::Unsupress => set_trace(session, args, true),
            SlashCommand::Quit => {
                session.quit = true;
                if let Some(conn) = &session.conn {
                    conn.quit();
                }
            }
        }
    }
}

/// Build and send one chat message. Every chat-sending command funnels
/// through here: fixed type tag, the player's language and guid, the text,
/// and an optional secondary target.
fn send_chat(session: &mut Session, kind: MessageType, text: &str, target: Option<String>) {
    if text.is_empty() {
        return;
    }
    let (Some(chat), Some(player)) = (&session.chat, &session.player) else { return };
    let message = match target {
        Some(target) => ChatMessage::with_target(kind, player.language, player.guid, text, target),
        None => ChatMessage::new(kind, player.language, player.guid, text),
    };
    chat.send(message);
}

/// Split `<target> <text>`; both halves must be non-empty.
fn split_target(args: &str) -> Option<(&str, &str)> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let target = parts.next()?;
    let text = parts.next().unwrap_or("").trim_start();
    if target.is_empty() || text.is_empty() {
        return None;
    }
    Some((target, text))
}

fn set_trace(session: &mut Session, args: &str, enabled: bool) {
    for token in args.split_whitespace() {
        match parse_numeral(token) {
            Some(opcode) => {
                session.trace_overrides.insert(opcode, enabled);
            }
            None => tracing::debug!(token, "ignoring unparsable opcode"),
        }
    }
}

/// Parse an opcode numeral with any base prefix: 0x hex, 0b binary,
/// 0o or leading-zero octal, decimal otherwise.
fn parse_numeral(s: &str) -> Option<u16> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u16::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        u16::from_str_radix(oct, 8).ok()
    } else if s.len() > 1 && s.starts_with('0') {
        u16::from_str_radix(&s[1..], 8).ok()
    } else {
        s.parse().ok()
    }
}

fn parse_id(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}
