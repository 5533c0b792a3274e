//! Session state and the event orchestrator.
//!
//! One `Session` exists per process. It is owned by the reactor task and
//! mutated only there, by command handlers and `handle_event`, so no locking
//! is involved. The guild refresh timer is represented here as intent
//! (armed flag plus an epoch); the reactor owns the actual interval and
//! re-creates it whenever the epoch changes, which makes a second login
//! replace the running timer rather than stack a new one next to it.

use std::collections::HashMap;

use wowtty_sdk::client::{Chat, Connection, Social};
use wowtty_sdk::event::Event;
use wowtty_sdk::packet::Packet;
use wowtty_sdk::types::{Character, Item, MessageType, Player, Quest};

use crate::options::Options;
use crate::output::OutputRouter;

/// Guild roster refresh period while logged in.
pub const GUILD_REFRESH_SECS: u64 = 60;

/// Orchestrator verdict for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Authentication failed; the process must exit with a non-zero status.
    AuthFailed,
}

pub struct Session {
    pub conn: Option<Connection>,
    pub player: Option<Player>,
    pub chat: Option<Chat>,
    pub social: Option<Social>,
    pub characters: Option<Vec<Character>>,
    pub last_whisper_target: Option<String>,
    /// Character requested at startup; consumed by the first character list.
    pending_character: Option<String>,
    pub options: Options,
    /// Per-opcode trace overrides; absent means enabled.
    pub trace_overrides: HashMap<u16, bool>,
    pub items: HashMap<u32, Item>,
    pub quests: HashMap<u32, Quest>,
    pub router: OutputRouter,
    pub quit: bool,
    timer_armed: bool,
    timer_epoch: u64,
}

impl Session {
    pub fn new(options: Options, conn: Connection, router: OutputRouter) -> Self {
        Self {
            conn: Some(conn),
            player: None,
            chat: None,
            social: None,
            characters: None,
            last_whisper_target: None,
            pending_character: options.character.clone(),
            options,
            trace_overrides: HashMap::new(),
            items: HashMap::new(),
            quests: HashMap::new(),
            router,
            quit: false,
            timer_armed: false,
            timer_epoch: 0,
        }
    }

    pub fn print(&mut self, text: &str) {
        self.router.print(text);
    }

    fn info(&mut self, text: &str) {
        self.router.info(&self.options, text);
    }

    /// Whether the guild refresh timer should currently run.
    pub fn timer_armed(&self) -> bool {
        self.timer_armed
    }

    /// Bumped on every arm; the reactor restarts its interval when this
    /// changes.
    pub fn timer_epoch(&self) -> u64 {
        self.timer_epoch
    }

    /// Periodic roster refresh issued by the reactor timer.
    pub fn refresh_guild(&self) {
        if self.player.is_some() {
            if let Some(conn) = &self.conn {
                conn.guild_roster();
            }
        }
    }

    /// Select a character by exact name and request login for it.
    pub(crate) fn attempt_login(&mut self, name: &str) {
        let found = self
            .characters
            .as_ref()
            .and_then(|chars| chars.iter().find(|c| c.name == name).cloned());
        match found {
            Some(character) => {
                self.print(&format!("Logging in as {}.", character.name));
                if let Some(conn) = &self.conn {
                    conn.login(&character);
                }
            }
            None => self.print("Character not found."),
        }
    }

    pub fn handle_event(&mut self, event: Event) -> Control {
        match event {
            Event::PacketSent(pk) => self.trace_packet("-->", &pk),
            Event::PacketReceived(pk) => self.trace_packet("<--", &pk),
            Event::AuthError(message) => {
                self.print(&format!("Authentication error: {message}."));
                return Control::AuthFailed;
            }
            Event::AuthSucceeded => self.print("Requesting realm list from the server."),
            Event::RealmDiscovered { name, addr } => {
                self.print(&format!("Discovered realm {name} at {addr}."));
            }
            Event::RealmSelected { name, host, port } => {
                self.print(&format!("Connecting to world server {name} at {host}:{port}."));
            }
            Event::Reconnected(conn) => self.conn = Some(conn),
            Event::WorldOpened => self.print("World connection opened."),
            Event::CharacterList(chars) => {
                let listing: Vec<String> = chars.iter().map(|c| format!(" > {c}")).collect();
                self.characters = Some(chars);
                if let Some(name) = self.pending_character.take() {
                    self.attempt_login(&name);
                } else {
                    self.print("Select character:");
                    for line in &listing {
                        self.print(line);
                    }
                }
            }
            Event::LoginSucceeded { player, chat, social } => {
                self.print("Login successful.");
                self.player = Some(player);
                self.social = Some(social);
                self.timer_armed = true;
                self.timer_epoch += 1;
                for chan in &self.options.chans {
                    chat.join(chan);
                }
                self.chat = Some(chat);
            }
            Event::LogoutSucceeded => {
                self.print("Logout successful.");
                self.timer_armed = false;
                self.player = None;
                self.chat = None;
                self.social = None;
                self.last_whisper_target = None;
            }
            Event::MotdReceived(motd) => self.info(&format!("<MOTD> {motd}")),
            Event::GuildUpdated(guild) => {
                let lines: Vec<String> = guild.online().map(|m| format!(" > {m}")).collect();
                self.info("Guild roster:");
                for line in &lines {
                    self.print(line);
                }
            }
            Event::MessageReceived(msg) => {
                if msg.kind == MessageType::Whisper {
                    if let Some(name) = &msg.sender_name {
                        self.last_whisper_target = Some(name.clone());
                    }
                }
                self.router.chat(&self.options, &msg);
            }
            Event::ServerNotification(text) | Event::ChannelNotification(text) => {
                self.router.notify(&self.options, &text);
            }
            Event::PlayerNotFound(name) => self.info(&format!("Player {name} not found.")),
            Event::ItemReceived(item) => {
                let line = item.to_string();
                self.items.insert(item.id, item);
                self.print(&line);
            }
            Event::QuestReceived(quest) => {
                let line = quest.to_string();
                self.quests.insert(quest.id, quest);
                self.print(&line);
            }
            Event::WorldClosed => self.print("World connection closed."),
        }
        Control::Continue
    }

    fn trace_packet(&mut self, direction: &str, pk: &Packet) {
        if !self.options.verbose {
            return;
        }
        if !*self.trace_overrides.get(&pk.opcode).unwrap_or(&true) {
            return;
        }
        self.router.trace(&self.options, direction, pk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::SharedBuf;
    use tokio::sync::mpsc;
    use wowtty_sdk::client::Request;
    use wowtty_sdk::types::{ChatMessage, Language};

    fn test_session() -> (Session, Connection, mpsc::UnboundedReceiver<Request>, SharedBuf) {
        let (conn, rx) = Connection::pair();
        let buf = SharedBuf::default();
        let router = OutputRouter::with_sink(Box::new(buf.clone()));
        let session = Session::new(Options::default(), conn.clone(), router);
        (session, conn, rx, buf)
    }

    fn login_event(conn: &Connection) -> Event {
        Event::LoginSucceeded {
            player: Player { guid: 7, name: "Kael".into(), language: Language::Common },
            chat: Chat::new(conn.clone()),
            social: Social::new(conn.clone(), Vec::new(), Vec::new()),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Request>) -> Vec<Request> {
        let mut out = Vec::new();
        while let Ok(req) = rx.try_recv() {
            out.push(req);
        }
        out
    }

    #[test]
    fn login_arms_the_timer_and_a_second_login_replaces_it() {
        let (mut session, conn, _rx, _buf) = test_session();
        assert!(!session.timer_armed());

        session.handle_event(login_event(&conn));
        assert!(session.timer_armed());
        let first_epoch = session.timer_epoch();

        session.handle_event(login_event(&conn));
        assert!(session.timer_armed());
        assert!(session.timer_epoch() > first_epoch, "replace, not ignore");
    }

    #[test]
    fn logout_disarms_and_clears_player_state() {
        let (mut session, conn, _rx, _buf) = test_session();
        session.handle_event(login_event(&conn));
        session.last_whisper_target = Some("Bob".into());

        session.handle_event(Event::LogoutSucceeded);
        assert!(!session.timer_armed());
        assert!(session.player.is_none());
        assert!(session.chat.is_none());
        assert!(session.social.is_none());
        assert!(session.last_whisper_target.is_none());

        // disarming an unarmed timer is a no-op
        session.handle_event(Event::LogoutSucceeded);
        assert!(!session.timer_armed());
    }

    #[test]
    fn refresh_is_a_noop_unless_logged_in() {
        let (session, _conn, mut rx, _buf) = test_session();
        session.refresh_guild();
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn refresh_requests_the_roster_while_logged_in() {
        let (mut session, conn, mut rx, _buf) = test_session();
        session.handle_event(login_event(&conn));
        drain(&mut rx);

        session.refresh_guild();
        assert!(matches!(drain(&mut rx).as_slice(), [Request::GuildRoster]));
    }

    #[test]
    fn reconnect_replaces_the_request_path() {
        let (mut session, conn, mut old_rx, _buf) = test_session();
        session.handle_event(login_event(&conn));
        drain(&mut old_rx);

        let (new_conn, mut new_rx) = Connection::pair();
        session.handle_event(Event::Reconnected(new_conn));

        session.refresh_guild();
        assert!(drain(&mut old_rx).is_empty());
        assert!(matches!(drain(&mut new_rx).as_slice(), [Request::GuildRoster]));
    }

    #[test]
    fn startup_character_is_consumed_exactly_once() {
        let (conn, mut rx) = Connection::pair();
        let buf = SharedBuf::default();
        let mut options = Options::default();
        options.character = Some("Kael".into());
        let mut session = Session::new(options, conn, OutputRouter::with_sink(Box::new(buf.clone())));

        let chars = vec![Character {
            guid: 11,
            name: "Kael".into(),
            race: "Troll".into(),
            class: "Priest".into(),
            level: 70,
        }];
        session.handle_event(Event::CharacterList(chars.clone()));
        assert!(buf.contents().contains("Logging in as Kael."));
        assert!(matches!(drain(&mut rx).as_slice(), [Request::Login(c)] if c.guid == 11));

        session.handle_event(Event::CharacterList(chars));
        assert!(drain(&mut rx).is_empty(), "second list event must not re-login");
        assert!(buf.contents().contains("Select character:"));
    }

    #[test]
    fn startup_character_without_match_reports_and_sends_nothing() {
        let (conn, mut rx) = Connection::pair();
        let buf = SharedBuf::default();
        let mut options = Options::default();
        options.character = Some("Nosuch".into());
        let mut session = Session::new(options, conn, OutputRouter::with_sink(Box::new(buf.clone())));

        session.handle_event(Event::CharacterList(vec![Character {
            guid: 11,
            name: "Kael".into(),
            race: "Troll".into(),
            class: "Priest".into(),
            level: 70,
        }]));
        assert!(buf.contents().contains("Character not found."));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn login_joins_startup_channels_in_order() {
        let (conn, mut rx) = Connection::pair();
        let mut options = Options::default();
        options.chans = vec!["world".into(), "trade".into()];
        let mut session = Session::new(
            options,
            conn.clone(),
            OutputRouter::with_sink(Box::new(SharedBuf::default())),
        );

        session.handle_event(login_event(&conn));
        let joins: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|r| match r {
                Request::JoinChannel(chan) => Some(chan),
                _ => None,
            })
            .collect();
        assert_eq!(joins, ["world", "trade"]);
    }

    #[test]
    fn received_whisper_becomes_the_reply_target() {
        let (mut session, conn, _rx, _buf) = test_session();
        session.handle_event(login_event(&conn));

        let mut msg = ChatMessage::new(MessageType::Whisper, Language::Common, 99, "hi");
        msg.sender_name = Some("Ana".into());
        session.handle_event(Event::MessageReceived(msg));
        assert_eq!(session.last_whisper_target.as_deref(), Some("Ana"));

        // non-whisper traffic leaves the target alone
        let mut say = ChatMessage::new(MessageType::Say, Language::Common, 98, "hello");
        say.sender_name = Some("Bor".into());
        session.handle_event(Event::MessageReceived(say));
        assert_eq!(session.last_whisper_target.as_deref(), Some("Ana"));
    }

    #[test]
    fn auth_error_is_terminal() {
        let (mut session, _conn, _rx, buf) = test_session();
        let verdict = session.handle_event(Event::AuthError("bad credentials".into()));
        assert_eq!(verdict, Control::AuthFailed);
        assert!(buf.contents().contains("Authentication error: bad credentials."));
    }

    #[test]
    fn packet_trace_honors_verbose_flag_and_overrides() {
        let (mut session, _conn, _rx, buf) = test_session();
        let pk = Packet::new(0x00E, b"m".to_vec());

        session.handle_event(Event::PacketReceived(pk.clone()));
        assert_eq!(buf.contents(), "", "quiet unless verbose");

        session.options.verbose = true;
        session.trace_overrides.insert(0x00E, false);
        session.handle_event(Event::PacketReceived(pk.clone()));
        assert_eq!(buf.contents(), "", "suppressed opcode stays quiet");

        session.trace_overrides.insert(0x00E, true);
        session.handle_event(Event::PacketReceived(pk));
        assert!(buf.contents().contains("SMSG_MOTD"));
    }

    #[test]
    fn item_reply_fills_the_cache_and_prints() {
        let (mut session, _conn, _rx, buf) = test_session();
        session.handle_event(Event::ItemReceived(Item { id: 19019, name: "Thunderfury".into() }));
        assert!(session.items.contains_key(&19019));
        assert!(buf.contents().contains("Thunderfury"));
    }
}
