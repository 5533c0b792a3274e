//! Request-send side of the engine boundary.
//!
//! The session layer talks to the engine exclusively through [`Connection`]
//! (and the [`Chat`]/[`Social`] capabilities built on top of it). Requests are
//! fire-and-forget: replies arrive later as [`crate::event::Event`]s, never as
//! return values, so nothing here blocks the reactor.

use tokio::sync::mpsc;

use crate::types::{Character, ChatMessage, SocialEntry};

/// Every operation the session layer can ask the engine to perform.
#[derive(Debug, Clone)]
pub enum Request {
    Chat(ChatMessage),
    JoinChannel(String),
    LeaveChannel(String),
    AddFriend(String),
    RemoveFriend(String),
    AddIgnore(String),
    RemoveIgnore(String),
    Login(Character),
    Logout,
    GuildRoster,
    ItemQuery(u32),
    QuestQuery(u32),
    NameQuery(String),
    Quit,
}

/// Cloneable handle to the engine's request queue.
///
/// A handle outlives the transport it was created for; after the engine
/// reconnects, sends on the stale handle are dropped with a warning and the
/// session is expected to switch to the handle delivered in
/// [`crate::event::Event::Reconnected`].
#[derive(Debug, Clone)]
pub struct Connection {
    req_tx: mpsc::UnboundedSender<Request>,
}

impl Connection {
    /// Create a connection handle and the engine-side receiver feeding it.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Request>) {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        (Self { req_tx }, req_rx)
    }

    pub fn send(&self, request: Request) {
        if self.req_tx.send(request).is_err() {
            tracing::warn!("engine is gone, request dropped");
        }
    }

    pub fn login(&self, character: &Character) {
        self.send(Request::Login(character.clone()));
    }

    pub fn logout(&self) {
        self.send(Request::Logout);
    }

    pub fn guild_roster(&self) {
        self.send(Request::GuildRoster);
    }

    pub fn item_query(&self, id: u32) {
        self.send(Request::ItemQuery(id));
    }

    pub fn quest_query(&self, id: u32) {
        self.send(Request::QuestQuery(id));
    }

    pub fn name_query(&self, name: &str) {
        self.send(Request::NameQuery(name.to_string()));
    }

    pub fn quit(&self) {
        self.send(Request::Quit);
    }
}

/// Channel/whisper/say messaging capability, valid while logged in.
#[derive(Debug, Clone)]
pub struct Chat {
    conn: Connection,
}

impl Chat {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn send(&self, message: ChatMessage) {
        self.conn.send(Request::Chat(message));
    }

    pub fn join(&self, channel: &str) {
        self.conn.send(Request::JoinChannel(channel.to_string()));
    }

    pub fn leave(&self, channel: &str) {
        self.conn.send(Request::LeaveChannel(channel.to_string()));
    }
}

/// Friend and ignore list capability, valid while logged in.
///
/// The list snapshots are the ones delivered at login; mutations are sent to
/// the server and take effect there.
#[derive(Debug, Clone)]
pub struct Social {
    conn: Connection,
    pub friends: Vec<SocialEntry>,
    pub ignores: Vec<SocialEntry>,
}

impl Social {
    pub fn new(conn: Connection, friends: Vec<SocialEntry>, ignores: Vec<SocialEntry>) -> Self {
        Self { conn, friends, ignores }
    }

    pub fn friend(&self, name: &str) {
        self.conn.send(Request::AddFriend(name.to_string()));
    }

    pub fn unfriend(&self, name: &str) {
        self.conn.send(Request::RemoveFriend(name.to_string()));
    }

    pub fn ignore(&self, name: &str) {
        self.conn.send(Request::AddIgnore(name.to_string()));
    }

    pub fn unignore(&self, name: &str) {
        self.conn.send(Request::RemoveIgnore(name.to_string()));
    }

    pub fn online(&self) -> impl Iterator<Item = &SocialEntry> {
        self.friends.iter().filter(|e| e.online)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Language, MessageType};

    #[tokio::test]
    async fn requests_arrive_in_send_order() {
        let (conn, mut rx) = Connection::pair();
        conn.guild_roster();
        conn.item_query(17);
        conn.name_query("Kael");

        assert!(matches!(rx.recv().await, Some(Request::GuildRoster)));
        assert!(matches!(rx.recv().await, Some(Request::ItemQuery(17))));
        match rx.recv().await {
            Some(Request::NameQuery(name)) => assert_eq!(name, "Kael"),
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_after_engine_drop_does_not_panic() {
        let (conn, rx) = Connection::pair();
        drop(rx);
        conn.send(Request::Logout);
    }

    #[tokio::test]
    async fn chat_capability_wraps_messages() {
        let (conn, mut rx) = Connection::pair();
        let chat = Chat::new(conn);
        chat.send(ChatMessage::new(MessageType::Say, Language::Common, 9, "hello"));
        chat.join("world");

        match rx.recv().await {
            Some(Request::Chat(msg)) => {
                assert_eq!(msg.kind, MessageType::Say);
                assert_eq!(msg.sender, 9);
            }
            other => panic!("unexpected request: {other:?}"),
        }
        match rx.recv().await {
            Some(Request::JoinChannel(chan)) => assert_eq!(chan, "world"),
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn social_online_filters_offline_friends() {
        let (conn, _rx) = Connection::pair();
        let social = Social::new(
            conn,
            vec![
                SocialEntry { guid: 1, name: "Ana".into(), online: true },
                SocialEntry { guid: 2, name: "Bor".into(), online: false },
            ],
            Vec::new(),
        );
        let online: Vec<_> = social.online().map(|e| e.name.as_str()).collect();
        assert_eq!(online, ["Ana"]);
    }
}
