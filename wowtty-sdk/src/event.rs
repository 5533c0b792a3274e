//! Events the protocol engine emits for the session layer to consume.

use crate::client::{Chat, Connection, Social};
use crate::packet::Packet;
use crate::types::{Character, ChatMessage, Guild, Item, Player, Quest};

/// Everything the engine can tell the session layer, as one tagged union.
///
/// The session orchestrator consumes these from a single ordered channel;
/// ordering between events is exactly the order the engine produced them in.
#[derive(Debug, Clone)]
pub enum Event {
    /// A frame went out on the wire (trace sink only).
    PacketSent(Packet),

    /// A frame arrived from the server (trace sink only).
    PacketReceived(Packet),

    /// Authentication failed. Terminal: the session ends with an error.
    AuthError(String),

    /// Credentials accepted by the realm server.
    AuthSucceeded,

    /// One realm advertised in the realm list.
    RealmDiscovered { name: String, addr: String },

    /// The realm the engine picked; a world connection follows.
    RealmSelected { name: String, host: String, port: u16 },

    /// The engine replaced its transport. All subsequent requests must go
    /// through this handle; the old one is dead.
    Reconnected(Connection),

    /// World server connection is up.
    WorldOpened,

    /// Characters available on this account.
    CharacterList(Vec<Character>),

    /// World login completed. Carries the player identity plus the chat and
    /// social capabilities that are only valid while logged in.
    LoginSucceeded {
        player: Player,
        chat: Chat,
        social: Social,
    },

    /// Logout completed; the player-scoped capabilities are now invalid.
    LogoutSucceeded,

    /// Message of the day.
    MotdReceived(String),

    /// Fresh guild roster snapshot.
    GuildUpdated(Guild),

    /// An incoming chat message.
    MessageReceived(ChatMessage),

    /// Server-wide notification text.
    ServerNotification(String),

    /// Channel notification text (join/leave/moderation notices).
    ChannelNotification(String),

    /// A name query came back empty.
    PlayerNotFound(String),

    /// Item query reply; the client caches it by id.
    ItemReceived(Item),

    /// Quest query reply; the client caches it by id.
    QuestReceived(Quest),

    /// The world connection closed.
    WorldClosed,
}
