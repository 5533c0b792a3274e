//! Domain types shared between the protocol engine and the console client.

use std::fmt;

/// Server-assigned object identifier.
pub type Guid = u64;

/// Chat language of a message or player.
///
/// Addon traffic is machine metadata sent over the chat channel; the client
/// suppresses it on the default console path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Universal,
    Common,
    Addon,
}

impl Language {
    pub fn is_addon(&self) -> bool {
        matches!(self, Language::Addon)
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            Language::Universal => 0,
            Language::Common => 7,
            Language::Addon => 0xFFFF_FFFF,
        }
    }

    pub fn from_u32(raw: u32) -> Self {
        match raw {
            0 => Language::Universal,
            0xFFFF_FFFF => Language::Addon,
            _ => Language::Common,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Universal => "universal",
            Language::Common => "common",
            Language::Addon => "addon",
        }
    }
}

/// Chat message class. The tag doubles as the redirect key for
/// non-channel messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Say,
    Yell,
    Party,
    Raid,
    Guild,
    Officer,
    Whisper,
    /// Echo of an outgoing whisper.
    WhisperInform,
    Channel,
    System,
}

impl MessageType {
    pub fn tag(&self) -> &'static str {
        match self {
            MessageType::Say => "say",
            MessageType::Yell => "yell",
            MessageType::Party => "party",
            MessageType::Raid => "raid",
            MessageType::Guild => "guild",
            MessageType::Officer => "officer",
            MessageType::Whisper => "whisper",
            MessageType::WhisperInform => "whisper",
            MessageType::Channel => "channel",
            MessageType::System => "system",
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            MessageType::Say => 0,
            MessageType::Yell => 1,
            MessageType::Party => 2,
            MessageType::Raid => 3,
            MessageType::Guild => 4,
            MessageType::Officer => 5,
            MessageType::Whisper => 6,
            MessageType::WhisperInform => 7,
            MessageType::Channel => 8,
            MessageType::System => 9,
        }
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => MessageType::Say,
            1 => MessageType::Yell,
            2 => MessageType::Party,
            3 => MessageType::Raid,
            4 => MessageType::Guild,
            5 => MessageType::Officer,
            6 => MessageType::Whisper,
            7 => MessageType::WhisperInform,
            8 => MessageType::Channel,
            9 => MessageType::System,
            _ => return None,
        })
    }
}

/// One chat message, incoming or outgoing.
///
/// Outgoing messages carry the local player's guid and no resolved sender
/// name; incoming messages have `sender_name` filled in by the engine.
/// `target` is the channel name for channel messages and the recipient for
/// whispers.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub kind: MessageType,
    pub language: Language,
    pub sender: Guid,
    pub sender_name: Option<String>,
    pub text: String,
    pub target: Option<String>,
}

impl ChatMessage {
    pub fn new(kind: MessageType, language: Language, sender: Guid, text: impl Into<String>) -> Self {
        Self {
            kind,
            language,
            sender,
            sender_name: None,
            text: text.into(),
            target: None,
        }
    }

    pub fn with_target(
        kind: MessageType,
        language: Language,
        sender: Guid,
        text: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::new(kind, language, sender, text)
        }
    }

    /// Key the output router resolves redirect rules against: the lowercased
    /// channel name for channel messages, the type tag otherwise.
    pub fn routing_key(&self) -> String {
        match (self.kind, &self.target) {
            (MessageType::Channel, Some(chan)) => chan.to_lowercase(),
            _ => self.kind.tag().to_string(),
        }
    }

    fn sender_label(&self) -> &str {
        self.sender_name.as_deref().unwrap_or("Unknown")
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MessageType::Say => write!(f, "{} says: {}", self.sender_label(), self.text),
            MessageType::Yell => write!(f, "{} yells: {}", self.sender_label(), self.text),
            MessageType::Whisper => write!(f, "{} whispers: {}", self.sender_label(), self.text),
            MessageType::WhisperInform => {
                write!(f, "To {}: {}", self.target.as_deref().unwrap_or("Unknown"), self.text)
            }
            MessageType::Channel => {
                write!(f, "[{}] {}: {}", self.target.as_deref().unwrap_or("?"), self.sender_label(), self.text)
            }
            MessageType::Party => write!(f, "[Party] {}: {}", self.sender_label(), self.text),
            MessageType::Raid => write!(f, "[Raid] {}: {}", self.sender_label(), self.text),
            MessageType::Guild => write!(f, "[Guild] {}: {}", self.sender_label(), self.text),
            MessageType::Officer => write!(f, "[Officer] {}: {}", self.sender_label(), self.text),
            MessageType::System => write!(f, "{}", self.text),
        }
    }
}

/// A character on the account, as listed by the world server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub guid: Guid,
    pub name: String,
    pub race: String,
    pub class: String,
    pub level: u8,
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (level {} {} {})", self.name, self.level, self.race, self.class)
    }
}

/// The character the session is logged in as.
#[derive(Debug, Clone)]
pub struct Player {
    pub guid: Guid,
    pub name: String,
    pub language: Language,
}

/// Cached item lookup result.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: u32,
    pub name: String,
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] (item {})", self.name, self.id)
    }
}

/// Cached quest lookup result.
#[derive(Debug, Clone)]
pub struct Quest {
    pub id: u32,
    pub title: String,
}

impl fmt::Display for Quest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] (quest {})", self.title, self.id)
    }
}

/// Guild roster snapshot.
#[derive(Debug, Clone, Default)]
pub struct Guild {
    pub members: Vec<GuildMember>,
}

impl Guild {
    pub fn online(&self) -> impl Iterator<Item = &GuildMember> {
        self.members.iter().filter(|m| m.online)
    }
}

#[derive(Debug, Clone)]
pub struct GuildMember {
    pub guid: Guid,
    pub name: String,
    pub class: String,
    pub level: u8,
    pub online: bool,
}

impl fmt::Display for GuildMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (level {} {})", self.name, self.level, self.class)
    }
}

/// Friend or ignore list entry.
#[derive(Debug, Clone)]
pub struct SocialEntry {
    pub guid: Guid,
    pub name: String,
    pub online: bool,
}

impl fmt::Display for SocialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
