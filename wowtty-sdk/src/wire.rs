//! Frame codec for the simplified session wire format.
//!
//! Frames are `u16` opcode + `u16` payload length + payload, all big-endian.
//! Strings are `u16` length + UTF-8 bytes. This format is private to the
//! client and its server shim; it is not compatible with any real game
//! protocol.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::client::Request;
use crate::packet::{opcodes, Packet};
use crate::types::{
    Character, ChatMessage, Guild, GuildMember, Item, Language, MessageType, Quest, SocialEntry,
};

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("truncated payload in {0}")]
    Truncated(&'static str),
    #[error("invalid utf-8 in {0}")]
    BadString(&'static str),
    #[error("unknown value {value} in {field}")]
    BadValue { field: &'static str, value: u64 },
}

/// Server frames after decoding, before the engine turns them into events.
#[derive(Debug, Clone)]
pub enum ServerFrame {
    AuthResponse { ok: bool, message: String },
    RealmList(Vec<(String, String)>),
    CharList(Vec<Character>),
    LoginVerify {
        guid: u64,
        name: String,
        language: Language,
        friends: Vec<SocialEntry>,
        ignores: Vec<SocialEntry>,
    },
    LogoutComplete,
    Message(ChatMessage),
    Motd(String),
    Notification { channel: bool, text: String },
    GuildRoster(Guild),
    ItemInfo(Item),
    QuestInfo(Quest),
    NameQueryFail(String),
}

// ── Bounds-checked payload reader ──

struct Reader<'a> {
    buf: &'a [u8],
    ctx: &'static str,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], ctx: &'static str) -> Self {
        Self { buf, ctx }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.buf.len() < n {
            return Err(WireError::Truncated(self.ctx));
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, WireError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, WireError> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    fn string(&mut self) -> Result<String, WireError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::BadString(self.ctx))
    }
}

// ── Payload writer helpers ──

pub(crate) fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn put_str(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u16::MAX as usize);
    put_u16(buf, len as u16);
    buf.extend_from_slice(&bytes[..len]);
}

// ── Frame I/O ──

/// Serialize a packet into header + payload bytes.
pub fn frame_bytes(pk: &Packet) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + pk.data.len());
    put_u16(&mut out, pk.opcode);
    put_u16(&mut out, pk.data.len().min(u16::MAX as usize) as u16);
    out.extend_from_slice(&pk.data);
    out
}

/// Read one frame. `Ok(None)` means the peer closed the stream cleanly
/// between frames.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Option<Packet>> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let opcode = u16::from_be_bytes([header[0], header[1]]);
    let len = u16::from_be_bytes([header[2], header[3]]) as usize;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(Some(Packet::new(opcode, data)))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, pk: &Packet) -> std::io::Result<()> {
    writer.write_all(&frame_bytes(pk)).await?;
    writer.flush().await
}

// ── Request encoding ──

/// Encode one session request as a client frame. `Quit` has no wire form.
pub fn encode_request(request: &Request) -> Option<Packet> {
    let pk = match request {
        Request::Chat(msg) => {
            let mut data = Vec::new();
            data.push(msg.kind.as_u8());
            put_u32(&mut data, msg.language.as_u32());
            put_str(&mut data, msg.target.as_deref().unwrap_or(""));
            put_str(&mut data, &msg.text);
            Packet::new(opcodes::CMSG_MESSAGE_CHAT, data)
        }
        Request::JoinChannel(chan) => str_packet(opcodes::CMSG_JOIN_CHANNEL, chan),
        Request::LeaveChannel(chan) => str_packet(opcodes::CMSG_LEAVE_CHANNEL, chan),
        Request::AddFriend(name) => str_packet(opcodes::CMSG_FRIEND_ADD, name),
        Request::RemoveFriend(name) => str_packet(opcodes::CMSG_FRIEND_DEL, name),
        Request::AddIgnore(name) => str_packet(opcodes::CMSG_IGNORE_ADD, name),
        Request::RemoveIgnore(name) => str_packet(opcodes::CMSG_IGNORE_DEL, name),
        Request::Login(character) => {
            let mut data = Vec::new();
            put_u64(&mut data, character.guid);
            Packet::new(opcodes::CMSG_PLAYER_LOGIN, data)
        }
        Request::Logout => Packet::new(opcodes::CMSG_LOGOUT_REQUEST, Vec::new()),
        Request::GuildRoster => Packet::new(opcodes::CMSG_GUILD_ROSTER, Vec::new()),
        Request::ItemQuery(id) => u32_packet(opcodes::CMSG_ITEM_QUERY, *id),
        Request::QuestQuery(id) => u32_packet(opcodes::CMSG_QUEST_QUERY, *id),
        Request::NameQuery(name) => str_packet(opcodes::CMSG_NAME_QUERY, name),
        Request::Quit => return None,
    };
    Some(pk)
}

fn str_packet(opcode: u16, s: &str) -> Packet {
    let mut data = Vec::new();
    put_str(&mut data, s);
    Packet::new(opcode, data)
}

fn u32_packet(opcode: u16, v: u32) -> Packet {
    let mut data = Vec::new();
    put_u32(&mut data, v);
    Packet::new(opcode, data)
}

// ── Server frame decoding ──

/// Decode a server frame. Unknown opcodes decode to `Ok(None)` so the engine
/// can skip them without tearing the session down.
pub fn decode_frame(pk: &Packet) -> Result<Option<ServerFrame>, WireError> {
    let frame = match pk.opcode {
        opcodes::SMSG_AUTH_RESPONSE => {
            let mut r = Reader::new(&pk.data, "SMSG_AUTH_RESPONSE");
            let ok = r.u8()? == 0;
            let message = r.string()?;
            ServerFrame::AuthResponse { ok, message }
        }
        opcodes::SMSG_REALM_LIST => {
            let mut r = Reader::new(&pk.data, "SMSG_REALM_LIST");
            let count = r.u8()?;
            let mut realms = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let name = r.string()?;
                let addr = r.string()?;
                realms.push((name, addr));
            }
            ServerFrame::RealmList(realms)
        }
        opcodes::SMSG_CHAR_LIST => {
            let mut r = Reader::new(&pk.data, "SMSG_CHAR_LIST");
            let count = r.u8()?;
            let mut chars = Vec::with_capacity(count as usize);
            for _ in 0..count {
                chars.push(Character {
                    guid: r.u64()?,
                    name: r.string()?,
                    race: r.string()?,
                    class: r.string()?,
                    level: r.u8()?,
                });
            }
            ServerFrame::CharList(chars)
        }
        opcodes::SMSG_LOGIN_VERIFY => {
            let mut r = Reader::new(&pk.data, "SMSG_LOGIN_VERIFY");
            let guid = r.u64()?;
            let name = r.string()?;
            let language = Language::from_u32(r.u32()?);
            let mut friends = Vec::new();
            for _ in 0..r.u8()? {
                friends.push(SocialEntry {
                    guid: r.u64()?,
                    name: r.string()?,
                    online: r.u8()? != 0,
                });
            }
            let mut ignores = Vec::new();
            for _ in 0..r.u8()? {
                ignores.push(SocialEntry {
                    guid: r.u64()?,
                    name: r.string()?,
                    online: false,
                });
            }
            ServerFrame::LoginVerify { guid, name, language, friends, ignores }
        }
        opcodes::SMSG_LOGOUT_COMPLETE => ServerFrame::LogoutComplete,
        opcodes::SMSG_MESSAGE_CHAT => {
            let mut r = Reader::new(&pk.data, "SMSG_MESSAGE_CHAT");
            let raw_kind = r.u8()?;
            let kind = MessageType::from_u8(raw_kind).ok_or(WireError::BadValue {
                field: "message type",
                value: raw_kind as u64,
            })?;
            let language = Language::from_u32(r.u32()?);
            let sender = r.u64()?;
            let sender_name = r.string()?;
            let target = r.string()?;
            let text = r.string()?;
            ServerFrame::Message(ChatMessage {
                kind,
                language,
                sender,
                sender_name: (!sender_name.is_empty()).then_some(sender_name),
                text,
                target: (!target.is_empty()).then_some(target),
            })
        }
        opcodes::SMSG_MOTD => {
            let mut r = Reader::new(&pk.data, "SMSG_MOTD");
            ServerFrame::Motd(r.string()?)
        }
        opcodes::SMSG_NOTIFICATION => {
            let mut r = Reader::new(&pk.data, "SMSG_NOTIFICATION");
            let channel = r.u8()? != 0;
            ServerFrame::Notification { channel, text: r.string()? }
        }
        opcodes::SMSG_GUILD_ROSTER => {
            let mut r = Reader::new(&pk.data, "SMSG_GUILD_ROSTER");
            let count = r.u16()?;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                members.push(GuildMember {
                    guid: r.u64()?,
                    name: r.string()?,
                    class: r.string()?,
                    level: r.u8()?,
                    online: r.u8()? != 0,
                });
            }
            ServerFrame::GuildRoster(Guild { members })
        }
        opcodes::SMSG_ITEM_INFO => {
            let mut r = Reader::new(&pk.data, "SMSG_ITEM_INFO");
            ServerFrame::ItemInfo(Item { id: r.u32()?, name: r.string()? })
        }
        opcodes::SMSG_QUEST_INFO => {
            let mut r = Reader::new(&pk.data, "SMSG_QUEST_INFO");
            ServerFrame::QuestInfo(Quest { id: r.u32()?, title: r.string()? })
        }
        opcodes::SMSG_NAME_QUERY_FAIL => {
            let mut r = Reader::new(&pk.data, "SMSG_NAME_QUERY_FAIL");
            ServerFrame::NameQueryFail(r.string()?)
        }
        _ => return Ok(None),
    };
    Ok(Some(frame))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_io_round_trips() {
        let pk = str_packet(opcodes::CMSG_JOIN_CHANNEL, "world");
        let mut cursor = std::io::Cursor::new(Vec::new());
        write_frame(&mut cursor, &pk).await.unwrap();

        cursor.set_position(0);
        let back = read_frame(&mut cursor).await.unwrap().unwrap();
        assert_eq!(back, pk);
        assert!(read_frame(&mut cursor).await.unwrap().is_none());
    }

    #[test]
    fn chat_request_encodes_target_and_text() {
        let msg = ChatMessage::with_target(MessageType::Whisper, Language::Common, 5, "psst", "Bob");
        let pk = encode_request(&Request::Chat(msg)).unwrap();
        assert_eq!(pk.opcode, opcodes::CMSG_MESSAGE_CHAT);

        let mut r = Reader::new(&pk.data, "test");
        assert_eq!(r.u8().unwrap(), MessageType::Whisper.as_u8());
        assert_eq!(r.u32().unwrap(), Language::Common.as_u32());
        assert_eq!(r.string().unwrap(), "Bob");
        assert_eq!(r.string().unwrap(), "psst");
    }

    #[test]
    fn quit_has_no_wire_form() {
        assert!(encode_request(&Request::Quit).is_none());
    }

    #[test]
    fn truncated_payload_is_an_error_not_a_panic() {
        let pk = Packet::new(opcodes::SMSG_MOTD, vec![0x00]);
        assert!(matches!(decode_frame(&pk), Err(WireError::Truncated(_))));
    }

    #[test]
    fn unknown_opcode_decodes_to_none() {
        let pk = Packet::new(0x7FF, vec![1, 2, 3]);
        assert!(decode_frame(&pk).unwrap().is_none());
    }

    #[test]
    fn message_frame_decodes_empty_target_as_none() {
        let mut data = Vec::new();
        data.push(MessageType::Say.as_u8());
        put_u32(&mut data, Language::Common.as_u32());
        put_u64(&mut data, 42);
        put_str(&mut data, "Kael");
        put_str(&mut data, "");
        put_str(&mut data, "hello");
        let frame = decode_frame(&Packet::new(opcodes::SMSG_MESSAGE_CHAT, data)).unwrap();
        match frame {
            Some(ServerFrame::Message(msg)) => {
                assert_eq!(msg.sender_name.as_deref(), Some("Kael"));
                assert!(msg.target.is_none());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
