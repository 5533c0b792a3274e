//! Raw frame values surfaced to the trace sink.

use std::fmt;

/// Client-to-server opcodes.
pub mod opcodes {
    pub const CMSG_AUTH: u16 = 0x001;
    pub const SMSG_AUTH_RESPONSE: u16 = 0x002;
    pub const SMSG_REALM_LIST: u16 = 0x003;
    pub const SMSG_CHAR_LIST: u16 = 0x005;
    pub const CMSG_PLAYER_LOGIN: u16 = 0x006;
    pub const SMSG_LOGIN_VERIFY: u16 = 0x007;
    pub const CMSG_LOGOUT_REQUEST: u16 = 0x008;
    pub const SMSG_LOGOUT_COMPLETE: u16 = 0x009;
    pub const CMSG_MESSAGE_CHAT: u16 = 0x00A;
    pub const SMSG_MESSAGE_CHAT: u16 = 0x00B;
    pub const CMSG_JOIN_CHANNEL: u16 = 0x00C;
    pub const CMSG_LEAVE_CHANNEL: u16 = 0x00D;
    pub const SMSG_MOTD: u16 = 0x00E;
    pub const SMSG_NOTIFICATION: u16 = 0x00F;
    pub const CMSG_GUILD_ROSTER: u16 = 0x010;
    pub const SMSG_GUILD_ROSTER: u16 = 0x011;
    pub const CMSG_ITEM_QUERY: u16 = 0x012;
    pub const SMSG_ITEM_INFO: u16 = 0x013;
    pub const CMSG_QUEST_QUERY: u16 = 0x014;
    pub const SMSG_QUEST_INFO: u16 = 0x015;
    pub const CMSG_NAME_QUERY: u16 = 0x016;
    pub const SMSG_NAME_QUERY_FAIL: u16 = 0x017;
    pub const CMSG_FRIEND_ADD: u16 = 0x018;
    pub const CMSG_FRIEND_DEL: u16 = 0x019;
    pub const CMSG_IGNORE_ADD: u16 = 0x01A;
    pub const CMSG_IGNORE_DEL: u16 = 0x01B;
}

/// One wire frame: opcode plus payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub opcode: u16,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn new(opcode: u16, data: Vec<u8>) -> Self {
        Self { opcode, data }
    }

    pub fn opcode_name(&self) -> &'static str {
        use opcodes::*;
        match self.opcode {
            CMSG_AUTH => "CMSG_AUTH",
            SMSG_AUTH_RESPONSE => "SMSG_AUTH_RESPONSE",
            SMSG_REALM_LIST => "SMSG_REALM_LIST",
            SMSG_CHAR_LIST => "SMSG_CHAR_LIST",
            CMSG_PLAYER_LOGIN => "CMSG_PLAYER_LOGIN",
            SMSG_LOGIN_VERIFY => "SMSG_LOGIN_VERIFY",
            CMSG_LOGOUT_REQUEST => "CMSG_LOGOUT_REQUEST",
            SMSG_LOGOUT_COMPLETE => "SMSG_LOGOUT_COMPLETE",
            CMSG_MESSAGE_CHAT => "CMSG_MESSAGE_CHAT",
            SMSG_MESSAGE_CHAT => "SMSG_MESSAGE_CHAT",
            CMSG_JOIN_CHANNEL => "CMSG_JOIN_CHANNEL",
            CMSG_LEAVE_CHANNEL => "CMSG_LEAVE_CHANNEL",
            SMSG_MOTD => "SMSG_MOTD",
            SMSG_NOTIFICATION => "SMSG_NOTIFICATION",
            CMSG_GUILD_ROSTER => "CMSG_GUILD_ROSTER",
            SMSG_GUILD_ROSTER => "SMSG_GUILD_ROSTER",
            CMSG_ITEM_QUERY => "CMSG_ITEM_QUERY",
            SMSG_ITEM_INFO => "SMSG_ITEM_INFO",
            CMSG_QUEST_QUERY => "CMSG_QUEST_QUERY",
            SMSG_QUEST_INFO => "SMSG_QUEST_INFO",
            CMSG_NAME_QUERY => "CMSG_NAME_QUERY",
            SMSG_NAME_QUERY_FAIL => "SMSG_NAME_QUERY_FAIL",
            CMSG_FRIEND_ADD => "CMSG_FRIEND_ADD",
            CMSG_FRIEND_DEL => "CMSG_FRIEND_DEL",
            CMSG_IGNORE_ADD => "CMSG_IGNORE_ADD",
            CMSG_IGNORE_DEL => "CMSG_IGNORE_DEL",
            _ => "UNKNOWN",
        }
    }

    /// Classic offset / hex / ASCII dump, 16 bytes per row.
    pub fn hexdump(&self) -> String {
        let mut out = String::new();
        for (row, chunk) in self.data.chunks(16).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
                .collect();
            out.push_str(&format!("{:08x}  {:<47}  |{}|\n", row * 16, hex.join(" "), ascii));
        }
        out
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04X}), {} bytes", self.opcode_name(), self.opcode, self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_name_and_length() {
        let pk = Packet::new(opcodes::SMSG_MOTD, vec![1, 2, 3]);
        assert_eq!(pk.to_string(), "SMSG_MOTD (0x000E), 3 bytes");
    }

    #[test]
    fn hexdump_renders_printable_gutter() {
        let pk = Packet::new(opcodes::SMSG_MOTD, b"Hi\x00".to_vec());
        let dump = pk.hexdump();
        assert!(dump.starts_with("00000000  48 69 00"));
        assert!(dump.contains("|Hi.|"));
    }

    #[test]
    fn hexdump_splits_rows_at_sixteen_bytes() {
        let pk = Packet::new(0x999, (0..20u8).collect());
        let dump = pk.hexdump();
        assert_eq!(dump.lines().count(), 2);
        assert!(dump.lines().nth(1).unwrap().starts_with("00000010"));
        assert_eq!(pk.opcode_name(), "UNKNOWN");
    }
}
