//! Minimal wire driver behind the session interface.
//!
//! The driver owns the TCP transport and translates frames to [`Event`]s and
//! [`Request`]s to frames. Flow: dial the realm server, exchange credentials,
//! receive the realm list, follow the first realm to the world server on a
//! fresh connection (surfaced as [`Event::Reconnected`]), then shuttle
//! steady-state traffic. The full handshake state machine of the live game
//! protocol is intentionally not modeled here; the exchange is reduced to a
//! single credential frame per transport.

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::client::{Chat, Connection, Request, Social};
use crate::event::Event;
use crate::packet::{opcodes, Packet};
use crate::types::Player;
use crate::wire::{self, ServerFrame};

/// Where and as whom to connect.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    pub host: String,
    pub port: u16,
    pub account: String,
    pub password: String,
}

/// Dial the realm server and spawn the driver task.
///
/// Returns the request handle and the event stream the session layer runs on.
/// Connection errors on the initial dial are reported here; everything after
/// that arrives as events.
pub async fn connect(config: ConnectConfig) -> Result<(Connection, mpsc::UnboundedReceiver<Event>)> {
    let stream = TcpStream::connect((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("cannot reach realm server {}:{}", config.host, config.port))?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (conn, req_rx) = Connection::pair();
    tokio::spawn(run_session(stream, config, conn.clone(), req_rx, event_tx));
    Ok((conn, event_rx))
}

fn auth_packet(config: &ConnectConfig) -> Packet {
    let mut data = Vec::new();
    wire::put_str(&mut data, &config.account);
    wire::put_str(&mut data, &config.password);
    Packet::new(opcodes::CMSG_AUTH, data)
}

fn split_addr(addr: &str) -> Option<(String, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    let port = port.parse().ok()?;
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port))
}

/// Read frames off one transport into a channel so the driver can select
/// over frames and requests without tearing partially-read frames on cancel.
fn spawn_reader(mut read_half: OwnedReadHalf) -> mpsc::UnboundedReceiver<Packet> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            match wire::read_frame(&mut read_half).await {
                Ok(Some(pk)) => {
                    if tx.send(pk).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "transport read ended");
                    break;
                }
            }
        }
    });
    rx
}

async fn send_packet(
    writer: &mut OwnedWriteHalf,
    event_tx: &mpsc::UnboundedSender<Event>,
    pk: Packet,
) -> std::io::Result<()> {
    let bytes = wire::frame_bytes(&pk);
    let _ = event_tx.send(Event::PacketSent(pk));
    writer.write_all(&bytes).await
}

async fn run_session(
    stream: TcpStream,
    config: ConnectConfig,
    conn: Connection,
    mut req_rx: mpsc::UnboundedReceiver<Request>,
    event_tx: mpsc::UnboundedSender<Event>,
) {
    let (read_half, mut writer) = stream.into_split();
    let mut frames = spawn_reader(read_half);
    let mut conn = conn;

    if let Err(e) = send_packet(&mut writer, &event_tx, auth_packet(&config)).await {
        tracing::warn!(error = %e, "credential send failed");
        let _ = event_tx.send(Event::WorldClosed);
        return;
    }

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(pk) = frame else {
                    let _ = event_tx.send(Event::WorldClosed);
                    return;
                };
                let _ = event_tx.send(Event::PacketReceived(pk.clone()));
                let decoded = match wire::decode_frame(&pk) {
                    Ok(Some(decoded)) => decoded,
                    Ok(None) => {
                        tracing::debug!(opcode = pk.opcode, "unknown opcode ignored");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, opcode = pk.opcode, "undecodable frame skipped");
                        continue;
                    }
                };
                match decoded {
                    ServerFrame::AuthResponse { ok: true, .. } => {
                        let _ = event_tx.send(Event::AuthSucceeded);
                    }
                    ServerFrame::AuthResponse { ok: false, message } => {
                        let _ = event_tx.send(Event::AuthError(message));
                        return;
                    }
                    ServerFrame::RealmList(realms) => {
                        for (name, addr) in &realms {
                            let _ = event_tx.send(Event::RealmDiscovered {
                                name: name.clone(),
                                addr: addr.clone(),
                            });
                        }
                        let Some((name, addr)) = realms.into_iter().next() else {
                            let _ = event_tx.send(Event::AuthError("realm list is empty".into()));
                            return;
                        };
                        let Some((host, port)) = split_addr(&addr) else {
                            let _ = event_tx.send(Event::AuthError(format!("bad realm address {addr}")));
                            return;
                        };
                        let _ = event_tx.send(Event::RealmSelected {
                            name,
                            host: host.clone(),
                            port,
                        });
                        let world = match TcpStream::connect((host.as_str(), port)).await {
                            Ok(world) => world,
                            Err(e) => {
                                tracing::warn!(error = %e, %host, port, "world server unreachable");
                                let _ = event_tx.send(Event::WorldClosed);
                                return;
                            }
                        };
                        let (read_half, new_writer) = world.into_split();
                        writer = new_writer;
                        frames = spawn_reader(read_half);
                        let (new_conn, new_rx) = Connection::pair();
                        conn = new_conn.clone();
                        req_rx = new_rx;
                        let _ = event_tx.send(Event::Reconnected(new_conn));
                        let _ = event_tx.send(Event::WorldOpened);
                        if let Err(e) = send_packet(&mut writer, &event_tx, auth_packet(&config)).await {
                            tracing::warn!(error = %e, "world credential send failed");
                            let _ = event_tx.send(Event::WorldClosed);
                            return;
                        }
                    }
                    ServerFrame::CharList(chars) => {
                        let _ = event_tx.send(Event::CharacterList(chars));
                    }
                    ServerFrame::LoginVerify { guid, name, language, friends, ignores } => {
                        let player = Player { guid, name, language };
                        let chat = Chat::new(conn.clone());
                        let social = Social::new(conn.clone(), friends, ignores);
                        let _ = event_tx.send(Event::LoginSucceeded { player, chat, social });
                    }
                    ServerFrame::LogoutComplete => {
                        let _ = event_tx.send(Event::LogoutSucceeded);
                    }
                    ServerFrame::Message(msg) => {
                        let _ = event_tx.send(Event::MessageReceived(msg));
                    }
                    ServerFrame::Motd(motd) => {
                        let _ = event_tx.send(Event::MotdReceived(motd));
                    }
                    ServerFrame::Notification { channel: true, text } => {
                        let _ = event_tx.send(Event::ChannelNotification(text));
                    }
                    ServerFrame::Notification { channel: false, text } => {
                        let _ = event_tx.send(Event::ServerNotification(text));
                    }
                    ServerFrame::GuildRoster(guild) => {
                        let _ = event_tx.send(Event::GuildUpdated(guild));
                    }
                    ServerFrame::ItemInfo(item) => {
                        let _ = event_tx.send(Event::ItemReceived(item));
                    }
                    ServerFrame::QuestInfo(quest) => {
                        let _ = event_tx.send(Event::QuestReceived(quest));
                    }
                    ServerFrame::NameQueryFail(name) => {
                        let _ = event_tx.send(Event::PlayerNotFound(name));
                    }
                }
            }
            req = req_rx.recv() => {
                let Some(req) = req else { return };
                if matches!(req, Request::Quit) {
                    let _ = writer.shutdown().await;
                    return;
                }
                let Some(pk) = wire::encode_request(&req) else { continue };
                if let Err(e) = send_packet(&mut writer, &event_tx, pk).await {
                    tracing::warn!(error = %e, "request send failed");
                    let _ = event_tx.send(Event::WorldClosed);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{put_str, write_frame};
    use tokio::net::TcpListener;

    fn frame(opcode: u16, build: impl FnOnce(&mut Vec<u8>)) -> Packet {
        let mut data = Vec::new();
        build(&mut data);
        Packet::new(opcode, data)
    }

    async fn next_real_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        loop {
            match rx.recv().await.expect("event stream ended") {
                Event::PacketSent(_) | Event::PacketReceived(_) => continue,
                ev => return ev,
            }
        }
    }

    #[tokio::test]
    async fn auth_failure_surfaces_as_auth_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut read = vec![0u8; 4];
            tokio::io::AsyncReadExt::read_exact(&mut sock, &mut read).await.unwrap();
            let len = u16::from_be_bytes([read[2], read[3]]) as usize;
            let mut payload = vec![0u8; len];
            tokio::io::AsyncReadExt::read_exact(&mut sock, &mut payload).await.unwrap();

            let pk = frame(opcodes::SMSG_AUTH_RESPONSE, |d| {
                d.push(1);
                put_str(d, "account banned");
            });
            write_frame(&mut sock, &pk).await.unwrap();
        });

        let (_conn, mut events) = connect(ConnectConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            account: "alice".into(),
            password: "secret".into(),
        })
        .await
        .unwrap();

        match next_real_event(&mut events).await {
            Event::AuthError(msg) => assert_eq!(msg, "account banned"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn realm_hop_replaces_the_connection() {
        let world = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let world_addr = world.local_addr().unwrap();
        let realm = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let realm_addr = realm.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut sock, _) = realm.accept().await.unwrap();
            // consume the credential frame, accept it, advertise one realm
            let _ = wire::read_frame(&mut sock).await.unwrap();
            let ok = frame(opcodes::SMSG_AUTH_RESPONSE, |d| {
                d.push(0);
                put_str(d, "");
            });
            write_frame(&mut sock, &ok).await.unwrap();
            let realms = frame(opcodes::SMSG_REALM_LIST, |d| {
                d.push(1);
                put_str(d, "Sanctuary");
                put_str(d, &world_addr.to_string());
            });
            write_frame(&mut sock, &realms).await.unwrap();
        });

        tokio::spawn(async move {
            let (mut sock, _) = world.accept().await.unwrap();
            let _ = wire::read_frame(&mut sock).await.unwrap();
            let chars = frame(opcodes::SMSG_CHAR_LIST, |d| {
                d.push(1);
                d.extend_from_slice(&7u64.to_be_bytes());
                put_str(d, "Kael");
                put_str(d, "Troll");
                put_str(d, "Priest");
                d.push(70);
            });
            write_frame(&mut sock, &chars).await.unwrap();
            // keep the socket open long enough for the client to observe it
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        });

        let (_conn, mut events) = connect(ConnectConfig {
            host: realm_addr.ip().to_string(),
            port: realm_addr.port(),
            account: "alice".into(),
            password: "secret".into(),
        })
        .await
        .unwrap();

        assert!(matches!(next_real_event(&mut events).await, Event::AuthSucceeded));
        assert!(matches!(next_real_event(&mut events).await, Event::RealmDiscovered { .. }));
        match next_real_event(&mut events).await {
            Event::RealmSelected { name, .. } => assert_eq!(name, "Sanctuary"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(next_real_event(&mut events).await, Event::Reconnected(_)));
        assert!(matches!(next_real_event(&mut events).await, Event::WorldOpened));
        match next_real_event(&mut events).await {
            Event::CharacterList(chars) => {
                assert_eq!(chars.len(), 1);
                assert_eq!(chars[0].name, "Kael");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
