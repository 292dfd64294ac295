//! Integration tests for the packet server, handler, and full connection flow.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use packetforge::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Packets and router
// =========================================================================

wire_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum Currency {
        #[default]
        Gold = 0,
        Reputation = 1,
    }
}

packet! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Buy => "buy" {
        #[index(0)]
        pub slot: i16,
        #[index(1)]
        pub amount: u8,
        #[index(2)]
        pub currency: Currency,
    }
}

packet! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Receipt => "receipt" {
        #[index(0)]
        pub slot: i16,
        #[index(1)]
        pub amount: u8,
        #[index(2)]
        pub currency: Currency,
    }
}

packet! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Say => "say" {
        #[index(0)]
        pub channel: u8,
        #[index(1, serialize_to_end)]
        pub message: String,
    }
}

fn router() -> Router {
    Router::with_registry(Arc::new(SchemaRegistry::new()))
        .route(|buy: Buy, outbox: &mut Outbox<'_>| {
            outbox.push(&Receipt {
                slot: buy.slot,
                amount: buy.amount,
                currency: buy.currency,
            });
        })
        .unwrap()
        .route(|say: Say, outbox: &mut Outbox<'_>| {
            outbox.push(&say);
        })
        .unwrap()
}

// =========================================================================
// Helpers
// =========================================================================

async fn start_server(builder: PacketServerBuilder) -> SocketAddr {
    let server = builder.bind("127.0.0.1:0").build(router()).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.unwrap()
}

async fn send(stream: &mut TcpStream, text: &str) {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0xFF);
    stream.write_all(&bytes).await.unwrap();
}

/// Reads one 0xFF-terminated reply. `None` means the server closed.
async fn read_frame(stream: &mut TcpStream) -> Option<String> {
    let mut frame = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let read = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut byte))
            .await
            .expect("timed out waiting for the server");
        match read {
            Ok(0) | Err(_) => return None,
            Ok(_) if byte[0] == 0xFF => return Some(String::from_utf8(frame).unwrap()),
            Ok(_) => frame.push(byte[0]),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_request_gets_reply() {
    let addr = start_server(PacketServer::builder()).await;
    let mut client = connect(addr).await;

    send(&mut client, "buy 3 12 1").await;
    assert_eq!(read_frame(&mut client).await.unwrap(), "receipt 3 12 1");
}

#[tokio::test]
async fn test_frames_in_one_write_are_handled_in_order() {
    let addr = start_server(PacketServer::builder()).await;
    let mut client = connect(addr).await;

    client
        .write_all(b"buy 1 1 0\xFFsay 2 meet me  at the gate\xFF")
        .await
        .unwrap();
    assert_eq!(read_frame(&mut client).await.unwrap(), "receipt 1 1 0");
    assert_eq!(
        read_frame(&mut client).await.unwrap(),
        "say 2 meet me  at the gate"
    );
}

#[tokio::test]
async fn test_malformed_packet_is_dropped_and_connection_survives() {
    let addr = start_server(PacketServer::builder()).await;
    let mut client = connect(addr).await;

    send(&mut client, "buy three 12 0").await;
    send(&mut client, "buy 4 1 0").await;
    assert_eq!(read_frame(&mut client).await.unwrap(), "receipt 4 1 0");
}

#[tokio::test]
async fn test_unknown_header_is_ignored() {
    let addr = start_server(PacketServer::builder()).await;
    let mut client = connect(addr).await;

    send(&mut client, "sell 3 12").await;
    send(&mut client, "buy 5 2 0").await;
    assert_eq!(read_frame(&mut client).await.unwrap(), "receipt 5 2 0");
}

#[tokio::test]
async fn test_unknown_enum_member_uses_default() {
    let addr = start_server(PacketServer::builder()).await;
    let mut client = connect(addr).await;

    send(&mut client, "buy 5 2 9").await;
    assert_eq!(read_frame(&mut client).await.unwrap(), "receipt 5 2 0");
}

#[tokio::test]
async fn test_leading_counter() {
    let addr = start_server(PacketServer::builder().leading_counter(true)).await;
    let mut client = connect(addr).await;

    send(&mut client, "1523 buy 1 9 0").await;
    assert_eq!(read_frame(&mut client).await.unwrap(), "receipt 1 9 0");
}

#[tokio::test]
async fn test_custom_delimiter() {
    let builder = PacketServer::builder().framing(FramingConfig::delimited(b'\n'));
    let addr = start_server(builder).await;
    let mut client = connect(addr).await;

    client.write_all(b"buy 7 1 0\n").await.unwrap();
    let mut reply = vec![0u8; "receipt 7 1 0\n".len()];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, b"receipt 7 1 0\n");
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let builder = PacketServer::builder().framing(FramingConfig::default().with_max_message_len(16));
    let addr = start_server(builder).await;
    let mut client = connect(addr).await;

    client.write_all(&[b'a'; 64]).await.unwrap();
    assert_eq!(read_frame(&mut client).await, None);
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let builder = PacketServer::builder().idle_timeout(Duration::from_millis(100));
    let addr = start_server(builder).await;
    let mut client = connect(addr).await;

    assert_eq!(read_frame(&mut client).await, None);
}

#[tokio::test]
async fn test_config_applies_to_builder() {
    let config = ServerConfig {
        includes_leading_counter: true,
        ..ServerConfig::default()
    };
    let addr = start_server(PacketServer::builder().config(config)).await;
    let mut client = connect(addr).await;

    send(&mut client, "7 buy 2 3 1").await;
    assert_eq!(read_frame(&mut client).await.unwrap(), "receipt 2 3 1");
}

#[tokio::test]
async fn test_router_leading_counter_survives_default_config() {
    let server = PacketServer::builder()
        .bind("127.0.0.1:0")
        .build(router().leading_counter(true))
        .await
        .unwrap();
    assert!(server.router().codec().includes_leading_counter());
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    let mut client = connect(addr).await;

    send(&mut client, "12 buy 6 1 0").await;
    assert_eq!(read_frame(&mut client).await.unwrap(), "receipt 6 1 0");
}

#[tokio::test]
async fn test_websocket_server() {
    let server = PacketServer::builder()
        .bind("127.0.0.1:0")
        .framing(FramingConfig::unframed())
        .build_websocket(router())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .unwrap();
    ws.send(Message::Text("buy 8 1 1".into())).await.unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(reply.into_data().as_ref(), b"receipt 8 1 1");
}
