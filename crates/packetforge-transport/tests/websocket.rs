//! Integration tests for the WebSocket transport.
//!
//! A real server and a tokio-tungstenite client talk over loopback so the
//! framer is exercised on actual WebSocket messages.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use packetforge_transport::{Connection, FramingConfig, Transport, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientStream = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds a transport on an OS-assigned port, accepts one client, and
    /// returns both ends.
    async fn pair(
        framing: FramingConfig,
    ) -> (packetforge_transport::WebSocketConnection, ClientStream) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0", framing)
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have an address");

        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let server = server_handle.await.expect("task should complete");
        (server, client)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (server_conn, mut client_ws) = pair(FramingConfig::unframed()).await;
        assert!(server_conn.id().into_inner() > 0);

        server_conn
            .send(b"hello from server")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from server");

        client_ws
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received.as_bytes(), b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_message_with_several_frames() {
        let (server_conn, mut client_ws) = pair(FramingConfig::default()).await;

        client_ws
            .send(Message::Binary(b"walk 1 2\xFFsay hi\xFF".to_vec().into()))
            .await
            .unwrap();

        let first = server_conn.recv().await.unwrap().unwrap();
        let second = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(first.text(), "walk 1 2");
        assert_eq!(second.text(), "say hi");
    }

    #[tokio::test]
    async fn test_websocket_send_appends_delimiter() {
        let (server_conn, mut client_ws) = pair(FramingConfig::default()).await;

        server_conn.send(b"in 1").await.unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"in 1\xFF");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server_conn, mut client_ws) = pair(FramingConfig::unframed()).await;

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }
}
