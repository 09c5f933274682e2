mod common;

use common::init_test_logging;
use wsframe::{
    parse_frame, CloseCode, CloseFrame, Connection, ConnectionState, Event, FrameBuilder,
    ConfigError, HandshakeRequest, HandshakeResponse, Message, Opcode, OwnedFrame, WsConfig,
    WsError,
};

fn handshake(client: &mut Connection, server: &mut Connection) {
    let text = client
        .start_handshake(HandshakeRequest::new("example.com", "/ws"))
        .unwrap();
    let response = server.accept_request(text.as_bytes()).unwrap();
    client
        .accept_response(response.build().unwrap().as_bytes())
        .unwrap();
}

fn open_pair(config: WsConfig) -> (Connection, Connection) {
    let mut client = Connection::client(config.clone()).unwrap();
    let mut server = Connection::server(config).unwrap();
    handshake(&mut client, &mut server);
    (client, server)
}

fn drain(conn: &mut Connection, now: u64) -> Result<Vec<Event>, WsError> {
    let mut events = Vec::new();
    while !conn.state().is_closed() {
        match conn.next_event(now)? {
            Some(event) => events.push(event),
            None => break,
        }
    }
    Ok(events)
}

fn deliver(from: &mut Connection, to: &mut Connection, now: u64) -> Vec<Event> {
    let bytes = from.take_outbound();
    to.receive(&bytes).unwrap();
    drain(to, now).unwrap()
}

fn outbound_frames(conn: &mut Connection) -> Vec<OwnedFrame> {
    let bytes = conn.take_outbound();
    let mut rest = &bytes[..];
    let mut frames = Vec::new();
    while !rest.is_empty() {
        let frame = parse_frame(rest).unwrap();
        rest = &rest[frame.wire_len()..];
        frames.push(frame.into());
    }
    frames
}

#[test]
fn lifecycle_matrix() {
    init_test_logging();
    let mut client = Connection::client(WsConfig::default()).unwrap();
    let mut server = Connection::server(WsConfig::default()).unwrap();
    assert_eq!(client.state(), ConnectionState::Connecting);
    assert_eq!(server.state(), ConnectionState::Connecting);

    handshake(&mut client, &mut server);
    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(server.state(), ConnectionState::Open);

    server.close(CloseCode::GoingAway, "restart").unwrap();
    assert_eq!(server.state(), ConnectionState::Closing);
    let events = deliver(&mut server, &mut client, 0);
    assert_eq!(
        events,
        vec![Event::Close(CloseFrame::new(CloseCode::GoingAway, "restart"))]
    );
    assert_eq!(client.state(), ConnectionState::Closed);

    deliver(&mut client, &mut server, 0);
    assert_eq!(server.state(), ConnectionState::Closed);
}

#[test]
fn forged_accept_key_keeps_connecting() {
    init_test_logging();
    let mut client = Connection::client(WsConfig::default()).unwrap();
    client
        .start_handshake(HandshakeRequest::new("h", "/"))
        .unwrap();
    let other = HandshakeRequest::new("h", "/");
    let forged = HandshakeResponse::accept(&other).build().unwrap();
    assert!(matches!(
        client.accept_response(forged.as_bytes()),
        Err(WsError::HandshakeRejected(_))
    ));
    assert_eq!(client.state(), ConnectionState::Connecting);
    assert_eq!(
        client.send_text("nope"),
        Err(WsError::NotOpen(ConnectionState::Connecting))
    );
}

#[test]
fn handshake_roles_enforced() {
    init_test_logging();
    let mut server = Connection::server(WsConfig::default()).unwrap();
    assert!(matches!(
        server.start_handshake(HandshakeRequest::new("h", "/")),
        Err(WsError::InvalidHandshake(_))
    ));
    let mut client = Connection::client(WsConfig::default()).unwrap();
    assert!(matches!(
        client.accept_response(b"HTTP/1.1 101 Switching Protocols\r\n\r\n"),
        Err(WsError::InvalidHandshake(_))
    ));
}

#[test]
fn frames_coalesced_with_handshake_heads() {
    init_test_logging();
    let mut client = Connection::client(WsConfig::default()).unwrap();
    let mut server = Connection::server(WsConfig::default()).unwrap();
    let request = client
        .start_handshake(HandshakeRequest::new("example.com", "/ws"))
        .unwrap();

    // Request head and an early client frame arrive in one read.
    let mut client_side = FrameBuilder::client();
    client_side.text("early");
    let mut inbound = request.into_bytes();
    inbound.extend_from_slice(&client_side.build());
    let response = server.accept_request(&inbound).unwrap();
    assert_eq!(
        drain(&mut server, 0).unwrap(),
        vec![Event::Message(Message::Text("early".into()))]
    );

    // Same for the 101 response followed by a server frame.
    server.send_binary(&[1, 2, 3]).unwrap();
    let mut inbound = response.build().unwrap().into_bytes();
    inbound.extend_from_slice(&server.take_outbound());
    client.accept_response(&inbound).unwrap();
    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(
        drain(&mut client, 0).unwrap(),
        vec![Event::Message(Message::Binary(vec![1, 2, 3]))]
    );
}

#[test]
fn partial_head_waits_for_more() {
    init_test_logging();
    let mut server = Connection::server(WsConfig::default()).unwrap();
    let request = HandshakeRequest::new("h", "/").build().unwrap();
    let cut = request.len() - 2;
    assert_eq!(
        server.accept_request(&request.as_bytes()[..cut]),
        Err(WsError::IncompleteHandshake)
    );
    assert_eq!(server.state(), ConnectionState::Connecting);
    server.accept_request(request.as_bytes()).unwrap();
    assert_eq!(server.state(), ConnectionState::Open);
}

#[test]
fn subprotocol_selected_from_offer_list() {
    init_test_logging();
    let mut client = Connection::client(WsConfig::default()).unwrap();
    let mut server = Connection::server(WsConfig::default()).unwrap();
    let request = client
        .start_handshake(HandshakeRequest::new("h", "/").with_protocol("v2.proto, v1.proto"))
        .unwrap();
    let response = server.accept_request(request.as_bytes()).unwrap();
    assert_eq!(response.protocol.as_deref(), Some("v2.proto"));
    client
        .accept_response(response.build().unwrap().as_bytes())
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Open);
}

#[test]
fn constructors_validate_config() {
    init_test_logging();
    let zero_fragments = WsConfig {
        fragment_size: Some(0),
        ..WsConfig::default()
    };
    assert!(matches!(
        Connection::server(zero_fragments),
        Err(ConfigError::Invalid(_))
    ));
    assert!(Connection::client(WsConfig::default()).is_ok());
}

#[test]
fn client_frames_masked_server_frames_not() {
    init_test_logging();
    let (mut client, mut server) = open_pair(WsConfig::default());
    client.send_text("up").unwrap();
    server.send_text("down").unwrap();
    let up = outbound_frames(&mut client);
    let down = outbound_frames(&mut server);
    assert!(up[0].header.masked());
    assert!(!down[0].header.masked());
    assert_eq!(up[0].payload, b"up");
    assert_eq!(down[0].payload, b"down");
}

#[test]
fn unmasked_client_frame_fails_server() {
    init_test_logging();
    let (_, mut server) = open_pair(WsConfig::default());
    let mut rogue = FrameBuilder::server();
    rogue.text("unmasked");
    server.receive(&rogue.build()).unwrap();
    assert_eq!(server.next_event(0), Err(WsError::MaskRequired));
    assert_eq!(server.state(), ConnectionState::Closing);

    let frames = outbound_frames(&mut server);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].header.opcode, Opcode::Close);
    assert_eq!(
        CloseFrame::parse(&frames[0].payload).unwrap().code,
        Some(CloseCode::ProtocolError)
    );
}

#[test]
fn oversized_message_closes_with_1009() {
    init_test_logging();
    let config = WsConfig {
        max_message_size: 8,
        ..WsConfig::default()
    };
    let (mut client, mut server) = open_pair(config);
    client.send_binary(&[0u8; 9]).unwrap();
    let bytes = client.take_outbound();
    server.receive(&bytes).unwrap();
    assert_eq!(
        server.next_event(0),
        Err(WsError::PayloadTooLarge { len: 9, max: 8 })
    );
    let frames = outbound_frames(&mut server);
    assert_eq!(
        CloseFrame::parse(&frames[0].payload).unwrap().code,
        Some(CloseCode::MessageTooBig)
    );
}

#[test]
fn invalid_text_closes_with_1007() {
    init_test_logging();
    let (_, mut server) = open_pair(WsConfig::default());
    let mut client_side = FrameBuilder::client();
    client_side.write_frame(Opcode::Text, true, &[0xff, 0xfe]).unwrap();
    server.receive(&client_side.build()).unwrap();
    assert_eq!(server.next_event(0), Err(WsError::InvalidUtf8));
    let frames = outbound_frames(&mut server);
    assert_eq!(
        CloseFrame::parse(&frames[0].payload).unwrap().code,
        Some(CloseCode::InvalidFrame)
    );
}

#[test]
fn auto_pong_can_be_disabled() {
    init_test_logging();
    let config = WsConfig {
        auto_pong: false,
        ..WsConfig::default()
    };
    let (mut client, mut server) = open_pair(config);
    client.send_ping(b"1", 0).unwrap();
    assert_eq!(
        deliver(&mut client, &mut server, 0),
        vec![Event::Ping(b"1".to_vec())]
    );
    assert!(!server.has_outbound());
    server.send_pong(b"1").unwrap();
    assert_eq!(
        deliver(&mut server, &mut client, 5),
        vec![Event::Pong(b"1".to_vec())]
    );
}

#[test]
fn fragmented_send_reassembles() {
    init_test_logging();
    let config = WsConfig {
        fragment_size: Some(3),
        ..WsConfig::default()
    };
    let (mut client, mut server) = open_pair(config);
    client.send_text("fragmented message").unwrap();
    assert_eq!(
        deliver(&mut client, &mut server, 0),
        vec![Event::Message(Message::Text("fragmented message".into()))]
    );
}

#[test]
fn split_delivery() {
    init_test_logging();
    let (mut client, mut server) = open_pair(WsConfig::default());
    client.send_text("first").unwrap();
    client.send_binary(&[9; 200]).unwrap();
    let bytes = client.take_outbound();
    let mut events = Vec::new();
    for chunk in bytes.chunks(7) {
        server.receive(chunk).unwrap();
        events.extend(drain(&mut server, 0).unwrap());
    }
    assert_eq!(
        events,
        vec![
            Event::Message(Message::Text("first".into())),
            Event::Message(Message::Binary(vec![9; 200])),
        ]
    );
}

#[test]
fn closed_connection_refuses_work() {
    init_test_logging();
    let (mut client, _) = open_pair(WsConfig::default());
    client.transport_closed();
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(client.send_binary(b"x"), Err(WsError::ConnectionClosed));
    assert_eq!(client.send_ping(b"", 0), Err(WsError::ConnectionClosed));
    assert_eq!(client.close(CloseCode::Normal, ""), Err(WsError::ConnectionClosed));
    assert_eq!(client.receive(b"\x81\x00"), Err(WsError::ConnectionClosed));
    assert_eq!(client.next_event(0), Err(WsError::ConnectionClosed));
}
