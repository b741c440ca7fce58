//! Integration tests driving the full HTTP/WebSocket surface against a
//! server bound to an ephemeral port.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use huddle_server::{hub::Hub, router, state::AppState};
use huddle_shared::{event::Event, time::SystemClock};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind a server on an ephemeral port and serve it in the background.
async fn spawn_server() -> SocketAddr {
    let state = Arc::new(AppState {
        hub: Hub::new(Arc::new(SystemClock)),
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    addr
}

/// Open a realtime connection for the given identity.
async fn connect(addr: SocketAddr, client_id: &str) -> WsStream {
    let url = format!("ws://{addr}/ws?client_id={client_id}");
    let (stream, _response) = connect_async(&url)
        .await
        .expect("Failed to open WebSocket connection");
    stream
}

/// Read the next decodable event from the stream, with a timeout.
async fn next_event(stream: &mut WsStream) -> Event {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            let msg = stream
                .next()
                .await
                .expect("Stream ended unexpectedly")
                .expect("WebSocket read error");
            if let Message::Text(text) = msg {
                return Event::decode(&text).expect("Server sent a malformed event");
            }
        }
    })
    .await
    .expect("Timed out waiting for an event")
}

/// Send one event as a text frame.
async fn send_event(stream: &mut WsStream, event: &Event) {
    let payload = event.encode().expect("Failed to encode event");
    stream
        .send(Message::Text(payload.into()))
        .await
        .expect("Failed to send frame");
}

async fn post_message(addr: SocketAddr, text: &str, sender: &str) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/messages"))
        .json(&serde_json::json!({ "text": text, "sender": sender }))
        .send()
        .await
        .expect("Gateway request failed")
        .status()
}

#[tokio::test]
async fn test_health_check() {
    // given:
    let addr = spawn_server().await;

    // when:
    let response = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .expect("Health request failed");

    // then:
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_join_presence_and_gateway_message_flow() {
    // given: alice connects and learns she is alone
    let addr = spawn_server().await;
    let mut alice = connect(addr, "alice").await;
    assert_eq!(next_event(&mut alice).await, Event::ConnectionCount { count: 1 });

    // when: bob connects
    let mut bob = connect(addr, "bob").await;

    // then: bob learns the count without a self-notification, alice sees
    // exactly one user_joined
    assert_eq!(next_event(&mut bob).await, Event::ConnectionCount { count: 2 });
    match next_event(&mut alice).await {
        Event::UserJoined { count, .. } => assert_eq!(count, 2),
        other => panic!("expected user_joined, got {other:?}"),
    }

    // when: alice submits "hi" through the gateway
    let status = post_message(addr, "hi", "alice").await;
    assert!(status.is_success());

    // then: both logs gain exactly one copy of the message
    for stream in [&mut alice, &mut bob] {
        match next_event(stream).await {
            Event::Message { message } => {
                assert_eq!(message.text, "hi");
                assert_eq!(message.sender, "alice");
                assert!(!message.system);
            }
            other => panic!("expected message, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_gateway_rejects_empty_text() {
    // given:
    let addr = spawn_server().await;

    // when / then:
    assert_eq!(
        post_message(addr, "", "alice").await,
        reqwest::StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        post_message(addr, "   ", "alice").await,
        reqwest::StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn test_duplicate_identity_is_rejected_with_conflict() {
    // given:
    let addr = spawn_server().await;
    let _alice = connect(addr, "alice").await;

    // when: a second connection claims the same identity
    let url = format!("ws://{addr}/ws?client_id=alice");
    let result = connect_async(&url).await;

    // then: the upgrade is refused with 409
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 409);
        }
        other => panic!("expected HTTP 409 rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_play_sound_is_not_echoed_to_sender() {
    // given: three connected clients, queues drained
    let addr = spawn_server().await;
    let mut alice = connect(addr, "alice").await;
    next_event(&mut alice).await; // connection_count 1
    let mut bob = connect(addr, "bob").await;
    next_event(&mut bob).await; // connection_count 2
    next_event(&mut alice).await; // user_joined 2
    let mut carol = connect(addr, "carol").await;
    next_event(&mut carol).await; // connection_count 3
    next_event(&mut alice).await; // user_joined 3
    next_event(&mut bob).await; // user_joined 3

    // when:
    send_event(
        &mut alice,
        &Event::PlaySound {
            sender: "alice".to_string(),
        },
    )
    .await;

    // then: bob and carol hear it
    for stream in [&mut bob, &mut carol] {
        assert_eq!(
            next_event(stream).await,
            Event::PlaySound {
                sender: "alice".to_string()
            }
        );
    }

    // and: alice's next event is the subsequent gateway message, not an
    // echo of her own sound. The hub serializes both, so by the time bob
    // heard the sound the sound had been fanned out.
    let status = post_message(addr, "after the sound", "alice").await;
    assert!(status.is_success());
    match next_event(&mut alice).await {
        Event::Message { message } => assert_eq!(message.text, "after the sound"),
        other => panic!("expected message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_frame_does_not_kill_the_connection() {
    // given: two connected clients
    let addr = spawn_server().await;
    let mut alice = connect(addr, "alice").await;
    next_event(&mut alice).await; // connection_count 1
    let mut bob = connect(addr, "bob").await;
    next_event(&mut bob).await; // connection_count 2
    next_event(&mut alice).await; // user_joined 2

    // when: alice sends an unknown tag, a frame with no tag, and garbage,
    // then a well-formed typing event
    alice
        .send(Message::Text(r#"{"type":"bogus"}"#.into()))
        .await
        .expect("Failed to send frame");
    alice
        .send(Message::Text(r#"{"sender":"alice"}"#.into()))
        .await
        .expect("Failed to send frame");
    alice
        .send(Message::Text("not json at all".into()))
        .await
        .expect("Failed to send frame");
    send_event(
        &mut alice,
        &Event::Typing {
            sender: "alice".to_string(),
        },
    )
    .await;

    // then: the connection survived and the typing event still went through
    assert_eq!(
        next_event(&mut bob).await,
        Event::Typing {
            sender: "alice".to_string()
        }
    );
}

#[tokio::test]
async fn test_disconnect_broadcasts_user_left_and_clears_typing() {
    // given: bob is typing
    let addr = spawn_server().await;
    let mut alice = connect(addr, "alice").await;
    next_event(&mut alice).await; // connection_count 1
    let mut bob = connect(addr, "bob").await;
    next_event(&mut bob).await; // connection_count 2
    next_event(&mut alice).await; // user_joined 2
    send_event(
        &mut bob,
        &Event::Typing {
            sender: "bob".to_string(),
        },
    )
    .await;
    assert_eq!(
        next_event(&mut alice).await,
        Event::Typing {
            sender: "bob".to_string()
        }
    );

    // when: bob's connection closes
    bob.close(None).await.expect("Failed to close");

    // then: alice observes exactly one user_left with the decremented count
    match next_event(&mut alice).await {
        Event::UserLeft { count, .. } => assert_eq!(count, 1),
        other => panic!("expected user_left, got {other:?}"),
    }

    // and: the debug snapshot shows bob gone from registry and typing set
    let snapshot: serde_json::Value = reqwest::get(format!("http://{addr}/debug/room"))
        .await
        .expect("Debug request failed")
        .json()
        .await
        .expect("Debug response was not JSON");
    assert_eq!(snapshot["count"], 1);
    assert_eq!(snapshot["typing"], serde_json::json!([]));
}

#[tokio::test]
async fn test_typing_event_with_unknown_sender_is_dropped() {
    // given:
    let addr = spawn_server().await;
    let mut alice = connect(addr, "alice").await;
    next_event(&mut alice).await; // connection_count 1
    let mut bob = connect(addr, "bob").await;
    next_event(&mut bob).await; // connection_count 2
    next_event(&mut alice).await; // user_joined 2

    // when: alice tries to type as bob, then as herself
    send_event(
        &mut alice,
        &Event::Typing {
            sender: "bob".to_string(),
        },
    )
    .await;
    send_event(
        &mut alice,
        &Event::Typing {
            sender: "alice".to_string(),
        },
    )
    .await;

    // then: only the honest event arrives
    assert_eq!(
        next_event(&mut bob).await,
        Event::Typing {
            sender: "alice".to_string()
        }
    );
    match tokio::time::timeout(Duration::from_millis(300), bob.next()).await {
        Err(_elapsed) => {}
        Ok(frame) => panic!("expected no further frames, got {frame:?}"),
    }
}
