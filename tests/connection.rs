use std::fmt::Debug;

use commonsfish::{
    ClientConfig, ConnectionEvent, ConnectionManager, EventReceiver, LinkState, ObserverEvent,
    PlayerCommand, PlayerEvent, RoundDecision, SubmissionState, SubmitRejection,
};
use commonsfish_core::{decode, ClientMsg, PlayerId};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use url::Url;

type ServerSocket = WebSocketStream<TcpStream>;

const RED_NET_CENTER: (f32, f32) = (720.0, 155.0);

async fn coordinator() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let url = Url::parse(&format!("ws://{addr}/ws")).expect("url");
    (listener, url)
}

async fn accept(listener: &TcpListener) -> ServerSocket {
    let (stream, _) = timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("client never connected")
        .expect("accept");
    accept_async(stream).await.expect("upgrade")
}

async fn recv_client(ws: &mut ServerSocket) -> ClientMsg {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("client went quiet")
            .expect("stream ended")
            .expect("frame");
        if let Message::Text(text) = frame {
            return decode(text.as_str()).expect("client message");
        }
    }
}

async fn send_json(ws: &mut ServerSocket, value: Value) {
    ws.send(Message::text(value.to_string())).await.expect("send");
}

fn state(round_num: u32, submitted: &[&str]) -> Value {
    json!({
        "type": "state",
        "state": {
            "room_code": "POND",
            "round_num": round_num,
            "rounds_total": 3,
            "stock": 100,
            "max_harvest_per_player": 10,
            "started": true,
            "finished": false,
            "players": [{ "player_id": 7, "name": "Ana" }],
            "submitted": submitted,
            "totals": { "7": 0 }
        }
    })
}

async fn expect_event<E, F>(events: &mut EventReceiver<E>, mut matches: F) -> ConnectionEvent<E>
where
    E: Debug,
    F: FnMut(&ConnectionEvent<E>) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("driver stopped early");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn config(url: Url) -> ClientConfig {
    ClientConfig::new(url)
        .with_reconnect_delay(Duration::from_millis(50))
        .with_board_seed(3)
}

#[tokio::test]
async fn join_submit_and_resume_after_reconnect() {
    let (listener, url) = coordinator().await;
    let (handle, mut events) =
        ConnectionManager::join(config(url), "POND", "Ana").expect("valid join");

    let mut ws = accept(&listener).await;
    let join = ClientMsg::Join {
        room_code: "POND".to_string(),
        name: "Ana".to_string(),
    };
    assert_eq!(recv_client(&mut ws).await, join);
    send_json(&mut ws, json!({ "type": "joined", "player_id": 7 })).await;
    let ack = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Acknowledged { .. })
    })
    .await;
    assert_eq!(
        ack,
        ConnectionEvent::Acknowledged {
            player_id: Some(PlayerId::new("7"))
        }
    );

    send_json(&mut ws, state(1, &[])).await;
    expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Session(PlayerEvent::Synced { .. }))
    })
    .await;

    handle
        .send(PlayerCommand::Place {
            token: 0,
            pos: RED_NET_CENTER,
        })
        .expect("driver alive");
    handle.send(PlayerCommand::Submit).expect("driver alive");
    assert_eq!(recv_client(&mut ws).await, ClientMsg::Submit { harvest: 4 });
    let submitted = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Session(PlayerEvent::Submitted { .. }))
    })
    .await;
    let ConnectionEvent::Session(PlayerEvent::Submitted { harvest, view, .. }) = submitted else {
        unreachable!();
    };
    assert_eq!(harvest, 4);
    assert_eq!(view.tokens.len(), 9);

    ws.close(None).await.expect("close");
    drop(ws);
    expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Link(LinkState::Disconnected))
    })
    .await;

    let mut ws = accept(&listener).await;
    assert_eq!(recv_client(&mut ws).await, join);
    send_json(&mut ws, state(1, &["7"])).await;
    let resumed = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Session(PlayerEvent::Synced { .. }))
    })
    .await;
    let ConnectionEvent::Session(PlayerEvent::Synced { outcome, view }) = resumed else {
        unreachable!();
    };
    assert_eq!(outcome.decision, RoundDecision::InRound);
    assert_eq!(outcome.after, SubmissionState::Locked { round_num: 1 });
    assert_eq!(view.tokens.len(), 9);

    send_json(&mut ws, state(2, &[])).await;
    let next = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Session(PlayerEvent::Synced { .. }))
    })
    .await;
    let ConnectionEvent::Session(PlayerEvent::Synced { outcome, view }) = next else {
        unreachable!();
    };
    assert!(outcome.unlocked());
    assert_eq!(view.submission, SubmissionState::Active);
    assert_eq!(view.tokens.len(), 10);

    let sync = handle.shutdown().await.expect("consumer returned");
    assert_eq!(sync.session().last_round_rendered(), Some(2));
}

#[tokio::test]
async fn unsubmitted_placements_survive_a_reconnect() {
    let (listener, url) = coordinator().await;
    let (handle, mut events) =
        ConnectionManager::join(config(url), "POND", "Bo").expect("valid join");

    let mut ws = accept(&listener).await;
    recv_client(&mut ws).await;
    send_json(&mut ws, json!({ "type": "joined", "player_id": 7 })).await;
    send_json(&mut ws, state(1, &[])).await;
    expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Session(PlayerEvent::Synced { .. }))
    })
    .await;

    handle
        .send(PlayerCommand::Place {
            token: 0,
            pos: RED_NET_CENTER,
        })
        .expect("driver alive");
    let placed = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Session(PlayerEvent::Input { .. }))
    })
    .await;
    let ConnectionEvent::Session(PlayerEvent::Input { view, .. }) = placed else {
        unreachable!();
    };
    assert_eq!(view.quote.correct, 1);

    ws.close(None).await.expect("close");
    drop(ws);
    expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Link(LinkState::Disconnected))
    })
    .await;

    let mut ws = accept(&listener).await;
    recv_client(&mut ws).await;
    send_json(&mut ws, state(1, &[])).await;
    let resumed = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Session(PlayerEvent::Synced { .. }))
    })
    .await;
    let ConnectionEvent::Session(PlayerEvent::Synced { outcome, view }) = resumed else {
        unreachable!();
    };
    assert_eq!(outcome.decision, RoundDecision::InRound);
    assert_eq!(outcome.after, SubmissionState::Active);
    assert_eq!(view.quote.correct, 1);
    assert_eq!(view.tokens.len(), 10);

    handle.shutdown().await;
}

#[tokio::test]
async fn advisories_do_not_drop_the_channel() {
    let (listener, url) = coordinator().await;
    let (handle, mut events) =
        ConnectionManager::join(config(url), "POND", "Bo").expect("valid join");

    let mut ws = accept(&listener).await;
    recv_client(&mut ws).await;
    send_json(&mut ws, json!({ "type": "joined" })).await;
    send_json(&mut ws, json!({ "type": "error", "message": "room is full" })).await;
    let advisory = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Advisory(_))
    })
    .await;
    assert_eq!(advisory, ConnectionEvent::Advisory("room is full".to_string()));

    send_json(&mut ws, json!({ "type": "state", "state": { "room_code": "POND" } })).await;
    expect_event(&mut events, |event| matches!(event, ConnectionEvent::Advisory(_))).await;
    send_json(&mut ws, json!({ "type": "weather", "sky": "grey" })).await;

    send_json(&mut ws, state(1, &[])).await;
    let synced = expect_event(&mut events, |event| {
        matches!(
            event,
            ConnectionEvent::Session(PlayerEvent::Synced { .. }) | ConnectionEvent::Link(_)
        )
    })
    .await;
    assert!(matches!(
        synced,
        ConnectionEvent::Session(PlayerEvent::Synced { .. })
    ));

    handle.shutdown().await.expect("consumer returned");
}

#[tokio::test]
async fn submit_while_reconnecting_is_rejected() {
    let (listener, url) = coordinator().await;
    let config = config(url).with_reconnect_delay(Duration::from_secs(30));
    let (handle, mut events) =
        ConnectionManager::join(config, "POND", "Cy").expect("valid join");

    let mut ws = accept(&listener).await;
    recv_client(&mut ws).await;
    send_json(&mut ws, json!({ "type": "joined", "player_id": "c" })).await;
    send_json(&mut ws, state(1, &[])).await;
    expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Session(PlayerEvent::Synced { .. }))
    })
    .await;

    ws.close(None).await.expect("close");
    drop(ws);
    expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Reconnecting { attempt: 1, .. })
    })
    .await;

    handle.send(PlayerCommand::Submit).expect("driver alive");
    let rejected = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Session(PlayerEvent::SubmitRejected { .. }))
    })
    .await;
    assert_eq!(
        rejected,
        ConnectionEvent::Session(PlayerEvent::SubmitRejected {
            reason: SubmitRejection::Offline
        })
    );

    let sync = handle.shutdown().await.expect("consumer returned");
    assert_eq!(sync.session().submission_state(), SubmissionState::Active);
}

#[tokio::test]
async fn gives_up_after_the_attempt_budget() {
    let (listener, url) = coordinator().await;
    let config = config(url).with_max_reconnect_attempts(Some(0));
    let (_handle, mut events) =
        ConnectionManager::join(config, "POND", "Di").expect("valid join");

    let mut ws = accept(&listener).await;
    recv_client(&mut ws).await;
    ws.close(None).await.expect("close");
    drop(ws);

    let gave_up = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::GaveUp { .. })
    })
    .await;
    assert_eq!(gave_up, ConnectionEvent::GaveUp { attempts: 0 });
    expect_event(&mut events, |event| matches!(event, ConnectionEvent::Stopped)).await;
}

#[tokio::test]
async fn observer_treats_first_state_as_acknowledgement() {
    let (listener, url) = coordinator().await;
    let (handle, mut events) =
        ConnectionManager::observe(config(url), "POND", "2468").expect("valid observe");

    let mut ws = accept(&listener).await;
    assert_eq!(
        recv_client(&mut ws).await,
        ClientMsg::Observe {
            room_code: "POND".to_string(),
            pin: "2468".to_string(),
        }
    );
    send_json(&mut ws, state(2, &[])).await;

    let ack = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Acknowledged { .. })
    })
    .await;
    assert_eq!(ack, ConnectionEvent::Acknowledged { player_id: None });
    let update = expect_event(&mut events, |event| {
        matches!(event, ConnectionEvent::Session(_))
    })
    .await;
    let ConnectionEvent::Session(ObserverEvent::Updated {
        new_season,
        summary,
        ..
    }) = update
    else {
        unreachable!();
    };
    assert!(new_season);
    assert_eq!(summary.round_num, 2);

    let observer = handle.shutdown().await.expect("consumer returned");
    assert_eq!(observer.snapshot().map(|snapshot| snapshot.stock), Some(100));
}
