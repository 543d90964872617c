use ags_client::relay::{ConnectionState, PollBody, RelayClient, RelayTransport};
use ags_client::{RelayError, RelayUpdate, RelayView, WorkerId};
use ags_proto::OutgoingMessage;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Script {
    Body(Vec<&'static str>),
    Status(u16),
}

/// Serves scripted poll responses in order; once the script runs out every
/// poll parks forever after the relay's keep-alive newline.
#[derive(Default)]
struct ScriptedRelay {
    script: Mutex<VecDeque<Script>>,
    opened: AtomicUsize,
    sent: Mutex<Vec<String>>,
}

impl ScriptedRelay {
    fn with(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

struct FakeBody {
    chunks: VecDeque<Bytes>,
    park: bool,
}

#[async_trait]
impl PollBody for FakeBody {
    async fn chunk(&mut self) -> Result<Option<Bytes>, RelayError> {
        if let Some(chunk) = self.chunks.pop_front() {
            return Ok(Some(chunk));
        }
        if self.park {
            std::future::pending::<()>().await;
        }
        Ok(None)
    }
}

#[async_trait]
impl RelayTransport for ScriptedRelay {
    async fn open_poll(&self, worker: &WorkerId) -> Result<Box<dyn PollBody>, RelayError> {
        assert_eq!(worker.as_str(), "tofer17-7");
        self.opened.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Script::Status(code)) => Err(RelayError::Status(code)),
            Some(Script::Body(chunks)) => Ok(Box::new(FakeBody {
                chunks: chunks
                    .into_iter()
                    .map(|s| Bytes::from_static(s.as_bytes()))
                    .collect(),
                park: false,
            })),
            None => Ok(Box::new(FakeBody {
                chunks: VecDeque::from([Bytes::from_static(b"\n")]),
                park: true,
            })),
        }
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), RelayError> {
        self.sent.lock().unwrap().push(message.to_form_body()?);
        Ok(())
    }

    async fn stats(&self) -> Result<String, RelayError> {
        Ok("waiters: 1 messages: 0\n".to_string())
    }
}

#[derive(Default)]
struct Recorder {
    updates: Mutex<Vec<RelayUpdate>>,
}

impl RelayView for Recorder {
    fn render(&self, update: RelayUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

impl Recorder {
    fn statuses(&self) -> Vec<ConnectionState> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter_map(|u| match u {
                RelayUpdate::Status(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    fn messages(&self) -> Vec<String> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter_map(|u| match u {
                RelayUpdate::Message(m) => Some(m.body.clone()),
                _ => None,
            })
            .collect()
    }

    fn failures(&self) -> usize {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|u| matches!(u, RelayUpdate::Failed(_)))
            .count()
    }
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

fn client(relay: &Arc<ScriptedRelay>, view: &Arc<Recorder>) -> RelayClient<ScriptedRelay> {
    RelayClient::new(
        relay.clone(),
        view.clone(),
        WorkerId::new("tofer17-7").unwrap(),
    )
}

fn message(body: &'static str) -> Script {
    Script::Body(vec!["\n", body])
}

#[tokio::test]
async fn every_message_triggers_exactly_one_reissue() {
    let relay = ScriptedRelay::with(vec![
        message(r#"{"r":"alice","m":"one"}"#),
        message(r#"{"r":"alice","m":"two"}"#),
        message(r#"{"r":"alice","m":"three"}"#),
    ]);
    let view = Arc::new(Recorder::default());
    let client = client(&relay, &view);

    client.connect().unwrap();
    wait_until("three messages", || view.messages().len() == 3).await;
    wait_until("parked fourth poll", || relay.opened() == 4).await;

    assert_eq!(view.messages(), vec!["one", "two", "three"]);
    assert_eq!(client.state(), ConnectionState::Connected);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(relay.opened(), 4, "only one poll may be outstanding");

    client.disconnect().await;
}

#[tokio::test]
async fn disconnect_aborts_outstanding_poll_for_good() {
    let relay = ScriptedRelay::with(vec![]);
    let view = Arc::new(Recorder::default());
    let client = client(&relay, &view);

    client.connect().unwrap();
    wait_until("connected", || client.state() == ConnectionState::Connected).await;
    assert_eq!(relay.opened(), 1);

    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Idle);
    assert_eq!(
        view.statuses(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnecting,
            ConnectionState::Idle,
        ]
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(relay.opened(), 1, "no reconnect after disconnect");

    // a second disconnect changes nothing
    client.disconnect().await;
    assert_eq!(view.statuses().len(), 4);
    assert_eq!(relay.opened(), 1);
}

#[tokio::test]
async fn explicit_reconnect_after_disconnect() {
    let relay = ScriptedRelay::with(vec![]);
    let view = Arc::new(Recorder::default());
    let client = client(&relay, &view);

    assert_eq!(client.toggle().await.unwrap(), ConnectionState::Connecting);
    wait_until("first poll", || relay.opened() == 1).await;
    assert_eq!(client.toggle().await.unwrap(), ConnectionState::Idle);

    client.connect().unwrap();
    wait_until("second poll", || relay.opened() == 2).await;
    client.disconnect().await;
}

#[tokio::test]
async fn connect_twice_is_refused() {
    let relay = ScriptedRelay::with(vec![]);
    let view = Arc::new(Recorder::default());
    let client = client(&relay, &view);

    client.connect().unwrap();
    assert!(matches!(client.connect(), Err(RelayError::AlreadyConnected)));
    client.disconnect().await;
}

#[tokio::test]
async fn empty_long_poll_is_reissued_without_a_message() {
    let relay = ScriptedRelay::with(vec![
        Script::Body(vec!["\n", "\n"]),
        message(r#"{"r":"bob","m":"late"}"#),
    ]);
    let view = Arc::new(Recorder::default());
    let client = client(&relay, &view);

    client.connect().unwrap();
    wait_until("message", || view.messages().len() == 1).await;
    wait_until("parked poll", || relay.opened() == 3).await;
    assert_eq!(view.messages(), vec!["late"]);
    client.disconnect().await;
}

#[tokio::test]
async fn error_status_stops_the_loop() {
    let relay = ScriptedRelay::with(vec![Script::Status(422)]);
    let view = Arc::new(Recorder::default());
    let client = client(&relay, &view);

    client.connect().unwrap();
    wait_until("idle", || client.state() == ConnectionState::Idle).await;
    assert_eq!(view.failures(), 1);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(relay.opened(), 1, "no retry");
    assert_eq!(
        view.statuses(),
        vec![ConnectionState::Connecting, ConnectionState::Idle]
    );
}

#[tokio::test]
async fn malformed_message_stops_the_loop() {
    let relay = ScriptedRelay::with(vec![
        message(r#"{"r":"alice","m":"fine"}"#),
        message("{not json"),
    ]);
    let view = Arc::new(Recorder::default());
    let client = client(&relay, &view);

    client.connect().unwrap();
    wait_until("idle", || client.state() == ConnectionState::Idle).await;
    assert_eq!(view.messages(), vec!["fine"]);
    assert_eq!(view.failures(), 1);
    assert_eq!(relay.opened(), 2);

    // the loop can be started again by hand
    client.connect().unwrap();
    wait_until("third poll", || relay.opened() == 3).await;
    client.disconnect().await;
}

#[tokio::test]
async fn send_with_recipients_repeats_t() {
    let relay = ScriptedRelay::with(vec![]);
    let view = Arc::new(Recorder::default());
    let client = client(&relay, &view);

    client.send("bob,carol", "hi all").await.unwrap();
    assert_eq!(
        relay.sent.lock().unwrap().as_slice(),
        ["f=tofer17-7&t=bob&t=carol&m=hi+all"]
    );
    assert_eq!(relay.opened(), 0, "sending does not touch the receive loop");
}

#[tokio::test]
async fn send_with_no_recipients_has_only_sender_and_message() {
    let relay = ScriptedRelay::with(vec![]);
    let view = Arc::new(Recorder::default());
    let client = client(&relay, &view);

    client.send("", "anyone?").await.unwrap();
    assert_eq!(
        relay.sent.lock().unwrap().as_slice(),
        ["f=tofer17-7&m=anyone%3F"]
    );
}

#[tokio::test]
async fn stats_are_parsed() {
    let relay = ScriptedRelay::with(vec![]);
    let view = Arc::new(Recorder::default());
    let stats = client(&relay, &view).stats().await.unwrap();
    assert_eq!(stats.waiters, 1);
    assert_eq!(stats.messages, 0);
}
