//! Integration test common infrastructure.
//!
//! Provides an in-process bridge with a recording notifier, plus a scripted
//! fake switch that drives the FastAGI side of an exchange.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use callwatch::handler::Bridge;
use callwatch::listener::Listener;
use callwatch::notify::{Attachment, Notifier, NotifyError};
use callwatch::state::MessageRef;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Channel used by the test bridge.
pub const TEST_CHANNEL: &str = "telefon";

/// Notifier that records every post/update instead of talking to Slack.
#[derive(Default)]
pub struct MockNotifier {
    posts: Mutex<Vec<(String, Attachment)>>,
    updates: Mutex<Vec<(MessageRef, Attachment)>>,
    next_ts: AtomicUsize,
}

impl MockNotifier {
    pub fn posts(&self) -> Vec<(String, Attachment)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(MessageRef, Attachment)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn post(
        &self,
        channel: &str,
        attachment: Attachment,
    ) -> Result<MessageRef, NotifyError> {
        let n = self.next_ts.fetch_add(1, Ordering::SeqCst);
        self.posts
            .lock()
            .unwrap()
            .push((channel.to_string(), attachment));
        Ok(MessageRef {
            channel: "C0TEST".to_string(),
            ts: format!("1700000000.{n:06}"),
        })
    }

    async fn update(
        &self,
        message: &MessageRef,
        attachment: Attachment,
    ) -> Result<(), NotifyError> {
        self.updates
            .lock()
            .unwrap()
            .push((message.clone(), attachment));
        Ok(())
    }
}

/// An in-process bridge listening on an ephemeral port.
pub struct TestBridge {
    pub addr: SocketAddr,
    pub notifier: Arc<MockNotifier>,
}

impl TestBridge {
    pub async fn spawn() -> Self {
        let notifier = Arc::new(MockNotifier::default());
        let bridge = Arc::new(Bridge::new(
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            TEST_CHANNEL.to_string(),
        ));
        let listener = Listener::bind(SocketAddr::from(([127, 0, 0, 1], 0)), bridge)
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener has a local address");
        tokio::spawn(async move {
            let _ = listener.run().await;
        });
        Self { addr, notifier }
    }
}

/// Drive one FastAGI exchange as the switch would: send the environment
/// preamble, answer `GET VARIABLE` from the given set, acknowledge
/// `SET VARIABLE`, and return the recorded writes once the bridge closes
/// the connection.
pub async fn run_exchange(
    addr: SocketAddr,
    vars: &[(&str, &str)],
) -> anyhow::Result<Vec<(String, String)>> {
    let stream = TcpStream::connect(addr).await?;
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write
        .write_all(
            b"agi_network: yes\n\
              agi_network_script: callwatch\n\
              agi_request: agi://127.0.0.1/callwatch\n\
              agi_channel: SIP/100-00000001\n\
              \n",
        )
        .await?;

    let mut sets = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if let Some(rest) = line.strip_prefix("GET VARIABLE ") {
            let name = rest.trim().trim_matches('"');
            let reply = match vars.iter().find(|(k, _)| *k == name) {
                Some((_, value)) => format!("200 result=1 ({value})\n"),
                None => "200 result=0\n".to_string(),
            };
            write.write_all(reply.as_bytes()).await?;
        } else if let Some(rest) = line.strip_prefix("SET VARIABLE ") {
            let mut parts = rest.trim().splitn(2, "\" \"");
            let name = parts.next().unwrap_or("").trim_matches('"');
            let value = parts.next().unwrap_or("").trim_matches('"');
            sets.push((name.to_string(), value.to_string()));
            write.write_all(b"200 result=1\n").await?;
        } else {
            write.write_all(b"510 Invalid or unknown command\n").await?;
        }
    }
    Ok(sets)
}
