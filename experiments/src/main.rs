// Two bridge nodes wired together over in-memory channels, walking one swap
// to completion and one to cancellation.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use xbridge_protocol::{
    api::{self, AcceptParams, CreateParams},
    cross_chain::BridgeState,
    data_structures::TransactionDescriptor,
    network::XBridgePacket,
    session::{CurrencySession, LedgerTxId, SessionError},
    BridgeConfig, SwapCoordinator,
};

const DELIVERY_WAIT: Duration = Duration::from_millis(50);

// Session whose transport is a channel to the other node
struct ChannelSession {
    currency: Option<String>,
    balance: u64,
    outbox: mpsc::UnboundedSender<Vec<u8>>,
    ledger_seq: AtomicU64,
}

impl ChannelSession {
    fn new(currency: Option<&str>, balance: u64, outbox: mpsc::UnboundedSender<Vec<u8>>) -> Arc<Self> {
        Arc::new(ChannelSession {
            currency: currency.map(str::to_string),
            balance,
            outbox,
            ledger_seq: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl CurrencySession for ChannelSession {
    fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    fn can_route(&self) -> bool {
        !self.outbox.is_closed()
    }

    async fn balance(&self) -> Result<u64, SessionError> {
        Ok(self.balance)
    }

    async fn send_packet(&self, packet: &XBridgePacket) -> Result<(), SessionError> {
        let bytes = packet.encode().map_err(|e| SessionError::Send(e.to_string()))?;
        self.outbox.send(bytes).map_err(|_| SessionError::Send("peer gone".to_string()))
    }

    async fn broadcast_transaction(&self, tx: &TransactionDescriptor) -> Result<LedgerTxId, SessionError> {
        let seq = self.ledger_seq.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}:{}:{}", self.currency.as_deref().unwrap_or("svc"), tx.id, seq))
    }
}

fn build_node(
    name: &str,
    currencies: &[(&str, u64)],
    outbox: mpsc::UnboundedSender<Vec<u8>>,
) -> Arc<SwapCoordinator> {
    let config = BridgeConfig::default();
    let state = BridgeState::from_config(&config, ChannelSession::new(None, 0, outbox.clone()));
    for (currency, balance) in currencies {
        state.sessions.register(currency, ChannelSession::new(Some(*currency), *balance, outbox.clone()));
    }
    println!("Node {} up with currencies {:?}", name, state.sessions.list_currencies());
    Arc::new(SwapCoordinator::new(config, state))
}

// Feeds everything the peer sends into `node`
fn spawn_pump(name: &'static str, node: Arc<SwapCoordinator>, mut inbox: mpsc::UnboundedReceiver<Vec<u8>>) {
    tokio::spawn(async move {
        while let Some(bytes) = inbox.recv().await {
            match node.on_broadcast_received(&bytes) {
                Ok(delivery) => println!("  [{}] {:?}", name, delivery),
                Err(e) => println!("  [{}] rejected packet: {}", name, e),
            }
        }
    });
}

fn print_reply(label: &str, reply: &api::ApiReply) {
    let body = serde_json::to_string_pretty(reply).unwrap_or_else(|e| e.to_string());
    println!("{}:\n{}", label, body);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (to_taker, taker_inbox) = mpsc::unbounded_channel();
    let (to_maker, maker_inbox) = mpsc::unbounded_channel();
    let maker = build_node("maker", &[("BLOCK", 1_000_000_000)], to_taker);
    let taker = build_node("taker", &[("LTC", 5_000_000_000)], to_maker);
    spawn_pump("taker", Arc::clone(&taker), taker_inbox);
    spawn_pump("maker", Arc::clone(&maker), maker_inbox);

    println!("\n--- Swap 1: create, accept, finish ---");
    let create = api::create(
        &maker,
        CreateParams {
            from: "A".repeat(34),
            from_currency: "BLOCK".to_string(),
            from_amount: 1.5,
            to: "B".repeat(34),
            to_currency: "LTC".to_string(),
            to_amount: 20.0,
        },
    )
    .await;
    print_reply("create", &create);
    tokio::time::sleep(DELIVERY_WAIT).await;

    let offered = taker.list_open_and_pending();
    let id = offered.first().map(|tx| tx.id).ok_or("offer never reached the taker")?;
    let accept = api::accept(
        &taker,
        AcceptParams { id: id.to_string(), from: "C".repeat(33), to: "D".repeat(34) },
    )
    .await;
    print_reply("accept", &accept);
    tokio::time::sleep(DELIVERY_WAIT).await;

    let outcome = maker.finalize(&id).await?;
    println!("finalize: {:?}", outcome);
    tokio::time::sleep(DELIVERY_WAIT).await;
    print_reply("taker history", &api::list_historic(&taker));

    println!("\n--- Swap 2: create, cancel twice ---");
    let create = api::create(
        &maker,
        CreateParams {
            from: "A".repeat(34),
            from_currency: "BLOCK".to_string(),
            from_amount: 0.25,
            to: "B".repeat(34),
            to_currency: "LTC".to_string(),
            to_amount: 3.0,
        },
    )
    .await;
    print_reply("create", &create);
    tokio::time::sleep(DELIVERY_WAIT).await;

    let second = maker.list_open_and_pending().first().map(|tx| tx.id).ok_or("second swap missing")?;
    print_reply("cancel", &api::cancel(&maker, &second.to_string()).await);
    print_reply("cancel again", &api::cancel(&maker, &second.to_string()).await);
    tokio::time::sleep(DELIVERY_WAIT).await;

    print_reply("taker lookup", &api::get_by_id(&taker, &second.to_string()));
    print_reply("maker history", &api::list_historic(&maker));
    Ok(())
}
