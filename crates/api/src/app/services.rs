use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use capledger_core::{AccountId, LedgerId, LedgerResult};
use capledger_events::{Event, EventBus, InMemoryEventBus};
use capledger_ledger::{InMemoryTransferGateway, LedgerConfig, LedgerCore, LedgerEnvelope};

const REALTIME_CAPACITY: usize = 256;

pub type ApiGateway = Arc<InMemoryTransferGateway>;
pub type ApiBus = Arc<InMemoryEventBus<LedgerEnvelope>>;
pub type ApiLedger = LedgerCore<ApiGateway, ApiBus>;

/// Realtime message broadcasted via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub account_id: AccountId,
    pub topic: String,
    pub sequence_number: u64,
    pub payload: serde_json::Value,
}

impl RealtimeMessage {
    fn from_envelope(envelope: &LedgerEnvelope) -> Self {
        let event = envelope.payload();
        Self {
            account_id: event.account_id(),
            topic: envelope.event_type().to_string(),
            sequence_number: envelope.sequence_number(),
            payload: serde_json::json!({
                "event_id": envelope.event_id().to_string(),
                "ledger_id": envelope.ledger_id().to_string(),
                "sequence_number": envelope.sequence_number(),
                "account_id": event.account_id().to_string(),
                "amount": event.amount(),
                "new_balance": event.new_balance(),
                "occurred_at": event.occurred_at().to_rfc3339(),
            }),
        }
    }
}

pub struct AppServices {
    ledger: Arc<ApiLedger>,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

impl AppServices {
    pub fn ledger(&self) -> &ApiLedger {
        &self.ledger
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }
}

/// Wire a ledger to an in-memory payout gateway and event bus.
///
/// Network submission of payouts lives outside this process; the in-memory gateway
/// records what would have been sent.
pub fn build_services(config: LedgerConfig) -> LedgerResult<AppServices> {
    let gateway: ApiGateway = Arc::new(InMemoryTransferGateway::new());
    let bus: ApiBus = Arc::new(InMemoryEventBus::new());
    let ledger = Arc::new(LedgerCore::new(LedgerId::new(), config, gateway, bus.clone())?);

    let (realtime_tx, _) = broadcast::channel(REALTIME_CAPACITY);

    // Background subscriber: bus -> realtime broadcast.
    // Ends once the ledger (and with it the bus) is dropped.
    {
        let sub = bus.subscribe();
        let realtime_tx = realtime_tx.clone();
        std::thread::spawn(move || {
            while let Ok(envelope) = sub.recv() {
                // Lossy; no backpressure on the ledger.
                let _ = realtime_tx.send(RealtimeMessage::from_envelope(&envelope));
            }
            tracing::debug!("ledger event bus closed; realtime bridge stopping");
        });
    }

    tracing::info!(
        ledger_id = %ledger.id(),
        capacity_limit = config.capacity_limit,
        withdrawal_limit = config.withdrawal_limit,
        "ledger services ready"
    );

    Ok(AppServices {
        ledger,
        realtime_tx,
    })
}

/// Build an SSE stream of the ledger events that concern `account_id`.
pub fn account_sse_stream(
    services: Arc<AppServices>,
    account_id: AccountId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.account_id == account_id => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default()
                .event(m.topic)
                .id(m.sequence_number.to_string())
                .data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
