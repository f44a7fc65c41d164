use findit::chat::{ChannelSubscriberRegistry, ChatChannel};
use findit::config::AppConfig;
use findit::memory::{
    MemoryItemRepository, MemoryMessageRepository, MemoryOutbox, MemoryResponseRepository,
};
use findit::notifications::{
    DeliveryError, DispatchGateway, Envelope, LogTransport, NotificationTransport,
};
use findit::workflows::claims::ResolutionOrchestrator;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Envelopes kept for the relay before the oldest are dropped.
pub(crate) const OUTBOX_CAPACITY: usize = 1024;

/// Transport picked from `NOTIFY_ENABLED`.
///
/// Enabled deliveries land in a bounded in-process outbox that a mail relay drains through
/// [`MemoryOutbox::drain`]; this binary ships no relay, so the mode is meant for local runs.
/// Otherwise envelopes are only logged.
pub(crate) enum Transport {
    Log(LogTransport),
    Outbox(MemoryOutbox),
}

impl Transport {
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        if config.notifications.enabled {
            Self::Outbox(MemoryOutbox::bounded(OUTBOX_CAPACITY))
        } else {
            Self::Log(LogTransport)
        }
    }
}

impl NotificationTransport for Transport {
    fn deliver(&self, envelope: &Envelope) -> Result<String, DeliveryError> {
        match self {
            Transport::Log(transport) => transport.deliver(envelope),
            Transport::Outbox(transport) => transport.deliver(envelope),
        }
    }
}

pub(crate) type Orchestrator = ResolutionOrchestrator<
    MemoryItemRepository,
    MemoryResponseRepository,
    DispatchGateway<Transport>,
>;
pub(crate) type Chat =
    ChatChannel<MemoryItemRepository, MemoryResponseRepository, MemoryMessageRepository>;

/// Workflow services sharing one set of in-memory repositories.
pub(crate) struct Services {
    pub(crate) orchestrator: Arc<Orchestrator>,
    pub(crate) chat: Arc<Chat>,
}

pub(crate) fn build_services(config: &AppConfig) -> Services {
    let items = Arc::new(MemoryItemRepository::default());
    let responses = Arc::new(MemoryResponseRepository::default());
    let messages = Arc::new(MemoryMessageRepository::default());
    let registry = Arc::new(ChannelSubscriberRegistry::new(config.chat.channel_capacity));
    let gateway = Arc::new(DispatchGateway::new(
        Arc::new(Transport::from_config(config)),
        config.notifications.sender.clone(),
    ));

    Services {
        orchestrator: Arc::new(ResolutionOrchestrator::new(
            items.clone(),
            responses.clone(),
            gateway,
        )),
        chat: Arc::new(ChatChannel::new(items, responses, messages, registry)),
    }
}
