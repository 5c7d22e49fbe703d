//! Bridges between the concrete REST/realtime clients and the seams the
//! session controller works against.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use spade_api::{ApiClient, Table};
use spade_core::{MessageHandler, SpadeError, SubscriptionId, TableId, TableMessage, Topic};
use spade_realtime::{ConnectionState, TableTransport};
use spade_session::{SeatApi, TableChannel};

/// [`SeatApi`] backed by the REST client.
pub struct RestSeatApi {
    client: ApiClient,
}

impl RestSeatApi {
    pub fn new(client: ApiClient) -> Arc<Self> {
        Arc::new(Self { client })
    }
}

#[async_trait]
impl SeatApi for RestSeatApi {
    async fn chips(&self) -> Result<i64, SpadeError> {
        self.client.chips().await
    }

    async fn join_table(&self, id: TableId, buy_in: i64) -> Result<Table, SpadeError> {
        self.client.join_table(id, buy_in).await
    }

    async fn leave_table(&self, id: TableId) -> Result<(), SpadeError> {
        self.client.leave_table(id).await
    }
}

/// [`TableChannel`] backed by the table socket.
pub struct RealtimeChannel {
    transport: TableTransport,
}

impl RealtimeChannel {
    pub fn new(transport: TableTransport) -> Arc<Self> {
        Arc::new(Self { transport })
    }

    /// Tear the socket down.
    pub async fn shutdown(&self) {
        self.transport.disconnect().await;
    }
}

#[async_trait]
impl TableChannel for RealtimeChannel {
    async fn ensure_connected(&self) -> Result<(), SpadeError> {
        self.transport.connect().await
    }

    fn subscribe(
        &self,
        topic: &Topic,
        handler: MessageHandler,
    ) -> Result<SubscriptionId, SpadeError> {
        self.transport.registry().subscribe(topic, handler)
    }

    fn unsubscribe(&self, id: &SubscriptionId) {
        self.transport.registry().unsubscribe(id);
    }

    fn publish(&self, topic: &Topic, body: TableMessage) {
        self.transport.registry().publish(topic, body);
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.transport.watch_state()
    }
}
