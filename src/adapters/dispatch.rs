use crate::core::{Dispatcher, OriginNumberProvider, Result, SendRequestStore, SmsTransport};
use crate::domain::model::{OriginNumber, PersonAliasId, RecipientStatus, SendRequestId};
use crate::utils::error::GroupTextError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// How many recently delivered request ids a worker remembers.
pub const DELIVERED_WINDOW: usize = 4096;

/// Enqueues request ids on an in-process tokio channel drained by a
/// [`DeliveryWorker`]. Never waits: a full queue is reported as an error.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<SendRequestId>,
}

impl ChannelDispatcher {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SendRequestId>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Dispatcher for ChannelDispatcher {
    async fn enqueue(&self, request_id: SendRequestId) -> Result<()> {
        self.sender.try_send(request_id).map_err(|e| {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "delivery queue is full",
                mpsc::error::TrySendError::Closed(_) => "delivery queue is closed",
            };
            GroupTextError::DispatchError {
                message: format!("cannot enqueue {}: {}", request_id, reason),
            }
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DispatchMessage {
    request_id: SendRequestId,
}

/// Posts `{"requestId": ...}` to an external queue endpoint.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    endpoint: String,
}

impl HttpDispatcher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn enqueue(&self, request_id: SendRequestId) -> Result<()> {
        tracing::debug!("Posting send request {} to {}", request_id, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&DispatchMessage { request_id })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GroupTextError::DispatchError {
                message: format!("dispatch endpoint returned {} for {}", status, request_id),
            });
        }
        Ok(())
    }
}

/// Transport that only logs each message; used when no carrier is wired in.
#[derive(Debug, Default, Clone)]
pub struct LoggingTransport;

#[async_trait]
impl SmsTransport for LoggingTransport {
    async fn send_sms(
        &self,
        from: &OriginNumber,
        to: PersonAliasId,
        body: &str,
    ) -> std::result::Result<(), String> {
        tracing::info!(
            "📱 SMS from {} to alias {} ({} chars)",
            from.number,
            to,
            body.chars().count()
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Sends whose outcome could not be saved; they stay `Pending` in the store.
    pub unrecorded: usize,
}

impl DeliveryReport {
    fn add(&mut self, other: DeliveryReport) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.unrecorded += other.unrecorded;
    }
}

/// Bounded set of request ids, oldest evicted first.
#[derive(Debug)]
struct RecentIds {
    capacity: usize,
    order: VecDeque<SendRequestId>,
    ids: HashSet<SendRequestId>,
}

impl RecentIds {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            ids: HashSet::new(),
        }
    }

    fn contains(&self, id: &SendRequestId) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, id: SendRequestId) {
        if !self.ids.insert(id) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Background side of the channel dispatcher.
///
/// Recipients that already left `Pending` are never sent again. A request id
/// that was processed recently is not processed a second time, which also
/// covers recipients whose outcome the store failed to save.
pub struct DeliveryWorker {
    store: Arc<dyn SendRequestStore>,
    origin_numbers: Arc<dyn OriginNumberProvider>,
    transport: Arc<dyn SmsTransport>,
    delivered: RecentIds,
}

impl DeliveryWorker {
    pub fn new(
        store: Arc<dyn SendRequestStore>,
        origin_numbers: Arc<dyn OriginNumberProvider>,
        transport: Arc<dyn SmsTransport>,
    ) -> Self {
        Self {
            store,
            origin_numbers,
            transport,
            delivered: RecentIds::new(DELIVERED_WINDOW),
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.delivered = RecentIds::new(window);
        self
    }

    /// Runs until every sender of the channel is dropped.
    pub async fn run(mut self, mut receiver: mpsc::Receiver<SendRequestId>) -> DeliveryReport {
        let mut total = DeliveryReport::default();
        while let Some(request_id) = receiver.recv().await {
            match self.deliver(request_id).await {
                Ok(report) => total.add(report),
                Err(e) => {
                    tracing::error!("❌ Delivery of send request {} failed: {}", request_id, e);
                }
            }
        }
        tracing::info!(
            "Delivery worker stopped: {} sent, {} failed, {} skipped, {} unrecorded",
            total.sent,
            total.failed,
            total.skipped,
            total.unrecorded
        );
        total
    }

    pub async fn deliver(&mut self, request_id: SendRequestId) -> Result<DeliveryReport> {
        let mut report = DeliveryReport::default();
        if self.delivered.contains(&request_id) {
            tracing::debug!("Send request {} already delivered, skipping", request_id);
            return Ok(report);
        }

        let request = self
            .store
            .get(request_id)
            .await?
            .ok_or(GroupTextError::SendRequestNotFound(request_id))?;
        let origin = self
            .origin_numbers
            .find_origin_number(request.origin_number_id)
            .await?;

        for recipient in &request.recipients {
            if recipient.status != RecipientStatus::Pending {
                report.skipped += 1;
                continue;
            }

            let result = match &origin {
                Some(origin) => {
                    self.transport
                        .send_sms(origin, recipient.person_alias_id, &request.body)
                        .await
                }
                None => Err(format!(
                    "origin number {} no longer exists",
                    request.origin_number_id
                )),
            };

            let (status, note) = match result {
                Ok(()) => {
                    report.sent += 1;
                    (RecipientStatus::Sent, None)
                }
                Err(reason) => {
                    tracing::warn!(
                        "⚠️ SMS to alias {} failed: {}",
                        recipient.person_alias_id,
                        reason
                    );
                    report.failed += 1;
                    (RecipientStatus::Failed, Some(reason))
                }
            };
            // 寫入失敗只記錄，繼續處理下一位
            if let Err(e) = self
                .store
                .record_delivery(request_id, recipient.person_alias_id, status, note)
                .await
            {
                tracing::error!(
                    "❌ Could not record {:?} for alias {} on send request {}: {}",
                    status,
                    recipient.person_alias_id,
                    request_id,
                    e
                );
                report.unrecorded += 1;
            }
        }

        self.delivered.insert(request_id);
        tracing::info!(
            "✅ Send request {} delivered: {} sent, {} failed, {} unrecorded",
            request_id,
            report.sent,
            report.failed,
            report.unrecorded
        );
        Ok(report)
    }
}
