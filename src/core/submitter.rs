use crate::core::outcome::{SendFailure, SendOutcome};
use crate::core::{Dispatcher, ExceptionLog, Result, SendRequestStore};
use crate::domain::model::{ExceptionRecord, SendRequest, SendRequestId};
use std::sync::Arc;

/// Persists a send request and hands its id to the dispatcher.
///
/// The dispatcher is only called after the store has committed the request,
/// so delivery can never observe a request that is not durable. A failure at
/// either step is written to the exception log and reported to the caller as
/// [`SendFailure::PersistenceOrSchedulingFailure`].
pub struct DispatchSubmitter {
    store: Arc<dyn SendRequestStore>,
    dispatcher: Arc<dyn Dispatcher>,
    exception_log: Arc<dyn ExceptionLog>,
}

impl DispatchSubmitter {
    pub fn new(
        store: Arc<dyn SendRequestStore>,
        dispatcher: Arc<dyn Dispatcher>,
        exception_log: Arc<dyn ExceptionLog>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            exception_log,
        }
    }

    pub async fn submit(&self, request: SendRequest) -> SendOutcome {
        if request.recipients.is_empty() {
            tracing::warn!("Refusing to submit send request {} without recipients", request.id);
            return SendOutcome::failed(SendFailure::NoEligibleRecipients);
        }

        let recipient_count = request.recipient_count();
        match self.persist_and_enqueue(&request).await {
            Ok(request_id) => {
                tracing::info!(
                    "📨 Send request {} queued for {} recipient(s)",
                    request_id,
                    recipient_count
                );
                SendOutcome::Success {
                    request_id,
                    recipient_count,
                }
            }
            Err(e) => {
                tracing::error!("❌ Failed to submit send request {}: {}", request.id, e);
                let context = format!("submit send request {}", request.id);
                self.exception_log
                    .log_exception(ExceptionRecord::from_error(context, &e))
                    .await;
                SendOutcome::failed(SendFailure::PersistenceOrSchedulingFailure)
            }
        }
    }

    async fn persist_and_enqueue(&self, request: &SendRequest) -> Result<SendRequestId> {
        let request_id = self.store.insert(request).await?;
        tracing::debug!("Send request {} persisted", request_id);

        // 寫入成功後才交給 dispatcher；失敗時紀錄仍保留為 Pending
        self.dispatcher.enqueue(request_id).await?;
        Ok(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryDirectory, RecordingDispatcher, RecordingExceptionLog};
    use crate::domain::model::{
        ApprovalStatus, CommunicationType, OriginNumberId, PersonAliasId, RecipientState,
    };
    use crate::utils::error::GroupTextError;
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    struct FailingDispatcher;

    #[async_trait]
    impl Dispatcher for FailingDispatcher {
        async fn enqueue(&self, _request_id: SendRequestId) -> Result<()> {
            Err(GroupTextError::DispatchError {
                message: "queue at capacity".to_string(),
            })
        }
    }

    fn request(aliases: &[i64]) -> SendRequest {
        let now = Utc::now();
        SendRequest {
            id: SendRequestId::new(),
            subject: "Group Text Message".to_string(),
            body: "Hello".to_string(),
            origin_number_id: OriginNumberId(Uuid::new_v4()),
            communication_type: CommunicationType::Sms,
            status: ApprovalStatus::Approved,
            is_bulk: true,
            sender_alias_id: None,
            reviewer_alias_id: None,
            created_at: now,
            reviewed_at: now,
            recipients: aliases
                .iter()
                .map(|a| RecipientState::pending(PersonAliasId(*a)))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_submit_persists_then_enqueues() {
        let store = Arc::new(InMemoryDirectory::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let log = Arc::new(RecordingExceptionLog::new());
        let submitter = DispatchSubmitter::new(store.clone(), dispatcher.clone(), log.clone());

        let req = request(&[1, 2, 3]);
        let outcome = submitter.submit(req.clone()).await;

        assert_eq!(
            outcome,
            SendOutcome::Success {
                request_id: req.id,
                recipient_count: 3
            }
        );
        assert_eq!(dispatcher.enqueued(), vec![req.id]);
        assert_eq!(store.get(req.id).await.unwrap().unwrap().pending_count(), 3);
        assert!(log.records().is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_failure_keeps_pending_record_and_logs() {
        let store = Arc::new(InMemoryDirectory::new());
        let log = Arc::new(RecordingExceptionLog::new());
        let submitter = DispatchSubmitter::new(store.clone(), Arc::new(FailingDispatcher), log.clone());

        let req = request(&[1, 2]);
        let outcome = submitter.submit(req.clone()).await;

        assert_eq!(
            outcome.failure(),
            Some(SendFailure::PersistenceOrSchedulingFailure)
        );
        let persisted = store.get(req.id).await.unwrap().unwrap();
        assert_eq!(persisted.pending_count(), 2);

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].message.contains("queue at capacity"));
        assert!(!outcome.user_message().contains("queue at capacity"));
    }

    #[tokio::test]
    async fn test_persist_failure_does_not_enqueue() {
        let store = Arc::new(InMemoryDirectory::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let log = Arc::new(RecordingExceptionLog::new());
        let submitter = DispatchSubmitter::new(store.clone(), dispatcher.clone(), log.clone());

        let req = request(&[1]);
        assert!(submitter.submit(req.clone()).await.is_success());

        // 同一個 id 第二次寫入會被 store 拒絕
        let outcome = submitter.submit(req.clone()).await;
        assert_eq!(
            outcome.failure(),
            Some(SendFailure::PersistenceOrSchedulingFailure)
        );
        assert_eq!(dispatcher.enqueued(), vec![req.id]);
        assert_eq!(log.records().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_without_recipients_touches_nothing() {
        let store = Arc::new(InMemoryDirectory::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let submitter = DispatchSubmitter::new(
            store.clone(),
            dispatcher.clone(),
            Arc::new(RecordingExceptionLog::new()),
        );

        let req = request(&[]);
        let outcome = submitter.submit(req.clone()).await;
        assert_eq!(outcome.failure(), Some(SendFailure::NoEligibleRecipients));
        assert!(store.get(req.id).await.unwrap().is_none());
        assert!(dispatcher.enqueued().is_empty());
    }
}
