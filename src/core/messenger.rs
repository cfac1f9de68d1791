use crate::core::builder::MessageRecordBuilder;
use crate::core::outcome::{SendFailure, SendOutcome};
use crate::core::resolver::RecipientResolver;
use crate::core::submitter::DispatchSubmitter;
use crate::core::{
    Dispatcher, ExceptionLog, GroupDirectory, OriginNumberProvider, Result, SendRequestStore,
};
use crate::domain::model::{
    ExceptionRecord, GroupId, GroupPreview, OriginNumber, OriginNumberId, PersonAliasId,
};
use crate::utils::error::GroupTextError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input of a single operator-initiated broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendGroupMessage {
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub include_inactive_members: bool,
    pub body: String,
    pub origin_number_id: Option<OriginNumberId>,
    #[serde(default)]
    pub sender_alias_id: Option<PersonAliasId>,
}

/// Caller-facing entry point: validate, resolve, build, submit.
pub struct GroupMessenger {
    resolver: RecipientResolver,
    builder: MessageRecordBuilder,
    submitter: DispatchSubmitter,
    origin_numbers: Arc<dyn OriginNumberProvider>,
    exception_log: Arc<dyn ExceptionLog>,
}

impl GroupMessenger {
    pub fn new(
        directory: Arc<dyn GroupDirectory>,
        origin_numbers: Arc<dyn OriginNumberProvider>,
        store: Arc<dyn SendRequestStore>,
        dispatcher: Arc<dyn Dispatcher>,
        exception_log: Arc<dyn ExceptionLog>,
    ) -> Self {
        Self {
            resolver: RecipientResolver::new(directory),
            builder: MessageRecordBuilder::new(),
            submitter: DispatchSubmitter::new(store, dispatcher, exception_log.clone()),
            origin_numbers,
            exception_log,
        }
    }

    pub async fn preview_group(
        &self,
        group_id: GroupId,
        include_inactive_members: bool,
    ) -> Result<Option<GroupPreview>> {
        self.resolver.preview(group_id, include_inactive_members).await
    }

    pub async fn send_group_message(&self, message: SendGroupMessage) -> SendOutcome {
        let outcome = self.try_send(&message).await;
        match &outcome {
            SendOutcome::Success { .. } => {}
            SendOutcome::Failed { reason } if reason.is_warning() => {
                tracing::warn!("⚠️ Group message rejected: {}", reason);
            }
            SendOutcome::Failed { reason } => {
                tracing::error!("❌ Group message failed: {}", reason);
            }
        }
        outcome
    }

    async fn try_send(&self, message: &SendGroupMessage) -> SendOutcome {
        // 以下檢查都在任何寫入之前完成
        let Some(group_id) = message.group_id else {
            return SendFailure::NoGroupSelected.into();
        };

        let body = message.body.trim();
        if body.is_empty() {
            return SendFailure::EmptyMessageBody.into();
        }

        let Some(origin_number_id) = message.origin_number_id else {
            return SendFailure::OriginNumberNotConfigured.into();
        };

        let origin_number = match self.lookup_origin_number(origin_number_id).await {
            Ok(Some(origin)) => origin,
            Ok(None) => return SendFailure::OriginNumberNotFound.into(),
            Err(failure) => return failure.into(),
        };

        let recipients = match self
            .resolver
            .resolve(group_id, message.include_inactive_members)
            .await
        {
            Ok(recipients) => recipients,
            Err(e) => {
                return self
                    .unexpected(format!("resolve recipients of group {}", group_id), e)
                    .await
                    .into()
            }
        };
        if recipients.is_empty() {
            return SendFailure::NoEligibleRecipients.into();
        }

        let request = match self.builder.build(
            &recipients,
            body,
            &origin_number,
            message.sender_alias_id,
        ) {
            Ok(request) => request,
            Err(failure) => return failure.into(),
        };

        tracing::info!(
            "Sending group message to group {} from {} ({} recipient(s))",
            group_id,
            origin_number.number,
            request.recipient_count()
        );
        self.submitter.submit(request).await
    }

    async fn lookup_origin_number(
        &self,
        id: OriginNumberId,
    ) -> std::result::Result<Option<OriginNumber>, SendFailure> {
        match self.origin_numbers.find_origin_number(id).await {
            Ok(found) => Ok(found),
            Err(e) => Err(self.unexpected(format!("look up origin number {}", id), e).await),
        }
    }

    async fn unexpected(&self, context: String, error: GroupTextError) -> SendFailure {
        tracing::error!("❌ Failed to {}: {}", context, error);
        self.exception_log
            .log_exception(ExceptionRecord::from_error(context, &error))
            .await;
        SendFailure::PersistenceOrSchedulingFailure
    }
}
