use crate::domain::model::SendRequestId;
use serde::Serialize;
use thiserror::Error;

/// Reasons a send is rejected. Everything except
/// `PersistenceOrSchedulingFailure` is detected before any write happens.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendFailure {
    #[error("Please select a group.")]
    NoGroupSelected,

    #[error("Please enter a message to send.")]
    EmptyMessageBody,

    #[error("A 'From Number' has not been configured.")]
    OriginNumberNotConfigured,

    #[error("The configured 'From Number' could not be found.")]
    OriginNumberNotFound,

    #[error("No group members with mobile phone numbers were found.")]
    NoEligibleRecipients,

    #[error("An error occurred while sending the message. Please check the exception log for details.")]
    PersistenceOrSchedulingFailure,
}

impl SendFailure {
    /// 使用者輸入或設定造成的警告（非系統錯誤）
    pub fn is_warning(&self) -> bool {
        !matches!(self, SendFailure::PersistenceOrSchedulingFailure)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SendOutcome {
    Success {
        request_id: SendRequestId,
        recipient_count: usize,
    },
    Failed {
        reason: SendFailure,
    },
}

impl SendOutcome {
    pub fn failed(reason: SendFailure) -> Self {
        SendOutcome::Failed { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Success { .. })
    }

    pub fn recipient_count(&self) -> usize {
        match self {
            SendOutcome::Success {
                recipient_count, ..
            } => *recipient_count,
            SendOutcome::Failed { .. } => 0,
        }
    }

    pub fn failure(&self) -> Option<SendFailure> {
        match self {
            SendOutcome::Success { .. } => None,
            SendOutcome::Failed { reason } => Some(*reason),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            SendOutcome::Success {
                recipient_count, ..
            } => format!(
                "Message sent successfully to {} recipient(s).",
                recipient_count
            ),
            SendOutcome::Failed { reason } => reason.to_string(),
        }
    }
}

impl From<SendFailure> for SendOutcome {
    fn from(reason: SendFailure) -> Self {
        SendOutcome::failed(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_message() {
        let outcome = SendOutcome::Success {
            request_id: SendRequestId::new(),
            recipient_count: 3,
        };
        assert!(outcome.is_success());
        assert_eq!(outcome.recipient_count(), 3);
        assert_eq!(
            outcome.user_message(),
            "Message sent successfully to 3 recipient(s)."
        );
    }

    #[test]
    fn test_failure_messages_are_generic() {
        let outcome = SendOutcome::from(SendFailure::PersistenceOrSchedulingFailure);
        assert!(!outcome.is_success());
        assert_eq!(outcome.recipient_count(), 0);
        assert!(outcome.user_message().contains("exception log"));
        assert!(!SendFailure::PersistenceOrSchedulingFailure.is_warning());
        assert!(SendFailure::EmptyMessageBody.is_warning());
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = SendOutcome::failed(SendFailure::OriginNumberNotFound);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["result"], "failed");
        assert_eq!(json["reason"], "origin_number_not_found");
    }
}
