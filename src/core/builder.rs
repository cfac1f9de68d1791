use crate::core::outcome::SendFailure;
use crate::domain::model::{
    ApprovalStatus, CommunicationType, OriginNumber, Person, PersonAliasId, RecipientState,
    SendRequest, SendRequestId,
};
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;
use std::collections::HashSet;

const SUBJECT_PREFIX: &str = "Group Text Message";

/// Builds the pre-approved SMS send request for a resolved recipient list.
#[derive(Debug, Clone, Default)]
pub struct MessageRecordBuilder;

impl MessageRecordBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        recipients: &[Person],
        body: &str,
        origin_number: &OriginNumber,
        creator: Option<PersonAliasId>,
    ) -> Result<SendRequest, SendFailure> {
        self.build_at(recipients, body, origin_number, creator, Local::now())
    }

    /// The subject shows `now` in its own timezone; timestamps are stored in UTC.
    pub fn build_at<Tz>(
        &self,
        recipients: &[Person],
        body: &str,
        origin_number: &OriginNumber,
        creator: Option<PersonAliasId>,
        now: DateTime<Tz>,
    ) -> Result<SendRequest, SendFailure>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let body = body.trim();
        if body.is_empty() {
            return Err(SendFailure::EmptyMessageBody);
        }
        if recipients.is_empty() {
            return Err(SendFailure::NoEligibleRecipients);
        }

        let mut seen = HashSet::new();
        let mut states = Vec::with_capacity(recipients.len());
        for person in recipients {
            match person.primary_alias_id {
                Some(alias) if seen.insert(alias) => states.push(RecipientState::pending(alias)),
                Some(_) => {}
                None => {
                    // 沒有 primary alias 無法定址，略過
                    tracing::debug!("Skipping person {} without a primary alias", person.id);
                }
            }
        }

        if states.is_empty() {
            tracing::warn!(
                "None of the {} resolved recipient(s) has a primary alias",
                recipients.len()
            );
            return Err(SendFailure::NoEligibleRecipients);
        }

        let created_at = now.with_timezone(&Utc);
        Ok(SendRequest {
            id: SendRequestId::new(),
            subject: format!("{} - {}", SUBJECT_PREFIX, now.format("%-m/%-d/%Y %-I:%M %p")),
            body: body.to_string(),
            origin_number_id: origin_number.id,
            communication_type: CommunicationType::Sms,
            status: ApprovalStatus::Approved,
            is_bulk: true,
            sender_alias_id: creator,
            reviewer_alias_id: creator,
            created_at,
            reviewed_at: created_at,
            recipients: states,
        })
    }
}
