use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::utils::error::{GroupTextError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub i64);

/// 訊息定址用的 person alias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonAliasId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginNumberId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendRequestId(pub Uuid);

impl SendRequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SendRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PersonAliasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OriginNumberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SendRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Inactive,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatusFilter {
    ActiveOnly,
    All,
}

impl MemberStatusFilter {
    pub fn from_include_inactive(include_inactive: bool) -> Self {
        if include_inactive {
            MemberStatusFilter::All
        } else {
            MemberStatusFilter::ActiveOnly
        }
    }

    pub fn accepts(&self, status: MemberStatus) -> bool {
        match self {
            MemberStatusFilter::All => true,
            MemberStatusFilter::ActiveOnly => status == MemberStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group_id: GroupId,
    pub person_id: PersonId,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneNumberType {
    Mobile,
    Home,
    Work,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub number_type: PhoneNumberType,
    pub number: String,
    #[serde(default)]
    pub messaging_enabled: bool,
}

impl PhoneNumber {
    pub fn mobile(number: impl Into<String>) -> Self {
        Self {
            number_type: PhoneNumberType::Mobile,
            number: number.into(),
            messaging_enabled: true,
        }
    }

    /// Mobile、已啟用簡訊、且號碼不為空
    pub fn is_sms_eligible(&self) -> bool {
        self.number_type == PhoneNumberType::Mobile
            && self.messaging_enabled
            && !self.number.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(default)]
    pub primary_alias_id: Option<PersonAliasId>,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,
}

impl Person {
    pub fn has_eligible_mobile(&self) -> bool {
        self.phone_numbers.iter().any(PhoneNumber::is_sms_eligible)
    }
}

/// Membership joined with its person, as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub membership: GroupMembership,
    pub person: Person,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginNumber {
    pub id: OriginNumberId,
    pub number: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationType {
    Sms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Approved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientStatus {
    Pending,
    Sent,
    Failed,
}

impl RecipientStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecipientStatus::Sent | RecipientStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientState {
    pub person_alias_id: PersonAliasId,
    pub medium: CommunicationType,
    pub status: RecipientStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_note: Option<String>,
}

impl RecipientState {
    pub fn pending(person_alias_id: PersonAliasId) -> Self {
        Self {
            person_alias_id,
            medium: CommunicationType::Sms,
            status: RecipientStatus::Pending,
            status_note: None,
        }
    }

    /// Pending -> Sent / Failed，只允許一次
    pub fn transition(&mut self, to: RecipientStatus, note: Option<String>) -> Result<()> {
        if self.status != RecipientStatus::Pending || !to.is_terminal() {
            return Err(GroupTextError::InvalidTransition {
                message: format!(
                    "recipient {} cannot move from {:?} to {:?}",
                    self.person_alias_id, self.status, to
                ),
            });
        }
        self.status = to;
        self.status_note = note;
        Ok(())
    }
}

/// One broadcast action: the body, where it is sent from, and who receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub id: SendRequestId,
    pub subject: String,
    pub body: String,
    pub origin_number_id: OriginNumberId,
    pub communication_type: CommunicationType,
    pub status: ApprovalStatus,
    pub is_bulk: bool,
    pub sender_alias_id: Option<PersonAliasId>,
    pub reviewer_alias_id: Option<PersonAliasId>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: DateTime<Utc>,
    pub recipients: Vec<RecipientState>,
}

impl SendRequest {
    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    pub fn pending_count(&self) -> usize {
        self.recipients
            .iter()
            .filter(|r| r.status == RecipientStatus::Pending)
            .count()
    }

    pub fn recipient_mut(&mut self, alias: PersonAliasId) -> Option<&mut RecipientState> {
        self.recipients
            .iter_mut()
            .find(|r| r.person_alias_id == alias)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPreview {
    pub total_member_count: usize,
    pub mobile_eligible_count: usize,
}

/// 寫入 exception log 的失敗細節
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub occurred_at: DateTime<Utc>,
    pub context: String,
    pub message: String,
    pub sources: Vec<String>,
}

impl ExceptionRecord {
    pub fn from_error(context: impl Into<String>, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut sources = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            sources.push(source.to_string());
            current = source.source();
        }

        Self {
            occurred_at: Utc::now(),
            context: context.into(),
            message: error.to_string(),
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_number_eligibility() {
        assert!(PhoneNumber::mobile("5551234567").is_sms_eligible());

        let disabled = PhoneNumber {
            messaging_enabled: false,
            ..PhoneNumber::mobile("5551234567")
        };
        assert!(!disabled.is_sms_eligible());

        let home = PhoneNumber {
            number_type: PhoneNumberType::Home,
            ..PhoneNumber::mobile("5551234567")
        };
        assert!(!home.is_sms_eligible());

        assert!(!PhoneNumber::mobile("   ").is_sms_eligible());
    }

    #[test]
    fn test_recipient_transition_happens_once() {
        let mut state = RecipientState::pending(PersonAliasId(7));
        state.transition(RecipientStatus::Sent, None).unwrap();
        assert_eq!(state.status, RecipientStatus::Sent);

        assert!(state.transition(RecipientStatus::Failed, None).is_err());
        assert_eq!(state.status, RecipientStatus::Sent);
    }

    #[test]
    fn test_recipient_cannot_return_to_pending() {
        let mut state = RecipientState::pending(PersonAliasId(7));
        assert!(state.transition(RecipientStatus::Pending, None).is_err());
    }

    #[test]
    fn test_status_filter() {
        let active_only = MemberStatusFilter::from_include_inactive(false);
        assert!(active_only.accepts(MemberStatus::Active));
        assert!(!active_only.accepts(MemberStatus::Inactive));
        assert!(!active_only.accepts(MemberStatus::Pending));

        let all = MemberStatusFilter::from_include_inactive(true);
        assert!(all.accepts(MemberStatus::Inactive));
    }

    #[test]
    fn test_exception_record_collects_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = GroupTextError::from(io);
        let record = ExceptionRecord::from_error("submit", &err);
        assert_eq!(record.context, "submit");
        assert!(record.message.contains("disk full"));
    }
}
