use crate::core::{
    Dispatcher, ExceptionLog, GroupDirectory, OriginNumberProvider, Result, SendRequestStore,
};
use crate::domain::model::{
    ExceptionRecord, Group, GroupId, GroupMember, GroupMembership, MemberStatus,
    MemberStatusFilter, OriginNumber, OriginNumberId, Person, PersonAliasId, PersonId, RecipientStatus,
    SendRequest, SendRequestId,
};
use crate::utils::error::GroupTextError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Groups, people and origin numbers as plain collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub memberships: Vec<GroupMembership>,
    #[serde(default)]
    pub origin_numbers: Vec<OriginNumber>,
}

impl DirectorySnapshot {
    pub fn find_group(&self, group_id: GroupId) -> Option<Group> {
        self.groups.iter().find(|g| g.id == group_id).cloned()
    }

    pub fn group_members(&self, group_id: GroupId, filter: MemberStatusFilter) -> Vec<GroupMember> {
        self.memberships
            .iter()
            .filter(|m| m.group_id == group_id && filter.accepts(m.status))
            .filter_map(|m| {
                self.people
                    .iter()
                    .find(|p| p.id == m.person_id)
                    .map(|person| GroupMember {
                        membership: m.clone(),
                        person: person.clone(),
                    })
            })
            .collect()
    }

    pub fn find_origin_number(&self, id: OriginNumberId) -> Option<OriginNumber> {
        self.origin_numbers.iter().find(|o| o.id == id).cloned()
    }
}

/// Applies a delivery result to one recipient of a stored request.
pub(crate) fn apply_delivery(
    requests: &mut HashMap<SendRequestId, SendRequest>,
    id: SendRequestId,
    alias: PersonAliasId,
    status: RecipientStatus,
    note: Option<String>,
) -> Result<()> {
    let request = requests
        .get_mut(&id)
        .ok_or(GroupTextError::SendRequestNotFound(id))?;
    let recipient = request
        .recipient_mut(alias)
        .ok_or_else(|| GroupTextError::InvalidTransition {
            message: format!("send request {} has no recipient {}", id, alias),
        })?;
    recipient.transition(status, note)
}

#[derive(Debug, Default)]
struct State {
    snapshot: DirectorySnapshot,
    requests: HashMap<SendRequestId, SendRequest>,
    read_failure: Option<String>,
}

/// In-process implementation of the directory, origin-number and store ports.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_group(&self, group: Group) {
        self.write().snapshot.groups.push(group);
    }

    pub fn add_person(&self, person: Person) {
        self.write().snapshot.people.push(person);
    }

    pub fn add_membership(&self, group_id: GroupId, person_id: PersonId, status: MemberStatus) {
        self.write().snapshot.memberships.push(GroupMembership {
            group_id,
            person_id,
            status,
        });
    }

    pub fn add_origin_number(&self, origin: OriginNumber) {
        self.write().snapshot.origin_numbers.push(origin);
    }

    /// 之後所有讀取都回傳錯誤（測試用）
    pub fn fail_reads(&self, message: impl Into<String>) {
        self.write().read_failure = Some(message.into());
    }

    pub fn send_request_count(&self) -> usize {
        self.read().requests.len()
    }

    pub fn send_requests(&self) -> Vec<SendRequest> {
        self.read().requests.values().cloned().collect()
    }

    fn check_reads(state: &State) -> Result<()> {
        match &state.read_failure {
            Some(message) => Err(GroupTextError::StorageError {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GroupDirectory for InMemoryDirectory {
    async fn find_group(&self, group_id: GroupId) -> Result<Option<Group>> {
        let state = self.read();
        Self::check_reads(&state)?;
        Ok(state.snapshot.find_group(group_id))
    }

    async fn group_members(
        &self,
        group_id: GroupId,
        filter: MemberStatusFilter,
    ) -> Result<Vec<GroupMember>> {
        let state = self.read();
        Self::check_reads(&state)?;
        Ok(state.snapshot.group_members(group_id, filter))
    }
}

#[async_trait]
impl OriginNumberProvider for InMemoryDirectory {
    async fn find_origin_number(&self, id: OriginNumberId) -> Result<Option<OriginNumber>> {
        let state = self.read();
        Self::check_reads(&state)?;
        Ok(state.snapshot.find_origin_number(id))
    }
}

#[async_trait]
impl SendRequestStore for InMemoryDirectory {
    async fn insert(&self, request: &SendRequest) -> Result<SendRequestId> {
        let mut state = self.write();
        if state.requests.contains_key(&request.id) {
            return Err(GroupTextError::DuplicateSendRequest(request.id));
        }
        // request 與全部 recipients 在同一個 lock 內寫入
        state.requests.insert(request.id, request.clone());
        Ok(request.id)
    }

    async fn get(&self, id: SendRequestId) -> Result<Option<SendRequest>> {
        Ok(self.read().requests.get(&id).cloned())
    }

    async fn record_delivery(
        &self,
        id: SendRequestId,
        alias: PersonAliasId,
        status: RecipientStatus,
        note: Option<String>,
    ) -> Result<()> {
        apply_delivery(&mut self.write().requests, id, alias, status, note)
    }
}

/// Dispatcher that only remembers what it was given.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    enqueued: Mutex<Vec<SendRequestId>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueued(&self) -> Vec<SendRequestId> {
        self.enqueued
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn enqueue(&self, request_id: SendRequestId) -> Result<()> {
        self.enqueued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingExceptionLog {
    records: Mutex<Vec<ExceptionRecord>>,
}

impl RecordingExceptionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ExceptionRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

#[async_trait]
impl ExceptionLog for RecordingExceptionLog {
    async fn log_exception(&self, record: ExceptionRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        ApprovalStatus, CommunicationType, PhoneNumber, RecipientState,
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn request() -> SendRequest {
        let now = Utc::now();
        SendRequest {
            id: SendRequestId::new(),
            subject: "s".to_string(),
            body: "Hello".to_string(),
            origin_number_id: OriginNumberId(Uuid::new_v4()),
            communication_type: CommunicationType::Sms,
            status: ApprovalStatus::Approved,
            is_bulk: true,
            sender_alias_id: None,
            reviewer_alias_id: None,
            created_at: now,
            reviewed_at: now,
            recipients: vec![RecipientState::pending(PersonAliasId(1))],
        }
    }

    #[test]
    fn test_snapshot_skips_memberships_without_person() {
        let mut snapshot = DirectorySnapshot::default();
        snapshot.memberships.push(GroupMembership {
            group_id: GroupId(1),
            person_id: PersonId(42),
            status: MemberStatus::Active,
        });
        snapshot.people.push(Person {
            id: PersonId(1),
            name: "A".to_string(),
            primary_alias_id: None,
            phone_numbers: vec![PhoneNumber::mobile("1")],
        });

        assert!(snapshot
            .group_members(GroupId(1), MemberStatusFilter::All)
            .is_empty());
    }

    #[tokio::test]
    async fn test_record_delivery_once() {
        let store = InMemoryDirectory::new();
        let req = request();
        store.insert(&req).await.unwrap();

        store
            .record_delivery(req.id, PersonAliasId(1), RecipientStatus::Sent, None)
            .await
            .unwrap();
        assert!(store
            .record_delivery(req.id, PersonAliasId(1), RecipientStatus::Failed, None)
            .await
            .is_err());

        let stored = store.get(req.id).await.unwrap().unwrap();
        assert_eq!(stored.recipients[0].status, RecipientStatus::Sent);
    }

    #[tokio::test]
    async fn test_record_delivery_unknown_request() {
        let store = InMemoryDirectory::new();
        let err = store
            .record_delivery(SendRequestId::new(), PersonAliasId(1), RecipientStatus::Sent, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GroupTextError::SendRequestNotFound(_)));
    }
}
