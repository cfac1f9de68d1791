use crate::domain::model::{
    ExceptionRecord, Group, GroupId, GroupMember, MemberStatusFilter, OriginNumber,
    OriginNumberId, PersonAliasId, RecipientStatus, SendRequest, SendRequestId,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Read-only view over groups, memberships and people.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn find_group(&self, group_id: GroupId) -> Result<Option<Group>>;

    /// 依狀態過濾後的成員（含 person 與電話）；群組不存在時回傳空集合
    async fn group_members(
        &self,
        group_id: GroupId,
        filter: MemberStatusFilter,
    ) -> Result<Vec<GroupMember>>;
}

#[async_trait]
pub trait OriginNumberProvider: Send + Sync {
    async fn find_origin_number(&self, id: OriginNumberId) -> Result<Option<OriginNumber>>;
}

#[async_trait]
pub trait SendRequestStore: Send + Sync {
    /// Persists the request and all of its recipients as one unit. Either the
    /// whole request becomes visible or nothing does.
    async fn insert(&self, request: &SendRequest) -> Result<SendRequestId>;

    async fn get(&self, id: SendRequestId) -> Result<Option<SendRequest>>;

    /// Used by the delivery side only.
    async fn record_delivery(
        &self,
        id: SendRequestId,
        alias: PersonAliasId,
        status: RecipientStatus,
        note: Option<String>,
    ) -> Result<()>;
}

/// Hands a persisted request to out-of-band delivery.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn enqueue(&self, request_id: SendRequestId) -> Result<()>;
}

#[async_trait]
pub trait ExceptionLog: Send + Sync {
    async fn log_exception(&self, record: ExceptionRecord);
}

/// Carrier-level sender for a single recipient.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_sms(
        &self,
        from: &OriginNumber,
        to: PersonAliasId,
        body: &str,
    ) -> std::result::Result<(), String>;
}
