use crate::adapters::memory::{apply_delivery, DirectorySnapshot};
use crate::core::{GroupDirectory, OriginNumberProvider, Result, SendRequestStore};
use crate::domain::model::{
    Group, GroupId, GroupMember, MemberStatusFilter, OriginNumber, OriginNumberId, PersonAliasId,
    RecipientStatus, SendRequest, SendRequestId,
};
use crate::utils::error::GroupTextError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const DIRECTORY_FILE: &str = "directory.json";
pub const EXCEPTION_LOG_FILE: &str = "exceptions.jsonl";
pub const SEND_REQUESTS_FILE: &str = "send_requests.json";

/// JSON-file backed directory and send-request store.
///
/// `directory.json` holds groups, people and origin numbers and is only read.
/// Send requests live in `send_requests.json`; every write replaces the file
/// through a temp file and a rename, so readers see either the old or the new
/// set of requests and never a partially written one.
#[derive(Debug)]
pub struct FileStore {
    data_dir: PathBuf,
    snapshot: DirectorySnapshot,
    requests: Mutex<HashMap<SendRequestId, SendRequest>>,
}

impl FileStore {
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        let directory_path = data_dir.join(DIRECTORY_FILE);
        let content = tokio::fs::read(&directory_path).await.map_err(|e| {
            GroupTextError::StorageError {
                message: format!("cannot read {}: {}", directory_path.display(), e),
            }
        })?;
        let snapshot: DirectorySnapshot = serde_json::from_slice(&content)?;

        let requests_path = data_dir.join(SEND_REQUESTS_FILE);
        let requests = if tokio::fs::try_exists(&requests_path).await? {
            let content = tokio::fs::read(&requests_path).await?;
            let stored: Vec<SendRequest> = serde_json::from_slice(&content)?;
            stored.into_iter().map(|r| (r.id, r)).collect()
        } else {
            HashMap::new()
        };

        tracing::debug!(
            "📂 Loaded {} group(s), {} person(s), {} send request(s) from {}",
            snapshot.groups.len(),
            snapshot.people.len(),
            requests.len(),
            data_dir.display()
        );

        Ok(Self {
            data_dir,
            snapshot,
            requests: Mutex::new(requests),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub async fn send_requests(&self) -> Vec<SendRequest> {
        self.requests.lock().await.values().cloned().collect()
    }

    async fn write_requests(&self, requests: &HashMap<SendRequestId, SendRequest>) -> Result<()> {
        let mut stored: Vec<&SendRequest> = requests.values().collect();
        stored.sort_by_key(|r| r.created_at);
        let data = serde_json::to_vec_pretty(&stored)?;

        tokio::fs::create_dir_all(&self.data_dir).await?;
        let target = self.data_dir.join(SEND_REQUESTS_FILE);
        let temp = self.data_dir.join(format!("{}.tmp", SEND_REQUESTS_FILE));
        tokio::fs::write(&temp, &data).await?;
        tokio::fs::rename(&temp, &target).await?;

        tracing::debug!("Wrote {} send request(s) ({} bytes)", stored.len(), data.len());
        Ok(())
    }
}

#[async_trait]
impl GroupDirectory for FileStore {
    async fn find_group(&self, group_id: GroupId) -> Result<Option<Group>> {
        Ok(self.snapshot.find_group(group_id))
    }

    async fn group_members(
        &self,
        group_id: GroupId,
        filter: MemberStatusFilter,
    ) -> Result<Vec<GroupMember>> {
        Ok(self.snapshot.group_members(group_id, filter))
    }
}

#[async_trait]
impl OriginNumberProvider for FileStore {
    async fn find_origin_number(&self, id: OriginNumberId) -> Result<Option<OriginNumber>> {
        Ok(self.snapshot.find_origin_number(id))
    }
}

#[async_trait]
impl SendRequestStore for FileStore {
    async fn insert(&self, request: &SendRequest) -> Result<SendRequestId> {
        let mut requests = self.requests.lock().await;
        if requests.contains_key(&request.id) {
            return Err(GroupTextError::DuplicateSendRequest(request.id));
        }

        // 先寫檔成功，再更新記憶體
        let mut next = requests.clone();
        next.insert(request.id, request.clone());
        self.write_requests(&next).await?;
        *requests = next;

        Ok(request.id)
    }

    async fn get(&self, id: SendRequestId) -> Result<Option<SendRequest>> {
        Ok(self.requests.lock().await.get(&id).cloned())
    }

    async fn record_delivery(
        &self,
        id: SendRequestId,
        alias: PersonAliasId,
        status: RecipientStatus,
        note: Option<String>,
    ) -> Result<()> {
        let mut requests = self.requests.lock().await;
        let mut next = requests.clone();
        apply_delivery(&mut next, id, alias, status, note)?;
        self.write_requests(&next).await?;
        *requests = next;
        Ok(())
    }
}
