use crate::core::{GroupDirectory, Result};
use crate::domain::model::{GroupId, GroupMember, GroupPreview, MemberStatusFilter, Person};
use std::collections::HashSet;
use std::sync::Arc;

/// Turns group membership into the set of people that can receive an SMS.
/// Read-only: calling it any number of times never changes state.
pub struct RecipientResolver {
    directory: Arc<dyn GroupDirectory>,
}

impl RecipientResolver {
    pub fn new(directory: Arc<dyn GroupDirectory>) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, group_id: GroupId, include_inactive: bool) -> Result<Vec<Person>> {
        let filter = MemberStatusFilter::from_include_inactive(include_inactive);
        let members = self.directory.group_members(group_id, filter).await?;
        let members = retain_status(members, filter);
        let member_count = members.len();

        let recipients = eligible_recipients(members);
        tracing::debug!(
            "Group {}: {} of {} member(s) have an eligible mobile number (include_inactive={})",
            group_id,
            recipients.len(),
            member_count,
            include_inactive
        );

        Ok(recipients)
    }

    /// 群組不存在時回傳 None
    pub async fn preview(
        &self,
        group_id: GroupId,
        include_inactive: bool,
    ) -> Result<Option<GroupPreview>> {
        if self.directory.find_group(group_id).await?.is_none() {
            tracing::debug!("Group {} not found, no preview", group_id);
            return Ok(None);
        }

        let filter = MemberStatusFilter::from_include_inactive(include_inactive);
        let members = self.directory.group_members(group_id, filter).await?;
        let members = retain_status(members, filter);
        let total_member_count = members.len();
        let mobile_eligible_count = eligible_recipients(members).len();

        Ok(Some(GroupPreview {
            total_member_count,
            mobile_eligible_count,
        }))
    }
}

// directory 可能忽略 filter，這裡再套用一次
fn retain_status(members: Vec<GroupMember>, filter: MemberStatusFilter) -> Vec<GroupMember> {
    members
        .into_iter()
        .filter(|m| filter.accepts(m.membership.status))
        .collect()
}

/// Keeps members with an eligible mobile number, first occurrence per person.
pub fn eligible_recipients(members: Vec<GroupMember>) -> Vec<Person> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .map(|m| m.person)
        .filter(Person::has_eligible_mobile)
        .filter(|p| seen.insert(p.id))
        .collect()
}
