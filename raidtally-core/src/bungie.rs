//! Bungie endpoint bindings.
//!
//! Wire types mirror the fields this pipeline actually consumes; everything
//! else in the payloads is ignored. The [`ClanApi`] trait is the seam
//! between the HTTP client and the fan-out pipeline, so tests can drive the
//! orchestration with an in-memory fake.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::client::ApiClient;
use crate::error::Result;

/// Display name used when a member carries neither a network-wide nor a
/// platform-local name.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// One resolved clan member. `membership_id` is the aggregation key; it is
/// unique within a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub membership_type: i32,
    pub membership_id: String,
    pub display_name: String,
}

/// Upstream API surface consumed by the pipeline.
#[async_trait]
pub trait ClanApi: Send + Sync {
    /// Resolve a clan's numeric group id from its name.
    async fn group_id_by_name(&self, name: &str, group_type: i32) -> Result<String>;

    /// List the members of a group.
    async fn group_members(&self, group_id: &str) -> Result<Vec<Member>>;

    /// List a member's character ids.
    async fn character_ids(&self, member: &Member) -> Result<Vec<String>>;

    /// Fetch one character's aggregate activity stats as raw
    /// `(activity hash, completion count)` pairs, unfiltered.
    async fn activity_stats(
        &self,
        member: &Member,
        character_id: &str,
    ) -> Result<Vec<(u32, u64)>>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GroupSearchResponse {
    detail: GroupDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupDetail {
    group_id: String,
}

#[derive(Debug, Deserialize)]
struct MembersPage {
    #[serde(default)]
    results: Vec<MemberEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberEntry {
    destiny_user_info: DestinyUserInfo,
    #[serde(default)]
    bungie_net_user_info: Option<BungieNetUserInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DestinyUserInfo {
    membership_type: i32,
    membership_id: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BungieNetUserInfo {
    #[serde(default)]
    bungie_global_display_name: Option<String>,
}

impl MemberEntry {
    /// Network-wide display name wins over the platform-local one; empty
    /// strings count as absent.
    fn into_member(self) -> Member {
        let display_name = self
            .bungie_net_user_info
            .and_then(|info| info.bungie_global_display_name)
            .filter(|name| !name.is_empty())
            .or(self
                .destiny_user_info
                .display_name
                .filter(|name| !name.is_empty()))
            .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string());
        Member {
            membership_type: self.destiny_user_info.membership_type,
            membership_id: self.destiny_user_info.membership_id,
            display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    characters: Option<CharactersComponent>,
}

#[derive(Debug, Deserialize)]
struct CharactersComponent {
    #[serde(default)]
    data: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct AggregateStatsResponse {
    #[serde(default)]
    activities: Option<Vec<ActivityEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityEntry {
    #[serde(default)]
    activity_hash: Option<u32>,
    values: ActivityValues,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityValues {
    activity_completions: ActivityStat,
}

#[derive(Debug, Deserialize)]
struct ActivityStat {
    basic: BasicValue,
}

#[derive(Debug, Deserialize)]
struct BasicValue {
    /// Bungie serves stat values as floats; completion counts are whole.
    value: f64,
}

#[async_trait]
impl ClanApi for ApiClient {
    async fn group_id_by_name(&self, name: &str, group_type: i32) -> Result<String> {
        let path = format!("/GroupV2/Name/{}/{}/", urlencoding::encode(name), group_type);
        let search: GroupSearchResponse = self.get(&path).await?;
        Ok(search.detail.group_id)
    }

    async fn group_members(&self, group_id: &str) -> Result<Vec<Member>> {
        let path = format!("/GroupV2/{group_id}/Members/");
        let page: MembersPage = self.get(&path).await?;
        Ok(page
            .results
            .into_iter()
            .map(MemberEntry::into_member)
            .collect())
    }

    async fn character_ids(&self, member: &Member) -> Result<Vec<String>> {
        let path = format!(
            "/Destiny2/{}/Profile/{}/?components=200",
            member.membership_type, member.membership_id
        );
        let profile: ProfileResponse = self.get(&path).await?;
        Ok(profile
            .characters
            .and_then(|component| component.data)
            .map(|data| data.into_keys().collect())
            .unwrap_or_default())
    }

    async fn activity_stats(
        &self,
        member: &Member,
        character_id: &str,
    ) -> Result<Vec<(u32, u64)>> {
        let path = format!(
            "/Destiny2/{}/Account/{}/Character/{}/Stats/AggregateActivityStats/",
            member.membership_type, member.membership_id, character_id
        );
        let stats: AggregateStatsResponse = self.get(&path).await?;
        Ok(stats
            .activities
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let hash = entry.activity_hash?;
                Some((hash, entry.values.activity_completions.basic.value as u64))
            })
            .collect())
    }
}
