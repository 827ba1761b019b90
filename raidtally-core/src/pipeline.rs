//! Multi-level fan-out/fan-in fetch pipeline.
//!
//! Resolve members, enumerate every member's characters, collect every
//! character's stats, reduce into per-member totals. All tasks of a stage
//! are spawned before any is awaited, and every network call competes for
//! the one concurrency budget inside the shared client. Failures below the
//! member-directory stage are absorbed: a broken member or character
//! contributes zero counts instead of aborting the run.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::aggregate::{Aggregator, PerCharacterResult};
use crate::bungie::{ClanApi, Member};
use crate::error::Result;
use crate::raids::RaidTable;
use crate::report::MemberTotal;

/// Run the whole pipeline for one group. Fails only if the member
/// directory itself cannot be resolved.
pub async fn run<A>(
    api: Arc<A>,
    table: &RaidTable,
    group_id: &str,
    wanted: &HashSet<u32>,
) -> Result<Vec<MemberTotal>>
where
    A: ClanApi + 'static,
{
    let members = api.group_members(group_id).await?;
    info!(group_id, members = members.len(), "resolved clan roster");

    let rosters = enumerate_characters(Arc::clone(&api), &members).await;
    let characters: usize = rosters.iter().map(Vec::len).sum();
    info!(characters, "enumerated characters, collecting stats");

    let wanted = Arc::new(wanted.clone());
    let mut tasks = JoinSet::new();
    for (idx, character_ids) in rosters.iter().enumerate() {
        for character_id in character_ids {
            let api = Arc::clone(&api);
            let member = members[idx].clone();
            let character_id = character_id.clone();
            let wanted = Arc::clone(&wanted);
            tasks.spawn(async move {
                let result = collect_character(api.as_ref(), &member, &character_id, &wanted).await;
                (idx, result)
            });
        }
    }

    // Fan-in is strictly sequential; the aggregator is never shared.
    let mut aggregator = Aggregator::new(table, &members);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, result)) => aggregator.record(&members[idx].membership_id, &result),
            Err(err) => {
                warn!(error = %err, "stats task aborted, one character counts as zero");
            }
        }
    }

    Ok(aggregator.finish())
}

/// Stage 2: one concurrent enumeration per member. A failed member yields
/// an empty character list.
async fn enumerate_characters<A>(api: Arc<A>, members: &[Member]) -> Vec<Vec<String>>
where
    A: ClanApi + 'static,
{
    let mut tasks = JoinSet::new();
    for (idx, member) in members.iter().enumerate() {
        let api = Arc::clone(&api);
        let member = member.clone();
        tasks.spawn(async move {
            let characters = match api.character_ids(&member).await {
                Ok(characters) => characters,
                Err(err) => {
                    warn!(
                        member = %member.membership_id,
                        error = %err,
                        "character enumeration failed, member contributes no stats"
                    );
                    Vec::new()
                }
            };
            (idx, characters)
        });
    }

    let mut rosters = vec![Vec::new(); members.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, characters)) => rosters[idx] = characters,
            Err(err) => {
                warn!(error = %err, "enumeration task aborted, member contributes no stats");
            }
        }
    }
    rosters
}

/// Stage 3: one stats fetch per (member, character) pair. The single
/// aggregate-stats response covers every activity the character has ever
/// run; filtering to the wanted set happens here, client-side. A failed
/// fetch yields zero for every wanted identifier.
async fn collect_character<A: ClanApi>(
    api: &A,
    member: &Member,
    character_id: &str,
    wanted: &HashSet<u32>,
) -> PerCharacterResult {
    let mut totals = PerCharacterResult::zeroed(wanted);
    match api.activity_stats(member, character_id).await {
        Ok(entries) => {
            for (hash, count) in entries {
                if wanted.contains(&hash) {
                    totals.add(hash, count);
                }
            }
        }
        Err(err) => {
            warn!(
                member = %member.membership_id,
                character = character_id,
                error = %err,
                "stats fetch failed, character counts as zero"
            );
        }
    }
    totals
}
