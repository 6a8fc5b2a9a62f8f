use std::collections::btree_map::Entry;

use futures_util::stream::{self, StreamExt};
use mirror_domain::{profile_from, UserId, UserRecord, UserRefreshReport};
use tracing::{info, warn};

use crate::fetch::remote_calls::fetch_user_details;
use crate::queries::referenced_users;
use crate::{AppError, SyncError, SyncState};

/// Adds profiles collected during event fetches for users not yet known.
pub async fn absorb_profiles(
    state: &SyncState,
    profiles: Vec<UserRecord>,
) -> anyhow::Result<usize> {
    if profiles.is_empty() {
        return Ok(0);
    }
    let mut users = state.users.load_all().await?;
    let mut added = 0;
    for profile in profiles {
        if let Entry::Vacant(slot) = users.entry(profile.user_id) {
            slot.insert(profile);
            added += 1;
        }
    }
    if added > 0 {
        let records: Vec<UserRecord> = users.into_values().collect();
        state.users.save_all(&records).await?;
        info!("added {} new user(s)", added);
    }
    Ok(added)
}

fn refreshed(existing: Option<&UserRecord>, mut fresh: UserRecord) -> UserRecord {
    if let Some(existing) = existing {
        if fresh.player_id.is_none() {
            fresh.player_id = existing.player_id;
            fresh.gamer_tag = existing.gamer_tag.clone();
            fresh.prefix = existing.prefix.clone();
        }
    }
    fresh
}

/// Creates users referenced by stored records but missing from the user set,
/// optionally refreshing every known user as well.
pub async fn refresh_users(
    state: &SyncState,
    refresh_existing: bool,
) -> Result<UserRefreshReport, AppError> {
    let mut users = state.users.load_all().await?;
    let mut report = UserRefreshReport {
        known: users.len(),
        ..UserRefreshReport::default()
    };

    let referenced = referenced_users(state).await?;
    let mut targets: Vec<UserId> = referenced
        .into_iter()
        .filter(|user_id| !users.contains_key(user_id))
        .collect();
    if refresh_existing {
        targets.extend(users.keys().copied());
        targets.sort();
    }
    info!(
        "refreshing {} user(s) ({} known)",
        targets.len(),
        report.known
    );

    let workers = state.config.worker_count.max(1);
    let results: Vec<_> = stream::iter(targets)
        .map(|user_id| async move { (user_id, fetch_user_details(state, user_id).await) })
        .buffer_unordered(workers)
        .collect()
        .await;

    for (user_id, result) in results {
        match result {
            Ok(Some(details)) => {
                let fresh = profile_from(&details.user, details.player.as_ref());
                let record = refreshed(users.get(&user_id), fresh);
                if users.insert(user_id, record).is_some() {
                    report.refreshed += 1;
                } else {
                    report.created += 1;
                }
            }
            Ok(None) | Err(SyncError::NotFound(_)) => {
                warn!("user {} not found on remote, keeping as is", user_id);
                report.not_found += 1;
            }
            Err(err) => {
                warn!("failed to refresh user {}: {}", user_id, err);
                report.failed += 1;
            }
        }
    }

    if report.created + report.refreshed > 0 {
        let records: Vec<UserRecord> = users.into_values().collect();
        state.users.save_all(&records).await?;
    }
    info!(
        "user refresh done: created={} refreshed={} not_found={} failed={}",
        report.created, report.refreshed, report.not_found, report.failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use mirror_domain::{ListRecord, QueryKind, RecordKind, StandingEntry, UserRepository};
    use serde_json::json;

    use super::*;
    use crate::testing::harness;

    #[tokio::test]
    async fn absorb_only_adds_unknown_users() {
        let h = harness();
        let mut known = UserRecord::new(UserId(1));
        known.gamer_tag = Some("Keep".to_string());
        h.users.save_all(&[known]).await.expect("seed");

        let mut incoming = UserRecord::new(UserId(1));
        incoming.gamer_tag = Some("Other".to_string());
        let added = absorb_profiles(&h.state, vec![incoming, UserRecord::new(UserId(2))])
            .await
            .expect("absorb");

        assert_eq!(added, 1);
        assert_eq!(h.users.ids(), vec![UserId(1), UserId(2)]);
        assert_eq!(
            h.users.get(UserId(1)).and_then(|user| user.gamer_tag),
            Some("Keep".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_creates_referenced_users_and_counts_missing_ones() {
        let h = harness();
        let standings = ListRecord::new(vec![
            StandingEntry { placement: 1, user_id: Some(UserId(10)) },
            StandingEntry { placement: 2, user_id: Some(UserId(11)) },
        ]);
        h.store.put(
            "events/Japan/2024/01/01/Cup/Singles",
            RecordKind::Standings,
            serde_json::to_value(standings).expect("encode"),
        );
        h.remote.push_one_for(
            QueryKind::UserDetails,
            json!({ "userId": 10 }),
            Ok(json!({ "id": 10, "player": { "id": 77, "gamerTag": "Ten" } })),
        );

        let report = refresh_users(&h.state, false).await.expect("refresh");

        assert_eq!(report.created, 1);
        assert_eq!(report.not_found, 1);
        let user = h.users.get(UserId(10)).expect("created");
        assert_eq!(user.player_id, Some(77));
        assert_eq!(user.gamer_tag.as_deref(), Some("Ten"));
        assert!(h.users.get(UserId(11)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_existing_keeps_player_fields_when_remote_has_none() {
        let h = harness();
        let mut known = UserRecord::new(UserId(5));
        known.player_id = Some(55);
        known.gamer_tag = Some("Five".to_string());
        h.users.save_all(&[known]).await.expect("seed");
        h.remote.push_one_for(
            QueryKind::UserDetails,
            json!({ "userId": 5 }),
            Ok(json!({ "id": 5, "genderPronoun": "they/them", "player": null })),
        );

        let report = refresh_users(&h.state, true).await.expect("refresh");

        assert_eq!(report.refreshed, 1);
        let user = h.users.get(UserId(5)).expect("kept");
        assert_eq!(user.gamer_tag.as_deref(), Some("Five"));
        assert_eq!(user.gender_pronoun, "they/them");
    }
}
