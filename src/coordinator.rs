//! Best-effort orchestration of sync, pick updates, and snapshot publishing.

use crate::blob::{
    BlobStore, SnapshotPublisher, reveal_snapshot_key, season_matrix_key, user_entries_key,
};
use crate::config::Config;
use crate::error::{PoolError, PoolResult};
use crate::models::{UserId, Week, WeekId};
use crate::results::{UpdateCounts, update_week};
use crate::store::Store;
use crate::sync::{ScoreboardFeed, SyncReport, sync_week};
use crate::views::{
    build_matrix, build_reveal_snapshot, build_user_entries, publish_reveal_snapshots,
};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of one stage: the stage's report, or `{error: true, message}`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Stage<T> {
    Done(T),
    Failed { error: bool, message: String },
}

impl<T> Stage<T> {
    fn capture(stage: &str, result: PoolResult<T>) -> Self {
        match result {
            Ok(report) => Stage::Done(report),
            Err(e) => {
                error!("{stage} failed: {e}");
                Stage::Failed { error: true, message: e.to_string() }
            }
        }
    }

    pub fn ok(&self) -> Option<&T> {
        match self {
            Stage::Done(report) => Some(report),
            Stage::Failed { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok().is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub week_id: WeekId,
    pub season_year: i32,
    pub week_number: u32,
    /// False when pick updates were held back for the unlocked current week.
    pub picks_updated: bool,
    pub counts: UpdateCounts,
    /// Set when the pick updater failed; the snapshot is still built.
    pub update_error: Option<String>,
    pub locked: bool,
    pub snapshot_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixReport {
    pub season_year: Option<i32>,
    pub weeks: usize,
    pub entries: usize,
    /// `None` when there was no season to key the matrix by.
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub sync: Stage<SyncReport>,
    pub aggregator: Stage<AggregateReport>,
    pub matrix: Stage<MatrixReport>,
}

impl RunReport {
    pub fn all_ok(&self) -> bool {
        self.sync.is_ok() && self.aggregator.is_ok() && self.matrix.is_ok()
    }
}

pub struct Coordinator {
    store: Arc<dyn Store>,
    feed: Arc<dyn ScoreboardFeed>,
    publisher: SnapshotPublisher,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn Store>,
        feed: Arc<dyn ScoreboardFeed>,
        blobs: Arc<dyn BlobStore>,
        config: &Config,
    ) -> Self {
        Self { store, feed, publisher: SnapshotPublisher::new(blobs, config) }
    }

    pub async fn run(&self, season_year: Option<i32>, week_number: Option<u32>) -> RunReport {
        self.run_at(Utc::now(), season_year, week_number).await
    }

    /// Attempt every stage exactly once. A failed stage is reported and the
    /// following stages still run against whatever the store holds.
    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        season_year: Option<i32>,
        week_number: Option<u32>,
    ) -> RunReport {
        let current = self.current_week_or_none().await;
        let current = current.as_ref();

        let sync = Stage::capture(
            "sync",
            sync_week(self.store.as_ref(), self.feed.as_ref(), current, season_year, week_number)
                .await,
        );

        let target = self.target_week(sync.ok(), current, season_year, week_number).await;
        let matrix_season = match &target {
            Ok(week) => Some(week.season_year),
            Err(_) => season_year,
        };

        let aggregator = match target {
            Ok(week) => self.aggregate_with(current, &week, now).await,
            Err(e) => Err(e),
        };
        let aggregator = Stage::capture("aggregate", aggregator);

        let matrix = Stage::capture(
            "matrix",
            self.publish_matrix_with(current, matrix_season, now).await,
        );

        info!(
            "run complete: sync {}, aggregate {}, matrix {}",
            stage_label(sync.is_ok()),
            stage_label(aggregator.is_ok()),
            stage_label(matrix.is_ok())
        );
        RunReport { sync, aggregator, matrix }
    }

    pub async fn sync(
        &self,
        season_year: Option<i32>,
        week_number: Option<u32>,
    ) -> PoolResult<SyncReport> {
        let current = self.store.current_week().await?;
        sync_week(
            self.store.as_ref(),
            self.feed.as_ref(),
            current.as_ref(),
            season_year,
            week_number,
        )
        .await
    }

    /// Update pick statuses for a week and publish its reveal snapshot.
    pub async fn aggregate(&self, week_id: WeekId, now: DateTime<Utc>) -> PoolResult<AggregateReport> {
        let current = self.store.current_week().await?;
        let week = self
            .store
            .week(week_id)
            .await?
            .ok_or_else(|| PoolError::WeekNotFound(format!("week id {week_id}")))?;
        self.aggregate_with(current.as_ref(), &week, now).await
    }

    pub async fn publish_matrix(
        &self,
        season_year: Option<i32>,
        now: DateTime<Utc>,
    ) -> PoolResult<MatrixReport> {
        let current = self.store.current_week().await?;
        self.publish_matrix_with(current.as_ref(), season_year, now).await
    }

    pub async fn publish_reveals(&self, season_year: i32, now: DateTime<Utc>) -> PoolResult<Vec<String>> {
        let current = self.store.current_week().await?;
        publish_reveal_snapshots(
            self.store.as_ref(),
            &self.publisher,
            current.as_ref(),
            season_year,
            now,
        )
        .await
    }

    pub async fn publish_user_entries(&self, user_id: UserId, now: DateTime<Utc>) -> PoolResult<String> {
        let view = build_user_entries(self.store.as_ref(), user_id, now).await?;
        self.publisher.publish(&user_entries_key(user_id), &view).await
    }

    async fn current_week_or_none(&self) -> Option<Week> {
        match self.store.current_week().await {
            Ok(week) => week,
            Err(e) => {
                warn!("could not read current week, continuing without it: {e}");
                None
            }
        }
    }

    /// The synced week when sync succeeded, else the caller's season/week
    /// (defaulting each to the current week's), else the current week.
    async fn target_week(
        &self,
        synced: Option<&SyncReport>,
        current: Option<&Week>,
        season_year: Option<i32>,
        week_number: Option<u32>,
    ) -> PoolResult<Week> {
        if let Some(report) = synced {
            return self
                .store
                .week(report.week_id)
                .await?
                .ok_or_else(|| PoolError::WeekNotFound(format!("week id {}", report.week_id)));
        }

        let season = season_year.or(current.map(|w| w.season_year));
        let number = week_number.or(current.map(|w| w.week_number));
        match (season, number) {
            (Some(season), Some(number)) => self
                .store
                .week_by_number(season, number)
                .await?
                .ok_or_else(|| PoolError::WeekNotFound(format!("season {season} week {number}"))),
            _ => Err(PoolError::WeekNotFound("no week to aggregate".into())),
        }
    }

    async fn aggregate_with(
        &self,
        current: Option<&Week>,
        week: &Week,
        now: DateTime<Utc>,
    ) -> PoolResult<AggregateReport> {
        let unlocked_current = current.is_some_and(|c| c.id == week.id) && !week.is_locked_at(now);
        let (counts, update_error) = if unlocked_current {
            info!("week {} is current and unlocked, holding back pick updates", week.id);
            (UpdateCounts::default(), None)
        } else {
            match update_week(self.store.as_ref(), week.id, now).await {
                Ok(counts) => (counts, None),
                Err(e) => {
                    warn!("pick update for week {} failed, building snapshot anyway: {e}", week.id);
                    (UpdateCounts::default(), Some(e.to_string()))
                }
            }
        };

        let snapshot = build_reveal_snapshot(self.store.as_ref(), current, week.id, now).await?;
        let snapshot_key = self
            .publisher
            .publish(&reveal_snapshot_key(week.id), &snapshot)
            .await?;
        Ok(AggregateReport {
            week_id: week.id,
            season_year: week.season_year,
            week_number: week.week_number,
            picks_updated: !unlocked_current && update_error.is_none(),
            counts,
            update_error,
            locked: snapshot.locked,
            snapshot_key,
        })
    }

    async fn publish_matrix_with(
        &self,
        current: Option<&Week>,
        season_year: Option<i32>,
        now: DateTime<Utc>,
    ) -> PoolResult<MatrixReport> {
        let matrix = build_matrix(self.store.as_ref(), current, season_year, now).await?;
        let key = match matrix.season_year {
            Some(season) => Some(self.publisher.publish(&season_matrix_key(season), &matrix).await?),
            None => {
                info!("no weeks stored, matrix not published");
                None
            }
        };
        Ok(MatrixReport {
            season_year: matrix.season_year,
            weeks: matrix.weeks.len(),
            entries: matrix.entries.len(),
            key,
        })
    }
}

fn stage_label(ok: bool) -> &'static str {
    if ok { "ok" } else { "failed" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::models::{GameRecord, GameStatus, PickStatus};
    use crate::store::{MemoryStore, StoreData};
    use crate::testing::{FailingStore, StaticFeed, entry, pick, user, week};
    use crate::views::{RevealSnapshot, SeasonMatrix};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 7, 12, 0, 0).unwrap()
    }

    fn final_record(home: &str, away: &str, home_score: u32, away_score: u32) -> GameRecord {
        GameRecord {
            home_team_abbr: home.into(),
            away_team_abbr: away.into(),
            start_time: Utc.with_ymd_and_hms(2025, 10, 5, 17, 0, 0).unwrap(),
            status: GameStatus::Final,
            home_score: Some(home_score),
            away_score: Some(away_score),
        }
    }

    fn week_five() -> StoreData {
        StoreData {
            weeks: vec![
                week(4, 2025, 4, Some(now() - Duration::days(9)), false),
                week(5, 2025, 5, Some(now() - Duration::days(2)), true),
            ],
            picks: vec![pick(10, 1, 5, Some("NYG")), pick(11, 2, 5, Some("SEA"))],
            entries: vec![entry(1, 1, "Giants fan", false), entry(2, 2, "Hawks fan", false)],
            users: vec![user(1, "Gia", "gia@example.com"), user(2, "Hal", "hal@example.com")],
            ..Default::default()
        }
    }

    fn coordinator(
        store: Arc<dyn Store>,
        feed: StaticFeed,
        bucket: Option<&str>,
    ) -> (Coordinator, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::default());
        let config = Config { bucket: bucket.map(str::to_owned), ..Config::default() };
        (Coordinator::new(store, Arc::new(feed), blobs.clone(), &config), blobs)
    }

    fn tie_feed() -> StaticFeed {
        StaticFeed::new(
            Some(2025),
            Some(5),
            vec![final_record("NYG", "DAL", 20, 20), final_record("SEA", "SF", 27, 13)],
        )
    }

    #[tokio::test]
    async fn full_run_resolves_tie_and_publishes() {
        let store = Arc::new(MemoryStore::new(week_five()));
        let (coordinator, blobs) = coordinator(store.clone(), tie_feed(), Some("pool"));

        let report = coordinator.run_at(now(), None, None).await;
        assert!(report.all_ok(), "{report:?}");

        let sync = report.sync.ok().unwrap();
        assert_eq!((sync.week_id, sync.counts.created), (5, 2));
        let aggregate = report.aggregator.ok().unwrap();
        assert!(aggregate.picks_updated);
        assert_eq!(aggregate.counts.loss, 1);
        assert_eq!(aggregate.counts.win, 1);
        assert_eq!(aggregate.counts.eliminated, 1);
        assert!(aggregate.locked);
        assert!(store.entry(1).await.unwrap().unwrap().is_eliminated);

        let keys = blobs.keys("pool").await;
        assert!(keys.contains(&"snapshots/week-5-reveal-snapshot.json".to_string()));
        assert!(keys.contains(&"snapshots/season-2025-matrix.json".to_string()));

        let publisher = SnapshotPublisher::new(
            blobs.clone(),
            &Config { bucket: Some("pool".into()), ..Config::default() },
        );
        let snapshot: RevealSnapshot = publisher
            .load(&reveal_snapshot_key(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.kpis.losses, 1);
        let matrix: SeasonMatrix = publisher.load(&season_matrix_key(2025)).await.unwrap().unwrap();
        let giants = matrix.entries.iter().find(|e| e.entry_id == 1).unwrap();
        assert_eq!(giants.eliminated_week, Some(5));
    }

    #[tokio::test]
    async fn failed_sync_still_aggregates_stored_games() {
        let mut data = week_five();
        data.games = vec![crate::testing::final_game(1, 5, "SEA", "SF", 27, 13)];
        let store = Arc::new(MemoryStore::new(data));
        let (coordinator, _) = coordinator(store.clone(), StaticFeed::failing(), Some("pool"));

        let report = coordinator.run_at(now(), None, None).await;
        assert!(!report.sync.is_ok());
        let aggregate = report.aggregator.ok().expect("falls back to the current week");
        assert_eq!(aggregate.week_id, 5);
        assert_eq!(aggregate.counts.win, 1);
        assert!(report.matrix.is_ok());
        assert_eq!(store.picks_for_week(5).await.unwrap()[1].status, PickStatus::Win);
    }

    #[tokio::test]
    async fn missing_bucket_fails_publishing_stages_only() {
        let store = Arc::new(MemoryStore::new(week_five()));
        let (coordinator, _) = coordinator(store.clone(), tie_feed(), None);

        let report = coordinator.run_at(now(), None, None).await;
        assert!(report.sync.is_ok());
        assert!(!report.aggregator.is_ok());
        assert!(!report.matrix.is_ok());
        // Pick updates land before the snapshot write fails.
        assert!(store.entry(1).await.unwrap().unwrap().is_eliminated);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["matrix"]["error"], json!(true));
        assert!(value["matrix"]["message"].as_str().unwrap().contains("SURVIVOR_BUCKET"));
        assert_eq!(value["sync"]["week_id"], json!(5));
    }

    #[tokio::test]
    async fn every_stage_is_attempted_when_store_reads_fail() {
        let store = Arc::new(FailingStore::new(week_five()));
        store.fail_reads();
        let feed = tie_feed();
        let (coordinator, _) = coordinator(store.clone(), feed, Some("pool"));

        let report = coordinator.run_at(now(), None, None).await;
        assert!(!report.sync.is_ok());
        assert!(!report.aggregator.is_ok());
        assert!(!report.matrix.is_ok());
    }

    #[tokio::test]
    async fn unlocked_current_week_holds_back_pick_updates() {
        let mut data = week_five();
        data.weeks = vec![week(6, 2025, 6, Some(now() + Duration::days(2)), true)];
        data.picks = vec![pick(10, 1, 6, Some("NYG"))];
        let store = Arc::new(MemoryStore::new(data));
        let feed = StaticFeed::new(Some(2025), Some(6), vec![final_record("NYG", "PHI", 10, 30)]);
        let (coordinator, _) = coordinator(store.clone(), feed, Some("pool"));

        let report = coordinator.run_at(now(), None, None).await;
        assert!(report.all_ok(), "{report:?}");
        assert_eq!(report.sync.ok().unwrap().counts.created, 1);

        let aggregate = report.aggregator.ok().unwrap();
        assert!(!aggregate.picks_updated);
        assert!(!aggregate.locked);
        assert_eq!(aggregate.counts, UpdateCounts::default());
        assert!(!store.entry(1).await.unwrap().unwrap().is_eliminated);
        assert_eq!(store.picks_for_week(6).await.unwrap()[0].status, PickStatus::Tbd);

        let later = now() + Duration::days(3);
        let report = coordinator.run_at(later, None, None).await;
        let aggregate = report.aggregator.ok().unwrap();
        assert!(aggregate.picks_updated);
        assert_eq!(aggregate.counts.eliminated, 1);
    }

    #[tokio::test]
    async fn updater_failure_still_publishes_snapshot() {
        let mut data = week_five();
        data.games = vec![crate::testing::final_game(1, 5, "SEA", "SF", 27, 13)];
        let target = data.weeks[1].clone();
        let store = Arc::new(FailingStore::new(data));
        let (coordinator, blobs) = coordinator(store.clone(), tie_feed(), Some("pool"));

        store.fail_next_reads(1);
        let report = coordinator.aggregate_with(None, &target, now()).await.unwrap();
        assert!(!report.picks_updated);
        assert!(report.update_error.as_deref().is_some_and(|m| m.contains("injected")));
        assert_eq!(report.snapshot_key, "snapshots/week-5-reveal-snapshot.json");
        assert_eq!(blobs.keys("pool").await, vec![report.snapshot_key.clone()]);
    }

    #[tokio::test]
    async fn empty_store_skips_matrix_publish() {
        let store = Arc::new(MemoryStore::default());
        let (coordinator, blobs) = coordinator(store, tie_feed(), Some("pool"));

        let report = coordinator.publish_matrix(None, now()).await.unwrap();
        assert_eq!((report.season_year, report.key), (None, None));
        assert!(blobs.keys("pool").await.is_empty());
    }

    #[tokio::test]
    async fn single_operations_publish_their_own_keys() {
        let store = Arc::new(MemoryStore::new(week_five()));
        let (coordinator, blobs) = coordinator(store, tie_feed(), Some("pool"));

        let keys = coordinator.publish_reveals(2025, now()).await.unwrap();
        assert_eq!(keys.len(), 2);
        let key = coordinator.publish_user_entries(2, now()).await.unwrap();
        assert_eq!(key, "snapshots/user-2-entries-with-picks.json");
        assert_eq!(blobs.keys("pool").await.len(), 3);

        let err = coordinator.aggregate(77, now()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
