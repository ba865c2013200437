//! In-memory quest catalog, progress repository and like store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cityquest_core::error::DomainError;
use cityquest_core::repository::{
    LikeStore, LikeTransaction, ProgressFilter, ProgressRecord, ProgressRepository,
    ProgressVersion, QuestCatalog, QuestSummary,
};
use cityquest_core::status::QuestStatus;
use uuid::Uuid;

/// Builds a catalog entry with only a title and no likes.
#[must_use]
pub fn quest_summary(id: Uuid, title: &str) -> QuestSummary {
    QuestSummary {
        id,
        title: title.to_owned(),
        description: None,
        city: None,
        difficulty: None,
        duration_minutes: None,
        distance_km: None,
        image_url: None,
        likes_count: 0,
    }
}

#[derive(Debug, Default)]
struct StoreState {
    quests: HashMap<Uuid, QuestSummary>,
    /// Listed newest first; ties on `created_at` are broken by id.
    progress: Vec<ProgressRecord>,
    fail_counter_writes: bool,
}

impl StoreState {
    fn position(&self, user_id: Uuid, quest_id: Uuid) -> Option<usize> {
        self.progress
            .iter()
            .position(|p| p.user_id == user_id && p.quest_id == quest_id)
    }

    fn decrement(&mut self, quest_id: Uuid) -> Result<(), DomainError> {
        if let Some(quest) = self.quests.get_mut(&quest_id) {
            quest.likes_count = checked_decrement(quest_id, quest.likes_count)?;
        }
        Ok(())
    }
}

/// Mirrors the `likes_count >= 0` check constraint.
fn checked_decrement(quest_id: Uuid, likes_count: i64) -> Result<i64, DomainError> {
    if likes_count <= 0 {
        return Err(DomainError::Infrastructure(format!(
            "likes_count of quest {quest_id} would drop below zero"
        )));
    }
    Ok(likes_count - 1)
}

fn conflict(record: &ProgressRecord) -> DomainError {
    DomainError::ConcurrencyConflict {
        user_id: record.user_id,
        quest_id: record.quest_id,
    }
}

/// One store backing [`QuestCatalog`], [`ProgressRepository`] and
/// [`LikeStore`], with the same constraints the database enforces.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProgressStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryProgressStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a quest to the catalog and returns the store.
    #[must_use]
    pub fn with_quest(self, quest: QuestSummary) -> Self {
        self.add_quest(quest);
        self
    }

    /// Adds a quest to the catalog.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add_quest(&self, quest: QuestSummary) {
        self.state.lock().unwrap().quests.insert(quest.id, quest);
    }

    /// Inserts a snapshot as-is, bypassing every constraint.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert_record(&self, record: ProgressRecord) {
        self.state.lock().unwrap().progress.push(record);
    }

    /// The stored snapshot for a (user, quest) pair.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn record(&self, user_id: Uuid, quest_id: Uuid) -> Option<ProgressRecord> {
        let state = self.state.lock().unwrap();
        state
            .position(user_id, quest_id)
            .map(|i| state.progress[i].clone())
    }

    /// The catalog entry for a quest.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn quest(&self, quest_id: Uuid) -> Option<QuestSummary> {
        self.state.lock().unwrap().quests.get(&quest_id).cloned()
    }

    /// Makes every subsequent like-counter write fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_counter_writes(&self) {
        self.state.lock().unwrap().fail_counter_writes = true;
    }
}

#[async_trait]
impl QuestCatalog for InMemoryProgressStore {
    async fn find_by_id(&self, quest_id: Uuid) -> Result<Option<QuestSummary>, DomainError> {
        Ok(self.quest(quest_id))
    }
}

#[async_trait]
impl ProgressRepository for InMemoryProgressStore {
    async fn find_by_user_and_quest(
        &self,
        user_id: Uuid,
        quest_id: Uuid,
    ) -> Result<Option<ProgressRecord>, DomainError> {
        Ok(self.record(user_id, quest_id))
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ProgressRecord>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .progress
            .iter()
            .find(|p| p.user_id == user_id && p.status == QuestStatus::Active)
            .cloned())
    }

    async fn find_by_user_with_filters(
        &self,
        user_id: Uuid,
        filter: ProgressFilter,
    ) -> Result<Vec<ProgressRecord>, DomainError> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<ProgressRecord> = state
            .progress
            .iter()
            .filter(|p| p.user_id == user_id && filter.matches(p))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn save(
        &self,
        record: &ProgressRecord,
        expected: Option<ProgressVersion>,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();

        if record.status == QuestStatus::Active
            && let Some(active) = state.progress.iter().find(|p| {
                p.user_id == record.user_id
                    && p.quest_id != record.quest_id
                    && p.status == QuestStatus::Active
            })
        {
            return Err(DomainError::ActiveQuestExists {
                user_id: record.user_id,
                active_quest_id: active.quest_id,
            });
        }

        match (state.position(record.user_id, record.quest_id), expected) {
            (None, None) => state.progress.push(record.clone()),
            (Some(i), Some(version)) if version.matches(&state.progress[i]) => {
                let existing = &mut state.progress[i];
                existing.status = record.status;
                existing.completed_at = record.completed_at;
                existing.updated_at = record.updated_at;
            }
            _ => return Err(conflict(record)),
        }
        Ok(())
    }

    async fn delete(
        &self,
        user_id: Uuid,
        quest_id: Uuid,
        expected: ProgressVersion,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        let Some(i) = state
            .position(user_id, quest_id)
            .filter(|&i| expected.matches(&state.progress[i]))
        else {
            return Err(DomainError::ConcurrencyConflict { user_id, quest_id });
        };
        if state.progress[i].is_liked {
            state.decrement(quest_id)?;
        }
        state.progress.remove(i);
        Ok(())
    }
}

#[async_trait]
impl LikeStore for InMemoryProgressStore {
    async fn begin(&self) -> Result<Box<dyn LikeTransaction>, DomainError> {
        Ok(Box::new(InMemoryLikeTransaction {
            state: Arc::clone(&self.state),
            liked: HashMap::new(),
            likes_count: HashMap::new(),
        }))
    }
}

/// Stages writes and applies them to the shared state on commit only.
struct InMemoryLikeTransaction {
    state: Arc<Mutex<StoreState>>,
    liked: HashMap<(Uuid, Uuid), bool>,
    likes_count: HashMap<Uuid, i64>,
}

impl InMemoryLikeTransaction {
    fn adjust(&mut self, quest_id: Uuid, delta: i64) -> Result<(), DomainError> {
        let state = self.state.lock().unwrap();
        if state.fail_counter_writes {
            return Err(DomainError::Infrastructure("likes_count update failed".into()));
        }
        let current = match self.likes_count.get(&quest_id) {
            Some(count) => *count,
            None => state.quests.get(&quest_id).map_or(0, |q| q.likes_count),
        };
        let next = if delta < 0 {
            checked_decrement(quest_id, current)?
        } else {
            current + delta
        };
        self.likes_count.insert(quest_id, next);
        Ok(())
    }
}

#[async_trait]
impl LikeTransaction for InMemoryLikeTransaction {
    async fn flip_like(
        &mut self,
        user_id: Uuid,
        quest_id: Uuid,
    ) -> Result<Option<bool>, DomainError> {
        let committed = {
            let state = self.state.lock().unwrap();
            state
                .position(user_id, quest_id)
                .map(|i| state.progress[i].is_liked)
        };
        let Some(committed) = committed else {
            return Ok(None);
        };
        let key = (user_id, quest_id);
        let liked = !self.liked.get(&key).copied().unwrap_or(committed);
        self.liked.insert(key, liked);
        Ok(Some(liked))
    }

    async fn increment_likes_count(&mut self, quest_id: Uuid) -> Result<(), DomainError> {
        self.adjust(quest_id, 1)
    }

    async fn decrement_likes_count(&mut self, quest_id: Uuid) -> Result<(), DomainError> {
        self.adjust(quest_id, -1)
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        for ((user_id, quest_id), liked) in self.liked {
            if let Some(i) = state.position(user_id, quest_id) {
                state.progress[i].is_liked = liked;
            }
        }
        for (quest_id, count) in self.likes_count {
            if let Some(quest) = state.quests.get_mut(&quest_id) {
                quest.likes_count = count;
            }
        }
        Ok(())
    }
}
