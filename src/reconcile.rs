use std::collections::BTreeSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::{debug, info};

use crate::{
    entities::{movie, movie_cast, movie_genre},
    error::{WorkerError, WorkerResult},
    models::MovieRecord,
};

/// Converges durable storage to match one incoming movie update.
///
/// The three sub-steps (movie upsert, cast sync, genre sync) each commit
/// their own transaction. A crash between sub-steps leaves the movie
/// ahead of its links; the still-undeleted source document gets the
/// whole record reapplied on the next cycle, and every sub-step is
/// idempotent, so that state is transient rather than lost.
#[derive(Clone)]
pub struct Reconciler {
    db: DatabaseConnection,
}

impl Reconciler {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn reconcile(&self, update: &MovieRecord) -> WorkerResult<movie::Model> {
        let record = self.upsert_movie(update).await?;
        self.sync_cast(&record, &update.cast).await?;
        self.sync_genres(&record, &update.genres).await?;
        Ok(record)
    }

    /// Creates or overwrites the movie row matching the update's title.
    /// Title is the natural key; the returned id is stable across
    /// updates for the same title.
    pub async fn upsert_movie(&self, update: &MovieRecord) -> WorkerResult<movie::Model> {
        let payload = update.to_json().map_err(WorkerError::Decode)?;

        let txn = self.db.begin().await?;

        let existing = movie::Entity::find()
            .filter(movie::Column::Title.eq(update.title.as_str()))
            .one(&txn)
            .await?;

        let record = match existing {
            Some(found) => {
                info!(title = %update.title, movie_id = found.id, "updating movie");
                let mut active: movie::ActiveModel = found.into();
                active.year = Set(update.year);
                active.data = Set(payload);
                active.update(&txn).await?
            },
            None => {
                info!(title = %update.title, "adding movie");
                let active = movie::ActiveModel {
                    id: Default::default(),
                    title: Set(update.title.clone()),
                    year: Set(update.year),
                    data: Set(payload),
                };
                active.insert(&txn).await?
            },
        };

        txn.commit().await?;

        Ok(record)
    }

    /// Converges `movie_cast` rows for this movie to exactly the name
    /// set of the update.
    pub async fn sync_cast(&self, record: &movie::Model, names: &[String]) -> WorkerResult<()> {
        let txn = self.db.begin().await?;

        let existing = movie_cast::Entity::find()
            .filter(movie_cast::Column::MovieId.eq(record.id))
            .all(&txn)
            .await?;

        let (stale, missing) = link_diff(existing.into_iter().map(|row| row.cast), names);

        debug!(
            movie_id = record.id,
            removed = stale.len(),
            added = missing.len(),
            "syncing cast links"
        );

        for name in stale {
            movie_cast::Entity::delete_many()
                .filter(movie_cast::Column::MovieId.eq(record.id))
                .filter(movie_cast::Column::Cast.eq(name.as_str()))
                .exec(&txn)
                .await?;
        }

        for name in missing {
            let link = movie_cast::ActiveModel { movie_id: Set(record.id), cast: Set(name) };
            movie_cast::Entity::insert(link).exec(&txn).await?;
        }

        txn.commit().await?;

        Ok(())
    }

    /// Converges `movie_genre` rows for this movie to exactly the name
    /// set of the update.
    pub async fn sync_genres(&self, record: &movie::Model, names: &[String]) -> WorkerResult<()> {
        let txn = self.db.begin().await?;

        let existing = movie_genre::Entity::find()
            .filter(movie_genre::Column::MovieId.eq(record.id))
            .all(&txn)
            .await?;

        let (stale, missing) = link_diff(existing.into_iter().map(|row| row.genre), names);

        debug!(
            movie_id = record.id,
            removed = stale.len(),
            added = missing.len(),
            "syncing genre links"
        );

        for name in stale {
            movie_genre::Entity::delete_many()
                .filter(movie_genre::Column::MovieId.eq(record.id))
                .filter(movie_genre::Column::Genre.eq(name.as_str()))
                .exec(&txn)
                .await?;
        }

        for name in missing {
            let link = movie_genre::ActiveModel { movie_id: Set(record.id), genre: Set(name) };
            movie_genre::Entity::insert(link).exec(&txn).await?;
        }

        txn.commit().await?;

        Ok(())
    }
}

/// Set-reconciles existing link names against an incoming name list.
/// Returns `(stale, missing)`: names to delete because they no longer
/// appear, and names to insert because they are not yet linked.
/// Duplicates in `incoming` collapse; output order is deterministic.
fn link_diff<I>(existing: I, incoming: &[String]) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut pending: BTreeSet<String> = incoming.iter().cloned().collect();
    let mut stale = Vec::new();

    for name in existing {
        if !pending.remove(&name) {
            stale.push(name);
        }
    }

    (stale, pending.into_iter().collect())
}
