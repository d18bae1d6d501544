#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use moviesync::{
    db,
    entities::{movie, movie_cast, movie_genre},
    error::{WorkerError, WorkerResult},
    models::MovieRecord,
    store::ObjectStore,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

pub async fn setup_db() -> DatabaseConnection {
    db::connect_and_migrate("sqlite::memory:")
        .await
        .expect("in-memory database")
}

pub fn record(title: &str, year: i32, cast: &[&str], genres: &[&str]) -> MovieRecord {
    MovieRecord {
        title: title.to_string(),
        year,
        cast: cast.iter().map(|s| s.to_string()).collect(),
        genres: genres.iter().map(|s| s.to_string()).collect(),
    }
}

pub async fn movie_rows(db: &DatabaseConnection) -> Vec<movie::Model> {
    movie::Entity::find().all(db).await.expect("movie rows")
}

pub async fn cast_names(db: &DatabaseConnection, movie_id: i32) -> Vec<String> {
    let mut names: Vec<String> = movie_cast::Entity::find()
        .filter(movie_cast::Column::MovieId.eq(movie_id))
        .all(db)
        .await
        .expect("cast rows")
        .into_iter()
        .map(|row| row.cast)
        .collect();
    names.sort();
    names
}

pub async fn genre_names(db: &DatabaseConnection, movie_id: i32) -> Vec<String> {
    let mut names: Vec<String> = movie_genre::Entity::find()
        .filter(movie_genre::Column::MovieId.eq(movie_id))
        .all(db)
        .await
        .expect("genre rows")
        .into_iter()
        .map(|row| row.genre)
        .collect();
    names.sort();
    names
}

/// In-memory stand-in for the bucket, listing keys in lexicographic
/// order like S3 does.
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .expect("store lock")
            .insert(key.to_string(), body.to_vec());
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().expect("store lock").keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().expect("store lock").len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().expect("store lock").contains_key(key)
    }
}

impl ObjectStore for MemoryStore {
    async fn list(&self, limit: usize) -> WorkerResult<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .expect("store lock")
            .keys()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch(&self, key: &str) -> WorkerResult<Vec<u8>> {
        self.objects
            .lock()
            .expect("store lock")
            .get(key)
            .cloned()
            .ok_or_else(|| WorkerError::Store("object not found".into()))
    }

    async fn delete(&self, key: &str) -> WorkerResult<()> {
        self.objects.lock().expect("store lock").remove(key);
        Ok(())
    }
}

/// Store whose every operation fails, for exercising transient-outage
/// paths.
#[derive(Clone, Default)]
pub struct OfflineStore;

impl ObjectStore for OfflineStore {
    async fn list(&self, _limit: usize) -> WorkerResult<Vec<String>> {
        Err(WorkerError::Store("store offline".into()))
    }

    async fn fetch(&self, _key: &str) -> WorkerResult<Vec<u8>> {
        Err(WorkerError::Store("store offline".into()))
    }

    async fn delete(&self, _key: &str) -> WorkerResult<()> {
        Err(WorkerError::Store("store offline".into()))
    }
}
