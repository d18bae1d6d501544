use serde::{Deserialize, Serialize};

use crate::{
    entities::movie,
    error::{WorkerError, WorkerResult},
};

/// One movie update as deposited in the document store. Field shape is
/// strict: unknown fields, missing fields, and wrong types all reject
/// the document.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MovieRecord {
    pub title: String,
    pub year: i32,
    pub cast: Vec<String>,
    pub genres: Vec<String>,
}

impl MovieRecord {
    /// Parses a raw document body. Syntax-level failures (not JSON at
    /// all) map to `Decode`; shape-level failures map to `Validation`.
    /// Callers treat both as unrecoverable.
    pub fn from_slice(bytes: &[u8]) -> WorkerResult<Self> {
        serde_json::from_slice(bytes).map_err(|err| match err.classify() {
            serde_json::error::Category::Data => WorkerError::Validation(err),
            _ => WorkerError::Decode(err),
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub movies_url: String,
}

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    pub id: i32,
    pub title: String,
    pub year: i32,
    pub cast: Vec<String>,
    pub genres: Vec<String>,
    pub self_url: String,
}

impl MovieResponse {
    /// Rehydrates the API shape from the stored payload column.
    pub fn from_model(row: &movie::Model) -> serde_json::Result<Self> {
        let record: MovieRecord = serde_json::from_str(&row.data)?;
        Ok(Self {
            id: row.id,
            title: record.title,
            year: record.year,
            cast: record.cast,
            genres: record.genres,
            self_url: format!("/movies/{}", row.id),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MoviesResponse {
    pub movies: Vec<MovieResponse>,
    pub next_url: Option<String>,
}
