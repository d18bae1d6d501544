use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    entities::{movie, movie_cast, movie_genre},
    error::{ApiError, ApiResult},
    models::{IndexResponse, MovieResponse, MoviesResponse},
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/movies", get(list_movies))
        .route("/movies/{id}", get(get_movie))
        .with_state(state)
}

async fn index() -> Json<IndexResponse> {
    Json(IndexResponse { movies_url: "/movies".to_string() })
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MovieResponse>> {
    let row = movie::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(MovieResponse::from_model(&row)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct MoviesQuery {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub cast: Option<String>,
    pub genre: Option<String>,
    pub start: Option<i32>,
    pub limit: Option<u64>,
}

async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<MoviesQuery>,
) -> ApiResult<Json<MoviesResponse>> {
    let limit = clamp_limit(params.limit);

    let mut query = movie::Entity::find().order_by_desc(movie::Column::Id);

    if let Some(title) = params.title.as_deref() {
        query = query.filter(movie::Column::Title.eq(title));
    }

    if let Some(year) = params.year {
        query = query.filter(movie::Column::Year.eq(year));
    }

    if let Some(start) = params.start {
        query = query.filter(movie::Column::Id.lt(start));
    }

    if let Some(cast) = params.cast.as_deref() {
        query = query.filter(
            movie::Column::Id.in_subquery(
                sea_query::Query::select()
                    .column(movie_cast::Column::MovieId)
                    .from(movie_cast::Entity)
                    .and_where(movie_cast::Column::Cast.eq(cast))
                    .to_owned(),
            ),
        );
    }

    if let Some(genre) = params.genre.as_deref() {
        query = query.filter(
            movie::Column::Id.in_subquery(
                sea_query::Query::select()
                    .column(movie_genre::Column::MovieId)
                    .from(movie_genre::Entity)
                    .and_where(movie_genre::Column::Genre.eq(genre))
                    .to_owned(),
            ),
        );
    }

    let rows = query.limit(limit).all(&state.db).await?;

    let movies = rows
        .iter()
        .map(MovieResponse::from_model)
        .collect::<Result<Vec<_>, _>>()?;

    let next_url = next_page_url(&params, &movies, limit);

    Ok(Json(MoviesResponse { movies, next_url }))
}

fn clamp_limit(requested: Option<u64>) -> u64 {
    requested.unwrap_or(25).clamp(1, 25)
}

/// Builds the cursor link for the next page: the caller's filters plus
/// `start` set to the smallest id on this page. A short page means the
/// traversal is complete.
fn next_page_url(params: &MoviesQuery, movies: &[MovieResponse], limit: u64) -> Option<String> {
    if (movies.len() as u64) < limit {
        return None;
    }

    let min_id = movies.iter().map(|m| m.id).min()?;

    let mut args: Vec<(&str, String)> = Vec::new();
    if let Some(title) = &params.title {
        args.push(("title", title.clone()));
    }
    if let Some(year) = params.year {
        args.push(("year", year.to_string()));
    }
    if let Some(cast) = &params.cast {
        args.push(("cast", cast.clone()));
    }
    if let Some(genre) = &params.genre {
        args.push(("genre", genre.clone()));
    }
    if let Some(limit) = params.limit {
        args.push(("limit", limit.to_string()));
    }
    args.push(("start", min_id.to_string()));

    let query = args
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    Some(format!("/movies?{query}"))
}
