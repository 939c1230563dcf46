use chrono::{DateTime, Utc};

use crate::codec::FieldValue;
use crate::error::CodecError;
use crate::schema::Table;

/// A typed row of one catalog table
///
/// `into_values` produces the table's column order, so a record can go
/// through the same batch path as raw string rows.
pub trait CatalogRecord: Sized {
    const TABLE: Table;

    fn into_values(self) -> Vec<FieldValue>;

    fn from_values(values: Vec<FieldValue>) -> Result<Self, CodecError>;
}

/// What a customer watched and where they paused
#[derive(Debug, Clone, PartialEq)]
pub struct WatchHistory {
    pub customer_id: i32,
    pub movie_id: i32,
    pub watched_at: DateTime<Utc>,
    /// Minutes into the movie, 0 when never paused
    pub pause_time: i32,
    pub movie_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRating {
    pub customer_id: i32,
    pub movie_id: i32,
    pub movie_name: String,
    pub customer_name: String,
    pub rating: f32,
}

/// A movie waiting in a customer's queue, ordered by when it was queued
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerQueue {
    pub customer_id: i32,
    pub queued_at: DateTime<Utc>,
    pub customer_name: String,
    pub movie_id: i32,
    pub movie_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieGenre {
    pub genre: String,
    pub release_year: i32,
    pub movie_id: i32,
    /// Running time in minutes
    pub duration: i32,
    pub movie_name: String,
}

fn timestamp(table: Table, millis: i64) -> Result<DateTime<Utc>, CodecError> {
    DateTime::from_timestamp_millis(millis).ok_or(CodecError::RecordShape(table))
}

fn exactly<const N: usize>(table: Table, values: Vec<FieldValue>) -> Result<[FieldValue; N], CodecError> {
    let actual = values.len();
    <[FieldValue; N]>::try_from(values).map_err(|_| {
        if actual == N {
            CodecError::RecordShape(table)
        } else {
            CodecError::FieldCount {
                expected: N,
                actual,
            }
        }
    })
}

impl CatalogRecord for WatchHistory {
    const TABLE: Table = Table::WatchHistory;

    fn into_values(self) -> Vec<FieldValue> {
        vec![
            FieldValue::Int(self.customer_id),
            FieldValue::Int(self.movie_id),
            FieldValue::Timestamp(self.watched_at.timestamp_millis()),
            FieldValue::Int(self.pause_time),
            FieldValue::Text(self.movie_name),
        ]
    }

    fn from_values(values: Vec<FieldValue>) -> Result<Self, CodecError> {
        match exactly::<5>(Self::TABLE, values)? {
            [
                FieldValue::Int(customer_id),
                FieldValue::Int(movie_id),
                FieldValue::Timestamp(watched_at),
                FieldValue::Int(pause_time),
                FieldValue::Text(movie_name),
            ] => Ok(Self {
                customer_id,
                movie_id,
                watched_at: timestamp(Self::TABLE, watched_at)?,
                pause_time,
                movie_name,
            }),
            _ => Err(CodecError::RecordShape(Self::TABLE)),
        }
    }
}

impl CatalogRecord for CustomerRating {
    const TABLE: Table = Table::CustomerRating;

    fn into_values(self) -> Vec<FieldValue> {
        vec![
            FieldValue::Int(self.customer_id),
            FieldValue::Int(self.movie_id),
            FieldValue::Text(self.movie_name),
            FieldValue::Text(self.customer_name),
            FieldValue::Float(self.rating),
        ]
    }

    fn from_values(values: Vec<FieldValue>) -> Result<Self, CodecError> {
        match exactly::<5>(Self::TABLE, values)? {
            [
                FieldValue::Int(customer_id),
                FieldValue::Int(movie_id),
                FieldValue::Text(movie_name),
                FieldValue::Text(customer_name),
                FieldValue::Float(rating),
            ] => Ok(Self {
                customer_id,
                movie_id,
                movie_name,
                customer_name,
                rating,
            }),
            _ => Err(CodecError::RecordShape(Self::TABLE)),
        }
    }
}

impl CatalogRecord for CustomerQueue {
    const TABLE: Table = Table::CustomerQueue;

    fn into_values(self) -> Vec<FieldValue> {
        vec![
            FieldValue::Int(self.customer_id),
            FieldValue::Timestamp(self.queued_at.timestamp_millis()),
            FieldValue::Text(self.customer_name),
            FieldValue::Int(self.movie_id),
            FieldValue::Text(self.movie_name),
        ]
    }

    fn from_values(values: Vec<FieldValue>) -> Result<Self, CodecError> {
        match exactly::<5>(Self::TABLE, values)? {
            [
                FieldValue::Int(customer_id),
                FieldValue::Timestamp(queued_at),
                FieldValue::Text(customer_name),
                FieldValue::Int(movie_id),
                FieldValue::Text(movie_name),
            ] => Ok(Self {
                customer_id,
                queued_at: timestamp(Self::TABLE, queued_at)?,
                customer_name,
                movie_id,
                movie_name,
            }),
            _ => Err(CodecError::RecordShape(Self::TABLE)),
        }
    }
}

impl CatalogRecord for MovieGenre {
    const TABLE: Table = Table::MoviesGenre;

    fn into_values(self) -> Vec<FieldValue> {
        vec![
            FieldValue::Text(self.genre),
            FieldValue::Int(self.release_year),
            FieldValue::Int(self.movie_id),
            FieldValue::Int(self.duration),
            FieldValue::Text(self.movie_name),
        ]
    }

    fn from_values(values: Vec<FieldValue>) -> Result<Self, CodecError> {
        match exactly::<5>(Self::TABLE, values)? {
            [
                FieldValue::Text(genre),
                FieldValue::Int(release_year),
                FieldValue::Int(movie_id),
                FieldValue::Int(duration),
                FieldValue::Text(movie_name),
            ] => Ok(Self {
                genre,
                release_year,
                movie_id,
                duration,
                movie_name,
            }),
            _ => Err(CodecError::RecordShape(Self::TABLE)),
        }
    }
}
