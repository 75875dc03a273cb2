//! Database row types — these map directly to SQLite rows.
//! Distinct from the warbler-types domain models so the DB layer can evolve
//! its storage shape independently.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use warbler_types::models::{Message, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub user_id: String,
    pub author_username: String,
    pub like_count: i64,
    pub created_at: String,
}

pub struct LikeRow {
    pub id: String,
    pub user_id: String,
    pub message_id: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_model(self) -> User {
        User {
            id: parse_uuid(&self.id, "user id"),
            created_at: parse_timestamp(&self.created_at).unwrap_or_else(|| {
                warn!("Corrupt created_at '{}' on user '{}'", self.created_at, self.id);
                DateTime::default()
            }),
            username: self.username,
            email: self.email,
            image_url: self.image_url,
        }
    }
}

impl MessageRow {
    pub fn into_model(self) -> Message {
        Message {
            id: parse_uuid(&self.id, "message id"),
            user_id: parse_uuid(&self.user_id, "message user_id"),
            created_at: parse_timestamp(&self.created_at).unwrap_or_else(|| {
                warn!("Corrupt created_at '{}' on message '{}'", self.created_at, self.id);
                DateTime::default()
            }),
            text: self.text,
            author_username: self.author_username,
            like_count: self.like_count,
        }
    }
}

fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

/// SQLite's `datetime('now')` stores "YYYY-MM-DD HH:MM:SS" without a
/// timezone; accept that as naive UTC alongside RFC 3339.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().ok().or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .map(|ndt| ndt.and_utc())
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_timestamps_parse_as_utc() {
        let ts = parse_timestamp("2026-08-06 12:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-08-06T12:30:00+00:00");
    }

    #[test]
    fn rfc3339_timestamps_parse() {
        assert!(parse_timestamp("2026-08-06T12:30:00Z").is_some());
        assert!(parse_timestamp("not a timestamp").is_none());
    }
}
