use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use warbler_types::models::DEFAULT_IMAGE_URL;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            image_url   TEXT NOT NULL DEFAULT '{DEFAULT_IMAGE_URL}',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            text        TEXT NOT NULL,
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON messages(user_id, created_at);

        CREATE TABLE IF NOT EXISTS follows (
            user_being_followed_id  TEXT NOT NULL REFERENCES users(id),
            user_following_id       TEXT NOT NULL REFERENCES users(id),
            created_at              TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_being_followed_id, user_following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_follower
            ON follows(user_following_id);

        CREATE TABLE IF NOT EXISTS likes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            message_id  TEXT NOT NULL REFERENCES messages(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, message_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_message
            ON likes(message_id);
        ",
    ))?;

    info!("Database migrations complete");
    Ok(())
}
