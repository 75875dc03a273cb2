use crate::Database;
use crate::models::{LikeRow, MessageRow, UserRow};
use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

const USER_SELECT: &str = "SELECT id, username, email, password, image_url, created_at FROM users";

const MESSAGE_SELECT: &str = "SELECT m.id, m.text, m.user_id, u.username,
            (SELECT COUNT(*) FROM likes l WHERE l.message_id = m.id),
            m.created_at
     FROM messages m
     JOIN users u ON m.user_id = u.id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        image_url: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, image_url) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, username, email, password_hash, image_url),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{USER_SELECT} WHERE username = ?1"),
                    [username],
                    read_user,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{USER_SELECT} WHERE email = ?1"), [email], read_user)
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{USER_SELECT} WHERE id = ?1"), [id], read_user)
                .optional()?;
            Ok(row)
        })
    }

    /// All users, optionally filtered by a username substring.
    pub fn search_users(&self, q: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let rows = match q {
                Some(q) => {
                    let mut stmt = conn.prepare(&format!(
                        "{USER_SELECT} WHERE username LIKE '%' || ?1 || '%' ORDER BY username"
                    ))?;
                    let rows = stmt
                        .query_map([q], read_user)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!("{USER_SELECT} ORDER BY username"))?;
                    let rows = stmt
                        .query_map([], read_user)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    /// Remove an account and everything hanging off it: its likes, likes on
    /// its messages, its follow edges in both directions, and its messages.
    pub fn delete_user(&self, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM likes WHERE user_id = ?1", [user_id])?;
            tx.execute(
                "DELETE FROM likes WHERE message_id IN (SELECT id FROM messages WHERE user_id = ?1)",
                [user_id],
            )?;
            tx.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 OR user_following_id = ?1",
                [user_id],
            )?;
            tx.execute("DELETE FROM messages WHERE user_id = ?1", [user_id])?;
            tx.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(&self, id: &str, text: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, text, user_id) VALUES (?1, ?2, ?3)",
                (id, text, user_id),
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{MESSAGE_SELECT} WHERE m.id = ?1"), [id], read_message)
                .optional()?;
            Ok(row)
        })
    }

    /// Delete a message and any likes pointing at it.
    pub fn delete_message(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM likes WHERE message_id = ?1", [id])?;
            tx.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn messages_for_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT} WHERE m.user_id = ?1 ORDER BY m.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], read_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Home timeline: the most recent messages by this user and the users
    /// they follow, newest first.
    pub fn timeline(&self, user_id: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT}
                 WHERE m.user_id = ?1
                    OR m.user_id IN (SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1)
                 ORDER BY m.created_at DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], read_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Follows --

    /// Add a follow edge (follower starts following followed).
    /// Returns false when the edge already existed.
    pub fn follow(&self, followed_id: &str, follower_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (user_being_followed_id, user_following_id) VALUES (?1, ?2)",
                (followed_id, follower_id),
            )?;
            Ok(inserted > 0)
        })
    }

    /// Remove a follow edge. Returns false when there was none.
    pub fn unfollow(&self, followed_id: &str, follower_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                (followed_id, follower_id),
            )?;
            Ok(removed > 0)
        })
    }

    pub fn is_following(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let hit: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE user_following_id = ?1 AND user_being_followed_id = ?2",
                    (follower_id, followed_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(hit.is_some())
        })
    }

    /// Users this user follows.
    pub fn following(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.email, u.password, u.image_url, u.created_at
                 FROM users u
                 JOIN follows f ON f.user_being_followed_id = u.id
                 WHERE f.user_following_id = ?1
                 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([user_id], read_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users following this user.
    pub fn followers(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.email, u.password, u.image_url, u.created_at
                 FROM users u
                 JOIN follows f ON f.user_following_id = u.id
                 WHERE f.user_being_followed_id = ?1
                 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([user_id], read_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Likes --

    /// Toggle a like: removes it if present, inserts it if not.
    /// Returns true when the like was added, false when it was removed.
    pub fn toggle_like(&self, id: &str, user_id: &str, message_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM likes WHERE user_id = ?1 AND message_id = ?2",
                    (user_id, message_id),
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM likes WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO likes (id, user_id, message_id) VALUES (?1, ?2, ?3)",
                    (id, user_id, message_id),
                )?;
                Ok(true)
            }
        })
    }

    pub fn likes_for_message(&self, message_id: &str) -> Result<Vec<LikeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, message_id, created_at FROM likes WHERE message_id = ?1",
            )?;
            let rows = stmt
                .query_map([message_id], |row| {
                    Ok(LikeRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        message_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Messages this user has liked, most recently liked first.
    pub fn liked_messages(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.text, m.user_id, u.username,
                        (SELECT COUNT(*) FROM likes l2 WHERE l2.message_id = m.id),
                        m.created_at
                 FROM messages m
                 JOIN users u ON m.user_id = u.id
                 JOIN likes l ON l.message_id = m.id
                 WHERE l.user_id = ?1
                 ORDER BY l.created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], read_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// True when an insert failed on a UNIQUE constraint (username or email
/// already taken, racing signups).
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn read_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn read_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        user_id: row.get(2)?,
        author_username: row.get(3)?,
        like_count: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use warbler_types::models::DEFAULT_IMAGE_URL;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(
            &id,
            username,
            &format!("{username}@test.com"),
            "$argon2id$fake-hash",
            DEFAULT_IMAGE_URL,
        )
        .unwrap();
        id
    }

    fn add_message(db: &Database, text: &str, user_id: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_message(&id, text, user_id).unwrap();
        id
    }

    #[test]
    fn create_and_fetch_user() {
        let db = test_db();
        let id = add_user(&db, "testuser");

        let by_name = db.get_user_by_username("testuser").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.email, "testuser@test.com");
        assert_eq!(by_name.image_url, DEFAULT_IMAGE_URL);

        let by_email = db.get_user_by_email("testuser@test.com").unwrap().unwrap();
        assert_eq!(by_email.username, "testuser");

        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_a_unique_violation() {
        let db = test_db();
        add_user(&db, "testuser");

        let err = db
            .create_user(
                &Uuid::new_v4().to_string(),
                "testuser",
                "other@test.com",
                "$argon2id$fake-hash",
                DEFAULT_IMAGE_URL,
            )
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn message_belongs_to_its_author() {
        let db = test_db();
        let user = add_user(&db, "testuser");
        let id = add_message(&db, "testMessageModel", &user);

        let row = db.get_message(&id).unwrap().unwrap();
        assert_eq!(row.text, "testMessageModel");
        assert_eq!(row.user_id, user);
        assert_eq!(row.author_username, "testuser");
        assert_eq!(row.like_count, 0);
    }

    #[test]
    fn follow_edges_are_directed_and_unique() {
        let db = test_db();
        let a = add_user(&db, "user_a");
        let b = add_user(&db, "user_b");

        // a follows b
        assert!(db.follow(&b, &a).unwrap());
        // repeating the edge is a no-op
        assert!(!db.follow(&b, &a).unwrap());

        assert!(db.is_following(&a, &b).unwrap());
        assert!(!db.is_following(&b, &a).unwrap());

        let following = db.following(&a).unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].username, "user_b");
        assert!(db.following(&b).unwrap().is_empty());

        let followers = db.followers(&b).unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].username, "user_a");

        assert!(db.unfollow(&b, &a).unwrap());
        assert!(!db.unfollow(&b, &a).unwrap());
        assert!(!db.is_following(&a, &b).unwrap());
    }

    #[test]
    fn like_toggle_inserts_then_removes() {
        let db = test_db();
        let author = add_user(&db, "author");
        let liker = add_user(&db, "liker");
        let message = add_message(&db, "The earth is flat", &author);

        let added = db
            .toggle_like(&Uuid::new_v4().to_string(), &liker, &message)
            .unwrap();
        assert!(added);

        let likes = db.likes_for_message(&message).unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].user_id, liker);

        let added = db
            .toggle_like(&Uuid::new_v4().to_string(), &liker, &message)
            .unwrap();
        assert!(!added);
        assert!(db.likes_for_message(&message).unwrap().is_empty());
    }

    #[test]
    fn liked_messages_lists_what_the_user_liked() {
        let db = test_db();
        let author = add_user(&db, "author");
        let liker = add_user(&db, "liker");
        let m1 = add_message(&db, "tweet1", &author);
        let _m2 = add_message(&db, "tweet2", &author);

        db.toggle_like(&Uuid::new_v4().to_string(), &liker, &m1).unwrap();

        let liked = db.liked_messages(&liker).unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].text, "tweet1");
        assert_eq!(liked[0].like_count, 1);
        assert!(db.liked_messages(&author).unwrap().is_empty());
    }

    #[test]
    fn timeline_covers_self_and_followed_users_only() {
        let db = test_db();
        let me = add_user(&db, "me");
        let followed = add_user(&db, "followed");
        let stranger = add_user(&db, "stranger");

        db.follow(&followed, &me).unwrap();
        add_message(&db, "mine", &me);
        add_message(&db, "theirs", &followed);
        add_message(&db, "noise", &stranger);

        let rows = db.timeline(&me, 100).unwrap();
        let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(rows.len(), 2);
        assert!(texts.contains(&"mine"));
        assert!(texts.contains(&"theirs"));
    }

    #[test]
    fn delete_user_cascades() {
        let db = test_db();
        let doomed = add_user(&db, "doomed");
        let other = add_user(&db, "other");

        let doomed_msg = add_message(&db, "going away", &doomed);
        let other_msg = add_message(&db, "staying", &other);

        db.follow(&other, &doomed).unwrap();
        db.follow(&doomed, &other).unwrap();
        db.toggle_like(&Uuid::new_v4().to_string(), &doomed, &other_msg).unwrap();
        db.toggle_like(&Uuid::new_v4().to_string(), &other, &doomed_msg).unwrap();

        db.delete_user(&doomed).unwrap();

        assert!(db.get_user_by_username("doomed").unwrap().is_none());
        assert!(db.get_message(&doomed_msg).unwrap().is_none());
        assert!(db.likes_for_message(&other_msg).unwrap().is_empty());
        assert!(db.followers(&other).unwrap().is_empty());
        assert!(db.following(&other).unwrap().is_empty());

        // untouched rows survive
        assert!(db.get_user_by_username("other").unwrap().is_some());
        assert!(db.get_message(&other_msg).unwrap().is_some());
    }

    #[test]
    fn delete_message_removes_its_likes() {
        let db = test_db();
        let author = add_user(&db, "author");
        let liker = add_user(&db, "liker");
        let message = add_message(&db, "soon gone", &author);
        db.toggle_like(&Uuid::new_v4().to_string(), &liker, &message).unwrap();

        db.delete_message(&message).unwrap();

        assert!(db.get_message(&message).unwrap().is_none());
        assert!(db.likes_for_message(&message).unwrap().is_empty());
    }

    #[test]
    fn search_users_filters_by_substring() {
        let db = test_db();
        add_user(&db, "alpha");
        add_user(&db, "alphabet");
        add_user(&db, "beta");

        assert_eq!(db.search_users(None).unwrap().len(), 3);
        assert_eq!(db.search_users(Some("alpha")).unwrap().len(), 2);
        assert_eq!(db.search_users(Some("bet")).unwrap().len(), 2);
        assert!(db.search_users(Some("zzz")).unwrap().is_empty());
    }
}
