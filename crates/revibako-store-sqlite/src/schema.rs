//! SQL schema and seed data for the Review Box SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id          TEXT PRIMARY KEY,
    provider_subject TEXT NOT NULL UNIQUE,  -- OAuth 'sub' claim
    email            TEXT NOT NULL,
    username         TEXT NOT NULL,
    display_handle   TEXT NOT NULL UNIQUE,
    avatar_url       TEXT,
    created_at       TEXT NOT NULL,         -- ISO 8601 UTC
    updated_at       TEXT NOT NULL,
    deleted_at       TEXT
);

-- Sessions store only the SHA-256 digest of the bearer token.
CREATE TABLE IF NOT EXISTS sessions (
    session_id   TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    token_digest TEXT NOT NULL UNIQUE,
    created_at   TEXT NOT NULL,
    expires_at   TEXT NOT NULL
);

-- Reference data; seeded below, never user-mutable.
CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    icon        TEXT NOT NULL,
    order_index INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS review_groups (
    group_id        TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    description     TEXT,
    category_id     TEXT NOT NULL REFERENCES categories(category_id),
    is_private      INTEGER NOT NULL DEFAULT 1,
    image_url       TEXT,
    metadata_fields TEXT NOT NULL DEFAULT '[]',  -- JSON field schema
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    deleted_at      TEXT
);

CREATE TABLE IF NOT EXISTS review_group_members (
    member_id  TEXT PRIMARY KEY,
    group_id   TEXT NOT NULL REFERENCES review_groups(group_id),
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    role       TEXT NOT NULL,   -- 'owner' | 'admin' | 'member'
    joined_at  TEXT NOT NULL,
    deleted_at TEXT
);

-- Criteria are written once at group creation and never updated.
CREATE TABLE IF NOT EXISTS evaluation_criteria (
    criterion_id TEXT PRIMARY KEY,
    group_id     TEXT NOT NULL REFERENCES review_groups(group_id),
    name         TEXT NOT NULL,
    order_index  INTEGER NOT NULL,
    deleted_at   TEXT
);

CREATE TABLE IF NOT EXISTS review_subjects (
    subject_id TEXT PRIMARY KEY,
    group_id   TEXT NOT NULL REFERENCES review_groups(group_id),
    name       TEXT NOT NULL,
    images     TEXT NOT NULL DEFAULT '[]',  -- JSON string list
    metadata   TEXT NOT NULL DEFAULT '{}',  -- JSON values keyed by field key
    created_by TEXT NOT NULL REFERENCES users(user_id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

-- One active review per (subject, user); enforced by query, not by a UNIQUE
-- constraint, so a user may review again after deleting their old review.
CREATE TABLE IF NOT EXISTS reviews (
    review_id   TEXT PRIMARY KEY,
    subject_id  TEXT NOT NULL REFERENCES review_subjects(subject_id),
    user_id     TEXT NOT NULL REFERENCES users(user_id),
    comment     TEXT,
    images      TEXT NOT NULL DEFAULT '[]',
    total_score REAL NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    deleted_at  TEXT
);

-- Hard-deleted with their review; no deleted_at column.
CREATE TABLE IF NOT EXISTS evaluation_scores (
    score_id     TEXT PRIMARY KEY,
    review_id    TEXT NOT NULL REFERENCES reviews(review_id),
    criterion_id TEXT NOT NULL REFERENCES evaluation_criteria(criterion_id),
    score        INTEGER NOT NULL CHECK (score BETWEEN 1 AND 5),
    UNIQUE (review_id, criterion_id)
);

CREATE TABLE IF NOT EXISTS invitations (
    invitation_id  TEXT PRIMARY KEY,
    group_id       TEXT NOT NULL REFERENCES review_groups(group_id),
    inviter_id     TEXT NOT NULL REFERENCES users(user_id),
    invited_handle TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'pending',
    created_at     TEXT NOT NULL,
    deleted_at     TEXT
);

CREATE INDEX IF NOT EXISTS members_group_idx   ON review_group_members(group_id);
CREATE INDEX IF NOT EXISTS members_user_idx    ON review_group_members(user_id);
CREATE INDEX IF NOT EXISTS criteria_group_idx  ON evaluation_criteria(group_id);
CREATE INDEX IF NOT EXISTS subjects_group_idx  ON review_subjects(group_id);
CREATE INDEX IF NOT EXISTS reviews_subject_idx ON reviews(subject_id);
CREATE INDEX IF NOT EXISTS scores_review_idx   ON evaluation_scores(review_id);
CREATE INDEX IF NOT EXISTS invites_group_idx   ON invitations(group_id);

PRAGMA user_version = 1;
";

/// Fixed category taxonomy: `(name, icon, order_index)`.
/// Inserted with fresh UUIDs only when the name is not present yet.
pub const SEED_CATEGORIES: &[(&str, &str, i64)] = &[
  ("Dramas", "🎬", 0),
  ("Movies", "🍿", 1),
  ("Anime", "✨", 2),
  ("Restaurants", "🍜", 3),
  ("Cafes", "☕", 4),
  ("Books", "📚", 5),
  ("Music", "🎵", 6),
  ("Games", "🎮", 7),
  ("Other", "📦", 8),
];
