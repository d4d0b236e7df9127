use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run the full Postgres schema migration inline.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Accounts (app authentication)
CREATE TABLE IF NOT EXISTS accounts (
    id            BIGSERIAL PRIMARY KEY,
    email         TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_accounts_email_lower
    ON accounts (LOWER(email));

-- Puzzles with their solution forest and required ticks
CREATE TABLE IF NOT EXISTS puzzles (
    id           TEXT PRIMARY KEY,
    difficulty   TEXT NOT NULL,
    fen          TEXT NOT NULL,
    side_to_move TEXT NOT NULL,
    solution     JSONB NOT NULL DEFAULT '{"lines": []}'::jsonb,
    ticks        JSONB NOT NULL DEFAULT '[]'::jsonb,
    solution_text TEXT,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

ALTER TABLE puzzles ADD COLUMN IF NOT EXISTS solution_text TEXT;

CREATE INDEX IF NOT EXISTS idx_puzzles_difficulty ON puzzles (difficulty, id);

-- Per-user puzzle progress (one row per user and puzzle)
CREATE TABLE IF NOT EXISTS progress (
    id         BIGSERIAL PRIMARY KEY,
    user_id    BIGINT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    puzzle_id  TEXT NOT NULL REFERENCES puzzles(id) ON DELETE CASCADE,
    attempts   INTEGER NOT NULL DEFAULT 1,
    score      INTEGER NOT NULL DEFAULT 0,
    solved_at  TIMESTAMPTZ,
    last_typed JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE(user_id, puzzle_id)
);

CREATE INDEX IF NOT EXISTS idx_progress_user_updated
    ON progress (user_id, updated_at DESC);

-- Puzzle sets
CREATE TABLE IF NOT EXISTS sets (
    id             BIGSERIAL PRIMARY KEY,
    user_id        BIGINT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    name           TEXT NOT NULL,
    description    TEXT NOT NULL DEFAULT '',
    difficulty_min TEXT NOT NULL DEFAULT '',
    difficulty_max TEXT NOT NULL DEFAULT '',
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_sets_user_id ON sets (user_id);

CREATE TABLE IF NOT EXISTS set_puzzles (
    set_id    BIGINT NOT NULL REFERENCES sets(id) ON DELETE CASCADE,
    puzzle_id TEXT NOT NULL REFERENCES puzzles(id) ON DELETE CASCADE,
    position  INTEGER NOT NULL,
    PRIMARY KEY (set_id, puzzle_id)
);

CREATE INDEX IF NOT EXISTS idx_set_puzzles_position ON set_puzzles (set_id, position);

-- Woodpecker cycles over a set
CREATE TABLE IF NOT EXISTS cycles (
    id          BIGSERIAL PRIMARY KEY,
    set_id      BIGINT NOT NULL REFERENCES sets(id) ON DELETE CASCADE,
    cycle_index INTEGER NOT NULL,
    target_days INTEGER NOT NULL,
    started_at  TIMESTAMPTZ,
    ended_at    TIMESTAMPTZ,
    status      TEXT NOT NULL DEFAULT 'planned'
        CHECK (status IN ('planned', 'active', 'rest', 'done'))
);

CREATE INDEX IF NOT EXISTS idx_cycles_set_status ON cycles (set_id, status);

-- Daily sessions within a cycle
CREATE TABLE IF NOT EXISTS sessions (
    id           BIGSERIAL PRIMARY KEY,
    cycle_id     BIGINT NOT NULL REFERENCES cycles(id) ON DELETE CASCADE,
    started_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    ended_at     TIMESTAMPTZ,
    target_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_cycle_open
    ON sessions (cycle_id) WHERE ended_at IS NULL;

-- Graded attempts recorded inside a session
CREATE TABLE IF NOT EXISTS attempts (
    id                 BIGSERIAL PRIMARY KEY,
    session_id         BIGINT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    puzzle_id          TEXT NOT NULL REFERENCES puzzles(id) ON DELETE CASCADE,
    started_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    ended_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    score_first_move   INTEGER NOT NULL DEFAULT 0,
    score_ticks        INTEGER NOT NULL DEFAULT 0,
    total_points       INTEGER NOT NULL DEFAULT 0,
    time_ms            INTEGER NOT NULL DEFAULT 0,
    correct_first_move BOOLEAN NOT NULL DEFAULT FALSE,
    solved             BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE INDEX IF NOT EXISTS idx_attempts_session ON attempts (session_id);

-- One active daily plan per user
CREATE TABLE IF NOT EXISTS daily_plans (
    id           BIGSERIAL PRIMARY KEY,
    user_id      BIGINT NOT NULL UNIQUE REFERENCES accounts(id) ON DELETE CASCADE,
    today_batch  JSONB NOT NULL DEFAULT '[]'::jsonb,
    per_day      INTEGER NOT NULL DEFAULT 0,
    active       BOOLEAN NOT NULL DEFAULT TRUE,
    generated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;
