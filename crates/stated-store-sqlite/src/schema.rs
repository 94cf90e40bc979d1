//! SQL schema for the stated SQLite store.
//!
//! Executed once by [`crate::SqliteStore::migrate`]. Future migrations will be
//! gated on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Statements are immutable apart from the derived-entity bookkeeping and
-- the superseding and referenced columns. The UNIQUE hash is the network-wide
-- deduplication point.
CREATE TABLE IF NOT EXISTS statements (
    id                          INTEGER PRIMARY KEY AUTOINCREMENT,
    hash                        TEXT NOT NULL UNIQUE,
    content_hash                TEXT NOT NULL,
    statement                   TEXT NOT NULL,
    domain                      TEXT NOT NULL,
    author                      TEXT NOT NULL,
    proclaimed_publication_time TEXT NOT NULL,
    tags                        TEXT NOT NULL DEFAULT '[]',
    type                        TEXT NOT NULL,
    content                     TEXT NOT NULL,
    verification_method         TEXT NOT NULL,   -- 'dns' | 'api'
    source_node_id              INTEGER,
    first_verification_time     TEXT NOT NULL,
    superseded_statement        TEXT,
    superseding_statement       TEXT,
    derived_entity_created      INTEGER NOT NULL DEFAULT 0,
    derived_entity_retry_count  INTEGER NOT NULL DEFAULT 0,
    hidden                      INTEGER NOT NULL DEFAULT 0,
    referenced_statement        TEXT             -- responses and disputes
);

CREATE TABLE IF NOT EXISTS unverified_statements (
    hash                       TEXT PRIMARY KEY,
    statement                  TEXT NOT NULL,
    source_node_id             INTEGER,
    source_verification_method TEXT,
    received_time              TEXT NOT NULL,
    verification_retry_count   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS nodes (
    id                         INTEGER PRIMARY KEY AUTOINCREMENT,
    domain                     TEXT NOT NULL UNIQUE,
    ip                         TEXT,
    first_seen                 TEXT NOT NULL,
    last_seen                  TEXT NOT NULL,
    reputation                 REAL,
    last_received_statement_id INTEGER,
    certificate_authority      TEXT,
    fingerprint                TEXT
);

CREATE TABLE IF NOT EXISTS organisation_verifications (
    statement_hash    TEXT PRIMARY KEY REFERENCES statements(hash),
    verifier_domain   TEXT NOT NULL,
    verified_domain   TEXT,
    foreign_domain    TEXT,
    name              TEXT NOT NULL,
    legal_entity_type TEXT NOT NULL,
    country           TEXT NOT NULL,
    province          TEXT,
    city              TEXT,
    serial_number     TEXT,
    department        TEXT,
    confidence        REAL
);

CREATE TABLE IF NOT EXISTS person_verifications (
    statement_hash  TEXT PRIMARY KEY REFERENCES statements(hash),
    verifier_domain TEXT NOT NULL,
    verified_domain TEXT,
    foreign_domain  TEXT,
    name            TEXT NOT NULL,
    birth_country   TEXT NOT NULL,
    birth_city      TEXT NOT NULL,
    birth_date      TEXT NOT NULL,   -- YYYY-MM-DD
    job_title       TEXT,
    employer        TEXT,
    confidence      REAL
);

CREATE TABLE IF NOT EXISTS polls (
    statement_hash             TEXT PRIMARY KEY REFERENCES statements(hash),
    domain                     TEXT NOT NULL,
    question                   TEXT NOT NULL,
    deadline                   TEXT NOT NULL,
    options                    TEXT NOT NULL DEFAULT '[]',
    allow_arbitrary_vote       INTEGER,
    participants_entity_type   TEXT,
    participants_country       TEXT,
    participants_city          TEXT,
    required_property          TEXT,
    required_property_value    TEXT,
    required_property_observer TEXT
);

-- poll_hash is not a foreign key: votes may arrive before their poll.
CREATE TABLE IF NOT EXISTS votes (
    statement_hash              TEXT PRIMARY KEY REFERENCES statements(hash),
    poll_hash                   TEXT NOT NULL,
    option                      TEXT NOT NULL,
    domain                      TEXT NOT NULL,
    author                      TEXT NOT NULL,
    proclaimed_publication_time TEXT NOT NULL,
    qualified                   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS ratings (
    statement_hash              TEXT PRIMARY KEY REFERENCES statements(hash),
    domain                      TEXT NOT NULL,
    author                      TEXT NOT NULL,
    subject_name                TEXT NOT NULL,
    subject_type                TEXT,
    subject_reference           TEXT,
    document_file_hash          TEXT,
    quality                     TEXT,
    rating                      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    comment                     TEXT,
    proclaimed_publication_time TEXT NOT NULL,
    qualified                   INTEGER NOT NULL DEFAULT 0
);

-- Append-only.
CREATE TABLE IF NOT EXISTS verification_log (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    statement_hash TEXT NOT NULL REFERENCES statements(hash),
    t              TEXT NOT NULL,
    api            INTEGER NOT NULL,
    dns            INTEGER NOT NULL,
    txt            INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS statements_content_hash_idx ON statements(content_hash);
CREATE INDEX IF NOT EXISTS statements_domain_idx       ON statements(domain);
CREATE INDEX IF NOT EXISTS statements_type_idx         ON statements(type);
CREATE INDEX IF NOT EXISTS statements_superseded_idx   ON statements(superseded_statement);
CREATE INDEX IF NOT EXISTS statements_referenced_idx   ON statements(referenced_statement);
CREATE INDEX IF NOT EXISTS org_verified_domain_idx     ON organisation_verifications(verified_domain);
CREATE INDEX IF NOT EXISTS org_foreign_domain_idx      ON organisation_verifications(foreign_domain);
CREATE INDEX IF NOT EXISTS votes_poll_idx              ON votes(poll_hash);
CREATE INDEX IF NOT EXISTS verification_log_hash_idx   ON verification_log(statement_hash);

PRAGMA user_version = 1;
";
