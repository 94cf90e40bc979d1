//! [`SqliteStore`], the SQLite implementation of [`StatementStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use stated_core::{
  entity::{
    ObservationQuery, OrganisationVerification, PersonVerification, Poll, Rating,
    RatingFilter, Vote, VoteFilter,
  },
  node::{Node, NodeUpdate},
  readiness::Readiness,
  statement::{
    NewStatement, NewUnverifiedStatement, Statement, StatementQuery, StatementUpdate,
    UnverifiedStatement,
  },
  store::StatementStore,
  verification_log::{LogCandidate, VerificationLogEntry},
};

use crate::{
  encode::{
    encode_date, encode_dt, encode_list, read_node, read_person, read_poll, read_rating,
    read_statement, read_vote, RawLogCandidate, RawLogEntry, RawNode,
    RawPersonVerification, RawPoll, RawRating, RawStatement, RawUnverified, RawVote,
    NODE_COLUMNS, PERSON_COLUMNS, POLL_COLUMNS, RATING_COLUMNS, STATEMENT_COLUMNS,
    VOTE_COLUMNS,
  },
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A stated store backed by a single SQLite file.
///
/// Every operation fails with `NotReady` until [`SqliteStore::migrate`] has
/// completed. Cloning is cheap; clones share the connection and readiness.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  ready: Readiness,
}

impl SqliteStore {
  /// Connect to the database at `path` without migrating it.
  pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Ok(Self { conn, ready: Readiness::new() })
  }

  /// Connect to a fresh in-memory database without migrating it.
  pub async fn connect_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Ok(Self { conn, ready: Readiness::new() })
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let store = Self::connect(path).await?;
    store.migrate().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let store = Self::connect_in_memory().await?;
    store.migrate().await?;
    Ok(store)
  }

  /// Apply the schema and signal readiness to all clones.
  pub async fn migrate(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    self.ready.mark_ready();
    tracing::info!("store schema migrated");
    Ok(())
  }

  pub fn readiness(&self) -> &Readiness { &self.ready }

  fn ensure_ready(&self) -> Result<()> { Ok(self.ready.check()?) }

  async fn query_statements(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Statement>> {
    let raws: Vec<RawStatement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), read_statement)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStatement::into_statement).collect()
  }
}

fn opt_text(value: Option<String>) -> rusqlite::types::Value {
  value.map_or(rusqlite::types::Value::Null, rusqlite::types::Value::Text)
}

// ─── StatementStore impl ─────────────────────────────────────────────────────

impl StatementStore for SqliteStore {
  type Error = crate::Error;

  // ── Statements ────────────────────────────────────────────────────────────

  async fn statement_exists(&self, hash: &str) -> Result<bool> {
    self.ensure_ready()?;
    let hash = hash.to_owned();

    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM statements WHERE hash = ?1",
              rusqlite::params![hash],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn create_statement(&self, input: NewStatement) -> Result<Option<Statement>> {
    self.ensure_ready()?;

    let derived_created = input.derived_entity_created();
    let published_str = encode_dt(input.proclaimed_publication_time);
    let verified_str = encode_dt(Utc::now());
    let tags_str = encode_list(&input.tags)?;
    let type_str = input.statement_type.as_ref().to_owned();
    let method_str = input.verification_method.as_ref().to_owned();

    let raw: Option<RawStatement> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let inserted = tx.execute(
          "INSERT INTO statements (
             hash, content_hash, statement, domain, author,
             proclaimed_publication_time, tags, type, content,
             verification_method, source_node_id, first_verification_time,
             superseded_statement, derived_entity_created, hidden
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
           ON CONFLICT(hash) DO NOTHING",
          rusqlite::params![
            input.hash,
            input.content_hash,
            input.statement,
            input.domain,
            input.author,
            published_str,
            tags_str,
            type_str,
            input.content,
            method_str,
            input.source_node_id,
            verified_str,
            input.superseded_statement,
            derived_created,
            input.hidden,
          ],
        )?;

        if inserted == 0 {
          return Ok(None);
        }

        // Both directions: the statement this one replaces, and any earlier
        // arrival that already claimed to replace this one.
        if let Some(old) = &input.superseded_statement {
          tx.execute(
            "UPDATE statements SET superseding_statement = ?1
             WHERE hash = ?2 AND superseding_statement IS NULL",
            rusqlite::params![input.hash, old],
          )?;
        }
        tx.execute(
          "UPDATE statements SET superseding_statement = (
             SELECT hash FROM statements WHERE superseded_statement = ?1
             ORDER BY id LIMIT 1
           ) WHERE hash = ?1",
          rusqlite::params![input.hash],
        )?;

        let raw = tx.query_row(
          &format!("SELECT {STATEMENT_COLUMNS} FROM statements s WHERE s.hash = ?1"),
          rusqlite::params![input.hash],
          read_statement,
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawStatement::into_statement).transpose()
  }

  async fn get_statement(&self, hash: &str) -> Result<Option<Statement>> {
    self.ensure_ready()?;
    let hash = hash.to_owned();

    let raw: Option<RawStatement> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STATEMENT_COLUMNS} FROM statements s WHERE s.hash = ?1"),
              rusqlite::params![hash],
              read_statement,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStatement::into_statement).transpose()
  }

  async fn get_statements(&self, query: &StatementQuery) -> Result<Vec<Statement>> {
    self.ensure_ready()?;
    use rusqlite::types::Value;

    let sql = format!(
      "SELECT {STATEMENT_COLUMNS} FROM statements s
       WHERE s.id > ?1
         AND (?2 IS NULL OR lower(s.domain) = lower(?2))
         AND (?3 = 1 OR s.hidden = 0)
       ORDER BY s.id
       LIMIT ?4"
    );
    let params = vec![
      Value::Integer(query.min_id.unwrap_or(0)),
      opt_text(query.domain.clone()),
      Value::Integer(i64::from(query.include_hidden)),
      Value::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)),
    ];

    self.query_statements(sql, params).await
  }

  async fn get_statements_missing_derived_entity(
    &self,
    limit: usize,
    max_retries: u32,
  ) -> Result<Vec<Statement>> {
    self.ensure_ready()?;
    use rusqlite::types::Value;

    // Exhausted rows are filtered before the LIMIT so they cannot fill the page.
    let sql = format!(
      "SELECT {STATEMENT_COLUMNS} FROM statements s
       WHERE s.derived_entity_created = 0
         AND s.type <> 'statement'
         AND s.derived_entity_retry_count < ?2
       ORDER BY s.id
       LIMIT ?1"
    );
    let params = vec![
      Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)),
      Value::Integer(i64::from(max_retries)),
    ];

    self.query_statements(sql, params).await
  }

  async fn update_statement(&self, update: StatementUpdate) -> Result<bool> {
    self.ensure_ready()?;
    let increment = i64::from(update.increment_retry_count);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE statements SET
             derived_entity_created     = COALESCE(?2, derived_entity_created),
             derived_entity_retry_count = derived_entity_retry_count + ?3,
             referenced_statement       = COALESCE(?4, referenced_statement)
           WHERE hash = ?1",
          rusqlite::params![
            update.hash,
            update.derived_entity_created,
            increment,
            update.referenced_statement,
          ],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Unverified statements ─────────────────────────────────────────────────

  async fn create_unverified_statement(
    &self,
    input: NewUnverifiedStatement,
  ) -> Result<Option<UnverifiedStatement>> {
    self.ensure_ready()?;

    let received_time = Utc::now();
    let received_str = encode_dt(received_time);
    let method_str = input.source_verification_method.map(|m| m.as_ref().to_owned());
    let (hash, statement) = (input.hash.clone(), input.statement.clone());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO unverified_statements (
             hash, statement, source_node_id, source_verification_method, received_time
           ) VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(hash) DO NOTHING",
          rusqlite::params![hash, statement, input.source_node_id, method_str, received_str],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Ok(None);
    }

    Ok(Some(UnverifiedStatement {
      hash: input.hash,
      statement: input.statement,
      source_node_id: input.source_node_id,
      source_verification_method: input.source_verification_method,
      received_time,
      verification_retry_count: 0,
    }))
  }

  async fn update_unverified_statement(
    &self,
    hash: &str,
    increment_retry_count: bool,
  ) -> Result<bool> {
    self.ensure_ready()?;
    let hash = hash.to_owned();
    let increment = i64::from(increment_retry_count);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE unverified_statements
           SET verification_retry_count = verification_retry_count + ?2
           WHERE hash = ?1",
          rusqlite::params![hash, increment],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn get_unverified_statements(&self) -> Result<Vec<UnverifiedStatement>> {
    self.ensure_ready()?;

    let raws: Vec<RawUnverified> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT hash, statement, source_node_id, source_verification_method,
                  received_time, verification_retry_count
           FROM unverified_statements
           ORDER BY received_time",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawUnverified {
              hash:                       row.get(0)?,
              statement:                  row.get(1)?,
              source_node_id:             row.get(2)?,
              source_verification_method: row.get(3)?,
              received_time:              row.get(4)?,
              verification_retry_count:   row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUnverified::into_unverified).collect()
  }

  async fn delete_expired_unverified_statements(
    &self,
    max_age_hours: f64,
    max_retries: u32,
  ) -> Result<usize> {
    self.ensure_ready()?;
    let max_age = chrono::Duration::milliseconds((max_age_hours * 3_600_000.0) as i64);
    let cutoff_str = encode_dt(Utc::now() - max_age);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM unverified_statements
           WHERE received_time < ?1
              OR verification_retry_count > ?2
              OR hash IN (SELECT hash FROM statements)",
          rusqlite::params![cutoff_str, max_retries],
        )?)
      })
      .await?;
    Ok(deleted)
  }

  // ── Derived entities ──────────────────────────────────────────────────────

  async fn delete_superseded_derived_entities(&self) -> Result<usize> {
    self.ensure_ready()?;

    let deleted = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let mut deleted = 0;
        for table in ["organisation_verifications", "person_verifications", "votes", "ratings"] {
          deleted += tx.execute(
            &format!(
              "DELETE FROM {table} WHERE statement_hash IN (
                 SELECT hash FROM statements WHERE superseding_statement IS NOT NULL
               )"
            ),
            [],
          )?;
        }
        tx.commit()?;
        Ok(deleted)
      })
      .await?;
    Ok(deleted)
  }

  async fn create_organisation_verification(
    &self,
    row: OrganisationVerification,
  ) -> Result<bool> {
    self.ensure_ready()?;

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO organisation_verifications (
             statement_hash, verifier_domain, verified_domain, foreign_domain, name,
             legal_entity_type, country, province, city, serial_number, department,
             confidence
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
           ON CONFLICT(statement_hash) DO NOTHING",
          rusqlite::params![
            row.statement_hash,
            row.verifier_domain,
            row.verified_domain,
            row.foreign_domain,
            row.name,
            row.legal_entity_type,
            row.country,
            row.province,
            row.city,
            row.serial_number,
            row.department,
            row.confidence,
          ],
        )?)
      })
      .await?;
    Ok(inserted > 0)
  }

  async fn create_person_verification(&self, row: PersonVerification) -> Result<bool> {
    self.ensure_ready()?;
    let birth_date_str = encode_date(row.birth_date);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO person_verifications (
             statement_hash, verifier_domain, verified_domain, foreign_domain, name,
             birth_country, birth_city, birth_date, job_title, employer, confidence
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
           ON CONFLICT(statement_hash) DO NOTHING",
          rusqlite::params![
            row.statement_hash,
            row.verifier_domain,
            row.verified_domain,
            row.foreign_domain,
            row.name,
            row.birth_country,
            row.birth_city,
            birth_date_str,
            row.job_title,
            row.employer,
            row.confidence,
          ],
        )?)
      })
      .await?;
    Ok(inserted > 0)
  }

  async fn create_poll(&self, row: Poll) -> Result<bool> {
    self.ensure_ready()?;
    let deadline_str = encode_dt(row.deadline);
    let options_str = encode_list(&row.options)?;

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO polls (
             statement_hash, domain, question, deadline, options, allow_arbitrary_vote,
             participants_entity_type, participants_country, participants_city,
             required_property, required_property_value, required_property_observer
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
           ON CONFLICT(statement_hash) DO NOTHING",
          rusqlite::params![
            row.statement_hash,
            row.domain,
            row.question,
            deadline_str,
            options_str,
            row.allow_arbitrary_vote,
            row.participants_entity_type,
            row.participants_country,
            row.participants_city,
            row.required_property,
            row.required_property_value,
            row.required_property_observer,
          ],
        )?)
      })
      .await?;
    Ok(inserted > 0)
  }

  async fn create_vote(&self, row: Vote) -> Result<bool> {
    self.ensure_ready()?;
    let published_str = encode_dt(row.proclaimed_publication_time);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO votes (
             statement_hash, poll_hash, option, domain, author,
             proclaimed_publication_time, qualified
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(statement_hash) DO NOTHING",
          rusqlite::params![
            row.statement_hash,
            row.poll_hash,
            row.option,
            row.domain,
            row.author,
            published_str,
            row.qualified,
          ],
        )?)
      })
      .await?;
    Ok(inserted > 0)
  }

  async fn update_vote(&self, statement_hash: &str, qualified: bool) -> Result<bool> {
    self.ensure_ready()?;
    let hash = statement_hash.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE votes SET qualified = ?2 WHERE statement_hash = ?1",
          rusqlite::params![hash, qualified],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn create_rating(&self, row: Rating) -> Result<bool> {
    self.ensure_ready()?;
    let published_str = encode_dt(row.proclaimed_publication_time);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO ratings (
             statement_hash, domain, author, subject_name, subject_type,
             subject_reference, document_file_hash, quality, rating, comment,
             proclaimed_publication_time, qualified
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
           ON CONFLICT(statement_hash) DO NOTHING",
          rusqlite::params![
            row.statement_hash,
            row.domain,
            row.author,
            row.subject_name,
            row.subject_type,
            row.subject_reference,
            row.document_file_hash,
            row.quality,
            row.rating,
            row.comment,
            published_str,
            row.qualified,
          ],
        )?)
      })
      .await?;
    Ok(inserted > 0)
  }

  async fn update_rating(&self, statement_hash: &str, qualified: bool) -> Result<bool> {
    self.ensure_ready()?;
    let hash = statement_hash.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE ratings SET qualified = ?2 WHERE statement_hash = ?1",
          rusqlite::params![hash, qualified],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn get_poll(&self, statement_hash: &str) -> Result<Option<Poll>> {
    self.ensure_ready()?;
    let hash = statement_hash.to_owned();

    let raw: Option<RawPoll> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {POLL_COLUMNS} FROM polls WHERE statement_hash = ?1"),
              rusqlite::params![hash],
              read_poll,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPoll::into_poll).transpose()
  }

  async fn get_vote(&self, statement_hash: &str) -> Result<Option<Vote>> {
    self.ensure_ready()?;
    let hash = statement_hash.to_owned();

    let raw: Option<RawVote> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {VOTE_COLUMNS} FROM votes WHERE statement_hash = ?1"),
              rusqlite::params![hash],
              read_vote,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVote::into_vote).transpose()
  }

  async fn get_rating(&self, statement_hash: &str) -> Result<Option<Rating>> {
    self.ensure_ready()?;
    let hash = statement_hash.to_owned();

    let raw: Option<RawRating> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RATING_COLUMNS} FROM ratings WHERE statement_hash = ?1"),
              rusqlite::params![hash],
              read_rating,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRating::into_rating).transpose()
  }

  async fn get_verifications_for_domain(
    &self,
    domain: &str,
  ) -> Result<Vec<OrganisationVerification>> {
    self.ensure_ready()?;
    let domain = domain.to_owned();

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT statement_hash, verifier_domain, verified_domain, foreign_domain, name,
                  legal_entity_type, country, province, city, serial_number,
                  department, confidence
           FROM organisation_verifications
           WHERE verified_domain = ?1 OR foreign_domain = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![domain], |row| {
            Ok(OrganisationVerification {
              statement_hash:    row.get(0)?,
              verifier_domain:   row.get(1)?,
              verified_domain:   row.get(2)?,
              foreign_domain:    row.get(3)?,
              name:              row.get(4)?,
              legal_entity_type: row.get(5)?,
              country:           row.get(6)?,
              province:          row.get(7)?,
              city:              row.get(8)?,
              serial_number:     row.get(9)?,
              department:        row.get(10)?,
              confidence:        row.get(11)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn get_person_verifications_for_domain(
    &self,
    domain: &str,
  ) -> Result<Vec<PersonVerification>> {
    self.ensure_ready()?;
    let domain = domain.to_owned();

    let raws: Vec<RawPersonVerification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM person_verifications
           WHERE verified_domain = ?1 OR foreign_domain = ?1
           ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![domain], read_person)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPersonVerification::into_person).collect()
  }

  async fn get_votes(&self, poll_hash: &str, filter: &VoteFilter) -> Result<Vec<Vote>> {
    self.ensure_ready()?;
    let poll_hash = poll_hash.to_owned();
    let filter = filter.clone();

    let raws: Vec<RawVote> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VOTE_COLUMNS} FROM votes
           WHERE poll_hash = ?1
             AND (?2 IS NULL OR domain = ?2)
             AND (?3 IS NULL OR author = ?3 COLLATE NOCASE)
             AND (?4 IS NULL OR statement_hash != ?4)
             AND (?5 = 0 OR qualified = 1)
           ORDER BY proclaimed_publication_time, statement_hash"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              poll_hash,
              filter.domain,
              filter.author,
              filter.ignore_statement_hash,
              filter.qualified_only,
            ],
            read_vote,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVote::into_vote).collect()
  }

  async fn get_ratings(&self, filter: &RatingFilter) -> Result<Vec<Rating>> {
    self.ensure_ready()?;
    let filter = filter.clone();

    let raws: Vec<RawRating> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RATING_COLUMNS} FROM ratings
           WHERE (?1 IS NULL OR subject_name = ?1)
             AND (?2 IS NULL OR quality = ?2)
             AND (?3 IS NULL OR domain = ?3)
             AND (?4 IS NULL OR author = ?4 COLLATE NOCASE)
             AND (?5 IS NULL OR statement_hash != ?5)
           ORDER BY proclaimed_publication_time, statement_hash"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              filter.subject_name,
              filter.quality,
              filter.domain,
              filter.author,
              filter.ignore_statement_hash,
            ],
            read_rating,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRating::into_rating).collect()
  }

  async fn get_observations_for_entity(
    &self,
    query: &ObservationQuery,
  ) -> Result<Vec<Statement>> {
    self.ensure_ready()?;
    use rusqlite::types::Value;

    // An observation names its subject by the hash of a verification of
    // that subject, inside its content block.
    let sql = format!(
      "SELECT {STATEMENT_COLUMNS} FROM statements s
       WHERE s.type = 'observation'
         AND (?3 IS NULL OR s.author = ?3 COLLATE NOCASE)
         AND (?4 IS NULL OR s.domain = ?4)
         AND EXISTS (
           SELECT 1 FROM (
             SELECT statement_hash FROM organisation_verifications
             WHERE name = ?1 COLLATE NOCASE
               AND (verified_domain = ?2 OR foreign_domain = ?2)
             UNION
             SELECT statement_hash FROM person_verifications
             WHERE name = ?1 COLLATE NOCASE
               AND (verified_domain = ?2 OR foreign_domain = ?2)
           ) v
           WHERE instr(
             s.content,
             'Subject identity reference: ' || v.statement_hash || char(10)
           ) > 0
         )
       ORDER BY s.id"
    );
    let params = vec![
      Value::Text(query.name.clone()),
      Value::Text(query.domain.clone()),
      opt_text(query.observer_name.clone()),
      opt_text(query.observer_domain.clone()),
    ];

    self.query_statements(sql, params).await
  }

  // ── Nodes ─────────────────────────────────────────────────────────────────

  async fn get_all_nodes(&self) -> Result<Vec<Node>> {
    self.ensure_ready()?;

    let raws: Vec<RawNode> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {NODE_COLUMNS} FROM nodes ORDER BY id"))?;
        let rows = stmt
          .query_map([], read_node)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNode::into_node).collect()
  }

  async fn add_node(&self, domain: &str) -> Result<Node> {
    self.ensure_ready()?;
    let domain = domain.to_owned();
    let now_str = encode_dt(Utc::now());

    let raw: RawNode = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO nodes (domain, first_seen, last_seen) VALUES (?1, ?2, ?2)
           ON CONFLICT(domain) DO UPDATE SET last_seen = excluded.last_seen",
          rusqlite::params![domain, now_str],
        )?;
        Ok(conn.query_row(
          &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE domain = ?1"),
          rusqlite::params![domain],
          read_node,
        )?)
      })
      .await?;

    raw.into_node()
  }

  async fn update_node(&self, update: NodeUpdate) -> Result<bool> {
    self.ensure_ready()?;
    let now_str = encode_dt(Utc::now());

    // The cursor only moves when the new value is at least the stored one.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE nodes SET
             last_received_statement_id = CASE
               WHEN ?2 IS NULL THEN last_received_statement_id
               WHEN last_received_statement_id IS NULL
                 OR last_received_statement_id <= ?2 THEN ?2
               ELSE last_received_statement_id
             END,
             certificate_authority = COALESCE(?3, certificate_authority),
             fingerprint           = COALESCE(?4, fingerprint),
             ip                    = COALESCE(?5, ip),
             last_seen             = ?6
           WHERE domain = ?1",
          rusqlite::params![
            update.domain,
            update.last_received_statement_id,
            update.certificate_authority,
            update.fingerprint,
            update.ip,
            now_str,
          ],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Verification log ──────────────────────────────────────────────────────

  async fn add_verification_log(&self, entry: VerificationLogEntry) -> Result<()> {
    self.ensure_ready()?;
    let t_str = encode_dt(entry.t);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO verification_log (statement_hash, t, api, dns, txt)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![entry.statement_hash, t_str, entry.api, entry.dns, entry.txt],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_verification_log(
    &self,
    statement_hash: &str,
  ) -> Result<Vec<VerificationLogEntry>> {
    self.ensure_ready()?;
    let hash = statement_hash.to_owned();

    let raws: Vec<RawLogEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT statement_hash, t, api, dns, txt FROM verification_log
           WHERE statement_hash = ?1
           ORDER BY t, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![hash], |row| {
            Ok(RawLogEntry {
              statement_hash: row.get(0)?,
              t:              row.get(1)?,
              api:            row.get(2)?,
              dns:            row.get(3)?,
              txt:            row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLogEntry::into_entry).collect()
  }

  async fn get_verification_log_candidates(
    &self,
    exclude_domain: &str,
    limit: usize,
  ) -> Result<Vec<LogCandidate>> {
    self.ensure_ready()?;
    let exclude_domain = exclude_domain.to_owned();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawLogCandidate> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {STATEMENT_COLUMNS}, COUNT(l.id), MIN(l.t)
           FROM statements s
           LEFT JOIN verification_log l ON l.statement_hash = s.hash
           WHERE s.domain != ?1
           GROUP BY s.id
           ORDER BY COUNT(l.id), s.id
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![exclude_domain, limit], |row| {
            Ok(RawLogCandidate {
              statement:    read_statement(row)?,
              log_count:    row.get(19)?,
              first_logged: row.get(20)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLogCandidate::into_candidate).collect()
  }
}
