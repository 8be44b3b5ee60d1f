use std::str::FromStr;

use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

use crate::models::{short_url, Link, LinkHistory, LinkWithHistory};

// ── Pool ───────────────────────────────────────────────────────────────────

/// Open the SQLite pool (creating the file if needed) and apply the
/// embedded migrations.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let mut pool_options = SqlitePoolOptions::new().max_connections(10);

    // An in-memory database only lives as long as the connection that
    // created it.
    if database_url.contains(":memory:") {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

// ── Links ──────────────────────────────────────────────────────────────────

/// Look up the current long URL for `(short, domain)`. History is never
/// consulted.
pub async fn get_long(
    pool: &SqlitePool,
    short: &str,
    domain: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT long FROM links WHERE short = ?1 AND domain = ?2")
        .bind(short)
        .bind(domain)
        .fetch_optional(pool)
        .await
}

/// Whether a current link exists for `(short, domain)`.
pub async fn short_exists(
    pool: &SqlitePool,
    short: &str,
    domain: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM links WHERE short = ?1 AND domain = ?2)")
        .bind(short)
        .bind(domain)
        .fetch_one(pool)
        .await
}

/// Archive the current row for `(short, domain)` (if any) into
/// `links_history`, then insert or overwrite the current row.
///
/// Both statements run in one transaction. The archive insert comes first
/// so the transaction holds the write lock before it reads the old row,
/// which serializes concurrent writers to the same pair.
pub async fn update_link(
    pool: &SqlitePool,
    short: &str,
    long: &str,
    domain: &str,
    generated: bool,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO links_history (short, long, domain, generated, until)
         SELECT short, long, domain, generated, ?3
         FROM links WHERE short = ?1 AND domain = ?2",
    )
    .bind(short)
    .bind(domain)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO links (short, long, domain, generated) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (short, domain) DO UPDATE
         SET long = excluded.long, generated = excluded.generated",
    )
    .bind(short)
    .bind(long)
    .bind(domain)
    .bind(generated)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Every current link of `domain` with its history attached, ordered by
/// short token; history is newest first.
pub async fn list_links(
    pool: &SqlitePool,
    domain: &str,
) -> Result<Vec<LinkWithHistory>, sqlx::Error> {
    let links: Vec<Link> = sqlx::query_as(
        "SELECT short, long, domain, generated FROM links
         WHERE domain = ?1
         ORDER BY short ASC",
    )
    .bind(domain)
    .fetch_all(pool)
    .await?;

    let history: Vec<LinkHistory> = sqlx::query_as(
        "SELECT short, long, domain, generated, until FROM links_history
         WHERE domain = ?1
         ORDER BY short ASC, until DESC, rowid DESC",
    )
    .bind(domain)
    .fetch_all(pool)
    .await?;

    let mut history = history.into_iter().peekable();
    let mut result = Vec::with_capacity(links.len());

    for link in links {
        // Both result sets are sorted by short; skip history for tokens that
        // sort before this one (none should exist, links are never deleted).
        while history.next_if(|h| h.short < link.short).is_some() {}

        let mut versions = Vec::new();
        while let Some(h) = history.next_if(|h| h.short == link.short) {
            versions.push(h);
        }

        result.push(LinkWithHistory {
            url: short_url(&link.domain, &link.short),
            short: link.short,
            long: link.long,
            domain: link.domain,
            generated: link.generated,
            history: versions,
        });
    }

    Ok(result)
}
