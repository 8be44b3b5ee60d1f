use std::future::Future;

use rand::Rng;
use sqlx::SqlitePool;

use crate::db;

/// Symbols a generated token is drawn from. Lower-case only, so generated
/// tokens survive the lower-casing applied to every lookup.
pub const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub const MIN_LEN: usize = 3;
pub const MAX_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ShortError {
    #[error("no available short link found")]
    Exhausted,

    #[error("check exists: {0}")]
    Database(#[from] sqlx::Error),
}

/// Generate a random token that is unused in `domain`.
pub async fn generate(pool: &SqlitePool, domain: &str) -> Result<String, ShortError> {
    pick_unused(|candidate| async move { db::short_exists(pool, &candidate, domain).await })
        .await
}

/// Draw one candidate per length from `MIN_LEN` to `MAX_LEN` and return the
/// first one `taken` reports as free.
pub async fn pick_unused<F, Fut>(mut taken: F) -> Result<String, ShortError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, sqlx::Error>>,
{
    for len in MIN_LEN..=MAX_LEN {
        let candidate = random_short(len);
        if !taken(candidate.clone()).await? {
            return Ok(candidate);
        }
        tracing::debug!("Generated short '{}' already taken", candidate);
    }

    Err(ShortError::Exhausted)
}

/// Generate a random string of `len` symbols from `ALPHABET`.
fn random_short(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, collections::HashSet};

    fn in_alphabet(s: &str) -> bool {
        s.bytes().all(|b| ALPHABET.contains(&b))
    }

    #[test]
    fn random_short_has_requested_length_and_alphabet() {
        for len in MIN_LEN..=MAX_LEN {
            let s = random_short(len);
            assert_eq!(s.len(), len);
            assert!(in_alphabet(&s), "{s}");
        }
    }

    #[tokio::test]
    async fn free_first_candidate_is_shortest() {
        let short = pick_unused(|_| async { Ok::<_, sqlx::Error>(false) }).await.unwrap();
        assert_eq!(short.len(), MIN_LEN);
        assert!(in_alphabet(&short));
    }

    #[tokio::test]
    async fn collisions_move_to_longer_tokens() {
        let seen = RefCell::new(Vec::new());
        let short = pick_unused(|candidate| {
            seen.borrow_mut().push(candidate);
            let taken = seen.borrow().len() <= 2;
            async move { Ok::<_, sqlx::Error>(taken) }
        })
        .await
        .unwrap();

        assert_eq!(short.len(), MIN_LEN + 2);
        let lens: Vec<_> = seen.borrow().iter().map(String::len).collect();
        assert_eq!(lens, [3, 4, 5]);
    }

    #[tokio::test]
    async fn exhaustion_after_max_len() {
        let tries = RefCell::new(0);
        let err = pick_unused(|_| {
            *tries.borrow_mut() += 1;
            async { Ok::<_, sqlx::Error>(true) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ShortError::Exhausted));
        assert_eq!(*tries.borrow(), MAX_LEN - MIN_LEN + 1);
    }

    #[tokio::test]
    async fn generated_tokens_avoid_existing_links() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let mut made = HashSet::new();
        for _ in 0..50 {
            let short = generate(&pool, "sh.example").await.unwrap();
            assert!((MIN_LEN..=MAX_LEN).contains(&short.len()));
            assert!(in_alphabet(&short));
            assert!(made.insert(short.clone()), "duplicate {short}");
            db::update_link(&pool, &short, "https://example.com", "sh.example", true)
                .await
                .unwrap();
        }
    }
}
