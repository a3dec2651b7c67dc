use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::objectid::ObjectIdGenerator;
use crate::{CoreError, IdGenerator, Movie, MovieFilter, MovieId, MovieRepository, NewMovie};

/// Simple in-memory repository for tests. Not tuned for high concurrency
/// beyond the internal mutex guarding the records. Keeps insertion order.
pub struct InMemoryRepo<G: IdGenerator = ObjectIdGenerator> {
    inner: Mutex<Vec<Movie>>,
    ids: G,
    closed: AtomicBool,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::with_ids(ObjectIdGenerator::new())
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: IdGenerator> InMemoryRepo<G> {
    pub fn with_ids(ids: G) -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            ids,
            closed: AtomicBool::new(false),
        }
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, Vec<Movie>>, CoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CoreError::Repository("store closed".into()));
        }
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

impl<G: IdGenerator> MovieRepository for InMemoryRepo<G> {
    async fn create(&self, movie: NewMovie) -> Result<Movie, CoreError> {
        let mut records = self.records()?;
        let id = self.ids.next_id();
        if records.iter().any(|m| m.id == id) {
            return Err(CoreError::Repository(format!("duplicate id {}", id)));
        }
        let stored = Movie::from_new(id, movie);
        records.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: &MovieId) -> Result<Option<Movie>, CoreError> {
        let records = self.records()?;
        Ok(records.iter().find(|m| m.id == *id).cloned())
    }

    async fn find(&self, filter: &MovieFilter) -> Result<Vec<Movie>, CoreError> {
        let records = self.records()?;
        Ok(records.iter().filter(|m| filter.matches(m)).cloned().collect())
    }

    async fn replace(&self, id: &MovieId, movie: NewMovie) -> Result<u64, CoreError> {
        let mut records = self.records()?;
        match records.iter_mut().find(|m| m.id == *id) {
            Some(existing) => {
                *existing = Movie::from_new(id.clone(), movie);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: &MovieId) -> Result<u64, CoreError> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|m| m.id != *id);
        Ok((before - records.len()) as u64)
    }

    async fn close(&self) -> Result<(), CoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    fn mk(title: &str, year: i32) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            year,
            language: "English".to_string(),
        }
    }

    /// Always hands out the same id, to exercise the collision guard.
    struct StuckIds;
    impl IdGenerator for StuckIds {
        fn next_id(&self) -> MovieId {
            MovieId::from_bytes([7; 12])
        }
    }

    struct SeqIds(AtomicU64);
    impl IdGenerator for SeqIds {
        fn next_id(&self) -> MovieId {
            let n = self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let mut bytes = [0u8; 12];
            bytes[4..].copy_from_slice(&n.to_be_bytes());
            MovieId::from_bytes(bytes)
        }
    }

    #[tokio::test]
    async fn create_get_roundtrip() {
        let repo = InMemoryRepo::new();
        let created = repo.create(mk("Dune", 2021)).await.unwrap();
        let got = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(got.title, "Dune");
    }

    #[tokio::test]
    async fn duplicate_generated_id_is_rejected() {
        let repo = InMemoryRepo::with_ids(StuckIds);
        repo.create(mk("A", 1)).await.unwrap();
        let err = repo.create(mk("B", 2)).await.unwrap_err();
        assert!(matches!(err, CoreError::Repository(_)));
        assert_eq!(repo.find(&MovieFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_keeps_insertion_order() {
        let repo = InMemoryRepo::with_ids(SeqIds(AtomicU64::new(0)));
        for (i, t) in ["c", "a", "b"].iter().enumerate() {
            repo.create(mk(t, i as i32)).await.unwrap();
        }
        let titles: Vec<String> = repo
            .find(&MovieFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn replace_and_delete_counts() {
        let repo = InMemoryRepo::new();
        let created = repo.create(mk("Dune", 2021)).await.unwrap();
        assert_eq!(repo.replace(&created.id, mk("Dune Part Two", 2024)).await.unwrap(), 1);
        let missing = MovieId::from_bytes([0; 12]);
        assert_eq!(repo.replace(&missing, mk("x", 1)).await.unwrap(), 0);
        assert_eq!(repo.delete(&created.id).await.unwrap(), 1);
        assert_eq!(repo.delete(&created.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn closed_repo_fails() {
        let repo = InMemoryRepo::new();
        repo.close().await.unwrap();
        assert!(repo.find(&MovieFilter::default()).await.is_err());
    }
}
