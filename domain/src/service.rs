use crate::validate::{validate_filter, validate_movie, FilterInput, MovieInput};
use crate::{CoreError, Movie, MovieId, MovieRepository, NewMovie};

/// Application service in front of a movie repository.
///
/// Validates raw input before the store is touched, so a request that reaches
/// the repository is always well-typed. Each call maps to exactly one
/// repository call.
pub struct MovieService<R: MovieRepository> {
    repo: R,
}

impl<R: MovieRepository> MovieService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Create a movie from a raw body.
    pub async fn create(&self, input: MovieInput) -> Result<Movie, CoreError> {
        let movie = validate_movie(input)?;
        self.repo.create(movie).await
    }

    /// Fetch a movie by its textual id.
    pub async fn get(&self, id: &str) -> Result<Option<Movie>, CoreError> {
        let id = MovieId::parse(id)?;
        self.repo.get(&id).await
    }

    /// List movies matching the raw query filter.
    pub async fn find(&self, input: FilterInput) -> Result<Vec<Movie>, CoreError> {
        let filter = validate_filter(input)?;
        self.repo.find(&filter).await
    }

    /// Replace all fields of a movie. Returns the parsed id and validated
    /// values alongside the replaced count so callers can echo them back.
    pub async fn replace(
        &self,
        id: &str,
        input: MovieInput,
    ) -> Result<(u64, Movie), CoreError> {
        let id = MovieId::parse(id)?;
        let movie: NewMovie = validate_movie(input)?;
        let replaced = self.repo.replace(&id, movie.clone()).await?;
        Ok((replaced, Movie::from_new(id, movie)))
    }

    /// Delete a movie by its textual id.
    pub async fn delete(&self, id: &str) -> Result<u64, CoreError> {
        let id = MovieId::parse(id)?;
        self.repo.delete(&id).await
    }

    pub async fn close(&self) -> Result<(), CoreError> {
        self.repo.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::InMemoryRepo;
    use crate::validate::YearValue;

    fn input(title: &str, year: i64, language: &str) -> MovieInput {
        MovieInput {
            title: Some(title.into()),
            year: Some(YearValue::Number(year)),
            language: Some(language.into()),
        }
    }

    fn svc() -> MovieService<InMemoryRepo> {
        MovieService::new(InMemoryRepo::new())
    }

    #[tokio::test]
    async fn create_then_get_returns_same_fields() {
        let svc = svc();
        let created = svc.create(input("Dune", 2021, "English")).await.unwrap();
        let got = svc.get(created.id.as_str()).await.unwrap().expect("stored");
        assert_eq!(got, created);
        assert_eq!(got.title, "Dune");
        assert_eq!(got.year, 2021);
    }

    #[tokio::test]
    async fn create_missing_field_persists_nothing() {
        let svc = svc();
        let mut bad = input("Dune", 2021, "English");
        bad.title = None;
        let err = svc.create(bad).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(svc.find(FilterInput::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_unknown_id_is_absent() {
        let svc = svc();
        let got = svc.get("000000000000000000000000").await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn malformed_id_is_classified() {
        let svc = svc();
        assert!(matches!(svc.get("nope").await, Err(CoreError::InvalidId(_))));
        assert!(matches!(svc.delete("nope").await, Err(CoreError::InvalidId(_))));
        assert!(matches!(
            svc.replace("nope", input("A", 1, "B")).await,
            Err(CoreError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn find_by_year_returns_subset() {
        let svc = svc();
        svc.create(input("Dune", 2021, "English")).await.unwrap();
        svc.create(input("Titane", 2021, "French")).await.unwrap();
        svc.create(input("Arrival", 2016, "English")).await.unwrap();

        let all = svc.find(FilterInput::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let y2021 = svc
            .find(FilterInput {
                year: Some("2021".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(y2021.len(), 2);
        assert!(y2021.iter().all(|m| m.year == 2021));
    }

    #[tokio::test]
    async fn replace_overwrites_and_reports_count() {
        let svc = svc();
        let created = svc.create(input("Dune", 2021, "English")).await.unwrap();
        let (n, echoed) = svc
            .replace(created.id.as_str(), input("Dune Part Two", 2024, "English"))
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(echoed.id, created.id);

        let got = svc.get(created.id.as_str()).await.unwrap().unwrap();
        assert_eq!(got.title, "Dune Part Two");
        assert_eq!(got.year, 2024);
    }

    #[tokio::test]
    async fn replace_unknown_id_creates_nothing() {
        let svc = svc();
        let (n, _) = svc
            .replace("000000000000000000000000", input("Ghost", 1990, "English"))
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert!(svc.find(FilterInput::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_twice_returns_one_then_zero() {
        let svc = svc();
        let created = svc.create(input("Dune", 2021, "English")).await.unwrap();
        assert_eq!(svc.delete(created.id.as_str()).await.unwrap(), 1);
        assert!(svc.get(created.id.as_str()).await.unwrap().is_none());
        assert_eq!(svc.delete(created.id.as_str()).await.unwrap(), 0);
    }
}
