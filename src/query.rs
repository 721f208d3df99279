//! Query orchestration
//!
//! [`QueryService::resolve`] is the single entry point used by the HTTP layer.
//! It serves pages out of the cache and, on a miss, fetches one large batch
//! through the rate limiter and retry policy, transforms it and caches it
//! (also when empty) before slicing the requested page.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cache::{QuestionCache, CACHE_TTL};
use crate::data::{Question, QueryFilters, QuerySignature, RawQuestion, TriviaSource};
use crate::pagination::paginate;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::transform::transform;

/// Number of questions requested upstream per batch
///
/// Open Trivia DB has no pagination, so one large batch is fetched and pages
/// are sliced locally.
pub const DEFAULT_BATCH_SIZE: u32 = 50;

/// Errors surfaced to callers of [`QueryService::resolve`]
///
/// The underlying cause is logged, never carried here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("The Trivia Service is currently unavailable. Please try again later.")]
    Unavailable,
}

/// Tunables for the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// Questions requested upstream per fetch
    pub batch_size: u32,
    /// Lifetime of a cached batch
    pub cache_ttl: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cache_ttl: CACHE_TTL,
        }
    }
}

/// Ties the cache, rate limiter, retry policy and upstream client together
///
/// Cloning is cheap; clones share the same cache, limiter and random source.
#[derive(Clone)]
pub struct QueryService {
    source: Arc<dyn TriviaSource>,
    cache: Arc<dyn QuestionCache>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    rng: Arc<Mutex<StdRng>>,
    config: QueryConfig,
}

impl QueryService {
    /// Creates a service with default limiter, retry policy and config
    pub fn new(source: Arc<dyn TriviaSource>, cache: Arc<dyn QuestionCache>) -> Self {
        Self {
            source,
            cache,
            limiter: Arc::new(RateLimiter::default()),
            retry: RetryPolicy::default(),
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            config: QueryConfig::default(),
        }
    }

    /// Builder: share an existing rate limiter
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Builder: set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builder: set batch size and TTL
    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder: use a specific random source for answer shuffling
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Arc::new(Mutex::new(rng));
        self
    }

    /// The cache backing this service
    pub fn cache(&self) -> &Arc<dyn QuestionCache> {
        &self.cache
    }

    /// Returns page `page` of the questions matching `filters`
    ///
    /// # Arguments
    /// * `filters` - Filter set; empty strings count as unset
    /// * `page` - 1-indexed page number
    /// * `page_size` - Questions per page
    ///
    /// # Returns
    /// * `Ok(Vec<Question>)` - The page, possibly empty
    /// * `Err(ServiceError::Unavailable)` - Upstream could not be reached after all retries
    pub async fn resolve(
        &self,
        filters: &QueryFilters,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Question>, ServiceError> {
        let signature = filters.signature();

        let batch = match self.cache.get(&signature) {
            Some(cached) => {
                debug!(signature = %signature, "Cache hit");
                cached.questions
            }
            None => {
                info!(signature = %signature, "Cache miss, fetching from Open Trivia DB");
                // Run the fetch detached so a caller going away does not
                // abandon a batch other callers could be served from.
                let service = self.clone();
                tokio::spawn(async move { service.fetch_batch(signature).await })
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Fetch task did not complete");
                        ServiceError::Unavailable
                    })??
            }
        };

        Ok(paginate(&batch, page, page_size))
    }

    /// Fetches, transforms and caches the batch for `signature`
    ///
    /// Nothing is cached when every attempt fails.
    async fn fetch_batch(&self, signature: QuerySignature) -> Result<Arc<[Question]>, ServiceError> {
        let source = &self.source;
        let filters = signature.filters();
        let amount = self.config.batch_size;

        let response = self
            .retry
            .execute(&self.limiter, move || source.fetch(amount, filters))
            .await
            .map_err(|e| {
                error!(
                    signature = %signature,
                    attempts = %e.attempts(),
                    error = %e,
                    "All retry attempts failed"
                );
                ServiceError::Unavailable
            })?;

        let questions: Arc<[Question]> = if response.response_code == 0 {
            let questions = self.transform_batch(response.results, filters.search.as_deref());
            info!(
                signature = %signature,
                count = questions.len(),
                "Fetched and transformed questions, caching result"
            );
            questions.into()
        } else {
            warn!(
                signature = %signature,
                response_code = response.response_code,
                "Open Trivia DB returned no results or an error code, caching empty result"
            );
            Vec::<Question>::new().into()
        };

        self.cache.set(signature, Arc::clone(&questions), self.config.cache_ttl);

        Ok(questions)
    }

    fn transform_batch(&self, raw: Vec<RawQuestion>, search: Option<&str>) -> Vec<Question> {
        let mut rng = self.rng.lock();
        transform(raw, search, &mut *rng)
    }
}
