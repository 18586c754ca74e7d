//! Question selection and background dataset population

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::{IteratorRandom, SliceRandom};
use tokio::sync::oneshot;

use super::{
    AskedSet, CANDIDATES_PER_TIER, CategoryKey, CategoryType, CorpusStore, FALLBACK_QUESTION,
    QuestionTemplate, UsedDefaults, default_questions,
};
use crate::ports::QuestionGenerator;
use crate::willingness::WillingnessTier;

/// Signal that a background generation has finished
///
/// Resolves to `true` once the dataset is stored and marked available.
#[derive(Debug)]
pub struct Readiness {
    inner: ReadinessInner,
}

#[derive(Debug)]
enum ReadinessInner {
    Settled(bool),
    Pending(oneshot::Receiver<bool>),
}

impl Readiness {
    /// Already available
    #[must_use]
    pub const fn ready() -> Self {
        Self {
            inner: ReadinessInner::Settled(true),
        }
    }

    fn pending(rx: oneshot::Receiver<bool>) -> Self {
        Self {
            inner: ReadinessInner::Pending(rx),
        }
    }

    /// Wait up to `timeout` for the outcome
    ///
    /// A timeout or an abandoned generation both read as "not ready".
    pub async fn wait(self, timeout: Duration) -> bool {
        match self.inner {
            ReadinessInner::Settled(ready) => ready,
            ReadinessInner::Pending(rx) => match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(ready)) => ready,
                Ok(Err(_)) => false,
                Err(_) => {
                    tracing::debug!(timeout_ms = %timeout.as_millis(), "readiness wait timed out");
                    false
                }
            },
        }
    }
}

/// Everything selection decides on, behind one lock
struct CorpusState {
    available: HashSet<CategoryKey>,
    cache: HashMap<CategoryKey, Vec<QuestionTemplate>>,
    /// Waiters per in-flight generation
    pending: HashMap<CategoryKey, Vec<oneshot::Sender<bool>>>,
    used_defaults: UsedDefaults,
    rng: StdRng,
}

struct Inner {
    store: Arc<dyn CorpusStore>,
    generator: Arc<dyn QuestionGenerator>,
    state: Mutex<CorpusState>,
}

/// Serves questions per category and tier
///
/// Cheap to clone; clones share state. Selection is synchronous and makes
/// its whole decision under a single lock, so availability flipping from a
/// background generation is only ever observed between selections.
#[derive(Clone)]
pub struct CorpusManager {
    inner: Arc<Inner>,
}

impl CorpusManager {
    /// Create a manager
    ///
    /// `used_defaults` carries which default questions earlier sessions in
    /// this process already served.
    #[must_use]
    pub fn new(
        store: Arc<dyn CorpusStore>,
        generator: Arc<dyn QuestionGenerator>,
        used_defaults: UsedDefaults,
        rng: StdRng,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                generator,
                state: Mutex::new(CorpusState {
                    available: HashSet::new(),
                    cache: HashMap::new(),
                    pending: HashMap::new(),
                    used_defaults,
                    rng,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CorpusState> {
        // State stays consistent across a panicking holder; every mutation is a single insert
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pick the next question and record it in `asked`
    pub fn select_question(
        &self,
        asked: &mut AskedSet,
        category_type: CategoryType,
        category_name: &str,
        tier: WillingnessTier,
    ) -> QuestionTemplate {
        if category_name.trim().is_empty() {
            let question = QuestionTemplate {
                text: FALLBACK_QUESTION.to_string(),
                category_type: CategoryType::General,
                category_name: "general".to_string(),
                tier,
            };
            asked.insert(&question.text);
            return question;
        }

        let key = CategoryKey::new(category_type, category_name);
        let mut state = self.state();

        let generated = if self.refresh_availability(&mut state, &key) {
            self.pick_generated(&mut state, asked, &key, tier)
        } else {
            None
        };
        let question = match generated {
            Some(question) => question,
            None => pick_default(&mut state, asked, category_type, category_name, tier),
        };

        asked.insert(&question.text);

        tracing::debug!(
            category = %key,
            requested = %tier,
            served = %question.tier,
            "selected question"
        );
        question
    }

    /// First default template for a category, without randomness
    ///
    /// Used to open a hobby deep dive before any generated dataset could
    /// exist. Falls back to normal selection if it was already asked.
    pub fn first_default(
        &self,
        asked: &mut AskedSet,
        category_type: CategoryType,
        category_name: &str,
    ) -> QuestionTemplate {
        let first = default_questions(category_type, category_name).into_iter().next();

        match first {
            Some(question) if !asked.contains(&question.text) => {
                self.state().used_defaults.record(&question.text);
                asked.insert(&question.text);
                question
            }
            _ => self.select_question(asked, category_type, category_name, WillingnessTier::Low),
        }
    }

    /// Whether a generated dataset is ready for this category
    #[must_use]
    pub fn is_available(&self, category_type: CategoryType, category_name: &str) -> bool {
        let key = CategoryKey::new(category_type, category_name);
        let mut state = self.state();
        self.refresh_availability(&mut state, &key)
    }

    /// Start generating a dataset in the background
    ///
    /// Returns immediately. Must be called from within a tokio runtime.
    pub fn generate_async(&self, category_type: CategoryType, category_name: &str) -> Readiness {
        let key = CategoryKey::new(category_type, category_name);
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.state();
            if self.refresh_availability(&mut state, &key) {
                return Readiness::ready();
            }
            if let Some(waiters) = state.pending.get_mut(&key) {
                waiters.push(tx);
                return Readiness::pending(rx);
            }
            state.pending.insert(key.clone(), vec![tx]);
        }

        tracing::info!(category = %key, "starting background question generation");

        let manager = self.clone();
        tokio::spawn(async move {
            let ready = manager.generate_and_store(&key).await;
            manager.finish_generation(&key, ready);
        });

        Readiness::pending(rx)
    }

    async fn generate_and_store(&self, key: &CategoryKey) -> bool {
        let batch = match self
            .inner
            .generator
            .generate_batch(key.category_type, &key.name)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(category = %key, error = %e, "question generation failed");
                return false;
            }
        };

        if let Err(e) = self.inner.store.save(key.category_type, &key.name, &batch) {
            tracing::warn!(category = %key, error = %e, "failed to store generated questions");
            return false;
        }

        tracing::info!(category = %key, count = batch.len(), "generated question dataset");
        let mut state = self.state();
        state.cache.insert(key.clone(), batch);
        state.available.insert(key.clone());
        true
    }

    fn finish_generation(&self, key: &CategoryKey, ready: bool) {
        let waiters = self.state().pending.remove(key).unwrap_or_default();
        for waiter in waiters {
            // Receiver may have given up already
            let _ = waiter.send(ready);
        }
    }

    /// Hand back the used-defaults record, leaving an empty one in place
    pub fn take_used_defaults(&self) -> UsedDefaults {
        std::mem::take(&mut self.state().used_defaults)
    }

    /// Forget which defaults have been served
    pub fn reset_used_defaults(&self) {
        self.state().used_defaults.clear();
    }

    fn refresh_availability(&self, state: &mut CorpusState, key: &CategoryKey) -> bool {
        if state.available.contains(key) {
            return true;
        }
        if self.inner.store.exists(key.category_type, &key.name) {
            tracing::debug!(category = %key, "found stored dataset");
            state.available.insert(key.clone());
            return true;
        }
        false
    }

    /// Lookup in a generated dataset, cycling tiers from `tier`
    fn pick_generated(
        &self,
        state: &mut CorpusState,
        asked: &AskedSet,
        key: &CategoryKey,
        tier: WillingnessTier,
    ) -> Option<QuestionTemplate> {
        if !state.cache.contains_key(key) {
            match self.inner.store.load(key.category_type, &key.name) {
                Ok(questions) => {
                    state.cache.insert(key.clone(), questions);
                }
                Err(e) => {
                    tracing::warn!(category = %key, error = %e, "stored dataset unreadable, using defaults");
                    state.available.remove(key);
                    return None;
                }
            }
        }

        let CorpusState { cache, rng, .. } = state;
        let dataset = cache.get(key)?;

        for candidate_tier in tier.cycle_from() {
            let candidates = dataset
                .iter()
                .filter(|q| q.tier == candidate_tier)
                .choose_multiple(rng, CANDIDATES_PER_TIER);
            let fresh: Vec<_> = candidates
                .into_iter()
                .filter(|q| !asked.contains(&q.text))
                .collect();

            if let Some(question) = fresh.choose(rng) {
                return Some((*question).clone());
            }
        }

        tracing::debug!(category = %key, "generated dataset exhausted, using defaults");
        None
    }
}

/// Lookup in the built-in defaults
fn pick_default(
    state: &mut CorpusState,
    asked: &AskedSet,
    category_type: CategoryType,
    category_name: &str,
    tier: WillingnessTier,
) -> QuestionTemplate {
    let defaults = default_questions(category_type, category_name);

    let unasked: Vec<&QuestionTemplate> =
        defaults.iter().filter(|q| !asked.contains(&q.text)).collect();
    let in_tier: Vec<&QuestionTemplate> =
        unasked.iter().copied().filter(|q| q.tier == tier).collect();

    let pool = if !in_tier.is_empty() {
        in_tier
    } else if !unasked.is_empty() {
        unasked
    } else {
        tracing::debug!(category_type = %category_type, category = category_name, "all defaults asked, reusing");
        defaults.iter().collect()
    };

    let least = pool
        .iter()
        .map(|q| state.used_defaults.count(&q.text))
        .min()
        .unwrap_or_default();
    let fresh: Vec<&QuestionTemplate> = pool
        .into_iter()
        .filter(|q| state.used_defaults.count(&q.text) == least)
        .collect();

    let question = fresh.choose(&mut state.rng).map_or_else(
        || QuestionTemplate {
            text: FALLBACK_QUESTION.to_string(),
            category_type,
            category_name: category_name.to_string(),
            tier,
        },
        |q| (*q).clone(),
    );

    state.used_defaults.record(&question.text);
    question
}
