//! Trained-model cache with background training workers.
//!
//! Training the advanced tier inline on every call is costly. The caching
//! engine keys trained models by (series fingerprint, horizon): a cache hit
//! answers from the stored model immediately, a miss schedules a training
//! job on a worker pool and serves the current request from the statistical
//! tiers. The cascade's external contract is unchanged: every call returns
//! exactly `horizon` tier-tagged results and never fails. Invalidation is
//! explicit.

use crate::core::{ForecastReport, ForecastTier, TierFailure, TimeSeries};
use crate::engine::{assemble, EngineConfig, ForecastEngine};
use crate::error::EngineError;
use crate::models::{AttentionForecaster, ForecastModel, MIN_TRAIN_POINTS};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

/// Cache key: a fingerprint of the series content plus the trained horizon.
pub fn fingerprint(series: &TimeSeries, horizon: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    series.len().hash(&mut hasher);
    for point in series.points() {
        point.timestamp.timestamp().hash(&mut hasher);
        point.value.to_bits().hash(&mut hasher);
    }
    horizon.hash(&mut hasher);
    hasher.finish()
}

struct TrainJob {
    key: u64,
    series: TimeSeries,
    horizon: usize,
}

type ModelStore = Arc<Mutex<HashMap<u64, Arc<AttentionForecaster>>>>;

/// Forecast engine with a trained-model cache and asynchronous training.
pub struct CachingForecastEngine {
    config: EngineConfig,
    engine: ForecastEngine,
    cache: ModelStore,
    pending: Arc<Mutex<HashSet<u64>>>,
    sender: Option<mpsc::Sender<TrainJob>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl CachingForecastEngine {
    /// Create a caching engine with `worker_count` background trainers.
    pub fn new(config: EngineConfig, worker_count: usize) -> Self {
        let cache: ModelStore = Arc::new(Mutex::new(HashMap::new()));
        let pending = Arc::new(Mutex::new(HashSet::new()));
        let (sender, receiver) = mpsc::channel::<TrainJob>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..worker_count.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let cache = Arc::clone(&cache);
                let pending = Arc::clone(&pending);
                let attention = config.attention;
                thread::spawn(move || loop {
                    let job = {
                        let receiver = receiver.lock().expect("training queue poisoned");
                        receiver.recv()
                    };
                    let Ok(job) = job else { break };

                    let mut model_config = attention;
                    model_config.horizon = job.horizon;
                    let mut model = AttentionForecaster::new(model_config);
                    match model.fit(&job.series) {
                        Ok(()) => {
                            cache
                                .lock()
                                .expect("model cache poisoned")
                                .insert(job.key, Arc::new(model));
                            tracing::debug!(worker, key = job.key, "background training complete");
                        }
                        Err(error) => {
                            tracing::warn!(worker, key = job.key, %error, "background training failed");
                        }
                    }
                    pending.lock().expect("pending set poisoned").remove(&job.key);
                })
            })
            .collect();

        Self {
            config,
            engine: ForecastEngine::new(config),
            cache,
            pending,
            sender: Some(sender),
            workers,
        }
    }

    /// Forecast with cache lookup.
    ///
    /// Hit: the stored advanced model answers. Miss: a training job is
    /// scheduled (once per key) and the statistical tiers answer this call.
    pub fn run(&self, series: &TimeSeries, horizon: usize) -> ForecastReport {
        if horizon == 0 {
            return ForecastReport {
                results: Vec::new(),
                tier: ForecastTier::Synthetic,
                attempts: Vec::new(),
            };
        }

        let timestamps = self.engine.future_timestamps(series, horizon);
        let key = fingerprint(series, horizon);

        let cached = self.cache.lock().expect("model cache poisoned").get(&key).cloned();
        if let Some(model) = cached {
            match model.predict(&timestamps) {
                Ok(forecast) => {
                    tracing::debug!(key, "cache hit, answering from trained model");
                    return assemble(
                        &timestamps,
                        forecast,
                        ForecastTier::Advanced,
                        model.training_summary(),
                        Vec::new(),
                    );
                }
                Err(error) => {
                    tracing::warn!(key, %error, "cached model rejected the request");
                    self.cache.lock().expect("model cache poisoned").remove(&key);
                }
            }
        }

        let mut attempts = Vec::new();
        if series.len() >= MIN_TRAIN_POINTS {
            self.schedule(key, series, horizon);
            attempts.push(TierFailure {
                tier: ForecastTier::Advanced,
                error: EngineError::ModelNotTrained,
            });
        } else {
            attempts.push(TierFailure {
                tier: ForecastTier::Advanced,
                error: EngineError::InsufficientData {
                    needed: MIN_TRAIN_POINTS,
                    got: series.len(),
                },
            });
        }

        self.engine.run_statistical(series, &timestamps, attempts)
    }

    fn schedule(&self, key: u64, series: &TimeSeries, horizon: usize) {
        let mut pending = self.pending.lock().expect("pending set poisoned");
        if pending.contains(&key) {
            return;
        }
        if let Some(sender) = &self.sender {
            let job = TrainJob {
                key,
                series: series.clone(),
                horizon,
            };
            if sender.send(job).is_ok() {
                pending.insert(key);
                tracing::debug!(key, "training job scheduled");
            }
        }
    }

    /// Drop the cached model for one series + horizon.
    pub fn invalidate(&self, series: &TimeSeries, horizon: usize) {
        let key = fingerprint(series, horizon);
        self.cache.lock().expect("model cache poisoned").remove(&key);
    }

    /// Drop every cached model.
    pub fn invalidate_all(&self) {
        self.cache.lock().expect("model cache poisoned").clear();
    }

    /// Number of trained models currently cached.
    pub fn cached_models(&self) -> usize {
        self.cache.lock().expect("model cache poisoned").len()
    }

    /// Number of training jobs scheduled but not yet finished.
    pub fn pending_jobs(&self) -> usize {
        self.pending.lock().expect("pending set poisoned").len()
    }

    /// The engine configuration in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Drop for CachingForecastEngine {
    fn drop(&mut self) {
        // Closing the channel lets every worker drain and exit.
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
