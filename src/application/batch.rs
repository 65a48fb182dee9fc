//! Background batch scoring.
//!
//! Records are scored on a fixed pool of worker threads that share one
//! `PredictionService`. Each outcome travels back over a channel tagged with
//! its input index; a final `Finished` message carries the summary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::analytics::BatchSummary;
use super::service::PredictionService;
use crate::domain::{ErrorResponse, PredictionResponse, RawPatientRecord};
use crate::ports::ProbabilityModel;

/// Progress updates from the batch worker.
#[derive(Debug, Clone)]
pub enum BatchProgress {
    /// One record finished, successfully or not
    Scored {
        index: usize,
        outcome: Result<PredictionResponse, ErrorResponse>,
    },
    /// All records processed
    Finished(BatchSummary),
}

/// Handle to a running batch.
pub struct BatchWorkerHandle {
    /// Receiver for progress updates
    pub progress_rx: Receiver<BatchProgress>,
    _handle: JoinHandle<()>,
}

impl BatchWorkerHandle {
    /// Iterate over progress updates until the batch is done.
    pub fn iter(&self) -> impl Iterator<Item = BatchProgress> + '_ {
        self.progress_rx.iter()
    }
}

pub struct BatchWorker;

impl BatchWorker {
    /// Spawn a batch on `workers` threads (at least one).
    ///
    /// Per-record failures are reported and counted; they never stop the batch.
    pub fn spawn<M>(
        service: Arc<PredictionService<M>>,
        records: Vec<RawPatientRecord>,
        workers: usize,
    ) -> BatchWorkerHandle
    where
        M: ProbabilityModel + 'static,
    {
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            Self::run_batch(&service, records, workers.max(1), &tx);
        });

        BatchWorkerHandle {
            progress_rx: rx,
            _handle: handle,
        }
    }

    fn run_batch<M>(
        service: &Arc<PredictionService<M>>,
        records: Vec<RawPatientRecord>,
        workers: usize,
        tx: &Sender<BatchProgress>,
    ) where
        M: ProbabilityModel + 'static,
    {
        let total = records.len();
        tracing::info!("Scoring batch of {total} records on {workers} workers");

        let records = Arc::new(records);
        let next = Arc::new(AtomicUsize::new(0));
        let (outcome_tx, outcome_rx) = mpsc::channel();

        let pool: Vec<_> = (0..workers.min(total.max(1)))
            .map(|_| {
                let service = Arc::clone(service);
                let records = Arc::clone(&records);
                let next = Arc::clone(&next);
                let outcome_tx = outcome_tx.clone();
                thread::spawn(move || loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(record) = records.get(index) else {
                        break;
                    };
                    let outcome = service.predict(record).map_err(|e| e.to_response());
                    if outcome_tx.send((index, outcome)).is_err() {
                        break;
                    }
                })
            })
            .collect();
        drop(outcome_tx);

        let mut summary = BatchSummary::new();
        for (index, outcome) in outcome_rx {
            match &outcome {
                Ok(response) => summary.record_scored(response),
                Err(_) => summary.record_rejected(),
            }
            let _ = tx.send(BatchProgress::Scored { index, outcome });
        }

        for worker in pool {
            if worker.join().is_err() {
                tracing::error!("Batch worker thread panicked");
            }
        }

        tracing::info!(
            "Batch complete: scored={}, rejected={}, positives={} (rate {:.3})",
            summary.scored,
            summary.rejected,
            summary.positives,
            summary.positive_rate()
        );
        let _ = tx.send(BatchProgress::Finished(summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyOverrides;
    use crate::domain::{FeatureColumn, RiskLevel};
    use crate::test_support::{fitted_state, healthy_profile, stroke_profile, StubModel};

    fn service(probability: f64) -> Arc<PredictionService<StubModel>> {
        Arc::new(
            PredictionService::from_parts(
                fitted_state(),
                StubModel::new(probability, FeatureColumn::TRAINING_ORDER.len()),
                &PolicyOverrides::default(),
            )
            .expect("Should build service"),
        )
    }

    fn collect(handle: &BatchWorkerHandle) -> (Vec<BatchProgress>, Option<BatchSummary>) {
        let mut scored = Vec::new();
        let mut summary = None;
        for progress in handle.iter() {
            match progress {
                BatchProgress::Finished(s) => summary = Some(s),
                other => scored.push(other),
            }
        }
        (scored, summary)
    }

    #[test]
    fn test_batch_scores_every_record() {
        let records: Vec<_> = (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    stroke_profile()
                } else {
                    healthy_profile()
                }
            })
            .collect();

        let handle = BatchWorker::spawn(service(0.85), records, 4);
        let (scored, summary) = collect(&handle);
        let summary = summary.expect("batch should finish");

        assert_eq!(scored.len(), 20);
        assert_eq!(summary.total, 20);
        assert_eq!(summary.scored, 20);
        assert_eq!(summary.count_for(RiskLevel::High), 20);

        let mut indices: Vec<usize> = scored
            .iter()
            .filter_map(|p| match p {
                BatchProgress::Scored { index, .. } => Some(*index),
                BatchProgress::Finished(_) => None,
            })
            .collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_rejected_record_does_not_stop_batch() {
        let mut bad = stroke_profile();
        bad.work_type = Some("Astronaut".into());
        let records = vec![stroke_profile(), bad, healthy_profile()];

        let handle = BatchWorker::spawn(service(0.3), records, 2);
        let (scored, summary) = collect(&handle);
        let summary = summary.expect("batch should finish");

        assert_eq!(summary.scored, 2);
        assert_eq!(summary.rejected, 1);
        let rejected = scored.iter().find_map(|p| match p {
            BatchProgress::Scored {
                index: 1,
                outcome: Err(e),
            } => Some(e.clone()),
            _ => None,
        });
        assert_eq!(
            rejected.map(|e| e.error),
            Some("invalid_input".to_string())
        );
    }

    #[test]
    fn test_unavailable_service_rejects_all() {
        let service: Arc<PredictionService<StubModel>> =
            Arc::new(PredictionService::unavailable("no artifacts"));
        let handle = BatchWorker::spawn(service, vec![stroke_profile(); 3], 8);
        let (_, summary) = collect(&handle);
        let summary = summary.expect("batch should finish");
        assert_eq!(summary.rejected, 3);
        assert_eq!(summary.scored, 0);
    }

    #[test]
    fn test_empty_batch_finishes() {
        let handle = BatchWorker::spawn(service(0.5), Vec::new(), 4);
        let (scored, summary) = collect(&handle);
        assert!(scored.is_empty());
        assert_eq!(summary, Some(BatchSummary::new()));
    }
}
