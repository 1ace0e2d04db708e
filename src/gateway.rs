use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{Result, TrocrError};
use crate::vision::{AnnotateResponse, Recognizer};

pub const DEFAULT_QUEUE_CAPACITY: usize = 5;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Time source for the worker's cooldown.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration) -> SleepFuture;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> SleepFuture {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    pub capacity: usize,
    pub cooldown: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

struct Job {
    image: Vec<u8>,
    submitted_at: Instant,
    reply: oneshot::Sender<anyhow::Result<AnnotateResponse>>,
}

/// Single-worker queue in front of the recognition provider.
///
/// The worker services one request at a time in FIFO order and sleeps for
/// the cooldown after every provider call, so calls are never closer than
/// one cooldown apart. Handles are cheap to clone; the worker stops once
/// every handle is dropped and the queue is drained.
#[derive(Clone)]
pub struct RecognitionGateway {
    sender: mpsc::Sender<Job>,
    config: GatewayConfig,
    clock: Arc<dyn Clock>,
    outstanding: Arc<AtomicUsize>,
}

impl std::fmt::Debug for RecognitionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionGateway")
            .field("config", &self.config)
            .field("outstanding", &self.outstanding.load(Ordering::SeqCst))
            .finish()
    }
}

impl RecognitionGateway {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(
        recognizer: Arc<dyn Recognizer>,
        config: GatewayConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let capacity = config.capacity.max(1);
        let config = GatewayConfig { capacity, ..config };
        let (sender, receiver) = mpsc::channel(capacity);
        let outstanding = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run_worker(
            receiver,
            recognizer,
            clock.clone(),
            config.cooldown,
            outstanding.clone(),
        ));
        Self {
            sender,
            config,
            clock,
            outstanding,
        }
    }

    pub fn config(&self) -> GatewayConfig {
        self.config
    }

    /// Enqueues an image without waiting. Fails with `QueueFull` when the
    /// queue already holds `capacity` requests.
    pub fn submit(&self, image: Vec<u8>) -> Result<PendingRecognition> {
        let (reply, receiver) = oneshot::channel();
        let job = Job {
            image,
            submitted_at: self.clock.now(),
            reply,
        };
        // Counted before the send: the worker may finish the job and release
        // its slot before `try_send` even returns.
        let position = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        if let Err(err) = self.sender.try_send(job) {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            return Err(match err {
                mpsc::error::TrySendError::Full(_) => TrocrError::QueueFull {
                    capacity: self.config.capacity,
                },
                mpsc::error::TrySendError::Closed(_) => TrocrError::GatewayClosed,
            });
        }

        let estimated_wait = wait_estimate(position, self.config.cooldown);
        debug!("recognition request queued at position {}", position);
        Ok(PendingRecognition {
            position,
            estimated_wait,
            receiver,
        })
    }

    /// Submits and waits for the provider's answer.
    pub async fn recognize(&self, image: Vec<u8>) -> Result<AnnotateResponse> {
        self.submit(image)?.resolve().await
    }
}

/// Advisory wait for a request at 1-based `position`, counting the request
/// currently being serviced. Only reported when something is ahead of it.
pub fn wait_estimate(position: usize, cooldown: Duration) -> Option<Duration> {
    if position <= 1 {
        return None;
    }
    let ahead = u32::try_from(position - 1).unwrap_or(u32::MAX);
    Some(cooldown.saturating_mul(ahead) + cooldown / 2)
}

/// A queued request. Dropping it abandons the result but not the slot.
#[derive(Debug)]
pub struct PendingRecognition {
    position: usize,
    estimated_wait: Option<Duration>,
    receiver: oneshot::Receiver<anyhow::Result<AnnotateResponse>>,
}

impl PendingRecognition {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn estimated_wait(&self) -> Option<Duration> {
        self.estimated_wait
    }

    pub async fn resolve(self) -> Result<AnnotateResponse> {
        match self.receiver.await {
            Ok(result) => Ok(result?),
            Err(_) => Err(TrocrError::GatewayClosed),
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Job>,
    recognizer: Arc<dyn Recognizer>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    outstanding: Arc<AtomicUsize>,
) {
    while let Some(job) = receiver.recv().await {
        // Nobody is waiting: no provider call, so no cooldown either.
        if job.reply.is_closed() {
            debug!("skipping abandoned recognition request");
            outstanding.fetch_sub(1, Ordering::SeqCst);
            continue;
        }

        let queued_for = clock.now().saturating_duration_since(job.submitted_at);
        info!(
            "calling recognition provider after {:.1}s in queue",
            queued_for.as_secs_f64()
        );
        let result = recognizer.annotate(job.image).await;
        if let Err(err) = &result {
            debug!("recognition provider failed: {}", err);
        }
        outstanding.fetch_sub(1, Ordering::SeqCst);
        if job.reply.send(result).is_err() {
            debug!("recognition result dropped: caller went away");
        }

        clock.sleep(cooldown).await;
    }
    debug!("recognition worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::RecognizeFuture;
    use std::sync::Mutex;

    const ROUND_TRIP: Duration = Duration::from_secs(1);

    #[derive(Default)]
    struct RecordingRecognizer {
        calls: Mutex<Vec<(Vec<u8>, Instant)>>,
    }

    impl RecordingRecognizer {
        fn calls(&self) -> Vec<(Vec<u8>, Instant)> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    impl Recognizer for RecordingRecognizer {
        fn annotate(&self, image: Vec<u8>) -> RecognizeFuture {
            self.calls
                .lock()
                .expect("calls lock")
                .push((image, Instant::now()));
            Box::pin(async {
                tokio::time::sleep(ROUND_TRIP).await;
                Ok(AnnotateResponse::default())
            })
        }
    }

    struct FailingRecognizer;

    impl Recognizer for FailingRecognizer {
        fn annotate(&self, _image: Vec<u8>) -> RecognizeFuture {
            Box::pin(async { Err(anyhow::anyhow!("connection reset")) })
        }
    }

    fn gateway(recognizer: Arc<dyn Recognizer>, capacity: usize) -> RecognitionGateway {
        RecognitionGateway::start(
            recognizer,
            GatewayConfig {
                capacity,
                cooldown: Duration::from_secs(30),
            },
            Arc::new(TokioClock),
        )
    }

    // lets the worker pick up whatever is queued
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_waits_for_cooldown_and_third_is_rejected() {
        let recognizer = Arc::new(RecordingRecognizer::default());
        let gateway = gateway(recognizer.clone(), 1);
        let started = Instant::now();

        let first = gateway.submit(vec![1]).expect("first queued");
        settle().await;
        let second = gateway.submit(vec![2]).expect("second queued");
        let third = gateway.submit(vec![3]);
        assert!(matches!(third, Err(TrocrError::QueueFull { capacity: 1 })));

        first.resolve().await.expect("first result");
        assert!(started.elapsed() < Duration::from_secs(2));
        second.resolve().await.expect("second result");

        let calls = recognizer.calls();
        assert_eq!(calls.len(), 2);
        let gap = calls[1].1 - calls[0].1;
        assert!(gap >= ROUND_TRIP + Duration::from_secs(30), "gap was {:?}", gap);
        assert!(gap < ROUND_TRIP + Duration::from_secs(31), "gap was {:?}", gap);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_serviced_in_fifo_order() {
        let recognizer = Arc::new(RecordingRecognizer::default());
        let gateway = gateway(recognizer.clone(), 5);

        let pending: Vec<_> = (0u8..4)
            .map(|index| gateway.submit(vec![index]).expect("queued"))
            .collect();
        for request in pending {
            request.resolve().await.expect("result");
        }

        let order: Vec<u8> = recognizer.calls().iter().map(|(image, _)| image[0]).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_request_is_skipped_without_cooldown() {
        let recognizer = Arc::new(RecordingRecognizer::default());
        let gateway = gateway(recognizer.clone(), 2);

        let first = gateway.submit(vec![1]).expect("first queued");
        settle().await;
        drop(gateway.submit(vec![2]).expect("second queued"));
        let third = gateway.submit(vec![3]).expect("third queued");

        first.resolve().await.expect("first result");
        third.resolve().await.expect("third result");

        let calls = recognizer.calls();
        let images: Vec<u8> = calls.iter().map(|(image, _)| image[0]).collect();
        assert_eq!(images, vec![1, 3]);
        assert!(calls[1].1 - calls[0].1 < ROUND_TRIP + Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn provider_errors_reach_the_caller() {
        let gateway = gateway(Arc::new(FailingRecognizer), 1);
        let err = gateway.recognize(vec![0]).await.expect_err("provider error");
        assert_eq!(err.to_string(), "connection reset");
    }

    #[tokio::test(start_paused = true)]
    async fn position_and_wait_estimate_are_reported() {
        let recognizer = Arc::new(RecordingRecognizer::default());
        let gateway = gateway(recognizer, 5);

        let first = gateway.submit(vec![1]).expect("queued");
        let second = gateway.submit(vec![2]).expect("queued");
        let third = gateway.submit(vec![3]).expect("queued");
        assert_eq!(first.position(), 1);
        assert_eq!(first.estimated_wait(), None);
        assert_eq!(second.position(), 2);
        assert_eq!(second.estimated_wait(), Some(Duration::from_secs(45)));
        assert_eq!(third.estimated_wait(), Some(Duration::from_secs(75)));
    }

    struct InstantRecognizer;

    impl Recognizer for InstantRecognizer {
        fn annotate(&self, _image: Vec<u8>) -> RecognizeFuture {
            Box::pin(async { Err(anyhow::anyhow!("connection refused")) })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fast_worker_never_underflows_the_queue_position() {
        for _ in 0..500 {
            let gateway = RecognitionGateway::start(
                Arc::new(InstantRecognizer),
                GatewayConfig {
                    capacity: 5,
                    cooldown: Duration::ZERO,
                },
                Arc::new(TokioClock),
            );
            let pending = gateway.submit(vec![1]).expect("queued");
            assert_eq!(pending.position(), 1);
            assert_eq!(pending.estimated_wait(), None);
            pending.resolve().await.expect_err("provider error");
            let next = gateway.submit(vec![2]).expect("queued");
            assert_eq!(next.position(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_submit_does_not_take_a_position() {
        let recognizer = Arc::new(RecordingRecognizer::default());
        let gateway = gateway(recognizer, 1);

        let first = gateway.submit(vec![1]).expect("first queued");
        settle().await;
        let second = gateway.submit(vec![2]).expect("second queued");
        assert!(gateway.submit(vec![3]).is_err());
        assert_eq!(second.position(), 2);

        first.resolve().await.expect("first result");
        second.resolve().await.expect("second result");
        let next = gateway.submit(vec![4]).expect("queued again");
        assert_eq!(next.position(), 1);
    }

    #[test]
    fn wait_estimate_formula() {
        let cooldown = Duration::from_secs(30);
        assert_eq!(wait_estimate(0, cooldown), None);
        assert_eq!(wait_estimate(1, cooldown), None);
        assert_eq!(wait_estimate(4, cooldown), Some(Duration::from_secs(105)));
    }
}
