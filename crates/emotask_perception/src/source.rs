use anyhow::Result;
use async_trait::async_trait;
use emotask_limbic::{IngestEvent, IngestHandle, Lifeline};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[async_trait]
pub trait EventSource: Send + Sync {
    /// unique identifier for the source (e.g., "devices:/sys/bus/usb/devices")
    fn name(&self) -> &str;

    /// How often to poll.
    fn interval(&self) -> Duration;

    /// One-time subscription setup. Failing here disables this source only.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Events observed since the last poll
    async fn poll(&self) -> Result<Vec<IngestEvent>>;
}

pub struct SourceManager {
    sources: Mutex<Vec<Arc<dyn EventSource>>>,
}

impl SourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_source(&self, source: Arc<dyn EventSource>) {
        self.sources.lock().await.push(source);
    }

    /// One polling task per source, each forwarding into `ingest` until the
    /// lifeline is cut or the ingest queue closes.
    pub async fn spawn_all(&self, ingest: IngestHandle, lifeline: Lifeline) -> Vec<JoinHandle<()>> {
        let sources = self.sources.lock().await.clone();
        sources
            .into_iter()
            .map(|source| tokio::spawn(run_source(source, ingest.clone(), lifeline.clone())))
            .collect()
    }
}

impl Default for SourceManager {
    fn default() -> Self {
        Self {
            sources: Mutex::new(Vec::new()),
        }
    }
}

async fn run_source(source: Arc<dyn EventSource>, ingest: IngestHandle, lifeline: Lifeline) {
    let name = source.name().to_string();
    if let Err(e) = source.prepare().await {
        tracing::warn!("Event source {} disabled: {:#}", name, e);
        return;
    }
    tracing::info!("Event source {} active (every {:?})", name, source.interval());

    let mut ticker = tokio::time::interval(source.interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; prepare() already took the baseline.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = lifeline.stopped() => break,
        }
        let events = match source.poll().await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("Failed to poll event source {}: {:#}", name, e);
                continue;
            }
        };
        for event in events {
            if let Err(e) = ingest.notify(event) {
                tracing::debug!("Event source {} stopping: {}", name, e);
                return;
            }
        }
    }
    tracing::debug!("Event source {} stopped", name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotask_core::EmotionalState;
    use emotask_limbic::{ingest_channel, StateEngine};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        name: String,
        fail_prepare: bool,
        fail_every_other: bool,
        polls: AtomicUsize,
        emitted: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                fail_prepare: false,
                fail_every_other: false,
                polls: AtomicUsize::new(0),
                emitted: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EventSource for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        fn interval(&self) -> Duration {
            Duration::from_millis(100)
        }

        async fn prepare(&self) -> Result<()> {
            if self.fail_prepare {
                anyhow::bail!("subscription refused");
            }
            Ok(())
        }

        async fn poll(&self) -> Result<Vec<IngestEvent>> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if self.fail_every_other && n % 2 == 0 {
                anyhow::bail!("transient failure");
            }
            self.emitted.fetch_add(1, Ordering::SeqCst);
            Ok(vec![IngestEvent::ApplicationError])
        }
    }

    /// Engine with a running ingest consumer.
    fn consumer() -> (Arc<StateEngine>, IngestHandle, JoinHandle<()>, Lifeline) {
        let lifeline = Lifeline::new();
        let engine = Arc::new(StateEngine::new());
        let (handle, queue) = ingest_channel(64, lifeline.clone());
        let task = queue.spawn(Arc::clone(&engine), lifeline.clone());
        (engine, handle, task, lifeline)
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_prepare_disables_only_that_source() {
        let manager = SourceManager::new();
        let broken = Arc::new(Scripted {
            fail_prepare: true,
            ..Scripted::new("broken")
        });
        let healthy = Arc::new(Scripted::new("healthy"));
        manager.add_source(broken.clone()).await;
        manager.add_source(healthy.clone()).await;

        let (engine, handle, consumer, lifeline) = consumer();
        let tasks = manager.spawn_all(handle, lifeline.clone()).await;

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(broken.polls.load(Ordering::SeqCst), 0);
        assert_eq!(healthy.polls.load(Ordering::SeqCst), 3);
        assert_eq!(healthy.emitted.load(Ordering::SeqCst), 3);
        assert_eq!(engine.current_state(), EmotionalState::Grimace);

        lifeline.kill();
        for t in tasks {
            t.await.unwrap();
        }
        consumer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_do_not_stop_source() {
        let manager = SourceManager::new();
        let flaky = Arc::new(Scripted {
            fail_every_other: true,
            ..Scripted::new("flaky")
        });
        manager.add_source(flaky.clone()).await;

        let (engine, handle, consumer, lifeline) = consumer();
        let tasks = manager.spawn_all(handle, lifeline.clone()).await;
        tokio::time::sleep(Duration::from_millis(450)).await;

        assert_eq!(flaky.polls.load(Ordering::SeqCst), 4);
        assert_eq!(flaky.emitted.load(Ordering::SeqCst), 2);
        assert_eq!(engine.current_state(), EmotionalState::Grimace);

        lifeline.kill();
        for t in tasks {
            t.await.unwrap();
        }
        consumer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_stops_when_queue_closes() {
        let manager = SourceManager::new();
        manager.add_source(Arc::new(Scripted::new("orphan"))).await;
        let (handle, queue) = ingest_channel(4, Lifeline::new());
        drop(queue);
        let tasks = manager.spawn_all(handle, Lifeline::new()).await;
        for t in tasks {
            tokio::time::timeout(Duration::from_secs(1), t)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
