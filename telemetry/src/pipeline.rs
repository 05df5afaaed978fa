use crate::capture::CaptureSource;
use crate::capture::ExplicitReport;
use crate::config::TelemetryConfig;
use crate::context::Clock;
use crate::context::PageContext;
use crate::context::SystemClock;
use crate::error::Result;
use crate::record::ErrorRecord;
use crate::stack::StackCapture;
use crate::stack::probe_stack_capture;
use clientkit_transport::HttpTransport;
use clientkit_transport::Request;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::Weak;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use url::Url;

/// Buffers captured errors and ships them to the report endpoint in batches.
///
/// Cloning is cheap and every clone feeds the same buffer. Capture paths
/// ([`Self::capture`], [`Self::report_error`], [`Self::enqueue`]) are
/// synchronous and never fail; network work happens on spawned tasks.
#[derive(Clone)]
pub struct TelemetryPipeline {
    inner: Arc<PipelineInner>,
}

/// A pipeline handle that does not keep the pipeline alive.
#[derive(Clone)]
pub(crate) struct WeakPipeline {
    inner: Weak<PipelineInner>,
}

impl WeakPipeline {
    pub(crate) fn upgrade(&self) -> Option<TelemetryPipeline> {
        self.inner.upgrade().map(|inner| TelemetryPipeline { inner })
    }
}

pub struct TelemetryPipelineBuilder {
    config: TelemetryConfig,
    transport: Arc<dyn HttpTransport>,
    page: Arc<dyn PageContext>,
    clock: Arc<dyn Clock>,
    stack: Option<Arc<dyn StackCapture>>,
}

impl TelemetryPipelineBuilder {
    pub fn config(mut self, config: TelemetryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Forces a stack strategy instead of probing for one.
    pub fn stack_capture(mut self, stack: Arc<dyn StackCapture>) -> Self {
        self.stack = Some(stack);
        self
    }

    /// Must be called from within a tokio runtime; the pipeline spawns its
    /// timers and deliveries there.
    pub fn build(self) -> Result<TelemetryPipeline> {
        let runtime = Handle::try_current()?;
        let stack = self
            .stack
            .unwrap_or_else(|| probe_stack_capture(self.config.max_stack_frames));
        tracing::debug!(?stack, endpoint = %self.config.endpoint, "Telemetry pipeline ready");
        Ok(TelemetryPipeline {
            inner: Arc::new(PipelineInner {
                config: self.config,
                transport: self.transport,
                page: self.page,
                clock: self.clock,
                stack,
                runtime,
                deliveries: TaskTracker::new(),
                state: Mutex::new(PipelineState::default()),
            }),
        })
    }
}

struct PipelineInner {
    config: TelemetryConfig,
    transport: Arc<dyn HttpTransport>,
    page: Arc<dyn PageContext>,
    clock: Arc<dyn Clock>,
    stack: Arc<dyn StackCapture>,
    runtime: Handle,
    deliveries: TaskTracker,
    state: Mutex<PipelineState>,
}

#[derive(Default)]
struct PipelineState {
    buffer: VecDeque<ErrorRecord>,
    debounce: Option<JoinHandle<()>>,
}

impl TelemetryPipeline {
    pub fn builder(
        transport: Arc<dyn HttpTransport>,
        page: Arc<dyn PageContext>,
    ) -> TelemetryPipelineBuilder {
        TelemetryPipelineBuilder {
            config: TelemetryConfig::default(),
            transport,
            page,
            clock: Arc::new(SystemClock),
            stack: None,
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.inner.config
    }

    pub(crate) fn downgrade(&self) -> WeakPipeline {
        WeakPipeline {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Turns `source` into a record, taking a stack trace now if the source
    /// has none, and enqueues it.
    pub fn capture(&self, source: impl CaptureSource) {
        let record = source.into_record(self.inner.stack.as_ref());
        self.enqueue(record);
    }

    pub fn report_error(&self, report: ExplicitReport) {
        self.capture(report);
    }

    /// Appends `record` after filling in its capture defaults.
    ///
    /// A buffer that grows past the batch size is flushed before this
    /// returns. Any non-empty buffer (re)arms the debounce timer.
    pub fn enqueue(&self, mut record: ErrorRecord) {
        let inner = &self.inner;
        record.normalize(
            || inner.clock.now_millis(),
            || inner.page.current_url(),
            inner.page.is_authenticated(),
        );

        let overflow = {
            let mut state = inner.lock_state();
            state.buffer.push_back(record);
            if state.buffer.len() > inner.config.effective_batch_size() {
                Some(inner.take_batch(&mut state))
            } else {
                None
            }
        };
        if let Some(batch) = overflow {
            PipelineInner::spawn_delivery(inner, batch);
        }

        self.rearm_debounce();
    }

    /// Removes up to one batch from the head of the buffer and starts
    /// delivering it. Returns `false` when the buffer was already empty.
    pub fn flush(&self) -> bool {
        let batch = {
            let mut state = self.inner.lock_state();
            self.inner.take_batch(&mut state)
        };
        if batch.is_empty() {
            return false;
        }
        PipelineInner::spawn_delivery(&self.inner, batch);
        true
    }

    /// Flushes batch after batch until the buffer is empty.
    pub fn flush_all(&self) {
        while self.flush() {}
    }

    pub fn pending(&self) -> usize {
        self.inner.lock_state().buffer.len()
    }

    /// Waits for every delivery started so far, fallbacks included.
    pub async fn wait_idle(&self) {
        let deliveries = &self.inner.deliveries;
        deliveries.close();
        deliveries.wait().await;
        deliveries.reopen();
    }

    /// Teardown: cancels the debounce timer, lets deliveries in progress
    /// finish, then delivers the whole buffer batch by batch.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        if let Some(timer) = inner.lock_state().debounce.take() {
            timer.abort();
        }
        self.wait_idle().await;
        loop {
            let batch = {
                let mut state = inner.lock_state();
                inner.take_batch(&mut state)
            };
            if batch.is_empty() {
                break;
            }
            inner.deliver(batch).await;
        }
        self.wait_idle().await;
    }

    fn rearm_debounce(&self) {
        let inner = &self.inner;
        let mut state = inner.lock_state();
        if state.buffer.is_empty() {
            return;
        }
        if let Some(previous) = state.debounce.take() {
            previous.abort();
        }

        let weak: Weak<PipelineInner> = Arc::downgrade(inner);
        let hold = inner.config.hold_duration();
        state.debounce = Some(inner.runtime.spawn(async move {
            tokio::time::sleep(hold).await;
            if let Some(inner) = weak.upgrade() {
                tracing::debug!("Error report hold time elapsed; flushing buffer");
                TelemetryPipeline { inner }.flush_all();
            }
        }));
    }
}

impl PipelineInner {
    fn lock_state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_batch(&self, state: &mut PipelineState) -> Vec<ErrorRecord> {
        let count = state.buffer.len().min(self.config.effective_batch_size());
        state.buffer.drain(..count).collect()
    }

    fn spawn_delivery(inner: &Arc<Self>, batch: Vec<ErrorRecord>) {
        let task_inner = Arc::clone(inner);
        inner
            .deliveries
            .spawn_on(async move { task_inner.deliver(batch).await }, &inner.runtime);
    }

    fn report_endpoint(&self) -> String {
        let endpoint = &self.config.endpoint;
        match Url::parse(&self.page.current_url()).and_then(|base| base.join(endpoint)) {
            Ok(url) => url.to_string(),
            Err(_) => endpoint.clone(),
        }
    }

    /// Posts `batch` as one request; on any failure falls back to one GET
    /// per record. Fallback failures are dropped.
    async fn deliver(&self, batch: Vec<ErrorRecord>) {
        let endpoint = self.report_endpoint();
        let count = batch.len();
        let request = Request::post(endpoint.clone()).with_json(&batch);
        let failure = match self.transport.execute(request).await {
            Ok(response) => match response.json::<Value>() {
                Ok(_) => None,
                Err(err) => Some(format!("malformed response: {err}")),
            },
            Err(err) => Some(err.to_string()),
        };
        let Some(failure) = failure else {
            tracing::trace!(count, "Delivered error report batch");
            return;
        };

        tracing::debug!(
            count,
            error = %failure,
            "Error report batch failed; falling back to per-record delivery"
        );
        for record in batch {
            let Some(url) = record.fallback_url(&endpoint) else {
                continue;
            };
            if let Err(err) = self.transport.execute(Request::get(url)).await {
                tracing::trace!(error = %err, "Dropping undeliverable error report");
            }
        }
    }
}
