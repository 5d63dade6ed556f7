//! GPU Test Controller
//!
//! Drives the surface-gated GPU benchmark:
//!
//! ```text
//! bind() ──► deregister previous session ──► arm handshake on surface
//!                                                  │
//!                     surface already valid ───────┤ (fires immediately)
//!                     mark_valid() later ──────────┘
//!                                                  ▼
//!                              GPU worker thread: kernel.run(surface, fps)
//!                                  │  fps notifications ─► listener (current session only)
//!                                  ▼
//!                              GpuOutcome ─► completion context ─► on_done
//! ```
//!
//! The listener registration and the current session token live behind one
//! lock. Notifications are delivered while holding it and `bind()` takes it to
//! switch sessions, so once `bind()` returns no notification from an older
//! session can reach any listener.

use crate::context::CompletionContext;
use crate::kernel::{KernelError, panic_message};
use crate::session::SessionToken;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use tracing::{debug, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─── Surface ─────────────────────────────────────────────────────────────────

enum Readiness {
    Ready,
    Cancelled,
}

struct PendingHandshake {
    session: SessionToken,
    callback: Box<dyn FnOnce(Readiness) + Send>,
}

struct SurfaceState {
    valid: bool,
    pending: Option<PendingHandshake>,
}

/// Render target the GPU kernel draws into.
///
/// Validity is driven by the platform (window created, resized, destroyed).
/// At most one handshake is armed on a surface at a time.
pub struct RenderSurface {
    label: String,
    state: Mutex<SurfaceState>,
}

impl RenderSurface {
    /// A surface that is not yet valid
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Self::with_validity(label, false)
    }

    /// An off-screen surface that is valid from creation
    pub fn headless(label: impl Into<String>) -> Arc<Self> {
        Self::with_validity(label, true)
    }

    fn with_validity(label: impl Into<String>, valid: bool) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            state: Mutex::new(SurfaceState {
                valid,
                pending: None,
            }),
        })
    }

    /// Human-readable surface name
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the surface can currently be rendered to
    pub fn is_valid(&self) -> bool {
        lock(&self.state).valid
    }

    /// Mark the surface valid and fire the armed handshake, if any
    pub fn mark_valid(&self) {
        let pending = {
            let mut state = lock(&self.state);
            state.valid = true;
            state.pending.take()
        };
        if let Some(pending) = pending {
            debug!(surface = %self.label, session = %pending.session, "surface ready");
            (pending.callback)(Readiness::Ready);
        }
    }

    /// Mark the surface invalid. An armed handshake stays armed.
    pub fn invalidate(&self) {
        lock(&self.state).valid = false;
    }

    /// Arm a handshake; fires immediately when the surface is already valid.
    fn arm(&self, session: SessionToken, callback: Box<dyn FnOnce(Readiness) + Send>) {
        let (fire_now, replaced) = {
            let mut state = lock(&self.state);
            if state.valid {
                (Some(callback), None)
            } else {
                let replaced = state.pending.replace(PendingHandshake { session, callback });
                (None, replaced)
            }
        };
        if let Some(replaced) = replaced {
            (replaced.callback)(Readiness::Cancelled);
        }
        if let Some(callback) = fire_now {
            callback(Readiness::Ready);
        }
    }

    /// Cancel the handshake armed for `session`, if it has not fired yet
    fn disarm(&self, session: SessionToken) {
        let pending = {
            let mut state = lock(&self.state);
            match &state.pending {
                Some(p) if p.session == session => state.pending.take(),
                _ => None,
            }
        };
        if let Some(pending) = pending {
            (pending.callback)(Readiness::Cancelled);
        }
    }
}

impl std::fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSurface")
            .field("label", &self.label)
            .field("valid", &self.is_valid())
            .finish()
    }
}

// ─── Listener / kernel ───────────────────────────────────────────────────────

/// Receives live FPS values during a GPU session.
///
/// Called while the controller's registration lock is held: implementations
/// must not call back into the controller.
pub trait FpsListener: Send + Sync {
    /// One FPS reading (0 means "not yet measured")
    fn on_fps(&self, session: SessionToken, fps: u32);
}

impl<F> FpsListener for F
where
    F: Fn(SessionToken, u32) + Send + Sync,
{
    fn on_fps(&self, session: SessionToken, fps: u32) {
        self(session, fps)
    }
}

/// Handle the GPU kernel uses to publish FPS readings for its own session
pub struct FpsReporter {
    session: SessionToken,
    shared: Arc<Mutex<Registration>>,
}

impl FpsReporter {
    /// Session this reporter belongs to
    pub fn session(&self) -> SessionToken {
        self.session
    }

    /// Forward a reading to the listener if this session is still current.
    /// Returns whether it was delivered.
    pub fn report(&self, fps: u32) -> bool {
        let registration = lock(&self.shared);
        match (&registration.session, &registration.listener) {
            (Some(current), Some(listener)) if *current == self.session => {
                listener.on_fps(self.session, fps);
                true
            }
            _ => false,
        }
    }
}

/// Blocking GPU benchmark bound to a render surface
pub trait GpuKernel: Send + Sync {
    /// Render until done and return the GPU score
    fn run(&self, surface: &RenderSurface, fps: &FpsReporter) -> Result<f64, KernelError>;
}

impl<F> GpuKernel for F
where
    F: Fn(&RenderSurface, &FpsReporter) -> Result<f64, KernelError> + Send + Sync,
{
    fn run(&self, surface: &RenderSurface, fps: &FpsReporter) -> Result<f64, KernelError> {
        self(surface, fps)
    }
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuState {
    /// No session registered
    Idle,
    /// Waiting for the surface to become valid
    Armed(SessionToken),
    /// Kernel call in flight
    Running(SessionToken),
}

/// Final outcome of one GPU session, delivered exactly once
#[derive(Debug, Clone, PartialEq)]
pub enum GpuOutcome {
    /// Kernel finished and produced a score
    Completed {
        /// Session the score belongs to
        session: SessionToken,
        /// GPU score
        score: f64,
    },
    /// Session ended without a score
    Aborted {
        /// Session that was aborted
        session: SessionToken,
        /// What went wrong
        reason: String,
    },
}

impl GpuOutcome {
    /// Session this outcome belongs to
    pub fn session(&self) -> SessionToken {
        match self {
            GpuOutcome::Completed { session, .. } | GpuOutcome::Aborted { session, .. } => *session,
        }
    }

    /// Score, when the session completed
    pub fn score(&self) -> Option<f64> {
        match self {
            GpuOutcome::Completed { score, .. } => Some(*score),
            GpuOutcome::Aborted { .. } => None,
        }
    }
}

struct Registration {
    session: Option<SessionToken>,
    listener: Option<Arc<dyn FpsListener>>,
    surface: Option<Arc<RenderSurface>>,
    state: GpuState,
}

type DoneSlot = Arc<Mutex<Option<Box<dyn FnOnce(GpuOutcome) + Send>>>>;

fn deliver(slot: &DoneSlot, context: &Arc<dyn CompletionContext>, outcome: GpuOutcome) {
    if let Some(on_done) = lock(slot).take() {
        context.dispatch(Box::new(move || on_done(outcome)));
    }
}

/// Surface-gated GPU benchmark driver
pub struct GpuTestController {
    kernel: Arc<dyn GpuKernel>,
    context: Arc<dyn CompletionContext>,
    shared: Arc<Mutex<Registration>>,
}

impl GpuTestController {
    /// Create a controller delivering outcomes on `context`
    pub fn new(kernel: Arc<dyn GpuKernel>, context: Arc<dyn CompletionContext>) -> Self {
        Self {
            kernel,
            context,
            shared: Arc::new(Mutex::new(Registration {
                session: None,
                listener: None,
                surface: None,
                state: GpuState::Idle,
            })),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> GpuState {
        lock(&self.shared).state
    }

    /// Session whose notifications are currently delivered
    pub fn current_session(&self) -> Option<SessionToken> {
        lock(&self.shared).session
    }

    /// Start a new GPU session on `surface`.
    ///
    /// Any previous listener is deregistered before the new handshake is armed.
    /// If the surface is already valid the kernel starts immediately on a
    /// worker thread; otherwise it starts when [`RenderSurface::mark_valid`] is
    /// called. `on_done` runs exactly once on the controller's completion context.
    pub fn bind<F>(
        &self,
        surface: &Arc<RenderSurface>,
        listener: Arc<dyn FpsListener>,
        on_done: F,
    ) -> SessionToken
    where
        F: FnOnce(GpuOutcome) + Send + 'static,
    {
        let session = SessionToken::next();

        let previous = {
            let mut registration = lock(&self.shared);
            let previous = registration.session.zip(registration.surface.take());
            registration.session = Some(session);
            registration.listener = Some(listener);
            registration.surface = Some(Arc::clone(surface));
            registration.state = GpuState::Armed(session);
            previous
        };
        if let Some((old_session, old_surface)) = previous {
            debug!(old = %old_session, new = %session, "previous GPU session deregistered");
            old_surface.disarm(old_session);
        }

        info!(%session, surface = %surface.label(), "GPU handshake armed");

        let done: DoneSlot = Arc::new(Mutex::new(Some(Box::new(on_done))));
        let kernel = Arc::clone(&self.kernel);
        let context = Arc::clone(&self.context);
        let shared = Arc::clone(&self.shared);
        let target = Arc::clone(surface);

        surface.arm(
            session,
            Box::new(move |readiness| match readiness {
                Readiness::Ready => launch(kernel, context, shared, target, session, done),
                Readiness::Cancelled => {
                    deliver(
                        &done,
                        &context,
                        GpuOutcome::Aborted {
                            session,
                            reason: "session superseded before the surface became ready"
                                .to_string(),
                        },
                    );
                }
            }),
        );

        session
    }

    /// Deregister the current listener and disarm a pending handshake.
    ///
    /// A kernel call already in flight cannot be interrupted; it runs to
    /// completion with its notifications suppressed.
    pub fn reset(&self) {
        let previous = {
            let mut registration = lock(&self.shared);
            let previous = registration.session.take().zip(registration.surface.take());
            registration.listener = None;
            registration.state = GpuState::Idle;
            previous
        };
        if let Some((session, surface)) = previous {
            debug!(%session, "GPU controller reset");
            surface.disarm(session);
        }
    }
}

impl std::fmt::Debug for GpuTestController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTestController")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn launch(
    kernel: Arc<dyn GpuKernel>,
    context: Arc<dyn CompletionContext>,
    shared: Arc<Mutex<Registration>>,
    surface: Arc<RenderSurface>,
    session: SessionToken,
    done: DoneSlot,
) {
    {
        let mut registration = lock(&shared);
        if registration.session != Some(session) {
            drop(registration);
            deliver(
                &done,
                &context,
                GpuOutcome::Aborted {
                    session,
                    reason: "session superseded before the kernel started".to_string(),
                },
            );
            return;
        }
        registration.state = GpuState::Running(session);
    }

    let worker_done = Arc::clone(&done);
    let worker_context = Arc::clone(&context);
    let worker_shared = Arc::clone(&shared);
    let spawned = thread::Builder::new()
        .name("performic-gpu".to_string())
        .spawn(move || {
            let outcome = run_session(kernel.as_ref(), &surface, session, &worker_shared);
            release(&worker_shared, session);
            deliver(&worker_done, &worker_context, outcome);
        });

    if let Err(e) = spawned {
        warn!(%session, error = %e, "failed to spawn GPU worker");
        release(&shared, session);
        deliver(
            &done,
            &context,
            GpuOutcome::Aborted {
                session,
                reason: format!("failed to spawn GPU worker: {}", e),
            },
        );
    }
}

fn run_session(
    kernel: &dyn GpuKernel,
    surface: &RenderSurface,
    session: SessionToken,
    shared: &Arc<Mutex<Registration>>,
) -> GpuOutcome {
    let reporter = FpsReporter {
        session,
        shared: Arc::clone(shared),
    };

    info!(%session, surface = %surface.label(), "GPU kernel started");
    let outcome = catch_unwind(AssertUnwindSafe(|| kernel.run(surface, &reporter)));

    match outcome {
        Ok(Ok(score)) if score.is_finite() && score >= 0.0 => {
            info!(%session, score, "GPU kernel completed");
            GpuOutcome::Completed { session, score }
        }
        Ok(Ok(score)) => {
            warn!(%session, score, "GPU kernel returned an invalid score");
            GpuOutcome::Aborted {
                session,
                reason: format!("GPU kernel returned invalid score {}", score),
            }
        }
        Ok(Err(e)) => {
            warn!(%session, error = %e, "GPU kernel failed");
            GpuOutcome::Aborted {
                session,
                reason: e.to_string(),
            }
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(%session, %message, "GPU kernel panicked");
            GpuOutcome::Aborted {
                session,
                reason: format!("GPU kernel panicked: {}", message),
            }
        }
    }
}

/// Return the controller to idle if `session` is still the current one
fn release(shared: &Mutex<Registration>, session: SessionToken) {
    let mut registration = lock(shared);
    if registration.session == Some(session) {
        registration.session = None;
        registration.listener = None;
        registration.surface = None;
        registration.state = GpuState::Idle;
    }
}
