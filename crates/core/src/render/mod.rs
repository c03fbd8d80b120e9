use std::sync::{Arc, Mutex, PoisonError};

use crate::VisualParams;

/// Consumption contract of the drawing backend.
///
/// The core never owns a graphics context. Embedders implement this trait;
/// the session hands it the latest parameter set once per animation tick
/// and forwards viewport size changes.
pub trait RenderSurface {
    /// Draws one frame using the given parameters.
    fn draw(&mut self, params: &VisualParams);
    /// Reacts to a viewport size change.
    fn resize(&mut self, width: u32, height: u32);
}

/// Surface that draws nothing. Used for headless runs and as the test spy:
/// it records what it was asked to do.
#[derive(Debug, Default)]
pub struct NullSurface {
    pub draw_count: usize,
    pub last_params: Option<VisualParams>,
    pub last_size: Option<(u32, u32)>,
}

impl NullSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSurface for NullSurface {
    fn draw(&mut self, params: &VisualParams) {
        self.draw_count += 1;
        self.last_params = Some(*params);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.last_size = Some((width, height));
    }
}

/// Identifier of one registered resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Stand-in for the host's viewport-resize notifications.
///
/// The window host owns a bus and calls [`ResizeBus::notify`]; sessions
/// register on initialize and must unregister exactly once on dispose.
/// Handles are cheap clones of the same registry.
#[derive(Clone, Default)]
pub struct ResizeBus {
    inner: Arc<Mutex<BusInner>>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<(ListenerId, Box<dyn FnMut(u32, u32) + Send>)>,
}

impl ResizeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: impl FnMut(u32, u32) + Send + 'static) -> ListenerId {
        let mut inner = self.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Unknown or already-removed ids are a no-op, so
    /// teardown paths may call this unconditionally.
    pub fn unregister(&self, id: ListenerId) {
        let mut inner = self.lock();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    pub fn notify(&self, width: u32, height: u32) {
        let mut inner = self.lock();
        for (_, listener) in inner.listeners.iter_mut() {
            listener(width, height);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        // A listener that panicked mid-notify must not wedge the registry.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ResizeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResizeBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
