//! Rendering surface capability for the chart
//!
//! The chart never reaches for a global window or document. It is handed a
//! [`RenderSurface`] and holds it through a [`ChartMount`], which owns the
//! resize listener it registers and releases it on drop.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;
use tracing::{debug, warn};

use ag_backtest::ChartCanvas;

use crate::error::SimResult;

/// Handle of a registered resize listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Callback invoked with the new `(width, height)` in pixels
pub type ResizeListener = Box<dyn Fn(f64, f64) + Send + Sync>;

/// Host drawing surface (browser document, headless renderer, ...)
pub trait RenderSurface: Send + Sync {
    /// Serialized SVG of the mounted chart node, `None` when not mounted
    fn chart_svg(&self) -> Option<String>;

    /// Rasterize an SVG document into PNG bytes
    fn rasterize(&self, svg: &str, width: u32, height: u32) -> SimResult<Vec<u8>>;

    /// Register a resize listener
    fn add_resize_listener(&self, listener: ResizeListener) -> ListenerId;

    /// Remove a previously registered listener
    fn remove_resize_listener(&self, id: ListenerId);
}

/// Chart attached to a surface for the lifetime of the view
pub struct ChartMount<S: RenderSurface + ?Sized> {
    surface: Arc<S>,
    canvas: Arc<Mutex<ChartCanvas>>,
    listener: Option<ListenerId>,
}

impl<S: RenderSurface + ?Sized> ChartMount<S> {
    /// Attach to `surface`, tracking its size
    ///
    /// Resizes keep the canvas padding; sizes too small for it are ignored.
    pub fn acquire(surface: Arc<S>, canvas: ChartCanvas) -> Self {
        let shared = Arc::new(Mutex::new(canvas));
        let target = Arc::clone(&shared);

        let listener = surface.add_resize_listener(Box::new(move |width, height| {
            let mut canvas = target.lock();
            match ChartCanvas::new(width, height, canvas.padding()) {
                Ok(resized) => *canvas = resized,
                Err(e) => debug!(error = %e, "Ignoring resize"),
            }
        }));

        debug!(listener = listener.0, "Chart mounted");

        Self {
            surface,
            canvas: shared,
            listener: Some(listener),
        }
    }

    /// Current canvas
    pub fn canvas(&self) -> ChartCanvas {
        *self.canvas.lock()
    }

    /// PNG bytes of the chart, `None` when no chart node is mounted
    pub fn export_png(&self) -> SimResult<Option<Vec<u8>>> {
        let Some(svg) = self.surface.chart_svg() else {
            warn!("PNG export requested without a mounted chart");
            return Ok(None);
        };

        let canvas = self.canvas();
        let png = self.surface.rasterize(
            &svg,
            canvas.width().round() as u32,
            canvas.height().round() as u32,
        )?;
        Ok(Some(png))
    }

    /// PNG export as a `data:` URL for download links
    pub fn export_png_data_url(&self) -> SimResult<Option<String>> {
        Ok(self
            .export_png()?
            .map(|png| format!("data:image/png;base64,{}", STANDARD.encode(png))))
    }

    /// Detach explicitly; dropping the mount does the same
    pub fn release(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(id) = self.listener.take() {
            self.surface.remove_resize_listener(id);
            debug!(listener = id.0, "Chart unmounted");
        }
    }
}

impl<S: RenderSurface + ?Sized> Drop for ChartMount<S> {
    fn drop(&mut self) {
        self.detach();
    }
}
