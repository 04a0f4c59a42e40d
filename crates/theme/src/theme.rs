//! Page-level entry point: wires the drawer and the product glue to one
//! context and routes every event to the right handler.

use std::sync::Arc;

use tokio::task::AbortHandle;
use tracing::debug;

use crate::config::ThemeConfig;
use crate::dom::Document;
use crate::drawer::CartDrawer;
use crate::error::Result;
use crate::events::{CartEvent, Outcome, UiEvent};
use crate::glue::PageGlue;
use crate::state::ThemeContext;

/// The cart layer of one page.
#[derive(Clone)]
pub struct Theme {
    ctx: ThemeContext,
    drawer: CartDrawer,
    glue: PageGlue,
    _listener: Option<Arc<Listener>>,
}

/// Stops the drawer's snapshot listener when the last handle goes away.
struct Listener(AbortHandle);

impl Drop for Listener {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Theme {
    /// Attach the cart layer to a page.
    ///
    /// Inside a Tokio runtime the drawer also follows snapshots published by
    /// other components while it is open.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart client cannot be built.
    pub fn new(config: ThemeConfig, document: Document) -> Result<Self> {
        let ctx = ThemeContext::new(config, document)?;
        let drawer = CartDrawer::new(ctx.clone());
        let glue = PageGlue::new(ctx.clone(), drawer.clone());

        let listener = tokio::runtime::Handle::try_current().ok().map(|runtime| {
            let task = runtime.spawn(drawer.clone().follow(ctx.subscribe()));
            Arc::new(Listener(task.abort_handle()))
        });
        if listener.is_none() {
            debug!("No runtime, drawer will not follow published snapshots");
        }

        Ok(Self {
            ctx,
            drawer,
            glue,
            _listener: listener,
        })
    }

    #[must_use]
    pub const fn context(&self) -> &ThemeContext {
        &self.ctx
    }

    #[must_use]
    pub const fn drawer(&self) -> &CartDrawer {
        &self.drawer
    }

    #[must_use]
    pub const fn glue(&self) -> &PageGlue {
        &self.glue
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        self.ctx.document()
    }

    /// Listen for cart snapshots.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<CartEvent> {
        self.ctx.subscribe()
    }

    /// Route an event to the handler owning its target.
    ///
    /// Keystroke-level input only updates the field; drawer controls go to
    /// the drawer and everything else to the page glue.
    pub async fn dispatch(&self, event: UiEvent) -> Outcome {
        let outcome = match &event {
            UiEvent::Input { target, value } => {
                self.document().set_value(target, value.as_str());
                Outcome::Ignored
            }
            UiEvent::KeyDown { .. } => self.drawer.handle(&event).await,
            UiEvent::Click { target } | UiEvent::Change { target, .. } => {
                match self.document().element(target) {
                    Some(element) if element.in_drawer => self.drawer.handle(&event).await,
                    Some(_) => self.glue.handle(&event).await,
                    None => Outcome::Ignored,
                }
            }
        };
        debug!(?event, ?outcome, "Dispatched event");
        outcome
    }
}
