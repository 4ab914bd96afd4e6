//! Upward message channel.
//!
//! The perception layer never touches UI or audio directly. Anything a host
//! might want to show or speak goes through one callback; hosts that install
//! nothing still get the messages in the log.

use std::sync::Arc;

use vision::Quad;

/// One message to the host.
#[derive(Debug, Clone)]
pub enum Message {
    /// Informational text for the host's log pane.
    Log(String),
    /// Text the host should also narrate.
    Voice(String),
    /// Debug-overlay draw request: a named quad in screen pixels.
    Overlay { name: &'static str, quad: Quad },
}

/// Cheaply cloneable handle to the host callback.
#[derive(Clone)]
pub struct Reporter {
    sink: Option<Arc<dyn Fn(Message) + Send + Sync>>,
}

impl Reporter {
    pub fn new(sink: impl Fn(Message) + Send + Sync + 'static) -> Self {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    /// No host callback; messages still reach the log.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn log(&self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{text}");
        self.send(Message::Log(text));
    }

    pub fn voice(&self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{text}");
        self.send(Message::Voice(text));
    }

    pub fn overlay(&self, name: &'static str, quad: Quad) {
        self.send(Message::Overlay { name, quad });
    }

    fn send(&self, msg: Message) {
        if let Some(sink) = &self.sink {
            sink(msg);
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::disabled()
    }
}
