// ABOUTME: Editing session state owned by a single controller
// ABOUTME: Debounced autosave, counter refresh and chrome visibility with injected time

use crate::format::{active_styles, apply_format, ActiveStyles, FormatCommand, Selection, UrlPrompt};
use crate::node::{NodePath, RichNode};
use crate::storage::{KeyValueStore, Library};
use crate::util::{count, Counter};
use crate::Result;
use chrono::Utc;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_millis(1500);

/// Cancel-and-reschedule timer: only the latest schedule counts.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Clears and returns true once the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub settle: Duration,
    pub chrome: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            settle: DEFAULT_WINDOW,
            chrome: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Saved { id: String, counter: Counter },
    SaveFailed { id: String, error: String },
    ChromeShown,
}

pub struct Session<S> {
    library: Library<S>,
    doc_id: String,
    content: Vec<RichNode>,
    counter: Counter,
    typing: bool,
    chrome_visible: bool,
    settle: Debouncer,
    chrome: Debouncer,
}

impl<S: KeyValueStore> Session<S> {
    /// Opens the current document, creating one if the library has none.
    pub fn open(mut library: Library<S>, config: SessionConfig) -> Result<Self> {
        let doc_id = library.ensure_current(Utc::now())?;
        let content = library.get(&doc_id)?.content.clone();
        let counter = count(&content);

        Ok(Session {
            library,
            doc_id,
            content,
            counter,
            typing: false,
            chrome_visible: true,
            settle: Debouncer::new(config.settle),
            chrome: Debouncer::new(config.chrome),
        })
    }

    pub fn library(&self) -> &Library<S> {
        &self.library
    }

    pub fn document_id(&self) -> &str {
        &self.doc_id
    }

    pub fn content(&self) -> &[RichNode] {
        &self.content
    }

    pub fn counter(&self) -> Counter {
        self.counter
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn chrome_visible(&self) -> bool {
        self.chrome_visible
    }

    /// Earliest pending deadline, for callers driving [`Session::tick`].
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.settle.deadline(), self.chrome.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Records an edit. Saving waits until input settles.
    pub fn input(&mut self, content: Vec<RichNode>, now: Instant) {
        self.content = content;
        self.typing = true;
        self.chrome_visible = false;
        self.settle.schedule(now);
        self.chrome.schedule(now);
    }

    /// Fires any due timers.
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if self.settle.fire(now) {
            self.typing = false;
            events.push(self.autosave());
        }
        if self.chrome.fire(now) {
            self.chrome_visible = true;
            events.push(SessionEvent::ChromeShown);
        }

        events
    }

    fn autosave(&mut self) -> SessionEvent {
        match self.save() {
            Ok(()) => SessionEvent::Saved {
                id: self.doc_id.clone(),
                counter: self.counter,
            },
            Err(e) => {
                tracing::warn!(id = %self.doc_id, error = %e, "autosave failed");
                SessionEvent::SaveFailed {
                    id: self.doc_id.clone(),
                    error: e.to_string(),
                }
            }
        }
    }

    fn save(&mut self) -> Result<()> {
        self.counter = count(&self.content);
        self.library
            .save_content(&self.doc_id, self.content.clone(), Utc::now())
    }

    /// Saves a pending edit right away.
    pub fn flush(&mut self) -> Result<()> {
        if self.settle.is_pending() {
            self.settle.cancel();
            self.typing = false;
            self.save()?;
        }
        Ok(())
    }

    pub fn active_styles(&self, anchor: &NodePath) -> ActiveStyles {
        active_styles(&self.content, anchor)
    }

    /// Formats the live content and saves immediately when it changed.
    pub fn apply_format(
        &mut self,
        selection: &Selection,
        command: FormatCommand,
        prompt: &mut dyn UrlPrompt,
    ) -> Result<bool> {
        if !apply_format(&mut self.content, selection, command, prompt) {
            return Ok(false);
        }
        tracing::debug!(id = %self.doc_id, ?command, "applied format");
        self.settle.cancel();
        self.save()?;
        Ok(true)
    }

    pub fn switch_to(&mut self, id: &str) -> Result<()> {
        self.flush()?;
        self.library.set_current(id)?;
        self.load(id.to_string())
    }

    pub fn new_document(&mut self) -> Result<String> {
        self.flush()?;
        let id = self.library.create_document(Utc::now())?;
        self.load(id.clone())?;
        Ok(id)
    }

    fn load(&mut self, id: String) -> Result<()> {
        self.content = self.library.get(&id)?.content.clone();
        self.counter = count(&self.content);
        self.doc_id = id;
        Ok(())
    }
}
