//! Draft buffer and single-file attachment for the message composer.

/// Draft text plus at most one pending attachment. Only the file name is
/// ever sent, as a `[File: name]` marker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputComposer {
    draft: String,
    attachment: Option<String>,
}

impl InputComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn attachment(&self) -> Option<&str> {
        self.attachment.as_deref()
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Replaces any previous attachment.
    pub fn attach(&mut self, file_name: impl Into<String>) {
        self.attachment = Some(file_name.into());
    }

    pub fn remove_attachment(&mut self) {
        self.attachment = None;
    }

    /// Append text produced by voice capture, separated by one space.
    pub fn append_transcript(&mut self, text: &str) {
        if !self.draft.is_empty() {
            self.draft.push(' ');
        }
        self.draft.push_str(text);
    }

    /// Enter inserts a newline with Shift held, otherwise submits.
    pub fn handle_enter(&mut self, shift: bool, disabled: bool) -> Option<String> {
        if shift {
            self.draft.push('\n');
            return None;
        }
        self.submit(disabled)
    }

    /// Compose the outgoing message and clear the composer. Returns `None`
    /// (leaving the composer untouched) when there is nothing to send or the
    /// owner has input disabled.
    pub fn submit(&mut self, disabled: bool) -> Option<String> {
        let text = self.draft.trim();
        if disabled || (text.is_empty() && self.attachment.is_none()) {
            return None;
        }
        let message = match &self.attachment {
            Some(name) if text.is_empty() => format!("[File: {name}]"),
            Some(name) => format!("{text} [File: {name}]"),
            None => text.to_owned(),
        };
        self.draft.clear();
        self.attachment = None;
        Some(message)
    }
}
