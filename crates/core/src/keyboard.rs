use crate::TransportCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Space,
    MediaPlayPause,
    MediaTrackNext,
    MediaTrackPrevious,
    F7,
    F8,
    F9,
    ArrowLeft,
    ArrowRight,
    Other,
}

/// What currently holds keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    #[default]
    Document,
    TextInput,
    TextArea,
    ContentEditable,
}

impl FocusTarget {
    pub fn is_text_entry(self) -> bool {
        !matches!(self, Self::Document)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub code: KeyCode,
    pub shift: bool,
    pub focus: FocusTarget,
}

impl KeyPress {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            shift: false,
            focus: FocusTarget::Document,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn in_focus(mut self, focus: FocusTarget) -> Self {
        self.focus = focus;
        self
    }
}

/// Maps a key press onto a transport command. Nothing fires while the user
/// is typing.
pub fn shortcut_for(key: &KeyPress) -> Option<TransportCommand> {
    if key.focus.is_text_entry() {
        return None;
    }

    match key.code {
        KeyCode::Space | KeyCode::MediaPlayPause | KeyCode::F8 => {
            Some(TransportCommand::TogglePlayPause)
        }
        KeyCode::MediaTrackNext | KeyCode::F9 => Some(TransportCommand::Next),
        KeyCode::MediaTrackPrevious | KeyCode::F7 => Some(TransportCommand::Previous),
        KeyCode::ArrowRight if key.shift => Some(TransportCommand::Next),
        KeyCode::ArrowLeft if key.shift => Some(TransportCommand::Previous),
        _ => None,
    }
}

/// Subscription for global shortcuts, tied to the lifetime of the view that
/// owns it. Enabling an already enabled subscription is a no-op.
#[derive(Debug, Default)]
pub struct KeyboardShortcuts {
    enabled: bool,
}

impl KeyboardShortcuts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            tracing::debug!("keyboard shortcuts enabled");
        }
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        if self.enabled {
            tracing::debug!("keyboard shortcuts disabled");
        }
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolves a key press if the subscription is live.
    pub fn handle(&self, key: &KeyPress) -> Option<TransportCommand> {
        if !self.enabled {
            return None;
        }
        shortcut_for(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_keys_map_to_transport() {
        assert_eq!(
            shortcut_for(&KeyPress::new(KeyCode::Space)),
            Some(TransportCommand::TogglePlayPause)
        );
        assert_eq!(
            shortcut_for(&KeyPress::new(KeyCode::F9)),
            Some(TransportCommand::Next)
        );
        assert_eq!(
            shortcut_for(&KeyPress::new(KeyCode::MediaTrackPrevious)),
            Some(TransportCommand::Previous)
        );
    }

    #[test]
    fn arrows_need_shift() {
        assert_eq!(shortcut_for(&KeyPress::new(KeyCode::ArrowRight)), None);
        assert_eq!(
            shortcut_for(&KeyPress::new(KeyCode::ArrowRight).with_shift()),
            Some(TransportCommand::Next)
        );
        assert_eq!(
            shortcut_for(&KeyPress::new(KeyCode::ArrowLeft).with_shift()),
            Some(TransportCommand::Previous)
        );
    }

    #[test]
    fn typing_suppresses_shortcuts() {
        for focus in [
            FocusTarget::TextInput,
            FocusTarget::TextArea,
            FocusTarget::ContentEditable,
        ] {
            assert_eq!(shortcut_for(&KeyPress::new(KeyCode::Space).in_focus(focus)), None);
        }
    }

    #[test]
    fn disabled_subscription_ignores_keys() {
        let mut shortcuts = KeyboardShortcuts::new();
        let space = KeyPress::new(KeyCode::Space);
        assert_eq!(shortcuts.handle(&space), None);

        shortcuts.enable();
        shortcuts.enable();
        assert!(shortcuts.handle(&space).is_some());

        shortcuts.disable();
        assert_eq!(shortcuts.handle(&space), None);
    }
}
