use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Button {
    /// Shoulder trigger held to arm the accept chord.
    Modifier,
    Confirm,
    Cancel,
}

/// Button state for one host frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonFrame {
    held: BTreeSet<Button>,
    pressed: BTreeSet<Button>,
}

impl ButtonFrame {
    pub fn hold(mut self, button: Button) -> Self {
        self.held.insert(button);
        self
    }

    /// Marks `button` as pressed on this frame (which also counts as held).
    pub fn press(mut self, button: Button) -> Self {
        self.pressed.insert(button);
        self.held.insert(button);
        self
    }

    pub fn is_held(&self, button: Button) -> bool {
        self.held.contains(&button)
    }

    pub fn just_pressed(&self, button: Button) -> bool {
        self.pressed.contains(&button)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Accept,
    Cancel,
}

pub fn map_triggers(buttons: &ButtonFrame) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    if buttons.is_held(Button::Modifier) && buttons.just_pressed(Button::Confirm) {
        triggers.push(Trigger::Accept);
    }
    if buttons.just_pressed(Button::Cancel) {
        triggers.push(Trigger::Cancel);
    }
    triggers
}

/// Scripted button presses keyed by host frame.
#[derive(Debug, Clone, Default)]
pub struct InputScript {
    frames: BTreeMap<u32, ButtonFrame>,
}

impl InputScript {
    pub fn new(accept_at: &[u32], cancel_at: &[u32]) -> Self {
        let mut script = Self::default();
        for frame in accept_at {
            script.update(*frame, |buttons| {
                buttons.hold(Button::Modifier).press(Button::Confirm)
            });
        }
        for frame in cancel_at {
            script.update(*frame, |buttons| buttons.press(Button::Cancel));
        }
        script
    }

    fn update(&mut self, frame: u32, apply: impl FnOnce(ButtonFrame) -> ButtonFrame) {
        let entry = self.frames.entry(frame).or_default();
        *entry = apply(std::mem::take(entry));
    }

    pub fn buttons(&self, frame: u32) -> ButtonFrame {
        self.frames.get(&frame).cloned().unwrap_or_default()
    }
}
