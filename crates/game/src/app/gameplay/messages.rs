pub(crate) const SCRIPT_MESSAGE_SECONDS: f32 = 10.0;
pub(crate) const NOTIFICATION_SECONDS: f32 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MessageBox {
    pub(crate) text: String,
    pub(crate) duration: f32,
    pub(crate) armed_at: f32,
}

/// On-screen message boxes. Showing a text that is already up re-arms it.
#[derive(Debug, Clone, Default)]
pub(crate) struct MessageBoard {
    boxes: Vec<MessageBox>,
}

impl MessageBoard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn show(&mut self, text: &str, duration: f32, now: f32) {
        match self.boxes.iter_mut().find(|entry| entry.text == text) {
            Some(existing) => {
                existing.armed_at = now;
                existing.duration = duration;
            }
            None => self.boxes.push(MessageBox {
                text: text.to_string(),
                duration,
                armed_at: now,
            }),
        }
    }

    pub(crate) fn expire(&mut self, now: f32) {
        self.boxes
            .retain(|entry| now - entry.armed_at < entry.duration);
    }

    pub(crate) fn active(&self) -> &[MessageBox] {
        &self.boxes
    }
}
