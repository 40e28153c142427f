use crate::camera::View;

use super::DrawCmd;

/// One deferred UI draw.
#[derive(Debug, Clone)]
pub struct UiEntry {
    pub(crate) cmd: DrawCmd,
    /// Camera captured at queue time for mouse-relative buffers.
    pub(crate) view: Option<View>,
}

/// UI draws recorded during the scene phase, flushed in insertion order by
/// the UI composite.
#[derive(Debug, Default)]
pub struct UiQueue {
    entries: Vec<UiEntry>,
}

impl UiQueue {
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn push(&mut self, cmd: DrawCmd, view: Option<View>) {
        self.entries.push(UiEntry { cmd, view });
    }

    pub(crate) fn take(&mut self) -> Vec<UiEntry> {
        std::mem::take(&mut self.entries)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
