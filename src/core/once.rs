use std::collections::HashSet;

/// Steps shared by several handlers that must not repeat within one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OncePerPass {
    SetupSshKey,
    RenderPluginConfig,
}

/// Per-pass record of completed one-shot steps. A new pass starts with a new scratch.
#[derive(Debug, Default)]
pub struct PassScratch {
    done: HashSet<OncePerPass>,
}

impl PassScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `step` is claimed in this pass, false afterwards.
    pub fn claim(&mut self, step: OncePerPass) -> bool {
        self.done.insert(step)
    }

    pub fn is_done(&self, step: OncePerPass) -> bool {
        self.done.contains(&step)
    }
}
