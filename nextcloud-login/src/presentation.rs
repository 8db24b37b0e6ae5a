use crate::models::PresentationMode;

/// What a back press resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackAction {
    /// Let the embedded browser go back one page
    BrowserHistoryBack,
    /// Left the embedded browser for the code display
    ShowCode,
    /// Leave the login flow; the poller must be cancelled
    ExitFlow,
}

/// Which login surface is visible.
///
/// Purely local state: nothing here touches the poller, which keeps running
/// whichever surface the user looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentationState {
    mode: PresentationMode,
}

impl PresentationState {
    pub fn new(mode: PresentationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> PresentationMode {
        self.mode
    }

    /// Toggle between code display and embedded browser
    pub fn switch(&mut self) -> PresentationMode {
        self.mode = match self.mode {
            PresentationMode::CodeDisplay => PresentationMode::EmbeddedBrowser,
            PresentationMode::EmbeddedBrowser => PresentationMode::CodeDisplay,
        };
        self.mode
    }

    pub fn show(&mut self, mode: PresentationMode) {
        self.mode = mode;
    }

    /// Resolve a back press. `browser_can_go_back` is the embedded browser's
    /// own history and only matters while it is visible.
    pub fn back(&mut self, browser_can_go_back: bool) -> BackAction {
        match self.mode {
            PresentationMode::EmbeddedBrowser if browser_can_go_back => {
                BackAction::BrowserHistoryBack
            }
            PresentationMode::EmbeddedBrowser => {
                self.mode = PresentationMode::CodeDisplay;
                BackAction::ShowCode
            }
            PresentationMode::CodeDisplay => BackAction::ExitFlow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_toggles() {
        let mut state = PresentationState::default();
        assert_eq!(state.mode(), PresentationMode::CodeDisplay);
        assert_eq!(state.switch(), PresentationMode::EmbeddedBrowser);
        assert_eq!(state.switch(), PresentationMode::CodeDisplay);
    }

    #[test]
    fn test_back_unwinds_browser_history_first() {
        let mut state = PresentationState::new(PresentationMode::EmbeddedBrowser);
        assert_eq!(state.back(true), BackAction::BrowserHistoryBack);
        assert_eq!(state.mode(), PresentationMode::EmbeddedBrowser);

        assert_eq!(state.back(false), BackAction::ShowCode);
        assert_eq!(state.mode(), PresentationMode::CodeDisplay);
    }

    #[test]
    fn test_back_from_code_display_exits() {
        let mut state = PresentationState::default();
        // Browser history is irrelevant when the browser is hidden
        assert_eq!(state.back(true), BackAction::ExitFlow);
        assert_eq!(state.mode(), PresentationMode::CodeDisplay);
    }
}
