use crate::visibility::VisibilityState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderDecision {
    Placeholder,
    Rendered,
}

impl RenderDecision {
    pub fn evaluate(state: VisibilityState, stay_rendered: bool, is_scrolling: bool) -> Self {
        if state.is_visible || (stay_rendered && state.was_ever_visible) || is_scrolling {
            RenderDecision::Rendered
        } else {
            RenderDecision::Placeholder
        }
    }

    pub fn is_rendered(self) -> bool {
        self == RenderDecision::Rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(is_visible: bool, was_ever_visible: bool) -> VisibilityState {
        VisibilityState {
            is_visible,
            was_ever_visible,
        }
    }

    #[test]
    fn truth_table() {
        use RenderDecision::*;
        assert_eq!(RenderDecision::evaluate(state(false, false), false, false), Placeholder);
        assert_eq!(RenderDecision::evaluate(state(true, true), false, false), Rendered);
        assert_eq!(RenderDecision::evaluate(state(false, true), false, false), Placeholder);
        assert_eq!(RenderDecision::evaluate(state(false, true), true, false), Rendered);
        assert_eq!(RenderDecision::evaluate(state(false, false), true, false), Placeholder);
        assert_eq!(RenderDecision::evaluate(state(false, false), false, true), Rendered);
        assert!(Rendered.is_rendered());
        assert!(!Placeholder.is_rendered());
    }

    #[test]
    fn was_ever_visible_latches() {
        let s = VisibilityState::initial(false)
            .with_visible(true)
            .with_visible(false)
            .with_visible(false);
        assert!(!s.is_visible);
        assert!(s.was_ever_visible);
        assert!(VisibilityState::initial(true).was_ever_visible);
    }
}
