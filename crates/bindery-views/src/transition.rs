#![forbid(unsafe_code)]

//! Named enter/exit animation pairs.
//!
//! A [`Transition`] names the animation played on the incoming view
//! (`enter`) and on the outgoing view (`exit`). `None` on either side means
//! that side switches instantly. A [`StackTransition`] bundles the three
//! transitions a navigation stack needs: push, pop, and neutral (same depth).

use std::borrow::Cow;

/// Enter/exit animation names for one swap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transition {
    pub enter: Option<Cow<'static, str>>,
    pub exit: Option<Cow<'static, str>>,
}

const fn preset(enter: &'static str, exit: &'static str) -> Transition {
    Transition {
        enter: Some(Cow::Borrowed(enter)),
        exit: Some(Cow::Borrowed(exit)),
    }
}

impl Transition {
    pub const PUSH: Self = preset("push-in", "push-out");
    pub const POP: Self = preset("pop-in", "pop-out");
    pub const PULL_UP: Self = preset("pull-up-in", "pull-up-out");
    pub const PULL_DOWN: Self = preset("pull-down-in", "pull-down-out");
    pub const FADE: Self = preset("fade-in", "fade-out");
    pub const GROW_FADE: Self = preset("grow-fade-in", "grow-fade-out");
    pub const SHRINK_FADE: Self = preset("shrink-fade-in", "shrink-fade-out");
    /// Swap instantly.
    pub const NONE: Self = Self {
        enter: None,
        exit: None,
    };

    /// A transition with custom animation names.
    pub fn new(
        enter: Option<impl Into<Cow<'static, str>>>,
        exit: Option<impl Into<Cow<'static, str>>>,
    ) -> Self {
        Self {
            enter: enter.map(Into::into),
            exit: exit.map(Into::into),
        }
    }

    /// Whether neither side animates.
    #[must_use]
    pub fn is_instant(&self) -> bool {
        self.enter.is_none() && self.exit.is_none()
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::FADE
    }
}

/// Direction of a stack change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Push,
    Pop,
    Neutral,
}

/// Transitions for each stack [`Direction`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackTransition {
    pub push: Transition,
    pub pop: Transition,
    pub neutral: Transition,
}

impl StackTransition {
    pub const PUSH_POP: Self = Self {
        push: Transition::PUSH,
        pop: Transition::POP,
        neutral: Transition::FADE,
    };
    pub const PULL_UP: Self = Self {
        push: Transition::PULL_UP,
        pop: Transition::PULL_DOWN,
        neutral: Transition::FADE,
    };
    pub const FADE_IN_OUT: Self = Self {
        push: Transition::FADE,
        pop: Transition::FADE,
        neutral: Transition::FADE,
    };
    pub const MODAL: Self = Self {
        push: Transition::GROW_FADE,
        pop: Transition::SHRINK_FADE,
        neutral: Transition::GROW_FADE,
    };
    pub const NONE: Self = Self {
        push: Transition::NONE,
        pop: Transition::NONE,
        neutral: Transition::NONE,
    };

    /// The transition for `direction`.
    #[must_use]
    pub fn for_direction(&self, direction: Direction) -> &Transition {
        match direction {
            Direction::Push => &self.push,
            Direction::Pop => &self.pop,
            Direction::Neutral => &self.neutral,
        }
    }
}

impl Default for StackTransition {
    fn default() -> Self {
        Self::PUSH_POP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_name_both_sides() {
        assert_eq!(Transition::PUSH.enter.as_deref(), Some("push-in"));
        assert_eq!(Transition::PUSH.exit.as_deref(), Some("push-out"));
        assert!(Transition::NONE.is_instant());
        assert!(!Transition::FADE.is_instant());
    }

    #[test]
    fn stack_presets() {
        let modal = StackTransition::MODAL;
        assert_eq!(modal.for_direction(Direction::Push), &Transition::GROW_FADE);
        assert_eq!(modal.for_direction(Direction::Pop), &Transition::SHRINK_FADE);
        assert_eq!(StackTransition::PULL_UP.pop, Transition::PULL_DOWN);
        assert_eq!(StackTransition::default(), StackTransition::PUSH_POP);
    }

    #[test]
    fn custom_transition() {
        let t = Transition::new(Some("slide-in"), None::<&str>);
        assert_eq!(t.enter.as_deref(), Some("slide-in"));
        assert!(t.exit.is_none());
    }
}
