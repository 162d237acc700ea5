//! Navigation behavior lifecycle
//!
//! Every behavior is run once per cycle with `active` telling it whether
//! the dispatcher selected it. The edge of that flag drives the hooks:
//!
//! 1. `on_activation()` - first cycle as the selected behavior
//! 2. `on_active()` - every following cycle while selected
//! 3. `on_inactivation()` - first cycle after being deselected
//! 4. `on_inactive()` - every other cycle while not selected

use core::fmt;

use crate::latch::{Edge, EdgeDetector};

use super::context::{NavContext, NavShared};

/// The closed set of navigation behaviors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorKind {
    Mission,
    Loiter,
    Rtl,
    Takeoff,
    VtolTakeoff,
    Land,
    PrecisionLand,
}

impl BehaviorKind {
    /// Run order of the behaviors within one cycle
    pub const ALL: [BehaviorKind; 7] = [
        BehaviorKind::Mission,
        BehaviorKind::Loiter,
        BehaviorKind::Rtl,
        BehaviorKind::Takeoff,
        BehaviorKind::VtolTakeoff,
        BehaviorKind::Land,
        BehaviorKind::PrecisionLand,
    ];
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BehaviorKind::Mission => "mission",
            BehaviorKind::Loiter => "loiter",
            BehaviorKind::Rtl => "rtl",
            BehaviorKind::Takeoff => "takeoff",
            BehaviorKind::VtolTakeoff => "vtol_takeoff",
            BehaviorKind::Land => "land",
            BehaviorKind::PrecisionLand => "precision_land",
        };
        f.write_str(name)
    }
}

/// Lifecycle hooks shared by all navigation behaviors
pub trait NavigationBehavior {
    /// Edge detector over the `active` flag
    fn activity(&mut self) -> &mut EdgeDetector;

    fn on_activation(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared);

    fn on_active(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared);

    fn on_inactivation(&mut self, _ctx: &NavContext<'_>, _shared: &mut NavShared) {}

    fn on_inactive(&mut self, _ctx: &NavContext<'_>, _shared: &mut NavShared) {}

    /// Whether the behavior was selected in its last run
    fn is_active(&self) -> bool;

    fn run(&mut self, active: bool, ctx: &NavContext<'_>, shared: &mut NavShared) {
        match (self.activity().update(active), active) {
            (Edge::Rising, _) => self.on_activation(ctx, shared),
            (Edge::Falling, _) => self.on_inactivation(ctx, shared),
            (Edge::None, true) => self.on_active(ctx, shared),
            (Edge::None, false) => self.on_inactive(ctx, shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::context::fixtures::World;

    #[derive(Default)]
    struct Recorder {
        activity: EdgeDetector,
        calls: [u8; 4],
    }

    impl NavigationBehavior for Recorder {
        fn activity(&mut self) -> &mut EdgeDetector {
            &mut self.activity
        }

        fn on_activation(&mut self, _: &NavContext<'_>, _: &mut NavShared) {
            self.calls[0] += 1;
        }

        fn on_active(&mut self, _: &NavContext<'_>, _: &mut NavShared) {
            self.calls[1] += 1;
        }

        fn on_inactivation(&mut self, _: &NavContext<'_>, _: &mut NavShared) {
            self.calls[2] += 1;
        }

        fn on_inactive(&mut self, _: &NavContext<'_>, _: &mut NavShared) {
            self.calls[3] += 1;
        }

        fn is_active(&self) -> bool {
            self.activity.previous()
        }
    }

    #[test]
    fn test_hooks_follow_active_edges() {
        let world = World::flying();
        let ctx = world.ctx();
        let mut shared = NavShared::new();
        let mut recorder = Recorder::default();

        for active in [false, true, true, true, false, false] {
            recorder.run(active, &ctx, &mut shared);
        }

        assert_eq!(recorder.calls, [1, 2, 1, 2]);
        assert!(!recorder.is_active());
    }
}
