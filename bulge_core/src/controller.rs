//! Hover tracking for the interactive layer. Pointer handlers flip a couple of
//! flags in place; the frame tick reads them and eases the displacement point
//! that gets written into the vertex uniform. Nothing here allocates after
//! construction, so it is safe to drive from high-frequency pointer events.

use glam::Vec3;

/// Displacement target meaning "no contact": far outside any plausible radius.
pub const SENTINEL_POINT: Vec3 = Vec3::splat(100.0);

/// Fraction of the remaining distance covered per frame.
pub const SMOOTHING_FACTOR: f32 = 0.1;

/// Pointer input as delivered by the hit test against the interactive mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// The pointer ray meets the mesh at this world-space point.
    Move(Vec3),
    /// The pointer ray no longer meets the mesh.
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverPhase {
    Idle,
    Tracking,
}

/// What a pointer event did to the hover state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverTransition {
    Entered,
    Moved,
    Left,
    Unchanged,
}

#[derive(Debug, Clone, Copy)]
struct HoverState {
    hovered: bool,
    first_contact: bool,
}

#[derive(Debug, Clone)]
pub struct DisplacementController {
    hover: HoverState,
    pointer: Vec3,
    current: Vec3,
}

impl Default for DisplacementController {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplacementController {
    pub fn new() -> Self {
        Self {
            hover: HoverState {
                hovered: false,
                first_contact: true,
            },
            pointer: SENTINEL_POINT,
            current: SENTINEL_POINT,
        }
    }

    pub fn handle(&mut self, event: PointerEvent) -> HoverTransition {
        match event {
            PointerEvent::Move(point) => self.pointer_move(point),
            PointerEvent::Leave => self.pointer_leave(),
        }
    }

    /// Record a new intersection point. The first move after an idle period
    /// arms a snap so the bulge appears under the pointer instead of flying in
    /// from the sentinel.
    pub fn pointer_move(&mut self, point: Vec3) -> HoverTransition {
        self.pointer = point;
        if self.hover.hovered {
            HoverTransition::Moved
        } else {
            self.hover.hovered = true;
            HoverTransition::Entered
        }
    }

    pub fn pointer_leave(&mut self) -> HoverTransition {
        if !self.hover.hovered {
            return HoverTransition::Unchanged;
        }
        self.hover.hovered = false;
        self.hover.first_contact = true;
        self.pointer = SENTINEL_POINT;
        HoverTransition::Left
    }

    /// Per-frame step. Returns the value to bind as the displacement uniform.
    pub fn advance(&mut self) -> Vec3 {
        let target = self.target();
        if self.hover.hovered && self.hover.first_contact {
            self.current = target;
            self.hover.first_contact = false;
        } else {
            self.current = self.current.lerp(target, SMOOTHING_FACTOR);
        }
        self.current
    }

    pub fn target(&self) -> Vec3 {
        if self.hover.hovered {
            self.pointer
        } else {
            SENTINEL_POINT
        }
    }

    pub fn displacement(&self) -> Vec3 {
        self.current
    }

    pub fn phase(&self) -> HoverPhase {
        if self.hover.hovered {
            HoverPhase::Tracking
        } else {
            HoverPhase::Idle
        }
    }

    /// True when the next [`advance`](Self::advance) during tracking will snap.
    pub fn first_contact_armed(&self) -> bool {
        self.hover.first_contact
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_at_sentinel() {
        let controller = DisplacementController::new();
        assert_eq!(controller.phase(), HoverPhase::Idle);
        assert_eq!(controller.displacement(), SENTINEL_POINT);
        assert!(controller.first_contact_armed());
    }

    #[test]
    fn move_while_idle_starts_tracking() {
        let mut controller = DisplacementController::new();
        let transition = controller.pointer_move(Vec3::new(0.5, -0.5, 0.0));
        assert_eq!(transition, HoverTransition::Entered);
        assert_eq!(controller.phase(), HoverPhase::Tracking);
        assert!(controller.first_contact_armed());
        assert_eq!(controller.target(), Vec3::new(0.5, -0.5, 0.0));
    }

    #[test]
    fn first_tracking_frame_snaps_to_pointer() {
        let mut controller = DisplacementController::new();
        let point = Vec3::new(1.0, 2.0, 0.0);
        controller.pointer_move(point);
        assert_eq!(controller.advance(), point);
        assert!(!controller.first_contact_armed());
    }

    #[test]
    fn later_moves_do_not_rearm_snap() {
        let mut controller = DisplacementController::new();
        controller.pointer_move(Vec3::ZERO);
        controller.advance();
        let transition = controller.pointer_move(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(transition, HoverTransition::Moved);
        assert!(!controller.first_contact_armed());
        let value = controller.advance();
        assert!((value.x - 0.1).abs() < 1e-6);
    }

    #[test]
    fn leave_resets_target_and_rearms_snap() {
        let mut controller = DisplacementController::new();
        controller.pointer_move(Vec3::ONE);
        controller.advance();
        assert_eq!(controller.pointer_leave(), HoverTransition::Left);
        assert_eq!(controller.phase(), HoverPhase::Idle);
        assert_eq!(controller.target(), SENTINEL_POINT);
        assert!(controller.first_contact_armed());
    }

    #[test]
    fn repeated_leave_is_a_no_op() {
        let mut controller = DisplacementController::new();
        controller.pointer_move(Vec3::ONE);
        controller.advance();
        controller.pointer_leave();
        let before = controller.advance();
        assert_eq!(controller.pointer_leave(), HoverTransition::Unchanged);
        assert_eq!(controller.phase(), HoverPhase::Idle);
        assert_eq!(controller.displacement(), before);
        let after = controller.advance();
        assert_ne!(after, SENTINEL_POINT, "idle frames must ease, not snap");
    }

    #[test]
    fn leaving_eases_back_toward_sentinel() {
        let mut controller = DisplacementController::new();
        controller.pointer_move(Vec3::ZERO);
        controller.advance();
        controller.pointer_leave();
        let value = controller.advance();
        assert!((value.x - 10.0).abs() < 1e-4);
        assert!((value.y - 10.0).abs() < 1e-4);
        assert!((value.z - 10.0).abs() < 1e-4);
    }

    #[test]
    fn reentry_snaps_again() {
        let mut controller = DisplacementController::new();
        controller.pointer_move(Vec3::ZERO);
        controller.advance();
        controller.pointer_leave();
        controller.advance();
        let point = Vec3::new(-2.0, 3.0, 0.0);
        assert_eq!(controller.pointer_move(point), HoverTransition::Entered);
        assert_eq!(controller.advance(), point);
    }

    #[test]
    fn handle_dispatches_events() {
        let mut controller = DisplacementController::new();
        assert_eq!(
            controller.handle(PointerEvent::Move(Vec3::X)),
            HoverTransition::Entered
        );
        assert_eq!(controller.handle(PointerEvent::Leave), HoverTransition::Left);
        assert_eq!(
            controller.handle(PointerEvent::Leave),
            HoverTransition::Unchanged
        );
    }
}
