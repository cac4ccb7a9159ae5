use serde::{Deserialize, Serialize};

use super::LogicalInput;
use crate::constants::controller::{STICK_DIRECTION_THRESHOLD, TRIGGER_MAX, TRIGGER_THRESHOLD};

/// Controller state at one polling instant; never persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub cross: bool,
    pub circle: bool,
    pub square: bool,
    pub triangle: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub l1: bool,
    pub r1: bool,
    pub l3: bool,
    pub r3: bool,
    pub start: bool,
    pub select: bool,
    pub guide: bool,
    pub touchpad: bool,
    pub l2: u8,
    pub r2: u8,
    pub left_x: i16,
    pub left_y: i16,
    pub right_x: i16,
    pub right_y: i16,
}

impl ControllerSnapshot {
    fn button_mut(&mut self, input: LogicalInput) -> Option<&mut bool> {
        Some(match input {
            LogicalInput::Cross => &mut self.cross,
            LogicalInput::Moon => &mut self.circle,
            LogicalInput::Box => &mut self.square,
            LogicalInput::Pyramid => &mut self.triangle,
            LogicalInput::DpadLeft => &mut self.dpad_left,
            LogicalInput::DpadRight => &mut self.dpad_right,
            LogicalInput::DpadUp => &mut self.dpad_up,
            LogicalInput::DpadDown => &mut self.dpad_down,
            LogicalInput::L1 => &mut self.l1,
            LogicalInput::R1 => &mut self.r1,
            LogicalInput::L3 => &mut self.l3,
            LogicalInput::R3 => &mut self.r3,
            LogicalInput::Options => &mut self.start,
            LogicalInput::Share => &mut self.select,
            LogicalInput::Ps => &mut self.guide,
            LogicalInput::Touchpad => &mut self.touchpad,
            _ => return None,
        })
    }

    /// Set the snapshot the way a press or release of `input` would
    ///
    /// Triggers go to full/zero, stick directions to the axis extreme/center.
    /// Stick "up" directions are positive on the axis.
    pub fn apply(&mut self, input: LogicalInput, pressed: bool) {
        if let Some(button) = self.button_mut(input) {
            *button = pressed;
            return;
        }

        let trigger = if pressed { TRIGGER_MAX } else { 0 };
        let (axis, toward) = match input {
            LogicalInput::L2 => {
                self.l2 = trigger;
                return;
            }
            LogicalInput::R2 => {
                self.r2 = trigger;
                return;
            }
            LogicalInput::LeftStickXUp => (&mut self.left_x, i16::MAX),
            LogicalInput::LeftStickXDown => (&mut self.left_x, i16::MIN),
            LogicalInput::LeftStickYUp => (&mut self.left_y, i16::MAX),
            LogicalInput::LeftStickYDown => (&mut self.left_y, i16::MIN),
            LogicalInput::RightStickXUp => (&mut self.right_x, i16::MAX),
            LogicalInput::RightStickXDown => (&mut self.right_x, i16::MIN),
            LogicalInput::RightStickYUp => (&mut self.right_y, i16::MAX),
            LogicalInput::RightStickYDown => (&mut self.right_y, i16::MIN),
            _ => return,
        };

        if pressed {
            *axis = toward;
        } else if *axis == toward {
            // Releasing one direction must not cancel the opposite one
            *axis = 0;
        }
    }

    pub fn is_active(&self, input: LogicalInput) -> bool {
        let beyond = |value: i16, positive: bool| {
            if positive {
                value >= STICK_DIRECTION_THRESHOLD
            } else {
                value <= -STICK_DIRECTION_THRESHOLD
            }
        };

        match input {
            LogicalInput::Cross => self.cross,
            LogicalInput::Moon => self.circle,
            LogicalInput::Box => self.square,
            LogicalInput::Pyramid => self.triangle,
            LogicalInput::DpadLeft => self.dpad_left,
            LogicalInput::DpadRight => self.dpad_right,
            LogicalInput::DpadUp => self.dpad_up,
            LogicalInput::DpadDown => self.dpad_down,
            LogicalInput::L1 => self.l1,
            LogicalInput::R1 => self.r1,
            LogicalInput::L3 => self.l3,
            LogicalInput::R3 => self.r3,
            LogicalInput::Options => self.start,
            LogicalInput::Share => self.select,
            LogicalInput::Touchpad => self.touchpad,
            LogicalInput::Ps => self.guide,
            LogicalInput::L2 => self.l2 >= TRIGGER_THRESHOLD,
            LogicalInput::R2 => self.r2 >= TRIGGER_THRESHOLD,
            LogicalInput::LeftStickXUp => beyond(self.left_x, true),
            LogicalInput::LeftStickXDown => beyond(self.left_x, false),
            LogicalInput::LeftStickYUp => beyond(self.left_y, true),
            LogicalInput::LeftStickYDown => beyond(self.left_y, false),
            LogicalInput::RightStickXUp => beyond(self.right_x, true),
            LogicalInput::RightStickXDown => beyond(self.right_x, false),
            LogicalInput::RightStickYUp => beyond(self.right_y, true),
            LogicalInput::RightStickYDown => beyond(self.right_y, false),
        }
    }

    pub fn active_inputs(&self) -> Vec<LogicalInput> {
        LogicalInput::all().filter(|input| self.is_active(*input)).collect()
    }

    /// Native button bits currently held (no synthetic bits)
    pub fn button_mask(&self) -> u32 {
        LogicalInput::NATIVE
            .into_iter()
            .filter(|input| self.is_active(*input))
            .fold(0, |mask, input| mask | input.id())
    }
}
