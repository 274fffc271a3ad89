//! W3C pointer action sequences for touch gestures.
//!
//! Every gesture is a set of touch pointers ("fingers"), each with its own
//! ordered list of moves, presses, pauses and releases. The server runs the
//! pointers in lockstep tick by tick, which is what makes multi-finger
//! gestures such as pinch and zoom possible.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

/// Vertical distance each finger travels in [`pinch`] and [`zoom`].
pub const PINCH_OFFSET: i32 = 100;

/// One step of a pointer's action list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PointerAction {
    #[serde(rename = "pointerMove")]
    Move {
        x: i32,
        y: i32,
        /// Milliseconds.
        duration: u64,
        origin: &'static str,
    },
    #[serde(rename = "pointerDown")]
    Down { button: u8 },
    #[serde(rename = "pointerUp")]
    Up { button: u8 },
    #[serde(rename = "pause")]
    Pause {
        /// Milliseconds.
        duration: u64,
    },
}

/// A single touch pointer and its actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Finger {
    id: String,
    actions: Vec<PointerAction>,
}

impl Finger {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actions: Vec::new(),
        }
    }

    /// Move to absolute viewport coordinates over `duration`.
    pub fn move_to(mut self, x: i32, y: i32, duration: Duration) -> Self {
        self.actions.push(PointerAction::Move {
            x,
            y,
            duration: millis(duration),
            origin: "viewport",
        });
        self
    }

    pub fn press(mut self) -> Self {
        self.actions.push(PointerAction::Down { button: 0 });
        self
    }

    pub fn release(mut self) -> Self {
        self.actions.push(PointerAction::Up { button: 0 });
        self
    }

    pub fn pause(mut self, duration: Duration) -> Self {
        self.actions.push(PointerAction::Pause {
            duration: millis(duration),
        });
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn actions(&self) -> &[PointerAction] {
        &self.actions
    }

    fn to_json(&self) -> Value {
        json!({
            "type": "pointer",
            "id": self.id,
            "parameters": { "pointerType": "touch" },
            "actions": self.actions,
        })
    }
}

/// A complete gesture: one or more fingers performed together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionSequence {
    fingers: Vec<Finger>,
}

impl ActionSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_finger(mut self, finger: Finger) -> Self {
        self.fingers.push(finger);
        self
    }

    pub fn fingers(&self) -> &[Finger] {
        &self.fingers
    }

    /// The body of a `Perform Actions` request.
    pub fn to_json(&self) -> Value {
        json!({
            "actions": self.fingers.iter().map(Finger::to_json).collect::<Vec<_>>(),
        })
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Tap at a point with `fingers` fingers, holding for `duration`.
///
/// Zero fingers is treated as one.
pub fn tap(fingers: u32, x: i32, y: i32, duration: Duration) -> ActionSequence {
    (1..=fingers.max(1)).fold(ActionSequence::new(), |seq, n| {
        seq.with_finger(
            Finger::new(format!("finger{n}"))
                .move_to(x, y, Duration::ZERO)
                .press()
                .pause(duration)
                .release(),
        )
    })
}

/// Press at the start point, drag to the end point over `duration`, release.
pub fn swipe(
    start_x: i32,
    start_y: i32,
    end_x: i32,
    end_y: i32,
    duration: Duration,
) -> ActionSequence {
    ActionSequence::new().with_finger(
        Finger::new("finger1")
            .move_to(start_x, start_y, Duration::ZERO)
            .press()
            .move_to(end_x, end_y, duration)
            .release(),
    )
}

/// Two fingers start [`PINCH_OFFSET`] above and below the point and converge
/// on it.
pub fn pinch(x: i32, y: i32) -> ActionSequence {
    let travel = Duration::from_millis(500);
    ActionSequence::new()
        .with_finger(
            Finger::new("finger1")
                .move_to(x, y - PINCH_OFFSET, Duration::ZERO)
                .press()
                .move_to(x, y, travel)
                .release(),
        )
        .with_finger(
            Finger::new("finger2")
                .move_to(x, y + PINCH_OFFSET, Duration::ZERO)
                .press()
                .move_to(x, y, travel)
                .release(),
        )
}

/// Two fingers start on the point and spread [`PINCH_OFFSET`] up and down.
pub fn zoom(x: i32, y: i32) -> ActionSequence {
    let travel = Duration::from_millis(500);
    ActionSequence::new()
        .with_finger(
            Finger::new("finger1")
                .move_to(x, y, Duration::ZERO)
                .press()
                .move_to(x, y - PINCH_OFFSET, travel)
                .release(),
        )
        .with_finger(
            Finger::new("finger2")
                .move_to(x, y, Duration::ZERO)
                .press()
                .move_to(x, y + PINCH_OFFSET, travel)
                .release(),
        )
}
