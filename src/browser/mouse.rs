//! Mouse event synthesis with explicit cursor state.

use std::sync::Arc;

use crate::protocol::InputCommand;

use super::input::InputSink;

/// Number of intermediate moves dispatched by [`Mouse::drag_to`].
const DRAG_STEPS: u32 = 10;

/// Mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    /// Primary button.
    #[default]
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
}

impl MouseButton {
    fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        }
    }

    fn mask(self) -> u8 {
        match self {
            Self::Left => 1,
            Self::Right => 2,
            Self::Middle => 4,
        }
    }
}

/// A virtual mouse cursor.
///
/// Events are posted immediately; methods return `&mut Self` for chaining.
///
/// # Example
///
/// ```ignore
/// driver.mouse_on("#handle").await?.down().move_to(400.0, 120.0).up();
/// ```
pub struct Mouse {
    sink: Arc<dyn InputSink>,
    x: f64,
    y: f64,
    buttons: u8,
}

impl Mouse {
    /// Creates a cursor at `(x, y)`.
    #[must_use]
    pub fn new(sink: Arc<dyn InputSink>, x: f64, y: f64) -> Self {
        Self {
            sink,
            x,
            y,
            buttons: 0,
        }
    }

    /// Current position.
    #[inline]
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Moves to an absolute position.
    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.x = x;
        self.y = y;
        self.emit("mouseMoved", MouseButton::Left, 0, false);
        self
    }

    /// Moves relative to the current position.
    pub fn offset(&mut self, dx: f64, dy: f64) -> &mut Self {
        self.move_to(self.x + dx, self.y + dy)
    }

    /// Presses the left button.
    pub fn down(&mut self) -> &mut Self {
        self.buttons |= MouseButton::Left.mask();
        self.emit("mousePressed", MouseButton::Left, 1, true);
        self
    }

    /// Releases the left button.
    pub fn up(&mut self) -> &mut Self {
        self.buttons &= !MouseButton::Left.mask();
        self.emit("mouseReleased", MouseButton::Left, 1, true);
        self
    }

    /// Move, press and release at the current position.
    pub fn click(&mut self) -> &mut Self {
        self.click_with(MouseButton::Left)
    }

    /// A click followed by a second press/release pair with `clickCount` 2.
    pub fn double_click(&mut self) -> &mut Self {
        self.click_with(MouseButton::Left);
        self.press_release(MouseButton::Left, 2);
        self
    }

    /// Right button click.
    pub fn right_click(&mut self) -> &mut Self {
        self.click_with(MouseButton::Right)
    }

    /// Scrolls by the given deltas at the current position.
    pub fn wheel(&mut self, delta_x: f64, delta_y: f64) -> &mut Self {
        self.sink.dispatch(InputCommand::DispatchMouseEvent {
            event_type: "mouseWheel".to_string(),
            x: self.x,
            y: self.y,
            button: "none".to_string(),
            buttons: self.buttons,
            click_count: 0,
            modifiers: 0,
            delta_x: Some(delta_x),
            delta_y: Some(delta_y),
        });
        self
    }

    /// Presses here, moves to `(x, y)` in steps, and releases there.
    pub fn drag_to(&mut self, x: f64, y: f64) -> &mut Self {
        let (start_x, start_y) = (self.x, self.y);
        self.move_to(start_x, start_y).down();

        for step in 1..=DRAG_STEPS {
            let t = f64::from(step) / f64::from(DRAG_STEPS);
            self.x = start_x + (x - start_x) * t;
            self.y = start_y + (y - start_y) * t;
            self.emit("mouseMoved", MouseButton::Left, 0, false);
        }

        self.up()
    }

    fn click_with(&mut self, button: MouseButton) -> &mut Self {
        self.emit("mouseMoved", button, 0, false);
        self.press_release(button, 1);
        self
    }

    fn press_release(&mut self, button: MouseButton, click_count: u8) {
        self.buttons |= button.mask();
        self.emit("mousePressed", button, click_count, true);
        self.buttons &= !button.mask();
        self.emit("mouseReleased", button, click_count, true);
    }

    fn emit(&self, event_type: &str, button: MouseButton, click_count: u8, with_button: bool) {
        let button = if with_button {
            button.name()
        } else if self.buttons & MouseButton::Left.mask() != 0 {
            "left"
        } else {
            "none"
        };

        self.sink.dispatch(InputCommand::DispatchMouseEvent {
            event_type: event_type.to_string(),
            x: self.x,
            y: self.y,
            button: button.to_string(),
            buttons: self.buttons,
            click_count,
            modifiers: 0,
            delta_x: None,
            delta_y: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::browser::input::RecordingInput;

    fn events(rec: &RecordingInput) -> Vec<(String, u8, u8)> {
        rec.commands()
            .into_iter()
            .filter_map(|c| match c {
                InputCommand::DispatchMouseEvent {
                    event_type,
                    click_count,
                    buttons,
                    ..
                } => Some((event_type, click_count, buttons)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_click_sequence() {
        let rec = RecordingInput::new();
        Mouse::new(rec.clone(), 10.0, 20.0).click();

        assert_eq!(
            events(&rec),
            vec![
                ("mouseMoved".to_string(), 0, 0),
                ("mousePressed".to_string(), 1, 1),
                ("mouseReleased".to_string(), 1, 0),
            ]
        );
    }

    #[test]
    fn test_double_click_adds_second_pair() {
        let rec = RecordingInput::new();
        Mouse::new(rec.clone(), 0.0, 0.0).double_click();

        let counts: Vec<u8> = events(&rec).into_iter().map(|(_, c, _)| c).collect();
        assert_eq!(counts, [0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_right_click_button() {
        let rec = RecordingInput::new();
        Mouse::new(rec.clone(), 0.0, 0.0).right_click();

        let pressed = rec.commands().into_iter().find_map(|c| match c {
            InputCommand::DispatchMouseEvent {
                event_type, button, ..
            } if event_type == "mousePressed" => Some(button),
            _ => None,
        });
        assert_eq!(pressed.as_deref(), Some("right"));
    }

    #[test]
    fn test_offset_and_position() {
        let rec = RecordingInput::new();
        let mut mouse = Mouse::new(rec, 5.0, 5.0);
        mouse.offset(10.0, -2.0);
        assert_eq!(mouse.position(), (15.0, 3.0));
    }

    #[test]
    fn test_drag_holds_button_while_moving() {
        let rec = RecordingInput::new();
        let mut mouse = Mouse::new(rec.clone(), 0.0, 0.0);
        mouse.drag_to(100.0, 50.0);

        let all = events(&rec);
        let moves_while_held = all
            .iter()
            .filter(|(t, _, b)| t == "mouseMoved" && *b == 1)
            .count();
        assert_eq!(moves_while_held, DRAG_STEPS as usize);
        assert_eq!(all.last().map(|(t, _, b)| (t.as_str(), *b)), Some(("mouseReleased", 0)));
        assert_eq!(mouse.position(), (100.0, 50.0));
    }

    #[test]
    fn test_wheel_carries_deltas() {
        let rec = RecordingInput::new();
        Mouse::new(rec.clone(), 1.0, 1.0).wheel(0.0, 240.0);

        match rec.commands().pop() {
            Some(InputCommand::DispatchMouseEvent {
                event_type,
                delta_y,
                ..
            }) => {
                assert_eq!(event_type, "mouseWheel");
                assert_eq!(delta_y, Some(240.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
