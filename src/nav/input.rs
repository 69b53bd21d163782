use crate::nav::ExitMode;

/// Logical gestures from an already debounced input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Up,
    Down,
    Select,
    Back,
    EditPlus,
    EditMinus,
    Confirm,
    Cancel,
    ExitAll(ExitMode),
}

impl Gesture {
    pub fn decode(token: &str) -> Option<Gesture> {
        let gesture = match token.trim().to_ascii_lowercase().as_str() {
            "up" | "u" | "k" => Gesture::Up,
            "down" | "d" | "j" => Gesture::Down,
            "select" | "enter" | "s" => Gesture::Select,
            "back" | "b" => Gesture::Back,
            "+" | "plus" | "right" => Gesture::EditPlus,
            "-" | "minus" | "left" => Gesture::EditMinus,
            "confirm" | "ok" => Gesture::Confirm,
            "cancel" | "esc" => Gesture::Cancel,
            "exit" | "q" => Gesture::ExitAll(ExitMode::Exit),
            "save" | "save-exit" => Gesture::ExitAll(ExitMode::Save),
            _ => return None,
        };
        Some(gesture)
    }
}
