//! Built-in color schemes, one per rule family.

use crate::color::{ColorScheme, GradientStop, Rgb};

/// Canvas background.
pub const BACKGROUND: Rgb = Rgb::new(0x0f, 0x0f, 0x0f);
/// Accent amber used for live cells, up spins, and reached sites.
pub const AMBER: Rgb = Rgb::new(0xc8, 0x92, 0x2a);

/// Dead / alive for Life-like rules and elementary automata.
pub fn two_state(alive: Rgb) -> ColorScheme {
    ColorScheme::Palette {
        colors: vec![BACKGROUND, alive],
    }
}

/// Empty, head, tail, conductor.
pub fn wireworld() -> ColorScheme {
    ColorScheme::Palette {
        colors: vec![
            BACKGROUND,
            Rgb::new(0xe8, 0xe8, 0x40),
            Rgb::new(0xe8, 0x40, 0x40),
            Rgb::new(0x10, 0x60, 0xa0),
        ],
    }
}

/// Off, firing, dying.
pub fn brians_brain() -> ColorScheme {
    ColorScheme::Palette {
        colors: vec![BACKGROUND, Rgb::new(0xe8, 0xe8, 0xe8), Rgb::new(0x55, 0x55, 0x55)],
    }
}

/// Spin down, spin up.
pub fn ising() -> ColorScheme {
    ColorScheme::Palette {
        colors: vec![Rgb::new(0x1a, 0x1a, 0x1a), AMBER],
    }
}

/// Grain counts 0 to 3.
pub fn sandpile() -> ColorScheme {
    ColorScheme::Palette {
        colors: vec![
            BACKGROUND,
            Rgb::new(40, 30, 10),
            Rgb::new(100, 65, 15),
            AMBER,
        ],
    }
}

/// Blocked, open, reached.
pub fn percolation() -> ColorScheme {
    ColorScheme::Palette {
        colors: vec![Rgb::new(26, 26, 26), Rgb::new(60, 60, 60), AMBER],
    }
}

/// Dark, through teal, to bright cyan; precomputed per state.
pub fn cyclic(states: u8) -> ColorScheme {
    ColorScheme::Table {
        stops: vec![
            GradientStop::new(0.0, Rgb::BLACK),
            GradientStop::new(0.12, Rgb::new(5, 15, 25)),
            GradientStop::new(0.12, Rgb::new(0, 0, 80)),
            GradientStop::new(0.5, Rgb::new(0, 120, 160)),
            GradientStop::new(1.0, Rgb::new(180, 255, 255)),
        ],
        min: 0.0,
        max: f32::from(states.saturating_sub(1).max(1)),
        size: usize::from(states.max(2)),
    }
}

/// Cold black through deep amber to white-hot, over `[0, 1]`.
pub fn heat() -> ColorScheme {
    ColorScheme::Gradient {
        stops: vec![
            GradientStop::new(0.0, Rgb::BLACK),
            GradientStop::new(0.4, Rgb::new(200, 80, 10)),
            GradientStop::new(0.75, Rgb::new(255, 160, 70)),
            GradientStop::new(1.0, Rgb::WHITE),
        ],
        min: 0.0,
        max: 1.0,
    }
}

/// Activator concentration: dark, teal, white. Saturates at `v = 0.25`.
pub fn reaction() -> ColorScheme {
    ColorScheme::Gradient {
        stops: vec![
            GradientStop::new(0.0, Rgb::BLACK),
            GradientStop::new(0.3, Rgb::new(0, 60, 80)),
            GradientStop::new(0.7, Rgb::new(30, 190, 210)),
            GradientStop::new(1.0, Rgb::new(230, 255, 255)),
        ],
        min: 0.0,
        max: 0.25,
    }
}
