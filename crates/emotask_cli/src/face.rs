//! Face sprites for the terminal widget.
//!
//! With no asset directory the face is drawn from built-in ASCII art. With
//! one, each expression maps to `<state>.png` and `<state>_blink.png`; files
//! are checked for a PNG signature but never decoded here.

use emotask_core::EmotionalState;
use emotask_limbic::{FaceAtlas, Sprite};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, PartialEq)]
pub enum Face {
    Ascii(&'static str),
    Image { path: PathBuf, valid: bool },
}

impl Face {
    pub fn image(path: PathBuf) -> Self {
        let valid = has_png_signature(&path);
        if !valid {
            tracing::debug!("Face image {} missing or not a PNG", path.display());
        }
        Face::Image { path, valid }
    }
}

impl Sprite for Face {
    fn is_valid(&self) -> bool {
        match self {
            Face::Ascii(_) => true,
            Face::Image { valid, .. } => *valid,
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Face::Ascii(art) => f.write_str(art),
            Face::Image { path, .. } => write!(
                f,
                "[{}]",
                path.file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_default()
            ),
        }
    }
}

fn has_png_signature(path: &Path) -> bool {
    let mut header = [0u8; 8];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut header))
        .map(|_| header == PNG_SIGNATURE)
        .unwrap_or(false)
}

fn ascii_base(state: EmotionalState) -> &'static str {
    match state {
        EmotionalState::Happy => "(^‿^)",
        EmotionalState::Pleased => "(^▽^)",
        EmotionalState::Neutral => "(•_•)",
        EmotionalState::Grimace => "(>_<)",
        EmotionalState::GrimaceTwoSweat => "(>_<);;",
        EmotionalState::Surprised => "(O_O)",
        EmotionalState::Anguish => "(ಠ_ಠ)",
        EmotionalState::AnguishVery => "(ಥ_ಥ)",
        EmotionalState::AnguishExtremely => "(╥﹏╥)",
        EmotionalState::Tired => "(-_•)",
        EmotionalState::TiredVery => "(=_=)",
        EmotionalState::TiredExtremely => "(x_x)",
    }
}

/// Closed-eye art, for the expressions that have it.
fn ascii_blink(state: EmotionalState) -> Option<&'static str> {
    match state {
        EmotionalState::Happy => Some("(-‿-)"),
        EmotionalState::Neutral | EmotionalState::Tired => Some("(-_-)"),
        EmotionalState::GrimaceTwoSweat => Some("(-_-);;"),
        EmotionalState::Anguish => Some("(-_-)"),
        EmotionalState::AnguishVery => Some("(-﹏-)"),
        EmotionalState::TiredVery => Some("(_ _)"),
        _ => None,
    }
}

/// Stem of the blink image for a state. The tired face borrows neutral's.
fn blink_stem(state: EmotionalState) -> &'static str {
    match state {
        EmotionalState::Tired => EmotionalState::Neutral.as_str(),
        other => other.as_str(),
    }
}

pub fn builtin_atlas() -> FaceAtlas<Face> {
    EmotionalState::ALL
        .iter()
        .fold(FaceAtlas::new(), |atlas, state| {
            let atlas = atlas.with_base(*state, Face::Ascii(ascii_base(*state)));
            match ascii_blink(*state) {
                Some(art) => atlas.with_blink(*state, Face::Ascii(art)),
                None => atlas,
            }
        })
}

/// Image faces from `dir`. Missing files stay in the atlas as invalid
/// sprites, so selection falls back (blink to base, base to nothing).
pub fn image_atlas(dir: &Path) -> FaceAtlas<Face> {
    EmotionalState::ALL.iter().fold(FaceAtlas::new(), |atlas, state| {
        atlas
            .with_base(*state, Face::image(dir.join(format!("{}.png", state.as_str()))))
            .with_blink(
                *state,
                Face::image(dir.join(format!("{}_blink.png", blink_stem(*state)))),
            )
    })
}

pub fn load_atlas(dir: Option<&Path>) -> FaceAtlas<Face> {
    match dir {
        Some(dir) => {
            tracing::info!("Loading faces from {}", dir.display());
            image_atlas(dir)
        }
        None => builtin_atlas(),
    }
}
