//! The face's emotional vocabulary.
//!
//! Twelve discrete expressions, grouped into families in arbitration order:
//! one family per threshold ladder, the baseline, and the transient family
//! that is only ever injected from outside.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the twelve expressions the face can show.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalState {
    /// Default: nothing is wrong.
    #[default]
    Happy,
    /// Brief relief after every ladder clears.
    Pleased,
    /// Memory load above 90%.
    Neutral,
    /// An application reported an error.
    Grimace,
    /// Memory load above 95%.
    GrimaceTwoSweat,
    /// A device arrived or was removed.
    Surprised,
    /// CPU above 50%.
    Anguish,
    /// CPU above 70%.
    AnguishVery,
    /// CPU above 90%.
    AnguishExtremely,
    /// Battery below 30%.
    Tired,
    /// Battery below 20%.
    TiredVery,
    /// Battery below 10%.
    TiredExtremely,
}

/// Signal families, declared from highest to lowest arbitration priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFamily {
    CpuDistress,
    BatteryDistress,
    MemoryDistress,
    Baseline,
    Transient,
}

impl EmotionalState {
    /// Every variant, in declaration order.
    pub const ALL: [EmotionalState; 12] = [
        EmotionalState::Happy,
        EmotionalState::Pleased,
        EmotionalState::Neutral,
        EmotionalState::Grimace,
        EmotionalState::GrimaceTwoSweat,
        EmotionalState::Surprised,
        EmotionalState::Anguish,
        EmotionalState::AnguishVery,
        EmotionalState::AnguishExtremely,
        EmotionalState::Tired,
        EmotionalState::TiredVery,
        EmotionalState::TiredExtremely,
    ];

    pub fn family(&self) -> StateFamily {
        match self {
            EmotionalState::Anguish
            | EmotionalState::AnguishVery
            | EmotionalState::AnguishExtremely => StateFamily::CpuDistress,
            EmotionalState::Tired | EmotionalState::TiredVery | EmotionalState::TiredExtremely => {
                StateFamily::BatteryDistress
            }
            EmotionalState::Neutral | EmotionalState::GrimaceTwoSweat => {
                StateFamily::MemoryDistress
            }
            EmotionalState::Happy => StateFamily::Baseline,
            EmotionalState::Pleased | EmotionalState::Grimace | EmotionalState::Surprised => {
                StateFamily::Transient
            }
        }
    }

    /// Transient expressions are never produced by a threshold ladder.
    pub fn is_transient(&self) -> bool {
        self.family() == StateFamily::Transient
    }

    /// Lowercase identifier, also used as the asset file stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionalState::Happy => "happy",
            EmotionalState::Pleased => "pleased",
            EmotionalState::Neutral => "neutral",
            EmotionalState::Grimace => "grimace",
            EmotionalState::GrimaceTwoSweat => "grimace_two_sweat",
            EmotionalState::Surprised => "surprised",
            EmotionalState::Anguish => "anguish",
            EmotionalState::AnguishVery => "anguish_very",
            EmotionalState::AnguishExtremely => "anguish_extremely",
            EmotionalState::Tired => "tired",
            EmotionalState::TiredVery => "tired_very",
            EmotionalState::TiredExtremely => "tired_extremely",
        }
    }
}

impl fmt::Display for EmotionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the paint routine needs: the expression and whether the eyes are shut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderState {
    pub state: EmotionalState,
    pub blinking: bool,
}

impl RenderState {
    pub fn new(state: EmotionalState, blinking: bool) -> Self {
        Self { state, blinking }
    }
}
