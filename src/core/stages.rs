//! Per-frame update stages
//!
//! Each frame runs these in order. Data flows forward only:
//!
//! | Stage        | Reads                          | Writes                         |
//! |--------------|--------------------------------|--------------------------------|
//! | `Time`       | wall clock                     | `Time`                         |
//! | `Input`      | queued window events           | `Input`                        |
//! | `Camera`     | `Input`, `Time`, editor state  | `Camera`                       |
//! | `Editor`     | `Input`                        | world, levels, selection       |
//! | `Game`       | everything above               | world, lighting, quit flag     |
//! | `Render`     | world, camera, lighting        | GPU, frame report              |
//! | `ClearInput` |                                | `Input` edges and deltas       |

use std::fmt;

/// One step of the frame pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStage {
    Time,
    Input,
    Camera,
    Editor,
    Game,
    Render,
    ClearInput,
}

/// Stages in execution order
pub const FRAME_STAGES: [FrameStage; 7] = [
    FrameStage::Time,
    FrameStage::Input,
    FrameStage::Camera,
    FrameStage::Editor,
    FrameStage::Game,
    FrameStage::Render,
    FrameStage::ClearInput,
];

impl FrameStage {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Input => "input",
            Self::Camera => "camera",
            Self::Editor => "editor",
            Self::Game => "game",
            Self::Render => "render",
            Self::ClearInput => "clear-input",
        }
    }
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
