//! Verbosity control block.

/// Lowest and highest verbosity levels.
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;

/// Coarse verbosity bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityBand {
    Minimal,
    Balanced,
    Exhaustive,
}

impl VerbosityBand {
    pub fn for_level(level: u8) -> Self {
        match clamp_verbosity(level) {
            1..=3 => Self::Minimal,
            4..=6 => Self::Balanced,
            _ => Self::Exhaustive,
        }
    }

    pub fn style(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Balanced => "standard",
            Self::Exhaustive => "detailed",
        }
    }

    fn rules(&self) -> &'static str {
        match self {
            Self::Minimal => {
                "- Answer directly, with no preamble or pleasantries
- Skip background explanations
- Keep code comments to the essentials
- Say it in as few words as possible"
            }
            Self::Balanced => {
                "- Balance brevity with completeness
- Explain the key points and skip the obvious
- Add background only when it matters
- Add comments to code where they help"
            }
            Self::Exhaustive => {
                "- Give complete explanations and background
- Include examples and edge cases
- Discuss alternatives and trade-offs
- Comment code thoroughly"
            }
        }
    }
}

pub fn clamp_verbosity(level: u8) -> u8 {
    level.clamp(MIN_LEVEL, MAX_LEVEL)
}

/// Render the verbosity block for `level`, clamped to 1–10.
pub fn render(level: u8) -> String {
    let level = clamp_verbosity(level);
    let band = VerbosityBand::for_level(level);
    format!(
        "# Verbosity control\nDesired level: {level}/10\nStyle: {}\n\n{}",
        band.style(),
        band.rules()
    )
}
