use serde::{Deserialize, Serialize};

/// Pipeline stages for one language pair, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Fetch,
    Normalize,
    Group,
    Assign,
    Invert,
    Write,
    Verify,
    Package,
}

impl Stage {
    pub const COUNT: usize = 8;

    /// 1-based position in the pipeline
    pub fn index(self) -> usize {
        match self {
            Stage::Fetch => 1,
            Stage::Normalize => 2,
            Stage::Group => 3,
            Stage::Assign => 4,
            Stage::Invert => 5,
            Stage::Write => 6,
            Stage::Verify => 7,
            Stage::Package => 8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Fetch => "fetch source",
            Stage::Normalize => "normalize records",
            Stage::Group => "build word groups",
            Stage::Assign => "assign meanings",
            Stage::Invert => "build reverse index",
            Stage::Write => "write store",
            Stage::Verify => "verify store",
            Stage::Package => "package artifact",
        }
    }
}

/// Discrete progress event emitted after each completed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    pub pair: String,
    pub stage_index: usize,
    pub stage_count: usize,
    pub percent: f32,
    pub label: String,
}

impl StageEvent {
    pub fn completed(pair: &str, stage: Stage) -> Self {
        let index = stage.index();
        Self {
            pair: pair.to_string(),
            stage_index: index,
            stage_count: Stage::COUNT,
            percent: (index as f32 / Stage::COUNT as f32) * 100.0,
            label: stage.label().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_events_cover_full_range() {
        let first = StageEvent::completed("es-en", Stage::Fetch);
        let last = StageEvent::completed("es-en", Stage::Package);
        assert_eq!(first.stage_index, 1);
        assert_eq!(last.stage_index, Stage::COUNT);
        assert!((last.percent - 100.0).abs() < f32::EPSILON);
    }
}
