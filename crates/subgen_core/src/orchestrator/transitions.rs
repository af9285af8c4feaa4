//! Stage transition table.
//!
//! ```text
//! Extract    --exit 0-->             Transcribe
//! Transcribe --exit 0, subtitle ok--> [stage render copy] Embed
//! Embed      --exit 0-->             Success
//! any        --exit != 0-->          Failed(stage)
//! Transcribe --exit 0, no subtitle--> Failed(empty-subtitle)
//! ```
//!
//! The table is pure: the controller gathers the outcome, asks for the
//! transition, then performs its effects.

use crate::models::Stage;
use crate::runner::{ExitInfo, ExitKind};
use crate::subtitles::SubtitleStatus;

use super::errors::TaskError;

/// Everything the table needs to know about a finished stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub exit: ExitInfo,
    /// Subtitle inspection, only gathered after a clean transcription.
    pub subtitle: Option<SubtitleStatus>,
}

impl StageOutcome {
    pub fn new(exit: ExitInfo) -> Self {
        Self {
            exit,
            subtitle: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: SubtitleStatus) -> Self {
        self.subtitle = Some(subtitle);
        self
    }
}

/// Where the task goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Stage(Stage),
    Success,
    Failed(TaskError),
}

/// Work the controller performs, in order, before the next stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Copy the generated subtitle to its render-time name.
    StageRenderSubtitle,
    /// Build the stage's command and start it.
    Launch(Stage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: Next,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(stage: Stage, effects: Vec<Effect>) -> Self {
        Self {
            next: Next::Stage(stage),
            effects,
        }
    }

    fn terminal(next: Next) -> Self {
        Self {
            next,
            effects: Vec::new(),
        }
    }
}

/// Decide what follows `stage` given its outcome.
pub fn transition(stage: Stage, outcome: &StageOutcome) -> Transition {
    if let ExitKind::FailedToStart(message) = &outcome.exit.kind {
        return Transition::terminal(Next::Failed(TaskError::start_failure(stage, message.clone())));
    }

    if !outcome.exit.success() {
        return Transition::terminal(Next::Failed(TaskError::stage_failed(
            stage,
            outcome.exit.clone(),
        )));
    }

    match stage {
        Stage::Extract => {
            Transition::to(Stage::Transcribe, vec![Effect::Launch(Stage::Transcribe)])
        }
        Stage::Transcribe => {
            let usable = outcome.subtitle.is_some_and(|s| s.is_usable());
            if usable {
                Transition::to(
                    Stage::Embed,
                    vec![Effect::StageRenderSubtitle, Effect::Launch(Stage::Embed)],
                )
            } else {
                Transition::terminal(Next::Failed(TaskError::EmptySubtitleFailure))
            }
        }
        Stage::Embed => Transition::terminal(Next::Success),
        Stage::None => Transition::terminal(Next::Failed(TaskError::start_failure(
            Stage::None,
            "no stage was running",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureReason;

    fn ok() -> StageOutcome {
        StageOutcome::new(ExitInfo::normal(0))
    }

    fn failed_with(stage: Stage, outcome: StageOutcome) -> FailureReason {
        match transition(stage, &outcome).next {
            Next::Failed(err) => err.reason(),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn extract_success_launches_transcription() {
        let t = transition(Stage::Extract, &ok());
        assert_eq!(t.next, Next::Stage(Stage::Transcribe));
        assert_eq!(t.effects, vec![Effect::Launch(Stage::Transcribe)]);
    }

    #[test]
    fn transcribe_with_subtitle_stages_copy_then_embeds() {
        let outcome = ok().with_subtitle(SubtitleStatus::Present { entries: 3 });
        let t = transition(Stage::Transcribe, &outcome);
        assert_eq!(t.next, Next::Stage(Stage::Embed));
        assert_eq!(
            t.effects,
            vec![Effect::StageRenderSubtitle, Effect::Launch(Stage::Embed)]
        );
    }

    #[test]
    fn transcribe_without_subtitle_fails_empty() {
        for status in [SubtitleStatus::Missing, SubtitleStatus::Empty] {
            let outcome = ok().with_subtitle(status);
            assert_eq!(
                failed_with(Stage::Transcribe, outcome),
                FailureReason::EmptySubtitle
            );
        }
        // Not inspected counts as missing.
        assert_eq!(failed_with(Stage::Transcribe, ok()), FailureReason::EmptySubtitle);
    }

    #[test]
    fn embed_success_finishes() {
        let t = transition(Stage::Embed, &ok());
        assert_eq!(t.next, Next::Success);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn nonzero_exit_fails_with_stage_reason() {
        let bad = || StageOutcome::new(ExitInfo::normal(1));
        assert_eq!(failed_with(Stage::Extract, bad()), FailureReason::Extract);
        // A present subtitle does not rescue a failed transcription.
        let outcome = bad().with_subtitle(SubtitleStatus::Present { entries: 1 });
        assert_eq!(failed_with(Stage::Transcribe, outcome), FailureReason::Transcribe);
        assert_eq!(failed_with(Stage::Embed, bad()), FailureReason::Embed);
    }

    #[test]
    fn crash_is_a_failure() {
        let outcome = StageOutcome::new(ExitInfo::crashed());
        assert_eq!(failed_with(Stage::Embed, outcome), FailureReason::Embed);
    }

    #[test]
    fn start_failure_keeps_stage_reason() {
        let outcome = StageOutcome::new(ExitInfo::failed_to_start("No such file"));
        match transition(Stage::Transcribe, &outcome).next {
            Next::Failed(TaskError::StartFailure { stage, message }) => {
                assert_eq!(stage, Stage::Transcribe);
                assert_eq!(message, "No such file");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
