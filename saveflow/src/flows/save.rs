use crate::config::EngineConfig;
use crate::selector::MatchSpec;
use crate::workflow::{StepTarget, Workflow, WorkflowStep};

pub const SAVE_FLOW: &str = "save-to-drive";

/// The save-to-drive workflow as a declarative step table.
///
/// Everything site-specific comes from the config dictionaries; changing
/// button labels or adding a revision never touches sequencer code.
pub fn save_flow(config: &EngineConfig) -> Workflow {
    let texts = &config.texts;
    let roles = &config.roles;
    let controls = &roles.controls;

    Workflow {
        name: SAVE_FLOW.to_string(),
        steps: vec![
            // Shares without a code never show this prompt, so probe
            // briefly instead of burning the full step wait.
            WorkflowStep::new(
                "access code submission",
                StepTarget::activate(
                    MatchSpec::contains(controls.clone(), texts.access_code_submit.clone())
                        .within(MatchSpec::contains(
                            roles.forms.clone(),
                            texts.access_code_prompt.clone(),
                        )),
                ),
            )
            .timeout_ms(config.timeouts.fallback_ms),
            // The one-click control stays unrendered until its entry is
            // hovered; a plain save control is the second tier.
            WorkflowStep::new(
                "save to my drive",
                StepTarget::activate(
                    MatchSpec::contains(controls.clone(), texts.quick_save.clone()).hidden_ok(),
                )
                .revealed_by(MatchSpec::contains(
                    controls.clone(),
                    texts.save_entry.clone(),
                )),
            )
            .with_fallback(StepTarget::activate(MatchSpec::contains(
                controls.clone(),
                texts.save.clone(),
            )))
            .required(),
            // The destination dialog defaults to the previous path when
            // neither control exists, so a miss is survivable.
            WorkflowStep::new(
                "destination selection",
                StepTarget::activate(MatchSpec::contains(
                    controls.clone(),
                    texts.recent_folder.clone(),
                ))
                .timeout_ms(config.timeouts.fallback_ms),
            )
            .with_fallback(StepTarget::toggle(MatchSpec::contains(
                roles.toggles.clone(),
                texts.use_last_path.clone(),
            ))),
            WorkflowStep::new(
                "confirm destination",
                StepTarget::activate(
                    MatchSpec::contains(controls.clone(), texts.confirm.clone()).within(
                        MatchSpec::contains(roles.dialogs.clone(), Vec::<String>::new()),
                    ),
                ),
            )
            .required(),
            WorkflowStep::new(
                "success notice dismissal",
                StepTarget::activate(MatchSpec::contains(
                    controls.clone(),
                    texts.notice_dismiss.clone(),
                )),
            )
            .timeout_ms(config.timeouts.notice_ms),
        ],
    }
}
