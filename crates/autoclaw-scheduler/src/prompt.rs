//! Self-prompt construction for ticks with an empty inbox.

use autoclaw_core::types::GoalSuggestion;

/// Inputs gathered from the goal source and the action history.
#[derive(Debug, Default)]
pub struct SelfPromptContext<'a> {
    pub iteration: u64,
    pub goals_digest: &'a str,
    pub suggestion: Option<&'a GoalSuggestion>,
    pub recent_actions: &'a str,
}

pub fn build_self_prompt(ctx: &SelfPromptContext<'_>) -> String {
    let mut prompt = format!(
        "[Autonomous iteration {}]\nYou are working on your own goals. No user message is waiting.\n",
        ctx.iteration
    );

    prompt.push_str("\n## Active goals\n");
    if ctx.goals_digest.trim().is_empty() {
        prompt.push_str("(no active goals)\n");
    } else {
        prompt.push_str(ctx.goals_digest.trim_end());
        prompt.push('\n');
    }

    if let Some(s) = ctx.suggestion {
        prompt.push_str("\n## Suggested focus\n");
        prompt.push_str(&s.goal_description);
        prompt.push('\n');
        if !s.reasoning.trim().is_empty() {
            prompt.push_str("Why: ");
            prompt.push_str(s.reasoning.trim());
            prompt.push('\n');
        }
    }

    if !ctx.recent_actions.is_empty() {
        prompt.push_str("\n## Recent actions\n");
        prompt.push_str(ctx.recent_actions);
        prompt.push('\n');
    }

    prompt.push_str(
        "\nPick the single most useful next step toward these goals, carry it out, \
         and report what you did. Avoid repeating the recent actions.",
    );
    prompt
}
