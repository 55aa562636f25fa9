//! Combinators that run several skills as one unit.

use crate::codes;
use crate::executor::{invoke, skill_not_found};
use crate::registry::SkillRegistry;
use futures::future::join_all;
use skillflow_core::validator::validate_output;
use skillflow_core::{SkillInput, SkillOutput};
use std::sync::Arc;
use tracing::{debug, warn};

/// Behaviour of [`SkillComposer::sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceOptions {
    /// Stop at the first output that is not `200`.
    pub stop_on_fail: bool,
    /// Feed each successful output's `data` into the next skill's writable context.
    pub merge_output: bool,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            stop_on_fail: true,
            merge_output: true,
        }
    }
}

/// Stateless skill combinators.
///
/// Each invocation runs once on its own task with no timeout or retry;
/// use [`crate::SkillExecutor`] when those are needed. Errors and panics
/// become fatal outputs in the slot that produced them.
#[derive(Debug, Clone)]
pub struct SkillComposer {
    registry: Arc<SkillRegistry>,
}

impl SkillComposer {
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self { registry }
    }

    async fn run(&self, name: &str, input: SkillInput) -> SkillOutput {
        let Some(skill) = self.registry.get(name) else {
            return skill_not_found(name);
        };

        match invoke(&skill, Arc::new(input), None).await {
            Ok(output) => match validate_output(&output) {
                Ok(()) => output,
                Err(e) => SkillOutput::fatal_with_code(
                    codes::INVALID_OUTPUT,
                    format!("Skill '{}' returned an invalid output: {}", name, e),
                ),
            },
            Err(e) => {
                warn!(skill = name, error = %e, "Composed skill failed");
                SkillOutput::fatal_with_code(
                    codes::EXECUTION_FAILED,
                    format!("Skill '{}' failed: {}", name, e),
                )
            }
        }
    }

    /// Runs `skills` one after another and returns each output in order.
    ///
    /// With `stop_on_fail` the list ends at the first non-`200` output.
    /// With `merge_output` each successful output's `data` is folded into
    /// the writable context seen by the following skills.
    pub async fn sequence(
        &self,
        skills: &[&str],
        input: SkillInput,
        options: SequenceOptions,
    ) -> Vec<SkillOutput> {
        let mut input = input;
        let mut outputs = Vec::with_capacity(skills.len());

        for (index, name) in skills.iter().enumerate() {
            debug!(skill = *name, position = index, "Sequence step");
            let output = self.run(name, input.clone()).await;

            let succeeded = output.is_success();
            if succeeded && options.merge_output {
                input.context.absorb(&output.data);
            }
            outputs.push(output);
            if !succeeded && options.stop_on_fail {
                debug!(skill = *name, "Sequence stopped at failed skill");
                break;
            }
        }
        outputs
    }

    /// Runs `skills` concurrently on copies of `input`.
    ///
    /// Outputs are returned in the order of `skills`.
    pub async fn parallel(&self, skills: &[&str], input: SkillInput) -> Vec<SkillOutput> {
        join_all(skills.iter().map(|name| self.run(name, input.clone()))).await
    }

    /// Runs `if_skill` when `predicate` holds, otherwise `else_skill`.
    ///
    /// Without an else branch a false predicate yields a no-op `200`.
    pub async fn conditional<P>(
        &self,
        predicate: P,
        if_skill: &str,
        else_skill: Option<&str>,
        input: SkillInput,
    ) -> SkillOutput
    where
        P: FnOnce(&SkillInput) -> bool,
    {
        if predicate(&input) {
            return self.run(if_skill, input).await;
        }
        match else_skill {
            Some(name) => self.run(name, input).await,
            None => SkillOutput::success("Condition not met, no branch executed"),
        }
    }

    /// Runs `skill` up to `max_iterations` times.
    ///
    /// After each iteration `should_continue` receives the latest output and
    /// the 1-based iteration number. Successful output data is merged into
    /// the writable context of the next iteration. Any non-`200` output
    /// ends the loop without consulting the predicate. Every iteration's
    /// output is returned.
    pub async fn loop_skill<P>(
        &self,
        max_iterations: u32,
        skill: &str,
        mut should_continue: P,
        input: SkillInput,
    ) -> Vec<SkillOutput>
    where
        P: FnMut(&SkillOutput, u32) -> bool,
    {
        let mut input = input;
        let mut outputs = Vec::new();

        for iteration in 1..=max_iterations {
            let output = self.run(skill, input.clone()).await;
            let succeeded = output.is_success();
            if succeeded {
                input.context.absorb(&output.data);
            }

            let again = succeeded && should_continue(&output, iteration);
            outputs.push(output);
            if !again {
                break;
            }
        }
        outputs
    }
}
