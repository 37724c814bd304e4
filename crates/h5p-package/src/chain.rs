//! # Rule Chain
//!
//! An ordered pipeline of validation steps. Each step receives the
//! artifact produced by the previous step plus read access to the issues
//! collected so far, and reports one of three outcomes:
//!
//! - [`StepOutcome::Continue`]: no issues, hand on the artifact.
//! - [`StepOutcome::Accumulate`]: record issues, keep going.
//! - [`StepOutcome::Abort`]: record issues, stop the chain.
//!
//! Steps may transform the artifact type, so a chain that starts with an
//! upload and ends with a validated package is checked by the compiler.
//!
//! ## Termination
//!
//! A chain stops at the first `Abort`, or at the first accumulated issue
//! when the accumulator is in [`ErrorMode::FailFast`](h5p_core::ErrorMode).
//! [`RuleChain::throw_errors_now`] inserts a barrier that aborts if anything
//! has accumulated. [`RuleChain::validate`] fails if the chain stopped early
//! or if any issue is still pending when it ends.
//!
//! Failures that are not validation issues (I/O, schema loading) are
//! returned by the step as `Err` and bypass the accumulator entirely.

use h5p_core::{ValidationErrors, ValidationIssue};

use crate::error::{PackageError, PackageResult};

/// What a step decided about its artifact.
#[derive(Debug)]
pub enum StepOutcome<A> {
    /// Pass the artifact on.
    Continue(A),
    /// Record issues and pass the artifact on.
    Accumulate(A, Vec<ValidationIssue>),
    /// Record issues and stop the chain.
    Abort(Vec<ValidationIssue>),
}

impl<A> StepOutcome<A> {
    /// `Continue` when `issues` is empty, `Accumulate` otherwise.
    pub fn accumulate(artifact: A, issues: Vec<ValidationIssue>) -> Self {
        if issues.is_empty() {
            Self::Continue(artifact)
        } else {
            Self::Accumulate(artifact, issues)
        }
    }

    /// Abort with a single issue.
    pub fn abort(issue: ValidationIssue) -> Self {
        Self::Abort(vec![issue])
    }

    /// Fold this outcome into `issues`, returning the artifact unless the
    /// step aborted. Used by steps that run several sub-checks in a loop.
    pub fn collect_into(self, issues: &mut Vec<ValidationIssue>) -> Option<A> {
        match self {
            Self::Continue(artifact) => Some(artifact),
            Self::Accumulate(artifact, more) => {
                issues.extend(more);
                Some(artifact)
            }
            Self::Abort(more) => {
                issues.extend(more);
                None
            }
        }
    }
}

/// Why a chain stopped before its last step.
enum Interrupt {
    Abort,
    Failed(PackageError),
}

type Runner<'r, I, O> =
    Box<dyn FnMut(I, &mut ValidationErrors) -> Result<O, Interrupt> + 'r>;

/// An ordered pipeline of validation steps from `I` to `O`.
pub struct RuleChain<'r, I, O> {
    runner: Runner<'r, I, O>,
    steps: usize,
}

impl<'r, I: 'r> RuleChain<'r, I, I> {
    /// An empty chain that returns its input unchanged.
    pub fn new() -> Self {
        Self {
            runner: Box::new(|input: I, _errors: &mut ValidationErrors| -> Result<I, Interrupt> {
                Ok(input)
            }),
            steps: 0,
        }
    }
}

impl<'r, I: 'r> Default for RuleChain<'r, I, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r, I: 'r, O: 'r> RuleChain<'r, I, O> {
    /// Append a step.
    pub fn add_rule<N, R>(self, mut rule: R) -> RuleChain<'r, I, N>
    where
        N: 'r,
        R: FnMut(O, &ValidationErrors) -> PackageResult<StepOutcome<N>> + 'r,
    {
        let mut previous = self.runner;
        RuleChain {
            runner: Box::new(move |input: I, errors: &mut ValidationErrors| -> Result<N, Interrupt> {
                let artifact = previous(input, errors)?;
                let outcome = rule(artifact, errors).map_err(Interrupt::Failed)?;
                settle(outcome, errors)
            }),
            steps: self.steps + 1,
        }
    }

    /// Append a step only when `condition` holds. Skipped steps leave the
    /// chain unchanged.
    pub fn add_rule_when<R>(self, rule: R, condition: bool) -> Self
    where
        R: FnMut(O, &ValidationErrors) -> PackageResult<StepOutcome<O>> + 'r,
    {
        if condition {
            self.add_rule(rule)
        } else {
            self
        }
    }

    /// Append a barrier that aborts if any issue has accumulated.
    pub fn throw_errors_now(self) -> Self {
        self.add_rule(throw_errors_now::<O>)
    }

    /// Number of steps appended so far.
    pub fn len(&self) -> usize {
        self.steps
    }

    /// Whether the chain has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }

    /// Run the chain with a fresh accumulator.
    pub fn validate(self, input: I) -> PackageResult<O> {
        self.validate_with(input, ValidationErrors::new())
    }

    /// Run the chain with the given accumulator (to pick its mode).
    ///
    /// Fails with [`PackageError::Invalid`] if the chain aborted or any
    /// issue was accumulated.
    pub fn validate_with(mut self, input: I, mut errors: ValidationErrors) -> PackageResult<O> {
        match (self.runner)(input, &mut errors) {
            Ok(output) if errors.is_empty() => Ok(output),
            Ok(_) | Err(Interrupt::Abort) => {
                tracing::debug!(issues = errors.len(), "rule chain rejected input");
                Err(PackageError::Invalid(errors))
            }
            Err(Interrupt::Failed(err)) => Err(err),
        }
    }

    /// Run the chain as a sub-chain, recording issues into `errors`.
    ///
    /// Returns `Ok(None)` if the chain aborted. Accumulated issues do not
    /// make this fail; the caller decides when to act on them.
    pub fn validate_into(
        mut self,
        input: I,
        errors: &mut ValidationErrors,
    ) -> PackageResult<Option<O>> {
        match (self.runner)(input, errors) {
            Ok(output) => Ok(Some(output)),
            Err(Interrupt::Abort) => Ok(None),
            Err(Interrupt::Failed(err)) => Err(err),
        }
    }
}

impl<I, O> std::fmt::Debug for RuleChain<'_, I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleChain").field("steps", &self.steps).finish()
    }
}

/// A step that aborts if any issue has accumulated so far.
pub fn throw_errors_now<A>(artifact: A, errors: &ValidationErrors) -> PackageResult<StepOutcome<A>> {
    if errors.is_empty() {
        Ok(StepOutcome::Continue(artifact))
    } else {
        Ok(StepOutcome::Abort(Vec::new()))
    }
}

fn settle<N>(outcome: StepOutcome<N>, errors: &mut ValidationErrors) -> Result<N, Interrupt> {
    match outcome {
        StepOutcome::Continue(artifact) => Ok(artifact),
        StepOutcome::Accumulate(artifact, issues) => {
            let any = !issues.is_empty();
            errors.extend(issues);
            if any && errors.is_fail_fast() {
                Err(Interrupt::Abort)
            } else {
                Ok(artifact)
            }
        }
        StepOutcome::Abort(issues) => {
            errors.extend(issues);
            Err(Interrupt::Abort)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h5p_core::IssueCode;
    use std::cell::RefCell;

    fn issue(msg: &str) -> ValidationIssue {
        ValidationIssue::new(IssueCode::FileUnreadable, msg)
    }

    #[test]
    fn empty_chain_returns_input() {
        let chain = RuleChain::<u32, u32>::new();
        assert!(chain.is_empty());
        assert_eq!(chain.validate(7).unwrap(), 7);
    }

    #[test]
    fn steps_transform_the_artifact() {
        let out = RuleChain::new()
            .add_rule(|n: u32, _: &ValidationErrors| Ok(StepOutcome::Continue(n * 2)))
            .add_rule(|n: u32, _: &ValidationErrors| Ok(StepOutcome::Continue(n.to_string())))
            .validate(21)
            .unwrap();
        assert_eq!(out, "42");
    }

    #[test]
    fn accumulated_issues_fail_at_the_end() {
        let reached = RefCell::new(false);
        let err = RuleChain::new()
            .add_rule(|n: u32, _: &ValidationErrors| {
                Ok(StepOutcome::accumulate(n, vec![issue("first")]))
            })
            .add_rule(|n: u32, _: &ValidationErrors| {
                *reached.borrow_mut() = true;
                Ok(StepOutcome::accumulate(n, vec![issue("second")]))
            })
            .validate(1)
            .unwrap_err();
        assert!(*reached.borrow());
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.messages(), vec!["first", "second"]);
    }

    #[test]
    fn abort_skips_later_steps() {
        let reached = RefCell::new(false);
        let err = RuleChain::new()
            .add_rule(|_: u32, _: &ValidationErrors| -> PackageResult<StepOutcome<u32>> {
                Ok(StepOutcome::abort(issue("fatal")))
            })
            .add_rule(|n: u32, _: &ValidationErrors| {
                *reached.borrow_mut() = true;
                Ok(StepOutcome::Continue(n))
            })
            .validate(1)
            .unwrap_err();
        assert!(!*reached.borrow());
        assert_eq!(err.validation_errors().unwrap().len(), 1);
    }

    #[test]
    fn barrier_stops_only_when_issues_pending() {
        let reached = RefCell::new(0);
        let count = |n: u32, _: &ValidationErrors| {
            *reached.borrow_mut() += 1;
            Ok(StepOutcome::Continue(n))
        };
        RuleChain::new()
            .throw_errors_now()
            .add_rule(count)
            .validate(1)
            .unwrap();
        assert_eq!(*reached.borrow(), 1);

        let err = RuleChain::new()
            .add_rule(|n: u32, _: &ValidationErrors| {
                Ok(StepOutcome::accumulate(n, vec![issue("pending")]))
            })
            .throw_errors_now()
            .add_rule(count)
            .validate(1)
            .unwrap_err();
        assert_eq!(*reached.borrow(), 1);
        assert_eq!(err.validation_errors().unwrap().messages(), vec!["pending"]);
    }

    #[test]
    fn fail_fast_aborts_on_first_accumulated_issue() {
        let reached = RefCell::new(false);
        let err = RuleChain::new()
            .add_rule(|n: u32, _: &ValidationErrors| {
                Ok(StepOutcome::accumulate(n, vec![issue("first")]))
            })
            .add_rule(|n: u32, _: &ValidationErrors| {
                *reached.borrow_mut() = true;
                Ok(StepOutcome::Continue(n))
            })
            .validate_with(1, ValidationErrors::fail_fast())
            .unwrap_err();
        assert!(!*reached.borrow());
        assert_eq!(err.validation_errors().unwrap().len(), 1);
    }

    #[test]
    fn conditional_rules_are_skipped() {
        let chain = RuleChain::new()
            .add_rule_when(
                |_: u32, _: &ValidationErrors| Ok(StepOutcome::abort(issue("never"))),
                false,
            )
            .add_rule_when(|n: u32, _: &ValidationErrors| Ok(StepOutcome::Continue(n + 1)), true);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.validate(1).unwrap(), 2);
    }

    #[test]
    fn step_failures_bypass_the_accumulator() {
        let err = RuleChain::new()
            .add_rule(|_: u32, _: &ValidationErrors| -> PackageResult<StepOutcome<u32>> {
                Err(PackageError::Io(std::io::Error::other("disk gone")))
            })
            .validate(1)
            .unwrap_err();
        assert!(matches!(err, PackageError::Io(_)));
    }

    #[test]
    fn steps_see_prior_issues() {
        let seen = RefCell::new(0);
        let _ = RuleChain::new()
            .add_rule(|n: u32, _: &ValidationErrors| {
                Ok(StepOutcome::accumulate(n, vec![issue("a"), issue("b")]))
            })
            .add_rule(|n: u32, errors: &ValidationErrors| {
                *seen.borrow_mut() = errors.len();
                Ok(StepOutcome::Continue(n))
            })
            .validate(1);
        assert_eq!(*seen.borrow(), 2);
    }

    #[test]
    fn sub_chain_reports_abort_as_none() {
        let mut errors = ValidationErrors::new();
        let out = RuleChain::new()
            .add_rule(|_: u32, _: &ValidationErrors| -> PackageResult<StepOutcome<u32>> {
                Ok(StepOutcome::abort(issue("bad library")))
            })
            .validate_into(1, &mut errors)
            .unwrap();
        assert!(out.is_none());
        assert_eq!(errors.len(), 1);

        let mut errors = ValidationErrors::new();
        let out = RuleChain::new()
            .add_rule(|n: u32, _: &ValidationErrors| {
                Ok(StepOutcome::accumulate(n, vec![issue("minor")]))
            })
            .validate_into(1, &mut errors)
            .unwrap();
        assert_eq!(out, Some(1));
        assert_eq!(errors.len(), 1);
    }
}
