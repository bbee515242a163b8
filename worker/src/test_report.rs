//! Spec §4.10 step 4 says only that sandboxed test execution runs inside C6;
//! it does not fix a test-report wire format (JUnit XML, TAP, …). Rather
//! than hard-code one, the worker takes a pluggable parser — the same
//! injected-trait pattern `context-engine` uses for `CoChangeIndex`.

use review_model::TestExecutionResult;
use sandbox_runner::ExecutionOutcome;

pub trait TestReportParser: Send + Sync {
    fn parse(&self, outcome: &ExecutionOutcome) -> Option<TestExecutionResult>;
}

/// No-op parser used when sandboxed test execution is disabled or no
/// project-specific report format has been wired in.
pub struct NoTestReport;

impl TestReportParser for NoTestReport {
    fn parse(&self, _outcome: &ExecutionOutcome) -> Option<TestExecutionResult> {
        None
    }
}
