use junit_report::{Duration, ReportBuilder, TestCaseBuilder, TestSuiteBuilder};
use std::path::Path;

use crate::test::TestSuite;
use crate::{TbError, TbResult};

fn failure_type(e: &TbError) -> &'static str {
    match e {
        TbError::Mismatch(_) | TbError::Check(_) => "failure",
        TbError::Timeout { .. } | TbError::Starved { .. } => "timeout",
        _ => "error",
    }
}

pub(crate) fn create_junit_xml(suite: &TestSuite, path: &Path) -> TbResult {
    let mut test_cases = Vec::new();

    for t in suite.iter() {
        let duration = Duration::seconds_f64(t.time_secs);
        let tc = match &t.result {
            Some(Ok(())) => TestCaseBuilder::success(&t.name, duration),
            Some(Err(e)) => {
                TestCaseBuilder::failure(&t.name, duration, failure_type(e), &e.to_string())
            }
            None => TestCaseBuilder::skipped(&t.name),
        }
        .build();
        test_cases.push(tc);
    }

    let test_suite = TestSuiteBuilder::new(suite.name())
        .add_testcases(test_cases)
        .build();
    let report = ReportBuilder::new().add_testsuite(test_suite).build();
    let file = std::fs::File::create(path)?;
    report
        .write_xml(file)
        .map_err(|e| TbError::Report(format!("{:?}", e)))
}
