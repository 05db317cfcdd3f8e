use futures::future::BoxFuture;
use num_format::{Locale, ToFormattedString};
use prettytable::{Cell, Row, Table};

use crate::signal::SimObject;
use crate::TbResult;

/// A test scenario: receives the design root and runs as the test's top task.
pub type TestFn = fn(SimObject) -> BoxFuture<'static, TbResult>;

#[derive(Debug)]
pub struct Test {
    pub name: String,
    pub generator: TestFn,
    pub result: Option<TbResult>,
    pub time_secs: f64,
    pub sim_time_ns: f64,
}

impl Test {
    pub fn new(name: &str, generator: TestFn) -> Self {
        Self {
            name: name.to_string(),
            generator,
            result: None,
            time_secs: 0.0,
            sim_time_ns: 0.0,
        }
    }

    pub fn set_result(&mut self, result: TbResult) {
        self.result = Some(result);
    }

    pub fn passed(&self) -> bool {
        matches!(self.result, Some(Ok(())))
    }
}

#[derive(Debug)]
pub struct TestSuite {
    name: String,
    tests: Vec<Test>,
}

impl TestSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tests: Vec::new(),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn len(&self) -> usize {
        self.tests.len()
    }
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
    pub fn iter(&self) -> core::slice::Iter<'_, Test> {
        self.tests.iter()
    }
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, Test> {
        self.tests.iter_mut()
    }
    pub fn push(&mut self, test: Test) {
        self.tests.push(test);
    }
    pub fn get(&self, name: &str) -> Option<&Test> {
        self.tests.iter().find(|t| t.name == name)
    }

    /// True when every test ran and passed.
    pub fn passed(&self) -> bool {
        self.tests.iter().all(Test::passed)
    }

    pub fn summary(&self) -> Table {
        let mut table = Table::new();
        table.set_titles(Row::new(
            ["TEST", "RESULT", "SIM TIME (ns)", "REAL TIME (s)", "SIM SPEED (ns/s)"]
                .iter()
                .map(|s| Cell::new(s))
                .collect(),
        ));
        for t in &self.tests {
            let result = match &t.result {
                Some(Ok(())) => "PASS".to_string(),
                Some(Err(e)) => format!("FAIL: {}", e),
                None => "NOT RUN".to_string(),
            };
            let sim_speed = if t.time_secs > 0.0 {
                t.sim_time_ns / t.time_secs
            } else {
                0.0
            };
            table.add_row(Row::new(vec![
                Cell::new(&t.name),
                Cell::new(&result),
                Cell::new(&(t.sim_time_ns as u64).to_formatted_string(&Locale::en)),
                Cell::new(&format!("{:.3}", t.time_secs)),
                Cell::new(&(sim_speed as u64).to_formatted_string(&Locale::en)),
            ]));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TbError;
    use futures::FutureExt;

    async fn nop(_dut: SimObject) -> TbResult {
        Ok(())
    }

    #[test]
    fn suite_passes_only_when_every_test_passed() {
        let mut suite = TestSuite::new("unit");
        suite.push(Test::new("a", |dut| nop(dut).boxed()));
        suite.push(Test::new("b", |dut| nop(dut).boxed()));
        assert!(!suite.passed());
        for t in suite.iter_mut() {
            t.set_result(Ok(()));
        }
        assert!(suite.passed());
        suite.push(Test::new("c", |dut| nop(dut).boxed()));
        suite.iter_mut().last().unwrap().set_result(Err(TbError::InvalidCycles(0)));
        assert!(!suite.passed());
        assert_eq!(suite.len(), 3);
    }

    #[test]
    fn summary_has_a_row_per_test() {
        let mut suite = TestSuite::new("unit");
        let mut t = Test::new("load", |dut| nop(dut).boxed());
        t.set_result(Ok(()));
        t.sim_time_ns = 12_345.0;
        suite.push(t);
        let text = suite.summary().to_string();
        assert!(text.contains("load"));
        assert!(text.contains("PASS"));
        assert!(text.contains("12,345"));
    }
}
