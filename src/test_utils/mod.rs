//! Fixtures and in-memory port doubles shared by unit and integration tests.

pub mod fakes;
pub mod fixtures;

/// One row of a table-driven test.
#[derive(Debug, Clone)]
pub struct TestCase<I, E> {
    pub name: &'static str,
    pub input: I,
    pub expected: E,
}

/// Run every row through `test_fn`, stopping at the first mismatch.
pub fn run_table_tests<I, E, F>(cases: Vec<TestCase<I, E>>, test_fn: F) -> Result<(), String>
where
    I: std::fmt::Debug,
    E: std::fmt::Debug + PartialEq,
    F: Fn(I) -> E,
{
    for case in cases {
        let name = case.name;
        let input = format!("{:?}", case.input);
        let actual = test_fn(case.input);
        tracing::debug!(case = name, %input, ?actual, "table case");
        if actual != case.expected {
            return Err(format!(
                "case '{name}' with input {input}: expected {:?}, got {actual:?}",
                case.expected
            ));
        }
    }
    Ok(())
}
