//! Internal testing utilities for the rmo crates.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};

/// Runs table-driven tests.
///
/// Define a `Debug` struct, conventionally named `Case`, holding the inputs
/// and expected outputs of one test. Collect the cases into an array or `Vec`
/// and call [`test_each`](TestCases::test_each) with the test body.
///
/// Every case is run, even if earlier ones fail. Once all cases have run,
/// the test panics if any case panicked, listing the debug representation of
/// each failing case.
///
/// ```
/// use rmo_testing::TestCases;
///
/// #[derive(Debug)]
/// struct Case {
///     dims: [usize; 2],
///     numel: usize,
/// }
///
/// let cases = [
///     Case { dims: [5, 7], numel: 35 },
///     Case { dims: [0, 3], numel: 0 },
/// ];
///
/// cases.test_each(|case| {
///     assert_eq!(case.dims.iter().product::<usize>(), case.numel);
/// });
/// ```
///
/// Cases and the captured state of the test closure must be unwind safe,
/// since each case runs inside [`std::panic::catch_unwind`].
pub trait TestCases {
    /// The data for a single test case.
    type Case;

    /// Run `test` with a reference to each case.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Run `test` with an owned clone of each case.
    ///
    /// Useful when the test body needs to consume parts of the case.
    fn test_each_clone(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + Clone + UnwindSafe;
}

fn report_failures<T: Debug>(failures: &[T]) {
    assert!(
        failures.is_empty(),
        "{} test cases failed: {:?}",
        failures.len(),
        failures
    );
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe,
    {
        let failures: Vec<_> = self
            .into_iter()
            .filter(|case| std::panic::catch_unwind(|| test(case)).is_err())
            .collect();
        report_failures(&failures);
    }

    fn test_each_clone(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + Clone + UnwindSafe,
    {
        let test = &test;
        let failures: Vec<_> = self
            .into_iter()
            .filter(|case| {
                let owned = case.clone();
                std::panic::catch_unwind(move || test(owned)).is_err()
            })
            .collect();
        report_failures(&failures);
    }
}
