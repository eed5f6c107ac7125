/// Interpret a string value such as "1" or "no" as a boolean.
pub fn str_as_bool(s: &str) -> bool {
    match s {
        "1" | "true" | "t" | "yes" | "y" => true,
        "0" | "false" | "f" | "no" | "n" => false,
        _ => {
            tracing::warn!("Unrecognized boolean value \"{}\"", s);
            false
        }
    }
}

/// Return whether a feature flag controlled by an environment variable is
/// enabled.
pub fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .as_ref()
        .map(|s| str_as_bool(s))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use rmo_testing::TestCases;

    use super::{env_flag, str_as_bool};

    #[test]
    fn test_str_as_bool() {
        #[derive(Debug)]
        struct Case {
            value: &'static str,
            expected: bool,
        }

        let cases = [
            Case {
                value: "1",
                expected: true,
            },
            Case {
                value: "yes",
                expected: true,
            },
            Case {
                value: "0",
                expected: false,
            },
            Case {
                value: "n",
                expected: false,
            },
            Case {
                value: "maybe",
                expected: false,
            },
        ];

        cases.test_each(|case| assert_eq!(str_as_bool(case.value), case.expected));
    }

    #[test]
    fn test_env_flag_default() {
        assert!(env_flag("RMO_TEST_FLAG_THAT_IS_NEVER_SET", true));
        assert!(!env_flag("RMO_TEST_FLAG_THAT_IS_NEVER_SET", false));
    }
}
