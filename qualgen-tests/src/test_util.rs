use itertools::Itertools;

/// Adapted from `chalk-tests`' own `assert_test_result_eq`: trims each line
/// of both sides before comparing, so incidental indentation differences
/// don't fail a test, and on mismatch prints a line-level diff rather than
/// just the two blobs.
pub fn assert_test_result_eq(expected: &str, actual: &str) {
    let expected = trimmed(expected);
    let actual = trimmed(actual);
    if expected == actual {
        return;
    }

    let mut diff_text = String::new();
    let mut accumulator = String::new();
    for difference in diff::lines(&expected, &actual) {
        match difference {
            diff::Result::Both(s, _) => {
                accumulator.push_str("  ");
                accumulator.push_str(s);
                accumulator.push('\n');
            }
            diff::Result::Left(s) => {
                flush(&mut diff_text, &mut accumulator);
                diff_text.push_str("- ");
                diff_text.push_str(s);
                diff_text.push('\n');
            }
            diff::Result::Right(s) => {
                flush(&mut diff_text, &mut accumulator);
                diff_text.push_str("+ ");
                diff_text.push_str(s);
                diff_text.push('\n');
            }
        }
    }
    flush(&mut diff_text, &mut accumulator);

    assert!(
        false,
        "expected did not match actual, diff:\n{}\n---expected---\n{}\n---actual---\n{}",
        diff_text, expected, actual
    );
}

fn flush(diff_text: &mut String, accumulator: &mut String) {
    diff_text.push_str(accumulator);
    accumulator.clear();
}

fn trimmed(text: &str) -> String {
    text.lines().map(str::trim).intersperse("\n").collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_incidental_indentation() {
        assert_test_result_eq("  a\n  b  ", "a\nb");
    }

    #[test]
    #[should_panic(expected = "expected did not match actual")]
    fn reports_real_mismatches() {
        assert_test_result_eq("a\nb", "a\nc");
    }
}
