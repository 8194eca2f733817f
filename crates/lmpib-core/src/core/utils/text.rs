/// Renders a floating point argument for the engine script.
///
/// Uses the shortest representation that round-trips, and always keeps a
/// decimal point or exponent so floats are never mistaken for integers.
pub fn fmt_number(value: f64) -> String {
    format!("{value:?}")
}

/// Normalizes free-form command text to newline-terminated lines.
///
/// Empty text emits nothing.
pub fn command_lines(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_number_keeps_decimal_point() {
        assert_eq!(fmt_number(0.0), "0.0");
        assert_eq!(fmt_number(300.0), "300.0");
        assert_eq!(fmt_number(0.01), "0.01");
    }

    #[test]
    fn fmt_number_uses_exponent_for_tiny_values() {
        assert_eq!(fmt_number(1e-10), "1e-10");
    }

    #[test]
    fn command_lines_terminates_with_newline_once() {
        assert_eq!(command_lines("run 0"), "run 0\n");
        assert_eq!(command_lines("run 0\n"), "run 0\n");
        assert_eq!(command_lines("a\nb"), "a\nb\n");
    }

    #[test]
    fn command_lines_emits_nothing_for_empty_text() {
        assert_eq!(command_lines(""), "");
    }
}
