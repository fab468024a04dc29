//! Stripping of terminal control sequences from captured shell output.
//!
//! Only CSI sequences of the form `ESC [ <digits ; ?>* <letter>` are removed.
//! Other escape sequences (OSC titles or a lone ESC) are left
//! in the text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CSI_SEQUENCE: Regex = Regex::new(r"\x1b\[[0-9;?]*[a-zA-Z]").unwrap();
}

/// Remove CSI escape sequences from `text`.
///
/// Removal repeats until nothing matches, since deleting one sequence can
/// join its neighbours into a new one (`"\x1b[\x1b[0mA"` becomes `"\x1b[A"`).
/// The result is therefore a fixed point: stripping it again changes nothing.
///
/// # Examples
///
/// ```
/// use docker_exec_mcp_core::strip_ansi;
///
/// assert_eq!(strip_ansi("\x1b[31mHELLO\x1b[0m"), "HELLO");
/// ```
pub fn strip_ansi(text: &str) -> String {
    let mut current = text.to_string();
    while CSI_SEQUENCE.is_match(&current) {
        current = CSI_SEQUENCE.replace_all(&current, "").into_owned();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_color_codes() {
        assert_eq!(strip_ansi("\x1b[31mHELLO\x1b[0m"), "HELLO");
    }

    #[test]
    fn test_strip_plain_text_unchanged() {
        assert_eq!(strip_ansi("root@c1:/# ls\r\n"), "root@c1:/# ls\r\n");
    }

    #[test]
    fn test_strip_bracketed_paste_toggle() {
        assert_eq!(
            strip_ansi("\x1b[?2004hroot@c1:/# \x1b[?2004l\r"),
            "root@c1:/# \r"
        );
    }

    #[test]
    fn test_strip_cursor_movement() {
        assert_eq!(strip_ansi("a\x1b[2Kb\x1b[1;1Hc\x1b[Kd"), "abcd");
    }

    #[test]
    fn test_osc_sequence_left_untouched() {
        let title = "\x1b]0;root@c1: /\x07prompt";
        assert_eq!(strip_ansi(title), title);
    }

    #[test]
    fn test_lone_escape_left_untouched() {
        assert_eq!(strip_ansi("a\x1bb"), "a\x1bb");
        assert_eq!(strip_ansi("\x1b[12"), "\x1b[12");
    }

    #[test]
    fn test_nested_sequence_removed_fully() {
        assert_eq!(strip_ansi("\x1b[\x1b[0mAx"), "x");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(strip_ansi(""), "");
    }
}
