// Unit tests for child output line handling

use crate::supervisor::spawn::trim_line_ending;

/// **VALUE**: Verifies only the line terminator is stripped from forwarded output.
///
/// **WHY THIS MATTERS**: Server output is forwarded without transformation; trailing spaces
/// and invalid bytes in the middle of a line are part of the message.
#[test]
fn given_raw_lines_when_trimming_then_only_terminator_removed() {
    assert_eq!(trim_line_ending(b"ready on 3457\n"), b"ready on 3457");
    assert_eq!(trim_line_ending(b"windows line\r\n"), b"windows line");
    assert_eq!(trim_line_ending(b"no newline at eof"), b"no newline at eof");
    assert_eq!(trim_line_ending(b"bad \xff byte \n"), b"bad \xff byte ");
    assert_eq!(trim_line_ending(b"\n"), b"");
}
