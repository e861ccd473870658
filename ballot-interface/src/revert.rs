//! Extraction of human readable revert reasons from provider error messages.

const REASON_MARKER: &str = "reason:";

/// Returns the text following the first `reason:` marker, trimmed and cut at the end of its
/// line. Messages without a marker, or with nothing after it, are returned unchanged.
pub fn extract_reason(message: &str) -> &str {
    let Some(position) = message.find(REASON_MARKER) else {
        return message;
    };

    let reason = message[position + REASON_MARKER.len()..]
        .trim_start()
        .split(['\n', '\r', '\u{2028}', '\u{2029}'])
        .next()
        .unwrap_or_default()
        .trim();

    if reason.is_empty() {
        message
    } else {
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_after_marker() {
        assert_eq!(
            "Only admin can register",
            extract_reason("execution reverted: reason: Only admin can register")
        );
    }

    #[test]
    fn test_reason_stops_at_line_end() {
        let message = "The contract function \"vote\" reverted with the following reason:\nVoter has already voted.\n\nContract Call:\n  function: vote(uint256)";
        assert_eq!("Voter has already voted.", extract_reason(message));
    }

    #[test]
    fn test_no_marker_returns_message() {
        assert_eq!(
            "execution reverted",
            extract_reason("execution reverted")
        );
    }

    #[test]
    fn test_empty_reason_returns_message() {
        assert_eq!("reverted, reason:  ", extract_reason("reverted, reason:  "));
    }
}
