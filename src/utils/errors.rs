const MAX_ERROR_LEN: usize = 160;

/// Shorten a provider/store error message for a single log line
///
/// Collapses whitespace and cuts long bodies such as Alpha Vantage's
/// throttling notice:
/// "Rate limited: Thank you for using Alpha Vantage! Our standard API rate limit is ..."
pub fn clean_error(error_msg: &str) -> String {
    let collapsed = error_msg.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= MAX_ERROR_LEN {
        return collapsed;
    }

    let mut cut: String = collapsed.chars().take(MAX_ERROR_LEN).collect();
    cut.push_str("...");
    cut
}
