use std::time::Duration;

/// Formats a duration as `m:ss`, or `h:mm:ss` from one hour on.
///
/// Sub-second precision is truncated.
///
/// # Examples
///
/// ```rust
/// assert_eq!(format_duration(Duration::from_secs(75)), "1:15");
/// assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Replaces characters that cannot appear in a file name component.
///
/// Path separators and control characters become `_`, so that an episode
/// title can never escape the output directory.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|chr| {
            if chr == '/' || chr == '\\' || chr.is_control() {
                '_'
            } else {
                chr
            }
        })
        .collect()
}
