use crate::models::{ProcessRecord, RawProcess};

/// Visibility policy. Hidden "default" processes are the ones without a real
/// creation time; this is a heuristic, not a permission check.
pub fn is_visible(raw: &RawProcess, hide_default_processes: bool, search: &str) -> bool {
    if hide_default_processes && !raw.created_at.is_known() {
        return false;
    }
    search.is_empty() || raw.name == search
}

/// Filters a raw listing and gives every survivor a fresh observation id.
pub fn tag_and_filter(
    processes: Vec<RawProcess>,
    hide_default_processes: bool,
    search: &str,
) -> Vec<ProcessRecord> {
    processes
        .into_iter()
        .filter(|raw| is_visible(raw, hide_default_processes, search))
        .map(ProcessRecord::tag)
        .collect()
}
