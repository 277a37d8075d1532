//! Helpers for normalizing caller-supplied values.

/// Sanitize arbitrary string input by trimming whitespace and dropping empties.
pub(crate) fn sanitize_string(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Normalize a caller-supplied filename to its final path component.
///
/// Uploads routinely arrive with client-side directory prefixes; only the basename is
/// meaningful for document records.
pub(crate) fn sanitize_filename(value: Option<String>) -> Option<String> {
    sanitize_string(value).and_then(|name| {
        name.rsplit(['/', '\\'])
            .map(str::trim)
            .find(|part| !part.is_empty())
            .map(str::to_string)
    })
}

/// Match a model-produced category response against the known label set.
///
/// Comparison is case-insensitive on trimmed values; a response that merely contains a label
/// (models often answer in a sentence) still resolves to it.
pub(crate) fn normalize_category(response: &str, labels: &[&str]) -> Option<String> {
    let trimmed = response.trim().trim_matches(|c| matches!(c, '"' | '.'));
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();

    for label in labels {
        if lowered == label.to_lowercase() {
            return Some((*label).to_string());
        }
    }
    for label in labels {
        if lowered.contains(&label.to_lowercase()) {
            return Some((*label).to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_string_trims_and_drops_empty() {
        assert_eq!(
            sanitize_string(Some("  report.pdf ".into())),
            Some("report.pdf".to_string())
        );
        assert_eq!(sanitize_string(Some("   ".into())), None);
        assert_eq!(sanitize_string(None), None);
    }

    #[test]
    fn sanitize_filename_strips_directories() {
        assert_eq!(
            sanitize_filename(Some("uploads/2026/report.pdf".into())),
            Some("report.pdf".to_string())
        );
        assert_eq!(
            sanitize_filename(Some(r"C:\docs\scan.png".into())),
            Some("scan.png".to_string())
        );
    }

    #[test]
    fn normalize_category_matches_exact_and_contained_labels() {
        let labels = ["Operations", "Finance"];
        assert_eq!(
            normalize_category("finance", &labels),
            Some("Finance".to_string())
        );
        assert_eq!(
            normalize_category("The category is Operations.", &labels),
            Some("Operations".to_string())
        );
        assert_eq!(normalize_category("unrelated", &labels), None);
    }
}
