//! GPU-name filters used by the machine list and the price monitor.
//!
//! A filter is a comma-separated list of case-insensitive patterns where `*`
//! matches any substring. Whitespace inside a pattern is significant
//! (`RTX 4090`), surrounding whitespace is not.

/// Parse comma-separated patterns.
///
/// - Trims whitespace
/// - Drops empty entries
/// - Empty input yields an empty list, which matches every GPU
pub fn parse_gpu_patterns(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or("")
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_uppercase())
        .collect()
}

/// Return true if `gpu_name` matches at least one pattern, or if there are none.
pub fn gpu_name_matches(gpu_name: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let name = gpu_name.trim().to_ascii_uppercase();
    if name.is_empty() {
        return false;
    }
    patterns
        .iter()
        .any(|p| glob_match(&name, &p.trim().to_ascii_uppercase()))
}

fn glob_match(name: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    if !pattern.contains('*') {
        return name == pattern;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts.first().copied().unwrap_or("");
    let last = parts.last().copied().unwrap_or("");

    // Anchored prefix / suffix, then the middle pieces in order.
    if !name.starts_with(first) {
        return false;
    }
    let mut idx = first.len();
    let middle_end = parts.len().saturating_sub(1);
    for part in parts.iter().take(middle_end).skip(1) {
        if part.is_empty() {
            continue;
        }
        match name[idx..].find(part) {
            Some(pos) => idx += pos + part.len(),
            None => return false,
        }
    }
    name.len() >= idx + last.len() && name[idx..].ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pats(raw: &str) -> Vec<String> {
        parse_gpu_patterns(Some(raw))
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(parse_gpu_patterns(None).is_empty());
        assert!(gpu_name_matches("H100 SXM", &pats(" , ")));
    }

    #[test]
    fn exact_names_are_case_insensitive() {
        assert!(gpu_name_matches("rtx 4090", &pats("RTX 4090")));
        assert!(!gpu_name_matches("RTX 4090 Ti", &pats("RTX 4090")));
    }

    #[test]
    fn wildcards_anchor_prefix_and_suffix() {
        let p = pats("A100*,*H100*");
        assert!(gpu_name_matches("A100 PCIE", &p));
        assert!(gpu_name_matches("NVIDIA H100 SXM", &p));
        assert!(!gpu_name_matches("RTX A100", &p));
        assert!(gpu_name_matches("RTX 3090", &pats("RTX*90")));
        assert!(!gpu_name_matches("RTX 3080", &pats("RTX*90")));
    }

    #[test]
    fn overlapping_prefix_and_suffix_do_not_match_short_names() {
        assert!(!gpu_name_matches("AB", &pats("AB*B")));
        assert!(gpu_name_matches("ABB", &pats("AB*B")));
    }

    #[test]
    fn empty_name_never_matches_a_real_filter() {
        assert!(!gpu_name_matches("  ", &pats("*")));
    }
}
