//! Utility functions for the renderer module.

/// Format a float for WGSL, removing trailing zeros but always keeping a
/// decimal point so the literal stays an `f32`.
pub fn fmt_f32(v: f32) -> String {
    if v.is_finite() {
        let s = format!("{v:.9}");
        let s = s.trim_end_matches('0');
        if let Some(stripped) = s.strip_suffix('.') {
            format!("{stripped}.0")
        } else {
            s.to_string()
        }
    } else {
        "0.0".to_string()
    }
}

/// Sanitize a string to be a valid WGSL identifier.
pub fn sanitize_wgsl_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Source with line numbers, for diagnostics.
pub fn numbered_source(source: &str) -> String {
    let mut output = String::new();
    output.push_str("---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}
