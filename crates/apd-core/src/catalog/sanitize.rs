//! Filesystem-safe service code sanitization.

/// Sanitizes a service code for use as a directory/file name.
///
/// - Replaces NUL, `/`, `\`, whitespace, and control characters with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots, spaces, and underscores
/// - Limits length to 255 bytes (NAME_MAX)
pub fn sanitize_service_code(code: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(code.len());
    let mut prev_underscore = false;
    for c in code.chars() {
        let safe = !(c == '\0' || c == '/' || c == '\\' || c.is_control() || c.is_whitespace());
        if safe {
            out.push(c);
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.' || c == '_');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typical_codes_pass_through() {
        assert_eq!(sanitize_service_code("AmazonEC2"), "AmazonEC2");
        assert_eq!(sanitize_service_code("AWSLambda"), "AWSLambda");
    }

    #[test]
    fn replaces_path_separators() {
        assert_eq!(sanitize_service_code("a/b\\c"), "a_b_c");
    }

    #[test]
    fn collapses_and_trims_underscores() {
        assert_eq!(sanitize_service_code("a  \t b"), "a_b");
        assert_eq!(sanitize_service_code("..weird.."), "weird");
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(sanitize_service_code("ec2\x00\x01x"), "ec2_x");
    }
}
