//! Prompt template substitution.
//!
//! Templates carry positional `!<INPUT n>!` placeholders and an optional
//! comment block above a marker line; only the section after the marker is
//! sent to the provider. Reading template files is the caller's concern.

/// Marker separating a template's comment header from its body.
pub const COMMENT_BLOCK_MARKER: &str = "<commentblockmarker>###</commentblockmarker>";

/// Replace positional placeholders in `template` and strip the comment block.
pub fn render_template(template: &str, inputs: &[&str]) -> String {
    let mut prompt = template.to_string();
    for (count, input) in inputs.iter().enumerate() {
        prompt = prompt.replace(&format!("!<INPUT {count}>!"), input);
    }
    if let Some(body) = prompt.split(COMMENT_BLOCK_MARKER).nth(1) {
        prompt = body.to_string();
    }
    prompt.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_placeholders() {
        let template = "!<INPUT 0>! is currently !<INPUT 1>!.";
        let rendered = render_template(template, &["Klaus", "reading"]);
        assert_eq!(rendered, "Klaus is currently reading.");
    }

    #[test]
    fn test_comment_block_is_stripped() {
        let template = "variables:\n0: name\n<commentblockmarker>###</commentblockmarker>\nHello !<INPUT 0>!";
        let rendered = render_template(template, &["Isabella"]);
        assert_eq!(rendered, "Hello Isabella");
    }

    #[test]
    fn test_repeated_placeholder() {
        let template = "!<INPUT 0>! talks to !<INPUT 0>!";
        assert_eq!(render_template(template, &["Klaus"]), "Klaus talks to Klaus");
    }

    #[test]
    fn test_missing_inputs_leave_placeholders() {
        let template = "Hello !<INPUT 0>! and !<INPUT 1>!";
        assert_eq!(
            render_template(template, &["Klaus"]),
            "Hello Klaus and !<INPUT 1>!"
        );
    }
}
