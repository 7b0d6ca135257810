// Instruction text sent to the screening agent. The job description itself
// lives in the agent's configuration on the Lyzr side; only the task framing
// is sent per call.

/// Screening instruction. Replace `{role}` and `{notify_email}` before sending.
pub const SCREENING_INSTRUCTION_TEMPLATE: &str = "\
    Screen this resume against the {role} job description. \
    Evaluate skills match, experience, and qualifications. \
    If the candidate is a fit, send an email summary to {notify_email} via Gmail.";

/// The role the agent's job description describes.
pub const SCREENED_ROLE: &str = "Platform Engineer";

pub fn screening_instruction(notify_email: &str) -> String {
    SCREENING_INSTRUCTION_TEMPLATE
        .replace("{role}", SCREENED_ROLE)
        .replace("{notify_email}", notify_email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_fills_every_placeholder() {
        let text = screening_instruction("hiring@acme.test");
        assert!(text.contains("Platform Engineer"));
        assert!(text.contains("hiring@acme.test"));
        assert!(!text.contains('{'));
    }
}
