// Prompt templates for the completion endpoint.
// The endpoint is a plain completion API with no system role, so every
// instruction lives in the prompt body itself.

/// Resume field extraction. `{resume_text}` is replaced with the extracted document text.
pub const RESUME_FIELDS_PROMPT: &str = r#"
Extract the following information from the resume text below:

- Name
- Email
- Phone
- Education
- Experience
- Skills

Provide the information in JSON format with the following structure:

{
	"name": "",
	"email": "",
	"phone": "",
	"education": "",
	"experience": "",
	"skills": ""
}

Every value must be a single string. Use an empty string when a field is not present.
Return ONLY the JSON object. No markdown fences, no explanations.

Resume Text:
{resume_text}
"#;

pub fn resume_fields_prompt(resume_text: &str) -> String {
    RESUME_FIELDS_PROMPT.replace("{resume_text}", resume_text)
}
