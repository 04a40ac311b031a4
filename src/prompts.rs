//! Prompts for the notation-rewrite completion call.
//!
//! The wording is fixed: it is not exposed through configuration, so every
//! run sends the same instructions and only the document text varies.

/// Persona sent as the system message.
pub const SYSTEM_PERSONA: &str = "You are an intelligent assistant.";

/// Instruction template sent as the user message.
///
/// `{text}` is replaced verbatim with the extracted document text by
/// [`notation_prompt`].
pub const NOTATION_TEMPLATE: &str = r#"You are an intelligent assistant. Your task is to convert LaTeX code in the given text to plain English and provide summaries for tables and images. Follow these specific instructions:

1. Keep the plain text exactly as it is. Do not provide any overview or summary of the entire text.
2. Convert any LaTeX code into a human-readable format. For example, $\alpha$ should be read as "alpha", and $ax^2+bx+c=0$ should be read as "a x squared plus b x plus c equals zero".
3. For tables, provide a summarized explanation of the concept covered in the table without mentioning the formatting. For example, if a table shows a logical representation of inputs and outputs, explain the logical relationship in plain English.
4. For images, mention that there is an image at that position, but do not narrate the source or provide additional context about the image.

Text to convert:
{text}"#;

/// Build the user message for `text`.
pub fn notation_prompt(text: &str) -> String {
    // `replace` would also rewrite a literal "{text}" inside the document.
    match NOTATION_TEMPLATE.split_once("{text}") {
        Some((head, tail)) => {
            let mut prompt = String::with_capacity(NOTATION_TEMPLATE.len() + text.len());
            prompt.push_str(head);
            prompt.push_str(text);
            prompt.push_str(tail);
            prompt
        }
        None => format!("{NOTATION_TEMPLATE}\n{text}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_text_verbatim() {
        let text = "Intro\n$x^2$\n";
        let prompt = notation_prompt(text);
        assert!(prompt.contains(text));
        assert!(prompt.ends_with(text));
        assert!(!prompt.contains("{text}"));
    }

    #[test]
    fn prompt_keeps_all_four_rules() {
        let prompt = notation_prompt("x");
        for rule in ["1. Keep the plain text", "2. Convert any LaTeX", "3. For tables", "4. For images"] {
            assert!(prompt.contains(rule), "missing rule: {rule}");
        }
    }

    #[test]
    fn placeholder_inside_document_is_not_expanded() {
        let prompt = notation_prompt("literal {text} here");
        assert!(prompt.ends_with("literal {text} here"));
    }
}
