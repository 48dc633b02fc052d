//! Prompt templates for the pipeline steps

use crate::config::ContentConfig;
use crate::error::Result;
use tera::{Context, Tera};

const SUBTOPICS_TEMPLATE: &str = "\
List {{ count }} relevant subtopics about \"{{ theme }}\" for {{ platform }} posts \
aimed at {{ audience }}. Write them in {{ language }}. \
Answer with a numbered list, one subtopic per line, and nothing else.";

const SELECTION_TEMPLATE: &str = "\
Theme: \"{{ theme }}\"
Among these subtopics:
{% for subtopic in subtopics %}{{ loop.index }}. {{ subtopic }}
{% endfor %}
Choose the most relevant one for an {{ platform }} post and explain why. \
Reply with JSON only, in the form {\"choice\": \"<the subtopic exactly as listed>\", \"reason\": \"<your justification in {{ language }}>\"}.";

const CAPTION_TEMPLATE: &str = "\
You are a creative copywriter. Write an {{ platform }} caption about \"{{ subtopic }}\" \
in {{ language }}. Length: {{ length }}. Formality: {{ formality }}. \
Include a clear call to action, 2 to 4 hashtags and emoji. \
Reply with JSON only, in the form {\"caption\": \"...\", \"hashtags\": [\"#...\"], \"cta\": \"...\"}.";

const IMAGE_PROMPT_TEMPLATE: &str = "\
You are a modern-day Leonardo da Vinci. Based on the subtopic \"{{ subtopic }}\", \
return only one detailed prompt for generating the image of an {{ platform }} post. \
Do not add any introduction, explanation or commentary.";

/// Renders the instruction sent to the backend by each step
pub struct PromptEngine {
    tera: Tera,
    content: ContentConfig,
}

impl PromptEngine {
    pub fn new(content: ContentConfig) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]); // Prompts are plain text
        tera.add_raw_templates(vec![
            ("subtopics", SUBTOPICS_TEMPLATE),
            ("selection", SELECTION_TEMPLATE),
            ("caption", CAPTION_TEMPLATE),
            ("image_prompt", IMAGE_PROMPT_TEMPLATE),
        ])?;

        Ok(Self { tera, content })
    }

    pub fn subtopics(&self, theme: &str, count: usize) -> Result<String> {
        let mut context = self.base_context();
        context.insert("theme", theme);
        context.insert("count", &count);
        self.render("subtopics", &context)
    }

    pub fn selection(&self, theme: &str, subtopics: &[String]) -> Result<String> {
        let mut context = self.base_context();
        context.insert("theme", theme);
        context.insert("subtopics", subtopics);
        self.render("selection", &context)
    }

    pub fn caption(&self, subtopic: &str, length: &str, formality: &str) -> Result<String> {
        let mut context = self.base_context();
        context.insert("subtopic", subtopic);
        context.insert("length", length);
        context.insert("formality", formality);
        self.render("caption", &context)
    }

    pub fn image_prompt(&self, subtopic: &str) -> Result<String> {
        let mut context = self.base_context();
        context.insert("subtopic", subtopic);
        self.render("image_prompt", &context)
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("audience", &self.content.audience);
        context.insert("language", &self.content.language);
        context.insert("platform", &self.content.platform);
        context
    }

    fn render(&self, name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(name, context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PromptEngine {
        PromptEngine::new(ContentConfig::default()).unwrap()
    }

    #[test]
    fn test_subtopics_prompt_mentions_count_theme_and_audience() {
        let prompt = engine().subtopics("sustentabilidade", 5).unwrap();
        assert!(prompt.contains("List 5 relevant subtopics"));
        assert!(prompt.contains("\"sustentabilidade\""));
        assert!(prompt.contains("young adults aged 18-30"));
    }

    #[test]
    fn test_selection_prompt_enumerates_subtopics() {
        let subtopics = vec!["Reciclagem".to_string(), "Energia solar".to_string()];
        let prompt = engine().selection("sustentabilidade", &subtopics).unwrap();
        assert!(prompt.contains("1. Reciclagem\n"));
        assert!(prompt.contains("2. Energia solar\n"));
        assert!(prompt.contains("{\"choice\""));
    }

    #[test]
    fn test_caption_prompt_carries_tone_settings() {
        let prompt = engine()
            .caption("Energia solar", "short (one or two sentences)", "low, casual")
            .unwrap();
        assert!(prompt.contains("Length: short (one or two sentences)."));
        assert!(prompt.contains("Formality: low, casual."));
        assert!(prompt.contains("2 to 4 hashtags"));
    }

    #[test]
    fn test_prompts_are_not_html_escaped() {
        let prompt = engine().image_prompt("Café & <pão>").unwrap();
        assert!(prompt.contains("\"Café & <pão>\""));
        assert!(prompt.contains("Leonardo da Vinci"));
    }

    #[test]
    fn test_custom_content_settings() {
        let engine = PromptEngine::new(ContentConfig {
            audience: "retirees".to_string(),
            language: "English".to_string(),
            platform: "Threads".to_string(),
        })
        .unwrap();
        let prompt = engine.subtopics("gardening", 3).unwrap();
        assert!(prompt.contains("retirees"));
        assert!(prompt.contains("Threads posts"));
        assert!(prompt.contains("in English"));
    }
}
