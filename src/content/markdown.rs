//! Markdown rendering with syntax highlighting

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::error::SiteError;
use crate::helpers::html_escape;

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Theme,
    line_numbers: bool,
}

impl MarkdownRenderer {
    /// Create a renderer using one of syntect's bundled themes
    pub fn with_options(theme: &str, line_numbers: bool) -> Result<Self, SiteError> {
        let mut theme_set = ThemeSet::load_defaults();
        let theme = theme_set.themes.remove(theme).ok_or_else(|| {
            let mut known: Vec<_> = theme_set.themes.keys().cloned().collect();
            known.sort();
            SiteError::config(format!(
                "unknown highlight theme {:?} (available: {})",
                theme,
                known.join(", ")
            ))
        })?;

        Ok(Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
            line_numbers,
        })
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        // Front-matter is stripped by FrontMatter::parse, so no metadata blocks here
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_GFM;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(info) => fence_language(&info),
                        CodeBlockKind::Indented => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    let highlighted =
                        self.highlight_code(&code_block_content, code_block_lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                _ if in_code_block => {}
                _ => events.push(event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        html_output
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("plaintext");

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let lang_class = html_escape(lang);

        match self.highlight_lines(code, syntax) {
            Ok(lines) => {
                if self.line_numbers {
                    self.add_line_numbers(&lines, &lang_class)
                } else {
                    format!(
                        r#"<pre class="highlight"{}><code class="language-{}">{}</code></pre>"#,
                        self.background_style(),
                        lang_class,
                        lines.concat()
                    )
                }
            }
            Err(e) => {
                tracing::debug!("Highlighting failed for {}: {}", lang, e);
                format!(
                    r#"<pre class="highlight"><code class="language-{}">{}</code></pre>"#,
                    lang_class,
                    html_escape(code)
                )
            }
        }
    }

    fn highlight_lines(
        &self,
        code: &str,
        syntax: &SyntaxReference,
    ) -> Result<Vec<String>, syntect::Error> {
        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut lines = Vec::new();

        for line in LinesWithEndings::from(code) {
            let regions = highlighter.highlight_line(line, &self.syntax_set)?;
            lines.push(styled_line_to_highlighted_html(
                &regions[..],
                IncludeBackground::No,
            )?);
        }

        Ok(lines)
    }

    fn background_style(&self) -> String {
        match self.theme.settings.background {
            Some(c) => format!(
                r#" style="background-color:#{:02x}{:02x}{:02x};""#,
                c.r, c.g, c.b
            ),
            None => String::new(),
        }
    }

    /// Add line numbers to highlighted code
    fn add_line_numbers(&self, lines: &[String], lang: &str) -> String {
        let line_count = lines.len();

        let mut gutter = String::new();
        let mut code_lines = String::new();

        for (i, line) in lines.iter().enumerate() {
            gutter.push_str(&format!(r#"<span class="line-number">{}</span>"#, i + 1));
            if i + 1 < line_count {
                gutter.push('\n');
            }

            code_lines.push_str(line.trim_end_matches('\n'));
            if i + 1 < line_count {
                code_lines.push('\n');
            }
        }

        format!(
            r#"<figure class="highlight {}"{}><table><tr><td class="gutter"><pre>{}</pre></td><td class="code"><pre>{}</pre></td></tr></table></figure>"#,
            lang,
            self.background_style(),
            gutter,
            code_lines
        )
    }
}

/// First token of a fence info string ("rust,ignore" -> "rust")
fn fence_language(info: &str) -> Option<String> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> MarkdownRenderer {
        MarkdownRenderer::with_options("base16-ocean.dark", false).unwrap()
    }

    #[test]
    fn test_render_basic_markdown() {
        let html = renderer().render("# Hello World\n\nThis is a test.");
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_render_code_block() {
        let html = renderer().render("```rust\nfn main() {}\n```");
        assert!(html.contains(r#"class="language-rust""#));
        assert!(html.contains("<span"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain_text() {
        let html = renderer().render("```nosuchlang\n<b>hi</b>\n```");
        assert!(html.contains(r#"class="language-nosuchlang""#));
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
    }

    #[test]
    fn test_indented_code_block_is_not_leaked_as_text() {
        let html = renderer().render("para\n\n    let x = 1;\n");
        assert_eq!(html.matches("let x").count(), 1);
        assert!(html.contains(r#"class="language-plaintext""#));
    }

    #[test]
    fn test_raw_html_passes_through() {
        let html = renderer().render("<div class=\"note\">hi</div>\n");
        assert!(html.contains("<div class=\"note\">hi</div>"));
    }

    #[test]
    fn test_line_numbers() {
        let renderer = MarkdownRenderer::with_options("InspiredGitHub", true).unwrap();
        let html = renderer.render("```js\nlet a = 1;\nlet b = 2;\n```");
        assert!(html.contains(r#"<span class="line-number">2</span>"#));
        assert!(!html.contains(r#"<span class="line-number">3</span>"#));
    }

    #[test]
    fn test_unknown_theme_is_config_error() {
        assert!(matches!(
            MarkdownRenderer::with_options("no-such-theme", false),
            Err(SiteError::Config(_))
        ));
    }

    #[test]
    fn test_fence_language() {
        assert_eq!(fence_language("rust,ignore"), Some("rust".to_string()));
        assert_eq!(fence_language("  "), None);
        assert_eq!(fence_language("ts {.numberLines}"), Some("ts".to_string()));
    }
}
