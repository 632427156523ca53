use pulldown_cmark::{Event, Options, Parser, html};

/// Shell the rendered body is wrapped in. Email clients strip `<style>`
/// blocks, so every style is inlined on the tags themselves.
const HTML_SHELL_OPEN: &str = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n</head>\n<body style=\"font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px;\">\n";
const HTML_SHELL_CLOSE: &str = "\n</body>\n</html>";

/// Inline styles applied per tag. Order matters: longer tags are processed
/// before shorter ones to avoid partial matches (`<pre` before `<p`).
const INLINE_STYLES: &[(&str, &str)] = &[
    ("<h1>", "<h1 style=\"font-size: 24px; font-weight: 600; margin: 24px 0 16px 0; border-bottom: 1px solid #eee; padding-bottom: 8px;\">"),
    ("<h2>", "<h2 style=\"font-size: 20px; font-weight: 600; margin: 20px 0 12px 0;\">"),
    ("<h3>", "<h3 style=\"font-size: 16px; font-weight: 600; margin: 16px 0 8px 0;\">"),
    ("<pre>", "<pre style=\"background-color: #f6f8fa; padding: 16px; border-radius: 6px; overflow-x: auto; margin: 0 0 16px 0;\">"),
    ("<p>", "<p style=\"margin: 0 0 16px 0;\">"),
    ("<ul>", "<ul style=\"margin: 0 0 16px 0; padding-left: 24px;\">"),
    ("<ol>", "<ol style=\"margin: 0 0 16px 0; padding-left: 24px;\">"),
    ("<li>", "<li style=\"margin: 4px 0;\">"),
    ("<code>", "<code style=\"font-family: SFMono-Regular, Consolas, Monaco, monospace; font-size: 14px;\">"),
    ("<code ", "<code style=\"font-family: SFMono-Regular, Consolas, Monaco, monospace; font-size: 14px;\" "),
    ("<blockquote>", "<blockquote style=\"margin: 0 0 16px 0; padding: 0 16px; border-left: 4px solid #ddd; color: #666;\">"),
    ("<table>", "<table style=\"border-collapse: collapse; margin: 0 0 16px 0; width: 100%;\">"),
    ("<th>", "<th style=\"border: 1px solid #ddd; padding: 8px 12px; background-color: #f6f8fa; text-align: left;\">"),
    ("<td>", "<td style=\"border: 1px solid #ddd; padding: 8px 12px;\">"),
];

/// Convert markdown content to email-friendly HTML.
///
/// Tables and fenced code blocks are enabled, and single newlines inside a
/// paragraph become visible line breaks, matching how model output is
/// usually formatted.
pub fn markdown_to_html(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(content, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut body = String::new();
    html::push_html(&mut body, parser);

    for (tag, styled) in INLINE_STYLES {
        body = body.replace(tag, styled);
    }

    format!("{HTML_SHELL_OPEN}{body}{HTML_SHELL_CLOSE}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_convert_to_html_tags() {
        let result = markdown_to_html("# Heading 1\n\n## Heading 2\n\n### Heading 3");
        assert!(result.contains("<h1") && result.contains("Heading 1</h1>"));
        assert!(result.contains("<h2") && result.contains("Heading 2</h2>"));
        assert!(result.contains("<h3") && result.contains("Heading 3</h3>"));
    }

    #[test]
    fn bold_and_italic() {
        let result = markdown_to_html("This is **bold** and this is *italic*.");
        assert!(result.contains("<strong>bold</strong>"));
        assert!(result.contains("<em>italic</em>"));
    }

    #[test]
    fn unordered_list() {
        let result = markdown_to_html("- Item 1\n- Item 2\n- Item 3");
        assert!(result.contains("<ul"));
        assert!(result.contains("<li"));
        assert!(result.contains("Item 1</li>"));
        assert!(result.contains("Item 3</li>"));
    }

    #[test]
    fn ordered_list() {
        let result = markdown_to_html("1. First\n2. Second\n3. Third");
        assert!(result.contains("<ol"));
        assert!(result.contains("First</li>"));
        assert!(result.contains("Second</li>"));
    }

    #[test]
    fn fenced_code_block() {
        let result = markdown_to_html("```python\nprint('hello')\n```");
        assert!(result.contains("<pre"));
        assert!(result.contains("<code"));
        assert!(result.contains("print"));
    }

    #[test]
    fn inline_code() {
        let result = markdown_to_html("Use the `print()` function.");
        assert!(result.contains("<code"));
        assert!(result.contains("print()</code>"));
    }

    #[test]
    fn output_is_wrapped_in_the_email_shell() {
        let result = markdown_to_html("Hello world");
        assert!(result.contains("<!DOCTYPE html>"));
        assert!(result.contains("<html>"));
        assert!(result.contains("<body"));
        assert!(result.contains("</body>"));
        assert!(result.contains("</html>"));
    }

    #[test]
    fn inline_styles_are_applied() {
        let result = markdown_to_html("# Header\n\nParagraph\n\n- List item");
        assert!(result.contains("style=\""));
        assert!(result.contains("font-family:"));
        assert!(result.contains("margin:"));
    }

    #[test]
    fn tables_render_with_styles() {
        let result = markdown_to_html("| Col 1 | Col 2 |\n|-------|-------|\n| A | B |");
        assert!(result.contains("<table"));
        assert!(result.contains("<th"));
        assert!(result.contains("<td"));
        assert!(result.contains("Col 1</th>"));
        assert!(result.contains("A</td>"));
    }

    #[test]
    fn newlines_inside_paragraphs_become_breaks() {
        let result = markdown_to_html("Line 1\nLine 2");
        assert!(result.contains("<br"));
    }
}
