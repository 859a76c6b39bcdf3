use pulldown_cmark::{html, Options, Parser};

/// Markdown to sanitized HTML.
pub fn render(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options);

    let mut unsafe_html = String::new();
    html::push_html(&mut unsafe_html, parser);

    ammonia::clean(&unsafe_html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_links() {
        let html = render("# Python\n\nSee [Django](/wiki/Django).");
        assert!(html.contains("<h1>Python</h1>"));
        assert!(html.contains("href=\"/wiki/Django\""));
    }

    #[test]
    fn strips_scripts() {
        let html = render("Hello <script>alert(1)</script> **world**");
        assert!(!html.contains("<script>"));
        assert!(html.contains("<strong>world</strong>"));
    }

    #[test]
    fn renders_lists() {
        let html = render("- one\n- two\n");
        assert!(html.contains("<li>one</li>"));
    }
}
