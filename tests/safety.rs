use proptest::prelude::*;
use regex::Regex;
use writeup_render::{break_tags, render_content, sanitize_html, SanitizeOptions, TagPolicy};

// Hostile and ordinary pieces that random bodies are stitched from.
const FRAGMENTS: &[&str] = &[
    "<script>alert(1)</script>",
    "<SCRIPT SRC=//evil.example/x.js></SCRIPT>",
    "<img src=x onerror=alert(1)>",
    "<iframe src=\"javascript:alert(1)\"></iframe>",
    "<style>body{}</style>",
    "<object data=x></object>",
    "<form action=/steal><input name=q></form>",
    "<a href=\"javascript:alert(1)\">x</a>",
    "<p style=\"color:red\" onclick=\"x()\">",
    "<q cite=\" java\tscript:alert(1)\">",
    "<blockquote cite=\"data:text/html,x\">",
    "<svg onload=alert(1)>",
    "<h1 class=\"big\" onmouseover=x>",
    "</h1>",
    "<table border=1><tr><td colspan=2>",
    "</td></tr></table>",
    "<pre>",
    "</pre>",
    "<b>",
    "</b>",
    "<!-- comment -->",
    "[",
    "]",
    "|",
    "[by ",
    "[user]",
    "[x\" onmouseover=\"alert(1)]",
    "[javascript:alert(1)]",
    "[https://example.com|ok]",
    "&#91;",
    "&#93;",
    "&amp;",
    "&lt;script&gt;",
    "\n",
    "\n\n",
    " ",
];

const PROTOCOL_ATTRIBUTES: &[&str] = &["href", "src", "cite", "action", "formaction", "data"];

fn output_tag_regex() -> Regex {
    Regex::new(r#"<([A-Za-z][A-Za-z0-9]*)((?:\s+[^\s=>/]+(?:="[^"]*")?)*)\s*/?>"#).unwrap()
}

fn output_attribute_regex() -> Regex {
    Regex::new(r#"([^\s=>/]+)(?:="([^"]*)")?"#).unwrap()
}

fn assert_safe(html: &str) -> Result<(), TestCaseError> {
    let policy = TagPolicy::default();
    let tags = output_tag_regex();
    let attributes = output_attribute_regex();
    for tag in tags.captures_iter(html) {
        let name = tag[1].to_lowercase();
        prop_assert!(
            name == "a" || policy.allows_element(&name),
            "unexpected element <{}> in {}",
            name,
            html
        );
        let attrs = tag.get(2).map_or("", |m| m.as_str());
        for attr in attributes.captures_iter(attrs) {
            let attr_name = attr[1].to_lowercase();
            prop_assert!(!attr_name.starts_with("on"), "handler {} in {}", attr_name, html);
            prop_assert!(attr_name != "style", "style attribute in {}", html);
            if PROTOCOL_ATTRIBUTES.contains(&attr_name.as_str()) {
                let value: String = attr
                    .get(2)
                    .map_or("", |m| m.as_str())
                    .chars()
                    .filter(|c| !c.is_whitespace() && !c.is_control())
                    .collect::<String>()
                    .to_lowercase();
                for scheme in ["javascript:", "vbscript:", "data:"] {
                    prop_assert!(!value.starts_with(scheme), "{} in {}", value, html);
                }
            }
        }
    }
    Ok(())
}

fn body() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        3 => prop::sample::select(FRAGMENTS).prop_map(str::to_string),
        1 => "[a-zA-Z <>=\"'/&#;:|\\[\\]\n]{0,12}",
    ];
    prop::collection::vec(piece, 0..40).prop_map(|pieces| pieces.concat())
}

proptest! {
    #[test]
    fn rendered_output_is_safe(text in body()) {
        let result = render_content(text.as_str());
        assert_safe(&result.html)?;
    }

    #[test]
    fn sanitizer_output_is_safe_without_links(text in body()) {
        let options = SanitizeOptions { parse_links: false, report_issues: true };
        let result = sanitize_html(text.as_str(), &options);
        assert_safe(&result.html)?;
        prop_assert!(!result.html.contains("<a "));
    }

    #[test]
    fn any_string_renders(text in ".{0,200}") {
        let _ = render_content(text.as_str());
        let _ = break_tags(&text);
    }

    #[test]
    fn normalized_bodies_are_left_alone(text in "[a-z \n]{0,40}") {
        let body = format!("<p>{}</p>", text);
        prop_assert_eq!(break_tags(&body), body);
    }

    #[test]
    fn encoded_brackets_never_link(title in "[A-Za-z][A-Za-z ]{0,20}") {
        let text = format!("&#91;{}&#93; [{}]", title, title);
        let html = render_content(text.as_str()).html;
        prop_assert_eq!(html.matches("<a ").count(), 1);
        let literal = format!("[{}]", title);
        let prefix = format!("<p>{}", literal);
        prop_assert!(html.starts_with(&prefix));
    }
}
