//! Legacy plain-text bodies: newlines become `<br>` and blank lines become
//! paragraph boundaries. Bodies that already carry `<p>` or `<br>` are left
//! alone.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Elements whose own layout already accounts for newlines.
const STRUCTURAL_CONTAINERS: &[&str] = &["pre", "ul", "ol", "dl", "table"];

/// Stands in for a newline inside a structural container.
const NEWLINE_PLACEHOLDER: char = '\u{E00A}';

fn already_broken_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<(?:p|br)\b").expect("valid regex"))
}

fn container_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<(/?)(pre|ul|ol|dl|table)\b[^>]*>").expect("valid regex")
    })
}

fn double_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<br>\s*<br>").expect("valid regex"))
}

fn block_open_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)<p>\s*(<(?:{})\b)", BLOCK_ELEMENTS)).expect("valid regex")
    })
}

fn block_close_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)(</(?:{})\s*>)\s*</p>", BLOCK_ELEMENTS)).expect("valid regex")
    })
}

// Elements a <p> must not wrap.
const BLOCK_ELEMENTS: &str =
    "h[1-6]|ul|ol|li|dl|dt|dd|table|thead|tbody|tr|th|td|caption|blockquote|pre|p|center|hr";

/// Converts a legacy plain-text body into paragraph markup.
pub fn break_tags(text: &str) -> String {
    if text.is_empty() || already_broken_regex().is_match(text) {
        return text.to_string();
    }

    let text = text.replace("\r\n", "\n");
    let protected = protect_container_newlines(&text);

    let body = protected.trim().replace('\n', "<br>");
    let body = double_break_regex().replace_all(&body, "</p><p>");
    let wrapped = format!("<p>{}</p>", body);

    let unwrapped = block_open_regex().replace_all(&wrapped, "$1");
    let unwrapped = block_close_regex().replace_all(&unwrapped, "$1");

    unwrapped
        .chars()
        .map(|c| if c == NEWLINE_PLACEHOLDER { '\n' } else { c })
        .collect()
}

/// Replaces newlines inside matched container open/close pairs with the
/// placeholder. Unclosed containers are not protected. Runs in one pass over
/// the container tags with a stack, so crafted nesting stays linear.
fn protect_container_newlines(text: &str) -> String {
    let mut stack: Vec<(&'static str, usize)> = Vec::new();
    let mut open_counts: HashMap<&'static str, usize> = HashMap::new();
    let mut regions: Vec<(usize, usize)> = Vec::new();

    for caps in container_tag_regex().captures_iter(text) {
        let (Some(whole), Some(slash), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(name) = canonical_container(name.as_str()) else {
            continue;
        };

        if slash.as_str().is_empty() {
            stack.push((name, whole.start()));
            *open_counts.entry(name).or_insert(0) += 1;
            continue;
        }

        // A stray close tag with no matching open is ignored.
        if open_counts.get(name).copied().unwrap_or(0) == 0 {
            continue;
        }
        while let Some((open_name, start)) = stack.pop() {
            if let Some(count) = open_counts.get_mut(open_name) {
                *count -= 1;
            }
            if open_name == name {
                regions.push((start, whole.end()));
                break;
            }
        }
    }

    if regions.is_empty() {
        return text.to_string();
    }

    // Inner regions close first; sorting by start puts outer ones first.
    regions.sort_unstable();
    let mut out = String::with_capacity(text.len());
    let mut covered_until = 0;
    let mut last = 0;
    for (start, end) in regions {
        if end <= covered_until {
            continue;
        }
        let start = start.max(covered_until);
        out.push_str(&text[last..start]);
        out.extend(
            text[start..end]
                .chars()
                .map(|c| if c == '\n' { NEWLINE_PLACEHOLDER } else { c }),
        );
        last = end;
        covered_until = end;
    }
    out.push_str(&text[last..]);
    out
}

fn canonical_container(name: &str) -> Option<&'static str> {
    STRUCTURAL_CONTAINERS
        .iter()
        .copied()
        .find(|container| container.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(break_tags(""), "");
    }

    #[test]
    fn skips_content_that_already_has_paragraphs_or_breaks() {
        let with_p = "<p>Already formatted</p>\nWith newlines";
        assert_eq!(break_tags(with_p), with_p);
        let with_br = "Line 1<br>Line 2\nLine 3";
        assert_eq!(break_tags(with_br), with_br);
        let with_upper = "Line 1<BR/>Line 2\nLine 3";
        assert_eq!(break_tags(with_upper), with_upper);
    }

    #[test]
    fn applying_twice_changes_nothing() {
        let once = break_tags("One\ntwo\n\nthree");
        assert_eq!(break_tags(&once), once);
    }

    #[test]
    fn pre_is_not_mistaken_for_a_paragraph() {
        assert!(!already_broken_regex().is_match("<pre>x</pre>"));
    }

    #[test]
    fn single_newlines_become_breaks() {
        assert_eq!(break_tags("Line 1\nLine 2\nLine 3"), "<p>Line 1<br>Line 2<br>Line 3</p>");
    }

    #[test]
    fn blank_lines_become_paragraphs() {
        assert_eq!(break_tags("Paragraph 1\n\nParagraph 2"), "<p>Paragraph 1</p><p>Paragraph 2</p>");
    }

    #[test]
    fn windows_line_endings_are_normalized() {
        assert_eq!(break_tags("a\r\n\r\nb"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn wraps_and_trims() {
        assert_eq!(break_tags("Simple text"), "<p>Simple text</p>");
        assert_eq!(break_tags("  \n  Text with whitespace  \n  "), "<p>Text with whitespace</p>");
    }

    #[test]
    fn newlines_inside_pre_survive() {
        let result = break_tags("<pre>Code\nWith\nNewlines</pre>");
        assert_eq!(result, "<pre>Code\nWith\nNewlines</pre>");
    }

    #[test]
    fn newlines_inside_lists_tables_and_definitions_survive() {
        assert_eq!(
            break_tags("<ul>\n<li>Item 1</li>\n<li>Item 2</li>\n</ul>"),
            "<ul>\n<li>Item 1</li>\n<li>Item 2</li>\n</ul>"
        );
        assert!(break_tags("<OL type=\"a\">\n<li>First</li>\n</OL>").contains("<li>First</li>\n</OL>"));
        assert!(break_tags("<table>\n<tr>\n<td>Cell</td>\n</tr>\n</table>").contains("<td>Cell</td>\n</tr>"));
        assert!(break_tags("<dl>\n<dt>Term</dt>\n<dd>Definition</dd>\n</dl>").contains("<dt>Term</dt>\n<dd>"));
    }

    #[test]
    fn mixed_protected_and_unprotected_newlines() {
        let result = break_tags("Intro\n\n<pre>Code\nBlock</pre>\n\nConclusion");
        assert_eq!(result, "<p>Intro</p><pre>Code\nBlock</pre><p>Conclusion</p>");
    }

    #[test]
    fn nested_containers_are_protected_once() {
        let input = "<ul>\n<li><ol>\n<li>x</li>\n</ol></li>\n</ul>\nafter";
        let result = break_tags(input);
        assert!(result.starts_with("<ul>\n<li><ol>\n<li>x</li>\n</ol></li>\n</ul>"));
        assert!(result.ends_with("<br>after</p>"));
    }

    #[test]
    fn unclosed_container_is_not_protected() {
        assert_eq!(break_tags("<pre>a\nb"), "<pre>a<br>b</p>");
    }

    #[test]
    fn block_elements_are_not_wrapped() {
        let result = break_tags("Text\n\n<h1>Heading</h1>\n\nMore text");
        assert_eq!(result, "<p>Text</p><h1>Heading</h1><p>More text</p>");
        assert!(!result.contains("<p><h1>"));
        assert!(!result.contains("</h1></p>"));
    }

    #[test]
    fn typical_legacy_writeup() {
        let input = "This is a legacy writeup.\n\nIt has multiple paragraphs.\n\nAnd some [links] too.";
        let result = break_tags(input);
        assert!(result.contains("<p>This is a legacy writeup.</p>"));
        assert!(result.contains("<p>It has multiple paragraphs.</p>"));
        assert!(result.contains("[links]"));
    }

    #[test]
    fn deeply_nested_containers_finish() {
        let input = format!("{}x\ny{}", "<ul>".repeat(20_000), "</pre>".repeat(20_000));
        let result = break_tags(&input);
        assert!(result.contains("x<br>y"));
    }
}
