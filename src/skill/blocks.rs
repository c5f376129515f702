//! Executable block extraction.
//!
//! An executable block is a `<!-- JAAVIS:EXEC -->` marker line followed by a
//! fenced code block tagged `bash`. The fenced body is returned verbatim.

use std::sync::LazyLock;

use regex::Regex;

pub const EXEC_MARKER: &str = "<!-- JAAVIS:EXEC -->";

static EXEC_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?sm)<!--\s*JAAVIS:EXEC\s*-->\s*```bash[ \t]*\r?\n(.*?)^```")
        .expect("exec block pattern is valid")
});

/// Return the body of every marked shell block, in source order.
///
/// Marker and fence lines are stripped; blank lines inside the body are kept.
#[must_use]
pub fn extract_executable_blocks(content: &str) -> Vec<String> {
    EXEC_BLOCK
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|body| {
            let body = body.as_str();
            let body = body.strip_suffix('\n').unwrap_or(body);
            body.strip_suffix('\r').unwrap_or(body).to_string()
        })
        .collect()
}

/// Render a marked block around the given script.
#[must_use]
pub fn render_executable_block(script: &str) -> String {
    format!("{EXEC_MARKER}\n```bash\n{}\n```\n", script.trim_end_matches('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_blocks_is_empty() {
        assert!(extract_executable_blocks("# Skill\n\n```bash\necho plain\n```\n").is_empty());
        assert!(extract_executable_blocks("").is_empty());
    }

    #[test]
    fn extracts_blocks_in_order() {
        let doc = "\
# Setup

<!-- JAAVIS:EXEC -->
```bash
mkdir -p {{target_dir}}
cd {{target_dir}}
```

Some prose.

```bash
echo not marked
```

<!-- JAAVIS:EXEC -->
```bash
npm install

npm run build
```
";
        let blocks = extract_executable_blocks(doc);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "mkdir -p {{target_dir}}\ncd {{target_dir}}");
        assert_eq!(blocks[1], "npm install\n\nnpm run build");
    }

    #[test]
    fn tolerates_whitespace_around_marker() {
        let doc = "<!--JAAVIS:EXEC-->\n\n```bash\necho hi\n```";
        assert_eq!(extract_executable_blocks(doc), vec!["echo hi".to_string()]);
    }

    #[test]
    fn ignores_other_languages() {
        let doc = "<!-- JAAVIS:EXEC -->\n```python\nprint(1)\n```\n";
        assert!(extract_executable_blocks(doc).is_empty());
    }

    #[test]
    fn empty_block_yields_empty_body() {
        let doc = "<!-- JAAVIS:EXEC -->\n```bash\n```\n";
        assert_eq!(extract_executable_blocks(doc), vec![String::new()]);
    }

    #[test]
    fn rendered_block_extracts_back() {
        let rendered = render_executable_block("echo one\necho two\n");
        assert_eq!(
            extract_executable_blocks(&rendered),
            vec!["echo one\necho two".to_string()]
        );
    }
}
