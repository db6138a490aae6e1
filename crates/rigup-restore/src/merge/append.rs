//! Line-append merge.
//!
//! Lines present in the source but absent from the target are appended.
//! With `dedupe` enabled, any target line equal to a source line is
//! removed first, then all source lines are appended in source order,
//! so the source block ends up contiguous at the end of the file.
//! Matching is case-sensitive and exact after trailing-whitespace trim.

/// Merge source lines into existing target content.
pub fn append_lines(source: &str, existing: Option<&str>, dedupe: bool) -> anyhow::Result<String> {
    let source_lines: Vec<&str> = source.lines().map(|l| l.trim_end()).collect();

    let Some(content) = existing else {
        return Ok(render(source_lines.iter().map(|l| l.to_string()).collect()));
    };

    let mut target_lines: Vec<String> = content.lines().map(|l| l.trim_end().to_string()).collect();

    if dedupe {
        target_lines.retain(|line| !source_lines.contains(&line.as_str()));
        for line in &source_lines {
            target_lines.push(line.to_string());
        }
    } else {
        for line in &source_lines {
            if !target_lines.iter().any(|t| t == line) {
                target_lines.push(line.to_string());
            }
        }
    }

    Ok(render(target_lines))
}

fn render(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_missing_lines() {
        let merged = append_lines(
            "alias ll='ls -la'\nexport EDITOR=hx\n",
            Some("export PATH=$PATH:~/bin\nalias ll='ls -la'\n"),
            false,
        )
        .unwrap();
        assert_eq!(
            merged,
            "export PATH=$PATH:~/bin\nalias ll='ls -la'\nexport EDITOR=hx\n"
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        let merged = append_lines("Alias X=1\n", Some("alias x=1\n"), false).unwrap();
        assert_eq!(merged, "alias x=1\nAlias X=1\n");
    }

    #[test]
    fn dedupe_moves_source_lines_to_a_contiguous_block() {
        let merged = append_lines(
            "alias ll='ls -la'\nexport EDITOR=hx\n",
            Some("alias ll='ls -la'\nexport PATH=$PATH:~/bin\n"),
            true,
        )
        .unwrap();
        assert_eq!(
            merged,
            "export PATH=$PATH:~/bin\nalias ll='ls -la'\nexport EDITOR=hx\n"
        );
    }

    #[test]
    fn absent_target_becomes_source() {
        let merged = append_lines("line one\nline two\n", None, false).unwrap();
        assert_eq!(merged, "line one\nline two\n");
    }

    #[test]
    fn already_merged_target_is_unchanged() {
        let target = "a\nb\nc\n";
        let merged = append_lines("a\nc\n", Some(target), false).unwrap();
        assert_eq!(merged, target);
    }

    #[test]
    fn merge_is_idempotent() {
        let source = "new line\n";
        let first = append_lines(source, Some("old line\n"), false).unwrap();
        let second = append_lines(source, Some(&first), false).unwrap();
        assert_eq!(first, second);
    }
}
