/*!
 * Code integrity checking.
 *
 * A commented code cell is accepted only if its executable lines are exactly
 * the executable lines of the original: same statements, same order, nothing
 * added or dropped. Comment lines, blank lines and trailing inline comments are
 * ignored, so the model is free to add or translate comments but not to touch
 * code. Runs of whitespace outside string literals compare as one space;
 * whitespace inside literals is significant, and so is indentation for
 * languages where it carries meaning.
 */

use std::fmt;

use thiserror::Error;

/// Programming language of a notebook's code cells and its line-comment syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLanguage {
    name: String,
    comment_prefix: &'static str,
    // @field: Indentation is part of the syntax (Python and friends)
    significant_indent: bool,
}

impl CodeLanguage {
    /// Derive from the notebook's declared language; Python when unknown
    pub fn from_notebook_language(name: Option<&str>) -> Self {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Self::default();
        };

        let comment_prefix = match name.to_ascii_lowercase().as_str() {
            "c" | "c++" | "cpp" | "java" | "javascript" | "typescript" | "rust" | "go" | "scala" | "kotlin"
            | "swift" | "c#" | "csharp" | "f#" | "fsharp" | "dart" | "groovy" | "php" => "//",
            "sql" | "haskell" | "lua" | "ada" | "elm" | "purescript" => "--",
            "matlab" | "octave" => "%",
            _ => "#",
        };
        let significant_indent = matches!(
            name.to_ascii_lowercase().as_str(),
            "python" | "python3" | "ipython" | "haskell" | "f#" | "fsharp" | "nim" | "coffeescript" | "elm" | "purescript"
        );

        Self {
            name: name.to_string(),
            comment_prefix,
            significant_indent,
        }
    }

    /// Language name as declared by the notebook
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Line-comment prefix, e.g. `#`
    pub fn comment_prefix(&self) -> &'static str {
        self.comment_prefix
    }

    /// Whether leading indentation changes the meaning of a line
    pub fn significant_indent(&self) -> bool {
        self.significant_indent
    }

    /// Render `text` as a single line comment
    pub fn comment(&self, text: &str) -> String {
        format!("{} {}", self.comment_prefix, text.replace('\n', " "))
    }
}

impl Default for CodeLanguage {
    fn default() -> Self {
        Self {
            name: "python".to_string(),
            comment_prefix: "#",
            significant_indent: true,
        }
    }
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The commented code does not carry the original executable lines unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("executable line {position} differs: expected {expected:?}, found {found:?}")]
pub struct IntegrityViolation {
    /// 1-based index among executable lines
    pub position: usize,
    /// Original executable line, absent when the result has extra code
    pub expected: Option<String>,
    /// Line found in the result, absent when original code is missing
    pub found: Option<String>,
}

/// Remove a trailing line comment that is not inside a string literal
fn strip_inline_comment<'a>(line: &'a str, prefix: &str) -> &'a str {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, ch) in line.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            _ if line[index..].starts_with(prefix) => return &line[..index],
            _ => {}
        }
    }
    line
}

/// Indentation width in columns, tabs advancing to the next multiple of 8
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .fold(0, |width, c| if c == '\t' { (width / 8 + 1) * 8 } else { width + 1 })
}

/// Collapse whitespace runs outside string literals into one space and trim
fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;

    for ch in line.trim().chars() {
        if let Some(open) = quote {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if matches!(ch, '"' | '\'' | '`') {
            quote = Some(ch);
        }
        out.push(ch);
    }
    out
}

/// Executable lines of `code` in comparable form, comments and blanks dropped.
///
/// Lines keep their indentation as leading spaces when `language` has
/// significant indentation.
pub fn executable_lines(code: &str, language: &CodeLanguage) -> Vec<String> {
    code.lines()
        .filter_map(|line| {
            let body = collapse_whitespace(strip_inline_comment(line, language.comment_prefix()));
            if body.is_empty() {
                return None;
            }
            if language.significant_indent() {
                Some(format!("{}{}", " ".repeat(indent_width(line)), body))
            } else {
                Some(body)
            }
        })
        .collect()
}

/// Verify that `commented` keeps every executable line of `original`, in order
pub fn check_integrity(original: &str, commented: &str, language: &CodeLanguage) -> Result<(), IntegrityViolation> {
    let expected = executable_lines(original, language);
    let found = executable_lines(commented, language);

    let length = expected.len().max(found.len());
    for position in 0..length {
        let want = expected.get(position);
        let got = found.get(position);
        if want != got {
            return Err(IntegrityViolation {
                position: position + 1,
                expected: want.cloned(),
                found: got.cloned(),
            });
        }
    }
    Ok(())
}
