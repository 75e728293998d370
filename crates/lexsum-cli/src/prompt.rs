use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Print `message` and read one line from stdin, without the newline.
/// End of input reads as an empty line.
pub fn ask(message: &str) -> std::io::Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", message)?;
    stdout.flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Normalize a path typed or dragged into the terminal: surrounding
/// whitespace and one pair of matching quotes are removed, and
/// backslash-escaped spaces are unescaped.
pub fn clean_path_input(input: &str) -> String {
    let trimmed = input.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);
    unquoted.replace("\\ ", " ")
}

/// Which of the listed files to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    One(usize),
}

impl Selection {
    pub fn apply(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        match self {
            Selection::All => files.to_vec(),
            Selection::One(index) => files.get(*index).cloned().into_iter().collect(),
        }
    }
}

/// Parse `all` (any case) or a 1-based index into a list of `count` files.
pub fn parse_selection(input: &str, count: usize) -> Option<Selection> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return Some(Selection::All);
    }
    match input.parse::<usize>() {
        Ok(n) if n >= 1 && n <= count => Some(Selection::One(n - 1)),
        _ => None,
    }
}

/// File name for display, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
