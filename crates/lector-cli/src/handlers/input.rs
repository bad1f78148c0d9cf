//! Interpretation of typed lines for the stdin-driven loops.

/// What one line of input means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    /// `/quit` or `/exit`.
    Quit,
    /// Nothing but whitespace.
    Blank,
    /// `!code`: simulate a recognition error with a Web Speech error code.
    Fault(&'a str),
    /// Anything else is something the user "said".
    Speech(&'a str),
}

pub fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Blank;
    }
    if matches!(line, "/quit" | "/exit") {
        return Input::Quit;
    }
    match line.strip_prefix('!') {
        Some(code) if !code.trim().is_empty() => Input::Fault(code.trim()),
        _ => Input::Speech(line),
    }
}
