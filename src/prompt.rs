use std::io::{self, BufRead, IsTerminal, StdinLock, Stdout, Write};

use crate::error::{QuireError, Result};

/// Gate for destructive or interactive steps.
pub trait Confirm {
    fn confirm(&mut self, action: &str) -> Result<bool>;
}

/// `--yes`
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _action: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Asks on the terminal. Without one there is nobody to ask, which is an
/// error rather than an implicit "no".
pub struct TerminalPrompt;

impl Confirm for TerminalPrompt {
    fn confirm(&mut self, action: &str) -> Result<bool> {
        if !io::stdin().is_terminal() {
            return Err(QuireError::ConfirmationRequired(action.to_string()));
        }

        let answer = ask(&format!("{}: proceed? [y/N] ", action))?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }
}

/// Questions answered one line at a time.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl LinePrompt<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        LinePrompt::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        LinePrompt { input, output }
    }

    /// Reads one trimmed line after printing `prompt`.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// A blank answer is `None`.
    pub fn ask_optional(&mut self, name: &str) -> Result<Option<String>> {
        let value = self.ask(&format!("{} (optional): ", name))?;
        Ok(Some(value).filter(|v| !v.is_empty()))
    }
}

/// Reads one trimmed line from stdin after printing `prompt`.
pub fn ask(prompt: &str) -> Result<String> {
    LinePrompt::stdio().ask(prompt)
}

/// Prompts for a value that was not given as a flag.
pub fn ask_required(name: &str) -> Result<String> {
    if !io::stdin().is_terminal() {
        return Err(QuireError::MissingArgument(name.to_string()));
    }

    let value = ask(&format!("{}: ", name))?;
    if value.is_empty() {
        return Err(QuireError::MissingArgument(name.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Scripted answer, recording every action asked about.
    pub struct Scripted {
        pub answer: Option<bool>,
        pub asked: Vec<String>,
    }

    impl Confirm for Scripted {
        fn confirm(&mut self, action: &str) -> Result<bool> {
            self.asked.push(action.to_string());
            self.answer.ok_or_else(|| QuireError::ConfirmationRequired(action.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_line_prompt() {
        let mut out = vec![];
        let mut prompt = LinePrompt::new(Cursor::new("  hello \n\nlast"), &mut out);

        assert_eq!(prompt.ask("first: ").unwrap(), "hello");
        assert_eq!(prompt.ask_optional("slug").unwrap(), None);
        assert_eq!(prompt.ask_optional("tags").unwrap().as_deref(), Some("last"));
        assert_eq!(prompt.ask_optional("date").unwrap(), None);

        drop(prompt);
        assert_eq!(String::from_utf8(out).unwrap(), "first: slug (optional): tags (optional): date (optional): ");
    }
}
