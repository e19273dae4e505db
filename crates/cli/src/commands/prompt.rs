//! Line-oriented prompts for the interactive commands.

use std::io::{self, BufRead, Write};

/// Asks questions on `output` and reads answers from `input`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    /// One trimmed line. End of input reads as an empty answer.
    pub fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// Like [`ask`](Self::ask), with `default` for an empty answer.
    pub fn ask_or(&mut self, question: &str, default: &str) -> io::Result<String> {
        let answer = self.ask(question)?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    /// Free text ending at two consecutive blank lines (or end of input).
    pub fn ask_multiline(&mut self) -> io::Result<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut previous_blank = false;
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            let blank = line.is_empty();
            if blank && previous_blank {
                break;
            }
            previous_blank = blank;
            lines.push(line);
        }
        Ok(lines.join("\n").trim().to_string())
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    /// A yes/no question; only "y" or "yes" count as yes.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(question)?.to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn ask_trims_and_defaults() {
        let mut p = prompter("  sales-agent  \n\n");
        assert_eq!(p.ask("Agent ID: ").unwrap(), "sales-agent");
        assert_eq!(p.ask_or("Model: ", "gpt-4o-mini").unwrap(), "gpt-4o-mini");
        // Exhausted input
        assert_eq!(p.ask("More: ").unwrap(), "");
        assert!(String::from_utf8(p.into_output()).unwrap().starts_with("Agent ID: "));
    }

    #[test]
    fn multiline_stops_at_two_blank_lines() {
        let mut p = prompter("You sell things.\n\nBe polite.\n\n\nnext answer\n");
        assert_eq!(p.ask_multiline().unwrap(), "You sell things.\n\nBe polite.");
        assert_eq!(p.ask("Next: ").unwrap(), "next answer");
    }

    #[test]
    fn multiline_stops_at_end_of_input() {
        let mut p = prompter("only line");
        assert_eq!(p.ask_multiline().unwrap(), "only line");
    }

    #[test]
    fn confirm_accepts_yes_variants() {
        let mut p = prompter("YES\ny\nno\n\n");
        assert!(p.confirm("? ").unwrap());
        assert!(p.confirm("? ").unwrap());
        assert!(!p.confirm("? ").unwrap());
        assert!(!p.confirm("? ").unwrap());
    }
}
