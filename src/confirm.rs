use std::io::{self, BufRead, IsTerminal, Stdout, Write};

use console::Term;
use dialoguer::Input;

const CONFIRMATION: &str = "yes";

pub trait Confirmation {
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

impl<T: Confirmation + ?Sized> Confirmation for Box<T> {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        return (**self).confirm(question);
    }
}

/// Interactive prompt on the terminal. Only the exact answer `yes` confirms.
pub struct TerminalPrompt {
    term: Term,
}

impl TerminalPrompt {
    pub fn new(term: Term) -> Self {
        return Self { term };
    }
}

impl Confirmation for TerminalPrompt {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer: String = Input::<String>::new()
            .with_prompt(question)
            .allow_empty(true)
            .interact_text_on(&self.term)
            .map_err(io::Error::from)?;

        return Ok(answer == CONFIRMATION);
    }
}

pub fn stdio() -> Box<dyn Confirmation> {
    let term = Term::stderr();
    if io::stdin().is_terminal() && term.is_term() {
        return Box::new(TerminalPrompt::new(term));
    }
    return Box::new(Prompt::stdio());
}

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        return Self { input, output };
    }
}

impl Prompt<io::StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        return Self::new(io::stdin().lock(), io::stdout());
    }
}

impl<R: BufRead, W: Write> Confirmation for Prompt<R, W> {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        write!(self.output, "{} ", question)?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;

        let answer = answer.trim_end_matches(&['\r', '\n'][..]);
        return Ok(answer == CONFIRMATION);
    }
}
