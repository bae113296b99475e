use crate::exclusion::{SelectionMode, OPTIONAL_MODS};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

pub trait Prompter {
    /// Shows `prompt` and returns the raw answer without its line ending.
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;
}

pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

pub fn prompt_instance_dir<P: Prompter + ?Sized>(prompter: &mut P) -> io::Result<PathBuf> {
    loop {
        let answer = prompter.read_line("Enter Minecraft instance path: ")?;
        let candidate = PathBuf::from(answer.trim());
        if !answer.trim().is_empty() && candidate.is_dir() {
            return Ok(candidate);
        }
        println!(
            "Directory '{}' does not exist. Please try again.",
            answer.trim()
        );
    }
}

pub fn prompt_selection<P: Prompter + ?Sized>(prompter: &mut P) -> io::Result<SelectionMode> {
    println!("Optional mods:");
    for (index, entry) in OPTIONAL_MODS.iter().enumerate() {
        println!("  {}. {}", index + 1, entry.label);
    }
    let answer = prompter.read_line(
        "Install optional mods? [all / none / 1 (only first) / 2 (only second)]: ",
    )?;
    Ok(SelectionMode::parse(&answer))
}

pub fn wait_for_exit<P: Prompter + ?Sized>(prompter: &mut P) {
    prompter.read_line("Press Enter to exit...").ok();
}
