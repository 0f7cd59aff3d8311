//! Interactive command console.
//!
//! # Responsibility
//! - Read lines, normalize them and dispatch to record commands.
//! - Report user input problems as fixed `** ... **` messages.
//!
//! # Invariants
//! - Malformed input never produces an `Err`; only storage and stream
//!   failures do.
//! - Validation order is: class name, known class, id, attribute, value.
//! - Every successful mutation is persisted before the next line is read.

use super::syntax::{normalize_line, parse_attribute_dictionary, split_args, split_first_word};
use super::{ShellError, ShellResult};
use crate::model::kind::KindRegistry;
use crate::model::record::storage_key;
use crate::storage::FileStorage;
use log::debug;
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::sync::Arc;

pub const DEFAULT_PROMPT: &str = "(hbnb) ";

pub const CLASS_NAME_MISSING: &str = "** class name missing **";
pub const CLASS_UNKNOWN: &str = "** class doesn't exist **";
pub const INSTANCE_ID_MISSING: &str = "** instance id missing **";
pub const INSTANCE_NOT_FOUND: &str = "** no instance found **";
pub const ATTRIBUTE_NAME_MISSING: &str = "** attribute name missing **";
pub const VALUE_MISSING: &str = "** value missing **";

const HELP_TOPICS: [(&str, &str); 9] = [
    ("EOF", "Exit the console on end of input."),
    ("all", "Print all instances, or all instances of one class: all [<Class>]"),
    ("count", "Print the number of instances of a class: count <Class>"),
    ("create", "Create an instance, save it and print its id: create <Class>"),
    ("destroy", "Delete an instance: destroy <Class> <id>"),
    ("help", "List available commands, or describe one: help [<command>]"),
    ("quit", "Quit command to exit the program."),
    ("show", "Print the string form of an instance: show <Class> <id>"),
    (
        "update",
        "Set one attribute: update <Class> <id> <name> \"<value>\"\n\
         or several at once: update <Class> <id> {\"<name>\": \"<value>\", ...}",
    ),
];

/// Whether the read loop should continue after one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlow {
    Continue,
    Exit,
}

/// Class + id pair addressed by show/destroy/update.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    class_name: String,
    id: String,
}

impl Target {
    fn key(&self) -> String {
        storage_key(&self.class_name, &self.id)
    }
}

/// Line-oriented console over one `FileStorage`.
pub struct Shell<W: Write> {
    storage: FileStorage,
    kinds: Arc<KindRegistry>,
    out: W,
    prompt: String,
    piped_input: bool,
}

impl<W: Write> Shell<W> {
    pub fn new(storage: FileStorage, kinds: Arc<KindRegistry>, out: W) -> Self {
        Self {
            storage,
            kinds,
            out,
            prompt: DEFAULT_PROMPT.to_string(),
            piped_input: false,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// When input is not a terminal the typed newline is never echoed, so
    /// the console writes one after each line it reads.
    pub fn with_piped_input(mut self, piped_input: bool) -> Self {
        self.piped_input = piped_input;
        self
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs the read loop until `quit`, `EOF` or end of input.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> ShellResult<()> {
        let mut line = String::new();
        loop {
            write!(self.out, "{}", self.prompt)?;
            self.out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(self.out)?;
                return Ok(());
            }
            if self.piped_input {
                writeln!(self.out)?;
            }

            if self.execute(&line)? == ShellFlow::Exit {
                return Ok(());
            }
        }
    }

    /// Normalizes and executes one input line.
    pub fn execute(&mut self, line: &str) -> ShellResult<ShellFlow> {
        let line = normalize_line(line);
        if line.is_empty() {
            return Ok(ShellFlow::Continue);
        }

        let (command, args) = split_first_word(&line);
        debug!("event=command module=shell status=start command={command}");
        match command {
            "quit" => return Ok(ShellFlow::Exit),
            "EOF" => {
                writeln!(self.out)?;
                return Ok(ShellFlow::Exit);
            }
            "create" => self.do_create(args)?,
            "show" => self.do_show(args)?,
            "all" => self.do_all(args)?,
            "destroy" => self.do_destroy(args)?,
            "update" => self.do_update(args)?,
            "count" => self.do_count(args)?,
            "help" => self.do_help(args)?,
            _ => self.say(format_args!("*** Unknown syntax: {line}"))?,
        }
        self.out.flush()?;
        Ok(ShellFlow::Continue)
    }

    fn do_create(&mut self, args: &str) -> ShellResult<()> {
        // The whole argument string names the class; trailing words make it unknown.
        let class_name = args.trim();
        if class_name.is_empty() {
            return self.say(CLASS_NAME_MISSING);
        }
        let Some(factory) = self.kinds.get(class_name) else {
            return self.say(CLASS_UNKNOWN);
        };

        let record = factory.create();
        let id = record.id().to_string();
        self.storage.register(record);
        self.storage.persist()?;
        self.say(id)
    }

    fn do_show(&mut self, args: &str) -> ShellResult<()> {
        let Some(target) = self.check_target(args)? else {
            return Ok(());
        };
        match self.storage.get(&target.key()).map(ToString::to_string) {
            Some(text) => self.say(text),
            None => self.say(INSTANCE_NOT_FOUND),
        }
    }

    fn do_all(&mut self, args: &str) -> ShellResult<()> {
        let class_name = args.trim();
        let items: Vec<String> = if class_name.is_empty() {
            self.storage
                .all()
                .map(|(_, record)| record.to_string())
                .collect()
        } else if self.kinds.contains(class_name) {
            self.storage
                .all_of_type(class_name)
                .map(ToString::to_string)
                .collect()
        } else {
            return self.say(CLASS_UNKNOWN);
        };
        self.say(format_args!("{items:?}"))
    }

    fn do_destroy(&mut self, args: &str) -> ShellResult<()> {
        let Some(target) = self.check_target(args)? else {
            return Ok(());
        };
        if self.storage.remove(&target.key()).is_none() {
            return self.say(INSTANCE_NOT_FOUND);
        }
        self.storage.persist()?;
        Ok(())
    }

    fn do_update(&mut self, args: &str) -> ShellResult<()> {
        let Some(target) = self.check_target(args)? else {
            return Ok(());
        };

        let (_, rest) = split_first_word(args);
        let (_, rest) = split_first_word(rest);
        let rest = rest.trim();

        let changes = if rest.starts_with('{') {
            match parse_attribute_dictionary(rest) {
                Some(changes) if !changes.is_empty() => changes,
                _ => return self.say(ATTRIBUTE_NAME_MISSING),
            }
        } else {
            match split_args(rest, false).as_slice() {
                [] => return self.say(ATTRIBUTE_NAME_MISSING),
                [_] => return self.say(VALUE_MISSING),
                [name, value, ..] => vec![(name.clone(), value.clone())],
            }
        };

        let Some(record) = self.storage.get_mut(&target.key()) else {
            return self.say(INSTANCE_NOT_FOUND);
        };

        let mut changed = false;
        for (name, value) in changes {
            // Managed attributes (id, timestamps, type tag) are ignored.
            changed |= record.set(&name, value);
        }
        if changed {
            record.touch();
            self.storage.persist()?;
        }
        Ok(())
    }

    fn do_count(&mut self, args: &str) -> ShellResult<()> {
        let class_name = args.trim();
        if class_name.is_empty() {
            return self.say(CLASS_NAME_MISSING);
        }
        if !self.kinds.contains(class_name) {
            return self.say(CLASS_UNKNOWN);
        }
        let count = self.storage.count_of_type(class_name);
        self.say(count)
    }

    fn do_help(&mut self, args: &str) -> ShellResult<()> {
        let (topic, _) = split_first_word(args);
        if topic.is_empty() {
            let names: Vec<&str> = HELP_TOPICS.iter().map(|(name, _)| *name).collect();
            let header = "Documented commands (type help <topic>):";
            writeln!(self.out)?;
            writeln!(self.out, "{header}")?;
            writeln!(self.out, "{}", "=".repeat(header.len()))?;
            writeln!(self.out, "{}", names.join("  "))?;
            return self.say("");
        }

        match HELP_TOPICS.iter().find(|(name, _)| *name == topic) {
            Some((_, text)) => self.say(text),
            None => self.say(format_args!("*** No help on {topic}")),
        }
    }

    /// Shared validation for commands addressing one instance.
    ///
    /// Prints exactly one message and returns `None` on the first failing
    /// check.
    fn check_target(&mut self, args: &str) -> ShellResult<Option<Target>> {
        let (class_name, rest) = split_first_word(args);
        if class_name.is_empty() {
            self.say(CLASS_NAME_MISSING)?;
            return Ok(None);
        }
        if !self.kinds.contains(class_name) {
            self.say(CLASS_UNKNOWN)?;
            return Ok(None);
        }

        let id = split_args(rest, false).into_iter().next().unwrap_or_default();
        if id.is_empty() {
            self.say(INSTANCE_ID_MISSING)?;
            return Ok(None);
        }

        Ok(Some(Target {
            class_name: class_name.to_string(),
            id,
        }))
    }

    fn say(&mut self, message: impl Display) -> ShellResult<()> {
        writeln!(self.out, "{message}").map_err(ShellError::from)
    }
}
