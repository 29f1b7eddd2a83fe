// Recording gateway double for unit tests.

use super::systemd::{CommandOutput, CommandRunner, Tool};
use std::cell::RefCell;
use std::io;

#[derive(Clone)]
enum Reply {
    Output(CommandOutput),
    SpawnError,
}

/// Records every call and answers with the first canned reply whose tool
/// and argument prefix match. Unmatched calls succeed with empty output.
#[derive(Default)]
pub struct MockRunner {
    calls: RefCell<Vec<(Tool, Vec<String>)>>,
    rules: RefCell<Vec<(Tool, Vec<String>, Reply)>>,
}

impl MockRunner {
    /// Canned systemctl output.
    pub fn respond(&self, prefix: &[&str], output: CommandOutput) {
        self.respond_to(Tool::Systemctl, prefix, output);
    }

    pub fn respond_to(&self, tool: Tool, prefix: &[&str], output: CommandOutput) {
        self.push_rule(tool, prefix, Reply::Output(output));
    }

    /// Matching calls fail as if the program could not be executed.
    pub fn fail_to_spawn(&self, tool: Tool, prefix: &[&str]) {
        self.push_rule(tool, prefix, Reply::SpawnError);
    }

    fn push_rule(&self, tool: Tool, prefix: &[&str], reply: Reply) {
        self.rules
            .borrow_mut()
            .push((tool, prefix.iter().map(|s| s.to_string()).collect(), reply));
    }

    /// Arguments of every call, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().iter().map(|(_, args)| args.clone()).collect()
    }

    pub fn calls_of(&self, tool: Tool) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .filter(|(t, _)| *t == tool)
            .map(|(_, args)| args.clone())
            .collect()
    }

    /// systemctl calls whose first argument is the given verb.
    pub fn calls_to(&self, verb: &str) -> Vec<Vec<String>> {
        self.calls_of(Tool::Systemctl)
            .into_iter()
            .filter(|call| call.first().map(String::as_str) == Some(verb))
            .collect()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, tool: Tool, args: &[&str]) -> io::Result<CommandOutput> {
        self.calls
            .borrow_mut()
            .push((tool, args.iter().map(|s| s.to_string()).collect()));

        let rules = self.rules.borrow();
        let matched = rules.iter().find(|(t, prefix, _)| {
            *t == tool
                && prefix.len() <= args.len()
                && prefix.iter().zip(args).all(|(p, a)| p == a)
        });

        match matched.map(|(_, _, reply)| reply.clone()) {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::SpawnError) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "No such file or directory",
            )),
            None => Ok(CommandOutput::default()),
        }
    }
}

pub fn success(stdout: &str) -> CommandOutput {
    CommandOutput {
        status_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn failure(stderr: &str) -> CommandOutput {
    CommandOutput {
        status_code: 1,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}
