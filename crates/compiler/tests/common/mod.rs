//! Shared fixtures: a tiny host grammar and a reference machine that
//! executes the instruction contract with explicit, resumable state.

#![allow(dead_code)]

use cmdflow_compiler::{Compilation, Compiler};
use cmdflow_core::{
    CommandGrammar, CompiledFunction, ControlOp, Instruction, SelectorKind, SyntaxError, EXIT_TARGET,
};
use std::collections::VecDeque;

/// Upper bound on instructions for scripts that are expected to finish.
pub const STEP_LIMIT: usize = 10_000;

/// Entity id of the root source.
pub const SERVER: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `say <text>`: log `<source>: <text>`
    Say(String),
    /// `spawn <name> <tag>`: create an entity unless the name is taken
    Spawn { name: String, tag: String },
    /// `untag <tag>`: remove a tag from the current source
    Untag(String),
    /// `as <tag>` selector: every entity carrying the tag
    Select(String),
}

pub struct TestGrammar;

impl CommandGrammar for TestGrammar {
    type Action = Action;

    fn parse_command(&self, text: &str) -> Result<Action, SyntaxError> {
        let (head, rest) = text.split_once(' ').unwrap_or((text, ""));
        let rest = rest.trim();

        match (head, rest.split_whitespace().collect::<Vec<_>>().as_slice()) {
            ("say", [_, ..]) => Ok(Action::Say(rest.to_string())),
            ("spawn", [name, tag]) => Ok(Action::Spawn {
                name: name.to_string(),
                tag: tag.to_string(),
            }),
            ("untag", [tag]) => Ok(Action::Untag(tag.to_string())),
            ("say" | "spawn" | "untag", _) => {
                Err(SyntaxError::at(format!("bad arguments for '{}'", head), head.len()))
            }
            _ => Err(SyntaxError::at(format!("unknown command '{}'", head), 0)),
        }
    }

    fn parse_selector(&self, _kind: SelectorKind, text: &str) -> Result<Action, SyntaxError> {
        match text.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["as", tag] => Ok(Action::Select(tag.to_string())),
            _ => Err(SyntaxError::new(format!("expected 'as <tag>', found '{}'", text))),
        }
    }
}

pub fn compile(source: &str) -> Compilation<Action> {
    let lines: Vec<&str> = source.lines().collect();
    Compiler::new(TestGrammar).compile("test:script", &lines)
}

pub fn compile_ok(source: &str) -> CompiledFunction<Action> {
    match compile(source).into_result() {
        Ok(function) => function,
        Err(err) => panic!("{}", err),
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct World {
    entities: Vec<Entity>,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: vec![Entity {
                name: "server".to_string(),
                tags: Vec::new(),
            }],
        }
    }

    pub fn with(mut self, name: &str, tag: &str) -> Self {
        self.spawn(name, tag);
        self
    }

    pub fn spawn(&mut self, name: &str, tag: &str) {
        if self.entities.iter().any(|e| e.name == name) {
            return;
        }
        self.entities.push(Entity {
            name: name.to_string(),
            tags: vec![tag.to_string()],
        });
    }

    pub fn untag(&mut self, id: usize, tag: &str) {
        self.entities[id].tags.retain(|t| t != tag);
    }

    pub fn matching(&self, tag: &str) -> Vec<usize> {
        (0..self.entities.len())
            .filter(|&id| self.entities[id].tags.iter().any(|t| t == tag))
            .collect()
    }

    pub fn name(&self, id: usize) -> &str {
        &self.entities[id].name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Finished,
    Suspended,
}

/// Subroutine return-stack entry: where to resume and the stack depths to
/// unwind to.
#[derive(Debug, Clone, Copy)]
struct ReturnEntry {
    address: usize,
    frames: usize,
    addresses: usize,
}

/// Executes a compiled function. All control state lives in the fields
/// below, so stopping after any instruction and resuming later is exact.
pub struct Machine<'f> {
    function: &'f CompiledFunction<Action>,
    pub world: World,
    pub log: Vec<String>,
    /// Instructions executed so far
    pub executed: usize,
    ip: usize,
    source: usize,
    sources: Vec<usize>,
    pending: Vec<VecDeque<usize>>,
    addresses: Vec<usize>,
    subroutine_returns: Vec<ReturnEntry>,
    finished: bool,
}

impl<'f> Machine<'f> {
    pub fn new(function: &'f CompiledFunction<Action>, world: World) -> Self {
        Self {
            function,
            world,
            log: Vec::new(),
            executed: 0,
            ip: 0,
            source: SERVER,
            sources: Vec::new(),
            pending: Vec::new(),
            addresses: Vec::new(),
            subroutine_returns: Vec::new(),
            finished: false,
        }
    }

    /// Execute at most `budget` instructions.
    pub fn run(&mut self, budget: usize) -> Status {
        for _ in 0..budget {
            if self.is_finished() {
                break;
            }
            self.step();
        }

        if self.is_finished() {
            Status::Finished
        } else {
            Status::Suspended
        }
    }

    pub fn run_to_end(&mut self) -> Vec<String> {
        assert_eq!(self.run(STEP_LIMIT), Status::Finished, "step limit exceeded");
        self.log.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.finished || self.ip >= self.function.len()
    }

    /// Open run/loop frames
    pub fn frame_depth(&self) -> usize {
        self.sources.len()
    }

    pub fn current_source(&self) -> &str {
        self.world.name(self.source)
    }

    fn step(&mut self) {
        let instruction = self.function.get(self.ip).cloned().expect("ip out of range");
        self.ip += 1;
        self.executed += 1;

        match instruction {
            Instruction::Plain(action) => self.perform(action),
            Instruction::Branch { target } => self.jump(target),
            Instruction::Call { target } => {
                self.addresses.push(self.ip);
                self.jump(target);
            }
            Instruction::PushInstrAddress { target } => self.addresses.push(target),
            Instruction::Return => {
                let target = self.addresses.pop().expect("address stack underflow");
                self.jump(target);
            }
            Instruction::SubroutineCall { target } => {
                self.subroutine_returns.push(ReturnEntry {
                    address: self.ip,
                    frames: self.sources.len(),
                    addresses: self.addresses.len(),
                });
                self.jump(target);
            }
            Instruction::SubroutineReturn => {
                let entry = self.subroutine_returns.pop().expect("subroutine stack underflow");
                if self.sources.len() > entry.frames {
                    self.source = self.sources[entry.frames];
                }
                self.sources.truncate(entry.frames);
                self.pending.truncate(entry.frames);
                self.addresses.truncate(entry.addresses);
                self.jump(entry.address);
            }
            Instruction::Control(ControlOp::PushSourceAndMatch { selector }) => {
                let tag = match selector {
                    Action::Select(tag) => tag,
                    other => panic!("not a selector: {:?}", other),
                };
                self.sources.push(self.source);
                self.pending.push(self.world.matching(&tag).into());
            }
            Instruction::Control(ControlOp::PopSourceOrBranch { exit }) => {
                let list = self.pending.last_mut().expect("no pending list");
                match list.pop_front() {
                    Some(next) => self.source = next,
                    None => self.jump(exit),
                }
            }
            Instruction::Control(ControlOp::PopFrame) => {
                self.pending.pop().expect("no pending list");
                self.source = self.sources.pop().expect("source stack underflow");
            }
        }
    }

    fn jump(&mut self, target: usize) {
        if target == EXIT_TARGET {
            self.finished = true;
        } else {
            self.ip = target;
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::Say(text) => {
                let line = format!("{}: {}", self.world.name(self.source), text);
                self.log.push(line);
            }
            Action::Spawn { name, tag } => self.world.spawn(&name, &tag),
            Action::Untag(tag) => self.world.untag(self.source, &tag),
            Action::Select(tag) => panic!("selector 'as {}' executed as a command", tag),
        }
    }
}

/// Compile `source` and run it to completion against `world`.
pub fn execute(source: &str, world: World) -> Vec<String> {
    let function = compile_ok(source);
    Machine::new(&function, world).run_to_end()
}
