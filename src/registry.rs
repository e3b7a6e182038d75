//! The fixed table of built-in commands and the dispatcher that runs them.
//!
//! Each [`CommandSpec`] names a command, bounds its argument count and tags
//! it with an [`Op`].  Dispatching looks the command up, validates the
//! arity, parses the arguments and calls the matching method of a
//! [`CommandHandler`].  Argument parsing and context handling live here; the
//! handler only sees typed values.

use crate::command::{ClientId, ClientIdError, Command, CommandContext, CommandKind, CommandResult};
use crate::workspace::WorkspaceError;
use log::debug;
use std::num::ParseIntError;

/// Inclusive bounds on the number of arguments a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    pub const NONE: Arity = Arity::exactly(0);

    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: n }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn validate(&self, count: usize) -> Result<(), ArityError> {
        if (self.min..=self.max).contains(&count) {
            Ok(())
        } else if self.min == self.max {
            Err(ArityError::Exact {
                expected: self.min,
                actual: count,
            })
        } else {
            Err(ArityError::Range {
                min: self.min,
                max: self.max,
                actual: count,
            })
        }
    }
}

/// An argument count outside the accepted [`Arity`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArityError {
    #[error("got {actual}, expected {expected}")]
    Exact { expected: usize, actual: usize },
    #[error("got {actual}, expected between {min} and {max}")]
    Range { min: usize, max: usize, actual: usize },
}

/// Every built-in operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Tile,
    Untile,
    MakeMaster,
    SwitchLayout,
    IncreaseMaster,
    DecreaseMaster,
    NextWindow,
    PreviousWindow,
    IncrementProportion,
    DecrementProportion,
    Swap,
    SetLayout,
    QueryLayout,
    QueryWindow,
    QueryWorkspace,
    QueryClients,
    ForWindow,
    ForWorkspace,
}

/// A registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub kind: CommandKind,
    pub name: &'static str,
    pub arity: Arity,
    pub op: Op,
    pub summary: &'static str,
}

const fn spec(
    kind: CommandKind,
    name: &'static str,
    arity: Arity,
    op: Op,
    summary: &'static str,
) -> CommandSpec {
    CommandSpec {
        kind,
        name,
        arity,
        op,
        summary,
    }
}

use CommandKind::{Action, For, Query, Set};

static COMMANDS: &[CommandSpec] = &[
    spec(Action, "tile", Arity::NONE, Op::Tile, "Tile the workspace."),
    spec(Action, "untile", Arity::NONE, Op::Untile, "Untile the workspace."),
    spec(
        Action,
        "make_active_window_master",
        Arity::NONE,
        Op::MakeMaster,
        "Make the target window a master.",
    ),
    spec(
        Action,
        "switch_layout",
        Arity::NONE,
        Op::SwitchLayout,
        "Cycle through the available layouts.",
    ),
    spec(
        Action,
        "increase_master",
        Arity::NONE,
        Op::IncreaseMaster,
        "Increase the number of masters.",
    ),
    spec(
        Action,
        "decrease_master",
        Arity::NONE,
        Op::DecreaseMaster,
        "Decrease the number of masters.",
    ),
    spec(
        Action,
        "next_window",
        Arity::NONE,
        Op::NextWindow,
        "Move focus to the next window.",
    ),
    spec(
        Action,
        "previous_window",
        Arity::NONE,
        Op::PreviousWindow,
        "Move focus to the previous window.",
    ),
    spec(
        Action,
        "increment_master",
        Arity::NONE,
        Op::IncrementProportion,
        "Grow the master area.",
    ),
    spec(
        Action,
        "decrement_master",
        Arity::NONE,
        Op::DecrementProportion,
        "Shrink the master area.",
    ),
    spec(
        Action,
        "swap",
        Arity::between(1, 2),
        Op::Swap,
        "Swap two windows; the second defaults to the target window.",
    ),
    spec(
        Set,
        "layout",
        Arity::exactly(1),
        Op::SetLayout,
        "Activate a layout by name, or `none` to untile.",
    ),
    spec(
        Query,
        "layout",
        Arity::NONE,
        Op::QueryLayout,
        "Name of the active layout, or `none`.",
    ),
    spec(Query, "window", Arity::NONE, Op::QueryWindow, "The target window id."),
    spec(
        Query,
        "workspace",
        Arity::NONE,
        Op::QueryWorkspace,
        "The target workspace index.",
    ),
    spec(
        Query,
        "clients",
        Arity::NONE,
        Op::QueryClients,
        "Windows of the active layout, masters first.",
    ),
    spec(
        For,
        "window",
        Arity::exactly(1),
        Op::ForWindow,
        "Target a window for the following commands.",
    ),
    spec(
        For,
        "workspace",
        Arity::exactly(1),
        Op::ForWorkspace,
        "Target a workspace for the following commands.",
    ),
];

/// All built-in commands.
pub fn commands() -> &'static [CommandSpec] {
    COMMANDS
}

/// Find the command `name` of the given `kind`.
pub fn lookup(kind: CommandKind, name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.kind == kind && c.name == name)
}

/// Resolve an envelope kind received over the wire.
pub fn kind_from_wire(kind: &str) -> Result<CommandKind, CommandError> {
    CommandKind::from_wire(kind).ok_or_else(|| CommandError::UnknownCommandType(kind.to_string()))
}

/// Failure of a single command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command type {0:?}")]
    UnknownCommandType(String),
    #[error("command does not exist: {kind} {name}")]
    CommandNotExists { kind: CommandKind, name: String },
    #[error("incorrect number of arguments: {0}")]
    IncorrectNumberOfArgs(#[from] ArityError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// A client id argument that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error for client id {value:?}: {source}")]
pub struct InvalidClientId {
    pub value: String,
    pub source: ClientIdError,
}

fn join_invalid(invalid: &[InvalidClientId]) -> String {
    invalid
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Domain failures raised while running a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("{}", join_invalid(.0))]
    InvalidClientIds(Vec<InvalidClientId>),
    #[error("parse error for workspace number {value:?}: {source}")]
    InvalidWorkspace { value: String, source: ParseIntError },
    #[error("workspace number {value} is out of range (have {count})")]
    WorkspaceOutOfRange { value: usize, count: usize },
    #[error("no such workspace: {0}")]
    NoSuchWorkspace(usize),
    #[error("client {first} or {second} was not found in workspace {workspace}")]
    SwapTargetNotFound {
        first: ClientId,
        second: ClientId,
        workspace: usize,
    },
    #[error("no target window")]
    NoTargetClient,
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("window system error: {0}")]
    WindowSystem(String),
}

pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// The capabilities a command can exercise.
///
/// Implemented by the [`Tiler`](crate::tiler::Tiler); every method receives
/// the already resolved target workspace.
pub trait CommandHandler {
    fn workspace_count(&self) -> usize;
    fn tile(&mut self, workspace: usize) -> HandlerResult;
    fn untile(&mut self, workspace: usize) -> HandlerResult;
    fn switch_layout(&mut self, workspace: usize) -> HandlerResult;
    fn set_layout(&mut self, workspace: usize, name: &str) -> HandlerResult;
    /// Active layout name, `None` while the workspace is not tiling.
    fn layout(&self, workspace: usize) -> HandlerResult<Option<&'static str>>;
    fn make_master(&mut self, workspace: usize, client: ClientId) -> HandlerResult;
    fn increase_master(&mut self, workspace: usize) -> HandlerResult;
    fn decrease_master(&mut self, workspace: usize) -> HandlerResult;
    fn adjust_proportion(&mut self, workspace: usize, grow: bool) -> HandlerResult;
    fn focus_next(&mut self, workspace: usize, from: ClientId) -> HandlerResult;
    fn focus_previous(&mut self, workspace: usize, from: ClientId) -> HandlerResult;
    fn swap(&mut self, workspace: usize, first: ClientId, second: ClientId) -> HandlerResult;
    fn clients(&self, workspace: usize) -> HandlerResult<Vec<ClientId>>;
}

fn parse_client(raw: &str) -> Result<ClientId, InvalidClientId> {
    raw.parse().map_err(|source| InvalidClientId {
        value: raw.to_string(),
        source,
    })
}

fn target_client(ctx: &CommandContext) -> HandlerResult<ClientId> {
    ctx.target_client.ok_or(HandlerError::NoTargetClient)
}

fn silent(result: HandlerResult) -> HandlerResult<Vec<String>> {
    result.map(|()| Vec::new())
}

impl Op {
    /// Run this operation.  `args` has already been checked against the
    /// command's [`Arity`].
    fn invoke<H: CommandHandler + ?Sized>(
        self,
        handler: &mut H,
        ctx: &mut CommandContext,
        args: &[String],
    ) -> HandlerResult<Vec<String>> {
        let ws = ctx.target_workspace;
        match self {
            Op::Tile => silent(handler.tile(ws)),
            Op::Untile => silent(handler.untile(ws)),
            Op::SwitchLayout => silent(handler.switch_layout(ws)),
            Op::IncreaseMaster => silent(handler.increase_master(ws)),
            Op::DecreaseMaster => silent(handler.decrease_master(ws)),
            Op::IncrementProportion => silent(handler.adjust_proportion(ws, true)),
            Op::DecrementProportion => silent(handler.adjust_proportion(ws, false)),
            Op::MakeMaster => silent(handler.make_master(ws, target_client(ctx)?)),
            Op::NextWindow => silent(handler.focus_next(ws, target_client(ctx)?)),
            Op::PreviousWindow => silent(handler.focus_previous(ws, target_client(ctx)?)),
            Op::Swap => {
                let mut invalid = Vec::new();
                let first = parse_client(&args[0]).map_err(|e| invalid.push(e)).ok();
                let second = match args.get(1) {
                    Some(raw) => parse_client(raw).map_err(|e| invalid.push(e)).ok(),
                    None => ctx.target_client,
                };
                if !invalid.is_empty() {
                    return Err(HandlerError::InvalidClientIds(invalid));
                }
                let (Some(first), Some(second)) = (first, second) else {
                    return Err(HandlerError::NoTargetClient);
                };
                silent(handler.swap(ws, first, second))
            }
            Op::SetLayout => match args[0].as_str() {
                "none" => silent(handler.untile(ws)),
                name => silent(handler.set_layout(ws, name)),
            },
            Op::QueryLayout => Ok(vec![handler.layout(ws)?.unwrap_or("none").to_string()]),
            Op::QueryWindow => Ok(vec![ctx
                .target_client
                .map_or_else(|| "none".to_string(), |c| c.to_string())]),
            Op::QueryWorkspace => Ok(vec![ws.to_string()]),
            Op::QueryClients => Ok(handler
                .clients(ws)?
                .iter()
                .map(ToString::to_string)
                .collect()),
            Op::ForWindow => {
                let client =
                    parse_client(&args[0]).map_err(|e| HandlerError::InvalidClientIds(vec![e]))?;
                ctx.target_client = Some(client);
                Ok(Vec::new())
            }
            Op::ForWorkspace => {
                let raw = &args[0];
                let value: usize =
                    raw.trim()
                        .parse()
                        .map_err(|source| HandlerError::InvalidWorkspace {
                            value: raw.clone(),
                            source,
                        })?;
                let count = handler.workspace_count();
                if value >= count {
                    return Err(HandlerError::WorkspaceOutOfRange { value, count });
                }
                ctx.target_workspace = value;
                Ok(Vec::new())
            }
        }
    }
}

/// Run one command against `handler`.
///
/// A failing command only affects its own result; nothing already applied
/// by earlier commands is rolled back.
pub fn dispatch<H: CommandHandler + ?Sized>(
    handler: &mut H,
    ctx: &mut CommandContext,
    command: &Command,
) -> CommandResult {
    let spec = lookup(command.kind, &command.name).ok_or_else(|| CommandError::CommandNotExists {
        kind: command.kind,
        name: command.name.clone(),
    })?;
    spec.arity.validate(command.args.len())?;
    debug!("dispatch: {}", command);
    Ok(spec.op.invoke(handler, ctx, &command.args)?)
}
