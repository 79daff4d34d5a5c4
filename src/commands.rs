use std::fmt::Display;

use crate::types::{
    NewSubtask, NewTask, ParsePriorityError, Priority, SubtaskId, SubtaskUpdate, TaskId,
    TaskUpdate,
};

use combine::error::{ParseError, StreamError};
use combine::parser::char::{char, digit, letter, space, spaces, string};
use combine::stream::{position, StreamErrorFor};
use combine::{
    any, attempt, choice, eof, many, many1, none_of, sep_by1, skip_many1, EasyParser, Parser,
    Stream,
};

const VERBS: [&str; 12] = [
    "task", "sub", "edit", "subedit", "del", "subdel", "done", "undo", "start", "toggle",
    "open", "quit",
];

/// A command entered on the home screen, checked and ready to run against
/// the store.
#[derive(Debug, PartialEq)]
pub(crate) enum Command {
    AddTask(NewTask),
    AddSubtask(NewSubtask),
    EditTask(TaskId, TaskUpdate),
    EditSubtask(SubtaskId, SubtaskUpdate),
    ToggleSubtask(SubtaskId),
    DeleteTask(TaskId),
    DeleteSubtask(SubtaskId),
    Open(TaskId),
    Quit,
}

#[derive(Debug, PartialEq)]
pub(crate) enum CommandParseError {
    UnknownCommand(String),
    InvalidArgument(String),
    Empty,
}

impl Display for CommandParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandParseError::UnknownCommand(verb) => write!(f, "Unknown command {verb:?}"),
            CommandParseError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            CommandParseError::Empty => f.write_str("Nothing to do"),
        }
    }
}

/// Raw shape of a command line before field values are checked.
enum Parsed {
    Task(Vec<String>),
    Sub(TaskId, Vec<String>),
    Edit(TaskId, String, String),
    SubEdit(SubtaskId, String, String),
    Del(TaskId),
    SubDel(SubtaskId),
    Done(SubtaskId),
    Undo(SubtaskId),
    Start(SubtaskId),
    Toggle(SubtaskId),
    Open(TaskId),
    Quit,
}

fn id<Input>() -> impl Parser<Input, Output = i64>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    many1(digit()).and_then(|digits: String| {
        digits
            .parse::<i64>()
            .map_err(StreamErrorFor::<Input>::other)
    })
}

/// A verb followed by at least one space.
fn keyword<Input>(word: &'static str) -> impl Parser<Input, Output = &'static str>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    attempt(string(word).skip(skip_many1(space())))
}

/// `;` separated fields, possibly empty.
fn fields<Input>() -> impl Parser<Input, Output = Vec<String>>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    sep_by1::<Vec<String>, _, _, _>(many::<String, _, _>(none_of(";".chars())), char(';'))
        .map(|fields| fields.into_iter().map(|f| f.trim().to_string()).collect())
}

/// `<id> <field> <value...>`
fn assignment<Input>() -> impl Parser<Input, Output = (i64, String, String)>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    (
        id().skip(skip_many1(space())),
        many1::<String, _, _>(letter()).skip(choice((skip_many1(space()), eof()))),
        many::<String, _, _>(any()),
    )
        .map(|(id, field, value)| (id, field, value.trim().to_string()))
}

fn single_id<Input>() -> impl Parser<Input, Output = i64>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    id().skip(spaces()).skip(eof())
}

fn command<Input>() -> impl Parser<Input, Output = Parsed>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    choice((
        keyword("task").with(fields()).map(Parsed::Task),
        keyword("sub")
            .with((id().skip(spaces()).skip(char(';')), fields()))
            .map(|(task_id, fields)| Parsed::Sub(task_id, fields)),
        keyword("edit")
            .with(assignment())
            .map(|(id, field, value)| Parsed::Edit(id, field, value)),
        keyword("subedit")
            .with(assignment())
            .map(|(id, field, value)| Parsed::SubEdit(id, field, value)),
        keyword("del").with(single_id()).map(Parsed::Del),
        keyword("subdel").with(single_id()).map(Parsed::SubDel),
        keyword("done").with(single_id()).map(Parsed::Done),
        keyword("undo").with(single_id()).map(Parsed::Undo),
        keyword("start").with(single_id()).map(Parsed::Start),
        keyword("toggle").with(single_id()).map(Parsed::Toggle),
        keyword("open").with(single_id()).map(Parsed::Open),
        attempt(string("quit").skip(spaces()).skip(eof())).map(|_| Parsed::Quit),
    ))
}

fn invalid(msg: impl Into<String>) -> CommandParseError {
    CommandParseError::InvalidArgument(msg.into())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn required(field: &str, value: String) -> Result<String, CommandParseError> {
    if value.is_empty() {
        Err(invalid(format!("{field} cannot be empty")))
    } else {
        Ok(value)
    }
}

fn priority(value: &str) -> Result<Option<Priority>, CommandParseError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|e: ParsePriorityError| invalid(e.to_string()))
}

fn flag(value: &str) -> Result<bool, CommandParseError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(invalid(format!("expected true or false, got {value:?}"))),
    }
}

fn new_task(fields: Vec<String>) -> Result<NewTask, CommandParseError> {
    if !(2..=5).contains(&fields.len()) {
        return Err(invalid(
            "expected category; name[; detail[; priority[; assignee]]]",
        ));
    }
    let mut fields = fields.into_iter();
    let category = required("category", fields.next().unwrap_or_default())?;
    let name = required("name", fields.next().unwrap_or_default())?;
    let detail = fields.next().and_then(non_empty);
    let priority = priority(&fields.next().unwrap_or_default())?;
    let assignee = fields.next().and_then(non_empty);
    Ok(NewTask {
        detail,
        priority,
        assignee,
        ..NewTask::new(category, name)
    })
}

fn new_subtask(task_id: TaskId, fields: Vec<String>) -> Result<NewSubtask, CommandParseError> {
    if !(1..=2).contains(&fields.len()) {
        return Err(invalid("expected task id; name[; detail]"));
    }
    let mut fields = fields.into_iter();
    let name = required("name", fields.next().unwrap_or_default())?;
    Ok(NewSubtask {
        detail: fields.next().and_then(non_empty),
        ..NewSubtask::new(task_id, name)
    })
}

/// An empty value clears the nullable fields.
fn task_update(field: &str, value: String) -> Result<TaskUpdate, CommandParseError> {
    let mut update = TaskUpdate::default();
    match field.to_ascii_lowercase().as_str() {
        "category" => update.category = Some(required("category", value)?),
        "name" => update.name = Some(required("name", value)?),
        "detail" => update.detail = Some(non_empty(value)),
        "priority" => update.priority = Some(priority(&value)?),
        "assignee" => update.assignee = Some(non_empty(value)),
        other => return Err(invalid(format!("tasks have no field {other:?}"))),
    }
    Ok(update)
}

fn subtask_update(field: &str, value: String) -> Result<SubtaskUpdate, CommandParseError> {
    let mut update = SubtaskUpdate::default();
    match field.to_ascii_lowercase().as_str() {
        "name" => update.name = Some(required("name", value)?),
        "detail" => update.detail = Some(non_empty(value)),
        "completed" => update.completed = Some(flag(&value)?),
        "initiated" => update.initiated = Some(flag(&value)?),
        other => return Err(invalid(format!("subtasks have no field {other:?}"))),
    }
    Ok(update)
}

pub(crate) fn parse_command(input: &str) -> Result<Command, CommandParseError> {
    let input = input.trim();
    let verb = input
        .split_whitespace()
        .next()
        .ok_or(CommandParseError::Empty)?;
    if !VERBS.contains(&verb) {
        return Err(CommandParseError::UnknownCommand(verb.to_string()));
    }
    let (parsed, _) = command()
        .easy_parse(position::Stream::new(input))
        .map_err(|e| invalid(e.to_string()))?;
    Ok(match parsed {
        Parsed::Task(fields) => Command::AddTask(new_task(fields)?),
        Parsed::Sub(task_id, fields) => Command::AddSubtask(new_subtask(task_id, fields)?),
        Parsed::Edit(id, field, value) => Command::EditTask(id, task_update(&field, value)?),
        Parsed::SubEdit(id, field, value) => {
            Command::EditSubtask(id, subtask_update(&field, value)?)
        }
        Parsed::Del(id) => Command::DeleteTask(id),
        Parsed::SubDel(id) => Command::DeleteSubtask(id),
        Parsed::Done(id) => Command::EditSubtask(
            id,
            SubtaskUpdate {
                completed: Some(true),
                ..Default::default()
            },
        ),
        Parsed::Undo(id) => Command::EditSubtask(
            id,
            SubtaskUpdate {
                completed: Some(false),
                ..Default::default()
            },
        ),
        Parsed::Start(id) => Command::EditSubtask(
            id,
            SubtaskUpdate {
                initiated: Some(true),
                ..Default::default()
            },
        ),
        Parsed::Toggle(id) => Command::ToggleSubtask(id),
        Parsed::Open(id) => Command::Open(id),
        Parsed::Quit => Command::Quit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_task() {
        let command = parse_command("task Work; Write report; Q3 numbers; high; sam").unwrap();
        assert_eq!(
            command,
            Command::AddTask(NewTask {
                category: "Work".to_string(),
                name: "Write report".to_string(),
                detail: Some("Q3 numbers".to_string()),
                priority: Some(Priority::High),
                assignee: Some("sam".to_string()),
            })
        );
    }

    #[test]
    fn skipped_task_fields_are_none() {
        let command = parse_command("task Home; Dishes; ; ; kim").unwrap();
        assert_eq!(
            command,
            Command::AddTask(NewTask {
                assignee: Some("kim".to_string()),
                ..NewTask::new("Home", "Dishes")
            })
        );
        assert_eq!(
            parse_command("task Home;Dishes").unwrap(),
            Command::AddTask(NewTask::new("Home", "Dishes"))
        );
    }

    #[test]
    fn task_needs_category_and_name() {
        assert!(matches!(
            parse_command("task Home"),
            Err(CommandParseError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command("task ; Dishes"),
            Err(CommandParseError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command("task Home; Dishes; x; urgent"),
            Err(CommandParseError::InvalidArgument(_))
        ));
    }

    #[test]
    fn parses_subtask() {
        assert_eq!(
            parse_command("sub 4; Buy soap; the good one").unwrap(),
            Command::AddSubtask(NewSubtask {
                detail: Some("the good one".to_string()),
                ..NewSubtask::new(4, "Buy soap")
            })
        );
        assert_eq!(
            parse_command("sub 4 ;Buy soap").unwrap(),
            Command::AddSubtask(NewSubtask::new(4, "Buy soap"))
        );
    }

    #[test]
    fn subtask_needs_numeric_task_id() {
        assert!(matches!(
            parse_command("sub four; Buy soap"),
            Err(CommandParseError::InvalidArgument(_))
        ));
    }

    #[test]
    fn parses_task_edits() {
        assert_eq!(
            parse_command("edit 2 name Call the bank").unwrap(),
            Command::EditTask(
                2,
                TaskUpdate {
                    name: Some("Call the bank".to_string()),
                    ..Default::default()
                }
            )
        );
        assert_eq!(
            parse_command("edit 2 priority").unwrap(),
            Command::EditTask(
                2,
                TaskUpdate {
                    priority: Some(None),
                    ..Default::default()
                }
            )
        );
        assert_eq!(
            parse_command("edit 2 assignee").unwrap(),
            Command::EditTask(
                2,
                TaskUpdate {
                    assignee: Some(None),
                    ..Default::default()
                }
            )
        );
        assert!(parse_command("edit 2 name").is_err());
        assert!(parse_command("edit 2 colour red").is_err());
        assert!(parse_command("edit 2 detail2").is_err());
        assert!(parse_command("subedit 2 completedyes").is_err());
    }

    #[test]
    fn parses_subtask_edits() {
        assert_eq!(
            parse_command("subedit 9 completed no").unwrap(),
            Command::EditSubtask(
                9,
                SubtaskUpdate {
                    completed: Some(false),
                    ..Default::default()
                }
            )
        );
        assert_eq!(
            parse_command("done 9").unwrap(),
            Command::EditSubtask(
                9,
                SubtaskUpdate {
                    completed: Some(true),
                    ..Default::default()
                }
            )
        );
        assert_eq!(
            parse_command("start 9").unwrap(),
            Command::EditSubtask(
                9,
                SubtaskUpdate {
                    initiated: Some(true),
                    ..Default::default()
                }
            )
        );
        assert!(parse_command("subedit 9 completed maybe").is_err());
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_command("del 3").unwrap(), Command::DeleteTask(3));
        assert_eq!(parse_command("subdel 3").unwrap(), Command::DeleteSubtask(3));
        assert_eq!(parse_command("toggle 5").unwrap(), Command::ToggleSubtask(5));
        assert_eq!(parse_command("open 1 ").unwrap(), Command::Open(1));
        assert_eq!(parse_command("  quit").unwrap(), Command::Quit);
        assert!(parse_command("del 3 4").is_err());
        assert!(parse_command("del").is_err());
    }

    #[test]
    fn reports_unknown_and_empty() {
        assert_eq!(
            parse_command("push thing"),
            Err(CommandParseError::UnknownCommand("push".to_string()))
        );
        assert_eq!(parse_command("   "), Err(CommandParseError::Empty));
    }
}
