//! Line-oriented command shell over a [`Session`].
//!
//! One command per line. Output goes to the given writer; logs stay on
//! stderr.

use std::io::Write;
use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::model::{Provider, TokenConfig, parse_cost, parse_token_count};
use crate::render;
use crate::session::{FormField, Session};
use crate::sort::SortKey;

pub const HELP: &str = "\
commands:
  list [query]              show providers (optionally set the search first)
  search <query>            set the search filter (empty clears it)
  add <name> <model> <in> <out>
                            add a custom provider; fields may be split by '|'
  edit <i>                  start editing custom provider #i
  set name|model|input|output <value>
                            change a field of the add/edit form
  save                      save the form (commit edit or add)
  cancel                    cancel the current edit
  delete <i>                delete custom provider #i
  delete-selected           delete every selected custom provider
  toggle <i>...             toggle selection of providers
  select-all | deselect-all
  tokens <input> <output>   set token counts
  calc                      recalculate costs
  results                   show cost results
  sort <key>                sort the comparison table
  table                     show the comparison table
  bench <model>             show benchmarks for one model
  refresh                   reload pricing and the comparison table
  help | quit";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid index '{0}'")]
    BadIndex(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    List(Option<String>),
    Search(String),
    Add(Provider),
    Edit(usize),
    Set(FormField, String),
    Save,
    Cancel,
    Delete(usize),
    DeleteSelected,
    Toggle(Vec<usize>),
    SelectAll,
    DeselectAll,
    Tokens(TokenConfig),
    Calc,
    Results,
    Sort(SortKey),
    Table,
    Bench(String),
    Refresh,
    Quit,
}

fn index(raw: &str) -> Result<usize, CommandError> {
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| CommandError::BadIndex(raw.to_string()))
}

fn add_fields(rest: &str) -> Result<Provider, CommandError> {
    const USAGE: &str = "add <name> <model> [input] [output]";
    let fields: Vec<&str> = if rest.contains('|') {
        rest.split('|').map(str::trim).collect()
    } else {
        rest.split_whitespace().collect()
    };
    if !(2..=4).contains(&fields.len()) {
        return Err(CommandError::Usage(USAGE));
    }
    let cost = |i: usize| fields.get(i).map(|v| parse_cost(v)).unwrap_or(0.0);
    Ok(Provider::new(fields[0], fields[1], cost(2), cost(3)))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let cmd = match verb.to_ascii_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "list" | "ls" => Command::List((!rest.is_empty()).then(|| rest.to_string())),
            "search" => Command::Search(rest.to_string()),
            "add" => Command::Add(add_fields(rest)?),
            "edit" => Command::Edit(index(rest)?),
            "set" => {
                let (field, value) = rest
                    .split_once(char::is_whitespace)
                    .map(|(f, v)| (f, v.trim()))
                    .unwrap_or((rest, ""));
                let field = field
                    .parse::<FormField>()
                    .map_err(|_| CommandError::Usage("set name|model|input|output <value>"))?;
                Command::Set(field, value.to_string())
            }
            "save" => Command::Save,
            "cancel" => Command::Cancel,
            "delete" | "rm" => Command::Delete(index(rest)?),
            "delete-selected" => Command::DeleteSelected,
            "toggle" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("toggle <i>..."));
                }
                let indices = rest
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(index)
                    .collect::<Result<Vec<_>, _>>()?;
                Command::Toggle(indices)
            }
            "select-all" => Command::SelectAll,
            "deselect-all" => Command::DeselectAll,
            "tokens" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                let [input, output] = parts.as_slice() else {
                    return Err(CommandError::Usage("tokens <input> <output>"));
                };
                Command::Tokens(TokenConfig {
                    input: parse_token_count(input),
                    output: parse_token_count(output),
                })
            }
            "calc" | "calculate" => Command::Calc,
            "results" => Command::Results,
            "sort" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("sort <key>"));
                }
                match rest.parse::<SortKey>() {
                    Ok(key) => Command::Sort(key),
                    Err(never) => match never {},
                }
            }
            "table" => Command::Table,
            "bench" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("bench <model>"));
                }
                Command::Bench(rest.to_string())
            }
            "refresh" => Command::Refresh,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(cmd)
    }
}

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Output(String),
    Quit,
}

// Append a request failure to the rendered view.
fn with_error<E: std::fmt::Display>(view: String, result: Result<(), E>) -> String {
    match result {
        Ok(()) => view,
        Err(e) => format!("error: {}\n{}", e, view),
    }
}

fn providers_view(session: &Session) -> String {
    render::providers(&session.grouped(), session.registry())
}

fn results_view(session: &Session) -> String {
    render::results(session.results())
}

pub async fn execute(session: &mut Session, command: Command) -> Outcome {
    let text = match command {
        Command::Help => HELP.to_string(),
        Command::Quit => return Outcome::Quit,
        Command::List(query) => {
            if let Some(q) = query {
                session.set_search(q);
            }
            providers_view(session)
        }
        Command::Search(query) => {
            session.set_search(query);
            providers_view(session)
        }
        Command::Add(provider) => {
            if session.add_provider(provider) {
                providers_view(session)
            } else {
                "name and model are required".to_string()
            }
        }
        Command::Edit(i) => {
            if session.begin_edit(i) {
                render::form(session.form(), true)
            } else {
                format!("#{} is not a custom provider", i)
            }
        }
        Command::Set(field, value) => {
            session.set_field(field, &value);
            let editing = session.registry().edit_state().is_some();
            render::form(session.form(), editing)
        }
        Command::Save => {
            let editing = session.registry().edit_state().is_some();
            match session.submit_form().await {
                Ok(true) => providers_view(session),
                Ok(false) => format!(
                    "name and model are required\n{}",
                    render::form(session.form(), editing)
                ),
                Err(e) => with_error(providers_view(session), Err(e)),
            }
        }
        Command::Cancel => {
            session.cancel_edit();
            "edit cancelled".to_string()
        }
        Command::Delete(i) => {
            let outcome = session.delete(i).await.map(|removed| {
                if !removed {
                    tracing::debug!("delete #{} removed nothing", i);
                }
            });
            with_error(providers_view(session), outcome)
        }
        Command::DeleteSelected => {
            let outcome = session.delete_selected().await;
            let count = outcome.as_ref().copied().unwrap_or(0);
            let view = format!("deleted {} provider(s)\n{}", count, providers_view(session));
            with_error(view, outcome.map(|_| ()))
        }
        Command::Toggle(indices) => {
            let outcome = session.toggle(&indices).await;
            with_error(providers_view(session), outcome)
        }
        Command::SelectAll => {
            let outcome = session.select_all().await;
            with_error(providers_view(session), outcome)
        }
        Command::DeselectAll => {
            let outcome = session.deselect_all().await;
            with_error(providers_view(session), outcome)
        }
        Command::Tokens(tokens) => {
            session.set_tokens(tokens);
            render::tokens(session.tokens())
        }
        Command::Calc => {
            let outcome = session.calculate().await;
            with_error(results_view(session), outcome)
        }
        Command::Results => results_view(session),
        Command::Sort(key) => {
            let outcome = session.handle_sort(key).await;
            with_error(
                render::benchmark_table(session.benchmark_table(), session.sort()),
                outcome,
            )
        }
        Command::Table => render::benchmark_table(session.benchmark_table(), session.sort()),
        Command::Bench(model) => {
            let outcome = session.fetch_benchmarks(&model).await;
            let view = session
                .benchmarks()
                .map(render::benchmark_scores)
                .unwrap_or_default();
            with_error(view, outcome)
        }
        Command::Refresh => {
            let pricing = session.refresh_pricing().await;
            let table = session.refresh_benchmark_table().await;
            with_error(with_error(providers_view(session), table), pricing)
        }
    };
    Outcome::Output(text)
}

/// Read commands from `input` until EOF, `quit` or Ctrl-C.
pub async fn run<R, W>(session: &mut Session, input: R, out: &mut W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                None
            }
        };
        let Some(line) = line else {
            writeln!(out)?;
            break;
        };
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                writeln!(out, "{}", e)?;
                continue;
            }
        };
        tracing::debug!("command: {:?}", command);
        match execute(session, command).await {
            Outcome::Output(text) => writeln!(out, "{}", text)?,
            Outcome::Quit => break,
        }
    }
    Ok(())
}
