use std::io;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tvt_core::actions::UserAction;
use tvt_core::state::FormModule;
use tvt_core::state::OptimizationStrategy;
use tvt_core::state::PromptType;
use tvt_exec::runtime::ConsoleRuntime;

use crate::files;
use crate::ui;

/// One line of the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Text(String),
    Tactile(Option<PathBuf>),
    Visual(Option<PathBuf>),
    Mode(PromptType),
    Context(bool),
    Auto(bool),
    Strategy(OptimizationStrategy),
    Edit(String),
    Optimize,
    Revert,
    Example,
    History,
    ClearHistory,
    Clear,
    Submit,
    Show,
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  text <input>            set the textual input
  tactile <path>|none     attach or remove the tactile data file
  visual <path>|none      attach or remove the visual data file
  mode <type>             tactile-text, vision-text, combined, text-only
  context on|off          include the contextual header
  auto on|off             auto-optimize after every input change
  strategy <name>         balanced, clarity, structure, specificity
  edit <prompt>           replace the prompt text
  optimize                run an optimization pass now
  revert                  restore the previous prompt version
  example                 append the example analysis framework
  history                 list saved prompt versions
  clear-history           drop saved prompt versions
  clear                   clear files, text and the last result
  submit                  send the unified analysis request
  show                    print the current prompt state
  help                    this text
  quit                    leave the session";

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("expected on or off, got '{other}'")),
    }
}

fn parse_path(value: &str) -> Option<PathBuf> {
    match value {
        "" | "none" | "-" => None,
        path => Some(PathBuf::from(path)),
    }
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "text" => SessionCommand::Text(rest.to_string()),
        "tactile" => SessionCommand::Tactile(parse_path(rest)),
        "visual" | "image" => SessionCommand::Visual(parse_path(rest)),
        "mode" => SessionCommand::Mode(
            PromptType::parse(rest).ok_or_else(|| format!("unknown mode '{rest}'"))?,
        ),
        "context" => SessionCommand::Context(parse_switch(rest)?),
        "auto" => SessionCommand::Auto(parse_switch(rest)?),
        "strategy" => SessionCommand::Strategy(
            OptimizationStrategy::parse(rest)
                .ok_or_else(|| format!("unknown strategy '{rest}'"))?,
        ),
        "edit" => SessionCommand::Edit(rest.to_string()),
        "optimize" => SessionCommand::Optimize,
        "revert" => SessionCommand::Revert,
        "example" => SessionCommand::Example,
        "history" => SessionCommand::History,
        "clear-history" => SessionCommand::ClearHistory,
        "clear" => SessionCommand::Clear,
        "submit" => SessionCommand::Submit,
        "show" => SessionCommand::Show,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(command))
}

enum Event {
    Line(Option<String>),
    Settled,
}

fn prompt_marker() -> io::Result<()> {
    print!("tvt> ");
    io::stdout().flush()
}

fn apply_command(runtime: &mut ConsoleRuntime, command: SessionCommand) -> Result<()> {
    let action = match command {
        SessionCommand::Text(text) => UserAction::SetTextualInput(text),
        SessionCommand::Tactile(path) => {
            UserAction::SetTactileFile(files::load_optional(path.as_deref())?)
        }
        SessionCommand::Visual(path) => {
            UserAction::SetVisualFile(files::load_optional(path.as_deref())?)
        }
        SessionCommand::Mode(prompt_type) => UserAction::SetPromptType(prompt_type),
        SessionCommand::Context(enabled) => UserAction::SetAddContextualInfo(enabled),
        SessionCommand::Auto(enabled) => UserAction::SetAutoOptimize(enabled),
        SessionCommand::Strategy(strategy) => UserAction::SetOptimizationStrategy(strategy),
        SessionCommand::Edit(text) => UserAction::EditPromptText(text),
        SessionCommand::Optimize => UserAction::OptimizePrompt,
        SessionCommand::Revert => UserAction::RevertPrompt,
        SessionCommand::Example => UserAction::InsertExample,
        SessionCommand::ClearHistory => UserAction::ClearPromptHistory,
        SessionCommand::Clear => UserAction::ClearInputs,
        SessionCommand::Submit => UserAction::SubmitMain,
        SessionCommand::History => {
            print!("{}", ui::render_history(&runtime.state().main));
            return Ok(());
        }
        SessionCommand::Show => {
            print!("{}", ui::render_prompt_state(&runtime.state().main));
            return Ok(());
        }
        SessionCommand::Help => {
            println!("{HELP}");
            return Ok(());
        }
        SessionCommand::Quit => return Ok(()),
    };
    runtime.dispatch(action);
    Ok(())
}

/// Interactive main form. Input lines and completions are handled as they
/// arrive, so an optimization pass or a request never blocks typing.
pub async fn run_session(runtime: &mut ConsoleRuntime) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seen = ui::last_notice_seq(runtime.state());
    let mut awaiting_result = false;

    println!("tvt session ({}); type 'help' for commands", runtime.executor_name());
    prompt_marker()?;

    loop {
        let busy = runtime.is_busy();
        let was_optimizing = runtime.state().main.is_optimizing;
        let event = tokio::select! {
            line = lines.next_line() => Event::Line(line?),
            _ = runtime.settle_next(), if busy => Event::Settled,
        };

        let from_input = matches!(event, Event::Line(_));
        match event {
            Event::Line(None) => break,
            Event::Line(Some(line)) => match parse_command(&line) {
                Ok(Some(SessionCommand::Quit)) => break,
                Ok(Some(command)) => {
                    let submitting = command == SessionCommand::Submit;
                    if let Err(err) = apply_command(runtime, command) {
                        eprintln!("error: {err:#}");
                    }
                    if submitting && runtime.state().is_loading(FormModule::Main) {
                        awaiting_result = true;
                    }
                }
                Ok(None) => {}
                Err(message) => eprintln!("error: {message}"),
            },
            Event::Settled => {}
        }

        for notice in ui::render_notices_since(runtime.state(), seen) {
            println!("{notice}");
        }
        seen = ui::last_notice_seq(runtime.state());

        let main = &runtime.state().main;
        if was_optimizing && !main.is_optimizing && main.is_optimized {
            print!("{}", ui::render_prompt_state(main));
        }
        if awaiting_result && !runtime.state().is_loading(FormModule::Main) {
            awaiting_result = false;
            if let Some(result) = ui::render_module_result(runtime.state(), FormModule::Main) {
                println!("{result}");
            }
        }
        if runtime.take_frame_request() {
            log::trace!("session state changed");
        }
        if from_input {
            prompt_marker()?;
        }
    }

    println!();
    Ok(())
}
