//! Interactive review loop.
//!
//! Each stdin line is one command. Commands that change review state are
//! turned into [`UiEvent`]s and dispatched to the session; the rest (stats,
//! export, html) are read-only helpers.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::view;
use crate::adapters::AnnotationApi;
use crate::core::{Direction, EventOutcome, Session, UiEvent};

const HELP: &str = "\
Commands:
  n, next              next utterance
  p, prev              previous utterance
  goto <n>             jump to utterance n of the review order
  open <n>             annotate error span n
  tag <category>       toggle a taxonomy category
  custom [text]        set (or clear) the custom category
  severity <0-5>       set severity
  submit               save the open annotation
  close                discard the open form
  show                 redisplay the current utterance
  stats                progress
  summary              taxonomy and severity summary
  reload               refetch annotations from the server
  export [dir]         export all annotations to JSON
  html <file>          write the current utterance as an HTML page
  help                 this text
  q, quit              leave";

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Event(UiEvent),
    Show,
    Stats,
    Summary,
    Reload,
    Export(Option<PathBuf>),
    Html(PathBuf),
    Help,
    Quit,
    Empty,
}

fn direction_word(word: &str) -> Option<Direction> {
    match word {
        "n" | "next" => Some(Direction::Forward),
        "p" | "prev" | "previous" => Some(Direction::Backward),
        _ => None,
    }
}

/// 1-based number argument, converted to a 0-based index
fn number_arg(cmd: &str, arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("Usage: {} <n> (n starts at 1)", cmd)),
    }
}

/// Parse one input line
pub fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };

    if let Some(direction) = direction_word(cmd) {
        return Ok(ReplCommand::Event(UiEvent::Navigate(direction)));
    }

    let command = match cmd {
        "" => ReplCommand::Empty,
        "goto" | "g" => ReplCommand::Event(UiEvent::Jump(number_arg(cmd, arg)?)),
        "open" | "o" => ReplCommand::Event(UiEvent::OpenTarget(number_arg(cmd, arg)?)),
        "tag" | "t" => {
            if arg.is_empty() {
                return Err("Usage: tag <category>".to_string());
            }
            ReplCommand::Event(UiEvent::ToggleTaxonomy(arg.to_string()))
        }
        "custom" | "c" => ReplCommand::Event(UiEvent::SetCustom(arg.to_string())),
        "severity" | "sev" => {
            let level = arg
                .parse::<i64>()
                .map_err(|_| "Usage: severity <0-5>".to_string())?;
            ReplCommand::Event(UiEvent::SetSeverity(level))
        }
        "submit" | "s" => ReplCommand::Event(UiEvent::Submit),
        "close" => ReplCommand::Event(UiEvent::CloseForm),
        "show" => ReplCommand::Show,
        "stats" => ReplCommand::Stats,
        "summary" => ReplCommand::Summary,
        "reload" => ReplCommand::Reload,
        "export" => ReplCommand::Export((!arg.is_empty()).then(|| PathBuf::from(arg))),
        "html" => {
            if arg.is_empty() {
                return Err("Usage: html <file>".to_string());
            }
            ReplCommand::Html(PathBuf::from(arg))
        }
        "help" | "h" | "?" => ReplCommand::Help,
        "q" | "quit" | "exit" => ReplCommand::Quit,
        other => return Err(format!("Unknown command: {} (try 'help')", other)),
    };
    Ok(command)
}

fn show_current<A: AnnotationApi>(session: &Session<A>) {
    match session.current_utterance() {
        Some((_, utterance)) => view::print_utterance(
            session.navigator().position(),
            session.navigator().len(),
            utterance,
            session.overlay(),
            session.cache(),
        ),
        None => println!("No utterance loaded"),
    }
}

fn show_form<A: AnnotationApi>(session: &Session<A>) {
    if let Some(form) = session.form() {
        view::print_form(form, session.categories());
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush().context("Failed to flush stdout")
}

/// Dispatch one event and print what changed
async fn dispatch<A: AnnotationApi>(session: &mut Session<A>, event: UiEvent) {
    match session.handle(event).await {
        Ok(EventOutcome::Rendered) | Ok(EventOutcome::FormClosed) => show_current(session),
        Ok(EventOutcome::Unchanged) => println!("Already at the end of the review order"),
        Ok(EventOutcome::FormOpened(_)) | Ok(EventOutcome::FormUpdated) => show_form(session),
        Ok(EventOutcome::Saved(ack)) => {
            println!(
                "Saved {} ({})",
                ack.error_id,
                ack.action.as_deref().unwrap_or("ok")
            );
            show_current(session);
        }
        Err(e) => {
            eprintln!("{}", e);
            show_form(session);
        }
    }
}

/// Run the interactive loop until `quit` or end of input
pub async fn run<A: AnnotationApi>(mut session: Session<A>, export_dir: &Path) -> Result<()> {
    session.load().await;

    if session.utterances().is_empty() {
        println!("No utterances found for model {}", session.model());
        return Ok(());
    }

    println!(
        "Reviewing {} ({} utterances, {} annotations). Type 'help' for commands.",
        session.model(),
        session.utterances().len(),
        session.cache().len()
    );
    show_current(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
    {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message);
                prompt()?;
                continue;
            }
        };

        match command {
            ReplCommand::Event(event) => dispatch(&mut session, event).await,
            ReplCommand::Show => show_current(&session),
            ReplCommand::Stats => view::print_stats(session.model(), &session.stats().await),
            ReplCommand::Summary => view::print_summary(&session.summary()),
            ReplCommand::Reload => {
                session.reload_annotations().await;
                show_current(&session);
            }
            ReplCommand::Export(dir) => {
                let dir = dir.unwrap_or_else(|| export_dir.to_path_buf());
                match session.export(&dir).await {
                    Ok(path) => println!("Exported to {}", path.display()),
                    Err(e) => eprintln!("Export failed: {:#}", e),
                }
            }
            ReplCommand::Html(path) => match session.current_utterance() {
                Some((_, utterance)) => {
                    let page = view::html_page(session.model(), utterance, session.overlay());
                    match tokio::fs::write(&path, page).await {
                        Ok(()) => println!("HTML written to {}", path.display()),
                        Err(e) => warn!(path = %path.display(), error = %e, "Failed to write HTML page"),
                    }
                }
                None => println!("No utterance loaded"),
            },
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => break,
            ReplCommand::Empty => {}
        }

        prompt()?;
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_navigation() {
        assert_eq!(
            parse_command("next").unwrap(),
            ReplCommand::Event(UiEvent::Navigate(Direction::Forward))
        );
        assert_eq!(
            parse_command("  p ").unwrap(),
            ReplCommand::Event(UiEvent::Navigate(Direction::Backward))
        );
        assert_eq!(
            parse_command("goto 3").unwrap(),
            ReplCommand::Event(UiEvent::Jump(2))
        );
        assert!(parse_command("goto 0").is_err());
        assert!(parse_command("goto x").is_err());
    }

    #[test]
    fn test_parse_form_commands() {
        assert_eq!(
            parse_command("open 1").unwrap(),
            ReplCommand::Event(UiEvent::OpenTarget(0))
        );
        assert_eq!(
            parse_command("tag named_entity").unwrap(),
            ReplCommand::Event(UiEvent::ToggleTaxonomy("named_entity".to_string()))
        );
        assert_eq!(
            parse_command("custom weird case").unwrap(),
            ReplCommand::Event(UiEvent::SetCustom("weird case".to_string()))
        );
        assert_eq!(
            parse_command("custom").unwrap(),
            ReplCommand::Event(UiEvent::SetCustom(String::new()))
        );
        assert_eq!(
            parse_command("severity 9").unwrap(),
            ReplCommand::Event(UiEvent::SetSeverity(9))
        );
        assert!(parse_command("severity high").is_err());
        assert!(parse_command("tag").is_err());
        assert_eq!(parse_command("submit").unwrap(), ReplCommand::Event(UiEvent::Submit));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_command("").unwrap(), ReplCommand::Empty);
        assert_eq!(parse_command("export").unwrap(), ReplCommand::Export(None));
        assert_eq!(
            parse_command("export /tmp/out").unwrap(),
            ReplCommand::Export(Some(PathBuf::from("/tmp/out")))
        );
        assert_eq!(
            parse_command("html page.html").unwrap(),
            ReplCommand::Html(PathBuf::from("page.html"))
        );
        assert_eq!(parse_command("quit").unwrap(), ReplCommand::Quit);
        assert!(parse_command("dance").is_err());
    }
}
