//! CLI mode for numguess: the interactive game and the cache worker commands.

mod progress;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use console::style;
use rand::Rng;

use crate::worker::{
    CacheStore, DiskCache, FetchSource, HttpFetcher, LogNotifier, OfflineWorker, PushEvent,
    Request, build_http_client, request,
};
use crate::{
    AppConfig, Error, Feedback, FileStore, GameSession, GuessOutcome, HintResponse, KeyValueStore,
    format_bytes, format_duration, format_progress, format_round,
};

use progress::{
    BarProgress, make_install_bar, print_cache_stats, print_cache_status, print_game_summary,
};

/// Subcommands of `numguess cache`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    /// Fetch the manifest into a fresh cache and activate it.
    Install,
    /// Activate an already installed cache, deleting older generations.
    Activate,
    Status,
    /// Route one URL through the worker.
    Fetch(String),
    /// Delete every cache.
    Clear,
}

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play,
    Cache(CacheCommand),
    /// Render a push notification with an optional body.
    Push(Option<String>),
    Help,
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

/// Parses arguments (without the program name).
///
/// # Errors
///
/// Returns a message describing the first unusable argument.
pub fn parse_args(args: &[String]) -> std::result::Result<CliArgs, String> {
    let mut config_path = None;
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                return Ok(CliArgs {
                    config_path,
                    command: Command::Help,
                });
            }
            "-c" | "--config" => {
                i += 1;
                let path = args.get(i).ok_or("--config requires a value")?;
                config_path = Some(PathBuf::from(path));
            }
            flag if flag.starts_with('-') && positional.is_empty() => {
                return Err(format!("Unknown option: {flag}"));
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let mut rest = positional.into_iter();
    let command = match rest.next().as_deref() {
        None | Some("play") => Command::Play,
        Some("help") => Command::Help,
        Some("push") => {
            let body: Vec<String> = rest.by_ref().collect();
            Command::Push((!body.is_empty()).then(|| body.join(" ")))
        }
        Some("cache") => Command::Cache(match rest.next().as_deref() {
            Some("install") => CacheCommand::Install,
            Some("activate") => CacheCommand::Activate,
            Some("status") | None => CacheCommand::Status,
            Some("clear") => CacheCommand::Clear,
            Some("fetch") => {
                CacheCommand::Fetch(rest.next().ok_or("cache fetch requires a URL")?)
            }
            Some(other) => return Err(format!("Unknown cache command: {other}")),
        }),
        Some(other) => return Err(format!("Unknown command: {other}")),
    };

    if let Some(extra) = rest.next() {
        return Err(format!("Unexpected argument: {extra}"));
    }
    Ok(CliArgs {
        config_path,
        command,
    })
}

/// Loads the config from `path`, or from the default location.
///
/// # Errors
///
/// Returns an error if the config cannot be read, parsed or created.
pub fn load_config(path: Option<PathBuf>) -> crate::Result<AppConfig> {
    let path = path.unwrap_or_else(AppConfig::default_path);
    log::debug!("Using config {}", path.display());
    AppConfig::load_or_create(&path)
}

/// Runs a parsed command.
///
/// # Errors
///
/// Returns an error if the command fails.
pub async fn run(args: CliArgs) -> crate::Result<()> {
    let config = load_config(args.config_path)?;
    match args.command {
        Command::Play => run_play(&config),
        Command::Cache(command) => run_cache(&config, command).await,
        Command::Push(body) => run_push(&config, body),
        Command::Help => Ok(()),
    }
}

const HELP: &[(&str, &str)] = &[
    ("<number>", "guess the secret number"),
    ("hint, h", "ask for the hint (once per game)"),
    ("new, n", "start a new game"),
    ("help, ?", "show this help"),
    ("quit, q", "leave"),
];

fn print_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Commands:")?;
    for (command, description) in HELP {
        writeln!(out, "  {command:<10} {description}")?;
    }
    Ok(())
}

fn print_round<S: KeyValueStore, R: Rng>(
    out: &mut impl Write,
    session: &GameSession<S, R>,
) -> io::Result<()> {
    let config = session.config();
    writeln!(
        out,
        "\n{} {}  Score: {}",
        style(format_round(session.round(), session.rounds_total())).bold(),
        format_progress(session.round() - 1, session.rounds_total()),
        session.total_score()
    )?;
    writeln!(
        out,
        "Guess a number between {} and {}.",
        config.min_number, config.max_number
    )
}

fn print_outcome(out: &mut impl Write, outcome: &GuessOutcome) -> io::Result<()> {
    let secret = outcome.secret;
    let line = match outcome.feedback() {
        Feedback::Perfect => style(format!("Perfect! The number was {secret}.")).green().bold(),
        Feedback::Close => style(format!("So close! The number was {secret}.")).cyan(),
        Feedback::Neutral => style(format!("The number was {secret}.")),
        Feedback::Far => style(format!("Way off. The number was {secret}.")).red(),
    };
    writeln!(out, "{line}")?;
    writeln!(
        out,
        "You guessed {} ({} away): +{} points, total {}",
        outcome.guess, outcome.diff, outcome.points, outcome.total_score
    )?;
    if outcome.hint_auto_unlocked {
        writeln!(out, "{}", style("Great round! The hint is unlocked.").yellow())?;
    }
    Ok(())
}

fn handle_hint<S: KeyValueStore, R: Rng>(
    out: &mut impl Write,
    session: &mut GameSession<S, R>,
) -> io::Result<()> {
    match session.request_hint() {
        Some(HintResponse::Hint(hint)) => writeln!(out, "{}", style(hint).yellow()),
        Some(HintResponse::Challenge(challenge)) => {
            writeln!(out, "The hint is locked. Solve for x to unlock it:")?;
            writeln!(out, "  {}", style(challenge).bold())
        }
        None if !session.is_active() => writeln!(out, "The game is over. Type 'new' to play again."),
        None => writeln!(out, "You already used the hint this game."),
    }
}

fn handle_answer<S: KeyValueStore, R: Rng>(
    out: &mut impl Write,
    session: &mut GameSession<S, R>,
    text: &str,
) -> io::Result<()> {
    match session.answer_equation(text) {
        Ok(()) => writeln!(
            out,
            "{}",
            style("Correct! The hint is unlocked, type 'hint' to use it.").green()
        ),
        Err(Error::ChallengeIncorrect { expected }) => writeln!(
            out,
            "{}",
            style(format!("Incorrect, x was {expected}. Type 'hint' for a new equation.")).red()
        ),
        Err(e) => writeln!(out, "{e}. Enter a whole number for x."),
    }
}

fn handle_guess<S: KeyValueStore, R: Rng>(
    out: &mut impl Write,
    session: &mut GameSession<S, R>,
    text: &str,
) -> io::Result<()> {
    match session.submit_guess(text) {
        Ok(outcome) => {
            print_outcome(out, &outcome)?;
            if let Some(end) = &outcome.game_end {
                print_game_summary(out, end)?;
                writeln!(out, "Type 'new' to play again or 'quit' to leave.")
            } else {
                print_round(out, session)
            }
        }
        Err(e) => writeln!(out, "{}", style(e).yellow()),
    }
}

/// Plays games reading commands from `input` until it ends or the player quits.
///
/// While an equation challenge is open, any line that is not a command
/// answers it.
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub fn run_game<S, R>(
    session: &mut GameSession<S, R>,
    input: impl BufRead,
    out: &mut impl Write,
) -> crate::Result<()>
where
    S: KeyValueStore,
    R: Rng,
{
    writeln!(out, "{}", style("Guess the Number").bold().cyan())?;
    writeln!(
        out,
        "{} rounds. The closer your guess, the more points you score.",
        session.rounds_total()
    )?;
    if let Some(best) = session.best_score() {
        writeln!(out, "Best score so far: {best}")?;
    }
    print_help(out)?;
    print_round(out, session)?;

    for line in input.lines() {
        let line = line?;
        let text = line.trim();
        match text.to_ascii_lowercase().as_str() {
            "" => {}
            "quit" | "q" | "exit" => break,
            "help" | "?" => print_help(out)?,
            "hint" | "h" => handle_hint(out, session)?,
            "new" | "n" => {
                session.new_game();
                writeln!(out, "New game!")?;
                print_round(out, session)?;
            }
            _ if session.pending_equation().is_some() => handle_answer(out, session, text)?,
            _ => handle_guess(out, session, text)?,
        }
        out.flush()?;
    }

    writeln!(out, "Thanks for playing!")?;
    Ok(())
}

/// Plays on the terminal, persisting the best score under the state directory.
///
/// # Errors
///
/// Returns an error if the rules are invalid or the terminal fails.
pub fn run_play(config: &AppConfig) -> crate::Result<()> {
    let store = FileStore::new(config.paths.scores_file());
    let mut session = GameSession::new(config.game.clone(), store)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_game(&mut session, stdin.lock(), &mut stdout)
}

fn open_worker(config: &AppConfig) -> crate::Result<OfflineWorker> {
    let origin = request::parse_url(&config.cache.origin)?;
    let fetcher = HttpFetcher::new(build_http_client()?, origin);
    let cache = DiskCache::new(&config.paths.cache_dir);
    OfflineWorker::new(&config.cache, cache, fetcher)
}

/// Runs a `numguess cache` subcommand against the on-disk cache.
///
/// # Errors
///
/// Returns an error if the worker operation fails.
pub async fn run_cache(config: &AppConfig, command: CacheCommand) -> crate::Result<()> {
    let mut worker = open_worker(config)?;

    match command {
        CacheCommand::Install => {
            let start = Instant::now();
            let progress = BarProgress::new(make_install_bar(worker.manifest().len() as u64));
            let result = worker.install(&progress).await;
            progress.finish();
            let count = result?;
            println!(
                "Installed {count} entries into {} in {}",
                worker.cache_name(),
                format_duration(start.elapsed())
            );
            report_activation(&worker.activate().await?);
        }
        CacheCommand::Activate => {
            if !worker.restore().await? {
                return Err(Error::Cache(format!(
                    "{} is not fully installed, run 'numguess cache install'",
                    worker.cache_name()
                )));
            }
            report_activation(&worker.activate().await?);
        }
        CacheCommand::Status => print_cache_status(&worker.status().await?),
        CacheCommand::Fetch(url) => {
            let request = Request::parse(&url, worker.origin())?;
            let outcome = worker.handle_fetch(&request).await?;
            let source = match outcome.source {
                FetchSource::Cache => "cache",
                FetchSource::Network { stored: true } => "network, stored",
                FetchSource::Network { stored: false } => "network, not stored",
            };
            let response = &outcome.response;
            println!(
                "{} {} ({}, {})",
                response.status,
                response.url,
                format_bytes(response.body.len() as u64),
                source
            );
            if let Some(content_type) = response.header("content-type") {
                println!("  content-type: {content_type}");
            }
            print_cache_stats(&worker.stats());
        }
        CacheCommand::Clear => {
            let deleted = worker.cache().delete_all(&|_: &str| true).await?;
            println!("Deleted {} cache(s)", deleted.len());
        }
    }
    Ok(())
}

fn report_activation(deleted: &[String]) {
    if deleted.is_empty() {
        println!("Activated, no stale caches");
    } else {
        println!("Activated, deleted {}", deleted.join(", "));
    }
}

/// Renders a push notification and prints it as JSON.
///
/// # Errors
///
/// Returns an error if the worker cannot be built or serialization fails.
pub fn run_push(config: &AppConfig, body: Option<String>) -> crate::Result<()> {
    let worker = open_worker(config)?;
    let notification = worker.handle_push(&PushEvent { data: body }, &LogNotifier)?;
    println!("{}", serde_json::to_string_pretty(&notification)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::hint::HINT_PREFIX;
    use crate::{GameConfig, MemoryStore};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn session() -> GameSession<MemoryStore, StdRng> {
        GameSession::with_rng(GameConfig::default(), MemoryStore::new(), StdRng::seed_from_u64(7))
            .unwrap()
    }

    fn play(session: &mut GameSession<MemoryStore, StdRng>, script: &str) -> String {
        console::set_colors_enabled(false);
        let mut out = Vec::new();
        run_game(session, script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parse_defaults_to_play() {
        let parsed = parse_args(&[]).unwrap();
        assert_eq!(parsed.command, Command::Play);
        assert_eq!(parsed.config_path, None);
    }

    #[test]
    fn parse_cache_commands() {
        let parsed = parse_args(&args(&["--config", "/tmp/n.toml", "cache", "fetch", "/mobile.html"])).unwrap();
        assert_eq!(parsed.config_path, Some(PathBuf::from("/tmp/n.toml")));
        assert_eq!(
            parsed.command,
            Command::Cache(CacheCommand::Fetch("/mobile.html".to_string()))
        );
        assert_eq!(
            parse_args(&args(&["cache"])).unwrap().command,
            Command::Cache(CacheCommand::Status)
        );
        assert!(parse_args(&args(&["cache", "fetch"])).is_err());
        assert!(parse_args(&args(&["cache", "burn"])).is_err());
    }

    #[test]
    fn parse_push_joins_body() {
        assert_eq!(
            parse_args(&args(&["push", "New", "round!"])).unwrap().command,
            Command::Push(Some("New round!".to_string()))
        );
        assert_eq!(parse_args(&args(&["push"])).unwrap().command, Command::Push(None));
    }

    #[test]
    fn parse_rejects_unknown_input() {
        assert!(parse_args(&args(&["--verbose"])).is_err());
        assert!(parse_args(&args(&["dance"])).is_err());
        assert!(parse_args(&args(&["play", "extra"])).is_err());
        assert!(parse_args(&args(&["--config"])).is_err());
        assert_eq!(parse_args(&args(&["-h"])).unwrap().command, Command::Help);
    }

    #[test]
    fn perfect_guess_is_reported() {
        let mut session = session();
        let secret = session.secret();
        let text = play(&mut session, &format!("{secret}\nquit\n"));
        assert!(text.contains(&format!("Perfect! The number was {secret}.")));
        assert!(text.contains("+100 points, total 100"));
        assert!(text.contains("Round 2/5"));
        assert_eq!(session.round(), 2);
    }

    #[test]
    fn bad_input_is_reported_without_scoring() {
        let mut session = session();
        let text = play(&mut session, "abc\n500\n");
        assert!(text.contains("Not a number"));
        assert!(text.contains("between 1 and 100 (got 500)"));
        assert_eq!(session.round(), 1);
        assert!(text.ends_with("Thanks for playing!\n"));
    }

    #[test]
    fn locked_hint_opens_challenge() {
        let mut session = session();
        let text = play(&mut session, "hint\n");
        let challenge = session.pending_equation().copied().unwrap();
        assert!(text.contains("The hint is locked"));
        assert!(text.contains(&challenge.to_string()));
    }

    #[test]
    fn solving_challenge_then_hint() {
        let mut session = session();
        let Some(HintResponse::Challenge(challenge)) = session.request_hint() else {
            panic!("hint should start locked");
        };
        let text = play(&mut session, &format!("{}\nh\nh\n", challenge.answer()));
        assert!(text.contains("Correct! The hint is unlocked"));
        assert!(text.contains(HINT_PREFIX));
        assert!(text.contains("You already used the hint this game."));
        assert!(session.hint_used());
        assert_eq!(session.round(), 1);
    }

    #[test]
    fn wrong_answer_reveals_solution() {
        let mut session = session();
        let Some(HintResponse::Challenge(challenge)) = session.request_hint() else {
            panic!("hint should start locked");
        };
        let wrong = challenge.answer() + 1;
        let text = play(&mut session, &format!("{wrong}\n"));
        assert!(text.contains(&format!("Incorrect, x was {}.", challenge.answer())));
        assert!(session.pending_equation().is_none());
        assert!(!session.hint_unlocked());
    }

    #[test]
    fn full_game_prints_summary_and_new_resets() {
        let mut session = session();
        let mut script = String::new();
        // Each guess is scored against the secret of its round; guessing the
        // minimum is always in range.
        for _ in 0..5 {
            script.push_str("1\n");
        }
        script.push_str("5\nnew\n");
        let text = play(&mut session, &script);
        assert!(text.contains("Game Summary"));
        assert!(text.contains("New best score!"));
        assert!(text.contains("game is over"));
        assert!(text.contains("New game!"));
        assert_eq!(session.round(), 1);
        assert!(session.best_score().is_some());
    }

    #[test]
    fn help_lists_commands() {
        let mut session = session();
        let text = play(&mut session, "?\n");
        assert_eq!(text.matches("hint, h").count(), 2);
    }
}
