//! Line-based interactive session.
//!
//! Each stage is triggered by hand, the same way a user would drive the
//! pipeline one button at a time. State lives in a single [`Session`].

use std::path::PathBuf;
use std::str::FromStr;

use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::app::{AppContext, Result};
use crate::checker::ImageCheckPolicy;
use crate::cli::commands::{print_columns, print_items, print_report};
use crate::domain::{normalize_domain, validate_domain};
use crate::rewriter::RewriteEligibility;
use crate::session::Session;

const HELP: &str = "\
Commands:
  domain <name>            set the site to pull from
  batch <1-100>            posts per page
  offset <n>               set the paging offset
  fetch                    fetch the next page
  check                    check images under the current policy
  rewrite                  rewrite titles of eligible items
  export [dir]             write the CSV (default: configured output dir)
  clear                    drop all items and rewind paging
  items                    list items
  columns                  list export columns
  column add               append a column
  column remove <pos>      remove the column at 1-based position
  column rename <pos> <n>  rename the column at 1-based position
  policy <name>            existence, content-type or canva-fetch
  eligibility <name>       has-image or valid-image
  messages                 show the stage log
  help                     this text
  quit                     leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Domain(String),
    Batch(usize),
    Offset(usize),
    Fetch,
    Check,
    Rewrite,
    Export(Option<PathBuf>),
    Clear,
    Items,
    Columns,
    ColumnAdd,
    /// 1-based position.
    ColumnRemove(usize),
    /// 1-based position and new name.
    ColumnRename(usize, String),
    Policy(ImageCheckPolicy),
    Eligibility(RewriteEligibility),
    Messages,
    Help,
    Quit,
    Empty,
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(ShellCommand::Empty);
        };
        let rest: Vec<&str> = words.collect();

        let cmd = match head.to_lowercase().as_str() {
            "domain" => ShellCommand::Domain(one_arg(&rest, "domain <name>")?.to_string()),
            "batch" => ShellCommand::Batch(parse_number(one_arg(&rest, "batch <1-100>")?)?),
            "offset" => ShellCommand::Offset(parse_number(one_arg(&rest, "offset <n>")?)?),
            "fetch" | "f" => ShellCommand::Fetch,
            "check" | "images" => ShellCommand::Check,
            "rewrite" | "optimize" => ShellCommand::Rewrite,
            "export" => match rest.as_slice() {
                [] => ShellCommand::Export(None),
                [dir] => ShellCommand::Export(Some(PathBuf::from(dir))),
                _ => return Err("Usage: export [dir]".into()),
            },
            "clear" => ShellCommand::Clear,
            "items" | "ls" => ShellCommand::Items,
            "columns" => ShellCommand::Columns,
            "column" | "col" => parse_column(&rest)?,
            "policy" => ShellCommand::Policy(one_arg(&rest, "policy <name>")?.parse()?),
            "eligibility" => {
                ShellCommand::Eligibility(one_arg(&rest, "eligibility <name>")?.parse()?)
            }
            "messages" | "log" => ShellCommand::Messages,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => return Err(format!("Unknown command: {}. Type 'help'", other)),
        };

        Ok(cmd)
    }
}

fn one_arg<'a>(rest: &[&'a str], usage: &str) -> std::result::Result<&'a str, String> {
    match rest {
        [arg] => Ok(*arg),
        _ => Err(format!("Usage: {}", usage)),
    }
}

fn parse_number(s: &str) -> std::result::Result<usize, String> {
    s.parse()
        .map_err(|_| format!("Expected a non-negative number, got '{}'", s))
}

fn parse_position(s: &str) -> std::result::Result<usize, String> {
    match parse_number(s)? {
        0 => Err("Column positions start at 1".into()),
        n => Ok(n),
    }
}

fn parse_column(rest: &[&str]) -> std::result::Result<ShellCommand, String> {
    match rest {
        ["add"] => Ok(ShellCommand::ColumnAdd),
        ["remove" | "rm", pos] => Ok(ShellCommand::ColumnRemove(parse_position(pos)?)),
        ["rename", pos, name @ ..] if !name.is_empty() => Ok(ShellCommand::ColumnRename(
            parse_position(pos)?,
            name.join(" "),
        )),
        _ => Err("Usage: column add | column remove <pos> | column rename <pos> <name>".into()),
    }
}

/// Run the shell until `quit` or end of input.
pub async fn run(ctx: &AppContext, session: &mut Session, domain: Option<String>) -> Result<()> {
    let mut domain = domain.or_else(|| ctx.config.source.domain.clone());
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    println!("bulkfeed shell. Type 'help' for commands.");
    if let Some(d) = &domain {
        println!("Domain: {}", d);
    }

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let cmd = match line.parse::<ShellCommand>() {
            Ok(cmd) => cmd,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        debug!("Shell command: {:?}", cmd);

        if cmd == ShellCommand::Quit {
            break;
        }
        execute(ctx, session, &mut domain, cmd).await;
    }

    Ok(())
}

async fn execute(
    ctx: &AppContext,
    session: &mut Session,
    domain: &mut Option<String>,
    cmd: ShellCommand,
) {
    match cmd {
        ShellCommand::Domain(d) => {
            if validate_domain(&d) {
                let host = normalize_domain(&d);
                println!("Domain: {}", host);
                *domain = Some(host);
            } else {
                eprintln!("'{}' is not a valid domain", d);
            }
        }
        ShellCommand::Batch(n) => match session.set_batch_size(n) {
            Ok(()) => println!("Batch size: {}", n),
            Err(e) => eprintln!("{}", e),
        },
        ShellCommand::Offset(n) => {
            session.set_offset(n);
            println!("Offset: {}", n);
        }
        ShellCommand::Fetch => match domain.as_deref() {
            Some(d) => print_report(&session.fetch(ctx, d).await),
            None => eprintln!("Set a domain first: domain <name>"),
        },
        ShellCommand::Check => print_report(&session.check_images(ctx).await),
        ShellCommand::Rewrite => print_report(&session.rewrite_titles(ctx).await),
        ShellCommand::Export(dir) => {
            let dir = dir.unwrap_or_else(|| ctx.config.export.output_dir.clone());
            print_report(&session.export(&dir));
        }
        ShellCommand::Clear => print_report(&session.clear()),
        ShellCommand::Items => print_items(&session.items()),
        ShellCommand::Columns => print_columns(session.columns()),
        ShellCommand::ColumnAdd => {
            let name = session.columns_mut().add().to_string();
            println!("Added column {}", name);
        }
        ShellCommand::ColumnRemove(pos) => match session.columns_mut().remove(pos - 1) {
            Ok(name) => println!("Removed column {}", name),
            Err(e) => eprintln!("{}", e),
        },
        ShellCommand::ColumnRename(pos, name) => {
            match session.columns_mut().rename(pos - 1, &name) {
                Ok(()) => print_columns(session.columns()),
                Err(e) => eprintln!("{}", e),
            }
        }
        ShellCommand::Policy(policy) => {
            session.set_image_policy(policy);
            println!("Image policy: {}", policy);
        }
        ShellCommand::Eligibility(eligibility) => {
            session.set_eligibility(eligibility);
            println!("Eligibility: {}", eligibility);
        }
        ShellCommand::Messages => {
            for report in session.messages() {
                println!("{}", report);
            }
        }
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit | ShellCommand::Empty => {}
    }
}
