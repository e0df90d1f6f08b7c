//! Interactive session loop: read commands from stdin, re-evaluate after each change.

use anyhow::Result;
use rust_decimal::Decimal;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::api::MarketData;
use crate::models::HedgeState;
use crate::session::{Quoted, SessionState};

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Lots(u32),
    Price(Decimal),
    Index(Decimal),
    MovingAverage(Decimal),
    Days(u32),
    State(HedgeState),
    /// Re-fetch index and moving average
    Refresh,
    /// Fetch the latest ETF price
    FetchPrice,
    /// Record that the current recommendation was carried out
    Apply,
    Show,
    Help,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Ok(ShellCommand::Show);
        };
        let arg = parts.next();

        let need = |what: &'static str| arg.ok_or_else(|| format!("'{}' needs {}", cmd, what));

        match cmd.to_lowercase().as_str() {
            "lots" => parse_positive_int(need("a lot count")?).map(ShellCommand::Lots),
            "days" => parse_positive_int(need("a number of days")?).map(ShellCommand::Days),
            "price" => parse_positive_decimal(need("a price")?).map(ShellCommand::Price),
            "index" => parse_positive_decimal(need("an index level")?).map(ShellCommand::Index),
            "ma" => parse_positive_decimal(need("a moving average")?).map(ShellCommand::MovingAverage),
            "state" => need("hedged or unhedged")?.parse().map(ShellCommand::State),
            "refresh" => Ok(ShellCommand::Refresh),
            "fetch-price" | "fetch" => Ok(ShellCommand::FetchPrice),
            "apply" | "done" => Ok(ShellCommand::Apply),
            "show" => Ok(ShellCommand::Show),
            "help" | "?" => Ok(ShellCommand::Help),
            "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
            other => Err(format!("unknown command '{}', type 'help'", other)),
        }
    }
}

fn parse_positive_int(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("expected a positive integer, got '{}'", s)),
    }
}

fn parse_positive_decimal(s: &str) -> Result<Decimal, String> {
    match Decimal::from_str(s) {
        Ok(d) if d > Decimal::ZERO => Ok(d),
        _ => Err(format!("expected a positive number, got '{}'", s)),
    }
}

const HELP: &str = "\
Commands:
  lots N               ETF lots held
  price X              ETF price per share
  index X              index level
  ma X                 moving average level
  days N               moving-average window (re-fetches the index)
  state hedged|unhedged
  refresh              re-fetch index and moving average
  fetch-price          fetch the latest ETF price
  apply                record that you carried out the recommendation
  show                 print the current recommendation
  quit";

/// Interactive session bound to a market-data source.
///
/// When `offline`, no command touches the source: `days` only marks the
/// moving average stale and the refresh commands are refused.
pub struct Shell<'a, S: ?Sized> {
    source: &'a S,
    offline: bool,
}

impl<'a, S> Shell<'a, S>
where
    S: MarketData + ?Sized,
{
    pub fn new(source: &'a S, offline: bool) -> Self {
        Self { source, offline }
    }

    /// Apply one command to the session. Returns `false` when the loop should stop.
    pub async fn handle_command(&self, state: &mut SessionState, command: ShellCommand) -> bool {
        debug!(command = ?command, offline = self.offline, "Session command");

        match command {
            ShellCommand::Lots(n) => state.holding_lots = n,
            ShellCommand::Price(p) => state.unit_price = Quoted::manual(p),
            ShellCommand::Index(i) => state.index_price = Quoted::manual(i),
            ShellCommand::MovingAverage(m) => state.moving_average = Quoted::manual(m),
            ShellCommand::Days(d) => {
                state.set_ma_days(d);
                if self.offline {
                    println!("Offline: moving average kept for the old window; set it with 'ma X'.");
                } else {
                    report_refresh(state.refresh_index(self.source).await, "index data");
                }
            }
            ShellCommand::State(s) => state.hedge_state = s,
            ShellCommand::Refresh | ShellCommand::FetchPrice if self.offline => {
                println!("Offline: market data fetching is disabled.");
            }
            ShellCommand::Refresh => report_refresh(state.refresh_index(self.source).await, "index data"),
            ShellCommand::FetchPrice => {
                report_refresh(state.refresh_unit_price(self.source).await, "ETF price")
            }
            ShellCommand::Apply => match state.evaluate() {
                Ok(eval) => {
                    let next = state.apply(&eval.recommendation);
                    println!("Position state is now: {}", next);
                }
                Err(e) => println!("Cannot apply: {}", e),
            },
            ShellCommand::Show => {}
            ShellCommand::Help => {
                println!("{}", HELP);
                return true;
            }
            ShellCommand::Quit => return false,
        }

        print_evaluation(state);
        true
    }

    /// Run the read-evaluate loop on stdin until `quit` or end of input.
    pub async fn run(&self, state: &mut SessionState) -> Result<()> {
        println!("{}\n", HELP);
        if self.offline {
            println!("Offline session: market data will not be fetched.");
        }
        print_evaluation(state);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print_prompt(state);
            let Some(line) = lines.next_line().await? else {
                break;
            };

            match line.parse::<ShellCommand>() {
                Ok(command) => {
                    if !self.handle_command(state, command).await {
                        break;
                    }
                }
                Err(e) => println!("{}", e),
            }
        }

        Ok(())
    }
}

fn report_refresh<E: std::fmt::Display>(result: Result<(), E>, what: &str) {
    match result {
        Ok(()) => println!("Updated {}.", what),
        Err(e) => println!("Could not load {} ({}); using previous values.", what, e),
    }
}

/// Print the current recommendation, or the input error that prevents one.
pub fn print_evaluation(state: &SessionState) {
    match state.evaluate() {
        Ok(eval) => println!("{}", eval),
        Err(e) => println!("\nCannot size hedge: {}", e),
    }
}

fn print_prompt(state: &SessionState) {
    use std::io::Write;
    print!("[{} | {}d MA] > ", state.hedge_state.as_str(), state.ma_days);
    let _ = std::io::stdout().flush();
}
