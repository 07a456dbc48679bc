use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

mod scenarios;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run continuation-passing scenarios through the tail-call dispatch loop", long_about = None)]
struct Cli {
    /// Stack size in KiB of the thread that runs the scenario
    #[arg(long, env = "TCO_STACK_KIB", default_value_t = 256, global = true)]
    stack_kib: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Factorial through an accumulator self call
    Factorial {
        #[arg(long, default_value_t = 7)]
        n: i64,
    },

    /// Even/odd stress: a nested graph exits through the outer graph's continuations
    Parity {
        #[arg(long, default_value_t = 1000)]
        count: i64,
    },

    /// Self-recursive walk that exits through an auxiliary continuation
    Chain {
        #[arg(long, default_value_t = 100_000)]
        depth: i64,
    },

    /// Time native recursion against the dispatch loop
    Compare {
        #[arg(long, default_value_t = 10_000)]
        depth: i64,
    },
}

fn run(command: Commands, stack_bytes: usize) -> Result<String> {
    let report = match command {
        Commands::Factorial { n } => format!("{}! = {}", n, scenarios::factorial(n)?),
        Commands::Parity { count } => {
            format!("parity({}) -> {}", count, scenarios::parity(count)?)
        }
        Commands::Chain { depth } => {
            format!("chain({}) -> {} hops", depth, scenarios::chain(depth)?)
        }
        Commands::Compare { depth } => scenarios::compare(depth, stack_bytes)?.to_string(),
    };
    Ok(report)
}

fn stack_size_bytes(stack_kib: usize) -> Result<usize> {
    stack_kib
        .checked_mul(1024)
        .ok_or_else(|| anyhow!("stack size of {} KiB does not fit in usize bytes", stack_kib))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default())
        .format_timestamp(None)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let stack_bytes = stack_size_bytes(cli.stack_kib)?;
    log::debug!("running {:?} on a {} KiB stack", cli.command, cli.stack_kib);

    // Scenarios run on their own thread so the stack bound is explicit.
    let command = cli.command;
    let report = thread::Builder::new()
        .name("tco-scenario".into())
        .stack_size(stack_bytes)
        .spawn(move || run(command, stack_bytes))
        .context("failed to spawn scenario thread")?
        .join()
        .map_err(|_| anyhow!("scenario thread panicked"))??;

    println!("{}", report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_size_bytes() {
        assert_eq!(stack_size_bytes(256).unwrap(), 256 * 1024);
        assert!(stack_size_bytes(usize::MAX).is_err());
        assert!(stack_size_bytes(usize::MAX / 1024 + 1).is_err());
    }

    #[test]
    fn test_stack_kib_from_flag() {
        let cli = Cli::try_parse_from(["tco", "--stack-kib", "512", "chain", "--depth", "10"]).unwrap();
        assert_eq!(cli.stack_kib, 512);
        assert!(matches!(cli.command, Commands::Chain { depth: 10 }));
    }
}
