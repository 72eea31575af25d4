use std::{env, io};

use condor::{
    CondorErr, CondorScheduler, LocalScheduler, Result, Scheduler, StageArgs, StageName,
    StageRunner, Workspace,
    pipeline::{run_all, run_stage},
    remote::{RemoteCommand, autorun},
    workspace::SchedulerKind,
};
use log::info;

const USAGE: &str =
    "usage: pipeline <workspace> <stage|autorun> [--task-id N] [--only-wait] [--remote]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    All,
    Stage(StageName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cli {
    workspace: String,
    target: Target,
    args: StageArgs,
    remote: bool,
}

impl Cli {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let usage = || CondorErr::InvalidArgument(USAGE.into());
        let mut args = args.into_iter();

        let workspace = args.next().ok_or_else(usage)?;
        let target = match args.next().ok_or_else(usage)?.as_str() {
            "autorun" => Target::All,
            name => Target::Stage(name.parse()?),
        };

        let mut cli = Self {
            workspace,
            target,
            args: StageArgs::default(),
            remote: false,
        };

        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--task-id" => {
                    let id = args.next().ok_or_else(usage)?;
                    let id = id.parse().map_err(|_| {
                        CondorErr::InvalidArgument(format!("task id {id:?} is not a number"))
                    })?;
                    cli.args.task_id = Some(id);
                }
                "--only-wait" => cli.args.only_wait = true,
                "--remote" => cli.remote = true,
                _ => return Err(usage()),
            }
        }

        Ok(cli)
    }
}

async fn run_local<S: Scheduler + Sync>(ws: &Workspace, scheduler: S, cli: &Cli) -> Result<()> {
    let runner = StageRunner::new(ws, scheduler);

    match cli.target {
        Target::All => run_all(&runner).await,
        Target::Stage(name) => {
            let outcome = run_stage(&runner, name, cli.args).await?;
            info!(stage = name.as_str(); "finished: {outcome:?}");
            Ok(())
        }
    }
}

async fn run_remote(ws: &Workspace, cli: &Cli) -> Result<()> {
    let remote = RemoteCommand::new(ws.config().remote.as_ref().ok_or(CondorErr::NoRemote)?);

    match cli.target {
        Target::All => autorun(&remote).await,
        Target::Stage(name) => remote.run(name, true).await,
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse(env::args().skip(1))?;
    let ws = Workspace::open(&cli.workspace)?;
    info!("workspace {}", ws.root().display());

    let ret = if cli.remote {
        run_remote(&ws, &cli).await
    } else {
        match ws.config().scheduler {
            SchedulerKind::Condor => run_local(&ws, CondorScheduler, &cli).await,
            SchedulerKind::Local => run_local(&ws, LocalScheduler, &cli).await,
        }
    };

    Ok(ret?)
}
