use log::info;

use crate::{
    Result,
    scheduler::Scheduler,
    stage::{StageArgs, StageName, StageOutcome, StageRunner},
    stages::{IsectGeometry, SampleTouch, group_touch},
};

/// Runs the stage called `name` through `runner`.
pub async fn run_stage<S: Scheduler + Sync>(
    runner: &StageRunner<'_, S>,
    name: StageName,
    args: StageArgs,
) -> Result<StageOutcome> {
    match name {
        StageName::SampleTouch => runner.run(&SampleTouch, args).await,
        StageName::GroupTouch => {
            let records = group_touch(runner.workspace()).await?;
            Ok(StageOutcome::Merged {
                records: records.len(),
            })
        }
        StageName::IsectGeometry => runner.run(&IsectGeometry, args).await,
    }
}

/// Runs every stage in pipeline order on this machine.
pub async fn run_all<S: Scheduler + Sync>(runner: &StageRunner<'_, S>) -> Result<()> {
    for name in StageName::ALL {
        let outcome = run_stage(runner, name, StageArgs::default()).await?;
        info!(stage = name.as_str(); "finished: {outcome:?}");
    }
    Ok(())
}
