use cad_schedule::{Schedule, ScheduleContext, ScheduleResult};

/// Follow a schedule's `use_next` chain from `context` for up to `count`
/// results.  Stops early once the schedule is never due again.
pub fn upcoming(
    schedule: &dyn Schedule,
    context: &ScheduleContext,
    count: usize,
) -> Vec<ScheduleResult> {
    let mut results = Vec::with_capacity(count);
    let mut context = context.clone();
    while results.len() < count {
        let Some(result) = schedule.next_due(&context) else {
            break;
        };
        results.push(result);
        context = context.move_to(result.use_next());
    }
    results
}

/// Print `results` as text, or one JSON object per line.
pub fn print(results: &[ScheduleResult], json: bool) -> anyhow::Result<()> {
    if results.is_empty() && !json {
        println!("never due");
        return Ok(());
    }
    for result in results {
        if json {
            println!("{}", serde_json::to_string(result)?);
        } else {
            println!("{result}");
        }
    }
    Ok(())
}
