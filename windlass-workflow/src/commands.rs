use std::time::Duration;
use windlass_core::ActivityOptions;

/// Workflow command
#[derive(Debug)]
pub enum WorkflowCommand {
    ScheduleActivity(ScheduleActivityCommand),
    StartTimer(StartTimerCommand),
    CancelTimer(CancelTimerCommand),
}

#[derive(Debug)]
pub struct ScheduleActivityCommand {
    pub activity_id: String,
    pub activity_type: String,
    pub args: Option<Vec<u8>>,
    pub options: ActivityOptions,
}

#[derive(Debug)]
pub struct StartTimerCommand {
    pub timer_id: String,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct CancelTimerCommand {
    pub timer_id: String,
}
