//! Pure transitions over session values.
//!
//! Every transition takes the session by value and returns the updated
//! value; a transition applied to a session that is not in parallel mode
//! returns it unchanged (except [`enable_parallel_mode`], which
//! establishes the mode). Nothing here touches storage.

use chrono::Utc;

use super::{
    ExecutionStatus, ParallelGroupRecord, ParallelState, Session, TaskExecutionRecord,
};

/// Parameters for recording the start of one task execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStart {
    /// Node identifier of the task.
    pub task_id: String,
    /// Title of the task.
    pub task_title: String,
    /// Position of the task in the scheduling snapshot.
    pub task_index: usize,
    /// OS process id of the executing agent, when known.
    pub process_id: Option<u32>,
}

/// Put the session into parallel mode with an empty scheduling history.
pub fn enable_parallel_mode(mut session: Session, max_concurrent_tasks: usize) -> Session {
    session.parallel_state = Some(ParallelState {
        is_parallel_mode: true,
        current_group_index: -1,
        execution_groups: Vec::new(),
        active_executions: Vec::new(),
        max_concurrent_tasks,
    });
    session.updated_at = Utc::now();
    session
}

/// Leave parallel mode, dropping the parallel state entirely. All other
/// session fields are untouched.
pub fn disable_parallel_mode(mut session: Session) -> Session {
    if session.parallel_state.take().is_some() {
        session.updated_at = Utc::now();
    }
    session
}

/// Record that the group at `group_index` has started: appends a fresh
/// progress record and moves the group cursor.
pub fn start_parallel_group(mut session: Session, group_index: usize) -> Session {
    let Some(state) = session.parallel_state.as_mut() else {
        return session;
    };
    state.execution_groups.push(ParallelGroupRecord {
        group_index,
        start_time: Utc::now(),
        end_time: None,
        task_executions: Vec::new(),
        is_complete: false,
    });
    state.current_group_index = group_index as i64;
    session.updated_at = Utc::now();
    session
}

/// Mark the matching group record complete.
pub fn complete_parallel_group(mut session: Session, group_index: usize) -> Session {
    let Some(state) = session.parallel_state.as_mut() else {
        return session;
    };
    if let Some(group) = state
        .execution_groups
        .iter_mut()
        .rev()
        .find(|group| group.group_index == group_index)
    {
        group.is_complete = true;
        group.end_time = Some(Utc::now());
        session.updated_at = Utc::now();
    }
    session
}

/// Record a running task execution, both session-wide and on the current
/// group's record.
pub fn start_task_execution(mut session: Session, start: TaskStart) -> Session {
    let Some(state) = session.parallel_state.as_mut() else {
        return session;
    };
    let record = TaskExecutionRecord {
        task_id: start.task_id,
        task_title: start.task_title,
        task_index: start.task_index,
        status: ExecutionStatus::Running,
        start_time: Utc::now(),
        end_time: None,
        process_id: start.process_id,
        retry_count: 0,
        last_error: None,
    };
    if let Some(group) = current_group_mut(state) {
        group.task_executions.push(record.clone());
    }
    state.active_executions.push(record);
    session.updated_at = Utc::now();
    session
}

/// Mark the matching execution record completed or failed.
pub fn complete_task_execution(
    mut session: Session,
    task_id: &str,
    was_successful: bool,
) -> Session {
    let status = if was_successful {
        ExecutionStatus::Completed
    } else {
        ExecutionStatus::Failed
    };
    update_execution(&mut session, task_id, |record| {
        record.status = status;
        record.end_time = Some(Utc::now());
    });
    session
}

/// Mark the matching execution record failed with the given error.
pub fn fail_task_execution(mut session: Session, task_id: &str, error: &str) -> Session {
    update_execution(&mut session, task_id, |record| {
        record.status = ExecutionStatus::Failed;
        record.end_time = Some(Utc::now());
        record.last_error = Some(error.to_string());
    });
    session
}

/// Return the matching execution record to `running` for another
/// attempt: bumps the retry count and clears the previous outcome.
pub fn retry_task_execution(mut session: Session, task_id: &str) -> Session {
    update_execution(&mut session, task_id, |record| {
        record.status = ExecutionStatus::Running;
        record.retry_count += 1;
        record.last_error = None;
        record.end_time = None;
    });
    session
}

/// The progress record of the group at the current cursor, only while it
/// exists and is not yet complete.
pub fn current_parallel_group(session: &Session) -> Option<&ParallelGroupRecord> {
    let state = session.parallel_state.as_ref()?;
    if state.current_group_index < 0 {
        return None;
    }
    state
        .execution_groups
        .iter()
        .rev()
        .find(|group| group.group_index as i64 == state.current_group_index)
        .filter(|group| !group.is_complete)
}

/// Execution records currently in `running` status.
pub fn active_executions(session: &Session) -> Vec<&TaskExecutionRecord> {
    match session.parallel_state.as_ref() {
        Some(state) => state
            .active_executions
            .iter()
            .filter(|record| record.status == ExecutionStatus::Running)
            .collect(),
        None => Vec::new(),
    }
}

/// Look up the execution record for a task.
pub fn task_execution<'a>(session: &'a Session, task_id: &str) -> Option<&'a TaskExecutionRecord> {
    session
        .parallel_state
        .as_ref()?
        .active_executions
        .iter()
        .find(|record| record.task_id == task_id)
}

/// Whether the task currently has a `running` execution record.
pub fn is_task_executing(session: &Session, task_id: &str) -> bool {
    task_execution(session, task_id)
        .map(|record| record.status == ExecutionStatus::Running)
        .unwrap_or(false)
}

/// Number of execution records currently in `running` status.
pub fn active_execution_count(session: &Session) -> usize {
    active_executions(session).len()
}

fn current_group_mut(state: &mut ParallelState) -> Option<&mut ParallelGroupRecord> {
    if state.current_group_index < 0 {
        return None;
    }
    let cursor = state.current_group_index;
    state
        .execution_groups
        .iter_mut()
        .rev()
        .find(|group| group.group_index as i64 == cursor)
}

// The session-wide list and the group record hold separate copies of a
// task's execution record; outcome updates must land on both.
fn update_execution<F>(session: &mut Session, task_id: &str, apply: F)
where
    F: Fn(&mut TaskExecutionRecord),
{
    let Some(state) = session.parallel_state.as_mut() else {
        return;
    };
    let mut touched = false;
    if let Some(record) = state
        .active_executions
        .iter_mut()
        .find(|record| record.task_id == task_id)
    {
        apply(record);
        touched = true;
    }
    for group in state.execution_groups.iter_mut() {
        if let Some(record) = group
            .task_executions
            .iter_mut()
            .find(|record| record.task_id == task_id)
        {
            apply(record);
            touched = true;
        }
    }
    if touched {
        session.updated_at = Utc::now();
    }
}
