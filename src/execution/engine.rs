//! Main execution engine - orchestrates a local pipeline run

use crate::{
    core::{ExecutionStatus, PipelineRun, TaskState},
    execution::{ExecutionError, ExecutionScheduler, SchedulingStrategy, TaskExecutor, TaskOutputs},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        run_id: Uuid,
        pipeline_name: String,
        total_tasks: usize,
    },
    TaskStarted {
        task_id: String,
    },
    TaskCompleted {
        task_id: String,
        outputs: TaskOutputs,
    },
    TaskFailed {
        task_id: String,
        error: String,
    },
    TaskSkipped {
        task_id: String,
        reason: String,
    },
    RunCompleted {
        run_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

type TaskResult = (String, Result<TaskOutputs, ExecutionError>);

/// Main pipeline execution engine
pub struct ExecutionEngine<E> {
    scheduler: ExecutionScheduler,
    executor: Arc<E>,
    event_handlers: Vec<EventHandler>,
}

impl<E: TaskExecutor + 'static> ExecutionEngine<E> {
    pub fn new(executor: E, strategy: SchedulingStrategy) -> Self {
        Self {
            scheduler: ExecutionScheduler::new(strategy),
            executor: Arc::new(executor),
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute every task of the run.
    ///
    /// A failed task skips everything downstream of it while independent
    /// branches keep running; the run then fails with the failed task IDs.
    pub async fn execute(&self, run: &mut PipelineRun) -> Result<(), ExecutionError> {
        let run_id = run.state.run_id;
        let pipeline_name = run.graph.name.clone();
        let total_tasks = run.graph.tasks().len();

        info!(
            "Starting pipeline run: {} ({}) with {} strategy",
            pipeline_name,
            run_id,
            self.scheduler.strategy()
        );
        run.state.start(total_tasks);
        self.emit_event(ExecutionEvent::RunStarted {
            run_id,
            pipeline_name: pipeline_name.clone(),
            total_tasks,
        });

        let mut in_flight: JoinSet<TaskResult> = JoinSet::new();

        loop {
            let next = self.scheduler.next_tasks(run);
            if next.is_empty() && in_flight.is_empty() {
                break;
            }

            for task_id in &next {
                self.start_task(run, task_id, &mut in_flight);
            }

            if in_flight.is_empty() {
                continue;
            }

            if let Some(joined) = in_flight.join_next().await {
                let (task_id, result) = joined.map_err(|e| ExecutionError::Join(e.to_string()))?;
                self.finish_task(run, &task_id, result);
            }
        }

        if !run.is_complete() {
            error!("No tasks ready to run and none running - run stuck");
            let stuck: Vec<String> = run
                .task_states()
                .iter()
                .filter(|(_, state)| !state.is_terminal())
                .map(|(id, _)| id.clone())
                .collect();
            for id in stuck {
                self.mark_skipped(run, &id, "dependencies never completed".to_string());
            }
        }

        let failed: Vec<String> = run
            .task_states()
            .iter()
            .filter(|(_, state)| matches!(state, TaskState::Failed { .. }))
            .map(|(id, _)| id.clone())
            .collect();

        let status = if failed.is_empty() && run.state.skipped_tasks == 0 {
            run.state.complete();
            ExecutionStatus::Completed
        } else {
            run.state.fail();
            ExecutionStatus::Failed
        };

        info!("Pipeline run finished: {} - {:?}", pipeline_name, status);
        self.emit_event(ExecutionEvent::RunCompleted { run_id, status });

        match status {
            ExecutionStatus::Completed => Ok(()),
            _ => Err(ExecutionError::RunFailed {
                pipeline: pipeline_name,
                failed,
            }),
        }
    }

    /// Resolve a task's inputs and hand it to the executor
    fn start_task(&self, run: &mut PipelineRun, task_id: &str, in_flight: &mut JoinSet<TaskResult>) {
        let Some(task) = run.graph.task(task_id).cloned() else {
            warn!("Scheduler returned unknown task {}", task_id);
            return;
        };

        let started_at = Utc::now();
        run.set_task_state(task_id, TaskState::Running { started_at });
        self.emit_event(ExecutionEvent::TaskStarted {
            task_id: task_id.to_string(),
        });

        let invocation = match run.create_context().invocation(&task) {
            Ok(invocation) => invocation,
            Err(e) => {
                self.finish_task(run, task_id, Err(e.into()));
                return;
            }
        };

        let executor = Arc::clone(&self.executor);
        in_flight.spawn(async move {
            let result = executor.execute(&task, invocation).await;
            (task.id, result)
        });
    }

    /// Record the result of a task
    fn finish_task(
        &self,
        run: &mut PipelineRun,
        task_id: &str,
        result: Result<TaskOutputs, ExecutionError>,
    ) {
        let started_at = match run.task_state(task_id) {
            Some(TaskState::Running { started_at }) => *started_at,
            _ => Utc::now(),
        };

        match result {
            Ok(outputs) => {
                info!("Task {} completed", task_id);
                run.set_task_state(
                    task_id,
                    TaskState::Completed {
                        outputs: outputs.clone(),
                        started_at,
                        completed_at: Utc::now(),
                    },
                );
                self.emit_event(ExecutionEvent::TaskCompleted {
                    task_id: task_id.to_string(),
                    outputs,
                });
            }
            Err(e) => {
                let error = e.to_string();
                error!("Task {} failed: {}", task_id, error);
                run.set_task_state(
                    task_id,
                    TaskState::Failed {
                        error: error.clone(),
                        started_at,
                        failed_at: Utc::now(),
                    },
                );
                self.emit_event(ExecutionEvent::TaskFailed {
                    task_id: task_id.to_string(),
                    error,
                });

                for skipped in run.skip_downstream(task_id) {
                    if let Some(TaskState::Skipped { reason }) = run.task_state(&skipped) {
                        self.emit_event(ExecutionEvent::TaskSkipped {
                            task_id: skipped.clone(),
                            reason: reason.clone(),
                        });
                    }
                }
            }
        }
    }

    fn mark_skipped(&self, run: &mut PipelineRun, task_id: &str, reason: String) {
        run.set_task_state(task_id, TaskState::Skipped { reason: reason.clone() });
        self.emit_event(ExecutionEvent::TaskSkipped {
            task_id: task_id.to_string(),
            reason,
        });
    }
}
