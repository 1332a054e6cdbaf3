//! End-to-end decision task handling: response envelopes, failure
//! isolation, and query semantics.

mod fixtures;

use fixtures::*;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use windlass_core::ActivityOptions;
use windlass_proto::{DecisionAttributes, DecisionType, EventType, QueryTaskCompletedType};
use windlass_worker::{
    DecisionTaskHandler, DecisionTaskResult, WorkflowDefinition, WorkflowRegistry,
};
use windlass_workflow::{WorkflowContext, WorkflowError};

fn two_step_workflow() -> Box<dyn WorkflowDefinition> {
    Box::new(ClosureWorkflow(|ctx: WorkflowContext, _input| {
        Box::pin(async move {
            let first = ctx.execute_activity("step_one", None, ActivityOptions::default());
            let second = ctx.execute_activity("step_two", None, ActivityOptions::default());
            let (first, second) = futures::future::join(first, second).await;
            let mut combined = first?;
            combined.extend(second?);
            Ok(combined)
        })
    }))
}

fn echo_workflow() -> Box<dyn WorkflowDefinition> {
    Box::new(ClosureWorkflow(|ctx: WorkflowContext, input| {
        Box::pin(async move {
            ctx.execute_activity("echo", input, ActivityOptions::default())
                .await
        })
    }))
}

fn query_workflow() -> Box<dyn WorkflowDefinition> {
    Box::new(ClosureWorkflow(|ctx: WorkflowContext, _input| {
        Box::pin(async move {
            ctx.set_query_handler("status", |_args| Ok(b"running".to_vec()));
            ctx.set_query_handler("broken", |_args| {
                Err(WorkflowError::Generic("query exploded".into()))
            });
            ctx.execute_activity("wait", None, ActivityOptions::default())
                .await
        })
    }))
}

fn panicky_workflow() -> Box<dyn WorkflowDefinition> {
    #[derive(Clone)]
    struct Panicky;

    impl WorkflowDefinition for Panicky {
        fn execute(
            &self,
            _ctx: WorkflowContext,
            _input: Option<Vec<u8>>,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>> {
            Box::pin(async { panic!("boom") })
        }
    }

    Box::new(Panicky)
}

fn handler_with(register: impl FnOnce(&WorkflowRegistry)) -> DecisionTaskHandler {
    let registry = WorkflowRegistry::new();
    register(&registry);
    DecisionTaskHandler::new(Arc::new(registry))
}

#[tokio::test]
async fn first_decision_task_produces_schedule_decisions() {
    let handler = handler_with(|r| r.register_workflow("TwoStep", two_step_workflow()));

    let task = task_for("TwoStep", b"token-a", base_history(b""));
    let result = handler.handle_decision_task(task).await;

    let response = match result {
        DecisionTaskResult::Completed(response) => response,
        other => panic!("expected completed response, got {other:?}"),
    };
    assert_eq!(response.task_token, b"token-a");
    assert!(response.execution_context.is_some());
    assert_eq!(response.decisions.len(), 2);

    let activity_ids: Vec<_> = response
        .decisions
        .iter()
        .map(|d| {
            assert_eq!(d.decision_type, DecisionType::ScheduleActivityTask);
            match d.attributes.as_ref().unwrap() {
                DecisionAttributes::ScheduleActivityTask(attrs) => attrs.activity_id.clone(),
                other => panic!("unexpected attributes: {other:?}"),
            }
        })
        .collect();
    assert_eq!(activity_ids, vec!["0", "1"]);
}

#[tokio::test]
async fn completed_activity_completes_workflow() {
    let handler = handler_with(|r| r.register_workflow("Echo", echo_workflow()));

    let mut events = base_history(b"in");
    events.push(event(4, EventType::DecisionTaskCompleted));
    events.push(activity_scheduled(5, "0"));
    events.push(activity_completed(6, 5, b"out"));
    events.push(event(7, EventType::DecisionTaskScheduled));
    events.push(decision_started_at(8, 0));

    let result = handler
        .handle_decision_task(task_for("Echo", b"token-b", events))
        .await;

    let response = match result {
        DecisionTaskResult::Completed(response) => response,
        other => panic!("expected completed response, got {other:?}"),
    };
    assert_eq!(response.decisions.len(), 1);
    let decision = &response.decisions[0];
    assert_eq!(
        decision.decision_type,
        DecisionType::CompleteWorkflowExecution
    );
    match decision.attributes.as_ref().unwrap() {
        DecisionAttributes::CompleteWorkflowExecution(attrs) => {
            assert_eq!(attrs.result, Some(b"out".to_vec()));
        }
        other => panic!("unexpected attributes: {other:?}"),
    }
}

#[tokio::test]
async fn in_flight_activity_is_not_rescheduled() {
    let handler = handler_with(|r| r.register_workflow("Echo", echo_workflow()));

    let mut events = base_history(b"in");
    events.push(event(4, EventType::DecisionTaskCompleted));
    events.push(activity_scheduled(5, "0"));
    events.push(signal_event(6, "nudge", b""));
    events.push(event(7, EventType::DecisionTaskScheduled));
    events.push(decision_started_at(8, 0));

    let result = handler
        .handle_decision_task(task_for("Echo", b"token-c", events))
        .await;

    let response = match result {
        DecisionTaskResult::Completed(response) => response,
        other => panic!("expected completed response, got {other:?}"),
    };
    assert!(
        response.decisions.is_empty(),
        "activity already scheduled must not produce a duplicate decision: {:?}",
        response.decisions
    );
}

#[tokio::test]
async fn failed_activity_fails_workflow_execution() {
    let handler = handler_with(|r| r.register_workflow("Echo", echo_workflow()));

    let mut events = base_history(b"in");
    events.push(event(4, EventType::DecisionTaskCompleted));
    events.push(activity_scheduled(5, "0"));
    events.push(activity_failed(6, 5, "downstream unavailable"));
    events.push(event(7, EventType::DecisionTaskScheduled));
    events.push(decision_started_at(8, 0));

    let result = handler
        .handle_decision_task(task_for("Echo", b"token-d", events))
        .await;

    let response = match result {
        DecisionTaskResult::Completed(response) => response,
        other => panic!("expected completed response, got {other:?}"),
    };
    assert_eq!(response.decisions.len(), 1);
    let decision = &response.decisions[0];
    assert_eq!(decision.decision_type, DecisionType::FailWorkflowExecution);
    match decision.attributes.as_ref().unwrap() {
        DecisionAttributes::FailWorkflowExecution(attrs) => {
            assert!(attrs.reason.contains("downstream unavailable"));
        }
        other => panic!("unexpected attributes: {other:?}"),
    }
}

#[tokio::test]
async fn panicking_workflow_fails_task_and_preserves_token() {
    let handler = handler_with(|r| {
        r.register_workflow("Panicky", panicky_workflow());
        r.register_workflow("Echo", echo_workflow());
    });

    let result = handler
        .handle_decision_task(task_for("Panicky", b"token-e", base_history(b"")))
        .await;

    let response = match result {
        DecisionTaskResult::Failed(response) => response,
        other => panic!("expected failed response, got {other:?}"),
    };
    assert_eq!(response.task_token, b"token-e");
    let details = String::from_utf8(response.details.unwrap()).unwrap();
    assert!(details.contains("boom"), "diagnostic was: {details}");

    // A bad workflow must not poison the handler for unrelated tasks.
    let followup = handler
        .handle_decision_task(task_for("Echo", b"token-f", base_history(b"")))
        .await;
    assert!(matches!(followup, DecisionTaskResult::Completed(_)));
}

#[tokio::test]
async fn unknown_workflow_type_fails_task() {
    let handler = handler_with(|_| {});

    let result = handler
        .handle_decision_task(task_for("Nope", b"token-g", base_history(b"")))
        .await;

    let response = match result {
        DecisionTaskResult::Failed(response) => response,
        other => panic!("expected failed response, got {other:?}"),
    };
    assert_eq!(response.task_token, b"token-g");
    let details = String::from_utf8(response.details.unwrap()).unwrap();
    assert!(
        details.contains("unknown workflow type"),
        "diagnostic was: {details}"
    );
    assert!(details.contains("Nope"));
}

#[tokio::test]
async fn unknown_type_tolerance_is_passed_through() {
    let handler = DecisionTaskHandler::new(Arc::new(
        WorkflowRegistry::new().tolerate_unknown_types(true),
    ));
    assert!(handler.supports_unknown_types());

    let strict = handler_with(|_| {});
    assert!(!strict.supports_unknown_types());
}

#[tokio::test]
async fn missing_history_fails_task() {
    let handler = handler_with(|r| r.register_workflow("Echo", echo_workflow()));

    let mut task = task_for("Echo", b"token-h", base_history(b""));
    task.history = None;
    let result = handler.handle_decision_task(task).await;

    assert!(matches!(result, DecisionTaskResult::Failed(_)));
    assert_eq!(result.task_token(), b"token-h");
}

#[tokio::test]
async fn query_returns_completed_result() {
    let handler = handler_with(|r| r.register_workflow("Query", query_workflow()));

    let task = with_query(task_for("Query", b"token-q1", base_history(b"")), "status");
    let result = handler.handle_decision_task(task).await;

    let response = match result {
        DecisionTaskResult::QueryCompleted(response) => response,
        other => panic!("expected query response, got {other:?}"),
    };
    assert_eq!(response.task_token, b"token-q1");
    assert_eq!(response.completed_type, QueryTaskCompletedType::Completed);
    assert_eq!(response.query_result, Some(b"running".to_vec()));
    assert_eq!(response.error_message, None);
}

#[tokio::test]
async fn failing_query_reports_query_failure_not_task_failure() {
    let handler = handler_with(|r| r.register_workflow("Query", query_workflow()));

    let task = with_query(task_for("Query", b"token-q2", base_history(b"")), "broken");
    let result = handler.handle_decision_task(task).await;

    let response = match result {
        DecisionTaskResult::QueryCompleted(response) => response,
        other => panic!("expected query response, got {other:?}"),
    };
    assert_eq!(response.task_token, b"token-q2");
    assert_eq!(response.completed_type, QueryTaskCompletedType::Failed);
    assert_eq!(response.query_result, None);
    let message = response.error_message.unwrap();
    assert!(message.contains("query exploded"), "message was: {message}");
}

#[tokio::test]
async fn unknown_query_type_reports_query_failure() {
    let handler = handler_with(|r| r.register_workflow("Query", query_workflow()));

    let task = with_query(task_for("Query", b"token-q3", base_history(b"")), "missing");
    let result = handler.handle_decision_task(task).await;

    let response = match result {
        DecisionTaskResult::QueryCompleted(response) => response,
        other => panic!("expected query response, got {other:?}"),
    };
    assert_eq!(response.completed_type, QueryTaskCompletedType::Failed);
    assert!(response.error_message.unwrap().contains("unknown query type"));
}

#[tokio::test]
async fn failed_query_leaves_decide_path_intact() {
    let handler = handler_with(|r| r.register_workflow("Query", query_workflow()));

    let query_task = with_query(task_for("Query", b"token-q4", base_history(b"")), "broken");
    let query_result = handler.handle_decision_task(query_task).await;
    assert!(matches!(
        query_result,
        DecisionTaskResult::QueryCompleted(_)
    ));

    // The same history decides fine afterwards.
    let decide_result = handler
        .handle_decision_task(task_for("Query", b"token-q5", base_history(b"")))
        .await;
    let response = match decide_result {
        DecisionTaskResult::Completed(response) => response,
        other => panic!("expected completed response, got {other:?}"),
    };
    assert_eq!(response.decisions.len(), 1);
    assert_eq!(
        response.decisions[0].decision_type,
        DecisionType::ScheduleActivityTask
    );
}
