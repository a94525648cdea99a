// tests/build_tasks.rs
mod common;

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sitesmith::{BuildError, Scheduler, TaskSpec};

use crate::common::{ActionLog, action_log, init_tracing, log_entries, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn logging_task(
    scheduler: &Scheduler,
    name: &'static str,
    deps: &[&str],
    log: &ActionLog,
) -> Result<(), BuildError> {
    let log = log.clone();
    scheduler.task(name, deps, move || {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(name.to_string());
            Ok(())
        }
    })
}

fn counting_task(
    scheduler: &Scheduler,
    name: &'static str,
    deps: &[&str],
) -> Result<Arc<AtomicUsize>, BuildError> {
    let counter = Arc::new(AtomicUsize::new(0));
    let seen = counter.clone();
    scheduler.task(name, deps, move || {
        let seen = seen.clone();
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })?;
    Ok(counter)
}

#[tokio::test]
async fn chain_completes_dependencies_first() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();
        let log = action_log();
        logging_task(&scheduler, "clean", &[], &log)?;
        logging_task(&scheduler, "assets", &["clean"], &log)?;
        logging_task(&scheduler, "site", &["assets"], &log)?;

        scheduler.build("site").await?;
        assert_eq!(log_entries(&log), ["clean", "assets", "site"]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn reregistration_keeps_only_the_latest_definition() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();
        let log = action_log();

        // The first definition depends on a task that never exists; the
        // overwrite must discard that dependency along with the action.
        {
            let log = log.clone();
            scheduler.task("job", &["missing"], move || {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push("first".to_string());
                    Ok(())
                }
            })?;
        }
        {
            let log = log.clone();
            scheduler.task("job", &[], move || {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push("second".to_string());
                    Ok(())
                }
            })?;
        }

        scheduler.build("job").await?;
        assert_eq!(log_entries(&log), ["second"]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn run_is_an_alias_for_build() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();
        let counter = counting_task(&scheduler, "only", &[])?;

        scheduler.run("only").await?;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn cycle_is_rejected_before_any_action_runs() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();
        let a = counting_task(&scheduler, "a", &["b"])?;
        let b = counting_task(&scheduler, "b", &["a"])?;

        let err = scheduler.build("a").await.unwrap_err();
        match err {
            BuildError::CyclicDependency { cycle } => assert_eq!(cycle, ["a", "b", "a"]),
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 0);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unknown_dependency_fails_fast_naming_the_requirer() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();
        let top = counting_task(&scheduler, "top", &["ghost"])?;

        let err = scheduler.build("top").await.unwrap_err();
        match err {
            BuildError::UnknownTask { name, required_by } => {
                assert_eq!(name, "ghost");
                assert_eq!(required_by.as_deref(), Some("top"));
            }
            other => panic!("expected UnknownTask, got {other:?}"),
        }
        assert_eq!(top.load(Ordering::SeqCst), 0);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unknown_root_fails_fast() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();

        let err = scheduler.build("nope").await.unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnknownTask {
                required_by: None,
                ..
            }
        ));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failing_task_reports_the_error_and_ran_once() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        scheduler.task("render", &[], move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Err("template is broken".into())
            }
        })?;

        let err = scheduler.build("render").await.unwrap_err();
        match err {
            BuildError::TaskFailed { task, error } => {
                assert_eq!(task, "render");
                assert_eq!(error.to_string(), "template is broken");
            }
            other => panic!("expected TaskFailed, got {other:?}"),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn diamond_runs_the_shared_dependency_once() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();
        let base = counting_task(&scheduler, "base", &[])?;
        let left = counting_task(&scheduler, "left", &["base"])?;
        let right = counting_task(&scheduler, "right", &["base"])?;
        let top = counting_task(&scheduler, "top", &["left", "right"])?;

        scheduler.build("top").await?;
        assert_eq!(base.load(Ordering::SeqCst), 1);
        assert_eq!(left.load(Ordering::SeqCst), 1);
        assert_eq!(right.load(Ordering::SeqCst), 1);
        assert_eq!(top.load(Ordering::SeqCst), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn deps_only_task_completes_after_its_dependencies() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();
        let log = action_log();
        logging_task(&scheduler, "css", &[], &log)?;
        logging_task(&scheduler, "html", &[], &log)?;
        scheduler.register(TaskSpec::new("default").after(["css", "html"]))?;

        scheduler.build("default").await?;
        let entries = log_entries(&log);
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&"css".to_string()));
        assert!(entries.contains(&"html".to_string()));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failure_stops_tasks_not_yet_started() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();

        scheduler.task("broken", &[], || async { Err("broke immediately".into()) })?;

        let slow_ran = Arc::new(AtomicUsize::new(0));
        let seen = slow_ran.clone();
        scheduler.task("slow", &[], move || {
            let seen = seen.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })?;

        let late = counting_task(&scheduler, "late", &["slow"])?;

        let err = scheduler.build(["broken", "late"]).await.unwrap_err();
        assert!(matches!(err, BuildError::TaskFailed { ref task, .. } if task == "broken"));
        // The in-flight sibling settled; its dependent was never dispatched.
        assert_eq!(slow_ran.load(Ordering::SeqCst), 1);
        assert_eq!(late.load(Ordering::SeqCst), 0);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn independent_tasks_overlap() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();
        let log = action_log();

        for name in ["alpha", "beta"] {
            let log = log.clone();
            scheduler.task(name, &[], move || {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("enter:{name}"));
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    log.lock().unwrap().push(format!("exit:{name}"));
                    Ok(())
                }
            })?;
        }

        scheduler.build(["alpha", "beta"]).await?;

        let entries = log_entries(&log);
        let first_exit = entries
            .iter()
            .position(|e| e.starts_with("exit:"))
            .unwrap();
        let last_enter = entries
            .iter()
            .rposition(|e| e.starts_with("enter:"))
            .unwrap();
        assert!(
            last_enter < first_exit,
            "expected overlapping execution, got {entries:?}"
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn panicking_action_fails_like_an_error() -> TestResult {
    with_timeout(async {
        init_tracing();
        let scheduler = Scheduler::new();
        scheduler.task("explode", &[], || async { panic!("boom in action") })?;
        let dependent = counting_task(&scheduler, "after", &["explode"])?;

        let err = scheduler.build("after").await.unwrap_err();
        match err {
            BuildError::TaskFailed { task, error } => {
                assert_eq!(task, "explode");
                assert!(error.to_string().contains("boom in action"));
            }
            other => panic!("expected TaskFailed, got {other:?}"),
        }
        assert_eq!(dependent.load(Ordering::SeqCst), 0);
        Ok(())
    })
    .await
}

#[test]
fn plan_exposes_execution_order() {
    init_tracing();
    let scheduler = Scheduler::new();
    scheduler.register(TaskSpec::new("one")).unwrap();
    scheduler
        .register(TaskSpec::new("two").after(["one"]))
        .unwrap();
    scheduler
        .register(TaskSpec::new("three").after(["two"]))
        .unwrap();

    let plan = scheduler.plan("three").unwrap();
    assert_eq!(plan.order(), ["one", "two", "three"]);
    assert_eq!(plan.len(), 3);
    assert!(plan.contains("two"));
    assert!(!plan.contains("four"));
}
