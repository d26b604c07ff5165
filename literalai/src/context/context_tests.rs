//! Tests for frame scoping and task isolation.

#[cfg(test)]
mod tests {
    use crate::context::{
        current_frame, enter, run, scope, spawn_in_context, ContextFrame, ThreadRef,
    };
    use crate::errors::ContextError;
    use futures::FutureExt;
    use rand::Rng;
    use std::panic::AssertUnwindSafe;
    use std::sync::Weak;
    use std::time::Duration;

    fn thread_frame(id: &str) -> ContextFrame {
        ContextFrame::new().for_thread(ThreadRef {
            id: id.to_string(),
            record: Weak::new(),
        })
    }

    fn current_thread_id() -> Option<String> {
        current_frame().and_then(|f| f.thread_id().map(String::from))
    }

    async fn jitter() {
        let ms = rand::thread_rng().gen_range(0..5);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test]
    async fn test_no_frame_outside_run() {
        assert!(current_frame().is_none());
    }

    #[tokio::test]
    async fn test_run_exposes_frame_across_awaits() {
        let seen = run(thread_frame("t1"), async {
            let before = current_thread_id();
            tokio::task::yield_now().await;
            jitter().await;
            (before, current_thread_id())
        })
        .await;

        assert_eq!(seen.0.as_deref(), Some("t1"));
        assert_eq!(seen.1.as_deref(), Some("t1"));
        assert!(current_frame().is_none());
    }

    #[tokio::test]
    async fn test_nested_run_restores_outer_frame() {
        run(thread_frame("outer"), async {
            run(thread_frame("inner"), async {
                assert_eq!(current_thread_id().as_deref(), Some("inner"));
            })
            .await;
            assert_eq!(current_thread_id().as_deref(), Some("outer"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_frame_restored_after_error() {
        run(thread_frame("outer"), async {
            let result: Result<(), &str> = run(thread_frame("inner"), async { Err("boom") }).await;
            assert_eq!(result, Err("boom"));
            assert_eq!(current_thread_id().as_deref(), Some("outer"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_frame_restored_after_panic() {
        run(thread_frame("outer"), async {
            let caught = AssertUnwindSafe(run(thread_frame("inner"), async {
                panic!("callback panicked");
            }))
            .catch_unwind()
            .await;

            assert!(caught.is_err());
            assert_eq!(current_thread_id().as_deref(), Some("outer"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_joined_runs_do_not_leak() {
        let tasks = (0..32).map(|i| {
            let id = format!("thread-{i}");
            run(thread_frame(&id), async move {
                for _ in 0..5 {
                    jitter().await;
                    assert_eq!(current_thread_id().as_deref(), Some(id.as_str()));
                }
                id
            })
        });

        let ids = futures::future::join_all(tasks).await;
        assert_eq!(ids.len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_spawned_tasks_start_without_frame() {
        run(thread_frame("parent"), async {
            let plain = tokio::spawn(async { current_thread_id() }).await.unwrap();
            assert_eq!(plain, None);

            let carried = spawn_in_context(async {
                jitter().await;
                current_thread_id()
            })
            .await
            .unwrap();
            assert_eq!(carried.as_deref(), Some("parent"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_enter_requires_scope() {
        assert_eq!(enter(thread_frame("t")), Err(ContextError::NoActiveScope));
    }

    #[tokio::test]
    async fn test_enter_persists_until_scope_ends() {
        scope(async {
            assert!(current_frame().is_none());
            enter(thread_frame("entered")).unwrap();
            tokio::task::yield_now().await;
            assert_eq!(current_thread_id().as_deref(), Some("entered"));
        })
        .await;

        assert!(current_frame().is_none());
    }

    #[tokio::test]
    async fn test_enter_inside_run_does_not_escape() {
        run(thread_frame("outer"), async {
            run(thread_frame("inner"), async {
                enter(thread_frame("entered")).unwrap();
                assert_eq!(current_thread_id().as_deref(), Some("entered"));
            })
            .await;
            assert_eq!(current_thread_id().as_deref(), Some("outer"));
        })
        .await;
    }

    #[test]
    fn test_run_without_runtime() {
        let seen = tokio_test::block_on(run(thread_frame("sync"), async { current_thread_id() }));
        assert_eq!(seen.as_deref(), Some("sync"));
    }
}
