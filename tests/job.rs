// tests/job.rs

use jobdag::{BasicJob, Job};
use tokio_util::sync::CancellationToken;

#[test]
fn name_and_default_dependencies() {
    let job = BasicJob::new("test");
    assert_eq!(job.name(), "test");
    assert!(job.dependencies().unwrap().is_empty());
}

#[test]
fn declared_dependencies_are_reported_in_order() {
    let job = BasicJob::new("test").after(["dep1", "dep2"]);
    assert_eq!(
        job.dependencies().unwrap(),
        vec!["dep1".to_string(), "dep2".to_string()]
    );
}

#[test]
fn should_run_defaults_to_true() {
    assert!(BasicJob::new("test").should_run().unwrap());
}

#[test]
fn should_run_callback_is_used() {
    let job = BasicJob::new("test").with_should_run(|| Ok(false));
    assert!(!job.should_run().unwrap());

    let job = BasicJob::new("test").with_should_run(|| Err(anyhow::anyhow!("probe failed")));
    assert_eq!(job.should_run().unwrap_err().to_string(), "probe failed");
}

#[tokio::test]
async fn run_invokes_the_callback() {
    let job = BasicJob::new("test").with_run(|_ctx| async { Ok(()) });
    assert!(job.run(CancellationToken::new()).await.is_ok());
}

#[tokio::test]
async fn run_propagates_the_callback_error() {
    let job = BasicJob::new("test").with_run(|_ctx| async { Err(anyhow::anyhow!("bad")) });
    let err = job.run(CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "bad");
}

#[tokio::test]
async fn run_without_callback_fails() {
    let job = BasicJob::new("test");
    let err = job.run(CancellationToken::new()).await.unwrap_err();
    assert!(err.to_string().contains("missing run callback"));
}
